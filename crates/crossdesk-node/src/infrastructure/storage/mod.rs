//! Configuration and persisted-offset storage.

pub mod config;
