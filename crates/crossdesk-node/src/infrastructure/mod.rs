//! Infrastructure adapters: channels, input injection, and config storage.

pub mod channel;
pub mod injector;
pub mod storage;
