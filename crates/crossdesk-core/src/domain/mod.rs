//! Pure domain logic: displays and the entity topology engine.

pub mod display;
pub mod topology;
