//! Utilities shared by the Cups crates.

pub mod logger;
pub mod time;
