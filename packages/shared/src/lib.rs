//! Utilities shared across the Deai packages.

pub mod logger;
pub mod time;
