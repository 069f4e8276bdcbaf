//! Utilities.
pub mod conf;
pub mod logger;
pub mod units;
