pub mod chain;
pub mod ctx;
