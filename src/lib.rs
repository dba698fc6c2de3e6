pub mod config;
pub mod flags;
pub mod memory;
pub mod report;
pub mod run_wrapper;

pub mod error;
