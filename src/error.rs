use std::path::PathBuf;

use thiserror::Error;

/// Top-level error type for the simulator
#[derive(Error, Debug)]
pub enum SimulatorError {
    #[error("Invalid configuration: {0}")]
    ConfigError(#[from] ConfigError),

    #[error("Malformed address: '{0}' is not a 32-bit hexadecimal value")]
    MalformedAddress(String),

    #[error("Cache inconsistency detected at level {0}: {1}")]
    CacheInconsistency(usize, String),

    #[error("Failed to parse trace file '{0}': {1}")]
    TraceError(PathBuf, String),

    #[error("IO error: {0}")]
    IoError(#[from] std::io::Error),

    #[error("CSV error: {0}")]
    CsvError(#[from] csv::Error),

    #[error("Failed to draw plot: {0}")]
    PlotError(String),
}

/// Errors raised while validating a cache configuration
#[derive(Error, Debug, PartialEq, Eq)]
pub enum ConfigError {
    #[error("{0} must not be zero")]
    Zero(&'static str),

    #[error("{field} must be a power of two, got {value}")]
    NotPowerOfTwo { field: &'static str, value: u32 },

    #[error(
        "size {size} is not divisible by associativity {associativity} \
         times block size {block_size}"
    )]
    Indivisible {
        size: u32,
        associativity: u32,
        block_size: u32,
    },
}

/// Type alias for Result with SimulatorError
pub type SimulatorResult<T> = Result<T, SimulatorError>;
