use std::path::PathBuf;

use thiserror::Error;

/// Top-level error type for the simulator
#[derive(Error, Debug)]
pub enum SimulatorError {
    #[error("Invalid configuration: {0}")]
    ConfigError(#[from] ConfigError),

    #[error("Failed to read trace: {0}")]
    TraceError(#[from] TraceError),

    #[error("Frame error: {0}")]
    FrameError(#[from] FrameError),

    #[error("IO error: {0}")]
    IoError(#[from] std::io::Error),

    #[error("CSV error: {0}")]
    CsvError(#[from] csv::Error),
}

/// Errors related to cache geometry
#[derive(Error, Debug, PartialEq)]
pub enum ConfigError {
    #[error("c={c} is smaller than b+s={b}+{s}, leaving no room for index bits")]
    NegativeIndexBits { c: u32, b: u32, s: u32 },

    #[error("c={0} does not fit a 64-bit address")]
    CapacityTooLarge(u32),
}

/// Errors related to trace files
#[derive(Error, Debug)]
pub enum TraceError {
    #[error("Failed to read trace file '{0}': {1}")]
    FileReadError(PathBuf, #[source] std::io::Error),

    #[error("Failed to parse trace file '{0}' at line {1}: {2}")]
    ParseError(PathBuf, usize, String),
}

/// Errors related to frame handles
#[derive(Error, Debug, PartialEq)]
pub enum FrameError {
    #[error("frame {0} does not exist or was freed")]
    MissingFrame(usize),
}

/// Type alias for Result with SimulatorError
pub type SimulatorResult<T> = Result<T, SimulatorError>;
