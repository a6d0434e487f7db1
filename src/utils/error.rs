//! Error types for the entire library.
//!
//! We use `thiserror` for library-style errors with custom types.
//! Lenient field handling during JSON loading is by contract not an error;
//! only structurally invalid documents fail.

use thiserror::Error;

/// Errors that can occur when loading stacktraces or reports from JSON
#[derive(Error, Debug)]
pub enum ParseError {
    #[error("JSON deserialization failed: {0}")]
    JsonError(#[from] serde_json::Error),

    #[error("Invalid document structure: {0}")]
    InvalidFormat(String),

    #[error("IO error: {0}")]
    IoError(#[from] std::io::Error),
}

/// Errors that can occur while computing hashes
#[derive(Error, Debug)]
pub enum HashError {
    #[error("Invalid frame count: {0} (must not be negative)")]
    InvalidFrameCount(i32),
}

/// Errors that can occur on the report envelope
#[derive(Error, Debug)]
pub enum ReportError {
    #[error("Invalid report type: {0:?}")]
    InvalidReportType(String),

    #[error("Field is immutable: {0}")]
    ImmutableField(&'static str),
}

/// Errors that can occur in the distance matrix engine
#[derive(Error, Debug)]
pub enum MatrixError {
    #[error("Need at least two sequences to build a distance matrix, got {0}")]
    TooFewSequences(usize),

    #[error("Partition count must be at least 1")]
    ZeroPartitions,

    #[error("No partitions supplied to merge")]
    NoParts,

    #[error("Partition has not been computed yet")]
    PartNotComputed,

    #[error("Partitions disagree on {0}")]
    MismatchedParts(&'static str),

    #[error("Partitions do not cover the matrix: expected {expected} entries, got {got}")]
    IncompleteCoverage { expected: usize, got: usize },

    #[error("Wrong number of sequences: partition was created for {expected}, got {got}")]
    WrongSequenceCount { expected: usize, got: usize },
}
