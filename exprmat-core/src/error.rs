//! Structured error types for the exprmat engine.

use thiserror::Error;

/// Unified error type for all matrix building and indexing operations.
#[derive(Debug, Error)]
pub enum ExprMatError {
    /// I/O error while writing an export.
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// Delimited-text error while writing an export.
    #[error("delimited text error: {0}")]
    Csv(#[from] csv::Error),

    /// Undecodable payload bytes.
    #[error("parse error: {0}")]
    Parse(String),

    /// Invalid input: empty vector sets, mixed experiments, bad arguments.
    #[error("invalid input: {0}")]
    InvalidInput(String),

    /// A quantitation type's representation does not match the matrix being built.
    #[error("type mismatch: expected {expected}, found {found}")]
    TypeMismatch { expected: String, found: String },

    /// The input graph breaks an indexing invariant (duplicate rows, no covering dimension).
    #[error("illegal state: {0}")]
    IllegalState(String),

    /// Positional access outside the matrix.
    #[error("index {index} out of bounds (len {len})")]
    IndexOutOfBounds { index: usize, len: usize },
}

/// Convenience alias used throughout the exprmat crates.
pub type Result<T> = std::result::Result<T, ExprMatError>;

impl ExprMatError {
    /// Check `index < len`, returning [`ExprMatError::IndexOutOfBounds`] otherwise.
    pub fn check_index(index: usize, len: usize) -> Result<()> {
        if index < len {
            Ok(())
        } else {
            Err(ExprMatError::IndexOutOfBounds { index, len })
        }
    }
}
