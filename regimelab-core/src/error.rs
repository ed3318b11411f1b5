//! Error taxonomy for the analytics core.
//!
//! Only two kinds of failure ever leave this crate: too little history for
//! the requested operation, and caller-supplied parameters outside their
//! domain. Numerical failure of the mixture fit is recovered internally by
//! the moving-average fallback and never surfaces here.

use thiserror::Error;

#[derive(Debug, Clone, PartialEq, Error)]
pub enum CoreError {
    #[error("insufficient data for {operation}: need {required} bars, got {available}")]
    InsufficientData {
        operation: &'static str,
        required: usize,
        available: usize,
    },

    #[error("invalid input: {0}")]
    InvalidInput(String),
}

impl CoreError {
    pub fn insufficient(operation: &'static str, required: usize, available: usize) -> Self {
        Self::InsufficientData {
            operation,
            required,
            available,
        }
    }

    /// True for errors the caller can fix by requesting a longer date range.
    pub fn is_insufficient_data(&self) -> bool {
        matches!(self, Self::InsufficientData { .. })
    }
}
