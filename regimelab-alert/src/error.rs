//! Error types for the alert service.

use std::path::PathBuf;

use regimelab_core::data::DataError;
use regimelab_core::CoreError;
use thiserror::Error;

use crate::config::ConfigError;

/// Failures that abort a whole run.
///
/// Per-ticker problems are not in here: they are collected as
/// [`TickerError`]s on the run report and the run carries on.
#[derive(Debug, Error)]
pub enum AlertError {
    #[error(transparent)]
    Config(#[from] ConfigError),

    #[error("universe {path} is unusable: {reason}")]
    Universe { path: PathBuf, reason: String },

    #[error("ticker universe is empty")]
    EmptyUniverse,

    #[error("state file {path}: {source}")]
    StateIo {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("state file {path} is corrupt: {source}")]
    StateFormat {
        path: PathBuf,
        #[source]
        source: serde_json::Error,
    },

    #[error("failed to write {path}: {reason}")]
    Output { path: PathBuf, reason: String },

    #[error("alert delivery failed: {0}")]
    Delivery(String),
}

/// Why one ticker dropped out of a run.
#[derive(Debug, Error)]
pub enum TickerError {
    #[error("fetch failed: {0}")]
    Data(#[from] DataError),

    #[error("classification failed: {0}")]
    Analysis(#[from] CoreError),
}
