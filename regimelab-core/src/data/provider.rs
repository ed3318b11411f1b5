//! Data provider trait and structured error types.
//!
//! The DataProvider trait abstracts over data sources (Yahoo Finance, CSV
//! files) so the alert service and the CLI can swap implementations and tests
//! can feed synthetic series.

use std::sync::Arc;

use chrono::NaiveDate;
use thiserror::Error;

use crate::domain::Bar;

#[derive(Debug, Error)]
pub enum DataError {
    #[error("network unreachable: {0}")]
    NetworkUnreachable(String),

    #[error("rate limited by provider (retry after {retry_after_secs}s)")]
    RateLimited { retry_after_secs: u64 },

    #[error("response format changed: {0}")]
    ResponseFormatChanged(String),

    #[error("symbol not found: {symbol}")]
    SymbolNotFound { symbol: String },

    #[error("no usable bars for {symbol} between {start} and {end}")]
    NoData {
        symbol: String,
        start: NaiveDate,
        end: NaiveDate,
    },

    #[error("I/O error: {0}")]
    Io(String),

    #[error("parse error: {0}")]
    Parse(String),

    #[error("data error: {0}")]
    Other(String),
}

/// Source of daily bars.
///
/// Implementations return cleaned bars (sane, ascending, one per date) inside
/// `[start, end]`, or `DataError::NoData` when nothing usable remains.
pub trait DataProvider: Send + Sync {
    /// Human-readable name of this provider.
    fn name(&self) -> &str;

    fn fetch(&self, symbol: &str, start: NaiveDate, end: NaiveDate) -> Result<Vec<Bar>, DataError>;
}

impl<P: DataProvider + ?Sized> DataProvider for Box<P> {
    fn name(&self) -> &str {
        (**self).name()
    }

    fn fetch(&self, symbol: &str, start: NaiveDate, end: NaiveDate) -> Result<Vec<Bar>, DataError> {
        (**self).fetch(symbol, start, end)
    }
}

impl<P: DataProvider + ?Sized> DataProvider for Arc<P> {
    fn name(&self) -> &str {
        (**self).name()
    }

    fn fetch(&self, symbol: &str, start: NaiveDate, end: NaiveDate) -> Result<Vec<Bar>, DataError> {
        (**self).fetch(symbol, start, end)
    }
}

/// Restrict to `[start, end]` and fail with `NoData` if nothing is left.
pub(crate) fn within_range(
    symbol: &str,
    bars: Vec<Bar>,
    start: NaiveDate,
    end: NaiveDate,
) -> Result<Vec<Bar>, DataError> {
    let bars: Vec<Bar> = crate::domain::clean_bars(bars)
        .into_iter()
        .filter(|b| b.date >= start && b.date <= end)
        .collect();
    if bars.is_empty() {
        return Err(DataError::NoData {
            symbol: symbol.to_string(),
            start,
            end,
        });
    }
    Ok(bars)
}
