//! CSV artifacts of a completed run.
//!
//! - `today_regimes.csv`: ticker, last_price, regime, confidence, timestamp (every run)
//! - `changes.csv`: ticker, from_regime, to_regime, timestamp (only when something changed)

use std::path::{Path, PathBuf};

use chrono::DateTime;
use chrono_tz::Tz;

use crate::changes::RegimeChange;
use crate::error::AlertError;
use crate::service::TickerRegime;
use crate::state::write_atomic;

pub const TODAY_FILE: &str = "today_regimes.csv";
const TODAY_HEADER: [&str; 5] = ["ticker", "last_price", "regime", "confidence", "timestamp"];
pub const CHANGES_FILE: &str = "changes.csv";

fn output_error(path: &Path, reason: impl ToString) -> AlertError {
    AlertError::Output {
        path: path.to_path_buf(),
        reason: reason.to_string(),
    }
}

fn finish(path: &Path, wtr: csv::Writer<Vec<u8>>) -> Result<(), AlertError> {
    let bytes = wtr.into_inner().map_err(|e| output_error(path, e))?;
    write_atomic(path, &bytes).map_err(|e| output_error(path, e))
}

pub fn write_today(
    dir: &Path,
    rows: &[TickerRegime],
    timestamp: &DateTime<Tz>,
) -> Result<PathBuf, AlertError> {
    let path = dir.join(TODAY_FILE);
    let ts = timestamp.to_rfc3339();
    let mut wtr = csv::Writer::from_writer(vec![]);
    wtr.write_record(TODAY_HEADER)
        .map_err(|e| output_error(&path, e))?;
    for row in rows {
        wtr.write_record([
            row.ticker.as_str(),
            &format!("{:.2}", row.last_price),
            row.regime.as_str(),
            &format!("{:.3}", row.confidence),
            &ts,
        ])
        .map_err(|e| output_error(&path, e))?;
    }
    finish(&path, wtr)?;
    Ok(path)
}

/// Returns `None` and leaves any previous file alone when `changes` is empty.
pub fn write_changes(
    dir: &Path,
    changes: &[RegimeChange],
    timestamp: &DateTime<Tz>,
) -> Result<Option<PathBuf>, AlertError> {
    if changes.is_empty() {
        return Ok(None);
    }
    let path = dir.join(CHANGES_FILE);
    let ts = timestamp.to_rfc3339();
    let mut wtr = csv::Writer::from_writer(vec![]);
    wtr.write_record(["ticker", "from_regime", "to_regime", "timestamp"])
        .map_err(|e| output_error(&path, e))?;
    for change in changes {
        wtr.write_record([
            change.ticker.as_str(),
            change.from.as_str(),
            change.to.as_str(),
            &ts,
        ])
        .map_err(|e| output_error(&path, e))?;
    }
    finish(&path, wtr)?;
    Ok(Some(path))
}
