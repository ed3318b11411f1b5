//! Offline provider reading `{dir}/{SYMBOL}.csv`.
//!
//! Expected header: `date,open,high,low,close,volume` with ISO dates.

use std::fs;
use std::path::{Path, PathBuf};

use chrono::NaiveDate;

use super::provider::{within_range, DataError, DataProvider};
use crate::domain::Bar;

#[derive(Debug, Clone)]
pub struct CsvProvider {
    dir: PathBuf,
}

impl CsvProvider {
    pub fn new(dir: impl Into<PathBuf>) -> Self {
        Self { dir: dir.into() }
    }

    pub fn path_for(&self, symbol: &str) -> PathBuf {
        self.dir.join(format!("{}.csv", symbol.to_ascii_uppercase()))
    }

    /// Read every row of a bar file without range filtering.
    pub fn read_file(path: &Path) -> Result<Vec<Bar>, DataError> {
        let mut reader = csv::Reader::from_path(path)
            .map_err(|e| DataError::Io(format!("{}: {e}", path.display())))?;
        reader
            .deserialize::<Bar>()
            .enumerate()
            .map(|(i, row)| {
                row.map_err(|e| DataError::Parse(format!("{} row {}: {e}", path.display(), i + 1)))
            })
            .collect()
    }

    /// Write bars in the format `read_file` accepts. Atomic: `.tmp` then rename.
    pub fn write_file(path: &Path, bars: &[Bar]) -> Result<(), DataError> {
        if let Some(parent) = path.parent() {
            fs::create_dir_all(parent).map_err(|e| DataError::Io(e.to_string()))?;
        }
        let tmp_path = path.with_extension("csv.tmp");
        {
            let mut wtr = csv::Writer::from_path(&tmp_path)
                .map_err(|e| DataError::Io(format!("{}: {e}", tmp_path.display())))?;
            for bar in bars {
                wtr.serialize(bar)
                    .map_err(|e| DataError::Io(format!("csv write: {e}")))?;
            }
            wtr.flush().map_err(|e| DataError::Io(e.to_string()))?;
        }
        fs::rename(&tmp_path, path).map_err(|e| {
            let _ = fs::remove_file(&tmp_path);
            DataError::Io(format!("atomic rename failed: {e}"))
        })
    }
}

impl DataProvider for CsvProvider {
    fn name(&self) -> &str {
        "csv"
    }

    fn fetch(&self, symbol: &str, start: NaiveDate, end: NaiveDate) -> Result<Vec<Bar>, DataError> {
        let path = self.path_for(symbol);
        if !path.exists() {
            return Err(DataError::SymbolNotFound {
                symbol: symbol.to_string(),
            });
        }
        within_range(symbol, Self::read_file(&path)?, start, end)
    }
}
