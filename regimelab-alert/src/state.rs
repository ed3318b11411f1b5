//! Persisted baseline: the last regime per ticker plus the last scheduled run date.

use std::collections::BTreeMap;
use std::path::{Path, PathBuf};

use chrono::NaiveDate;
use regimelab_core::Regime;
use serde::{Deserialize, Serialize};

use crate::error::AlertError;

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct BaselineState {
    /// Local date of the last completed scheduled run.
    #[serde(default)]
    pub last_run_date: Option<NaiveDate>,
    #[serde(default)]
    pub regimes: BTreeMap<String, Regime>,
}

/// JSON file holding the [`BaselineState`]; replaced whole on every save.
#[derive(Debug, Clone)]
pub struct StateStore {
    path: PathBuf,
}

impl StateStore {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    /// `Ok(None)` when no baseline has ever been written.
    pub fn load(&self) -> Result<Option<BaselineState>, AlertError> {
        let content = match std::fs::read_to_string(&self.path) {
            Ok(c) => c,
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => return Ok(None),
            Err(source) => {
                return Err(AlertError::StateIo {
                    path: self.path.clone(),
                    source,
                })
            }
        };
        serde_json::from_str(&content)
            .map(Some)
            .map_err(|source| AlertError::StateFormat {
                path: self.path.clone(),
                source,
            })
    }

    pub fn save(&self, state: &BaselineState) -> Result<(), AlertError> {
        let json = serde_json::to_string_pretty(state).map_err(|source| AlertError::StateFormat {
            path: self.path.clone(),
            source,
        })?;
        write_atomic(&self.path, json.as_bytes()).map_err(|source| AlertError::StateIo {
            path: self.path.clone(),
            source,
        })
    }
}

/// Write to a sibling `.tmp` file, then rename over the target.
pub(crate) fn write_atomic(path: &Path, bytes: &[u8]) -> std::io::Result<()> {
    if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
        std::fs::create_dir_all(parent)?;
    }
    let tmp = path.with_extension("tmp");
    std::fs::write(&tmp, bytes)?;
    std::fs::rename(&tmp, path)
}
