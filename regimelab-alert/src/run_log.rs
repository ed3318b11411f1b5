//! Append-only run log, one line per invocation that got past the schedule check
//! or was skipped by it.

use std::fs::OpenOptions;
use std::io::Write;
use std::path::{Path, PathBuf};
use std::time::Duration;

use chrono::DateTime;
use chrono_tz::Tz;

use crate::error::AlertError;

#[derive(Debug, Clone)]
pub struct RunLog {
    path: PathBuf,
}

impl RunLog {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    pub fn record_success(
        &self,
        at: &DateTime<Tz>,
        symbols: usize,
        changes: usize,
        runtime: Duration,
    ) -> Result<(), AlertError> {
        self.append(&format!(
            "[{}] Symbols: {symbols}, Changes: {changes}, Runtime: {:.2}s",
            stamp(at),
            runtime.as_secs_f64()
        ))
    }

    pub fn record_error(&self, at: &DateTime<Tz>, reason: &str) -> Result<(), AlertError> {
        self.append(&format!("[{}] ERROR: {reason}", stamp(at)))
    }

    /// Last `n` lines, oldest first. Empty when the log does not exist yet.
    pub fn recent(&self, n: usize) -> Result<Vec<String>, AlertError> {
        let content = match std::fs::read_to_string(&self.path) {
            Ok(c) => c,
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => return Ok(Vec::new()),
            Err(e) => return Err(self.io_error(e)),
        };
        let lines: Vec<String> = content.lines().map(str::to_string).collect();
        let skip = lines.len().saturating_sub(n);
        Ok(lines.into_iter().skip(skip).collect())
    }

    fn append(&self, line: &str) -> Result<(), AlertError> {
        if let Some(parent) = self.path.parent().filter(|p| !p.as_os_str().is_empty()) {
            std::fs::create_dir_all(parent).map_err(|e| self.io_error(e))?;
        }
        let mut file = OpenOptions::new()
            .create(true)
            .append(true)
            .open(&self.path)
            .map_err(|e| self.io_error(e))?;
        writeln!(file, "{line}").map_err(|e| self.io_error(e))
    }

    fn io_error(&self, e: std::io::Error) -> AlertError {
        AlertError::Output {
            path: self.path.clone(),
            reason: e.to_string(),
        }
    }
}

fn stamp(at: &DateTime<Tz>) -> String {
    at.format("%Y-%m-%dT%H:%M:%S%.3f").to_string()
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;

    fn at() -> DateTime<Tz> {
        chrono_tz::America::Chicago
            .with_ymd_and_hms(2024, 1, 8, 8, 5, 0)
            .unwrap()
    }

    #[test]
    fn success_and_error_lines() {
        let dir = tempfile::tempdir().unwrap();
        let log = RunLog::new(dir.path().join("out/run.log"));
        log.record_success(&at(), 12, 2, Duration::from_millis(3456))
            .unwrap();
        log.record_error(&at(), "Sun is a rest day - skipping")
            .unwrap();

        let lines = log.recent(10).unwrap();
        assert_eq!(
            lines,
            vec![
                "[2024-01-08T08:05:00.000] Symbols: 12, Changes: 2, Runtime: 3.46s",
                "[2024-01-08T08:05:00.000] ERROR: Sun is a rest day - skipping",
            ]
        );
    }

    #[test]
    fn recent_keeps_tail() {
        let dir = tempfile::tempdir().unwrap();
        let log = RunLog::new(dir.path().join("run.log"));
        assert!(log.recent(3).unwrap().is_empty());
        for i in 0..5 {
            log.record_success(&at(), i, 0, Duration::ZERO).unwrap();
        }
        let tail = log.recent(2).unwrap();
        assert_eq!(tail.len(), 2);
        assert!(tail[1].contains("Symbols: 4"));
    }
}
