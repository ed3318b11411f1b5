//! Alert service configuration: TOML file with defaults plus env overrides.

use std::path::{Path, PathBuf};

use chrono::{Duration, NaiveTime, Weekday};
use chrono_tz::Tz;
use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::schedule::SchedulePolicy;

pub const WEBHOOK_ENV: &str = "ALERT_WEBHOOK_URL";
pub const TIMEZONE_ENV: &str = "TIMEZONE";

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("failed to read config {path}: {source}")]
    Read {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("invalid config {path}: {source}")]
    Parse {
        path: PathBuf,
        #[source]
        source: toml::de::Error,
    },

    #[error("unknown timezone '{0}'")]
    Timezone(String),

    #[error("invalid run time '{0}' (expected HH:MM)")]
    RunTime(String),

    #[error("invalid rest day '{0}'")]
    RestDay(String),

    #[error("run window {time} +/- {minutes} min crosses midnight")]
    WindowCrossesMidnight { time: String, minutes: u32 },
}

/// Everything the alert service reads from disk or the environment.
///
/// Every field has a default, so an absent or partial file is valid.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct AlertConfig {
    pub universe_path: PathBuf,
    pub state_path: PathBuf,
    pub output_dir: PathBuf,
    pub run_log_path: PathBuf,
    /// Calendar days of history fetched per ticker.
    pub lookback_days: u32,
    /// IANA zone the run windows and the rest day are evaluated in.
    pub timezone: String,
    pub run_times: Vec<String>,
    pub window_minutes: u32,
    pub rest_day: String,
    pub webhook_url: Option<String>,
    pub webhook_timeout_secs: u64,
    pub fetch_timeout_secs: u64,
}

impl Default for AlertConfig {
    fn default() -> Self {
        Self {
            universe_path: PathBuf::from("config/universe.txt"),
            state_path: PathBuf::from("data/regime_state.json"),
            output_dir: PathBuf::from("out"),
            run_log_path: PathBuf::from("out/run.log"),
            lookback_days: 270,
            timezone: "America/Chicago".into(),
            run_times: vec!["08:05".into(), "15:10".into()],
            window_minutes: 5,
            rest_day: "Sun".into(),
            webhook_url: None,
            webhook_timeout_secs: 10,
            fetch_timeout_secs: 30,
        }
    }
}

impl AlertConfig {
    pub fn from_toml(content: &str) -> Result<Self, toml::de::Error> {
        toml::from_str(content)
    }

    /// Load from `path`, or defaults when no path is given.
    pub fn load(path: Option<&Path>) -> Result<Self, ConfigError> {
        let Some(path) = path else {
            return Ok(Self::default());
        };
        let content = std::fs::read_to_string(path).map_err(|source| ConfigError::Read {
            path: path.to_path_buf(),
            source,
        })?;
        Self::from_toml(&content).map_err(|source| ConfigError::Parse {
            path: path.to_path_buf(),
            source,
        })
    }

    /// Apply `ALERT_WEBHOOK_URL` and `TIMEZONE` from the process environment.
    pub fn with_env(self) -> Self {
        self.with_overrides(|key| std::env::var(key).ok())
    }

    /// Apply overrides from an arbitrary lookup. Empty values are ignored.
    pub fn with_overrides(mut self, lookup: impl Fn(&str) -> Option<String>) -> Self {
        let non_empty = |key: &str| lookup(key).filter(|v| !v.trim().is_empty());
        if let Some(url) = non_empty(WEBHOOK_ENV) {
            self.webhook_url = Some(url);
        }
        if let Some(tz) = non_empty(TIMEZONE_ENV) {
            self.timezone = tz;
        }
        self
    }

    pub fn schedule_policy(&self) -> Result<SchedulePolicy, ConfigError> {
        let timezone: Tz = self
            .timezone
            .parse()
            .map_err(|_| ConfigError::Timezone(self.timezone.clone()))?;
        let run_times = self
            .run_times
            .iter()
            .map(|t| {
                NaiveTime::parse_from_str(t.trim(), "%H:%M")
                    .map_err(|_| ConfigError::RunTime(t.clone()))
            })
            .collect::<Result<Vec<_>, _>>()?;
        let window = Duration::minutes(i64::from(self.window_minutes));
        for t in &run_times {
            let since_midnight = t.signed_duration_since(NaiveTime::MIN);
            if since_midnight < window || since_midnight + window >= Duration::days(1) {
                return Err(ConfigError::WindowCrossesMidnight {
                    time: t.format("%H:%M").to_string(),
                    minutes: self.window_minutes,
                });
            }
        }
        let rest_day: Weekday = self
            .rest_day
            .trim()
            .parse()
            .map_err(|_| ConfigError::RestDay(self.rest_day.clone()))?;
        Ok(SchedulePolicy {
            timezone,
            run_times,
            window,
            rest_day,
        })
    }

    pub fn webhook_timeout(&self) -> std::time::Duration {
        std::time::Duration::from_secs(self.webhook_timeout_secs)
    }

    pub fn fetch_timeout(&self) -> std::time::Duration {
        std::time::Duration::from_secs(self.fetch_timeout_secs)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;

    #[test]
    fn defaults_match_service_layout() {
        let c = AlertConfig::default();
        assert_eq!(c.universe_path, PathBuf::from("config/universe.txt"));
        assert_eq!(c.run_log_path, PathBuf::from("out/run.log"));
        assert_eq!(c.lookback_days, 270);
        assert_eq!(c.run_times, vec!["08:05", "15:10"]);
        assert!(c.webhook_url.is_none());
    }

    #[test]
    fn partial_toml_keeps_defaults() {
        let c = AlertConfig::from_toml("lookback_days = 180\nrest_day = \"Sat\"\n").unwrap();
        assert_eq!(c.lookback_days, 180);
        assert_eq!(c.rest_day, "Sat");
        assert_eq!(c.timezone, "America/Chicago");
        assert_eq!(c.window_minutes, 5);
    }

    #[test]
    fn unknown_field_type_is_parse_error() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("alert.toml");
        std::fs::write(&path, "lookback_days = \"lots\"").unwrap();
        assert!(matches!(
            AlertConfig::load(Some(&path)),
            Err(ConfigError::Parse { .. })
        ));
    }

    #[test]
    fn missing_explicit_file_is_read_error() {
        let dir = tempfile::tempdir().unwrap();
        let err = AlertConfig::load(Some(&dir.path().join("nope.toml"))).unwrap_err();
        assert!(matches!(err, ConfigError::Read { .. }));
    }

    #[test]
    fn env_overrides_win_over_file() {
        let env: HashMap<&str, &str> = [
            (WEBHOOK_ENV, "https://hooks.example/abc"),
            (TIMEZONE_ENV, "America/New_York"),
        ]
        .into_iter()
        .collect();
        let c = AlertConfig::default().with_overrides(|k| env.get(k).map(|v| v.to_string()));
        assert_eq!(c.webhook_url.as_deref(), Some("https://hooks.example/abc"));
        assert_eq!(c.timezone, "America/New_York");
    }

    #[test]
    fn blank_env_values_are_ignored() {
        let c = AlertConfig::default().with_overrides(|_| Some("  ".into()));
        assert!(c.webhook_url.is_none());
        assert_eq!(c.timezone, "America/Chicago");
    }

    #[test]
    fn policy_parses_times_zone_and_rest_day() {
        let p = AlertConfig::default().schedule_policy().unwrap();
        assert_eq!(p.timezone, chrono_tz::America::Chicago);
        assert_eq!(p.run_times[1], NaiveTime::from_hms_opt(15, 10, 0).unwrap());
        assert_eq!(p.rest_day, Weekday::Sun);
        assert_eq!(p.window, Duration::minutes(5));
    }

    #[test]
    fn policy_rejects_bad_values() {
        let bad_tz = AlertConfig {
            timezone: "Mars/Olympus".into(),
            ..AlertConfig::default()
        };
        assert!(matches!(bad_tz.schedule_policy(), Err(ConfigError::Timezone(_))));

        let bad_time = AlertConfig {
            run_times: vec!["25:99".into()],
            ..AlertConfig::default()
        };
        assert!(matches!(bad_time.schedule_policy(), Err(ConfigError::RunTime(_))));

        let bad_day = AlertConfig {
            rest_day: "Funday".into(),
            ..AlertConfig::default()
        };
        assert!(matches!(bad_day.schedule_policy(), Err(ConfigError::RestDay(_))));
    }

    #[test]
    fn policy_rejects_windows_spanning_midnight() {
        for (time, minutes) in [("23:58", 5), ("00:03", 5), ("23:55", 5), ("12:00", 720)] {
            let c = AlertConfig {
                run_times: vec![time.into()],
                window_minutes: minutes,
                ..AlertConfig::default()
            };
            let err = c.schedule_policy().unwrap_err();
            assert!(
                matches!(err, ConfigError::WindowCrossesMidnight { .. }),
                "{time} +/- {minutes}"
            );
        }

        // touching midnight from inside the day is fine
        let edge = AlertConfig {
            run_times: vec!["00:05".into(), "23:54".into()],
            window_minutes: 5,
            ..AlertConfig::default()
        };
        assert!(edge.schedule_policy().is_ok());
    }
}
