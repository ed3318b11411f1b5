//! RegimeLab Alert: the scheduled regime-change monitor.
//!
//! - TOML configuration with environment overrides
//! - Pure run-window policy over an injectable clock
//! - Baseline state store, change detection and CSV outputs
//! - Webhook / log alert sinks and the append-only run log
//! - `AlertStateMachine` tying one invocation together

pub mod changes;
pub mod config;
pub mod error;
pub mod notify;
pub mod outputs;
pub mod run_log;
pub mod schedule;
pub mod service;
pub mod state;

pub use changes::{detect_changes, RegimeChange};
pub use config::{AlertConfig, ConfigError};
pub use error::{AlertError, TickerError};
pub use notify::{format_alert, AlertSink, LogSink, WebhookSink};
pub use run_log::RunLog;
pub use schedule::{evaluate, ScheduleDecision, SchedulePolicy, SkipReason};
pub use service::{
    AlertStateMachine, Delivery, RegimeCounts, RunOptions, RunPhase, RunReport, TickerFailure,
    TickerRegime,
};
pub use state::{BaselineState, StateStore};
