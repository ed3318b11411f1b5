//! AlertStateMachine: one scheduled pass over the ticker universe.
//!
//! ```text
//! NotDue ──(in window, not yet run today)──> Due ──> Running ──> Completed
//!    └──────(rest day / already ran today)──────────────────────> Skipped
//! ```
//!
//! A completed run writes the CSV outputs and the new baseline, then tries to
//! deliver an alert. Delivery is best-effort; the baseline is persisted
//! before delivery is attempted and regardless of its outcome.

use std::collections::BTreeMap;
use std::path::PathBuf;
use std::sync::Arc;
use std::time::Instant;

use chrono::Duration;
use regimelab_core::clock::{Clock, SystemClock};
use regimelab_core::data::{DataProvider, Universe};
use regimelab_core::regime::RegimeClassifier;
use regimelab_core::Regime;
use serde::Serialize;
use tracing::{debug, info, warn};

use crate::changes::{detect_changes, RegimeChange};
use crate::config::AlertConfig;
use crate::error::{AlertError, TickerError};
use crate::notify::{format_alert, AlertSink};
use crate::outputs;
use crate::run_log::RunLog;
use crate::schedule::{evaluate, ScheduleDecision, SchedulePolicy, SkipReason};
use crate::state::{BaselineState, StateStore};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum RunPhase {
    NotDue,
    Due,
    Running,
    Completed,
    Skipped,
}

#[derive(Debug, Clone, Copy, Default)]
pub struct RunOptions {
    /// Dispatch an alert even when nothing changed.
    pub force_alert: bool,
    /// Ignore run windows and the rest day. The run date is not recorded, so
    /// the scheduled run later that day still happens.
    pub skip_schedule_check: bool,
}

/// Latest regime for one ticker.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct TickerRegime {
    pub ticker: String,
    pub last_price: f64,
    pub regime: Regime,
    pub confidence: f64,
    /// Classified by the moving-average fallback rather than the mixture fit.
    pub fallback: bool,
}

#[derive(Debug)]
pub struct TickerFailure {
    pub ticker: String,
    pub error: TickerError,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Delivery {
    /// Nothing changed and no alert was forced.
    NotNeeded,
    /// No baseline existed yet, so there was nothing to compare against.
    Suppressed,
    Delivered { sink: String },
    Failed { sink: String, reason: String },
}

/// Bull/Sideways/Bear counts for the console summary.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct RegimeCounts {
    pub bull: usize,
    pub sideways: usize,
    pub bear: usize,
}

#[derive(Debug)]
pub struct RunReport {
    pub phase: RunPhase,
    pub skip_reason: Option<SkipReason>,
    pub results: Vec<TickerRegime>,
    pub failures: Vec<TickerFailure>,
    pub changes: Vec<RegimeChange>,
    pub had_baseline: bool,
    pub delivery: Delivery,
    pub today_path: Option<PathBuf>,
    pub changes_path: Option<PathBuf>,
    pub runtime: std::time::Duration,
}

impl RunReport {
    fn idle(phase: RunPhase, skip_reason: Option<SkipReason>) -> Self {
        Self {
            phase,
            skip_reason,
            results: Vec::new(),
            failures: Vec::new(),
            changes: Vec::new(),
            had_baseline: false,
            delivery: Delivery::NotNeeded,
            today_path: None,
            changes_path: None,
            runtime: std::time::Duration::ZERO,
        }
    }

    pub fn counts(&self) -> RegimeCounts {
        let mut counts = RegimeCounts::default();
        for r in &self.results {
            match r.regime {
                Regime::Bull => counts.bull += 1,
                Regime::Sideways => counts.sideways += 1,
                Regime::Bear => counts.bear += 1,
            }
        }
        counts
    }
}

pub struct AlertStateMachine<P: DataProvider> {
    config: AlertConfig,
    policy: SchedulePolicy,
    provider: P,
    classifier: RegimeClassifier,
    sink: Box<dyn AlertSink>,
    clock: Arc<dyn Clock>,
    store: StateStore,
    run_log: RunLog,
    phase: RunPhase,
}

impl<P: DataProvider> AlertStateMachine<P> {
    pub fn new(
        config: AlertConfig,
        provider: P,
        sink: Box<dyn AlertSink>,
    ) -> Result<Self, AlertError> {
        let policy = config.schedule_policy()?;
        Ok(Self {
            store: StateStore::new(&config.state_path),
            run_log: RunLog::new(&config.run_log_path),
            config,
            policy,
            provider,
            classifier: RegimeClassifier::default(),
            sink,
            clock: Arc::new(SystemClock),
            phase: RunPhase::NotDue,
        })
    }

    pub fn with_clock(mut self, clock: Arc<dyn Clock>) -> Self {
        self.clock = clock;
        self
    }

    pub fn with_classifier(mut self, classifier: RegimeClassifier) -> Self {
        self.classifier = classifier;
        self
    }

    pub fn phase(&self) -> RunPhase {
        self.phase
    }

    pub fn policy(&self) -> &SchedulePolicy {
        &self.policy
    }

    /// Schedule check only; no side effects.
    pub fn check(&mut self) -> Result<ScheduleDecision, AlertError> {
        let last_run = self.store.load()?.and_then(|s| s.last_run_date);
        let decision = evaluate(self.clock.now(), last_run, &self.policy);
        self.phase = match decision {
            ScheduleDecision::Due => RunPhase::Due,
            ScheduleDecision::NotDue => RunPhase::NotDue,
            ScheduleDecision::Skipped(_) => RunPhase::Skipped,
        };
        Ok(decision)
    }

    /// One invocation: schedule check, then a full pass if due.
    ///
    /// `NotDue` returns without touching any file. `Skipped` appends the reason
    /// to the run log. An `Err` means the run failed as a whole, including a
    /// baseline that cannot be read for the schedule check; the failure is
    /// appended to the run log and the machine is left `Due` for a retry.
    pub fn run(
        &mut self,
        universe: &Universe,
        options: RunOptions,
    ) -> Result<RunReport, AlertError> {
        if !options.skip_schedule_check {
            let decision = match self.check() {
                Ok(decision) => decision,
                Err(e) => return Err(self.fail(e)),
            };
            match decision {
                ScheduleDecision::NotDue => {
                    debug!("outside run windows, nothing to do");
                    return Ok(RunReport::idle(RunPhase::NotDue, None));
                }
                ScheduleDecision::Skipped(reason) => {
                    info!(%reason, "run skipped");
                    let at = self.policy.local_time(self.clock.now());
                    if let Err(e) = self.run_log.record_error(&at, &reason.to_string()) {
                        warn!(error = %e, "failed to append to run log");
                    }
                    return Ok(RunReport::idle(RunPhase::Skipped, Some(reason)));
                }
                ScheduleDecision::Due => {}
            }
        }

        self.phase = RunPhase::Running;
        let started = Instant::now();
        match self.execute(universe, options, started) {
            Ok(report) => {
                self.phase = RunPhase::Completed;
                Ok(report)
            }
            Err(e) => Err(self.fail(e)),
        }
    }

    /// Record a whole-run failure and leave the machine ready for a retry.
    fn fail(&mut self, error: AlertError) -> AlertError {
        self.phase = RunPhase::Due;
        let at = self.policy.local_time(self.clock.now());
        if let Err(log_err) = self.run_log.record_error(&at, &error.to_string()) {
            warn!(error = %log_err, "failed to append to run log");
        }
        error
    }

    fn execute(
        &self,
        universe: &Universe,
        options: RunOptions,
        started: Instant,
    ) -> Result<RunReport, AlertError> {
        if universe.is_empty() {
            return Err(AlertError::EmptyUniverse);
        }
        let now = self.clock.now();
        let local_now = self.policy.local_time(now);
        let today = local_now.date_naive();
        let start = today - Duration::days(i64::from(self.config.lookback_days));
        let previous = self.store.load()?;

        info!(
            tickers = universe.len(),
            provider = self.provider.name(),
            %today,
            "starting regime detection"
        );

        let mut results = Vec::with_capacity(universe.len());
        let mut failures = Vec::new();
        for ticker in universe.tickers() {
            match self.classify_ticker(ticker, start, today) {
                Ok(r) => {
                    debug!(
                        ticker = %r.ticker,
                        regime = %r.regime,
                        confidence = r.confidence,
                        "classified"
                    );
                    results.push(r);
                }
                Err(error) => {
                    warn!(%ticker, %error, "ticker failed, skipping");
                    failures.push(TickerFailure {
                        ticker: ticker.clone(),
                        error,
                    });
                }
            }
        }

        let current: BTreeMap<String, Regime> = results
            .iter()
            .map(|r| (r.ticker.clone(), r.regime))
            .collect();
        let changes = previous
            .as_ref()
            .map(|p| detect_changes(&p.regimes, &current))
            .unwrap_or_default();

        let today_path = outputs::write_today(&self.config.output_dir, &results, &local_now)?;
        let changes_path = outputs::write_changes(&self.config.output_dir, &changes, &local_now)?;

        // Failed tickers keep their previous regime so the next run can still
        // detect a change for them.
        let mut regimes = current;
        if let Some(prev) = &previous {
            for failure in &failures {
                if let Some(&regime) = prev.regimes.get(&failure.ticker) {
                    regimes.insert(failure.ticker.clone(), regime);
                }
            }
        }
        let last_run_date = if options.skip_schedule_check {
            previous.as_ref().and_then(|p| p.last_run_date)
        } else {
            Some(today)
        };
        self.store.save(&BaselineState {
            last_run_date,
            regimes,
        })?;

        let had_baseline = previous.is_some();
        let delivery = self.dispatch(&changes, had_baseline, options.force_alert);

        // The run is complete once the baseline is saved; the log line is
        // best-effort like delivery.
        let runtime = started.elapsed();
        if let Err(e) = self
            .run_log
            .record_success(&local_now, results.len(), changes.len(), runtime)
        {
            warn!(error = %e, "failed to append to run log");
        }
        info!(
            symbols = results.len(),
            failed = failures.len(),
            changes = changes.len(),
            runtime_secs = runtime.as_secs_f64(),
            "run completed"
        );

        Ok(RunReport {
            phase: RunPhase::Completed,
            skip_reason: None,
            results,
            failures,
            changes,
            had_baseline,
            delivery,
            today_path: Some(today_path),
            changes_path,
            runtime,
        })
    }

    fn classify_ticker(
        &self,
        ticker: &str,
        start: chrono::NaiveDate,
        end: chrono::NaiveDate,
    ) -> Result<TickerRegime, TickerError> {
        let bars = self.provider.fetch(ticker, start, end)?;
        let fit = self.classifier.classify(&bars)?;
        let current = fit.current();
        Ok(TickerRegime {
            ticker: ticker.to_string(),
            last_price: bars[current.bar_index].close,
            regime: current.regime,
            confidence: current.confidence,
            fallback: fit.method().is_fallback(),
        })
    }

    fn dispatch(&self, changes: &[RegimeChange], had_baseline: bool, force: bool) -> Delivery {
        if !force {
            if !had_baseline {
                info!("no previous baseline, alert suppressed");
                return Delivery::Suppressed;
            }
            if changes.is_empty() {
                return Delivery::NotNeeded;
            }
        }
        let message = format_alert(changes);
        let sink = self.sink.name().to_string();
        match self.sink.deliver(&message) {
            Ok(()) => {
                info!(%sink, changes = changes.len(), "alert sent");
                Delivery::Delivered { sink }
            }
            Err(e) => {
                warn!(%sink, error = %e, %message, "alert delivery failed");
                Delivery::Failed {
                    sink,
                    reason: e.to_string(),
                }
            }
        }
    }
}
