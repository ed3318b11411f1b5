//! One-ticker decision pipeline:
//! bars -> regime -> pattern -> signal -> Kelly sizing, with the ticker's
//! Sharpe report alongside.

use chrono::NaiveDate;
use serde::{Deserialize, Serialize};

use crate::domain::Bar;
use crate::error::CoreError;
use crate::kelly::{KellyConfig, KellyEngine, KellyResult, MarketSnapshot, SizingRequest};
use crate::patterns::{PatternConfig, PatternDetector, PatternEvent, PatternSummary};
use crate::regime::{
    ClassifierConfig, FitMethod, RegimeAssignment, RegimeClassifier, RegimeStatsTable,
};
use crate::sharpe::{SharpeCalculator, SharpeConfig, SharpeReport};
use crate::signal::{Signal, SignalCombiner, SignalConfig};

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct AnalysisConfig {
    pub classifier: ClassifierConfig,
    pub patterns: PatternConfig,
    pub signal: SignalConfig,
    pub kelly: KellyConfig,
    pub sharpe: SharpeConfig,
}

/// Full decision for one ticker as of its latest bar.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Analysis {
    pub ticker: String,
    pub as_of: NaiveDate,
    pub price: f64,
    pub regime: RegimeAssignment,
    pub method: FitMethod,
    pub stats: RegimeStatsTable,
    pub pattern: Option<PatternEvent>,
    pub pattern_summary: Option<PatternSummary>,
    pub signal: Signal,
    pub sizing: KellyResult,
    /// `None` when the history is too short for a Sharpe report.
    pub performance: Option<SharpeReport>,
}

#[derive(Debug, Clone, Default)]
pub struct Analyzer {
    classifier: RegimeClassifier,
    detector: PatternDetector,
    combiner: SignalCombiner,
    kelly: KellyEngine,
    sharpe: SharpeCalculator,
}

impl Analyzer {
    pub fn new(config: AnalysisConfig) -> Self {
        Self {
            classifier: RegimeClassifier::new(config.classifier),
            detector: PatternDetector::new(config.patterns),
            combiner: SignalCombiner::new(config.signal),
            kelly: KellyEngine::new(config.kelly),
            sharpe: SharpeCalculator::new(config.sharpe),
        }
    }

    pub fn classifier(&self) -> &RegimeClassifier {
        &self.classifier
    }

    pub fn analyze(
        &self,
        ticker: &str,
        bars: &[Bar],
        request: &SizingRequest,
    ) -> Result<Analysis, CoreError> {
        let fit = self.classifier.classify(bars)?;
        let current = fit.current().clone();

        let pattern = self.detector.current(bars);
        let pattern_summary = self.detector.summary(bars).ok();
        let weight = pattern.map_or(1.0, |p| {
            self.combiner
                .pattern_weight(pattern_summary.as_ref(), p.direction)
        });
        let signal = self
            .combiner
            .combine(current.regime, current.confidence, pattern.as_ref(), weight);

        let market = MarketSnapshot::from_bars(bars, self.kelly.config().cost_lookback)?;
        let sizing = self.kelly.size(&fit, &market, request)?;
        let performance = self.sharpe.from_bars(bars).ok();

        Ok(Analysis {
            ticker: ticker.to_string(),
            as_of: current.date,
            price: market.price,
            regime: current,
            method: fit.method().clone(),
            stats: fit.stats().clone(),
            pattern,
            pattern_summary,
            signal,
            sizing,
            performance,
        })
    }
}
