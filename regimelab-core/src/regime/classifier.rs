use chrono::NaiveDate;
use serde::{Deserialize, Serialize};
use tracing::{debug, warn};

use super::fallback::MovingAverageRule;
use super::mixture::{FitFailure, GaussianMixture, MixtureConfig};
use super::scaler::StandardScaler;
use super::stats::RegimeStatsTable;
use crate::domain::{Bar, Regime, RegimeProbabilities};
use crate::error::CoreError;
use crate::features::{FeatureConfig, FeatureExtractor, FeatureSet, FEATURE_COUNT};
use crate::indicators::Returns;

/// Confidence reported on every fallback assignment.
pub const FALLBACK_CONFIDENCE: f64 = 0.5;

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct ClassifierConfig {
    pub features: FeatureConfig,
    pub max_iterations: usize,
    pub tolerance: f64,
    pub restarts: usize,
    pub seed: u64,
    /// Below this many bars the mixture is not attempted.
    pub min_fit_bars: usize,
    /// Minimum population std of the return feature for a mixture fit.
    pub min_return_std: f64,
    pub fallback: MovingAverageRule,
}

impl Default for ClassifierConfig {
    fn default() -> Self {
        Self {
            features: FeatureConfig::default(),
            max_iterations: 100,
            tolerance: 1e-3,
            restarts: 3,
            seed: 42,
            min_fit_bars: 60,
            min_return_std: 1e-10,
            fallback: MovingAverageRule::default(),
        }
    }
}

impl ClassifierConfig {
    fn mixture(&self) -> MixtureConfig {
        MixtureConfig {
            n_components: Regime::ALL.len(),
            max_iter: self.max_iterations,
            tolerance: self.tolerance,
            n_init: self.restarts,
            seed: self.seed,
            ..MixtureConfig::default()
        }
    }
}

/// Why the moving-average rule produced the fit.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum FallbackReason {
    ShortHistory { bars: usize, required: usize },
    LowVariance,
    Numerical { detail: String },
}

impl std::fmt::Display for FallbackReason {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::ShortHistory { bars, required } => {
                write!(f, "short history ({bars} bars, mixture needs {required})")
            }
            Self::LowVariance => write!(f, "insufficient feature variance"),
            Self::Numerical { detail } => write!(f, "numerical failure: {detail}"),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "method", rename_all = "snake_case")]
pub enum FitMethod {
    Mixture {
        iterations: usize,
        converged: bool,
        log_likelihood: f64,
    },
    MovingAverage {
        reason: FallbackReason,
    },
}

impl FitMethod {
    pub fn is_fallback(&self) -> bool {
        matches!(self, Self::MovingAverage { .. })
    }
}

/// Regime assigned to one bar.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RegimeAssignment {
    pub bar_index: usize,
    pub date: NaiveDate,
    pub regime: Regime,
    /// Probability of the assigned regime.
    pub confidence: f64,
    pub probabilities: RegimeProbabilities,
    /// Close-to-close return of this bar.
    pub ret: f64,
}

/// Result of one classification call. Holds at least one assignment.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RegimeFit {
    method: FitMethod,
    assignments: Vec<RegimeAssignment>,
    stats: RegimeStatsTable,
}

impl RegimeFit {
    fn new(method: FitMethod, assignments: Vec<RegimeAssignment>) -> Self {
        let regimes: Vec<Regime> = assignments.iter().map(|a| a.regime).collect();
        let returns: Vec<f64> = assignments.iter().map(|a| a.ret).collect();
        let stats = RegimeStatsTable::compute(&regimes, &returns);
        Self {
            method,
            assignments,
            stats,
        }
    }

    pub fn method(&self) -> &FitMethod {
        &self.method
    }

    pub fn assignments(&self) -> &[RegimeAssignment] {
        &self.assignments
    }

    pub fn stats(&self) -> &RegimeStatsTable {
        &self.stats
    }

    /// Assignment for the most recent bar.
    pub fn current(&self) -> &RegimeAssignment {
        &self.assignments[self.assignments.len() - 1]
    }

    /// The last `n` regimes, oldest first.
    pub fn recent_regimes(&self, n: usize) -> Vec<Regime> {
        let start = self.assignments.len().saturating_sub(n);
        self.assignments[start..].iter().map(|a| a.regime).collect()
    }

    pub fn len(&self) -> usize {
        self.assignments.len()
    }

    pub fn is_empty(&self) -> bool {
        self.assignments.is_empty()
    }
}

#[derive(Debug, Clone, Default)]
pub struct RegimeClassifier {
    config: ClassifierConfig,
    extractor: FeatureExtractor,
}

impl RegimeClassifier {
    pub fn new(config: ClassifierConfig) -> Self {
        let extractor = FeatureExtractor::new(config.features.clone());
        Self { config, extractor }
    }

    pub fn config(&self) -> &ClassifierConfig {
        &self.config
    }

    /// Classify every usable bar. Fails only when not even the fallback
    /// moving averages can be computed.
    pub fn classify(&self, bars: &[Bar]) -> Result<RegimeFit, CoreError> {
        let required = self.config.min_fit_bars.max(self.config.features.min_bars);
        if bars.len() < required {
            let reason = FallbackReason::ShortHistory {
                bars: bars.len(),
                required,
            };
            debug!(%reason, "skipping mixture fit");
            return self.fallback(bars, reason);
        }

        let features = match self.extractor.extract(bars) {
            Ok(features) => features,
            Err(e) => {
                let reason = match e {
                    CoreError::InsufficientData {
                        required,
                        available,
                        ..
                    } => FallbackReason::ShortHistory {
                        bars: available,
                        required,
                    },
                    other => FallbackReason::Numerical {
                        detail: other.to_string(),
                    },
                };
                return self.fallback(bars, reason);
            }
        };

        match self.fit_mixture(&features) {
            Ok(fit) => Ok(fit),
            Err(reason) => {
                warn!(%reason, "mixture fit unavailable, using moving-average fallback");
                self.fallback(bars, reason)
            }
        }
    }

    fn fit_mixture(&self, features: &FeatureSet) -> Result<RegimeFit, FallbackReason> {
        let matrix = features.matrix();
        let scaler = StandardScaler::<FEATURE_COUNT>::fit(&matrix);
        if scaler.stds()[0] < self.config.min_return_std {
            return Err(FallbackReason::LowVariance);
        }
        let scaled = scaler.transform(&matrix);

        let model =
            GaussianMixture::fit(&scaled, &self.config.mixture()).map_err(numerical)?;
        let proba = model.predict_proba(&scaled);
        let returns = features.returns();

        let clusters: Vec<usize> = proba.iter().map(|row| argmax(row)).collect();
        let regime_of = relabel_by_mean_return(&clusters, &returns, model.n_components())
            .map_err(numerical)?;

        let assignments = proba
            .iter()
            .zip(&clusters)
            .enumerate()
            .map(|(k, (row, &cluster))| {
                let mut weights = [0.0; 3];
                for (j, p) in row.iter().enumerate() {
                    weights[regime_of[j].index()] += p;
                }
                let probabilities = RegimeProbabilities::from_weights(weights);
                let regime = regime_of[cluster];
                RegimeAssignment {
                    bar_index: features.offset + k,
                    date: features.dates[k],
                    regime,
                    confidence: probabilities.get(regime),
                    probabilities,
                    ret: returns[k],
                }
            })
            .collect();

        Ok(RegimeFit::new(
            FitMethod::Mixture {
                iterations: model.iterations(),
                converged: model.converged(),
                log_likelihood: model.log_likelihood(),
            },
            assignments,
        ))
    }

    fn fallback(&self, bars: &[Bar], reason: FallbackReason) -> Result<RegimeFit, CoreError> {
        let series = self.config.fallback.classify_series(bars)?;
        let returns = Returns::series(bars);

        let assignments = series
            .into_iter()
            .map(|(i, regime)| RegimeAssignment {
                bar_index: i,
                date: bars[i].date,
                regime,
                confidence: FALLBACK_CONFIDENCE,
                probabilities: RegimeProbabilities::concentrated(regime, FALLBACK_CONFIDENCE),
                ret: if returns[i].is_finite() {
                    returns[i]
                } else {
                    0.0
                },
            })
            .collect();

        let method = FitMethod::MovingAverage { reason };
        Ok(RegimeFit::new(method, assignments))
    }
}

fn numerical(e: FitFailure) -> FallbackReason {
    FallbackReason::Numerical { detail: e.0 }
}

fn argmax(row: &[f64]) -> usize {
    let mut best = 0;
    for (j, p) in row.iter().enumerate() {
        if *p > row[best] {
            best = j;
        }
    }
    best
}

/// Map raw cluster ids to regimes by ascending mean return of the bars each
/// cluster owns. Every cluster must own at least one bar.
fn relabel_by_mean_return(
    clusters: &[usize],
    returns: &[f64],
    k: usize,
) -> Result<Vec<Regime>, FitFailure> {
    let mut sums = vec![0.0; k];
    let mut counts = vec![0usize; k];
    for (&c, &r) in clusters.iter().zip(returns) {
        sums[c] += r;
        counts[c] += 1;
    }
    if let Some(empty) = counts.iter().position(|&n| n == 0) {
        return Err(FitFailure(format!("component {empty} owns no bars")));
    }

    let means: Vec<f64> = sums
        .iter()
        .zip(&counts)
        .map(|(s, &n)| s / n as f64)
        .collect();
    let mut order: Vec<usize> = (0..k).collect();
    order.sort_by(|&a, &b| means[a].total_cmp(&means[b]));

    let mut regime_of = vec![Regime::Sideways; k];
    for (rank, &cluster) in order.iter().enumerate() {
        regime_of[cluster] = Regime::from_index(rank)
            .ok_or_else(|| FitFailure(format!("no regime for rank {rank}")))?;
    }
    Ok(regime_of)
}
