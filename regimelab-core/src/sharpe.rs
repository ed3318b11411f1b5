//! Sharpe ratio and drawdown over daily return series.
//!
//! # Metrics
//! ```text
//! annual_return     = mean(r) * periods_per_year
//! annual_volatility = std(r) * sqrt(periods_per_year)
//! sharpe            = (annual_return - risk_free_rate) / annual_volatility
//! equity_t          = prod_{s<=t} (1 + r_s)
//! max_drawdown      = max_t (peak_t - equity_t) / peak_t
//! ```
//!
//! Non-finite returns (the warmup `NaN` of [`Returns::series`], a zero
//! close) are dropped before anything is computed.

use std::collections::BTreeSet;
use std::fmt;

use chrono::NaiveDate;
use serde::{Deserialize, Serialize};

use crate::domain::Bar;
use crate::error::CoreError;
use crate::indicators::{mean, sample_std, Returns};

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct SharpeConfig {
    /// Annual risk-free rate (0.045 = 4.5%).
    pub risk_free_rate: f64,
    pub periods_per_year: f64,
    /// Fewest returns accepted for a report.
    pub min_observations: usize,
}

impl Default for SharpeConfig {
    fn default() -> Self {
        Self {
            risk_free_rate: 0.045,
            periods_per_year: 252.0,
            min_observations: 30,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SharpeRating {
    Excellent,
    VeryGood,
    Good,
    Acceptable,
    Poor,
    VeryPoor,
}

impl SharpeRating {
    /// Bands at 2.0, 1.5, 1.0, 0.5 and 0.
    pub fn from_ratio(sharpe: f64) -> Self {
        if sharpe >= 2.0 {
            Self::Excellent
        } else if sharpe >= 1.5 {
            Self::VeryGood
        } else if sharpe >= 1.0 {
            Self::Good
        } else if sharpe >= 0.5 {
            Self::Acceptable
        } else if sharpe >= 0.0 {
            Self::Poor
        } else {
            Self::VeryPoor
        }
    }

    /// How the ratio compares with broad market benchmarks.
    pub fn benchmark(self) -> &'static str {
        match self {
            Self::Excellent => {
                "Outstanding performance: significantly outperforms most benchmarks"
            }
            Self::VeryGood => "Strong performance: beats most market indices",
            Self::Good => "Good performance: competitive with major indices",
            Self::Acceptable => "Moderate performance: below average market returns",
            Self::Poor | Self::VeryPoor => {
                "Poor performance: significantly underperforms benchmarks"
            }
        }
    }
}

impl fmt::Display for SharpeRating {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Excellent => write!(f, "Excellent"),
            Self::VeryGood => write!(f, "Very Good"),
            Self::Good => write!(f, "Good"),
            Self::Acceptable => write!(f, "Acceptable"),
            Self::Poor => write!(f, "Poor"),
            Self::VeryPoor => write!(f, "Very Poor"),
        }
    }
}

/// Risk-adjusted summary of one return series.
///
/// Returns, volatility and drawdown are fractions (0.12 = 12%).
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct SharpeReport {
    pub observations: usize,
    pub annual_return: f64,
    pub annual_volatility: f64,
    pub risk_free_rate: f64,
    /// 0 when the series has no volatility.
    pub sharpe_ratio: f64,
    pub rating: SharpeRating,
    /// Largest peak-to-trough loss of the compounded series, as a magnitude.
    pub max_drawdown: f64,
    /// Share of positive returns.
    pub win_rate: f64,
    /// Compounded return over the whole series.
    pub total_return: f64,
}

#[derive(Debug, Clone, Default)]
pub struct SharpeCalculator {
    config: SharpeConfig,
}

impl SharpeCalculator {
    pub fn new(config: SharpeConfig) -> Self {
        Self { config }
    }

    pub fn config(&self) -> &SharpeConfig {
        &self.config
    }

    /// Report over close-to-close returns of `bars`.
    pub fn from_bars(&self, bars: &[Bar]) -> Result<SharpeReport, CoreError> {
        self.evaluate(&Returns::series(bars))
    }

    pub fn evaluate(&self, returns: &[f64]) -> Result<SharpeReport, CoreError> {
        self.validate()?;
        let returns: Vec<f64> = returns.iter().copied().filter(|r| r.is_finite()).collect();
        let required = self.config.min_observations.max(2);
        if returns.len() < required {
            return Err(CoreError::insufficient(
                "Sharpe ratio",
                required,
                returns.len(),
            ));
        }

        let periods = self.config.periods_per_year;
        let annual_return = mean(&returns) * periods;
        let annual_volatility = sample_std(&returns) * periods.sqrt();
        let sharpe_ratio = if annual_volatility > 0.0 {
            (annual_return - self.config.risk_free_rate) / annual_volatility
        } else {
            0.0
        };
        let wins = returns.iter().filter(|r| **r > 0.0).count();
        let total_return = returns.iter().fold(1.0, |equity, r| equity * (1.0 + r)) - 1.0;

        Ok(SharpeReport {
            observations: returns.len(),
            annual_return,
            annual_volatility,
            risk_free_rate: self.config.risk_free_rate,
            sharpe_ratio,
            rating: SharpeRating::from_ratio(sharpe_ratio),
            max_drawdown: max_drawdown(&returns),
            win_rate: wins as f64 / returns.len() as f64,
            total_return,
        })
    }

    /// Report over the weighted sum of several return series.
    ///
    /// Series are aligned on their most recent value and cut to the shortest
    /// one. A row where any member return is non-finite is dropped. Weights
    /// are applied as given, not normalised.
    pub fn portfolio(
        &self,
        series: &[Vec<f64>],
        weights: &[f64],
    ) -> Result<SharpeReport, CoreError> {
        if series.is_empty() || series.len() != weights.len() {
            return Err(CoreError::InvalidInput(format!(
                "{} return series for {} weights",
                series.len(),
                weights.len()
            )));
        }
        if weights.iter().any(|w| !w.is_finite()) {
            return Err(CoreError::InvalidInput("weights must be finite".into()));
        }

        let len = series.iter().map(Vec::len).min().unwrap_or(0);
        let combined: Vec<f64> = (0..len)
            .filter_map(|i| {
                let mut total = 0.0;
                for (s, w) in series.iter().zip(weights) {
                    let r = s[s.len() - len + i];
                    if !r.is_finite() {
                        return None;
                    }
                    total += r * w;
                }
                Some(total)
            })
            .collect();
        self.evaluate(&combined)
    }

    /// Portfolio report from each member's bars, joined on the dates every
    /// member has a bar for.
    pub fn portfolio_from_bars(
        &self,
        members: &[Vec<Bar>],
        weights: &[f64],
    ) -> Result<SharpeReport, CoreError> {
        let mut common: Option<BTreeSet<NaiveDate>> = None;
        for bars in members {
            let dates: BTreeSet<NaiveDate> = bars.iter().map(|b| b.date).collect();
            common = Some(match common {
                None => dates,
                Some(c) => c.intersection(&dates).copied().collect(),
            });
        }
        let common = common.unwrap_or_default();

        let series: Vec<Vec<f64>> = members
            .iter()
            .map(|bars| {
                let joined: Vec<Bar> = bars
                    .iter()
                    .filter(|b| common.contains(&b.date))
                    .cloned()
                    .collect();
                Returns::series(&joined)
            })
            .collect();
        self.portfolio(&series, weights)
    }

    fn validate(&self) -> Result<(), CoreError> {
        let periods = self.config.periods_per_year;
        if periods.is_nan() || periods <= 0.0 {
            return Err(CoreError::InvalidInput(
                "periods per year must be positive".into(),
            ));
        }
        if !self.config.risk_free_rate.is_finite() {
            return Err(CoreError::InvalidInput(
                "risk-free rate must be finite".into(),
            ));
        }
        Ok(())
    }
}

/// Sharpe ratio from an already annualised return and volatility.
pub fn manual_sharpe(
    annual_return: f64,
    annual_volatility: f64,
    risk_free_rate: f64,
) -> Result<f64, CoreError> {
    if annual_volatility.is_nan() || annual_volatility <= 0.0 {
        return Err(CoreError::InvalidInput(
            "volatility must be positive".into(),
        ));
    }
    Ok((annual_return - risk_free_rate) / annual_volatility)
}

/// Largest relative fall from a running peak of the compounded series.
///
/// The peak starts at the first compounded value, so a loss on the very
/// first return is not a drawdown. 0 for an empty or never-falling series.
pub fn max_drawdown(returns: &[f64]) -> f64 {
    let mut equity = 1.0;
    let mut peak = f64::NAN;
    let mut worst = 0.0_f64;
    for r in returns {
        equity *= 1.0 + r;
        // NaN.max(x) is x
        peak = peak.max(equity);
        if peak > 0.0 {
            worst = worst.max((peak - equity) / peak);
        }
    }
    worst
}
