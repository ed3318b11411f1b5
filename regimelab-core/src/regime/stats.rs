//! Per-regime aggregates computed once per fit.

use serde::{Deserialize, Serialize};

use crate::domain::Regime;
use crate::indicators::{mean, sample_std};

/// Aggregate behavior of the bars assigned to one regime.
///
/// Returns are simple close-to-close fractions (0.01 = 1%).
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct RegimeStats {
    pub regime: Regime,
    pub days: usize,
    /// Share of all assigned bars, in [0, 1].
    pub occupancy: f64,
    pub avg_return: f64,
    /// Sample standard deviation of returns; 0 below two bars.
    pub volatility: f64,
    /// P(regime at t+1 == regime | regime at t).
    pub persistence: f64,
    /// Share of positive-return bars.
    pub win_rate: f64,
    /// Mean of the positive returns.
    pub avg_gain: f64,
    /// Mean magnitude of the negative returns.
    pub avg_loss: f64,
    /// Per-bar `avg_return / volatility`, not annualised and without a
    /// risk-free rate; 0 when volatility is 0.
    pub sharpe: f64,
}

impl RegimeStats {
    fn empty(regime: Regime) -> Self {
        Self {
            regime,
            days: 0,
            occupancy: 0.0,
            avg_return: 0.0,
            volatility: 0.0,
            persistence: 0.0,
            win_rate: 0.0,
            avg_gain: 0.0,
            avg_loss: 0.0,
            sharpe: 0.0,
        }
    }
}

/// Stats for all three regimes, indexed by `Regime::index()`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RegimeStatsTable([RegimeStats; 3]);

impl RegimeStatsTable {
    /// Group `returns` by the parallel `regimes` sequence and aggregate.
    pub fn compute(regimes: &[Regime], returns: &[f64]) -> Self {
        debug_assert_eq!(regimes.len(), returns.len());
        let total = regimes.len();

        let table = Regime::ALL.map(|regime| {
            let rets: Vec<f64> = regimes
                .iter()
                .zip(returns)
                .filter(|(r, _)| **r == regime)
                .map(|(_, &ret)| ret)
                .collect();
            if rets.is_empty() {
                return RegimeStats::empty(regime);
            }

            let gains: Vec<f64> = rets.iter().copied().filter(|r| *r > 0.0).collect();
            let losses: Vec<f64> = rets.iter().filter(|r| **r < 0.0).map(|r| -r).collect();

            let (mut stays, mut exits) = (0usize, 0usize);
            for pair in regimes.windows(2) {
                if pair[0] == regime {
                    if pair[1] == regime {
                        stays += 1;
                    } else {
                        exits += 1;
                    }
                }
            }

            let avg_return = mean(&rets);
            let volatility = nan_to_zero(sample_std(&rets));
            let sharpe = if volatility > 0.0 {
                avg_return / volatility
            } else {
                0.0
            };

            RegimeStats {
                regime,
                days: rets.len(),
                occupancy: rets.len() as f64 / total as f64,
                avg_return,
                volatility,
                persistence: ratio(stays, stays + exits),
                win_rate: ratio(gains.len(), rets.len()),
                avg_gain: nan_to_zero(mean(&gains)),
                avg_loss: nan_to_zero(mean(&losses)),
                sharpe,
            }
        });

        Self(table)
    }

    pub fn get(&self, regime: Regime) -> &RegimeStats {
        &self.0[regime.index()]
    }

    pub fn iter(&self) -> impl Iterator<Item = &RegimeStats> {
        self.0.iter()
    }
}

fn ratio(num: usize, den: usize) -> f64 {
    if den == 0 {
        0.0
    } else {
        num as f64 / den as f64
    }
}

fn nan_to_zero(v: f64) -> f64 {
    if v.is_finite() {
        v
    } else {
        0.0
    }
}
