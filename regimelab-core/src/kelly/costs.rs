//! Transaction-cost estimate in return units (0.001 = 10 bps).

use serde::{Deserialize, Serialize};

use crate::domain::Bar;
use crate::error::CoreError;

/// Recent price and liquidity context used for cost estimation.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct MarketSnapshot {
    /// Latest close.
    pub price: f64,
    /// Mean of (high - low) / close over the lookback.
    pub avg_relative_range: f64,
    pub avg_volume: f64,
}

impl MarketSnapshot {
    pub fn from_bars(bars: &[Bar], lookback: usize) -> Result<Self, CoreError> {
        let last = bars
            .last()
            .ok_or_else(|| CoreError::insufficient("market snapshot", 1, 0))?;
        if !(last.close.is_finite() && last.close > 0.0) {
            return Err(CoreError::InvalidInput(format!(
                "latest close must be positive, got {}",
                last.close
            )));
        }

        let window = &bars[bars.len().saturating_sub(lookback.max(1))..];
        let n = window.len() as f64;
        let avg_relative_range = window
            .iter()
            .map(|b| {
                if b.close > 0.0 {
                    b.range() / b.close
                } else {
                    0.0
                }
            })
            .sum::<f64>()
            / n;
        let avg_volume = window.iter().map(|b| b.volume as f64).sum::<f64>() / n;

        Ok(Self {
            price: last.close,
            avg_relative_range,
            avg_volume,
        })
    }
}

/// Cost model coefficients.
///
/// # Formula
/// ```text
/// spread   = avg_relative_range * spread_ratio
/// impact   = impact_coefficient * shares / avg_volume
/// slippage = slippage_bps / 10_000
/// ```
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct CostModel {
    /// Share of the average bar range treated as the bid-ask spread.
    pub spread_ratio: f64,
    pub impact_coefficient: f64,
    pub slippage_bps: f64,
}

impl Default for CostModel {
    fn default() -> Self {
        Self {
            spread_ratio: 0.1,
            impact_coefficient: 0.1,
            slippage_bps: 5.0,
        }
    }
}

impl CostModel {
    pub fn frictionless() -> Self {
        Self {
            spread_ratio: 0.0,
            impact_coefficient: 0.0,
            slippage_bps: 0.0,
        }
    }

    /// Estimate for a position of `position_value` dollars.
    pub fn estimate(&self, market: &MarketSnapshot, position_value: f64) -> CostEstimate {
        let spread = market.avg_relative_range.max(0.0) * self.spread_ratio;
        let shares = if market.price > 0.0 {
            position_value.max(0.0) / market.price
        } else {
            0.0
        };
        let impact = if market.avg_volume > 0.0 {
            self.impact_coefficient * shares / market.avg_volume
        } else {
            0.0
        };
        let slippage = self.slippage_bps / 10_000.0;

        CostEstimate {
            spread,
            impact,
            slippage,
            total: spread + impact + slippage,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct CostEstimate {
    pub spread: f64,
    pub impact: f64,
    pub slippage: f64,
    pub total: f64,
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::indicators::{assert_approx, make_bars, DEFAULT_EPSILON};

    #[test]
    fn snapshot_averages_trailing_window() {
        // make_bars: range = |close - open| + 2
        let bars = make_bars(&[100.0, 100.0, 100.0]);
        let snap = MarketSnapshot::from_bars(&bars, 20).unwrap();
        assert_eq!(snap.price, 100.0);
        assert_approx(snap.avg_relative_range, 0.02, DEFAULT_EPSILON);
        assert_approx(snap.avg_volume, 1000.0, DEFAULT_EPSILON);
    }

    #[test]
    fn snapshot_of_empty_series_is_insufficient() {
        assert!(MarketSnapshot::from_bars(&[], 20)
            .unwrap_err()
            .is_insufficient_data());
    }

    #[test]
    fn estimate_sums_components() {
        let market = MarketSnapshot {
            price: 50.0,
            avg_relative_range: 0.02,
            avg_volume: 1_000_000.0,
        };
        // 10,000 dollars = 200 shares
        let est = CostModel::default().estimate(&market, 10_000.0);
        assert_approx(est.spread, 0.002, DEFAULT_EPSILON);
        assert_approx(est.impact, 0.1 * 200.0 / 1_000_000.0, DEFAULT_EPSILON);
        assert_approx(est.slippage, 0.0005, DEFAULT_EPSILON);
        let summed = est.spread + est.impact + est.slippage;
        assert_approx(est.total, summed, DEFAULT_EPSILON);
    }

    #[test]
    fn frictionless_costs_nothing() {
        let market = MarketSnapshot {
            price: 10.0,
            avg_relative_range: 0.05,
            avg_volume: 100.0,
        };
        assert_eq!(CostModel::frictionless().estimate(&market, 5_000.0).total, 0.0);
    }
}
