//! Return-based series: simple returns, rolling volatility, momentum.

use super::{sample_std, Indicator};
use crate::domain::Bar;

/// Close-to-close simple return. Lookback: 1.
#[derive(Debug, Clone, Default)]
pub struct Returns;

impl Returns {
    /// Returns as a plain series, `NaN` at index 0.
    pub fn series(bars: &[Bar]) -> Vec<f64> {
        let mut result = vec![f64::NAN; bars.len()];
        for i in 1..bars.len() {
            let prev = bars[i - 1].close;
            result[i] = if prev != 0.0 {
                bars[i].close / prev - 1.0
            } else {
                f64::NAN
            };
        }
        result
    }
}

impl Indicator for Returns {
    fn name(&self) -> &str {
        "returns"
    }

    fn lookback(&self) -> usize {
        1
    }

    fn compute(&self, bars: &[Bar]) -> Vec<f64> {
        Self::series(bars)
    }
}

/// Rolling sample standard deviation of returns.
///
/// Lookback: `window` (the first return exists at index 1, so a full window
/// of returns ends at index `window`).
#[derive(Debug, Clone)]
pub struct RollingVolatility {
    window: usize,
    name: String,
}

impl RollingVolatility {
    pub fn new(window: usize) -> Self {
        assert!(window >= 2, "volatility window must be >= 2");
        Self {
            window,
            name: format!("volatility_{window}"),
        }
    }
}

impl Indicator for RollingVolatility {
    fn name(&self) -> &str {
        &self.name
    }

    fn lookback(&self) -> usize {
        self.window
    }

    fn compute(&self, bars: &[Bar]) -> Vec<f64> {
        let returns = Returns::series(bars);
        let mut result = vec![f64::NAN; bars.len()];
        for i in self.window..bars.len() {
            result[i] = sample_std(&returns[i + 1 - self.window..=i]);
        }
        result
    }
}

/// Multi-bar return: close[t] / close[t - period] - 1. Lookback: period.
#[derive(Debug, Clone)]
pub struct Momentum {
    period: usize,
    name: String,
}

impl Momentum {
    pub fn new(period: usize) -> Self {
        assert!(period >= 1, "momentum period must be >= 1");
        Self {
            period,
            name: format!("momentum_{period}"),
        }
    }
}

impl Indicator for Momentum {
    fn name(&self) -> &str {
        &self.name
    }

    fn lookback(&self) -> usize {
        self.period
    }

    fn compute(&self, bars: &[Bar]) -> Vec<f64> {
        let mut result = vec![f64::NAN; bars.len()];
        for i in self.period..bars.len() {
            let base = bars[i - self.period].close;
            if base != 0.0 {
                result[i] = bars[i].close / base - 1.0;
            }
        }
        result
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::indicators::{assert_approx, make_bars, DEFAULT_EPSILON};

    #[test]
    fn returns_basic() {
        let bars = make_bars(&[100.0, 110.0, 99.0]);
        let r = Returns.compute(&bars);
        assert!(r[0].is_nan());
        assert_approx(r[1], 0.10, DEFAULT_EPSILON);
        assert_approx(r[2], -0.10, DEFAULT_EPSILON);
    }

    #[test]
    fn volatility_of_constant_growth_is_zero() {
        let closes: Vec<f64> = (0..10).map(|i| 100.0 * 1.01_f64.powi(i)).collect();
        let bars = make_bars(&closes);
        let vol = RollingVolatility::new(3).compute(&bars);
        assert!(vol[2].is_nan());
        assert_approx(vol[3], 0.0, 1e-12);
        assert_approx(vol[9], 0.0, 1e-12);
    }

    #[test]
    fn momentum_basic() {
        let bars = make_bars(&[100.0, 101.0, 102.0, 120.0]);
        let m = Momentum::new(3).compute(&bars);
        assert!(m[2].is_nan());
        assert_approx(m[3], 0.20, DEFAULT_EPSILON);
    }
}
