//! Simple moving average of closes, the input of the moving-average fallback
//! rule. Lookback: period - 1.

use super::{mean, Indicator};
use crate::domain::Bar;

#[derive(Debug, Clone)]
pub struct Sma {
    period: usize,
    name: String,
}

impl Sma {
    pub fn new(period: usize) -> Self {
        assert!(period >= 1, "SMA period must be >= 1");
        Self {
            period,
            name: format!("sma_{period}"),
        }
    }

    /// Average of the last `period` closes, `None` on a shorter history.
    pub fn last(&self, bars: &[Bar]) -> Option<f64> {
        let start = bars.len().checked_sub(self.period)?;
        Some(mean_close(&bars[start..]))
    }
}

fn mean_close(window: &[Bar]) -> f64 {
    let closes: Vec<f64> = window.iter().map(|b| b.close).collect();
    mean(&closes)
}

impl Indicator for Sma {
    fn name(&self) -> &str {
        &self.name
    }

    fn lookback(&self) -> usize {
        self.period - 1
    }

    fn compute(&self, bars: &[Bar]) -> Vec<f64> {
        let mut out = vec![f64::NAN; bars.len()];
        let slots = out.iter_mut().skip(self.period - 1);
        for (slot, window) in slots.zip(bars.windows(self.period)) {
            *slot = mean_close(window);
        }
        out
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::indicators::{assert_approx, make_bars, DEFAULT_EPSILON};

    #[test]
    fn averages_the_trailing_window() {
        let bars = make_bars(&[1.0, 2.0, 3.0, 4.0, 5.0, 6.0, 7.0]);
        let out = Sma::new(3).compute(&bars);
        assert!(out[0].is_nan() && out[1].is_nan());
        for (i, expected) in [2.0, 3.0, 4.0, 5.0, 6.0].iter().enumerate() {
            assert_approx(out[i + 2], *expected, DEFAULT_EPSILON);
        }
        assert_eq!(Sma::new(3).lookback(), 2);
    }

    #[test]
    fn last_is_the_series_tail() {
        let bars = make_bars(&[10.0, 12.0, 11.0, 15.0, 14.0]);
        let sma = Sma::new(4);
        let tail = sma.compute(&bars)[4];
        assert_approx(sma.last(&bars).unwrap(), tail, DEFAULT_EPSILON);
        assert_approx(tail, 13.0, DEFAULT_EPSILON);
    }

    #[test]
    fn short_history_has_no_average() {
        let bars = make_bars(&[10.0, 11.0]);
        assert!(Sma::new(5).compute(&bars).iter().all(|v| v.is_nan()));
        assert_eq!(Sma::new(5).last(&bars), None);
        assert_approx(Sma::new(1).last(&bars).unwrap(), 11.0, DEFAULT_EPSILON);
    }
}
