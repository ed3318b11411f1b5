//! Volume ratio: bar volume over its trailing rolling mean.
//!
//! The window includes the current bar. A zero trailing mean yields 1.0
//! rather than a division by zero. Lookback: window - 1.

use super::Indicator;
use crate::domain::Bar;

#[derive(Debug, Clone)]
pub struct VolumeRatio {
    window: usize,
    name: String,
}

impl VolumeRatio {
    pub fn new(window: usize) -> Self {
        assert!(window >= 1, "volume window must be >= 1");
        Self {
            window,
            name: format!("volume_ratio_{window}"),
        }
    }
}

impl Indicator for VolumeRatio {
    fn name(&self) -> &str {
        &self.name
    }

    fn lookback(&self) -> usize {
        self.window - 1
    }

    fn compute(&self, bars: &[Bar]) -> Vec<f64> {
        let n = bars.len();
        let mut result = vec![f64::NAN; n];
        if n < self.window {
            return result;
        }

        let mut sum: f64 = bars.iter().take(self.window).map(|b| b.volume as f64).sum();
        for i in (self.window - 1)..n {
            if i >= self.window {
                sum += bars[i].volume as f64 - bars[i - self.window].volume as f64;
            }
            let trailing_mean = sum / self.window as f64;
            result[i] = if trailing_mean > 0.0 {
                bars[i].volume as f64 / trailing_mean
            } else {
                1.0
            };
        }
        result
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::indicators::{assert_approx, make_bars, DEFAULT_EPSILON};

    #[test]
    fn ratio_of_flat_volume_is_one() {
        let bars = make_bars(&[1.0, 2.0, 3.0, 4.0]);
        let r = VolumeRatio::new(2).compute(&bars);
        assert!(r[0].is_nan());
        assert_approx(r[1], 1.0, DEFAULT_EPSILON);
        assert_approx(r[3], 1.0, DEFAULT_EPSILON);
    }

    #[test]
    fn spike_is_above_one() {
        let mut bars = make_bars(&[1.0, 2.0, 3.0]);
        bars[2].volume = 3000;
        let r = VolumeRatio::new(3).compute(&bars);
        // mean(1000, 1000, 3000) = 1666.67
        assert_approx(r[2], 3000.0 / (5000.0 / 3.0), 1e-9);
    }

    #[test]
    fn zero_volume_window_yields_one() {
        let mut bars = make_bars(&[1.0, 2.0, 3.0]);
        for b in &mut bars {
            b.volume = 0;
        }
        let r = VolumeRatio::new(2).compute(&bars);
        assert_eq!(r[2], 1.0);
    }
}
