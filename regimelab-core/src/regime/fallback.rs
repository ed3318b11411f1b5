//! Moving-average regime rule used when the mixture fit is unavailable.
//!
//! Bull when the short MA sits more than `threshold` above the long MA and
//! the close is above the short MA; Bear for the mirror case; otherwise
//! Sideways.

use serde::{Deserialize, Serialize};

use crate::domain::{Bar, Regime};
use crate::error::CoreError;
use crate::indicators::{Indicator, Sma};

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct MovingAverageRule {
    pub short_period: usize,
    pub long_period: usize,
    /// Relative MA separation required to leave Sideways.
    pub threshold: f64,
}

impl Default for MovingAverageRule {
    fn default() -> Self {
        Self {
            short_period: 20,
            long_period: 50,
            threshold: 0.02,
        }
    }
}

impl MovingAverageRule {
    /// Bars needed before the first regime can be assigned.
    pub fn required_bars(&self) -> usize {
        self.short_period.max(self.long_period)
    }

    pub fn regime(&self, close: f64, short_ma: f64, long_ma: f64) -> Regime {
        if long_ma <= 0.0 || short_ma <= 0.0 {
            return Regime::Sideways;
        }
        let spread = (short_ma - long_ma) / long_ma;
        let price_vs_short = (close - short_ma) / short_ma;
        if spread > self.threshold && price_vs_short > 0.0 {
            Regime::Bull
        } else if spread < -self.threshold && price_vs_short < 0.0 {
            Regime::Bear
        } else {
            Regime::Sideways
        }
    }

    /// Regime for every bar from `required_bars() - 1` onward, as
    /// `(bar_index, regime)` pairs.
    pub fn classify_series(&self, bars: &[Bar]) -> Result<Vec<(usize, Regime)>, CoreError> {
        if self.short_period == 0 || self.long_period == 0 {
            return Err(CoreError::InvalidInput(
                "moving-average periods must be positive".into(),
            ));
        }
        let required = self.required_bars();
        if bars.len() < required {
            return Err(CoreError::insufficient(
                "moving-average fallback",
                required,
                bars.len(),
            ));
        }

        let short = Sma::new(self.short_period).compute(bars);
        let long = Sma::new(self.long_period).compute(bars);

        Ok((required - 1..bars.len())
            .map(|i| (i, self.regime(bars[i].close, short[i], long[i])))
            .collect())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::indicators::make_bars;

    #[test]
    fn rising_series_is_bull() {
        let closes: Vec<f64> = (0..60).map(|i| 100.0 + 2.0 * i as f64).collect();
        let out = MovingAverageRule::default()
            .classify_series(&make_bars(&closes))
            .unwrap();
        assert_eq!(out.len(), 11);
        assert_eq!(out[0].0, 49);
        assert_eq!(out.last().unwrap().1, Regime::Bull);
    }

    #[test]
    fn falling_series_is_bear() {
        let closes: Vec<f64> = (0..60).map(|i| 300.0 - 2.0 * i as f64).collect();
        let out = MovingAverageRule::default()
            .classify_series(&make_bars(&closes))
            .unwrap();
        assert_eq!(out.last().unwrap().1, Regime::Bear);
    }

    #[test]
    fn flat_series_is_sideways() {
        let out = MovingAverageRule::default()
            .classify_series(&make_bars(&[100.0; 55]))
            .unwrap();
        assert!(out.iter().all(|(_, r)| *r == Regime::Sideways));
    }

    #[test]
    fn separation_without_price_confirmation_is_sideways() {
        let rule = MovingAverageRule::default();
        // short MA well above long MA, but price has dropped under the short MA
        assert_eq!(rule.regime(104.0, 105.0, 100.0), Regime::Sideways);
        assert_eq!(rule.regime(106.0, 105.0, 100.0), Regime::Bull);
        assert_eq!(rule.regime(94.0, 95.0, 100.0), Regime::Bear);
    }

    #[test]
    fn too_few_bars_is_insufficient_data() {
        let err = MovingAverageRule::default()
            .classify_series(&make_bars(&[100.0; 49]))
            .unwrap_err();
        assert_eq!(err, CoreError::insufficient("moving-average fallback", 50, 49));
    }
}
