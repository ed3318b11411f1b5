//! Relative Strength Index, the overbought/oversold input of the regime
//! feature vector.
//!
//! Seeded with the plain mean of the first `period` close-to-close moves, then
//! Wilder-smoothed (alpha = 1 / period). Values lie in [0, 100]; a stretch
//! with no moves at all reads 50. Lookback: period.

use super::Indicator;
use crate::domain::Bar;

#[derive(Debug, Clone)]
pub struct Rsi {
    period: usize,
    name: String,
}

impl Rsi {
    pub fn new(period: usize) -> Self {
        assert!(period >= 1, "RSI period must be >= 1");
        Self {
            period,
            name: format!("rsi_{period}"),
        }
    }

    fn value(avg_gain: f64, avg_loss: f64) -> f64 {
        match (avg_gain > 0.0, avg_loss > 0.0) {
            (false, false) => 50.0,
            (true, false) => 100.0,
            (false, true) => 0.0,
            (true, true) => 100.0 - 100.0 / (1.0 + avg_gain / avg_loss),
        }
    }
}

impl Indicator for Rsi {
    fn name(&self) -> &str {
        &self.name
    }

    fn lookback(&self) -> usize {
        self.period
    }

    fn compute(&self, bars: &[Bar]) -> Vec<f64> {
        let mut out = vec![f64::NAN; bars.len()];
        if bars.len() <= self.period {
            return out;
        }

        // (gain, loss) of bar i + 1 against bar i
        let moves: Vec<(f64, f64)> = bars
            .windows(2)
            .map(|w| {
                let delta = w[1].close - w[0].close;
                (delta.max(0.0), (-delta).max(0.0))
            })
            .collect();

        let p = self.period as f64;
        let (gain_sum, loss_sum) = moves[..self.period]
            .iter()
            .fold((0.0, 0.0), |(g, l), (mg, ml)| (g + mg, l + ml));
        let (mut avg_gain, mut avg_loss) = (gain_sum / p, loss_sum / p);
        out[self.period] = Self::value(avg_gain, avg_loss);

        for (i, &(gain, loss)) in moves.iter().enumerate().skip(self.period) {
            avg_gain += (gain - avg_gain) / p;
            avg_loss += (loss - avg_loss) / p;
            out[i + 1] = Self::value(avg_gain, avg_loss);
        }
        out
    }
}
