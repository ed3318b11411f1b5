//! FeatureExtractor — raw OHLCV bars to one feature vector per bar.
//!
//! Features: simple return, rolling volatility of returns, volume ratio,
//! multi-bar momentum and RSI. Leading bars consumed by the rolling windows
//! are trimmed, so `FeatureSet::offset` maps feature row `k` back to bar
//! `offset + k`.

use chrono::NaiveDate;
use serde::{Deserialize, Serialize};

use crate::domain::Bar;
use crate::error::CoreError;
use crate::indicators::{Indicator, Momentum, Returns, RollingVolatility, Rsi, VolumeRatio};

/// Number of features per bar.
pub const FEATURE_COUNT: usize = 5;

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct FeatureConfig {
    pub volatility_window: usize,
    pub volume_window: usize,
    pub momentum_period: usize,
    pub rsi_period: usize,
    /// Leading bars dropped for stability. Never less than the longest lookback.
    pub warmup: usize,
    /// Shortest bar series accepted.
    pub min_bars: usize,
}

impl Default for FeatureConfig {
    fn default() -> Self {
        Self {
            volatility_window: 20,
            volume_window: 20,
            momentum_period: 10,
            rsi_period: 14,
            warmup: 30,
            min_bars: 60,
        }
    }
}

impl FeatureConfig {
    /// Effective number of trimmed leading bars.
    pub fn effective_warmup(&self) -> usize {
        self.warmup
            .max(self.volatility_window)
            .max(self.volume_window.saturating_sub(1))
            .max(self.momentum_period)
            .max(self.rsi_period)
    }
}

/// Per-bar feature vector.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct FeatureVector {
    pub ret: f64,
    pub volatility: f64,
    pub volume_ratio: f64,
    pub momentum: f64,
    pub rsi: f64,
}

impl FeatureVector {
    pub fn as_array(&self) -> [f64; FEATURE_COUNT] {
        [
            self.ret,
            self.volatility,
            self.volume_ratio,
            self.momentum,
            self.rsi,
        ]
    }
}

/// Aligned feature rows for a bar series.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct FeatureSet {
    /// Index of the bar that produced the first feature row.
    pub offset: usize,
    pub dates: Vec<NaiveDate>,
    pub vectors: Vec<FeatureVector>,
}

impl FeatureSet {
    pub fn len(&self) -> usize {
        self.vectors.len()
    }

    pub fn is_empty(&self) -> bool {
        self.vectors.is_empty()
    }

    pub fn returns(&self) -> Vec<f64> {
        self.vectors.iter().map(|v| v.ret).collect()
    }

    pub fn matrix(&self) -> Vec<[f64; FEATURE_COUNT]> {
        self.vectors.iter().map(FeatureVector::as_array).collect()
    }
}

#[derive(Debug, Clone, Default)]
pub struct FeatureExtractor {
    config: FeatureConfig,
}

impl FeatureExtractor {
    pub fn new(config: FeatureConfig) -> Self {
        Self { config }
    }

    pub fn config(&self) -> &FeatureConfig {
        &self.config
    }

    pub fn extract(&self, bars: &[Bar]) -> Result<FeatureSet, CoreError> {
        let warmup = self.config.effective_warmup();
        let required = self.config.min_bars.max(warmup + 1);
        if bars.len() < required {
            return Err(CoreError::insufficient("feature extraction", required, bars.len()));
        }

        let returns = Returns.compute(bars);
        let volatility = RollingVolatility::new(self.config.volatility_window).compute(bars);
        let volume_ratio = VolumeRatio::new(self.config.volume_window).compute(bars);
        let momentum = Momentum::new(self.config.momentum_period).compute(bars);
        let rsi = Rsi::new(self.config.rsi_period).compute(bars);

        let vectors = (warmup..bars.len())
            .map(|i| FeatureVector {
                ret: finite_or_zero(returns[i]),
                volatility: finite_or_zero(volatility[i]),
                volume_ratio: finite_or(volume_ratio[i], 1.0),
                momentum: finite_or_zero(momentum[i]),
                rsi: finite_or(rsi[i], 50.0),
            })
            .collect();

        Ok(FeatureSet {
            offset: warmup,
            dates: bars[warmup..].iter().map(|b| b.date).collect(),
            vectors,
        })
    }
}

fn finite_or_zero(v: f64) -> f64 {
    finite_or(v, 0.0)
}

fn finite_or(v: f64, fallback: f64) -> f64 {
    if v.is_finite() {
        v
    } else {
        fallback
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::indicators::make_bars;

    fn wave(n: usize) -> Vec<f64> {
        (0..n)
            .map(|i| 100.0 + (i as f64 * 0.3).sin() * 5.0 + i as f64 * 0.05)
            .collect()
    }

    #[test]
    fn rejects_short_series() {
        let bars = make_bars(&wave(40));
        let err = FeatureExtractor::default().extract(&bars).unwrap_err();
        assert_eq!(err, CoreError::insufficient("feature extraction", 60, 40));
    }

    #[test]
    fn trims_warmup_and_aligns_dates() {
        let bars = make_bars(&wave(100));
        let set = FeatureExtractor::default().extract(&bars).unwrap();
        assert_eq!(set.offset, 30);
        assert_eq!(set.len(), 70);
        assert_eq!(set.dates[0], bars[30].date);
        assert_eq!(*set.dates.last().unwrap(), bars[99].date);
    }

    #[test]
    fn features_are_finite_and_rsi_bounded() {
        let bars = make_bars(&wave(120));
        let set = FeatureExtractor::default().extract(&bars).unwrap();
        for v in &set.vectors {
            assert!(v.as_array().iter().all(|x| x.is_finite()));
            assert!((0.0..=100.0).contains(&v.rsi));
        }
    }

    #[test]
    fn warmup_never_shorter_than_lookbacks() {
        let config = FeatureConfig {
            warmup: 5,
            volatility_window: 25,
            ..FeatureConfig::default()
        };
        assert_eq!(config.effective_warmup(), 25);
    }
}
