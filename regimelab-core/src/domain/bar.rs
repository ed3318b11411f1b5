//! Bar — one trading day of price/volume data.

use chrono::NaiveDate;
use serde::{Deserialize, Serialize};

/// Daily OHLCV bar. Sequences of bars are chronological; weekends and
/// holidays are simply absent.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Bar {
    pub date: NaiveDate,
    pub open: f64,
    pub high: f64,
    pub low: f64,
    pub close: f64,
    pub volume: u64,
}

impl Bar {
    pub fn new(date: NaiveDate, open: f64, high: f64, low: f64, close: f64, volume: u64) -> Self {
        Self {
            date,
            open,
            high,
            low,
            close,
            volume,
        }
    }

    /// Returns true if any price field is NaN.
    pub fn is_void(&self) -> bool {
        self.open.is_nan() || self.high.is_nan() || self.low.is_nan() || self.close.is_nan()
    }

    /// Basic OHLC sanity check: high >= low, high >= open/close, low <= open/close.
    pub fn is_sane(&self) -> bool {
        if self.is_void() {
            return false;
        }
        self.high >= self.low
            && self.high >= self.open
            && self.high >= self.close
            && self.low <= self.open
            && self.low <= self.close
            && self.open > 0.0
            && self.close > 0.0
    }

    /// Absolute size of the real body.
    pub fn body(&self) -> f64 {
        (self.close - self.open).abs()
    }

    /// Full high-low range.
    pub fn range(&self) -> f64 {
        self.high - self.low
    }

    pub fn is_bullish(&self) -> bool {
        self.close > self.open
    }

    pub fn is_bearish(&self) -> bool {
        self.close < self.open
    }

    pub fn body_top(&self) -> f64 {
        self.open.max(self.close)
    }

    pub fn body_bottom(&self) -> f64 {
        self.open.min(self.close)
    }

    pub fn upper_wick(&self) -> f64 {
        self.high - self.body_top()
    }

    pub fn lower_wick(&self) -> f64 {
        self.body_bottom() - self.low
    }
}

/// Keep only sane bars, sorted by date with duplicate dates removed.
///
/// Providers may hand back partial rows (holidays, halted sessions); those are
/// dropped here rather than poisoning the rolling windows downstream.
pub fn clean_bars(mut bars: Vec<Bar>) -> Vec<Bar> {
    bars.retain(Bar::is_sane);
    bars.sort_by_key(|b| b.date);
    bars.dedup_by_key(|b| b.date);
    bars
}

#[cfg(test)]
mod tests {
    use super::*;

    fn sample_bar() -> Bar {
        Bar::new(
            NaiveDate::from_ymd_opt(2024, 1, 2).unwrap(),
            100.0,
            105.0,
            98.0,
            103.0,
            50_000,
        )
    }

    #[test]
    fn bar_is_sane() {
        assert!(sample_bar().is_sane());
    }

    #[test]
    fn bar_detects_void() {
        let mut bar = sample_bar();
        bar.open = f64::NAN;
        assert!(bar.is_void());
        assert!(!bar.is_sane());
    }

    #[test]
    fn bar_detects_insane_high_low() {
        let mut bar = sample_bar();
        bar.high = 97.0; // below low
        assert!(!bar.is_sane());
    }

    #[test]
    fn candle_geometry() {
        let bar = sample_bar();
        assert_eq!(bar.body(), 3.0);
        assert_eq!(bar.range(), 7.0);
        assert_eq!(bar.upper_wick(), 2.0);
        assert_eq!(bar.lower_wick(), 2.0);
        assert!(bar.is_bullish());
        assert!(!bar.is_bearish());
    }

    #[test]
    fn clean_bars_sorts_dedups_and_drops_void() {
        let d = |day| NaiveDate::from_ymd_opt(2024, 1, day).unwrap();
        let mut void = Bar::new(d(4), 1.0, 1.0, 1.0, 1.0, 0);
        void.close = f64::NAN;
        let bars = vec![
            Bar::new(d(3), 10.0, 11.0, 9.0, 10.5, 100),
            Bar::new(d(2), 10.0, 11.0, 9.0, 10.5, 100),
            Bar::new(d(3), 10.0, 11.0, 9.0, 10.5, 100),
            void,
        ];
        let cleaned = clean_bars(bars);
        assert_eq!(cleaned.len(), 2);
        assert_eq!(cleaned[0].date, d(2));
        assert_eq!(cleaned[1].date, d(3));
    }
}
