//! Individual candlestick rules. Each is a pure predicate on bar `i`.

use super::{PatternConfig, PatternKind};
use crate::domain::Bar;

pub fn matches(kind: PatternKind, bars: &[Bar], i: usize, config: &PatternConfig) -> bool {
    match kind {
        PatternKind::BullishEngulfing => bullish_engulfing(bars, i, config),
        PatternKind::BearishEngulfing => bearish_engulfing(bars, i, config),
        PatternKind::MorningStar => morning_star(bars, i, config),
        PatternKind::EveningStar => evening_star(bars, i, config),
        PatternKind::Hammer => hammer(bars, i, config),
    }
}

/// Bearish bar followed by a larger bullish body that opens below the prior
/// close and closes above the prior open.
pub fn bullish_engulfing(bars: &[Bar], i: usize, config: &PatternConfig) -> bool {
    if i < 1 {
        return false;
    }
    let (prev, cur) = (&bars[i - 1], &bars[i]);
    prev.is_bearish()
        && cur.is_bullish()
        && cur.close > prev.open
        && cur.open < prev.close
        && cur.body() > prev.body() * config.engulfing_body_ratio
}

pub fn bearish_engulfing(bars: &[Bar], i: usize, config: &PatternConfig) -> bool {
    if i < 1 {
        return false;
    }
    let (prev, cur) = (&bars[i - 1], &bars[i]);
    prev.is_bullish()
        && cur.is_bearish()
        && cur.close < prev.open
        && cur.open > prev.close
        && cur.body() > prev.body() * config.engulfing_body_ratio
}

/// Bearish bar, small body gapping below its close, then a bullish bar
/// opening above the small body.
pub fn morning_star(bars: &[Bar], i: usize, config: &PatternConfig) -> bool {
    if i < 2 {
        return false;
    }
    let (first, mid, last) = (&bars[i - 2], &bars[i - 1], &bars[i]);
    first.is_bearish()
        && mid.body() < first.body() * config.star_middle_ratio
        && last.is_bullish()
        && mid.body_top() < first.close
        && last.open > mid.body_top()
}

pub fn evening_star(bars: &[Bar], i: usize, config: &PatternConfig) -> bool {
    if i < 2 {
        return false;
    }
    let (first, mid, last) = (&bars[i - 2], &bars[i - 1], &bars[i]);
    first.is_bullish()
        && mid.body() < first.body() * config.star_middle_ratio
        && last.is_bearish()
        && mid.body_bottom() > first.close
        && last.open < mid.body_bottom()
}

/// Small body near the top of the range with a long lower wick, after a
/// decline.
pub fn hammer(bars: &[Bar], i: usize, config: &PatternConfig) -> bool {
    let lookback = config.downtrend_bars.max(1);
    if i < lookback + 1 {
        return false;
    }
    let bar = &bars[i];
    let range = bar.range();
    let body = bar.body();
    if range <= 0.0 || body <= 0.0 {
        return false;
    }
    let downtrend = bars[i - 1].close < bars[i - 1 - lookback].close;

    downtrend
        && body < range * config.hammer_body_ratio
        && bar.lower_wick() > body * config.hammer_wick_ratio
        && bar.upper_wick() < body
        && bar.lower_wick() >= range * config.hammer_lower_share
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::NaiveDate;

    fn bar(day: u32, open: f64, high: f64, low: f64, close: f64) -> Bar {
        Bar::new(
            NaiveDate::from_ymd_opt(2024, 5, day).unwrap(),
            open,
            high,
            low,
            close,
            1000,
        )
    }

    fn cfg() -> PatternConfig {
        PatternConfig::default()
    }

    #[test]
    fn engulfing_needs_ten_percent_larger_body() {
        let prev = bar(1, 102.0, 102.5, 99.5, 100.0);
        // body 2.1 vs prior 2.0: below the 1.1x threshold
        let weak = bar(2, 99.9, 102.5, 99.5, 102.0);
        assert!(!bullish_engulfing(&[prev.clone(), weak], 1, &cfg()));
        let strong = bar(2, 99.5, 103.0, 99.0, 102.5);
        assert!(bullish_engulfing(&[prev, strong], 1, &cfg()));
    }

    #[test]
    fn bearish_engulfing_mirrors() {
        let prev = bar(1, 100.0, 102.5, 99.5, 102.0);
        let cur = bar(2, 102.5, 103.0, 99.0, 99.5);
        assert!(bearish_engulfing(&[prev.clone(), cur.clone()], 1, &cfg()));
        assert!(!bullish_engulfing(&[prev, cur], 1, &cfg()));
    }

    #[test]
    fn morning_star_requires_gaps() {
        let first = bar(1, 106.0, 106.5, 99.5, 100.0);
        let mid = bar(2, 99.0, 99.5, 98.0, 98.5);
        let last = bar(3, 99.8, 104.0, 99.5, 103.5);
        assert!(morning_star(&[first.clone(), mid.clone(), last], 2, &cfg()));

        // third bar opens inside the middle body
        let no_gap = bar(3, 98.8, 104.0, 98.5, 103.5);
        assert!(!morning_star(&[first, mid, no_gap], 2, &cfg()));
    }

    #[test]
    fn evening_star_detected() {
        let first = bar(1, 100.0, 106.5, 99.5, 106.0);
        let mid = bar(2, 107.0, 108.0, 106.5, 107.5);
        let last = bar(3, 106.8, 107.0, 101.0, 101.5);
        assert!(evening_star(&[first, mid, last], 2, &cfg()));
    }

    fn declining_then(last: Bar) -> Vec<Bar> {
        let mut bars: Vec<Bar> = (0..6)
            .map(|d| {
                let c = 110.0 - 2.0 * d as f64;
                bar(d + 1, c + 1.0, c + 1.5, c - 0.5, c)
            })
            .collect();
        bars.push(last);
        bars
    }

    #[test]
    fn hammer_after_decline() {
        // range 3.0, body 0.4 at the top, lower wick 2.4, upper wick 0.2
        let hammer_bar = bar(7, 99.4, 100.0, 97.0, 99.8);
        let bars = declining_then(hammer_bar);
        assert!(hammer(&bars, 6, &cfg()));
    }

    #[test]
    fn hammer_needs_downtrend() {
        let mut bars: Vec<Bar> = (0..6)
            .map(|d| {
                let c = 90.0 + 2.0 * d as f64;
                bar(d + 1, c - 1.0, c + 0.5, c - 1.5, c)
            })
            .collect();
        bars.push(bar(7, 99.4, 100.0, 97.0, 99.8));
        assert!(!hammer(&bars, 6, &cfg()));
    }

    #[test]
    fn doji_is_not_hammer() {
        let bars = declining_then(bar(7, 99.8, 100.0, 97.0, 99.8));
        assert!(!hammer(&bars, 6, &cfg()));
    }
}
