//! PatternDetector: rule-based candlestick recognition over OHLC bars.
//!
//! Every rule looks only at the current bar and up to two predecessors, so
//! an event at bar t never depends on bars after t.

pub mod rules;
pub mod summary;

pub use summary::PatternSummary;

use std::fmt;

use chrono::NaiveDate;
use serde::{Deserialize, Serialize};

use crate::domain::Bar;
use crate::error::CoreError;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Direction {
    Bullish,
    Bearish,
}

impl Direction {
    /// +1 for bullish, -1 for bearish.
    pub fn sign(self) -> i8 {
        match self {
            Self::Bullish => 1,
            Self::Bearish => -1,
        }
    }
}

impl fmt::Display for Direction {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Bullish => write!(f, "bullish"),
            Self::Bearish => write!(f, "bearish"),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum PatternKind {
    MorningStar,
    EveningStar,
    BullishEngulfing,
    BearishEngulfing,
    Hammer,
}

impl PatternKind {
    /// Evaluation order; earlier kinds win "current pattern" reporting.
    pub const ALL: [PatternKind; 5] = [
        PatternKind::MorningStar,
        PatternKind::EveningStar,
        PatternKind::BullishEngulfing,
        PatternKind::BearishEngulfing,
        PatternKind::Hammer,
    ];

    pub fn direction(self) -> Direction {
        match self {
            Self::MorningStar | Self::BullishEngulfing | Self::Hammer => Direction::Bullish,
            Self::EveningStar | Self::BearishEngulfing => Direction::Bearish,
        }
    }

    pub fn name(self) -> &'static str {
        match self {
            Self::MorningStar => "morning star",
            Self::EveningStar => "evening star",
            Self::BullishEngulfing => "bullish engulfing",
            Self::BearishEngulfing => "bearish engulfing",
            Self::Hammer => "hammer",
        }
    }
}

impl fmt::Display for PatternKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct PatternEvent {
    pub bar_index: usize,
    pub date: NaiveDate,
    pub kind: PatternKind,
    pub direction: Direction,
    /// Bar low for bullish patterns, bar high for bearish ones.
    pub trigger: f64,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct PatternConfig {
    /// Engulfing body must exceed the prior body by this factor.
    pub engulfing_body_ratio: f64,
    /// Star middle body must be below this fraction of the first body.
    pub star_middle_ratio: f64,
    /// Hammer body must be below this fraction of the bar range.
    pub hammer_body_ratio: f64,
    /// Hammer lower wick must exceed this multiple of the body.
    pub hammer_wick_ratio: f64,
    /// Minimum share of the range below the body (body near the top).
    pub hammer_lower_share: f64,
    /// Hammer needs the prior close below the close this many bars earlier.
    pub downtrend_bars: usize,
    /// Trailing window for the frequency summary.
    pub summary_window: usize,
}

impl Default for PatternConfig {
    fn default() -> Self {
        Self {
            engulfing_body_ratio: 1.1,
            star_middle_ratio: 0.5,
            hammer_body_ratio: 0.3,
            hammer_wick_ratio: 2.0,
            hammer_lower_share: 0.5,
            downtrend_bars: 5,
            summary_window: 30,
        }
    }
}

#[derive(Debug, Clone, Default)]
pub struct PatternDetector {
    config: PatternConfig,
}

impl PatternDetector {
    pub fn new(config: PatternConfig) -> Self {
        Self { config }
    }

    pub fn config(&self) -> &PatternConfig {
        &self.config
    }

    /// All patterns completing at bar `i`, strongest first.
    pub fn events_at(&self, bars: &[Bar], i: usize) -> Vec<PatternEvent> {
        if i >= bars.len() {
            return Vec::new();
        }
        PatternKind::ALL
            .into_iter()
            .filter(|kind| rules::matches(*kind, bars, i, &self.config))
            .map(|kind| {
                let bar = &bars[i];
                let direction = kind.direction();
                PatternEvent {
                    bar_index: i,
                    date: bar.date,
                    kind,
                    direction,
                    trigger: match direction {
                        Direction::Bullish => bar.low,
                        Direction::Bearish => bar.high,
                    },
                }
            })
            .collect()
    }

    /// Every event in the series, in bar order.
    pub fn detect(&self, bars: &[Bar]) -> Vec<PatternEvent> {
        (0..bars.len())
            .flat_map(|i| self.events_at(bars, i))
            .collect()
    }

    /// Strongest pattern on the latest bar, if any.
    pub fn current(&self, bars: &[Bar]) -> Option<PatternEvent> {
        let last = bars.len().checked_sub(1)?;
        self.events_at(bars, last).into_iter().next()
    }

    /// Tally over the trailing `summary_window` bars.
    pub fn summary(&self, bars: &[Bar]) -> Result<PatternSummary, CoreError> {
        let window = self.config.summary_window.max(1);
        if bars.len() < window {
            return Err(CoreError::insufficient("pattern summary", window, bars.len()));
        }
        let start = bars.len() - window;
        let events: Vec<PatternEvent> = (start..bars.len())
            .flat_map(|i| self.events_at(bars, i))
            .collect();
        Ok(PatternSummary::from_events(window, events))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::indicators::make_bars;

    fn bar(day: u32, open: f64, high: f64, low: f64, close: f64) -> Bar {
        Bar::new(
            NaiveDate::from_ymd_opt(2024, 3, day).unwrap(),
            open,
            high,
            low,
            close,
            1000,
        )
    }

    #[test]
    fn current_reports_engulfing_with_low_trigger() {
        let bars = vec![
            bar(1, 102.0, 103.0, 99.5, 100.0),
            bar(2, 99.5, 104.0, 99.0, 103.0),
        ];
        let event = PatternDetector::default().current(&bars).unwrap();
        assert_eq!(event.kind, PatternKind::BullishEngulfing);
        assert_eq!(event.direction.sign(), 1);
        assert_eq!(event.trigger, 99.0);
        assert_eq!(event.bar_index, 1);
    }

    #[test]
    fn engulfing_takes_precedence_over_hammer() {
        // six falling bearish bars, then a bar that both engulfs the last
        // one and has a hammer shape
        let mut bars: Vec<Bar> = (0..6)
            .map(|d| {
                let c = 110.0 - 2.0 * d as f64;
                bar(d + 1, c + 1.0, c + 1.5, c - 0.5, c)
            })
            .collect();
        bars.push(bar(7, 99.9, 101.5, 95.0, 101.2));

        let detector = PatternDetector::default();
        let kinds: Vec<PatternKind> = detector
            .events_at(&bars, 6)
            .iter()
            .map(|e| e.kind)
            .collect();
        assert_eq!(kinds, vec![PatternKind::BullishEngulfing, PatternKind::Hammer]);
        assert_eq!(detector.current(&bars).unwrap().kind, PatternKind::BullishEngulfing);
    }

    #[test]
    fn bearish_pattern_triggers_at_high() {
        let bars = vec![
            bar(1, 100.0, 106.5, 99.5, 106.0),
            bar(2, 107.0, 108.0, 106.5, 107.5),
            bar(3, 106.8, 107.0, 101.0, 101.5),
        ];
        let event = PatternDetector::default().current(&bars).unwrap();
        assert_eq!(event.kind, PatternKind::EveningStar);
        assert_eq!(event.direction.sign(), -1);
        assert_eq!(event.trigger, 107.0);
    }

    #[test]
    fn no_patterns_on_steady_trend() {
        let closes: Vec<f64> = (0..40).map(|i| 100.0 + i as f64).collect();
        let bars = make_bars(&closes);
        let detector = PatternDetector::default();
        assert!(detector.detect(&bars).is_empty());
        assert!(detector.current(&bars).is_none());
    }

    #[test]
    fn summary_requires_window() {
        let bars = make_bars(&[100.0; 29]);
        let err = PatternDetector::default().summary(&bars).unwrap_err();
        assert_eq!(err, CoreError::insufficient("pattern summary", 30, 29));
    }

    #[test]
    fn events_out_of_range_are_empty() {
        assert!(PatternDetector::default().events_at(&[], 0).is_empty());
        assert!(PatternDetector::default().current(&[]).is_none());
    }
}
