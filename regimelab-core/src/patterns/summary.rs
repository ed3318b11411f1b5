use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};

use super::{Direction, PatternEvent, PatternKind};

/// Pattern tally over a trailing window of bars.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PatternSummary {
    pub window: usize,
    pub total: usize,
    pub bullish: usize,
    pub bearish: usize,
    pub counts: BTreeMap<PatternKind, usize>,
    /// Patterns per bar, as a percentage.
    pub frequency_pct: f64,
    /// Events inside the window, oldest first.
    pub recent: Vec<PatternEvent>,
}

impl PatternSummary {
    pub fn from_events(window: usize, recent: Vec<PatternEvent>) -> Self {
        let mut counts = BTreeMap::new();
        let mut bullish = 0;
        let mut bearish = 0;
        for event in &recent {
            *counts.entry(event.kind).or_insert(0) += 1;
            match event.direction {
                Direction::Bullish => bullish += 1,
                Direction::Bearish => bearish += 1,
            }
        }
        let total = recent.len();
        Self {
            window,
            total,
            bullish,
            bearish,
            counts,
            frequency_pct: if window == 0 {
                0.0
            } else {
                total as f64 / window as f64 * 100.0
            },
            recent,
        }
    }

    /// Share of the window's patterns pointing in `direction`; 0 when empty.
    pub fn share(&self, direction: Direction) -> f64 {
        if self.total == 0 {
            return 0.0;
        }
        let n = match direction {
            Direction::Bullish => self.bullish,
            Direction::Bearish => self.bearish,
        };
        n as f64 / self.total as f64
    }

    pub fn count(&self, kind: PatternKind) -> usize {
        self.counts.get(&kind).copied().unwrap_or(0)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::NaiveDate;

    fn event(i: usize, kind: PatternKind) -> PatternEvent {
        PatternEvent {
            bar_index: i,
            date: NaiveDate::from_ymd_opt(2024, 1, 1).unwrap() + chrono::Duration::days(i as i64),
            kind,
            direction: kind.direction(),
            trigger: 100.0,
        }
    }

    #[test]
    fn tallies_by_kind_and_direction() {
        let summary = PatternSummary::from_events(
            30,
            vec![
                event(3, PatternKind::Hammer),
                event(9, PatternKind::BearishEngulfing),
                event(20, PatternKind::Hammer),
            ],
        );
        assert_eq!(summary.total, 3);
        assert_eq!(summary.bullish, 2);
        assert_eq!(summary.bearish, 1);
        assert_eq!(summary.count(PatternKind::Hammer), 2);
        assert_eq!(summary.count(PatternKind::MorningStar), 0);
        assert!((summary.frequency_pct - 10.0).abs() < 1e-12);
        assert!((summary.share(Direction::Bullish) - 2.0 / 3.0).abs() < 1e-12);
    }

    #[test]
    fn empty_window_has_zero_share() {
        let summary = PatternSummary::from_events(30, Vec::new());
        assert_eq!(summary.share(Direction::Bearish), 0.0);
        assert_eq!(summary.frequency_pct, 0.0);
    }
}
