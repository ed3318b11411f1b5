//! Baseline diff.

use std::collections::BTreeMap;

use regimelab_core::Regime;
use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RegimeChange {
    pub ticker: String,
    pub from: Regime,
    pub to: Regime,
}

/// Tickers present in both maps whose regime differs, in ticker order.
///
/// Tickers new to the universe have nothing to compare against and are not
/// reported.
pub fn detect_changes(
    baseline: &BTreeMap<String, Regime>,
    current: &BTreeMap<String, Regime>,
) -> Vec<RegimeChange> {
    current
        .iter()
        .filter_map(|(ticker, &to)| match baseline.get(ticker) {
            Some(&from) if from != to => Some(RegimeChange {
                ticker: ticker.clone(),
                from,
                to,
            }),
            _ => None,
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    fn map(entries: &[(&str, Regime)]) -> BTreeMap<String, Regime> {
        entries.iter().map(|(t, r)| (t.to_string(), *r)).collect()
    }

    #[test]
    fn single_flip_is_one_change() {
        let changes = detect_changes(
            &map(&[("AAA", Regime::Bear)]),
            &map(&[("AAA", Regime::Bull)]),
        );
        assert_eq!(
            changes,
            vec![RegimeChange {
                ticker: "AAA".into(),
                from: Regime::Bear,
                to: Regime::Bull
            }]
        );
    }

    #[test]
    fn identical_state_has_no_changes() {
        let m = map(&[("AAA", Regime::Bear), ("BBB", Regime::Sideways)]);
        assert!(detect_changes(&m, &m).is_empty());
    }

    #[test]
    fn new_and_dropped_tickers_are_ignored() {
        let baseline = map(&[("OLD", Regime::Bull), ("AAA", Regime::Sideways)]);
        let current = map(&[("NEW", Regime::Bear), ("AAA", Regime::Bear)]);
        let changes = detect_changes(&baseline, &current);
        assert_eq!(changes.len(), 1);
        assert_eq!(changes[0].ticker, "AAA");
    }
}
