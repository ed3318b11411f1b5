//! Property tests for the alert service invariants.
//!
//! 1. Change detection only reports tickers whose regime actually moved
//! 2. A day that already has a recorded run, or a rest day, is never due

use std::collections::BTreeMap;

use chrono::{DateTime, Datelike, Days, Duration, NaiveDate, TimeZone, Utc, Weekday};
use chrono_tz::America::Chicago;
use proptest::prelude::*;
use regimelab_alert::{detect_changes, evaluate, ScheduleDecision, SchedulePolicy, SkipReason};
use regimelab_core::Regime;

// ── Strategies ───────────────────────────────────────────────────────

fn arb_regime() -> impl Strategy<Value = Regime> {
    prop_oneof![Just(Regime::Bear), Just(Regime::Sideways), Just(Regime::Bull)]
}

/// Small ticker alphabet so the two maps overlap often.
fn arb_regime_map() -> impl Strategy<Value = BTreeMap<String, Regime>> {
    prop::collection::btree_map("[A-F]{1,2}", arb_regime(), 0..12)
}

/// Any instant in 2024.
fn arb_instant() -> impl Strategy<Value = DateTime<Utc>> {
    let start = Utc.with_ymd_and_hms(2024, 1, 1, 0, 0, 0).unwrap().timestamp();
    (0i64..366 * 24 * 3600).prop_map(move |offset| {
        Utc.timestamp_opt(start + offset, 0).single().unwrap()
    })
}

/// Some instant on a Sunday in Chicago during 2024, within ten hours of noon.
fn arb_sunday() -> impl Strategy<Value = DateTime<Utc>> {
    (0u64..52, -36_000i64..36_000).prop_map(|(week, offset)| {
        // 2024-01-07 is a Sunday
        let day = NaiveDate::from_ymd_opt(2024, 1, 7).unwrap() + Days::new(week * 7);
        let noon = Chicago
            .from_local_datetime(&day.and_hms_opt(12, 0, 0).unwrap())
            .single()
            .unwrap();
        noon.with_timezone(&Utc) + Duration::seconds(offset)
    })
}

// ── 1. Change detection ──────────────────────────────────────────────

proptest! {
    #![proptest_config(ProptestConfig::with_cases(256))]

    #[test]
    fn changes_are_exactly_the_moved_common_tickers(
        baseline in arb_regime_map(),
        current in arb_regime_map(),
    ) {
        let changes = detect_changes(&baseline, &current);

        for c in &changes {
            prop_assert_ne!(c.from, c.to);
            prop_assert_eq!(baseline.get(&c.ticker), Some(&c.from));
            prop_assert_eq!(current.get(&c.ticker), Some(&c.to));
        }

        let expected = current
            .iter()
            .filter(|(t, r)| baseline.get(*t).is_some_and(|b| b != *r))
            .count();
        prop_assert_eq!(changes.len(), expected);

        // ticker order, no duplicates
        let tickers: Vec<&String> = changes.iter().map(|c| &c.ticker).collect();
        prop_assert!(tickers.windows(2).all(|w| w[0] < w[1]));
    }

    #[test]
    fn unchanged_map_reports_nothing(map in arb_regime_map()) {
        prop_assert!(detect_changes(&map, &map).is_empty());
    }
}

// ── 2. Once per day ──────────────────────────────────────────────────

proptest! {
    #![proptest_config(ProptestConfig::with_cases(512))]

    #[test]
    fn recorded_day_is_never_due(now in arb_instant()) {
        let policy = SchedulePolicy::default();
        let today = policy.local_date(now);

        let decision = evaluate(now, Some(today), &policy);

        prop_assert_ne!(decision, ScheduleDecision::Due);
    }

    #[test]
    fn rest_day_is_never_due(now in arb_sunday(), ran_before in any::<bool>()) {
        let policy = SchedulePolicy::default();
        prop_assert_eq!(policy.local_time(now).weekday(), Weekday::Sun);
        let last_run = ran_before.then(|| policy.local_date(now).pred_opt().unwrap());

        prop_assert_eq!(
            evaluate(now, last_run, &policy),
            ScheduleDecision::Skipped(SkipReason::RestDay(policy.rest_day))
        );
    }
}
