//! Run-window policy as a pure function of (now, last run, policy).
//!
//! ```text
//! rest day                      -> Skipped(RestDay)
//! last run date == local today  -> Skipped(AlreadyRan)
//! |local time - run time| <= w  -> Due            (for any configured run time)
//! otherwise                     -> NotDue
//! ```
//!
//! All comparisons use the wall clock of the policy's time zone. Windows are
//! matched on the local date, so a window must not span midnight;
//! `AlertConfig::schedule_policy` rejects one that does.

use std::fmt;

use chrono::{DateTime, Datelike, Duration, NaiveDate, NaiveTime, Utc, Weekday};
use chrono_tz::Tz;

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SchedulePolicy {
    pub timezone: Tz,
    pub run_times: Vec<NaiveTime>,
    /// Half-width of each run window.
    pub window: Duration,
    pub rest_day: Weekday,
}

impl Default for SchedulePolicy {
    fn default() -> Self {
        Self {
            timezone: chrono_tz::America::Chicago,
            run_times: [(8, 5), (15, 10)]
                .into_iter()
                .filter_map(|(h, m)| NaiveTime::from_hms_opt(h, m, 0))
                .collect(),
            window: Duration::minutes(5),
            rest_day: Weekday::Sun,
        }
    }
}

impl SchedulePolicy {
    /// Calendar date of `now` in the policy's zone.
    pub fn local_date(&self, now: DateTime<Utc>) -> NaiveDate {
        now.with_timezone(&self.timezone).date_naive()
    }

    pub fn local_time(&self, now: DateTime<Utc>) -> DateTime<Tz> {
        now.with_timezone(&self.timezone)
    }

    fn in_window(&self, now: DateTime<Utc>) -> bool {
        let local = now.with_timezone(&self.timezone).naive_local();
        self.run_times.iter().any(|t| {
            let scheduled = local.date().and_time(*t);
            (local - scheduled).num_seconds().abs() <= self.window.num_seconds()
        })
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SkipReason {
    RestDay(Weekday),
    AlreadyRan(NaiveDate),
}

impl fmt::Display for SkipReason {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            SkipReason::RestDay(day) => write!(f, "{day} is a rest day - skipping"),
            SkipReason::AlreadyRan(date) => write!(f, "already ran today ({date})"),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ScheduleDecision {
    Due,
    NotDue,
    Skipped(SkipReason),
}

pub fn evaluate(
    now: DateTime<Utc>,
    last_run: Option<NaiveDate>,
    policy: &SchedulePolicy,
) -> ScheduleDecision {
    let local = policy.local_time(now);
    if local.weekday() == policy.rest_day {
        return ScheduleDecision::Skipped(SkipReason::RestDay(policy.rest_day));
    }
    let today = local.date_naive();
    if last_run == Some(today) {
        return ScheduleDecision::Skipped(SkipReason::AlreadyRan(today));
    }
    if policy.in_window(now) {
        ScheduleDecision::Due
    } else {
        ScheduleDecision::NotDue
    }
}
