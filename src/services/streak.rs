//! Login streak calculator.

use chrono::{DateTime, NaiveDate, TimeZone, Utc};

use crate::time_utils::calendar_day;

/// Consecutive calendar days with at least one login, ending today or
/// yesterday as seen from `now`'s timezone.
///
/// A most recent login older than yesterday breaks the streak (0).
/// Logins dated after today (clock skew) are ignored.
pub fn compute_streak<Tz: TimeZone>(logins: &[DateTime<Utc>], now: &DateTime<Tz>) -> u32 {
    let tz = now.timezone();
    let today = now.date_naive();

    let mut days: Vec<NaiveDate> = logins
        .iter()
        .map(|ts| calendar_day(ts, &tz))
        .filter(|day| *day <= today)
        .collect();
    days.sort_unstable_by(|a, b| b.cmp(a));
    days.dedup();

    let Some(&latest) = days.first() else {
        return 0;
    };
    if (today - latest).num_days() > 1 {
        return 0;
    }

    let mut streak = 1;
    for pair in days.windows(2) {
        if (pair[0] - pair[1]).num_days() != 1 {
            break;
        }
        streak += 1;
    }
    streak
}
