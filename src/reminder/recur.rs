//! Recurrence arithmetic — computes the next occurrence of a spec.
//!
//! All math runs in UTC on specs whose hour/minute were normalized at parse
//! time. Results are strictly after the `previous` instant and always have
//! seconds and sub-second components zeroed.

use chrono::{DateTime, Datelike, Duration, NaiveDate, NaiveTime, Timelike, Utc};

use crate::reminder::types::RecurrenceSpec;

/// Next occurrence of `spec` strictly after `previous`.
///
/// Single-shot specs are treated as a degenerate weekly recurrence with
/// interval 1 so catch-up logic can reuse this function; the job itself is
/// still deleted rather than requeued after it fires.
pub fn next_occurrence(previous: DateTime<Utc>, spec: &RecurrenceSpec) -> DateTime<Utc> {
    match spec {
        RecurrenceSpec::SingleShot { days, hour, minute } => {
            next_weekly(previous, days, 1, *hour, *minute)
        }
        RecurrenceSpec::Weekly {
            days,
            interval,
            hour,
            minute,
        } => next_weekly(previous, days, (*interval).max(1), *hour, *minute),
        RecurrenceSpec::Monthly {
            day_of_month,
            hour,
            minute,
        } => next_monthly(previous, *day_of_month, *hour, *minute),
    }
}

/// Repeatedly advances `from` until the occurrence is strictly after `now`.
/// This collapses any backlog of missed firings into a single upcoming one,
/// which is the intended catch-up policy.
pub fn advance_past(now: DateTime<Utc>, from: DateTime<Utc>, spec: &RecurrenceSpec) -> DateTime<Utc> {
    let mut next = from;
    loop {
        next = next_occurrence(next, spec);
        if next > now {
            return next;
        }
    }
}

fn next_weekly(
    previous: DateTime<Utc>,
    days: &[u8],
    interval: u32,
    hour: u8,
    minute: u8,
) -> DateTime<Utc> {
    let mut days: Vec<u8> = days.iter().map(|d| d % 7).collect();
    days.sort_unstable();
    days.dedup();
    if days.is_empty() {
        days.push(previous.weekday().num_days_from_sunday() as u8);
    }

    let prev_dow = previous.weekday().num_days_from_sunday() as u8;
    // Same-day candidates count only when the target time is strictly later.
    let target_later_today = (hour as u32, minute as u32, 0, 0)
        > (
            previous.hour(),
            previous.minute(),
            previous.second(),
            previous.nanosecond(),
        );

    let delta_days = days
        .iter()
        .find_map(|&d| {
            if d > prev_dow || (d == prev_dow && target_later_today) {
                Some((d - prev_dow) as i64)
            } else {
                None
            }
        })
        .unwrap_or_else(|| {
            // Exhausted the current cycle: jump `interval` weeks and take the
            // smallest candidate weekday.
            days[0] as i64 - prev_dow as i64 + 7 * interval as i64
        });

    at_time(
        previous.date_naive() + Duration::days(delta_days),
        hour,
        minute,
    )
}

fn next_monthly(previous: DateTime<Utc>, day_of_month: u8, hour: u8, minute: u8) -> DateTime<Utc> {
    let dom = day_of_month.clamp(1, 31) as u32;
    let target_this_month = clamp_to_month(previous.year(), previous.month(), dom);

    let prev_pos = (
        previous.day(),
        previous.hour(),
        previous.minute(),
        previous.second(),
        previous.nanosecond(),
    );
    let target_pos = (target_this_month, hour as u32, minute as u32, 0, 0);

    let (year, month, day) = if prev_pos < target_pos {
        (previous.year(), previous.month(), target_this_month)
    } else {
        let (year, month) = if previous.month() == 12 {
            (previous.year() + 1, 1)
        } else {
            (previous.year(), previous.month() + 1)
        };
        (year, month, clamp_to_month(year, month, dom))
    };

    let date = NaiveDate::from_ymd_opt(year, month, day)
        .unwrap_or_else(|| previous.date_naive() + Duration::days(1));
    at_time(date, hour, minute)
}

/// Days 29-31 that don't exist in the target month clamp to its last day.
fn clamp_to_month(year: i32, month: u32, dom: u32) -> u32 {
    dom.min(days_in_month(year, month))
}

pub(crate) fn days_in_month(year: i32, month: u32) -> u32 {
    let (next_year, next_month) = if month == 12 {
        (year + 1, 1)
    } else {
        (year, month + 1)
    };
    NaiveDate::from_ymd_opt(next_year, next_month, 1)
        .and_then(|first| first.pred_opt())
        .map(|last| last.day())
        .unwrap_or(28)
}

fn at_time(date: NaiveDate, hour: u8, minute: u8) -> DateTime<Utc> {
    date.and_hms_opt(hour.min(23) as u32, minute.min(59) as u32, 0)
        .unwrap_or_else(|| date.and_time(NaiveTime::MIN))
        .and_utc()
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;

    fn utc(y: i32, mo: u32, d: u32, h: u32, mi: u32, s: u32) -> DateTime<Utc> {
        Utc.with_ymd_and_hms(y, mo, d, h, mi, s).unwrap()
    }

    // Weekday reference: 2024-01-01 is a Monday.

    #[test]
    fn test_weekly_single_day_advances_one_week() {
        // Monday 09:00 with a Monday/09:00 spec: same time is not strictly
        // later, so the next occurrence is the following Monday.
        let spec = RecurrenceSpec::Weekly {
            days: vec![1],
            interval: 1,
            hour: 9,
            minute: 0,
        };
        let next = next_occurrence(utc(2024, 1, 1, 9, 0, 0), &spec);
        assert_eq!(next, utc(2024, 1, 8, 9, 0, 0));
    }

    #[test]
    fn test_weekly_same_day_later_time_counts() {
        let spec = RecurrenceSpec::Weekly {
            days: vec![1],
            interval: 1,
            hour: 17,
            minute: 30,
        };
        let next = next_occurrence(utc(2024, 1, 1, 9, 0, 0), &spec);
        assert_eq!(next, utc(2024, 1, 1, 17, 30, 0));
    }

    #[test]
    fn test_weekly_multi_day_takes_nearest() {
        // Mon+Fri spec evaluated from a Tuesday lands on Friday.
        let spec = RecurrenceSpec::Weekly {
            days: vec![5, 1],
            interval: 1,
            hour: 9,
            minute: 0,
        };
        let next = next_occurrence(utc(2024, 1, 2, 10, 0, 0), &spec);
        assert_eq!(next, utc(2024, 1, 5, 9, 0, 0));
        // ...and from that Friday wraps to Monday next week.
        let next = next_occurrence(next, &spec);
        assert_eq!(next, utc(2024, 1, 8, 9, 0, 0));
    }

    #[test]
    fn test_weekly_interval_two_skips_a_week() {
        let spec = RecurrenceSpec::Weekly {
            days: vec![5],
            interval: 2,
            hour: 9,
            minute: 0,
        };
        // From Friday 09:00 the cycle is exhausted; two weeks out.
        let next = next_occurrence(utc(2024, 1, 5, 9, 0, 0), &spec);
        assert_eq!(next, utc(2024, 1, 19, 9, 0, 0));
    }

    #[test]
    fn test_single_shot_behaves_as_weekly_interval_one() {
        let spec = RecurrenceSpec::SingleShot {
            days: vec![2],
            hour: 16,
            minute: 0,
        };
        // Monday 10:00 -> Tuesday 16:00.
        let next = next_occurrence(utc(2024, 1, 1, 10, 0, 0), &spec);
        assert_eq!(next, utc(2024, 1, 2, 16, 0, 0));
    }

    #[test]
    fn test_monthly_same_month_when_day_ahead() {
        let spec = RecurrenceSpec::Monthly {
            day_of_month: 5,
            hour: 0,
            minute: 0,
        };
        let next = next_occurrence(utc(2024, 1, 2, 12, 0, 0), &spec);
        assert_eq!(next, utc(2024, 1, 5, 0, 0, 0));
    }

    #[test]
    fn test_monthly_next_month_when_day_passed() {
        let spec = RecurrenceSpec::Monthly {
            day_of_month: 5,
            hour: 9,
            minute: 0,
        };
        let next = next_occurrence(utc(2024, 1, 5, 9, 0, 0), &spec);
        assert_eq!(next, utc(2024, 2, 5, 9, 0, 0));
    }

    #[test]
    fn test_monthly_december_wraps_to_january() {
        let spec = RecurrenceSpec::Monthly {
            day_of_month: 10,
            hour: 8,
            minute: 15,
        };
        let next = next_occurrence(utc(2023, 12, 20, 0, 0, 0), &spec);
        assert_eq!(next, utc(2024, 1, 10, 8, 15, 0));
    }

    #[test]
    fn test_monthly_day_31_clamps_to_month_end() {
        let spec = RecurrenceSpec::Monthly {
            day_of_month: 31,
            hour: 9,
            minute: 0,
        };
        // 2024 is a leap year: January 31 -> February 29.
        let next = next_occurrence(utc(2024, 1, 31, 9, 0, 0), &spec);
        assert_eq!(next, utc(2024, 2, 29, 9, 0, 0));
        // ...and February 29 -> March 31.
        let next = next_occurrence(next, &spec);
        assert_eq!(next, utc(2024, 3, 31, 9, 0, 0));
    }

    #[test]
    fn test_result_zeroes_seconds() {
        let spec = RecurrenceSpec::Weekly {
            days: vec![3],
            interval: 1,
            hour: 12,
            minute: 45,
        };
        let next = next_occurrence(utc(2024, 1, 1, 9, 23, 57), &spec);
        assert_eq!(next.second(), 0);
        assert_eq!(next, utc(2024, 1, 3, 12, 45, 0));
    }

    #[test]
    fn test_advance_past_collapses_backlog() {
        let spec = RecurrenceSpec::Weekly {
            days: vec![1],
            interval: 1,
            hour: 9,
            minute: 0,
        };
        // Three weeks behind: one call lands on the single nearest future
        // occurrence, never an intermediate one.
        let now = utc(2024, 1, 22, 10, 0, 0);
        let next = advance_past(now, utc(2024, 1, 1, 9, 0, 0), &spec);
        assert_eq!(next, utc(2024, 1, 29, 9, 0, 0));
    }

    #[test]
    fn test_advance_past_single_step_when_future() {
        let spec = RecurrenceSpec::Monthly {
            day_of_month: 1,
            hour: 0,
            minute: 0,
        };
        let now = utc(2024, 1, 10, 0, 0, 0);
        let next = advance_past(now, utc(2024, 1, 1, 0, 0, 0), &spec);
        assert_eq!(next, utc(2024, 2, 1, 0, 0, 0));
    }
}
