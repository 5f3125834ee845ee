//! Renders jobs back into human-readable text for listings and
//! confirmations. Pure: same job and timezone in, same string out.

use chrono_tz::Tz;

use crate::reminder::types::{Audience, PersistedJob, RecurrenceSpec};

const DAY_NAMES: [&str; 7] = [
    "Sunday",
    "Monday",
    "Tuesday",
    "Wednesday",
    "Thursday",
    "Friday",
    "Saturday",
];

/// One-line rendering of a job, with times shown in `tz`.
pub fn format_job(job: &PersistedJob, tz: Tz) -> String {
    let local_next = job.job.next.with_timezone(&tz);
    format!(
        "[{}] remind {} to {} — {} (next: {})",
        job.id,
        audience_word(job.job.message_info.audience),
        job.job.message_info.message,
        spec_phrase(job, tz),
        local_next.format("%Y-%m-%d %H:%M %Z"),
    )
}

fn audience_word(audience: Audience) -> &'static str {
    match audience {
        Audience::Me => "me",
        Audience::Team => "team",
        Audience::Here => "here",
        Audience::Room => "room",
    }
}

fn spec_phrase(job: &PersistedJob, tz: Tz) -> String {
    let local_next = job.job.next.with_timezone(&tz);
    let time = local_next.format("%H:%M");
    // Stored weekdays are UTC; shift them back by the calendar-day delta the
    // display timezone introduces at the next occurrence.
    let shift =
        (local_next.date_naive() - job.job.next.date_naive()).num_days() as i8;

    match &job.job.spec {
        RecurrenceSpec::SingleShot { days, .. } => {
            format!("once on {} at {}", day_phrase(days, shift), time)
        }
        RecurrenceSpec::Weekly {
            days, interval, ..
        } => {
            let days = day_phrase(days, shift);
            match interval {
                0 | 1 => format!("every {days} at {time}"),
                2 => format!("every other {days} at {time}"),
                n => format!("every {} {days} at {time}", ordinal(*n)),
            }
        }
        RecurrenceSpec::Monthly { day_of_month, .. } => {
            format!("every {} of the month at {}", ordinal(*day_of_month as u32), time)
        }
    }
}

fn day_phrase(days: &[u8], shift: i8) -> String {
    let mut days: Vec<u8> = days
        .iter()
        .map(|d| (*d as i8 + shift).rem_euclid(7) as u8)
        .collect();
    days.sort_unstable();
    days.dedup();

    let names: Vec<&str> = days
        .iter()
        .map(|d| DAY_NAMES[(*d % 7) as usize])
        .collect();
    match names.len() {
        0 => "Sunday".to_string(),
        1 => names[0].to_string(),
        2 => format!("{} and {}", names[0], names[1]),
        n => format!("{} and {}", names[..n - 1].join(", "), names[n - 1]),
    }
}

fn ordinal(n: u32) -> String {
    let suffix = match (n % 10, n % 100) {
        (1, 11) | (2, 12) | (3, 13) => "th",
        (1, _) => "st",
        (2, _) => "nd",
        (3, _) => "rd",
        _ => "th",
    };
    format!("{n}{suffix}")
}
