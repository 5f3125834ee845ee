//! Reminder job data types.
//!
//! Weekday indices follow the persisted convention 0 = Sunday .. 6 =
//! Saturday. Hours and minutes in a [`RecurrenceSpec`] are always stored
//! normalized to UTC; the parser applies the user-timezone adjustment once,
//! at parse time, and every later recurrence computation runs in UTC only.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// Schedule of a reminder job.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum RecurrenceSpec {
    /// One future occurrence: the first matching weekday/time after "now".
    SingleShot {
        days: Vec<u8>,
        hour: u8,
        minute: u8,
    },
    /// Recurs every `interval` weeks on the given weekday(s); with several
    /// weekdays the nearest matching day is taken each cycle.
    Weekly {
        days: Vec<u8>,
        interval: u32,
        hour: u8,
        minute: u8,
    },
    /// Recurs on a fixed day of the month (1-31).
    Monthly {
        day_of_month: u8,
        hour: u8,
        minute: u8,
    },
}

impl RecurrenceSpec {
    pub fn is_recurring(&self) -> bool {
        !matches!(self, RecurrenceSpec::SingleShot { .. })
    }

    /// Stored (UTC) time of day.
    pub fn time_of_day(&self) -> (u8, u8) {
        match self {
            RecurrenceSpec::SingleShot { hour, minute, .. }
            | RecurrenceSpec::Weekly { hour, minute, .. }
            | RecurrenceSpec::Monthly { hour, minute, .. } => (*hour, *minute),
        }
    }
}

/// Who the fired reminder is addressed to. Controls the tag the delivery
/// layer prepends to the message text.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Audience {
    /// Mention the requesting user.
    #[default]
    Me,
    Team,
    Here,
    Room,
}

/// Delivery info carried by a job. Immutable once the job executes.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct MessageInfo {
    pub user_id: String,
    pub message: String,
    pub room: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub thread_id: Option<String>,
    #[serde(default)]
    pub audience: Audience,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum JobKind {
    /// Fires exactly once, then the job is deleted.
    Single,
    /// `next` is recomputed and re-persisted after every firing.
    Recurring,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Job {
    pub kind: JobKind,
    pub message_info: MessageInfo,
    pub spec: RecurrenceSpec,
    /// Next occurrence, UTC, seconds zeroed.
    pub next: DateTime<Utc>,
}

/// A job that has been admitted to the store. `id` is allocated once,
/// monotonically, and owned by the job for its entire lifetime.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PersistedJob {
    pub id: u64,
    #[serde(flatten)]
    pub job: Job,
}

/// Parser output describing the schedule half of a reminder: the spec, the
/// derived job kind, and the first occurrence.
#[derive(Debug, Clone, PartialEq)]
pub struct JobDefinition {
    pub kind: JobKind,
    pub spec: RecurrenceSpec,
    pub next: DateTime<Utc>,
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;

    #[test]
    fn test_persisted_job_serialization_roundtrip() {
        let job = PersistedJob {
            id: 7,
            job: Job {
                kind: JobKind::Recurring,
                message_info: MessageInfo {
                    user_id: "u1".into(),
                    message: "ship the release".into(),
                    room: "eng".into(),
                    thread_id: None,
                    audience: Audience::Me,
                },
                spec: RecurrenceSpec::Weekly {
                    days: vec![2],
                    interval: 2,
                    hour: 16,
                    minute: 33,
                },
                next: Utc.with_ymd_and_hms(2024, 1, 9, 16, 33, 0).unwrap(),
            },
        };

        let json = serde_json::to_string(&job).unwrap();
        assert!(json.contains("\"kind\":\"weekly\""));
        assert!(json.contains("\"id\":7"));
        assert!(json.contains("\"interval\":2"));
        // thread_id omitted when absent
        assert!(!json.contains("threadId"));

        let back: PersistedJob = serde_json::from_str(&json).unwrap();
        assert_eq!(back, job);
    }

    #[test]
    fn test_audience_defaults_to_me() {
        let json = r#"{"userId":"u","message":"m","room":"r"}"#;
        let info: MessageInfo = serde_json::from_str(json).unwrap();
        assert_eq!(info.audience, Audience::Me);
    }
}
