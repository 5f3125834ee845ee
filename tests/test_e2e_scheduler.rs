//! End-to-end scheduler tests driven through the service handle.

mod common;

use std::sync::Arc;
use std::time::Duration;

use chrono::{DateTime, TimeZone, Utc};
use chrono_tz::Tz;
use tokio::time::timeout;

use nudgebot::brain::MemoryBrain;
use nudgebot::bus::MessageBus;
use nudgebot::reminder::error::ReminderError;
use nudgebot::reminder::scheduler::ManualClock;
use nudgebot::reminder::service::ReminderService;
use nudgebot::reminder::store::JobStore;
use nudgebot::reminder::types::{
    Audience, Job, JobKind, MessageInfo, RecurrenceSpec,
};

fn t0() -> DateTime<Utc> {
    // Monday 10:00 UTC.
    Utc.with_ymd_and_hms(2024, 1, 1, 10, 0, 0).unwrap()
}

fn utc(d: u32, h: u32, m: u32) -> DateTime<Utc> {
    Utc.with_ymd_and_hms(2024, 1, d, h, m, 0).unwrap()
}

fn recurring_weekly(next: DateTime<Utc>, message: &str) -> Job {
    Job {
        kind: JobKind::Recurring,
        message_info: MessageInfo {
            user_id: "alice".into(),
            message: message.into(),
            room: "eng".into(),
            thread_id: None,
            audience: Audience::Me,
        },
        spec: RecurrenceSpec::Weekly {
            days: vec![1],
            interval: 1,
            hour: 9,
            minute: 0,
        },
        next,
    }
}

fn single_shot(next: DateTime<Utc>, message: &str) -> Job {
    Job {
        kind: JobKind::Single,
        message_info: MessageInfo {
            user_id: "alice".into(),
            message: message.into(),
            room: "eng".into(),
            thread_id: None,
            audience: Audience::Me,
        },
        spec: RecurrenceSpec::SingleShot {
            days: vec![1],
            hour: 9,
            minute: 0,
        },
        next,
    }
}

#[tokio::test]
async fn test_add_and_list_jobs() {
    let store = JobStore::open(Box::new(MemoryBrain::new()), "jobs").unwrap();
    let bus = MessageBus::new();
    let clock = Arc::new(ManualClock::new(t0()));
    let (service, handle) =
        ReminderService::spawn(store, clock, Arc::new(bus.messenger()), Tz::UTC);

    let job = service
        .add_job_from_text(
            "remind team every 2nd Friday at 09:00 to review",
            common::origin(),
            None,
        )
        .await
        .unwrap();
    assert_eq!(job.job.kind, JobKind::Recurring);
    assert_eq!(
        job.job.spec,
        RecurrenceSpec::Weekly {
            days: vec![5],
            interval: 2,
            hour: 9,
            minute: 0,
        }
    );
    assert_eq!(job.job.message_info.message, "review");
    assert_eq!(job.job.message_info.audience, Audience::Team);
    assert_eq!(job.job.next, utc(5, 9, 0));

    let all = service.jobs_for_rooms(vec![]).await.unwrap();
    assert_eq!(all.len(), 1);
    assert!(service
        .jobs_for_rooms(vec!["other-room".into()])
        .await
        .unwrap()
        .is_empty());

    let err = service
        .add_job_from_text("this is not a reminder", common::origin(), None)
        .await
        .unwrap_err();
    assert!(matches!(err, ReminderError::Parse(_)));

    service.shutdown();
    let _ = handle.await;
}

#[tokio::test]
async fn test_startup_reconciliation_collapses_backlog() {
    let brain = Arc::new(MemoryBrain::new());
    let mut store =
        JobStore::open(Box::new(common::SharedBrain(brain.clone())), "jobs").unwrap();
    // A recurring job three weeks overdue and a single-shot long past.
    store.add_job(recurring_weekly(utc(1, 9, 0), "standup")).unwrap();
    store.add_job(single_shot(utc(2, 9, 0), "one-off")).unwrap();

    let bus = MessageBus::new();
    let mut out = bus.subscribe_outbound();
    let now = utc(22, 10, 0); // Monday, three weeks after Jan 1
    let clock = Arc::new(ManualClock::new(now));
    let (service, handle) =
        ReminderService::spawn(store, clock, Arc::new(bus.messenger()), Tz::UTC);

    // Both jobs fire exactly once each, despite the backlog.
    let first = timeout(Duration::from_secs(5), out.recv())
        .await
        .unwrap()
        .unwrap();
    let second = timeout(Duration::from_secs(5), out.recv())
        .await
        .unwrap()
        .unwrap();
    let mut contents = vec![first.content, second.content];
    contents.sort();
    assert_eq!(contents, vec!["@alice one-off", "@alice standup"]);

    let remaining = service.jobs_for_rooms(vec![]).await.unwrap();
    assert_eq!(remaining.len(), 1, "single-shot removed after firing");
    assert_eq!(remaining[0].job.kind, JobKind::Recurring);
    // Catch-up collapse: exactly one occurrence strictly after now.
    assert_eq!(remaining[0].job.next, utc(29, 9, 0));

    // The advanced queue was persisted before dispatch.
    let reopened = JobStore::open(Box::new(common::SharedBrain(brain)), "jobs").unwrap();
    assert_eq!(reopened.len(), 1);
    assert_eq!(reopened.front_next(), Some(utc(29, 9, 0)));

    service.shutdown();
    let _ = handle.await;
}

#[tokio::test(start_paused = true)]
async fn test_timer_fires_when_job_comes_due() {
    let store = JobStore::open(Box::new(MemoryBrain::new()), "jobs").unwrap();
    let bus = MessageBus::new();
    let mut out = bus.subscribe_outbound();
    let clock = Arc::new(ManualClock::new(t0()));
    let (service, handle) = ReminderService::spawn(
        store,
        clock.clone(),
        Arc::new(bus.messenger()),
        Tz::UTC,
    );

    service
        .add_job_from_text("remind me in one minute to hydrate", common::origin(), None)
        .await
        .unwrap();

    // Nothing fires while the clock sits before the due time.
    assert!(timeout(Duration::from_secs(5), out.recv()).await.is_err());

    clock.set(t0() + chrono::Duration::minutes(2));
    let msg = timeout(Duration::from_secs(600), out.recv())
        .await
        .expect("timer should fire once due")
        .unwrap();
    assert_eq!(msg.content, "@alice hydrate");
    assert_eq!(msg.room, "eng");

    assert!(service.jobs_for_rooms(vec![]).await.unwrap().is_empty());

    service.shutdown();
    let _ = handle.await;
}

#[tokio::test(start_paused = true)]
async fn test_removing_front_job_cancels_its_firing() {
    let store = JobStore::open(Box::new(MemoryBrain::new()), "jobs").unwrap();
    let bus = MessageBus::new();
    let mut out = bus.subscribe_outbound();
    let clock = Arc::new(ManualClock::new(t0()));
    let (service, handle) = ReminderService::spawn(
        store,
        clock.clone(),
        Arc::new(bus.messenger()),
        Tz::UTC,
    );

    let first = service
        .add_job_from_text("remind me in one minute to first", common::origin(), None)
        .await
        .unwrap();
    service
        .add_job_from_text("remind me in three minutes to second", common::origin(), None)
        .await
        .unwrap();

    service.remove_job(first.id).await.unwrap();

    // Past the removed job's due time: silence.
    clock.set(t0() + chrono::Duration::minutes(2));
    assert!(timeout(Duration::from_secs(30), out.recv()).await.is_err());

    // Past the second job's due time: it fires.
    clock.set(t0() + chrono::Duration::minutes(4));
    let msg = timeout(Duration::from_secs(600), out.recv())
        .await
        .expect("second job should fire")
        .unwrap();
    assert_eq!(msg.content, "@alice second");

    service.shutdown();
    let _ = handle.await;
}

#[tokio::test]
async fn test_update_spec_failure_leaves_job_intact() {
    let store = JobStore::open(Box::new(MemoryBrain::new()), "jobs").unwrap();
    let bus = MessageBus::new();
    let clock = Arc::new(ManualClock::new(t0()));
    let (service, handle) =
        ReminderService::spawn(store, clock, Arc::new(bus.messenger()), Tz::UTC);

    let job = service
        .add_job_from_text("remind me every Friday at 9 to ship", common::origin(), None)
        .await
        .unwrap();

    let err = service
        .update_job_spec(job.id, "every blorf", None)
        .await
        .unwrap_err();
    assert!(matches!(err, ReminderError::Parse(_)));

    let all = service.jobs_for_rooms(vec![]).await.unwrap();
    assert_eq!(all.len(), 1);
    assert_eq!(all[0].job.spec, job.job.spec);
    assert_eq!(all[0].job.next, job.job.next);

    // A valid update goes through and re-sorts the queue.
    let updated = service
        .update_job_spec(job.id, "every 3rd", None)
        .await
        .unwrap();
    assert_eq!(
        updated.job.spec,
        RecurrenceSpec::Monthly {
            day_of_month: 3,
            hour: 0,
            minute: 0,
        }
    );
    assert_eq!(updated.job.next, utc(3, 0, 0));

    let renamed = service
        .update_job_message(job.id, "ship the release")
        .await
        .unwrap();
    assert_eq!(renamed.job.message_info.message, "ship the release");

    service.shutdown();
    let _ = handle.await;
}
