//! Command-facing reminder API.
//!
//! [`ReminderService`] is the handle chat-command handlers talk to. Every
//! call is forwarded to the scheduler task through its mailbox, which is
//! what serializes mutation onto a single thread of control.

use chrono_tz::Tz;
use std::sync::Arc;
use tokio::sync::{mpsc, oneshot};
use tokio::task::JoinHandle;
use tokio_util::sync::CancellationToken;

use crate::bus::Messenger;
use crate::reminder::error::ReminderError;
use crate::reminder::scheduler::{Clock, Command, Origin, Scheduler};
use crate::reminder::store::JobStore;
use crate::reminder::types::PersistedJob;

const MAILBOX_CAPACITY: usize = 64;

#[derive(Clone)]
pub struct ReminderService {
    tx: mpsc::Sender<Command>,
    shutdown: CancellationToken,
}

impl ReminderService {
    /// Spawn the scheduler task over `store` and return the service handle
    /// plus the task's join handle.
    pub fn spawn(
        store: JobStore,
        clock: Arc<dyn Clock>,
        messenger: Arc<dyn Messenger>,
        default_tz: Tz,
    ) -> (Self, JoinHandle<()>) {
        let (tx, rx) = mpsc::channel(MAILBOX_CAPACITY);
        let shutdown = CancellationToken::new();
        let scheduler = Scheduler::new(store, clock, messenger, default_tz, rx, shutdown.clone());
        let handle = tokio::spawn(scheduler.run());
        (Self { tx, shutdown }, handle)
    }

    /// Parse a free-text request and admit the resulting job.
    pub async fn add_job_from_text(
        &self,
        text: impl Into<String>,
        origin: Origin,
        timezone: Option<Tz>,
    ) -> Result<PersistedJob, ReminderError> {
        self.call(|reply| Command::AddFromText {
            text: text.into(),
            timezone,
            origin,
            reply,
        })
        .await?
    }

    pub async fn update_job_message(
        &self,
        id: u64,
        message: impl Into<String>,
    ) -> Result<PersistedJob, ReminderError> {
        self.call(|reply| Command::UpdateMessage {
            id,
            message: message.into(),
            reply,
        })
        .await?
    }

    /// Re-parse and replace a job's schedule; the job is untouched if the
    /// new spec does not parse.
    pub async fn update_job_spec(
        &self,
        id: u64,
        spec: impl Into<String>,
        timezone: Option<Tz>,
    ) -> Result<PersistedJob, ReminderError> {
        self.call(|reply| Command::UpdateSpec {
            id,
            spec: spec.into(),
            timezone,
            reply,
        })
        .await?
    }

    pub async fn remove_job(&self, id: u64) -> Result<PersistedJob, ReminderError> {
        self.call(|reply| Command::Remove { id, reply }).await?
    }

    /// Jobs for the given rooms, ascending by next occurrence; an empty
    /// list means all jobs.
    pub async fn jobs_for_rooms(
        &self,
        rooms: Vec<String>,
    ) -> Result<Vec<PersistedJob>, ReminderError> {
        self.call(|reply| Command::List { rooms, reply }).await
    }

    /// Ask the scheduler task to stop. Pending mailbox commands are dropped.
    pub fn shutdown(&self) {
        self.shutdown.cancel();
    }

    async fn call<T>(
        &self,
        make: impl FnOnce(oneshot::Sender<T>) -> Command,
    ) -> Result<T, ReminderError> {
        let (reply, rx) = oneshot::channel();
        self.tx
            .send(make(reply))
            .await
            .map_err(|_| ReminderError::SchedulerClosed)?;
        rx.await.map_err(|_| ReminderError::SchedulerClosed)
    }
}
