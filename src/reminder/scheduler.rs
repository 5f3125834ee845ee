//! The scheduler loop — a single pending timer over the job queue.
//!
//! The loop is an explicit state machine: Idle (queue empty, no timer),
//! Armed (timer set for the earliest job), Draining (executing everything
//! that is due). All queue mutation is serialized through the command
//! mailbox onto this task, so no locks are needed; a mutation that changes
//! the earliest job simply causes the next loop turn to re-arm the timer.
//!
//! Persistence happens before dispatch: a crash mid-dispatch can lose a
//! single send (at-least-once, except on crash) but can never duplicate a
//! recurrence on restart.

use chrono::{DateTime, Utc};
use chrono_tz::Tz;
use std::sync::Arc;
use tokio::sync::{mpsc, oneshot};
use tokio_util::sync::CancellationToken;
use tracing::{debug, error, info, warn};

use crate::bus::{audience_tag, Envelope, Messenger};
use crate::reminder::error::ReminderError;
use crate::reminder::recur;
use crate::reminder::store::JobStore;
use crate::reminder::types::{Job, JobKind, MessageInfo, PersistedJob};
use crate::reminder::parse;

// ---------------------------------------------------------------------------
// Clock
// ---------------------------------------------------------------------------

/// Injectable time source so the loop's states are testable without real
/// wall-clock waits.
pub trait Clock: Send + Sync {
    fn now(&self) -> DateTime<Utc>;
}

#[derive(Debug, Clone, Copy, Default)]
pub struct SystemClock;

impl Clock for SystemClock {
    fn now(&self) -> DateTime<Utc> {
        Utc::now()
    }
}

/// Manually driven clock for deterministic tests.
#[derive(Debug)]
pub struct ManualClock {
    now: std::sync::Mutex<DateTime<Utc>>,
}

impl ManualClock {
    pub fn new(start: DateTime<Utc>) -> Self {
        Self {
            now: std::sync::Mutex::new(start),
        }
    }

    pub fn set(&self, to: DateTime<Utc>) {
        *self.now.lock().unwrap_or_else(|e| e.into_inner()) = to;
    }

    pub fn advance(&self, by: chrono::Duration) {
        let mut now = self.now.lock().unwrap_or_else(|e| e.into_inner());
        *now += by;
    }
}

impl Clock for ManualClock {
    fn now(&self) -> DateTime<Utc> {
        *self.now.lock().unwrap_or_else(|e| e.into_inner())
    }
}

// ---------------------------------------------------------------------------
// Commands
// ---------------------------------------------------------------------------

/// Where a reminder request came from; becomes the job's delivery address.
#[derive(Debug, Clone)]
pub struct Origin {
    pub user_id: String,
    pub room: String,
    pub thread_id: Option<String>,
}

/// Mutations and queries, serialized onto the scheduler task.
#[derive(Debug)]
pub enum Command {
    AddFromText {
        text: String,
        timezone: Option<Tz>,
        origin: Origin,
        reply: oneshot::Sender<Result<PersistedJob, ReminderError>>,
    },
    UpdateMessage {
        id: u64,
        message: String,
        reply: oneshot::Sender<Result<PersistedJob, ReminderError>>,
    },
    UpdateSpec {
        id: u64,
        spec: String,
        timezone: Option<Tz>,
        reply: oneshot::Sender<Result<PersistedJob, ReminderError>>,
    },
    Remove {
        id: u64,
        reply: oneshot::Sender<Result<PersistedJob, ReminderError>>,
    },
    List {
        rooms: Vec<String>,
        reply: oneshot::Sender<Vec<PersistedJob>>,
    },
}

// ---------------------------------------------------------------------------
// Scheduler
// ---------------------------------------------------------------------------

enum Wake {
    Command(Option<Command>),
    Timer,
    Shutdown,
}

pub struct Scheduler {
    store: JobStore,
    clock: Arc<dyn Clock>,
    messenger: Arc<dyn Messenger>,
    default_tz: Tz,
    rx: mpsc::Receiver<Command>,
    shutdown: CancellationToken,
}

impl Scheduler {
    pub fn new(
        store: JobStore,
        clock: Arc<dyn Clock>,
        messenger: Arc<dyn Messenger>,
        default_tz: Tz,
        rx: mpsc::Receiver<Command>,
        shutdown: CancellationToken,
    ) -> Self {
        Self {
            store,
            clock,
            messenger,
            default_tz,
            rx,
            shutdown,
        }
    }

    pub async fn run(mut self) {
        info!(jobs = self.store.len(), "reminder scheduler started");
        // Startup reconciliation: fire anything that came due while the
        // process was down.
        self.drain_due();

        loop {
            let deadline = self.store.front_next();
            let clock = Arc::clone(&self.clock);
            let shutdown = self.shutdown.clone();

            let wake = tokio::select! {
                _ = shutdown.cancelled() => Wake::Shutdown,
                cmd = self.rx.recv() => Wake::Command(cmd),
                _ = sleep_until_due(clock.as_ref(), deadline), if deadline.is_some() => Wake::Timer,
            };

            match wake {
                Wake::Shutdown | Wake::Command(None) => break,
                Wake::Command(Some(cmd)) => self.handle_command(cmd),
                Wake::Timer => self.drain_due(),
            }
        }
        info!("reminder scheduler stopped");
    }

    fn handle_command(&mut self, cmd: Command) {
        match cmd {
            Command::AddFromText {
                text,
                timezone,
                origin,
                reply,
            } => {
                let _ = reply.send(self.add_from_text(&text, timezone, origin));
            }
            Command::UpdateMessage { id, message, reply } => {
                let _ = reply.send(self.store.update_message(id, &message));
            }
            Command::UpdateSpec {
                id,
                spec,
                timezone,
                reply,
            } => {
                let tz = timezone.unwrap_or(self.default_tz);
                let _ = reply.send(self.store.update_spec(id, &spec, tz, self.clock.now()));
            }
            Command::Remove { id, reply } => {
                let _ = reply.send(self.store.remove_job(id));
            }
            Command::List { rooms, reply } => {
                let _ = reply.send(self.store.jobs_for_rooms(&rooms));
            }
        }
    }

    fn add_from_text(
        &mut self,
        text: &str,
        timezone: Option<Tz>,
        origin: Origin,
    ) -> Result<PersistedJob, ReminderError> {
        let tz = timezone.unwrap_or(self.default_tz);
        let parsed = parse::parse(text, tz, self.clock.now())?;
        let job = Job {
            kind: parsed.definition.kind,
            message_info: MessageInfo {
                user_id: origin.user_id,
                message: parsed.message,
                room: origin.room,
                thread_id: origin.thread_id,
                audience: parsed.audience,
            },
            spec: parsed.definition.spec,
            next: parsed.definition.next,
        };
        let persisted = self.store.add_job(job)?;
        debug!(job_id = persisted.id, next = %persisted.job.next, "job added");
        Ok(persisted)
    }

    /// Draining: claim every due job, requeue the recurring ones past now,
    /// persist, then dispatch. Per-job dispatch failures are logged and
    /// never block sibling jobs or the re-arm.
    fn drain_due(&mut self) {
        let now = self.clock.now();
        let due = self.store.claim_due(now);
        if due.is_empty() {
            return;
        }

        let mut dispatches = Vec::with_capacity(due.len());
        for mut job in due {
            let info = &job.job.message_info;
            let envelope = Envelope {
                user_id: info.user_id.clone(),
                room: info.room.clone(),
                thread_id: info.thread_id.clone(),
            };
            let text = format!(
                "{}{}",
                audience_tag(info.audience, &info.user_id),
                info.message
            );
            dispatches.push((job.id, envelope, text));

            match job.job.kind {
                JobKind::Recurring => {
                    // Missed firings collapse into the single nearest future
                    // occurrence.
                    job.job.next = recur::advance_past(now, job.job.next, &job.job.spec);
                    self.store.reinsert(job);
                }
                JobKind::Single => {
                    debug!(job_id = job.id, "single-shot job fired, removing");
                }
            }
        }

        // Persist the advanced queue before any message goes out.
        if let Err(err) = self.store.persist() {
            error!(error = %err, "failed to persist job queue while draining");
        }

        for (job_id, envelope, text) in dispatches {
            let messenger = Arc::clone(&self.messenger);
            tokio::spawn(async move {
                match messenger.send(&envelope, &text).await {
                    Ok(()) => debug!(job_id, "reminder dispatched"),
                    Err(err) => warn!(job_id, error = %err, "reminder dispatch failed"),
                }
            });
        }
    }
}

async fn sleep_until_due(clock: &dyn Clock, deadline: Option<DateTime<Utc>>) {
    match deadline {
        Some(deadline) => {
            let wait = (deadline - clock.now())
                .to_std()
                .unwrap_or(std::time::Duration::ZERO);
            tokio::time::sleep(wait).await;
        }
        None => std::future::pending().await,
    }
}
