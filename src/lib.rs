//! # nudgebot - Chat Reminder Bot
//!
//! Nudgebot turns free-text requests like "remind me every 2nd Tuesday at
//! 16:33 to ship the release" into persisted, recurring or one-shot jobs,
//! wakes up exactly when the next job is due, and dispatches the reminder
//! through the message bus.
//!
//! ## Features
//!
//! - **Natural-language schedules**: weekday lists, weekly intervals,
//!   day-of-month recurrences, relative offsets, 12/24-hour times
//! - **Timezone-correct**: requests are interpreted in the user's IANA
//!   timezone, stored normalized to UTC
//! - **Crash-recoverable**: the full job queue is snapshotted to the brain
//!   on every mutation and reconciled at startup
//! - **Catch-up collapse**: a backlog of missed firings becomes one
//!   upcoming occurrence, never a burst of stale reminders
//!
//! ## Modules
//!
//! - [`reminder`] - Parser, recurrence math, job store, scheduler loop
//! - [`bus`] - Message bus between the scheduler and delivery channels
//! - [`brain`] - Key-value persistence for job state
//! - [`config`] - Configuration management
//! - [`cli`] - Command-line interface

pub mod brain;
pub mod bus;
pub mod cli;
pub mod config;
pub mod logging;
pub mod reminder;
