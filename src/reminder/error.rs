//! Error types for the reminder scheduler.

use thiserror::Error;

/// Failure to understand a free-text reminder request. Recoverable: the
/// message is surfaced verbatim to the user and no state is mutated.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ParseError {
    #[error("no recognizable schedule clause in \"{0}\"")]
    NoScheduleClause(String),

    #[error("schedule understood, but the reminder message is missing (expected \"remind me|team|here|room <message>\")")]
    MissingMessage,
}

/// Main reminder error type.
#[derive(Debug, Error)]
pub enum ReminderError {
    #[error("could not parse reminder: {0}")]
    Parse(#[from] ParseError),

    #[error("job {0} not found")]
    JobNotFound(u64),

    #[error("persistence error: {0}")]
    Persistence(anyhow::Error),

    #[error("scheduler is not running")]
    SchedulerClosed,
}

impl ReminderError {
    /// True for errors a chat handler should echo back to the user rather
    /// than escalate.
    pub fn is_user_error(&self) -> bool {
        matches!(
            self,
            ReminderError::Parse(_) | ReminderError::JobNotFound(_)
        )
    }
}
