//! Jobs command - Manage reminder jobs.

use anyhow::Result;
use chrono_tz::Tz;
use clap::Subcommand;

use crate::brain::FileBrain;
use crate::config;
use crate::reminder::error::ReminderError;
use crate::reminder::format;
use crate::reminder::parse;
use crate::reminder::store::JobStore;
use crate::reminder::types::{Job, MessageInfo};

#[derive(Subcommand)]
pub enum JobsAction {
    /// List scheduled reminders, optionally filtered by room.
    List {
        #[arg(long)]
        room: Vec<String>,
    },
    /// Add a reminder from free text, e.g. "remind me every Friday at 16:00 to ship".
    Add {
        text: String,
        #[arg(long, default_value = "cli")]
        user: String,
        #[arg(long, default_value = "console")]
        room: String,
        #[arg(long)]
        thread: Option<String>,
        /// IANA timezone the request is interpreted in (default: config).
        #[arg(long)]
        timezone: Option<String>,
    },
    /// Remove a reminder by id.
    Remove { id: u64 },
    /// Replace a reminder's message text.
    SetMessage { id: u64, message: String },
    /// Replace a reminder's schedule, e.g. "every other Tuesday at 16:33".
    SetSpec {
        id: u64,
        spec: String,
        #[arg(long)]
        timezone: Option<String>,
    },
}

pub async fn cmd_jobs(action: JobsAction) -> Result<()> {
    let cfg = config::load_config(None)?;
    let brain = FileBrain::new(config::brain_dir(&cfg));
    let mut store = JobStore::open(Box::new(brain), &cfg.reminders.store_key)?;
    let display_tz = config::default_tz(&cfg);

    match action {
        JobsAction::List { room } => {
            let jobs = store.jobs_for_rooms(&room);
            if jobs.is_empty() {
                println!("No scheduled reminders.");
            } else {
                for job in &jobs {
                    println!("{}", format::format_job(job, display_tz));
                }
            }
        }
        JobsAction::Add {
            text,
            user,
            room,
            thread,
            timezone,
        } => {
            let tz = resolve_tz(timezone.as_deref(), &cfg)?;
            match parse::parse(&text, tz, chrono::Utc::now()) {
                Ok(parsed) => {
                    let job = Job {
                        kind: parsed.definition.kind,
                        message_info: MessageInfo {
                            user_id: user,
                            message: parsed.message,
                            room,
                            thread_id: thread,
                            audience: parsed.audience,
                        },
                        spec: parsed.definition.spec,
                        next: parsed.definition.next,
                    };
                    let persisted = store.add_job(job)?;
                    println!("✓ Added reminder {}", persisted.id);
                    println!("{}", format::format_job(&persisted, display_tz));
                }
                Err(err) => println!("{err}"),
            }
        }
        JobsAction::Remove { id } => match store.remove_job(id) {
            Ok(job) => println!("✓ Removed reminder {}", job.id),
            Err(ReminderError::JobNotFound(_)) => println!("Reminder {id} not found."),
            Err(err) => return Err(err.into()),
        },
        JobsAction::SetMessage { id, message } => match store.update_message(id, &message) {
            Ok(job) => println!("{}", format::format_job(&job, display_tz)),
            Err(ReminderError::JobNotFound(_)) => println!("Reminder {id} not found."),
            Err(err) => return Err(err.into()),
        },
        JobsAction::SetSpec { id, spec, timezone } => {
            let tz = resolve_tz(timezone.as_deref(), &cfg)?;
            match store.update_spec(id, &spec, tz, chrono::Utc::now()) {
                Ok(job) => println!("{}", format::format_job(&job, display_tz)),
                Err(ReminderError::JobNotFound(_)) => println!("Reminder {id} not found."),
                Err(ReminderError::Parse(err)) => println!("{err}"),
                Err(err) => return Err(err.into()),
            }
        }
    }
    Ok(())
}

fn resolve_tz(flag: Option<&str>, cfg: &config::Config) -> Result<Tz> {
    match flag {
        Some(name) => name
            .parse()
            .map_err(|_| anyhow::anyhow!("Unknown timezone: {name}")),
        None => Ok(config::default_tz(cfg)),
    }
}
