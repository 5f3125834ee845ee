//! Start command - Run the reminder daemon (scheduler + channels).

use anyhow::Result;
use std::sync::Arc;
use tokio::sync::broadcast;
use tracing::{error, info};

use crate::brain::FileBrain;
use crate::bus::MessageBus;
use crate::config;
use crate::logging;
use crate::reminder::scheduler::SystemClock;
use crate::reminder::service::ReminderService;
use crate::reminder::store::JobStore;

pub async fn cmd_start() -> Result<()> {
    let cfg = config::load_config(None)?;
    logging::init_logging(&cfg)?;

    let brain = FileBrain::new(config::brain_dir(&cfg));
    let store = JobStore::open(Box::new(brain), &cfg.reminders.store_key)?;

    let bus = MessageBus::new();

    // Console channel: prints fired reminders to stdout.
    if cfg.channels.console.enabled {
        let mut rx = bus.subscribe_outbound();
        tokio::spawn(async move {
            loop {
                match rx.recv().await {
                    Ok(msg) => match &msg.thread_id {
                        Some(thread) => println!("[{}/{}] {}", msg.room, thread, msg.content),
                        None => println!("[{}] {}", msg.room, msg.content),
                    },
                    Err(broadcast::error::RecvError::Lagged(_)) => continue,
                    Err(broadcast::error::RecvError::Closed) => break,
                }
            }
        });
    }

    let (service, scheduler) = ReminderService::spawn(
        store,
        Arc::new(SystemClock),
        Arc::new(bus.messenger()),
        config::default_tz(&cfg),
    );

    info!("⏰ nudgebot daemon running. Press Ctrl+C to stop.");
    tokio::signal::ctrl_c().await?;
    info!("Shutting down...");
    service.shutdown();
    if let Err(err) = scheduler.await {
        error!("Scheduler task error: {err:#}");
    }
    Ok(())
}
