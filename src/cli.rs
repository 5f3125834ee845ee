//! CLI commands.

use anyhow::Result;
use clap::{Parser, Subcommand};

use crate::config;
use crate::logging;

mod jobs;
mod start;

use jobs::JobsAction;

#[derive(Parser)]
#[command(name = "nudgebot", about = "nudgebot — chat reminder scheduler")]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Initialize configuration and the brain directory.
    Onboard,

    /// Start the daemon (scheduler + delivery channels).
    Start,

    /// Manage reminder jobs.
    Jobs {
        #[command(subcommand)]
        action: JobsAction,
    },
}

pub async fn run() -> Result<()> {
    let cli = Cli::parse();

    match cli.command {
        Commands::Onboard => {
            logging::init_simple_logging();
            cmd_onboard().await
        }
        // `start` initializes logging itself, from the loaded config.
        Commands::Start => start::cmd_start().await,
        Commands::Jobs { action } => {
            logging::init_simple_logging();
            jobs::cmd_jobs(action).await
        }
    }
}

// ---------------------------------------------------------------------------
// onboard
// ---------------------------------------------------------------------------

async fn cmd_onboard() -> Result<()> {
    let cfg_path = config::config_path();
    if cfg_path.exists() {
        println!("Config already exists at {}", cfg_path.display());
        println!("Delete it first if you want to re-initialize.");
        return Ok(());
    }

    let cfg = config::Config::default();
    config::save_config(&cfg, None)?;
    println!("✓ Created config at {}", cfg_path.display());

    let brain = config::brain_dir(&cfg);
    std::fs::create_dir_all(&brain)?;
    println!("✓ Created brain at {}", brain.display());

    println!("\n⏰ nudgebot is ready!");
    println!("\nNext steps:");
    println!("  1. Set your timezone in {}", cfg_path.display());
    println!("  2. Add a reminder: nudgebot jobs add \"remind me every Friday at 16:00 to ship\"");
    println!("  3. Run the daemon: nudgebot start");
    Ok(())
}
