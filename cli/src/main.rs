//! Redoubt CLI - thin caller layer over the timer engine.
//!
//! Each subcommand maps one-to-one onto an engine operation; all state
//! lives in the remote store, so invocations are independent.

mod render;

use anyhow::{Result, bail};
use clap::{Parser, Subcommand};
use tracing_subscriber::{EnvFilter, fmt, prelude::*};

use redoubt_engine::TimerEngine;
use redoubt_store::{RedisStore, StoreConfig};
use redoubt_types::{Level, NewStronghold, ResetDuration, StrongholdId};

#[derive(Parser)]
#[command(name = "redoubt", version, about = "Stronghold reset-timer tracker")]
struct Cli {
    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand)]
enum Command {
    /// Track a stronghold (re-adding the same warzone/coordinates overwrites it)
    Add {
        warzone: i32,
        coordinate_x: i32,
        coordinate_y: i32,
        #[arg(long, default_value_t = 0)]
        days: u32,
        #[arg(long, default_value_t = 0)]
        hours: u32,
        #[arg(long, default_value_t = 0)]
        minutes: u32,
        #[arg(long, default_value_t = 0)]
        seconds: u32,
        /// Stronghold level, 1-10
        #[arg(long)]
        level: Option<u8>,
        #[arg(long)]
        alliance: Option<String>,
    },
    /// List tracked strongholds, soonest ready first
    List,
    /// Stop tracking a stronghold
    Remove { id: String },
    /// Restart the countdown with the standard reset interval (1d 12h)
    Reset { id: String },
    /// Replace the countdown, measured from this moment
    SetDuration {
        id: String,
        #[arg(long, default_value_t = 0)]
        days: u32,
        #[arg(long, default_value_t = 0)]
        hours: u32,
        #[arg(long, default_value_t = 0)]
        minutes: u32,
        #[arg(long, default_value_t = 0)]
        seconds: u32,
    },
    /// Update level and alliance (omitting --alliance clears it)
    SetDetails {
        id: String,
        #[arg(long)]
        alliance: Option<String>,
        /// Stronghold level, 1-10; ignored if the stronghold already has one
        #[arg(long)]
        level: Option<u8>,
    },
}

fn init_tracing() {
    let env_filter = EnvFilter::try_from_default_env()
        .or_else(|_| EnvFilter::try_new("info"))
        .unwrap_or_else(|_| EnvFilter::try_new("warn").expect("warn filter is valid"));

    tracing_subscriber::registry()
        .with(fmt::layer().with_writer(std::io::stderr))
        .with(env_filter)
        .init();
}

#[tokio::main]
async fn main() -> Result<()> {
    init_tracing();
    let cli = Cli::parse();

    let config = StoreConfig::load()?;
    tracing::debug!(url = config.url(), "Store configured");
    let store = RedisStore::new(&config)?;
    let engine = TimerEngine::new(store);

    match cli.command {
        Command::Add {
            warzone,
            coordinate_x,
            coordinate_y,
            days,
            hours,
            minutes,
            seconds,
            level,
            alliance,
        } => {
            let mut input = NewStronghold::new(
                warzone,
                coordinate_x,
                coordinate_y,
                ResetDuration::new(days, hours, minutes, seconds),
            );
            if let Some(level) = level {
                input = input.with_level(level)?;
            }
            if let Some(alliance) = alliance {
                input = input.with_alliance_name(alliance);
            }
            let record = engine.create(input).await?;
            println!(
                "tracking {} - ready {}",
                record.id,
                record.ready_at.format("%Y-%m-%d %H:%M:%S UTC")
            );
        }
        Command::List => {
            let strongholds = engine.list().await;
            print!("{}", render::format_listing(&strongholds, chrono::Utc::now()));
        }
        Command::Remove { id } => {
            let id = StrongholdId::from_raw(id);
            if !engine.delete(&id).await? {
                bail!("stronghold {id} not found");
            }
            println!("removed {id}");
        }
        Command::Reset { id } => {
            let id = StrongholdId::from_raw(id);
            if !engine.reset_timer(&id).await? {
                bail!("stronghold {id} not found");
            }
            println!("reset {id}");
        }
        Command::SetDuration {
            id,
            days,
            hours,
            minutes,
            seconds,
        } => {
            let id = StrongholdId::from_raw(id);
            let duration = ResetDuration::new(days, hours, minutes, seconds);
            if !engine.edit_duration(&id, duration).await? {
                bail!("stronghold {id} not found");
            }
            println!("duration of {id} set to {duration}");
        }
        Command::SetDetails { id, alliance, level } => {
            let id = StrongholdId::from_raw(id);
            let level = level.map(Level::new).transpose()?;
            if !engine.edit_metadata(&id, alliance, level).await? {
                bail!("stronghold {id} not found");
            }
            println!("updated {id}");
        }
    }

    Ok(())
}
