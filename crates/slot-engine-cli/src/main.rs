//! `slots` CLI — query appointment availability from a JSON schedule fixture.
//!
//! ## Usage
//!
//! ```sh
//! # Dates in March with at least one free slot
//! slots --data clinic.json dates --service 1 --provider 1 --month 2026-03
//!
//! # Free slots on one date, evaluated as of a fixed instant
//! slots --data clinic.json --now 2026-03-02T08:00:00Z slots --service 1 --provider 1 --date 2026-03-04
//!
//! # Is 10:00 still bookable?
//! slots --data clinic.json check --service 1 --provider 1 --date 2026-03-04 --time 10:00
//!
//! # First date with a free slot in the next 30 days
//! cat clinic.json | slots next --service 1 --provider 1 --horizon 30
//!
//! # Site settings from a file, timezone overridden on the command line
//! slots --data clinic.json --config site.json --timezone Europe/Berlin slots --service 1 --provider 1 --date 2026-03-04
//! ```
//!
//! Logs go to stderr; set `RUST_LOG=slot_engine=debug` to see query summaries.

use anyhow::{Context, Result};
use chrono::{DateTime, Utc};
use clap::{Parser, Subcommand};
use slot_engine::{
    AvailabilityService, Clock, Config, FixedClock, InMemoryRepository, ProviderId, ServiceId,
    SystemClock,
};
use std::io::{self, Read};
use tracing::debug;

#[derive(Parser)]
#[command(
    name = "slots",
    version,
    about = "Appointment availability from JSON schedule fixtures"
)]
struct Cli {
    #[command(subcommand)]
    command: Commands,

    /// Schedule fixture (reads from stdin if omitted)
    #[arg(short, long, global = true)]
    data: Option<String>,

    /// Site settings JSON (defaults apply if omitted)
    #[arg(short, long, global = true)]
    config: Option<String>,

    /// IANA timezone, overrides the settings file
    #[arg(long, global = true)]
    timezone: Option<String>,

    /// Slot granularity in minutes, overrides the settings file
    #[arg(long, global = true)]
    granularity: Option<u32>,

    /// Evaluate as of this RFC 3339 instant instead of the system clock
    #[arg(long, global = true)]
    now: Option<String>,
}

#[derive(Subcommand)]
enum Commands {
    /// List dates of a month that have at least one free slot
    Dates {
        #[arg(long)]
        service: u64,
        #[arg(long)]
        provider: u64,
        /// Month as YYYY-MM
        #[arg(long)]
        month: String,
    },
    /// List free slots on a date
    Slots {
        #[arg(long)]
        service: u64,
        #[arg(long)]
        provider: u64,
        /// Date as YYYY-MM-DD
        #[arg(long)]
        date: String,
    },
    /// Check whether one slot is bookable
    Check {
        #[arg(long)]
        service: u64,
        #[arg(long)]
        provider: u64,
        /// Date as YYYY-MM-DD
        #[arg(long)]
        date: String,
        /// Time as HH:MM
        #[arg(long)]
        time: String,
    },
    /// Find the first date with a free slot
    Next {
        #[arg(long)]
        service: u64,
        #[arg(long)]
        provider: u64,
        /// Days to scan from today (settings default if omitted)
        #[arg(long)]
        horizon: Option<u32>,
    },
}

/// Either the system clock or a pinned instant from `--now`.
enum CliClock {
    System(SystemClock),
    Fixed(FixedClock),
}

impl Clock for CliClock {
    fn now(&self) -> DateTime<Utc> {
        match self {
            CliClock::System(c) => c.now(),
            CliClock::Fixed(c) => c.now(),
        }
    }
}

fn main() -> Result<()> {
    tracing_subscriber::fmt()
        .with_writer(io::stderr)
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new("slot_engine=warn")),
        )
        .init();

    let cli = Cli::parse();

    let config = load_config(&cli)?;
    debug!(
        timezone = %config.timezone,
        granularity = config.slot_granularity_minutes,
        "loaded settings"
    );
    let clock = match cli.now.as_deref() {
        Some(raw) => {
            let now = DateTime::parse_from_rfc3339(raw)
                .with_context(|| format!("Invalid --now instant: {}", raw))?
                .with_timezone(&Utc);
            CliClock::Fixed(FixedClock(now))
        }
        None => CliClock::System(SystemClock),
    };

    let data = read_input(cli.data.as_deref())?;
    let repo = InMemoryRepository::from_json(config.timezone, &data)
        .context("Failed to load schedule fixture")?;
    let service = AvailabilityService::with_clock(repo, config, clock)
        .context("Invalid settings")?;

    let output = match cli.command {
        Commands::Dates {
            service: service_id,
            provider,
            month,
        } => {
            let dates = service
                .get_available_dates(ServiceId(service_id), ProviderId(provider), &month)
                .context("Failed to compute available dates")?;
            serde_json::json!({ "month": month, "dates": dates })
        }
        Commands::Slots {
            service: service_id,
            provider,
            date,
        } => {
            let slots = service
                .get_available_slots(ServiceId(service_id), ProviderId(provider), &date)
                .context("Failed to compute available slots")?;
            serde_json::json!({ "date": date, "slots": slots })
        }
        Commands::Check {
            service: service_id,
            provider,
            date,
            time,
        } => {
            let available = service
                .is_slot_available(ServiceId(service_id), ProviderId(provider), &date, &time)
                .context("Failed to check slot")?;
            serde_json::json!({ "date": date, "time": time, "available": available })
        }
        Commands::Next {
            service: service_id,
            provider,
            horizon,
        } => {
            let horizon = horizon.unwrap_or(service.config().horizon_days);
            let next = service
                .next_available_date(ServiceId(service_id), ProviderId(provider), horizon)
                .context("Failed to scan for the next available date")?;
            serde_json::json!({ "horizon_days": horizon, "next_available_date": next })
        }
    };

    println!("{}", serde_json::to_string_pretty(&output)?);
    Ok(())
}

/// Settings file (or defaults) with command-line overrides applied.
fn load_config(cli: &Cli) -> Result<Config> {
    let mut config = match cli.config.as_deref() {
        Some(path) => {
            let raw = std::fs::read_to_string(path)
                .with_context(|| format!("Failed to read file: {}", path))?;
            Config::from_json(&raw).with_context(|| format!("Invalid settings in {}", path))?
        }
        None => Config::default(),
    };
    if let Some(tz) = cli.timezone.as_deref() {
        config.timezone = tz
            .parse()
            .map_err(|_| anyhow::anyhow!("Unknown timezone: '{}'", tz))?;
    }
    if let Some(granularity) = cli.granularity {
        config.slot_granularity_minutes = granularity;
    }
    Ok(config)
}

fn read_input(path: Option<&str>) -> Result<String> {
    match path {
        Some(path) => {
            std::fs::read_to_string(path).with_context(|| format!("Failed to read file: {}", path))
        }
        None => {
            let mut buf = String::new();
            io::stdin()
                .read_to_string(&mut buf)
                .context("Failed to read from stdin")?;
            Ok(buf)
        }
    }
}
