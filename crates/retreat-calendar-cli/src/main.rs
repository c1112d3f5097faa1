//! `retreat-calendar` CLI: expand and check exported event lists offline.
//!
//! ## Usage
//!
//! ```sh
//! # Expand an exported event list (stdin → stdout)
//! retreat-calendar expand < events.json
//!
//! # Expand in the house's timezone, upcoming occurrences only
//! retreat-calendar expand -i events.json --timezone America/Chicago \
//!     --range upcoming --now 2025-03-01T00:00:00Z
//!
//! # Report records and recurrence rules that would not expand
//! retreat-calendar check -i events.json
//!
//! # Summary counts
//! retreat-calendar stats -i events.json
//! ```
//!
//! Input is a JSON array of event records, or the backend's `{"result": [...]}`
//! query envelope.

use anyhow::{bail, Context, Result};
use chrono::{DateTime, Utc};
use clap::{Parser, Subcommand};
use retreat_calendar::event::decode_event;
use retreat_calendar::{
    decode_events, expand_events, expand_rule, filter_occurrences, CalendarRange, ExpandOptions,
    MAX_OCCURRENCES,
};
use std::io::{self, Read};
use std::process;
use tracing_subscriber::EnvFilter;

#[derive(Parser)]
#[command(
    name = "retreat-calendar",
    version,
    about = "Expand and check retreat-house calendar events"
)]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Expand events into calendar occurrences (JSON)
    Expand {
        /// Input file (reads from stdin if omitted)
        #[arg(short, long)]
        input: Option<String>,
        /// Output file (writes to stdout if omitted)
        #[arg(short, long)]
        output: Option<String>,
        /// IANA timezone the recurrence rules are evaluated in
        #[arg(long, default_value = "UTC")]
        timezone: String,
        /// Which occurrences to keep: upcoming, past or all
        #[arg(long, default_value = "all")]
        range: CalendarRange,
        /// Reference time for --range (RFC 3339); defaults to the current time
        #[arg(long)]
        now: Option<DateTime<Utc>>,
        /// Cap on occurrences per recurring event
        #[arg(long, default_value_t = MAX_OCCURRENCES)]
        max_occurrences: u16,
    },
    /// Validate every record and recurrence rule
    Check {
        /// Input file (reads from stdin if omitted)
        #[arg(short, long)]
        input: Option<String>,
        /// IANA timezone the recurrence rules are evaluated in
        #[arg(long, default_value = "UTC")]
        timezone: String,
    },
    /// Show counts of events, recurring events and occurrences
    Stats {
        /// Input file (reads from stdin if omitted)
        #[arg(short, long)]
        input: Option<String>,
        /// IANA timezone the recurrence rules are evaluated in
        #[arg(long, default_value = "UTC")]
        timezone: String,
    },
}

fn main() -> Result<()> {
    tracing_subscriber::fmt()
        .with_writer(io::stderr)
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("warn")),
        )
        .init();

    let cli = Cli::parse();

    match cli.command {
        Commands::Expand {
            input,
            output,
            timezone,
            range,
            now,
            max_occurrences,
        } => {
            let records = read_records(input.as_deref())?;
            let events = decode_events(records).context("Failed to decode event records")?;
            let options = ExpandOptions::for_timezone(&timezone)?.with_max_occurrences(max_occurrences);

            let expansion = expand_events(&events, &options).context("Failed to expand events")?;
            for rejected in &expansion.rejected {
                eprintln!(
                    "warning: event {} left unexpanded: {}",
                    rejected.event_id, rejected.reason
                );
            }

            let now = now.unwrap_or_else(Utc::now);
            let occurrences = filter_occurrences(expansion.occurrences, range, now);
            let pretty = serde_json::to_string_pretty(&occurrences)?;
            write_output(output.as_deref(), &pretty)?;
        }
        Commands::Check { input, timezone } => {
            let records = read_records(input.as_deref())?;
            let options = ExpandOptions::for_timezone(&timezone)?;
            let total = records.len();
            let problems = check_records(records, &options);

            if problems.is_empty() {
                println!("ok: {} records", total);
            } else {
                for problem in &problems {
                    println!("{}", problem);
                }
                println!("{} of {} records have problems", problems.len(), total);
                process::exit(1);
            }
        }
        Commands::Stats { input, timezone } => {
            let records = read_records(input.as_deref())?;
            let events = decode_events(records).context("Failed to decode event records")?;
            let options = ExpandOptions::for_timezone(&timezone)?;
            let expansion = expand_events(&events, &options).context("Failed to expand events")?;

            let recurring = events
                .iter()
                .filter(|e| e.active_recurrence().is_some())
                .count();
            println!("Events:       {}", events.len());
            println!("Recurring:    {}", recurring);
            println!("Occurrences:  {}", expansion.occurrences.len());
            println!("Unexpanded:   {}", expansion.rejected.len());
        }
    }

    Ok(())
}

/// Decode and expand each record on its own so every problem is reported,
/// not just the first.
fn check_records(records: Vec<serde_json::Value>, options: &ExpandOptions) -> Vec<String> {
    let mut problems = Vec::new();

    for (index, record) in records.into_iter().enumerate() {
        let event = match decode_event(index, record) {
            Ok(event) => event,
            Err(err) => {
                problems.push(err.to_string());
                continue;
            }
        };
        let Some(recurrence) = event.active_recurrence() else {
            continue;
        };
        if let Err(err) = recurrence
            .parse()
            .and_then(|rule| expand_rule(event.start, &rule, options))
        {
            problems.push(format!("Event {} (record #{}): {}", event.id, index, err));
        }
    }

    problems
}

/// Accept a bare array of records or the `{"result": [...]}` query envelope.
fn read_records(path: Option<&str>) -> Result<Vec<serde_json::Value>> {
    let raw = read_input(path)?;
    let value: serde_json::Value = serde_json::from_str(&raw).context("Input is not valid JSON")?;

    match value {
        serde_json::Value::Array(records) => Ok(records),
        serde_json::Value::Object(mut envelope) => match envelope.remove("result") {
            Some(serde_json::Value::Array(records)) => Ok(records),
            _ => bail!("Expected a JSON array of events or an object with a \"result\" array"),
        },
        _ => bail!("Expected a JSON array of events or an object with a \"result\" array"),
    }
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

fn write_output(path: Option<&str>, content: &str) -> Result<()> {
    match path {
        Some(path) => {
            std::fs::write(path, content)
                .with_context(|| format!("Failed to write file: {}", path))?;
        }
        None => {
            println!("{}", content);
        }
    }
    Ok(())
}
