//! `duty` CLI: compute duty-rotation schedules from rule JSON.
//!
//! ## Usage
//!
//! ```sh
//! # Compute a week starting today (stdin → stdout)
//! cat rules.json | duty plan
//!
//! # A two-week window from a fixed date, with a fixed "now"
//! duty plan -i rules.json --start 2026-03-16 --days 14 --now "2026-03-16 09:00"
//!
//! # Tunables (noise threshold, palette) from TOML
//! duty plan -i rules.json --config duty.toml -o schedule.json
//!
//! # Who is on duty at an instant
//! duty who -i rules.json --at "2026-03-18 12:00"
//!
//! # Cache keys for a rule set
//! duty key -i rules.json
//! ```
//!
//! Logging goes to stderr; set `RUST_LOG=debug` for per-stage counts.

use anyhow::{Context, Result};
use chrono::{Local, NaiveDate, NaiveDateTime};
use clap::{Args, Parser, Subcommand};
use duty_engine::cache::{content_fingerprint, rule_id_key};
use duty_engine::rule::parse_timestamp;
use duty_engine::schedule::Severity;
use duty_engine::window::DEFAULT_WINDOW_DAYS;
use duty_engine::{compute_schedule, EngineConfig, Schedule, ScheduleInput, TimeWindow};
use std::io::{self, Read};
use tracing::{debug, info};
use tracing_subscriber::EnvFilter;

#[derive(Parser)]
#[command(name = "duty", version, about = "Duty-rotation schedule CLI")]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Compute the schedule for a window and print it as JSON
    Plan {
        #[command(flatten)]
        window: WindowArgs,
        /// Output file (writes to stdout if omitted)
        #[arg(short, long)]
        output: Option<String>,
        /// Exit with an error if any rule failed validation
        #[arg(long)]
        strict: bool,
    },
    /// Show who is on duty at an instant
    Who {
        #[command(flatten)]
        window: WindowArgs,
        /// The instant to query ("YYYY-MM-DD HH:MM")
        #[arg(long)]
        at: String,
    },
    /// Print the rule-id cache key and the content fingerprint
    Key {
        /// Input file (reads from stdin if omitted)
        #[arg(short, long)]
        input: Option<String>,
    },
}

#[derive(Args)]
struct WindowArgs {
    /// Input file (reads from stdin if omitted)
    #[arg(short, long)]
    input: Option<String>,
    /// First day of the window (defaults to the date of --now)
    #[arg(long)]
    start: Option<String>,
    /// Number of days in the window
    #[arg(long, default_value_t = DEFAULT_WINDOW_DAYS)]
    days: u32,
    /// Current time, used for rules without an effective time (defaults to the local clock)
    #[arg(long)]
    now: Option<String>,
    /// TOML file with engine settings
    #[arg(long)]
    config: Option<String>,
}

fn main() -> Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("warn")))
        .with_writer(io::stderr)
        .init();

    let cli = Cli::parse();

    match cli.command {
        Commands::Plan {
            window,
            output,
            strict,
        } => {
            let schedule = run_schedule(&window)?;
            let json = serde_json::to_string_pretty(&schedule).context("Failed to serialize schedule")?;
            write_output(output.as_deref(), &json)?;

            let failed = schedule
                .issues
                .iter()
                .filter(|issue| issue.severity == Severity::Error)
                .count();
            if strict && failed > 0 {
                anyhow::bail!("{} rule(s) failed validation", failed);
            }
        }
        Commands::Who { window, at } => {
            let instant = parse_instant(&at, "--at")?;
            let schedule = run_schedule(&window)?;
            if !schedule.window.contains(instant) {
                anyhow::bail!(
                    "{} is outside the window {} .. {}",
                    at,
                    schedule.window.start(),
                    schedule.window.end()
                );
            }
            match schedule.on_duty_at(instant) {
                Some(occurrence) => {
                    println!("{}", serde_json::to_string_pretty(occurrence)?);
                }
                None => println!("nobody on duty"),
            }
        }
        Commands::Key { input } => {
            let input = read_schedule_input(input.as_deref())?;
            let fingerprint =
                content_fingerprint(&input.rules).context("Failed to fingerprint rules")?;
            println!("rule ids:    {}", rule_id_key(&input.rules));
            println!("fingerprint: {}", fingerprint);
        }
    }

    Ok(())
}

fn run_schedule(args: &WindowArgs) -> Result<Schedule> {
    let input = read_schedule_input(args.input.as_deref())?;
    let config = load_config(args.config.as_deref())?;

    let now = match args.now.as_deref() {
        Some(text) => parse_instant(text, "--now")?,
        None => Local::now().naive_local(),
    };
    let start = match args.start.as_deref() {
        Some(text) => NaiveDate::parse_from_str(text.trim(), "%Y-%m-%d")
            .with_context(|| format!("Invalid --start date: '{}' (expected YYYY-MM-DD)", text))?,
        None => now.date(),
    };
    let window = TimeWindow::new(start, args.days).context("Invalid window")?;

    info!(
        rules = input.rules.len(),
        previews = input.previews.len(),
        start = %window.start_date,
        days = window.days,
        "computing schedule"
    );
    let schedule = compute_schedule(&input.rules, &input.previews, &window, now, &config);
    debug!(rows = schedule.rows.len(), issues = schedule.issues.len(), "done");
    Ok(schedule)
}

fn parse_instant(text: &str, flag: &str) -> Result<NaiveDateTime> {
    parse_timestamp(text).with_context(|| format!("Invalid {} time: '{}'", flag, text))
}

fn read_schedule_input(path: Option<&str>) -> Result<ScheduleInput> {
    let json = read_input(path)?;
    ScheduleInput::from_json(&json).context("Failed to parse rules JSON")
}

fn load_config(path: Option<&str>) -> Result<EngineConfig> {
    match path {
        Some(path) => {
            let text = std::fs::read_to_string(path)
                .with_context(|| format!("Failed to read config file: {}", path))?;
            toml::from_str(&text).with_context(|| format!("Failed to parse config file: {}", path))
        }
        None => Ok(EngineConfig::default()),
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
