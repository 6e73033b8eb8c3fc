mod commands;
mod credentials;
mod render;

use std::process::ExitCode;

use anyhow::Result;
use clap::{Parser, Subcommand};
use serde_json::Value;
use tracing_subscriber::{EnvFilter, fmt, layer::SubscriberExt, util::SubscriberInitExt};

use commands::Context;

#[derive(Parser)]
#[command(name = "applecal")]
#[command(version)]
#[command(about = "Read and write Apple Calendar (iCloud) over CalDAV, with JSON output")]
struct Cli {
    /// iCloud account email (falls back to `apple_id` in config.toml)
    #[arg(long, global = true, env = "APPLECAL_APPLE_ID")]
    apple_id: Option<String>,

    /// Pretty-print JSON output with this indent width
    #[arg(long, global = true)]
    json_indent: Option<usize>,

    /// Enable debug logging on stderr
    #[arg(short, long, global = true)]
    verbose: bool,

    /// Emit logs as JSON lines
    #[arg(long, global = true)]
    json_logs: bool,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Check credentials and discovery
    Doctor,
    /// Calendar collections
    Calendars {
        #[command(subcommand)]
        command: commands::calendars::CalendarsCommand,
    },
    /// List, create, update and delete events
    Events {
        #[command(subcommand)]
        command: commands::events::EventsCommand,
    },
    /// Single event details
    Event {
        #[command(subcommand)]
        command: commands::event::EventCommand,
    },
    /// Busy time across one or more calendars
    Freebusy(commands::freebusy::FreebusyArgs),
    /// Managed attachments
    Attach {
        #[command(subcommand)]
        command: commands::attach::AttachCommand,
    },
}

fn main() -> ExitCode {
    let cli = Cli::parse();
    init_tracing(&cli);

    match run(&cli) {
        Ok(value) => {
            println!("{}", render::to_json(&value, cli.json_indent));
            ExitCode::SUCCESS
        }
        Err(err) => {
            println!("{}", render::error_json(&err, cli.json_indent));
            ExitCode::FAILURE
        }
    }
}

fn run(cli: &Cli) -> Result<Value> {
    let ctx = Context::new(cli.apple_id.as_deref())?;

    match &cli.command {
        Commands::Doctor => commands::doctor::run(&ctx),
        Commands::Calendars { command } => commands::calendars::run(&ctx, command),
        Commands::Events { command } => commands::events::run(&ctx, command),
        Commands::Event { command } => commands::event::run(&ctx, command),
        Commands::Freebusy(args) => commands::freebusy::run(&ctx, args),
        Commands::Attach { command } => commands::attach::run(&ctx, command),
    }
}

/// Logs go to stderr so stdout carries only the JSON result.
fn init_tracing(cli: &Cli) {
    let default_level = if cli.verbose { "debug" } else { "warn" };
    let filter =
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default_level));

    let registry = tracing_subscriber::registry().with(filter);

    if cli.json_logs {
        registry
            .with(fmt::layer().json().with_target(true).with_writer(std::io::stderr))
            .init();
    } else {
        registry
            .with(
                fmt::layer()
                    .with_target(false)
                    .with_ansi(false)
                    .with_writer(std::io::stderr),
            )
            .init();
    }
}
