use anyhow::Result;
use applecal_core::aggregate::validate_names;
use applecal_core::date_range::TimeWindow;
use clap::Args;
use serde_json::Value;

use super::Context;
use crate::render;

#[derive(Args)]
pub struct FreebusyArgs {
    /// Calendar display name (repeatable)
    #[arg(long = "calendar", required = true)]
    calendars: Vec<String>,

    /// Window start (ISO 8601)
    #[arg(long)]
    from: String,

    /// Window end (ISO 8601)
    #[arg(long)]
    to: String,
}

pub fn run(ctx: &Context, args: &FreebusyArgs) -> Result<Value> {
    let window = TimeWindow::parse(&args.from, &args.to)?;
    validate_names(&args.calendars)?;

    let client = ctx.connect()?;
    render::to_value(&client.free_busy_all(&args.calendars, &window)?)
}
