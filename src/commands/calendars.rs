use anyhow::Result;
use clap::Subcommand;
use serde_json::Value;

use super::Context;
use crate::render;

#[derive(Subcommand)]
pub enum CalendarsCommand {
    /// List event calendars under the calendar home
    List,
}

pub fn run(ctx: &Context, command: &CalendarsCommand) -> Result<Value> {
    match command {
        CalendarsCommand::List => {
            let client = ctx.connect()?;
            render::to_value(&client.calendars()?)
        }
    }
}
