use anyhow::Result;
use applecal_core::event::{require_non_empty, validate_uid};
use clap::Subcommand;
use serde_json::Value;

use super::Context;
use crate::render;

#[derive(Subcommand)]
pub enum EventCommand {
    /// Fetch one event by uid
    Get {
        #[arg(long)]
        calendar: String,

        #[arg(long)]
        uid: String,
    },
}

pub fn run(ctx: &Context, command: &EventCommand) -> Result<Value> {
    match command {
        EventCommand::Get { calendar, uid } => {
            require_non_empty("calendar", calendar)?;
            validate_uid(uid)?;

            let client = ctx.connect()?;
            render::to_value(&client.get_event(calendar, uid)?)
        }
    }
}
