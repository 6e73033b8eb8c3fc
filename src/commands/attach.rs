use std::path::PathBuf;

use anyhow::Result;
use applecal_core::attachment::check_attachment_file;
use applecal_core::event::{require_non_empty, validate_uid};
use clap::Subcommand;
use serde_json::Value;

use super::Context;
use crate::render;

#[derive(Subcommand)]
pub enum AttachCommand {
    /// Upload a file as a managed attachment
    Add {
        #[arg(long)]
        calendar: String,

        #[arg(long)]
        uid: String,

        #[arg(long)]
        file: PathBuf,
    },
    /// Remove a managed attachment, repairing the event if the server keeps it
    Remove {
        #[arg(long)]
        calendar: String,

        #[arg(long)]
        uid: String,

        #[arg(long)]
        managed_id: String,
    },
}

pub fn run(ctx: &Context, command: &AttachCommand) -> Result<Value> {
    match command {
        AttachCommand::Add {
            calendar,
            uid,
            file,
        } => {
            require_non_empty("calendar", calendar)?;
            validate_uid(uid)?;
            check_attachment_file(file)?;

            let client = ctx.connect()?;
            render::to_value(&client.add_attachment(calendar, uid, file)?)
        }
        AttachCommand::Remove {
            calendar,
            uid,
            managed_id,
        } => {
            require_non_empty("calendar", calendar)?;
            validate_uid(uid)?;
            require_non_empty("managed-id", managed_id)?;

            let client = ctx.connect()?;
            render::to_value(&client.remove_attachment(calendar, uid, managed_id)?)
        }
    }
}
