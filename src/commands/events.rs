use std::path::PathBuf;

use anyhow::{Context as _, Result};
use applecal_core::aggregate::{validate_max, validate_names};
use applecal_core::date_range::TimeWindow;
use applecal_core::event::{require_non_empty, validate_uid};
use applecal_core::{EventPatch, EventUpdate, NewEvent};
use clap::Subcommand;
use serde_json::Value;

use super::Context;
use crate::render;

#[derive(Subcommand)]
pub enum EventsCommand {
    /// List events across one or more calendars
    List {
        /// Calendar display name (repeatable)
        #[arg(long = "calendar", required = true)]
        calendars: Vec<String>,

        /// Window start (ISO 8601, default now)
        #[arg(long)]
        from: Option<String>,

        /// Window end (ISO 8601, default now + 7 days)
        #[arg(long)]
        to: Option<String>,

        /// Case-insensitive text filter on summary, location and description
        #[arg(long)]
        query: Option<String>,

        /// Keep at most this many events after merging
        #[arg(long, allow_negative_numbers = true)]
        max: Option<i64>,
    },
    /// Create an event
    Create {
        #[arg(long)]
        calendar: String,

        #[arg(long)]
        summary: String,

        #[arg(long)]
        start: String,

        #[arg(long)]
        end: String,

        #[arg(long)]
        location: Option<String>,

        #[arg(long)]
        description: Option<String>,

        #[arg(long)]
        all_day: bool,
    },
    /// Update fields of an existing event, or replace its body
    Update {
        #[arg(long)]
        calendar: String,

        #[arg(long)]
        uid: String,

        #[arg(long)]
        summary: Option<String>,

        #[arg(long)]
        start: Option<String>,

        #[arg(long)]
        end: Option<String>,

        #[arg(long)]
        location: Option<String>,

        #[arg(long)]
        description: Option<String>,

        #[arg(long)]
        all_day: bool,

        /// Store this iCalendar file verbatim instead of merging fields
        #[arg(
            long,
            conflicts_with_all = ["summary", "start", "end", "location", "description", "all_day"]
        )]
        ics_file: Option<PathBuf>,
    },
    /// Delete an event
    Delete {
        #[arg(long)]
        calendar: String,

        #[arg(long)]
        uid: String,
    },
}

pub fn run(ctx: &Context, command: &EventsCommand) -> Result<Value> {
    match command {
        EventsCommand::List {
            calendars,
            from,
            to,
            query,
            max,
        } => {
            let window = TimeWindow::from_args(from.as_deref(), to.as_deref())?;
            validate_names(calendars)?;
            validate_max(*max)?;

            let client = ctx.connect()?;
            render::to_value(&client.list_events_all(calendars, &window, query.as_deref(), *max)?)
        }
        EventsCommand::Create {
            calendar,
            summary,
            start,
            end,
            location,
            description,
            all_day,
        } => {
            require_non_empty("calendar", calendar)?;
            let new = NewEvent {
                summary: summary.clone(),
                start: start.clone(),
                end: end.clone(),
                all_day: *all_day,
                location: location.clone(),
                description: description.clone(),
            };
            new.validate()?;

            let client = ctx.connect()?;
            render::to_value(&client.create_event(calendar, &new)?)
        }
        EventsCommand::Update {
            calendar,
            uid,
            summary,
            start,
            end,
            location,
            description,
            all_day,
            ics_file,
        } => {
            require_non_empty("calendar", calendar)?;
            validate_uid(uid)?;
            let update = match ics_file {
                Some(path) => EventUpdate::Raw(
                    std::fs::read_to_string(path)
                        .with_context(|| format!("Failed to read {}", path.display()))?,
                ),
                None => EventUpdate::Fields(EventPatch {
                    summary: summary.clone(),
                    start: start.clone(),
                    end: end.clone(),
                    all_day: all_day.then_some(true),
                    location: location.clone(),
                    description: description.clone(),
                }),
            };
            update.validate()?;

            let client = ctx.connect()?;
            render::to_value(&client.update_event(calendar, uid, &update)?)
        }
        EventsCommand::Delete { calendar, uid } => {
            require_non_empty("calendar", calendar)?;
            validate_uid(uid)?;

            let client = ctx.connect()?;
            render::to_value(&client.delete_event(calendar, uid)?)
        }
    }
}
