//! CalDAV client core for Apple Calendar (iCloud).
//!
//! This crate provides everything the `applecal` CLI talks to the server with:
//! - `session` / `directory` for discovery and calendar lookup
//! - `repository` for event CRUD with conditional writes
//! - `freebusy` for the tiered free/busy resolution
//! - `attachment` for RFC 8607 managed attachments
//! - `aggregate` for multi-calendar listing and free/busy
//! - `ics` and `time` for the iCalendar text and timestamp formats

pub mod aggregate;
pub mod attachment;
pub mod caldav;
pub mod calendar;
pub mod client;
pub mod config;
pub mod constants;
pub mod date_range;
pub mod directory;
pub mod error;
pub mod event;
pub mod freebusy;
pub mod ics;
pub mod mime;
pub mod repository;
pub mod session;
pub mod time;

pub use client::{AppleCal, DoctorReport};
pub use config::ClientConfig;
pub use error::{AppleCalError, CalResult, ErrorInfo};
pub use event::{Event, EventPatch, EventTime, EventUpdate, NewEvent};
