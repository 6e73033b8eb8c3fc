//! Calendar text codec.
//!
//! Reading and writing single-event calendar bodies: TEXT escaping, line
//! folding, VEVENT extraction on the icalendar parser and body generation.

mod escape;
mod fold;
mod generate;
mod parse;

pub use escape::{escape_text, unescape_text};
pub use fold::{FOLD_LIMIT, build_ics_text, fold_line, unfold};
pub use generate::{EventBody, generate_event, generate_freebusy_request};
pub use parse::{
    PropertyLine, attachment_lines, attachments, component_properties, extract_fields,
    parse_event, vevent_properties,
};
