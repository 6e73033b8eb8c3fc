//! VEVENT field extraction using the icalendar crate's parser.
//!
//! Names, parameters, values and the component tree come from the parser.
//! Each property of the first VEVENT is paired with the logical line it was
//! read from, so attachment references can be carried over as written.

use std::collections::BTreeMap;

use icalendar::parser::{Component, Property, read_calendar};

use super::escape::unescape_text;
use super::fold::unfold;
use crate::event::{Event, EventTime};
use crate::time::{parse_caldav_date, parse_caldav_datetime};

/// One property of the first VEVENT.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PropertyLine {
    /// Upper-cased property name.
    pub name: String,
    /// `(KEY, value)` pairs; keys upper-cased, values unquoted.
    pub params: Vec<(String, String)>,
    /// Value as written, still escaped.
    pub value: String,
    /// The logical line the property came from.
    pub line: String,
    /// Position of `line` in [`unfold`] of the body, when it could be matched.
    pub index: Option<usize>,
}

impl PropertyLine {
    fn from_parsed(prop: &Property<'_>, source: Option<(usize, &String)>) -> Self {
        let name = prop.name.to_string().to_ascii_uppercase();
        let params: Vec<(String, String)> = prop
            .params
            .iter()
            .map(|p| {
                let value = p.val.as_ref().map(|v| v.to_string()).unwrap_or_default();
                (
                    p.key.to_string().to_ascii_uppercase(),
                    value.trim_matches('"').to_string(),
                )
            })
            .collect();
        let value = prop.val.to_string();

        let (index, line) = match source {
            Some((index, line)) => (Some(index), line.clone()),
            None => (None, render_line(&name, &params, &value)),
        };

        PropertyLine {
            name,
            params,
            value,
            line,
            index,
        }
    }

    pub fn is(&self, name: &str) -> bool {
        self.name.eq_ignore_ascii_case(name)
    }

    /// Parameter value by name (case-insensitive).
    pub fn param(&self, key: &str) -> Option<&str> {
        self.params
            .iter()
            .find(|(k, _)| k.eq_ignore_ascii_case(key))
            .map(|(_, v)| v.as_str())
    }

    pub fn text(&self) -> String {
        unescape_text(&self.value)
    }
}

/// Properties of the first VEVENT in document order. Nested components
/// such as VALARM are not included. Empty when the body does not parse or
/// has no VEVENT.
pub fn vevent_properties(text: &str) -> Vec<PropertyLine> {
    let unfolded = icalendar::parser::unfold(text);
    let Ok(calendar) = read_calendar(&unfolded) else {
        return Vec::new();
    };
    let Some(vevent) = find_component(&calendar.components, "VEVENT") else {
        return Vec::new();
    };

    let lines = unfold(text);
    let own = own_line_indices(&lines);
    let paired = own.len() == vevent.properties.len();

    vevent
        .properties
        .iter()
        .enumerate()
        .map(|(n, prop)| {
            let source = own
                .get(n)
                .filter(|_| paired)
                .and_then(|&index| lines.get(index).map(|line| (index, line)));
            PropertyLine::from_parsed(prop, source)
        })
        .collect()
}

/// Every property of every component named `name`, anywhere in the body.
pub fn component_properties(text: &str, name: &str) -> Vec<PropertyLine> {
    let unfolded = icalendar::parser::unfold(text);
    let Ok(calendar) = read_calendar(&unfolded) else {
        return Vec::new();
    };

    let mut out = Vec::new();
    collect_properties(&calendar.components, name, &mut out);
    out
}

/// `KEY -> unescaped value` for every property of the first VEVENT; when a
/// property repeats, the last occurrence wins.
pub fn extract_fields(text: &str) -> BTreeMap<String, String> {
    vevent_properties(text)
        .into_iter()
        .map(|p| {
            let value = p.text();
            (p.name, value)
        })
        .collect()
}

/// Parse an event resource body into an [`Event`].
///
/// Returns `None` when the body has no VEVENT with a UID. Date-times carrying
/// a TZID or no zone marker are read as UTC (no timezone database is used).
pub fn parse_event(text: &str) -> Option<Event> {
    let props = vevent_properties(text);
    let find = |name: &str| props.iter().find(|p| p.is(name));
    let field = |name: &str| find(name).map(PropertyLine::text);

    let uid = field("UID")?;
    let start_prop = find("DTSTART");
    let end_prop = find("DTEND");

    let all_day = [start_prop, end_prop]
        .into_iter()
        .flatten()
        .any(is_date_value);

    Some(Event {
        uid,
        summary: field("SUMMARY"),
        start: start_prop.and_then(|p| event_time(p, all_day)),
        end: end_prop.and_then(|p| event_time(p, all_day)),
        all_day,
        location: field("LOCATION"),
        description: field("DESCRIPTION"),
        status: field("STATUS"),
        etag: None,
        href: None,
    })
}

/// ATTACH properties of the first VEVENT.
pub fn attachments(text: &str) -> Vec<PropertyLine> {
    vevent_properties(text)
        .into_iter()
        .filter(|p| p.is("ATTACH"))
        .collect()
}

/// Logical ATTACH lines of the first VEVENT, as written.
pub fn attachment_lines(text: &str) -> Vec<String> {
    attachments(text).into_iter().map(|p| p.line).collect()
}

fn find_component<'c, 'a>(
    components: &'c [Component<'a>],
    name: &str,
) -> Option<&'c Component<'a>> {
    components.iter().find_map(|c| {
        if c.name.to_string().eq_ignore_ascii_case(name) {
            Some(c)
        } else {
            find_component(&c.components, name)
        }
    })
}

fn collect_properties(components: &[Component<'_>], name: &str, out: &mut Vec<PropertyLine>) {
    for component in components {
        if component.name.to_string().eq_ignore_ascii_case(name) {
            out.extend(
                component
                    .properties
                    .iter()
                    .map(|prop| PropertyLine::from_parsed(prop, None)),
            );
        }
        collect_properties(&component.components, name, out);
    }
}

/// Indices of the logical lines holding the first VEVENT's own properties.
fn own_line_indices(lines: &[String]) -> Vec<usize> {
    let mut out = Vec::new();
    let mut in_event = false;
    let mut nested = 0usize;

    for (index, line) in lines.iter().enumerate() {
        if !in_event {
            in_event = line.eq_ignore_ascii_case("BEGIN:VEVENT");
            continue;
        }
        if nested == 0 && line.eq_ignore_ascii_case("END:VEVENT") {
            break;
        }
        if has_prefix(line, "BEGIN:") {
            nested += 1;
        } else if has_prefix(line, "END:") {
            nested = nested.saturating_sub(1);
        } else if nested == 0 && !line.trim().is_empty() {
            out.push(index);
        }
    }

    out
}

fn has_prefix(line: &str, prefix: &str) -> bool {
    line.get(..prefix.len())
        .is_some_and(|head| head.eq_ignore_ascii_case(prefix))
}

/// Write a property back as one logical line.
fn render_line(name: &str, params: &[(String, String)], value: &str) -> String {
    let mut line = name.to_string();
    for (key, val) in params {
        line.push(';');
        line.push_str(key);
        line.push('=');
        if val.contains([':', ';', ',']) {
            line.push('"');
            line.push_str(val);
            line.push('"');
        } else {
            line.push_str(val);
        }
    }
    line.push(':');
    line.push_str(value);
    line
}

fn is_date_value(prop: &PropertyLine) -> bool {
    prop.param("VALUE")
        .is_some_and(|v| v.eq_ignore_ascii_case("DATE"))
}

fn event_time(prop: &PropertyLine, all_day: bool) -> Option<EventTime> {
    let raw = prop.value.trim();
    if all_day {
        if let Ok(date) = parse_caldav_date(raw) {
            return Some(EventTime::Date(date));
        }
    }
    match parse_caldav_datetime(raw) {
        Ok(dt) => Some(EventTime::DateTime(dt)),
        Err(_) => parse_caldav_date(raw).ok().map(EventTime::Date),
    }
}
