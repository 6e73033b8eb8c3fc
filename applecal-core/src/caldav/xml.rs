//! Multistatus response parsing.
//!
//! Elements are matched by local name, ignoring namespace prefixes, which
//! servers choose freely.

use roxmltree::{Document, Node};

use crate::error::{AppleCalError, CalResult};

/// A fetched calendar resource with its ICS data.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CalendarResource {
    pub href: String,
    pub etag: Option<String>,
    pub data: String,
}

/// One child collection from a depth-1 PROPFIND.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CollectionEntry {
    pub href: String,
    pub display_name: Option<String>,
    pub components: Vec<String>,
}

fn parse(body: &str) -> CalResult<Document<'_>> {
    Document::parse(body)
        .map_err(|e| AppleCalError::MalformedResponse(format!("invalid XML in response: {e}")))
}

fn is(node: &Node<'_, '_>, name: &str) -> bool {
    node.is_element() && node.tag_name().name().eq_ignore_ascii_case(name)
}

fn text_of(node: Node<'_, '_>) -> Option<String> {
    let text: String = node
        .descendants()
        .filter(|n| n.is_text())
        .filter_map(|n| n.text())
        .collect();
    let trimmed = text.trim();
    (!trimmed.is_empty()).then(|| trimmed.to_string())
}

/// Every `<href>` found under any `<prop_name>` element, in document order.
pub fn property_hrefs(body: &str, prop_name: &str) -> CalResult<Vec<String>> {
    let doc = parse(body)?;
    Ok(doc
        .descendants()
        .filter(|n| is(n, prop_name))
        .flat_map(|prop| prop.descendants().filter(|n| is(n, "href")))
        .filter_map(text_of)
        .collect())
}

/// First `<href>` under `<prop_name>`, if any.
pub fn property_href(body: &str, prop_name: &str) -> CalResult<Option<String>> {
    Ok(property_hrefs(body, prop_name)?.into_iter().next())
}

fn response_href(response: Node<'_, '_>) -> Option<String> {
    response
        .children()
        .find(|n| is(n, "href"))
        .and_then(text_of)
}

/// Child collections from a depth-1 PROPFIND on the calendar home.
pub fn collections(body: &str) -> CalResult<Vec<CollectionEntry>> {
    let doc = parse(body)?;
    let mut entries = Vec::new();

    for response in doc.descendants().filter(|n| is(n, "response")) {
        let Some(href) = response_href(response) else {
            continue;
        };

        let display_name = response
            .descendants()
            .find(|n| is(n, "displayname"))
            .and_then(text_of);

        let components = response
            .descendants()
            .filter(|n| is(n, "supported-calendar-component-set"))
            .flat_map(|set| set.children().filter(|n| is(n, "comp")))
            .filter_map(|comp| comp.attribute("name").map(str::to_string))
            .collect();

        entries.push(CollectionEntry {
            href,
            display_name,
            components,
        });
    }

    Ok(entries)
}

/// Resources carrying calendar-data from a calendar-query REPORT.
pub fn calendar_resources(body: &str) -> CalResult<Vec<CalendarResource>> {
    let doc = parse(body)?;
    let mut resources = Vec::new();

    for response in doc.descendants().filter(|n| is(n, "response")) {
        let Some(href) = response_href(response) else {
            continue;
        };

        let etag = response
            .descendants()
            .find(|n| is(n, "getetag"))
            .and_then(text_of);

        // Only include resources that have calendar data
        let data = response
            .descendants()
            .find(|n| is(n, "calendar-data"))
            .and_then(text_of);

        if let Some(data) = data {
            resources.push(CalendarResource { href, etag, data });
        }
    }

    Ok(resources)
}

/// Text of every `<calendar-data>` element, for responses that wrap
/// calendar bodies in XML (scheduling responses, free-busy reports).
pub fn calendar_data_texts(body: &str) -> CalResult<Vec<String>> {
    let doc = parse(body)?;
    Ok(doc
        .descendants()
        .filter(|n| is(n, "calendar-data"))
        .filter_map(text_of)
        .collect())
}
