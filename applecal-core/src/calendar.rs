use serde::Serialize;

/// A calendar collection under the calendar home.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Calendar {
    /// Server-provided display name.
    pub name: String,
    /// Absolute collection URL.
    pub url: String,
    /// Component names from supported-calendar-component-set, e.g. `VEVENT`.
    pub components: Vec<String>,
}

impl Calendar {
    pub fn supports_events(&self) -> bool {
        self.components
            .iter()
            .any(|c| c.eq_ignore_ascii_case("VEVENT"))
    }

    /// Resource URL for an event: `{collection}/{uid}.ics`.
    pub fn event_url(&self, uid: &str) -> String {
        format!("{}/{}.ics", self.url.trim_end_matches('/'), uid)
    }
}
