//! Google Calendar v3 wire types

use std::collections::BTreeMap;

use chrono::{DateTime, SecondsFormat, Utc};
use duesync_domain::EventSpec;
use serde::{Deserialize, Serialize};

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub(super) struct EventBody<'a> {
    summary: &'a str,
    description: &'a str,
    start: EventTime,
    end: EventTime,
    reminders: Reminders,
    extended_properties: ExtendedProperties<'a>,
}

impl<'a> EventBody<'a> {
    pub(super) fn from_spec(spec: &'a EventSpec) -> Self {
        Self {
            summary: &spec.summary,
            description: &spec.description,
            start: EventTime::at(spec.start),
            end: EventTime::at(spec.end),
            reminders: Reminders {
                use_default: false,
                overrides: spec
                    .reminders
                    .iter()
                    .map(|minutes| ReminderOverride { method: "popup", minutes: *minutes })
                    .collect(),
            },
            extended_properties: ExtendedProperties { private: &spec.extended_properties },
        }
    }
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
struct EventTime {
    date_time: String,
    time_zone: &'static str,
}

impl EventTime {
    fn at(at: DateTime<Utc>) -> Self {
        Self { date_time: at.to_rfc3339_opts(SecondsFormat::Secs, true), time_zone: "UTC" }
    }
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
struct Reminders {
    use_default: bool,
    overrides: Vec<ReminderOverride>,
}

#[derive(Debug, Serialize)]
struct ReminderOverride {
    method: &'static str,
    minutes: u32,
}

#[derive(Debug, Serialize)]
struct ExtendedProperties<'a> {
    private: &'a BTreeMap<String, String>,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub(super) struct NewCalendar<'a> {
    pub summary: &'a str,
    pub time_zone: &'static str,
}

/// Any created resource; only the id is read.
#[derive(Debug, Deserialize)]
pub(super) struct Created {
    pub id: String,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub(super) struct CalendarList {
    #[serde(default)]
    pub items: Vec<CalendarListEntry>,
    pub next_page_token: Option<String>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub(super) struct CalendarListEntry {
    pub id: String,
    #[serde(default)]
    pub summary: String,
    #[serde(default)]
    pub access_role: String,
}

/// `{"error": {"code": 403, "message": "...", "errors": [{"reason": "..."}]}}`
#[derive(Debug, Default, Deserialize)]
pub(super) struct ApiErrorBody {
    #[serde(default)]
    pub error: ApiError,
}

#[derive(Debug, Default, Deserialize)]
pub(super) struct ApiError {
    #[serde(default)]
    pub message: String,
    #[serde(default)]
    pub errors: Vec<ApiErrorItem>,
}

#[derive(Debug, Default, Deserialize)]
pub(super) struct ApiErrorItem {
    #[serde(default)]
    pub reason: String,
}

impl ApiErrorBody {
    pub(super) fn has_reason(&self, reasons: &[&str]) -> bool {
        self.error.errors.iter().any(|item| reasons.contains(&item.reason.as_str()))
    }
}
