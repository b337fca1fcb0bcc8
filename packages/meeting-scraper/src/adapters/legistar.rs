//! Adapter for the Legistar Web API (`webapi.legistar.com/v1/<client>`).
//!
//! Queries the `events` collection over a date window and maps each event to
//! a raw record. The agenda file, when published, becomes the agenda resource.

use std::sync::Arc;

use async_trait::async_trait;
use chrono::{Days, Utc};
use chrono_tz::Tz;
use serde::Deserialize;
use tracing::info;
use url::Url;

use super::{HttpFetcher, SiteAdapter};
use crate::config::SourceConfig;
use crate::error::{FetchError, SourceResult};
use crate::types::{AgendaResource, RawRecord};

/// Page size the API allows without paging.
const PAGE_SIZE: u32 = 200;

/// One event as returned by the API. Only the fields we map.
#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "PascalCase")]
pub struct LegistarEvent {
    #[serde(default)]
    pub event_id: Option<i64>,
    #[serde(default)]
    pub event_body_name: Option<String>,
    /// `2025-06-10T00:00:00`, date part only is meaningful
    #[serde(default)]
    pub event_date: Option<String>,
    /// Usually `6:00 PM`; some clients send minutes after midnight
    #[serde(default)]
    pub event_time: Option<serde_json::Value>,
    #[serde(default)]
    pub event_location: Option<String>,
    #[serde(default)]
    pub event_agenda_file: Option<String>,
    #[serde(default, rename = "EventInSiteURL")]
    pub event_in_site_url: Option<String>,
}

pub struct LegistarAdapter {
    fetcher: Arc<HttpFetcher>,
    timezone: Tz,
}

impl LegistarAdapter {
    pub fn new(fetcher: Arc<HttpFetcher>, timezone: Tz) -> Self {
        Self { fetcher, timezone }
    }

    /// `events` query for the window starting today in the configured zone.
    fn events_url(&self, source: &SourceConfig) -> Result<Url, FetchError> {
        let invalid = || FetchError::InvalidUrl {
            url: source.url.clone(),
        };
        let today = Utc::now().with_timezone(&self.timezone).date_naive();
        let until = today
            .checked_add_days(Days::new(u64::from(source.window_days)))
            .unwrap_or(today);

        let mut url = Url::parse(&format!("{}/events", source.url.trim_end_matches('/')))
            .map_err(|_| invalid())?;
        url.query_pairs_mut()
            .append_pair(
                "$filter",
                &format!(
                    "EventDate ge datetime'{}T00:00:00' and EventDate le datetime'{}T23:59:59'",
                    today.format("%Y-%m-%d"),
                    until.format("%Y-%m-%d"),
                ),
            )
            .append_pair("$orderby", "EventDate asc,EventTime asc")
            .append_pair("$top", &PAGE_SIZE.to_string());
        Ok(url)
    }
}

#[async_trait]
impl SiteAdapter for LegistarAdapter {
    async fn fetch(&self, source: &SourceConfig) -> SourceResult<Vec<RawRecord>> {
        let url = self.events_url(source)?;
        let events: Vec<LegistarEvent> = self.fetcher.get_json(url.as_str()).await?;
        let total = events.len();

        let records: Vec<RawRecord> = events
            .into_iter()
            .filter_map(|event| event_to_record(event, source))
            .filter(|record| source.accepts_title(&record.title))
            .collect();

        info!(
            source_id = %source.id,
            events = total,
            records = records.len(),
            "Legistar events fetched"
        );
        Ok(records)
    }

    fn name(&self) -> &str {
        "legistar"
    }
}

/// Map one event. Events without a body name fall back to the source body;
/// events without a date are passed through and rejected at normalization.
pub fn event_to_record(event: LegistarEvent, source: &SourceConfig) -> Option<RawRecord> {
    let body = non_empty(event.event_body_name).or_else(|| source.body.clone());
    let title = body.clone().unwrap_or_default();
    let date_text = event
        .event_date
        .as_deref()
        .map(|d| d.split('T').next().unwrap_or(d).trim().to_string())
        .unwrap_or_default();
    let source_url = non_empty(event.event_in_site_url).unwrap_or_else(|| source.url.clone());

    if title.is_empty() && date_text.is_empty() {
        return None;
    }

    let mut record = RawRecord::new(&source.id, title, date_text, source_url);
    record.time_text = event.event_time.as_ref().and_then(time_text);
    record.location = non_empty(event.event_location);
    record.body = body;
    record.agenda = non_empty(event.event_agenda_file).map(AgendaResource::url);
    Some(record)
}

fn time_text(value: &serde_json::Value) -> Option<String> {
    match value {
        serde_json::Value::String(s) => Some(s.trim().to_string()).filter(|s| !s.is_empty()),
        serde_json::Value::Number(n) => {
            let minutes = n.as_u64()?;
            if minutes >= 24 * 60 {
                return None;
            }
            let (hour, minute) = (minutes / 60, minutes % 60);
            let (display_hour, meridiem) = match hour {
                0 => (12, "AM"),
                1..=11 => (hour, "AM"),
                12 => (12, "PM"),
                _ => (hour - 12, "PM"),
            };
            Some(format!("{display_hour}:{minute:02} {meridiem}"))
        }
        _ => None,
    }
}

fn non_empty(value: Option<String>) -> Option<String> {
    value.map(|v| v.trim().to_string()).filter(|v| !v.is_empty())
}
