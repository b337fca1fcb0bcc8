//! Raw records to canonical meetings in the civil time zone.

use std::sync::LazyLock;

use chrono::{DateTime, FixedOffset, LocalResult, NaiveDate, NaiveDateTime, TimeZone};
use chrono_tz::Tz;
use regex::Regex;

use crate::config::SourceConfig;
use crate::error::ValidationError;
use crate::types::{identity_key, Meeting, RawRecord, SummaryKind};

static MERIDIEM: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"(?i)(\d)\s*([ap])\.?\s*m\b\.?").unwrap());

static ORDINAL: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"(?i)\b(\d{1,2})(?:st|nd|rd|th)\b").unwrap());

/// Whitespace collapsed, `a.m.`/`p.m.` spelled `AM`/`PM`, ordinal suffixes removed.
pub fn clean_date_text(text: &str) -> String {
    let collapsed = collapse(text);
    let meridiem = MERIDIEM.replace_all(&collapsed, |caps: &regex::Captures| {
        format!("{} {}M", &caps[1], caps[2].to_ascii_uppercase())
    });
    ORDINAL.replace_all(&meridiem, "$1").into_owned()
}

fn collapse(text: &str) -> String {
    text.split_whitespace().collect::<Vec<_>>().join(" ")
}

fn has_offset(format: &str) -> bool {
    format.contains("%z") || format.contains("%:z") || format.contains("%#z")
}

/// Converts raw records into meetings for one civil zone.
#[derive(Debug, Clone, Copy)]
pub struct Normalizer {
    tz: Tz,
}

impl Normalizer {
    pub fn new(tz: Tz) -> Self {
        Self { tz }
    }

    pub fn timezone(&self) -> Tz {
        self.tz
    }

    pub fn normalize(&self, raw: &RawRecord, source: &SourceConfig) -> Result<Meeting, ValidationError> {
        let title = collapse(&raw.title);
        if title.is_empty() {
            return Err(ValidationError::MissingTitle);
        }

        let start_time = self.parse_start(&raw.date_text, raw.time_text.as_deref(), source)?;

        let body = non_empty(raw.body.as_deref())
            .or_else(|| non_empty(source.body.as_deref()))
            .unwrap_or_else(|| source.id.clone());
        let location = non_empty(raw.location.as_deref())
            .or_else(|| non_empty(source.default_location.as_deref()))
            .unwrap_or_default();
        let source_url = non_empty(Some(raw.source_url.as_str())).unwrap_or_else(|| source.url.clone());

        Ok(Meeting {
            id: identity_key(&source.id, start_time.date_naive(), &title),
            title,
            body,
            start_time,
            location,
            source_url,
            agenda_url: raw
                .agenda
                .as_ref()
                .and_then(|a| a.public_url())
                .map(str::to_string),
            highlights: Vec::new(),
            summary_kind: SummaryKind::None,
        })
    }

    /// Start instant from date text plus optional time text.
    ///
    /// A time that parses with the date wins; otherwise the date alone is
    /// used with the source's default time.
    pub fn parse_start(
        &self,
        date_text: &str,
        time_text: Option<&str>,
        source: &SourceConfig,
    ) -> Result<DateTime<FixedOffset>, ValidationError> {
        let date = clean_date_text(date_text);
        if date.is_empty() {
            return Err(ValidationError::MissingDate);
        }

        // "6:00 PM - 8:00 PM" starts at the first time
        let time = time_text
            .map(|t| t.split(['-', '–', '—']).next().unwrap_or(t))
            .map(clean_date_text)
            .filter(|t| !t.is_empty());
        if let Some(time) = time {
            let combined = format!("{date} {time}");
            let formats = combined_formats(source);
            if let Some(result) = self.pick(&combined, &formats, source) {
                return result;
            }
        }

        let mut formats = source.date_formats.clone();
        formats.extend(combined_formats(source));
        self.pick(&date, &formats, source)
            .unwrap_or_else(|| Err(ValidationError::UnparseableDate { raw: date.clone() }))
    }

    /// Try every format. `None` when none matched at all.
    fn pick(
        &self,
        text: &str,
        formats: &[String],
        source: &SourceConfig,
    ) -> Option<Result<DateTime<FixedOffset>, ValidationError>> {
        let mut instants: Vec<DateTime<FixedOffset>> = Vec::new();
        let mut local_error = None;

        for format in formats {
            match self.parse_with(text, format, source) {
                Some(Ok(instant)) => {
                    if !instants.contains(&instant) {
                        instants.push(instant);
                    }
                }
                Some(Err(e)) => local_error = local_error.or(Some(e)),
                None => {}
            }
        }

        match instants.len() {
            0 => local_error.map(Err),
            1 => Some(Ok(instants[0])),
            n => Some(Err(ValidationError::Ambiguous {
                raw: text.to_string(),
                candidates: n,
            })),
        }
    }

    fn parse_with(
        &self,
        text: &str,
        format: &str,
        source: &SourceConfig,
    ) -> Option<Result<DateTime<FixedOffset>, ValidationError>> {
        if has_offset(format) {
            let parsed = DateTime::parse_from_str(text, format).ok()?;
            return Some(Ok(parsed.with_timezone(&self.tz).fixed_offset()));
        }
        if let Ok(naive) = NaiveDateTime::parse_from_str(text, format) {
            return Some(self.localize(naive, text));
        }
        let date = NaiveDate::parse_from_str(text, format).ok()?;
        Some(self.localize(date.and_time(source.default_time()), text))
    }

    /// Attach the civil zone, refusing DST gaps and folds.
    fn localize(&self, naive: NaiveDateTime, raw: &str) -> Result<DateTime<FixedOffset>, ValidationError> {
        match self.tz.from_local_datetime(&naive) {
            LocalResult::Single(dt) => Ok(dt.fixed_offset()),
            LocalResult::None => Err(ValidationError::NonexistentLocalTime {
                raw: raw.to_string(),
                zone: self.tz.name().to_string(),
            }),
            LocalResult::Ambiguous(_, _) => Err(ValidationError::AmbiguousLocalTime {
                raw: raw.to_string(),
                zone: self.tz.name().to_string(),
            }),
        }
    }
}

/// Every date format joined with every time format.
fn combined_formats(source: &SourceConfig) -> Vec<String> {
    source
        .date_formats
        .iter()
        .flat_map(|d| source.time_formats.iter().map(move |t| format!("{d} {t}")))
        .collect()
}

fn non_empty(value: Option<&str>) -> Option<String> {
    value.map(collapse).filter(|v| !v.is_empty())
}
