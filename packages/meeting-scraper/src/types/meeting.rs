//! Canonical meeting entity.

use chrono::{DateTime, FixedOffset, NaiveDate};
use serde::{Deserialize, Serialize};
use sha2::{Digest, Sha256};

use crate::summarize::Summary;

/// How a meeting's highlights were produced.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum SummaryKind {
    Model,
    Extractive,
    #[default]
    None,
}

/// One normalized meeting, as published to the front end.
///
/// Field names and order are the output contract; do not reorder.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Meeting {
    /// Identity key, see [`identity_key`]
    pub id: String,
    pub title: String,
    pub body: String,
    /// Civil time in the configured zone, serialized with its offset
    pub start_time: DateTime<FixedOffset>,
    pub location: String,
    pub source_url: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub agenda_url: Option<String>,
    #[serde(default)]
    pub highlights: Vec<String>,
    #[serde(default)]
    pub summary_kind: SummaryKind,
}

impl Meeting {
    pub fn has_highlights(&self) -> bool {
        !self.highlights.is_empty()
    }

    /// Record the summarizer's verdict.
    pub fn apply_summary(&mut self, summary: Summary) {
        let (kind, highlights) = summary.into_parts();
        self.summary_kind = kind;
        self.highlights = highlights;
    }
}

/// Case-folded, whitespace-collapsed title used for identity.
pub fn fold_title(title: &str) -> String {
    title
        .split_whitespace()
        .collect::<Vec<_>>()
        .join(" ")
        .to_lowercase()
}

/// Deterministic identity key for a real-world meeting.
///
/// Source, calendar date and folded title; time of day is deliberately left
/// out so a corrected start time does not fork the meeting.
pub fn identity_key(source_id: &str, date: NaiveDate, title: &str) -> String {
    let mut hasher = Sha256::new();
    hasher.update(source_id.as_bytes());
    hasher.update(b"|");
    hasher.update(date.format("%Y-%m-%d").to_string().as_bytes());
    hasher.update(b"|");
    hasher.update(fold_title(title).as_bytes());
    let digest = hex::encode(hasher.finalize());
    digest[..16].to_string()
}
