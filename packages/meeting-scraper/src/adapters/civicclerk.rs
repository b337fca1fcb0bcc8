//! CivicClerk agenda links and their plain-text file stream.
//!
//! CivicClerk portals serve every meeting file through
//! `GetMeetingFileStream`; with `plainText=true` the same file comes back as
//! text, which skips PDF parsing entirely.

use std::sync::LazyLock;

use regex::Regex;
use url::Url;

use crate::config::{SourceConfig, TextEndpoint};
use crate::types::{AgendaResource, RawRecord};

static AGENDA_FILE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"(?i)/files/agenda/(\d+)").unwrap());

/// Plain-text stream URL for a CivicClerk agenda link, if it is one.
///
/// Accepts portal links (`/files/agenda/<id>`) and direct
/// `GetMeetingFileStream` URLs.
pub fn plain_text_endpoint(agenda_url: &str) -> Option<String> {
    let parsed = Url::parse(agenda_url).ok()?;

    if let Some(caps) = AGENDA_FILE.captures(parsed.path()) {
        let file_id = caps.get(1)?.as_str();
        return Some(format!(
            "{}/WebAPI/MeetingFile/GetMeetingFileStream?fileId={file_id}&plainText=true",
            parsed.origin().ascii_serialization()
        ));
    }

    if !parsed.path().to_ascii_lowercase().contains("getmeetingfilestream") {
        return None;
    }
    let pairs: Vec<(String, String)> = parsed
        .query_pairs()
        .filter(|(key, _)| !key.eq_ignore_ascii_case("plainText"))
        .map(|(k, v)| (k.into_owned(), v.into_owned()))
        .collect();
    let mut rewritten = parsed;
    rewritten
        .query_pairs_mut()
        .clear()
        .extend_pairs(pairs)
        .append_pair("plainText", "true");
    Some(rewritten.into())
}

/// Attach the source's text endpoint to every linked agenda it applies to.
pub fn attach_text_endpoints(source: &SourceConfig, records: &mut [RawRecord]) {
    let Some(TextEndpoint::Civicclerk) = source.agenda_text_endpoint else {
        return;
    };
    for record in records {
        let endpoint = record
            .agenda
            .as_ref()
            .and_then(AgendaResource::public_url)
            .and_then(plain_text_endpoint);
        if let (Some(endpoint), Some(agenda)) = (endpoint, record.agenda.take()) {
            record.agenda = Some(agenda.with_text_url(endpoint));
        }
    }
}
