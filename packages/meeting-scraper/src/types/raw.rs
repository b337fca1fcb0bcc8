//! Raw adapter output, before normalization.

use serde::{Deserialize, Serialize};

/// Document format of an agenda resource.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum AgendaFormat {
    Html,
    Pdf,
    /// Plain text stream (e.g. CivicClerk `plainText=true`)
    Text,
}

impl AgendaFormat {
    /// Guess from the URL alone. `None` means "sniff the downloaded bytes".
    pub fn from_url(url: &str) -> Option<Self> {
        let lower = url.to_ascii_lowercase();
        let path = lower.split(['?', '#']).next().unwrap_or_default();

        if path.ends_with(".pdf") {
            Some(AgendaFormat::Pdf)
        } else if path.ends_with(".html") || path.ends_with(".htm") {
            Some(AgendaFormat::Html)
        } else if path.ends_with(".txt") || lower.contains("plaintext=true") {
            Some(AgendaFormat::Text)
        } else {
            None
        }
    }

    /// Map a `Content-Type` header value.
    pub fn from_content_type(content_type: &str) -> Option<Self> {
        let ct = content_type.to_ascii_lowercase();
        if ct.contains("pdf") {
            Some(AgendaFormat::Pdf)
        } else if ct.contains("html") {
            Some(AgendaFormat::Html)
        } else if ct.starts_with("text/") {
            Some(AgendaFormat::Text)
        } else {
            None
        }
    }
}

/// Where an agenda's content lives.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum AgendaResource {
    /// Downloaded later by the pipeline
    Url {
        url: String,
        format: Option<AgendaFormat>,
        /// Plain-text rendition tried before `url`
        text_url: Option<String>,
    },
    /// Already in hand (e.g. an agenda fragment embedded in the listing)
    Inline {
        bytes: Vec<u8>,
        format: AgendaFormat,
    },
}

impl AgendaResource {
    pub fn url(url: impl Into<String>) -> Self {
        let url = url.into();
        let format = AgendaFormat::from_url(&url);
        AgendaResource::Url {
            url,
            format,
            text_url: None,
        }
    }

    /// Attach a plain-text endpoint. No effect on inline agendas.
    pub fn with_text_url(mut self, endpoint: impl Into<String>) -> Self {
        if let AgendaResource::Url { text_url, .. } = &mut self {
            *text_url = Some(endpoint.into());
        }
        self
    }

    pub fn inline_html(html: impl Into<String>) -> Self {
        AgendaResource::Inline {
            bytes: html.into().into_bytes(),
            format: AgendaFormat::Html,
        }
    }

    /// URL to publish as the meeting's agenda link, if any.
    pub fn public_url(&self) -> Option<&str> {
        match self {
            AgendaResource::Url { url, .. } => Some(url),
            AgendaResource::Inline { .. } => None,
        }
    }
}

/// One candidate meeting as scraped, unvalidated.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RawRecord {
    pub source_id: String,
    pub title: String,
    pub date_text: String,
    pub time_text: Option<String>,
    pub location: Option<String>,
    pub body: Option<String>,
    /// Page the record was found on, or its detail page
    pub source_url: String,
    pub agenda: Option<AgendaResource>,
}

impl RawRecord {
    pub fn new(
        source_id: impl Into<String>,
        title: impl Into<String>,
        date_text: impl Into<String>,
        source_url: impl Into<String>,
    ) -> Self {
        Self {
            source_id: source_id.into(),
            title: title.into(),
            date_text: date_text.into(),
            time_text: None,
            location: None,
            body: None,
            source_url: source_url.into(),
            agenda: None,
        }
    }

    pub fn with_time(mut self, time: impl Into<String>) -> Self {
        self.time_text = Some(time.into());
        self
    }

    pub fn with_location(mut self, location: impl Into<String>) -> Self {
        self.location = Some(location.into());
        self
    }

    pub fn with_body(mut self, body: impl Into<String>) -> Self {
        self.body = Some(body.into());
        self
    }

    pub fn with_agenda(mut self, agenda: AgendaResource) -> Self {
        self.agenda = Some(agenda);
        self
    }

    /// Short description for log lines.
    pub fn snippet(&self) -> String {
        let mut s = format!("{:?} @ {:?}", self.title, self.date_text);
        if let Some(t) = &self.time_text {
            s.push_str(&format!(" {t:?}"));
        }
        s
    }
}
