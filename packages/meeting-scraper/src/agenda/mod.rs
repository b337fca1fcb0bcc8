//! Agenda documents to plain text.
//!
//! [`AgendaLoader`] downloads a linked agenda through the politeness layer;
//! [`extract_text`] turns the bytes into text according to the resolved
//! [`AgendaFormat`]. An empty result is valid and means "no agenda text".

pub mod html;
pub mod pdf;

pub use html::html_to_text;
pub use pdf::{pdf_to_text, PAGE_BREAK};

use std::sync::Arc;
use std::time::Duration;

use tracing::{debug, info, warn};

use crate::adapters::HttpFetcher;
use crate::error::{ExtractError, FetchError, SourceError};
use crate::types::{AgendaFormat, AgendaResource};

/// Agenda bytes plus what is known about their format.
#[derive(Debug, Clone)]
pub struct AgendaDocument {
    pub bytes: Vec<u8>,
    /// Explicit format from the adapter or the URL extension
    pub declared: Option<AgendaFormat>,
    pub content_type: Option<String>,
}

impl AgendaDocument {
    pub fn new(bytes: impl Into<Vec<u8>>, declared: Option<AgendaFormat>) -> Self {
        Self {
            bytes: bytes.into(),
            declared,
            content_type: None,
        }
    }

    pub fn with_content_type(mut self, content_type: impl Into<String>) -> Self {
        self.content_type = Some(content_type.into());
        self
    }

    /// Explicit tag, else `Content-Type`, else magic bytes, else markup sniffing.
    pub fn resolve_format(&self) -> Option<AgendaFormat> {
        self.declared
            .or_else(|| {
                self.content_type
                    .as_deref()
                    .and_then(AgendaFormat::from_content_type)
            })
            .or_else(|| sniff(&self.bytes))
    }
}

fn sniff(bytes: &[u8]) -> Option<AgendaFormat> {
    if bytes.starts_with(b"%PDF-") {
        return Some(AgendaFormat::Pdf);
    }
    let head = String::from_utf8_lossy(&bytes[..bytes.len().min(512)]).to_ascii_lowercase();
    let head = head.trim_start_matches('\u{feff}').trim_start();
    if head.starts_with('<') || head.contains("<html") {
        Some(AgendaFormat::Html)
    } else {
        None
    }
}

/// Plain text with CRLF normalized and trailing whitespace trimmed per line.
pub fn normalize_plain_text(text: &str) -> String {
    text.replace("\r\n", "\n")
        .replace('\r', "\n")
        .lines()
        .map(str::trim_end)
        .collect::<Vec<_>>()
        .join("\n")
        .trim()
        .to_string()
}

/// Extract text from an agenda document.
pub fn extract_text(document: &AgendaDocument) -> Result<String, ExtractError> {
    let format = document.resolve_format().ok_or_else(|| ExtractError::Unsupported {
        format: document
            .content_type
            .clone()
            .unwrap_or_else(|| "unknown".to_string()),
    })?;

    let text = match format {
        AgendaFormat::Pdf => pdf_to_text(&document.bytes)?,
        AgendaFormat::Html => html_to_text(&String::from_utf8_lossy(&document.bytes)),
        AgendaFormat::Text => normalize_plain_text(&String::from_utf8_lossy(&document.bytes)),
    };
    Ok(text)
}

/// Plain-text renditions shorter than this (trimmed, in chars) are treated as
/// missing and the linked document is used instead.
pub const MIN_PLAIN_TEXT_CHARS: usize = 100;

/// Downloads and extracts agendas for the pipeline.
pub struct AgendaLoader {
    fetcher: Arc<HttpFetcher>,
    timeout: Duration,
}

impl AgendaLoader {
    pub fn new(fetcher: Arc<HttpFetcher>, timeout: Duration) -> Self {
        Self { fetcher, timeout }
    }

    /// Fetch (if linked) and extract the agenda's text.
    ///
    /// A linked agenda with a text endpoint tries that first and falls back to
    /// the document when the endpoint fails or returns too little.
    pub async fn load_text(&self, resource: &AgendaResource) -> Result<String, ExtractError> {
        let document = match resource {
            AgendaResource::Inline { bytes, format } => AgendaDocument::new(bytes.clone(), Some(*format)),
            AgendaResource::Url {
                url,
                format,
                text_url,
            } => {
                if let Some(text_url) = text_url {
                    match self.load_plain_text(text_url).await {
                        Ok(Some(text)) => return Ok(text),
                        Ok(None) => debug!(url = %text_url, "Plain-text agenda too short, using document"),
                        Err(e) => warn!(url = %text_url, error = %e, "Plain-text agenda failed, using document"),
                    }
                }
                self.download(url, *format).await?
            }
        };

        self.extract(document).await
    }

    async fn load_plain_text(&self, url: &str) -> Result<Option<String>, ExtractError> {
        let document = self.download(url, Some(AgendaFormat::Text)).await?;
        let text = extract_text(&document)?;
        Ok((text.trim().chars().count() >= MIN_PLAIN_TEXT_CHARS).then_some(text))
    }

    async fn extract(&self, document: AgendaDocument) -> Result<String, ExtractError> {
        let size = document.bytes.len();
        // PDF parsing is CPU-bound
        let text = tokio::task::spawn_blocking(move || extract_text(&document))
            .await
            .map_err(|e| ExtractError::Corrupt(format!("extraction task failed: {e}")))??;

        debug!(bytes = size, chars = text.chars().count(), "Agenda text extracted");
        Ok(text)
    }

    async fn download(&self, url: &str, declared: Option<AgendaFormat>) -> Result<AgendaDocument, ExtractError> {
        let downloaded = tokio::time::timeout(self.timeout, self.fetcher.get_document(url))
            .await
            .map_err(|_| FetchError::Timeout {
                url: url.to_string(),
            })?
            .map_err(|e| match e {
                SourceError::Policy(p) => ExtractError::Policy(p),
                SourceError::Fetch(f) => ExtractError::Fetch(f),
                SourceError::Timeout { .. } => ExtractError::Fetch(FetchError::Timeout {
                    url: url.to_string(),
                }),
                SourceError::NoAdapter { kind } => ExtractError::Unsupported { format: kind },
            })?;

        info!(url = %url, bytes = downloaded.bytes.len(), "Agenda downloaded");
        let mut document = AgendaDocument::new(downloaded.bytes, declared);
        document.content_type = downloaded.content_type;
        Ok(document)
    }
}
