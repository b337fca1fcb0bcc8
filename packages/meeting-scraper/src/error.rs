//! Typed errors for the meeting scraper.
//!
//! Uses `thiserror` for library errors (not `anyhow`). Per-record and
//! per-source errors are logged and absorbed by the pipeline; only
//! [`OutputError`] is fatal for a run.

use std::path::PathBuf;
use std::time::Duration;

use thiserror::Error;

/// Network or parse failure while fetching a listing or agenda.
#[derive(Debug, Error)]
pub enum FetchError {
    /// HTTP transport failed
    #[error("HTTP request to {url} failed: {source}")]
    Http {
        url: String,
        #[source]
        source: reqwest::Error,
    },

    /// Server answered with a non-success status
    #[error("HTTP {status} from {url}")]
    Status { url: String, status: u16 },

    /// Headless browser could not load or render the page
    #[error("browser error on {url}: {message}")]
    Browser { url: String, message: String },

    /// Invalid URL format
    #[error("invalid URL: {url}")]
    InvalidUrl { url: String },

    /// A configured CSS selector could not be parsed
    #[error("invalid selector {selector:?}: {message}")]
    Selector { selector: String, message: String },

    /// Response body was not the expected JSON shape
    #[error("unexpected response from {url}: {source}")]
    Decode {
        url: String,
        #[source]
        source: serde_json::Error,
    },

    /// A single request exceeded its timeout
    #[error("timeout fetching {url}")]
    Timeout { url: String },
}

/// robots.txt disallows fetching the URL.
#[derive(Debug, Error)]
#[error("robots.txt disallows {url}")]
pub struct PolicyError {
    pub url: String,
}

/// Why a whole source produced no records.
#[derive(Debug, Error)]
pub enum SourceError {
    #[error(transparent)]
    Fetch(#[from] FetchError),

    #[error(transparent)]
    Policy(#[from] PolicyError),

    /// The adapter did not finish within the source timeout
    #[error("source timed out after {after:?}")]
    Timeout { after: Duration },

    /// No adapter is registered for the source's adapter type
    #[error("no adapter registered for {kind}")]
    NoAdapter { kind: String },
}

impl SourceError {
    /// Policy skips are expected behavior, not failures.
    pub fn is_policy(&self) -> bool {
        matches!(self, SourceError::Policy(_))
    }
}

/// Agenda resource could not be turned into text.
#[derive(Debug, Error)]
pub enum ExtractError {
    #[error("unsupported agenda format: {format}")]
    Unsupported { format: String },

    #[error("corrupt agenda document: {0}")]
    Corrupt(String),

    #[error("agenda download failed: {0}")]
    Fetch(#[from] FetchError),

    #[error(transparent)]
    Policy(#[from] PolicyError),
}

/// A raw record could not become a [`crate::Meeting`].
#[derive(Debug, Error, PartialEq, Eq)]
pub enum ValidationError {
    #[error("record has no title")]
    MissingTitle,

    #[error("record has no date")]
    MissingDate,

    #[error("unparseable date {raw:?}")]
    UnparseableDate { raw: String },

    /// Two configured formats produced different instants
    #[error("ambiguous date {raw:?} ({candidates} different readings)")]
    Ambiguous { raw: String, candidates: usize },

    /// Local time falls in a DST gap
    #[error("local time {raw:?} does not exist in {zone}")]
    NonexistentLocalTime { raw: String, zone: String },

    /// Local time falls in a DST fold
    #[error("local time {raw:?} is ambiguous in {zone}")]
    AmbiguousLocalTime { raw: String, zone: String },
}

/// Language-model failure. Never leaves the summarizer.
#[derive(Debug, Error)]
pub enum SummaryError {
    #[error("model call failed: {0}")]
    Model(String),

    #[error("model call timed out after {0:?}")]
    Timeout(Duration),

    #[error("model returned no usable bullets")]
    EmptyResponse,
}

/// Configuration could not be loaded or is invalid.
#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("failed to read config {path}: {source}")]
    Read {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("failed to parse config: {0}")]
    Parse(#[from] serde_json::Error),

    #[error("invalid config: {0}")]
    Invalid(String),
}

/// Writing the output document failed. Fatal for the run.
#[derive(Debug, Error)]
pub enum OutputError {
    #[error("failed to serialize output document: {0}")]
    Serialize(#[from] serde_json::Error),

    #[error("failed to write {path}: {source}")]
    Write {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
}

/// Result type alias for fetch operations.
pub type FetchResult<T> = std::result::Result<T, FetchError>;

/// Result type alias for whole-source operations.
pub type SourceResult<T> = std::result::Result<T, SourceError>;
