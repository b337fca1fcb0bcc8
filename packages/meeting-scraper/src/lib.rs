//! Municipal Meeting Scraper
//!
//! Collects upcoming public meetings from a configured list of municipal
//! calendars and publishes them as one JSON snapshot, each meeting carrying
//! a few highlights pulled from its agenda.
//!
//! # Pipeline
//!
//! ```text
//! sources ─► adapters ─► normalize ─► agendas ─► summarize ─► merge ─► output
//!               │                        │
//!          politeness               (PDF / HTML / text)
//! ```
//!
//! # Usage
//!
//! ```rust,ignore
//! use meeting_scraper::{Config, Pipeline};
//!
//! let config = Config::load(Path::new("config/sources.json"))?;
//! let pipeline = Pipeline::from_config(config)?;
//! let report = pipeline.run_to_file(Path::new("public/meetings.json")).await?;
//! ```
//!
//! # Modules
//!
//! - [`config`] - Settings and per-source configuration
//! - [`adapters`] - Site adapters (static HTML, rendered portals, Legistar)
//! - [`politeness`] - robots.txt and per-host request spacing
//! - [`normalize`] - Date parsing and canonical meetings
//! - [`agenda`] - Agenda download and text extraction
//! - [`summarize`] - Model and extractive highlights
//! - [`merge`] - Dedup, carry-forward and ordering
//! - [`pipeline`] - Run driver
//! - [`testing`] - Mock implementations for testing

pub mod adapters;
pub mod agenda;
pub mod config;
pub mod error;
pub mod merge;
pub mod normalize;
pub mod notify;
pub mod pipeline;
pub mod politeness;
pub mod summarize;
pub mod testing;
pub mod types;

// Re-export core types at crate root
pub use adapters::{AdapterRegistry, SiteAdapter};
pub use config::{AdapterKind, Config, LlmProvider, Settings, SourceConfig};
pub use error::{
    ConfigError, ExtractError, FetchError, OutputError, PolicyError, SourceError, SummaryError,
    ValidationError,
};
pub use merge::merge;
pub use normalize::Normalizer;
pub use pipeline::{Pipeline, RunReport, SourceFailure};
pub use summarize::{LanguageModel, Summarizer, Summary};
pub use types::{AgendaResource, Meeting, OutputDocument, RawRecord, SummaryKind};
