//! Agenda text to a bounded list of highlights.
//!
//! [`Summarizer::summarize`] never fails: a model problem of any kind falls
//! back to the extractive strategy for that one agenda.

pub mod extractive;
pub mod model;

pub use extractive::extractive_highlights;
pub use model::{build_prompt, parse_bullets, LanguageModel, OpenAiModel, SYSTEM_PROMPT};

use std::sync::Arc;
use std::time::Duration;

use tracing::{debug, warn};

use crate::config::Settings;
use crate::error::SummaryError;
use crate::types::SummaryKind;

/// Outcome of summarizing one agenda.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Summary {
    Model(Vec<String>),
    Extractive(Vec<String>),
    /// No agenda text to work from
    None,
}

impl Summary {
    pub fn kind(&self) -> SummaryKind {
        match self {
            Summary::Model(_) => SummaryKind::Model,
            Summary::Extractive(_) => SummaryKind::Extractive,
            Summary::None => SummaryKind::None,
        }
    }

    pub fn highlights(&self) -> &[String] {
        match self {
            Summary::Model(h) | Summary::Extractive(h) => h,
            Summary::None => &[],
        }
    }

    pub fn into_parts(self) -> (SummaryKind, Vec<String>) {
        let kind = self.kind();
        match self {
            Summary::Model(h) | Summary::Extractive(h) => (kind, h),
            Summary::None => (kind, Vec::new()),
        }
    }
}

/// Model-first summarizer with a deterministic fallback.
#[derive(Clone)]
pub struct Summarizer {
    model: Option<Arc<dyn LanguageModel>>,
    max_items: usize,
    max_chars: usize,
    timeout: Duration,
}

impl Summarizer {
    /// Extractive only.
    pub fn extractive(max_items: usize) -> Self {
        Self {
            model: None,
            max_items: max_items.max(1),
            max_chars: 50_000,
            timeout: Duration::from_secs(60),
        }
    }

    pub fn with_model(mut self, model: Arc<dyn LanguageModel>) -> Self {
        self.model = Some(model);
        self
    }

    pub fn with_max_chars(mut self, max_chars: usize) -> Self {
        self.max_chars = max_chars;
        self
    }

    pub fn with_timeout(mut self, timeout: Duration) -> Self {
        self.timeout = timeout;
        self
    }

    /// Model strategy when a provider and key are configured, else extractive.
    pub fn from_settings(settings: &Settings) -> Self {
        let base = Self::extractive(settings.max_highlights)
            .with_max_chars(settings.max_agenda_chars)
            .with_timeout(Duration::from_millis(settings.model_timeout_ms));

        match OpenAiModel::from_settings(settings) {
            Ok(Some(model)) => base.with_model(Arc::new(model)),
            Ok(None) => base,
            Err(e) => {
                warn!(error = %e, "Model client unavailable, using extractive highlights");
                base
            }
        }
    }

    pub fn has_model(&self) -> bool {
        self.model.is_some()
    }

    pub async fn summarize(&self, text: &str) -> Summary {
        if text.trim().is_empty() {
            return Summary::None;
        }

        if let Some(model) = &self.model {
            match self.ask_model(model.as_ref(), text).await {
                Ok(highlights) => return Summary::Model(highlights),
                Err(e) => warn!(error = %e, "Model summary failed, falling back to extractive"),
            }
        }

        let highlights = extractive_highlights(text, self.max_items);
        if highlights.is_empty() {
            Summary::None
        } else {
            Summary::Extractive(highlights)
        }
    }

    async fn ask_model(&self, model: &dyn LanguageModel, text: &str) -> Result<Vec<String>, SummaryError> {
        let agenda = truncate_chars(text, self.max_chars);
        let prompt = build_prompt(agenda, self.max_items);

        let reply = tokio::time::timeout(self.timeout, model.complete(SYSTEM_PROMPT, &prompt))
            .await
            .map_err(|_| SummaryError::Timeout(self.timeout))??;

        let highlights = parse_bullets(&reply, self.max_items);
        if highlights.is_empty() {
            return Err(SummaryError::EmptyResponse);
        }
        debug!(highlights = highlights.len(), "Model summary parsed");
        Ok(highlights)
    }
}

/// Prefix of at most `max` characters, cut on a char boundary.
fn truncate_chars(text: &str, max: usize) -> &str {
    match text.char_indices().nth(max) {
        Some((idx, _)) => &text[..idx],
        None => text,
    }
}
