//! Language-model boundary and its OpenAI-compatible implementation.

use std::time::Duration;

use async_trait::async_trait;
use openai_client::{ChatRequest, Message, OpenAIClient, OPENAI_BASE_URL, OPENROUTER_BASE_URL};
use tracing::debug;

use super::extractive::clean_line;
use crate::config::{LlmProvider, Settings};
use crate::error::SummaryError;

/// System instruction sent with every agenda.
pub const SYSTEM_PROMPT: &str = "You create concise bullet points summarizing municipal meeting agendas.";

const TEMPERATURE: f32 = 0.2;

/// Anything that can answer a system + user prompt with text.
#[async_trait]
pub trait LanguageModel: Send + Sync {
    async fn complete(&self, system: &str, prompt: &str) -> Result<String, SummaryError>;
}

/// User prompt asking for at most `max_items` bullets about `agenda`.
pub fn build_prompt(agenda: &str, max_items: usize) -> String {
    format!(
        "You are a city agenda summarizer. Read the following agenda text and extract the most notable items.\n\
         Return up to {max_items} concise bullet points, each a single sentence.\n\n\
         Agenda:\n---\n{agenda}\n---"
    )
}

/// One highlight per non-empty reply line, glyphs and numbering stripped.
/// Preamble lines such as "Here are the highlights:" are skipped.
pub fn parse_bullets(reply: &str, max_items: usize) -> Vec<String> {
    reply
        .lines()
        .map(|line| clean_line(&line.replace('\u{a0}', " ")))
        .filter(|line| !line.is_empty() && !line.ends_with(':'))
        .take(max_items)
        .collect()
}

/// Chat-completions model via `openai-client` (OpenAI or OpenRouter).
pub struct OpenAiModel {
    client: OpenAIClient,
    model: String,
}

impl OpenAiModel {
    pub fn new(client: OpenAIClient, model: impl Into<String>) -> Self {
        Self {
            client,
            model: model.into(),
        }
    }

    /// Build from settings; `None` when no provider or no key is configured.
    pub fn from_settings(settings: &Settings) -> Result<Option<Self>, SummaryError> {
        let Some(key) = settings.llm_api_key.as_ref() else {
            return Ok(None);
        };
        let base_url = match settings.llm_provider {
            LlmProvider::None => return Ok(None),
            LlmProvider::Openai => OPENAI_BASE_URL,
            LlmProvider::Openrouter => OPENROUTER_BASE_URL,
        };

        let client = OpenAIClient::new(key.expose())
            .with_base_url(base_url)
            .with_timeout(Duration::from_millis(settings.model_timeout_ms))
            .map_err(|e| SummaryError::Model(e.to_string()))?;
        Ok(Some(Self::new(client, settings.llm_model.clone())))
    }
}

#[async_trait]
impl LanguageModel for OpenAiModel {
    async fn complete(&self, system: &str, prompt: &str) -> Result<String, SummaryError> {
        let request = ChatRequest::new(&self.model)
            .message(Message::system(system))
            .message(Message::user(prompt))
            .temperature(TEMPERATURE);

        let response = self
            .client
            .chat_completion(request)
            .await
            .map_err(|e| SummaryError::Model(e.to_string()))?;

        debug!(
            model = %self.model,
            completion_tokens = response.usage.as_ref().map(|u| u.completion_tokens),
            "Model reply received"
        );
        Ok(response.content)
    }
}
