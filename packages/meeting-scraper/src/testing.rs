//! Testing utilities including mock implementations.
//!
//! These let pipeline tests run without network access, browsers or model
//! credentials. Both mocks record their calls for assertions.

use std::collections::HashMap;
use std::sync::{Arc, RwLock};
use std::time::Duration;

use async_trait::async_trait;

use crate::adapters::SiteAdapter;
use crate::config::SourceConfig;
use crate::error::{FetchError, PolicyError, SourceResult, SummaryError};
use crate::summarize::LanguageModel;
use crate::types::RawRecord;

/// How a [`MockAdapter`] fails for a given source.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MockFailure {
    /// Server answered with this status
    Status(u16),
    /// robots.txt disallows the listing
    Policy,
    /// Never returns; exercises the source timeout
    Hang,
}

/// A mock adapter returning predefined records per source id.
#[derive(Default, Clone)]
pub struct MockAdapter {
    records: Arc<RwLock<HashMap<String, Vec<RawRecord>>>>,
    failures: Arc<RwLock<HashMap<String, MockFailure>>>,

    /// Call tracking for assertions (source ids, in call order)
    calls: Arc<RwLock<Vec<String>>>,
}

impl MockAdapter {
    pub fn new() -> Self {
        Self::default()
    }

    /// Records returned for `source_id`. Sources without records return none.
    pub fn with_records(self, source_id: impl Into<String>, records: Vec<RawRecord>) -> Self {
        self.records.write().unwrap().insert(source_id.into(), records);
        self
    }

    pub fn with_failure(self, source_id: impl Into<String>, failure: MockFailure) -> Self {
        self.failures.write().unwrap().insert(source_id.into(), failure);
        self
    }

    /// Replace the records for a source between runs.
    pub fn set_records(&self, source_id: impl Into<String>, records: Vec<RawRecord>) {
        self.records.write().unwrap().insert(source_id.into(), records);
    }

    /// Source ids fetched so far.
    pub fn calls(&self) -> Vec<String> {
        self.calls.read().unwrap().clone()
    }
}

#[async_trait]
impl SiteAdapter for MockAdapter {
    async fn fetch(&self, source: &SourceConfig) -> SourceResult<Vec<RawRecord>> {
        self.calls.write().unwrap().push(source.id.clone());

        let failure = self.failures.read().unwrap().get(&source.id).copied();
        match failure {
            Some(MockFailure::Status(status)) => {
                return Err(FetchError::Status {
                    url: source.url.clone(),
                    status,
                }
                .into());
            }
            Some(MockFailure::Policy) => {
                return Err(PolicyError {
                    url: source.url.clone(),
                }
                .into());
            }
            Some(MockFailure::Hang) => {
                tokio::time::sleep(Duration::from_secs(3600)).await;
            }
            None => {}
        }

        Ok(self
            .records
            .read()
            .unwrap()
            .get(&source.id)
            .cloned()
            .unwrap_or_default())
    }

    fn name(&self) -> &str {
        "mock"
    }
}

/// Record of a call made to the mock model.
#[derive(Debug, Clone)]
pub struct ModelCall {
    pub system: String,
    pub prompt: String,
}

/// A mock language model with a fixed reply (or a fixed failure).
#[derive(Clone)]
pub struct MockModel {
    reply: Option<String>,
    delay: Option<Duration>,
    calls: Arc<RwLock<Vec<ModelCall>>>,
}

impl MockModel {
    pub fn replying(reply: &str) -> Self {
        Self {
            reply: Some(reply.to_string()),
            delay: None,
            calls: Arc::default(),
        }
    }

    /// Every call fails as if the provider rejected the key.
    pub fn failing() -> Self {
        Self {
            reply: None,
            delay: None,
            calls: Arc::default(),
        }
    }

    pub fn with_delay(mut self, delay: Duration) -> Self {
        self.delay = Some(delay);
        self
    }

    pub fn calls(&self) -> Vec<ModelCall> {
        self.calls.read().unwrap().clone()
    }
}

#[async_trait]
impl LanguageModel for MockModel {
    async fn complete(&self, system: &str, prompt: &str) -> Result<String, SummaryError> {
        self.calls.write().unwrap().push(ModelCall {
            system: system.to_string(),
            prompt: prompt.to_string(),
        });

        if let Some(delay) = self.delay {
            tokio::time::sleep(delay).await;
        }

        self.reply
            .clone()
            .ok_or_else(|| SummaryError::Model("401 invalid api key".into()))
    }
}
