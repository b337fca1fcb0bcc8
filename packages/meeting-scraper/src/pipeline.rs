//! Run driver: sources in, one published document out.
//!
//! The driver:
//! - fetches every source through its adapter (bounded concurrency, each
//!   source under its own timeout)
//! - normalizes records and drops meetings that already started
//! - extracts and summarizes agendas, reusing unchanged previous summaries
//! - merges with the previous document and writes the result atomically
//!
//! Failures of one record, agenda or source never abort the run.

use std::path::Path;
use std::sync::Arc;
use std::time::Duration;

use chrono::{DateTime, FixedOffset, Timelike, Utc};
use futures::stream::{self, StreamExt};
use serde::Serialize;
use tracing::{debug, info, warn};

use crate::adapters::{build_client, AdapterRegistry, HttpFetcher};
use crate::agenda::AgendaLoader;
use crate::config::{Config, SourceConfig};
use crate::error::{OutputError, SourceError};
use crate::merge::merge;
use crate::normalize::Normalizer;
use crate::notify::notify_webhook;
use crate::politeness::{HostThrottle, Politeness};
use crate::summarize::{Summarizer, Summary};
use crate::types::{AgendaResource, Meeting, OutputDocument, RawRecord};

/// One source that produced nothing this run.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct SourceFailure {
    pub source_id: String,
    pub error: String,
}

/// Result of a run.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct RunReport {
    /// Sources whose adapter returned records (possibly none)
    pub sources_ok: usize,

    /// Sources that failed (network, parse, timeout)
    pub failed: Vec<SourceFailure>,

    /// Sources robots.txt kept us out of
    pub skipped_by_policy: Vec<SourceFailure>,

    pub records_fetched: usize,

    /// Records rejected by validation
    pub records_rejected: usize,

    /// Meetings that already started, dropped before summarizing
    pub meetings_past: usize,

    pub agendas_summarized: usize,

    /// Agendas that could not be downloaded or read
    pub agenda_failures: usize,

    /// Highlights copied from the previous document without re-downloading
    pub summaries_reused: usize,

    pub meetings_written: usize,
}

impl RunReport {
    pub fn new() -> Self {
        Self::default()
    }

    /// No source failed (policy skips are not failures).
    pub fn is_success(&self) -> bool {
        self.failed.is_empty()
    }
}

/// A meeting waiting for its highlights.
struct Pending {
    meeting: Meeting,
    agenda: Option<AgendaResource>,
}

/// What happened to one meeting's agenda.
enum Enrichment {
    Reused,
    Summarized,
    Failed,
    NoAgenda,
}

/// The meeting pipeline.
pub struct Pipeline {
    config: Config,
    registry: AdapterRegistry,
    normalizer: Normalizer,
    agendas: AgendaLoader,
    summarizer: Summarizer,
    politeness: Arc<Politeness>,
    client: reqwest::Client,
    source_timeout: Duration,
}

impl Pipeline {
    /// Wire the standard adapters, politeness layer and summarizer from config.
    pub fn from_config(config: Config) -> Result<Self, reqwest::Error> {
        let settings = &config.settings;
        let client = build_client(settings)?;
        let politeness = Arc::new(Politeness::new(
            client.clone(),
            settings.user_agent.clone(),
            HostThrottle::from_sources(&config.sources),
        ));
        let fetcher = Arc::new(HttpFetcher::new(client.clone(), politeness.clone()));
        let fetch_timeout = Duration::from_millis(settings.fetch_timeout_ms);

        Ok(Self {
            registry: AdapterRegistry::standard(fetcher.clone(), settings.timezone),
            normalizer: Normalizer::new(settings.timezone),
            agendas: AgendaLoader::new(fetcher, fetch_timeout),
            summarizer: Summarizer::from_settings(settings),
            politeness,
            client,
            source_timeout: fetch_timeout,
            config,
        })
    }

    /// Replace the adapter registry (tests, custom source kinds).
    pub fn with_registry(mut self, registry: AdapterRegistry) -> Self {
        self.registry = registry;
        self
    }

    pub fn with_summarizer(mut self, summarizer: Summarizer) -> Self {
        self.summarizer = summarizer;
        self
    }

    pub fn with_source_timeout(mut self, timeout: Duration) -> Self {
        self.source_timeout = timeout;
        self
    }

    pub fn politeness(&self) -> &Arc<Politeness> {
        &self.politeness
    }

    pub fn config(&self) -> &Config {
        &self.config
    }

    /// Current time in the configured zone, to second precision.
    pub fn now(&self) -> DateTime<FixedOffset> {
        let now = Utc::now().with_timezone(&self.config.settings.timezone);
        now.with_nanosecond(0).unwrap_or(now).fixed_offset()
    }

    /// Produce the next document from the sources and the previous document.
    pub async fn run(
        &self,
        previous: Option<&OutputDocument>,
        generated_at: DateTime<FixedOffset>,
    ) -> (OutputDocument, RunReport) {
        let mut report = RunReport::new();
        info!(
            sources = self.config.sources.len(),
            model = self.summarizer.has_model(),
            "Run starting"
        );

        let pending = self.collect(generated_at, &mut report).await;
        let meetings = self.enrich(pending, previous, &mut report).await;

        let document = merge(meetings, previous, generated_at);
        report.meetings_written = document.len();

        info!(
            sources_ok = report.sources_ok,
            sources_failed = report.failed.len(),
            sources_skipped = report.skipped_by_policy.len(),
            records_fetched = report.records_fetched,
            records_rejected = report.records_rejected,
            agendas_summarized = report.agendas_summarized,
            summaries_reused = report.summaries_reused,
            meetings = report.meetings_written,
            "Run finished"
        );
        (document, report)
    }

    /// Load the previous document from `output`, run, write, notify.
    ///
    /// Only a failed write is an error.
    pub async fn run_to_file(&self, output: &Path) -> Result<RunReport, OutputError> {
        let previous = OutputDocument::load_previous(output);
        let (document, report) = self.run(previous.as_ref(), self.now()).await;

        document.write_atomic(output)?;
        info!(path = %output.display(), meetings = document.len(), "Document published");

        if let Some(hook) = &self.config.settings.webhook_url {
            if let Err(e) = notify_webhook(&self.client, hook, &document).await {
                warn!(url = %hook, error = %e, "Webhook notification failed");
            }
        }
        Ok(report)
    }

    /// Fetch and normalize every source; keep only future meetings.
    async fn collect(&self, generated_at: DateTime<FixedOffset>, report: &mut RunReport) -> Vec<Pending> {
        let concurrency = self.config.settings.concurrency.max(1);
        let results: Vec<(&SourceConfig, Result<Vec<RawRecord>, SourceError>)> =
            stream::iter(&self.config.sources)
                .map(|source| async move { (source, self.fetch_source(source).await) })
                .buffer_unordered(concurrency)
                .collect()
                .await;

        let mut pending = Vec::new();
        for (source, result) in results {
            let records = match result {
                Ok(records) => records,
                Err(e) => {
                    let failure = SourceFailure {
                        source_id: source.id.clone(),
                        error: e.to_string(),
                    };
                    if e.is_policy() {
                        info!(source_id = %source.id, error = %e, "Source skipped by policy");
                        report.skipped_by_policy.push(failure);
                    } else {
                        warn!(source_id = %source.id, error = %e, "Source failed");
                        report.failed.push(failure);
                    }
                    continue;
                }
            };

            report.sources_ok += 1;
            report.records_fetched += records.len();

            for raw in records {
                match self.normalizer.normalize(&raw, source) {
                    Ok(meeting) if meeting.start_time > generated_at => pending.push(Pending {
                        meeting,
                        agenda: raw.agenda,
                    }),
                    Ok(meeting) => {
                        report.meetings_past += 1;
                        debug!(source_id = %source.id, id = %meeting.id, "Meeting already started");
                    }
                    Err(e) => {
                        report.records_rejected += 1;
                        warn!(
                            source_id = %source.id,
                            record = %raw.snippet(),
                            error = %e,
                            "Record rejected"
                        );
                    }
                }
            }
        }
        pending
    }

    async fn fetch_source(&self, source: &SourceConfig) -> Result<Vec<RawRecord>, SourceError> {
        let adapter = self.registry.get(source.adapter_type)?;
        debug!(source_id = %source.id, adapter = adapter.name(), "Fetching source");

        let records = tokio::time::timeout(self.source_timeout, adapter.fetch(source))
            .await
            .map_err(|_| SourceError::Timeout {
                after: self.source_timeout,
            })??;

        info!(source_id = %source.id, records = records.len(), "Source fetched");
        Ok(records)
    }

    /// Attach highlights to every pending meeting.
    async fn enrich(
        &self,
        pending: Vec<Pending>,
        previous: Option<&OutputDocument>,
        report: &mut RunReport,
    ) -> Vec<Meeting> {
        let concurrency = self.config.settings.concurrency.max(1);
        let outcomes: Vec<(Meeting, Enrichment)> = stream::iter(pending)
            .map(|item| self.enrich_one(item, previous))
            .buffer_unordered(concurrency)
            .collect()
            .await;

        let mut meetings = Vec::with_capacity(outcomes.len());
        for (meeting, outcome) in outcomes {
            match outcome {
                Enrichment::Reused => report.summaries_reused += 1,
                Enrichment::Summarized => report.agendas_summarized += 1,
                Enrichment::Failed => report.agenda_failures += 1,
                Enrichment::NoAgenda => {}
            }
            meetings.push(meeting);
        }
        meetings
    }

    async fn enrich_one(&self, item: Pending, previous: Option<&OutputDocument>) -> (Meeting, Enrichment) {
        let Pending { mut meeting, agenda } = item;
        let Some(agenda) = agenda else {
            return (meeting, Enrichment::NoAgenda);
        };

        if self.config.settings.reuse_previous_summaries {
            let reusable = previous
                .and_then(|doc| doc.find(&meeting.id))
                .filter(|prev| prev.has_highlights())
                .filter(|prev| prev.agenda_url.is_some() && prev.agenda_url == meeting.agenda_url);
            if let Some(prev) = reusable {
                debug!(id = %meeting.id, "Reusing previous highlights");
                meeting.highlights = prev.highlights.clone();
                meeting.summary_kind = prev.summary_kind;
                return (meeting, Enrichment::Reused);
            }
        }

        match self.agendas.load_text(&agenda).await {
            Ok(text) => {
                let summary = self.summarizer.summarize(&text).await;
                let outcome = if summary == Summary::None {
                    Enrichment::NoAgenda
                } else {
                    Enrichment::Summarized
                };
                meeting.apply_summary(summary);
                (meeting, outcome)
            }
            Err(e) => {
                warn!(id = %meeting.id, title = %meeting.title, error = %e, "Agenda unavailable");
                (meeting, Enrichment::Failed)
            }
        }
    }
}
