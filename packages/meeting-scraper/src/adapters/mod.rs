//! Site adapters: one per kind of municipal calendar.
//!
//! An adapter turns one configured source into raw records. It never
//! normalizes dates or summarizes agendas; the pipeline does that.

pub mod civicclerk;
pub mod http;
pub mod legistar;
pub mod listing;
pub mod rendered;
pub mod static_html;

pub use http::{build_client, Downloaded, HttpFetcher};
pub use legistar::LegistarAdapter;
pub use listing::{DetailExtractor, ListingExtractor};
pub use rendered::RenderedPortalAdapter;
pub use static_html::StaticHtmlAdapter;

use std::collections::HashMap;
use std::sync::Arc;

use async_trait::async_trait;

use crate::config::{AdapterKind, SourceConfig};
use crate::error::{SourceError, SourceResult};
use crate::types::RawRecord;

/// Fetches raw meeting records for one source.
///
/// Implementations must not panic on malformed pages: unreadable entries are
/// dropped, whole-page failures come back as [`SourceError`].
#[async_trait]
pub trait SiteAdapter: Send + Sync {
    async fn fetch(&self, source: &SourceConfig) -> SourceResult<Vec<RawRecord>>;

    /// Name used in logs.
    fn name(&self) -> &str;
}

/// Adapter implementations keyed by the config's `adapterType`.
#[derive(Default, Clone)]
pub struct AdapterRegistry {
    adapters: HashMap<AdapterKind, Arc<dyn SiteAdapter>>,
}

impl AdapterRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Static, rendered and Legistar adapters sharing one fetcher.
    pub fn standard(fetcher: Arc<HttpFetcher>, timezone: chrono_tz::Tz) -> Self {
        let rendered = RenderedPortalAdapter::new(fetcher.politeness().clone(), timezone)
            .with_chrome_executable(std::env::var("CHROME_EXECUTABLE").ok());

        Self::new()
            .with(AdapterKind::Static, StaticHtmlAdapter::new(fetcher.clone(), timezone))
            .with(AdapterKind::Rendered, rendered)
            .with(AdapterKind::Legistar, LegistarAdapter::new(fetcher, timezone))
    }

    /// Register (or replace) the adapter for a kind.
    pub fn with(mut self, kind: AdapterKind, adapter: impl SiteAdapter + 'static) -> Self {
        self.adapters.insert(kind, Arc::new(adapter));
        self
    }

    pub fn with_arc(mut self, kind: AdapterKind, adapter: Arc<dyn SiteAdapter>) -> Self {
        self.adapters.insert(kind, adapter);
        self
    }

    pub fn get(&self, kind: AdapterKind) -> SourceResult<Arc<dyn SiteAdapter>> {
        self.adapters
            .get(&kind)
            .cloned()
            .ok_or_else(|| SourceError::NoAdapter {
                kind: kind.to_string(),
            })
    }
}
