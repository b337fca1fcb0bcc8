//! Adapter for server-rendered calendar pages.

use std::sync::Arc;

use async_trait::async_trait;
use chrono::Utc;
use chrono_tz::Tz;
use tracing::{info, warn};
use url::Url;

use super::civicclerk::attach_text_endpoints;
use super::{HttpFetcher, ListingExtractor, SiteAdapter};
use crate::config::SourceConfig;
use crate::error::{FetchError, SourceError, SourceResult};
use crate::types::RawRecord;

/// Plain GET of each listing page, selector extraction, then one GET per
/// record detail page when the source asks for it.
pub struct StaticHtmlAdapter {
    fetcher: Arc<HttpFetcher>,
    timezone: Tz,
}

impl StaticHtmlAdapter {
    pub fn new(fetcher: Arc<HttpFetcher>, timezone: Tz) -> Self {
        Self { fetcher, timezone }
    }
}

#[async_trait]
impl SiteAdapter for StaticHtmlAdapter {
    async fn fetch(&self, source: &SourceConfig) -> SourceResult<Vec<RawRecord>> {
        let extractor = compile_for(source)?;
        let today = Utc::now().with_timezone(&self.timezone).date_naive();
        let fetcher = &self.fetcher;

        let mut pages = ListingPages::default();
        for url in source.listing_urls(today) {
            let page_url = Url::parse(&url).map_err(|_| FetchError::InvalidUrl { url: url.clone() })?;
            let html = match fetcher.get_text(&url).await {
                Ok(html) => html,
                Err(e) => {
                    pages.failed(source, &url, e);
                    continue;
                }
            };

            let listed = extractor.extract(&html, &page_url, source);
            let records = extractor
                .follow_details(listed, &page_url, source, move |detail_url: String| async move {
                    fetcher.get_text(&detail_url).await
                })
                .await;
            pages.scraped(records);
        }

        let mut records = pages.finish()?;
        attach_text_endpoints(source, &mut records);

        info!(
            source_id = %source.id,
            records = records.len(),
            "Static listing scraped"
        );
        Ok(records)
    }

    fn name(&self) -> &str {
        "static"
    }
}

/// Records gathered across a source's listing pages.
///
/// A failed page is tolerated as long as another page succeeded; when every
/// page fails the first error fails the source.
#[derive(Default)]
pub(crate) struct ListingPages {
    records: Vec<RawRecord>,
    succeeded: usize,
    first_error: Option<SourceError>,
}

impl ListingPages {
    pub(crate) fn scraped(&mut self, records: Vec<RawRecord>) {
        self.succeeded += 1;
        self.records.extend(records);
    }

    pub(crate) fn failed(&mut self, source: &SourceConfig, url: &str, error: SourceError) {
        warn!(source_id = %source.id, url = %url, error = %error, "Listing page failed");
        self.first_error.get_or_insert(error);
    }

    pub(crate) fn finish(self) -> SourceResult<Vec<RawRecord>> {
        match self.first_error {
            Some(error) if self.succeeded == 0 => Err(error),
            _ => Ok(self.records),
        }
    }
}

/// Selectors are validated at config load; this only fails for hand-built configs.
pub(crate) fn compile_for(source: &SourceConfig) -> Result<ListingExtractor, FetchError> {
    let selectors = source.selectors.as_ref().ok_or_else(|| FetchError::Selector {
        selector: String::new(),
        message: format!("source {} has no selectors", source.id),
    })?;
    ListingExtractor::compile(selectors)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::{AdapterKind, DetailSelectors, ListingSelectors, Pagination, TextEndpoint};
    use crate::politeness::{HostThrottle, Politeness, RobotsTxt};
    use crate::types::AgendaResource;
    use wiremock::matchers::{method, path, query_param};
    use wiremock::{Mock, MockServer, ResponseTemplate};

    fn adapter() -> StaticHtmlAdapter {
        let client = reqwest::Client::new();
        let politeness = Arc::new(Politeness::new(
            client.clone(),
            "MeetingWatch/1.0",
            HostThrottle::unthrottled(),
        ));
        politeness
            .robots()
            .insert("https://closed.example", RobotsTxt::parse("User-agent: *\nDisallow: /"));
        StaticHtmlAdapter::new(
            Arc::new(HttpFetcher::new(client, politeness)),
            chrono_tz::America::Denver,
        )
    }

    fn html(body: &str) -> ResponseTemplate {
        ResponseTemplate::new(200).set_body_raw(body.to_string(), "text/html")
    }

    const LISTING: &str = r#"
        <ul class="meetings">
          <li><a class="ev" href="/meeting/41">Board of Trustees - 06/10/2025</a></li>
          <li><a class="ev" href="/meeting/42">Board of Trustees - 06/24/2025</a></li>
        </ul>
    "#;

    const DETAIL_41: &str = r#"
        <h1>Board of Trustees Regular Meeting</h1>
        <p class="loc">Town Hall, 100 Main St</p>
        <a class="agenda" href="/files/agenda/901">Agenda</a>
    "#;

    fn detail_source(server: &MockServer) -> SourceConfig {
        SourceConfig::new("town", format!("{}/meetings", server.uri()), AdapterKind::Static).with_selectors(
            ListingSelectors {
                item: "a.ev".into(),
                date_pattern: Some(r"(?P<date>\d{2}/\d{2}/\d{4})".into()),
                detail: Some(DetailSelectors {
                    title: Some("h1".into()),
                    location: Some("p.loc".into()),
                    agenda_link: Some("a.agenda".into()),
                    ..Default::default()
                }),
                ..Default::default()
            },
        )
    }

    #[tokio::test]
    async fn test_detail_pages_fetched_per_record() {
        let server = MockServer::start().await;
        Mock::given(method("GET")).and(path("/meetings")).respond_with(html(LISTING)).mount(&server).await;
        Mock::given(method("GET"))
            .and(path("/meeting/41"))
            .respond_with(html(DETAIL_41))
            .expect(1)
            .mount(&server)
            .await;
        Mock::given(method("GET"))
            .and(path("/meeting/42"))
            .respond_with(ResponseTemplate::new(404))
            .expect(1)
            .mount(&server)
            .await;

        let mut source = detail_source(&server);
        source.agenda_text_endpoint = Some(TextEndpoint::Civicclerk);
        let records = adapter().fetch(&source).await.unwrap();

        // The record whose detail page 404s is dropped, not the source
        assert_eq!(records.len(), 1);
        let record = &records[0];
        assert_eq!(record.title, "Board of Trustees Regular Meeting");
        assert_eq!(record.date_text, "06/10/2025");
        assert_eq!(record.location.as_deref(), Some("Town Hall, 100 Main St"));
        assert_eq!(record.source_url, format!("{}/meeting/41", server.uri()));
        match &record.agenda {
            Some(AgendaResource::Url { url, text_url, .. }) => {
                assert_eq!(url, &format!("{}/files/agenda/901", server.uri()));
                assert_eq!(
                    text_url.as_deref(),
                    Some(
                        format!(
                            "{}/WebAPI/MeetingFile/GetMeetingFileStream?fileId=901&plainText=true",
                            server.uri()
                        )
                        .as_str()
                    )
                );
            }
            other => panic!("expected linked agenda, got {other:?}"),
        }
    }

    #[tokio::test]
    async fn test_every_listing_page_scraped() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(path("/calendar"))
            .and(query_param("page", "1"))
            .respond_with(html(r#"<a class="ev" href="/m/1">Council - 06/10/2025</a>"#))
            .mount(&server)
            .await;
        Mock::given(method("GET"))
            .and(path("/calendar"))
            .and(query_param("page", "2"))
            .respond_with(html(r#"<a class="ev" href="/m/2">Council - 07/08/2025</a>"#))
            .mount(&server)
            .await;
        Mock::given(method("GET"))
            .and(path("/calendar"))
            .and(query_param("page", "3"))
            .respond_with(ResponseTemplate::new(500))
            .mount(&server)
            .await;

        let source = SourceConfig::new("council", format!("{}/calendar?page=1", server.uri()), AdapterKind::Static)
            .with_selectors(ListingSelectors {
                item: "a.ev".into(),
                date_pattern: Some(r"(?P<date>\d{2}/\d{2}/\d{4})".into()),
                ..Default::default()
            })
            .with_pagination(Pagination::Urls {
                urls: vec![
                    format!("{}/calendar?page=2", server.uri()),
                    format!("{}/calendar?page=3", server.uri()),
                ],
            });

        let records = adapter().fetch(&source).await.unwrap();
        let dates: Vec<_> = records.iter().map(|r| r.date_text.as_str()).collect();
        assert_eq!(dates, vec!["06/10/2025", "07/08/2025"]);
        assert_eq!(records[0].title, "Council");
    }

    #[tokio::test]
    async fn test_all_pages_failing_fails_source() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(path("/calendar"))
            .respond_with(ResponseTemplate::new(503))
            .mount(&server)
            .await;

        let source = SourceConfig::new("council", format!("{}/calendar", server.uri()), AdapterKind::Static)
            .with_selectors(ListingSelectors {
                item: "a.ev".into(),
                ..Default::default()
            });

        let result = adapter().fetch(&source).await;
        assert!(matches!(
            result,
            Err(SourceError::Fetch(FetchError::Status { status: 503, .. }))
        ));
    }

    #[tokio::test]
    async fn test_missing_selectors_fails_source() {
        let source = SourceConfig::new("x", "https://closed.example/cal", AdapterKind::Static);
        let result = adapter().fetch(&source).await;
        assert!(matches!(result, Err(SourceError::Fetch(FetchError::Selector { .. }))));
    }

    #[tokio::test]
    async fn test_disallowed_listing_is_policy_skip() {
        let source = SourceConfig::new("x", "https://closed.example/cal", AdapterKind::Static)
            .with_selectors(ListingSelectors {
                item: "li".into(),
                ..Default::default()
            });
        let result = adapter().fetch(&source).await;
        assert!(result.unwrap_err().is_policy());
    }
}
