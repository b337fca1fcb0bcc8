//! Selector-driven extraction of meeting entries from a listing page.
//!
//! Shared by the static and rendered adapters: both end up with an HTML
//! string and differ only in how they obtain it. The same holds for detail
//! pages, which each adapter fetches its own way and hands to
//! [`ListingExtractor::follow_details`].

use std::future::Future;

use regex::Regex;
use scraper::{ElementRef, Html, Selector};
use tracing::{debug, warn};
use url::Url;

use crate::config::{DetailSelectors, ListingSelectors, SourceConfig};
use crate::error::{FetchError, FetchResult, SourceResult};
use crate::types::{AgendaResource, RawRecord};

/// Compiled form of [`ListingSelectors`].
#[derive(Debug)]
pub struct ListingExtractor {
    item: Selector,
    title: Option<Selector>,
    date: Option<Selector>,
    time: Option<Selector>,
    location: Option<Selector>,
    body: Option<Selector>,
    detail_link: Option<Selector>,
    agenda_link: Option<Selector>,
    agenda_content: Option<Selector>,
    date_pattern: Option<Regex>,
    date_attr: Option<String>,
    detail: Option<DetailExtractor>,
}

impl ListingExtractor {
    /// Parse every selector up front so a typo fails at config load, not mid-run.
    pub fn compile(selectors: &ListingSelectors) -> FetchResult<Self> {
        let date_pattern = selectors
            .date_pattern
            .as_deref()
            .map(compile_date_pattern)
            .transpose()?;

        Ok(Self {
            item: parse_selector(&selectors.item)?,
            title: parse_optional(&selectors.title)?,
            date: parse_optional(&selectors.date)?,
            time: parse_optional(&selectors.time)?,
            location: parse_optional(&selectors.location)?,
            body: parse_optional(&selectors.body)?,
            detail_link: parse_optional(&selectors.detail_link)?,
            agenda_link: parse_optional(&selectors.agenda_link)?,
            agenda_content: parse_optional(&selectors.agenda_content)?,
            date_pattern,
            date_attr: selectors.date_attr.clone(),
            detail: selectors.detail.as_ref().map(DetailExtractor::compile).transpose()?,
        })
    }

    pub fn detail(&self) -> Option<&DetailExtractor> {
        self.detail.as_ref()
    }

    /// Fetch each record's detail page with `fetch` and apply the detail
    /// selectors. Without detail selectors the records pass through.
    ///
    /// Records that never left the listing page (no detail link) are kept
    /// as extracted. A record whose detail page fails is dropped; the rest
    /// of the listing is unaffected.
    pub async fn follow_details<F, Fut>(
        &self,
        records: Vec<RawRecord>,
        page_url: &Url,
        source: &SourceConfig,
        fetch: F,
    ) -> Vec<RawRecord>
    where
        F: Fn(String) -> Fut,
        Fut: Future<Output = SourceResult<String>>,
    {
        let Some(detail) = &self.detail else {
            return records;
        };

        let mut kept = Vec::with_capacity(records.len());
        let mut dropped = 0usize;
        for mut record in records {
            if record.source_url == page_url.as_str() {
                kept.push(record);
                continue;
            }
            let Ok(detail_url) = Url::parse(&record.source_url) else {
                dropped += 1;
                continue;
            };

            match fetch(record.source_url.clone()).await {
                Ok(html) => {
                    detail.apply(&html, &detail_url, &mut record);
                    if source.accepts_title(&record.title) {
                        kept.push(record);
                    }
                }
                Err(e) => {
                    warn!(
                        source_id = %source.id,
                        url = %record.source_url,
                        error = %e,
                        "Detail page failed, dropping record"
                    );
                    dropped += 1;
                }
            }
        }

        debug!(source_id = %source.id, records = kept.len(), dropped, "Detail pages followed");
        kept
    }

    /// Extract raw records from a listing page.
    ///
    /// Entries that cannot be read are logged and dropped; entries rejected by
    /// the source's title filters are dropped quietly.
    pub fn extract(&self, html: &str, page_url: &Url, source: &SourceConfig) -> Vec<RawRecord> {
        let document = Html::parse_document(html);
        let mut records = Vec::new();
        let mut filtered = 0usize;

        for item in document.select(&self.item) {
            let Some(record) = self.extract_item(item, page_url, source) else {
                continue;
            };
            if source.accepts_title(&record.title) {
                records.push(record);
            } else {
                filtered += 1;
            }
        }

        debug!(
            source_id = %source.id,
            records = records.len(),
            filtered,
            "Listing extracted"
        );
        records
    }

    fn extract_item(&self, item: ElementRef, page_url: &Url, source: &SourceConfig) -> Option<RawRecord> {
        let item_text = element_text(item);
        let mut date_text = match &self.date_attr {
            Some(attr) => {
                let holder = self
                    .date
                    .as_ref()
                    .and_then(|sel| item.select(sel).next())
                    .unwrap_or(item);
                holder.value().attr(attr)?.trim().to_string()
            }
            None => select_text(item, self.date.as_ref()).unwrap_or_else(|| item_text.clone()),
        };
        let mut time_text = select_text(item, self.time.as_ref());
        let mut title = select_text(item, self.title.as_ref());

        if let Some(pattern) = &self.date_pattern {
            let group = |caps: &regex::Captures, name: &str| {
                caps.name(name).map(|m| m.as_str().trim().to_string())
            };
            let Some((whole, date, time)) = pattern.captures(&date_text).map(|caps| {
                let whole = caps.get(0).map(|m| m.as_str().to_string()).unwrap_or_default();
                let date = group(&caps, "date").or_else(|| ymd_date(&caps));
                (whole, date, group(&caps, "time"))
            }) else {
                warn!(
                    source_id = %source.id,
                    text = %truncate(&date_text, 120),
                    "Listing entry does not match date pattern, dropping"
                );
                return None;
            };

            if title.is_none() && self.date.is_none() && self.date_attr.is_none() {
                title = Some(strip_match(&item_text, &whole));
            }
            if time_text.is_none() {
                time_text = time;
            }
            date_text = date?;
        }

        let title = title.unwrap_or(item_text);
        let source_url = self
            .detail_link
            .as_ref()
            .and_then(|sel| select_href(item, sel, page_url))
            .or_else(|| own_href(item, page_url))
            .unwrap_or_else(|| page_url.to_string());

        let mut record = RawRecord::new(&source.id, title, date_text, source_url);
        record.time_text = time_text;
        record.location = select_text(item, self.location.as_ref());
        record.body = select_text(item, self.body.as_ref());
        record.agenda = agenda_for(
            item,
            self.agenda_link.as_ref(),
            self.agenda_content.as_ref(),
            page_url,
        );
        Some(record)
    }
}

/// Compiled form of [`DetailSelectors`].
#[derive(Debug)]
pub struct DetailExtractor {
    title: Option<Selector>,
    time: Option<Selector>,
    location: Option<Selector>,
    agenda_link: Option<Selector>,
    agenda_content: Option<Selector>,
}

impl DetailExtractor {
    pub fn compile(selectors: &DetailSelectors) -> FetchResult<Self> {
        Ok(Self {
            title: parse_optional(&selectors.title)?,
            time: parse_optional(&selectors.time)?,
            location: parse_optional(&selectors.location)?,
            agenda_link: parse_optional(&selectors.agenda_link)?,
            agenda_content: parse_optional(&selectors.agenda_content)?,
        })
    }

    /// Overwrite the record's fields with whatever the detail page provides.
    pub fn apply(&self, html: &str, page_url: &Url, record: &mut RawRecord) {
        let document = Html::parse_document(html);
        let root = document.root_element();

        if let Some(title) = select_text(root, self.title.as_ref()) {
            record.title = title;
        }
        if let Some(time) = select_text(root, self.time.as_ref()) {
            record.time_text = Some(time);
        }
        if let Some(location) = select_text(root, self.location.as_ref()) {
            record.location = Some(location);
        }
        if let Some(agenda) = agenda_for(
            root,
            self.agenda_link.as_ref(),
            self.agenda_content.as_ref(),
            page_url,
        ) {
            record.agenda = Some(agenda);
        }
    }
}

/// Linked agenda first, else an embedded fragment.
fn agenda_for(
    scope: ElementRef,
    link: Option<&Selector>,
    content: Option<&Selector>,
    page_url: &Url,
) -> Option<AgendaResource> {
    if let Some(href) = link.and_then(|sel| select_href(scope, sel, page_url)) {
        return Some(AgendaResource::url(href));
    }
    content
        .and_then(|sel| scope.select(sel).next())
        .map(|el| AgendaResource::inline_html(el.html()))
}

/// `YYYY-MM-DD` from named `year`, `month` and `day` groups.
fn ymd_date(caps: &regex::Captures) -> Option<String> {
    let number = |name: &str| caps.name(name)?.as_str().trim().parse::<u32>().ok();
    Some(format!(
        "{:04}-{:02}-{:02}",
        number("year")?,
        number("month")?,
        number("day")?
    ))
}

fn parse_selector(selector: &str) -> FetchResult<Selector> {
    Selector::parse(selector).map_err(|e| FetchError::Selector {
        selector: selector.to_string(),
        message: e.to_string(),
    })
}

fn parse_optional(selector: &Option<String>) -> FetchResult<Option<Selector>> {
    selector.as_deref().map(parse_selector).transpose()
}

fn compile_date_pattern(pattern: &str) -> FetchResult<Regex> {
    let invalid = |message: String| FetchError::Selector {
        selector: pattern.to_string(),
        message,
    };
    let re = Regex::new(pattern).map_err(|e| invalid(e.to_string()))?;
    let has = |group: &str| re.capture_names().flatten().any(|name| name == group);
    if !has("date") && !(has("year") && has("month") && has("day")) {
        return Err(invalid(
            "date pattern needs a named group `date`, or `year`, `month` and `day`".into(),
        ));
    }
    Ok(re)
}

/// Collapse runs of whitespace (including newlines and nbsp) to single spaces.
pub(crate) fn collapse_whitespace(text: &str) -> String {
    text.split_whitespace().collect::<Vec<_>>().join(" ")
}

fn element_text(el: ElementRef) -> String {
    collapse_whitespace(&el.text().collect::<Vec<_>>().join(" "))
}

fn select_text(item: ElementRef, selector: Option<&Selector>) -> Option<String> {
    selector
        .and_then(|sel| item.select(sel).next())
        .map(element_text)
        .filter(|t| !t.is_empty())
}

fn select_href(item: ElementRef, selector: &Selector, page_url: &Url) -> Option<String> {
    let href = item.select(selector).next()?.value().attr("href")?;
    resolve(page_url, href)
}

/// Item that is itself an anchor links to its own detail page.
fn own_href(item: ElementRef, page_url: &Url) -> Option<String> {
    if item.value().name() != "a" {
        return None;
    }
    resolve(page_url, item.value().attr("href")?)
}

fn resolve(page_url: &Url, href: &str) -> Option<String> {
    let href = href.trim();
    if href.is_empty() || href.starts_with('#') || href.starts_with("javascript:") {
        return None;
    }
    page_url.join(href).ok().map(String::from)
}

/// Item text with the date match removed, trimmed of leftover separators.
fn strip_match(text: &str, matched: &str) -> String {
    let stripped = if matched.is_empty() {
        text.to_string()
    } else {
        text.replacen(matched, " ", 1)
    };
    collapse_whitespace(&stripped)
        .trim_matches(|c: char| c.is_whitespace() || matches!(c, '-' | '|' | ',' | ':' | '–' | '—'))
        .to_string()
}

fn truncate(text: &str, max: usize) -> &str {
    match text.char_indices().nth(max) {
        Some((idx, _)) => &text[..idx],
        None => text,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::{AdapterKind, DetailSelectors};

    const SALIDA: &str = r#"
        <html><body>
          <div class="event">
            <h3 class="title">City Council Regular Meeting</h3>
            <span class="date">May 20, 2025</span>
            <span class="time">6:00 PM</span>
            <span class="where">448 E 1st St</span>
            <a class="more" href="/event/101">Details</a>
            <a class="agenda" href="files/agenda-0520.pdf">Agenda</a>
          </div>
          <div class="event">
            <h3 class="title">Planning Commission</h3>
            <span class="date">June 1, 2025</span>
            <a class="more" href="https://salida.example/event/102">Details</a>
          </div>
          <div class="event">
            <h3 class="title">Parks Work Session</h3>
            <span class="date">June 3, 2025</span>
          </div>
        </body></html>
    "#;

    fn salida_source() -> SourceConfig {
        SourceConfig::new("salida", "https://salida.example/calendar/", AdapterKind::Static)
            .with_selectors(ListingSelectors {
                item: "div.event".into(),
                title: Some(".title".into()),
                date: Some(".date".into()),
                time: Some(".time".into()),
                location: Some(".where".into()),
                detail_link: Some("a.more".into()),
                agenda_link: Some("a.agenda".into()),
                ..Default::default()
            })
    }

    fn extract(source: &SourceConfig, html: &str) -> Vec<RawRecord> {
        let extractor = ListingExtractor::compile(source.selectors.as_ref().unwrap()).unwrap();
        let page = Url::parse(&source.url).unwrap();
        extractor.extract(html, &page, source)
    }

    #[test]
    fn test_extracts_fields_and_resolves_links() {
        let records = extract(&salida_source(), SALIDA);
        assert_eq!(records.len(), 3);

        let council = &records[0];
        assert_eq!(council.source_id, "salida");
        assert_eq!(council.title, "City Council Regular Meeting");
        assert_eq!(council.date_text, "May 20, 2025");
        assert_eq!(council.time_text.as_deref(), Some("6:00 PM"));
        assert_eq!(council.location.as_deref(), Some("448 E 1st St"));
        assert_eq!(council.source_url, "https://salida.example/event/101");
        assert_eq!(
            council.agenda,
            Some(AgendaResource::url(
                "https://salida.example/calendar/files/agenda-0520.pdf"
            ))
        );

        let planning = &records[1];
        assert_eq!(planning.time_text, None);
        assert_eq!(planning.agenda, None);

        // No detail link falls back to the listing page
        assert_eq!(records[2].source_url, "https://salida.example/calendar/");
    }

    #[test]
    fn test_title_filters_applied() {
        let mut source = salida_source();
        source.exclude = Some("work session".into());
        let records = extract(&source, SALIDA);
        assert_eq!(records.len(), 2);
        assert!(records.iter().all(|r| !r.title.contains("Work Session")));
    }

    #[test]
    fn test_date_pattern_splits_item_text() {
        let html = r#"
            <div class="nextmeetings"><ul>
              <li><a href="/iip/elpaso/meeting/details/4410">Board of County Commissioners - 06/10/2025 at 09:00 AM</a></li>
              <li><a href="/iip/elpaso/meeting/details/4411">BOCC Work Session - 06/12/2025 at 01:30 PM</a></li>
              <li><a href="/iip/elpaso/meeting/details/4412">Meeting cancelled</a></li>
            </ul></div>
        "#;
        let mut source = SourceConfig::new("epc", "https://www.agendasuite.org/iip/elpaso", AdapterKind::Static)
            .with_selectors(ListingSelectors {
                item: "div.nextmeetings li a".into(),
                date_pattern: Some(
                    r"(?P<date>\d{2}/\d{2}/\d{4})\s+at\s+(?P<time>\d{1,2}:\d{2}\s*[AP]M)".into(),
                ),
                ..Default::default()
            });
        source.exclude = Some(r"work\s*session".into());

        let records = extract(&source, html);
        assert_eq!(records.len(), 1);
        assert_eq!(records[0].title, "Board of County Commissioners");
        assert_eq!(records[0].date_text, "06/10/2025");
        assert_eq!(records[0].time_text.as_deref(), Some("09:00 AM"));
        assert_eq!(
            records[0].source_url,
            "https://www.agendasuite.org/iip/elpaso/meeting/details/4410"
        );
    }

    #[test]
    fn test_inline_agenda_content() {
        let html = r#"
            <article class="ev">
              <h2>Trinidad City Council</h2>
              <time>2025-06-17</time>
              <div class="desc"><p>1. Call to order</p><p>2. Approve minutes</p></div>
            </article>
        "#;
        let source = SourceConfig::new("trinidad", "https://trinidad.example/meetings", AdapterKind::Static)
            .with_selectors(ListingSelectors {
                item: "article.ev".into(),
                title: Some("h2".into()),
                date: Some("time".into()),
                agenda_content: Some("div.desc".into()),
                ..Default::default()
            });

        let records = extract(&source, html);
        assert_eq!(records.len(), 1);
        match &records[0].agenda {
            Some(AgendaResource::Inline { bytes, .. }) => {
                assert!(String::from_utf8_lossy(bytes).contains("Approve minutes"));
            }
            other => panic!("expected inline agenda, got {other:?}"),
        }
    }

    const TRINIDAD_LIST: &str = r#"
        <div class="calendar-list">
          <a href="calendar.php?view=day&month=11&day=05&year=2025&calendar=&id=845">City Council Regular Meeting</a>
          <a href="calendar.php?view=day&month=11&day=12&year=2025&calendar=&id=845">City Council Work Session</a>
          <a href="calendar.php?view=day&month=11&day=18&year=2025&calendar=&id=845">City Council Regular Meeting</a>
        </div>
    "#;

    const TRINIDAD_DAY: &str = r#"
        <div class="modal">
          <h2 id="modal-event-title">City Council Regular Meeting</h2>
          <div class="modal-event-header">06:00 PM - 07:00 PM</div>
          <div id="modal-event-description">
            <p>City Council Chambers, 135 N Animas St</p>
            <p>1. Call to order</p>
            <p>2. Second reading of Ordinance 1021</p>
          </div>
        </div>
    "#;

    fn trinidad_source() -> SourceConfig {
        let mut source = SourceConfig::new(
            "trinidad",
            "https://www.trinidad.co.gov/calendar.php?view=list&month=11&day=1&year=2025&calendar=845",
            AdapterKind::Static,
        )
        .with_selectors(ListingSelectors {
            item: "a[href*='view=day'][href*='id=']".into(),
            date_attr: Some("href".into()),
            date_pattern: Some(
                r"month=(?P<month>\d{1,2})&day=(?P<day>\d{1,2})&year=(?P<year>\d{4})".into(),
            ),
            detail: Some(DetailSelectors {
                title: Some("#modal-event-title".into()),
                time: Some(".modal-event-header".into()),
                agenda_content: Some("#modal-event-description".into()),
                ..Default::default()
            }),
            ..Default::default()
        });
        source.include = Some("city council regular meeting".into());
        source
    }

    #[test]
    fn test_date_read_from_link() {
        let records = extract(&trinidad_source(), TRINIDAD_LIST);
        assert_eq!(records.len(), 2);
        assert_eq!(records[0].title, "City Council Regular Meeting");
        assert_eq!(records[0].date_text, "2025-11-05");
        assert_eq!(records[1].date_text, "2025-11-18");
        assert_eq!(
            records[0].source_url,
            "https://www.trinidad.co.gov/calendar.php?view=day&month=11&day=05&year=2025&calendar=&id=845"
        );
    }

    #[test]
    fn test_detail_page_fills_fields() {
        let selectors = trinidad_source().selectors.unwrap();
        let detail = DetailExtractor::compile(selectors.detail.as_ref().unwrap()).unwrap();
        let page = Url::parse("https://www.trinidad.co.gov/calendar.php?view=day&id=845").unwrap();

        let mut record = RawRecord::new("trinidad", "Council", "2025-11-05", page.as_str())
            .with_location("City Hall");
        detail.apply(TRINIDAD_DAY, &page, &mut record);

        assert_eq!(record.title, "City Council Regular Meeting");
        assert_eq!(record.time_text.as_deref(), Some("06:00 PM - 07:00 PM"));
        // No location selector, listing value kept
        assert_eq!(record.location.as_deref(), Some("City Hall"));
        match &record.agenda {
            Some(AgendaResource::Inline { bytes, .. }) => {
                assert!(String::from_utf8_lossy(bytes).contains("Ordinance 1021"));
            }
            other => panic!("expected inline agenda, got {other:?}"),
        }
    }

    #[tokio::test]
    async fn test_follow_details_drops_only_failed_pages() {
        let source = trinidad_source();
        let extractor = ListingExtractor::compile(source.selectors.as_ref().unwrap()).unwrap();
        let page = Url::parse(&source.url).unwrap();
        let mut records = extractor.extract(TRINIDAD_LIST, &page, &source);
        records.push(RawRecord::new("trinidad", "City Council Regular Meeting", "2025-11-25", page.as_str()));

        let requested = std::sync::Mutex::new(Vec::new());
        let followed = extractor
            .follow_details(records, &page, &source, |url: String| {
                requested.lock().unwrap().push(url.clone());
                async move {
                    let result: SourceResult<String> = if url.contains("day=18") {
                        Err(FetchError::Status { url, status: 503 }.into())
                    } else {
                        Ok(TRINIDAD_DAY.to_string())
                    };
                    result
                }
            })
            .await;

        // Listing-only record is not fetched
        assert_eq!(requested.lock().unwrap().len(), 2);
        assert_eq!(followed.len(), 2);
        assert_eq!(followed[0].date_text, "2025-11-05");
        assert_eq!(followed[0].time_text.as_deref(), Some("06:00 PM - 07:00 PM"));
        assert!(matches!(followed[0].agenda, Some(AgendaResource::Inline { .. })));
        assert_eq!(followed[1].date_text, "2025-11-25");
        assert_eq!(followed[1].agenda, None);
    }

    #[tokio::test]
    async fn test_follow_details_without_selectors_is_passthrough() {
        let source = salida_source();
        let extractor = ListingExtractor::compile(source.selectors.as_ref().unwrap()).unwrap();
        let page = Url::parse(&source.url).unwrap();
        let records = extractor.extract(SALIDA, &page, &source);

        let followed = extractor
            .follow_details(records.clone(), &page, &source, |url: String| async move {
                Err::<String, _>(crate::error::SourceError::from(FetchError::InvalidUrl { url }))
            })
            .await;
        assert_eq!(followed, records);
    }

    #[test]
    fn test_compile_accepts_split_date_groups() {
        let ok = ListingSelectors {
            item: "a".into(),
            date_pattern: Some(r"(?P<year>\d{4})/(?P<month>\d{2})/(?P<day>\d{2})".into()),
            ..Default::default()
        };
        assert!(ListingExtractor::compile(&ok).is_ok());

        let missing_day = ListingSelectors {
            item: "a".into(),
            date_pattern: Some(r"(?P<year>\d{4})/(?P<month>\d{2})".into()),
            ..Default::default()
        };
        assert!(ListingExtractor::compile(&missing_day).is_err());
    }

    #[test]
    fn test_compile_rejects_bad_selector() {
        let bad = ListingSelectors {
            item: "div[".into(),
            ..Default::default()
        };
        assert!(matches!(
            ListingExtractor::compile(&bad),
            Err(FetchError::Selector { .. })
        ));
    }

    #[test]
    fn test_compile_requires_date_group() {
        let bad = ListingSelectors {
            item: "li".into(),
            date_pattern: Some(r"\d{2}/\d{2}/\d{4}".into()),
            ..Default::default()
        };
        assert!(ListingExtractor::compile(&bad).is_err());
    }

    #[test]
    fn test_whitespace_collapsed() {
        assert_eq!(collapse_whitespace("  City\n\t Council \u{a0} Meeting "), "City Council Meeting");
    }
}
