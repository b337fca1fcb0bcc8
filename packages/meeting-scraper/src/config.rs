//! Run configuration: global settings plus one entry per scraped source.
//!
//! Loaded from a JSON file. Secrets never live in the file; the model API key
//! comes from the environment (a `.env` file is honoured via dotenvy).

use std::collections::HashSet;
use std::fmt;
use std::path::Path;

use chrono::{Datelike, Months, NaiveDate, NaiveTime};
use chrono_tz::Tz;
use regex::Regex;
use serde::{Deserialize, Serialize};
use url::Url;

use crate::error::ConfigError;

/// Which adapter implementation handles a source.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum AdapterKind {
    /// Server-rendered HTML fetched with a plain GET
    Static,
    /// JavaScript portal rendered in a headless browser
    Rendered,
    /// Legistar OData events API
    Legistar,
}

impl fmt::Display for AdapterKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            AdapterKind::Static => "static",
            AdapterKind::Rendered => "rendered",
            AdapterKind::Legistar => "legistar",
        };
        f.write_str(name)
    }
}

/// Language-model provider used for agenda highlights.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum LlmProvider {
    #[default]
    None,
    Openai,
    Openrouter,
}

impl LlmProvider {
    /// Environment variable holding the provider's API key.
    pub fn api_key_var(&self) -> Option<&'static str> {
        match self {
            LlmProvider::None => None,
            LlmProvider::Openai => Some("OPENAI_API_KEY"),
            LlmProvider::Openrouter => Some("OPENROUTER_API_KEY"),
        }
    }

    fn parse(value: &str) -> Option<Self> {
        match value.trim().to_ascii_lowercase().as_str() {
            "none" | "" => Some(LlmProvider::None),
            "openai" => Some(LlmProvider::Openai),
            "openrouter" => Some(LlmProvider::Openrouter),
            _ => None,
        }
    }
}

/// API key that never shows up in logs.
#[derive(Clone, Default, PartialEq, Eq)]
pub struct ApiKey(String);

impl ApiKey {
    pub fn new(key: impl Into<String>) -> Self {
        Self(key.into())
    }

    pub fn expose(&self) -> &str {
        &self.0
    }
}

impl fmt::Debug for ApiKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str("ApiKey(***)")
    }
}

/// Global settings shared by every source.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct Settings {
    /// Civil zone every timestamp is normalized to.
    pub timezone: Tz,

    pub llm_provider: LlmProvider,

    /// Filled from the environment, never from the file.
    #[serde(skip)]
    pub llm_api_key: Option<ApiKey>,

    pub llm_model: String,

    /// Upper bound on highlights per meeting.
    pub max_highlights: usize,

    /// Agenda text is truncated to this many characters before summarizing.
    pub max_agenda_chars: usize,

    /// Bound on one whole source fetch, and on each agenda download.
    pub fetch_timeout_ms: u64,

    pub model_timeout_ms: u64,

    /// Sources fetched at the same time.
    pub concurrency: usize,

    pub user_agent: String,

    /// Notified with a POST after a successful write.
    pub webhook_url: Option<String>,

    /// Reuse highlights from the previous document when the agenda URL is unchanged.
    pub reuse_previous_summaries: bool,
}

impl Default for Settings {
    fn default() -> Self {
        Self {
            timezone: chrono_tz::America::Denver,
            llm_provider: LlmProvider::None,
            llm_api_key: None,
            llm_model: "gpt-4o-mini".to_string(),
            max_highlights: 12,
            max_agenda_chars: 50_000,
            fetch_timeout_ms: 60_000,
            model_timeout_ms: 60_000,
            concurrency: 4,
            user_agent: "MeetingWatch/1.0".to_string(),
            webhook_url: None,
            reuse_previous_summaries: true,
        }
    }
}

impl Settings {
    /// True when a model provider and its credential are both configured.
    pub fn model_enabled(&self) -> bool {
        self.llm_provider != LlmProvider::None && self.llm_api_key.is_some()
    }
}

/// CSS selectors locating meeting entries on a listing page.
///
/// Every selector except `item` is evaluated relative to the item node.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ListingSelectors {
    /// One match per meeting entry
    pub item: String,

    /// Defaults to the item's own text when absent
    pub title: Option<String>,

    /// Defaults to the item's own text when absent (usually with `date_pattern`)
    pub date: Option<String>,

    pub time: Option<String>,
    pub location: Option<String>,
    pub body: Option<String>,

    /// Anchor whose href becomes the meeting's source URL
    pub detail_link: Option<String>,

    /// Anchor whose href points to the agenda document
    pub agenda_link: Option<String>,

    /// Element whose HTML is the agenda itself, for listings that embed it
    pub agenda_content: Option<String>,

    /// Regex with a named group `date` (or `year`, `month` and `day`) and an
    /// optional `time`, applied to the date text
    pub date_pattern: Option<String>,

    /// Read the date from this attribute of the date element (or the item)
    /// instead of its text, e.g. `href` for day-view links
    pub date_attr: Option<String>,

    /// Per-record detail page, followed through the record's detail link
    pub detail: Option<DetailSelectors>,
}

/// CSS selectors evaluated on a record's detail page.
///
/// Whatever matches replaces the listing's value; misses keep it.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct DetailSelectors {
    pub title: Option<String>,
    pub time: Option<String>,
    pub location: Option<String>,
    pub agenda_link: Option<String>,
    pub agenda_content: Option<String>,

    /// Rendered portals only: when a detail page counts as loaded
    pub readiness_condition: Option<Readiness>,
}

/// Listing spread over several pages.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "camelCase")]
pub enum Pagination {
    /// One page per month from the current one. `{year}` and `{month}` in the
    /// template are substituted; `url` itself is not fetched.
    #[serde(rename_all = "camelCase")]
    Monthly { url_template: String, months: u32 },
    /// Extra listing pages fetched after `url`
    Urls { urls: Vec<String> },
}

/// Alternative agenda endpoint that serves text directly.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum TextEndpoint {
    /// CivicClerk `GetMeetingFileStream?plainText=true`
    Civicclerk,
}

/// When a rendered page counts as loaded.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "camelCase")]
pub enum Readiness {
    /// Wait until `selector` matches, at most `timeout_ms`
    #[serde(rename_all = "camelCase")]
    Selector {
        selector: String,
        #[serde(default = "default_readiness_timeout_ms")]
        timeout_ms: u64,
    },
    /// Wait a fixed delay after navigation
    Delay { ms: u64 },
}

fn default_readiness_timeout_ms() -> u64 {
    15_000
}

/// One scraped source.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SourceConfig {
    /// Stable identifier; part of every meeting's identity key
    pub id: String,

    pub url: String,

    pub adapter_type: AdapterKind,

    /// Body or committee name used when the listing does not carry one
    #[serde(default)]
    pub body: Option<String>,

    #[serde(default)]
    pub selectors: Option<ListingSelectors>,

    /// chrono `strftime` formats, date-only or date-and-time
    #[serde(default = "default_date_formats")]
    pub date_formats: Vec<String>,

    /// Joined with each date format when the record carries a separate time
    #[serde(default = "default_time_formats")]
    pub time_formats: Vec<String>,

    /// Time of day assumed for bare dates, `HH:MM`
    #[serde(default)]
    pub default_time: Option<String>,

    #[serde(default = "default_min_request_interval_ms")]
    pub min_request_interval_ms: u64,

    #[serde(default)]
    pub readiness_condition: Option<Readiness>,

    /// Keep only titles matching this regex
    #[serde(default)]
    pub include: Option<String>,

    /// Drop titles matching this regex
    #[serde(default)]
    pub exclude: Option<String>,

    #[serde(default)]
    pub default_location: Option<String>,

    /// Days ahead requested from date-windowed APIs
    #[serde(default = "default_window_days")]
    pub window_days: u32,

    #[serde(default)]
    pub pagination: Option<Pagination>,

    /// Try this text endpoint before downloading a linked agenda
    #[serde(default)]
    pub agenda_text_endpoint: Option<TextEndpoint>,
}

fn default_date_formats() -> Vec<String> {
    vec![
        "%Y-%m-%dT%H:%M:%S".to_string(),
        "%Y-%m-%d".to_string(),
        "%m/%d/%Y".to_string(),
        "%B %d, %Y".to_string(),
        "%A, %B %d, %Y".to_string(),
    ]
}

fn default_time_formats() -> Vec<String> {
    vec!["%I:%M %p".to_string(), "%H:%M".to_string()]
}

fn default_min_request_interval_ms() -> u64 {
    1_000
}

fn default_window_days() -> u32 {
    120
}

impl SourceConfig {
    /// Minimal source with defaults, mostly for tests and programmatic use.
    pub fn new(id: impl Into<String>, url: impl Into<String>, adapter_type: AdapterKind) -> Self {
        Self {
            id: id.into(),
            url: url.into(),
            adapter_type,
            body: None,
            selectors: None,
            date_formats: default_date_formats(),
            time_formats: default_time_formats(),
            default_time: None,
            min_request_interval_ms: default_min_request_interval_ms(),
            readiness_condition: None,
            include: None,
            exclude: None,
            default_location: None,
            window_days: default_window_days(),
            pagination: None,
            agenda_text_endpoint: None,
        }
    }

    pub fn with_selectors(mut self, selectors: ListingSelectors) -> Self {
        self.selectors = Some(selectors);
        self
    }

    pub fn with_body(mut self, body: impl Into<String>) -> Self {
        self.body = Some(body.into());
        self
    }

    pub fn with_date_formats(mut self, formats: &[&str]) -> Self {
        self.date_formats = formats.iter().map(|f| f.to_string()).collect();
        self
    }

    pub fn with_default_time(mut self, time: impl Into<String>) -> Self {
        self.default_time = Some(time.into());
        self
    }

    pub fn with_pagination(mut self, pagination: Pagination) -> Self {
        self.pagination = Some(pagination);
        self
    }

    /// Listing pages to fetch, in order, as of the civil date `today`.
    pub fn listing_urls(&self, today: NaiveDate) -> Vec<String> {
        match &self.pagination {
            None => vec![self.url.clone()],
            Some(Pagination::Urls { urls }) => std::iter::once(self.url.clone())
                .chain(urls.iter().cloned())
                .collect(),
            Some(Pagination::Monthly {
                url_template,
                months,
            }) => {
                let first = today.with_day(1).unwrap_or(today);
                (0..*months)
                    .filter_map(|offset| first.checked_add_months(Months::new(offset)))
                    .map(|month| {
                        url_template
                            .replace("{year}", &month.year().to_string())
                            .replace("{month}", &month.month().to_string())
                    })
                    .collect()
            }
        }
    }

    /// Time used for bare dates. Midnight unless configured.
    pub fn default_time(&self) -> NaiveTime {
        self.default_time
            .as_deref()
            .and_then(parse_clock_time)
            .unwrap_or(NaiveTime::MIN)
    }

    /// Host the source's requests go to.
    pub fn host(&self) -> Option<String> {
        Url::parse(&self.url)
            .ok()
            .and_then(|u| u.host_str().map(|h| h.to_ascii_lowercase()))
    }

    /// Whether a listing title passes the include/exclude filters.
    pub fn accepts_title(&self, title: &str) -> bool {
        let matches = |pattern: &Option<String>| {
            pattern
                .as_deref()
                .and_then(|p| Regex::new(&format!("(?i){p}")).ok())
                .map(|re| re.is_match(title))
        };
        if matches(&self.include) == Some(false) {
            return false;
        }
        matches(&self.exclude) != Some(true)
    }

    fn validate(&self) -> Result<(), ConfigError> {
        let invalid = |msg: String| ConfigError::Invalid(format!("source {}: {msg}", self.id));

        if self.id.trim().is_empty() {
            return Err(ConfigError::Invalid("source with empty id".into()));
        }
        Url::parse(&self.url).map_err(|e| invalid(format!("bad url {:?}: {e}", self.url)))?;

        for (name, pattern) in [("include", &self.include), ("exclude", &self.exclude)] {
            if let Some(p) = pattern {
                Regex::new(p).map_err(|e| invalid(format!("bad {name} regex: {e}")))?;
            }
        }

        if let Some(t) = &self.default_time {
            if parse_clock_time(t).is_none() {
                return Err(invalid(format!("bad defaultTime {t:?}, expected HH:MM")));
            }
        }

        if self.date_formats.is_empty() {
            return Err(invalid("dateFormats is empty".into()));
        }

        match (self.adapter_type, &self.selectors) {
            (AdapterKind::Static | AdapterKind::Rendered, None) => {
                return Err(invalid(format!(
                    "{} adapter needs selectors",
                    self.adapter_type
                )));
            }
            (_, Some(selectors)) => {
                crate::adapters::listing::ListingExtractor::compile(selectors)
                    .map_err(|e| invalid(e.to_string()))?;
            }
            _ => {}
        }

        let detail_readiness = self
            .selectors
            .as_ref()
            .and_then(|s| s.detail.as_ref())
            .and_then(|d| d.readiness_condition.as_ref());
        for readiness in [self.readiness_condition.as_ref(), detail_readiness].into_iter().flatten() {
            if let Readiness::Selector { selector, .. } = readiness {
                scraper::Selector::parse(selector)
                    .map_err(|e| invalid(format!("bad readiness selector: {e}")))?;
            }
        }

        match &self.pagination {
            Some(Pagination::Monthly {
                url_template,
                months,
            }) => {
                if *months == 0 {
                    return Err(invalid("pagination months must be at least 1".into()));
                }
                if !url_template.contains("{year}") || !url_template.contains("{month}") {
                    return Err(invalid("urlTemplate needs {year} and {month}".into()));
                }
                let sample = url_template.replace("{year}", "2025").replace("{month}", "1");
                Url::parse(&sample).map_err(|e| invalid(format!("bad urlTemplate: {e}")))?;
            }
            Some(Pagination::Urls { urls }) => {
                for url in urls {
                    Url::parse(url).map_err(|e| invalid(format!("bad page url {url:?}: {e}")))?;
                }
            }
            None => {}
        }

        Ok(())
    }
}

fn parse_clock_time(value: &str) -> Option<NaiveTime> {
    NaiveTime::parse_from_str(value.trim(), "%H:%M")
        .or_else(|_| NaiveTime::parse_from_str(value.trim(), "%H:%M:%S"))
        .ok()
}

/// Complete run configuration.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct Config {
    #[serde(default)]
    pub settings: Settings,

    #[serde(default)]
    pub sources: Vec<SourceConfig>,
}

impl Config {
    /// Load from a JSON file, apply environment overrides, validate.
    pub fn load(path: &Path) -> Result<Self, ConfigError> {
        // Load .env file if present (development)
        let _ = dotenvy::dotenv();

        let raw = std::fs::read_to_string(path).map_err(|source| ConfigError::Read {
            path: path.to_path_buf(),
            source,
        })?;
        let mut config = Self::from_json(&raw)?;
        config.apply_env(|key| std::env::var(key).ok())?;
        config.validate()?;
        Ok(config)
    }

    /// Parse without touching the environment.
    pub fn from_json(raw: &str) -> Result<Self, ConfigError> {
        Ok(serde_json::from_str(raw)?)
    }

    /// Apply `LLM_PROVIDER`, `SUMMARIZER_MODEL` and the provider's API key.
    pub fn apply_env<F>(&mut self, lookup: F) -> Result<(), ConfigError>
    where
        F: Fn(&str) -> Option<String>,
    {
        if let Some(provider) = lookup("LLM_PROVIDER") {
            self.settings.llm_provider = LlmProvider::parse(&provider).ok_or_else(|| {
                ConfigError::Invalid(format!("unknown LLM_PROVIDER {provider:?}"))
            })?;
        }
        if let Some(model) = lookup("SUMMARIZER_MODEL").filter(|m| !m.trim().is_empty()) {
            self.settings.llm_model = model;
        }
        self.settings.llm_api_key = self
            .settings
            .llm_provider
            .api_key_var()
            .and_then(|var| lookup(var))
            .filter(|k| !k.trim().is_empty())
            .map(ApiKey::new);
        Ok(())
    }

    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.settings.max_highlights == 0 {
            return Err(ConfigError::Invalid("maxHighlights must be at least 1".into()));
        }
        if self.settings.concurrency == 0 {
            return Err(ConfigError::Invalid("concurrency must be at least 1".into()));
        }
        if let Some(hook) = &self.settings.webhook_url {
            Url::parse(hook)
                .map_err(|e| ConfigError::Invalid(format!("bad webhookUrl: {e}")))?;
        }

        let mut seen = HashSet::new();
        for source in &self.sources {
            if !seen.insert(source.id.as_str()) {
                return Err(ConfigError::Invalid(format!(
                    "duplicate source id {}",
                    source.id
                )));
            }
            source.validate()?;
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const SAMPLE: &str = r#"{
        "settings": { "timezone": "America/Denver", "maxHighlights": 5 },
        "sources": [
            {
                "id": "epc-bocc",
                "url": "https://www.agendasuite.org/iip/elpaso",
                "adapterType": "static",
                "body": "El Paso County",
                "selectors": { "item": "div.nextmeetings li", "detailLink": "a" },
                "defaultTime": "09:00",
                "exclude": "work\\s*session"
            },
            {
                "id": "alamosa",
                "url": "https://cityofalamosa.diligent.community/Portal",
                "adapterType": "rendered",
                "selectors": { "item": "a.meeting" },
                "readinessCondition": { "type": "selector", "selector": "a.meeting" }
            }
        ]
    }"#;

    #[test]
    fn test_parse_sample_config() {
        let config = Config::from_json(SAMPLE).unwrap();
        config.validate().unwrap();

        assert_eq!(config.settings.timezone, chrono_tz::America::Denver);
        assert_eq!(config.settings.max_highlights, 5);
        assert_eq!(config.settings.llm_provider, LlmProvider::None);
        assert_eq!(config.sources.len(), 2);
        assert_eq!(config.sources[0].adapter_type, AdapterKind::Static);
        assert_eq!(
            config.sources[0].default_time(),
            NaiveTime::from_hms_opt(9, 0, 0).unwrap()
        );
        assert_eq!(
            config.sources[1].readiness_condition,
            Some(Readiness::Selector {
                selector: "a.meeting".into(),
                timeout_ms: 15_000
            })
        );
        assert_eq!(config.sources[1].min_request_interval_ms, 1_000);
    }

    #[test]
    fn test_env_overrides_and_api_key() {
        let mut config = Config::from_json(SAMPLE).unwrap();
        config
            .apply_env(|key| match key {
                "LLM_PROVIDER" => Some("openai".into()),
                "OPENAI_API_KEY" => Some("sk-test".into()),
                _ => None,
            })
            .unwrap();

        assert!(config.settings.model_enabled());
        assert_eq!(config.settings.llm_api_key.unwrap().expose(), "sk-test");
    }

    #[test]
    fn test_provider_without_key_disables_model() {
        let mut config = Config::from_json(SAMPLE).unwrap();
        config
            .apply_env(|key| (key == "LLM_PROVIDER").then(|| "openrouter".to_string()))
            .unwrap();
        assert!(!config.settings.model_enabled());
    }

    #[test]
    fn test_unknown_provider_rejected() {
        let mut config = Config::from_json(SAMPLE).unwrap();
        let result = config.apply_env(|key| (key == "LLM_PROVIDER").then(|| "gemini".into()));
        assert!(result.is_err());
    }

    #[test]
    fn test_duplicate_source_ids_rejected() {
        let mut config = Config::from_json(SAMPLE).unwrap();
        config.sources[1].id = "epc-bocc".into();
        assert!(matches!(config.validate(), Err(ConfigError::Invalid(_))));
    }

    #[test]
    fn test_static_source_requires_selectors() {
        let mut config = Config::from_json(SAMPLE).unwrap();
        config.sources[0].selectors = None;
        assert!(config.validate().is_err());
    }

    #[test]
    fn test_bad_default_time_rejected() {
        let mut config = Config::from_json(SAMPLE).unwrap();
        config.sources[0].default_time = Some("6pm".into());
        assert!(config.validate().is_err());
    }

    #[test]
    fn test_title_filters() {
        let config = Config::from_json(SAMPLE).unwrap();
        let epc = &config.sources[0];
        assert!(epc.accepts_title("Board of County Commissioners"));
        assert!(!epc.accepts_title("BOCC Work Session"));

        let mut only_regular = epc.clone();
        only_regular.include = Some("regular meeting".into());
        assert!(only_regular.accepts_title("City Council Regular Meeting"));
        assert!(!only_regular.accepts_title("Planning Commission"));
    }

    #[test]
    fn test_api_key_debug_is_redacted() {
        let key = ApiKey::new("sk-live-123");
        assert_eq!(format!("{:?}", key), "ApiKey(***)");
    }

    #[test]
    fn test_monthly_listing_urls() {
        let source = SourceConfig::new(
            "trinidad",
            "https://www.trinidad.co.gov/calendar.php",
            AdapterKind::Static,
        )
        .with_pagination(Pagination::Monthly {
            url_template: "https://www.trinidad.co.gov/calendar.php?view=list&month={month}&day=1&year={year}&calendar=845".into(),
            months: 3,
        });

        let today = NaiveDate::from_ymd_opt(2025, 11, 18).unwrap();
        assert_eq!(
            source.listing_urls(today),
            vec![
                "https://www.trinidad.co.gov/calendar.php?view=list&month=11&day=1&year=2025&calendar=845",
                "https://www.trinidad.co.gov/calendar.php?view=list&month=12&day=1&year=2025&calendar=845",
                "https://www.trinidad.co.gov/calendar.php?view=list&month=1&day=1&year=2026&calendar=845",
            ]
        );
    }

    #[test]
    fn test_extra_listing_urls_follow_base() {
        let single = SourceConfig::new("salida", "https://salida.civicclerk.com/", AdapterKind::Rendered);
        let today = NaiveDate::from_ymd_opt(2025, 5, 1).unwrap();
        assert_eq!(single.listing_urls(today), vec!["https://salida.civicclerk.com/"]);

        let paged = single.with_pagination(Pagination::Urls {
            urls: vec!["https://portal.salida.civicclerk.com/".into()],
        });
        assert_eq!(
            paged.listing_urls(today),
            vec![
                "https://salida.civicclerk.com/",
                "https://portal.salida.civicclerk.com/"
            ]
        );
    }

    #[test]
    fn test_bad_pagination_rejected() {
        let mut config = Config::from_json(SAMPLE).unwrap();
        config.sources[0].pagination = Some(Pagination::Monthly {
            url_template: "https://x.example/cal?month={month}".into(),
            months: 2,
        });
        assert!(config.validate().is_err());

        config.sources[0].pagination = Some(Pagination::Monthly {
            url_template: "https://x.example/cal?month={month}&year={year}".into(),
            months: 0,
        });
        assert!(config.validate().is_err());
    }

    #[test]
    fn test_detail_block_parsed_and_checked() {
        let raw = r##"{
            "sources": [{
                "id": "trinidad",
                "url": "https://www.trinidad.co.gov/calendar.php",
                "adapterType": "static",
                "agendaTextEndpoint": "civicclerk",
                "selectors": {
                    "item": "a[href*='view=day']",
                    "detail": { "title": "#modal-event-title", "agendaContent": "#modal-event-description" }
                }
            }]
        }"##;
        let mut config = Config::from_json(raw).unwrap();
        config.validate().unwrap();
        let source = &config.sources[0];
        assert_eq!(source.agenda_text_endpoint, Some(TextEndpoint::Civicclerk));
        let detail = source.selectors.as_ref().unwrap().detail.as_ref().unwrap();
        assert_eq!(detail.title.as_deref(), Some("#modal-event-title"));

        if let Some(detail) = config.sources[0]
            .selectors
            .as_mut()
            .and_then(|s| s.detail.as_mut())
        {
            detail.location = Some("p[".into());
        }
        assert!(config.validate().is_err());
    }

    #[test]
    fn test_source_host() {
        let source = SourceConfig::new("x", "https://WWW.Example.org/cal", AdapterKind::Static);
        assert_eq!(source.host().as_deref(), Some("www.example.org"));
    }
}
