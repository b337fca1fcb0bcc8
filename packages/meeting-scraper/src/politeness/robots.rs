//! Robots.txt parser, checker and per-origin cache.

use std::collections::HashMap;
use std::sync::{Arc, Mutex};
use std::time::Duration;

use tokio::sync::OnceCell;
use tracing::{debug, info};

use crate::error::FetchError;

/// Parsed robots.txt rules.
#[derive(Debug, Clone, Default)]
pub struct RobotsTxt {
    /// Rules per user-agent token (lowercase)
    rules: HashMap<String, AgentRules>,

    /// Rules for `*`
    default_rules: AgentRules,
}

/// Rules for a specific user-agent group.
#[derive(Debug, Clone, Default)]
pub struct AgentRules {
    disallow: Vec<String>,
    allow: Vec<String>,
    crawl_delay: Option<f64>,
}

impl RobotsTxt {
    /// Parse robots.txt content.
    ///
    /// Consecutive `User-agent` lines share the group that follows them.
    pub fn parse(content: &str) -> Self {
        let mut robots = Self::default();
        let mut current_agents: Vec<String> = Vec::new();
        let mut current_rules = AgentRules::default();
        let mut group_has_rules = false;

        for line in content.lines() {
            let line = line.split('#').next().unwrap_or_default().trim();
            if line.is_empty() {
                continue;
            }

            let Some((directive, value)) = line.split_once(':') else {
                continue;
            };
            let directive = directive.trim().to_lowercase();
            let value = value.trim();

            match directive.as_str() {
                "user-agent" => {
                    if group_has_rules {
                        robots.store_group(&current_agents, &current_rules);
                        current_agents.clear();
                        current_rules = AgentRules::default();
                        group_has_rules = false;
                    }
                    current_agents.push(value.to_lowercase());
                }
                "disallow" => {
                    group_has_rules = true;
                    if !value.is_empty() {
                        current_rules.disallow.push(value.to_string());
                    }
                }
                "allow" => {
                    group_has_rules = true;
                    if !value.is_empty() {
                        current_rules.allow.push(value.to_string());
                    }
                }
                "crawl-delay" => {
                    group_has_rules = true;
                    if let Ok(delay) = value.parse::<f64>() {
                        current_rules.crawl_delay = Some(delay);
                    }
                }
                _ => {}
            }
        }

        robots.store_group(&current_agents, &current_rules);
        robots
    }

    fn store_group(&mut self, agents: &[String], rules: &AgentRules) {
        for agent in agents {
            if agent == "*" {
                self.default_rules = rules.clone();
            } else {
                self.rules.insert(agent.clone(), rules.clone());
            }
        }
    }

    fn rules_for(&self, user_agent: &str) -> &AgentRules {
        let agent_lower = user_agent.to_lowercase();
        self.rules
            .get(&agent_lower)
            .or_else(|| {
                self.rules
                    .iter()
                    .filter(|(k, _)| agent_lower.contains(k.as_str()))
                    .max_by_key(|(k, _)| k.len())
                    .map(|(_, v)| v)
            })
            .unwrap_or(&self.default_rules)
    }

    /// Check if a path is allowed for a user-agent.
    ///
    /// The longest matching rule wins; an allow wins a tie.
    pub fn is_allowed(&self, user_agent: &str, path: &str) -> bool {
        let rules = self.rules_for(user_agent);

        let longest = |patterns: &[String]| {
            patterns
                .iter()
                .filter(|p| path.starts_with(p.as_str()))
                .map(|p| p.len())
                .max()
        };

        match (longest(&rules.allow), longest(&rules.disallow)) {
            (_, None) => true,
            (None, Some(_)) => false,
            (Some(allow), Some(disallow)) => allow >= disallow,
        }
    }

    /// Crawl delay requested for a user-agent.
    pub fn crawl_delay(&self, user_agent: &str) -> Option<Duration> {
        self.rules_for(user_agent)
            .crawl_delay
            .map(Duration::from_secs_f64)
    }
}

/// Fetch and parse robots.txt for an origin (`scheme://host[:port]`).
///
/// A missing robots.txt (any non-success status) allows everything.
pub async fn fetch_robots_txt(
    client: &reqwest::Client,
    origin: &str,
    user_agent: &str,
) -> Result<RobotsTxt, FetchError> {
    let url = format!("{}/robots.txt", origin.trim_end_matches('/'));
    let http_err = |source| FetchError::Http {
        url: url.clone(),
        source,
    };

    let response = client
        .get(&url)
        .header(reqwest::header::USER_AGENT, user_agent)
        .send()
        .await
        .map_err(http_err)?;

    if !response.status().is_success() {
        debug!(url = %url, status = %response.status(), "No robots.txt, allowing all");
        return Ok(RobotsTxt::default());
    }

    let content = response.text().await.map_err(http_err)?;
    Ok(RobotsTxt::parse(&content))
}

/// robots.txt decisions cached per origin for the lifetime of a run.
#[derive(Default)]
pub struct RobotsCache {
    entries: Mutex<HashMap<String, Arc<OnceCell<Arc<RobotsTxt>>>>>,
}

impl RobotsCache {
    pub fn new() -> Self {
        Self::default()
    }

    /// Pre-seed an origin, skipping the network (tests, known hosts).
    pub fn insert(&self, origin: &str, robots: RobotsTxt) {
        let cell = OnceCell::new_with(Some(Arc::new(robots)));
        self.lock().insert(origin.to_string(), Arc::new(cell));
    }

    /// Get the rules for `origin`, fetching once. A failed fetch is retried on
    /// the next call.
    pub async fn get_or_fetch<F, Fut>(&self, origin: &str, fetch: F) -> Result<Arc<RobotsTxt>, FetchError>
    where
        F: FnOnce() -> Fut,
        Fut: std::future::Future<Output = Result<RobotsTxt, FetchError>>,
    {
        let cell = self
            .lock()
            .entry(origin.to_string())
            .or_insert_with(|| Arc::new(OnceCell::new()))
            .clone();

        let robots = cell
            .get_or_try_init(move || async move {
                let robots = fetch().await?;
                info!(origin = %origin, "Cached robots.txt");
                Ok::<_, FetchError>(Arc::new(robots))
            })
            .await?;
        Ok(robots.clone())
    }

    fn lock(&self) -> std::sync::MutexGuard<'_, HashMap<String, Arc<OnceCell<Arc<RobotsTxt>>>>> {
        // A poisoned map still holds valid cells
        self.entries.lock().unwrap_or_else(|e| e.into_inner())
    }
}
