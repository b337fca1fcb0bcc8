//! Shared crawl etiquette: robots.txt decisions and per-host spacing.
//!
//! Every outbound request for a source or an agenda goes through
//! [`Politeness::admit`] first.

pub mod robots;
pub mod throttle;

pub use robots::{fetch_robots_txt, RobotsCache, RobotsTxt};
pub use throttle::HostThrottle;

use tracing::{debug, warn};
use url::Url;

use crate::error::{FetchError, PolicyError, SourceError};

/// robots.txt cache plus host throttle, shared across adapters.
pub struct Politeness {
    client: reqwest::Client,
    user_agent: String,
    robots: RobotsCache,
    throttle: HostThrottle,
}

impl Politeness {
    pub fn new(client: reqwest::Client, user_agent: impl Into<String>, throttle: HostThrottle) -> Self {
        Self {
            client,
            user_agent: user_agent.into(),
            robots: RobotsCache::new(),
            throttle,
        }
    }

    pub fn user_agent(&self) -> &str {
        &self.user_agent
    }

    /// Robots cache, exposed so callers can pre-seed known origins.
    pub fn robots(&self) -> &RobotsCache {
        &self.robots
    }

    pub fn throttle(&self) -> &HostThrottle {
        &self.throttle
    }

    /// Check robots.txt for `url`, then wait for the host's next slot.
    /// A `Crawl-delay` longer than the configured interval wins.
    pub async fn admit(&self, url: &str) -> Result<(), SourceError> {
        let host = self.check_robots(url).await?;
        self.throttle.wait(&host).await;
        debug!(url = %url, "Request admitted");
        Ok(())
    }

    /// robots.txt decision only, without taking a throttle slot.
    pub async fn check(&self, url: &str) -> Result<(), SourceError> {
        self.check_robots(url).await.map(|_| ())
    }

    /// Returns the lowercased host on success.
    async fn check_robots(&self, url: &str) -> Result<String, SourceError> {
        let parsed = Url::parse(url).map_err(|_| FetchError::InvalidUrl {
            url: url.to_string(),
        })?;
        let host = parsed
            .host_str()
            .ok_or_else(|| FetchError::InvalidUrl {
                url: url.to_string(),
            })?
            .to_ascii_lowercase();
        let origin = parsed.origin().ascii_serialization();

        let robots = self
            .robots
            .get_or_fetch(&origin, || async {
                self.throttle.wait(&host).await;
                fetch_robots_txt(&self.client, &origin, &self.user_agent).await
            })
            .await?;

        let mut path = parsed.path().to_string();
        if let Some(query) = parsed.query() {
            path.push('?');
            path.push_str(query);
        }

        if !robots.is_allowed(&self.user_agent, &path) {
            warn!(url = %url, "robots.txt disallows fetch");
            return Err(PolicyError {
                url: url.to_string(),
            }
            .into());
        }

        if let Some(delay) = robots.crawl_delay(&self.user_agent) {
            self.throttle.raise_interval(&host, delay);
        }
        Ok(host)
    }
}
