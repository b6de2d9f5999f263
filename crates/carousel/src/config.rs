use std::time::Duration;

use recap_feed::ExtractOptions;
use serde::{Deserialize, Serialize};

use crate::EngineError;
use crate::text::{FontFace, Rgba};

const DEFAULT_USER_AGENT: &str = concat!("carousel-engine/", env!("CARGO_PKG_VERSION"));

const DEFAULT_FEED_URL_TEMPLATE: &str = "http://statsapi.mlb.com/api/v1/schedule?hydrate=game(content(editorial(all))),decisions&date={date}&sportId=1";

/// Placeholder replaced by the feed date in [`FeedConfig::url_template`]
pub const DATE_PLACEHOLDER: &str = "{date}";

/// Upper bound on [`FetchConfig::max_retries`]; keeps `2^n` backoff finite
pub const MAX_RETRY_LIMIT: u32 = 16;

/// Options for the resource fetcher
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct FetchConfig {
    /// Timeout of a single HTTP attempt
    pub timeout: Duration,

    /// Connection timeout (time to establish initial connection)
    pub connect_timeout: Duration,

    /// Resolve and connect over IPv4 only
    pub force_ipv4: bool,

    pub follow_redirects: bool,

    pub max_redirects: usize,

    /// Whether to use system proxy settings if available
    pub use_system_proxy: bool,

    pub user_agent: String,

    /// Retries after the first attempt before a fetch is declared failed
    pub max_retries: u32,

    /// Backoff of the first retry; doubles with every further retry
    pub backoff_base: Duration,

    /// Draw each backoff uniformly from `[0, computed)`
    pub jitter: bool,

    /// Extra sleep after every network fetch, for latency testing
    pub stress: Duration,

    /// Log response bodies of non-image fetches at trace level
    pub verbose: bool,
}

impl Default for FetchConfig {
    fn default() -> Self {
        Self {
            timeout: Duration::from_secs(10),
            connect_timeout: Duration::from_secs(10),
            force_ipv4: true,
            follow_redirects: true,
            max_redirects: 10,
            use_system_proxy: true,
            user_agent: DEFAULT_USER_AGENT.to_owned(),
            max_retries: 3,
            backoff_base: Duration::from_millis(100),
            jitter: false,
            stress: Duration::ZERO,
            verbose: false,
        }
    }
}

/// Options for the daily feed service
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct FeedConfig {
    /// Feed URL with a `{date}` placeholder
    pub url_template: String,

    /// Dates offered by the date selector, oldest first
    pub dates: Vec<String>,

    /// Date shown first; the middle of `dates` when unset
    pub default_date_index: Option<usize>,

    /// Wrap width in pixels for rendered headline/description text
    pub wrap_limit: u32,

    pub headline_font: FontFace,

    pub description_font: FontFace,

    pub text_color: Rgba,

    /// Thumbnail geometry and description length
    pub extract: ExtractOptions,
}

impl Default for FeedConfig {
    fn default() -> Self {
        Self {
            url_template: DEFAULT_FEED_URL_TEMPLATE.to_owned(),
            dates: (1..=7).map(|day| format!("2022-05-{day:02}")).collect(),
            default_date_index: None,
            wrap_limit: 480,
            headline_font: FontFace::Roboto22,
            description_font: FontFace::Roboto20,
            text_color: Rgba::WHITE,
            extract: ExtractOptions::default(),
        }
    }
}

/// Top-level engine configuration
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct EngineConfig {
    /// Number of fetch worker threads
    pub workers: usize,
    pub fetch: FetchConfig,
    pub feed: FeedConfig,
}

impl Default for EngineConfig {
    fn default() -> Self {
        Self {
            workers: 4,
            fetch: FetchConfig::default(),
            feed: FeedConfig::default(),
        }
    }
}

impl EngineConfig {
    pub fn builder() -> crate::builder::EngineConfigBuilder {
        crate::builder::EngineConfigBuilder::new()
    }

    /// Check the configuration for values the engine cannot run with.
    ///
    /// # Errors
    ///
    /// Returns [`EngineError::InvalidConfig`] describing the first problem found.
    pub fn validate(&self) -> Result<(), EngineError> {
        if self.workers == 0 {
            return Err(EngineError::InvalidConfig(
                "workers must be greater than 0".into(),
            ));
        }

        if self.fetch.max_retries > MAX_RETRY_LIMIT {
            return Err(EngineError::InvalidConfig(format!(
                "max_retries must not exceed {MAX_RETRY_LIMIT}"
            )));
        }

        if !self.feed.url_template.contains(DATE_PLACEHOLDER) {
            return Err(EngineError::InvalidConfig(format!(
                "feed url_template must contain {DATE_PLACEHOLDER}"
            )));
        }

        if let Some(index) = self.feed.default_date_index {
            if index >= self.feed.dates.len() {
                return Err(EngineError::InvalidConfig(format!(
                    "default_date_index {index} is out of range for {} dates",
                    self.feed.dates.len()
                )));
            }
        }

        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn defaults_match_fetch_policy() {
        let config = EngineConfig::default();
        assert_eq!(config.workers, 4);
        assert_eq!(config.fetch.timeout, Duration::from_secs(10));
        assert_eq!(config.fetch.max_retries, 3);
        assert_eq!(config.fetch.backoff_base, Duration::from_millis(100));
        assert!(config.fetch.force_ipv4);
        assert!(config.fetch.follow_redirects);
        assert_eq!(config.feed.dates.len(), 7);
        assert_eq!(config.feed.dates[0], "2022-05-01");
        assert!(config.validate().is_ok());
    }

    #[test]
    fn validate_rejects_bad_values() {
        let mut config = EngineConfig::default();
        config.workers = 0;
        assert!(config.validate().is_err());

        let mut config = EngineConfig::default();
        config.fetch.max_retries = MAX_RETRY_LIMIT + 1;
        assert!(config.validate().is_err());

        let mut config = EngineConfig::default();
        config.feed.url_template = "file:///tmp/feed.json".into();
        assert!(config.validate().is_err());

        let mut config = EngineConfig::default();
        config.feed.default_date_index = Some(7);
        match config.validate() {
            Err(e) => assert!(e.to_string().contains("out of range")),
            Ok(_) => panic!("Expected error for out of range date index"),
        }
    }

    #[test]
    fn deserializes_partial_json() {
        let config: EngineConfig = serde_json::from_str(
            r#"{ "workers": 2, "fetch": { "max_retries": 1, "verbose": true } }"#,
        )
        .unwrap();

        assert_eq!(config.workers, 2);
        assert_eq!(config.fetch.max_retries, 1);
        assert!(config.fetch.verbose);
        assert_eq!(config.fetch.timeout, Duration::from_secs(10));
        assert_eq!(config.feed, FeedConfig::default());
    }
}
