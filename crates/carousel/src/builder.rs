//! # Builder for EngineConfig
//!
//! Fluent construction of [`EngineConfig`] instances.
//!
//! # Example
//!
//! ```
//! use std::time::Duration;
//! use carousel_engine::EngineConfig;
//!
//! let config = EngineConfig::builder()
//!     .with_workers(8)
//!     .with_timeout(Duration::from_secs(5))
//!     .with_max_retries(2)
//!     .with_feed_url_template("file:///srv/feeds/{date}.json")
//!     .build();
//!
//! assert_eq!(config.workers, 8);
//! assert!(config.validate().is_ok());
//! ```

use std::time::Duration;

use crate::config::{EngineConfig, FeedConfig, FetchConfig};
use crate::text::{FontFace, Rgba};

/// Builder for creating EngineConfig instances with a fluent API
#[derive(Debug, Clone, Default)]
pub struct EngineConfigBuilder {
    config: EngineConfig,
}

impl EngineConfigBuilder {
    /// Create a new builder with default configuration
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_workers(mut self, workers: usize) -> Self {
        self.config.workers = workers;
        self
    }

    /// Replace the whole fetch configuration
    pub fn with_fetch_config(mut self, fetch: FetchConfig) -> Self {
        self.config.fetch = fetch;
        self
    }

    /// Replace the whole feed configuration
    pub fn with_feed_config(mut self, feed: FeedConfig) -> Self {
        self.config.feed = feed;
        self
    }

    /// Set the timeout of a single HTTP attempt
    pub fn with_timeout(mut self, timeout: Duration) -> Self {
        self.config.fetch.timeout = timeout;
        self
    }

    pub fn with_connect_timeout(mut self, timeout: Duration) -> Self {
        self.config.fetch.connect_timeout = timeout;
        self
    }

    pub fn with_force_ipv4(mut self, force: bool) -> Self {
        self.config.fetch.force_ipv4 = force;
        self
    }

    pub fn with_follow_redirects(mut self, follow: bool) -> Self {
        self.config.fetch.follow_redirects = follow;
        self
    }

    pub fn with_system_proxy(mut self, enabled: bool) -> Self {
        self.config.fetch.use_system_proxy = enabled;
        self
    }

    pub fn with_user_agent(mut self, user_agent: impl Into<String>) -> Self {
        self.config.fetch.user_agent = user_agent.into();
        self
    }

    pub fn with_max_retries(mut self, retries: u32) -> Self {
        self.config.fetch.max_retries = retries;
        self
    }

    pub fn with_backoff_base(mut self, base: Duration) -> Self {
        self.config.fetch.backoff_base = base;
        self
    }

    pub fn with_jitter(mut self, jitter: bool) -> Self {
        self.config.fetch.jitter = jitter;
        self
    }

    /// Sleep this long after every network fetch
    pub fn with_stress(mut self, stress: Duration) -> Self {
        self.config.fetch.stress = stress;
        self
    }

    pub fn with_verbose(mut self, verbose: bool) -> Self {
        self.config.fetch.verbose = verbose;
        self
    }

    /// Set the feed URL template; `{date}` is replaced by the requested date
    pub fn with_feed_url_template(mut self, template: impl Into<String>) -> Self {
        self.config.feed.url_template = template.into();
        self
    }

    pub fn with_dates<I, S>(mut self, dates: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.config.feed.dates = dates.into_iter().map(Into::into).collect();
        self
    }

    pub fn with_default_date_index(mut self, index: usize) -> Self {
        self.config.feed.default_date_index = Some(index);
        self
    }

    pub fn with_wrap_limit(mut self, wrap: u32) -> Self {
        self.config.feed.wrap_limit = wrap;
        self
    }

    pub fn with_fonts(mut self, headline: FontFace, description: FontFace) -> Self {
        self.config.feed.headline_font = headline;
        self.config.feed.description_font = description;
        self
    }

    pub fn with_text_color(mut self, color: Rgba) -> Self {
        self.config.feed.text_color = color;
        self
    }

    /// Select thumbnail cuts of this geometry
    pub fn with_thumbnail_cut(
        mut self,
        aspect_ratio: impl Into<String>,
        width: u32,
        height: u32,
    ) -> Self {
        self.config.feed.extract.aspect_ratio = aspect_ratio.into();
        self.config.feed.extract.width = width;
        self.config.feed.extract.height = height;
        self
    }

    /// Build the EngineConfig
    pub fn build(self) -> EngineConfig {
        self.config
    }
}
