use std::sync::Arc;

use tracing::info;

use crate::EngineError;
use crate::config::EngineConfig;
use crate::feed::FeedService;
use crate::fetcher::{ResourceFetcher, Transport};
use crate::image::ImageService;
use crate::text::{TextRenderer, TextService};

/// One fetcher and the caches built on it
pub struct CarouselEngine {
    config: EngineConfig,
    fetcher: Arc<ResourceFetcher>,
    images: Arc<ImageService>,
    texts: Arc<TextService>,
    feeds: FeedService,
}

impl CarouselEngine {
    /// Start an engine fetching over HTTP.
    ///
    /// # Errors
    ///
    /// Fails on an invalid configuration or when the fetcher cannot start.
    pub fn new(config: EngineConfig, renderer: Arc<dyn TextRenderer>) -> Result<Self, EngineError> {
        config.validate()?;
        let fetcher = ResourceFetcher::new(config.workers, config.fetch.clone())?;
        Ok(Self::assemble(config, renderer, fetcher))
    }

    /// Start an engine fetching network resources through `transport`
    pub fn with_transport(
        config: EngineConfig,
        renderer: Arc<dyn TextRenderer>,
        transport: Arc<dyn Transport>,
    ) -> Result<Self, EngineError> {
        config.validate()?;
        let fetcher =
            ResourceFetcher::with_transport(config.workers, config.fetch.clone(), transport)?;
        Ok(Self::assemble(config, renderer, fetcher))
    }

    fn assemble(
        config: EngineConfig,
        renderer: Arc<dyn TextRenderer>,
        fetcher: ResourceFetcher,
    ) -> Self {
        let fetcher = Arc::new(fetcher);
        let images = Arc::new(ImageService::new(Arc::clone(&fetcher)));
        let texts = Arc::new(TextService::new(renderer));
        let feeds = FeedService::new(
            Arc::clone(&fetcher),
            Arc::clone(&images),
            Arc::clone(&texts),
            config.feed.clone(),
        );

        info!(
            workers = config.workers,
            dates = config.feed.dates.len(),
            "Carousel engine ready"
        );

        Self {
            config,
            fetcher,
            images,
            texts,
            feeds,
        }
    }

    pub fn config(&self) -> &EngineConfig {
        &self.config
    }

    pub fn fetcher(&self) -> &ResourceFetcher {
        &self.fetcher
    }

    pub fn images(&self) -> &ImageService {
        &self.images
    }

    pub fn texts(&self) -> &TextService {
        &self.texts
    }

    pub fn feeds(&self) -> &FeedService {
        &self.feeds
    }

    /// Stop the fetch workers; queued fetches are dropped
    pub fn shutdown(&self) -> Result<(), EngineError> {
        info!("Shutting down carousel engine");
        self.fetcher.shutdown()
    }
}
