//! # Feed cache
//!
//! Daily recap feeds keyed by date. Filling a feed also primes the text cache
//! with each recap's headline and description and starts loading every
//! thumbnail into the image cache.

mod item;

use std::sync::Arc;
use std::sync::atomic::{AtomicU32, Ordering};

use recap_feed::ScheduleData;
use tracing::{debug, info, warn};

pub use item::{Feed, FeedItem, ThumbnailCell, ThumbnailState};

use crate::ErrorKind;
use crate::cache::{CacheStatus, KeyedCache};
use crate::config::{DATE_PLACEHOLDER, FeedConfig};
use crate::fetcher::ResourceFetcher;
use crate::image::ImageService;
use crate::text::{TextService, TextStyle};

/// Status reported for feeds served from the cache
const CACHED_STATUS: u32 = 200;

pub struct FeedService {
    cache: KeyedCache<Feed>,
    fetcher: Arc<ResourceFetcher>,
    images: Arc<ImageService>,
    texts: Arc<TextService>,
    config: Arc<FeedConfig>,
}

impl FeedService {
    pub fn new(
        fetcher: Arc<ResourceFetcher>,
        images: Arc<ImageService>,
        texts: Arc<TextService>,
        config: FeedConfig,
    ) -> Self {
        Self {
            cache: KeyedCache::new("feed"),
            fetcher,
            images,
            texts,
            config: Arc::new(config),
        }
    }

    pub fn headline_key(date: &str, park: u32) -> String {
        format!("{date}-{park}-headline")
    }

    pub fn description_key(date: &str, park: u32) -> String {
        format!("{date}-{park}-description")
    }

    pub fn thumbnail_key(date: &str, park: u32) -> String {
        format!("{date}-{park}-thumbnail")
    }

    pub fn dates(&self) -> &[String] {
        &self.config.dates
    }

    pub fn date_at(&self, index: usize) -> Option<&str> {
        self.config.dates.get(index).map(String::as_str)
    }

    /// Configured default, else the middle of the calendar
    pub fn default_date_index(&self) -> usize {
        self.config
            .default_date_index
            .unwrap_or(self.config.dates.len() / 2)
    }

    pub fn default_date(&self) -> Option<&str> {
        self.date_at(self.default_date_index())
    }

    pub fn feed_url(&self, date: &str) -> String {
        self.config.url_template.replace(DATE_PLACEHOLDER, date)
    }

    pub fn headline_style(&self) -> TextStyle {
        TextStyle::new(
            self.config.headline_font,
            self.config.text_color,
            self.config.wrap_limit,
        )
    }

    pub fn description_style(&self) -> TextStyle {
        TextStyle::new(
            self.config.description_font,
            self.config.text_color,
            self.config.wrap_limit,
        )
    }

    /// Feed of `date`, fetching it on a miss.
    ///
    /// `callback` receives the fetch error, the HTTP status of the feed
    /// request and the feed. A cached feed is answered immediately with
    /// status 200. A fetched feed is answered on the fetch worker once its
    /// strings are rendered and its thumbnail requests are issued.
    pub fn fetch_feed<C>(&self, date: &str, callback: C) -> CacheStatus
    where
        C: FnOnce(ErrorKind, u32, Option<Arc<Feed>>) + Send + 'static,
    {
        if date.is_empty() {
            callback(ErrorKind::NoResourceName, 0, None);
            return CacheStatus::Miss;
        }

        let status = Arc::new(AtomicU32::new(CACHED_STATUS));
        let reported = Arc::clone(&status);
        let url = self.feed_url(date);
        let loader = self.loader();

        self.cache.request(
            date,
            move |completion| {
                debug!(date = completion.key(), %url, "Fetching feed");
                let fetcher = Arc::clone(&loader.fetcher);
                fetcher.fetch(url, move |outcome| {
                    status.store(outcome.status, Ordering::Release);

                    let result = if outcome.is_ok() {
                        ScheduleData::from_slice(&outcome.payload)
                            .map(|data| {
                                Feed::from_schedule(
                                    completion.key(),
                                    &data,
                                    &loader.config.extract,
                                )
                            })
                            .map_err(|e| {
                                warn!(
                                    date = completion.key(),
                                    status = outcome.status,
                                    bytes = outcome.payload.len(),
                                    error = %e,
                                    "Failed to parse feed"
                                );
                                ErrorKind::JsonParseError
                            })
                    } else {
                        Err(outcome.error)
                    };

                    completion.complete_then(result, |feed| loader.load_items(feed));
                });
            },
            move |error, feed| callback(error, reported.load(Ordering::Acquire), feed),
        )
    }

    pub fn feed(&self, date: &str) -> Option<Arc<Feed>> {
        self.cache.get(date)
    }

    /// Drop the feed of `date` together with its rendered strings and thumbnails
    pub fn remove_feed(&self, date: &str) -> Option<Arc<Feed>> {
        let feed = self.cache.remove(date)?;
        for item in &feed.items {
            let park = item.recap.park;
            self.texts.remove_string(&Self::headline_key(date, park));
            self.texts.remove_string(&Self::description_key(date, park));
            self.images.remove_image(&Self::thumbnail_key(date, park));
        }
        info!(date, items = feed.len(), "Removed feed");
        Some(feed)
    }

    /// Remove exactly this feed, if it is still the cached one for its date
    pub fn remove(&self, feed: &Arc<Feed>) -> bool {
        match self.cache.get(&feed.date) {
            Some(cached) if Arc::ptr_eq(&cached, feed) => self.remove_feed(&feed.date).is_some(),
            _ => false,
        }
    }

    pub fn cache(&self) -> &KeyedCache<Feed> {
        &self.cache
    }

    fn loader(&self) -> ItemLoader {
        ItemLoader {
            fetcher: Arc::clone(&self.fetcher),
            images: Arc::clone(&self.images),
            texts: Arc::clone(&self.texts),
            config: Arc::clone(&self.config),
            headline: self.headline_style(),
            description: self.description_style(),
        }
    }
}

/// Everything a fetch worker needs to finish a feed
struct ItemLoader {
    fetcher: Arc<ResourceFetcher>,
    images: Arc<ImageService>,
    texts: Arc<TextService>,
    config: Arc<FeedConfig>,
    headline: TextStyle,
    description: TextStyle,
}

impl ItemLoader {
    fn load_items(&self, feed: &Arc<Feed>) {
        info!(date = %feed.date, items = feed.len(), "Feed loaded");

        for item in &feed.items {
            let recap = &item.recap;
            let headline_key = FeedService::headline_key(&feed.date, recap.park);
            let description_key = FeedService::description_key(&feed.date, recap.park);

            for (key, style, text) in [
                (headline_key, self.headline, &recap.headline),
                (description_key, self.description, &recap.description),
            ] {
                self.texts
                    .request_string(key, style, text.as_str(), |error, _| {
                        if !error.is_ok() {
                            warn!(%error, "Failed to prepare recap text");
                        }
                    });
            }

            let thumbnail_key = FeedService::thumbnail_key(&feed.date, recap.park);
            if !item.thumbnail.begin_loading() {
                continue;
            }
            let pending = Arc::clone(item);
            self.images
                .request_image(thumbnail_key, recap.thumbnail_url.as_str(), move |error, _| {
                    if !error.is_ok() {
                        warn!(
                            park = pending.recap.park,
                            url = %pending.recap.thumbnail_url,
                            %error,
                            "Failed to load thumbnail"
                        );
                    }
                    pending.thumbnail.finish(error.is_ok());
                });
        }
    }
}
