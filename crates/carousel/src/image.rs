//! Decoded-image cache filled through the resource fetcher.

use std::sync::Arc;

use bytes::Bytes;
use tracing::warn;

use crate::ErrorKind;
use crate::cache::{CacheStatus, KeyedCache};
use crate::fetcher::ResourceFetcher;

/// An image decoded to RGBA8, rows top to bottom
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DecodedImage {
    pub width: u32,
    pub height: u32,
    pub pixels: Bytes,
}

impl DecodedImage {
    /// Decode PNG or JPEG bytes
    pub fn from_encoded(data: &[u8]) -> Result<Self, ::image::ImageError> {
        let rgba = ::image::load_from_memory(data)?.to_rgba8();
        let (width, height) = rgba.dimensions();
        Ok(Self {
            width,
            height,
            pixels: Bytes::from(rgba.into_raw()),
        })
    }
}

pub struct ImageService {
    cache: KeyedCache<DecodedImage>,
    fetcher: Arc<ResourceFetcher>,
}

impl ImageService {
    pub fn new(fetcher: Arc<ResourceFetcher>) -> Self {
        Self {
            cache: KeyedCache::new("image"),
            fetcher,
        }
    }

    /// Image of `key`, fetching and decoding `url` on a miss.
    ///
    /// Decoding runs on the fetch worker; `callback` runs there too unless
    /// the image was already cached.
    pub fn request_image<C>(
        &self,
        key: impl Into<String>,
        url: impl Into<String>,
        callback: C,
    ) -> CacheStatus
    where
        C: FnOnce(ErrorKind, Option<Arc<DecodedImage>>) + Send + 'static,
    {
        let key = key.into();
        if key.is_empty() {
            callback(ErrorKind::NoResourceName, None);
            return CacheStatus::Miss;
        }

        let fetcher = Arc::clone(&self.fetcher);
        let url = url.into();
        self.cache.request(
            key,
            move |completion| {
                fetcher.fetch(url.clone(), move |outcome| {
                    let result = if outcome.is_ok() {
                        DecodedImage::from_encoded(&outcome.payload).map_err(|e| {
                            warn!(
                                key = completion.key(),
                                %url,
                                status = outcome.status,
                                error = %e,
                                "Failed to decode image"
                            );
                            ErrorKind::CouldNotCreateResource
                        })
                    } else {
                        Err(outcome.error)
                    };
                    completion.complete(result);
                });
            },
            callback,
        )
    }

    /// Install an already decoded image
    pub fn insert_image(&self, key: impl Into<String>, image: DecodedImage) -> Arc<DecodedImage> {
        self.cache.insert(key, image)
    }

    pub fn image(&self, key: &str) -> Option<Arc<DecodedImage>> {
        self.cache.get(key)
    }

    pub fn remove_image(&self, key: &str) -> Option<Arc<DecodedImage>> {
        self.cache.remove(key)
    }

    pub fn remove(&self, image: &Arc<DecodedImage>) -> bool {
        self.cache.remove_value(image)
    }

    pub fn cache(&self) -> &KeyedCache<DecodedImage> {
        &self.cache
    }
}
