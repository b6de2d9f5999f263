//! # Carousel Engine
//!
//! Background fetching and caching for a daily game-recap carousel.
//! Resources are fetched on a fixed pool of OS threads and decoded into
//! keyed caches shared with the render thread.
//!
//! ## Features
//!
//! - Fixed-size worker pool with FIFO dispatch and drop-on-shutdown
//! - `file://` and `http(s)://` fetching with retry and exponential backoff
//! - Keyed caches with an asynchronous fill protocol
//! - Image, rendered-text and daily feed caches built on that protocol
//! - Lock-free thumbnail load state per recap

pub mod builder;
pub mod cache;
pub mod config;
pub mod engine;
pub mod error;
pub mod feed;
pub mod fetcher;
pub mod image;
pub mod pool;
pub mod text;

#[cfg(test)]
pub(crate) mod test_utils;

pub use builder::EngineConfigBuilder;
pub use cache::{CacheStats, CacheStatus, Completion, KeyedCache};
pub use config::{EngineConfig, FeedConfig, FetchConfig};
pub use engine::CarouselEngine;
pub use error::{EngineError, ErrorKind};
pub use feed::{Feed, FeedItem, FeedService, ThumbnailCell, ThumbnailState};
pub use fetcher::{FetchOutcome, HttpTransport, ResourceFetcher, Transport, create_client};
pub use image::{DecodedImage, ImageService};
pub use pool::{Job, WorkerPool, WorkerStats};
pub use text::{FontFace, FontdueRenderer, RenderedText, Rgba, TextRenderer, TextService, TextStyle};

// Re-export the feed model
pub use recap_feed::{ExtractOptions, Recap, ScheduleData};
