//! Rendered-text cache.
//!
//! Strings are rasterized once per key through a [`TextRenderer`] and kept
//! as RGBA8 bitmaps until removed.

mod raster;

use std::sync::Arc;

use bytes::Bytes;
use serde::{Deserialize, Serialize};
use tracing::warn;

pub use raster::FontdueRenderer;

use crate::ErrorKind;
use crate::cache::{CacheStatus, KeyedCache};

/// Font faces available to the carousel
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum FontFace {
    Roboto20,
    Roboto22,
    Roboto36,
    Roboto48,
}

impl FontFace {
    pub const ALL: [FontFace; 4] = [
        FontFace::Roboto20,
        FontFace::Roboto22,
        FontFace::Roboto36,
        FontFace::Roboto48,
    ];

    /// Pixel size the face is rasterized at
    pub fn point_size(self) -> u32 {
        match self {
            FontFace::Roboto20 => 20,
            FontFace::Roboto22 => 22,
            FontFace::Roboto36 => 36,
            FontFace::Roboto48 => 48,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct Rgba {
    pub r: u8,
    pub g: u8,
    pub b: u8,
    pub a: u8,
}

impl Rgba {
    pub const WHITE: Rgba = Rgba::new(255, 255, 255, 255);
    pub const BLACK: Rgba = Rgba::new(0, 0, 0, 255);

    pub const fn new(r: u8, g: u8, b: u8, a: u8) -> Self {
        Self { r, g, b, a }
    }
}

/// How a string is rendered
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct TextStyle {
    pub font: FontFace,
    pub color: Rgba,
    /// Wrap width in pixels; `0` renders a single line
    pub wrap: u32,
}

impl TextStyle {
    pub fn new(font: FontFace, color: Rgba, wrap: u32) -> Self {
        Self { font, color, wrap }
    }
}

/// A rasterized string, RGBA8 rows top to bottom
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RenderedText {
    pub width: u32,
    pub height: u32,
    pub pixels: Bytes,
}

#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum RenderError {
    #[error("Text has zero width")]
    EmptyText,

    #[error("Font error: {0}")]
    Font(String),

    #[error("Rendered text of {width}x{height} is too large")]
    TooLarge { width: u32, height: u32 },
}

/// Font rasterization boundary. Called from worker threads.
pub trait TextRenderer: Send + Sync {
    fn render(&self, style: &TextStyle, text: &str) -> Result<RenderedText, RenderError>;
}

/// Cache of rendered strings keyed by name
pub struct TextService {
    cache: KeyedCache<RenderedText>,
    renderer: Arc<dyn TextRenderer>,
}

impl TextService {
    pub fn new(renderer: Arc<dyn TextRenderer>) -> Self {
        Self {
            cache: KeyedCache::new("text"),
            renderer,
        }
    }

    /// Rendered text of `key`, rendering `text` in-line on a miss
    pub fn add_string(
        &self,
        style: &TextStyle,
        key: &str,
        text: &str,
    ) -> Result<Arc<RenderedText>, ErrorKind> {
        if key.is_empty() {
            return Err(ErrorKind::NoResourceName);
        }
        if let Some(cached) = self.cache.get(key) {
            return Ok(cached);
        }

        let rendered = render(self.renderer.as_ref(), style, key, text)?;
        Ok(self.cache.insert(key, rendered))
    }

    /// Asynchronous form of [`add_string`](Self::add_string).
    ///
    /// A miss renders on the calling thread before `callback` runs.
    pub fn request_string<C>(
        &self,
        key: impl Into<String>,
        style: TextStyle,
        text: impl Into<String>,
        callback: C,
    ) -> CacheStatus
    where
        C: FnOnce(ErrorKind, Option<Arc<RenderedText>>) + Send + 'static,
    {
        let key = key.into();
        if key.is_empty() {
            callback(ErrorKind::NoResourceName, None);
            return CacheStatus::Miss;
        }

        let renderer = Arc::clone(&self.renderer);
        let text = text.into();
        self.cache.request(
            key,
            move |completion| {
                let result = render(renderer.as_ref(), &style, completion.key(), &text);
                completion.complete(result);
            },
            callback,
        )
    }

    pub fn string(&self, key: &str) -> Option<Arc<RenderedText>> {
        self.cache.get(key)
    }

    pub fn remove_string(&self, key: &str) -> Option<Arc<RenderedText>> {
        self.cache.remove(key)
    }

    pub fn remove(&self, rendered: &Arc<RenderedText>) -> bool {
        self.cache.remove_value(rendered)
    }

    pub fn cache(&self) -> &KeyedCache<RenderedText> {
        &self.cache
    }
}

fn render(
    renderer: &dyn TextRenderer,
    style: &TextStyle,
    key: &str,
    text: &str,
) -> Result<RenderedText, ErrorKind> {
    renderer.render(style, text).map_err(|e| {
        warn!(%key, font = ?style.font, error = %e, "Failed to render text");
        ErrorKind::CouldNotCreateResource
    })
}
