use std::fmt;
use std::sync::Arc;
use std::sync::atomic::{AtomicU8, Ordering};

use recap_feed::{ExtractOptions, Recap, ScheduleData, extract_recaps};
use tracing::warn;

/// Load state of a recap thumbnail
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
#[repr(u8)]
pub enum ThumbnailState {
    Unloaded = 0,
    Loading = 1,
    Loaded = 2,
    Error = 3,
}

impl ThumbnailState {
    fn from_u8(value: u8) -> Self {
        match value {
            0 => ThumbnailState::Unloaded,
            1 => ThumbnailState::Loading,
            2 => ThumbnailState::Loaded,
            _ => ThumbnailState::Error,
        }
    }

    /// Loaded or failed
    pub fn is_settled(self) -> bool {
        matches!(self, ThumbnailState::Loaded | ThumbnailState::Error)
    }
}

/// Thumbnail state shared between the render thread and fetch workers.
///
/// Only `Unloaded -> Loading` and `Loading -> Loaded | Error` are accepted.
pub struct ThumbnailCell {
    state: AtomicU8,
}

impl ThumbnailCell {
    pub fn new() -> Self {
        Self {
            state: AtomicU8::new(ThumbnailState::Unloaded as u8),
        }
    }

    pub fn get(&self) -> ThumbnailState {
        ThumbnailState::from_u8(self.state.load(Ordering::Acquire))
    }

    /// Mark the thumbnail as requested
    pub fn begin_loading(&self) -> bool {
        self.transition(ThumbnailState::Unloaded, ThumbnailState::Loading)
    }

    /// Settle a requested thumbnail
    pub fn finish(&self, ok: bool) -> bool {
        let to = if ok {
            ThumbnailState::Loaded
        } else {
            ThumbnailState::Error
        };
        self.transition(ThumbnailState::Loading, to)
    }

    fn transition(&self, from: ThumbnailState, to: ThumbnailState) -> bool {
        match self
            .state
            .compare_exchange(from as u8, to as u8, Ordering::AcqRel, Ordering::Acquire)
        {
            Ok(_) => true,
            Err(actual) => {
                warn!(
                    from = ?from,
                    to = ?to,
                    actual = ?ThumbnailState::from_u8(actual),
                    "Rejected thumbnail state transition"
                );
                false
            }
        }
    }
}

impl Default for ThumbnailCell {
    fn default() -> Self {
        Self::new()
    }
}

impl fmt::Debug for ThumbnailCell {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_tuple("ThumbnailCell").field(&self.get()).finish()
    }
}

/// One carousel entry and its thumbnail state
#[derive(Debug)]
pub struct FeedItem {
    pub recap: Recap,
    pub thumbnail: ThumbnailCell,
}

impl FeedItem {
    pub fn new(recap: Recap) -> Self {
        Self {
            recap,
            thumbnail: ThumbnailCell::new(),
        }
    }
}

/// The recaps of one date
#[derive(Debug)]
pub struct Feed {
    pub date: String,
    pub items: Vec<Arc<FeedItem>>,
}

impl Feed {
    pub fn from_schedule(date: &str, data: &ScheduleData, options: &ExtractOptions) -> Self {
        let items = extract_recaps(date, data, options)
            .into_iter()
            .map(|recap| Arc::new(FeedItem::new(recap)))
            .collect();
        Self {
            date: date.to_owned(),
            items,
        }
    }

    pub fn len(&self) -> usize {
        self.items.len()
    }

    pub fn is_empty(&self) -> bool {
        self.items.is_empty()
    }

    pub fn item(&self, index: usize) -> Option<&Arc<FeedItem>> {
        self.items.get(index)
    }

    /// Whether every thumbnail has loaded or failed
    pub fn thumbnails_settled(&self) -> bool {
        self.items.iter().all(|item| item.thumbnail.get().is_settled())
    }
}
