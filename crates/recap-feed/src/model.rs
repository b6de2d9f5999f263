//! # Schedule model
//!
//! Serde structures mirroring the parts of the schedule payload the carousel
//! reads. Every field defaults when absent so a partially hydrated payload
//! still decodes; a syntactically broken payload or a field of the wrong type
//! is rejected.

use std::collections::HashMap;

use serde::{Deserialize, Serialize};

use crate::FeedError;

/// Editorial perspective the carousel reads recaps from
pub const MLB_PERSPECTIVE: &str = "mlb";

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct ImageCut {
    pub aspect_ratio: String,
    pub width: u32,
    pub height: u32,
    pub src: String,
    pub at2x: String,
    pub at3x: String,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct RecapImage {
    pub title: String,
    pub alt_text: String,
    pub cuts: Vec<ImageCut>,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct GameRecap {
    pub date: String,
    pub headline: String,
    pub subhead: String,
    pub seo_title: String,
    pub blurb: String,
    pub image: RecapImage,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct Editorial {
    /// Recaps keyed by perspective (`mlb`, `home`, `away`, ...)
    pub recap: HashMap<String, GameRecap>,
}

impl Editorial {
    /// The recap written from the league perspective, if present
    pub fn mlb_recap(&self) -> Option<&GameRecap> {
        self.recap.get(MLB_PERSPECTIVE)
    }
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct GameContent {
    pub editorial: Editorial,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct Game {
    pub game_date: String,
    /// Unique game key, used as the item id in cache keys
    pub game_pk: u32,
    pub content: GameContent,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct GameDate {
    pub date: String,
    pub games: Vec<Game>,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct ScheduleData {
    pub copyright: String,
    pub dates: Vec<GameDate>,
}

impl ScheduleData {
    /// Decode a schedule payload
    pub fn from_slice(payload: &[u8]) -> Result<Self, FeedError> {
        if payload.is_empty() {
            return Err(FeedError::Empty);
        }
        Ok(serde_json::from_slice(payload)?)
    }

    /// Number of games on the first listed date.
    ///
    /// A daily payload carries at most one date; anything past the first is ignored.
    pub fn game_count(&self) -> usize {
        self.dates.first().map_or(0, |d| d.games.len())
    }

    /// Game at `index` on the first listed date
    pub fn game(&self, index: usize) -> Option<&Game> {
        self.dates.first().and_then(|d| d.games.get(index))
    }
}
