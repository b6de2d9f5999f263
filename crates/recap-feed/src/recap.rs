//! # Recap extraction
//!
//! Flattens a [`ScheduleData`] into the recaps the carousel displays: one per
//! game, read from the league editorial perspective, with a thumbnail cut of
//! the requested geometry and a best-effort description.

use serde::{Deserialize, Serialize};
use tracing::warn;

use crate::model::{GameRecap, ImageCut, ScheduleData};

/// Description used when a recap offers nothing better than its headline
pub const MISSING_DESCRIPTION: &str = "You're Out! Could not find a valid description.";

/// Knobs for [`extract_recaps`]
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct ExtractOptions {
    /// Aspect ratio of the thumbnail cut, e.g. `16:9`
    pub aspect_ratio: String,
    pub width: u32,
    pub height: u32,
    /// Blurbs longer than this many characters are truncated and ellipsized
    pub description_limit: usize,
}

impl Default for ExtractOptions {
    fn default() -> Self {
        Self {
            aspect_ratio: "16:9".to_owned(),
            width: 480,
            height: 270,
            description_limit: 200,
        }
    }
}

impl ExtractOptions {
    fn matches(&self, cut: &ImageCut) -> bool {
        cut.aspect_ratio == self.aspect_ratio
            && cut.width == self.width
            && cut.height == self.height
    }
}

/// One carousel entry
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Recap {
    /// Feed date the recap belongs to
    pub date: String,
    /// Game key, unique within a date
    pub park: u32,
    pub headline: String,
    pub description: String,
    pub thumbnail_url: String,
}

/// Build the recap list for `date`.
///
/// Only the first date of the payload is considered. Games without a league
/// recap or without a matching thumbnail cut are skipped.
pub fn extract_recaps(date: &str, data: &ScheduleData, options: &ExtractOptions) -> Vec<Recap> {
    let Some(game_day) = data.dates.first() else {
        return Vec::new();
    };

    let mut recaps = Vec::with_capacity(game_day.games.len());
    for game in &game_day.games {
        let park = game.game_pk;
        let Some(recap) = game.content.editorial.mlb_recap() else {
            warn!(date, park, "Game has no mlb recap, skipping");
            continue;
        };

        let Some(cut) = recap.image.cuts.iter().find(|cut| options.matches(cut)) else {
            warn!(
                date,
                park,
                aspect_ratio = %options.aspect_ratio,
                width = options.width,
                height = options.height,
                "No matching thumbnail cut, skipping"
            );
            continue;
        };

        recaps.push(Recap {
            date: date.to_owned(),
            park,
            headline: recap.headline.clone(),
            description: describe(recap, options.description_limit),
            thumbnail_url: cut.src.clone(),
        });
    }

    recaps
}

fn describe(recap: &GameRecap, limit: usize) -> String {
    let headline = &recap.headline;
    if !recap.subhead.is_empty() && &recap.subhead != headline {
        return recap.subhead.clone();
    }
    if !recap.seo_title.is_empty() && &recap.seo_title != headline {
        return recap.seo_title.clone();
    }
    if !recap.blurb.is_empty() {
        return match recap.blurb.char_indices().nth(limit) {
            Some((cut, _)) => format!("{}...", &recap.blurb[..cut]),
            None => recap.blurb.clone(),
        };
    }
    MISSING_DESCRIPTION.to_owned()
}
