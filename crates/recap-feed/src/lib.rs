//! # Recap Feed
//!
//! This crate models the daily schedule payload served by the stats API and
//! turns it into the flat list of recaps shown by the carousel.
//!
//! ## Features
//!
//! - Lenient serde model of the schedule JSON (missing fields default)
//! - Extraction of one [`Recap`] per game from the `mlb` editorial perspective
//! - Thumbnail cut selection and description fallback rules
//!
//! ## License
//!
//! MIT License
//!
//! ## Authors
//!
//! - hua0512
//!

pub mod error;
pub mod model;
pub mod recap;

#[cfg(test)]
pub(crate) mod test_utils;

pub use error::FeedError;
pub use model::{
    Editorial, Game, GameContent, GameDate, GameRecap, ImageCut, RecapImage, ScheduleData,
};
pub use recap::{ExtractOptions, MISSING_DESCRIPTION, Recap, extract_recaps};
