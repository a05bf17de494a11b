//! Core types for cell tracking accuracy measures.
//!
//! This crate is intentionally small. It holds the data model shared by the
//! measurement crates (label images, track metadata, penalty weights) and
//! does *not* decode images from disk.

mod label;
mod logger;
mod penalty;
mod timepoints;
mod track;

pub use label::{Frame, Label, LabelImage, LabelImageError, LabelImageView, BACKGROUND};
pub use penalty::{PenaltyConfig, PenaltyError};
pub use timepoints::{parse_timepoints, TimepointsError};
pub use track::{Track, TrackFileError, TrackSet};

#[cfg(feature = "tracing")]
pub use logger::init_tracing;

pub use logger::{init_with_level, Verbosity};
