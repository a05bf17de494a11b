//! Cell tracking accuracy measures on in-memory label sequences.
//!
//! Pipeline:
//! 1. every frame pair is classified independently ([`classify_frame`],
//!    [`classify_frames`]) into a [`FrameClassification`] keeping only
//!    object sizes and overlaps,
//! 2. the frame records and both track sets live in a [`TrackDataCache`],
//!    which builds the GT and RES [`LineageGraph`]s on demand,
//! 3. [`check_consistency`] validates the track metadata against the images,
//! 4. scorers turn the cached data into numbers: [`AogmScorer`] (AOGM, TRA),
//!    [`DetScorer`], [`SegScorer`] and the track-level [`bio`] measures.
//!
//! Image decoding and directory layouts are handled by the `ctc-measures`
//! facade crate.

mod aogm;
pub mod bio;
mod cache;
mod consistency;
mod det;
mod error;
mod lineage;
mod matching;
mod report;
mod seg;

#[cfg(test)]
mod testutil;

pub use aogm::{
    render_operation_log, AogmCounts, AogmResult, AogmScorer, OperationKind, OperationRecord,
};
pub use cache::{classify_frames, FrameRecord, FrameSource, SequenceView, TrackDataCache};
pub use consistency::{
    check_consistency, check_dataset, check_empty_images, ConsistencyParams, ConsistencyReport,
    ConsistencyViolation, ViolationCategory, ViolationKind,
};
pub use det::{DetResult, DetScorer};
pub use error::{Dataset, MeasureError};
pub use lineage::{EdgeKind, LabeledObject, LineageEdge, LineageError, LineageGraph};
pub use matching::{classify_frame, Correspondence, FrameClassification, MatchError, Overlap};
pub use report::{FrameMatching, GtMatchEntry, MatchingReport, ResMatchEntry};
pub use seg::{SegObjectScore, SegResult, SegScorer};

pub use ctc_measures_core::{Frame, Label, LabelImage, LabelImageView, PenaltyConfig, Track, TrackSet};
