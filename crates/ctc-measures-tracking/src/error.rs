use crate::lineage::LineageError;
use crate::matching::MatchError;
use ctc_measures_core::{Frame, PenaltyError};
use serde::{Deserialize, Serialize};
use std::fmt;

/// Which side of the comparison a record belongs to.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Dataset {
    #[serde(rename = "gt")]
    GroundTruth,
    #[serde(rename = "res")]
    Result,
}

impl fmt::Display for Dataset {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Dataset::GroundTruth => f.write_str("GT"),
            Dataset::Result => f.write_str("RES"),
        }
    }
}

/// Errors returned by the measures of this crate.
#[derive(thiserror::Error, Debug, Clone, PartialEq)]
pub enum MeasureError {
    #[error("no frames were classified")]
    NoFrames,
    #[error("frame {frame}: {source}")]
    Match {
        frame: Frame,
        #[source]
        source: MatchError,
    },
    #[error("frame {frame} has size {got:?} but the sequence started with {expected:?}")]
    FrameDimensions {
        frame: Frame,
        expected: (usize, usize),
        got: (usize, usize),
    },
    #[error("frames must arrive in increasing order (frame {got} after {after})")]
    FrameOrder { after: Frame, got: Frame },
    #[error("{0} track metadata is required but was not loaded")]
    MissingTracks(Dataset),
    #[error("{dataset} lineage: {source}")]
    Lineage {
        dataset: Dataset,
        #[source]
        source: LineageError,
    },
    #[error(transparent)]
    Penalty(#[from] PenaltyError),
    #[error("ground truth contains no objects")]
    NoGroundTruthObjects,
    #[error("the score of an empty result is zero, cannot normalise")]
    DegenerateNormalization,
    #[error("ground truth contains no division events")]
    NoGroundTruthDivisions,
    #[error("ground truth contains no complete cell cycles")]
    NoGroundTruthCycles,
}
