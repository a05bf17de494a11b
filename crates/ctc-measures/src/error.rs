use crate::options::ConfigError;
use crate::tracking::{ConsistencyReport, MeasureError};
use ctc_measures_core::{PenaltyError, TimepointsError, TrackFileError};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::path::PathBuf;

#[cfg(feature = "image")]
use crate::io::IoError;

/// Coarse failure class of an evaluation.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ErrorCategory {
    /// Malformed metadata, unreadable image or mismatched dimensions.
    InputFormat,
    /// Structural violations in the track metadata or image content.
    Consistency,
    /// No frames, no metadata file, nothing to normalise by.
    ComputationPrecondition,
}

impl fmt::Display for ErrorCategory {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            ErrorCategory::InputFormat => "input format",
            ErrorCategory::Consistency => "consistency",
            ErrorCategory::ComputationPrecondition => "computation precondition",
        })
    }
}

/// Terminal error of an evaluation.
#[derive(thiserror::Error, Debug)]
pub enum EvalError {
    #[cfg(feature = "image")]
    #[error(transparent)]
    Io(#[from] IoError),

    #[error(transparent)]
    TrackFile(#[from] TrackFileError),

    #[error("track file '{0}' not found")]
    MissingTrackFile(PathBuf),

    #[error("no frames found in '{0}'")]
    NoFrames(PathBuf),

    #[error("cannot tell whether '{0}' holds ground truth or result data")]
    UnknownDataset(PathBuf),

    #[error(transparent)]
    Measure(#[from] MeasureError),

    #[error("inconsistent input data ({} violations)", .0.violations.len())]
    Inconsistent(ConsistencyReport),

    #[error(transparent)]
    Penalty(#[from] PenaltyError),

    #[error(transparent)]
    Timepoints(#[from] TimepointsError),

    #[error(transparent)]
    Config(#[from] ConfigError),
}

impl EvalError {
    pub fn category(&self) -> ErrorCategory {
        match self {
            #[cfg(feature = "image")]
            EvalError::Io(_) => ErrorCategory::InputFormat,
            EvalError::TrackFile(_)
            | EvalError::UnknownDataset(_)
            | EvalError::Penalty(_)
            | EvalError::Timepoints(_)
            | EvalError::Config(_) => ErrorCategory::InputFormat,
            EvalError::MissingTrackFile(_) | EvalError::NoFrames(_) => {
                ErrorCategory::ComputationPrecondition
            }
            EvalError::Inconsistent(_) => ErrorCategory::Consistency,
            EvalError::Measure(e) => match e {
                MeasureError::Match { .. }
                | MeasureError::FrameDimensions { .. }
                | MeasureError::Penalty(_) => ErrorCategory::InputFormat,
                MeasureError::Lineage { .. } => ErrorCategory::Consistency,
                _ => ErrorCategory::ComputationPrecondition,
            },
        }
    }
}
