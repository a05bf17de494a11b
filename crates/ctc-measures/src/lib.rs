//! Cell Tracking Challenge accuracy measures on label image sequences.
//!
//! This crate provides:
//! - re-exports of the data model ([`core`]) and the measurement engine
//!   ([`tracking`]),
//! - (feature `image`) decoding of 16-bit label TIFFs and the GT/RES
//!   directory layout,
//! - the [`Measure`] capability trait with one implementation per measure
//!   (AOGM, TRA, DET, SEG, CT, TF, BC(i), CCA) sharing an explicit
//!   [`EvaluationCache`],
//! - the `calculate` and `check_consistency` entrypoints and a JSON
//!   configured run ([`evaluate()`]).
//!
//! ## Quickstart
//!
//! ```no_run
//! use ctc_measures::{calculate, EvaluationOptions, PenaltyConfig};
//!
//! # fn main() -> Result<(), Box<dyn std::error::Error>> {
//! let weights = PenaltyConfig::ctc().to_array();
//! let calc = calculate("01_GT", "01_RES", 3, weights, &EvaluationOptions::default())?;
//! println!("AOGM = {}, TRA = {:?}", calc.aogm, calc.tra);
//! # Ok(())
//! # }
//! ```
//!
//! Several measures on the same pair reuse the classified frames:
//!
//! ```no_run
//! use ctc_measures::{Det, EvaluationCache, Measure, Seg, SequencePair, Tra};
//!
//! # fn main() -> Result<(), Box<dyn std::error::Error>> {
//! let pair = SequencePair::new("01_GT", "01_RES", 3);
//! let mut cache = EvaluationCache::new();
//! let tra = Tra::default().compute(&pair, &mut cache)?;
//! let det = Det::default().compute(&pair, &mut cache)?;
//! let seg = Seg.compute(&pair, &mut cache)?;
//! println!("{} {} {}", tra.value, det.value, seg.value);
//! # Ok(())
//! # }
//! ```
//!
//! ## API map
//! - `ctc_measures::core`: labels, tracks, penalty weights, timepoint sets.
//! - `ctc_measures::tracking`: frame classification, lineage graphs,
//!   consistency checking and the scorers, on in-memory images.
//! - `ctc_measures::io` (feature `image`): label image loading and saving.

pub use ctc_measures_core as core;
pub use ctc_measures_tracking as tracking;

mod cache;
mod error;
mod layout;
mod options;

#[cfg(feature = "image")]
mod evaluate;
#[cfg(feature = "image")]
pub mod io;
#[cfg(feature = "image")]
mod measure;

pub use cache::{CacheKey, EvaluationCache};
pub use error::{ErrorCategory, EvalError};
pub use layout::{FrameFiles, SequenceLayout, DEFAULT_DIGITS};
pub use options::{
    ConfigError, EvaluationConfig, EvaluationOptions, InconsistencyPolicy, MeasureSpec,
};

#[cfg(feature = "image")]
pub use evaluate::{
    calculate, check_consistency, check_consistency_with, evaluate, Calculation,
    ConsistencyOutcome, EvaluationReport, MeasureFailure,
};
#[cfg(feature = "image")]
pub use measure::{
    Aogm, BranchingCorrectness, CellCycleAccuracy, CompleteTracks, Det, Measure, MeasureOutcome,
    MeasureReport, Seg, SequencePair, Tra, TrackFractions,
};

pub use ctc_measures_core::{Frame, Label, PenaltyConfig, TrackSet};
pub use ctc_measures_tracking::{ConsistencyReport, Dataset};
