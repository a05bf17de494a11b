//! Evaluation options and the JSON run configuration.

use crate::layout::{SequenceLayout, DEFAULT_DIGITS};
use ctc_measures_core::{parse_timepoints, Frame, PenaltyConfig, PenaltyError, TimepointsError};
use serde::{Deserialize, Serialize};
use std::collections::BTreeSet;
use std::fmt;
use std::fs;
use std::path::{Path, PathBuf};

#[derive(thiserror::Error, Debug)]
pub enum ConfigError {
    #[error(transparent)]
    Io(#[from] std::io::Error),
    #[error(transparent)]
    Json(#[from] serde_json::Error),
}

/// What to do when the consistency check finds violations.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum InconsistencyPolicy {
    /// Fail the calculation with a consistency error.
    #[default]
    Abort,
    /// Log every violation, attach them to the outcome and score anyway.
    Report,
}

#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct EvaluationOptions {
    pub consistency_check: bool,
    /// Collect and log the categorized operation records.
    pub log_reports: bool,
    /// Collect and log the per-frame GT/RES matching.
    pub matching_reports: bool,
    /// Treat background-only images as violations.
    pub stop_on_empty_images: bool,
    /// Frames DET and SEG are limited to; `None` means all.
    pub restrict_to_timepoints: Option<BTreeSet<Frame>>,
    pub inconsistency_policy: InconsistencyPolicy,
    /// SEG also lists the RES labels of every scored frame.
    pub report_all_res_labels: bool,
}

impl Default for EvaluationOptions {
    fn default() -> Self {
        Self {
            consistency_check: true,
            log_reports: true,
            matching_reports: false,
            stop_on_empty_images: false,
            restrict_to_timepoints: None,
            inconsistency_policy: InconsistencyPolicy::Abort,
            report_all_res_labels: false,
        }
    }
}

impl EvaluationOptions {
    /// Restrict to the frames of a selection such as `"1-9,23,25"`; empty selects all.
    pub fn with_timepoints(mut self, selection: &str) -> Result<Self, TimepointsError> {
        let set = parse_timepoints(selection)?;
        self.restrict_to_timepoints = (!set.is_empty()).then_some(set);
        Ok(self)
    }

    /// Whether `frame` passes the timepoint restriction.
    pub fn selects(&self, frame: Frame) -> bool {
        self.restrict_to_timepoints
            .as_ref()
            .map_or(true, |set| set.contains(&frame))
    }
}

/// One measure to run, as written in a config file.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case", tag = "measure")]
pub enum MeasureSpec {
    Aogm,
    Tra,
    Det,
    Seg,
    Ct,
    Tf,
    Bc { i: u32 },
    Cca,
}

/// Prints the name the measure's outcome is reported under.
impl fmt::Display for MeasureSpec {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            MeasureSpec::Aogm => f.write_str("AOGM"),
            MeasureSpec::Tra => f.write_str("TRA"),
            MeasureSpec::Det => f.write_str("DET"),
            MeasureSpec::Seg => f.write_str("SEG"),
            MeasureSpec::Ct => f.write_str("CT"),
            MeasureSpec::Tf => f.write_str("TF"),
            MeasureSpec::Bc { i } => write!(f, "BC({i})"),
            MeasureSpec::Cca => f.write_str("CCA"),
        }
    }
}

fn default_measures() -> Vec<MeasureSpec> {
    vec![MeasureSpec::Tra]
}

/// A complete run: inputs, weights, options and the measures to compute.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct EvaluationConfig {
    pub gt_dir: PathBuf,
    pub res_dir: PathBuf,
    #[serde(flatten)]
    pub layout: SequenceLayout,
    #[serde(default)]
    pub penalty: PenaltyConfig,
    #[serde(default)]
    pub options: EvaluationOptions,
    #[serde(default = "default_measures")]
    pub measures: Vec<MeasureSpec>,
    #[serde(default)]
    pub report_path: Option<PathBuf>,
}

impl EvaluationConfig {
    pub fn new(gt_dir: impl Into<PathBuf>, res_dir: impl Into<PathBuf>) -> Self {
        Self {
            gt_dir: gt_dir.into(),
            res_dir: res_dir.into(),
            layout: SequenceLayout::new(DEFAULT_DIGITS),
            penalty: PenaltyConfig::ctc(),
            options: EvaluationOptions::default(),
            measures: default_measures(),
            report_path: None,
        }
    }

    /// Load a JSON config from disk.
    pub fn load_json(path: impl AsRef<Path>) -> Result<Self, ConfigError> {
        let raw = fs::read_to_string(path)?;
        Ok(serde_json::from_str(&raw)?)
    }

    /// Write this config to disk as pretty JSON.
    pub fn write_json(&self, path: impl AsRef<Path>) -> Result<(), ConfigError> {
        let json = serde_json::to_string_pretty(self)?;
        fs::write(path, json)?;
        Ok(())
    }

    /// Weights from the file, checked for sign and finiteness.
    pub fn validated_penalty(&self) -> Result<PenaltyConfig, PenaltyError> {
        PenaltyConfig::from_array(self.penalty.to_array())
    }
}
