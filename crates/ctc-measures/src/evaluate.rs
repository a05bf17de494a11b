//! Whole-run entrypoints: `calculate`, `check_consistency` and config runs.

use crate::cache::EvaluationCache;
use crate::error::{ErrorCategory, EvalError};
use crate::io::SingleSource;
use crate::layout::SequenceLayout;
use crate::measure::{run_aogm, MeasureOutcome, SequencePair};
use crate::options::{ConfigError, EvaluationConfig, EvaluationOptions};
use crate::tracking::{
    check_dataset, classify_frames, ConsistencyParams, ConsistencyReport, ConsistencyViolation,
    Dataset,
};
use ctc_measures_core::{Frame, PenaltyConfig, TrackSet};
use log::{info, warn};
use serde::{Deserialize, Serialize};
use std::fs;
use std::path::{Path, PathBuf};

#[cfg(feature = "tracing")]
use tracing::instrument;

/// AOGM of a sequence pair, with TRA when it can be normalised.
#[derive(Clone, Debug, PartialEq)]
pub struct Calculation {
    pub aogm: f64,
    /// `None` when the empty-result score is zero.
    pub tra: Option<f64>,
    /// Categorized operation log, present when `log_reports` is on.
    pub report: Option<String>,
    /// Violations reported under `InconsistencyPolicy::Report`.
    pub consistency: Option<ConsistencyReport>,
}

/// Score `res_dir` against `gt_dir` with the six weights in the order
/// split, FN vertex, FP vertex, redundant edge, missing edge, wrong semantics.
#[cfg_attr(
    feature = "tracing",
    instrument(level = "info", skip_all, fields(gt = %gt_dir.as_ref().display(), res = %res_dir.as_ref().display()))
)]
pub fn calculate(
    gt_dir: impl AsRef<Path>,
    res_dir: impl AsRef<Path>,
    digits: usize,
    weights: [f64; 6],
    options: &EvaluationOptions,
) -> Result<Calculation, EvalError> {
    let penalty = PenaltyConfig::from_array(weights)?;
    let inputs = SequencePair::new(gt_dir.as_ref(), res_dir.as_ref(), digits)
        .with_options(options.clone());
    let run = run_aogm(penalty, &inputs, &mut EvaluationCache::new())?;
    let result = run.value;
    let tra = result.tra().ok();
    if tra.is_none() {
        warn!("AOGM of an empty result is zero, TRA is undefined");
    }
    Ok(Calculation {
        aogm: result.aogm,
        tra,
        report: result.operation_log(),
        consistency: run.consistency,
    })
}

/// Result of checking one directory on its own.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct ConsistencyOutcome {
    pub dataset: Dataset,
    pub consistent: bool,
    pub violations: Vec<ConsistencyViolation>,
}

/// Check a GT or RES directory; the kind is told by its track file.
pub fn check_consistency(dir: impl AsRef<Path>, digits: usize) -> Result<ConsistencyOutcome, EvalError> {
    check_consistency_with(dir, digits, None, false)
}

/// [`check_consistency`] with an explicit dataset and the empty-image check.
#[cfg_attr(
    feature = "tracing",
    instrument(level = "info", skip(dir), fields(dir = %dir.as_ref().display()))
)]
pub fn check_consistency_with(
    dir: impl AsRef<Path>,
    digits: usize,
    dataset: Option<Dataset>,
    check_empty_images: bool,
) -> Result<ConsistencyOutcome, EvalError> {
    let dir = dir.as_ref();
    let layout = SequenceLayout::new(digits);
    let dataset = match dataset.or_else(|| layout.detect_dataset(dir)) {
        Some(d) => d,
        None => return Err(EvalError::UnknownDataset(dir.to_path_buf())),
    };

    let track_path = layout.track_file(dataset, dir);
    if !track_path.is_file() {
        return Err(EvalError::MissingTrackFile(track_path));
    }
    let tracks = TrackSet::load(&track_path)?;

    let source = SingleSource {
        files: layout.tracking_images(dataset, dir),
        dataset,
    };
    let n = source.files.count_consecutive();
    if n == 0 {
        return Err(EvalError::NoFrames(source.files.dir().to_path_buf()));
    }
    info!("checking {dataset} data in {}: {} tracks, {n} frames", dir.display(), tracks.len());
    let frames: Vec<Frame> = (0..n).collect();
    let records = classify_frames(&source, &frames)?;

    let report = check_dataset(
        dataset,
        &tracks,
        &records,
        &ConsistencyParams { check_empty_images },
    );
    for v in &report.violations {
        warn!("{v}");
    }
    Ok(ConsistencyOutcome {
        dataset,
        consistent: report.is_consistent(),
        violations: report.violations,
    })
}

/// A measure of a config run that could not be computed.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct MeasureFailure {
    pub name: String,
    pub category: ErrorCategory,
    pub error: String,
}

/// Every measure of a config run, in the order requested.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct EvaluationReport {
    pub gt_dir: PathBuf,
    pub res_dir: PathBuf,
    pub outcomes: Vec<MeasureOutcome>,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub failures: Vec<MeasureFailure>,
}

impl EvaluationReport {
    pub fn value(&self, name: &str) -> Option<f64> {
        self.outcomes.iter().find(|o| o.name == name).map(|o| o.value)
    }

    pub fn failure(&self, name: &str) -> Option<&MeasureFailure> {
        self.failures.iter().find(|f| f.name == name)
    }

    pub fn is_complete(&self) -> bool {
        self.failures.is_empty()
    }

    pub fn load_json(path: impl AsRef<Path>) -> Result<Self, ConfigError> {
        let raw = fs::read_to_string(path)?;
        Ok(serde_json::from_str(&raw)?)
    }

    pub fn write_json(&self, path: impl AsRef<Path>) -> Result<(), ConfigError> {
        let json = serde_json::to_string_pretty(self)?;
        fs::write(path, json)?;
        Ok(())
    }
}

/// Run the measures of `config` on one shared cache.
///
/// A measure whose preconditions do not hold (no GT divisions for BC, an
/// empty result for TRA) is recorded in [`EvaluationReport::failures`] and the
/// run goes on. Unreadable inputs and aborting inconsistencies end the run.
pub fn evaluate(config: &EvaluationConfig) -> Result<EvaluationReport, EvalError> {
    let penalty = config.validated_penalty()?;
    let inputs = SequencePair {
        gt_dir: config.gt_dir.clone(),
        res_dir: config.res_dir.clone(),
        layout: config.layout,
        options: config.options.clone(),
    };
    let mut cache = EvaluationCache::new();
    let mut outcomes = Vec::with_capacity(config.measures.len());
    let mut failures = Vec::new();
    for spec in &config.measures {
        match spec.build(penalty).compute(&inputs, &mut cache) {
            Ok(outcome) => {
                info!("{} = {}", outcome.name, outcome.value);
                outcomes.push(outcome);
            }
            Err(err) if err.category() == ErrorCategory::ComputationPrecondition => {
                let name = spec.to_string();
                warn!("{name} not computed: {err}");
                failures.push(MeasureFailure {
                    name,
                    category: err.category(),
                    error: err.to_string(),
                });
            }
            Err(err) => return Err(err),
        }
    }
    let report = EvaluationReport {
        gt_dir: config.gt_dir.clone(),
        res_dir: config.res_dir.clone(),
        outcomes,
        failures,
    };
    if let Some(path) = &config.report_path {
        report.write_json(path)?;
    }
    Ok(report)
}
