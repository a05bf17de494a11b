//! The measures behind one capability interface.
//!
//! Every measure borrows the caller's [`EvaluationCache`], so a caller
//! running TRA, DET and SEG on the same pair classifies each frame only once,
//! and a measure that fails leaves the frames classified so far in place.

use crate::cache::{CacheKey, EvaluationCache};
use crate::error::EvalError;
use crate::io::{IoError, PairSource};
use crate::layout::SequenceLayout;
use crate::options::{EvaluationOptions, InconsistencyPolicy, MeasureSpec};
use crate::tracking::bio::{
    branching_correctness, cell_cycle_accuracy, complete_tracks, track_fractions,
    BranchingResult, CellCycleResult, CompleteTracksResult, TrackFractionsResult,
};
use crate::tracking::{
    self, classify_frames, AogmResult, AogmScorer, ConsistencyParams, ConsistencyReport, Dataset,
    DetResult, DetScorer, FrameRecord, MatchingReport, MeasureError, SegResult, SegScorer,
    SequenceView, TrackDataCache,
};
use ctc_measures_core::{Frame, PenaltyConfig, TrackSet};
use log::{info, warn};
use serde::{Deserialize, Serialize};
use std::borrow::Cow;
use std::path::{Path, PathBuf};

/// The GT/RES directories of one sequence and how to evaluate them.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct SequencePair {
    pub gt_dir: PathBuf,
    pub res_dir: PathBuf,
    pub layout: SequenceLayout,
    pub options: EvaluationOptions,
}

impl SequencePair {
    pub fn new(gt_dir: impl Into<PathBuf>, res_dir: impl Into<PathBuf>, digits: usize) -> Self {
        Self {
            gt_dir: gt_dir.into(),
            res_dir: res_dir.into(),
            layout: SequenceLayout::new(digits),
            options: EvaluationOptions::default(),
        }
    }

    pub fn with_options(mut self, options: EvaluationOptions) -> Self {
        self.options = options;
        self
    }

    pub fn key(&self) -> CacheKey {
        CacheKey {
            gt_dir: self.gt_dir.clone(),
            res_dir: self.res_dir.clone(),
            layout: self.layout,
        }
    }

    fn tracking_files(&self) -> PairSource {
        PairSource {
            gt: self
                .layout
                .tracking_images(Dataset::GroundTruth, &self.gt_dir),
            res: self.layout.tracking_images(Dataset::Result, &self.res_dir),
        }
    }

    fn segmentation_files(&self) -> PairSource {
        PairSource {
            gt: self.layout.segmentation_images(&self.gt_dir),
            res: self.layout.tracking_images(Dataset::Result, &self.res_dir),
        }
    }
}

/// Detailed result of one measure.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case", tag = "measure")]
pub enum MeasureReport {
    Aogm(AogmResult),
    Det(DetResult),
    Seg(SegResult),
    CompleteTracks(CompleteTracksResult),
    TrackFractions(TrackFractionsResult),
    BranchingCorrectness(BranchingResult),
    CellCycleAccuracy(CellCycleResult),
}

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct MeasureOutcome {
    pub name: String,
    pub value: f64,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub report: Option<MeasureReport>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub matching: Option<MatchingReport>,
    /// Violations that were reported but did not stop the calculation.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub consistency: Option<ConsistencyReport>,
}

impl MeasureOutcome {
    fn new(name: impl Into<String>, value: f64) -> Self {
        Self {
            name: name.into(),
            value,
            report: None,
            matching: None,
            consistency: None,
        }
    }
}

/// A measure computed from a sequence pair.
pub trait Measure {
    fn name(&self) -> &'static str;

    fn compute(
        &self,
        inputs: &SequencePair,
        cache: &mut EvaluationCache,
    ) -> Result<MeasureOutcome, EvalError>;
}

impl MeasureSpec {
    /// Build the measure; AOGM uses `penalty`, TRA and DET their fixed presets.
    pub fn build(self, penalty: PenaltyConfig) -> Box<dyn Measure> {
        match self {
            MeasureSpec::Aogm => Box::new(Aogm::new(penalty)),
            MeasureSpec::Tra => Box::new(Tra::default()),
            MeasureSpec::Det => Box::new(Det::default()),
            MeasureSpec::Seg => Box::new(Seg),
            MeasureSpec::Ct => Box::new(CompleteTracks),
            MeasureSpec::Tf => Box::new(TrackFractions),
            MeasureSpec::Bc { i } => Box::new(BranchingCorrectness { i }),
            MeasureSpec::Cca => Box::new(CellCycleAccuracy),
        }
    }
}

fn load_tracks(layout: &SequenceLayout, dataset: Dataset, dir: &Path) -> Result<TrackSet, EvalError> {
    let path = layout.track_file(dataset, dir);
    if !path.is_file() {
        return Err(EvalError::MissingTrackFile(path));
    }
    let tracks = TrackSet::load(&path)?;
    info!("{dataset}: {} tracks read from {}", tracks.len(), path.display());
    Ok(tracks)
}

/// Classify every tracking frame once; attach track metadata when asked.
fn ensure_tracking(
    inputs: &SequencePair,
    cache: &mut EvaluationCache,
    with_tracks: bool,
) -> Result<(), EvalError> {
    if cache.tracking().is_none() {
        let files = inputs.tracking_files();
        let n = files.gt.count_consecutive();
        if n == 0 {
            return Err(EvalError::NoFrames(files.gt.dir().to_path_buf()));
        }
        info!("classifying {n} frames against {}", inputs.res_dir.display());
        let frames: Vec<Frame> = (0..n).collect();
        let records = classify_frames(&files, &frames)?;
        cache.set_tracking(TrackDataCache::from_frames(records)?);
    }
    if with_tracks {
        if let Some(t) = cache.tracking_mut() {
            if !t.has_tracks() {
                let gt = load_tracks(&inputs.layout, Dataset::GroundTruth, &inputs.gt_dir)?;
                let res = load_tracks(&inputs.layout, Dataset::Result, &inputs.res_dir)?;
                t.set_tracks(Dataset::GroundTruth, gt);
                t.set_tracks(Dataset::Result, res);
            }
        }
    }
    Ok(())
}

/// Tracking frames selected by the timepoint restriction.
fn tracking_frames<'c>(
    inputs: &SequencePair,
    cache: &'c mut EvaluationCache,
) -> Result<Cow<'c, [FrameRecord]>, EvalError> {
    let Some(selection) = &inputs.options.restrict_to_timepoints else {
        ensure_tracking(inputs, cache, false)?;
        let t = cache.tracking().ok_or(MeasureError::NoFrames)?;
        return Ok(Cow::Borrowed(t.frames()));
    };
    if let Some(t) = cache.tracking() {
        return Ok(Cow::Owned(
            t.frames()
                .iter()
                .filter(|r| selection.contains(&r.frame))
                .cloned()
                .collect(),
        ));
    }
    let files = inputs.tracking_files();
    let n = files.gt.count_consecutive();
    let frames: Vec<Frame> = selection.iter().copied().filter(|&f| f < n).collect();
    if frames.is_empty() {
        return Err(EvalError::NoFrames(files.gt.dir().to_path_buf()));
    }
    Ok(Cow::Owned(classify_frames(&files, &frames)?))
}

/// Frames carrying GT segmentation, selected by the timepoint restriction.
fn segmentation_frames<'c>(
    inputs: &SequencePair,
    cache: &'c mut EvaluationCache,
) -> Result<Cow<'c, [FrameRecord]>, EvalError> {
    let restricted = inputs.options.restrict_to_timepoints.is_some();
    if cache.segmentation().is_none() {
        let files = inputs.segmentation_files();
        let listed = files.gt.list().map_err(|source| IoError::ListDir {
            path: files.gt.dir().to_path_buf(),
            source,
        })?;
        let frames: Vec<Frame> = listed
            .into_iter()
            .filter(|&f| inputs.options.selects(f))
            .collect();
        if frames.is_empty() {
            return Err(EvalError::NoFrames(files.gt.dir().to_path_buf()));
        }
        info!("classifying {} segmentation frames", frames.len());
        let records = classify_frames(&files, &frames)?;
        if restricted {
            return Ok(Cow::Owned(records));
        }
        cache.set_segmentation(records);
    }
    let all = cache.segmentation().ok_or(MeasureError::NoFrames)?;
    if restricted {
        Ok(Cow::Owned(
            all.iter()
                .filter(|r| inputs.options.selects(r.frame))
                .cloned()
                .collect(),
        ))
    } else {
        Ok(Cow::Borrowed(all))
    }
}

/// Apply the inconsistency policy; violations are always logged.
fn gate(
    report: ConsistencyReport,
    policy: InconsistencyPolicy,
) -> Result<Option<ConsistencyReport>, EvalError> {
    if report.is_consistent() {
        return Ok(None);
    }
    for v in &report.violations {
        warn!("{v}");
    }
    match policy {
        InconsistencyPolicy::Abort => Err(EvalError::Inconsistent(report)),
        InconsistencyPolicy::Report => Ok(Some(report)),
    }
}

fn empty_image_gate(
    options: &EvaluationOptions,
    frames: &[FrameRecord],
) -> Result<Option<ConsistencyReport>, EvalError> {
    if options.stop_on_empty_images {
        gate(
            tracking::check_empty_images(frames),
            options.inconsistency_policy,
        )
    } else {
        Ok(None)
    }
}

fn matching_report(options: &EvaluationOptions, frames: &[FrameRecord]) -> Option<MatchingReport> {
    options.matching_reports.then(|| {
        let report = MatchingReport::from_frames(frames);
        info!("segment matching:\n{report}");
        report
    })
}

pub(crate) struct SequenceRun<T> {
    pub(crate) value: T,
    pub(crate) consistency: Option<ConsistencyReport>,
    pub(crate) matching: Option<MatchingReport>,
}

/// Load the full sequence with tracks, gate it and run `f` on it.
fn run_on_sequence<T>(
    inputs: &SequencePair,
    cache: &mut EvaluationCache,
    f: impl FnOnce(&SequenceView<'_>) -> Result<T, MeasureError>,
) -> Result<SequenceRun<T>, EvalError> {
    cache.retarget(&inputs.key());
    ensure_tracking(inputs, cache, true)?;
    let opts = &inputs.options;
    if opts.restrict_to_timepoints.is_some() {
        warn!("timepoint restriction ignored: lineage measures need the whole sequence");
    }

    let tracking = cache.tracking_mut().ok_or(MeasureError::NoFrames)?;
    let consistency = if opts.consistency_check {
        let params = ConsistencyParams {
            check_empty_images: opts.stop_on_empty_images,
        };
        gate(
            tracking::check_consistency(tracking, &params),
            opts.inconsistency_policy,
        )?
    } else {
        empty_image_gate(opts, tracking.frames())?
    };
    let matching = matching_report(opts, tracking.frames());
    let value = f(&tracking.sequence()?)?;
    Ok(SequenceRun {
        value,
        consistency,
        matching,
    })
}

/// AOGM of the full sequence; the operation log is written when records are kept.
pub(crate) fn run_aogm(
    penalty: PenaltyConfig,
    inputs: &SequencePair,
    cache: &mut EvaluationCache,
) -> Result<SequenceRun<AogmResult>, EvalError> {
    penalty.validate()?;
    let scorer = AogmScorer::new(penalty).with_records(inputs.options.log_reports);
    let run = run_on_sequence(inputs, cache, |seq| scorer.score(seq))?;
    if let Some(log) = run.value.operation_log() {
        info!("tracking errors:\n{log}");
    }
    Ok(run)
}

fn aogm_outcome(
    name: &'static str,
    penalty: PenaltyConfig,
    normalize: bool,
    inputs: &SequencePair,
    cache: &mut EvaluationCache,
) -> Result<MeasureOutcome, EvalError> {
    let run = run_aogm(penalty, inputs, cache)?;
    let result = run.value;
    let value = if normalize { result.tra()? } else { result.aogm };
    info!("{name}: {value}");

    let mut outcome = MeasureOutcome::new(name, value);
    outcome.report = Some(MeasureReport::Aogm(result));
    outcome.matching = run.matching;
    outcome.consistency = run.consistency;
    Ok(outcome)
}

/// Raw AOGM with caller-chosen weights.
#[derive(Clone, Copy, Debug, Default, PartialEq)]
pub struct Aogm {
    pub penalty: PenaltyConfig,
}

impl Aogm {
    pub fn new(penalty: PenaltyConfig) -> Self {
        Self { penalty }
    }
}

impl Measure for Aogm {
    fn name(&self) -> &'static str {
        "AOGM"
    }

    fn compute(
        &self,
        inputs: &SequencePair,
        cache: &mut EvaluationCache,
    ) -> Result<MeasureOutcome, EvalError> {
        aogm_outcome(self.name(), self.penalty, false, inputs, cache)
    }
}

/// Normalised AOGM; the challenge weights unless overridden.
#[derive(Clone, Copy, Debug, Default, PartialEq)]
pub struct Tra {
    pub penalty: PenaltyConfig,
}

impl Measure for Tra {
    fn name(&self) -> &'static str {
        "TRA"
    }

    fn compute(
        &self,
        inputs: &SequencePair,
        cache: &mut EvaluationCache,
    ) -> Result<MeasureOutcome, EvalError> {
        aogm_outcome(self.name(), self.penalty, true, inputs, cache)
    }
}

#[derive(Clone, Copy, Debug, PartialEq)]
pub struct Det {
    pub penalty: PenaltyConfig,
}

impl Default for Det {
    fn default() -> Self {
        Self {
            penalty: PenaltyConfig::det(),
        }
    }
}

impl Measure for Det {
    fn name(&self) -> &'static str {
        "DET"
    }

    fn compute(
        &self,
        inputs: &SequencePair,
        cache: &mut EvaluationCache,
    ) -> Result<MeasureOutcome, EvalError> {
        self.penalty.validate()?;
        cache.retarget(&inputs.key());
        let opts = &inputs.options;
        let frames = tracking_frames(inputs, cache)?;
        let consistency = empty_image_gate(opts, &frames)?;
        let result = DetScorer::new(self.penalty)
            .with_records(opts.log_reports)
            .score(&frames)?;
        if let Some(log) = result.operation_log() {
            info!("detection errors:\n{log}");
        }
        info!("DET: {}", result.det);
        let mut outcome = MeasureOutcome::new(self.name(), result.det);
        outcome.report = Some(MeasureReport::Det(result));
        outcome.consistency = consistency;
        outcome.matching = matching_report(opts, &frames);
        Ok(outcome)
    }
}

/// Mean Jaccard index of the GT segmentation.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub struct Seg;

impl Measure for Seg {
    fn name(&self) -> &'static str {
        "SEG"
    }

    fn compute(
        &self,
        inputs: &SequencePair,
        cache: &mut EvaluationCache,
    ) -> Result<MeasureOutcome, EvalError> {
        cache.retarget(&inputs.key());
        let opts = &inputs.options;
        let frames = segmentation_frames(inputs, cache)?;
        let consistency = empty_image_gate(opts, &frames)?;
        let result = SegScorer {
            report_all_res_labels: opts.report_all_res_labels,
        }
        .score(&frames)?;
        if opts.log_reports {
            for o in &result.objects {
                match o.res {
                    Some(res) => info!("T={} GT_label={} J={:.6} (RES {res})", o.frame, o.gt, o.jaccard),
                    None => info!("T={} GT_label={} J=0 (no match)", o.frame, o.gt),
                }
            }
        }
        info!("SEG: {}", result.seg);
        let mut outcome = MeasureOutcome::new(self.name(), result.seg);
        outcome.report = Some(MeasureReport::Seg(result));
        outcome.consistency = consistency;
        outcome.matching = matching_report(opts, &frames);
        Ok(outcome)
    }
}

/// Share of GT tracks reconstructed completely (CT).
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub struct CompleteTracks;

impl Measure for CompleteTracks {
    fn name(&self) -> &'static str {
        "CT"
    }

    fn compute(
        &self,
        inputs: &SequencePair,
        cache: &mut EvaluationCache,
    ) -> Result<MeasureOutcome, EvalError> {
        let run = run_on_sequence(inputs, cache, complete_tracks)?;
        let mut outcome = MeasureOutcome::new(self.name(), run.value.ct);
        outcome.report = Some(MeasureReport::CompleteTracks(run.value));
        outcome.matching = run.matching;
        outcome.consistency = run.consistency;
        Ok(outcome)
    }
}

/// Mean followed fraction of detected GT tracks (TF).
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub struct TrackFractions;

impl Measure for TrackFractions {
    fn name(&self) -> &'static str {
        "TF"
    }

    fn compute(
        &self,
        inputs: &SequencePair,
        cache: &mut EvaluationCache,
    ) -> Result<MeasureOutcome, EvalError> {
        let run = run_on_sequence(inputs, cache, track_fractions)?;
        let mut outcome = MeasureOutcome::new(self.name(), run.value.tf);
        outcome.report = Some(MeasureReport::TrackFractions(run.value));
        outcome.matching = run.matching;
        outcome.consistency = run.consistency;
        Ok(outcome)
    }
}

/// Division detection F1 with a tolerance of `i` frames, BC(i).
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct BranchingCorrectness {
    pub i: u32,
}

impl Default for BranchingCorrectness {
    fn default() -> Self {
        Self { i: 2 }
    }
}

impl Measure for BranchingCorrectness {
    fn name(&self) -> &'static str {
        "BC"
    }

    fn compute(
        &self,
        inputs: &SequencePair,
        cache: &mut EvaluationCache,
    ) -> Result<MeasureOutcome, EvalError> {
        let i = self.i;
        let run = run_on_sequence(inputs, cache, |seq| branching_correctness(seq, i))?;
        let mut outcome = MeasureOutcome::new(format!("BC({i})"), run.value.bc);
        outcome.report = Some(MeasureReport::BranchingCorrectness(run.value));
        outcome.matching = run.matching;
        outcome.consistency = run.consistency;
        Ok(outcome)
    }
}

/// Similarity of the cell cycle length distributions (CCA).
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub struct CellCycleAccuracy;

impl Measure for CellCycleAccuracy {
    fn name(&self) -> &'static str {
        "CCA"
    }

    fn compute(
        &self,
        inputs: &SequencePair,
        cache: &mut EvaluationCache,
    ) -> Result<MeasureOutcome, EvalError> {
        let run = run_on_sequence(inputs, cache, cell_cycle_accuracy)?;
        let mut outcome = MeasureOutcome::new(self.name(), run.value.cca);
        outcome.report = Some(MeasureReport::CellCycleAccuracy(run.value));
        outcome.matching = run.matching;
        outcome.consistency = run.consistency;
        Ok(outcome)
    }
}
