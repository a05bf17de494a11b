use super::matched_res;
use crate::cache::SequenceView;
use crate::error::MeasureError;
use ctc_measures_core::{Frame, Label, TrackSet};
use log::info;
use serde::{Deserialize, Serialize};
use std::collections::HashSet;

/// A mother track ending in at least two daughters.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct DivisionEvent {
    pub mother: Label,
    /// Last frame of the mother.
    pub frame: Frame,
    pub daughters: Vec<Label>,
}

fn division_events(tracks: &TrackSet) -> Vec<DivisionEvent> {
    let mut seen = HashSet::new();
    let mut events: Vec<DivisionEvent> = tracks
        .iter()
        .filter(|t| seen.insert(t.id))
        .filter_map(|t| {
            let daughters: Vec<Label> = tracks.children_of(t.id).map(|c| c.id).collect();
            (daughters.len() >= 2).then(|| DivisionEvent {
                mother: t.id,
                frame: t.end,
                daughters,
            })
        })
        .collect();
    events.sort_by_key(|e| (e.frame, e.mother));
    events
}

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct BranchingResult {
    pub bc: f64,
    /// Allowed frame offset between paired divisions.
    pub tolerance: u32,
    pub true_positives: usize,
    pub false_positives: usize,
    pub false_negatives: usize,
    /// `(GT mother, RES mother)` of every paired division.
    pub pairs: Vec<(Label, Label)>,
}

/// Branching correctness BC(i): F1 score of detected divisions.
///
/// A GT and a RES division pair up when they lie at most `tolerance` frames
/// apart and the two mothers are matched at the earlier of the two frames.
/// Each GT division takes the closest free candidate.
pub fn branching_correctness(
    seq: &SequenceView<'_>,
    tolerance: u32,
) -> Result<BranchingResult, MeasureError> {
    let gt_events = division_events(seq.gt_tracks);
    if gt_events.is_empty() {
        return Err(MeasureError::NoGroundTruthDivisions);
    }
    let res_events = division_events(seq.res_tracks);

    let mut taken = vec![false; res_events.len()];
    let mut pairs = Vec::new();
    for g in &gt_events {
        let best = res_events
            .iter()
            .enumerate()
            .filter(|(j, r)| !taken[*j] && g.frame.abs_diff(r.frame) <= tolerance)
            .filter(|(_, r)| matched_res(seq, g.frame.min(r.frame), g.mother) == Some(r.mother))
            .min_by_key(|(_, r)| g.frame.abs_diff(r.frame));
        if let Some((j, r)) = best {
            taken[j] = true;
            pairs.push((g.mother, r.mother));
        }
    }

    let tp = pairs.len();
    let fp = res_events.len() - tp;
    let fn_ = gt_events.len() - tp;
    let bc = if tp == 0 {
        0.0
    } else {
        let precision = tp as f64 / (tp + fp) as f64;
        let recall = tp as f64 / (tp + fn_) as f64;
        2.0 * precision * recall / (precision + recall)
    };
    info!("BC({tolerance}) = {bc} (TP {tp}, FP {fp}, FN {fn_})");
    Ok(BranchingResult {
        bc,
        tolerance,
        true_positives: tp,
        false_positives: fp,
        false_negatives: fn_,
        pairs,
    })
}

/// Lengths of tracks that both start and end with a division.
fn cycle_lengths(tracks: &TrackSet) -> Vec<u32> {
    let mothers: HashSet<Label> = division_events(tracks).iter().map(|e| e.mother).collect();
    let mut seen = HashSet::new();
    let mut lengths: Vec<u32> = tracks
        .iter()
        .filter(|t| seen.insert(t.id))
        .filter(|t| !t.is_root() && mothers.contains(&t.parent) && mothers.contains(&t.id))
        .map(|t| t.len())
        .collect();
    lengths.sort_unstable();
    lengths
}

fn cdf(sorted: &[u32], x: u32) -> f64 {
    sorted.partition_point(|&v| v <= x) as f64 / sorted.len() as f64
}

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct CellCycleResult {
    pub cca: f64,
    /// Sorted lengths, in frames, of the complete GT cycles.
    pub gt_cycles: Vec<u32>,
    /// Same for the result; empty means CCA is zero.
    pub res_cycles: Vec<u32>,
}

/// Cell cycle accuracy: `1 - max |CDF_GT - CDF_RES|` of cycle lengths.
pub fn cell_cycle_accuracy(seq: &SequenceView<'_>) -> Result<CellCycleResult, MeasureError> {
    let gt_cycles = cycle_lengths(seq.gt_tracks);
    if gt_cycles.is_empty() {
        return Err(MeasureError::NoGroundTruthCycles);
    }
    let res_cycles = cycle_lengths(seq.res_tracks);
    let cca = if res_cycles.is_empty() {
        0.0
    } else {
        let distance = gt_cycles
            .iter()
            .chain(&res_cycles)
            .map(|&x| (cdf(&gt_cycles, x) - cdf(&res_cycles, x)).abs())
            .fold(0.0, f64::max);
        1.0 - distance
    };
    info!("CCA = {cca} ({} GT / {} RES cycles)", gt_cycles.len(), res_cycles.len());
    Ok(CellCycleResult {
        cca,
        gt_cycles,
        res_cycles,
    })
}
