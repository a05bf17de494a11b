use super::matched_res;
use crate::cache::SequenceView;
use crate::error::MeasureError;
use ctc_measures_core::Label;
use log::info;
use serde::{Deserialize, Serialize};

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct CompleteTracksResult {
    pub ct: f64,
    /// GT tracks reconstructed from start to end by a single RES track.
    pub complete: Vec<Label>,
    pub gt_tracks: usize,
    pub res_tracks: usize,
}

/// Complete tracks: `2 * complete / (|GT tracks| + |RES tracks|)`.
pub fn complete_tracks(seq: &SequenceView<'_>) -> Result<CompleteTracksResult, MeasureError> {
    if seq.gt_tracks.is_empty() {
        return Err(MeasureError::NoGroundTruthObjects);
    }
    let complete: Vec<Label> = seq
        .gt_tracks
        .iter()
        .filter(|g| {
            let Some(res) = matched_res(seq, g.begin, g.id) else {
                return false;
            };
            let same_span = seq
                .res_tracks
                .get(res)
                .is_some_and(|r| r.begin == g.begin && r.end == g.end);
            same_span && (g.begin..=g.end).all(|f| matched_res(seq, f, g.id) == Some(res))
        })
        .map(|g| g.id)
        .collect();

    let gt_tracks = seq.gt_tracks.len();
    let res_tracks = seq.res_tracks.len();
    let ct = 2.0 * complete.len() as f64 / (gt_tracks + res_tracks) as f64;
    info!("CT = {ct} ({} of {gt_tracks} GT tracks complete)", complete.len());
    Ok(CompleteTracksResult {
        ct,
        complete,
        gt_tracks,
        res_tracks,
    })
}

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct TrackFractionsResult {
    pub tf: f64,
    /// GT tracks with at least one matched frame.
    pub detected_tracks: usize,
}

/// Track fractions: mean share of each detected GT track followed by one RES track.
pub fn track_fractions(seq: &SequenceView<'_>) -> Result<TrackFractionsResult, MeasureError> {
    if seq.gt_tracks.is_empty() {
        return Err(MeasureError::NoGroundTruthObjects);
    }
    let last_frame = seq.frames.last().map_or(0, |r| r.frame);
    let mut sum = 0.0;
    let mut detected = 0usize;
    for g in seq.gt_tracks.iter().filter(|g| !g.is_empty()) {
        let mut best = 0u32;
        let mut run = 0u32;
        let mut prev: Option<Label> = None;
        for f in g.frames_until(last_frame) {
            let cur = matched_res(seq, f, g.id);
            run = match (cur, prev) {
                (Some(c), Some(p)) if c == p => run + 1,
                (Some(_), _) => 1,
                (None, _) => 0,
            };
            best = best.max(run);
            prev = cur;
        }
        if best > 0 {
            detected += 1;
            sum += best as f64 / g.len() as f64;
        }
    }
    let tf = if detected == 0 {
        0.0
    } else {
        sum / detected as f64
    };
    info!("TF = {tf} over {detected} detected GT tracks");
    Ok(TrackFractionsResult {
        tf,
        detected_tracks: detected,
    })
}
