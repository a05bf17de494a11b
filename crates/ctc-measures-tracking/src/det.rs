//! Detection accuracy: the vertex part of AOGM only.

use crate::aogm::{render_operation_log, score_vertices, AogmCounts, OperationRecord};
use crate::cache::FrameRecord;
use crate::error::MeasureError;
use ctc_measures_core::PenaltyConfig;
use log::info;
use serde::{Deserialize, Serialize};

#[cfg(feature = "tracing")]
use tracing::instrument;

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct DetResult {
    pub penalty: PenaltyConfig,
    /// Vertex operation counts; the edge counts stay zero.
    pub counts: AogmCounts,
    pub aogm_d: f64,
    pub aogm_d_empty: f64,
    pub gt_objects: u64,
    pub det: f64,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub records: Option<Vec<OperationRecord>>,
}

impl DetResult {
    pub fn operation_log(&self) -> Option<String> {
        self.records
            .as_deref()
            .map(|r| render_operation_log(r, &self.penalty))
    }
}

#[derive(Clone, Copy, Debug, PartialEq)]
pub struct DetScorer {
    penalty: PenaltyConfig,
    collect_records: bool,
}

impl Default for DetScorer {
    fn default() -> Self {
        Self::new(PenaltyConfig::det())
    }
}

impl DetScorer {
    /// Only the three vertex weights of `penalty` are used.
    pub fn new(penalty: PenaltyConfig) -> Self {
        Self {
            penalty: penalty.vertices_only(),
            collect_records: false,
        }
    }

    pub fn with_records(mut self, on: bool) -> Self {
        self.collect_records = on;
        self
    }

    /// Score the given frames; no track metadata is involved.
    #[cfg_attr(
        feature = "tracing",
        instrument(level = "info", skip(self, frames), fields(frames = frames.len()))
    )]
    pub fn score(&self, frames: &[FrameRecord]) -> Result<DetResult, MeasureError> {
        self.penalty.validate()?;
        if frames.is_empty() {
            return Err(MeasureError::NoFrames);
        }
        let mut records = self.collect_records.then(Vec::new);
        let counts = score_vertices(frames, records.as_mut());
        let gt_objects: u64 = frames
            .iter()
            .map(|r| r.classification.gt_labels().len() as u64)
            .sum();
        if gt_objects == 0 {
            return Err(MeasureError::NoGroundTruthObjects);
        }

        let aogm_d = counts.weighted(&self.penalty);
        let aogm_d_empty = self.penalty.fn_vertex * gt_objects as f64;
        if aogm_d_empty <= 0.0 {
            return Err(MeasureError::DegenerateNormalization);
        }
        let det = (1.0 - aogm_d.min(aogm_d_empty) / aogm_d_empty).clamp(0.0, 1.0);
        info!("DET = {det} (AOGM-D {aogm_d}, empty result {aogm_d_empty})");

        Ok(DetResult {
            penalty: self.penalty,
            counts,
            aogm_d,
            aogm_d_empty,
            gt_objects,
            det,
            records,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::testutil::cache;
    use approx::assert_relative_eq;

    #[test]
    fn perfect_detection_scores_one() {
        let frames = vec![vec![(0, 1), (1, 2)], vec![(0, 1)]];
        let c = cache(&frames, &frames);
        let r = DetScorer::default().score(c.frames()).unwrap();
        assert_eq!(r.det, 1.0);
        assert_eq!(r.gt_objects, 3);
    }

    #[test]
    fn edges_never_contribute() {
        let gt = vec![vec![(0, 1), (1, 2)], vec![(0, 1), (1, 2)]];
        let res = vec![vec![(0, 4)], vec![(0, 4), (5, 9)]];
        let c = cache(&gt, &res);
        let r = DetScorer::new(PenaltyConfig::ctc())
            .with_records(true)
            .score(c.frames())
            .unwrap();
        assert_eq!(r.counts.fn_vertices, 2);
        assert_eq!(r.counts.fp_vertices, 1);
        assert_eq!(r.counts.missing_edges, 0);
        assert_relative_eq!(r.aogm_d, 21.0);
        assert_relative_eq!(r.det, 1.0 - 21.0 / 40.0);
        assert_eq!(r.records.as_ref().map(Vec::len), Some(3));
    }

    #[test]
    fn nan_vertex_weight_is_rejected() {
        let frames = vec![vec![(0, 1)]];
        let c = cache(&frames, &frames);
        let p = PenaltyConfig {
            fn_vertex: f64::NAN,
            ..PenaltyConfig::det()
        };
        assert!(matches!(
            DetScorer::new(p).score(c.frames()),
            Err(MeasureError::Penalty(_))
        ));
    }

    #[test]
    fn requires_ground_truth_objects() {
        let empty = vec![Vec::new(), Vec::new()];
        let c = cache(&empty, &empty);
        assert_eq!(
            DetScorer::default().score(c.frames()),
            Err(MeasureError::NoGroundTruthObjects)
        );
    }
}
