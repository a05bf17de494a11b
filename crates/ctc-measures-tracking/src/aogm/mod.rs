//! Acyclic oriented graph matching (AOGM) and its normalisation TRA.
//!
//! The score is a fixed construction, not a search:
//! - vertex operations come straight from the per-frame cover relations,
//! - every RES edge is checked against the GT edge between the GT partners of
//!   its endpoints, and every GT edge against the RES edge between the RES
//!   partners of its endpoints.
//!
//! A vertex has a partner only when it is matched one-to-one; an edge touching
//! a merged, split or unmatched vertex cannot be kept as it is.

mod report;

pub use report::{render_operation_log, OperationKind, OperationRecord};

use crate::cache::{FrameRecord, SequenceView};
use crate::error::MeasureError;
use crate::lineage::LabeledObject;
use ctc_measures_core::PenaltyConfig;
use log::{debug, info};
use serde::{Deserialize, Serialize};
use std::fmt;

#[cfg(feature = "tracing")]
use tracing::instrument;

/// Number of primitive operations of each kind.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct AogmCounts {
    pub split_ops: u64,
    pub fn_vertices: u64,
    pub fp_vertices: u64,
    pub redundant_edges: u64,
    pub missing_edges: u64,
    pub wrong_semantics_edges: u64,
}

impl AogmCounts {
    pub fn get(&self, kind: OperationKind) -> u64 {
        match kind {
            OperationKind::SplitOperation => self.split_ops,
            OperationKind::FalseNegativeVertex => self.fn_vertices,
            OperationKind::FalsePositiveVertex => self.fp_vertices,
            OperationKind::RedundantEdge => self.redundant_edges,
            OperationKind::MissingEdge => self.missing_edges,
            OperationKind::WrongSemanticsEdge => self.wrong_semantics_edges,
        }
    }

    /// Weighted sum of the counts.
    pub fn weighted(&self, penalty: &PenaltyConfig) -> f64 {
        OperationKind::ALL
            .iter()
            .map(|&k| self.get(k) as f64 * k.weight(penalty))
            .sum()
    }
}

/// Scored comparison of one GT/RES pair.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct AogmResult {
    pub penalty: PenaltyConfig,
    pub counts: AogmCounts,
    pub aogm: f64,
    /// AOGM of an empty RES against the same GT.
    pub aogm_empty: f64,
    pub gt_objects: u64,
    pub gt_edges: u64,
    /// Present when the scorer was asked to collect them.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub records: Option<Vec<OperationRecord>>,
}

impl AogmResult {
    /// `1 - min(AOGM, AOGM_empty) / AOGM_empty`, in `[0, 1]`.
    pub fn tra(&self) -> Result<f64, MeasureError> {
        if self.gt_objects == 0 {
            return Err(MeasureError::NoGroundTruthObjects);
        }
        if self.aogm_empty <= 0.0 {
            return Err(MeasureError::DegenerateNormalization);
        }
        Ok((1.0 - self.aogm.min(self.aogm_empty) / self.aogm_empty).clamp(0.0, 1.0))
    }

    /// Categorized text log, or `None` when records were not collected.
    pub fn operation_log(&self) -> Option<String> {
        self.records
            .as_deref()
            .map(|r| render_operation_log(r, &self.penalty))
    }
}

impl fmt::Display for AogmResult {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if let Some(log) = self.operation_log() {
            f.write_str(&log)?;
        }
        for kind in OperationKind::ALL {
            writeln!(f, "{}: {}", kind.title(), self.counts.get(kind))?;
        }
        write!(f, "AOGM value: {}", self.aogm)
    }
}

/// Vertex operations (splits, false negatives, false positives) of the given frames.
pub(crate) fn score_vertices(
    frames: &[FrameRecord],
    mut records: Option<&mut Vec<OperationRecord>>,
) -> AogmCounts {
    let mut counts = AogmCounts::default();
    for r in frames {
        let c = &r.classification;
        for (ri, &res) in c.res_labels().iter().enumerate() {
            let covered = c.res_match(ri);
            match covered.len() {
                0 => {
                    counts.fp_vertices += 1;
                    if let Some(out) = records.as_deref_mut() {
                        out.push(OperationRecord::FalsePositiveVertex {
                            frame: r.frame,
                            res,
                        });
                    }
                }
                1 => {}
                k => {
                    counts.split_ops += (k - 1) as u64;
                    if let Some(out) = records.as_deref_mut() {
                        out.push(OperationRecord::SplitOperation {
                            frame: r.frame,
                            res,
                            gt: covered.iter().map(|&g| c.gt_labels()[g]).collect(),
                        });
                    }
                }
            }
        }
        for gi in c.false_negatives() {
            counts.fn_vertices += 1;
            if let Some(out) = records.as_deref_mut() {
                out.push(OperationRecord::FalseNegativeVertex {
                    frame: r.frame,
                    gt: c.gt_labels()[gi],
                });
            }
        }
    }
    counts
}

/// GT object matched one-to-one with the RES object `obj`.
fn gt_partner(seq: &SequenceView<'_>, obj: LabeledObject) -> Option<LabeledObject> {
    let c = seq.frame(obj.frame)?;
    let ri = c.res_index(obj.label)?;
    match c.res_match(ri) {
        [gi] => Some(LabeledObject::new(obj.frame, c.gt_labels()[*gi])),
        _ => None,
    }
}

/// RES object matched one-to-one with the GT object `obj`.
fn res_partner(seq: &SequenceView<'_>, obj: LabeledObject) -> Option<LabeledObject> {
    let c = seq.frame(obj.frame)?;
    let gi = c.gt_index(obj.label)?;
    let ri = c.unique_match(gi)?;
    Some(LabeledObject::new(obj.frame, c.res_labels()[ri]))
}

/// Graph-edit scorer for one penalty configuration.
#[derive(Clone, Copy, Debug, Default, PartialEq)]
pub struct AogmScorer {
    penalty: PenaltyConfig,
    collect_records: bool,
}

impl AogmScorer {
    pub fn new(penalty: PenaltyConfig) -> Self {
        Self {
            penalty,
            collect_records: false,
        }
    }

    /// Keep one record per operation in the result.
    pub fn with_records(mut self, on: bool) -> Self {
        self.collect_records = on;
        self
    }

    #[inline]
    pub fn penalty(&self) -> &PenaltyConfig {
        &self.penalty
    }

    #[cfg_attr(
        feature = "tracing",
        instrument(level = "info", skip(self, seq), fields(frames = seq.frames.len()))
    )]
    pub fn score(&self, seq: &SequenceView<'_>) -> Result<AogmResult, MeasureError> {
        self.penalty.validate()?;
        let mut records = self.collect_records.then(Vec::new);
        let mut counts = score_vertices(seq.frames, records.as_mut());

        let gt_objects: u64 = seq
            .frames
            .iter()
            .map(|r| r.classification.gt_labels().len() as u64)
            .sum();
        if gt_objects == 0 {
            return Err(MeasureError::NoGroundTruthObjects);
        }

        for e in seq.res_lineage.edges() {
            let gt_kind = match (gt_partner(seq, e.from), gt_partner(seq, e.to)) {
                (Some(a), Some(b)) => seq.gt_lineage.edge(a, b),
                _ => None,
            };
            match gt_kind {
                Some(kind) if kind == e.kind => {}
                Some(_) => {
                    counts.wrong_semantics_edges += 1;
                    if let Some(out) = records.as_mut() {
                        out.push(OperationRecord::WrongSemanticsEdge {
                            from: e.from,
                            to: e.to,
                            res_kind: e.kind,
                        });
                    }
                }
                None => {
                    counts.redundant_edges += 1;
                    if let Some(out) = records.as_mut() {
                        out.push(OperationRecord::RedundantEdge {
                            from: e.from,
                            to: e.to,
                        });
                    }
                }
            }
        }

        for e in seq.gt_lineage.edges() {
            let kept = match (res_partner(seq, e.from), res_partner(seq, e.to)) {
                (Some(a), Some(b)) => seq.res_lineage.edge(a, b).is_some(),
                _ => false,
            };
            if !kept {
                counts.missing_edges += 1;
                if let Some(out) = records.as_mut() {
                    out.push(OperationRecord::MissingEdge {
                        from: e.from,
                        to: e.to,
                    });
                }
            }
        }

        let p = &self.penalty;
        let gt_edges = seq.gt_lineage.edge_count() as u64;
        let aogm = counts.weighted(p);
        let aogm_empty = p.fn_vertex * gt_objects as f64 + p.missing_edge * gt_edges as f64;
        debug!("AOGM operation counts: {counts:?}");
        info!("AOGM = {aogm} (empty result: {aogm_empty})");

        Ok(AogmResult {
            penalty: *p,
            counts,
            aogm,
            aogm_empty,
            gt_objects,
            gt_edges,
            records,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::testutil::{cache, Slot};
    use approx::assert_relative_eq;
    use ctc_measures_core::{PenaltyError, Track, TrackSet};

    fn tracks(rows: &[(u16, u16, u32, u32)]) -> TrackSet {
        rows.iter()
            .map(|&(id, parent, begin, end)| Track::new(id, parent, begin, end))
            .collect()
    }

    /// GT: track 1 on frames 0-2 dividing into 2 and 3 on frames 3-4.
    fn dividing_gt() -> (Vec<Vec<Slot>>, TrackSet) {
        let frames = vec![
            vec![(0, 1)],
            vec![(0, 1)],
            vec![(0, 1)],
            vec![(1, 2), (2, 3)],
            vec![(1, 2), (2, 3)],
        ];
        (frames, tracks(&[(1, 0, 0, 2), (2, 1, 3, 4), (3, 1, 3, 4)]))
    }

    fn res_frames(mother: u16, a: u16, b: u16) -> Vec<Vec<Slot>> {
        vec![
            vec![(0, mother)],
            vec![(0, mother)],
            vec![(0, mother)],
            vec![(1, a), (2, b)],
            vec![(1, a), (2, b)],
        ]
    }

    fn score(
        gt: &[Vec<Slot>],
        gt_tracks: TrackSet,
        res: &[Vec<Slot>],
        res_tracks: TrackSet,
    ) -> AogmResult {
        let mut c = cache(gt, res).with_tracks(gt_tracks, res_tracks);
        let seq = c.sequence().unwrap();
        AogmScorer::new(PenaltyConfig::ctc())
            .with_records(true)
            .score(&seq)
            .unwrap()
    }

    #[test]
    fn identical_inputs_score_zero() {
        let (gt, gt_tracks) = dividing_gt();
        let res = res_frames(7, 8, 9);
        let r = score(&gt, gt_tracks, &res, tracks(&[(7, 0, 0, 2), (8, 7, 3, 4), (9, 7, 3, 4)]));
        assert_eq!(r.counts, AogmCounts::default());
        assert_eq!(r.aogm, 0.0);
        assert_eq!(r.tra().unwrap(), 1.0);
        // 7 objects, 2 + 2 temporal, 2 parental
        assert_eq!((r.gt_objects, r.gt_edges), (7, 6));
        assert_relative_eq!(r.aogm_empty, 10.0 * 7.0 + 1.5 * 6.0);
    }

    #[test]
    fn undetected_division_costs_one_missing_edge() {
        let (gt, gt_tracks) = dividing_gt();
        let res = res_frames(7, 8, 9);
        let detected = score(
            &gt,
            gt_tracks.clone(),
            &res,
            tracks(&[(7, 0, 0, 2), (8, 7, 3, 4), (9, 7, 3, 4)]),
        );
        // second daughter starts as a fresh root track
        let missed = score(&gt, gt_tracks, &res, tracks(&[(7, 0, 0, 2), (8, 7, 3, 4), (9, 0, 3, 4)]));

        assert_eq!(missed.counts.missing_edges, 1);
        assert_eq!(missed.counts.redundant_edges, 0);
        assert_eq!(missed.counts.wrong_semantics_edges, 0);
        assert_relative_eq!(missed.aogm - detected.aogm, PenaltyConfig::ctc().missing_edge);
        assert_eq!(
            missed.records.as_deref(),
            Some(
                &[OperationRecord::MissingEdge {
                    from: LabeledObject::new(2, 1),
                    to: LabeledObject::new(3, 3),
                }][..]
            )
        );
    }

    #[test]
    fn continuing_mother_through_division_flips_edge_semantics() {
        let (gt, gt_tracks) = dividing_gt();
        // RES keeps label 7 on the first daughter
        let res = res_frames(7, 7, 9);
        let r = score(&gt, gt_tracks, &res, tracks(&[(7, 0, 0, 4), (9, 0, 3, 4)]));
        assert_eq!(r.counts.wrong_semantics_edges, 1);
        assert_eq!(r.counts.missing_edges, 1);
        assert_relative_eq!(r.aogm, 1.0 + 1.5);
    }

    #[test]
    fn vertex_errors_are_counted() {
        let gt = vec![vec![(0, 1), (1, 2)], vec![(0, 1), (1, 2)]];
        let gt_tracks = tracks(&[(1, 0, 0, 1), (2, 0, 0, 1)]);
        // object 2 missed at frame 1, stray object 5 at frame 0
        let res = vec![vec![(0, 1), (1, 2), (3, 5)], vec![(0, 1)]];
        let r = score(&gt, gt_tracks, &res, tracks(&[(1, 0, 0, 1), (2, 0, 0, 0), (5, 0, 0, 0)]));
        assert_eq!(r.counts.fn_vertices, 1);
        assert_eq!(r.counts.fp_vertices, 1);
        assert_eq!(r.counts.missing_edges, 1);
        assert_relative_eq!(r.aogm, 10.0 + 1.0 + 1.5);
        assert!(r.tra().unwrap() < 1.0);
    }

    #[test]
    fn merged_detection_costs_a_split() {
        use ctc_measures_core::LabelImage;
        use crate::cache::{classify_frames, TrackDataCache};
        use crate::testutil::Fixed;

        let mut gt = LabelImage::empty(12, 4);
        gt.fill_rect(0, 0, 4, 4, 1);
        gt.fill_rect(4, 0, 8, 4, 2);
        let mut res = LabelImage::empty(12, 4);
        res.fill_rect(0, 0, 8, 4, 3);
        let frames = classify_frames(&Fixed(vec![(gt, res)]), &[0]).unwrap();
        let mut c = TrackDataCache::from_frames(frames)
            .unwrap()
            .with_tracks(tracks(&[(1, 0, 0, 0), (2, 0, 0, 0)]), tracks(&[(3, 0, 0, 0)]));
        let r = AogmScorer::new(PenaltyConfig::ctc())
            .score(&c.sequence().unwrap())
            .unwrap();
        assert_eq!(r.counts.split_ops, 1);
        assert_eq!(r.counts.fn_vertices, 0);
        assert_relative_eq!(r.aogm, 5.0);
        assert!(r.records.is_none());
    }

    #[test]
    fn empty_result_scores_aogm_empty() {
        let (gt, gt_tracks) = dividing_gt();
        let res: Vec<Vec<Slot>> = vec![Vec::new(); gt.len()];
        let r = score(&gt, gt_tracks, &res, TrackSet::default());
        assert_relative_eq!(r.aogm, r.aogm_empty);
        assert_eq!(r.tra().unwrap(), 0.0);
    }

    #[test]
    fn zero_normaliser_is_rejected() {
        let (gt, gt_tracks) = dividing_gt();
        let mut c = cache(&gt, &gt).with_tracks(gt_tracks.clone(), gt_tracks);
        let p = PenaltyConfig::new(1.0, 0.0, 1.0, 1.0, 0.0, 1.0).unwrap();
        let r = AogmScorer::new(p).score(&c.sequence().unwrap()).unwrap();
        assert_eq!(r.tra(), Err(MeasureError::DegenerateNormalization));
    }

    #[test]
    fn edited_weights_are_checked_before_scoring() {
        let (gt, gt_tracks) = dividing_gt();
        let mut c = cache(&gt, &gt).with_tracks(gt_tracks.clone(), gt_tracks);
        let p = PenaltyConfig {
            missing_edge: -1.5,
            ..PenaltyConfig::ctc()
        };
        assert!(matches!(
            AogmScorer::new(p).score(&c.sequence().unwrap()),
            Err(MeasureError::Penalty(PenaltyError::InvalidWeight {
                name: "missing_edge",
                ..
            }))
        ));
    }
}
