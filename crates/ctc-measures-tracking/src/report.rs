//! Per-frame matching report: which RES label each GT label maps to.

use crate::cache::FrameRecord;
use ctc_measures_core::{Frame, Label};
use serde::{Deserialize, Serialize};
use std::fmt;

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct GtMatchEntry {
    pub label: Label,
    pub res: Option<Label>,
    pub jaccard: f64,
}

#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct ResMatchEntry {
    pub label: Label,
    /// GT labels this RES object covers.
    pub covers: Vec<Label>,
}

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct FrameMatching {
    pub frame: Frame,
    pub gt: Vec<GtMatchEntry>,
    pub res: Vec<ResMatchEntry>,
}

#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
pub struct MatchingReport {
    pub frames: Vec<FrameMatching>,
}

impl MatchingReport {
    pub fn from_frames(frames: &[FrameRecord]) -> Self {
        let frames = frames
            .iter()
            .map(|r| {
                let c = &r.classification;
                let gt = c
                    .gt_labels()
                    .iter()
                    .enumerate()
                    .map(|(gi, &label)| {
                        let m = c.gt_match(gi);
                        GtMatchEntry {
                            label,
                            res: m.map(|ri| c.res_labels()[ri]),
                            jaccard: m.map_or(0.0, |ri| c.jaccard(gi, ri)),
                        }
                    })
                    .collect();
                let res = c
                    .res_labels()
                    .iter()
                    .enumerate()
                    .map(|(ri, &label)| ResMatchEntry {
                        label,
                        covers: c.res_match(ri).iter().map(|&g| c.gt_labels()[g]).collect(),
                    })
                    .collect();
                FrameMatching {
                    frame: r.frame,
                    gt,
                    res,
                }
            })
            .collect();
        Self { frames }
    }
}

impl fmt::Display for MatchingReport {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        for fm in &self.frames {
            writeln!(f, "---------- T={} ----------", fm.frame)?;
            for g in &fm.gt {
                match g.res {
                    Some(r) => writeln!(f, "GT {} -> RES {} (J={:.4})", g.label, r, g.jaccard)?,
                    None => writeln!(f, "GT {} -> none", g.label)?,
                }
            }
            for r in fm.res.iter().filter(|r| r.covers.len() != 1) {
                writeln!(f, "RES {} covers {:?}", r.label, r.covers)?;
            }
        }
        Ok(())
    }
}
