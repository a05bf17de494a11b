//! Per-frame correspondence between GT and RES label images.
//!
//! Labels are dataset-local, so correspondence is established from pixel
//! overlap only. A region `A` *covers* a region `B` when their overlap is
//! strictly larger than half of `B`'s area. Two regions of the same image are
//! disjoint, so a GT object is covered by at most one RES object (and vice
//! versa).

use ctc_measures_core::{Label, LabelImageView, BACKGROUND};
use serde::{Deserialize, Serialize};
use std::collections::{BTreeMap, HashMap};

#[cfg(feature = "tracing")]
use tracing::instrument;

/// Errors returned by the label matcher.
#[derive(thiserror::Error, Debug, Clone, PartialEq, Eq)]
pub enum MatchError {
    #[error("GT image is {gt_width}x{gt_height} but RES image is {res_width}x{res_height}")]
    DimensionMismatch {
        gt_width: usize,
        gt_height: usize,
        res_width: usize,
        res_height: usize,
    },
}

/// Pixel count shared by one GT object and one RES object.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct Overlap {
    pub gt: usize,
    pub res: usize,
    pub pixels: u64,
}

/// Frame-local relation between GT and RES objects.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case", tag = "kind")]
pub enum Correspondence {
    /// One RES object covers exactly this GT object and no other.
    Match { gt: Label, res: Label },
    /// No RES object covers the GT object, but several RES objects lie mostly inside it.
    Split { gt: Label, res: Vec<Label> },
    /// One RES object covers several GT objects.
    Merge { gt: Vec<Label>, res: Label },
    FalseNegative { gt: Label },
    FalsePositive { res: Label },
}

/// Classification record of one frame.
///
/// Object indices refer to the sorted label lists. The record keeps no
/// pixels, so the images can be dropped right after classification.
#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
pub struct FrameClassification {
    /// `(width, height)` shared by both images.
    dims: (usize, usize),
    gt_labels: Vec<Label>,
    gt_sizes: Vec<u64>,
    res_labels: Vec<Label>,
    res_sizes: Vec<u64>,
    /// Sorted by `(gt, res)`.
    overlaps: Vec<Overlap>,
    /// RES object covering each GT object.
    gt_match: Vec<Option<usize>>,
    /// GT objects covered by each RES object.
    res_match: Vec<Vec<usize>>,
    /// GT object covering each RES object.
    res_inside: Vec<Option<usize>>,
}

/// Classify one frame: measure overlaps and derive both cover relations.
#[cfg_attr(
    feature = "tracing",
    instrument(level = "debug", skip(gt, res), fields(width = gt.width, height = gt.height))
)]
pub fn classify_frame(
    gt: &LabelImageView<'_>,
    res: &LabelImageView<'_>,
) -> Result<FrameClassification, MatchError> {
    if gt.dims() != res.dims() {
        return Err(MatchError::DimensionMismatch {
            gt_width: gt.width,
            gt_height: gt.height,
            res_width: res.width,
            res_height: res.height,
        });
    }

    let mut gt_hist: BTreeMap<Label, u64> = BTreeMap::new();
    let mut res_hist: BTreeMap<Label, u64> = BTreeMap::new();
    let mut pairs: HashMap<(Label, Label), u64> = HashMap::new();

    for (&g, &r) in gt.data.iter().zip(res.data) {
        if g != BACKGROUND {
            *gt_hist.entry(g).or_insert(0) += 1;
        }
        if r != BACKGROUND {
            *res_hist.entry(r).or_insert(0) += 1;
        }
        if g != BACKGROUND && r != BACKGROUND {
            *pairs.entry((g, r)).or_insert(0) += 1;
        }
    }

    let (gt_labels, gt_sizes): (Vec<Label>, Vec<u64>) = gt_hist.into_iter().unzip();
    let (res_labels, res_sizes): (Vec<Label>, Vec<u64>) = res_hist.into_iter().unzip();

    let mut overlaps: Vec<Overlap> = pairs
        .into_iter()
        .filter_map(|((g, r), pixels)| {
            let gi = gt_labels.binary_search(&g).ok()?;
            let ri = res_labels.binary_search(&r).ok()?;
            Some(Overlap {
                gt: gi,
                res: ri,
                pixels,
            })
        })
        .collect();
    overlaps.sort_unstable_by_key(|o| (o.gt, o.res));

    let mut gt_match = vec![None; gt_labels.len()];
    let mut res_match = vec![Vec::new(); res_labels.len()];
    let mut res_inside = vec![None; res_labels.len()];

    for o in &overlaps {
        if 2 * o.pixels > gt_sizes[o.gt] {
            gt_match[o.gt] = Some(o.res);
            res_match[o.res].push(o.gt);
        }
        if 2 * o.pixels > res_sizes[o.res] {
            res_inside[o.res] = Some(o.gt);
        }
    }

    Ok(FrameClassification {
        dims: gt.dims(),
        gt_labels,
        gt_sizes,
        res_labels,
        res_sizes,
        overlaps,
        gt_match,
        res_match,
        res_inside,
    })
}

impl FrameClassification {
    #[inline]
    pub fn dims(&self) -> (usize, usize) {
        self.dims
    }

    #[inline]
    pub fn gt_labels(&self) -> &[Label] {
        &self.gt_labels
    }

    #[inline]
    pub fn res_labels(&self) -> &[Label] {
        &self.res_labels
    }

    #[inline]
    pub fn gt_index(&self, label: Label) -> Option<usize> {
        self.gt_labels.binary_search(&label).ok()
    }

    #[inline]
    pub fn res_index(&self, label: Label) -> Option<usize> {
        self.res_labels.binary_search(&label).ok()
    }

    #[inline]
    pub fn gt_size(&self, gt: usize) -> u64 {
        self.gt_sizes[gt]
    }

    #[inline]
    pub fn res_size(&self, res: usize) -> u64 {
        self.res_sizes[res]
    }

    /// Index of the RES object covering GT object `gt`.
    #[inline]
    pub fn gt_match(&self, gt: usize) -> Option<usize> {
        self.gt_match[gt]
    }

    /// Indices of the GT objects covered by RES object `res`.
    #[inline]
    pub fn res_match(&self, res: usize) -> &[usize] {
        &self.res_match[res]
    }

    /// Index of the GT object covering RES object `res`.
    #[inline]
    pub fn res_inside(&self, res: usize) -> Option<usize> {
        self.res_inside[res]
    }

    /// RES object matched one-to-one with GT object `gt`.
    pub fn unique_match(&self, gt: usize) -> Option<usize> {
        let r = self.gt_match[gt]?;
        (self.res_match[r].len() == 1).then_some(r)
    }

    pub fn overlaps(&self) -> &[Overlap] {
        &self.overlaps
    }

    pub fn overlap(&self, gt: usize, res: usize) -> u64 {
        self.overlaps
            .binary_search_by_key(&(gt, res), |o| (o.gt, o.res))
            .map(|i| self.overlaps[i].pixels)
            .unwrap_or(0)
    }

    /// Intersection over union of one GT and one RES object.
    pub fn jaccard(&self, gt: usize, res: usize) -> f64 {
        let inter = self.overlap(gt, res);
        let union = self.gt_sizes[gt] + self.res_sizes[res] - inter;
        if union == 0 {
            0.0
        } else {
            inter as f64 / union as f64
        }
    }

    #[inline]
    pub fn is_empty_gt(&self) -> bool {
        self.gt_labels.is_empty()
    }

    #[inline]
    pub fn is_empty_res(&self) -> bool {
        self.res_labels.is_empty()
    }

    /// GT objects with no covering RES object.
    pub fn false_negatives(&self) -> impl Iterator<Item = usize> + '_ {
        (0..self.gt_labels.len()).filter(move |&i| self.gt_match[i].is_none())
    }

    /// RES objects covering no GT object.
    pub fn false_positives(&self) -> impl Iterator<Item = usize> + '_ {
        (0..self.res_labels.len()).filter(move |&j| self.res_match[j].is_empty())
    }

    /// Frame-local correspondence tags, GT-ordered first, then leftover RES objects.
    pub fn correspondences(&self) -> Vec<Correspondence> {
        let mut out = Vec::new();
        let mut res_used = vec![false; self.res_labels.len()];

        for (gi, &gt) in self.gt_labels.iter().enumerate() {
            if let Some(ri) = self.gt_match[gi] {
                res_used[ri] = true;
                let covered = &self.res_match[ri];
                if covered.len() == 1 {
                    out.push(Correspondence::Match {
                        gt,
                        res: self.res_labels[ri],
                    });
                } else if covered[0] == gi {
                    // report a merge once, at its first GT object
                    out.push(Correspondence::Merge {
                        gt: covered.iter().map(|&i| self.gt_labels[i]).collect(),
                        res: self.res_labels[ri],
                    });
                }
                continue;
            }

            let fragments: Vec<usize> = (0..self.res_labels.len())
                .filter(|&ri| self.res_inside[ri] == Some(gi) && self.res_match[ri].is_empty())
                .collect();
            if fragments.len() >= 2 {
                for &ri in &fragments {
                    res_used[ri] = true;
                }
                out.push(Correspondence::Split {
                    gt,
                    res: fragments.iter().map(|&ri| self.res_labels[ri]).collect(),
                });
            } else {
                out.push(Correspondence::FalseNegative { gt });
            }
        }

        for (ri, used) in res_used.into_iter().enumerate() {
            if !used {
                out.push(Correspondence::FalsePositive {
                    res: self.res_labels[ri],
                });
            }
        }
        out
    }
}
