//! Structural validation of track metadata against image content.
//!
//! Every violation is collected; nothing here stops at the first problem.

use crate::cache::{FrameRecord, TrackDataCache};
use crate::error::Dataset;
use crate::matching::FrameClassification;
use ctc_measures_core::{Frame, Label, TrackSet};
use serde::{Deserialize, Serialize};
use std::collections::{BTreeMap, HashMap};
use std::fmt;

#[cfg(feature = "tracing")]
use tracing::instrument;

#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ConsistencyParams {
    /// Flag frames whose image holds background only.
    #[serde(default)]
    pub check_empty_images: bool,
}

/// Coarse grouping of violations, used for reporting.
#[derive(Clone, Copy, Debug, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ViolationCategory {
    /// Orphan, self-referencing or misordered parent.
    Parent,
    /// Two track records claiming the same label at the same frame.
    DuplicateLabel,
    /// Track frame range itself is broken.
    TrackRange,
    /// Image content disagrees with the track records.
    LabelPresence,
    EmptyImage,
}

#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case", tag = "kind")]
pub enum ViolationKind {
    InvalidRange { begin: Frame, end: Frame },
    SelfParent,
    MissingParent { parent: Label },
    ParentNotBefore {
        parent: Label,
        parent_end: Frame,
        child_begin: Frame,
    },
    DuplicateLabel { frame: Frame },
    ReusedTrackId,
    DuplicateSibling { parent: Label, frame: Frame },
    /// The track covers `frame` but its label is absent from the image.
    MissingLabel { frame: Frame },
    /// The label occurs in the image at `frame` but no track covers it.
    UntrackedLabel { frame: Frame },
    TrackBeyondSequence { end: Frame, last_frame: Frame },
    EmptyImage { frame: Frame },
}

impl ViolationKind {
    pub fn category(&self) -> ViolationCategory {
        match self {
            ViolationKind::SelfParent
            | ViolationKind::MissingParent { .. }
            | ViolationKind::ParentNotBefore { .. } => ViolationCategory::Parent,
            ViolationKind::DuplicateLabel { .. }
            | ViolationKind::ReusedTrackId
            | ViolationKind::DuplicateSibling { .. } => ViolationCategory::DuplicateLabel,
            ViolationKind::InvalidRange { .. } | ViolationKind::TrackBeyondSequence { .. } => {
                ViolationCategory::TrackRange
            }
            ViolationKind::MissingLabel { .. } | ViolationKind::UntrackedLabel { .. } => {
                ViolationCategory::LabelPresence
            }
            ViolationKind::EmptyImage { .. } => ViolationCategory::EmptyImage,
        }
    }
}

/// One violation with context.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct ConsistencyViolation {
    pub dataset: Dataset,
    /// Track id / label concerned, absent for whole-image problems.
    pub label: Option<Label>,
    #[serde(flatten)]
    pub kind: ViolationKind,
}

impl ConsistencyViolation {
    #[inline]
    pub fn category(&self) -> ViolationCategory {
        self.kind.category()
    }
}

impl fmt::Display for ConsistencyViolation {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let ds = self.dataset;
        let id = self.label.unwrap_or(0);
        match &self.kind {
            ViolationKind::InvalidRange { begin, end } => {
                write!(f, "{ds}: track {id} starts at {begin} after its end {end}")
            }
            ViolationKind::SelfParent => write!(f, "{ds}: track {id} is its own parent"),
            ViolationKind::MissingParent { parent } => {
                write!(f, "{ds}: track {id} refers to non-existent parent {parent}")
            }
            ViolationKind::ParentNotBefore {
                parent,
                parent_end,
                child_begin,
            } => write!(
                f,
                "{ds}: parent {parent} of track {id} ends at {parent_end}, not before the child starts at {child_begin}"
            ),
            ViolationKind::DuplicateLabel { frame } => {
                write!(f, "{ds}: label {id} is claimed by two tracks at frame {frame}")
            }
            ViolationKind::ReusedTrackId => {
                write!(f, "{ds}: track id {id} is used by more than one record")
            }
            ViolationKind::DuplicateSibling { parent, frame } => write!(
                f,
                "{ds}: two children of track {parent} start at frame {frame} with label {id}"
            ),
            ViolationKind::MissingLabel { frame } => {
                write!(f, "{ds}: label {id} of a live track is missing at frame {frame}")
            }
            ViolationKind::UntrackedLabel { frame } => {
                write!(f, "{ds}: label {id} at frame {frame} belongs to no track")
            }
            ViolationKind::TrackBeyondSequence { end, last_frame } => write!(
                f,
                "{ds}: track {id} ends at {end}, past the last frame {last_frame}"
            ),
            ViolationKind::EmptyImage { frame } => write!(f, "{ds}: image at frame {frame} is empty"),
        }
    }
}

/// Outcome of a consistency check.
#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ConsistencyReport {
    pub violations: Vec<ConsistencyViolation>,
}

impl ConsistencyReport {
    #[inline]
    pub fn is_consistent(&self) -> bool {
        self.violations.is_empty()
    }

    pub fn extend(&mut self, other: ConsistencyReport) {
        self.violations.extend(other.violations);
    }

    pub fn count(&self, category: ViolationCategory) -> usize {
        self.violations
            .iter()
            .filter(|v| v.category() == category)
            .count()
    }

    /// Violations grouped by category, in category order.
    pub fn by_category(&self) -> BTreeMap<ViolationCategory, Vec<&ConsistencyViolation>> {
        let mut out: BTreeMap<_, Vec<_>> = BTreeMap::new();
        for v in &self.violations {
            out.entry(v.category()).or_default().push(v);
        }
        out
    }

    pub fn into_result(self) -> Result<(), Vec<ConsistencyViolation>> {
        if self.violations.is_empty() {
            Ok(())
        } else {
            Err(self.violations)
        }
    }
}

impl fmt::Display for ConsistencyReport {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if self.is_consistent() {
            return writeln!(f, "consistent");
        }
        for (category, items) in self.by_category() {
            writeln!(f, "---------- {category:?} ({}) ----------", items.len())?;
            for v in items {
                writeln!(f, "{v}")?;
            }
        }
        Ok(())
    }
}

fn side_labels(c: &FrameClassification, dataset: Dataset) -> &[Label] {
    match dataset {
        Dataset::GroundTruth => c.gt_labels(),
        Dataset::Result => c.res_labels(),
    }
}

/// Check one dataset's tracks against its side of the classified frames.
#[cfg_attr(
    feature = "tracing",
    instrument(level = "info", skip(tracks, frames), fields(dataset = %dataset, tracks = tracks.len()))
)]
pub fn check_dataset(
    dataset: Dataset,
    tracks: &TrackSet,
    frames: &[FrameRecord],
    params: &ConsistencyParams,
) -> ConsistencyReport {
    let mut violations = Vec::new();
    let mut push = |label: Option<Label>, kind: ViolationKind| {
        violations.push(ConsistencyViolation {
            dataset,
            label,
            kind,
        })
    };

    let last_frame = frames.last().map(|r| r.frame);
    let frame_lookup: HashMap<Frame, &FrameClassification> =
        frames.iter().map(|r| (r.frame, &r.classification)).collect();

    // per-record checks
    for t in tracks {
        if t.begin > t.end {
            push(
                Some(t.id),
                ViolationKind::InvalidRange {
                    begin: t.begin,
                    end: t.end,
                },
            );
        }
        if let Some(last) = last_frame {
            if t.end > last {
                push(
                    Some(t.id),
                    ViolationKind::TrackBeyondSequence {
                        end: t.end,
                        last_frame: last,
                    },
                );
            }
        }
        if t.is_root() {
            continue;
        }
        if t.parent == t.id {
            push(Some(t.id), ViolationKind::SelfParent);
            continue;
        }
        match tracks.get(t.parent) {
            None => push(Some(t.id), ViolationKind::MissingParent { parent: t.parent }),
            Some(p) if p.end >= t.begin => push(
                Some(t.id),
                ViolationKind::ParentNotBefore {
                    parent: p.id,
                    parent_end: p.end,
                    child_begin: t.begin,
                },
            ),
            Some(_) => {}
        }
    }

    // pairwise checks on records sharing an id
    let mut by_id: BTreeMap<Label, Vec<usize>> = BTreeMap::new();
    for (i, t) in tracks.iter().enumerate() {
        by_id.entry(t.id).or_default().push(i);
    }
    let records = tracks.as_slice();
    for (&id, idx) in by_id.iter().filter(|(_, idx)| idx.len() > 1) {
        for (n, &a) in idx.iter().enumerate() {
            for &b in &idx[n + 1..] {
                let (ta, tb) = (&records[a], &records[b]);
                let lo = ta.begin.max(tb.begin);
                let hi = ta.end.min(tb.end);
                if lo <= hi {
                    push(Some(id), ViolationKind::DuplicateLabel { frame: lo });
                } else {
                    push(Some(id), ViolationKind::ReusedTrackId);
                }
                if ta.parent != 0 && ta.parent == tb.parent && ta.begin == tb.begin {
                    push(
                        Some(id),
                        ViolationKind::DuplicateSibling {
                            parent: ta.parent,
                            frame: ta.begin,
                        },
                    );
                }
            }
        }
    }

    // track records vs. image content, never past the last classified frame
    if let Some(last) = last_frame {
        for t in tracks {
            for frame in t.frames_until(last) {
                if let Some(c) = frame_lookup.get(&frame) {
                    if side_labels(c, dataset).binary_search(&t.id).is_err() {
                        push(Some(t.id), ViolationKind::MissingLabel { frame });
                    }
                }
            }
        }
    }
    for r in frames {
        for &label in side_labels(&r.classification, dataset) {
            let covered = by_id
                .get(&label)
                .is_some_and(|idx| idx.iter().any(|&i| records[i].contains(r.frame)));
            if !covered {
                push(Some(label), ViolationKind::UntrackedLabel { frame: r.frame });
            }
        }
    }

    if params.check_empty_images {
        for r in frames {
            if side_labels(&r.classification, dataset).is_empty() {
                push(None, ViolationKind::EmptyImage { frame: r.frame });
            }
        }
    }

    ConsistencyReport { violations }
}

/// Only the empty-image check, for measures that carry no track metadata.
pub fn check_empty_images(frames: &[FrameRecord]) -> ConsistencyReport {
    let mut violations = Vec::new();
    for r in frames {
        for dataset in [Dataset::GroundTruth, Dataset::Result] {
            if side_labels(&r.classification, dataset).is_empty() {
                violations.push(ConsistencyViolation {
                    dataset,
                    label: None,
                    kind: ViolationKind::EmptyImage { frame: r.frame },
                });
            }
        }
    }
    ConsistencyReport { violations }
}

/// Check every dataset of the cache that carries track metadata.
pub fn check_consistency(cache: &TrackDataCache, params: &ConsistencyParams) -> ConsistencyReport {
    let mut report = ConsistencyReport::default();
    for dataset in [Dataset::GroundTruth, Dataset::Result] {
        if let Some(tracks) = cache.tracks(dataset) {
            report.extend(check_dataset(dataset, tracks, cache.frames(), params));
        } else if params.check_empty_images {
            report.violations.extend(
                check_empty_images(cache.frames())
                    .violations
                    .into_iter()
                    .filter(|v| v.dataset == dataset),
            );
        }
    }
    report
}
