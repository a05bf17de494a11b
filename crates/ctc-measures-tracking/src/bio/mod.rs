//! Biologically inspired measures computed on track level.
//!
//! All of them pair GT and RES objects through one-to-one matches, so a
//! merged detection never reconstructs either of the cells it covers.

mod division;
mod tracks;

pub use division::{
    branching_correctness, cell_cycle_accuracy, BranchingResult, CellCycleResult, DivisionEvent,
};
pub use tracks::{complete_tracks, track_fractions, CompleteTracksResult, TrackFractionsResult};

use crate::cache::SequenceView;
use ctc_measures_core::{Frame, Label};

/// RES label matched one-to-one with GT label `gt` at `frame`.
pub(crate) fn matched_res(seq: &SequenceView<'_>, frame: Frame, gt: Label) -> Option<Label> {
    let c = seq.frame(frame)?;
    let gi = c.gt_index(gt)?;
    c.unique_match(gi).map(|ri| c.res_labels()[ri])
}
