//! Lineage graph of one dataset.
//!
//! Vertices are the labeled objects `(frame, label)` actually present in the
//! images. Edges always point forward in time, which makes the graph acyclic:
//! - temporal: `(f, id) -> (f + 1, id)` along one track,
//! - parental: last object of a parent track -> first object of each child.

use ctc_measures_core::{Frame, Label, TrackSet};
use serde::{Deserialize, Serialize};
use std::collections::{HashMap, HashSet};

#[cfg(feature = "tracing")]
use tracing::instrument;

/// One labeled region of one dataset at one frame.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct LabeledObject {
    pub frame: Frame,
    pub label: Label,
}

impl LabeledObject {
    #[inline]
    pub const fn new(frame: Frame, label: Label) -> Self {
        Self { frame, label }
    }
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum EdgeKind {
    /// Same track, consecutive frames.
    Temporal,
    /// Mother track to daughter track.
    Parental,
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct LineageEdge {
    pub from: LabeledObject,
    pub to: LabeledObject,
    pub kind: EdgeKind,
}

/// Structural errors that make a lineage graph impossible to build.
#[derive(thiserror::Error, Debug, Clone, PartialEq, Eq)]
pub enum LineageError {
    #[error("track {track}: start frame {begin} is after end frame {end}")]
    InvalidRange { track: Label, begin: Frame, end: Frame },
    #[error("track {track} is listed more than once")]
    DuplicateTrack { track: Label },
    #[error("track {track} names itself as parent")]
    SelfParent { track: Label },
    #[error("track {track} refers to unknown parent {parent}")]
    UnknownParent { track: Label, parent: Label },
    #[error("track {track} starts at {child_begin} but its parent {parent} ends at {parent_end}")]
    ParentNotBefore {
        track: Label,
        parent: Label,
        parent_end: Frame,
        child_begin: Frame,
    },
}

#[derive(Clone, Debug, Default)]
pub struct LineageGraph {
    vertices: Vec<LabeledObject>,
    edges: Vec<LineageEdge>,
    edge_index: HashMap<(LabeledObject, LabeledObject), EdgeKind>,
}

impl LineageGraph {
    /// Build the graph from track records and per-frame label presence.
    ///
    /// `present(frame, label)` tells whether `label` occurs in the dataset's
    /// image at `frame`; track frames without the label contribute no vertex.
    /// Frames after `last_frame` are never visited.
    #[cfg_attr(
        feature = "tracing",
        instrument(level = "debug", skip(tracks, present), fields(tracks = tracks.len()))
    )]
    pub fn build<F>(tracks: &TrackSet, last_frame: Frame, present: F) -> Result<Self, LineageError>
    where
        F: Fn(Frame, Label) -> bool,
    {
        let mut seen = HashSet::with_capacity(tracks.len());
        for t in tracks {
            if t.begin > t.end {
                return Err(LineageError::InvalidRange {
                    track: t.id,
                    begin: t.begin,
                    end: t.end,
                });
            }
            if !seen.insert(t.id) {
                return Err(LineageError::DuplicateTrack { track: t.id });
            }
        }

        let mut graph = Self::default();

        for t in tracks {
            let mut prev: Option<LabeledObject> = None;
            for frame in t.frames_until(last_frame) {
                if !present(frame, t.id) {
                    prev = None;
                    continue;
                }
                let obj = LabeledObject::new(frame, t.id);
                graph.vertices.push(obj);
                if let Some(p) = prev {
                    graph.push_edge(p, obj, EdgeKind::Temporal);
                }
                prev = Some(obj);
            }
        }

        for t in tracks.iter().filter(|t| !t.is_root()) {
            if t.parent == t.id {
                return Err(LineageError::SelfParent { track: t.id });
            }
            let parent = tracks.get(t.parent).ok_or(LineageError::UnknownParent {
                track: t.id,
                parent: t.parent,
            })?;
            if parent.end >= t.begin {
                return Err(LineageError::ParentNotBefore {
                    track: t.id,
                    parent: parent.id,
                    parent_end: parent.end,
                    child_begin: t.begin,
                });
            }

            let last = parent
                .frames_until(last_frame)
                .rev()
                .find(|&f| present(f, parent.id));
            let first = t.frames_until(last_frame).find(|&f| present(f, t.id));
            if let (Some(lf), Some(ff)) = (last, first) {
                graph.push_edge(
                    LabeledObject::new(lf, parent.id),
                    LabeledObject::new(ff, t.id),
                    EdgeKind::Parental,
                );
            }
        }

        graph.vertices.sort_unstable();
        Ok(graph)
    }

    fn push_edge(&mut self, from: LabeledObject, to: LabeledObject, kind: EdgeKind) {
        self.edges.push(LineageEdge { from, to, kind });
        self.edge_index.insert((from, to), kind);
    }

    /// Vertices sorted by `(frame, label)`.
    #[inline]
    pub fn vertices(&self) -> &[LabeledObject] {
        &self.vertices
    }

    #[inline]
    pub fn edges(&self) -> &[LineageEdge] {
        &self.edges
    }

    #[inline]
    pub fn vertex_count(&self) -> usize {
        self.vertices.len()
    }

    #[inline]
    pub fn edge_count(&self) -> usize {
        self.edges.len()
    }

    pub fn contains_vertex(&self, obj: LabeledObject) -> bool {
        self.vertices.binary_search(&obj).is_ok()
    }

    /// Kind of the edge `from -> to`, if present.
    #[inline]
    pub fn edge(&self, from: LabeledObject, to: LabeledObject) -> Option<EdgeKind> {
        self.edge_index.get(&(from, to)).copied()
    }

    pub fn out_edges(&self, from: LabeledObject) -> impl Iterator<Item = &LineageEdge> + '_ {
        self.edges.iter().filter(move |e| e.from == from)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use ctc_measures_core::Track;

    fn always(_: Frame, _: Label) -> bool {
        true
    }

    #[test]
    fn builds_temporal_and_parental_edges() {
        let tracks: TrackSet = vec![
            Track::new(1, 0, 0, 2),
            Track::new(2, 1, 3, 4),
            Track::new(3, 1, 3, 3),
        ]
        .into();
        let g = LineageGraph::build(&tracks, 10, always).unwrap();

        assert_eq!(g.vertex_count(), 6);
        // 2 + 1 temporal, 2 parental
        assert_eq!(g.edge_count(), 5);
        assert_eq!(
            g.edge(LabeledObject::new(2, 1), LabeledObject::new(3, 2)),
            Some(EdgeKind::Parental)
        );
        assert_eq!(
            g.edge(LabeledObject::new(0, 1), LabeledObject::new(1, 1)),
            Some(EdgeKind::Temporal)
        );
        assert_eq!(g.out_edges(LabeledObject::new(2, 1)).count(), 2);
        assert!(g.edges().iter().all(|e| e.from.frame < e.to.frame));
    }

    #[test]
    fn gap_in_images_breaks_temporal_chain() {
        let tracks: TrackSet = vec![Track::new(5, 0, 0, 3)].into();
        let g = LineageGraph::build(&tracks, 10, |f, _| f != 2).unwrap();
        assert_eq!(g.vertex_count(), 3);
        assert_eq!(g.edge_count(), 1);
        assert!(!g.contains_vertex(LabeledObject::new(2, 5)));
    }

    #[test]
    fn tracks_past_the_last_frame_stop_there() {
        let tracks: TrackSet = vec![
            Track::new(1, 0, 0, 1),
            Track::new(2, 1, 2, Frame::MAX),
        ]
        .into();
        let g = LineageGraph::build(&tracks, 3, always).unwrap();
        assert_eq!(g.vertex_count(), 4);
        assert_eq!(
            g.edge(LabeledObject::new(1, 1), LabeledObject::new(2, 2)),
            Some(EdgeKind::Parental)
        );
        assert!(!g.contains_vertex(LabeledObject::new(4, 2)));
    }

    #[test]
    fn parent_must_end_before_child_starts() {
        let tracks: TrackSet = vec![Track::new(1, 0, 0, 3), Track::new(2, 1, 3, 5)].into();
        let err = LineageGraph::build(&tracks, 10, always).unwrap_err();
        assert_eq!(
            err,
            LineageError::ParentNotBefore {
                track: 2,
                parent: 1,
                parent_end: 3,
                child_begin: 3
            }
        );
    }

    #[test]
    fn rejects_unknown_and_self_parents() {
        let orphan: TrackSet = vec![Track::new(2, 9, 3, 5)].into();
        assert!(matches!(
            LineageGraph::build(&orphan, 10, always),
            Err(LineageError::UnknownParent { track: 2, parent: 9 })
        ));
        let selfish: TrackSet = vec![Track::new(2, 2, 3, 5)].into();
        assert!(matches!(
            LineageGraph::build(&selfish, 10, always),
            Err(LineageError::SelfParent { track: 2 })
        ));
    }
}
