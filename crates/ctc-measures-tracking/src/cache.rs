//! Per-sequence classification cache shared by successive measures.
//!
//! The cache has a single owner. Measures that want to reuse it take it by
//! value and hand it back next to their result.

use crate::error::{Dataset, MeasureError};
use crate::lineage::LineageGraph;
use crate::matching::{classify_frame, FrameClassification, MatchError};
use ctc_measures_core::{Frame, LabelImage, TrackSet};
use log::debug;

#[cfg(feature = "rayon")]
use rayon::prelude::*;

#[cfg(feature = "tracing")]
use tracing::instrument;

/// Classification of one frame, tagged with its frame index.
#[derive(Clone, Debug, PartialEq)]
pub struct FrameRecord {
    pub frame: Frame,
    pub classification: FrameClassification,
}

/// Source of GT/RES image pairs, one pair per frame.
///
/// `load_pair` is called at most once per frame and the images are dropped
/// right after classification.
pub trait FrameSource {
    type Error: From<MeasureError> + Send;

    fn load_pair(&self, frame: Frame) -> Result<(LabelImage, LabelImage), Self::Error>;
}

fn classify_one<S: FrameSource + ?Sized>(
    source: &S,
    frame: Frame,
) -> Result<FrameRecord, S::Error> {
    let (gt, res) = source.load_pair(frame)?;
    let classification = classify_frame(&gt.view(), &res.view())
        .map_err(|source: MatchError| MeasureError::Match { frame, source })?;
    debug!(
        "frame {frame}: {} GT / {} RES objects",
        classification.gt_labels().len(),
        classification.res_labels().len()
    );
    Ok(FrameRecord {
        frame,
        classification,
    })
}

/// Load and classify the given frames, returning records in frame order.
///
/// With the `rayon` feature frames are processed in parallel; the first
/// failing frame aborts the whole sequence either way.
#[cfg_attr(
    feature = "tracing",
    instrument(level = "info", skip(source, frames), fields(frames = frames.len()))
)]
pub fn classify_frames<S>(source: &S, frames: &[Frame]) -> Result<Vec<FrameRecord>, S::Error>
where
    S: FrameSource + Sync + ?Sized,
{
    #[cfg(feature = "rayon")]
    let mut records = frames
        .par_iter()
        .map(|&f| classify_one(source, f))
        .collect::<Result<Vec<_>, _>>()?;

    #[cfg(not(feature = "rayon"))]
    let mut records = frames
        .iter()
        .map(|&f| classify_one(source, f))
        .collect::<Result<Vec<_>, _>>()?;

    records.sort_by_key(|r| r.frame);
    if let Some(first) = records.first() {
        let expected = first.classification.dims();
        for r in &records[1..] {
            same_dims(expected, r)?;
        }
    }
    Ok(records)
}

fn same_dims(expected: (usize, usize), record: &FrameRecord) -> Result<(), MeasureError> {
    let got = record.classification.dims();
    if got != expected {
        return Err(MeasureError::FrameDimensions {
            frame: record.frame,
            expected,
            got,
        });
    }
    Ok(())
}

/// Borrowed view over everything the graph measures need.
#[derive(Clone, Copy, Debug)]
pub struct SequenceView<'a> {
    pub frames: &'a [FrameRecord],
    pub gt_tracks: &'a TrackSet,
    pub res_tracks: &'a TrackSet,
    pub gt_lineage: &'a LineageGraph,
    pub res_lineage: &'a LineageGraph,
}

impl SequenceView<'_> {
    pub fn frame(&self, frame: Frame) -> Option<&FrameClassification> {
        find_frame(self.frames, frame)
    }
}

fn find_frame(frames: &[FrameRecord], frame: Frame) -> Option<&FrameClassification> {
    frames
        .binary_search_by_key(&frame, |r| r.frame)
        .ok()
        .map(|i| &frames[i].classification)
}

/// Frame-ordered classification records plus the track metadata of both datasets.
#[derive(Clone, Debug, Default)]
pub struct TrackDataCache {
    gt_tracks: Option<TrackSet>,
    res_tracks: Option<TrackSet>,
    frames: Vec<FrameRecord>,
    gt_lineage: Option<LineageGraph>,
    res_lineage: Option<LineageGraph>,
}

impl TrackDataCache {
    pub fn new() -> Self {
        Self::default()
    }

    /// Build a cache from already classified frames.
    pub fn from_frames(frames: Vec<FrameRecord>) -> Result<Self, MeasureError> {
        let mut cache = Self::new();
        for r in frames {
            cache.push_frame(r)?;
        }
        Ok(cache)
    }

    /// Append the next frame; frames must arrive in increasing order and
    /// share the dimensions of the first one.
    pub fn push_frame(&mut self, record: FrameRecord) -> Result<(), MeasureError> {
        if let Some(first) = self.frames.first() {
            same_dims(first.classification.dims(), &record)?;
        }
        if let Some(last) = self.frames.last() {
            if record.frame <= last.frame {
                return Err(MeasureError::FrameOrder {
                    after: last.frame,
                    got: record.frame,
                });
            }
        }
        self.frames.push(record);
        self.gt_lineage = None;
        self.res_lineage = None;
        Ok(())
    }

    /// Attach (or replace) the track metadata of one dataset.
    pub fn set_tracks(&mut self, dataset: Dataset, tracks: TrackSet) {
        match dataset {
            Dataset::GroundTruth => {
                self.gt_tracks = Some(tracks);
                self.gt_lineage = None;
            }
            Dataset::Result => {
                self.res_tracks = Some(tracks);
                self.res_lineage = None;
            }
        }
    }

    pub fn with_tracks(mut self, gt: TrackSet, res: TrackSet) -> Self {
        self.set_tracks(Dataset::GroundTruth, gt);
        self.set_tracks(Dataset::Result, res);
        self
    }

    pub fn tracks(&self, dataset: Dataset) -> Option<&TrackSet> {
        match dataset {
            Dataset::GroundTruth => self.gt_tracks.as_ref(),
            Dataset::Result => self.res_tracks.as_ref(),
        }
    }

    pub fn has_tracks(&self) -> bool {
        self.gt_tracks.is_some() && self.res_tracks.is_some()
    }

    #[inline]
    pub fn frames(&self) -> &[FrameRecord] {
        &self.frames
    }

    #[inline]
    pub fn frame_count(&self) -> usize {
        self.frames.len()
    }

    pub fn frame(&self, frame: Frame) -> Option<&FrameClassification> {
        find_frame(&self.frames, frame)
    }

    /// Total number of GT objects over all frames.
    pub fn gt_object_count(&self) -> usize {
        self.frames
            .iter()
            .map(|r| r.classification.gt_labels().len())
            .sum()
    }

    fn lineage_for(&self, dataset: Dataset) -> Result<LineageGraph, MeasureError> {
        let tracks = self
            .tracks(dataset)
            .ok_or(MeasureError::MissingTracks(dataset))?;
        let frames = &self.frames;
        let last_frame = frames.last().map_or(0, |r| r.frame);
        LineageGraph::build(tracks, last_frame, |f, label| {
            find_frame(frames, f).is_some_and(|c| match dataset {
                Dataset::GroundTruth => c.gt_index(label).is_some(),
                Dataset::Result => c.res_index(label).is_some(),
            })
        })
        .map_err(|source| MeasureError::Lineage { dataset, source })
    }

    /// Build both lineage graphs (once) and borrow the whole sequence.
    pub fn sequence(&mut self) -> Result<SequenceView<'_>, MeasureError> {
        if self.frames.is_empty() {
            return Err(MeasureError::NoFrames);
        }
        if self.gt_lineage.is_none() {
            self.gt_lineage = Some(self.lineage_for(Dataset::GroundTruth)?);
        }
        if self.res_lineage.is_none() {
            self.res_lineage = Some(self.lineage_for(Dataset::Result)?);
        }

        match (
            &self.gt_tracks,
            &self.res_tracks,
            &self.gt_lineage,
            &self.res_lineage,
        ) {
            (Some(gt_tracks), Some(res_tracks), Some(gt_lineage), Some(res_lineage)) => {
                Ok(SequenceView {
                    frames: &self.frames,
                    gt_tracks,
                    res_tracks,
                    gt_lineage,
                    res_lineage,
                })
            }
            (None, _, _, _) => Err(MeasureError::MissingTracks(Dataset::GroundTruth)),
            _ => Err(MeasureError::MissingTracks(Dataset::Result)),
        }
    }
}
