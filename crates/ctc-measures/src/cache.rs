//! Explicit evaluation context passed from one measure to the next.

use crate::layout::SequenceLayout;
use crate::tracking::{FrameRecord, TrackDataCache};
use log::debug;
use std::path::PathBuf;

/// Inputs a cache was built from.
#[derive(Clone, Debug, PartialEq, Eq, Hash)]
pub struct CacheKey {
    pub gt_dir: PathBuf,
    pub res_dir: PathBuf,
    pub layout: SequenceLayout,
}

/// Classified frames of one GT/RES pair, reusable across measures.
///
/// Owned by the caller and lent to one measure at a time. Content built from
/// other inputs is dropped on first use.
#[derive(Debug, Default)]
pub struct EvaluationCache {
    key: Option<CacheKey>,
    tracking: Option<TrackDataCache>,
    segmentation: Option<Vec<FrameRecord>>,
}

impl EvaluationCache {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn key(&self) -> Option<&CacheKey> {
        self.key.as_ref()
    }

    pub fn is_empty(&self) -> bool {
        self.tracking.is_none() && self.segmentation.is_none()
    }

    /// Keep the content only if it was built from `key`.
    pub fn retarget(&mut self, key: &CacheKey) {
        if self.key.as_ref() == Some(key) {
            return;
        }
        if !self.is_empty() {
            debug!("inputs changed, dropping cached classification");
        }
        *self = Self {
            key: Some(key.clone()),
            ..Self::default()
        };
    }

    /// Every tracking frame of the sequence, classified.
    pub fn tracking(&self) -> Option<&TrackDataCache> {
        self.tracking.as_ref()
    }

    pub(crate) fn tracking_mut(&mut self) -> Option<&mut TrackDataCache> {
        self.tracking.as_mut()
    }

    pub(crate) fn set_tracking(&mut self, cache: TrackDataCache) {
        self.tracking = Some(cache);
    }

    /// Every frame carrying GT segmentation, classified.
    pub fn segmentation(&self) -> Option<&[FrameRecord]> {
        self.segmentation.as_deref()
    }

    pub(crate) fn set_segmentation(&mut self, frames: Vec<FrameRecord>) {
        self.segmentation = Some(frames);
    }
}
