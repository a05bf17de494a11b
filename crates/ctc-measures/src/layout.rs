//! Directory layout of a GT/RES sequence pair.
//!
//! ```text
//! <gt>/TRA/man_track.txt      <res>/res_track.txt
//! <gt>/TRA/man_trackTTT.tif   <res>/maskTTT.tif
//! <gt>/SEG/man_segTTT.tif
//! ```
//!
//! `TTT` is the zero-padded frame index, `digits` wide.

use crate::tracking::Dataset;
use ctc_measures_core::Frame;
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};

pub const DEFAULT_DIGITS: usize = 3;

fn default_digits() -> usize {
    DEFAULT_DIGITS
}

/// Numbered image files `<dir>/<prefix><frame>.tif`.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct FrameFiles {
    dir: PathBuf,
    prefix: &'static str,
    digits: usize,
}

impl FrameFiles {
    pub fn new(dir: impl Into<PathBuf>, prefix: &'static str, digits: usize) -> Self {
        Self {
            dir: dir.into(),
            prefix,
            digits,
        }
    }

    #[inline]
    pub fn dir(&self) -> &Path {
        &self.dir
    }

    pub fn path(&self, frame: Frame) -> PathBuf {
        self.dir
            .join(format!("{}{:0w$}.tif", self.prefix, frame, w = self.digits))
    }

    /// Number of readable files at frames `0, 1, 2, ...` before the first gap.
    pub fn count_consecutive(&self) -> Frame {
        let mut n = 0;
        while self.path(n).is_file() {
            n += 1;
        }
        n
    }

    /// Frame indices of all files following the naming scheme, sorted.
    pub fn list(&self) -> std::io::Result<Vec<Frame>> {
        let mut frames = Vec::new();
        for entry in std::fs::read_dir(&self.dir)? {
            let name = entry?.file_name();
            let Some(name) = name.to_str() else {
                continue;
            };
            let digits = name
                .strip_prefix(self.prefix)
                .and_then(|rest| rest.strip_suffix(".tif"));
            if let Some(d) = digits {
                if d.len() == self.digits && d.bytes().all(|b| b.is_ascii_digit()) {
                    if let Ok(frame) = d.parse() {
                        frames.push(frame);
                    }
                }
            }
        }
        frames.sort_unstable();
        Ok(frames)
    }
}

/// File naming convention of one sequence pair.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct SequenceLayout {
    /// Zero-padded width of the frame index in file names.
    #[serde(default = "default_digits")]
    pub digits: usize,
}

impl Default for SequenceLayout {
    fn default() -> Self {
        Self::new(DEFAULT_DIGITS)
    }
}

impl SequenceLayout {
    pub const fn new(digits: usize) -> Self {
        Self { digits }
    }

    pub fn track_file(&self, dataset: Dataset, dir: &Path) -> PathBuf {
        match dataset {
            Dataset::GroundTruth => dir.join("TRA").join("man_track.txt"),
            Dataset::Result => dir.join("res_track.txt"),
        }
    }

    /// Tracking images of a dataset (GT tracking markers or RES masks).
    pub fn tracking_images(&self, dataset: Dataset, dir: &Path) -> FrameFiles {
        match dataset {
            Dataset::GroundTruth => FrameFiles::new(dir.join("TRA"), "man_track", self.digits),
            Dataset::Result => FrameFiles::new(dir, "mask", self.digits),
        }
    }

    /// GT segmentation images, usually annotated on a few frames only.
    pub fn segmentation_images(&self, gt_dir: &Path) -> FrameFiles {
        FrameFiles::new(gt_dir.join("SEG"), "man_seg", self.digits)
    }

    /// Guess whether `dir` holds a result or a ground truth, from its track file.
    pub fn detect_dataset(&self, dir: &Path) -> Option<Dataset> {
        [Dataset::Result, Dataset::GroundTruth]
            .into_iter()
            .find(|&d| self.track_file(d, dir).is_file())
    }
}
