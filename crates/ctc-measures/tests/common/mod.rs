#![allow(dead_code)]

use ctc_measures::core::{Label, LabelImage, Track, TrackSet};
use ctc_measures::io::save_label_image;
use std::fs;
use std::path::{Path, PathBuf};
use tempfile::TempDir;

/// Objects of one frame as `(slot, label)`; each slot is a 4x4 block of a 40x40 image.
pub type FrameObjects = Vec<(usize, Label)>;

pub fn render(objects: &[(usize, Label)]) -> LabelImage {
    let mut img = LabelImage::empty(40, 40);
    for &(slot, label) in objects {
        let (x, y) = ((slot % 8) * 5, (slot / 8) * 5);
        img.fill_rect(x, y, x + 4, y + 4, label);
    }
    img
}

pub fn tracks(rows: &[(u16, u16, u32, u32)]) -> TrackSet {
    rows.iter()
        .map(|&(id, parent, begin, end)| Track::new(id, parent, begin, end))
        .collect()
}

/// A GT/RES pair on disk, laid out with three-digit frame indices.
pub struct Sequence {
    _root: TempDir,
    pub gt: PathBuf,
    pub res: PathBuf,
}

impl Sequence {
    /// GT tracking markers double as the GT segmentation of every frame.
    pub fn write(
        gt: &[FrameObjects],
        gt_tracks: &TrackSet,
        res: &[FrameObjects],
        res_tracks: &TrackSet,
    ) -> Self {
        let root = tempfile::tempdir().unwrap();
        let gt_dir = root.path().join("01_GT");
        let res_dir = root.path().join("01_RES");
        for dir in [gt_dir.join("TRA"), gt_dir.join("SEG"), res_dir.clone()] {
            fs::create_dir_all(dir).unwrap();
        }
        for (t, objects) in gt.iter().enumerate() {
            let img = render(objects);
            save_label_image(&gt_dir.join(format!("TRA/man_track{t:03}.tif")), &img).unwrap();
            save_label_image(&gt_dir.join(format!("SEG/man_seg{t:03}.tif")), &img).unwrap();
        }
        for (t, objects) in res.iter().enumerate() {
            save_label_image(&res_dir.join(format!("mask{t:03}.tif")), &render(objects)).unwrap();
        }
        fs::write(gt_dir.join("TRA/man_track.txt"), gt_tracks.to_text()).unwrap();
        fs::write(res_dir.join("res_track.txt"), res_tracks.to_text()).unwrap();
        Self {
            _root: root,
            gt: gt_dir,
            res: res_dir,
        }
    }

    pub fn identical(frames: &[FrameObjects], tracks: &TrackSet) -> Self {
        Self::write(frames, tracks, frames, tracks)
    }

    pub fn remove_images(&self) {
        for dir in [self.gt.join("TRA"), self.gt.join("SEG"), self.res.clone()] {
            remove_tifs(&dir);
        }
    }
}

fn remove_tifs(dir: &Path) {
    for entry in fs::read_dir(dir).unwrap() {
        let path = entry.unwrap().path();
        if path.extension().is_some_and(|e| e == "tif") {
            fs::remove_file(path).unwrap();
        }
    }
}

/// Track 1 on frames 0-2 divides into 2 and 3, which live on frames 3-4.
pub fn dividing_frames() -> Vec<FrameObjects> {
    let mut frames = vec![vec![(0, 1)]; 3];
    frames.extend(vec![vec![(1, 2), (2, 3)]; 2]);
    frames
}

pub fn dividing_tracks() -> TrackSet {
    tracks(&[(1, 0, 0, 2), (2, 1, 3, 4), (3, 1, 3, 4)])
}
