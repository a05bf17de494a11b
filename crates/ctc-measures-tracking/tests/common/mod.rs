#![allow(dead_code)]

use ctc_measures_tracking::{
    classify_frames, Frame, FrameSource, Label, LabelImage, MeasureError, Track, TrackDataCache,
    TrackSet,
};

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

struct InMemory(Vec<(LabelImage, LabelImage)>);

impl FrameSource for InMemory {
    type Error = MeasureError;

    fn load_pair(&self, frame: Frame) -> Result<(LabelImage, LabelImage), MeasureError> {
        Ok(self.0[frame as usize].clone())
    }
}

pub fn build_cache(gt: &[FrameObjects], res: &[FrameObjects]) -> TrackDataCache {
    let pairs = gt.iter().zip(res).map(|(g, r)| (render(g), render(r))).collect();
    let frames: Vec<Frame> = (0..gt.len() as Frame).collect();
    let records = classify_frames(&InMemory(pairs), &frames).unwrap();
    TrackDataCache::from_frames(records).unwrap()
}

pub fn tracks(rows: &[(u16, u16, u32, u32)]) -> TrackSet {
    rows.iter()
        .map(|&(id, parent, begin, end)| Track::new(id, parent, begin, end))
        .collect()
}
