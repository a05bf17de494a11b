//! Synthetic label sequences for unit tests.

use crate::cache::{classify_frames, FrameSource, TrackDataCache};
use crate::error::MeasureError;
use ctc_measures_core::{Frame, Label, LabelImage};

/// `(slot, label)`: a 3x3 block at grid slot `slot` of a 32x32 image.
pub type Slot = (usize, Label);

pub fn slot_image(slots: &[Slot]) -> LabelImage {
    let mut img = LabelImage::empty(32, 32);
    for &(slot, label) in slots {
        let (x, y) = ((slot % 8) * 4, (slot / 8) * 4);
        img.fill_rect(x, y, x + 3, y + 3, label);
    }
    img
}

pub struct Fixed(pub Vec<(LabelImage, LabelImage)>);

impl FrameSource for Fixed {
    type Error = MeasureError;

    fn load_pair(&self, frame: Frame) -> Result<(LabelImage, LabelImage), MeasureError> {
        Ok(self.0[frame as usize].clone())
    }
}

/// Classify the paired frames into a cache without track metadata.
pub fn cache(gt: &[Vec<Slot>], res: &[Vec<Slot>]) -> TrackDataCache {
    let pairs = gt
        .iter()
        .zip(res)
        .map(|(g, r)| (slot_image(g), slot_image(r)))
        .collect();
    let frames: Vec<Frame> = (0..gt.len() as Frame).collect();
    let records = classify_frames(&Fixed(pairs), &frames).unwrap();
    TrackDataCache::from_frames(records).unwrap()
}
