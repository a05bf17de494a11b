//! Segmentation accuracy: mean Jaccard index over all GT objects.
//!
//! A GT object is paired with the RES object covering it; a GT object left
//! uncovered contributes zero. GT segmentation may annotate only some frames,
//! so the caller passes whichever frames carry it.

use crate::cache::FrameRecord;
use crate::error::MeasureError;
use ctc_measures_core::{Frame, Label};
use log::info;
use serde::{Deserialize, Serialize};

#[cfg(feature = "tracing")]
use tracing::instrument;

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct SegObjectScore {
    pub frame: Frame,
    pub gt: Label,
    pub res: Option<Label>,
    pub jaccard: f64,
}

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct SegResult {
    pub seg: f64,
    pub gt_objects: u64,
    pub objects: Vec<SegObjectScore>,
    /// RES labels of every scored frame, when requested.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub res_labels: Option<Vec<(Frame, Vec<Label>)>>,
}

#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub struct SegScorer {
    pub report_all_res_labels: bool,
}

impl SegScorer {
    #[cfg_attr(
        feature = "tracing",
        instrument(level = "info", skip(self, frames), fields(frames = frames.len()))
    )]
    pub fn score(&self, frames: &[FrameRecord]) -> Result<SegResult, MeasureError> {
        if frames.is_empty() {
            return Err(MeasureError::NoFrames);
        }
        let mut objects = Vec::new();
        for r in frames {
            let c = &r.classification;
            for (gi, &gt) in c.gt_labels().iter().enumerate() {
                let (res, jaccard) = match c.gt_match(gi) {
                    Some(ri) => (Some(c.res_labels()[ri]), c.jaccard(gi, ri)),
                    None => (None, 0.0),
                };
                objects.push(SegObjectScore {
                    frame: r.frame,
                    gt,
                    res,
                    jaccard,
                });
            }
        }
        if objects.is_empty() {
            return Err(MeasureError::NoGroundTruthObjects);
        }

        let seg = objects.iter().map(|o| o.jaccard).sum::<f64>() / objects.len() as f64;
        info!("SEG = {seg} over {} GT objects", objects.len());

        let res_labels = self.report_all_res_labels.then(|| {
            frames
                .iter()
                .map(|r| (r.frame, r.classification.res_labels().to_vec()))
                .collect()
        });
        Ok(SegResult {
            seg,
            gt_objects: objects.len() as u64,
            objects,
            res_labels,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::cache::{classify_frames, TrackDataCache};
    use crate::testutil::{cache, Fixed};
    use approx::assert_relative_eq;
    use ctc_measures_core::LabelImage;

    #[test]
    fn identical_segmentation_scores_one() {
        let frames = vec![vec![(0, 1), (3, 2)], vec![(0, 1)]];
        let c = cache(&frames, &frames);
        let r = SegScorer::default().score(c.frames()).unwrap();
        assert_eq!(r.seg, 1.0);
        assert_eq!(r.gt_objects, 3);
        assert!(r.res_labels.is_none());
    }

    #[test]
    fn partial_overlap_and_misses_average_in() {
        let mut gt = LabelImage::empty(10, 2);
        gt.fill_rect(0, 0, 4, 2, 1); // 8 px
        gt.fill_rect(6, 0, 8, 2, 2); // missed
        let mut res = LabelImage::empty(10, 2);
        res.fill_rect(0, 0, 3, 2, 5); // 6 px inside GT 1
        let records = classify_frames(&Fixed(vec![(gt, res)]), &[0]).unwrap();
        let c = TrackDataCache::from_frames(records).unwrap();

        let r = SegScorer {
            report_all_res_labels: true,
        }
        .score(c.frames())
        .unwrap();
        assert_relative_eq!(r.objects[0].jaccard, 0.75);
        assert_eq!(r.objects[1].res, None);
        assert_relative_eq!(r.seg, 0.375);
        assert_eq!(r.res_labels, Some(vec![(0, vec![5])]));
    }

    #[test]
    fn no_gt_objects_is_an_error() {
        let c = cache(&[vec![]], &[vec![(0, 1)]]);
        assert_eq!(
            SegScorer::default().score(c.frames()),
            Err(MeasureError::NoGroundTruthObjects)
        );
    }
}
