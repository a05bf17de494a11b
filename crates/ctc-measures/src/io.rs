//! Label image decoding and the on-disk frame sources.

use crate::error::EvalError;
use crate::layout::FrameFiles;
use crate::tracking::{Dataset, FrameSource};
use ctc_measures_core::{Frame, Label, LabelImage, LabelImageError};
use image::{DynamicImage, ImageBuffer, Luma};
use std::path::{Path, PathBuf};

#[cfg(feature = "tracing")]
use tracing::instrument;

#[derive(thiserror::Error, Debug)]
pub enum IoError {
    #[error("image '{0}' not found")]
    Missing(PathBuf),

    #[error("failed to decode image '{path}': {source}")]
    Decode {
        path: PathBuf,
        #[source]
        source: image::ImageError,
    },

    #[error("failed to write image '{path}': {source}")]
    Encode {
        path: PathBuf,
        #[source]
        source: image::ImageError,
    },

    #[error("'{path}' is not a single-channel label image (pixel format {color:?})")]
    UnsupportedFormat {
        path: PathBuf,
        color: image::ColorType,
    },

    #[error("failed to list '{path}': {source}")]
    ListDir {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error(transparent)]
    Label(#[from] LabelImageError),
}

/// Decode a 2D label image.
///
/// 16-bit grayscale is taken as is; 8-bit grayscale is widened without
/// rescaling so label values survive.
#[cfg_attr(feature = "tracing", instrument(level = "debug", skip(path), fields(path = %path.display())))]
pub fn load_label_image(path: &Path) -> Result<LabelImage, IoError> {
    if !path.is_file() {
        return Err(IoError::Missing(path.to_path_buf()));
    }
    let img = image::open(path).map_err(|source| IoError::Decode {
        path: path.to_path_buf(),
        source,
    })?;
    let (width, height) = (img.width() as usize, img.height() as usize);
    let data: Vec<Label> = match img {
        DynamicImage::ImageLuma16(buf) => buf.into_raw(),
        DynamicImage::ImageLuma8(buf) => buf.into_raw().into_iter().map(Label::from).collect(),
        other => {
            return Err(IoError::UnsupportedFormat {
                path: path.to_path_buf(),
                color: other.color(),
            })
        }
    };
    Ok(LabelImage::new(width, height, data)?)
}

/// Write a label image as 16-bit grayscale; the format follows the extension.
pub fn save_label_image(path: &Path, img: &LabelImage) -> Result<(), IoError> {
    let encode_err = |source| IoError::Encode {
        path: path.to_path_buf(),
        source,
    };
    let buf: ImageBuffer<Luma<u16>, Vec<u16>> =
        ImageBuffer::from_raw(img.width as u32, img.height as u32, img.data.clone()).ok_or(
            LabelImageError::InvalidBuffer {
                expected: img.width * img.height,
                got: img.data.len(),
            },
        )?;
    buf.save(path).map_err(encode_err)
}

/// GT and RES images of the same frame, read from two numbered file sets.
#[derive(Clone, Debug)]
pub struct PairSource {
    pub gt: FrameFiles,
    pub res: FrameFiles,
}

impl FrameSource for PairSource {
    type Error = EvalError;

    fn load_pair(&self, frame: Frame) -> Result<(LabelImage, LabelImage), EvalError> {
        let gt = load_label_image(&self.gt.path(frame))?;
        let res = load_label_image(&self.res.path(frame))?;
        Ok((gt, res))
    }
}

/// Images of one dataset, paired with an all-background partner.
#[derive(Clone, Debug)]
pub struct SingleSource {
    pub files: FrameFiles,
    pub dataset: Dataset,
}

impl FrameSource for SingleSource {
    type Error = EvalError;

    fn load_pair(&self, frame: Frame) -> Result<(LabelImage, LabelImage), EvalError> {
        let img = load_label_image(&self.files.path(frame))?;
        let blank = LabelImage::empty(img.width, img.height);
        Ok(match self.dataset {
            Dataset::GroundTruth => (img, blank),
            Dataset::Result => (blank, img),
        })
    }
}
