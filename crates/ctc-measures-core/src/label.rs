use std::collections::BTreeMap;

/// Pixel value of a label image. `0` is background.
pub type Label = u16;

/// Zero-based timepoint index.
pub type Frame = u32;

pub const BACKGROUND: Label = 0;

/// Errors produced when wrapping raw label buffers.
#[derive(thiserror::Error, Debug, Clone, PartialEq, Eq)]
pub enum LabelImageError {
    #[error("invalid label image buffer length (expected {expected} pixels, got {got})")]
    InvalidBuffer { expected: usize, got: usize },

    #[error("invalid label image dimensions (width={width}, height={height})")]
    InvalidDimensions { width: usize, height: usize },
}

#[derive(Clone, Copy, Debug)]
pub struct LabelImageView<'a> {
    pub width: usize,
    pub height: usize,
    pub data: &'a [Label], // row-major, len = w*h
}

#[derive(Clone, Debug, PartialEq, Eq)]
pub struct LabelImage {
    pub width: usize,
    pub height: usize,
    pub data: Vec<Label>,
}

impl<'a> LabelImageView<'a> {
    pub fn new(width: usize, height: usize, data: &'a [Label]) -> Result<Self, LabelImageError> {
        let expected = width
            .checked_mul(height)
            .ok_or(LabelImageError::InvalidDimensions { width, height })?;
        if data.len() != expected {
            return Err(LabelImageError::InvalidBuffer {
                expected,
                got: data.len(),
            });
        }
        Ok(Self {
            width,
            height,
            data,
        })
    }

    #[inline]
    pub fn dims(&self) -> (usize, usize) {
        (self.width, self.height)
    }

    #[inline]
    pub fn get(&self, x: usize, y: usize) -> Label {
        self.data[y * self.width + x]
    }

    /// True if every pixel is background.
    pub fn is_background_only(&self) -> bool {
        self.data.iter().all(|&v| v == BACKGROUND)
    }

    /// Pixel count of every non-background label, sorted by label.
    pub fn label_sizes(&self) -> BTreeMap<Label, u64> {
        let mut sizes = BTreeMap::new();
        for &v in self.data {
            if v != BACKGROUND {
                *sizes.entry(v).or_insert(0u64) += 1;
            }
        }
        sizes
    }
}

impl LabelImage {
    pub fn new(width: usize, height: usize, data: Vec<Label>) -> Result<Self, LabelImageError> {
        LabelImageView::new(width, height, &data)?;
        Ok(Self {
            width,
            height,
            data,
        })
    }

    /// An all-background image.
    pub fn empty(width: usize, height: usize) -> Self {
        Self {
            width,
            height,
            data: vec![BACKGROUND; width * height],
        }
    }

    #[inline]
    pub fn view(&self) -> LabelImageView<'_> {
        LabelImageView {
            width: self.width,
            height: self.height,
            data: &self.data,
        }
    }

    /// Paint the half-open rectangle `[x0, x1) × [y0, y1)` with `label`.
    ///
    /// Coordinates are clipped to the image.
    pub fn fill_rect(&mut self, x0: usize, y0: usize, x1: usize, y1: usize, label: Label) {
        let x1 = x1.min(self.width);
        let y1 = y1.min(self.height);
        for y in y0.min(y1)..y1 {
            let row = y * self.width;
            for x in x0.min(x1)..x1 {
                self.data[row + x] = label;
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn view_rejects_wrong_length() {
        let data = vec![0u16; 5];
        let err = LabelImageView::new(2, 3, &data).unwrap_err();
        assert_eq!(
            err,
            LabelImageError::InvalidBuffer {
                expected: 6,
                got: 5
            }
        );
    }

    #[test]
    fn label_sizes_skip_background() {
        let mut img = LabelImage::empty(4, 4);
        img.fill_rect(0, 0, 2, 2, 7);
        img.fill_rect(3, 3, 10, 10, 2);

        let sizes = img.view().label_sizes();
        assert_eq!(sizes.len(), 2);
        assert_eq!(sizes[&7], 4);
        assert_eq!(sizes[&2], 1);
        assert!(!img.view().is_background_only());
        assert!(LabelImage::empty(3, 3).view().is_background_only());
    }
}
