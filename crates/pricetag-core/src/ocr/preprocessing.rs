//! Image preprocessing for OCR.

use std::path::Path;

use image::{DynamicImage, GrayImage, ImageFormat};
use tempfile::NamedTempFile;
use tracing::debug;

use crate::error::OcrError;

/// Grayscale conversion followed by histogram contrast stretching.
pub struct ImagePreprocessor {
    /// Percentage of darkest and lightest pixels clipped before stretching.
    cutoff: f32,
}

impl ImagePreprocessor {
    pub fn new() -> Self {
        Self { cutoff: 2.0 }
    }

    pub fn with_cutoff(mut self, cutoff: f32) -> Self {
        self.cutoff = cutoff.clamp(0.0, 49.0);
        self
    }

    /// Grayscale and contrast-stretch an image.
    pub fn enhance(&self, image: &DynamicImage) -> GrayImage {
        let mut gray = image.to_luma8();
        self.autocontrast(&mut gray);
        gray
    }

    /// Load `path`, enhance it and write the result to a temporary PNG.
    ///
    /// The file is removed when the returned handle is dropped.
    pub fn prepare_file(&self, path: &Path) -> Result<NamedTempFile, OcrError> {
        let image = image::open(path).map_err(|e| OcrError::Preprocessing(e.to_string()))?;
        debug!("Loaded {} ({}x{})", path.display(), image.width(), image.height());

        let enhanced = self.enhance(&image);
        let file = tempfile::Builder::new()
            .prefix("pricetag-ocr-")
            .suffix(".png")
            .tempfile()
            .map_err(|e| OcrError::Preprocessing(e.to_string()))?;
        enhanced
            .save_with_format(file.path(), ImageFormat::Png)
            .map_err(|e| OcrError::Preprocessing(e.to_string()))?;
        Ok(file)
    }

    /// Stretch intensities so the clipped range spans 0..=255.
    fn autocontrast(&self, image: &mut GrayImage) {
        let mut histogram = [0u64; 256];
        for pixel in image.pixels() {
            histogram[pixel[0] as usize] += 1;
        }

        let Some((low, high)) = clipped_range(&histogram, self.cutoff) else {
            return;
        };

        let scale = 255.0 / (high - low) as f32;
        for pixel in image.pixels_mut() {
            let value = (pixel[0].saturating_sub(low)) as f32 * scale;
            pixel[0] = value.round().min(255.0) as u8;
        }
    }
}

impl Default for ImagePreprocessor {
    fn default() -> Self {
        Self::new()
    }
}

/// Lowest and highest intensities left after clipping `cutoff` percent of
/// pixels from each end. `None` when the image is flat.
fn clipped_range(histogram: &[u64; 256], cutoff: f32) -> Option<(u8, u8)> {
    let total: u64 = histogram.iter().sum();
    if total == 0 {
        return None;
    }
    let clip = (total as f64 * cutoff as f64 / 100.0) as u64;

    let mut seen = 0;
    let mut low = 0u8;
    for (value, count) in histogram.iter().enumerate() {
        seen += count;
        if seen > clip {
            low = value as u8;
            break;
        }
    }

    seen = 0;
    let mut high = 255u8;
    for (value, count) in histogram.iter().enumerate().rev() {
        seen += count;
        if seen > clip {
            high = value as u8;
            break;
        }
    }

    (high > low).then_some((low, high))
}

#[cfg(test)]
mod tests {
    use super::*;
    use image::Luma;

    fn gradient(from: u8, to: u8) -> GrayImage {
        let width = (to - from) as u32 + 1;
        GrayImage::from_fn(width, 1, |x, _| Luma([from + x as u8]))
    }

    #[test]
    fn test_stretches_to_full_range() {
        let mut image = gradient(100, 150);
        ImagePreprocessor::new().with_cutoff(0.0).autocontrast(&mut image);

        assert_eq!(image.get_pixel(0, 0)[0], 0);
        assert_eq!(image.get_pixel(50, 0)[0], 255);
    }

    #[test]
    fn test_flat_image_untouched() {
        let mut image = GrayImage::from_pixel(4, 4, Luma([90]));
        ImagePreprocessor::new().autocontrast(&mut image);
        assert!(image.pixels().all(|p| p[0] == 90));
    }

    #[test]
    fn test_cutoff_clips_outliers() {
        let mut histogram = [0u64; 256];
        histogram[0] = 1;
        histogram[100] = 98;
        histogram[101] = 98;
        histogram[255] = 1;

        assert_eq!(clipped_range(&histogram, 0.0), Some((0, 255)));
        assert_eq!(clipped_range(&histogram, 2.0), Some((100, 101)));
    }

    #[test]
    fn test_prepare_file_writes_png() {
        let dir = tempfile::tempdir().unwrap();
        let source = dir.path().join("tag.png");
        gradient(10, 60).save(&source).unwrap();

        let prepared = ImagePreprocessor::new().prepare_file(&source).unwrap();
        let reloaded = image::open(prepared.path()).unwrap().to_luma8();
        assert_eq!(reloaded.dimensions(), (51, 1));
    }

    #[test]
    fn test_prepare_file_rejects_non_image() {
        let dir = tempfile::tempdir().unwrap();
        let source = dir.path().join("tag.jpg");
        std::fs::write(&source, b"not an image").unwrap();

        assert!(matches!(
            ImagePreprocessor::new().prepare_file(&source),
            Err(OcrError::Preprocessing(_))
        ));
    }
}
