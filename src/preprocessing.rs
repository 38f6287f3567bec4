// Ultralytics 🚀 AGPL-3.0 License - https://ultralytics.com/license

//! Image preprocessing for PersonLab inference.
//!
//! PersonLab runs on a fixed working resolution. Images are stretched to that resolution (no
//! letterboxing, poses are later rescaled per axis), converted to RGB and normalized to
//! `[-1, 1]` in NHWC layout.

use image::imageops::FilterType;
use image::{DynamicImage, GenericImageView};
use ndarray::Array4;

use crate::pose::Resolution;

/// Reciprocal of 127.5 for normalization to `[-1, 1]`.
const INV_127_5: f32 = 1.0 / 127.5;

/// Result of preprocessing an image.
#[derive(Debug, Clone)]
pub struct PreprocessResult {
    /// Preprocessed image tensor in NHWC format, normalized to `[-1, 1]`.
    pub tensor: Array4<f32>,
    /// Source image resolution.
    pub orig_shape: Resolution,
}

/// Preprocess an image for PersonLab inference.
///
/// # Arguments
///
/// * `image` - Input image.
/// * `target_size` - Working resolution of the network.
#[must_use]
#[allow(clippy::cast_possible_truncation)]
pub fn preprocess_image(image: &DynamicImage, target_size: Resolution) -> PreprocessResult {
    let (orig_width, orig_height) = image.dimensions();

    let resized = image
        .resize_exact(
            target_size.width as u32,
            target_size.height as u32,
            FilterType::Triangle,
        )
        .to_rgb8();

    let tensor = Array4::from_shape_fn(
        (1, target_size.height, target_size.width, 3),
        |(_, y, x, c)| f32::from(resized.get_pixel(x as u32, y as u32)[c]) * INV_127_5 - 1.0,
    );

    PreprocessResult {
        tensor,
        orig_shape: Resolution::new(orig_height as usize, orig_width as usize),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use image::{Rgb, RgbImage};

    #[test]
    fn test_preprocess_shape_and_range() {
        let mut img = RgbImage::new(8, 4);
        for x in 0..4 {
            for y in 0..4 {
                img.put_pixel(x, y, Rgb([255, 255, 255]));
            }
        }
        let result = preprocess_image(&DynamicImage::ImageRgb8(img), Resolution::new(4, 8));

        assert_eq!(result.tensor.shape(), &[1, 4, 8, 3]);
        assert_eq!(result.orig_shape, Resolution::new(4, 8));
        assert!((result.tensor[[0, 0, 0, 0]] - 1.0).abs() < 1e-5);
        assert!((result.tensor[[0, 3, 7, 2]] + 1.0).abs() < 1e-5);
        assert!(result.tensor.iter().all(|v| (-1.0..=1.0).contains(v)));
    }

    #[test]
    fn test_preprocess_resizes() {
        let img = DynamicImage::ImageRgb8(RgbImage::new(640, 480));
        let result = preprocess_image(&img, Resolution::new(241, 289));
        assert_eq!(result.tensor.shape(), &[1, 241, 289, 3]);
        assert_eq!(result.orig_shape, Resolution::new(480, 640));
    }
}
