//! Image preprocessing for table segmentation and OCR regions.

use image::{DynamicImage, GenericImageView, GrayImage, Luma};
use imageproc::contrast::{ThresholdType, threshold};
use imageproc::map::map_colors2;
use imageproc::morphology::{Mask, grayscale_dilate, grayscale_erode};

/// Longest line element a [`Mask`] can hold.
pub const MAX_LINE_LENGTH: u32 = 511;

/// Direction of a line structuring element.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Axis {
    /// Tall, 1-pixel-wide element; keeps vertical rulings.
    Vertical,
    /// Wide, 1-pixel-high element; keeps horizontal rulings.
    Horizontal,
}

const FOREGROUND: Luma<u8> = Luma([255]);

/// Smooth scan noise with the 3x3 binomial kernel (Gaussian, sigma derived from size).
pub fn blur_3x3(gray: &GrayImage) -> GrayImage {
    imageproc::filter::separable_filter_equal(gray, &[0.25f32, 0.5, 0.25])
}

/// Inverse binary threshold: pixels at or below `threshold` become foreground.
pub fn binarize_inverse(gray: &GrayImage, cutoff: u8) -> GrayImage {
    threshold(gray, cutoff, ThresholdType::BinaryInverted)
}

/// Morphological opening of a binary mask with a `length`-pixel line element.
///
/// Only runs of foreground at least `length` pixels long along `axis`
/// survive; everything else (text strokes, specks) is removed. `length` is
/// clamped to `1..=MAX_LINE_LENGTH`.
///
/// `grayscale_dilate` applies its mask unreflected, so the dilation uses
/// the mirrored element; with the same mask twice an even-length opening
/// would move every line by one pixel.
pub fn line_opening(mask: &GrayImage, length: u32, axis: Axis) -> GrayImage {
    let length = length.clamp(1, MAX_LINE_LENGTH);
    let anchor = length / 2;

    let element = line_mask(length, anchor, axis);
    let mirrored = line_mask(length, length - 1 - anchor, axis);

    grayscale_dilate(&grayscale_erode(mask, &element), &mirrored)
}

/// Pixelwise OR of two masks of equal size.
pub fn union(a: &GrayImage, b: &GrayImage) -> GrayImage {
    map_colors2(a, b, |p: Luma<u8>, q: Luma<u8>| Luma([p[0].max(q[0])]))
}

/// Cut a rectangle out of an image, clamped to its bounds.
///
/// Returns `None` when nothing of the rectangle lies inside the image.
pub fn crop_region(
    image: &DynamicImage,
    x: u32,
    y: u32,
    width: u32,
    height: u32,
) -> Option<DynamicImage> {
    let (img_w, img_h) = image.dimensions();
    if x >= img_w || y >= img_h {
        return None;
    }

    let width = width.min(img_w - x);
    let height = height.min(img_h - y);
    if width == 0 || height == 0 {
        return None;
    }

    Some(image.crop_imm(x, y, width, height))
}

/// `length`-pixel line element anchored at `anchor` along `axis`.
fn line_mask(length: u32, anchor: u32, axis: Axis) -> Mask {
    // length <= 511, so the anchor fits in a u8
    let anchor = anchor.min(u8::MAX as u32) as u8;
    match axis {
        Axis::Vertical => Mask::from_image(&GrayImage::from_pixel(1, length, FOREGROUND), 0, anchor),
        Axis::Horizontal => {
            Mask::from_image(&GrayImage::from_pixel(length, 1, FOREGROUND), anchor, 0)
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    fn foreground(mask: &GrayImage) -> usize {
        mask.pixels().filter(|p| p[0] > 0).count()
    }

    #[test]
    fn test_binarize_inverse() {
        let gray = GrayImage::from_fn(3, 1, |x, _| Luma([[0u8, 180, 181][x as usize]]));
        let bin = binarize_inverse(&gray, 180);
        assert_eq!(bin.as_raw(), &vec![255, 255, 0]);
    }

    #[test]
    fn test_opening_keeps_long_lines_only() {
        let mut mask = GrayImage::new(50, 60);
        // vertical ruling, 40px tall
        for y in 10..50 {
            mask.put_pixel(20, y, FOREGROUND);
        }
        // short stroke, 10px tall
        for y in 5..15 {
            mask.put_pixel(40, y, FOREGROUND);
        }

        let opened = line_opening(&mask, 30, Axis::Vertical);
        assert_eq!(foreground(&opened), 40);
        assert_eq!(opened.get_pixel(40, 10)[0], 0);

        let horizontal = line_opening(&mask, 30, Axis::Horizontal);
        assert_eq!(foreground(&horizontal), 0);
    }

    #[test]
    fn test_even_opening_keeps_line_in_place() {
        let mut mask = GrayImage::new(80, 5);
        for x in 10..50 {
            mask.put_pixel(x, 2, FOREGROUND);
        }

        let opened = line_opening(&mask, 30, Axis::Horizontal);
        assert_eq!(opened, mask);
    }

    #[test]
    fn test_opening_length_is_clamped() {
        let mut mask = GrayImage::new(600, 3);
        for x in 0..600 {
            mask.put_pixel(x, 1, FOREGROUND);
        }
        assert_eq!(line_opening(&mask, 10_000, Axis::Horizontal), mask);
        assert_eq!(foreground(&line_opening(&mask, 0, Axis::Vertical)), 600);
    }

    #[test]
    fn test_union() {
        let a = GrayImage::from_fn(2, 1, |x, _| Luma([if x == 0 { 255 } else { 0 }]));
        let b = GrayImage::from_fn(2, 1, |x, _| Luma([if x == 1 { 255 } else { 0 }]));
        assert_eq!(union(&a, &b).as_raw(), &vec![255, 255]);
    }

    #[test]
    fn test_crop_region_clamps() {
        let image = DynamicImage::new_luma8(100, 50);
        let crop = crop_region(&image, 90, 40, 30, 30).unwrap();
        assert_eq!(crop.dimensions(), (10, 10));
        assert!(crop_region(&image, 100, 0, 5, 5).is_none());
    }
}
