use image::{GrayImage, Luma};
use imageproc::contrast::stretch_contrast;

use crate::image_io::IntensityImage;

/// Percentage of pixels allowed to saturate when stretching for display
pub const DISPLAY_SATURATION_PERCENT: f64 = 0.35;

/// Check if a point is inside the image bounds
#[inline]
pub fn in_bounds(x: i32, y: i32, width: u32, height: u32) -> bool {
    x >= 0 && y >= 0 && (x as u32) < width && (y as u32) < height
}

/// Bilinear interpolation at a sub-pixel position.
///
/// Returns `None` when the point lies outside the pixel centres of the raster.
pub fn interpolated_value(image: &IntensityImage, x: f64, y: f64) -> Option<f64> {
    let (width, height) = image.dimensions();
    if width == 0 || height == 0 {
        return None;
    }

    let max_x = (width - 1) as f64;
    let max_y = (height - 1) as f64;
    if x < 0.0 || y < 0.0 || x > max_x || y > max_y {
        return None;
    }

    let x0 = x.floor() as u32;
    let y0 = y.floor() as u32;
    let x1 = (x0 + 1).min(width - 1);
    let y1 = (y0 + 1).min(height - 1);
    let fx = x - x0 as f64;
    let fy = y - y0 as f64;

    let value = |px: u32, py: u32| image.get_pixel(px, py)[0] as f64;
    let top = value(x0, y0) + fx * (value(x1, y0) - value(x0, y0));
    let bottom = value(x0, y1) + fx * (value(x1, y1) - value(x0, y1));

    Some(top + fy * (bottom - top))
}

/// Convert raw intensities to 8 bit for thresholding.
///
/// Data that already fits 0..=255 in whole numbers is kept as is; wider data is
/// scaled linearly from its minimum and maximum.
pub fn to_gray8(image: &IntensityImage) -> GrayImage {
    let (width, height) = image.dimensions();
    let mut min_val = f32::INFINITY;
    let mut max_val = f32::NEG_INFINITY;
    let mut native_8bit = true;

    for pixel in image.pixels() {
        let v = pixel[0];
        min_val = min_val.min(v);
        max_val = max_val.max(v);
        if v < 0.0 || v > 255.0 || v.fract() != 0.0 {
            native_8bit = false;
        }
    }

    if native_8bit {
        return GrayImage::from_fn(width, height, |x, y| Luma([image.get_pixel(x, y)[0] as u8]));
    }

    let range = max_val - min_val;
    GrayImage::from_fn(width, height, |x, y| {
        if range <= 0.0 {
            return Luma([0]);
        }
        let scaled = (image.get_pixel(x, y)[0] - min_val) / range * 255.0;
        Luma([scaled.round().clamp(0.0, 255.0) as u8])
    })
}

/// 256-bin histogram of an 8 bit image
pub fn histogram(image: &GrayImage) -> [u32; 256] {
    let mut bins = [0u32; 256];
    for pixel in image.pixels() {
        bins[pixel[0] as usize] += 1;
    }
    bins
}

/// Display stretch that saturates `saturated_percent` of the pixels, split
/// evenly between the dark and bright ends.
pub fn saturated_stretch(image: &GrayImage, saturated_percent: f64) -> GrayImage {
    let bins = histogram(image);
    let total: u64 = bins.iter().map(|&c| c as u64).sum();
    if total == 0 {
        return image.clone();
    }

    let tail = (total as f64 * saturated_percent / 200.0) as u64;

    let mut lower = 0u8;
    let mut count = 0u64;
    for (level, &c) in bins.iter().enumerate() {
        count += c as u64;
        if count > tail {
            lower = level as u8;
            break;
        }
    }

    let mut upper = 255u8;
    count = 0;
    for (level, &c) in bins.iter().enumerate().rev() {
        count += c as u64;
        if count > tail {
            upper = level as u8;
            break;
        }
    }

    if upper <= lower {
        return image.clone();
    }

    stretch_contrast(image, lower, upper)
}
