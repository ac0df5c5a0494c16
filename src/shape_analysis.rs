// src/shape_analysis.rs - Per-region measurements for bead candidates

use image::{ImageBuffer, Luma};
use nalgebra::Matrix2;
use std::collections::HashMap;

use crate::image_io::IntensityImage;

/// Integer pixel extents of a region; width and height are inclusive counts
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct BoundingBox {
    pub x: u32,
    pub y: u32,
    pub width: u32,
    pub height: u32,
}

/// Measurements of one labelled region
#[derive(Debug, Clone, PartialEq)]
pub struct RegionStats {
    pub label: u32,
    pub area: u32,
    pub centroid: (f64, f64),
    pub bounding_box: BoundingBox,
    pub roundness: f64,
}

#[derive(Debug, Default)]
struct Accumulator {
    area: u64,
    sum_x: f64,
    sum_y: f64,
    sum_xx: f64,
    sum_yy: f64,
    sum_xy: f64,
    sum_i: f64,
    sum_ix: f64,
    sum_iy: f64,
    min_x: u32,
    min_y: u32,
    max_x: u32,
    max_y: u32,
}

impl Accumulator {
    fn new(x: u32, y: u32) -> Self {
        Self { min_x: x, min_y: y, max_x: x, max_y: y, ..Default::default() }
    }

    fn add(&mut self, x: u32, y: u32, intensity: f64) {
        // Pixel centres sit half a pixel from the corner coordinates
        let cx = x as f64 + 0.5;
        let cy = y as f64 + 0.5;

        self.area += 1;
        self.sum_x += cx;
        self.sum_y += cy;
        self.sum_xx += cx * cx;
        self.sum_yy += cy * cy;
        self.sum_xy += cx * cy;
        self.sum_i += intensity;
        self.sum_ix += intensity * cx;
        self.sum_iy += intensity * cy;
        self.min_x = self.min_x.min(x);
        self.min_y = self.min_y.min(y);
        self.max_x = self.max_x.max(x);
        self.max_y = self.max_y.max(y);
    }

    fn finish(&self, label: u32) -> RegionStats {
        let n = self.area as f64;
        let mean_x = self.sum_x / n;
        let mean_y = self.sum_y / n;

        let centroid = if self.sum_i > 0.0 {
            (self.sum_ix / self.sum_i, self.sum_iy / self.sum_i)
        } else {
            (mean_x, mean_y)
        };

        // Each pixel is a unit square, which adds 1/12 to the axis moments
        let mu20 = self.sum_xx / n - mean_x * mean_x + 1.0 / 12.0;
        let mu02 = self.sum_yy / n - mean_y * mean_y + 1.0 / 12.0;
        let mu11 = self.sum_xy / n - mean_x * mean_y;

        RegionStats {
            label,
            area: self.area as u32,
            centroid,
            bounding_box: BoundingBox {
                x: self.min_x,
                y: self.min_y,
                width: self.max_x - self.min_x + 1,
                height: self.max_y - self.min_y + 1,
            },
            roundness: calculate_roundness(mu20, mu02, mu11),
        }
    }
}

/// Minor over major axis of the ellipse with the same second moments.
///
/// For an ellipse scaled to the region area this equals 4·area / (π·major²).
/// 1.0 for a perfect circle, towards 0 for elongated shapes.
pub fn calculate_roundness(mu20: f64, mu02: f64, mu11: f64) -> f64 {
    let eigenvalues = Matrix2::new(mu20, mu11, mu11, mu02).symmetric_eigenvalues();
    let major = eigenvalues[0].max(eigenvalues[1]);
    let minor = eigenvalues[0].min(eigenvalues[1]).max(0.0);

    if major <= 0.0 {
        return 1.0;
    }
    (minor / major).sqrt()
}

/// Measure every labelled region against the intensity image.
///
/// Regions are returned in raster-scan order of their first pixel.
/// The centroid is the intensity-weighted centre of mass, or the geometric
/// centroid when the region carries no intensity.
pub fn measure_regions(
    labels: &ImageBuffer<Luma<u32>, Vec<u32>>,
    intensities: &IntensityImage,
) -> Vec<RegionStats> {
    let mut accumulators: HashMap<u32, Accumulator> = HashMap::new();
    let mut order = Vec::new();

    for (x, y, label) in labels.enumerate_pixels() {
        let label = label[0];
        if label == 0 {
            continue;
        }
        let intensity = intensities.get_pixel(x, y)[0] as f64;
        accumulators
            .entry(label)
            .or_insert_with(|| {
                order.push(label);
                Accumulator::new(x, y)
            })
            .add(x, y, intensity);
    }

    order
        .into_iter()
        .filter_map(|label| accumulators.get(&label).map(|acc| acc.finish(label)))
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use assert_approx_eq::assert_approx_eq;

    fn label_image(width: u32, height: u32, f: impl Fn(u32, u32) -> u32) -> ImageBuffer<Luma<u32>, Vec<u32>> {
        ImageBuffer::from_fn(width, height, |x, y| Luma([f(x, y)]))
    }

    #[test]
    fn test_disc_is_round() {
        let labels = label_image(50, 50, |x, y| {
            let d2 = (x as f64 - 25.0).powi(2) + (y as f64 - 25.0).powi(2);
            if d2 <= 100.0 { 1 } else { 0 }
        });
        let intensities = IntensityImage::from_pixel(50, 50, Luma([10.0]));

        let stats = measure_regions(&labels, &intensities);
        assert_eq!(stats.len(), 1);
        let disc = &stats[0];
        assert!(disc.roundness >= 0.99, "roundness {}", disc.roundness);
        assert_approx_eq!(disc.centroid.0, 25.5);
        assert_approx_eq!(disc.centroid.1, 25.5);
        assert_eq!(disc.bounding_box, BoundingBox { x: 15, y: 15, width: 21, height: 21 });
    }

    #[test]
    fn test_bar_is_not_round() {
        let labels = label_image(30, 10, |x, y| if (5..25).contains(&x) && (3..7).contains(&y) { 1 } else { 0 });
        let intensities = IntensityImage::new(30, 10);

        let stats = measure_regions(&labels, &intensities);
        assert_eq!(stats[0].area, 80);
        assert_approx_eq!(stats[0].roundness, 0.2, 1e-9);
        assert_eq!(stats[0].bounding_box, BoundingBox { x: 5, y: 3, width: 20, height: 4 });
    }

    #[test]
    fn test_centre_of_mass_follows_intensity() {
        let labels = label_image(10, 1, |x, _| if x < 4 { 1 } else { 0 });
        let intensities = IntensityImage::from_fn(10, 1, |x, _| Luma([if x == 3 { 30.0 } else { 10.0 }]));

        let stats = measure_regions(&labels, &intensities);
        // (0.5*10 + 1.5*10 + 2.5*10 + 3.5*30) / 60
        assert_approx_eq!(stats[0].centroid.0, 2.5);
        assert_approx_eq!(stats[0].centroid.1, 0.5);
    }

    #[test]
    fn test_regions_in_raster_order() {
        let labels = label_image(10, 10, |x, y| match (x, y) {
            (7, 1) => 5,
            (2, 4) => 3,
            (8, 8) => 9,
            _ => 0,
        });
        let stats = measure_regions(&labels, &IntensityImage::new(10, 10));
        let order: Vec<u32> = stats.iter().map(|s| s.label).collect();
        assert_eq!(order, vec![5, 3, 9]);
        assert_approx_eq!(stats[0].roundness, 1.0);
    }
}
