// src/segmentation.rs - Turning the green channel into bead candidates

use image::Luma;
use imageproc::region_labelling::{connected_components, Connectivity};

use crate::errors::Result;
use crate::image_io::ChannelImage;
use crate::image_utils::to_gray8;
use crate::morphology::{exclude_edge_particles, fill_holes, watershed_split, BACKGROUND};
use crate::shape_analysis::{measure_regions, RegionStats};
use crate::thresholding::{foreground_mask, ThresholdMethod};

/// Particles smaller than this many pixels are not measured
pub const MIN_REGION_SIZE: u32 = 10;

/// One segmented region, as measured on the green channel
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct BeadCandidate {
    pub centroid_x: f64,
    pub centroid_y: f64,
    pub bbox_x: f64,
    pub bbox_y: f64,
    pub bbox_width: f64,
    pub bbox_height: f64,
    pub roundness: f64,
    pub area: u32,
}

impl From<&RegionStats> for BeadCandidate {
    fn from(stats: &RegionStats) -> Self {
        Self {
            centroid_x: stats.centroid.0,
            centroid_y: stats.centroid.1,
            bbox_x: stats.bounding_box.x as f64,
            bbox_y: stats.bounding_box.y as f64,
            bbox_width: stats.bounding_box.width as f64,
            bbox_height: stats.bounding_box.height as f64,
            roundness: stats.roundness,
            area: stats.area,
        }
    }
}

/// Produces candidate regions from a channel image
pub trait Segmenter {
    /// Disjoint regions in a stable order; an empty list when nothing qualifies
    fn segment(&self, image: &ChannelImage) -> Result<Vec<BeadCandidate>>;
}

/// Threshold, particle clean-up, watershed and measurement in one pass.
#[derive(Debug, Clone, Copy, Default)]
pub struct ParticleAnalyzer {
    pub method: ThresholdMethod,
}

impl ParticleAnalyzer {
    pub fn new(method: ThresholdMethod) -> Self {
        Self { method }
    }
}

impl Segmenter for ParticleAnalyzer {
    fn segment(&self, image: &ChannelImage) -> Result<Vec<BeadCandidate>> {
        let gray = to_gray8(&image.intensities);

        // Bright beads on a dark background
        let mask = foreground_mask(&gray, self.method);

        // First particle pass: drop edge particles, include holes
        let mask = fill_holes(&exclude_edge_particles(&mask));

        let mask = watershed_split(&mask);

        let labels = connected_components(&mask, Connectivity::Eight, Luma([BACKGROUND]));
        let regions = measure_regions(&labels, &image.intensities);
        let total = regions.len();

        let candidates: Vec<BeadCandidate> = regions
            .iter()
            .filter(|r| r.area >= MIN_REGION_SIZE)
            .map(BeadCandidate::from)
            .collect();

        log::info!(
            "Segmented {}: {} particles, {} of at least {} px",
            image.label,
            total,
            candidates.len(),
            MIN_REGION_SIZE
        );

        Ok(candidates)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::image_io::IntensityImage;

    fn scene(discs: &[(f64, f64, f64)], specks: &[(u32, u32)]) -> ChannelImage {
        let raster = IntensityImage::from_fn(80, 60, |x, y| {
            let in_disc = discs.iter().any(|&(cx, cy, r)| {
                (x as f64 - cx).powi(2) + (y as f64 - cy).powi(2) <= r * r
            });
            if in_disc || specks.contains(&(x, y)) { Luma([180.0]) } else { Luma([12.0]) }
        });
        ChannelImage::from_intensities(raster, "scene")
    }

    #[test]
    fn test_round_bead_is_found() {
        let image = scene(&[(30.0, 30.0, 9.0)], &[]);
        let candidates = ParticleAnalyzer::default().segment(&image).unwrap();

        assert_eq!(candidates.len(), 1);
        let bead = &candidates[0];
        assert!(bead.roundness >= 0.99);
        assert_eq!(bead.centroid_x as i64, 30);
        assert_eq!(bead.centroid_y as i64, 30);
        assert_eq!((bead.bbox_x, bead.bbox_y, bead.bbox_width, bead.bbox_height), (21.0, 21.0, 19.0, 19.0));
    }

    #[test]
    fn test_small_and_edge_particles_are_dropped() {
        let image = scene(&[(30.0, 30.0, 9.0), (2.0, 30.0, 5.0)], &[(60, 10), (61, 10), (60, 11)]);
        let candidates = ParticleAnalyzer::default().segment(&image).unwrap();
        assert_eq!(candidates.len(), 1);
        assert_eq!(candidates[0].centroid_x as i64, 30);
    }

    #[test]
    fn test_touching_beads_are_split() {
        let image = scene(&[(25.0, 30.0, 8.0), (39.0, 30.0, 8.0)], &[]);
        let candidates = ParticleAnalyzer::default().segment(&image).unwrap();
        assert_eq!(candidates.len(), 2);
        assert!(candidates[0].centroid_x < candidates[1].centroid_x);
    }

    #[test]
    fn test_blank_image_has_no_candidates() {
        let image = ChannelImage::from_intensities(IntensityImage::from_pixel(20, 20, Luma([5.0])), "blank");
        assert!(ParticleAnalyzer::new(ThresholdMethod::Otsu).segment(&image).unwrap().is_empty());
    }
}
