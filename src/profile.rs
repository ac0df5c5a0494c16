//! Line profiles: sampling intensities along a segment and reducing them to twin peaks.

use crate::geometry::{LineSegment, Orientation};
use crate::image_io::IntensityImage;
use crate::image_utils::interpolated_value;

/// Image channel of the pair
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Channel {
    Green,
    Red,
}

impl Channel {
    /// Green is always sampled before red
    pub const ALL: [Channel; 2] = [Channel::Green, Channel::Red];

    pub fn name(&self) -> &'static str {
        match self {
            Channel::Green => "Green",
            Channel::Red => "Red",
        }
    }
}

/// Brightest sample on each side of the profile midpoint
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct TwinPeak {
    pub first_half_max: f64,
    pub second_half_max: f64,
}

/// One reduced profile of a bead
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct ProfileEntry {
    pub channel: Channel,
    pub orientation: Orientation,
    pub peaks: TwinPeak,
}

/// Split the profile at `len / 2` and take the maximum of each half.
///
/// An empty half yields 0.
pub fn reduce_profile(values: &[f64]) -> TwinPeak {
    let (first, second) = values.split_at(values.len() / 2);
    TwinPeak {
        first_half_max: half_max(first),
        second_half_max: half_max(second),
    }
}

fn half_max(values: &[f64]) -> f64 {
    if values.is_empty() {
        return 0.0;
    }
    values.iter().copied().fold(f64::NEG_INFINITY, f64::max)
}

/// Source of intensity samples along a line.
///
/// Every call to `sample` may leave a transient surface open in the host;
/// `release` closes it. Use [`SampleScope`] so release happens on every path.
pub trait LineSampler {
    /// Ordered samples from start to end, or `None` when nothing can be sampled
    fn sample(&mut self, image: &IntensityImage, segment: &LineSegment) -> Option<Vec<f64>>;

    fn release(&mut self) {}
}

/// Scoped sampling: the sampler is released when the scope is dropped
pub struct SampleScope<'a, S: LineSampler + ?Sized> {
    sampler: &'a mut S,
}

impl<'a, S: LineSampler + ?Sized> SampleScope<'a, S> {
    pub fn open(sampler: &'a mut S) -> Self {
        Self { sampler }
    }

    pub fn sample(&mut self, image: &IntensityImage, segment: &LineSegment) -> Option<Vec<f64>> {
        self.sampler.sample(image, segment)
    }
}

impl<S: LineSampler + ?Sized> Drop for SampleScope<'_, S> {
    fn drop(&mut self) {
        self.sampler.release();
    }
}

/// Samples `round(length) + 1` evenly spaced, bilinearly interpolated points
/// including both endpoints. Points off the image read as 0.
#[derive(Debug, Default, Clone)]
pub struct ProfileSampler;

impl LineSampler for ProfileSampler {
    fn sample(&mut self, image: &IntensityImage, segment: &LineSegment) -> Option<Vec<f64>> {
        let steps = segment.length().round() as usize;
        if steps == 0 {
            return None;
        }

        let dx = segment.end_x - segment.start_x;
        let dy = segment.end_y - segment.start_y;
        let mut any_inside = false;

        let values: Vec<f64> = (0..=steps)
            .map(|i| {
                let x = segment.start_x + dx * i as f64 / steps as f64;
                let y = segment.start_y + dy * i as f64 / steps as f64;
                match interpolated_value(image, x, y) {
                    Some(v) => {
                        any_inside = true;
                        v
                    }
                    None => 0.0,
                }
            })
            .collect();

        if any_inside { Some(values) } else { None }
    }
}
