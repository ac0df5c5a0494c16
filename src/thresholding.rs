//! Automatic threshold selection for bright beads on a dark background.
//!
//! All methods work on the 256-bin histogram of an 8 bit image and return the
//! level at or below which pixels are background.

use clap::ValueEnum;
use image::GrayImage;
use imageproc::contrast::{otsu_level, threshold};
use serde::{Deserialize, Serialize};

use crate::image_utils::histogram;

/// Threshold method used to separate beads from background
#[derive(Debug, Deserialize, Serialize, Clone, Copy, PartialEq, Eq, Default, ValueEnum)]
pub enum ThresholdMethod {
    /// Maximum correlation criterion (Yen, Chang and Chang 1995)
    #[default]
    Yen,
    /// Iterative intermeans, ignoring the extreme bins
    Default,
    /// Between-class variance maximisation
    Otsu,
}

/// Compute the background level of `image`.
///
/// Returns `None` when the image holds a single intensity and nothing can be separated.
pub fn threshold_level(image: &GrayImage, method: ThresholdMethod) -> Option<u8> {
    let bins = histogram(image);
    let lowest = bins.iter().position(|&c| c > 0)?;
    let highest = bins.iter().rposition(|&c| c > 0)?;
    if lowest == highest {
        return None;
    }

    let level = match method {
        ThresholdMethod::Yen => yen_level(&bins, lowest, highest),
        ThresholdMethod::Default => iso_data_level(&bins),
        ThresholdMethod::Otsu => otsu_level(image),
    };
    Some(level)
}

/// Binary mask (255 = foreground) of pixels strictly brighter than the automatic level
pub fn foreground_mask(image: &GrayImage, method: ThresholdMethod) -> GrayImage {
    match threshold_level(image, method) {
        Some(level) => {
            log::debug!("{:?} threshold level: {}", method, level);
            threshold(image, level)
        }
        None => {
            log::debug!("{:?} threshold: single-level histogram, no foreground", method);
            GrayImage::new(image.width(), image.height())
        }
    }
}

fn yen_level(bins: &[u32; 256], lowest: usize, highest: usize) -> u8 {
    let total: f64 = bins.iter().map(|&c| c as f64).sum();
    let norm: Vec<f64> = bins.iter().map(|&c| c as f64 / total).collect();

    let mut p1 = [0.0f64; 256];
    let mut p1_sq = [0.0f64; 256];
    let mut p2_sq = [0.0f64; 256];

    p1[0] = norm[0];
    p1_sq[0] = norm[0] * norm[0];
    for i in 1..256 {
        p1[i] = p1[i - 1] + norm[i];
        p1_sq[i] = p1_sq[i - 1] + norm[i] * norm[i];
    }
    for i in (0..255).rev() {
        p2_sq[i] = p2_sq[i + 1] + norm[i + 1] * norm[i + 1];
    }

    let safe_ln = |v: f64| if v > 0.0 { v.ln() } else { 0.0 };

    // Candidates stop below the brightest occupied level so the foreground is never empty
    let mut best = lowest;
    let mut best_crit = f64::NEG_INFINITY;
    for t in lowest..highest {
        let crit = -safe_ln(p1_sq[t] * p2_sq[t]) + 2.0 * safe_ln(p1[t] * (1.0 - p1[t]));
        if crit > best_crit {
            best_crit = crit;
            best = t;
        }
    }
    best as u8
}

fn iso_data_level(bins: &[u32; 256]) -> u8 {
    let mut data = *bins;
    let max_value = data.len() - 1;
    // Extreme bins are usually clipped or erased areas
    data[0] = 0;
    data[max_value] = 0;

    let mut min = 0;
    while data[min] == 0 && min < max_value {
        min += 1;
    }
    let mut max = max_value;
    while data[max] == 0 && max > 0 {
        max -= 1;
    }
    if min >= max {
        return (data.len() / 2) as u8;
    }

    let mut moving = min;
    let mut result;
    loop {
        let (mut sum1, mut sum2, mut sum3, mut sum4) = (0.0, 0.0, 0.0, 0.0);
        for (i, &c) in data.iter().enumerate().take(moving + 1).skip(min) {
            sum1 += i as f64 * c as f64;
            sum2 += c as f64;
        }
        for (i, &c) in data.iter().enumerate().take(max + 1).skip(moving + 1) {
            sum3 += i as f64 * c as f64;
            sum4 += c as f64;
        }
        result = (sum1 / sum2 + sum3 / sum4) / 2.0;
        moving += 1;
        if !((moving + 1) as f64 <= result && moving < max - 1) {
            break;
        }
    }

    result.round().clamp(0.0, 255.0) as u8
}
