use image::{GrayImage, Luma};
use imageproc::distance_transform::{distance_transform, Norm};
use imageproc::region_labelling::{connected_components, Connectivity};
use std::cmp::Reverse;
use std::collections::{BinaryHeap, HashMap, HashSet};

use crate::image_utils::in_bounds;

pub const FOREGROUND: u8 = 255;
pub const BACKGROUND: u8 = 0;

/// Seeds lower than this (in distance-map units) are ignored
const MIN_SEED_HEIGHT: u8 = 1;

/// A maximum only counts if no taller pixel is reachable without dropping more than this
const SEED_TOLERANCE: u8 = 1;

/// Direction vectors of the 8-neighbourhood
static NEIGHBOURS_8: [(i32, i32); 8] = [
    (1, 0),
    (1, 1),
    (0, 1),
    (-1, 1),
    (-1, 0),
    (-1, -1),
    (0, -1),
    (1, -1),
];

/// Fill background regions that do not reach the image border
pub fn fill_holes(mask: &GrayImage) -> GrayImage {
    let (width, height) = mask.dimensions();
    // Label the background: foreground pixels are treated as the "background" value here
    let labels = connected_components(mask, Connectivity::Four, Luma([FOREGROUND]));

    let mut outside = HashSet::new();
    for x in 0..width {
        outside.insert(labels.get_pixel(x, 0)[0]);
        outside.insert(labels.get_pixel(x, height.saturating_sub(1))[0]);
    }
    for y in 0..height {
        outside.insert(labels.get_pixel(0, y)[0]);
        outside.insert(labels.get_pixel(width.saturating_sub(1), y)[0]);
    }

    let mut filled = mask.clone();
    for (x, y, label) in labels.enumerate_pixels() {
        if label[0] != 0 && !outside.contains(&label[0]) {
            filled.put_pixel(x, y, Luma([FOREGROUND]));
        }
    }
    filled
}

/// Remove 8-connected particles that touch the image border
pub fn exclude_edge_particles(mask: &GrayImage) -> GrayImage {
    let (width, height) = mask.dimensions();
    let labels = connected_components(mask, Connectivity::Eight, Luma([BACKGROUND]));

    let mut touching = HashSet::new();
    for (x, y, label) in labels.enumerate_pixels() {
        if label[0] != 0 && (x == 0 || y == 0 || x + 1 == width || y + 1 == height) {
            touching.insert(label[0]);
        }
    }

    let mut kept = mask.clone();
    for (x, y, label) in labels.enumerate_pixels() {
        if touching.contains(&label[0]) {
            kept.put_pixel(x, y, Luma([BACKGROUND]));
        }
    }
    kept
}

#[derive(Debug, Clone)]
struct Seed {
    height: u8,
    x: f64,
    y: f64,
    pixels: Vec<(u32, u32)>,
}

/// Split touching particles along the valleys of their distance map.
///
/// Every regional maximum of the distance-to-background map seeds a basin;
/// seeds closer to a taller seed than that seed's height are absorbed into it.
/// Basins grow from the tallest pixels down, and a one pixel cut is made
/// wherever two basins meet so the parts are separate under 8-connectivity.
pub fn watershed_split(mask: &GrayImage) -> GrayImage {
    let (width, height) = mask.dimensions();
    if !mask.pixels().any(|p| p[0] == BACKGROUND) || !mask.pixels().any(|p| p[0] != BACKGROUND) {
        return mask.clone();
    }

    let inverted = GrayImage::from_fn(width, height, |x, y| {
        if mask.get_pixel(x, y)[0] == BACKGROUND { Luma([FOREGROUND]) } else { Luma([BACKGROUND]) }
    });
    let distance = distance_transform(&inverted, Norm::LInf);

    let seeds = merge_seeds(find_seeds(mask, &distance));
    if seeds.len() < 2 {
        return mask.clone();
    }

    let labels = flood_basins(mask, &distance, &seeds);

    let mut split = mask.clone();
    for y in 0..height {
        for x in 0..width {
            let label = labels[(y * width + x) as usize];
            if label == 0 {
                continue;
            }
            let cut = NEIGHBOURS_8.iter().any(|&(dx, dy)| {
                let nx = x as i32 + dx;
                let ny = y as i32 + dy;
                if !in_bounds(nx, ny, width, height) {
                    return false;
                }
                let other = labels[(ny as u32 * width + nx as u32) as usize];
                other != 0 && other < label
            });
            if cut {
                split.put_pixel(x, y, Luma([BACKGROUND]));
            }
        }
    }
    split
}

fn find_seeds(mask: &GrayImage, distance: &GrayImage) -> Vec<Seed> {
    let (width, height) = mask.dimensions();

    let maxima = GrayImage::from_fn(width, height, |x, y| {
        let value = distance.get_pixel(x, y)[0];
        if mask.get_pixel(x, y)[0] == BACKGROUND || value < MIN_SEED_HEIGHT {
            return Luma([BACKGROUND]);
        }
        let is_max = NEIGHBOURS_8.iter().all(|&(dx, dy)| {
            let nx = x as i32 + dx;
            let ny = y as i32 + dy;
            !in_bounds(nx, ny, width, height) || distance.get_pixel(nx as u32, ny as u32)[0] <= value
        });
        if is_max { Luma([FOREGROUND]) } else { Luma([BACKGROUND]) }
    });

    // Neighbouring maxima share the same height, so each plateau becomes one seed
    let plateaus = connected_components(&maxima, Connectivity::Eight, Luma([BACKGROUND]));
    let mut by_label: HashMap<u32, Seed> = HashMap::new();
    let mut order = Vec::new();
    for (x, y, label) in plateaus.enumerate_pixels() {
        if label[0] == 0 {
            continue;
        }
        let seed = by_label.entry(label[0]).or_insert_with(|| {
            order.push(label[0]);
            Seed { height: distance.get_pixel(x, y)[0], x: 0.0, y: 0.0, pixels: Vec::new() }
        });
        seed.pixels.push((x, y));
    }

    order
        .into_iter()
        .filter_map(|label| by_label.remove(&label))
        .filter(|seed| is_regional_maximum(mask, distance, seed))
        .map(|mut seed| {
            let n = seed.pixels.len() as f64;
            seed.x = seed.pixels.iter().map(|p| p.0 as f64).sum::<f64>() / n;
            seed.y = seed.pixels.iter().map(|p| p.1 as f64).sum::<f64>() / n;
            seed
        })
        .collect()
}

fn is_regional_maximum(mask: &GrayImage, distance: &GrayImage, seed: &Seed) -> bool {
    let (width, height) = mask.dimensions();
    let floor = seed.height.saturating_sub(SEED_TOLERANCE).max(MIN_SEED_HEIGHT);

    let mut visited: HashSet<(u32, u32)> = seed.pixels.iter().copied().collect();
    let mut stack = seed.pixels.clone();
    while let Some((x, y)) = stack.pop() {
        for &(dx, dy) in &NEIGHBOURS_8 {
            let nx = x as i32 + dx;
            let ny = y as i32 + dy;
            if !in_bounds(nx, ny, width, height) {
                continue;
            }
            let (nx, ny) = (nx as u32, ny as u32);
            if mask.get_pixel(nx, ny)[0] == BACKGROUND {
                continue;
            }
            let value = distance.get_pixel(nx, ny)[0];
            if value > seed.height {
                return false;
            }
            if value >= floor && visited.insert((nx, ny)) {
                stack.push((nx, ny));
            }
        }
    }
    true
}

fn merge_seeds(mut seeds: Vec<Seed>) -> Vec<Seed> {
    // Stable sort keeps raster order among equal heights
    seeds.sort_by_key(|s| Reverse(s.height));

    let mut kept: Vec<Seed> = Vec::new();
    for seed in seeds {
        let absorbed_by = kept.iter_mut().find(|k| {
            let d = ((k.x - seed.x).powi(2) + (k.y - seed.y).powi(2)).sqrt();
            d <= k.height as f64
        });
        match absorbed_by {
            Some(k) => k.pixels.extend(seed.pixels),
            None => kept.push(seed),
        }
    }
    kept
}

fn flood_basins(mask: &GrayImage, distance: &GrayImage, seeds: &[Seed]) -> Vec<u32> {
    let (width, height) = mask.dimensions();
    let mut labels = vec![0u32; (width * height) as usize];
    let mut queue = BinaryHeap::new();
    let mut sequence = 0u64;

    for (i, seed) in seeds.iter().enumerate() {
        for &(x, y) in &seed.pixels {
            labels[(y * width + x) as usize] = i as u32 + 1;
            queue.push((distance.get_pixel(x, y)[0], Reverse(sequence), x, y));
            sequence += 1;
        }
    }

    while let Some((_, _, x, y)) = queue.pop() {
        let label = labels[(y * width + x) as usize];
        for &(dx, dy) in &NEIGHBOURS_8 {
            let nx = x as i32 + dx;
            let ny = y as i32 + dy;
            if !in_bounds(nx, ny, width, height) {
                continue;
            }
            let (nx, ny) = (nx as u32, ny as u32);
            let idx = (ny * width + nx) as usize;
            if labels[idx] == 0 && mask.get_pixel(nx, ny)[0] != BACKGROUND {
                labels[idx] = label;
                queue.push((distance.get_pixel(nx, ny)[0], Reverse(sequence), nx, ny));
                sequence += 1;
            }
        }
    }

    labels
}

/// Number of 8-connected particles in a mask
pub fn count_particles(mask: &GrayImage) -> u32 {
    let labels = connected_components(mask, Connectivity::Eight, Luma([BACKGROUND]));
    labels.pixels().map(|p| p[0]).max().unwrap_or(0)
}
