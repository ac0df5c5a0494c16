// src/annotate.rs - Bead numbers drawn onto the green channel

use std::path::Path;
use image::{Rgb, RgbImage};
use imageproc::drawing::{draw_filled_rect_mut, draw_hollow_rect_mut};
use imageproc::rect::Rect;

use crate::errors::Result;
use crate::image_io::{save_image, ChannelImage};
use crate::image_utils::{saturated_stretch, to_gray8, DISPLAY_SATURATION_PERCENT};
use crate::segmentation::BeadCandidate;

const LABEL_COLOR: Rgb<u8> = Rgb([255, 255, 0]);
const OUTLINE_COLOR: Rgb<u8> = Rgb([255, 255, 255]);

/// Pixel size of one glyph cell
const GLYPH_SCALE: u32 = 3;
const GLYPH_WIDTH: u32 = 3;
const GLYPH_HEIGHT: u32 = 5;

/// 3x5 bitmaps for 0-9, one row per entry, most significant bit on the left
static DIGITS: [[u8; 5]; 10] = [
    [0b111, 0b101, 0b101, 0b101, 0b111],
    [0b010, 0b110, 0b010, 0b010, 0b111],
    [0b111, 0b001, 0b111, 0b100, 0b111],
    [0b111, 0b001, 0b111, 0b001, 0b111],
    [0b101, 0b101, 0b111, 0b001, 0b001],
    [0b111, 0b100, 0b111, 0b001, 0b111],
    [0b111, 0b100, 0b111, 0b101, 0b111],
    [0b111, 0b001, 0b010, 0b010, 0b010],
    [0b111, 0b101, 0b111, 0b101, 0b111],
    [0b111, 0b101, 0b111, 0b001, 0b111],
];

/// Display copy of the green channel that collects bead labels.
///
/// Only the copy is drawn on; measured intensities are never touched.
pub struct BeadAnnotator {
    canvas: RgbImage,
}

impl BeadAnnotator {
    pub fn new(green: &ChannelImage) -> Self {
        let display = saturated_stretch(&to_gray8(&green.intensities), DISPLAY_SATURATION_PERCENT);
        let canvas = RgbImage::from_fn(display.width(), display.height(), |x, y| {
            let v = display.get_pixel(x, y)[0];
            Rgb([v, v, v])
        });
        Self { canvas }
    }

    pub fn canvas(&self) -> &RgbImage {
        &self.canvas
    }

    /// Outline the bead and write its number with the text origin at the truncated centroid
    pub fn label_bead(&mut self, index: u32, candidate: &BeadCandidate) {
        let width = candidate.bbox_width as u32;
        let height = candidate.bbox_height as u32;
        if width > 0 && height > 0 {
            let outline = Rect::at(candidate.bbox_x as i32, candidate.bbox_y as i32).of_size(width, height);
            draw_hollow_rect_mut(&mut self.canvas, outline, OUTLINE_COLOR);
        }

        // The number sits on the centroid like a text baseline
        let origin_x = candidate.centroid_x as i32;
        let origin_y = candidate.centroid_y as i32 - (GLYPH_HEIGHT * GLYPH_SCALE) as i32;
        self.draw_number(index, origin_x, origin_y);
    }

    fn draw_number(&mut self, number: u32, x: i32, y: i32) {
        let advance = ((GLYPH_WIDTH + 1) * GLYPH_SCALE) as i32;
        for (i, digit) in number.to_string().bytes().enumerate() {
            let glyph = &DIGITS[(digit - b'0') as usize];
            self.draw_glyph(glyph, x + i as i32 * advance, y);
        }
    }

    fn draw_glyph(&mut self, glyph: &[u8; 5], x: i32, y: i32) {
        for (row, bits) in glyph.iter().enumerate() {
            for col in 0..GLYPH_WIDTH {
                if bits & (1 << (GLYPH_WIDTH - 1 - col)) == 0 {
                    continue;
                }
                let cell = Rect::at(
                    x + (col * GLYPH_SCALE) as i32,
                    y + (row as u32 * GLYPH_SCALE) as i32,
                )
                .of_size(GLYPH_SCALE, GLYPH_SCALE);
                draw_filled_rect_mut(&mut self.canvas, cell, LABEL_COLOR);
            }
        }
    }

    pub fn save<P: AsRef<Path>>(&self, path: P) -> Result<()> {
        save_image(&self.canvas, path)
    }
}
