use std::path::{Path, PathBuf};
use image::{DynamicImage, ImageBuffer, ImageFormat, Luma, RgbImage};

use crate::errors::{BeadProfileError, Result};

/// Single-channel raster holding raw intensities
pub type IntensityImage = ImageBuffer<Luma<f32>, Vec<f32>>;

/// Represents one channel of the image pair with its metadata
#[derive(Debug, Clone)]
pub struct ChannelImage {
    pub intensities: IntensityImage,
    pub path: PathBuf,
    /// File name without extension, used as the report label
    pub label: String,
}

impl ChannelImage {
    /// Wrap an in-memory raster, e.g. for synthetic input
    pub fn from_intensities(intensities: IntensityImage, label: &str) -> Self {
        Self {
            intensities,
            path: PathBuf::from(label),
            label: label.to_string(),
        }
    }

    pub fn dimensions(&self) -> (u32, u32) {
        self.intensities.dimensions()
    }
}

/// Convert a decoded image to raw intensities.
/// 8 and 16 bit grayscale keep their native values, everything else goes through 8 bit luma.
pub fn to_intensity_image(image: &DynamicImage) -> IntensityImage {
    match image {
        DynamicImage::ImageLuma8(gray) => {
            let (width, height) = gray.dimensions();
            ImageBuffer::from_fn(width, height, |x, y| Luma([gray.get_pixel(x, y)[0] as f32]))
        }
        DynamicImage::ImageLuma16(gray) => {
            let (width, height) = gray.dimensions();
            ImageBuffer::from_fn(width, height, |x, y| Luma([gray.get_pixel(x, y)[0] as f32]))
        }
        other => {
            let gray = other.to_luma8();
            let (width, height) = gray.dimensions();
            ImageBuffer::from_fn(width, height, |x, y| Luma([gray.get_pixel(x, y)[0] as f32]))
        }
    }
}

/// Load a single channel image
pub fn load_channel<P: AsRef<Path>>(path: P) -> Result<ChannelImage> {
    let path = path.as_ref();

    let label = path.file_stem()
        .and_then(|s| s.to_str())
        .ok_or_else(|| BeadProfileError::InvalidPath(path.to_path_buf()))?
        .to_string();

    let img = image::open(path)?;

    Ok(ChannelImage {
        intensities: to_intensity_image(&img),
        path: path.to_path_buf(),
        label,
    })
}

/// Load the green and red channels, requiring identical dimensions
pub fn load_channel_pair<P: AsRef<Path>, Q: AsRef<Path>>(
    green_path: P,
    red_path: Q,
) -> Result<(ChannelImage, ChannelImage)> {
    let green = load_channel(green_path)?;
    let red = load_channel(red_path)?;
    check_same_size(&green, &red)?;
    Ok((green, red))
}

pub fn check_same_size(green: &ChannelImage, red: &ChannelImage) -> Result<()> {
    if green.dimensions() != red.dimensions() {
        return Err(BeadProfileError::DimensionMismatch {
            green: green.dimensions(),
            red: red.dimensions(),
        });
    }
    Ok(())
}

/// Save an RGB image as PNG
pub fn save_image<P: AsRef<Path>>(image: &RgbImage, path: P) -> Result<()> {
    image.save_with_format(path, ImageFormat::Png)?;
    Ok(())
}
