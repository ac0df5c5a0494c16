// src/lib.rs - Library interface for the bead profiler

pub mod annotate;
pub mod config;
pub mod errors;
pub mod geometry;
pub mod image_io;
pub mod image_utils;
pub mod morphology;
pub mod output;
pub mod pipeline;
pub mod profile;
pub mod segmentation;
pub mod selection;
pub mod shape_analysis;
pub mod thresholding;

// Re-export commonly used types and functions
pub use errors::{BeadProfileError, Result};
pub use config::Config;
pub use pipeline::{process_image_pair, RunContext, RunOutput, RunSummary};
pub use image_io::{load_channel, load_channel_pair, save_image, ChannelImage, IntensityImage};

// Re-export the per-bead building blocks
pub use geometry::{build_segment, build_segments, LineSegment, Orientation, LINE_MARGIN};
pub use profile::{
    reduce_profile,
    Channel,
    LineSampler,
    ProfileEntry,
    ProfileSampler,
    SampleScope,
    TwinPeak,
};
pub use selection::{BeadSelector, SelectedBead, ROUNDNESS_CUTOFF};
pub use output::{format_entry, format_header, format_peak, write_reports_csv, BeadReport, ReportWriter};

// Re-export segmentation
pub use segmentation::{BeadCandidate, ParticleAnalyzer, Segmenter, MIN_REGION_SIZE};
pub use thresholding::ThresholdMethod;
pub use annotate::BeadAnnotator;
