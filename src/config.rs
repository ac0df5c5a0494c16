use serde::{Deserialize, Serialize};
use std::fs;
use std::path::{Path, PathBuf};

use crate::errors::{BeadProfileError, Result};
use crate::thresholding::ThresholdMethod;

/// Run configuration for the bead profiler.
///
/// Algorithm constants (roundness cutoff, minimum region size, line margin)
/// live next to the code that uses them and are not configurable.
#[derive(Debug, Deserialize, Serialize, Clone, PartialEq)]
pub struct Config {
    /// Green channel image; beads are segmented on this channel
    #[serde(default)]
    pub green_path: String,

    /// Red channel image, sampled along the same lines
    #[serde(default)]
    pub red_path: String,

    /// Append-only text report shared by every run
    #[serde(default = "default_report_path")]
    pub report_path: String,

    #[serde(default)]
    pub threshold_method: ThresholdMethod,

    /// Optional CSV export of all entries of this run
    #[serde(default)]
    pub csv_path: Option<String>,

    /// Optional PNG of the green channel with bead numbers drawn on it
    #[serde(default)]
    pub annotated_output: Option<String>,
}

fn default_report_path() -> String {
    "Results.txt".to_string()
}

impl Default for Config {
    fn default() -> Self {
        Self {
            green_path: String::new(),
            red_path: String::new(),
            report_path: default_report_path(),
            threshold_method: ThresholdMethod::default(),
            csv_path: None,
            annotated_output: None,
        }
    }
}

impl Config {
    /// Load configuration from a TOML file
    pub fn from_file<P: AsRef<Path>>(path: P) -> Result<Self> {
        let path = path.as_ref();
        let content = fs::read_to_string(path).map_err(|e| {
            BeadProfileError::Config(format!("Failed to read config file '{}': {}", path.display(), e))
        })?;

        toml::from_str(&content).map_err(|source| BeadProfileError::ConfigLoad {
            source,
            path: path.to_path_buf(),
        })
    }

    /// Load the file if it exists, otherwise fall back to defaults
    pub fn from_file_or_default<P: AsRef<Path>>(path: P) -> Result<Self> {
        let path = path.as_ref();
        if path.is_file() {
            Self::from_file(path)
        } else {
            Ok(Self::default())
        }
    }

    /// Validate configuration
    pub fn validate(&self) -> Result<()> {
        for (name, value) in [("green_path", &self.green_path), ("red_path", &self.red_path)] {
            if value.is_empty() {
                return Err(BeadProfileError::Config(format!("{} must be set", name)));
            }
            let path = PathBuf::from(value);
            if !path.is_file() {
                return Err(BeadProfileError::InvalidPath(path));
            }
        }

        if self.report_path.trim().is_empty() {
            return Err(BeadProfileError::Config(
                "report_path must not be empty".to_string(),
            ));
        }

        Ok(())
    }

    /// Save configuration to a TOML file
    pub fn save_to_file<P: AsRef<Path>>(&self, path: P) -> Result<()> {
        let content = toml::to_string_pretty(self).map_err(|e| {
            BeadProfileError::Config(format!("Failed to serialize config: {}", e))
        })?;

        fs::write(path, content)?;

        Ok(())
    }
}
