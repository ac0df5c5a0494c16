use std::fs::{self, OpenOptions};
use std::io::Write;
use std::path::{Path, PathBuf};
use csv::Writer;

use crate::errors::{BeadProfileError, Result};
use crate::profile::ProfileEntry;

/// Everything measured for one accepted bead
#[derive(Debug, Clone, PartialEq)]
pub struct BeadReport {
    pub bead_index: u32,
    pub file_label: String,
    pub entries: Vec<ProfileEntry>,
}

impl BeadReport {
    pub fn new(bead_index: u32, file_label: &str) -> Self {
        Self {
            bead_index,
            file_label: file_label.to_string(),
            entries: Vec::new(),
        }
    }
}

/// Format a peak value the way the report has always shown them:
/// whole numbers keep one decimal (`200.0`), others use the shortest exact form.
pub fn format_peak(value: f64) -> String {
    if value.is_nan() {
        "NaN".to_string()
    } else if value.is_infinite() {
        if value > 0.0 { "Infinity".to_string() } else { "-Infinity".to_string() }
    } else if value.fract() == 0.0 {
        format!("{:.1}", value)
    } else {
        format!("{}", value)
    }
}

/// Header line introducing a bead, without line breaks
pub fn format_header(file_label: &str, bead_index: u32) -> String {
    format!(" File= {} Cell {}", file_label, bead_index)
}

/// Profile line for one entry, without line breaks
pub fn format_entry(bead_index: u32, entry: &ProfileEntry) -> String {
    format!(
        "{} Profile Cell {}{}{} and {}",
        entry.channel.name(),
        bead_index,
        entry.orientation.report_label(),
        format_peak(entry.peaks.first_half_max),
        format_peak(entry.peaks.second_half_max),
    )
}

/// Append-only text report.
///
/// The file is opened for every write and flushed before it is closed, so each
/// line that was reported as written is on disk even if a later write fails.
#[derive(Debug, Clone)]
pub struct ReportWriter {
    path: PathBuf,
}

impl ReportWriter {
    pub fn new<P: AsRef<Path>>(path: P) -> Self {
        Self { path: path.as_ref().to_path_buf() }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Blank line, then the bead header
    pub fn write_header(&self, file_label: &str, bead_index: u32) -> Result<()> {
        self.append(&format!("\n{}\n", format_header(file_label, bead_index)))
    }

    /// Blank line, then the profile line
    pub fn write_entry(&self, bead_index: u32, entry: &ProfileEntry) -> Result<()> {
        self.append(&format!("\n{}\n", format_entry(bead_index, entry)))
    }

    fn append(&self, text: &str) -> Result<()> {
        let mut file = OpenOptions::new()
            .create(true)
            .append(true)
            .open(&self.path)?;
        file.write_all(text.as_bytes())?;
        file.flush()?;
        Ok(())
    }
}

/// Write all entries of a run to CSV, one row per entry
pub fn write_reports_csv<P: AsRef<Path>>(reports: &[BeadReport], path: P) -> Result<()> {
    let output_path = path.as_ref();

    if let Some(parent) = output_path.parent() {
        if !parent.as_os_str().is_empty() {
            fs::create_dir_all(parent)?;
        }
    }

    let mut writer = Writer::from_path(output_path)?;

    writer.write_record([
        "File",
        "Cell",
        "Channel",
        "Orientation",
        "First_Peak",
        "Second_Peak",
    ])?;

    for report in reports {
        for entry in &report.entries {
            writer.write_record(&[
                report.file_label.clone(),
                report.bead_index.to_string(),
                entry.channel.name().to_string(),
                entry.orientation.name().to_string(),
                format_peak(entry.peaks.first_half_max),
                format_peak(entry.peaks.second_half_max),
            ])?;
        }
    }

    writer.flush().map_err(|e| BeadProfileError::CsvOutput(csv::Error::from(e)))?;

    Ok(())
}
