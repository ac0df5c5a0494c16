// src/pipeline.rs - Run context and per-bead profiling

use std::path::Path;

use crate::annotate::BeadAnnotator;
use crate::config::Config;
use crate::errors::Result;
use crate::geometry::build_segments;
use crate::image_io::{check_same_size, load_channel_pair, ChannelImage};
use crate::output::{write_reports_csv, BeadReport, ReportWriter};
use crate::profile::{reduce_profile, Channel, LineSampler, ProfileEntry, ProfileSampler, SampleScope};
use crate::segmentation::{BeadCandidate, ParticleAnalyzer, Segmenter};
use crate::selection::{BeadSelector, SelectedBead};

/// Counters reported to the operator when a run finishes
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct RunSummary {
    pub regions_found: usize,
    pub beads_accepted: u32,
    pub entries_written: usize,
    pub samples_skipped: usize,
    pub write_failures: usize,
}

/// Result of a finished run
#[derive(Debug, Clone)]
pub struct RunOutput {
    pub summary: RunSummary,
    pub reports: Vec<BeadReport>,
}

/// State that lives for exactly one run over one image pair
pub struct RunContext<S: LineSampler> {
    green: ChannelImage,
    red: ChannelImage,
    sampler: S,
    writer: ReportWriter,
    selector: BeadSelector,
    annotator: BeadAnnotator,
    reports: Vec<BeadReport>,
    summary: RunSummary,
}

impl<S: LineSampler> RunContext<S> {
    pub fn new<P: AsRef<Path>>(green: ChannelImage, red: ChannelImage, sampler: S, report_path: P) -> Result<Self> {
        check_same_size(&green, &red)?;
        let annotator = BeadAnnotator::new(&green);

        Ok(Self {
            green,
            red,
            sampler,
            writer: ReportWriter::new(report_path),
            selector: BeadSelector::new(),
            annotator,
            reports: Vec::new(),
            summary: RunSummary::default(),
        })
    }

    /// Segment the green channel and profile every accepted bead
    pub fn run<G: Segmenter + ?Sized>(&mut self, segmenter: &G) -> Result<()> {
        let candidates = segmenter.segment(&self.green)?;
        if candidates.is_empty() {
            log::warn!("No qualifying regions in {}", self.green.label);
        }
        self.process_candidates(&candidates);
        Ok(())
    }

    /// Select round candidates and profile them one at a time
    pub fn process_candidates(&mut self, candidates: &[BeadCandidate]) {
        self.summary.regions_found += candidates.len();

        let selected = self.selector.select(candidates);
        log::info!("{} of {} regions accepted as beads", selected.len(), candidates.len());

        for bead in &selected {
            let report = self.profile_bead(bead);
            self.reports.push(report);
        }
        self.summary.beads_accepted = self.selector.accepted();
    }

    /// Sample all four lines in both channels, writing each result as soon as it exists
    pub fn profile_bead(&mut self, bead: &SelectedBead) -> BeadReport {
        let candidate = &bead.candidate;
        log::info!(
            "Bead {}: centroid ({:.2}, {:.2}), box {}x{} at ({}, {}), roundness {:.3}",
            bead.index,
            candidate.centroid_x,
            candidate.centroid_y,
            candidate.bbox_width,
            candidate.bbox_height,
            candidate.bbox_x,
            candidate.bbox_y,
            candidate.roundness
        );

        let mut report = BeadReport::new(bead.index, &self.green.label);
        let mut header_attempted = false;

        for (orientation, segment) in build_segments(candidate) {
            log::debug!("Bead {} {}: {:?}", bead.index, orientation.name(), segment);

            for channel in Channel::ALL {
                let image = match channel {
                    Channel::Green => &self.green.intensities,
                    Channel::Red => &self.red.intensities,
                };

                let samples = {
                    let mut scope = SampleScope::open(&mut self.sampler);
                    scope.sample(image, &segment)
                };

                let Some(values) = samples else {
                    log::warn!(
                        "Bead {}: no profile data for {} {}, skipped",
                        bead.index,
                        channel.name(),
                        orientation.name()
                    );
                    self.summary.samples_skipped += 1;
                    continue;
                };

                let entry = ProfileEntry {
                    channel,
                    orientation,
                    peaks: reduce_profile(&values),
                };

                if !header_attempted {
                    header_attempted = true;
                    if let Err(e) = self.writer.write_header(&report.file_label, bead.index) {
                        self.report_write_failure(&e);
                    }
                }
                match self.writer.write_entry(bead.index, &entry) {
                    Ok(()) => self.summary.entries_written += 1,
                    Err(e) => self.report_write_failure(&e),
                }

                report.entries.push(entry);
            }
        }

        self.annotator.label_bead(bead.index, candidate);
        report
    }

    fn report_write_failure(&mut self, error: &crate::errors::BeadProfileError) {
        log::error!("Error writing to file '{}': {}", self.writer.path().display(), error);
        self.summary.write_failures += 1;
    }

    pub fn summary(&self) -> RunSummary {
        self.summary
    }

    pub fn annotator(&self) -> &BeadAnnotator {
        &self.annotator
    }

    /// End the run: write optional CSV and annotated image, hand back the results
    pub fn finish(self, csv_path: Option<&Path>, annotated_output: Option<&Path>) -> Result<RunOutput> {
        if let Some(path) = csv_path {
            write_reports_csv(&self.reports, path)?;
            log::info!("Wrote CSV summary to {}", path.display());
        }
        if let Some(path) = annotated_output {
            self.annotator.save(path)?;
            log::info!("Saved annotated image to {}", path.display());
        }

        Ok(RunOutput {
            summary: self.summary,
            reports: self.reports,
        })
    }
}

/// Process one green/red image pair as described by the configuration
pub fn process_image_pair(config: &Config) -> Result<RunOutput> {
    let (green, red) = load_channel_pair(&config.green_path, &config.red_path)?;
    log::info!(
        "Loaded {} and {} ({}x{})",
        green.label,
        red.label,
        green.dimensions().0,
        green.dimensions().1
    );

    let segmenter = ParticleAnalyzer::new(config.threshold_method);
    let mut context = RunContext::new(green, red, ProfileSampler, &config.report_path)?;
    context.run(&segmenter)?;

    context.finish(
        config.csv_path.as_deref().map(Path::new),
        config.annotated_output.as_deref().map(Path::new),
    )
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::geometry::LineSegment;
    use crate::image_io::IntensityImage;
    use image::Luma;
    use tempfile::tempdir;

    fn flat_pair(value: f32) -> (ChannelImage, ChannelImage) {
        (
            ChannelImage::from_intensities(IntensityImage::from_pixel(60, 60, Luma([value])), "green"),
            ChannelImage::from_intensities(IntensityImage::from_pixel(60, 60, Luma([value])), "red"),
        )
    }

    fn round_candidate(cx: f64, cy: f64) -> BeadCandidate {
        BeadCandidate {
            centroid_x: cx,
            centroid_y: cy,
            bbox_x: cx - 10.0,
            bbox_y: cy - 10.0,
            bbox_width: 20.0,
            bbox_height: 20.0,
            roundness: 1.0,
            area: 314,
        }
    }

    /// Fixed candidates, no image processing
    struct Fixed(Vec<BeadCandidate>);

    impl Segmenter for Fixed {
        fn segment(&self, _image: &ChannelImage) -> Result<Vec<BeadCandidate>> {
            Ok(self.0.clone())
        }
    }

    /// Counts calls and fails the n-th one
    struct FlakySampler {
        calls: usize,
        fail_on: Option<usize>,
        released: usize,
    }

    impl LineSampler for FlakySampler {
        fn sample(&mut self, image: &IntensityImage, segment: &LineSegment) -> Option<Vec<f64>> {
            self.calls += 1;
            if Some(self.calls) == self.fail_on {
                return None;
            }
            ProfileSampler.sample(image, segment)
        }

        fn release(&mut self) {
            self.released += 1;
        }
    }

    #[test]
    fn test_each_bead_gets_eight_entries_in_order() {
        let dir = tempdir().unwrap();
        let (green, red) = flat_pair(7.0);
        let mut context = RunContext::new(green, red, ProfileSampler, dir.path().join("r.txt")).unwrap();

        context.run(&Fixed(vec![round_candidate(20.0, 20.0), round_candidate(40.0, 40.0)])).unwrap();
        let output = context.finish(None, None).unwrap();

        assert_eq!(output.reports.len(), 2);
        let order: Vec<(Channel, &str)> = output.reports[0]
            .entries
            .iter()
            .map(|e| (e.channel, e.orientation.name()))
            .collect();
        assert_eq!(
            order,
            vec![
                (Channel::Green, "Vertical"),
                (Channel::Red, "Vertical"),
                (Channel::Green, "Horizontal"),
                (Channel::Red, "Horizontal"),
                (Channel::Green, "Backslash"),
                (Channel::Red, "Backslash"),
                (Channel::Green, "Forwardslash"),
                (Channel::Red, "Forwardslash"),
            ]
        );
        assert_eq!(output.summary.entries_written, 16);
        assert_eq!(output.reports[1].bead_index, 2);
    }

    #[test]
    fn test_rejected_regions_do_not_consume_indices() {
        let dir = tempdir().unwrap();
        let (green, red) = flat_pair(7.0);
        let mut context = RunContext::new(green, red, ProfileSampler, dir.path().join("r.txt")).unwrap();

        let mut oval = round_candidate(30.0, 30.0);
        oval.roundness = 0.6;
        context.process_candidates(&[oval, round_candidate(20.0, 20.0)]);

        let summary = context.summary();
        assert_eq!(summary.regions_found, 2);
        assert_eq!(summary.beads_accepted, 1);
        let output = context.finish(None, None).unwrap();
        assert_eq!(output.reports[0].bead_index, 1);
    }

    #[test]
    fn test_missing_sample_skips_one_entry_and_releases() {
        let dir = tempdir().unwrap();
        let (green, red) = flat_pair(7.0);
        let sampler = FlakySampler { calls: 0, fail_on: Some(4), released: 0 };
        let mut context = RunContext::new(green, red, sampler, dir.path().join("r.txt")).unwrap();

        context.process_candidates(&[round_candidate(20.0, 20.0), round_candidate(40.0, 40.0)]);

        assert_eq!(context.sampler.calls, 16);
        assert_eq!(context.sampler.released, 16);

        let output = context.finish(None, None).unwrap();
        assert_eq!(output.reports[0].entries.len(), 7);
        assert_eq!(output.reports[1].entries.len(), 8);
        assert_eq!(output.summary.samples_skipped, 1);
        // The fourth call is the red horizontal profile of bead 1
        assert!(!output.reports[0]
            .entries
            .iter()
            .any(|e| e.channel == Channel::Red && e.orientation.name() == "Horizontal"));
    }

    #[test]
    fn test_write_failure_does_not_stop_the_run() {
        let dir = tempdir().unwrap();
        let (green, red) = flat_pair(7.0);
        let unwritable = dir.path().join("no_such_dir").join("r.txt");
        let mut context = RunContext::new(green, red, ProfileSampler, unwritable).unwrap();

        context.process_candidates(&[round_candidate(20.0, 20.0), round_candidate(40.0, 40.0)]);
        let output = context.finish(None, None).unwrap();

        assert_eq!(output.reports.len(), 2);
        assert_eq!(output.reports[1].entries.len(), 8);
        assert_eq!(output.summary.entries_written, 0);
        // one header and eight entries per bead
        assert_eq!(output.summary.write_failures, 18);
    }

    #[test]
    fn test_mismatched_pair_is_rejected() {
        let green = ChannelImage::from_intensities(IntensityImage::new(10, 10), "g");
        let red = ChannelImage::from_intensities(IntensityImage::new(11, 10), "r");
        assert!(RunContext::new(green, red, ProfileSampler, "unused.txt").is_err());
    }
}
