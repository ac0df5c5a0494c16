use std::time::Instant;
use clap::Parser;

use bead_profile_rust_lib::{process_image_pair, Config, Result, ThresholdMethod};

/// Command-line arguments
#[derive(Parser, Debug)]
#[clap(author, version, about = "Bead line profiles for green/red image pairs")]
struct Args {
    /// Green channel image (beads are found on this one)
    #[clap(short, long)]
    green: Option<String>,

    /// Red channel image
    #[clap(short, long)]
    red: Option<String>,

    /// Append-only text report
    #[clap(long)]
    report: Option<String>,

    /// Path to configuration file
    #[clap(short, long, default_value = "config.toml")]
    config: String,

    /// Threshold method (overwrites config)
    #[clap(short, long, value_enum)]
    threshold: Option<ThresholdMethod>,

    /// Also write all entries of this run to CSV
    #[clap(long)]
    csv: Option<String>,

    /// Save the green channel with bead numbers drawn on it
    #[clap(long)]
    annotate: Option<String>,

    /// Log segment geometry and rejected regions
    #[clap(short, long)]
    debug: bool,
}

fn main() -> Result<()> {
    let args = Args::parse();

    let default_filter = if args.debug { "debug" } else { "info" };
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or(default_filter)).init();

    // Missing config file means defaults
    let mut config = Config::from_file_or_default(&args.config)?;

    if let Some(green) = args.green {
        config.green_path = green;
    }
    if let Some(red) = args.red {
        config.red_path = red;
    }
    if let Some(report) = args.report {
        config.report_path = report;
    }
    if let Some(method) = args.threshold {
        config.threshold_method = method;
    }
    if args.csv.is_some() {
        config.csv_path = args.csv;
    }
    if args.annotate.is_some() {
        config.annotated_output = args.annotate;
    }

    config.validate()?;

    let start_time = Instant::now();
    println!("Processing {} / {}", config.green_path, config.red_path);

    let output = process_image_pair(&config)?;
    let summary = output.summary;

    println!("Regions found:   {}", summary.regions_found);
    println!("Beads accepted:  {}", summary.beads_accepted);
    println!("Entries written: {} (to {})", summary.entries_written, config.report_path);
    if summary.samples_skipped > 0 {
        println!("Samples skipped: {}", summary.samples_skipped);
    }
    if summary.write_failures > 0 {
        println!("Write failures:  {}", summary.write_failures);
    }

    let elapsed = start_time.elapsed();
    println!("Processing finished in {:.2} seconds", elapsed.as_secs_f64());

    Ok(())
}
