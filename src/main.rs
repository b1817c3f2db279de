// File: main.rs
// This file contains the command-line front end: it turns the arguments into
// a configuration and hands the run to the pipeline.

use std::path::PathBuf;
use std::process::ExitCode;
use clap::Parser;
use log::LevelFilter;
use aus_features::AppConfig;
use aus_features::features::{FeatureKind, SignalSource, Tags};
use aus_features::pipeline::{self, RunOptions};

#[derive(Parser, Debug)]
#[command(name = "aus-features", version, about = "Extract audio features from a sound file")]
struct Cli {
    /// Audio file to analyze
    path: PathBuf,

    /// Feature to compute; repeat for several. Defaults to all of them.
    #[arg(short, long = "feature", value_enum)]
    features: Vec<FeatureKind>,

    /// Signal the frame-based features run on
    #[arg(long, value_enum, default_value_t = SignalSource::Full)]
    source: SignalSource,

    /// Name shown in the audio overview
    #[arg(long, default_value = "")]
    label: String,

    /// Emotion tag shown in the audio overview
    #[arg(long, default_value = "")]
    emotion: String,

    /// Gender tag shown in the audio overview
    #[arg(long, default_value = "")]
    gender: String,

    /// Resample to this rate in Hz
    #[arg(long, conflicts_with = "native_rate")]
    sample_rate: Option<u32>,

    /// Keep the file's native sample rate
    #[arg(long)]
    native_rate: bool,

    /// Number of MFCCs
    #[arg(long)]
    n_mfcc: Option<usize>,

    /// JSON configuration file
    #[arg(long)]
    config: Option<PathBuf>,

    /// Write all results to this JSON file
    #[arg(long)]
    json: Option<PathBuf>,

    /// Write each matrix feature to a CSV file in this directory
    #[arg(long)]
    csv_dir: Option<PathBuf>,

    /// Write the harmonic and percussive components as WAV files in this directory
    #[arg(long)]
    wav_dir: Option<PathBuf>,

    /// Width of rendered output in characters
    #[arg(long, default_value_t = 80)]
    width: usize,

    /// More logging; repeat for more
    #[arg(short, long, action = clap::ArgAction::Count)]
    verbose: u8,

    /// Only log errors
    #[arg(short, long, conflicts_with = "verbose")]
    quiet: bool,
}

fn init_logging(cli: &Cli) {
    let level = if cli.quiet {
        LevelFilter::Error
    } else {
        match cli.verbose {
            0 => LevelFilter::Warn,
            1 => LevelFilter::Info,
            2 => LevelFilter::Debug,
            _ => LevelFilter::Trace,
        }
    };
    env_logger::Builder::new()
        .filter_level(level)
        .parse_default_env()
        .init();
}

fn main() -> ExitCode {
    let cli = Cli::parse();
    init_logging(&cli);

    let mut config = match &cli.config {
        Some(path) => match AppConfig::from_file(path) {
            Ok(x) => x,
            Err(err) => {
                log::error!("{}: {}", path.to_string_lossy(), err);
                return ExitCode::from(1);
            }
        },
        None => AppConfig::default(),
    };
    if cli.native_rate {
        config.load.sample_rate = None;
    } else if let Some(sample_rate) = cli.sample_rate {
        config.load.sample_rate = Some(sample_rate);
    }
    if let Some(n_mfcc) = cli.n_mfcc {
        config.features.n_mfcc = n_mfcc;
    }

    let options = RunOptions {
        kinds: cli.features,
        source: cli.source,
        tags: Tags::new(cli.label, cli.emotion, cli.gender),
        width: cli.width,
        json: cli.json,
        csv_dir: cli.csv_dir,
        wav_dir: cli.wav_dir,
    };
    let run_report = pipeline::run(&cli.path, &config, &options, &mut std::io::stdout().lock());
    ExitCode::from(run_report.exit_code())
}
