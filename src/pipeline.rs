// File: pipeline.rs
// This file contains a complete analysis run: load one file, compute the requested
// features on the chosen signal, print them and export them.

use std::io::Write;
use std::path::{Path, PathBuf};
use crate::audiofile;
use crate::config::AppConfig;
use crate::error::FeatureError;
use crate::features::{extract, harmonic_percussive, FeatureKind, FeatureOutput, SignalSource, Sources, Tags};
use crate::report::{self, FeatureRecord, RenderOptions};

/// What to compute and where the results go
#[derive(Debug, Clone, PartialEq)]
pub struct RunOptions {
    /// Features to compute, in order. Empty means all of them.
    pub kinds: Vec<FeatureKind>,
    /// Signal the frame-based features run on
    pub source: SignalSource,
    pub tags: Tags,
    /// Width of rendered output in characters
    pub width: usize,
    pub json: Option<PathBuf>,
    pub csv_dir: Option<PathBuf>,
    pub wav_dir: Option<PathBuf>,
}

impl Default for RunOptions {
    fn default() -> Self {
        RunOptions {
            kinds: Vec::new(),
            source: SignalSource::Full,
            tags: Tags::default(),
            width: 80,
            json: None,
            csv_dir: None,
            wav_dir: None,
        }
    }
}

/// The outcome of a run
#[derive(Debug, Clone, PartialEq, Default)]
pub struct RunReport {
    /// False if the audio could not be loaded; then no feature ran
    pub loaded: bool,
    /// Results of the features that succeeded, in the order they ran
    pub records: Vec<FeatureRecord>,
    /// One message per failed feature or export
    pub failures: Vec<String>,
}

impl RunReport {
    /// 0 on success, 1 if the audio could not be loaded, 2 if any feature or export failed
    pub fn exit_code(&self) -> u8 {
        if !self.loaded {
            1
        } else if !self.failures.is_empty() {
            2
        } else {
            0
        }
    }

    fn fail(&mut self, msg: String) {
        log::error!("{}", msg);
        self.failures.push(msg);
    }
}

/// Loads `path` and runs the requested features on it. Rendered results are written to `out`.
///
/// A feature that fails is logged and counted; the others still run. If loading fails,
/// nothing else happens.
///
/// # Example
///
/// ```no_run
/// use aus_features::AppConfig;
/// use aus_features::pipeline::{run, RunOptions};
/// let report = run("speech.wav", &AppConfig::default(), &RunOptions::default(), &mut std::io::stdout());
/// std::process::exit(report.exit_code() as i32);
/// ```
pub fn run(path: impl AsRef<Path>, config: &AppConfig, options: &RunOptions, out: &mut impl Write) -> RunReport {
    let path = path.as_ref();
    let mut run_report = RunReport::default();
    let signal = match audiofile::load(path, &config.load) {
        Ok(x) => x,
        Err(err) => {
            log::error!("could not load {}: {}", path.to_string_lossy(), err);
            return run_report;
        }
    };
    run_report.loaded = true;

    let kinds: Vec<FeatureKind> = if options.kinds.is_empty() { FeatureKind::ALL.to_vec() } else { options.kinds.clone() };
    let render_options = RenderOptions { width: options.width, sample_rate: Some(signal.sample_rate()), ..Default::default() };
    let stem = path.file_stem().map_or_else(|| String::from("audio"), |x| x.to_string_lossy().to_string());
    let mut sources = Sources::new(signal);

    // The components are computed once and shared by every feature that needs them
    let needs_separation = kinds.contains(&FeatureKind::Hpss)
        || (options.source != SignalSource::Full && kinds.iter().any(|kind| kind.accepts_source()));
    let mut separation_error: Option<FeatureError> = None;
    if needs_separation {
        match harmonic_percussive(sources.full(), &config.features) {
            Ok(separation) => sources.set_separation(separation),
            Err(err) => {
                if !kinds.contains(&FeatureKind::Hpss) {
                    log::error!("harmonic/percussive separation failed: {}", err);
                }
                separation_error = Some(err);
            }
        }
    }

    for kind in kinds {
        let source = if kind.accepts_source() { options.source } else { SignalSource::Full };
        let result = match (kind, sources.separation(), &separation_error) {
            (FeatureKind::Hpss, Some(separation), _) => Ok(FeatureOutput::Separation(separation.clone())),
            (FeatureKind::Hpss, None, Some(err)) => Err(err.clone()),
            (_, None, Some(_)) if source != SignalSource::Full => Err(FeatureError::invalid(format!(
                "the {:?} component is unavailable because separation failed", source
            ))),
            _ => extract(kind, sources.get(source), &options.tags, &config.features),
        };
        let output = match result {
            Ok(x) => x,
            Err(err) => {
                run_report.fail(format!("{} failed: {}", kind.slug(), err));
                continue;
            }
        };

        if let Err(err) = writeln!(out, "{}", report::render(kind, &output, &render_options)) {
            run_report.fail(format!("could not print {}: {}", kind.slug(), err));
        }
        if let (Some(dir), FeatureOutput::Matrix(matrix)) = (&options.csv_dir, &output) {
            let csv_path = dir.join(format!("{}_{}.csv", stem, kind.slug()));
            if let Err(err) = report::write_csv(&csv_path, matrix) {
                run_report.fail(err.to_string());
            }
        }
        if let (Some(dir), FeatureOutput::Separation(separation)) = (&options.wav_dir, &output) {
            match report::write_separation(dir, &stem, separation) {
                Ok(paths) => log::info!("wrote {} component files", paths.len()),
                Err(err) => run_report.fail(err.to_string()),
            }
        }
        run_report.records.push(FeatureRecord { feature: kind, source, output });
    }

    if let Some(json_path) = &options.json {
        if let Err(err) = report::write_json(json_path, &run_report.records) {
            run_report.fail(err.to_string());
        }
    }

    if !run_report.failures.is_empty() {
        log::warn!("{} step(s) failed", run_report.failures.len());
    }
    run_report
}

#[cfg(test)]
mod test {
    use super::*;
    use crate::audiofile::{AudioFile, AudioFormat, LoadOptions};
    use crate::features::mfcc;
    use crate::synthesis::{click_train, sine};

    fn write_mix(dir: &tempfile::TempDir, sample_rate: u32) -> PathBuf {
        let len = sample_rate as usize;
        let samples: Vec<f64> = sine(440.0, 0.0, len, sample_rate)
            .into_iter()
            .zip(click_train(sample_rate as usize / 4, 64, 2000.0, len, sample_rate))
            .map(|(x, c)| 0.5 * x + 0.4 * c)
            .collect();
        let path = dir.path().join("mix.wav");
        audiofile::write(&path, &AudioFile::new_mono(AudioFormat::S16, sample_rate, samples)).unwrap();
        path
    }

    fn record(run_report: &RunReport, kind: FeatureKind) -> &FeatureRecord {
        run_report.records.iter().find(|r| r.feature == kind).unwrap()
    }

    #[test]
    fn test_load_failure_runs_nothing() {
        let dir = tempfile::tempdir().unwrap();
        let options = RunOptions { json: Some(dir.path().join("out.json")), ..Default::default() };
        let mut out: Vec<u8> = Vec::new();
        let run_report = run(dir.path().join("missing.wav"), &AppConfig::default(), &options, &mut out);
        assert_eq!(run_report.exit_code(), 1);
        assert!(run_report.records.is_empty());
        assert!(out.is_empty());
        assert!(!dir.path().join("out.json").exists());
    }

    #[test]
    fn test_failing_feature_does_not_stop_the_rest() {
        // at 8 kHz the upper contrast bands lie above Nyquist
        let dir = tempfile::tempdir().unwrap();
        let path = write_mix(&dir, 8000);
        let config = AppConfig { load: LoadOptions { sample_rate: None }, ..Default::default() };
        let mut out: Vec<u8> = Vec::new();
        let run_report = run(&path, &config, &RunOptions::default(), &mut out);

        assert_eq!(run_report.exit_code(), 2);
        assert_eq!(run_report.failures.len(), 1);
        assert!(run_report.failures[0].starts_with("spectral-contrast"));
        assert_eq!(run_report.records.len(), FeatureKind::ALL.len() - 1);
        assert!(run_report.records.iter().all(|r| r.feature != FeatureKind::SpectralContrast));
        let text = String::from_utf8(out).unwrap();
        assert!(text.contains("== Mel spectrogram =="));
    }

    #[test]
    fn test_bad_parameter_fails_one_feature() {
        let dir = tempfile::tempdir().unwrap();
        let path = write_mix(&dir, 22050);
        let mut config = AppConfig::default();
        config.features.n_mfcc = 500;
        let options = RunOptions { kinds: vec![FeatureKind::Info, FeatureKind::Mfcc, FeatureKind::SpectralCentroid], ..Default::default() };
        let run_report = run(&path, &config, &options, &mut std::io::sink());
        assert_eq!(run_report.exit_code(), 2);
        assert_eq!(run_report.records.len(), 2);
    }

    #[test]
    fn test_percussive_source_feeds_components() {
        let dir = tempfile::tempdir().unwrap();
        let path = write_mix(&dir, 22050);
        let config = AppConfig::default();
        let options = RunOptions {
            kinds: vec![FeatureKind::Info, FeatureKind::Hpss, FeatureKind::Mfcc],
            source: SignalSource::Percussive,
            ..Default::default()
        };
        let run_report = run(&path, &config, &options, &mut std::io::sink());
        assert_eq!(run_report.exit_code(), 0);

        let signal = audiofile::load(&path, &config.load).unwrap();
        let separation = harmonic_percussive(&signal, &config.features).unwrap();
        let expected = mfcc(&separation.percussive, &config.features).unwrap();
        let full = mfcc(&signal, &config.features).unwrap();

        let mfcc_record = record(&run_report, FeatureKind::Mfcc);
        assert_eq!(mfcc_record.source, SignalSource::Percussive);
        assert_eq!(mfcc_record.output, FeatureOutput::Matrix(expected));
        assert_ne!(mfcc_record.output, FeatureOutput::Matrix(full));

        // the overview and the separation ignore the source
        let info_record = record(&run_report, FeatureKind::Info);
        assert_eq!(info_record.source, SignalSource::Full);
        match &info_record.output {
            FeatureOutput::Info(info) => assert_eq!(info.num_samples, signal.len()),
            other => panic!("unexpected output {:?}", other),
        }
        let hpss_record = record(&run_report, FeatureKind::Hpss);
        assert_eq!(hpss_record.source, SignalSource::Full);
        assert_eq!(hpss_record.output, FeatureOutput::Separation(separation));
    }

    #[test]
    fn test_failed_separation_is_reported_once() {
        let dir = tempfile::tempdir().unwrap();
        let path = write_mix(&dir, 22050);
        let mut config = AppConfig::default();
        config.features.hpss_power = -1.0;
        let options = RunOptions {
            kinds: vec![FeatureKind::Hpss, FeatureKind::Mfcc, FeatureKind::ZeroCrossings],
            source: SignalSource::Harmonic,
            ..Default::default()
        };
        let run_report = run(&path, &config, &options, &mut std::io::sink());
        assert_eq!(run_report.exit_code(), 2);
        assert_eq!(run_report.failures.len(), 3);
        assert_eq!(run_report.failures.iter().filter(|msg| msg.contains("HPSS mask power")).count(), 1);
        assert!(run_report.records.is_empty());
    }

    #[test]
    fn test_exports() {
        let dir = tempfile::tempdir().unwrap();
        let path = write_mix(&dir, 22050);
        let options = RunOptions {
            kinds: vec![FeatureKind::Hpss, FeatureKind::SpectralCentroid],
            json: Some(dir.path().join("out.json")),
            csv_dir: Some(dir.path().to_path_buf()),
            wav_dir: Some(dir.path().to_path_buf()),
            ..Default::default()
        };
        let run_report = run(&path, &AppConfig::default(), &options, &mut std::io::sink());
        assert_eq!(run_report.exit_code(), 0);
        assert!(dir.path().join("mix_spectral-centroid.csv").exists());

        let json: serde_json::Value = serde_json::from_str(&std::fs::read_to_string(dir.path().join("out.json")).unwrap()).unwrap();
        assert_eq!(json.as_array().map(|records| records.len()), Some(2));
    }
}
