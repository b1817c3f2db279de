// File: report.rs
// This file contains the presentation layer: text rendering of feature outputs
// and export to JSON, CSV and WAV. Nothing here computes features.

use std::fmt;
use std::fs::File;
use std::io::{BufWriter, Write};
use std::path::{Path, PathBuf};
use serde::Serialize;
use crate::audiofile::{self, AudioFile, AudioFormat};
use crate::error::ReportError;
use crate::features::{AudioInfo, FeatureKind, FeatureMatrix, FeatureOutput, HarmonicPercussive, SignalSource};
use crate::tuning::PITCH_CLASSES;

// Heatmap levels, from lowest to highest
const RAMP: [char; 10] = [' ', '.', ':', '-', '=', '+', '*', '#', '%', '@'];
// Sparkline levels, from lowest to highest
const BLOCKS: [char; 8] = ['▁', '▂', '▃', '▄', '▅', '▆', '▇', '█'];
const TONNETZ_LABELS: [&str; 6] = ["5th x", "5th y", "min3 x", "min3 y", "maj3 x", "maj3 y"];

/// Controls the size of rendered output
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct RenderOptions {
    /// Total width in characters
    pub width: usize,
    /// Heatmaps with more rows than this are averaged down
    pub max_rows: usize,
    /// Used to report zero crossings per second
    pub sample_rate: Option<u32>,
}

impl Default for RenderOptions {
    fn default() -> Self {
        RenderOptions { width: 80, max_rows: 32, sample_rate: None }
    }
}

/// One exported result
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct FeatureRecord {
    pub feature: FeatureKind,
    pub source: SignalSource,
    pub output: FeatureOutput,
}

impl fmt::Display for AudioInfo {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        writeln!(f, "Name:        {}", self.label)?;
        writeln!(f, "Gender:      {}", self.gender)?;
        writeln!(f, "Emotion:     {}", self.emotion)?;
        writeln!(f, "Duration:    {:.3} s", self.duration)?;
        writeln!(f, "Sample rate: {} samples/sec", self.sample_rate)?;
        writeln!(f, "Samples:     {}", self.num_samples)?;
        writeln!(f, "Peak:        {:.2} dBFS", self.peak_dbfs)?;
        write!(f, "RMS:         {:.4}", self.rms)
    }
}

/// Averages `values` down to at most `width` buckets
fn downsample(values: &[f64], width: usize) -> Vec<f64> {
    let n = values.len();
    if n <= width || width == 0 {
        return values.to_vec();
    }
    (0..width)
        .map(|c| {
            let start = c * n / width;
            let end = usize::max((c + 1) * n / width, start + 1);
            values[start..end].iter().sum::<f64>() / (end - start) as f64
        })
        .collect()
}

fn min_max<'a>(values: impl Iterator<Item = &'a f64>) -> (f64, f64) {
    values.fold((f64::INFINITY, f64::NEG_INFINITY), |(lo, hi), &x| (lo.min(x), hi.max(x)))
}

/// Maps `x` in `lo..=hi` onto `0..levels`
fn level(x: f64, lo: f64, hi: f64, levels: usize) -> usize {
    if hi - lo <= f64::EPSILON {
        return 0;
    }
    let scaled = ((x - lo) / (hi - lo) * (levels - 1) as f64).round();
    (scaled.max(0.0) as usize).min(levels - 1)
}

fn row_labels(kind: FeatureKind, num_rows: usize) -> Vec<String> {
    match kind {
        FeatureKind::ChromaCens if num_rows == 12 => PITCH_CLASSES.iter().map(|x| x.to_string()).collect(),
        FeatureKind::Tonnetz if num_rows == 6 => TONNETZ_LABELS.iter().map(|x| x.to_string()).collect(),
        FeatureKind::Mfcc => (0..num_rows).map(|i| format!("c{}", i)).collect(),
        FeatureKind::SpectralContrast => (0..num_rows).map(|i| format!("band {}", i)).collect(),
        FeatureKind::MelSpectrogram => (0..num_rows).map(|i| format!("mel {}", i)).collect(),
        _ => (0..num_rows).map(|i| i.to_string()).collect(),
    }
}

/// Renders a matrix as a character heatmap, highest row on top
fn render_heatmap(kind: FeatureKind, matrix: &FeatureMatrix, options: &RenderOptions) -> String {
    let labels = row_labels(kind, matrix.num_rows());
    let label_width = labels.iter().map(|x| x.len()).max().unwrap_or(0);
    let columns = options.width.saturating_sub(label_width + 3).max(1);

    // average groups of rows so tall matrices fit
    let num_groups = matrix.num_rows().min(options.max_rows.max(1));
    let mut rows: Vec<(String, Vec<f64>)> = Vec::with_capacity(num_groups);
    for g in 0..num_groups {
        let start = g * matrix.num_rows() / num_groups;
        let end = usize::max((g + 1) * matrix.num_rows() / num_groups, start + 1);
        let mut averaged: Vec<f64> = vec![0.0; matrix.num_frames()];
        for row in &matrix.data[start..end] {
            for (acc, x) in averaged.iter_mut().zip(row.iter()) {
                *acc += x / (end - start) as f64;
            }
        }
        rows.push((labels[start].clone(), downsample(&averaged, columns)));
    }

    let (lo, hi) = min_max(rows.iter().flat_map(|(_, row)| row.iter()));
    let mut out = String::new();
    for (label, row) in rows.iter().rev() {
        let cells: String = row.iter().map(|&x| RAMP[level(x, lo, hi, RAMP.len())]).collect();
        out.push_str(&format!("{:>width$} |{}\n", label, cells, width = label_width));
    }
    out.push_str(&format!(
        "{} rows x {} frames ({:.2} s), values {:.3} to {:.3}\n",
        matrix.num_rows(),
        matrix.num_frames(),
        matrix.frame_time(matrix.num_frames().saturating_sub(1)),
        lo,
        hi
    ));
    out
}

/// Renders a single-row series as a sparkline. Hz series are shown on a log scale.
fn render_series(kind: FeatureKind, series: &[f64], options: &RenderOptions) -> String {
    let log_scale = matches!(kind, FeatureKind::SpectralCentroid | FeatureKind::SpectralRolloff);
    let shown: Vec<f64> = downsample(series, options.width.max(1))
        .into_iter()
        .map(|x| if log_scale { f64::ln(x.max(1.0)) } else { x })
        .collect();
    let (lo, hi) = min_max(shown.iter());
    let line: String = shown.iter().map(|&x| BLOCKS[level(x, lo, hi, BLOCKS.len())]).collect();

    let (min, max) = min_max(series.iter());
    let mean = if series.is_empty() { 0.0 } else { series.iter().sum::<f64>() / series.len() as f64 };
    let unit = if log_scale { " Hz" } else { "" };
    format!(
        "{}\nmin {:.1}{unit}, mean {:.1}{unit}, max {:.1}{unit}{}\n",
        line,
        min,
        mean,
        max,
        if log_scale { " (log scale)" } else { "" },
        unit = unit
    )
}

fn render_crossings(crossings: &[bool], options: &RenderOptions) -> String {
    let count = crossings.iter().skip(1).filter(|&&x| x).count();
    let mut out = format!("{} zero crossings in {} samples\n", count, crossings.len());
    if crossings.len() > 1 {
        out.push_str(&format!("{:.4} crossings per sample\n", count as f64 / (crossings.len() - 1) as f64));
    }
    if let Some(sample_rate) = options.sample_rate {
        let seconds = crossings.len() as f64 / sample_rate as f64;
        out.push_str(&format!("{:.1} crossings per second\n", count as f64 / seconds));
    }
    out
}

fn render_separation(separation: &HarmonicPercussive) -> String {
    let harmonic: f64 = separation.harmonic.samples().iter().map(|x| x * x).sum();
    let percussive: f64 = separation.percussive.samples().iter().map(|x| x * x).sum();
    let total = harmonic + percussive;
    let share = |x: f64| if total > 0.0 { 100.0 * x / total } else { 0.0 };
    format!(
        "harmonic:   {} samples, energy {:.4} ({:.1}%)\npercussive: {} samples, energy {:.4} ({:.1}%)\n",
        separation.harmonic.len(),
        harmonic,
        share(harmonic),
        separation.percussive.len(),
        percussive,
        share(percussive)
    )
}

/// Renders a feature output as text, under a title line
pub fn render(kind: FeatureKind, output: &FeatureOutput, options: &RenderOptions) -> String {
    let mut out = format!("== {} ==\n", kind.title());
    match output {
        FeatureOutput::Info(info) => out.push_str(&format!("{}\n", info)),
        FeatureOutput::Separation(separation) => out.push_str(&render_separation(separation)),
        FeatureOutput::Crossings(crossings) => out.push_str(&render_crossings(crossings, options)),
        FeatureOutput::Matrix(matrix) if matrix.num_rows() == 1 => out.push_str(&render_series(kind, matrix.row(0), options)),
        FeatureOutput::Matrix(matrix) => out.push_str(&render_heatmap(kind, matrix, options)),
    }
    out
}

fn create(path: &Path) -> Result<BufWriter<File>, ReportError> {
    File::create(path)
        .map(BufWriter::new)
        .map_err(|source| ReportError::Io { path: path.to_string_lossy().to_string(), source })
}

/// Writes feature records as a JSON array
pub fn write_json(path: impl AsRef<Path>, records: &[FeatureRecord]) -> Result<(), ReportError> {
    let path = path.as_ref();
    let mut writer = create(path)?;
    serde_json::to_writer_pretty(&mut writer, records)?;
    writer
        .flush()
        .map_err(|source| ReportError::Io { path: path.to_string_lossy().to_string(), source })?;
    log::info!("wrote {} records to {}", records.len(), path.to_string_lossy());
    Ok(())
}

/// Writes a feature matrix as CSV with one line per frame: the frame time, then one column per row
pub fn write_csv(path: impl AsRef<Path>, matrix: &FeatureMatrix) -> Result<(), ReportError> {
    let path = path.as_ref();
    let io_error = |source: std::io::Error| ReportError::Io { path: path.to_string_lossy().to_string(), source };
    let mut writer = create(path)?;
    let header: Vec<String> = (0..matrix.num_rows()).map(|i| i.to_string()).collect();
    writeln!(writer, "time,{}", header.join(",")).map_err(io_error)?;
    for t in 0..matrix.num_frames() {
        let values: Vec<String> = matrix.data.iter().map(|row| row[t].to_string()).collect();
        writeln!(writer, "{},{}", matrix.frame_time(t), values.join(",")).map_err(io_error)?;
    }
    writer.flush().map_err(io_error)?;
    Ok(())
}

/// Writes the separated components to `<dir>/<stem>_harmonic.wav` and `<dir>/<stem>_percussive.wav`
/// as 32-bit float WAV files. Returns the paths written.
pub fn write_separation(dir: impl AsRef<Path>, stem: &str, separation: &HarmonicPercussive) -> Result<Vec<PathBuf>, ReportError> {
    let mut paths: Vec<PathBuf> = Vec::with_capacity(2);
    for (name, signal) in [("harmonic", &separation.harmonic), ("percussive", &separation.percussive)] {
        let path = dir.as_ref().join(format!("{}_{}.wav", stem, name));
        let audio = AudioFile::new_mono(AudioFormat::F32, signal.sample_rate(), signal.samples().to_vec());
        audiofile::write(&path, &audio)?;
        paths.push(path);
    }
    Ok(paths)
}

#[cfg(test)]
mod test {
    use super::*;
    use crate::features::{audio_info, Tags};
    use crate::signal::Signal;

    #[test]
    fn test_downsample() {
        let values = vec![1.0, 3.0, 5.0, 7.0];
        assert_eq!(downsample(&values, 2), vec![2.0, 6.0]);
        assert_eq!(downsample(&values, 10), values);
    }

    #[test]
    fn test_level() {
        assert_eq!(level(0.0, 0.0, 1.0, 10), 0);
        assert_eq!(level(1.0, 0.0, 1.0, 10), 9);
        assert_eq!(level(5.0, 5.0, 5.0, 10), 0);
    }

    #[test]
    fn test_info_display() {
        let signal = Signal::new(vec![0.1; 22050], 22050).unwrap();
        let text = audio_info(&signal, &Tags::new("clip", "calm", "male")).to_string();
        assert!(text.contains("Name:        clip"));
        assert!(text.contains("Duration:    1.000 s"));
        assert!(text.contains("22050 samples/sec"));
    }

    #[test]
    fn test_chroma_heatmap_labels() {
        let data: Vec<Vec<f64>> = (0..12).map(|r| vec![r as f64; 200]).collect();
        let matrix = FeatureMatrix::new(data, 22050, 512);
        let text = render(FeatureKind::ChromaCens, &FeatureOutput::Matrix(matrix), &RenderOptions::default());
        let lines: Vec<&str> = text.lines().collect();
        assert_eq!(lines[0], "== Chroma energy normalized (CENS) ==");
        // B is the top row and holds the largest values
        assert!(lines[1].starts_with(" B |@"));
        assert!(lines[12].starts_with(" C | "));
        assert!(lines.iter().all(|line| line.chars().count() <= 80));
    }

    #[test]
    fn test_tall_heatmap_is_reduced() {
        let data: Vec<Vec<f64>> = (0..128).map(|r| vec![r as f64; 10]).collect();
        let matrix = FeatureMatrix::new(data, 22050, 512);
        let text = render(FeatureKind::MelSpectrogram, &FeatureOutput::Matrix(matrix), &RenderOptions::default());
        assert_eq!(text.lines().count(), 1 + 32 + 1);
    }

    #[test]
    fn test_crossings_rate() {
        let crossings = vec![true, false, true, false, true];
        let options = RenderOptions { sample_rate: Some(5), ..Default::default() };
        let text = render(FeatureKind::ZeroCrossings, &FeatureOutput::Crossings(crossings), &options);
        assert!(text.contains("2 zero crossings in 5 samples"));
        assert!(text.contains("2.0 crossings per second"));
    }

    #[test]
    fn test_write_csv_and_json() {
        let dir = tempfile::tempdir().unwrap();
        let matrix = FeatureMatrix::new(vec![vec![1.0, 2.0], vec![3.0, 4.0]], 4, 2);
        let csv_path = dir.path().join("feature.csv");
        write_csv(&csv_path, &matrix).unwrap();
        let text = std::fs::read_to_string(&csv_path).unwrap();
        assert_eq!(text, "time,0,1\n0,1,3\n0.5,2,4\n");

        let json_path = dir.path().join("features.json");
        let records = vec![FeatureRecord {
            feature: FeatureKind::Mfcc,
            source: SignalSource::Full,
            output: FeatureOutput::Matrix(matrix),
        }];
        write_json(&json_path, &records).unwrap();
        let value: serde_json::Value = serde_json::from_str(&std::fs::read_to_string(&json_path).unwrap()).unwrap();
        assert_eq!(value[0]["feature"], "mfcc");
        assert_eq!(value[0]["output"]["type"], "matrix");
        assert_eq!(value[0]["output"]["value"]["data"][1][0], 3.0);
    }

    #[test]
    fn test_write_separation() {
        let dir = tempfile::tempdir().unwrap();
        let separation = HarmonicPercussive {
            harmonic: Signal::new(vec![0.25; 100], 8000).unwrap(),
            percussive: Signal::new(vec![-0.25; 100], 8000).unwrap(),
        };
        let paths = write_separation(dir.path(), "clip", &separation).unwrap();
        assert_eq!(paths.len(), 2);
        assert!(paths[0].ends_with("clip_harmonic.wav"));
        let audio = audiofile::read(&paths[1]).unwrap();
        assert_eq!(audio.num_frames, 100);
        assert!((audio.samples[0][0] + 0.25).abs() < 1e-6);
    }

    #[test]
    fn test_write_to_missing_directory() {
        let matrix = FeatureMatrix::new(vec![vec![1.0]], 4, 2);
        let result = write_csv("/nonexistent/dir/feature.csv", &matrix);
        assert!(matches!(result, Err(ReportError::Io { .. })));
    }
}
