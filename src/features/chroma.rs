// File: chroma.rs
// This file contains the pitch-class features: chroma, chroma energy normalized (CENS)
// and tonal centroids (tonnetz).

use std::f64::consts::PI;
use crate::analysis::{self, Norm};
use crate::config::FeatureConfig;
use crate::error::FeatureError;
use crate::signal::Signal;
use crate::spectrum::{self, WindowType};
use super::FeatureMatrix;

// CENS quantization thresholds; each one a value exceeds adds its weight
const CENS_QUANT_STEPS: [f64; 4] = [0.4, 0.2, 0.1, 0.05];
const CENS_QUANT_WEIGHTS: [f64; 4] = [0.25, 0.25, 0.25, 0.25];

/// Projects the magnitude STFT onto pitch classes (A440 tuning, row 0 is C).
/// The rows are not normalized.
fn raw_chroma(signal: &Signal, config: &FeatureConfig) -> Result<Vec<Vec<f64>>, FeatureError> {
    let spectrogram = spectrum::rstft(signal.samples(), &config.stft)?;
    let magnitude = spectrum::magnitude_rstft(&spectrogram, 1.0);
    let filterbank = spectrum::chroma_filterbank(signal.sample_rate(), config.stft.fft_size, config.n_chroma, 0.0)?;
    Ok(spectrum::apply_filterbank(&filterbank, &magnitude))
}

/// Computes a chromagram of `n_chroma × frames`, scaled so each frame's largest pitch class is 1
pub fn chroma(signal: &Signal, config: &FeatureConfig) -> Result<FeatureMatrix, FeatureError> {
    config.validate_stft()?;
    config.validate_chroma()?;
    let mut data = raw_chroma(signal, config)?;
    analysis::normalize_frames(&mut data, Norm::Max);
    Ok(FeatureMatrix::new(data, signal.sample_rate(), config.stft.hop_size))
}

/// Smooths each row with a normalized Hann window of `smoothing + 2` points.
/// Values beyond the ends of a row count as zero.
fn smooth_rows(matrix: &[Vec<f64>], smoothing: usize) -> Vec<Vec<f64>> {
    let mut window = spectrum::generate_window(WindowType::Hanning, smoothing + 2);
    let total: f64 = window.iter().sum();
    if total > 0.0 {
        window.iter_mut().for_each(|w| *w /= total);
    }
    let half = (window.len() / 2) as isize;
    matrix
        .iter()
        .map(|row| {
            let n = row.len() as isize;
            (0..n)
                .map(|t| {
                    let mut acc = 0.0;
                    for (j, w) in window.iter().enumerate() {
                        let idx = t + half - j as isize;
                        if idx >= 0 && idx < n {
                            acc += w * row[idx as usize];
                        }
                    }
                    acc
                })
                .collect()
        })
        .collect()
}

/// Computes chroma energy normalized statistics (CENS), `n_chroma × frames`.
///
/// Each frame of the chromagram is L1-normalized and quantized onto a coarse energy
/// scale, the rows are smoothed over time, and each frame is finally L2-normalized.
/// Silent frames stay zero.
pub fn chroma_cens(signal: &Signal, config: &FeatureConfig) -> Result<FeatureMatrix, FeatureError> {
    config.validate_stft()?;
    config.validate_chroma()?;
    let mut data = raw_chroma(signal, config)?;
    analysis::normalize_frames(&mut data, Norm::L1);

    for x in data.iter_mut().flatten() {
        let mut quantized = 0.0;
        for (step, weight) in CENS_QUANT_STEPS.iter().zip(CENS_QUANT_WEIGHTS.iter()) {
            if *x > *step {
                quantized += weight;
            }
        }
        *x = quantized;
    }

    if let Some(smoothing) = config.cens_smoothing {
        data = smooth_rows(&data, smoothing);
    }
    analysis::normalize_frames(&mut data, Norm::L2);
    Ok(FeatureMatrix::new(data, signal.sample_rate(), config.stft.hop_size))
}

/// Builds the `6 × n_chroma` tonal centroid projection: the circle of fifths,
/// the circle of minor thirds and the circle of major thirds, each as an (x, y) pair.
fn tonnetz_basis(n_chroma: usize) -> Vec<Vec<f64>> {
    let scale: [f64; 6] = [7.0 / 6.0, 7.0 / 6.0, 3.0 / 2.0, 3.0 / 2.0, 2.0 / 3.0, 2.0 / 3.0];
    let radius: [f64; 6] = [1.0, 1.0, 1.0, 1.0, 0.5, 0.5];
    (0..6)
        .map(|d| {
            (0..n_chroma)
                .map(|c| {
                    let dim = 12.0 * c as f64 / n_chroma as f64;
                    let mut v = scale[d] * dim;
                    if d % 2 == 0 {
                        v -= 0.5;
                    }
                    radius[d] * f64::cos(PI * v)
                })
                .collect()
        })
        .collect()
}

/// Computes the tonal centroid features (tonnetz), `6 × frames`.
///
/// Rows are, in order: fifth x, fifth y, minor third x, minor third y, major third x, major third y.
pub fn tonnetz(signal: &Signal, config: &FeatureConfig) -> Result<FeatureMatrix, FeatureError> {
    config.validate_stft()?;
    config.validate_chroma()?;
    let mut chroma = raw_chroma(signal, config)?;
    analysis::normalize_frames(&mut chroma, Norm::L1);
    let basis = tonnetz_basis(config.n_chroma);
    let num_frames = chroma.first().map_or(0, |row| row.len());
    let data: Vec<Vec<f64>> = basis
        .iter()
        .map(|phi| {
            (0..num_frames)
                .map(|t| phi.iter().zip(chroma.iter()).map(|(p, row)| p * row[t]).sum())
                .collect()
        })
        .collect();
    Ok(FeatureMatrix::new(data, signal.sample_rate(), config.stft.hop_size))
}
