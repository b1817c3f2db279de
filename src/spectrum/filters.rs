/// File: filters.rs
///
/// This file contains filterbanks that map rFFT bins onto perceptual axes:
/// a mel filterbank and a chroma (pitch class) filterbank.
/// Filterbanks are stored as `weights[filter][bin]`.

use crate::error::SpectrumError;
use crate::tuning::{hz_to_octs, mel_frequencies};
use super::fft::rfftfreq;

/// Creates a triangular mel filterbank with Slaney area normalization.
///
/// There are `n_mels` filters over `fft_size / 2 + 1` bins, spaced evenly on the
/// Slaney mel scale between `f_min` and `f_max`.
pub fn mel_filterbank(sample_rate: u32, fft_size: usize, n_mels: usize, f_min: f64, f_max: f64) -> Result<Vec<Vec<f64>>, SpectrumError> {
    if n_mels == 0 {
        return Err(SpectrumError::new("The number of mel bands must be positive."));
    }
    if !(f_min >= 0.0 && f_max > f_min) {
        return Err(SpectrumError::new(format!("Invalid mel frequency range {}..{} Hz.", f_min, f_max)));
    }

    let fft_freqs = rfftfreq(fft_size, sample_rate);
    let mel_f = mel_frequencies(n_mels + 2, f_min, f_max);
    let mut weights: Vec<Vec<f64>> = vec![vec![0.0; fft_freqs.len()]; n_mels];

    for i in 0..n_mels {
        let lower_width = mel_f[i + 1] - mel_f[i];
        let upper_width = mel_f[i + 2] - mel_f[i + 1];
        // Slaney-style area normalization
        let enorm = 2.0 / (mel_f[i + 2] - mel_f[i]);
        for (k, &freq) in fft_freqs.iter().enumerate() {
            let lower = (freq - mel_f[i]) / lower_width;
            let upper = (mel_f[i + 2] - freq) / upper_width;
            weights[i][k] = f64::max(0.0, f64::min(lower, upper)) * enorm;
        }
    }

    if weights.iter().any(|filter| filter.iter().all(|&w| w == 0.0)) {
        log::warn!("Some mel filters are empty; consider fewer mel bands or a larger FFT size");
    }
    Ok(weights)
}

/// Creates a chroma filterbank mapping rFFT bins onto `n_chroma` pitch classes, starting at C.
///
/// Each bin contributes to neighboring pitch classes through a Gaussian in log-frequency,
/// columns are L2-normalized, and the whole bank is weighted by a Gaussian over octaves
/// centered on octave 5 with a width of 2 octaves.
pub fn chroma_filterbank(sample_rate: u32, fft_size: usize, n_chroma: usize, tuning: f64) -> Result<Vec<Vec<f64>>, SpectrumError> {
    if n_chroma == 0 {
        return Err(SpectrumError::new("The number of chroma bins must be positive."));
    }
    if fft_size < 2 {
        return Err(SpectrumError::new("The FFT size must be at least 2."));
    }
    let ctroct = 5.0;
    let octwidth = 2.0;
    let n_chroma_f = n_chroma as f64;
    let n_chroma2 = (n_chroma_f / 2.0).round();

    // Fractional chroma bin of every FFT bin, with bin 0 extrapolated 1.5 octaves below bin 1
    let mut freq_bins: Vec<f64> = Vec::with_capacity(fft_size);
    for k in 1..fft_size {
        let freq = k as f64 * sample_rate as f64 / fft_size as f64;
        freq_bins.push(n_chroma_f * hz_to_octs(freq, tuning, n_chroma));
    }
    freq_bins.insert(0, freq_bins[0] - 1.5 * n_chroma_f);

    let mut bin_widths: Vec<f64> = Vec::with_capacity(fft_size);
    for k in 0..fft_size - 1 {
        bin_widths.push(f64::max(freq_bins[k + 1] - freq_bins[k], 1.0));
    }
    bin_widths.push(1.0);

    let mut weights: Vec<Vec<f64>> = vec![vec![0.0; fft_size]; n_chroma];
    for (c, row) in weights.iter_mut().enumerate() {
        for k in 0..fft_size {
            let d = (freq_bins[k] - c as f64 + n_chroma2 + 10.0 * n_chroma_f).rem_euclid(n_chroma_f) - n_chroma2;
            row[k] = f64::exp(-0.5 * (2.0 * d / bin_widths[k]).powi(2));
        }
    }

    for k in 0..fft_size {
        let norm = weights.iter().map(|row| row[k] * row[k]).sum::<f64>().sqrt();
        let octave_weight = f64::exp(-0.5 * ((freq_bins[k] / n_chroma_f - ctroct) / octwidth).powi(2));
        for row in weights.iter_mut() {
            if norm > f64::MIN_POSITIVE {
                row[k] /= norm;
            }
            row[k] *= octave_weight;
        }
    }

    // The raw bank starts at A; rotate it so row 0 is C
    weights.rotate_left((3 * (n_chroma / 12)) % n_chroma);
    for row in weights.iter_mut() {
        row.truncate(fft_size / 2 + 1);
    }
    Ok(weights)
}

/// Applies a filterbank to each frame of a frame-major spectrogram.
/// Returns a row-major matrix `output[filter][frame]`.
pub fn apply_filterbank(filterbank: &[Vec<f64>], spectrogram: &[Vec<f64>]) -> Vec<Vec<f64>> {
    filterbank
        .iter()
        .map(|filter| {
            spectrogram
                .iter()
                .map(|frame| filter.iter().zip(frame.iter()).map(|(w, x)| w * x).sum())
                .collect()
        })
        .collect()
}
