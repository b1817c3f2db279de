// File: spectral.rs
// This file contains the frame-wise spectral shape features: centroid, roll-off and contrast.

use crate::analysis::{self, DbReference};
use crate::config::FeatureConfig;
use crate::error::FeatureError;
use crate::signal::Signal;
use crate::spectrum;
use super::FeatureMatrix;

/// Computes the magnitude spectrogram (frame-major) and the bin frequencies
fn magnitude_frames(signal: &Signal, config: &FeatureConfig) -> Result<(Vec<Vec<f64>>, Vec<f64>), FeatureError> {
    config.validate_stft()?;
    let spectrogram = spectrum::rstft(signal.samples(), &config.stft)?;
    let magnitude = spectrum::magnitude_rstft(&spectrogram, 1.0);
    let freqs = spectrum::rfftfreq(config.stft.fft_size, signal.sample_rate());
    Ok((magnitude, freqs))
}

/// Computes the spectral centroid of each frame in Hz, `1 × frames`. Silent frames are 0 Hz.
pub fn spectral_centroid(signal: &Signal, config: &FeatureConfig) -> Result<FeatureMatrix, FeatureError> {
    let (magnitude, freqs) = magnitude_frames(signal, config)?;
    let centroids: Vec<f64> = magnitude
        .iter()
        .map(|frame| analysis::compute_spectral_centroid(frame, &freqs, frame.iter().sum()))
        .collect();
    Ok(FeatureMatrix::new(vec![centroids], signal.sample_rate(), config.stft.hop_size))
}

/// Computes the roll-off frequency of each frame in Hz, `1 × frames`: the lowest bin
/// frequency below which `roll_percent` of the frame's magnitude lies.
pub fn spectral_rolloff(signal: &Signal, config: &FeatureConfig) -> Result<FeatureMatrix, FeatureError> {
    config.validate_rolloff()?;
    let (magnitude, freqs) = magnitude_frames(signal, config)?;
    let rolloff: Vec<f64> = magnitude
        .iter()
        .map(|frame| analysis::compute_spectral_roll_off_point(frame, &freqs, frame.iter().sum(), config.roll_percent))
        .collect();
    Ok(FeatureMatrix::new(vec![rolloff], signal.sample_rate(), config.stft.hop_size))
}

/// Gets the bins of each contrast band, plus the number of bins to average for the
/// peak and the valley of each band.
///
/// Band edges are `0, fmin, 2 fmin, 4 fmin, ...`. Each band overlaps the bin just below it,
/// the last band reaches to Nyquist, and every band but the last drops its top bin.
fn contrast_bands(freqs: &[f64], n_bands: usize, fmin: f64, quantile: f64, nyquist: f64) -> Result<Vec<(Vec<usize>, usize)>, FeatureError> {
    if n_bands == 0 {
        return Err(FeatureError::invalid("spectral contrast needs at least one band"));
    }
    let mut edges: Vec<f64> = Vec::with_capacity(n_bands + 2);
    edges.push(0.0);
    let mut edge = fmin;
    for i in 0..n_bands {
        if !(edge < nyquist) {
            return Err(FeatureError::invalid(format!(
                "the contrast bands need fmin * 2^{} = {} Hz to be below the Nyquist frequency ({} Hz)",
                i, edge, nyquist
            )));
        }
        edges.push(edge);
        edge *= 2.0;
    }
    edges.push(edge);

    let mut bands: Vec<(Vec<usize>, usize)> = Vec::with_capacity(n_bands + 1);
    for k in 0..=n_bands {
        let (f_low, f_high) = (edges[k], edges[k + 1]);
        let mut band: Vec<usize> = (0..freqs.len()).filter(|&i| freqs[i] >= f_low && freqs[i] <= f_high).collect();
        let (first, last) = match (band.first(), band.last()) {
            (Some(&first), Some(&last)) => (first, last),
            _ => return Err(FeatureError::invalid(format!(
                "contrast band {} ({} to {} Hz) contains no frequency bins; use a larger FFT size or a higher fmin",
                k, f_low, f_high
            ))),
        };
        if k > 0 && first > 0 {
            band.insert(0, first - 1);
        }
        if k == n_bands {
            band.extend(last + 1..freqs.len());
        }
        let count = usize::max((quantile * band.len() as f64).round_ties_even() as usize, 1);
        if k < n_bands {
            band.pop();
        }
        bands.push((band, count));
    }
    Ok(bands)
}

/// Computes spectral contrast, `(contrast_bands + 1) × frames`, in dB.
///
/// For each octave band the mean of the loudest `quantile` share of bins (the peak) is
/// compared with the mean of the quietest share (the valley).
pub fn spectral_contrast(signal: &Signal, config: &FeatureConfig) -> Result<FeatureMatrix, FeatureError> {
    config.validate_contrast()?;
    config.validate_top_db()?;
    let (magnitude, freqs) = magnitude_frames(signal, config)?;
    let nyquist = signal.sample_rate() as f64 / 2.0;
    let bands = contrast_bands(&freqs, config.contrast_bands, config.contrast_fmin, config.contrast_quantile, nyquist)?;

    let mut peak: Vec<Vec<f64>> = Vec::with_capacity(bands.len());
    let mut valley: Vec<Vec<f64>> = Vec::with_capacity(bands.len());
    for (band, count) in bands.iter() {
        let (band_peak, band_valley): (Vec<f64>, Vec<f64>) = magnitude
            .iter()
            .map(|frame| analysis::compute_band_peak_valley(frame, band, *count))
            .unzip();
        peak.push(band_peak);
        valley.push(band_valley);
    }

    analysis::power_to_db(&mut peak, DbReference::Value(1.0), 1e-10, config.top_db);
    analysis::power_to_db(&mut valley, DbReference::Value(1.0), 1e-10, config.top_db);
    let data: Vec<Vec<f64>> = peak
        .iter()
        .zip(valley.iter())
        .map(|(p, v)| p.iter().zip(v.iter()).map(|(a, b)| a - b).collect())
        .collect();
    Ok(FeatureMatrix::new(data, signal.sample_rate(), config.stft.hop_size))
}
