/// File: fft.rs
///
/// This file contains FFT abstraction functions based on the rustfft crate.
/// It has a centered rSTFT/IrSTFT pair and helpers for working with the
/// resulting spectrograms. Spectrograms are stored frame-major: `spectrogram[frame][bin]`.

use rustfft::{FftPlanner, num_complex::Complex};
use serde::{Deserialize, Serialize};
use super::window::{WindowType, generate_window_periodic};
use crate::error::SpectrumError;

/// Parameters for the short-time Fourier transform
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct StftConfig {
    pub fft_size: usize,
    pub hop_size: usize,
    pub window_type: WindowType,
    /// Pad `fft_size / 2` zeros on both sides so frame `t` is centered on sample `t * hop_size`
    pub center: bool,
}

impl Default for StftConfig {
    fn default() -> Self {
        StftConfig {
            fft_size: 2048,
            hop_size: 512,
            window_type: WindowType::Hanning,
            center: true,
        }
    }
}

impl StftConfig {
    pub fn validate(&self) -> Result<(), SpectrumError> {
        if self.fft_size < 2 {
            return Err(SpectrumError::new("The FFT size must be at least 2."));
        }
        if self.hop_size == 0 {
            return Err(SpectrumError::new("The hop size must be positive."));
        }
        Ok(())
    }

    /// The number of non-negative frequency bins
    pub fn num_bins(&self) -> usize {
        self.fft_size / 2 + 1
    }

    /// The number of frames the rSTFT produces for an input of `num_samples` samples
    pub fn num_frames(&self, num_samples: usize) -> usize {
        if self.center {
            1 + num_samples / self.hop_size
        } else if num_samples < self.fft_size {
            0
        } else {
            1 + (num_samples - self.fft_size) / self.hop_size
        }
    }
}

/// Gets the corresponding frequencies for rFFT data
pub fn rfftfreq(fft_size: usize, sample_rate: u32) -> Vec<f64> {
    let f_0 = sample_rate as f64 / fft_size as f64;
    (0..fft_size / 2 + 1).map(|i| f_0 * i as f64).collect()
}

/// Calculates the real STFT of a chunk of audio.
///
/// With `center` set, the audio is zero-padded by `fft_size / 2` on both sides, which
/// yields `1 + len / hop_size` frames. Each frame is windowed with the periodic window
/// and contains `fft_size / 2 + 1` complex bins.
///
/// # Example
///
/// ```
/// use aus_features::spectrum::{rstft, StftConfig};
/// let audio = vec![0.0; 4096];
/// let spectrogram = rstft(&audio, &StftConfig::default()).unwrap();
/// assert_eq!(spectrogram.len(), 9);
/// assert_eq!(spectrogram[0].len(), 1025);
/// ```
pub fn rstft(audio: &[f64], config: &StftConfig) -> Result<Vec<Vec<Complex<f64>>>, SpectrumError> {
    config.validate()?;
    let fft_size = config.fft_size;
    if !config.center && audio.len() < fft_size {
        return Err(SpectrumError::new("The audio is shorter than the FFT size."));
    }

    let padded: Vec<f64> = if config.center {
        let pad = fft_size / 2;
        let mut padded = vec![0.0; audio.len() + 2 * pad];
        padded[pad..pad + audio.len()].copy_from_slice(audio);
        padded
    } else {
        audio.to_vec()
    };

    let mut planner: FftPlanner<f64> = FftPlanner::new();
    let fft = planner.plan_fft_forward(fft_size);
    let window = generate_window_periodic(config.window_type, fft_size);
    let num_frames = config.num_frames(audio.len());
    let mut spectrogram: Vec<Vec<Complex<f64>>> = Vec::with_capacity(num_frames);

    for frame_idx in 0..num_frames {
        let start_idx = frame_idx * config.hop_size;
        let mut fft_data: Vec<Complex<f64>> = padded[start_idx..start_idx + fft_size]
            .iter()
            .zip(window.iter())
            .map(|(x, w)| Complex { re: x * w, im: 0.0 })
            .collect();
        fft.process(&mut fft_data);
        fft_data.truncate(config.num_bins());
        spectrogram.push(fft_data);
    }

    log::debug!("rstft: {} frames x {} bins", spectrogram.len(), config.num_bins());
    Ok(spectrogram)
}

/// Calculates the inverse real STFT of a spectrogram made by `rstft` with the same config.
///
/// Frames are overlap-added and divided by the summed squared window. If `length` is
/// provided, the output is trimmed or zero-padded to exactly that many samples.
/// Every frame must contain `fft_size / 2 + 1` bins.
pub fn irstft(spectrogram: &[Vec<Complex<f64>>], config: &StftConfig, length: Option<usize>) -> Result<Vec<f64>, SpectrumError> {
    config.validate()?;
    let fft_size = config.fft_size;
    let num_bins = config.num_bins();
    if let Some(bad) = spectrogram.iter().position(|frame| frame.len() != num_bins) {
        return Err(SpectrumError::new(format!(
            "Frame {} has {} bins, but the FFT size requires {}.", bad, spectrogram[bad].len(), num_bins
        )));
    }
    if spectrogram.is_empty() {
        return Ok(vec![0.0; length.unwrap_or(0)]);
    }

    let mut planner: FftPlanner<f64> = FftPlanner::new();
    let ifft = planner.plan_fft_inverse(fft_size);
    let window = generate_window_periodic(config.window_type, fft_size);
    let num_output_frames = fft_size + config.hop_size * (spectrogram.len() - 1);
    let mut audio: Vec<f64> = vec![0.0; num_output_frames];
    let mut window_norm: Vec<f64> = vec![0.0; num_output_frames];

    for (frame_idx, frame) in spectrogram.iter().enumerate() {
        // Rebuild the full spectrum, adding the negative frequencies back
        let mut spectrum_input: Vec<Complex<f64>> = Vec::with_capacity(fft_size);
        spectrum_input.extend_from_slice(frame);
        for k in num_bins..fft_size {
            spectrum_input.push(frame[fft_size - k].conj());
        }
        // The DC and Nyquist bins of a real signal have no imaginary part
        spectrum_input[0].im = 0.0;
        if fft_size % 2 == 0 {
            spectrum_input[fft_size / 2].im = 0.0;
        }
        ifft.process(&mut spectrum_input);

        let start_idx = frame_idx * config.hop_size;
        for j in 0..fft_size {
            audio[start_idx + j] += spectrum_input[j].re / fft_size as f64 * window[j];
            window_norm[start_idx + j] += window[j] * window[j];
        }
    }

    for i in 0..audio.len() {
        if window_norm[i] > f64::MIN_POSITIVE {
            audio[i] /= window_norm[i];
        }
    }

    let start = if config.center { fft_size / 2 } else { 0 };
    let mut audio = audio.split_off(start.min(audio.len()));
    match length {
        Some(len) => audio.resize(len, 0.0),
        None => {
            if config.center {
                let end = audio.len().saturating_sub(fft_size / 2);
                audio.truncate(end);
            }
        }
    }
    Ok(audio)
}

/// Converts a complex spectrogram to a magnitude spectrogram raised to `power`
/// (1.0 for magnitude, 2.0 for power).
pub fn magnitude_rstft(spectrogram: &[Vec<Complex<f64>>], power: f64) -> Vec<Vec<f64>> {
    spectrogram
        .iter()
        .map(|frame| {
            frame
                .iter()
                .map(|bin| if power == 1.0 { bin.norm() } else { bin.norm().powf(power) })
                .collect()
        })
        .collect()
}
