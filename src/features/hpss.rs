// File: hpss.rs
// This file contains harmonic/percussive source separation by median filtering.
// Harmonic sounds are smooth across time, so a median across frames keeps them;
// percussive sounds are smooth across frequency, so a median across bins keeps those.

use num::Complex;
use serde::Serialize;
use crate::analysis;
use crate::config::FeatureConfig;
use crate::error::FeatureError;
use crate::signal::Signal;
use crate::spectrum;

/// The harmonic and percussive components of a signal. Both have the
/// length and sample rate of the signal they were separated from.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct HarmonicPercussive {
    pub harmonic: Signal,
    pub percussive: Signal,
}

/// Maps an out-of-range index back into `0..n` by mirroring about the edges,
/// repeating the edge sample (`d c b a | a b c d | d c b a`).
#[inline(always)]
fn reflect_index(idx: isize, n: usize) -> usize {
    let n = n as isize;
    let m = idx.rem_euclid(2 * n);
    if m >= n {
        (2 * n - 1 - m) as usize
    } else {
        m as usize
    }
}

/// Runs a sliding median of length `kernel_size` over `values`, with reflected edges
pub fn median_filter(values: &[f64], kernel_size: usize) -> Vec<f64> {
    let n = values.len();
    if n == 0 || kernel_size <= 1 {
        return values.to_vec();
    }
    let half = (kernel_size / 2) as isize;
    let mut window: Vec<f64> = vec![0.0; kernel_size];
    let mut filtered: Vec<f64> = Vec::with_capacity(n);
    for i in 0..n as isize {
        for j in 0..kernel_size {
            window[j] = values[reflect_index(i - half + j as isize, n)];
        }
        let (_, median, _) = window.select_nth_unstable_by(kernel_size / 2, |a, b| a.total_cmp(b));
        filtered.push(*median);
    }
    filtered
}

/// Builds a soft mask `x^p / (x^p + x_ref^p)`, computed relative to `max(x, x_ref)`
/// for numerical stability. Where both are zero the mask is `split_zeros`.
fn softmask(x: f64, x_ref: f64, power: f64, split_zeros: f64) -> f64 {
    let z = x.max(x_ref);
    if z < f64::MIN_POSITIVE {
        return split_zeros;
    }
    let a = (x / z).powf(power);
    let b = (x_ref / z).powf(power);
    a / (a + b)
}

/// Applies the median filters to a frame-major magnitude spectrogram.
/// Returns `(harmonic, percussive)` enhanced magnitudes, also frame-major.
fn median_enhance(magnitude: &[Vec<f64>], kernel_harmonic: usize, kernel_percussive: usize) -> (Vec<Vec<f64>>, Vec<Vec<f64>>) {
    let across_time = analysis::transpose(magnitude);
    let filtered: Vec<Vec<f64>> = across_time
        .iter()
        .map(|row| median_filter(row, kernel_harmonic))
        .collect();
    let harmonic = analysis::transpose(&filtered);

    let percussive: Vec<Vec<f64>> = magnitude
        .iter()
        .map(|frame| median_filter(frame, kernel_percussive))
        .collect();

    (harmonic, percussive)
}

/// Separates a signal into harmonic and percussive components.
///
/// The magnitude STFT is median-filtered across time and across frequency, the two
/// results are turned into soft masks, and the masked spectrograms are inverted back
/// to signals of the original length. With both margins at 1 the masks sum to one,
/// so `harmonic + percussive` reconstructs the input.
pub fn harmonic_percussive(signal: &Signal, config: &FeatureConfig) -> Result<HarmonicPercussive, FeatureError> {
    config.validate_stft()?;
    config.validate_hpss()?;
    let spectrogram = spectrum::rstft(signal.samples(), &config.stft)?;
    let magnitude = spectrum::magnitude_rstft(&spectrogram, 1.0);
    let (harmonic_mag, percussive_mag) = median_enhance(&magnitude, config.hpss_kernel_harmonic, config.hpss_kernel_percussive);

    let split_zeros = if config.hpss_margin_harmonic == 1.0 && config.hpss_margin_percussive == 1.0 { 0.5 } else { 0.0 };
    let mut harmonic_spec: Vec<Vec<Complex<f64>>> = Vec::with_capacity(spectrogram.len());
    let mut percussive_spec: Vec<Vec<Complex<f64>>> = Vec::with_capacity(spectrogram.len());
    for t in 0..spectrogram.len() {
        let mut h_frame: Vec<Complex<f64>> = Vec::with_capacity(spectrogram[t].len());
        let mut p_frame: Vec<Complex<f64>> = Vec::with_capacity(spectrogram[t].len());
        for k in 0..spectrogram[t].len() {
            let h = harmonic_mag[t][k];
            let p = percussive_mag[t][k];
            let mask_h = softmask(h, p * config.hpss_margin_harmonic, config.hpss_power, split_zeros);
            let mask_p = softmask(p, h * config.hpss_margin_percussive, config.hpss_power, split_zeros);
            h_frame.push(spectrogram[t][k] * mask_h);
            p_frame.push(spectrogram[t][k] * mask_p);
        }
        harmonic_spec.push(h_frame);
        percussive_spec.push(p_frame);
    }

    let harmonic = spectrum::irstft(&harmonic_spec, &config.stft, Some(signal.len()))?;
    let percussive = spectrum::irstft(&percussive_spec, &config.stft, Some(signal.len()))?;
    log::debug!("separated {} frames into harmonic and percussive parts", spectrogram.len());
    Ok(HarmonicPercussive {
        harmonic: Signal::new(harmonic, signal.sample_rate())?,
        percussive: Signal::new(percussive, signal.sample_rate())?,
    })
}

#[cfg(test)]
mod test {
    use super::*;
    use crate::analysis::energy;
    use crate::synthesis::{click_train, sine};

    #[test]
    fn test_reflect_index() {
        assert_eq!(reflect_index(-1, 4), 0);
        assert_eq!(reflect_index(-2, 4), 1);
        assert_eq!(reflect_index(4, 4), 3);
        assert_eq!(reflect_index(5, 4), 2);
        assert_eq!(reflect_index(2, 4), 2);
    }

    #[test]
    fn test_median_filter() {
        let values = vec![1.0, 9.0, 2.0, 8.0, 3.0];
        assert_eq!(median_filter(&values, 3), vec![1.0, 2.0, 8.0, 3.0, 3.0]);
        assert_eq!(median_filter(&values, 1), values);
    }

    #[test]
    fn test_softmask() {
        assert_eq!(softmask(0.0, 0.0, 2.0, 0.5), 0.5);
        assert!((softmask(1.0, 1.0, 2.0, 0.5) - 0.5).abs() < 1e-12);
        assert!((softmask(3.0, 1.0, 2.0, 0.5) - 0.9).abs() < 1e-12);
    }

    #[test]
    fn test_components_sum_to_input() {
        let mut samples = sine(330.0, 0.0, 22050, 22050);
        for (x, c) in samples.iter_mut().zip(click_train(5512, 64, 3000.0, 22050, 22050)) {
            *x = 0.5 * *x + 0.5 * c;
        }
        let signal = Signal::new(samples, 22050).unwrap();
        let separation = harmonic_percussive(&signal, &FeatureConfig::default()).unwrap();
        assert_eq!(separation.harmonic.len(), signal.len());
        assert_eq!(separation.percussive.sample_rate(), 22050);
        for i in 0..signal.len() {
            let sum = separation.harmonic.samples()[i] + separation.percussive.samples()[i];
            assert!((sum - signal.samples()[i]).abs() < 1e-6, "sample {}", i);
        }
    }

    #[test]
    fn test_steady_tone_is_harmonic() {
        let signal = Signal::new(sine(440.0, 0.0, 22050, 22050), 22050).unwrap();
        let separation = harmonic_percussive(&signal, &FeatureConfig::default()).unwrap();
        let h = energy(&separation.harmonic.samples()[2048..20000]);
        let p = energy(&separation.percussive.samples()[2048..20000]);
        assert!(h > 10.0 * p, "harmonic {} percussive {}", h, p);
    }
}
