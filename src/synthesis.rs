//! # Synthesis
//! The `synthesis` module generates simple test signals: sine tones and click trains.

use std::f64::consts::PI;

/// Creates a sine waveform of length `len`, frequency `frequency`, and initial phase `initial_phase`.
///
/// # Example
///
/// ```
/// use aus_features::synthesis::sine;
/// use std::f64::consts::PI;
/// let freq = 440.0;
/// let iphase = PI / 2.0;
/// let sample_rate: u32 = 22050;
/// let length = sample_rate as usize * 5;
/// let waveform = sine(freq, iphase, length, sample_rate);
/// ```
pub fn sine(frequency: f64, initial_phase: f64, len: usize, sample_rate: u32) -> Vec<f64> {
    let sine_coef = 2.0 * PI * frequency / sample_rate as f64;
    (0..len).map(|n| f64::sin(sine_coef * n as f64 + initial_phase)).collect()
}

/// Creates a click train of length `len`: a short decaying burst at a `click_frequency` Hz
/// carrier every `interval` samples. Each click lasts `click_len` samples.
pub fn click_train(interval: usize, click_len: usize, click_frequency: f64, len: usize, sample_rate: u32) -> Vec<f64> {
    let mut samples: Vec<f64> = vec![0.0; len];
    if interval == 0 {
        return samples;
    }
    let sine_coef = 2.0 * PI * click_frequency / sample_rate as f64;
    for start in (0..len).step_by(interval) {
        for i in 0..click_len.min(len - start) {
            let decay = f64::exp(-5.0 * i as f64 / click_len as f64);
            samples[start + i] = decay * f64::sin(sine_coef * i as f64);
        }
    }
    samples
}
