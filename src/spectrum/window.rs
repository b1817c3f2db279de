/// File: window.rs
///
/// This file contains window definitions.

use std::f64::consts::PI;
use serde::{Deserialize, Serialize};

/// Represents a window type
#[derive(Debug, Copy, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum WindowType{
    Bartlett,
    Blackman,
    Hanning,
    Hamming,
    Rectangular
}

/// Creates a Bartlett window of size m
#[inline(always)]
pub fn generate_window_bartlett(window_length: usize) -> Vec<f64>{
    if window_length < 2 {
        return vec![1.0; window_length];
    }
    let m = window_length as f64 - 1.0;
    (0..window_length)
        .map(|i| (2.0 / m) * (m / 2.0 - f64::abs(i as f64 - m / 2.0)))
        .collect()
}

/// Creates a Blackman window of size m
#[inline(always)]
pub fn generate_window_blackman(window_length: usize) -> Vec<f64>{
    if window_length < 2 {
        return vec![1.0; window_length];
    }
    let m = window_length as f64 - 1.0;
    (0..window_length)
        .map(|i| 0.42 - 0.5 * f64::cos((2.0 * PI * i as f64) / m) + 0.08 * f64::cos((4.0 * PI * i as f64) / m))
        .collect()
}

/// Creates a Hanning window of size m
#[inline(always)]
pub fn generate_window_hanning(window_length: usize) -> Vec<f64>{
    if window_length < 2 {
        return vec![1.0; window_length];
    }
    let m = window_length as f64 - 1.0;
    (0..window_length)
        .map(|i| 0.5 - 0.5 * f64::cos((2.0 * PI * i as f64) / m))
        .collect()
}

/// Creates a Hamming window of size m
#[inline(always)]
pub fn generate_window_hamming(window_length: usize) -> Vec<f64>{
    if window_length < 2 {
        return vec![1.0; window_length];
    }
    let m = window_length as f64 - 1.0;
    (0..window_length)
        .map(|i| 0.54 - 0.46 * f64::cos((2.0 * PI * i as f64) / m))
        .collect()
}

/// Creates a rectangular window of size m
#[inline(always)]
pub fn generate_window_rectangular(window_length: usize) -> Vec<f64>{
    vec![1.0; window_length]
}

/// Gets the corresponding symmetric window for a provided WindowType and window size.
/// Use this for smoothing filters.
#[inline(always)]
pub fn generate_window(window_type: WindowType, window_length: usize) -> Vec<f64> {
    match window_type {
        WindowType::Bartlett => generate_window_bartlett(window_length),
        WindowType::Blackman => generate_window_blackman(window_length),
        WindowType::Hanning => generate_window_hanning(window_length),
        WindowType::Hamming => generate_window_hamming(window_length),
        WindowType::Rectangular => generate_window_rectangular(window_length),
    }
}

/// Gets the periodic version of a window, as used for spectral analysis.
/// It is the symmetric window of length `window_length + 1` with the last point dropped.
pub fn generate_window_periodic(window_type: WindowType, window_length: usize) -> Vec<f64> {
    let mut window = generate_window(window_type, window_length + 1);
    window.truncate(window_length);
    window
}

#[cfg(test)]
mod test {
    use super::*;

    #[test]
    fn test_hanning_endpoints() {
        let window = generate_window_hanning(5);
        assert_eq!(window.len(), 5);
        assert!(window[0].abs() < 1e-12);
        assert!((window[2] - 1.0).abs() < 1e-12);
        assert!(window[4].abs() < 1e-12);
    }

    #[test]
    fn test_periodic_hanning() {
        let window = generate_window_periodic(WindowType::Hanning, 4);
        let expected = [0.0, 0.5, 1.0, 0.5];
        for (a, b) in window.iter().zip(expected.iter()) {
            assert!((a - b).abs() < 1e-12);
        }
    }
}
