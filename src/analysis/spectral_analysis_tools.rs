// File: spectral_analysis_tools.rs
//
// This file contains functionality for computing spectral features from a single
// magnitude spectrum frame, plus matrix helpers (dB conversion, per-frame
// normalization, DCT) shared by the frame-based features.
//
// Feature matrices are row-major: `matrix[row][frame]`.

use std::f64::consts::PI;

/// Selects the vector norm used by `normalize_frames`
#[derive(Debug, Copy, Clone, PartialEq, Eq)]
pub enum Norm {
    L1,
    L2,
    Max,
}

/// Selects the reference level for `power_to_db`
#[derive(Debug, Copy, Clone, PartialEq)]
pub enum DbReference {
    Value(f64),
    /// Use the largest value in the matrix as 0 dB
    Max,
}

/// Calculates the spectral centroid from provided magnitude spectrum.
/// It requires the sum of the magnitude spectrum as a parameter, since
/// this is a value that might be reused. A silent frame has a centroid of 0.
/// (Eyben, pp. 39-40)
pub fn compute_spectral_centroid(magnitude_spectrum: &[f64], rfft_freqs: &[f64], magnitude_spectrum_sum: f64) -> f64 {
    if magnitude_spectrum_sum <= f64::MIN_POSITIVE {
        return 0.0;
    }
    dot_product(magnitude_spectrum, rfft_freqs) / magnitude_spectrum_sum
}

/// Calculates the spectral roll off frequency from provided magnitude spectrum:
/// the lowest bin frequency at which the cumulative magnitude reaches
/// `roll_percent` (0.0 < roll_percent < 1.0) of the total.
/// (Eyben, p. 41)
pub fn compute_spectral_roll_off_point(magnitude_spectrum: &[f64], rfft_freqs: &[f64], magnitude_spectrum_sum: f64, roll_percent: f64) -> f64 {
    let threshold = roll_percent * magnitude_spectrum_sum;
    let mut cumulative = 0.0;
    for i in 0..magnitude_spectrum.len() {
        cumulative += magnitude_spectrum[i];
        if cumulative >= threshold {
            return rfft_freqs[i];
        }
    }
    rfft_freqs[rfft_freqs.len() - 1]
}

/// Calculates the peak and valley of one frame for the band of bins `band`.
/// The band's magnitudes are sorted, and the means of the `count` lowest and
/// `count` highest values are returned as `(peak, valley)`.
pub fn compute_band_peak_valley(magnitude_spectrum: &[f64], band: &[usize], count: usize) -> (f64, f64) {
    let mut sorted: Vec<f64> = band.iter().map(|&k| magnitude_spectrum[k]).collect();
    sorted.sort_unstable_by(|a, b| a.total_cmp(b));
    let count = count.clamp(1, sorted.len().max(1));
    if sorted.is_empty() {
        return (0.0, 0.0);
    }
    let valley = sorted[..count].iter().sum::<f64>() / count as f64;
    let peak = sorted[sorted.len() - count..].iter().sum::<f64>() / count as f64;
    (peak, valley)
}

/// Converts a power matrix to decibels in place: `10 * log10(max(amin, x) / ref)`.
/// If `top_db` is provided, values are clipped to `top_db` below the peak.
pub fn power_to_db(matrix: &mut [Vec<f64>], reference: DbReference, amin: f64, top_db: Option<f64>) {
    let ref_value = match reference {
        DbReference::Value(x) => x.abs(),
        DbReference::Max => matrix.iter().flatten().fold(0.0, |acc: f64, x| acc.max(x.abs())),
    };
    let ref_db = 10.0 * f64::max(amin, ref_value).log10();
    let mut max_db = f64::NEG_INFINITY;
    for row in matrix.iter_mut() {
        for x in row.iter_mut() {
            *x = 10.0 * f64::max(amin, *x).log10() - ref_db;
            max_db = max_db.max(*x);
        }
    }
    if let Some(top_db) = top_db {
        let floor = max_db - top_db;
        for x in matrix.iter_mut().flatten() {
            *x = x.max(floor);
        }
    }
}

/// Normalizes each frame (column) of a row-major matrix in place.
/// Frames whose norm is effectively zero are left unchanged.
pub fn normalize_frames(matrix: &mut [Vec<f64>], norm: Norm) {
    let num_frames = matrix.first().map_or(0, |row| row.len());
    for t in 0..num_frames {
        let length = match norm {
            Norm::L1 => matrix.iter().map(|row| row[t].abs()).sum::<f64>(),
            Norm::L2 => matrix.iter().map(|row| row[t] * row[t]).sum::<f64>().sqrt(),
            Norm::Max => matrix.iter().fold(0.0, |acc: f64, row| acc.max(row[t].abs())),
        };
        if length > f64::MIN_POSITIVE {
            for row in matrix.iter_mut() {
                row[t] /= length;
            }
        }
    }
}

/// Calculates an orthonormal type-II DCT of each frame (column) and keeps the first
/// `num_coefficients` coefficients. Returns `num_coefficients` rows.
pub fn dct_frames(matrix: &[Vec<f64>], num_coefficients: usize) -> Vec<Vec<f64>> {
    let n = matrix.len();
    let num_frames = matrix.first().map_or(0, |row| row.len());
    let mut output: Vec<Vec<f64>> = vec![vec![0.0; num_frames]; num_coefficients];
    if n == 0 {
        return output;
    }
    for (k, out_row) in output.iter_mut().enumerate() {
        let scale = if k == 0 { f64::sqrt(1.0 / n as f64) } else { f64::sqrt(2.0 / n as f64) };
        let basis: Vec<f64> = (0..n)
            .map(|i| f64::cos(PI * k as f64 * (2 * i + 1) as f64 / (2 * n) as f64) * scale)
            .collect();
        for t in 0..num_frames {
            out_row[t] = (0..n).map(|i| matrix[i][t] * basis[i]).sum();
        }
    }
    output
}

/// Swaps a frame-major spectrogram into a row-major matrix (`matrix[bin][frame]`)
pub fn transpose(frames: &[Vec<f64>]) -> Vec<Vec<f64>> {
    let num_rows = frames.first().map_or(0, |frame| frame.len());
    (0..num_rows)
        .map(|r| frames.iter().map(|frame| frame[r]).collect())
        .collect()
}

/// Simple dot product function. No vector length checks are performed; the
/// shorter of the two slices determines the length.
#[inline]
pub fn dot_product(vec1: &[f64], vec2: &[f64]) -> f64 {
    vec1.iter().zip(vec2.iter()).map(|(a, b)| a * b).sum()
}

#[cfg(test)]
mod test {
    use super::*;

    #[test]
    fn test_centroid_of_single_bin() {
        let freqs = vec![0.0, 100.0, 200.0, 300.0];
        let spectrum = vec![0.0, 0.0, 3.0, 0.0];
        assert_eq!(compute_spectral_centroid(&spectrum, &freqs, 3.0), 200.0);
        assert_eq!(compute_spectral_centroid(&[0.0; 4], &freqs, 0.0), 0.0);
    }

    #[test]
    fn test_roll_off() {
        let freqs = vec![0.0, 100.0, 200.0, 300.0];
        let spectrum = vec![1.0, 1.0, 1.0, 1.0];
        assert_eq!(compute_spectral_roll_off_point(&spectrum, &freqs, 4.0, 0.85), 300.0);
        assert_eq!(compute_spectral_roll_off_point(&spectrum, &freqs, 4.0, 0.5), 100.0);
        assert_eq!(compute_spectral_roll_off_point(&[0.0; 4], &freqs, 0.0, 0.85), 0.0);
    }

    #[test]
    fn test_peak_valley() {
        let spectrum = vec![5.0, 1.0, 3.0, 2.0, 4.0];
        let (peak, valley) = compute_band_peak_valley(&spectrum, &[0, 1, 2, 3, 4], 2);
        assert_eq!(peak, 4.5);
        assert_eq!(valley, 1.5);
    }

    #[test]
    fn test_power_to_db() {
        let mut matrix = vec![vec![1.0, 10.0], vec![100.0, 0.0]];
        power_to_db(&mut matrix, DbReference::Max, 1e-10, Some(80.0));
        assert!((matrix[1][0] - 0.0).abs() < 1e-12);
        assert!((matrix[0][0] - -20.0).abs() < 1e-12);
        assert!((matrix[1][1] - -80.0).abs() < 1e-12);
    }

    #[test]
    fn test_normalize_frames() {
        let mut matrix = vec![vec![3.0, 0.0], vec![4.0, 0.0]];
        normalize_frames(&mut matrix, Norm::L2);
        assert!((matrix[0][0] - 0.6).abs() < 1e-12);
        assert!((matrix[1][0] - 0.8).abs() < 1e-12);
        assert_eq!(matrix[0][1], 0.0);
    }

    #[test]
    fn test_dct_of_constant() {
        let matrix = vec![vec![1.0]; 8];
        let dct = dct_frames(&matrix, 3);
        assert!((dct[0][0] - f64::sqrt(8.0)).abs() < 1e-12);
        assert!(dct[1][0].abs() < 1e-12);
        assert!(dct[2][0].abs() < 1e-12);
    }
}
