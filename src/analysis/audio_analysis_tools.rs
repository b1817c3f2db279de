// File: audio_analysis_tools.rs
//
// This file contains tools for computing time-domain audio features, such as dBFS and zero crossings.

// The lowest f64 value for which dBFS can be computed.
// All lower values will result in f64::NEG_ININITY.
// Note that a value of 1e-20 corresponds to a dBFS of -400.0.
const DBFS_EPSILON: f64 = 1e-20;

/// Calculates dBFS. All dBFS values below 1e-20 will render as NEG_INFINITY.
#[inline(always)]
pub fn dbfs(val: f64) -> f64 {
    if val.abs() < DBFS_EPSILON {
        f64::NEG_INFINITY
    } else {
        20.0 * val.abs().log10()
    }
}

/// Calculates the max dBFS in a list of audio samples.
pub fn dbfs_max(audio: &[f64]) -> f64 {
    let maxval = audio.iter().fold(0.0, |acc: f64, x| acc.max(x.abs()));
    dbfs(maxval)
}

/// Extracts the RMS energy of the signal.
/// (Eyben, pp. 21-22)
pub fn energy(audio: &[f64]) -> f64 {
    if audio.is_empty() {
        return 0.0;
    }
    let sumsquare: f64 = audio.iter().map(|x| x * x).sum();
    f64::sqrt(sumsquare / audio.len() as f64)
}

/// Detects zero crossings. The output has one entry per sample; entry `i` is true when
/// the sign of sample `i` differs from the sign of sample `i - 1`.
///
/// Samples with an absolute value at or below `threshold` count as zero, and zero counts
/// as positive. The first entry is always true, since there is no previous sample.
///
/// # Example
///
/// ```
/// use aus_features::analysis::zero_crossings;
/// let crossings = zero_crossings(&[0.1, 0.2, -0.3, 0.0, -0.1], 1e-10);
/// assert_eq!(crossings, vec![true, false, true, true, true]);
/// ```
pub fn zero_crossings(audio: &[f64], threshold: f64) -> Vec<bool> {
    let negative: Vec<bool> = audio
        .iter()
        .map(|&x| x.abs() > threshold && x < 0.0)
        .collect();
    let mut crossings: Vec<bool> = Vec::with_capacity(audio.len());
    for i in 0..negative.len() {
        if i == 0 {
            crossings.push(true);
        } else {
            crossings.push(negative[i] != negative[i - 1]);
        }
    }
    crossings
}

/// Calculates the zero crossing rate in crossings per second.
/// The padded first entry of `zero_crossings` is not counted.
/// (Eyben, p. 20)
pub fn zero_crossing_rate(audio: &[f64], sample_rate: u32) -> f64 {
    if audio.len() < 2 {
        return 0.0;
    }
    let num_zc = zero_crossings(audio, 0.0).iter().skip(1).filter(|&&zc| zc).count();
    num_zc as f64 * sample_rate as f64 / audio.len() as f64
}
