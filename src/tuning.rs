// File: tuning.rs
// This file contains tuning functionality: MIDI conversions, pitch classes and the mel scale.

/// Pitch class names, starting from C
pub const PITCH_CLASSES: [&str; 12] = ["C", "C#", "D", "D#", "E", "F", "F#", "G", "G#", "A", "A#", "B"];

// Slaney mel scale constants: linear below 1 kHz, logarithmic above
const MEL_F_SP: f64 = 200.0 / 3.0;
const MEL_MIN_LOG_HZ: f64 = 1000.0;
const MEL_MIN_LOG_MEL: f64 = MEL_MIN_LOG_HZ / MEL_F_SP;

#[inline(always)]
fn mel_log_step() -> f64 {
    f64::ln(6.4) / 27.0
}

/// Calculates the MIDI note of a provided frequency.
///
/// # Examples
///
/// ```
/// use aus_features::tuning::freq_to_midi;
/// let midi_note = freq_to_midi(440.0);
/// assert_eq!(midi_note, 69.0);
/// ```
#[inline(always)]
pub fn freq_to_midi(frequency: f64) -> f64 {
    f64::log2(frequency / 440.0) * 12.0 + 69.0
}

/// Calculates the frequency of a provided MIDI note.
///
/// # Examples
///
/// ```
/// use aus_features::tuning::midi_to_freq;
/// let freq = midi_to_freq(69.0);
/// assert_eq!(freq, 440.0);
/// ```
#[inline(always)]
pub fn midi_to_freq(midi: f64) -> f64 {
    440.0 * f64::powf(2.0, (midi - 69.0) / 12.0)
}

/// Gets the pitch class index (0 = C) of the nearest MIDI note to a frequency
pub fn pitch_class(frequency: f64) -> usize {
    (freq_to_midi(frequency).round() as i64).rem_euclid(12) as usize
}

/// Converts a frequency to octaves above C0 (A440 / 16), optionally detuned by
/// `tuning` fractions of a bin for a `bins_per_octave` resolution.
#[inline(always)]
pub fn hz_to_octs(frequency: f64, tuning: f64, bins_per_octave: usize) -> f64 {
    let a440 = 440.0 * f64::powf(2.0, tuning / bins_per_octave as f64);
    f64::log2(frequency / (a440 / 16.0))
}

/// Converts Hz to mels on the Slaney scale
pub fn hz_to_mel(frequency: f64) -> f64 {
    if frequency >= MEL_MIN_LOG_HZ {
        MEL_MIN_LOG_MEL + f64::ln(frequency / MEL_MIN_LOG_HZ) / mel_log_step()
    } else {
        frequency / MEL_F_SP
    }
}

/// Converts mels on the Slaney scale to Hz
pub fn mel_to_hz(mel: f64) -> f64 {
    if mel >= MEL_MIN_LOG_MEL {
        MEL_MIN_LOG_HZ * f64::exp(mel_log_step() * (mel - MEL_MIN_LOG_MEL))
    } else {
        MEL_F_SP * mel
    }
}

/// Gets `n_mels` center frequencies spaced evenly on the mel scale between `f_min` and `f_max`, inclusive
pub fn mel_frequencies(n_mels: usize, f_min: f64, f_max: f64) -> Vec<f64> {
    let min_mel = hz_to_mel(f_min);
    let max_mel = hz_to_mel(f_max);
    if n_mels == 1 {
        return vec![mel_to_hz(min_mel)];
    }
    (0..n_mels)
        .map(|i| mel_to_hz(min_mel + (max_mel - min_mel) * i as f64 / (n_mels - 1) as f64))
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_tuning() {
        let freq = 100.0;
        let midi = 65.0;
        assert_eq!(freq_to_midi(freq), f64::log2(freq / 440.0) * 12.0 + 69.0);
        assert_eq!(midi_to_freq(midi), 440.0 * f64::powf(2.0, (midi - 69.0) / 12.0));
        assert_eq!(pitch_class(440.0), 9);
        assert_eq!(pitch_class(261.63), 0);
        assert_eq!(PITCH_CLASSES[pitch_class(392.0)], "G");
    }

    #[test]
    fn test_mel_scale() {
        assert!((hz_to_mel(1000.0) - 15.0).abs() < 1e-12);
        assert!((hz_to_mel(500.0) - 7.5).abs() < 1e-12);
        for freq in [0.0, 300.0, 1000.0, 4000.0, 11025.0] {
            assert!((mel_to_hz(hz_to_mel(freq)) - freq).abs() < 1e-6);
        }
        let freqs = mel_frequencies(10, 0.0, 8000.0);
        assert_eq!(freqs.len(), 10);
        assert!(freqs[0].abs() < 1e-9);
        assert!((freqs[9] - 8000.0).abs() < 1e-6);
    }

    #[test]
    fn test_octaves() {
        assert!((hz_to_octs(440.0, 0.0, 12) - 4.0).abs() < 1e-12);
        assert!((hz_to_octs(880.0, 0.0, 12) - 5.0).abs() < 1e-12);
    }
}
