// File: operations.rs
// This file contains functionality for performing audio operations.

use rubato::{Resampler, SincFixedIn, SincInterpolationParameters, SincInterpolationType, WindowFunction};
use crate::error::{AudioError, AudioErrorType};

// Input frames handed to the resampler per call
const RESAMPLE_CHUNK_SIZE: usize = 1024;

fn resample_error(err: impl std::fmt::Display) -> AudioError {
    AudioError::new(AudioErrorType::ResampleFailed, format!("Resampling failed: {}", err))
}

/// Resamples mono audio with band-limited sinc interpolation (rubato's `SincFixedIn`).
///
/// When downsampling, the sinc cutoff sits just below the new Nyquist frequency, so
/// content that cannot be represented at the target rate is filtered out. The output has
/// `ceil(len * target_rate / sample_rate)` samples and is aligned with the input: the
/// resampler's delay is removed and its tail is flushed.
///
/// # Example
///
/// ```
/// use aus_features::operations::resample;
/// let audio = vec![0.0; 44100];
/// let resampled = resample(&audio, 44100, 22050).unwrap();
/// assert_eq!(resampled.len(), 22050);
/// ```
pub fn resample(audio: &[f64], sample_rate: u32, target_rate: u32) -> Result<Vec<f64>, AudioError> {
    if sample_rate == target_rate || audio.is_empty() {
        return Ok(audio.to_vec());
    }
    if sample_rate == 0 || target_rate == 0 {
        return Err(resample_error(format!("cannot convert {} Hz to {} Hz", sample_rate, target_rate)));
    }
    let ratio = target_rate as f64 / sample_rate as f64;
    let out_len = (audio.len() as f64 * ratio).ceil() as usize;

    let params = SincInterpolationParameters {
        sinc_len: 256,
        f_cutoff: 0.95,
        interpolation: SincInterpolationType::Linear,
        oversampling_factor: 256,
        window: WindowFunction::BlackmanHarris2,
    };
    let mut resampler = SincFixedIn::<f64>::new(ratio, 1.0, params, RESAMPLE_CHUNK_SIZE, 1).map_err(resample_error)?;
    let delay = resampler.output_delay();
    let mut output: Vec<f64> = Vec::with_capacity(out_len + delay + RESAMPLE_CHUNK_SIZE);

    let mut chunks = audio.chunks_exact(RESAMPLE_CHUNK_SIZE);
    for chunk in &mut chunks {
        let waves_in = vec![chunk];
        let waves_out = resampler.process(&waves_in, None).map_err(resample_error)?;
        output.extend_from_slice(&waves_out[0]);
    }
    let remainder = chunks.remainder();
    if !remainder.is_empty() {
        let waves_in = vec![remainder];
        let waves_out = resampler.process_partial(Some(waves_in.as_slice()), None).map_err(resample_error)?;
        output.extend_from_slice(&waves_out[0]);
    }

    // feed silence until the delayed tail of the input has come out
    while output.len() < out_len + delay {
        let waves_out = resampler.process_partial(None::<&[Vec<f64>]>, None).map_err(resample_error)?;
        if waves_out[0].is_empty() {
            break;
        }
        output.extend_from_slice(&waves_out[0]);
    }

    output.drain(..delay.min(output.len()));
    output.resize(out_len, 0.0);
    Ok(output)
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::f64::consts::PI;

    fn tone(frequency: f64, len: usize, sample_rate: u32) -> Vec<f64> {
        (0..len).map(|n| f64::sin(2.0 * PI * frequency * n as f64 / sample_rate as f64)).collect()
    }

    #[test]
    fn test_identity() {
        let audio = tone(100.0, 100, 8000);
        assert_eq!(resample(&audio, 8000, 8000).unwrap(), audio);
    }

    #[test]
    fn test_output_length() {
        assert_eq!(resample(&tone(100.0, 44100, 44100), 44100, 22050).unwrap().len(), 22050);
        assert_eq!(resample(&tone(100.0, 1000, 44100), 44100, 22050).unwrap().len(), 500);
        // ceil(16001 * 22050 / 16000) = 22052
        assert_eq!(resample(&tone(100.0, 16001, 16000), 16000, 22050).unwrap().len(), 22052);
    }

    #[test]
    fn test_zero_rate_is_rejected() {
        let err = resample(&[0.0; 10], 0, 22050).unwrap_err();
        assert_eq!(err.error_type, AudioErrorType::ResampleFailed);
    }

    #[test]
    fn test_downsample_preserves_tone() {
        let audio = tone(440.0, 44100, 44100);
        let resampled = resample(&audio, 44100, 22050).unwrap();
        let expected = tone(440.0, 22050, 22050);
        assert_eq!(resampled.len(), expected.len());
        // compare away from the edges, where the filter runs out of input
        for n in 1000..21000 {
            assert!((resampled[n] - expected[n]).abs() < 1e-2, "sample {}", n);
        }
    }

    #[test]
    fn test_downsample_removes_aliases() {
        // 15 kHz cannot be represented at 22.05 kHz and must be filtered out
        let audio = tone(15000.0, 44100, 44100);
        let resampled = resample(&audio, 44100, 22050).unwrap();
        let peak = resampled[1000..21000].iter().fold(0.0, |acc: f64, x| acc.max(x.abs()));
        assert!(peak < 0.05, "peak was {}", peak);
    }
}
