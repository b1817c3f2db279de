// File: mel.rs
// This file contains the mel-scale features: the mel spectrogram and MFCCs.

use crate::analysis::{self, DbReference};
use crate::config::FeatureConfig;
use crate::error::FeatureError;
use crate::signal::Signal;
use crate::spectrum;
use super::FeatureMatrix;

const AMIN: f64 = 1e-10;

/// Computes a power mel spectrogram, `n_mels × frames`, with filters between 0 Hz and `f_max`.
/// `f_max` is clamped to the Nyquist frequency.
pub fn mel_power_spectrogram(signal: &Signal, config: &FeatureConfig, f_max: f64) -> Result<FeatureMatrix, FeatureError> {
    config.validate_stft()?;
    let nyquist = signal.sample_rate() as f64 / 2.0;
    let f_max = if f_max > nyquist {
        log::warn!("mel fmax {} Hz is above the Nyquist frequency; using {} Hz", f_max, nyquist);
        nyquist
    } else {
        f_max
    };
    let spectrogram = spectrum::rstft(signal.samples(), &config.stft)?;
    let power = spectrum::magnitude_rstft(&spectrogram, 2.0);
    let filterbank = spectrum::mel_filterbank(signal.sample_rate(), config.stft.fft_size, config.n_mels, 0.0, f_max)?;
    let data = spectrum::apply_filterbank(&filterbank, &power);
    Ok(FeatureMatrix::new(data, signal.sample_rate(), config.stft.hop_size))
}

/// Computes the displayed mel spectrogram: power mels up to `mel_fmax`, in dB relative to the loudest cell.
/// Every value is at most 0 dB and at least `-top_db`.
pub fn mel_spectrogram(signal: &Signal, config: &FeatureConfig) -> Result<FeatureMatrix, FeatureError> {
    config.validate_mel()?;
    config.validate_top_db()?;
    let mut mel = mel_power_spectrogram(signal, config, config.mel_fmax)?;
    analysis::power_to_db(&mut mel.data, DbReference::Max, AMIN, config.top_db);
    Ok(mel)
}

/// Computes mel-frequency cepstral coefficients, `n_mfcc × frames`.
///
/// The power mel spectrogram spans 0 Hz to Nyquist, is converted to dB with a
/// reference of 1, and each frame goes through an orthonormal DCT-II.
pub fn mfcc(signal: &Signal, config: &FeatureConfig) -> Result<FeatureMatrix, FeatureError> {
    config.validate_mfcc()?;
    config.validate_top_db()?;
    let nyquist = signal.sample_rate() as f64 / 2.0;
    let mut mel = mel_power_spectrogram(signal, config, nyquist)?;
    analysis::power_to_db(&mut mel.data, DbReference::Value(1.0), AMIN, config.top_db);
    let data = analysis::dct_frames(&mel.data, config.n_mfcc);
    Ok(FeatureMatrix::new(data, mel.sample_rate, mel.hop_size))
}

#[cfg(test)]
mod test {
    use super::*;
    use crate::synthesis::sine;

    #[test]
    fn test_mel_spectrogram_range() {
        let signal = Signal::new(sine(1000.0, 0.0, 22050, 22050), 22050).unwrap();
        let mel = mel_spectrogram(&signal, &FeatureConfig::default()).unwrap();
        assert_eq!(mel.shape(), (128, 44));
        let max = mel.data.iter().flatten().fold(f64::NEG_INFINITY, |acc, &x| acc.max(x));
        let min = mel.data.iter().flatten().fold(f64::INFINITY, |acc, &x| acc.min(x));
        assert!(max.abs() < 1e-9);
        assert!(min >= -80.0 - 1e-9);
    }

    #[test]
    fn test_fmax_is_clamped() {
        // 8 kHz is above Nyquist at 8 kHz sampling; this must still succeed
        let signal = Signal::new(sine(500.0, 0.0, 8000, 8000), 8000).unwrap();
        let clamped = mel_power_spectrogram(&signal, &FeatureConfig::default(), 8000.0).unwrap();
        let nyquist = mel_power_spectrogram(&signal, &FeatureConfig::default(), 4000.0).unwrap();
        assert_eq!(clamped, nyquist);
    }

    #[test]
    fn test_mfcc_shape_and_silence() {
        let config = FeatureConfig { n_mfcc: 20, ..Default::default() };
        let signal = Signal::new(vec![0.0; 5000], 22050).unwrap();
        let mfcc = mfcc(&signal, &config).unwrap();
        assert_eq!(mfcc.shape(), (20, 10));
        // silence is -100 dB in every band, so all energy lands in the first coefficient
        let expected_c0 = -100.0 * f64::sqrt(128.0);
        for t in 0..mfcc.num_frames() {
            assert!((mfcc.data[0][t] - expected_c0).abs() < 1e-6);
            assert!(mfcc.data[1][t].abs() < 1e-6);
        }
    }
}
