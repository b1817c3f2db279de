// File: config.rs
// This file contains the analysis configuration and its JSON file loader.

use std::path::Path;
use serde::{Deserialize, Serialize};
use crate::audiofile::LoadOptions;
use crate::error::{ConfigError, FeatureError};
use crate::spectrum::StftConfig;

/// Parameters shared by the feature functions. The defaults follow the
/// customary analysis settings (2048-point FFT, 512-sample hop, 128 mels, ...).
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct FeatureConfig {
    pub stft: StftConfig,
    /// Median filter length across time for the harmonic part, in frames
    pub hpss_kernel_harmonic: usize,
    /// Median filter length across frequency for the percussive part, in bins
    pub hpss_kernel_percussive: usize,
    pub hpss_power: f64,
    pub hpss_margin_harmonic: f64,
    pub hpss_margin_percussive: f64,
    pub n_chroma: usize,
    /// Length of the CENS smoothing window in frames; `None` disables smoothing
    pub cens_smoothing: Option<usize>,
    pub n_mfcc: usize,
    pub n_mels: usize,
    /// Upper frequency of the displayed mel spectrogram (clamped to Nyquist)
    pub mel_fmax: f64,
    pub contrast_bands: usize,
    pub contrast_fmin: f64,
    pub contrast_quantile: f64,
    pub roll_percent: f64,
    /// Dynamic range kept by dB conversions; `None` keeps everything
    pub top_db: Option<f64>,
    pub zero_crossing_threshold: f64,
}

impl Default for FeatureConfig {
    fn default() -> Self {
        FeatureConfig {
            stft: StftConfig::default(),
            hpss_kernel_harmonic: 31,
            hpss_kernel_percussive: 31,
            hpss_power: 2.0,
            hpss_margin_harmonic: 1.0,
            hpss_margin_percussive: 1.0,
            n_chroma: 12,
            cens_smoothing: Some(41),
            n_mfcc: 13,
            n_mels: 128,
            mel_fmax: 8000.0,
            contrast_bands: 6,
            contrast_fmin: 200.0,
            contrast_quantile: 0.02,
            roll_percent: 0.85,
            top_db: Some(80.0),
            zero_crossing_threshold: 1e-10,
        }
    }
}

// Octave bands past this would start far above any audio Nyquist frequency
const MAX_CONTRAST_BANDS: usize = 16;

impl FeatureConfig {
    /// Checks every parameter range. Configuration files are checked with this when loaded;
    /// the features check only the groups of parameters they read.
    pub fn validate(&self) -> Result<(), FeatureError> {
        self.validate_stft()?;
        self.validate_hpss()?;
        self.validate_chroma()?;
        self.validate_mel()?;
        self.validate_mfcc()?;
        self.validate_contrast()?;
        self.validate_rolloff()?;
        self.validate_top_db()?;
        self.validate_zero_crossings()
    }

    pub fn validate_stft(&self) -> Result<(), FeatureError> {
        self.stft.validate()?;
        Ok(())
    }

    pub fn validate_hpss(&self) -> Result<(), FeatureError> {
        if self.hpss_kernel_harmonic == 0 || self.hpss_kernel_percussive == 0 {
            return Err(FeatureError::invalid("HPSS kernel sizes must be positive"));
        }
        if !(self.hpss_power.is_finite() && self.hpss_power > 0.0) {
            return Err(FeatureError::invalid("the HPSS mask power must be positive and finite"));
        }
        if !(self.hpss_margin_harmonic >= 1.0 && self.hpss_margin_percussive >= 1.0) {
            return Err(FeatureError::invalid("HPSS margins must be at least 1"));
        }
        Ok(())
    }

    /// Chroma, CENS and tonnetz parameters
    pub fn validate_chroma(&self) -> Result<(), FeatureError> {
        if self.n_chroma == 0 {
            return Err(FeatureError::invalid("the number of chroma bins must be positive"));
        }
        if self.cens_smoothing == Some(0) {
            return Err(FeatureError::invalid("the CENS smoothing length must be positive"));
        }
        Ok(())
    }

    pub fn validate_mel(&self) -> Result<(), FeatureError> {
        if self.n_mels == 0 {
            return Err(FeatureError::invalid("the number of mel bands must be positive"));
        }
        if !(self.mel_fmax > 0.0) {
            return Err(FeatureError::invalid("the mel spectrogram fmax must be positive"));
        }
        Ok(())
    }

    pub fn validate_mfcc(&self) -> Result<(), FeatureError> {
        if self.n_mels == 0 {
            return Err(FeatureError::invalid("the number of mel bands must be positive"));
        }
        if self.n_mfcc == 0 || self.n_mfcc > self.n_mels {
            return Err(FeatureError::invalid(format!(
                "the number of MFCCs must be between 1 and the number of mel bands ({})", self.n_mels
            )));
        }
        Ok(())
    }

    pub fn validate_contrast(&self) -> Result<(), FeatureError> {
        if self.contrast_bands == 0 || self.contrast_bands > MAX_CONTRAST_BANDS {
            return Err(FeatureError::invalid(format!(
                "spectral contrast needs between 1 and {} bands", MAX_CONTRAST_BANDS
            )));
        }
        if !(self.contrast_fmin.is_finite() && self.contrast_fmin > 0.0) {
            return Err(FeatureError::invalid("the spectral contrast fmin must be positive"));
        }
        if !(self.contrast_quantile > 0.0 && self.contrast_quantile < 1.0) {
            return Err(FeatureError::invalid("the contrast quantile must be between 0 and 1"));
        }
        Ok(())
    }

    pub fn validate_rolloff(&self) -> Result<(), FeatureError> {
        if !(self.roll_percent > 0.0 && self.roll_percent < 1.0) {
            return Err(FeatureError::invalid("the roll-off percentage must be between 0 and 1"));
        }
        Ok(())
    }

    /// Checked by every feature that converts to decibels
    pub fn validate_top_db(&self) -> Result<(), FeatureError> {
        if let Some(top_db) = self.top_db {
            if !(top_db >= 0.0) {
                return Err(FeatureError::invalid("top_db must be non-negative"));
            }
        }
        Ok(())
    }

    pub fn validate_zero_crossings(&self) -> Result<(), FeatureError> {
        if !(self.zero_crossing_threshold.is_finite() && self.zero_crossing_threshold >= 0.0) {
            return Err(FeatureError::invalid("the zero-crossing threshold must be non-negative and finite"));
        }
        Ok(())
    }
}

/// Everything a run needs: how to load the audio and how to analyze it
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct AppConfig {
    pub load: LoadOptions,
    pub features: FeatureConfig,
}

impl AppConfig {
    /// Reads a JSON configuration file. Missing fields keep their defaults.
    ///
    /// # Example
    ///
    /// ```no_run
    /// use aus_features::AppConfig;
    /// let config = AppConfig::from_file("analysis.json").unwrap();
    /// ```
    pub fn from_file(path: impl AsRef<Path>) -> Result<Self, ConfigError> {
        let text = std::fs::read_to_string(path.as_ref())?;
        let config: AppConfig = serde_json::from_str(&text)?;
        config.features.validate()?;
        Ok(config)
    }
}

#[cfg(test)]
mod test {
    use super::*;

    #[test]
    fn test_defaults_are_valid() {
        assert!(FeatureConfig::default().validate().is_ok());
    }

    #[test]
    fn test_partial_json() {
        let config: AppConfig = serde_json::from_str(r#"{"features": {"n_mfcc": 20, "stft": {"hop_size": 256}}}"#).unwrap();
        assert_eq!(config.features.n_mfcc, 20);
        assert_eq!(config.features.stft.hop_size, 256);
        assert_eq!(config.features.stft.fft_size, 2048);
        assert_eq!(config.load, LoadOptions::default());
    }

    #[test]
    fn test_invalid_values() {
        let config = FeatureConfig { n_mfcc: 200, ..Default::default() };
        assert!(matches!(config.validate(), Err(FeatureError::InvalidInput(_))));
        let config = FeatureConfig { roll_percent: 1.5, ..Default::default() };
        assert!(config.validate().is_err());
    }

    #[test]
    fn test_groups_are_checked_separately() {
        let config = FeatureConfig { contrast_quantile: 1.5, ..Default::default() };
        assert!(config.validate_contrast().is_err());
        assert!(config.validate_stft().is_ok());
        assert!(config.validate_mfcc().is_ok());
        assert!(config.validate_rolloff().is_ok());
        assert!(config.validate().is_err());
    }

    #[test]
    fn test_zero_crossing_threshold() {
        for threshold in [f64::NAN, -1e-3, f64::INFINITY] {
            let config = FeatureConfig { zero_crossing_threshold: threshold, ..Default::default() };
            assert!(config.validate_zero_crossings().is_err(), "{}", threshold);
        }
        let config = FeatureConfig { zero_crossing_threshold: 0.0, ..Default::default() };
        assert!(config.validate_zero_crossings().is_ok());
    }

    #[test]
    fn test_contrast_band_count_is_capped() {
        let config = FeatureConfig { contrast_bands: 200, ..Default::default() };
        assert!(matches!(config.validate_contrast(), Err(FeatureError::InvalidInput(_))));
        let config = FeatureConfig { contrast_bands: 16, ..Default::default() };
        assert!(config.validate_contrast().is_ok());
    }

    #[test]
    fn test_from_file() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("config.json");
        std::fs::write(&path, r#"{"load": {"sample_rate": null}, "features": {"roll_percent": 0.9}}"#).unwrap();
        let config = AppConfig::from_file(&path).unwrap();
        assert_eq!(config.load.sample_rate, None);
        assert_eq!(config.features.roll_percent, 0.9);

        std::fs::write(&path, r#"{"features": {"roll_percent": 2.0}}"#).unwrap();
        assert!(matches!(AppConfig::from_file(&path), Err(ConfigError::Invalid(_))));
    }
}
