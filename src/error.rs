// File: error.rs
// This file contains the error types shared by the loader, the spectrum tools and the features.

use thiserror::Error;

/// Represents the kinds of problems that can happen while reading or writing audio
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AudioErrorType {
    FileInaccessible,
    UnsupportedSource,
    UnsupportedFormat,
    NoAudioTrack,
    FileCorrupt,
    ResampleFailed,
    WriteFailed,
}

/// Represents a failure to load or write audio. Loading is never retried.
#[derive(Debug, Clone, Error)]
#[error("{error_msg}")]
pub struct AudioError {
    pub error_type: AudioErrorType,
    pub error_msg: String,
}

impl AudioError {
    pub fn new(error_type: AudioErrorType, error_msg: impl Into<String>) -> Self {
        AudioError { error_type, error_msg: error_msg.into() }
    }
}

/// Represents all possible errors that could happen in spectrum processing
#[derive(Debug, Clone, Error)]
#[error("{error_msg}")]
pub struct SpectrumError {
    pub error_msg: String,
}

impl SpectrumError {
    pub fn new(error_msg: impl Into<String>) -> Self {
        SpectrumError { error_msg: error_msg.into() }
    }
}

/// Represents a failure of a single feature computation.
/// Only the feature that produced it is aborted.
#[derive(Debug, Clone, Error)]
pub enum FeatureError {
    #[error("invalid input: {0}")]
    InvalidInput(String),
    #[error("spectrum error: {0}")]
    Spectrum(#[from] SpectrumError),
    #[error("audio error: {0}")]
    Audio(#[from] AudioError),
}

impl FeatureError {
    pub fn invalid(msg: impl Into<String>) -> Self {
        FeatureError::InvalidInput(msg.into())
    }
}

/// Represents a failure to read a configuration file
#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("could not read the configuration file: {0}")]
    Io(#[from] std::io::Error),
    #[error("could not parse the configuration file: {0}")]
    Parse(#[from] serde_json::Error),
    #[error("invalid configuration: {0}")]
    Invalid(#[from] FeatureError),
}

/// Represents a failure to export results
#[derive(Debug, Error)]
pub enum ReportError {
    #[error("could not write {path}: {source}")]
    Io { path: String, source: std::io::Error },
    #[error("could not serialize the results: {0}")]
    Json(#[from] serde_json::Error),
    #[error(transparent)]
    Audio(#[from] AudioError),
}
