// File: temporal.rs
// This file contains the time-domain features: the audio overview and zero crossings.

use serde::{Deserialize, Serialize};
use crate::analysis;
use crate::signal::Signal;

/// Free-text tags shown in the audio overview. They are not validated.
#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct Tags {
    pub label: String,
    pub emotion: String,
    pub gender: String,
}

impl Tags {
    pub fn new(label: impl Into<String>, emotion: impl Into<String>, gender: impl Into<String>) -> Self {
        Tags { label: label.into(), emotion: emotion.into(), gender: gender.into() }
    }
}

/// Descriptive metadata for a signal
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct AudioInfo {
    pub label: String,
    pub emotion: String,
    pub gender: String,
    /// Duration in seconds
    pub duration: f64,
    pub sample_rate: u32,
    pub num_samples: usize,
    /// Peak level in dBFS
    pub peak_dbfs: f64,
    /// RMS energy
    pub rms: f64,
}

/// Gathers the overview of a signal
pub fn audio_info(signal: &Signal, tags: &Tags) -> AudioInfo {
    AudioInfo {
        label: tags.label.clone(),
        emotion: tags.emotion.clone(),
        gender: tags.gender.clone(),
        duration: signal.duration(),
        sample_rate: signal.sample_rate(),
        num_samples: signal.len(),
        peak_dbfs: analysis::dbfs_max(signal.samples()),
        rms: analysis::energy(signal.samples()),
    }
}

/// Marks the samples where the sign changes from the previous sample.
/// Values with magnitude at or below `threshold` count as zero, and zero counts as positive.
/// The output has one entry per sample; the first entry is always `true`.
pub fn zero_crossings(signal: &Signal, threshold: f64) -> Vec<bool> {
    analysis::zero_crossings(signal.samples(), threshold)
}
