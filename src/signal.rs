// File: signal.rs
// This file contains the mono signal type that every feature operates on.

use serde::Serialize;
use crate::error::FeatureError;

/// A mono sequence of samples and the rate it was loaded at.
/// A `Signal` is immutable once built, so the sample rate always matches the samples.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Signal {
    samples: Vec<f64>,
    sample_rate: u32,
}

impl Signal {
    /// Creates a signal. Fails if there are no samples, the sample rate is zero,
    /// or any sample is NaN or infinite.
    ///
    /// # Example
    ///
    /// ```
    /// use aus_features::Signal;
    /// let signal = Signal::new(vec![0.0, 0.5, -0.5], 22050).unwrap();
    /// assert_eq!(signal.len(), 3);
    /// ```
    pub fn new(samples: Vec<f64>, sample_rate: u32) -> Result<Self, FeatureError> {
        if samples.is_empty() {
            return Err(FeatureError::invalid("the signal has no samples"));
        }
        if sample_rate == 0 {
            return Err(FeatureError::invalid("the sample rate must be positive"));
        }
        if let Some(idx) = samples.iter().position(|x| !x.is_finite()) {
            return Err(FeatureError::invalid(format!("sample {} is not finite", idx)));
        }
        Ok(Signal { samples, sample_rate })
    }

    pub fn samples(&self) -> &[f64] {
        &self.samples
    }

    pub fn sample_rate(&self) -> u32 {
        self.sample_rate
    }

    pub fn len(&self) -> usize {
        self.samples.len()
    }

    /// Always false for a constructed signal
    pub fn is_empty(&self) -> bool {
        self.samples.is_empty()
    }

    /// Duration in seconds
    pub fn duration(&self) -> f64 {
        self.samples.len() as f64 / self.sample_rate as f64
    }

    pub fn into_samples(self) -> Vec<f64> {
        self.samples
    }
}

#[cfg(test)]
mod test {
    use super::*;

    #[test]
    fn test_rejects_bad_signals() {
        assert!(matches!(Signal::new(vec![], 22050), Err(FeatureError::InvalidInput(_))));
        assert!(matches!(Signal::new(vec![0.0], 0), Err(FeatureError::InvalidInput(_))));
        assert!(matches!(Signal::new(vec![0.0, f64::NAN], 8000), Err(FeatureError::InvalidInput(_))));
    }

    #[test]
    fn test_duration() {
        let signal = Signal::new(vec![0.0; 44100], 22050).unwrap();
        assert_eq!(signal.duration(), 2.0);
        assert_eq!(signal.sample_rate(), 22050);
    }
}
