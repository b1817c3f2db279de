//! # Features
//! The `features` module contains the ten audio features. Every feature is a plain function
//! of the signal it receives and a `FeatureConfig`; none of them read files or render anything.
//! Frame-based features return a `FeatureMatrix` laid out as `rows × frames`.

mod chroma;
mod hpss;
mod mel;
mod spectral;
mod temporal;

pub use chroma::*;
pub use hpss::*;
pub use mel::*;
pub use spectral::*;
pub use temporal::*;

use clap::ValueEnum;
use serde::{Deserialize, Serialize};
use crate::config::FeatureConfig;
use crate::error::FeatureError;
use crate::signal::Signal;

/// A row-major feature matrix (`data[row][frame]`) with the parameters needed to place frames in time
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct FeatureMatrix {
    pub data: Vec<Vec<f64>>,
    pub sample_rate: u32,
    pub hop_size: usize,
}

impl FeatureMatrix {
    pub fn new(data: Vec<Vec<f64>>, sample_rate: u32, hop_size: usize) -> Self {
        FeatureMatrix { data, sample_rate, hop_size }
    }

    pub fn num_rows(&self) -> usize {
        self.data.len()
    }

    pub fn num_frames(&self) -> usize {
        self.data.first().map_or(0, |row| row.len())
    }

    /// `(rows, frames)`
    pub fn shape(&self) -> (usize, usize) {
        (self.num_rows(), self.num_frames())
    }

    pub fn row(&self, idx: usize) -> &[f64] {
        &self.data[idx]
    }

    /// Time in seconds at the center of frame `frame`
    pub fn frame_time(&self, frame: usize) -> f64 {
        (frame * self.hop_size) as f64 / self.sample_rate as f64
    }
}

/// Names the features this crate computes
#[derive(Debug, Copy, Clone, PartialEq, Eq, Hash, Serialize, Deserialize, ValueEnum)]
#[serde(rename_all = "kebab-case")]
pub enum FeatureKind {
    Info,
    Hpss,
    ChromaCens,
    SpectralContrast,
    ZeroCrossings,
    Tonnetz,
    Mfcc,
    SpectralCentroid,
    SpectralRolloff,
    MelSpectrogram,
}

impl FeatureKind {
    /// All features, in the order a full report presents them
    pub const ALL: [FeatureKind; 10] = [
        FeatureKind::Info,
        FeatureKind::Hpss,
        FeatureKind::ChromaCens,
        FeatureKind::SpectralContrast,
        FeatureKind::ZeroCrossings,
        FeatureKind::Tonnetz,
        FeatureKind::Mfcc,
        FeatureKind::SpectralCentroid,
        FeatureKind::SpectralRolloff,
        FeatureKind::MelSpectrogram,
    ];

    /// A human-readable title
    pub fn title(&self) -> &'static str {
        match self {
            FeatureKind::Info => "Audio overview",
            FeatureKind::Hpss => "Harmonic / percussive separation",
            FeatureKind::ChromaCens => "Chroma energy normalized (CENS)",
            FeatureKind::SpectralContrast => "Spectral contrast",
            FeatureKind::ZeroCrossings => "Zero crossings",
            FeatureKind::Tonnetz => "Tonnetz",
            FeatureKind::Mfcc => "MFCC",
            FeatureKind::SpectralCentroid => "Spectral centroid",
            FeatureKind::SpectralRolloff => "Spectral roll-off",
            FeatureKind::MelSpectrogram => "Mel spectrogram",
        }
    }

    /// The stem used for exported file names
    pub fn slug(&self) -> &'static str {
        match self {
            FeatureKind::Info => "info",
            FeatureKind::Hpss => "hpss",
            FeatureKind::ChromaCens => "chroma-cens",
            FeatureKind::SpectralContrast => "spectral-contrast",
            FeatureKind::ZeroCrossings => "zero-crossings",
            FeatureKind::Tonnetz => "tonnetz",
            FeatureKind::Mfcc => "mfcc",
            FeatureKind::SpectralCentroid => "spectral-centroid",
            FeatureKind::SpectralRolloff => "spectral-rolloff",
            FeatureKind::MelSpectrogram => "mel-spectrogram",
        }
    }

    /// Whether the feature can run on a harmonic or percussive component.
    /// The overview and the separation itself always use the full signal.
    pub fn accepts_source(&self) -> bool {
        !matches!(self, FeatureKind::Info | FeatureKind::Hpss)
    }
}

/// The value a feature produces
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(tag = "type", content = "value", rename_all = "snake_case")]
pub enum FeatureOutput {
    Info(AudioInfo),
    Separation(HarmonicPercussive),
    Matrix(FeatureMatrix),
    Crossings(Vec<bool>),
}

/// Which signal a feature runs on
#[derive(Debug, Copy, Clone, PartialEq, Eq, Default, Serialize, Deserialize, ValueEnum)]
#[serde(rename_all = "lowercase")]
pub enum SignalSource {
    #[default]
    Full,
    Harmonic,
    Percussive,
}

/// The loaded signal and, once separation has run, its components
#[derive(Debug, Clone)]
pub struct Sources {
    full: Signal,
    separation: Option<HarmonicPercussive>,
}

impl Sources {
    pub fn new(full: Signal) -> Self {
        Sources { full, separation: None }
    }

    pub fn full(&self) -> &Signal {
        &self.full
    }

    pub fn set_separation(&mut self, separation: HarmonicPercussive) {
        self.separation = Some(separation);
    }

    pub fn separation(&self) -> Option<&HarmonicPercussive> {
        self.separation.as_ref()
    }

    /// Gets the requested signal. Components are `None` until a separation is stored.
    pub fn get(&self, source: SignalSource) -> Option<&Signal> {
        match source {
            SignalSource::Full => Some(&self.full),
            SignalSource::Harmonic => self.separation.as_ref().map(|hp| &hp.harmonic),
            SignalSource::Percussive => self.separation.as_ref().map(|hp| &hp.percussive),
        }
    }
}

/// Computes one feature. A missing signal is an `InvalidInput` error; the signal is
/// never looked up anywhere else.
///
/// # Example
///
/// ```
/// use aus_features::{Signal, FeatureConfig};
/// use aus_features::features::{extract, FeatureKind, FeatureOutput, Tags};
/// let signal = Signal::new(aus_features::synthesis::sine(440.0, 0.0, 22050, 22050), 22050).unwrap();
/// let output = extract(FeatureKind::Mfcc, Some(&signal), &Tags::default(), &FeatureConfig::default()).unwrap();
/// if let FeatureOutput::Matrix(mfcc) = output {
///     assert_eq!(mfcc.num_rows(), 13);
/// }
/// ```
pub fn extract(kind: FeatureKind, signal: Option<&Signal>, tags: &Tags, config: &FeatureConfig) -> Result<FeatureOutput, FeatureError> {
    let signal = match signal {
        Some(x) => x,
        None => return Err(FeatureError::invalid(format!("no signal was provided for {}", kind.slug()))),
    };
    log::debug!("extracting {} from {} samples", kind.slug(), signal.len());
    let output = match kind {
        FeatureKind::Info => FeatureOutput::Info(audio_info(signal, tags)),
        FeatureKind::Hpss => FeatureOutput::Separation(harmonic_percussive(signal, config)?),
        FeatureKind::ChromaCens => FeatureOutput::Matrix(chroma_cens(signal, config)?),
        FeatureKind::SpectralContrast => FeatureOutput::Matrix(spectral_contrast(signal, config)?),
        FeatureKind::ZeroCrossings => {
            config.validate_zero_crossings()?;
            FeatureOutput::Crossings(zero_crossings(signal, config.zero_crossing_threshold))
        }
        FeatureKind::Tonnetz => FeatureOutput::Matrix(tonnetz(signal, config)?),
        FeatureKind::Mfcc => FeatureOutput::Matrix(mfcc(signal, config)?),
        FeatureKind::SpectralCentroid => FeatureOutput::Matrix(spectral_centroid(signal, config)?),
        FeatureKind::SpectralRolloff => FeatureOutput::Matrix(spectral_rolloff(signal, config)?),
        FeatureKind::MelSpectrogram => FeatureOutput::Matrix(mel_spectrogram(signal, config)?),
    };
    Ok(output)
}
