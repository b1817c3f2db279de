//! # Spectrum
//! The `spectrum` module contains the STFT, windows and filterbanks that the features are built on.

mod fft;
mod filters;
mod window;

pub use fft::*;
pub use filters::*;
pub use window::*;
