//! # Analysis
//! The `analysis` module contains the low-level audio and spectrum analysis tools the features use.
//! Some analysis tools are based on formulas from Florian Eyben, "Real-Time Speech and Music Classification," Springer, 2016.

mod spectral_analysis_tools;
mod audio_analysis_tools;

#[doc(inline)]
pub use audio_analysis_tools::*;
#[doc(inline)]
pub use spectral_analysis_tools::*;
