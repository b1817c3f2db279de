/// File: lib.rs
/// This file stitches the crate together

mod audiofile;
mod config;
mod error;
mod signal;
pub mod analysis;
pub mod features;
pub mod operations;
pub mod pipeline;
pub mod report;
pub mod spectrum;
pub mod synthesis;
pub mod tuning;

pub use audiofile::*;
pub use config::*;
pub use error::*;
pub use signal::*;
