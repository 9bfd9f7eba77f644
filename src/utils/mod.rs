//! Utility modules for signal processing
//!
//! Low-level helpers used by the spectral estimators.

pub mod fft;

pub use fft::Fft;
