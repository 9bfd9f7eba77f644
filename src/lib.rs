//! fricspec: multitaper spectral summaries of short acoustic segments
//!
//! This library computes variance-reduced spectral estimates of short,
//! noisy signal windows (fricatives in particular) and derives the compact
//! shape descriptors used as statistical variables in phonetic research.
//!
//! # Core Types
//!
//! - [`Sound`] - Audio samples with sample rate
//! - [`TaperSet`] - DPSS taper bank for a (length, NW, K) triple
//! - [`Spectrum`] - Single-window spectral estimate (power or log energy)
//! - [`SpectralMoments`] - Center of gravity, spread, skewness, kurtosis
//! - [`Descriptor`] - Per-window summary record (peak, moments, DCT)
//! - [`ResultTable`] - Ordered batch output over windows or intervals
//!
//! # Pipeline
//!
//! Raw samples flow through [`multitaper_spectrum`] (or the
//! [`fft_spectrum`] comparison baseline), then [`Spectrum::normalize`] for
//! log-energy conversion and band restriction, then the descriptor
//! operations. [`batch`] drives that pipeline across sliding windows,
//! annotated intervals, and file lists.

pub mod sound;
pub mod window;
pub mod taper;
pub mod multitaper;
pub mod periodogram;
pub mod spectrum;
pub mod dct;
pub mod descriptor;
pub mod textgrid;
pub mod batch;

pub mod utils;

// Re-export main types at crate root
pub use sound::Sound;
pub use window::WindowShape;
pub use taper::TaperSet;
pub use multitaper::{multitaper_spectrum, MultitaperParams, TaperWeighting};
pub use periodogram::fft_spectrum;
pub use spectrum::{Band, Scale, SpectralMoments, Spectrum};
pub use dct::{dct_coefficients, idct};
pub use descriptor::{describe, Descriptor, DescriptorRequest};
pub use textgrid::{read_intervals, Interval};
pub use batch::{
    batch_files, batch_intervals, batch_sound_intervals, batch_windows, estimate_spectrum,
    AnalysisConfig, EstimatorMethod, FileJob, ResultRow, ResultTable,
};

use thiserror::Error;

/// Errors that can occur in fricspec operations
#[derive(Error, Debug)]
pub enum FricspecError {
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("WAV decoding error: {0}")]
    WavDecode(#[from] hound::Error),

    #[error("Decode error: {0}")]
    Decode(String),

    #[error("Invalid parameter: {0}")]
    InvalidParameter(String),

    #[error("Invalid input: {0}")]
    InvalidInput(String),

    #[error("Insufficient samples: got {got}, need at least {needed}")]
    InsufficientSamples { needed: usize, got: usize },

    #[error("Band restriction from {min_hz} Hz to {max_hz} Hz leaves no bins")]
    EmptyBand { min_hz: f64, max_hz: f64 },

    #[error("Peak region from {min_hz} Hz to {max_hz} Hz leaves no bins")]
    EmptyRegion { min_hz: f64, max_hz: f64 },

    #[error("Degenerate spectrum: shifted energies sum to zero")]
    DegenerateSpectrum,

    #[error("TextGrid has no interval tier named {0:?}")]
    MissingTier(String),

    #[error("TextGrid parse error: {0}")]
    Parse(String),
}

pub type Result<T> = std::result::Result<T, FricspecError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_error_display() {
        let err = FricspecError::InsufficientSamples { needed: 16, got: 7 };
        let msg = err.to_string();
        assert!(msg.contains("16"));
        assert!(msg.contains("7"));

        let err = FricspecError::MissingTier("segments".to_string());
        assert!(err.to_string().contains("segments"));
    }
}
