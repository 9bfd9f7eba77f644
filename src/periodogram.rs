//! Single-window FFT periodogram, the comparison baseline
//!
//! One analysis window over the whole buffer, one transform, magnitude on
//! a decibel scale. Unlike the multitaper path, the output is already
//! log-scaled, so the normalizer passes it through rather than re-logging.

use crate::spectrum::Spectrum;
use crate::utils::Fft;
use crate::window::WindowShape;
use crate::{FricspecError, Result, Sound};

/// Compute a windowed periodogram of the whole buffer, in dB
///
/// Output covers 0 Hz to Nyquist in `L / 2 + 1` bins spaced
/// `sample_rate / L` apart, matching the multitaper estimator's grid.
///
/// # Errors
/// `InsufficientSamples` for a buffer of fewer than two samples;
/// `InvalidInput` if any bin has zero power (silence has no finite dB
/// representation, and mapping it to -inf would poison every downstream
/// statistic).
pub fn fft_spectrum(sound: &Sound, window: WindowShape) -> Result<Spectrum> {
    let samples = sound.samples();
    let len = samples.len();
    if len < 2 {
        return Err(FricspecError::InsufficientSamples { needed: 2, got: len });
    }

    let shape = window.generate(len);
    let tapered: Vec<f64> = samples
        .iter()
        .zip(shape.iter())
        .map(|(&x, &w)| x * w)
        .collect();

    let mut fft = Fft::new();
    let power = fft.power_spectrum(&tapered);

    let mut db = Vec::with_capacity(power.len());
    for &p in &power {
        if p <= 0.0 {
            return Err(FricspecError::InvalidInput(
                "periodogram bin has zero power; dB scale is undefined".to_string(),
            ));
        }
        db.push(10.0 * p.log10());
    }

    let df = sound.sample_rate() / len as f64;
    Ok(Spectrum::from_log_bins(db, df))
}

impl Sound {
    /// Compute the windowed FFT periodogram of this sound, in dB
    pub fn to_fft_spectrum(&self, window: WindowShape) -> Result<Spectrum> {
        fft_spectrum(self, window)
    }
}
