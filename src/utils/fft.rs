//! FFT wrapper for spectral estimation
//!
//! Thin wrapper around rustfft that caches planned transforms and exposes
//! the one-sided power spectrum both estimators consume. Transforms run at
//! the window length itself, never a padded power of two, so the bin grid
//! comes out at exactly sample_rate / L.

use num_complex::Complex;
use rustfft::FftPlanner;

/// FFT processor with cached plans
pub struct Fft {
    planner: FftPlanner<f64>,
}

impl Fft {
    /// Create a new FFT processor
    pub fn new() -> Self {
        Self {
            planner: FftPlanner::new(),
        }
    }

    /// Forward transform of a real-valued window
    pub fn real_fft(&mut self, input: &[f64]) -> Vec<Complex<f64>> {
        let fft = self.planner.plan_fft_forward(input.len());
        let mut buffer: Vec<Complex<f64>> =
            input.iter().map(|&x| Complex::new(x, 0.0)).collect();
        fft.process(&mut buffer);
        buffer
    }

    /// One-sided power spectrum (squared magnitude) of a real window
    ///
    /// Returns `len / 2 + 1` values covering 0 Hz to Nyquist; the negative
    /// frequencies of a real signal carry no extra information.
    pub fn power_spectrum(&mut self, input: &[f64]) -> Vec<f64> {
        let n_freqs = input.len() / 2 + 1;
        let spectrum = self.real_fft(input);
        spectrum[..n_freqs].iter().map(|c| c.norm_sqr()).collect()
    }
}

impl Default for Fft {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_relative_eq;
    use std::f64::consts::PI;

    #[test]
    fn test_constant_signal_is_all_dc() {
        let mut fft = Fft::new();
        let spectrum = fft.real_fft(&vec![1.0; 8]);

        assert_relative_eq!(spectrum[0].re, 8.0, epsilon = 1e-10);
        assert_relative_eq!(spectrum[0].im, 0.0, epsilon = 1e-10);
        for c in &spectrum[1..] {
            assert_relative_eq!(c.norm(), 0.0, epsilon = 1e-10);
        }
    }

    #[test]
    fn test_sine_lands_on_its_bin() {
        let mut fft = Fft::new();
        let n = 16;
        let input: Vec<f64> = (0..n)
            .map(|i| (2.0 * PI * i as f64 / n as f64).sin())
            .collect();

        let spectrum = fft.real_fft(&input);
        assert!(spectrum[1].norm() > 1.0);
        assert_relative_eq!(spectrum[0].norm(), 0.0, epsilon = 1e-10);
        assert_relative_eq!(spectrum[2].norm(), 0.0, epsilon = 1e-10);
    }

    #[test]
    fn test_power_spectrum_length_even_and_odd() {
        let mut fft = Fft::new();
        assert_eq!(fft.power_spectrum(&vec![0.5; 100]).len(), 51);
        assert_eq!(fft.power_spectrum(&vec![0.5; 101]).len(), 51);
    }

    #[test]
    fn test_parseval() {
        let mut fft = Fft::new();
        let input = vec![0.3, -1.2, 2.0, 0.7, -0.5, 1.1, 0.0, 3.3];

        let spectrum = fft.real_fft(&input);
        let freq_energy: f64 = spectrum.iter().map(|c| c.norm_sqr()).sum();
        let time_energy: f64 = input.iter().map(|&x| x * x).sum();

        assert_relative_eq!(freq_energy, 8.0 * time_energy, epsilon = 1e-9);
    }
}
