//! Analysis windows for the periodogram baseline
//!
//! The multitaper estimator builds its own taper bank; these single-shot
//! window shapes exist for the FFT comparison path, where one analysis
//! window is applied to the whole buffer before the transform.

use std::f64::consts::PI;

use serde::{Deserialize, Serialize};

/// Window shapes available for the FFT baseline
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub enum WindowShape {
    /// Rectangular window (no windowing)
    Rectangular,
    /// Hanning window (raised cosine)
    Hanning,
    /// Hamming window
    #[default]
    Hamming,
}

impl WindowShape {
    /// Generate a complete window of the given size
    ///
    /// Sample positions are taken at bin centers, so the first and last
    /// values are nonzero for the cosine windows.
    pub fn generate(self, size: usize) -> Vec<f64> {
        (0..size)
            .map(|i| {
                let phase = 2.0 * PI * ((i as f64 + 0.5) / size as f64 - 0.5);
                match self {
                    WindowShape::Rectangular => 1.0,
                    WindowShape::Hanning => 0.5 + 0.5 * phase.cos(),
                    WindowShape::Hamming => 0.54 + 0.46 * phase.cos(),
                }
            })
            .collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_relative_eq;

    #[test]
    fn test_rectangular_window() {
        let window = WindowShape::Rectangular.generate(10);
        assert_eq!(window.len(), 10);
        for &v in &window {
            assert_relative_eq!(v, 1.0, epsilon = 1e-10);
        }
    }

    #[test]
    fn test_hamming_window_properties() {
        let window = WindowShape::Hamming.generate(100);

        // Symmetric
        for i in 0..50 {
            assert_relative_eq!(window[i], window[99 - i], epsilon = 1e-10);
        }

        // Center near 1.0, edges near the 0.08 Hamming floor
        assert!(window[49] > 0.99);
        assert!(window[0] < 0.1);
        assert!(window[0] > 0.07);
    }

    #[test]
    fn test_hanning_window_properties() {
        let window = WindowShape::Hanning.generate(100);

        for i in 0..50 {
            assert_relative_eq!(window[i], window[99 - i], epsilon = 1e-10);
        }

        assert!(window[49] > 0.99);
        assert!(window[0] < 0.02);
    }

    #[test]
    fn test_empty_window() {
        assert!(WindowShape::Hamming.generate(0).is_empty());
    }
}
