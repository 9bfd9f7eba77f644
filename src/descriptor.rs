//! Per-window descriptor records
//!
//! A [`Descriptor`] bundles whichever shape statistics the caller asked
//! for: peak frequency, the four spectral moments, and DCT coefficients.
//! It has no identity beyond the window it summarizes and is the durable
//! artifact batch rows carry.

use serde::{Deserialize, Serialize};

use crate::dct::dct_coefficients;
use crate::spectrum::{Band, SpectralMoments, Spectrum};
use crate::Result;

/// Which descriptors to compute for a normalized spectrum
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct DescriptorRequest {
    /// Compute peak frequency
    pub peak: bool,
    /// Restrict the peak search to this region
    pub peak_region: Option<Band>,
    /// Compute the four spectral moments
    pub moments: bool,
    /// Compute DCT coefficients up to this order (inclusive)
    pub dct_order: Option<usize>,
}

impl Default for DescriptorRequest {
    /// Moments only, the workhorse of fricative studies
    fn default() -> Self {
        Self {
            peak: false,
            peak_region: None,
            moments: true,
            dct_order: None,
        }
    }
}

impl DescriptorRequest {
    /// Request everything: peak, moments, and DCT up to `dct_order`
    pub fn all(dct_order: usize) -> Self {
        Self {
            peak: true,
            peak_region: None,
            moments: true,
            dct_order: Some(dct_order),
        }
    }
}

/// Shape descriptors computed from one normalized spectrum
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Descriptor {
    /// Frequency of the maximum-energy bin (Hz)
    pub peak_frequency: Option<f64>,
    /// First four spectral moments
    pub moments: Option<SpectralMoments>,
    /// DCT coefficients, orders 0 upward
    pub dct: Option<Vec<f64>>,
}

/// Compute the requested descriptors of a normalized spectrum
///
/// Fails fast: the first descriptor that cannot be computed aborts the
/// call, so a Descriptor never holds a silently defaulted value.
pub fn describe(spectrum: &Spectrum, request: &DescriptorRequest) -> Result<Descriptor> {
    let peak_frequency = if request.peak {
        Some(spectrum.peak_frequency(request.peak_region)?)
    } else {
        None
    };

    let moments = if request.moments {
        Some(spectrum.moments()?)
    } else {
        None
    };

    let dct = match request.dct_order {
        Some(order) => Some(dct_coefficients(spectrum.values(), order)?),
        None => None,
    };

    Ok(Descriptor {
        peak_frequency,
        moments,
        dct,
    })
}
