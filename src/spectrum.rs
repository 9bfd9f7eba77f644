//! Spectral estimate representation and shape statistics
//!
//! A [`Spectrum`] is an ordered sequence of (frequency, value) pairs
//! tagged with the scale of its values: raw power straight out of an
//! estimator, or log energy after normalization. Band restriction, peak
//! picking, and the four spectral moments all live here because they are
//! all functions of that pair sequence and nothing else.

use serde::{Deserialize, Serialize};

use crate::{FricspecError, Result};

/// Scale of the values stored in a Spectrum
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum Scale {
    /// Non-negative power/energy values from an estimator
    Power,
    /// Log-energy values (natural log of power, or dB from the baseline)
    LogEnergy,
}

/// A frequency band of interest, open at both ends
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Band {
    pub min_hz: f64,
    pub max_hz: f64,
}

impl Band {
    /// Create a band, rejecting empty or inverted ranges
    pub fn new(min_hz: f64, max_hz: f64) -> Result<Self> {
        if min_hz >= max_hz {
            return Err(FricspecError::InvalidParameter(format!(
                "band minimum {} Hz must lie below maximum {} Hz",
                min_hz, max_hz
            )));
        }
        Ok(Self { min_hz, max_hz })
    }

    /// True if `freq` survives the restriction (strict exclusion at both edges)
    fn contains(&self, freq: f64) -> bool {
        freq > self.min_hz && freq < self.max_hz
    }
}

/// The first four spectral moments of a log-energy spectrum
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct SpectralMoments {
    /// Energy-weighted mean frequency (Hz)
    pub center_of_gravity: f64,
    /// Square root of the weighted variance (Hz)
    pub standard_deviation: f64,
    /// Third standardized central moment
    pub skewness: f64,
    /// Fourth standardized central moment (not excess)
    pub kurtosis: f64,
}

/// Single-window spectral estimate
#[derive(Debug, Clone)]
pub struct Spectrum {
    /// Bin frequencies in Hz, strictly increasing
    freqs: Vec<f64>,
    /// Bin values on the scale given by `scale`
    values: Vec<f64>,
    scale: Scale,
}

impl Spectrum {
    /// Build a spectrum from parallel frequency/value sequences
    ///
    /// # Errors
    /// `InvalidInput` if the sequences differ in length, are empty, or the
    /// frequencies are not strictly increasing starting at or above 0 Hz.
    pub fn new(freqs: Vec<f64>, values: Vec<f64>, scale: Scale) -> Result<Self> {
        if freqs.len() != values.len() {
            return Err(FricspecError::InvalidInput(format!(
                "{} frequencies but {} values",
                freqs.len(),
                values.len()
            )));
        }
        if freqs.is_empty() {
            return Err(FricspecError::InvalidInput(
                "spectrum must contain at least one bin".to_string(),
            ));
        }
        if freqs[0] < 0.0 || freqs.windows(2).any(|pair| pair[1] <= pair[0]) {
            return Err(FricspecError::InvalidInput(
                "frequencies must be strictly increasing and non-negative".to_string(),
            ));
        }
        Ok(Self {
            freqs,
            values,
            scale,
        })
    }

    /// Build a raw-power spectrum on the regular grid `0, df, 2*df, ...`
    pub(crate) fn from_power_bins(values: Vec<f64>, df: f64) -> Self {
        let freqs = (0..values.len()).map(|i| i as f64 * df).collect();
        Self {
            freqs,
            values,
            scale: Scale::Power,
        }
    }

    /// Build a log-energy spectrum on the regular grid `0, df, 2*df, ...`
    pub(crate) fn from_log_bins(values: Vec<f64>, df: f64) -> Self {
        let freqs = (0..values.len()).map(|i| i as f64 * df).collect();
        Self {
            freqs,
            values,
            scale: Scale::LogEnergy,
        }
    }

    /// Number of frequency bins
    pub fn len(&self) -> usize {
        self.freqs.len()
    }

    /// True if the spectrum has no bins
    pub fn is_empty(&self) -> bool {
        self.freqs.is_empty()
    }

    /// Bin frequencies in Hz
    pub fn freqs(&self) -> &[f64] {
        &self.freqs
    }

    /// Bin values
    pub fn values(&self) -> &[f64] {
        &self.values
    }

    /// Scale of the stored values
    pub fn scale(&self) -> Scale {
        self.scale
    }

    /// Convert to log energy and optionally restrict to a band
    ///
    /// Raw power values are replaced by their natural log; a spectrum that
    /// is already log-scaled (the FFT baseline) passes through unchanged.
    /// Band edges are strictly exclusive: bins at exactly `min_hz` or
    /// `max_hz` are dropped. Low-frequency voicing energy is the usual
    /// reason to restrict; a floor around 500 Hz is conventional for
    /// voiceless fricatives.
    ///
    /// # Errors
    /// `InvalidInput` if a raw power value is zero or negative (log would
    /// be undefined); `EmptyBand` if the restriction removes every bin.
    pub fn normalize(&self, band: Option<Band>) -> Result<Spectrum> {
        let log_values: Vec<f64> = match self.scale {
            Scale::LogEnergy => self.values.clone(),
            Scale::Power => {
                if let Some(&bad) = self.values.iter().find(|&&v| v <= 0.0) {
                    return Err(FricspecError::InvalidInput(format!(
                        "cannot take log of non-positive power value {}",
                        bad
                    )));
                }
                self.values.iter().map(|&v| v.ln()).collect()
            }
        };

        match band {
            None => Ok(Spectrum {
                freqs: self.freqs.clone(),
                values: log_values,
                scale: Scale::LogEnergy,
            }),
            Some(band) => {
                let mut freqs = Vec::new();
                let mut values = Vec::new();
                for (&f, &v) in self.freqs.iter().zip(log_values.iter()) {
                    if band.contains(f) {
                        freqs.push(f);
                        values.push(v);
                    }
                }
                if freqs.is_empty() {
                    return Err(FricspecError::EmptyBand {
                        min_hz: band.min_hz,
                        max_hz: band.max_hz,
                    });
                }
                Ok(Spectrum {
                    freqs,
                    values,
                    scale: Scale::LogEnergy,
                })
            }
        }
    }

    /// Frequency of the maximum-energy bin
    ///
    /// With a `region`, bins outside it are ignored (strict exclusion at
    /// the edges, same as [`Spectrum::normalize`]); the spectrum itself is
    /// left untouched. Ties go to the lowest frequency.
    ///
    /// # Errors
    /// `EmptyRegion` if the region excludes every bin.
    pub fn peak_frequency(&self, region: Option<Band>) -> Result<f64> {
        let mut best: Option<(f64, f64)> = None;
        for (&f, &v) in self.freqs.iter().zip(self.values.iter()) {
            if let Some(region) = region {
                if !region.contains(f) {
                    continue;
                }
            }
            match best {
                Some((_, best_v)) if v <= best_v => {}
                _ => best = Some((f, v)),
            }
        }

        match (best, region) {
            (Some((f, _)), _) => Ok(f),
            (None, Some(region)) => Err(FricspecError::EmptyRegion {
                min_hz: region.min_hz,
                max_hz: region.max_hz,
            }),
            // `new` guarantees at least one bin, so this is unreachable
            // without a region
            (None, None) => Err(FricspecError::InvalidInput(
                "spectrum has no bins".to_string(),
            )),
        }
    }

    /// Compute the first four spectral moments
    ///
    /// Log energies may be negative, so every value is shifted by the
    /// minimum before the bins are normalized into a discrete probability
    /// distribution over frequency. The shift is applied unconditionally,
    /// which makes the moments invariant to any constant offset in the
    /// energies. Standard deviation is reported in Hz.
    ///
    /// # Errors
    /// `DegenerateSpectrum` if the shifted weights sum to zero (a flat
    /// spectrum) or if all the weight falls on one bin, leaving the
    /// standardized moments undefined.
    pub fn moments(&self) -> Result<SpectralMoments> {
        let min = self
            .values
            .iter()
            .cloned()
            .fold(f64::INFINITY, f64::min);
        let weights: Vec<f64> = self.values.iter().map(|&v| v - min).collect();

        let total: f64 = weights.iter().sum();
        if total <= 0.0 {
            return Err(FricspecError::DegenerateSpectrum);
        }

        let cog: f64 = self
            .freqs
            .iter()
            .zip(weights.iter())
            .map(|(&f, &w)| f * w)
            .sum::<f64>()
            / total;

        let variance: f64 = self
            .freqs
            .iter()
            .zip(weights.iter())
            .map(|(&f, &w)| (f - cog) * (f - cog) * w)
            .sum::<f64>()
            / total;
        let sd = variance.sqrt();

        if sd == 0.0 {
            return Err(FricspecError::DegenerateSpectrum);
        }

        let mut skew = 0.0;
        let mut kurt = 0.0;
        for (&f, &w) in self.freqs.iter().zip(weights.iter()) {
            let z = (f - cog) / sd;
            skew += z * z * z * w;
            kurt += z * z * z * z * w;
        }
        skew /= total;
        kurt /= total;

        Ok(SpectralMoments {
            center_of_gravity: cog,
            standard_deviation: sd,
            skewness: skew,
            kurtosis: kurt,
        })
    }
}
