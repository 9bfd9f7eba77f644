//! Discrete cosine transform coefficients as spectral shape descriptors
//!
//! The first few coefficients of an orthonormal type-II DCT of the
//! log-energy values summarize the gross shape of a spectrum regardless of
//! its frequency axis: coefficient 0 tracks mean level, 1 linear trend,
//! 2 curvature, 3 emphasis toward the upper frequencies. Only the ordinal
//! positions of the energy values enter the computation.

use std::f64::consts::PI;

use crate::{FricspecError, Result};

/// Compute the first `order + 1` orthonormal DCT-II coefficients
///
/// # Arguments
/// * `values` - Ordered energy values (the frequency axis is irrelevant)
/// * `order` - Highest coefficient index to compute
///
/// # Errors
/// `InvalidParameter` if `order + 1` exceeds the sequence length (the
/// transform has only `len` basis vectors) or the sequence is empty.
pub fn dct_coefficients(values: &[f64], order: usize) -> Result<Vec<f64>> {
    let n = values.len();
    if n == 0 {
        return Err(FricspecError::InvalidParameter(
            "cannot take DCT of an empty sequence".to_string(),
        ));
    }
    if order + 1 > n {
        return Err(FricspecError::InvalidParameter(format!(
            "DCT order {} needs {} coefficients but the sequence has only {} values",
            order,
            order + 1,
            n
        )));
    }

    let mut coefficients = Vec::with_capacity(order + 1);
    for k in 0..=order {
        let mut sum = 0.0;
        for (i, &x) in values.iter().enumerate() {
            sum += x * (PI * (i as f64 + 0.5) * k as f64 / n as f64).cos();
        }
        coefficients.push(sum * orthonormal_scale(k, n));
    }
    Ok(coefficients)
}

/// Invert an orthonormal DCT-II (i.e. apply the orthonormal DCT-III)
///
/// With a full-length coefficient set this reconstructs the original
/// sequence; with a truncated set it gives the smooth approximation the
/// retained coefficients describe.
///
/// # Arguments
/// * `coefficients` - DCT coefficients, orders 0 upward
/// * `n` - Length of the sequence to reconstruct
pub fn idct(coefficients: &[f64], n: usize) -> Result<Vec<f64>> {
    if n == 0 || coefficients.is_empty() {
        return Err(FricspecError::InvalidParameter(
            "inverse DCT needs a target length and at least one coefficient".to_string(),
        ));
    }
    if coefficients.len() > n {
        return Err(FricspecError::InvalidParameter(format!(
            "{} coefficients cannot come from a sequence of {} values",
            coefficients.len(),
            n
        )));
    }

    let mut values = Vec::with_capacity(n);
    for i in 0..n {
        let mut sum = 0.0;
        for (k, &c) in coefficients.iter().enumerate() {
            sum += c
                * orthonormal_scale(k, n)
                * (PI * (i as f64 + 0.5) * k as f64 / n as f64).cos();
        }
        values.push(sum);
    }
    Ok(values)
}

fn orthonormal_scale(k: usize, n: usize) -> f64 {
    if k == 0 {
        (1.0 / n as f64).sqrt()
    } else {
        (2.0 / n as f64).sqrt()
    }
}
