//! Resting cytoplasmic calcium from the leak/SERCA balance
//!
//! Solves `a·c² + b·c + c₀ = 0` with
//! ```text
//! a  = serca_rate
//! b  = serca_k² − leak_rate / serca_rate
//! c₀ = −leak_rate · serca_k² / serca_rate
//! ```
//! and takes the `+√` root. For non-negative rates the discriminant is never
//! negative; negative rates can make it so, and the engine must not seed its
//! fields with NaN in that case.

use std::fmt;
use tracing::warn;

/// Value substituted when no real equilibrium exists
pub const EQUILIBRIUM_FALLBACK: f64 = 0.0;

/// Reasons the equilibrium quadratic has no usable root
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum EquilibriumError {
    /// `serca_rate` is zero, the quadratic degenerates
    DegenerateSerca,
    /// `b² − 4ac < 0`
    NegativeDiscriminant(f64),
    /// The root is NaN or infinite
    NonFinite(f64),
}

impl fmt::Display for EquilibriumError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            EquilibriumError::DegenerateSerca => write!(f, "SERCA rate is zero"),
            EquilibriumError::NegativeDiscriminant(d) => {
                write!(f, "negative discriminant {d:e}")
            }
            EquilibriumError::NonFinite(v) => write!(f, "non-finite root {v}"),
        }
    }
}

impl std::error::Error for EquilibriumError {}

/// Positive root of the leak/SERCA balance quadratic
///
/// # Errors
/// See [`EquilibriumError`]
pub fn calcium_equilibrium(
    leak_rate: f64,
    serca_rate: f64,
    serca_k: f64,
) -> Result<f64, EquilibriumError> {
    if serca_rate == 0.0 {
        return Err(EquilibriumError::DegenerateSerca);
    }

    let k_sq = serca_k * serca_k;
    let a = serca_rate;
    let b = k_sq - leak_rate / serca_rate;
    let c0 = -leak_rate * k_sq / serca_rate;

    let discriminant = b * b - 4.0 * a * c0;
    if discriminant < 0.0 {
        return Err(EquilibriumError::NegativeDiscriminant(discriminant));
    }

    let root = (-b + discriminant.sqrt()) / (2.0 * a);
    if root.is_finite() {
        Ok(root)
    } else {
        Err(EquilibriumError::NonFinite(root))
    }
}

/// Equilibrium calcium, or [`EQUILIBRIUM_FALLBACK`] with a warning
///
/// The second element is true when the fallback was used.
pub fn equilibrium_or_fallback(leak_rate: f64, serca_rate: f64, serca_k: f64) -> (f64, bool) {
    match calcium_equilibrium(leak_rate, serca_rate, serca_k) {
        Ok(value) => (value, false),
        Err(e) => {
            warn!(
                "No equilibrium calcium for leak={}, serca={}, k={}: {}; using {}",
                leak_rate, serca_rate, serca_k, e, EQUILIBRIUM_FALLBACK
            );
            (EQUILIBRIUM_FALLBACK, true)
        }
    }
}
