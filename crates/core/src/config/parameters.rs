//! Model parameters, structure constants and field clamp bounds.
//!
//! `ModelParameters` is the flat record persisted as JSON. Its key set is
//! closed: loading merges known keys field by field and reports anything
//! else instead of inventing new attributes.

use serde::Serialize;
use serde_json::{Map, Value};
use std::fmt;
use tracing::warn;

/// Every key of the persisted parameter record, in serialization order
pub const PARAMETER_KEYS: [&str; 20] = [
    "grid_size",
    "dx",
    "dt",
    "ip3r_cluster_density",
    "ip3r_per_cluster",
    "ip3r_open_rate",
    "ip3r_close_rate",
    "D_ca",
    "D_ip3",
    "leak_rate",
    "serca_rate",
    "serca_k",
    "ip3_degradation_rate",
    "pmca_rate",
    "mcu_rate",
    "buffer_total",
    "buffer_kd",
    "buffer_kon",
    "er_calcium_init",
    "mito_calcium_init",
];

/// Rate, diffusion and geometry constants of the calcium model
///
/// Immutable during a run; changing any of them goes through a
/// reconfiguration that resets the simulation.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ModelParameters {
    /// Grid edge length in cells
    pub grid_size: usize,
    /// Cell width (µm)
    pub dx: f64,
    /// Timestep (s)
    pub dt: f64,

    /// Fraction of ER sites hosting an IP3R cluster (0-1)
    pub ip3r_cluster_density: f64,
    /// Mean channel count per cluster (Poisson mean)
    pub ip3r_per_cluster: f64,
    /// Opening rate constant, per step
    pub ip3r_open_rate: f64,
    /// Closing rate constant, per step
    pub ip3r_close_rate: f64,

    /// Cytoplasmic calcium diffusion coefficient (µm²/s)
    #[serde(rename = "D_ca")]
    pub d_ca: f64,
    /// IP3 diffusion coefficient (µm²/s)
    #[serde(rename = "D_ip3")]
    pub d_ip3: f64,
    /// Passive ER leak rate (1/s)
    pub leak_rate: f64,
    /// Maximal SERCA uptake rate (µM/s)
    pub serca_rate: f64,
    /// SERCA half-activation constant (µM)
    pub serca_k: f64,
    /// IP3 degradation rate (1/s)
    pub ip3_degradation_rate: f64,
    /// PMCA extrusion rate at the plasma membrane (1/s)
    pub pmca_rate: f64,
    /// Mitochondrial uniporter rate (1/s)
    pub mcu_rate: f64,

    /// Total buffer concentration (µM)
    pub buffer_total: f64,
    /// Buffer dissociation constant (µM)
    pub buffer_kd: f64,
    /// Buffer binding rate (1/(µM·s))
    pub buffer_kon: f64,

    /// Initial ER calcium (µM)
    pub er_calcium_init: f64,
    /// Initial mitochondrial calcium (µM)
    pub mito_calcium_init: f64,
}

impl Default for ModelParameters {
    fn default() -> Self {
        Self {
            grid_size: 200,
            dx: 0.1,
            dt: 0.001,
            ip3r_cluster_density: 0.01,
            ip3r_per_cluster: 10.0,
            ip3r_open_rate: 0.01,
            ip3r_close_rate: 10.0,
            d_ca: 20.0,
            d_ip3: 200.0,
            leak_rate: 0.0002,
            serca_rate: 0.4,
            serca_k: 0.2,
            ip3_degradation_rate: 0.1,
            pmca_rate: 0.1,
            mcu_rate: 0.05,
            buffer_total: 100.0,
            buffer_kd: 0.5,
            buffer_kon: 100.0,
            er_calcium_init: 500.0,
            mito_calcium_init: 0.1,
        }
    }
}

impl ModelParameters {
    /// Check every value against its admissible range
    ///
    /// # Errors
    /// Returns `ParameterError::InvalidValue` naming the first offending key
    pub fn validate(&self) -> Result<(), ParameterError> {
        if self.grid_size < 3 {
            return Err(ParameterError::InvalidValue {
                key: "grid_size".to_string(),
                reason: format!("must be at least 3, got {}", self.grid_size),
            });
        }

        for (key, value) in self.real_values() {
            if !value.is_finite() {
                return Err(ParameterError::InvalidValue {
                    key: key.to_string(),
                    reason: format!("must be finite, got {value}"),
                });
            }
            let strictly_positive = matches!(key, "dx" | "dt");
            if strictly_positive && value <= 0.0 {
                return Err(ParameterError::InvalidValue {
                    key: key.to_string(),
                    reason: format!("must be positive, got {value}"),
                });
            }
            if value < 0.0 {
                return Err(ParameterError::InvalidValue {
                    key: key.to_string(),
                    reason: format!("must not be negative, got {value}"),
                });
            }
        }

        if self.ip3r_cluster_density > 1.0 {
            return Err(ParameterError::InvalidValue {
                key: "ip3r_cluster_density".to_string(),
                reason: format!("must lie in [0, 1], got {}", self.ip3r_cluster_density),
            });
        }

        Ok(())
    }

    /// Merge a key-value record into a copy of these parameters
    ///
    /// Known keys overwrite the current value, missing keys keep it, unknown
    /// keys are logged and returned so the caller can surface them.
    ///
    /// # Errors
    /// Returns `ParameterError::InvalidFormat` when a known key carries a
    /// value of the wrong type. `self` is never modified.
    pub fn merged_with(
        &self,
        record: &Map<String, Value>,
    ) -> Result<(Self, Vec<String>), ParameterError> {
        let mut merged = self.clone();
        let mut unknown = Vec::new();

        for (key, value) in record {
            match key.as_str() {
                "grid_size" => merged.grid_size = as_grid_size(value)?,
                "dx" => merged.dx = as_real(key, value)?,
                "dt" => merged.dt = as_real(key, value)?,
                "ip3r_cluster_density" => merged.ip3r_cluster_density = as_real(key, value)?,
                "ip3r_per_cluster" => merged.ip3r_per_cluster = as_real(key, value)?,
                "ip3r_open_rate" => merged.ip3r_open_rate = as_real(key, value)?,
                "ip3r_close_rate" => merged.ip3r_close_rate = as_real(key, value)?,
                "D_ca" => merged.d_ca = as_real(key, value)?,
                "D_ip3" => merged.d_ip3 = as_real(key, value)?,
                "leak_rate" => merged.leak_rate = as_real(key, value)?,
                "serca_rate" => merged.serca_rate = as_real(key, value)?,
                "serca_k" => merged.serca_k = as_real(key, value)?,
                "ip3_degradation_rate" => merged.ip3_degradation_rate = as_real(key, value)?,
                "pmca_rate" => merged.pmca_rate = as_real(key, value)?,
                "mcu_rate" => merged.mcu_rate = as_real(key, value)?,
                "buffer_total" => merged.buffer_total = as_real(key, value)?,
                "buffer_kd" => merged.buffer_kd = as_real(key, value)?,
                "buffer_kon" => merged.buffer_kon = as_real(key, value)?,
                "er_calcium_init" => merged.er_calcium_init = as_real(key, value)?,
                "mito_calcium_init" => merged.mito_calcium_init = as_real(key, value)?,
                _ => {
                    warn!("Unknown parameter '{}' ignored", key);
                    unknown.push(key.clone());
                }
            }
        }

        Ok((merged, unknown))
    }

    /// Clamp ceilings implied by these parameters
    #[must_use]
    pub fn bounds(&self) -> FieldBounds {
        FieldBounds {
            buffer_max: self.buffer_total,
            ..FieldBounds::default()
        }
    }

    fn real_values(&self) -> [(&'static str, f64); 19] {
        [
            ("dx", self.dx),
            ("dt", self.dt),
            ("ip3r_cluster_density", self.ip3r_cluster_density),
            ("ip3r_per_cluster", self.ip3r_per_cluster),
            ("ip3r_open_rate", self.ip3r_open_rate),
            ("ip3r_close_rate", self.ip3r_close_rate),
            ("D_ca", self.d_ca),
            ("D_ip3", self.d_ip3),
            ("leak_rate", self.leak_rate),
            ("serca_rate", self.serca_rate),
            ("serca_k", self.serca_k),
            ("ip3_degradation_rate", self.ip3_degradation_rate),
            ("pmca_rate", self.pmca_rate),
            ("mcu_rate", self.mcu_rate),
            ("buffer_total", self.buffer_total),
            ("buffer_kd", self.buffer_kd),
            ("buffer_kon", self.buffer_kon),
            ("er_calcium_init", self.er_calcium_init),
            ("mito_calcium_init", self.mito_calcium_init),
        ]
    }
}

fn as_real(key: &str, value: &Value) -> Result<f64, ParameterError> {
    value.as_f64().ok_or_else(|| {
        ParameterError::InvalidFormat(format!("'{key}' must be a number, got {value}"))
    })
}

fn as_grid_size(value: &Value) -> Result<usize, ParameterError> {
    if let Some(n) = value.as_u64() {
        return usize::try_from(n)
            .map_err(|_| ParameterError::InvalidFormat(format!("'grid_size' too large: {n}")));
    }
    // Integral floats such as 200.0 are accepted
    match value.as_f64() {
        Some(f) if f >= 0.0 && f.fract() == 0.0 && f <= u32::MAX as f64 => Ok(f as usize),
        _ => Err(ParameterError::InvalidFormat(format!(
            "'grid_size' must be a non-negative integer, got {value}"
        ))),
    }
}

/// Structural constants of the generated cell cross-section
///
/// Not part of the persisted record.
#[derive(Debug, Clone, PartialEq)]
pub struct StructureParameters {
    /// Number of ER line segments
    pub tubule_count: usize,
    /// Segment length range in cells, upper bound exclusive
    pub tubule_length: (usize, usize),
    /// Cross-shaped dilation passes applied to the raw segments
    pub dilation_iterations: usize,
    /// Number of mitochondrial blocks
    pub mitochondria_count: usize,
    /// Block half-extent along rows
    pub mitochondria_half_rows: usize,
    /// Block half-extent along columns
    pub mitochondria_half_cols: usize,
}

impl Default for StructureParameters {
    fn default() -> Self {
        Self {
            tubule_count: 50,
            tubule_length: (20, 50),
            dilation_iterations: 2,
            mitochondria_count: 20,
            mitochondria_half_rows: 5,
            mitochondria_half_cols: 2,
        }
    }
}

/// Physiological ceilings applied after every step
///
/// Lower bound is 0 for every field.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct FieldBounds {
    /// Cytoplasmic calcium ceiling
    pub calcium_max: f64,
    /// ER calcium ceiling
    pub er_calcium_max: f64,
    /// Mitochondrial calcium ceiling
    pub mito_calcium_max: f64,
    /// IP3 ceiling
    pub ip3_max: f64,
    /// Bound buffer ceiling, equal to the total buffer
    pub buffer_max: f64,
}

impl Default for FieldBounds {
    fn default() -> Self {
        Self {
            calcium_max: 1000.0,
            er_calcium_max: 10000.0,
            mito_calcium_max: 1000.0,
            ip3_max: 10.0,
            buffer_max: 100.0,
        }
    }
}

/// Errors raised while validating, loading or saving parameters
#[derive(Debug, Clone, PartialEq)]
pub enum ParameterError {
    /// Parameter file does not exist
    SourceNotFound(String),
    /// Parameter file exists but could not be read
    Unreadable(String),
    /// Parameter source is not a valid record
    InvalidFormat(String),
    /// A value lies outside its admissible range
    InvalidValue {
        /// Offending key
        key: String,
        /// Why it was rejected
        reason: String,
    },
    /// Failed to serialize parameters
    SerializeFailed(String),
    /// Failed to write parameter file
    SaveFailed(String),
}

impl fmt::Display for ParameterError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ParameterError::SourceNotFound(path) => write!(f, "Parameter source not found: {path}"),
            ParameterError::Unreadable(msg) => write!(f, "Failed to read parameters: {msg}"),
            ParameterError::InvalidFormat(msg) => write!(f, "Invalid parameter format: {msg}"),
            ParameterError::InvalidValue { key, reason } => {
                write!(f, "Invalid value for '{key}': {reason}")
            }
            ParameterError::SerializeFailed(msg) => write!(f, "Failed to serialize: {msg}"),
            ParameterError::SaveFailed(msg) => write!(f, "Failed to save: {msg}"),
        }
    }
}

impl std::error::Error for ParameterError {}
