//! JSON persistence for `ModelParameters`
//!
//! Files hold a single flat object with exactly the keys of
//! [`PARAMETER_KEYS`](super::PARAMETER_KEYS). Loading merges onto an
//! existing parameter set so older or partial files still apply.

use super::parameters::{ModelParameters, ParameterError};
use serde_json::{Map, Value};
use std::fs;
use std::io::ErrorKind;
use std::path::Path;
use tracing::{info, warn};

/// Result of merging a parameter file onto a base parameter set
#[derive(Debug, Clone, PartialEq)]
pub struct LoadedParameters {
    /// Merged and validated parameters
    pub parameters: ModelParameters,
    /// Keys present in the file but not part of the schema
    pub unknown_keys: Vec<String>,
}

/// Read a parameter file into a raw key-value record
///
/// # Errors
/// `SourceNotFound` if the file is missing, `Unreadable` for other I/O
/// failures, `InvalidFormat` if the contents are not a JSON object
pub fn read_parameter_record<P: AsRef<Path>>(
    path: P,
) -> Result<Map<String, Value>, ParameterError> {
    let path = path.as_ref();
    let contents = fs::read_to_string(path).map_err(|e| match e.kind() {
        ErrorKind::NotFound => ParameterError::SourceNotFound(path.display().to_string()),
        _ => ParameterError::Unreadable(format!("{}: {e}", path.display())),
    })?;

    let value: Value = serde_json::from_str(&contents)
        .map_err(|e| ParameterError::InvalidFormat(format!("{}: {e}", path.display())))?;

    match value {
        Value::Object(map) => Ok(map),
        other => Err(ParameterError::InvalidFormat(format!(
            "{}: expected an object, found {}",
            path.display(),
            json_kind(&other)
        ))),
    }
}

/// Load a parameter file and merge it onto `base`
///
/// # Errors
/// Any read or format error from [`read_parameter_record`], or
/// `InvalidValue` if the merged set fails validation. `base` is untouched.
pub fn load_parameters<P: AsRef<Path>>(
    path: P,
    base: &ModelParameters,
) -> Result<LoadedParameters, ParameterError> {
    let path = path.as_ref();
    let record = read_parameter_record(path)?;
    let (parameters, unknown_keys) = base.merged_with(&record)?;
    parameters.validate()?;

    if !unknown_keys.is_empty() {
        warn!(
            "{} unknown parameter(s) in {}: {}",
            unknown_keys.len(),
            path.display(),
            unknown_keys.join(", ")
        );
    }
    info!("Loaded {} parameter(s) from {}", record.len(), path.display());

    Ok(LoadedParameters {
        parameters,
        unknown_keys,
    })
}

/// Write parameters as pretty-printed JSON
///
/// # Errors
/// Returns error if parameters cannot be serialized or the file written
pub fn save_parameters<P: AsRef<Path>>(
    parameters: &ModelParameters,
    path: P,
) -> Result<(), ParameterError> {
    let contents = serde_json::to_string_pretty(parameters)
        .map_err(|e| ParameterError::SerializeFailed(e.to_string()))?;

    fs::write(path.as_ref(), contents)
        .map_err(|e| ParameterError::SaveFailed(format!("{}: {e}", path.as_ref().display())))?;

    info!("Saved parameters to {}", path.as_ref().display());
    Ok(())
}

fn json_kind(value: &Value) -> &'static str {
    match value {
        Value::Null => "null",
        Value::Bool(_) => "a boolean",
        Value::Number(_) => "a number",
        Value::String(_) => "a string",
        Value::Array(_) => "an array",
        Value::Object(_) => "an object",
    }
}
