//! Named cell states
//!
//! A cell state is a complete parameter set under a human-readable name.
//! Three built-in states differ only in their ER store loading.

use super::parameters::{ModelParameters, ParameterError};
use super::persistence::save_parameters;
use rustc_hash::FxHashMap;
use std::path::{Path, PathBuf};
use tracing::info;

/// Built-in cell states
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum CellState {
    /// Reference parameters
    Default,
    /// ER store loaded to twice the reference level
    HighCalcium,
    /// ER store loaded to half the reference level
    LowCalcium,
}

impl CellState {
    /// All built-in states
    pub const ALL: [CellState; 3] = [
        CellState::Default,
        CellState::HighCalcium,
        CellState::LowCalcium,
    ];

    /// Display name used as the library key
    #[must_use]
    pub const fn name(&self) -> &'static str {
        match self {
            Self::Default => "Default",
            Self::HighCalcium => "High Calcium",
            Self::LowCalcium => "Low Calcium",
        }
    }

    /// File name used when writing the state to disk
    #[must_use]
    pub const fn file_name(&self) -> &'static str {
        match self {
            Self::Default => "default_state.json",
            Self::HighCalcium => "high_calcium_state.json",
            Self::LowCalcium => "low_calcium_state.json",
        }
    }

    /// Parameters of this state derived from `base`
    #[must_use]
    pub fn apply_to(&self, base: &ModelParameters) -> ModelParameters {
        let mut params = base.clone();
        match self {
            Self::Default => {}
            Self::HighCalcium => params.er_calcium_init *= 2.0,
            Self::LowCalcium => params.er_calcium_init /= 2.0,
        }
        params
    }

    /// Parameters of this state derived from the defaults
    #[must_use]
    pub fn parameters(&self) -> ModelParameters {
        self.apply_to(&ModelParameters::default())
    }
}

/// In-memory collection of named parameter sets
#[derive(Debug, Clone)]
pub struct CellStateLibrary {
    states: FxHashMap<String, ModelParameters>,
}

impl Default for CellStateLibrary {
    fn default() -> Self {
        Self::with_builtin(&ModelParameters::default())
    }
}

impl CellStateLibrary {
    /// Library holding the built-in states derived from `base`
    #[must_use]
    pub fn with_builtin(base: &ModelParameters) -> Self {
        let states = CellState::ALL
            .iter()
            .map(|state| (state.name().to_string(), state.apply_to(base)))
            .collect();
        Self { states }
    }

    /// Add or replace a named state, returning the previous one
    pub fn insert(
        &mut self,
        name: impl Into<String>,
        params: ModelParameters,
    ) -> Option<ModelParameters> {
        self.states.insert(name.into(), params)
    }

    /// Remove a named state
    pub fn remove(&mut self, name: &str) -> Option<ModelParameters> {
        self.states.remove(name)
    }

    /// Look up a named state
    #[must_use]
    pub fn get(&self, name: &str) -> Option<&ModelParameters> {
        self.states.get(name)
    }

    /// Sorted state names
    #[must_use]
    pub fn names(&self) -> Vec<&str> {
        let mut names: Vec<&str> = self.states.keys().map(String::as_str).collect();
        names.sort_unstable();
        names
    }

    /// Number of stored states
    #[must_use]
    pub fn len(&self) -> usize {
        self.states.len()
    }

    /// True when no states are stored
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.states.is_empty()
    }

    /// Write each built-in state still present in the library whose file
    /// does not exist yet into `dir`
    ///
    /// Returns the paths written.
    ///
    /// # Errors
    /// Returns the first save failure
    pub fn write_missing_builtin(&self, dir: &Path) -> Result<Vec<PathBuf>, ParameterError> {
        let mut written = Vec::new();
        for state in CellState::ALL {
            let Some(params) = self.states.get(state.name()) else {
                continue;
            };
            let path = dir.join(state.file_name());
            if path.exists() {
                continue;
            }
            save_parameters(params, &path)?;
            written.push(path);
        }
        if !written.is_empty() {
            info!("Wrote {} default cell state file(s) to {}", written.len(), dir.display());
        }
        Ok(written)
    }
}
