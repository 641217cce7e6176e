//! Calcium Signalling Simulation Core Library
//!
//! Simulates intracellular calcium dynamics on a 2D cell cross-section.
//! Cytoplasmic calcium diffuses and exchanges with an ER store gated by
//! stochastic IP3 receptor clusters, while mitochondria, the plasma membrane
//! pump and a fast buffer act as sinks.
//!
//! ## Layout
//!
//! - [`config`] - model parameters, validation, JSON persistence and presets
//! - [`solver`] - equilibrium, cell structure, gating, flux and stimulus stages
//! - [`simulation`] - the [`CalciumSimulation`] driver exposing the
//!   operations a front end needs
//!
//! The library emits `tracing` events but never installs a subscriber.

pub mod config;
pub mod simulation;
pub mod solver;

// Re-export configuration types
pub use config::{
    CellState, CellStateLibrary, FieldBounds, ModelParameters, ParameterError,
    StructureParameters,
};

// Re-export the driver
pub use simulation::{CalciumSimulation, SimulationStats};

// Re-export solver types needed by callers
pub use solver::{
    ChannelField, ConcentrationField, FieldData, GatingMode, StimulusError, StructureMask,
    UncagingPulse, UncagingRegion,
};
