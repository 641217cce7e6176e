//! Reaction-diffusion-gating solver
//!
//! The solver is split into stateless stages that operate on a shared,
//! exclusively owned [`SimulationState`]:
//!
//! 1. [`equilibrium`] - resting calcium from the leak/SERCA balance
//! 2. [`structure`] - ER, mitochondria, plasma membrane and IP3R clusters
//! 3. [`gating`] - stochastic IP3R open/close transitions
//! 4. [`flux`] - release, pumps, buffering and diffusion, one Euler step
//! 5. [`stimulus`] - IP3 uncaging
//!
//! Per step, gating runs first against the previous step's calcium and IP3,
//! then the flux integrator reads the updated gating state and the untouched
//! concentrations and writes a fresh set of fields.

mod diffusion;
pub mod equilibrium;
mod fields;
pub mod flux;
pub mod gating;
mod state;
pub mod stimulus;
pub mod structure;

pub use diffusion::{diffusion_rate, DIFFUSION_KERNEL};
pub use equilibrium::{calcium_equilibrium, EquilibriumError, EQUILIBRIUM_FALLBACK};
pub use fields::{ChannelField, ConcentrationField, FieldData, StructureMask};
pub use flux::{CellFluxes, FluxParams, IP3R_CHANNEL_FLUX};
pub use gating::{GatingMode, GatingSummary, GATING_CALCIUM_CAP};
pub use state::{Concentrations, SimulationState};
pub use stimulus::{StimulusError, UncagingPulse, UncagingRegion};
pub use structure::CellStructure;
