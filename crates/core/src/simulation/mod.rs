//! Calcium signalling simulation driver
//!
//! [`CalciumSimulation`] is the surface a front end or persistence layer
//! talks to. It validates requests, keeps the simulation clock and the list
//! of running uncaging pulses, and delegates the numerics to
//! [`SimulationState`].

mod stats;

pub use stats::SimulationStats;

use crate::config::{self, ModelParameters, ParameterError, StructureParameters};
use crate::solver::stimulus::{apply_global_uncaging, apply_local_uncaging};
use crate::solver::{
    ChannelField, ConcentrationField, GatingMode, SimulationState, StimulusError, StructureMask,
    UncagingPulse, UncagingRegion,
};
use rand::rngs::StdRng;
use rand::SeedableRng;
use std::path::Path;
use tracing::{debug, info};

/// Calcium signalling simulation on a square cell cross-section
///
/// # Example
///
/// ```rust
/// use calcium_sim_core::{CalciumSimulation, ModelParameters};
///
/// let params = ModelParameters { grid_size: 32, ..Default::default() };
/// let mut sim = CalciumSimulation::with_seed(params, 7).unwrap();
/// sim.inject_ip3_local(16.0, 16.0, 4.0, 1.0, 0.5).unwrap();
/// sim.step();
/// assert_eq!(sim.step_count(), 1);
/// ```
#[derive(Debug, Clone)]
pub struct CalciumSimulation {
    state: SimulationState,
    pulses: Vec<UncagingPulse>,
    seed: u64,
    simulation_time: f64,
    step_count: u64,
}

impl CalciumSimulation {
    /// Create a simulation seeded from entropy
    ///
    /// # Errors
    /// Returns `ParameterError::InvalidValue` if `params` fails validation
    pub fn new(params: ModelParameters) -> Result<Self, ParameterError> {
        Self::with_seed(params, rand::random::<u64>())
    }

    /// Create a reproducible simulation from a fixed seed
    ///
    /// # Errors
    /// Returns `ParameterError::InvalidValue` if `params` fails validation
    pub fn with_seed(params: ModelParameters, seed: u64) -> Result<Self, ParameterError> {
        Self::with_structure(params, StructureParameters::default(), seed)
    }

    /// Create a simulation with custom structure constants
    ///
    /// # Errors
    /// Returns `ParameterError::InvalidValue` if `params` fails validation
    pub fn with_structure(
        params: ModelParameters,
        geometry: StructureParameters,
        seed: u64,
    ) -> Result<Self, ParameterError> {
        params.validate()?;
        info!(
            "Creating calcium simulation: {}x{} grid, dx={}, dt={}, seed={}",
            params.grid_size, params.grid_size, params.dx, params.dt, seed
        );
        let state = SimulationState::new(params, geometry, StdRng::seed_from_u64(seed));
        Ok(Self {
            state,
            pulses: Vec::new(),
            seed,
            simulation_time: 0.0,
            step_count: 0,
        })
    }

    /// Replace every parameter, regenerate the structure and reset
    ///
    /// # Errors
    /// Returns `ParameterError::InvalidValue` and leaves the simulation
    /// untouched if `params` fails validation
    pub fn configure(&mut self, params: ModelParameters) -> Result<(), ParameterError> {
        params.validate()?;
        info!("Reconfiguring simulation");
        self.state.params = params;
        self.state.regenerate_structure();
        self.reset();
        Ok(())
    }

    /// Return all concentration and gating fields to their initial values
    ///
    /// Structure, parameters and the random stream are kept; the clock and
    /// any running pulses are cleared.
    pub fn reset(&mut self) {
        self.state.reset_fields();
        self.pulses.clear();
        self.simulation_time = 0.0;
        self.step_count = 0;
    }

    /// Rebuild masks and cluster map; open channels are closed
    pub fn regenerate_structure(&mut self) {
        self.state.regenerate_structure();
    }

    /// Advance by one timestep
    ///
    /// Gating, then fluxes, then one step of every running uncaging pulse.
    pub fn step(&mut self) {
        let summary = self.state.advance();

        let dt = self.state.params.dt;
        let ip3_max = self.state.params.bounds().ip3_max;
        for pulse in &mut self.pulses {
            pulse.apply(&mut self.state.fields.ip3, dt, ip3_max);
        }
        self.pulses.retain(UncagingPulse::is_active);

        self.simulation_time += dt;
        self.step_count += 1;

        debug!(
            "Step {}: t={:.4}s, {} channels opened, {} closed, {} pulse(s) active",
            self.step_count,
            self.simulation_time,
            summary.opened,
            summary.closed,
            self.pulses.len()
        );
    }

    /// Run `steps` timesteps
    pub fn run(&mut self, steps: usize) {
        for _ in 0..steps {
            self.step();
        }
    }

    /// Apply one timestep of global IP3 uncaging now
    ///
    /// # Errors
    /// Rejects invalid amount or duration without touching the IP3 field
    pub fn inject_ip3_global(&mut self, amount: f64, duration: f64) -> Result<(), StimulusError> {
        let params = &self.state.params;
        apply_global_uncaging(
            &mut self.state.fields.ip3,
            amount,
            duration,
            params.dt,
            params.bounds().ip3_max,
        )
    }

    /// Apply one timestep of IP3 uncaging inside a disk now
    ///
    /// `x` is the column and `y` the row of the centre, `radius` in cells.
    ///
    /// # Errors
    /// Rejects invalid geometry, amount or duration without touching the
    /// IP3 field
    pub fn inject_ip3_local(
        &mut self,
        x: f64,
        y: f64,
        radius: f64,
        amount: f64,
        duration: f64,
    ) -> Result<(), StimulusError> {
        let params = &self.state.params;
        apply_local_uncaging(
            &mut self.state.fields.ip3,
            x,
            y,
            radius,
            amount,
            duration,
            params.dt,
            params.bounds().ip3_max,
        )
    }

    /// Release `amount` of IP3 everywhere over the next `duration` seconds
    ///
    /// # Errors
    /// Rejects invalid amount or duration
    pub fn schedule_global_uncaging(
        &mut self,
        amount: f64,
        duration: f64,
    ) -> Result<(), StimulusError> {
        let pulse = UncagingPulse::new(UncagingRegion::Global, amount, duration)?;
        info!("Global uncaging scheduled: {} over {}s", amount, duration);
        self.pulses.push(pulse);
        Ok(())
    }

    /// Release `amount` of IP3 inside a disk over the next `duration` seconds
    ///
    /// # Errors
    /// Rejects invalid geometry, amount or duration
    pub fn schedule_local_uncaging(
        &mut self,
        x: f64,
        y: f64,
        radius: f64,
        amount: f64,
        duration: f64,
    ) -> Result<(), StimulusError> {
        let pulse = UncagingPulse::new(UncagingRegion::Disk { x, y, radius }, amount, duration)?;
        info!(
            "Local uncaging scheduled at ({}, {}) r={}: {} over {}s",
            x, y, radius, amount, duration
        );
        self.pulses.push(pulse);
        Ok(())
    }

    /// Update the buffer constants and reset
    ///
    /// # Errors
    /// Returns `ParameterError::InvalidValue` and leaves the simulation
    /// untouched if a value is out of range
    pub fn set_buffer_conditions(
        &mut self,
        total: f64,
        kd: f64,
        kon: f64,
    ) -> Result<(), ParameterError> {
        let params = ModelParameters {
            buffer_total: total,
            buffer_kd: kd,
            buffer_kon: kon,
            ..self.state.params.clone()
        };
        params.validate()?;
        info!("Buffer conditions: total={}, kd={}, kon={}", total, kd, kon);
        self.state.params = params;
        self.reset();
        Ok(())
    }

    /// Select how channel transitions are sampled
    pub fn set_gating_mode(&mut self, mode: GatingMode) {
        self.state.gating_mode = mode;
    }

    /// Merge a JSON parameter file onto the current parameters and apply it
    ///
    /// Returns the unknown keys found in the file.
    ///
    /// # Errors
    /// `SourceNotFound`, `Unreadable`, `InvalidFormat` or `InvalidValue`;
    /// the simulation is untouched on error
    pub fn load_parameters<P: AsRef<Path>>(
        &mut self,
        path: P,
    ) -> Result<Vec<String>, ParameterError> {
        let loaded = config::load_parameters(path, &self.state.params)?;
        self.configure(loaded.parameters)?;
        Ok(loaded.unknown_keys)
    }

    /// Write the current parameters as JSON
    ///
    /// # Errors
    /// Returns error if the file cannot be written
    pub fn save_parameters<P: AsRef<Path>>(&self, path: P) -> Result<(), ParameterError> {
        config::save_parameters(&self.state.params, path)
    }

    /// Summary statistics of the current state
    pub fn stats(&self) -> SimulationStats {
        SimulationStats::collect(&self.state, self.simulation_time, self.step_count)
    }

    /// Parameters in force
    pub fn parameters(&self) -> &ModelParameters {
        &self.state.params
    }

    /// Structure constants in force
    pub fn structure_parameters(&self) -> &StructureParameters {
        &self.state.geometry
    }

    /// Gating sampling mode
    pub fn gating_mode(&self) -> GatingMode {
        self.state.gating_mode
    }

    /// Seed the random stream was started from
    pub fn seed(&self) -> u64 {
        self.seed
    }

    /// Simulated time since the last reset (s)
    pub fn simulation_time(&self) -> f64 {
        self.simulation_time
    }

    /// Steps since the last reset
    pub fn step_count(&self) -> u64 {
        self.step_count
    }

    /// Resting calcium computed at the last reset
    pub fn equilibrium_calcium(&self) -> f64 {
        self.state.equilibrium_calcium
    }

    /// True if the last reset fell back to the default resting calcium
    pub fn equilibrium_fallback(&self) -> bool {
        self.state.equilibrium_fallback
    }

    /// Uncaging pulses still running
    pub fn active_pulses(&self) -> &[UncagingPulse] {
        &self.pulses
    }

    /// Grid edge length
    pub fn grid_size(&self) -> usize {
        self.state.size()
    }

    /// Cytoplasmic calcium
    pub fn calcium(&self) -> &ConcentrationField {
        &self.state.fields.calcium
    }

    /// ER calcium
    pub fn er_calcium(&self) -> &ConcentrationField {
        &self.state.fields.er_calcium
    }

    /// Mitochondrial calcium
    pub fn mito_calcium(&self) -> &ConcentrationField {
        &self.state.fields.mito_calcium
    }

    /// IP3 concentration
    pub fn ip3(&self) -> &ConcentrationField {
        &self.state.fields.ip3
    }

    /// Bound buffer
    pub fn buffer_bound(&self) -> &ConcentrationField {
        &self.state.fields.buffer_bound
    }

    /// Free buffer, the complement of the bound buffer
    pub fn buffer_free(&self) -> ConcentrationField {
        let total = self.state.params.buffer_total;
        let bound = &self.state.fields.buffer_bound;
        ConcentrationField {
            data: bound.data.iter().map(|&b| (total - b).max(0.0)).collect(),
            size: bound.size,
        }
    }

    /// Open IP3R channels per site
    pub fn ip3r_open(&self) -> &ChannelField {
        &self.state.ip3r_open
    }

    /// IP3R channels per cluster site
    pub fn ip3r_clusters(&self) -> &ChannelField {
        &self.state.structure.ip3r_clusters
    }

    /// ER mask
    pub fn er_mask(&self) -> &StructureMask {
        &self.state.structure.er
    }

    /// Mitochondria mask
    pub fn mitochondria_mask(&self) -> &StructureMask {
        &self.state.structure.mitochondria
    }

    /// Plasma membrane mask
    pub fn plasma_membrane_mask(&self) -> &StructureMask {
        &self.state.structure.plasma_membrane
    }

    /// Number of ER sites
    pub fn er_site_count(&self) -> usize {
        self.state.structure.er.count_set()
    }

    /// Number of mitochondrial sites
    pub fn mitochondria_site_count(&self) -> usize {
        self.state.structure.mitochondria.count_set()
    }

    /// Number of plasma membrane sites
    pub fn plasma_membrane_site_count(&self) -> usize {
        self.state.structure.plasma_membrane.count_set()
    }
}
