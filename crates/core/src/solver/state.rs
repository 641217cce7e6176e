//! Simulation state record
//!
//! `SimulationState` exclusively owns every grid, the parameters and the
//! random generator. Each stage borrows exactly the parts it reads or
//! writes; no stage keeps state of its own.

use super::equilibrium::equilibrium_or_fallback;
use super::fields::{ChannelField, ConcentrationField};
use super::flux::{step_flux, DiffusionScratch, FluxInputs, FluxOutputs, FluxParams};
use super::gating::{step_gating, GatingMode, GatingRates, GatingSummary};
use super::structure::{generate_structure, CellStructure, ClusterSettings};
use crate::config::{ModelParameters, StructureParameters};
use rand::rngs::StdRng;
use tracing::info;

/// The five concentration fields advanced by the flux integrator
#[derive(Debug, Clone, PartialEq)]
pub struct Concentrations {
    /// Free cytoplasmic calcium
    pub calcium: ConcentrationField,
    /// ER luminal calcium
    pub er_calcium: ConcentrationField,
    /// Mitochondrial matrix calcium
    pub mito_calcium: ConcentrationField,
    /// Cytoplasmic IP3
    pub ip3: ConcentrationField,
    /// Calcium-bound buffer
    pub buffer_bound: ConcentrationField,
}

impl Concentrations {
    /// Spatially uniform resting state
    ///
    /// Calcium sits at `equilibrium`, the buffer is in binding equilibrium
    /// with it, IP3 is zero and the stores hold their initial loads.
    #[must_use]
    pub fn resting(params: &ModelParameters, equilibrium: f64) -> Self {
        let size = params.grid_size;
        let bound_denominator = equilibrium + params.buffer_kd;
        let bound = if bound_denominator > 0.0 {
            params.buffer_total * equilibrium / bound_denominator
        } else {
            0.0
        };
        Self {
            calcium: ConcentrationField::with_value(size, equilibrium),
            er_calcium: ConcentrationField::with_value(size, params.er_calcium_init),
            mito_calcium: ConcentrationField::with_value(size, params.mito_calcium_init),
            ip3: ConcentrationField::new(size),
            buffer_bound: ConcentrationField::with_value(size, bound),
        }
    }

    /// Grid edge length
    #[must_use]
    pub fn size(&self) -> usize {
        self.calcium.size
    }
}

/// Everything that changes during a run
#[derive(Debug, Clone)]
pub struct SimulationState {
    /// Model parameters in force
    pub params: ModelParameters,
    /// Structural constants
    pub geometry: StructureParameters,
    /// How IP3R transitions are sampled
    pub gating_mode: GatingMode,
    /// Organelle masks and cluster map
    pub structure: CellStructure,
    /// Concentration fields
    pub fields: Concentrations,
    /// Open channels per site
    pub ip3r_open: ChannelField,
    /// Resting calcium computed at the last reset
    pub equilibrium_calcium: f64,
    /// True if the last reset had to use the equilibrium fallback
    pub equilibrium_fallback: bool,

    // Ping-pong buffers: the integrator writes here, then the two swap
    back: Concentrations,
    ca_diffusion: Vec<f64>,
    ip3_diffusion: Vec<f64>,

    rng: StdRng,
}

impl SimulationState {
    /// Build a state, generate its structure and reset its fields
    ///
    /// `params` must already be validated.
    #[must_use]
    pub fn new(params: ModelParameters, geometry: StructureParameters, rng: StdRng) -> Self {
        let size = params.grid_size;
        let (equilibrium, fallback) =
            equilibrium_or_fallback(params.leak_rate, params.serca_rate, params.serca_k);
        let fields = Concentrations::resting(&params, equilibrium);

        let mut state = Self {
            structure: CellStructure::empty(size),
            back: fields.clone(),
            fields,
            ip3r_open: ChannelField::new(size),
            equilibrium_calcium: equilibrium,
            equilibrium_fallback: fallback,
            ca_diffusion: vec![0.0; size * size],
            ip3_diffusion: vec![0.0; size * size],
            params,
            geometry,
            gating_mode: GatingMode::default(),
            rng,
        };
        state.regenerate_structure();
        state
    }

    /// Grid edge length
    #[must_use]
    pub fn size(&self) -> usize {
        self.params.grid_size
    }

    /// Rebuild masks and cluster map from the current parameters
    ///
    /// Open channels are closed because the old counts refer to clusters
    /// that no longer exist. If the grid size changed the fields are reset
    /// too. Concentrations are otherwise left alone.
    pub fn regenerate_structure(&mut self) {
        let size = self.size();
        self.structure = generate_structure(
            size,
            &self.geometry,
            ClusterSettings {
                density: self.params.ip3r_cluster_density,
                mean_channels: self.params.ip3r_per_cluster,
            },
            &mut self.rng,
        );
        self.ip3r_open = ChannelField::new(size);

        info!(
            "Cell structure regenerated: {}x{} grid, {} ER sites, {} mitochondrial sites, {} IP3R clusters ({} channels)",
            size,
            size,
            self.structure.er.count_set(),
            self.structure.mitochondria.count_set(),
            self.structure.cluster_sites(),
            self.structure.ip3r_clusters.total()
        );

        if self.fields.size() != size {
            self.reset_fields();
        }
    }

    /// Recompute the equilibrium and return every concentration and gating
    /// field to its uniform initial value; structure is untouched
    pub fn reset_fields(&mut self) {
        let size = self.size();
        let (equilibrium, fallback) = equilibrium_or_fallback(
            self.params.leak_rate,
            self.params.serca_rate,
            self.params.serca_k,
        );
        self.equilibrium_calcium = equilibrium;
        self.equilibrium_fallback = fallback;

        self.fields = Concentrations::resting(&self.params, equilibrium);
        self.back = self.fields.clone();
        self.ca_diffusion = vec![0.0; size * size];
        self.ip3_diffusion = vec![0.0; size * size];
        self.ip3r_open = ChannelField::new(size);

        info!(
            "Fields reset: resting calcium {:.6e}, ER {}, mitochondria {}",
            equilibrium, self.params.er_calcium_init, self.params.mito_calcium_init
        );
    }

    /// Advance gating then fluxes by one timestep
    ///
    /// Gating sees the calcium and IP3 left by the previous step; the flux
    /// integrator sees the updated open counts and the unmodified
    /// concentrations, then the new concentrations are swapped in.
    pub fn advance(&mut self) -> GatingSummary {
        let summary = step_gating(
            &mut self.ip3r_open,
            &self.structure.ip3r_clusters,
            self.fields.calcium.as_slice(),
            self.fields.ip3.as_slice(),
            GatingRates {
                open_rate: self.params.ip3r_open_rate,
                close_rate: self.params.ip3r_close_rate,
            },
            self.gating_mode,
            &mut self.rng,
        );

        let params = FluxParams::from(&self.params);
        let inputs = FluxInputs {
            size: self.size(),
            calcium: self.fields.calcium.as_slice(),
            er_calcium: self.fields.er_calcium.as_slice(),
            mito_calcium: self.fields.mito_calcium.as_slice(),
            ip3: self.fields.ip3.as_slice(),
            buffer_bound: self.fields.buffer_bound.as_slice(),
            open_channels: self.ip3r_open.as_slice(),
            er: self.structure.er.as_slice(),
            mitochondria: self.structure.mitochondria.as_slice(),
            plasma_membrane: self.structure.plasma_membrane.as_slice(),
        };
        let outputs = FluxOutputs {
            calcium: self.back.calcium.as_mut_slice(),
            er_calcium: self.back.er_calcium.as_mut_slice(),
            mito_calcium: self.back.mito_calcium.as_mut_slice(),
            ip3: self.back.ip3.as_mut_slice(),
            buffer_bound: self.back.buffer_bound.as_mut_slice(),
        };
        let scratch = DiffusionScratch {
            calcium: &mut self.ca_diffusion,
            ip3: &mut self.ip3_diffusion,
        };
        step_flux(&inputs, outputs, scratch, &params);

        std::mem::swap(&mut self.fields, &mut self.back);
        summary
    }
}
