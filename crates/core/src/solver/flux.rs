//! Calcium and IP3 flux integration
//!
//! One explicit Euler step of the coupled reaction-diffusion system:
//! ```text
//! dCa/dt    = J_ip3r + J_leak − J_serca + D_ca∇²Ca − J_pmca − J_mcu − J_buf
//! dCa_er/dt = −(J_ip3r + J_leak − J_serca)            on ER sites
//! dCa_mt/dt = J_mcu
//! dB/dt     = J_buf
//! dIP3/dt   = D_ip3∇²IP3 − k_deg·IP3
//! ```
//! with
//! ```text
//! J_ip3r = 5 · open · (Ca_er − Ca) · ER
//! J_leak = leak · (Ca_er − Ca) · ER
//! J_serca = serca · Ca² / (Ca² + K²) · ER
//! J_pmca = pmca · Ca · PM
//! J_mcu  = mcu · (Ca − Ca_mt) · MITO
//! J_buf  = kon · (Ca · (B_tot − B) − Kd · B)
//! ```
//! Every flux is evaluated from the pre-step snapshot and written to
//! separate output buffers, so rows can be processed in parallel without
//! any stage seeing a partially updated field. All outputs are clamped to
//! their physiological bounds at the end of every step; this clamp is the
//! only thing keeping the explicit scheme bounded.

use super::diffusion::diffusion_rate;
use crate::config::{FieldBounds, ModelParameters};
use rayon::prelude::*;

/// Release flux per open channel per unit gradient
pub const IP3R_CHANNEL_FLUX: f64 = 5.0;

/// Rate constants and step size for one integration step
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct FluxParams {
    /// Timestep (s)
    pub dt: f64,
    /// Cell width
    pub dx: f64,
    /// Calcium diffusion coefficient
    pub d_ca: f64,
    /// IP3 diffusion coefficient
    pub d_ip3: f64,
    /// ER leak rate
    pub leak_rate: f64,
    /// SERCA maximal rate
    pub serca_rate: f64,
    /// SERCA half-activation constant
    pub serca_k: f64,
    /// IP3 degradation rate
    pub ip3_degradation_rate: f64,
    /// PMCA rate
    pub pmca_rate: f64,
    /// MCU rate
    pub mcu_rate: f64,
    /// Total buffer
    pub buffer_total: f64,
    /// Buffer dissociation constant
    pub buffer_kd: f64,
    /// Buffer binding rate
    pub buffer_kon: f64,
    /// Clamp ceilings
    pub bounds: FieldBounds,
}

impl From<&ModelParameters> for FluxParams {
    fn from(p: &ModelParameters) -> Self {
        Self {
            dt: p.dt,
            dx: p.dx,
            d_ca: p.d_ca,
            d_ip3: p.d_ip3,
            leak_rate: p.leak_rate,
            serca_rate: p.serca_rate,
            serca_k: p.serca_k,
            ip3_degradation_rate: p.ip3_degradation_rate,
            pmca_rate: p.pmca_rate,
            mcu_rate: p.mcu_rate,
            buffer_total: p.buffer_total,
            buffer_kd: p.buffer_kd,
            buffer_kon: p.buffer_kon,
            bounds: p.bounds(),
        }
    }
}

/// Read-only view of the state at the start of the step
///
/// `open` must already hold this step's gating result.
#[derive(Debug, Clone, Copy)]
pub struct FluxInputs<'a> {
    /// Grid edge length
    pub size: usize,
    /// Cytoplasmic calcium
    pub calcium: &'a [f64],
    /// ER calcium
    pub er_calcium: &'a [f64],
    /// Mitochondrial calcium
    pub mito_calcium: &'a [f64],
    /// IP3
    pub ip3: &'a [f64],
    /// Bound buffer
    pub buffer_bound: &'a [f64],
    /// Open IP3R channels
    pub open_channels: &'a [u32],
    /// ER mask
    pub er: &'a [u8],
    /// Mitochondria mask
    pub mitochondria: &'a [u8],
    /// Plasma membrane mask
    pub plasma_membrane: &'a [u8],
}

/// Output buffers for the post-step state
#[derive(Debug)]
pub struct FluxOutputs<'a> {
    /// Cytoplasmic calcium
    pub calcium: &'a mut [f64],
    /// ER calcium
    pub er_calcium: &'a mut [f64],
    /// Mitochondrial calcium
    pub mito_calcium: &'a mut [f64],
    /// IP3
    pub ip3: &'a mut [f64],
    /// Bound buffer
    pub buffer_bound: &'a mut [f64],
}

/// Scratch space for the two diffusion terms
#[derive(Debug)]
pub struct DiffusionScratch<'a> {
    /// `D_ca∇²Ca`
    pub calcium: &'a mut [f64],
    /// `D_ip3∇²IP3`
    pub ip3: &'a mut [f64],
}

/// Reaction fluxes at one site, all as positive magnitudes
#[derive(Debug, Clone, Copy, Default, PartialEq)]
pub struct CellFluxes {
    /// IP3R release into the cytoplasm
    pub release: f64,
    /// Passive ER leak into the cytoplasm
    pub leak: f64,
    /// SERCA uptake out of the cytoplasm
    pub serca: f64,
    /// PMCA extrusion out of the cell
    pub pmca: f64,
    /// MCU transfer into mitochondria
    pub mcu: f64,
    /// Net buffer binding
    pub buffer: f64,
}

impl CellFluxes {
    /// Net exchange with the ER as seen by the cytoplasm
    #[inline]
    #[must_use]
    pub fn er_exchange(&self) -> f64 {
        self.release + self.leak - self.serca
    }
}

/// Evaluate every reaction flux at site `idx`
#[inline]
#[must_use]
pub fn cell_fluxes(inputs: &FluxInputs<'_>, idx: usize, params: &FluxParams) -> CellFluxes {
    let ca = inputs.calcium[idx];
    let er_ca = inputs.er_calcium[idx];
    let er = f64::from(inputs.er[idx]);
    let mito = f64::from(inputs.mitochondria[idx]);
    let pm = f64::from(inputs.plasma_membrane[idx]);
    let bound = inputs.buffer_bound[idx];

    let gradient = er_ca - ca;
    let ca_sq = ca * ca;
    let k_sq = params.serca_k * params.serca_k;
    let serca_saturation = if ca_sq + k_sq > 0.0 {
        ca_sq / (ca_sq + k_sq)
    } else {
        0.0
    };
    let free_buffer = params.buffer_total - bound;

    CellFluxes {
        release: IP3R_CHANNEL_FLUX * f64::from(inputs.open_channels[idx]) * gradient * er,
        leak: params.leak_rate * gradient * er,
        serca: params.serca_rate * serca_saturation * er,
        pmca: params.pmca_rate * ca * pm,
        mcu: params.mcu_rate * (ca - inputs.mito_calcium[idx]) * mito,
        buffer: params.buffer_kon * (ca * free_buffer - params.buffer_kd * bound),
    }
}

/// Advance every concentration field by one step of `params.dt`
///
/// Reads only `inputs`, writes only `outputs` and `scratch`.
pub fn step_flux(
    inputs: &FluxInputs<'_>,
    outputs: FluxOutputs<'_>,
    scratch: DiffusionScratch<'_>,
    params: &FluxParams,
) {
    let size = inputs.size;
    let dt = params.dt;
    let bounds = params.bounds;

    diffusion_rate(inputs.calcium, scratch.calcium, size, params.d_ca, params.dx);
    diffusion_rate(inputs.ip3, scratch.ip3, size, params.d_ip3, params.dx);
    let ca_diffusion: &[f64] = scratch.calcium;
    let ip3_diffusion: &[f64] = scratch.ip3;

    outputs
        .calcium
        .par_chunks_mut(size)
        .zip(outputs.er_calcium.par_chunks_mut(size))
        .zip(outputs.mito_calcium.par_chunks_mut(size))
        .zip(outputs.buffer_bound.par_chunks_mut(size))
        .enumerate()
        .for_each(|(row, (((ca_row, er_row), mito_row), bound_row))| {
            for col in 0..size {
                let idx = row * size + col;
                let j = cell_fluxes(inputs, idx, params);
                let er_mask = f64::from(inputs.er[idx]);

                let dca = j.er_exchange() + ca_diffusion[idx] - j.pmca - j.mcu - j.buffer;

                ca_row[col] = (inputs.calcium[idx] + dca * dt).clamp(0.0, bounds.calcium_max);
                er_row[col] = (inputs.er_calcium[idx] - j.er_exchange() * dt * er_mask)
                    .clamp(0.0, bounds.er_calcium_max);
                mito_row[col] = (inputs.mito_calcium[idx] + j.mcu * dt)
                    .clamp(0.0, bounds.mito_calcium_max);
                bound_row[col] = (inputs.buffer_bound[idx] + j.buffer * dt)
                    .clamp(0.0, bounds.buffer_max.max(0.0));
            }
        });

    outputs
        .ip3
        .par_chunks_mut(size)
        .enumerate()
        .for_each(|(row, ip3_row)| {
            for col in 0..size {
                let idx = row * size + col;
                let ip3 = inputs.ip3[idx];
                let dip3 = ip3_diffusion[idx] - params.ip3_degradation_rate * ip3;
                ip3_row[col] = (ip3 + dip3 * dt).clamp(0.0, bounds.ip3_max);
            }
        });
}
