use crate::solver::SimulationState;
use serde::Serialize;

/// Snapshot of the aggregate state of a run
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct SimulationStats {
    /// Simulated time since the last reset (s)
    pub simulation_time: f64,
    /// Steps since the last reset
    pub step_count: u64,
    /// Mean cytoplasmic calcium over the whole grid
    pub mean_calcium: f64,
    /// Peak cytoplasmic calcium
    pub max_calcium: f64,
    /// Mean ER calcium over ER sites
    pub mean_er_calcium: f64,
    /// Mean mitochondrial calcium over mitochondrial sites
    pub mean_mito_calcium: f64,
    /// Mean IP3 over the whole grid
    pub mean_ip3: f64,
    /// Open IP3R channels
    pub open_channels: u64,
    /// IP3R channels in all clusters
    pub total_channels: u64,
    /// Sites carrying a cluster
    pub cluster_sites: usize,
}

impl SimulationStats {
    pub(super) fn collect(state: &SimulationState, simulation_time: f64, step_count: u64) -> Self {
        let fields = &state.fields;
        let structure = &state.structure;
        Self {
            simulation_time,
            step_count,
            mean_calcium: fields.calcium.mean(),
            max_calcium: fields.calcium.min_max().1,
            mean_er_calcium: fields.er_calcium.masked_mean(&structure.er),
            mean_mito_calcium: fields.mito_calcium.masked_mean(&structure.mitochondria),
            mean_ip3: fields.ip3.mean(),
            open_channels: state.ip3r_open.total(),
            total_channels: structure.ip3r_clusters.total(),
            cluster_sites: structure.cluster_sites(),
        }
    }

    /// Fraction of clustered channels currently open, `0.0` without channels
    pub fn open_fraction(&self) -> f64 {
        if self.total_channels == 0 {
            0.0
        } else {
            self.open_channels as f64 / self.total_channels as f64
        }
    }
}
