//! Cell structure generation
//!
//! Builds the static layout of the cell cross-section once per
//! regeneration:
//! - ER: random straight tubules rasterized onto the grid, then thickened by
//!   cross-shaped morphological dilation
//! - Mitochondria: axis-aligned blocks at random centres
//! - Plasma membrane: the outermost ring of cells
//! - IP3R clusters: a random subset of ER sites, each with a
//!   Poisson-distributed channel count
//!
//! All randomness comes from the caller's generator in a fixed order
//! (tubules, mitochondria, cluster sites, cluster sizes), so a seeded
//! generator reproduces the same cell.

use super::fields::{ChannelField, StructureMask};
use crate::config::StructureParameters;
use rand::seq::index;
use rand::Rng;
use rand_distr::{Distribution, Poisson};
use std::f64::consts::TAU;
use tracing::{debug, warn};

/// Static organelle masks and the IP3R cluster map
#[derive(Debug, Clone, PartialEq)]
pub struct CellStructure {
    /// Endoplasmic reticulum
    pub er: StructureMask,
    /// Mitochondria
    pub mitochondria: StructureMask,
    /// Plasma membrane (grid border)
    pub plasma_membrane: StructureMask,
    /// Channels per IP3R cluster, nonzero only on ER sites
    pub ip3r_clusters: ChannelField,
}

impl CellStructure {
    /// Structure with every mask and the cluster map empty
    #[must_use]
    pub fn empty(size: usize) -> Self {
        Self {
            er: StructureMask::new(size),
            mitochondria: StructureMask::new(size),
            plasma_membrane: plasma_membrane_mask(size),
            ip3r_clusters: ChannelField::new(size),
        }
    }

    /// Number of sites hosting at least one channel
    #[must_use]
    pub fn cluster_sites(&self) -> usize {
        self.ip3r_clusters.data.iter().filter(|&&n| n > 0).count()
    }
}

/// Cluster placement settings taken from the model parameters
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct ClusterSettings {
    /// Fraction of ER sites that receive a cluster
    pub density: f64,
    /// Poisson mean of channels per cluster
    pub mean_channels: f64,
}

/// Generate a complete cell structure
pub fn generate_structure<R: Rng + ?Sized>(
    size: usize,
    geometry: &StructureParameters,
    clusters: ClusterSettings,
    rng: &mut R,
) -> CellStructure {
    let er = generate_er(size, geometry, rng);
    let mitochondria = generate_mitochondria(size, geometry, rng);
    let plasma_membrane = plasma_membrane_mask(size);
    let ip3r_clusters = place_clusters(&er, clusters, rng);

    debug!(
        "Generated structure: {} ER sites, {} mitochondrial sites, {} clusters, {} channels",
        er.count_set(),
        mitochondria.count_set(),
        ip3r_clusters.data.iter().filter(|&&n| n > 0).count(),
        ip3r_clusters.total()
    );

    CellStructure {
        er,
        mitochondria,
        plasma_membrane,
        ip3r_clusters,
    }
}

/// Rasterize random tubules and thicken them
pub fn generate_er<R: Rng + ?Sized>(
    size: usize,
    geometry: &StructureParameters,
    rng: &mut R,
) -> StructureMask {
    let mut er = StructureMask::new(size);
    let (min_len, max_len) = geometry.tubule_length;
    let max = size as i64 - 1;

    for _ in 0..geometry.tubule_count {
        let row = rng.random_range(0..size) as i64;
        let col = rng.random_range(0..size) as i64;
        let length = if max_len > min_len {
            rng.random_range(min_len..max_len)
        } else {
            min_len
        };
        let length = length as f64;
        let angle = rng.random::<f64>() * TAU;

        // Truncate toward zero; the far end may leave the grid
        let end_row = row + (length * angle.cos()) as i64;
        let end_col = col + (length * angle.sin()) as i64;

        for (r, c) in line_cells(row, col, end_row, end_col) {
            let r = r.clamp(0, max) as usize;
            let c = c.clamp(0, max) as usize;
            er.set(r, c, 1);
        }
    }

    dilate(&er, geometry.dilation_iterations)
}

/// Cells on the digital line from `(r0, c0)` to `(r1, c1)`, both ends included
///
/// Bresenham's algorithm; yields `max(|Δr|, |Δc|) + 1` cells.
pub fn line_cells(r0: i64, c0: i64, r1: i64, c1: i64) -> Vec<(i64, i64)> {
    let dr = (r1 - r0).abs();
    let dc = (c1 - c0).abs();
    let step_r = if r1 >= r0 { 1 } else { -1 };
    let step_c = if c1 >= c0 { 1 } else { -1 };

    let mut cells = Vec::with_capacity((dr.max(dc) + 1) as usize);
    let (mut r, mut c) = (r0, c0);
    let mut err = dc - dr;

    loop {
        cells.push((r, c));
        if r == r1 && c == c1 {
            break;
        }
        let e2 = 2 * err;
        if e2 > -dr {
            err -= dr;
            c += step_c;
        }
        if e2 < dc {
            err += dc;
            r += step_r;
        }
    }
    cells
}

/// Binary dilation with the 4-connected cross, repeated `iterations` times
///
/// Sites outside the grid count as unset.
#[must_use]
pub fn dilate(mask: &StructureMask, iterations: usize) -> StructureMask {
    let size = mask.size;
    let mut current = mask.clone();
    let mut next = StructureMask::new(size);

    for _ in 0..iterations {
        for row in 0..size {
            for col in 0..size {
                let hit = current.is_set(row, col)
                    || (row > 0 && current.is_set(row - 1, col))
                    || (row + 1 < size && current.is_set(row + 1, col))
                    || (col > 0 && current.is_set(row, col - 1))
                    || (col + 1 < size && current.is_set(row, col + 1));
                next.set(row, col, u8::from(hit));
            }
        }
        std::mem::swap(&mut current, &mut next);
    }
    current
}

/// Mark rectangular mitochondria; overlapping blocks merge
pub fn generate_mitochondria<R: Rng + ?Sized>(
    size: usize,
    geometry: &StructureParameters,
    rng: &mut R,
) -> StructureMask {
    let mut mito = StructureMask::new(size);
    let (half_r, half_c) = (
        geometry.mitochondria_half_rows,
        geometry.mitochondria_half_cols,
    );

    for _ in 0..geometry.mitochondria_count {
        let row = rng.random_range(0..size);
        let col = rng.random_range(0..size);
        // Half-open block [centre - half, centre + half)
        for r in row.saturating_sub(half_r)..(row + half_r).min(size) {
            for c in col.saturating_sub(half_c)..(col + half_c).min(size) {
                mito.set(r, c, 1);
            }
        }
    }
    mito
}

/// Outermost ring of rows and columns
#[must_use]
pub fn plasma_membrane_mask(size: usize) -> StructureMask {
    let mut pm = StructureMask::new(size);
    if size == 0 {
        return pm;
    }
    let last = size - 1;
    for i in 0..size {
        pm.set(0, i, 1);
        pm.set(last, i, 1);
        pm.set(i, 0, 1);
        pm.set(i, last, 1);
    }
    pm
}

/// Place IP3R clusters on a random subset of ER sites
///
/// The subset has `round(density × |ER|)` sites drawn without replacement;
/// each receives an independent Poisson channel count.
pub fn place_clusters<R: Rng + ?Sized>(
    er: &StructureMask,
    settings: ClusterSettings,
    rng: &mut R,
) -> ChannelField {
    let mut clusters = ChannelField::new(er.size);

    let er_sites: Vec<usize> = er
        .data
        .iter()
        .enumerate()
        .filter(|(_, &m)| m != 0)
        .map(|(idx, _)| idx)
        .collect();

    let wanted = (settings.density * er_sites.len() as f64).round() as usize;
    let count = wanted.min(er_sites.len());
    if count == 0 {
        return clusters;
    }

    let chosen = index::sample(rng, er_sites.len(), count);

    let poisson = if settings.mean_channels > 0.0 {
        match Poisson::new(settings.mean_channels) {
            Ok(p) => Some(p),
            Err(e) => {
                warn!(
                    "Invalid channels-per-cluster mean {}: {}; clusters left empty",
                    settings.mean_channels, e
                );
                None
            }
        }
    } else {
        None
    };

    if let Some(poisson) = poisson {
        for i in chosen {
            let n: f64 = poisson.sample(rng);
            clusters.data[er_sites[i]] = n as u32;
        }
    }

    clusters
}
