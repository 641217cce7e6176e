//! Discrete Laplacian for calcium and IP3 diffusion
//!
//! Uses a fixed isotropic 9-point stencil:
//! ```text
//! 0.05  0.2  0.05
//! 0.2  -1.0  0.2
//! 0.05  0.2  0.05
//! ```
//! The weights sum to zero, so a uniform field has no diffusive flux.
//! Off-grid neighbours take the value of the nearest edge cell (reflect
//! boundary), which keeps the cell boundary closed to diffusion.

use rayon::prelude::*;

/// 3×3 diffusion stencil, indexed `[d_row + 1][d_col + 1]`
pub const DIFFUSION_KERNEL: [[f64; 3]; 3] = [
    [0.05, 0.2, 0.05],
    [0.2, -1.0, 0.2],
    [0.05, 0.2, 0.05],
];

/// Neighbour index with the edge cell repeated past the boundary
#[inline]
fn reflect(i: usize, delta: isize, size: usize) -> usize {
    match delta {
        -1 => i.saturating_sub(1),
        1 => (i + 1).min(size - 1),
        _ => i,
    }
}

/// Stencil response at one site (unscaled)
#[inline]
#[must_use]
pub fn stencil_at(field: &[f64], size: usize, row: usize, col: usize) -> f64 {
    let mut acc = 0.0;
    for (kr, weights) in DIFFUSION_KERNEL.iter().enumerate() {
        let r = reflect(row, kr as isize - 1, size);
        for (kc, &w) in weights.iter().enumerate() {
            let c = reflect(col, kc as isize - 1, size);
            acc += w * field[r * size + c];
        }
    }
    acc
}

/// Diffusive rate of change `D · ∇²u / dx²` for every site
///
/// # Arguments
///
/// * `field` - Input field, row-major `size×size`
/// * `out` - Output rates, same layout
/// * `size` - Grid edge length
/// * `coefficient` - Diffusion coefficient `D`
/// * `dx` - Cell width
pub fn diffusion_rate(field: &[f64], out: &mut [f64], size: usize, coefficient: f64, dx: f64) {
    let scale = coefficient / (dx * dx);
    out.par_chunks_mut(size)
        .enumerate()
        .for_each(|(row, out_row)| {
            for (col, rate) in out_row.iter_mut().enumerate() {
                *rate = scale * stencil_at(field, size, row, col);
            }
        });
}
