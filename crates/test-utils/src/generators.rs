//! Test data generators for synthetic simulation output.
//!
//! These generators create predictable, verifiable value patterns for grids
//! and halo records. Grids are returned flat in C order (last axis fastest),
//! matching the on-disk layout.

use crate::fixtures::SyntheticHalo;

/// Creates a 3D test grid with predictable values.
///
/// Each cell value is calculated as: `i * 10000 + j * 100 + k`
///
/// This makes it easy to verify that data is being read in the right order by
/// checking that `grid[(i, j, k)] == i * 10000 + j * 100 + k`.
///
/// # Example
///
/// ```
/// use test_utils::create_test_grid3;
///
/// let grid = create_test_grid3(2, 3, 4);
/// assert_eq!(grid.len(), 24);
/// assert_eq!(grid[1], 1.0);      // (0, 0, 1)
/// assert_eq!(grid[4], 100.0);    // (0, 1, 0)
/// assert_eq!(grid[12], 10000.0); // (1, 0, 0)
/// ```
pub fn create_test_grid3(nx: usize, ny: usize, nz: usize) -> Vec<f32> {
    let mut data = Vec::with_capacity(nx * ny * nz);
    for i in 0..nx {
        for j in 0..ny {
            for k in 0..nz {
                data.push((i * 10000 + j * 100 + k) as f32);
            }
        }
    }
    data
}

/// Creates a density-like grid (`1 + delta`, always positive).
///
/// Uses a simple hash-based approach for reproducibility; values fall in
/// `[0.01, 10.0)` with a long tail, similar to a dark matter overdensity field.
pub fn create_density_grid(nx: usize, ny: usize, nz: usize, seed: u32) -> Vec<f32> {
    let mut data = Vec::with_capacity(nx * ny * nz);
    for i in 0..nx {
        for j in 0..ny {
            for k in 0..nz {
                let hash = simple_hash(i as u32, j as u32, k as u32, seed);
                let u = (hash % 10_000) as f32 / 10_000.0;
                // Squaring skews most cells towards underdense
                data.push(0.01 + 9.99 * u * u);
            }
        }
    }
    data
}

/// Creates a velocity component grid in km/s.
///
/// The component varies sinusoidally along `axis` (0, 1 or 2) with an
/// amplitude of 300 km/s, so each velocity grid in a file is distinguishable.
pub fn create_velocity_grid(nx: usize, ny: usize, nz: usize, axis: usize) -> Vec<f32> {
    let dims = [nx, ny, nz];
    let period = dims[axis % 3].max(1) as f32;
    let mut data = Vec::with_capacity(nx * ny * nz);
    for i in 0..nx {
        for j in 0..ny {
            for k in 0..nz {
                let pos = [i, j, k][axis % 3] as f32;
                let phase = 2.0 * std::f32::consts::PI * pos / period;
                data.push(300.0 * phase.sin() + axis as f32);
            }
        }
    }
    data
}

/// Creates a deterministic halo record for position `index` in a catalog.
///
/// Every field is derived from `index` so records from different shards never
/// collide. The padding bytes are filled with a non-zero marker to catch
/// readers that misalign the record stride.
pub fn synthetic_halo(index: usize) -> SyntheticHalo {
    let x = index as f32;
    let mut eigen = [[0.0f32; 3]; 3];
    for (r, row) in eigen.iter_mut().enumerate() {
        for (c, v) in row.iter_mut().enumerate() {
            *v = x + (r * 3 + c) as f32 * 0.125;
        }
    }
    SyntheticHalo {
        id_mbp: 1_000_000_007 * index as i64 + 3,
        m_vir: 1.0e10 * (1.0 + index as f64) + 0.1,
        n_particles: 32 + index as i32,
        position_com: [x, x + 0.25, x + 0.5],
        position_mbp: [x + 0.75, x + 1.0, x + 1.25],
        velocity_com: [-x, -x - 0.5, -x - 1.0],
        velocity_mbp: [-x - 1.5, -x - 2.0, -x - 2.5],
        r_vir: 0.1 + x,
        r_halo: 0.2 + x,
        r_max: 0.3 + x,
        v_max: 100.0 + x,
        sigma_v: 50.0 + x,
        spin: [0.01 * x, 0.02 * x, 0.03 * x],
        q_triaxial: 0.8,
        s_triaxial: 0.6,
        shape_eigen_vectors: eigen,
        padding: [0xAB; 8],
    }
}

/// Simple deterministic hash for reproducible test data.
fn simple_hash(x: u32, y: u32, z: u32, seed: u32) -> u32 {
    let mut h = seed;
    h = h.wrapping_mul(31).wrapping_add(x);
    h = h.wrapping_mul(31).wrapping_add(y);
    h = h.wrapping_mul(31).wrapping_add(z);
    h ^= h >> 16;
    h = h.wrapping_mul(0x85ebca6b);
    h ^= h >> 13;
    h = h.wrapping_mul(0xc2b2ae35);
    h ^= h >> 16;
    h
}
