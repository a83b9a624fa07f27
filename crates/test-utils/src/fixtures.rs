//! Binary fixtures in the gbpCode grid and halo catalog layouts.
//!
//! The library crates are read-only; these writers exist so tests can build
//! files with known contents and check that reading them back is bit-exact.

use std::fs;
use std::io::{self, Write};
use std::path::{Path, PathBuf};

use byteorder::{LittleEndian, WriteBytesExt};

use crate::generators::synthetic_halo;

/// On-disk grid identifiers written by gbpCode.
pub mod identifiers {
    pub const DENSITY: &str = "rho_r_dark";
    pub const VX: &str = "v_x_r_dark";
    pub const VY: &str = "v_y_r_dark";
    pub const VZ: &str = "v_z_r_dark";
}

/// Width of a grid identifier field.
pub const IDENTIFIER_BYTES: usize = 32;

/// Size of one halo record including its trailing padding.
pub const HALO_RECORD_BYTES: usize = 152;

/// Encode an identifier as a 32-byte null-padded field.
///
/// Panics if `name` does not fit.
pub fn identifier_bytes(name: &str) -> [u8; IDENTIFIER_BYTES] {
    assert!(name.len() <= IDENTIFIER_BYTES, "identifier too long: {name}");
    let mut raw = [0u8; IDENTIFIER_BYTES];
    raw[..name.len()].copy_from_slice(name.as_bytes());
    raw
}

/// Builder for a grid file with any number of named grids.
#[derive(Debug, Clone)]
pub struct GridFileBuilder {
    dims: [usize; 3],
    box_size: [f64; 3],
    ma_scheme: i32,
    declared_grids: Option<i32>,
    grids: Vec<([u8; IDENTIFIER_BYTES], Vec<f32>)>,
}

impl GridFileBuilder {
    /// Start a file with the given cell counts per axis.
    pub fn new(dims: [usize; 3]) -> Self {
        Self {
            dims,
            box_size: [100.0, 100.0, 100.0],
            ma_scheme: 1,
            declared_grids: None,
            grids: Vec::new(),
        }
    }

    pub fn box_size(mut self, box_size: [f64; 3]) -> Self {
        self.box_size = box_size;
        self
    }

    pub fn ma_scheme(mut self, scheme: i32) -> Self {
        self.ma_scheme = scheme;
        self
    }

    /// Override the `n_grids` header value (defaults to the number of grids added).
    pub fn declared_grids(mut self, n: i32) -> Self {
        self.declared_grids = Some(n);
        self
    }

    /// Append a grid. Panics if `data` does not hold exactly one value per cell.
    pub fn grid(self, identifier: &str, data: Vec<f32>) -> Self {
        self.grid_raw(identifier_bytes(identifier), data)
    }

    /// Append a grid with a hand-built identifier field.
    pub fn grid_raw(mut self, identifier: [u8; IDENTIFIER_BYTES], data: Vec<f32>) -> Self {
        assert_eq!(
            data.len(),
            self.cell_count(),
            "grid data length must equal the cell count"
        );
        self.grids.push((identifier, data));
        self
    }

    pub fn cell_count(&self) -> usize {
        self.dims.iter().product()
    }

    /// Size of the fixed header in bytes.
    pub fn header_bytes() -> usize {
        3 * 4 + 3 * 8 + 4 + 4
    }

    /// Serialize the whole file.
    pub fn to_bytes(&self) -> Vec<u8> {
        let mut out = Vec::with_capacity(
            Self::header_bytes() + self.grids.len() * (IDENTIFIER_BYTES + 4 * self.cell_count()),
        );
        for &d in &self.dims {
            out.write_i32::<LittleEndian>(d as i32).unwrap();
        }
        for &b in &self.box_size {
            out.write_f64::<LittleEndian>(b).unwrap();
        }
        let n_grids = self.declared_grids.unwrap_or(self.grids.len() as i32);
        out.write_i32::<LittleEndian>(n_grids).unwrap();
        out.write_i32::<LittleEndian>(self.ma_scheme).unwrap();
        for (identifier, data) in &self.grids {
            out.extend_from_slice(identifier);
            for &v in data {
                out.write_f32::<LittleEndian>(v).unwrap();
            }
        }
        out
    }

    /// Write the file to `path`.
    pub fn write_to(&self, path: &Path) -> io::Result<()> {
        fs::write(path, self.to_bytes())
    }
}

/// Plain-field mirror of a gbpCode halo record, used to write fixtures.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct SyntheticHalo {
    pub id_mbp: i64,
    pub m_vir: f64,
    pub n_particles: i32,
    pub position_com: [f32; 3],
    pub position_mbp: [f32; 3],
    pub velocity_com: [f32; 3],
    pub velocity_mbp: [f32; 3],
    pub r_vir: f32,
    pub r_halo: f32,
    pub r_max: f32,
    pub v_max: f32,
    pub sigma_v: f32,
    pub spin: [f32; 3],
    pub q_triaxial: f32,
    pub s_triaxial: f32,
    pub shape_eigen_vectors: [[f32; 3]; 3],
    pub padding: [u8; 8],
}

impl SyntheticHalo {
    /// Encode in the little-endian, naturally aligned record layout.
    pub fn to_le_bytes(&self) -> Vec<u8> {
        let mut out = Vec::with_capacity(HALO_RECORD_BYTES);
        out.write_i64::<LittleEndian>(self.id_mbp).unwrap();
        out.write_f64::<LittleEndian>(self.m_vir).unwrap();
        out.write_i32::<LittleEndian>(self.n_particles).unwrap();
        for vector in [
            self.position_com,
            self.position_mbp,
            self.velocity_com,
            self.velocity_mbp,
        ] {
            write_f32s(&mut out, &vector);
        }
        write_f32s(
            &mut out,
            &[self.r_vir, self.r_halo, self.r_max, self.v_max, self.sigma_v],
        );
        write_f32s(&mut out, &self.spin);
        write_f32s(&mut out, &[self.q_triaxial, self.s_triaxial]);
        for row in &self.shape_eigen_vectors {
            write_f32s(&mut out, row);
        }
        out.extend_from_slice(&self.padding);
        debug_assert_eq!(out.len(), HALO_RECORD_BYTES);
        out
    }
}

fn write_f32s(out: &mut Vec<u8>, values: &[f32]) {
    for &v in values {
        out.write_f32::<LittleEndian>(v).unwrap();
    }
}

/// Serialize one catalog shard: 16-byte header followed by the records.
pub fn catalog_shard_bytes(
    file_index: i32,
    n_files: i32,
    n_halos_total: i32,
    halos: &[SyntheticHalo],
) -> Vec<u8> {
    let mut out = Vec::with_capacity(16 + halos.len() * HALO_RECORD_BYTES);
    out.write_i32::<LittleEndian>(file_index).unwrap();
    out.write_i32::<LittleEndian>(n_files).unwrap();
    out.write_i32::<LittleEndian>(halos.len() as i32).unwrap();
    out.write_i32::<LittleEndian>(n_halos_total).unwrap();
    for halo in halos {
        out.extend_from_slice(&halo.to_le_bytes());
    }
    out
}

/// File name of shard `index` for a catalog prefix, e.g. `subfind_042.catalog.3`.
pub fn shard_file_name(prefix: &str, index: usize) -> String {
    format!("{prefix}.{index}")
}

/// A catalog written to disk, with the halos each shard holds.
#[derive(Debug, Clone)]
pub struct CatalogFixture {
    /// Shard paths in shard order.
    pub paths: Vec<PathBuf>,
    /// Halos per shard, in shard order.
    pub shards: Vec<Vec<SyntheticHalo>>,
}

impl CatalogFixture {
    /// All halos in the order a correct reader returns them.
    pub fn all_halos(&self) -> Vec<SyntheticHalo> {
        self.shards.iter().flatten().copied().collect()
    }

    pub fn total(&self) -> usize {
        self.shards.iter().map(Vec::len).sum()
    }
}

/// Write one shard per entry of `counts` into `dir`, with a consistent total.
pub fn write_catalog_shards(
    dir: &Path,
    prefix: &str,
    counts: &[usize],
) -> io::Result<CatalogFixture> {
    let total = counts.iter().sum();
    write_catalog_shards_with_total(dir, prefix, counts, total)
}

/// Like [`write_catalog_shards`] but with an explicit `n_halos_total` header
/// value, for exercising mismatched catalogs.
pub fn write_catalog_shards_with_total(
    dir: &Path,
    prefix: &str,
    counts: &[usize],
    n_halos_total: usize,
) -> io::Result<CatalogFixture> {
    let mut paths = Vec::with_capacity(counts.len());
    let mut shards = Vec::with_capacity(counts.len());
    let mut next = 0usize;

    for (file_index, &count) in counts.iter().enumerate() {
        let halos: Vec<SyntheticHalo> = (next..next + count).map(synthetic_halo).collect();
        next += count;

        let path = dir.join(shard_file_name(prefix, file_index));
        let mut file = fs::File::create(&path)?;
        file.write_all(&catalog_shard_bytes(
            file_index as i32,
            counts.len() as i32,
            n_halos_total as i32,
            &halos,
        ))?;

        paths.push(path);
        shards.push(halos);
    }

    Ok(CatalogFixture { paths, shards })
}
