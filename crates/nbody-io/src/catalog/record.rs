//! Halo catalog header and record layouts.

use std::io::Read;

use byteorder::{ByteOrder, LittleEndian};
use serde::Serialize;

use crate::binary::{read_i32s, to_count};
use crate::error::Result;

/// Size of a shard header in bytes.
pub const CATALOG_HEADER_BYTES: usize = 16;

/// Size of one halo record on disk, including the 8 trailing padding bytes.
pub const HALO_RECORD_BYTES: usize = 152;

/// Per-shard header.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct CatalogHeader {
    /// Index of this shard within the catalog.
    pub file_index: i32,
    /// Number of shards the catalog was written as.
    pub n_files: i32,
    /// Halos stored in this shard.
    pub n_halos_file: usize,
    /// Halos in the whole catalog.
    pub n_halos_total: usize,
}

impl CatalogHeader {
    pub fn read_from<R: Read>(reader: &mut R) -> Result<Self> {
        let mut fields = [0i32; 4];
        read_i32s(reader, &mut fields, "catalog header")?;
        Ok(Self {
            file_index: fields[0],
            n_files: fields[1],
            n_halos_file: to_count(fields[2], "n_halos_file")?,
            n_halos_total: to_count(fields[3], "n_halos_total")?,
        })
    }
}

/// One halo from a gbpCode catalog.
///
/// Field offsets within the 152-byte record:
///
/// ```text
///   0 id_mbp         i64      68 r_vir    f32     100 q_triaxial  f32
///   8 m_vir          f64      72 r_halo   f32     104 s_triaxial  f32
///  16 n_particles    i32      76 r_max    f32     108 eigenvectors f32[3][3]
///  20 position_com   f32[3]   80 v_max    f32     144 padding     u8[8]
///  32 position_mbp   f32[3]   84 sigma_v  f32
///  44 velocity_com   f32[3]   88 spin     f32[3]
///  56 velocity_mbp   f32[3]
/// ```
///
/// The padding is consumed when decoding but not kept.
#[derive(Debug, Clone, Copy, PartialEq, Default, Serialize)]
pub struct HaloRecord {
    /// ID of the most bound particle.
    pub id_mbp: i64,
    /// Virial mass.
    pub m_vir: f64,
    pub n_particles: i32,
    pub position_com: [f32; 3],
    pub position_mbp: [f32; 3],
    pub velocity_com: [f32; 3],
    pub velocity_mbp: [f32; 3],
    pub r_vir: f32,
    pub r_halo: f32,
    pub r_max: f32,
    /// Maximum circular velocity.
    pub v_max: f32,
    /// Velocity dispersion.
    pub sigma_v: f32,
    pub spin: [f32; 3],
    pub q_triaxial: f32,
    pub s_triaxial: f32,
    pub shape_eigen_vectors: [[f32; 3]; 3],
}

impl HaloRecord {
    /// Decode one record from the first [`HALO_RECORD_BYTES`] bytes of `raw`.
    ///
    /// Panics if `raw` is shorter than one record.
    pub fn from_le_bytes(raw: &[u8]) -> Self {
        debug_assert!(raw.len() >= HALO_RECORD_BYTES);
        let vec3 = |at: usize| -> [f32; 3] {
            let mut v = [0f32; 3];
            LittleEndian::read_f32_into(&raw[at..at + 12], &mut v);
            v
        };
        let f32_at = |at: usize| LittleEndian::read_f32(&raw[at..at + 4]);

        Self {
            id_mbp: LittleEndian::read_i64(&raw[0..8]),
            m_vir: LittleEndian::read_f64(&raw[8..16]),
            n_particles: LittleEndian::read_i32(&raw[16..20]),
            position_com: vec3(20),
            position_mbp: vec3(32),
            velocity_com: vec3(44),
            velocity_mbp: vec3(56),
            r_vir: f32_at(68),
            r_halo: f32_at(72),
            r_max: f32_at(76),
            v_max: f32_at(80),
            sigma_v: f32_at(84),
            spin: vec3(88),
            q_triaxial: f32_at(100),
            s_triaxial: f32_at(104),
            shape_eigen_vectors: [vec3(108), vec3(120), vec3(132)],
        }
    }

    /// Decode consecutive records from `raw` into `out`.
    ///
    /// `raw` must hold exactly `out.len()` records.
    pub(crate) fn decode_into(raw: &[u8], out: &mut [HaloRecord]) {
        debug_assert_eq!(raw.len(), out.len() * HALO_RECORD_BYTES);
        for (chunk, halo) in raw.chunks_exact(HALO_RECORD_BYTES).zip(out.iter_mut()) {
            *halo = Self::from_le_bytes(chunk);
        }
    }
}
