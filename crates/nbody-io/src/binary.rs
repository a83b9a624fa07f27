//! Little-endian primitives shared by the grid and catalog readers.
//!
//! Every fixed-size read goes through these helpers so that a short read is
//! reported as [`NbodyIoError::Truncated`] with the piece of the layout that
//! was being read.

use std::io::Read;

use byteorder::{LittleEndian, ReadBytesExt};

use crate::error::{NbodyIoError, Result};

/// Read exactly `buf.len()` bytes.
pub(crate) fn read_bytes<R: Read>(reader: &mut R, buf: &mut [u8], context: &str) -> Result<()> {
    reader
        .read_exact(buf)
        .map_err(|e| NbodyIoError::from_read(e, context, buf.len() as u64))
}

/// Read `out.len()` little-endian i32 values.
pub(crate) fn read_i32s<R: Read>(reader: &mut R, out: &mut [i32], context: &str) -> Result<()> {
    reader
        .read_i32_into::<LittleEndian>(out)
        .map_err(|e| NbodyIoError::from_read(e, context, 4 * out.len() as u64))
}

/// Read `out.len()` little-endian f64 values.
pub(crate) fn read_f64s<R: Read>(reader: &mut R, out: &mut [f64], context: &str) -> Result<()> {
    reader
        .read_f64_into::<LittleEndian>(out)
        .map_err(|e| NbodyIoError::from_read(e, context, 8 * out.len() as u64))
}

/// Read `out.len()` little-endian f32 values directly into `out`.
pub(crate) fn read_f32s<R: Read>(reader: &mut R, out: &mut [f32], context: &str) -> Result<()> {
    reader
        .read_f32_into::<LittleEndian>(out)
        .map_err(|e| NbodyIoError::from_read(e, context, 4 * out.len() as u64))
}

/// Convert a signed on-disk count into a `usize`.
pub(crate) fn to_count(value: i32, what: &str) -> Result<usize> {
    usize::try_from(value)
        .map_err(|_| NbodyIoError::invalid_header(format!("{what} is negative ({value})")))
}

/// Decode a fixed-width, null-padded ASCII field.
///
/// Stops at the first NUL and trims surrounding whitespace. Non-ASCII bytes are
/// replaced rather than rejected.
pub(crate) fn decode_fixed_ascii(raw: &[u8]) -> String {
    let end = raw.iter().position(|&b| b == 0).unwrap_or(raw.len());
    String::from_utf8_lossy(&raw[..end]).trim().to_string()
}
