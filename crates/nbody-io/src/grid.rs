//! Reader for gbpCode grid files.
//!
//! A grid file holds a fixed header followed by `n_grids` named blocks of
//! little-endian `f32`, all the same size:
//!
//! ```text
//! i32[3]  cell counts
//! f64[3]  box size
//! i32     n_grids
//! i32     mass assignment scheme
//! n_grids x (char[32] identifier, f32[nx*ny*nz] values)
//! ```
//!
//! Grids that do not match the requested identifier are skipped with a single
//! forward seek, so only the requested grid is ever materialized.

use std::fmt;
use std::fs::File;
use std::io::{BufReader, Read, Seek, SeekFrom};
use std::path::Path;
use std::str::FromStr;

use ndarray::Array3;
use serde::{Deserialize, Serialize};
use tracing::{debug, info};

use crate::binary::{decode_fixed_ascii, read_bytes, read_f32s, read_f64s, read_i32s, to_count};
use crate::error::{NbodyIoError, Result};

/// Size of the fixed grid file header in bytes.
pub const GRID_HEADER_BYTES: u64 = 44;

/// Width of the identifier field preceding each grid.
pub const IDENTIFIER_BYTES: usize = 32;

/// Number of leading identifier characters compared against the target.
pub const IDENTIFIER_MATCH_LEN: usize = 10;

/// The grids a caller can request.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum GridName {
    Density,
    Vx,
    Vy,
    Vz,
}

impl GridName {
    pub const ALL: [GridName; 4] = [Self::Density, Self::Vx, Self::Vy, Self::Vz];

    /// Identifier written on disk for this grid.
    pub fn identifier(&self) -> &'static str {
        match self {
            Self::Density => "rho_r_dark",
            Self::Vx => "v_x_r_dark",
            Self::Vy => "v_y_r_dark",
            Self::Vz => "v_z_r_dark",
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Density => "density",
            Self::Vx => "vx",
            Self::Vy => "vy",
            Self::Vz => "vz",
        }
    }

    /// Map an on-disk identifier back to a grid name, if it is one we know.
    pub fn from_identifier(identifier: &str) -> Option<Self> {
        Self::ALL
            .into_iter()
            .find(|name| identifier_matches(identifier, name.identifier()))
    }
}

impl FromStr for GridName {
    type Err = NbodyIoError;

    fn from_str(s: &str) -> Result<Self> {
        match s {
            "density" => Ok(Self::Density),
            "vx" => Ok(Self::Vx),
            "vy" => Ok(Self::Vy),
            "vz" => Ok(Self::Vz),
            other => Err(NbodyIoError::UnknownGridName(other.to_string())),
        }
    }
}

impl fmt::Display for GridName {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Compare the first [`IDENTIFIER_MATCH_LEN`] characters of a decoded identifier.
fn identifier_matches(identifier: &str, target: &str) -> bool {
    identifier
        .chars()
        .take(IDENTIFIER_MATCH_LEN)
        .eq(target.chars().take(IDENTIFIER_MATCH_LEN))
}

/// Grid file header.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct GridHeader {
    /// Cells per axis.
    pub cell_counts: [usize; 3],
    /// Box side lengths.
    pub box_size: [f64; 3],
    /// Number of grids stored in the file.
    pub n_grids: usize,
    /// Mass assignment scheme used to build the grids.
    pub mass_assignment_scheme: i32,
    cell_count: usize,
    block_bytes: u64,
}

impl GridHeader {
    /// Read and validate the header from the current position of `reader`.
    pub fn read_from<R: Read>(reader: &mut R) -> Result<Self> {
        let mut dims = [0i32; 3];
        read_i32s(reader, &mut dims, "grid header cell counts")?;
        let mut box_size = [0f64; 3];
        read_f64s(reader, &mut box_size, "grid header box size")?;
        let mut tail = [0i32; 2];
        read_i32s(reader, &mut tail, "grid header grid count")?;

        let cell_counts = [
            to_count(dims[0], "cell count x")?,
            to_count(dims[1], "cell count y")?,
            to_count(dims[2], "cell count z")?,
        ];
        let n_grids = to_count(tail[0], "n_grids")?;

        let cell_count = cell_counts
            .iter()
            .try_fold(1usize, |acc, &n| acc.checked_mul(n))
            .ok_or_else(|| {
                NbodyIoError::invalid_header(format!("cell count overflows: {cell_counts:?}"))
            })?;
        // Skips are relative seeks, so a block must fit in an i64 offset.
        let block_bytes = (cell_count as u64)
            .checked_mul(4)
            .filter(|&b| b <= i64::MAX as u64)
            .ok_or_else(|| {
                NbodyIoError::invalid_header(format!("grid block too large: {cell_count} cells"))
            })?;

        Ok(Self {
            cell_counts,
            box_size,
            n_grids,
            mass_assignment_scheme: tail[1],
            cell_count,
            block_bytes,
        })
    }

    /// Total number of cells in one grid.
    pub fn cell_count(&self) -> usize {
        self.cell_count
    }

    /// Size in bytes of one grid payload.
    pub fn block_bytes(&self) -> u64 {
        self.block_bytes
    }

    pub fn shape(&self) -> (usize, usize, usize) {
        (self.cell_counts[0], self.cell_counts[1], self.cell_counts[2])
    }
}

/// One grid listed in a file.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct GridEntry {
    /// Position in the file, starting at 0.
    pub index: usize,
    /// Decoded identifier.
    pub identifier: String,
    /// Byte offset of the first value of the grid.
    pub data_offset: u64,
}

impl GridEntry {
    /// The public grid name for this entry, if it is one of the known grids.
    pub fn grid_name(&self) -> Option<GridName> {
        GridName::from_identifier(&self.identifier)
    }
}

/// A grid read from a file.
#[derive(Debug, Clone)]
pub struct Grid {
    name: GridName,
    header: GridHeader,
    data: Array3<f32>,
}

impl Grid {
    pub fn name(&self) -> GridName {
        self.name
    }

    pub fn header(&self) -> &GridHeader {
        &self.header
    }

    /// Values in C order, shape `(nx, ny, nz)`.
    pub fn data(&self) -> &Array3<f32> {
        &self.data
    }

    pub fn shape(&self) -> (usize, usize, usize) {
        self.header.shape()
    }

    /// Value at cell `(i, j, k)`.
    pub fn get(&self, i: usize, j: usize, k: usize) -> Option<f32> {
        self.data.get((i, j, k)).copied()
    }

    pub fn into_array(self) -> Array3<f32> {
        self.data
    }
}

/// Scans the named grids of one file.
///
/// The header is read when the reader is created; the stream must be
/// positioned at the start of the file.
pub struct GridReader<R> {
    reader: R,
    header: GridHeader,
}

impl GridReader<BufReader<File>> {
    /// Open a grid file and read its header.
    pub fn open(path: impl AsRef<Path>) -> Result<Self> {
        let file = File::open(path.as_ref())?;
        Self::new(BufReader::new(file))
    }
}

impl<R: Read + Seek> GridReader<R> {
    /// Wrap a stream positioned at the start of a grid file.
    pub fn new(mut reader: R) -> Result<Self> {
        let header = GridHeader::read_from(&mut reader)?;
        debug!(
            cell_counts = ?header.cell_counts,
            n_grids = header.n_grids,
            "Read grid header"
        );
        Ok(Self { reader, header })
    }

    pub fn header(&self) -> &GridHeader {
        &self.header
    }

    /// Read the grid called `name`, skipping every grid before it.
    pub fn read(mut self, name: GridName) -> Result<Grid> {
        let target = name.identifier();
        let skip = self.header.block_bytes as i64;

        for index in 0..self.header.n_grids {
            let identifier = self.read_identifier(index)?;

            if identifier_matches(&identifier, target) {
                let context = format!("grid '{identifier}' values");
                // Header dims are untrusted; size the buffer only once the bytes exist
                if self.remaining_bytes()? < self.header.block_bytes {
                    return Err(NbodyIoError::truncated(context, self.header.block_bytes));
                }

                let mut values = vec![0f32; self.header.cell_count];
                read_f32s(&mut self.reader, &mut values, &context)?;
                let data = Array3::from_shape_vec(self.header.shape(), values)
                    .map_err(|e| NbodyIoError::invalid_header(e.to_string()))?;

                return Ok(Grid {
                    name,
                    header: self.header,
                    data,
                });
            }

            debug!(index, identifier = %identifier, "Skipping grid");
            self.reader.seek(SeekFrom::Current(skip))?;
        }

        Err(NbodyIoError::GridNotFound {
            identifier: target,
            scanned: self.header.n_grids,
        })
    }

    /// List every grid in the file without reading any values.
    pub fn entries(mut self) -> Result<Vec<GridEntry>> {
        let skip = self.header.block_bytes as i64;
        let mut entries = Vec::new();

        for index in 0..self.header.n_grids {
            let identifier = self.read_identifier(index)?;
            let data_offset = self.reader.stream_position()?;
            entries.push(GridEntry {
                index,
                identifier,
                data_offset,
            });
            self.reader.seek(SeekFrom::Current(skip))?;
        }

        Ok(entries)
    }

    pub fn into_inner(self) -> R {
        self.reader
    }

    /// Bytes between the current position and the end of the stream.
    fn remaining_bytes(&mut self) -> Result<u64> {
        let here = self.reader.stream_position()?;
        let end = self.reader.seek(SeekFrom::End(0))?;
        self.reader.seek(SeekFrom::Start(here))?;
        Ok(end.saturating_sub(here))
    }

    fn read_identifier(&mut self, index: usize) -> Result<String> {
        let mut raw = [0u8; IDENTIFIER_BYTES];
        read_bytes(
            &mut self.reader,
            &mut raw,
            &format!("identifier of grid {index}"),
        )?;
        Ok(decode_fixed_ascii(&raw))
    }
}

/// Read one grid from a file.
///
/// `grid_name` must be one of `density`, `vx`, `vy` or `vz`; anything else
/// fails with [`NbodyIoError::UnknownGridName`] before the file is opened.
pub fn read_grid(path: impl AsRef<Path>, grid_name: &str) -> Result<Grid> {
    let name: GridName = grid_name.parse()?;
    read_grid_named(path, name)
}

/// Read one grid from a file by its typed name.
pub fn read_grid_named(path: impl AsRef<Path>, name: GridName) -> Result<Grid> {
    let path = path.as_ref();
    info!(path = %path.display(), grid = %name, "Reading grid");

    let grid = GridReader::open(path)?.read(name)?;

    info!(
        path = %path.display(),
        grid = %name,
        shape = ?grid.shape(),
        "Read grid"
    );
    Ok(grid)
}

/// Read only the header of a grid file.
pub fn read_grid_header(path: impl AsRef<Path>) -> Result<GridHeader> {
    let mut reader = BufReader::new(File::open(path.as_ref())?);
    GridHeader::read_from(&mut reader)
}

/// List the grids stored in a file.
pub fn list_grids(path: impl AsRef<Path>) -> Result<Vec<GridEntry>> {
    GridReader::open(path)?.entries()
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Cursor;
    use test_utils::{create_test_grid3, identifiers, GridFileBuilder};

    /// Counts payload bytes pulled through `read` and relative seeks.
    struct CountingReader<R> {
        inner: R,
        bytes_read: u64,
        forward_seeks: usize,
    }

    impl<R> CountingReader<R> {
        fn new(inner: R) -> Self {
            Self {
                inner,
                bytes_read: 0,
                forward_seeks: 0,
            }
        }
    }

    impl<R: Read> Read for CountingReader<R> {
        fn read(&mut self, buf: &mut [u8]) -> std::io::Result<usize> {
            let n = self.inner.read(buf)?;
            self.bytes_read += n as u64;
            Ok(n)
        }
    }

    impl<R: Seek> Seek for CountingReader<R> {
        fn seek(&mut self, pos: SeekFrom) -> std::io::Result<u64> {
            if let SeekFrom::Current(delta) = pos {
                if delta != 0 {
                    self.forward_seeks += 1;
                }
            }
            self.inner.seek(pos)
        }
    }

    fn four_grid_file(dims: [usize; 3]) -> Vec<u8> {
        let n = dims.iter().product();
        GridFileBuilder::new(dims)
            .grid(identifiers::VX, vec![1.0; n])
            .grid(identifiers::VY, vec![2.0; n])
            .grid(identifiers::DENSITY, create_test_grid3(dims[0], dims[1], dims[2]))
            .grid(identifiers::VZ, vec![4.0; n])
            .to_bytes()
    }

    #[test]
    fn test_grid_name_parsing() {
        assert_eq!("density".parse::<GridName>().unwrap(), GridName::Density);
        assert_eq!("vz".parse::<GridName>().unwrap(), GridName::Vz);
        assert!(matches!(
            "temperature".parse::<GridName>(),
            Err(NbodyIoError::UnknownGridName(ref s)) if s == "temperature"
        ));
        // Names are exact; on-disk identifiers are not accepted
        assert!("rho_r_dark".parse::<GridName>().is_err());
    }

    #[test]
    fn test_identifiers_distinct() {
        let ids: Vec<_> = GridName::ALL.iter().map(|n| n.identifier()).collect();
        assert_eq!(ids, ["rho_r_dark", "v_x_r_dark", "v_y_r_dark", "v_z_r_dark"]);
        assert!(ids.iter().all(|id| id.len() == IDENTIFIER_MATCH_LEN));
    }

    #[test]
    fn test_identifier_match_uses_leading_characters() {
        assert!(identifier_matches("rho_r_dark", "rho_r_dark"));
        assert!(identifier_matches("rho_r_dark_smoothed", "rho_r_dark"));
        assert!(!identifier_matches("rho_r_dar", "rho_r_dark"));
        assert!(!identifier_matches("v_x_r_dark", "rho_r_dark"));
    }

    #[test]
    fn test_header_fields() {
        let bytes = GridFileBuilder::new([2, 3, 4])
            .box_size([62.5, 62.5, 125.0])
            .ma_scheme(2)
            .grid(identifiers::DENSITY, vec![0.0; 24])
            .to_bytes();
        let reader = GridReader::new(Cursor::new(bytes)).unwrap();
        let header = reader.header();
        assert_eq!(header.cell_counts, [2, 3, 4]);
        assert_eq!(header.box_size, [62.5, 62.5, 125.0]);
        assert_eq!(header.n_grids, 1);
        assert_eq!(header.mass_assignment_scheme, 2);
        assert_eq!(header.cell_count(), 24);
        assert_eq!(header.block_bytes(), 96);
    }

    #[test]
    fn test_target_at_position_p_reads_and_seeks() {
        let dims = [3, 4, 5];
        let cells = 60u64;
        let bytes = four_grid_file(dims);

        let mut counting = CountingReader::new(Cursor::new(bytes));
        let grid = {
            let reader = GridReader::new(&mut counting).unwrap();
            reader.read(GridName::Density).unwrap()
        };

        // Density is the third grid: three identifiers, two skips, one payload
        assert_eq!(counting.forward_seeks, 2);
        assert_eq!(
            counting.bytes_read,
            GRID_HEADER_BYTES + 3 * IDENTIFIER_BYTES as u64 + 4 * cells
        );

        let expected = create_test_grid3(3, 4, 5);
        assert_eq!(grid.shape(), (3, 4, 5));
        assert_eq!(grid.data().as_slice().unwrap(), expected.as_slice());
        assert_eq!(grid.get(2, 3, 4), Some(20304.0));
        assert_eq!(grid.get(1, 0, 2), Some(10002.0));
    }

    #[test]
    fn test_first_grid_needs_no_seek() {
        let mut counting = CountingReader::new(Cursor::new(four_grid_file([2, 2, 2])));
        let grid = GridReader::new(&mut counting)
            .unwrap()
            .read(GridName::Vx)
            .unwrap();
        assert_eq!(counting.forward_seeks, 0);
        assert!(grid.data().iter().all(|&v| v == 1.0));
    }

    #[test]
    fn test_missing_grid_scans_everything() {
        let dims = [2, 2, 2];
        let bytes = GridFileBuilder::new(dims)
            .grid(identifiers::VX, vec![1.0; 8])
            .grid(identifiers::VY, vec![2.0; 8])
            .grid(identifiers::VZ, vec![3.0; 8])
            .to_bytes();

        let mut counting = CountingReader::new(Cursor::new(bytes));
        let err = GridReader::new(&mut counting)
            .unwrap()
            .read(GridName::Density)
            .unwrap_err();

        match err {
            NbodyIoError::GridNotFound {
                identifier,
                scanned,
            } => {
                assert_eq!(identifier, "rho_r_dark");
                assert_eq!(scanned, 3);
            }
            other => panic!("expected GridNotFound, got {other:?}"),
        }
        assert_eq!(counting.forward_seeks, 3);
        assert_eq!(counting.bytes_read, GRID_HEADER_BYTES + 3 * 32);
    }

    #[test]
    fn test_declared_grid_count_bounds_the_scan() {
        // Density is present but beyond the declared n_grids
        let bytes = GridFileBuilder::new([1, 1, 2])
            .grid(identifiers::VX, vec![1.0, 2.0])
            .grid(identifiers::DENSITY, vec![3.0, 4.0])
            .declared_grids(1)
            .to_bytes();
        let err = GridReader::new(Cursor::new(bytes))
            .unwrap()
            .read(GridName::Density)
            .unwrap_err();
        assert!(matches!(err, NbodyIoError::GridNotFound { scanned: 1, .. }));
    }

    #[test]
    fn test_truncated_header() {
        let bytes = four_grid_file([2, 2, 2]);
        let err = GridReader::new(Cursor::new(bytes[..20].to_vec())).err().unwrap();
        assert!(matches!(err, NbodyIoError::Truncated { .. }));
    }

    #[test]
    fn test_truncated_payload() {
        let bytes = GridFileBuilder::new([4, 4, 4])
            .grid(identifiers::DENSITY, vec![1.0; 64])
            .to_bytes();
        let cut = bytes.len() - 10;
        let err = GridReader::new(Cursor::new(bytes[..cut].to_vec()))
            .unwrap()
            .read(GridName::Density)
            .unwrap_err();
        assert!(matches!(
            err,
            NbodyIoError::Truncated { expected_bytes: 256, .. }
        ));
    }

    #[test]
    fn test_huge_dims_in_small_file_is_truncated() {
        let mut bytes = GridFileBuilder::new([1, 1, 1])
            .grid(identifiers::DENSITY, vec![0.0])
            .to_bytes();
        bytes[0..4].copy_from_slice(&(1i32 << 20).to_le_bytes());
        bytes[4..8].copy_from_slice(&(1i32 << 20).to_le_bytes());
        bytes[8..12].copy_from_slice(&(1i32 << 10).to_le_bytes());

        let reader = GridReader::new(Cursor::new(bytes)).unwrap();
        let block = reader.header().block_bytes();
        assert_eq!(block, 4 << 50);

        let err = reader.read(GridName::Density).unwrap_err();
        assert!(matches!(
            err,
            NbodyIoError::Truncated { expected_bytes, .. } if expected_bytes == block
        ));
    }

    #[test]
    fn test_size_check_leaves_stream_position() {
        let bytes = GridFileBuilder::new([2, 2, 2])
            .grid(identifiers::VX, vec![1.0; 8])
            .grid(identifiers::DENSITY, vec![5.0; 8])
            .to_bytes();
        let grid = GridReader::new(Cursor::new(bytes))
            .unwrap()
            .read(GridName::Density)
            .unwrap();
        assert!(grid.data().iter().all(|&v| v == 5.0));
    }

    #[test]
    fn test_negative_dimension_rejected() {
        let mut bytes = GridFileBuilder::new([2, 2, 2])
            .grid(identifiers::DENSITY, vec![0.0; 8])
            .to_bytes();
        bytes[4..8].copy_from_slice(&(-2i32).to_le_bytes());
        let err = GridReader::new(Cursor::new(bytes)).err().unwrap();
        assert!(matches!(err, NbodyIoError::InvalidHeader(_)));
    }

    #[test]
    fn test_entries_offsets() {
        let dims = [2, 3, 4];
        let reader = GridReader::new(Cursor::new(four_grid_file(dims))).unwrap();
        let entries = reader.entries().unwrap();

        assert_eq!(entries.len(), 4);
        let stride = 32 + 4 * 24;
        for (i, entry) in entries.iter().enumerate() {
            assert_eq!(entry.index, i);
            assert_eq!(entry.data_offset, GRID_HEADER_BYTES + 32 + (i * stride) as u64);
        }
        assert_eq!(entries[2].identifier, "rho_r_dark");
        assert_eq!(entries[2].grid_name(), Some(GridName::Density));
        assert_eq!(entries[3].grid_name(), Some(GridName::Vz));
    }

    #[test]
    fn test_unknown_identifiers_are_listed_and_skipped() {
        let bytes = GridFileBuilder::new([1, 1, 3])
            .grid("rho_r_gas", vec![9.0; 3])
            .grid(identifiers::VY, vec![1.0, 2.0, 3.0])
            .to_bytes();
        let entries = GridReader::new(Cursor::new(bytes.clone()))
            .unwrap()
            .entries()
            .unwrap();
        assert_eq!(entries[0].grid_name(), None);

        let grid = GridReader::new(Cursor::new(bytes))
            .unwrap()
            .read(GridName::Vy)
            .unwrap();
        let values: Vec<f32> = grid.into_array().iter().copied().collect();
        assert_eq!(values, vec![1.0, 2.0, 3.0]);
    }
}
