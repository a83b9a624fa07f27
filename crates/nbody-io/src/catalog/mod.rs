//! Reader for multi-file gbpCode halo catalogs.
//!
//! A catalog is written as one shard per process. Each shard starts with a
//! 16-byte header giving its own halo count and the catalog total, followed by
//! fixed-size halo records. The reader sizes one output array from the first
//! shard's total and copies every shard into it in shard order.

pub mod record;
pub mod shards;

use std::fs::File;
use std::io::{BufReader, Seek, SeekFrom};
use std::path::{Path, PathBuf};

use serde::Serialize;
use tracing::{debug, info, warn};

use crate::binary::read_bytes;
use crate::config::{HaloCountCheck, ReaderConfig};
use crate::error::{NbodyIoError, Result};

pub use record::{CatalogHeader, HaloRecord, CATALOG_HEADER_BYTES, HALO_RECORD_BYTES};
pub use shards::{discover_shards, shard_index, CatalogSource};

/// What was read from one shard.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ShardSummary {
    pub path: PathBuf,
    pub file_index: i32,
    /// Shard count declared in this shard's header.
    pub n_files: i32,
    /// Halos copied from this shard.
    pub n_halos: usize,
}

/// All halos of a catalog in shard order.
#[derive(Debug, Clone)]
pub struct HaloCatalog {
    halos: Vec<HaloRecord>,
    n_halos_read: usize,
    shards: Vec<ShardSummary>,
}

impl HaloCatalog {
    pub fn halos(&self) -> &[HaloRecord] {
        &self.halos
    }

    pub fn len(&self) -> usize {
        self.halos.len()
    }

    pub fn is_empty(&self) -> bool {
        self.halos.is_empty()
    }

    /// Halos actually copied from shards.
    ///
    /// Only differs from [`len`](Self::len) for lenient reads of inconsistent
    /// catalogs, where the records past this count are zeroed.
    pub fn n_halos_read(&self) -> usize {
        self.n_halos_read
    }

    /// Whether every slot of the output was filled from a shard.
    pub fn is_complete(&self) -> bool {
        self.n_halos_read == self.halos.len()
    }

    pub fn shards(&self) -> &[ShardSummary] {
        &self.shards
    }

    pub fn iter(&self) -> std::slice::Iter<'_, HaloRecord> {
        self.halos.iter()
    }

    pub fn into_halos(self) -> Vec<HaloRecord> {
        self.halos
    }
}

/// Reads catalogs with a fixed configuration.
#[derive(Debug, Clone, Default)]
pub struct HaloCatalogReader {
    config: ReaderConfig,
}

impl HaloCatalogReader {
    pub fn new(config: ReaderConfig) -> Result<Self> {
        config.validate()?;
        Ok(Self { config })
    }

    pub fn config(&self) -> &ReaderConfig {
        &self.config
    }

    /// Read every shard of `source` into one array.
    ///
    /// All shard headers are checked against their file sizes before the
    /// output is allocated, so a corrupt count fails without reading records.
    pub fn read(&self, source: impl Into<CatalogSource>) -> Result<HaloCatalog> {
        let paths = source.into().resolve()?;

        let headers = paths
            .iter()
            .map(|path| read_checked_header(path))
            .collect::<Result<Vec<_>>>()?;
        let n_halos_total = headers[0].n_halos_total;
        info!(
            shards = paths.len(),
            n_halos_total,
            check = self.config.halo_count_check.as_str(),
            "Reading halo catalog"
        );

        let mut n_halos_read = 0usize;
        for (path, header) in paths.iter().zip(&headers) {
            self.check_total(path, header, n_halos_total)?;
            n_halos_read = n_halos_read.saturating_add(header.n_halos_file);
        }

        if n_halos_read > n_halos_total {
            return Err(NbodyIoError::HaloCountMismatch {
                expected: n_halos_total,
                actual: n_halos_read,
            });
        }
        if n_halos_read < n_halos_total {
            match self.config.halo_count_check {
                HaloCountCheck::Strict => {
                    return Err(NbodyIoError::HaloCountMismatch {
                        expected: n_halos_total,
                        actual: n_halos_read,
                    });
                }
                HaloCountCheck::Lenient => warn!(
                    expected = n_halos_total,
                    actual = n_halos_read,
                    "Shards hold fewer halos than the catalog total; trailing records are zero"
                ),
            }
        }

        let mut halos = Vec::new();
        halos.try_reserve_exact(n_halos_total).map_err(|e| {
            NbodyIoError::invalid_header(format!(
                "cannot allocate {n_halos_total} halo records: {e}"
            ))
        })?;
        halos.resize(n_halos_total, HaloRecord::default());

        let mut shards = Vec::with_capacity(paths.len());
        let mut block = Vec::new();
        let mut offset = 0usize;

        for (path, header) in paths.iter().zip(&headers) {
            let summary = self.read_shard(path, header, offset, &mut halos, &mut block)?;
            offset += summary.n_halos;
            shards.push(summary);
        }

        info!(halos = offset, shards = shards.len(), "Read halo catalog");

        Ok(HaloCatalog {
            halos,
            n_halos_read: offset,
            shards,
        })
    }

    /// Apply the count policy to a shard whose total differs from the first.
    fn check_total(
        &self,
        path: &Path,
        header: &CatalogHeader,
        n_halos_total: usize,
    ) -> Result<()> {
        if header.n_halos_total == n_halos_total {
            return Ok(());
        }

        let msg = format!(
            "{} declares {} halos in total, first shard declares {}",
            path.display(),
            header.n_halos_total,
            n_halos_total
        );
        match self.config.halo_count_check {
            HaloCountCheck::Strict => Err(NbodyIoError::invalid_header(msg)),
            HaloCountCheck::Lenient => {
                warn!("{msg}");
                Ok(())
            }
        }
    }

    /// Copy the records of one shard into `halos[offset..]`.
    fn read_shard(
        &self,
        path: &Path,
        header: &CatalogHeader,
        offset: usize,
        halos: &mut [HaloRecord],
        block: &mut Vec<u8>,
    ) -> Result<ShardSummary> {
        let mut reader = BufReader::new(File::open(path)?);
        reader.seek(SeekFrom::Start(CATALOG_HEADER_BYTES as u64))?;

        let n = header.n_halos_file;
        let context = format!("halo records of {}", path.display());
        for chunk in halos[offset..offset + n].chunks_mut(self.config.read_block_records) {
            let bytes = chunk.len() * HALO_RECORD_BYTES;
            block.resize(bytes, 0);
            read_bytes(&mut reader, &mut block[..bytes], &context)?;
            HaloRecord::decode_into(&block[..bytes], chunk);
        }

        debug!(
            path = %path.display(),
            file_index = header.file_index,
            n_halos = n,
            offset,
            "Read catalog shard"
        );

        Ok(ShardSummary {
            path: path.to_path_buf(),
            file_index: header.file_index,
            n_files: header.n_files,
            n_halos: n,
        })
    }
}

/// Read a shard header and check that the file holds the records it declares.
fn read_checked_header(path: &Path) -> Result<CatalogHeader> {
    let file = File::open(path)?;
    let file_len = file.metadata()?.len();
    let header = CatalogHeader::read_from(&mut BufReader::new(file))?;

    let expected_bytes = (header.n_halos_file as u64)
        .saturating_mul(HALO_RECORD_BYTES as u64)
        .saturating_add(CATALOG_HEADER_BYTES as u64);
    if file_len < expected_bytes {
        return Err(NbodyIoError::truncated(
            format!("halo records of {}", path.display()),
            expected_bytes,
        ));
    }
    Ok(header)
}

/// Read a catalog from a shard file, a directory of shards or a list of shards.
///
/// Uses the default (strict) configuration.
pub fn read_halo_catalog(source: impl Into<CatalogSource>) -> Result<HaloCatalog> {
    HaloCatalogReader::default().read(source)
}

/// Read a catalog with an explicit configuration.
pub fn read_halo_catalog_with(
    source: impl Into<CatalogSource>,
    config: &ReaderConfig,
) -> Result<HaloCatalog> {
    HaloCatalogReader::new(config.clone())?.read(source)
}

/// Read only the header of one shard.
pub fn read_catalog_header(path: impl AsRef<Path>) -> Result<CatalogHeader> {
    let mut reader = BufReader::new(File::open(path.as_ref())?);
    CatalogHeader::read_from(&mut reader)
}

#[cfg(test)]
mod tests {
    use super::*;
    use test_utils::{synthetic_halo, write_catalog_shards};

    #[test]
    fn test_small_blocks_cover_whole_shard() {
        let dir = tempfile::tempdir().unwrap();
        let fixture = write_catalog_shards(dir.path(), "catalog", &[7]).unwrap();

        let config = ReaderConfig {
            read_block_records: 3,
            ..Default::default()
        };
        let catalog = read_halo_catalog_with(fixture.paths[0].as_path(), &config).unwrap();

        assert_eq!(catalog.len(), 7);
        for (i, halo) in catalog.iter().enumerate() {
            assert_eq!(halo.id_mbp, synthetic_halo(i).id_mbp);
        }
    }

    #[test]
    fn test_header_checked_against_file_length() {
        let dir = tempfile::tempdir().unwrap();
        let fixture = write_catalog_shards(dir.path(), "catalog", &[3]).unwrap();
        assert_eq!(read_checked_header(&fixture.paths[0]).unwrap().n_halos_file, 3);

        let bytes = std::fs::read(&fixture.paths[0]).unwrap();
        std::fs::write(&fixture.paths[0], &bytes[..bytes.len() - HALO_RECORD_BYTES]).unwrap();
        let err = read_checked_header(&fixture.paths[0]).unwrap_err();
        assert!(matches!(
            err,
            NbodyIoError::Truncated { expected_bytes, .. }
                if expected_bytes == (CATALOG_HEADER_BYTES + 3 * HALO_RECORD_BYTES) as u64
        ));
    }

    #[test]
    fn test_invalid_config_rejected() {
        let config = ReaderConfig {
            read_block_records: 0,
            ..Default::default()
        };
        assert!(matches!(
            HaloCatalogReader::new(config),
            Err(NbodyIoError::InvalidConfig(_))
        ));
    }

    #[test]
    fn test_empty_catalog() {
        let dir = tempfile::tempdir().unwrap();
        let fixture = write_catalog_shards(dir.path(), "catalog", &[0, 0]).unwrap();
        let catalog = read_halo_catalog(dir.path()).unwrap();
        assert!(catalog.is_empty());
        assert!(catalog.is_complete());
        assert_eq!(catalog.shards().len(), fixture.paths.len());
    }

    #[test]
    fn test_shard_summaries() {
        let dir = tempfile::tempdir().unwrap();
        write_catalog_shards(dir.path(), "catalog", &[1, 4]).unwrap();
        let catalog = read_halo_catalog(dir.path()).unwrap();

        let summary = &catalog.shards()[1];
        assert_eq!(summary.file_index, 1);
        assert_eq!(summary.n_files, 2);
        assert_eq!(summary.n_halos, 4);
        assert!(summary.path.ends_with("catalog.1"));
    }
}
