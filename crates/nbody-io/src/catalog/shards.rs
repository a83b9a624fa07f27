//! Discovery and ordering of catalog shard files.
//!
//! Shards are named `<prefix>.<n>`; the catalog order is the numeric value
//! of `n`, never the directory listing order or the lexical order of names.

use std::fs;
use std::path::{Path, PathBuf};

use tracing::debug;

use crate::error::{NbodyIoError, Result};

/// Where a catalog is read from.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum CatalogSource {
    /// A single shard file, or a directory whose files are all shards.
    Path(PathBuf),
    /// Shard files in the order given by the caller.
    Files(Vec<PathBuf>),
}

impl CatalogSource {
    /// Resolve to the ordered list of shard files.
    pub fn resolve(&self) -> Result<Vec<PathBuf>> {
        let paths = match self {
            Self::Path(path) if path.is_dir() => discover_shards(path)?,
            Self::Path(path) => vec![path.clone()],
            Self::Files(paths) => paths.clone(),
        };

        if paths.is_empty() {
            return Err(NbodyIoError::empty_input(self.describe()));
        }
        Ok(paths)
    }

    fn describe(&self) -> String {
        match self {
            Self::Path(path) => path.display().to_string(),
            Self::Files(_) => "empty file list".to_string(),
        }
    }
}

impl From<PathBuf> for CatalogSource {
    fn from(path: PathBuf) -> Self {
        Self::Path(path)
    }
}

impl From<&Path> for CatalogSource {
    fn from(path: &Path) -> Self {
        Self::Path(path.to_path_buf())
    }
}

impl From<&str> for CatalogSource {
    fn from(path: &str) -> Self {
        Self::Path(PathBuf::from(path))
    }
}

impl From<String> for CatalogSource {
    fn from(path: String) -> Self {
        Self::Path(PathBuf::from(path))
    }
}

impl From<Vec<PathBuf>> for CatalogSource {
    fn from(paths: Vec<PathBuf>) -> Self {
        Self::Files(paths)
    }
}

impl From<&[PathBuf]> for CatalogSource {
    fn from(paths: &[PathBuf]) -> Self {
        Self::Files(paths.to_vec())
    }
}

/// Numeric shard index: the integer after the last `.` in the file name.
///
/// A name without a `.` is parsed whole. Returns `None` when the suffix is not
/// an unsigned integer.
pub fn shard_index(path: &Path) -> Option<u64> {
    let name = path.file_name()?.to_str()?;
    name.rsplit('.').next()?.parse().ok()
}

/// List the shard files in `dir`, sorted by [`shard_index`].
///
/// Subdirectories are ignored. Every file must carry a numeric suffix.
pub fn discover_shards(dir: &Path) -> Result<Vec<PathBuf>> {
    let mut keyed = Vec::new();

    for entry in fs::read_dir(dir)? {
        let path = entry?.path();
        if !path.is_file() {
            continue;
        }
        let index = shard_index(&path).ok_or_else(|| NbodyIoError::InvalidShardName(path.clone()))?;
        keyed.push((index, path));
    }

    sort_by_shard_index(&mut keyed);
    debug!(dir = %dir.display(), shards = keyed.len(), "Discovered catalog shards");

    Ok(keyed.into_iter().map(|(_, path)| path).collect())
}

/// Stable sort on the numeric key only.
fn sort_by_shard_index(keyed: &mut [(u64, PathBuf)]) {
    keyed.sort_by_key(|(index, _)| *index);
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_shard_index_parsing() {
        assert_eq!(shard_index(Path::new("/data/subfind_042.catalog_groups.3")), Some(3));
        assert_eq!(shard_index(Path::new("catalog.012")), Some(12));
        assert_eq!(shard_index(Path::new("17")), Some(17));
        assert_eq!(shard_index(Path::new("catalog.txt")), None);
        assert_eq!(shard_index(Path::new("catalog.")), None);
        assert_eq!(shard_index(Path::new("catalog.-1")), None);
    }

    #[test]
    fn test_numeric_not_lexical_order() {
        let mut keyed: Vec<(u64, PathBuf)> = ["catalog.2", "catalog.10", "catalog.1"]
            .iter()
            .map(|name| (shard_index(Path::new(name)).unwrap(), PathBuf::from(name)))
            .collect();
        sort_by_shard_index(&mut keyed);
        let names: Vec<_> = keyed.iter().map(|(_, p)| p.to_str().unwrap()).collect();
        assert_eq!(names, ["catalog.1", "catalog.2", "catalog.10"]);
    }

    #[test]
    fn test_zero_padded_suffixes_sort_numerically() {
        let mut keyed: Vec<(u64, PathBuf)> = ["catalog.012", "catalog.003", "catalog.100"]
            .iter()
            .map(|name| (shard_index(Path::new(name)).unwrap(), PathBuf::from(name)))
            .collect();
        sort_by_shard_index(&mut keyed);
        let order: Vec<_> = keyed.iter().map(|(i, _)| *i).collect();
        assert_eq!(order, [3, 12, 100]);
    }

    #[test]
    fn test_discover_sorts_and_skips_directories() {
        let dir = tempfile::tempdir().unwrap();
        for name in ["catalog.10", "catalog.2", "catalog.1"] {
            fs::write(dir.path().join(name), b"").unwrap();
        }
        fs::create_dir(dir.path().join("nested.5")).unwrap();

        let shards = discover_shards(dir.path()).unwrap();
        let names: Vec<_> = shards
            .iter()
            .map(|p| p.file_name().unwrap().to_str().unwrap().to_string())
            .collect();
        assert_eq!(names, ["catalog.1", "catalog.2", "catalog.10"]);
    }

    #[test]
    fn test_discover_rejects_non_numeric_names() {
        let dir = tempfile::tempdir().unwrap();
        fs::write(dir.path().join("catalog.0"), b"").unwrap();
        fs::write(dir.path().join("README"), b"").unwrap();

        let err = discover_shards(dir.path()).unwrap_err();
        assert!(matches!(err, NbodyIoError::InvalidShardName(p) if p.ends_with("README")));
    }

    #[test]
    fn test_empty_directory_is_empty_input() {
        let dir = tempfile::tempdir().unwrap();
        let err = CatalogSource::from(dir.path()).resolve().unwrap_err();
        assert!(matches!(err, NbodyIoError::EmptyInput(_)));
    }

    #[test]
    fn test_empty_file_list_is_empty_input() {
        let err = CatalogSource::Files(Vec::new()).resolve().unwrap_err();
        assert!(matches!(err, NbodyIoError::EmptyInput(_)));
    }

    #[test]
    fn test_explicit_list_keeps_caller_order() {
        let files = vec![PathBuf::from("b.2"), PathBuf::from("a.1")];
        let resolved = CatalogSource::from(files.clone()).resolve().unwrap();
        assert_eq!(resolved, files);
    }
}
