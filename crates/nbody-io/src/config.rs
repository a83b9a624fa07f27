//! Configuration for the readers.

use serde::{Deserialize, Serialize};

use crate::error::{NbodyIoError, Result};

/// Default number of halo records decoded per read block.
pub const DEFAULT_READ_BLOCK_RECORDS: usize = 4096;

/// Configuration for the halo catalog reader.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ReaderConfig {
    /// How to treat shard counts that disagree with the catalog total.
    pub halo_count_check: HaloCountCheck,

    /// Number of halo records pulled from disk per block.
    pub read_block_records: usize,
}

impl Default for ReaderConfig {
    fn default() -> Self {
        Self {
            halo_count_check: HaloCountCheck::Strict,
            read_block_records: DEFAULT_READ_BLOCK_RECORDS,
        }
    }
}

impl ReaderConfig {
    /// Load configuration from environment variables.
    pub fn from_env() -> Self {
        let mut config = Self::default();

        if let Ok(val) = std::env::var("NBODY_HALO_COUNT_CHECK") {
            config.halo_count_check = HaloCountCheck::from_str(&val);
        }

        if let Ok(val) = std::env::var("NBODY_READ_BLOCK_RECORDS") {
            if let Ok(records) = val.parse() {
                config.read_block_records = records;
            }
        }

        config
    }

    /// Lenient configuration that keeps a zero-filled tail on count mismatch.
    pub fn lenient() -> Self {
        Self {
            halo_count_check: HaloCountCheck::Lenient,
            ..Self::default()
        }
    }

    /// Validate the configuration.
    pub fn validate(&self) -> Result<()> {
        if self.read_block_records == 0 {
            return Err(NbodyIoError::InvalidConfig(
                "read_block_records must be > 0".to_string(),
            ));
        }
        Ok(())
    }
}

/// Policy for `sum(n_halos_in_file) != n_halos_total`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum HaloCountCheck {
    /// Fail the read on any mismatch.
    #[default]
    Strict,
    /// Log a warning and return the partially filled catalog.
    Lenient,
}

impl HaloCountCheck {
    /// Parse from string, falling back to `Strict`.
    pub fn from_str(s: &str) -> Self {
        match s.trim().to_lowercase().as_str() {
            "lenient" | "warn" | "off" => Self::Lenient,
            _ => Self::Strict,
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Strict => "strict",
            Self::Lenient => "lenient",
        }
    }
}
