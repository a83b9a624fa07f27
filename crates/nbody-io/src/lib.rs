//! Readers for gbpCode N-body output.
//!
//! This crate reads two binary formats written by the gbpCode halo finding
//! pipeline:
//!
//! - **Grid files**: a sequence of named 3D `f32` grids (dark matter density and
//!   velocity components) sharing one set of dimensions.
//! - **Halo catalogs**: fixed-size halo records split across any number of
//!   per-process shard files.
//!
//! Both formats are little-endian. Readers are synchronous and hold a file
//! handle only for the duration of a call.
//!
//! # Example
//!
//! ```ignore
//! use nbody_io::{read_grid, read_halo_catalog};
//!
//! let density = read_grid("grids/snapshot_063.grid", "density")?;
//! println!("{:?}", density.shape());
//!
//! // A directory of `<prefix>.<n>` shards, read in numeric order
//! let catalog = read_halo_catalog("catalogs/subfind_063.catalog_groups_properties")?;
//! for halo in catalog.iter().take(10) {
//!     println!("{} {}", halo.id_mbp, halo.m_vir);
//! }
//! ```

mod binary;
pub mod catalog;
pub mod config;
pub mod error;
pub mod grid;
pub mod tree_flags;

// Re-export commonly used types at crate root
pub use catalog::{
    discover_shards, read_catalog_header, read_halo_catalog, read_halo_catalog_with,
    shard_index, CatalogHeader, CatalogSource, HaloCatalog, HaloCatalogReader, HaloRecord,
    ShardSummary, HALO_RECORD_BYTES,
};
pub use config::{HaloCountCheck, ReaderConfig};
pub use error::{NbodyIoError, Result};
pub use grid::{
    list_grids, read_grid, read_grid_header, read_grid_named, Grid, GridEntry, GridHeader,
    GridName, GridReader,
};
pub use tree_flags::TreeFlags;
