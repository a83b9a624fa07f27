//! Summaries printed by the inspection commands.

use std::fmt;
use std::path::PathBuf;

use nbody_io::{Grid, GridEntry, HaloCatalog, ShardSummary};
use serde::Serialize;

/// Basic statistics over a set of values.
#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct Stats {
    pub count: usize,
    pub min: f64,
    pub max: f64,
    pub mean: f64,
}

impl Stats {
    /// Statistics over finite values; `None` if there are none.
    pub fn from_values<I: IntoIterator<Item = f64>>(values: I) -> Option<Self> {
        let mut count = 0usize;
        let mut min = f64::INFINITY;
        let mut max = f64::NEG_INFINITY;
        let mut sum = 0.0;

        for v in values.into_iter().filter(|v| v.is_finite()) {
            count += 1;
            min = min.min(v);
            max = max.max(v);
            sum += v;
        }

        (count > 0).then(|| Self {
            count,
            min,
            max,
            mean: sum / count as f64,
        })
    }
}

#[derive(Debug, Clone, Serialize)]
pub struct GridSummary {
    pub name: String,
    pub identifier: &'static str,
    pub shape: [usize; 3],
    pub box_size: [f64; 3],
    pub mass_assignment_scheme: i32,
    pub stats: Option<Stats>,
}

impl GridSummary {
    pub fn from_grid(grid: &Grid) -> Self {
        let header = grid.header();
        Self {
            name: grid.name().to_string(),
            identifier: grid.name().identifier(),
            shape: header.cell_counts,
            box_size: header.box_size,
            mass_assignment_scheme: header.mass_assignment_scheme,
            stats: Stats::from_values(grid.data().iter().map(|&v| v as f64)),
        }
    }
}

impl fmt::Display for GridSummary {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        writeln!(f, "grid:      {} ({})", self.name, self.identifier)?;
        writeln!(
            f,
            "shape:     {} x {} x {}",
            self.shape[0], self.shape[1], self.shape[2]
        )?;
        writeln!(
            f,
            "box size:  {} x {} x {}",
            self.box_size[0], self.box_size[1], self.box_size[2]
        )?;
        writeln!(f, "scheme:    {}", self.mass_assignment_scheme)?;
        match &self.stats {
            Some(s) => write!(
                f,
                "values:    min {:.6e}  max {:.6e}  mean {:.6e}",
                s.min, s.max, s.mean
            ),
            None => write!(f, "values:    none finite"),
        }
    }
}

#[derive(Debug, Clone, Serialize)]
pub struct GridListing {
    pub path: PathBuf,
    pub grids: Vec<GridEntry>,
}

impl fmt::Display for GridListing {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        writeln!(f, "{}", self.path.display())?;
        for entry in &self.grids {
            let name = entry.grid_name().map(|n| n.as_str()).unwrap_or("-");
            writeln!(
                f,
                "  {:>3}  {:<32} {:<8} offset {}",
                entry.index, entry.identifier, name, entry.data_offset
            )?;
        }
        Ok(())
    }
}

#[derive(Debug, Clone, Serialize)]
pub struct CatalogSummary {
    pub n_halos: usize,
    pub n_halos_read: usize,
    pub shards: Vec<ShardSummary>,
    pub m_vir: Option<Stats>,
    pub n_particles: Option<Stats>,
}

impl CatalogSummary {
    pub fn from_catalog(catalog: &HaloCatalog) -> Self {
        let filled = &catalog.halos()[..catalog.n_halos_read()];
        Self {
            n_halos: catalog.len(),
            n_halos_read: catalog.n_halos_read(),
            shards: catalog.shards().to_vec(),
            m_vir: Stats::from_values(filled.iter().map(|h| h.m_vir)),
            n_particles: Stats::from_values(filled.iter().map(|h| h.n_particles as f64)),
        }
    }
}

impl fmt::Display for CatalogSummary {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        writeln!(f, "halos:     {} ({} read)", self.n_halos, self.n_halos_read)?;
        writeln!(f, "shards:    {}", self.shards.len())?;
        for shard in &self.shards {
            writeln!(
                f,
                "  [{:>4}] {:>10} halos  {}",
                shard.file_index,
                shard.n_halos,
                shard.path.display()
            )?;
        }
        if let Some(m) = &self.m_vir {
            writeln!(f, "M_vir:     min {:.4e}  max {:.4e}  mean {:.4e}", m.min, m.max, m.mean)?;
        }
        if let Some(n) = &self.n_particles {
            write!(f, "particles: min {}  max {}", n.min, n.max)?;
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use nbody_io::{read_grid, read_halo_catalog};
    use test_utils::{assert_approx_eq, identifiers, temp_test_dir, write_catalog_shards, GridFileBuilder};

    #[test]
    fn test_stats() {
        let stats = Stats::from_values([1.0, 2.0, f64::NAN, 6.0]).unwrap();
        assert_eq!(stats.count, 3);
        assert_eq!(stats.min, 1.0);
        assert_eq!(stats.max, 6.0);
        assert_approx_eq!(stats.mean, 3.0, 1e-12);
        assert!(Stats::from_values(Vec::<f64>::new()).is_none());
    }

    #[test]
    fn test_grid_summary() {
        let dir = temp_test_dir();
        let path = dir.path().join("g.grid");
        GridFileBuilder::new([2, 2, 1])
            .grid(identifiers::DENSITY, vec![0.5, 1.5, 2.5, 3.5])
            .write_to(&path)
            .unwrap();

        let summary = GridSummary::from_grid(&read_grid(&path, "density").unwrap());
        assert_eq!(summary.shape, [2, 2, 1]);
        assert_eq!(summary.identifier, "rho_r_dark");
        let stats = summary.stats.unwrap();
        assert_approx_eq!(stats.mean, 2.0, 1e-9);
        assert!(summary.to_string().contains("density (rho_r_dark)"));
    }

    #[test]
    fn test_catalog_summary_json() {
        let dir = temp_test_dir();
        write_catalog_shards(dir.path(), "catalog", &[2, 3]).unwrap();
        let summary = CatalogSummary::from_catalog(&read_halo_catalog(dir.path()).unwrap());

        assert_eq!(summary.n_halos, 5);
        assert_eq!(summary.shards.len(), 2);
        assert_eq!(summary.n_particles.unwrap().min, 32.0);

        let json = serde_json::to_value(&summary).unwrap();
        assert_eq!(json["n_halos"], 5);
        assert_eq!(json["shards"][1]["n_halos"], 3);
    }
}
