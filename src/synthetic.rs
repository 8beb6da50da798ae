//! Synthetic demand generator for stress testing and benchmarking.
//!
//! Lays a grid over a square extent and scores every cell with a sum of
//! Gaussian hotspots plus uniform noise, giving demand surfaces with known
//! peaks.
//!
//! Feature-gated behind `synthetic`.
//!
//! # Example
//!
//! ```rust
//! use densitypeak::synthetic::DemandScenario;
//!
//! let scenario = DemandScenario::city(20, 3, 42);
//! let demand = scenario.generate().unwrap();
//! assert_eq!(demand.units.len(), 400);
//! assert_eq!(demand.hotspot_cells.len(), 3);
//! ```

use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};

use crate::error::Result;
use crate::grid::{Grid, GridBounds};
use crate::{PlanarPoint, Unit, UnitId, UnitSet};

/// A Gaussian demand bump.
#[derive(Debug, Clone, Copy)]
pub struct Hotspot {
    pub center: PlanarPoint,
    /// Demand added at the center
    pub peak: f64,
    /// Standard deviation of the bump, in coordinate units
    pub radius: f64,
}

/// Scenario configuration for generating synthetic demand.
#[derive(Debug, Clone)]
pub struct DemandScenario {
    pub bounds: GridBounds,
    pub cell_size: f64,
    pub hotspots: Vec<Hotspot>,
    /// Upper bound of the uniform background noise per cell
    pub noise: f64,
    /// RNG seed for deterministic reproduction.
    pub seed: u64,
}

/// Generated units with ground truth.
pub struct SyntheticDemand {
    pub grid: Grid,
    pub units: UnitSet,
    /// Cell containing each hotspot center, in hotspot order
    pub hotspot_cells: Vec<UnitId>,
}

impl DemandScenario {
    /// A `side` x `side` grid of unit cells with `hotspots` randomly placed
    /// peaks.
    pub fn city(side: u64, hotspots: usize, seed: u64) -> Self {
        let extent = side as f64;
        let mut rng = StdRng::seed_from_u64(seed);

        let hotspots = (0..hotspots)
            .map(|_| Hotspot {
                center: PlanarPoint::new(
                    rng.gen_range(0.0..extent),
                    rng.gen_range(0.0..extent),
                ),
                peak: rng.gen_range(500.0..1000.0),
                radius: (extent / 20.0).max(1.0),
            })
            .collect();

        Self {
            bounds: GridBounds::new(0.0, 0.0, extent, extent),
            cell_size: 1.0,
            hotspots,
            noise: 5.0,
            seed,
        }
    }

    pub fn generate(&self) -> Result<SyntheticDemand> {
        let grid = Grid::new(self.bounds, self.cell_size)?;
        let mut rng = StdRng::seed_from_u64(self.seed.wrapping_add(1));

        let units = grid
            .cells()
            .filter_map(|id| grid.centroid(id).map(|c| (id, c)))
            .map(|(id, coord)| {
                let background = if self.noise > 0.0 {
                    rng.gen_range(0.0..self.noise)
                } else {
                    0.0
                };
                Unit::new(id, coord, self.demand_at(&coord) + background)
            })
            .collect();

        let hotspot_cells = self
            .hotspots
            .iter()
            .filter_map(|h| grid.cell_of(&h.center))
            .collect();

        Ok(SyntheticDemand {
            units: UnitSet::new(units)?,
            grid,
            hotspot_cells,
        })
    }

    /// Noise-free demand at a point.
    fn demand_at(&self, point: &PlanarPoint) -> f64 {
        self.hotspots
            .iter()
            .map(|h| {
                let d = h.center.distance(point);
                h.peak * (-(d * d) / (2.0 * h.radius * h.radius)).exp()
            })
            .sum()
    }
}
