//! # densitypeak
//!
//! Density-peak clustering of gridded demand into spatial units.
//!
//! This library provides:
//! - An incrementally growing nearest-neighbor index over planar points
//! - Per-unit `delta`/`nneigh` computation in a fixed density order
//! - Cluster center selection and label propagation
//! - Regular grid binning and trip demand counting to feed the clustering
//!
//! ## Features
//!
//! - **`parallel`** - Sort units by density with rayon
//! - **`synthetic`** - Seeded synthetic demand generator for benchmarks
//! - **`cli`** - Build the `densitypeak-cli` binary
//!
//! ## Quick Start
//!
//! ```rust
//! use std::collections::HashMap;
//! use densitypeak::{ClusterConfig, DensityPeakCluster, PlanarPoint, UnitId, UnitSet};
//!
//! let coords: HashMap<UnitId, PlanarPoint> = HashMap::from([
//!     (0, PlanarPoint::new(0.0, 0.0)),
//!     (1, PlanarPoint::new(1.0, 0.0)),
//!     (2, PlanarPoint::new(5.0, 5.0)),
//!     (3, PlanarPoint::new(5.0, 6.0)),
//! ]);
//! let rho = vec![(0, 10.0), (1, 5.0), (2, 8.0), (3, 3.0)];
//!
//! let units = UnitSet::from_parts(rho, &coords).unwrap();
//! let dpc = DensityPeakCluster::new(units);
//! let result = dpc.cluster(&ClusterConfig::new(7.0, 0.5)).unwrap();
//!
//! assert_eq!(result.centers(), &[0, 2]);
//! assert_eq!(result.belong(3), Some(2));
//! ```

use serde::{Deserialize, Serialize};
use std::collections::{BTreeMap, HashMap, HashSet};
use std::hash::BuildHasher;

// Unified error handling
pub mod error;
pub use error::{ClusterError, ErrorKind, OptionExt, Result};

// Incremental nearest-neighbor index
pub mod spatial_index;
pub use spatial_index::{Neighbor, SpatialIndex};

// Density ordering and delta/nneigh computation
pub mod delta;
pub use delta::{compute_delta, density_order, DeltaRecord, DeltaTable};

// Center selection and label propagation
pub mod cluster;
pub use cluster::{
    propagate, propagate_fixpoint, select_centers, ClusterConfig, ClusterResult, ClusteredUnit,
    DensityPeakCluster, Propagation,
};

// Regular grid binning
pub mod grid;
pub use grid::{web_mercator, Grid, GridBounds};

// Trip demand counting and time bucketing
pub mod demand;
pub use demand::{bucket_secs, cell_demand, demand_series, DemandBucket, Trip};

// Synthetic demand for benchmarks and stress tests
#[cfg(feature = "synthetic")]
pub mod synthetic;

// ============================================================================
// Core Types
// ============================================================================

/// Identifier of a spatial unit (typically a grid cell index).
///
/// Ids are the secondary sort key when two units have equal density, so they
/// must be unique and stable across runs.
pub type UnitId = u64;

/// A coordinate in a projected, planar reference system.
///
/// # Example
/// ```
/// use densitypeak::PlanarPoint;
/// let a = PlanarPoint::new(0.0, 0.0);
/// let b = PlanarPoint::new(3.0, 4.0);
/// assert_eq!(a.distance(&b), 5.0);
/// ```
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct PlanarPoint {
    pub x: f64,
    pub y: f64,
}

impl PlanarPoint {
    pub fn new(x: f64, y: f64) -> Self {
        Self { x, y }
    }

    /// Check that both components are finite.
    pub fn is_valid(&self) -> bool {
        self.x.is_finite() && self.y.is_finite()
    }

    /// Euclidean distance to another point.
    pub fn distance(&self, other: &PlanarPoint) -> f64 {
        let dx = self.x - other.x;
        let dy = self.y - other.y;
        (dx * dx + dy * dy).sqrt()
    }

    /// The point as an `[x, y]` array (R-tree point representation).
    pub fn to_array(self) -> [f64; 2] {
        [self.x, self.y]
    }
}

impl From<(f64, f64)> for PlanarPoint {
    fn from((x, y): (f64, f64)) -> Self {
        Self::new(x, y)
    }
}

/// One spatial cell with its demand score.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Unit {
    pub id: UnitId,
    pub coord: PlanarPoint,
    /// Density/demand score, finite and non-negative
    pub rho: f64,
}

impl Unit {
    pub fn new(id: UnitId, coord: PlanarPoint, rho: f64) -> Self {
        Self { id, coord, rho }
    }
}

/// Coordinate lookup keyed by unit id.
///
/// This is the data-access seam between the loader and the clustering core:
/// every id that carries a density must resolve to a coordinate here.
pub trait CoordLookup {
    fn coord_of(&self, id: UnitId) -> Option<PlanarPoint>;
}

impl<S: BuildHasher> CoordLookup for HashMap<UnitId, PlanarPoint, S> {
    fn coord_of(&self, id: UnitId) -> Option<PlanarPoint> {
        self.get(&id).copied()
    }
}

impl CoordLookup for BTreeMap<UnitId, PlanarPoint> {
    fn coord_of(&self, id: UnitId) -> Option<PlanarPoint> {
        self.get(&id).copied()
    }
}

/// Collect `(id, coordinate)` rows into a lookup, rejecting repeated ids.
pub fn coord_map<I>(cells: I) -> Result<HashMap<UnitId, PlanarPoint>>
where
    I: IntoIterator<Item = (UnitId, PlanarPoint)>,
{
    let cells = cells.into_iter();
    let mut coords = HashMap::with_capacity(cells.size_hint().0);
    for (id, coord) in cells {
        if coords.insert(id, coord).is_some() {
            return Err(ClusterError::DuplicateUnit { unit: id });
        }
    }
    Ok(coords)
}

// ============================================================================
// Validated Input
// ============================================================================

/// A validated collection of units, ready for clustering.
///
/// Construction fails fast on the first malformed unit; a `UnitSet` therefore
/// always has unique ids, finite non-negative densities and finite
/// coordinates.
#[derive(Debug, Clone, Default, Serialize)]
pub struct UnitSet {
    units: Vec<Unit>,
}

impl UnitSet {
    /// Validate a list of units.
    pub fn new(units: Vec<Unit>) -> Result<Self> {
        let mut seen: HashSet<UnitId> = HashSet::with_capacity(units.len());
        let mut validated = Vec::with_capacity(units.len());

        for unit in units {
            if !seen.insert(unit.id) {
                return Err(ClusterError::DuplicateUnit { unit: unit.id });
            }
            let rho = validate_rho(unit.id, unit.rho)?;
            validate_coord(unit.id, &unit.coord)?;
            validated.push(Unit { rho, ..unit });
        }

        Ok(Self { units: validated })
    }

    /// Build units from a density mapping and a coordinate lookup.
    ///
    /// Every id in `rho` must be known to `coords`.
    pub fn from_parts<I, C>(rho: I, coords: &C) -> Result<Self>
    where
        I: IntoIterator<Item = (UnitId, f64)>,
        C: CoordLookup + ?Sized,
    {
        let units = rho
            .into_iter()
            .map(|(id, rho)| {
                let coord = coords.coord_of(id).ok_or_missing_coordinate(id)?;
                Ok(Unit::new(id, coord, rho))
            })
            .collect::<Result<Vec<_>>>()?;
        Self::new(units)
    }

    pub fn len(&self) -> usize {
        self.units.len()
    }

    pub fn is_empty(&self) -> bool {
        self.units.is_empty()
    }

    /// Units in loader order.
    pub fn as_slice(&self) -> &[Unit] {
        &self.units
    }

    pub fn iter(&self) -> std::slice::Iter<'_, Unit> {
        self.units.iter()
    }
}

impl<'a> IntoIterator for &'a UnitSet {
    type Item = &'a Unit;
    type IntoIter = std::slice::Iter<'a, Unit>;

    fn into_iter(self) -> Self::IntoIter {
        self.units.iter()
    }
}

fn validate_rho(unit: UnitId, rho: f64) -> Result<f64> {
    if !rho.is_finite() || rho < 0.0 {
        return Err(ClusterError::InvalidRho { unit, rho });
    }
    // Fold -0.0 into 0.0 so it prints and serializes like any other zero
    Ok(if rho == 0.0 { 0.0 } else { rho })
}

fn validate_coord(unit: UnitId, coord: &PlanarPoint) -> Result<()> {
    if !coord.is_valid() {
        return Err(ClusterError::InvalidCoordinate {
            unit,
            x: coord.x,
            y: coord.y,
        });
    }
    Ok(())
}
