//! Regular grid binning.
//!
//! Splits a rectangular extent into square-ish cells. Cells are numbered
//! column-major: the cell in column `ix` and row `iy` has id `ix * ny + iy`.

use serde::{Deserialize, Serialize};

use crate::error::{ClusterError, Result};
use crate::{CoordLookup, PlanarPoint, UnitId};

/// Spherical Web Mercator earth radius in meters.
const EARTH_RADIUS: f64 = 6_378_137.0;

/// Project WGS84 longitude/latitude (degrees) to Web Mercator meters.
///
/// # Example
/// ```
/// use densitypeak::web_mercator;
/// let p = web_mercator(0.0, 0.0);
/// assert!(p.x.abs() < 1e-9 && p.y.abs() < 1e-9);
/// ```
pub fn web_mercator(lng: f64, lat: f64) -> PlanarPoint {
    let x = EARTH_RADIUS * lng.to_radians();
    let y = EARTH_RADIUS * (std::f64::consts::FRAC_PI_4 + lat.to_radians() / 2.0).tan().ln();
    PlanarPoint::new(x, y)
}

/// Rectangular extent of a grid.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct GridBounds {
    pub min_x: f64,
    pub min_y: f64,
    pub max_x: f64,
    pub max_y: f64,
}

impl GridBounds {
    pub fn new(min_x: f64, min_y: f64, max_x: f64, max_y: f64) -> Self {
        Self {
            min_x,
            min_y,
            max_x,
            max_y,
        }
    }

    /// Smallest bounds containing all points.
    pub fn from_points(points: &[PlanarPoint]) -> Option<Self> {
        if points.is_empty() {
            return None;
        }
        let mut bounds = Self::new(f64::MAX, f64::MAX, f64::MIN, f64::MIN);
        for p in points {
            bounds.min_x = bounds.min_x.min(p.x);
            bounds.min_y = bounds.min_y.min(p.y);
            bounds.max_x = bounds.max_x.max(p.x);
            bounds.max_y = bounds.max_y.max(p.y);
        }
        Some(bounds)
    }

    pub fn width(&self) -> f64 {
        self.max_x - self.min_x
    }

    pub fn height(&self) -> f64 {
        self.max_y - self.min_y
    }

    pub fn contains(&self, point: &PlanarPoint) -> bool {
        point.x >= self.min_x
            && point.x <= self.max_x
            && point.y >= self.min_y
            && point.y <= self.max_y
    }
}

/// A regular grid over a rectangular extent.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Grid {
    bounds: GridBounds,
    nx: u64,
    ny: u64,
    span_x: f64,
    span_y: f64,
}

impl Grid {
    /// Cover `bounds` with cells of roughly `cell_size` per side.
    ///
    /// The cell count per axis is rounded up, then cells are stretched to
    /// fit the extent exactly.
    pub fn new(bounds: GridBounds, cell_size: f64) -> Result<Self> {
        let coords = [bounds.min_x, bounds.min_y, bounds.max_x, bounds.max_y];
        if coords.iter().any(|c| !c.is_finite()) {
            return Err(invalid("bounds must be finite"));
        }
        if bounds.width() < 0.0 || bounds.height() < 0.0 {
            return Err(invalid("min corner must not exceed max corner"));
        }
        if !cell_size.is_finite() || cell_size <= 0.0 {
            return Err(invalid(format!(
                "cell size must be positive and finite (got {cell_size})"
            )));
        }

        let nx = ((bounds.width() / cell_size).ceil() as u64).max(1);
        let ny = ((bounds.height() / cell_size).ceil() as u64).max(1);
        if nx.checked_mul(ny).is_none() {
            return Err(invalid(format!(
                "{nx} x {ny} cells overflow the cell id range"
            )));
        }
        let span_x = bounds.width() / nx as f64;
        let span_y = bounds.height() / ny as f64;

        Ok(Self {
            bounds,
            nx,
            ny,
            span_x,
            span_y,
        })
    }

    pub fn bounds(&self) -> &GridBounds {
        &self.bounds
    }

    /// Number of columns and rows.
    pub fn dimensions(&self) -> (u64, u64) {
        (self.nx, self.ny)
    }

    pub fn cell_count(&self) -> u64 {
        self.nx * self.ny
    }

    /// All cell ids.
    pub fn cells(&self) -> impl Iterator<Item = UnitId> {
        0..self.cell_count()
    }

    /// Cell containing `point`, or `None` if it lies outside the grid.
    ///
    /// Points on the max edge belong to the last column/row.
    pub fn cell_of(&self, point: &PlanarPoint) -> Option<UnitId> {
        if !point.is_valid() || !self.bounds.contains(point) {
            return None;
        }
        let ix = axis_index(point.x - self.bounds.min_x, self.span_x, self.nx);
        let iy = axis_index(point.y - self.bounds.min_y, self.span_y, self.ny);
        Some(ix * self.ny + iy)
    }

    /// Center of a cell.
    pub fn centroid(&self, id: UnitId) -> Option<PlanarPoint> {
        if id >= self.cell_count() {
            return None;
        }
        let ix = id / self.ny;
        let iy = id % self.ny;
        Some(PlanarPoint::new(
            self.bounds.min_x + (ix as f64 + 0.5) * self.span_x,
            self.bounds.min_y + (iy as f64 + 0.5) * self.span_y,
        ))
    }
}

impl CoordLookup for Grid {
    fn coord_of(&self, id: UnitId) -> Option<PlanarPoint> {
        self.centroid(id)
    }
}

fn axis_index(offset: f64, span: f64, count: u64) -> u64 {
    if span <= 0.0 {
        return 0;
    }
    ((offset / span).floor() as u64).min(count - 1)
}

fn invalid(reason: impl Into<String>) -> ClusterError {
    ClusterError::InvalidGrid {
        reason: reason.into(),
    }
}
