//! Incremental nearest-neighbor index.
//!
//! Uses an R-tree that only ever grows: points are inserted one at a time and
//! every query sees exactly the points inserted before it.

use rstar::{PointDistance, RTree, RTreeObject, AABB};

use crate::{PlanarPoint, UnitId};

/// A unit coordinate with its insertion rank for R-tree queries.
#[derive(Debug, Clone, Copy)]
struct IndexedUnit {
    rank: usize,
    id: UnitId,
    x: f64,
    y: f64,
}

impl RTreeObject for IndexedUnit {
    type Envelope = AABB<[f64; 2]>;

    fn envelope(&self) -> Self::Envelope {
        AABB::from_point([self.x, self.y])
    }
}

impl PointDistance for IndexedUnit {
    fn distance_2(&self, point: &[f64; 2]) -> f64 {
        let dx = self.x - point[0];
        let dy = self.y - point[1];
        dx * dx + dy * dy
    }
}

/// Result of a nearest-neighbor query.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Neighbor {
    /// Id of the closest inserted unit
    pub id: UnitId,
    /// Insertion rank of that unit (0 for the first insert)
    pub rank: usize,
    /// Euclidean distance to the query point
    pub distance: f64,
}

/// Monotonically growing 2-D point index.
///
/// Coincident points are allowed. When several inserted points are at the
/// same distance from a query, the one inserted first is returned.
///
/// Only the first point inserted at a given coordinate is stored: any later
/// one at the same spot loses every tie to it, so stacks of coincident
/// points cost nothing at query time.
#[derive(Debug)]
pub struct SpatialIndex {
    tree: RTree<IndexedUnit>,
    inserted: usize,
}

impl Default for SpatialIndex {
    fn default() -> Self {
        Self::new()
    }
}

impl SpatialIndex {
    /// Create a new empty spatial index.
    pub fn new() -> Self {
        Self {
            tree: RTree::new(),
            inserted: 0,
        }
    }

    /// Insert a unit coordinate. Its rank is the number of prior inserts.
    pub fn insert(&mut self, id: UnitId, point: PlanarPoint) {
        let rank = self.inserted;
        self.inserted += 1;

        if self.tree.locate_at_point(&point.to_array()).is_some() {
            return;
        }
        self.tree.insert(IndexedUnit {
            rank,
            id,
            x: point.x,
            y: point.y,
        });
    }

    /// Find the closest inserted point.
    ///
    /// Returns `None` only if nothing has been inserted yet.
    pub fn nearest(&self, point: PlanarPoint) -> Option<Neighbor> {
        let mut candidates = self
            .tree
            .nearest_neighbor_iter_with_distance_2(&point.to_array());

        let (first, best_d2) = candidates.next()?;
        let mut best = *first;

        // The iterator yields in ascending distance; scan the tied prefix
        for (candidate, d2) in candidates {
            if d2 > best_d2 {
                break;
            }
            if candidate.rank < best.rank {
                best = *candidate;
            }
        }

        Some(Neighbor {
            id: best.id,
            rank: best.rank,
            distance: best_d2.sqrt(),
        })
    }

    /// Get the number of inserted points, coincident ones included.
    pub fn len(&self) -> usize {
        self.inserted
    }

    /// Check if the index is empty.
    pub fn is_empty(&self) -> bool {
        self.inserted == 0
    }

    /// Number of distinct coordinates held by the tree.
    pub fn distinct_points(&self) -> usize {
        self.tree.size()
    }
}
