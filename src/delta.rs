//! Delta computation.
//!
//! Units are visited in density order (rho descending, id ascending). Each
//! unit is queried against an index holding every unit visited before it,
//! then inserted. The query yields `delta`, the distance to the nearest
//! earlier (equal or denser) unit, and `nneigh`, that unit's id.
//!
//! The visit order is the reproducibility contract of the whole clustering:
//! `nneigh` always points to an earlier record, which is what lets label
//! propagation finish in a single pass.

use log::{debug, info};
#[cfg(feature = "parallel")]
use rayon::prelude::*;
use serde::{Deserialize, Deserializer, Serialize};
use std::cmp::Ordering;
use std::collections::HashMap;

use crate::error::{ClusterError, OptionExt, Result};
use crate::spatial_index::SpatialIndex;
use crate::{PlanarPoint, Unit, UnitId, UnitSet};

/// Per-unit output of the delta pass.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct DeltaRecord {
    pub id: UnitId,
    pub coord: PlanarPoint,
    pub rho: f64,
    /// Distance to the nearest earlier unit (`+inf` for the densest unit)
    #[serde(deserialize_with = "deserialize_delta")]
    pub delta: f64,
    /// Id of that unit (`None` for the densest unit)
    pub nneigh: Option<UnitId>,
}

/// Delta records in density order.
#[derive(Debug, Clone)]
pub struct DeltaTable {
    records: Vec<DeltaRecord>,
    /// Position of each record's `nneigh` within `records`
    parents: Vec<Option<usize>>,
    positions: HashMap<UnitId, usize>,
}

/// Read a delta back, mapping `null` (how JSON writes `+inf`) to `+inf`.
pub(crate) fn deserialize_delta<'de, D>(deserializer: D) -> std::result::Result<f64, D::Error>
where
    D: Deserializer<'de>,
{
    Ok(Option::<f64>::deserialize(deserializer)?.unwrap_or(f64::INFINITY))
}

/// Compare two units by density order: rho descending, then id ascending.
fn density_cmp(a: &Unit, b: &Unit) -> Ordering {
    b.rho
        .partial_cmp(&a.rho)
        .unwrap_or(Ordering::Equal)
        .then(a.id.cmp(&b.id))
}

/// Positions of `units` sorted into density order.
///
/// The comparator is total over validated units (ids are unique), so the
/// result does not depend on the sort algorithm.
pub fn density_order(units: &[Unit]) -> Vec<usize> {
    let mut order: Vec<usize> = (0..units.len()).collect();

    #[cfg(feature = "parallel")]
    order.par_sort_unstable_by(|&a, &b| density_cmp(&units[a], &units[b]));

    #[cfg(not(feature = "parallel"))]
    order.sort_unstable_by(|&a, &b| density_cmp(&units[a], &units[b]));

    order
}

/// Compute `delta` and `nneigh` for every unit.
pub fn compute_delta(units: &UnitSet) -> DeltaTable {
    info!("[Delta] Computing delta for {} units", units.len());

    let slice = units.as_slice();
    let order = density_order(slice);

    let mut index = SpatialIndex::new();
    let mut records = Vec::with_capacity(order.len());
    let mut parents = Vec::with_capacity(order.len());

    for &pos in &order {
        let unit = &slice[pos];

        // Query before inserting: only earlier units are visible
        let (delta, nneigh, parent) = match index.nearest(unit.coord) {
            Some(n) => (n.distance, Some(n.id), Some(n.rank)),
            None => (f64::INFINITY, None, None),
        };
        index.insert(unit.id, unit.coord);

        records.push(DeltaRecord {
            id: unit.id,
            coord: unit.coord,
            rho: unit.rho,
            delta,
            nneigh,
        });
        parents.push(parent);
    }

    if let Some(peak) = records.first() {
        debug!(
            "[Delta] Densest unit {} (rho={}) at ({}, {})",
            peak.id, peak.rho, peak.coord.x, peak.coord.y
        );
    }
    info!(
        "[Delta] Done, indexed {} points ({} distinct coordinates)",
        index.len(),
        index.distinct_points()
    );

    let positions = records
        .iter()
        .enumerate()
        .map(|(i, r)| (r.id, i))
        .collect();

    DeltaTable {
        records,
        parents,
        positions,
    }
}

impl DeltaTable {
    /// Rebuild a table from records previously produced by [`compute_delta`].
    ///
    /// Records must be in density order. Only id consistency is checked here;
    /// a chain that does not point backwards is reported later by propagation.
    pub fn from_records(records: Vec<DeltaRecord>) -> Result<Self> {
        let mut positions = HashMap::with_capacity(records.len());
        for (i, record) in records.iter().enumerate() {
            if positions.insert(record.id, i).is_some() {
                return Err(ClusterError::DuplicateUnit { unit: record.id });
            }
        }

        let parents = records
            .iter()
            .map(|r| match r.nneigh {
                Some(n) => positions.get(&n).copied().ok_or_unknown_unit(n).map(Some),
                None => Ok(None),
            })
            .collect::<Result<Vec<_>>>()?;

        Ok(Self {
            records,
            parents,
            positions,
        })
    }

    pub fn len(&self) -> usize {
        self.records.len()
    }

    pub fn is_empty(&self) -> bool {
        self.records.is_empty()
    }

    /// Records in density order.
    pub fn records(&self) -> &[DeltaRecord] {
        &self.records
    }

    pub fn get(&self, id: UnitId) -> Option<&DeltaRecord> {
        self.positions.get(&id).map(|&i| &self.records[i])
    }

    /// Position of a unit in density order.
    pub fn position(&self, id: UnitId) -> Option<usize> {
        self.positions.get(&id).copied()
    }

    /// Position of the record's `nneigh`, if any.
    pub(crate) fn parent(&self, position: usize) -> Option<usize> {
        self.parents[position]
    }

    /// The densest unit under the tie-break order.
    pub fn peak(&self) -> Option<&DeltaRecord> {
        self.records.first()
    }

    /// `(id, rho, delta)` for every unit, in density order.
    ///
    /// Cluster centers stand out as points with both large rho and large
    /// delta, which is how thresholds are usually picked.
    pub fn decision_graph(&self) -> Vec<(UnitId, f64, f64)> {
        self.records.iter().map(|r| (r.id, r.rho, r.delta)).collect()
    }
}
