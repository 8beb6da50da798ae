//! Cluster center selection and label propagation.
//!
//! A unit is a center iff `rho >= rho_threshold && delta >= delta_threshold`.
//! Every other unit inherits the center of its `nneigh`. Because `nneigh`
//! always points to an earlier record in density order, walking the records
//! once in that order resolves everything.

use log::{debug, info};
use serde::{Deserialize, Serialize};
use std::collections::{BTreeMap, HashMap};

use crate::delta::{compute_delta, deserialize_delta, DeltaRecord, DeltaTable};
use crate::error::{ClusterError, Result};
use crate::{UnitId, UnitSet};

/// Label propagation strategy.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Propagation {
    /// One linear pass in density order.
    #[default]
    SinglePass,
    /// Repeated full scans until every unit is resolved. Slower; kept as an
    /// independent cross-check of the single pass.
    Fixpoint,
}

/// Thresholds for cluster center selection.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct ClusterConfig {
    /// Minimum rho for a center (inclusive).
    pub rho_threshold: f64,

    /// Minimum delta for a center (inclusive), in coordinate units.
    pub delta_threshold: f64,

    /// Propagation strategy. Default: single pass.
    #[serde(default)]
    pub propagation: Propagation,
}

impl ClusterConfig {
    pub fn new(rho_threshold: f64, delta_threshold: f64) -> Self {
        Self {
            rho_threshold,
            delta_threshold,
            propagation: Propagation::default(),
        }
    }

    pub fn with_propagation(mut self, propagation: Propagation) -> Self {
        self.propagation = propagation;
        self
    }

    /// Reject NaN thresholds, which would silently select nothing.
    pub fn validate(&self) -> Result<()> {
        if self.rho_threshold.is_nan() {
            return Err(ClusterError::InvalidThreshold {
                name: "rho_threshold",
                value: self.rho_threshold,
            });
        }
        if self.delta_threshold.is_nan() {
            return Err(ClusterError::InvalidThreshold {
                name: "delta_threshold",
                value: self.delta_threshold,
            });
        }
        Ok(())
    }

    /// Check whether a record qualifies as a cluster center.
    pub fn is_center(&self, record: &DeltaRecord) -> bool {
        record.rho >= self.rho_threshold && record.delta >= self.delta_threshold
    }
}

/// Flag the center records of `table`, in density order.
///
/// Fails with [`ClusterError::NoClusterCenter`] when nothing qualifies.
pub fn select_centers(table: &DeltaTable, config: &ClusterConfig) -> Result<Vec<bool>> {
    config.validate()?;

    let centers: Vec<bool> = table.records().iter().map(|r| config.is_center(r)).collect();
    let count = centers.iter().filter(|&&c| c).count();

    if count == 0 {
        return Err(ClusterError::NoClusterCenter {
            rho_threshold: config.rho_threshold,
            delta_threshold: config.delta_threshold,
        });
    }

    info!(
        "[Cluster] Selected {} centers out of {} units (rho >= {}, delta >= {})",
        count,
        table.len(),
        config.rho_threshold,
        config.delta_threshold
    );
    Ok(centers)
}

/// Resolve `belong` for every record in one pass over density order.
///
/// `centers` holds one flag per record of `table`. Returns the center id of
/// each record, in density order.
pub fn propagate(table: &DeltaTable, centers: &[bool]) -> Result<Vec<UnitId>> {
    check_flags(table, centers)?;

    let records = table.records();
    let mut belong: Vec<UnitId> = Vec::with_capacity(records.len());

    for (i, record) in records.iter().enumerate() {
        if centers[i] {
            belong.push(record.id);
            continue;
        }
        // The parent must already be resolved, i.e. strictly earlier
        match table.parent(i).filter(|&p| p < i) {
            Some(p) => {
                let center = belong[p];
                belong.push(center);
            }
            None => {
                return Err(ClusterError::PropagationStall {
                    unit: record.id,
                    unresolved: records.len() - i,
                });
            }
        }
    }

    Ok(belong)
}

/// Resolve `belong` by repeated full scans until nothing is left.
///
/// Each round reads only labels resolved in earlier rounds. A round that
/// resolves nothing while units remain is a [`ClusterError::PropagationStall`].
pub fn propagate_fixpoint(table: &DeltaTable, centers: &[bool]) -> Result<Vec<UnitId>> {
    check_flags(table, centers)?;

    let records = table.records();
    let mut belong: Vec<Option<UnitId>> = records
        .iter()
        .zip(centers)
        .map(|(r, &is_center)| is_center.then_some(r.id))
        .collect();

    let mut unresolved = belong.iter().filter(|b| b.is_none()).count();
    let mut round = 0;

    while unresolved > 0 {
        round += 1;
        let previous = belong.clone();

        for (i, slot) in belong.iter_mut().enumerate() {
            if slot.is_none() {
                *slot = table.parent(i).and_then(|p| previous[p]);
            }
        }

        let remaining = belong.iter().filter(|b| b.is_none()).count();
        debug!(
            "[Cluster] Fixpoint round {}: {} of {} units resolved",
            round,
            records.len() - remaining,
            records.len()
        );

        if remaining == unresolved {
            let stuck = belong.iter().position(|b| b.is_none()).unwrap_or(0);
            return Err(ClusterError::PropagationStall {
                unit: records[stuck].id,
                unresolved: remaining,
            });
        }
        unresolved = remaining;
    }

    Ok(belong.into_iter().flatten().collect())
}

fn check_flags(table: &DeltaTable, centers: &[bool]) -> Result<()> {
    if centers.len() != table.len() {
        return Err(ClusterError::CenterFlagMismatch {
            expected: table.len(),
            got: centers.len(),
        });
    }
    Ok(())
}

// ============================================================================
// Results
// ============================================================================

/// One row of the clustering output.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct ClusteredUnit {
    pub id: UnitId,
    pub rho: f64,
    #[serde(deserialize_with = "deserialize_delta")]
    pub delta: f64,
    pub nneigh: Option<UnitId>,
    /// Id of the center this unit is assigned to (`id` itself for centers)
    pub belong: UnitId,
    pub is_center: bool,
}

/// Output of a clustering run, in density order.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(from = "SavedClusterResult")]
pub struct ClusterResult {
    config: ClusterConfig,
    units: Vec<ClusteredUnit>,
    centers: Vec<UnitId>,
    #[serde(skip)]
    positions: HashMap<UnitId, usize>,
}

/// Serialized form of [`ClusterResult`]; the id lookup is rebuilt on load.
#[derive(Deserialize)]
struct SavedClusterResult {
    config: ClusterConfig,
    units: Vec<ClusteredUnit>,
    centers: Vec<UnitId>,
}

impl From<SavedClusterResult> for ClusterResult {
    fn from(saved: SavedClusterResult) -> Self {
        let positions = unit_positions(&saved.units);
        Self {
            config: saved.config,
            units: saved.units,
            centers: saved.centers,
            positions,
        }
    }
}

fn unit_positions(units: &[ClusteredUnit]) -> HashMap<UnitId, usize> {
    units.iter().enumerate().map(|(i, u)| (u.id, i)).collect()
}

impl ClusterResult {
    fn new(config: ClusterConfig, table: &DeltaTable, flags: &[bool], belong: Vec<UnitId>) -> Self {
        let units: Vec<ClusteredUnit> = table
            .records()
            .iter()
            .zip(flags)
            .zip(belong)
            .map(|((r, &is_center), belong)| ClusteredUnit {
                id: r.id,
                rho: r.rho,
                delta: r.delta,
                nneigh: r.nneigh,
                belong,
                is_center,
            })
            .collect();

        let centers = units.iter().filter(|u| u.is_center).map(|u| u.id).collect();
        let positions = unit_positions(&units);

        Self {
            config,
            units,
            centers,
            positions,
        }
    }

    /// Thresholds this result was produced with.
    pub fn config(&self) -> &ClusterConfig {
        &self.config
    }

    /// All rows in density order.
    pub fn units(&self) -> &[ClusteredUnit] {
        &self.units
    }

    /// Center ids in density order.
    pub fn centers(&self) -> &[UnitId] {
        &self.centers
    }

    pub fn len(&self) -> usize {
        self.units.len()
    }

    pub fn is_empty(&self) -> bool {
        self.units.is_empty()
    }

    pub fn get(&self, id: UnitId) -> Option<&ClusteredUnit> {
        self.positions.get(&id).map(|&i| &self.units[i])
    }

    /// Center a unit is assigned to.
    pub fn belong(&self, id: UnitId) -> Option<UnitId> {
        self.get(id).map(|u| u.belong)
    }

    /// Ids assigned to `center` (including the center), in density order.
    pub fn members(&self, center: UnitId) -> Vec<UnitId> {
        self.units
            .iter()
            .filter(|u| u.belong == center)
            .map(|u| u.id)
            .collect()
    }

    /// Number of units per center.
    pub fn cluster_sizes(&self) -> BTreeMap<UnitId, usize> {
        let mut sizes: BTreeMap<UnitId, usize> = BTreeMap::new();
        for unit in &self.units {
            *sizes.entry(unit.belong).or_default() += 1;
        }
        sizes
    }

    /// `id -> belong` for every unit.
    pub fn belong_map(&self) -> HashMap<UnitId, UnitId> {
        self.units.iter().map(|u| (u.id, u.belong)).collect()
    }
}

// ============================================================================
// Driver
// ============================================================================

/// Density-peak clustering over a fixed set of units.
///
/// The delta pass runs once on construction; [`cluster`](Self::cluster) can
/// then be called with any number of threshold combinations.
#[derive(Debug, Clone)]
pub struct DensityPeakCluster {
    table: DeltaTable,
}

impl DensityPeakCluster {
    pub fn new(units: UnitSet) -> Self {
        Self {
            table: compute_delta(&units),
        }
    }

    /// Wrap a previously computed delta table.
    pub fn from_table(table: DeltaTable) -> Self {
        Self { table }
    }

    pub fn table(&self) -> &DeltaTable {
        &self.table
    }

    /// Select centers and assign every unit to one.
    pub fn cluster(&self, config: &ClusterConfig) -> Result<ClusterResult> {
        let flags = select_centers(&self.table, config)?;

        let belong = match config.propagation {
            Propagation::SinglePass => propagate(&self.table, &flags)?,
            Propagation::Fixpoint => propagate_fixpoint(&self.table, &flags)?,
        };

        let result = ClusterResult::new(*config, &self.table, &flags, belong);
        info!(
            "[Cluster] Assigned {} units to {} clusters",
            result.len(),
            result.centers().len()
        );
        Ok(result)
    }
}
