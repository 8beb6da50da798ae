//! Trip demand counting.
//!
//! Turns gridded trips into the per-cell density fed to clustering, and,
//! once clusters exist, into per-unit demand per time bucket.

use log::info;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

use crate::cluster::ClusterResult;
use crate::error::{ClusterError, OptionExt, Result};
use crate::UnitId;

/// An occupied taxi trip with both endpoints already binned into cells.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct Trip {
    /// Unix timestamp (seconds) of the pickup
    pub pickup_time: i64,
    pub pickup_cell: UnitId,
    /// Unix timestamp (seconds) of the dropoff
    pub dropoff_time: i64,
    pub dropoff_cell: UnitId,
}

/// Pickup and dropoff counts of one unit in one time bucket.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct DemandBucket {
    /// Unix timestamp (seconds) where the bucket starts
    pub bucket_start: i64,
    /// Cluster center id
    pub unit: UnitId,
    pub pickups: u32,
    pub dropoffs: u32,
}

/// Bucket width in seconds for a width given in minutes.
pub fn bucket_secs(minutes: i64) -> Result<i64> {
    match minutes.checked_mul(60) {
        Some(secs) if secs > 0 => Ok(secs),
        _ => Err(ClusterError::InvalidBucketMinutes { minutes }),
    }
}

/// Count trip endpoints per cell: pickups plus dropoffs.
///
/// # Example
/// ```
/// use densitypeak::{cell_demand, Trip};
/// let trips = [
///     Trip { pickup_time: 0, pickup_cell: 1, dropoff_time: 600, dropoff_cell: 2 },
///     Trip { pickup_time: 60, pickup_cell: 2, dropoff_time: 900, dropoff_cell: 2 },
/// ];
/// let rho = cell_demand(&trips);
/// assert_eq!(rho[&1], 1.0);
/// assert_eq!(rho[&2], 3.0);
/// ```
pub fn cell_demand(trips: &[Trip]) -> BTreeMap<UnitId, f64> {
    let mut counts: BTreeMap<UnitId, f64> = BTreeMap::new();
    for trip in trips {
        *counts.entry(trip.pickup_cell).or_default() += 1.0;
        *counts.entry(trip.dropoff_cell).or_default() += 1.0;
    }
    counts
}

/// Aggregate trips into per-unit pickup/dropoff counts per time bucket.
///
/// Pickups are bucketed by pickup time, dropoffs by dropoff time, each
/// under the cluster center of its cell. Buckets are aligned to multiples
/// of `bucket_secs` since the epoch. Output is sorted by
/// `(bucket_start, unit)` and only contains non-empty buckets.
pub fn demand_series(
    trips: &[Trip],
    clusters: &ClusterResult,
    bucket_secs: i64,
) -> Result<Vec<DemandBucket>> {
    if bucket_secs <= 0 {
        return Err(ClusterError::InvalidBucket { bucket_secs });
    }

    let bucket_of = |t: i64| t.div_euclid(bucket_secs) * bucket_secs;
    let mut counts: BTreeMap<(i64, UnitId), (u32, u32)> = BTreeMap::new();

    for trip in trips {
        let pickup_unit = clusters
            .belong(trip.pickup_cell)
            .ok_or_unknown_unit(trip.pickup_cell)?;
        let dropoff_unit = clusters
            .belong(trip.dropoff_cell)
            .ok_or_unknown_unit(trip.dropoff_cell)?;

        counts
            .entry((bucket_of(trip.pickup_time), pickup_unit))
            .or_default()
            .0 += 1;
        counts
            .entry((bucket_of(trip.dropoff_time), dropoff_unit))
            .or_default()
            .1 += 1;
    }

    info!(
        "[Demand] Bucketed {} trips into {} unit/time buckets ({}s wide)",
        trips.len(),
        counts.len(),
        bucket_secs
    );

    Ok(counts
        .into_iter()
        .map(|((bucket_start, unit), (pickups, dropoffs))| DemandBucket {
            bucket_start,
            unit,
            pickups,
            dropoffs,
        })
        .collect())
}
