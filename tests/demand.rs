//! Tests for trip demand counting and time bucketing

use densitypeak::{
    bucket_secs, cell_demand, demand_series, ClusterConfig, ClusterError, ClusterResult,
    DemandBucket, DensityPeakCluster, ErrorKind, Grid, GridBounds, Trip, UnitSet,
};

const QUARTER_HOUR: i64 = 15 * 60;

fn trip(pickup_time: i64, pickup_cell: u64, dropoff_time: i64, dropoff_cell: u64) -> Trip {
    Trip {
        pickup_time,
        pickup_cell,
        dropoff_time,
        dropoff_cell,
    }
}

/// A 4x1 strip of cells. Cells 0 and 3 are busy, 1 and 2 quiet, so the
/// clustering yields two units: {0, 1} around 0 and {2, 3} around 3.
fn strip_trips() -> Vec<Trip> {
    vec![
        trip(0, 0, 600, 3),
        trip(100, 0, 700, 3),
        trip(200, 3, 1000, 0),
        trip(950, 1, 1500, 2),
        trip(1000, 0, 1900, 0),
    ]
}

fn strip_clusters(trips: &[Trip]) -> ClusterResult {
    let grid = Grid::new(GridBounds::new(0.0, 0.0, 4.0, 1.0), 1.0).unwrap();
    let units = UnitSet::from_parts(cell_demand(trips), &grid).unwrap();
    DensityPeakCluster::new(units)
        .cluster(&ClusterConfig::new(3.0, 2.0))
        .unwrap()
}

#[test]
fn test_cell_demand_counts_both_endpoints() {
    let rho = cell_demand(&strip_trips());

    assert_eq!(rho.get(&0), Some(&5.0));
    assert_eq!(rho.get(&1), Some(&1.0));
    assert_eq!(rho.get(&2), Some(&1.0));
    assert_eq!(rho.get(&3), Some(&3.0));
    assert_eq!(rho.values().sum::<f64>(), 10.0);
}

#[test]
fn test_cell_demand_empty() {
    assert!(cell_demand(&[]).is_empty());
}

#[test]
fn test_strip_clusters() {
    let clusters = strip_clusters(&strip_trips());
    assert_eq!(clusters.centers(), &[0, 3]);
    assert_eq!(clusters.belong(1), Some(0));
    assert_eq!(clusters.belong(2), Some(3));
}

#[test]
fn test_demand_series() {
    let trips = strip_trips();
    let clusters = strip_clusters(&trips);
    let series = demand_series(&trips, &clusters, QUARTER_HOUR).unwrap();

    let expected = vec![
        DemandBucket { bucket_start: 0, unit: 0, pickups: 2, dropoffs: 0 },
        DemandBucket { bucket_start: 0, unit: 3, pickups: 1, dropoffs: 2 },
        DemandBucket { bucket_start: 900, unit: 0, pickups: 2, dropoffs: 1 },
        DemandBucket { bucket_start: 900, unit: 3, pickups: 0, dropoffs: 1 },
        DemandBucket { bucket_start: 1800, unit: 0, pickups: 0, dropoffs: 1 },
    ];
    assert_eq!(series, expected);

    let pickups: u32 = series.iter().map(|b| b.pickups).sum();
    let dropoffs: u32 = series.iter().map(|b| b.dropoffs).sum();
    assert_eq!(pickups as usize, trips.len());
    assert_eq!(dropoffs as usize, trips.len());
}

#[test]
fn test_negative_timestamps_floor() {
    let trips = strip_trips();
    let clusters = strip_clusters(&trips);

    let series = demand_series(&[trip(-1, 0, 5, 0)], &clusters, QUARTER_HOUR).unwrap();
    assert_eq!(series[0].bucket_start, -900);
    assert_eq!(series[1].bucket_start, 0);
}

#[test]
fn test_unknown_cell_rejected() {
    let trips = strip_trips();
    let clusters = strip_clusters(&trips);

    let err = demand_series(&[trip(0, 0, 60, 42)], &clusters, QUARTER_HOUR).unwrap_err();
    assert_eq!(err, ClusterError::UnknownUnit { unit: 42 });
}

#[test]
fn test_invalid_bucket_rejected() {
    let trips = strip_trips();
    let clusters = strip_clusters(&trips);

    for bucket_secs in [0, -60] {
        let err = demand_series(&trips, &clusters, bucket_secs).unwrap_err();
        assert_eq!(err, ClusterError::InvalidBucket { bucket_secs });
    }
}

#[test]
fn test_bucket_secs() {
    assert_eq!(bucket_secs(15), Ok(QUARTER_HOUR));

    for minutes in [0, -5, i64::MAX, i64::MIN] {
        let err = bucket_secs(minutes).unwrap_err();
        assert_eq!(err, ClusterError::InvalidBucketMinutes { minutes });
        assert_eq!(err.kind(), ErrorKind::Validation);
    }
}
