//! Tests for lib.rs core types and input validation

use densitypeak::{
    coord_map, ClusterError, ErrorKind, Grid, GridBounds, PlanarPoint, Unit, UnitSet,
};
use std::collections::{BTreeMap, HashMap};

fn unit(id: u64, x: f64, y: f64, rho: f64) -> Unit {
    Unit::new(id, PlanarPoint::new(x, y), rho)
}

#[test]
fn test_planar_point() {
    let a = PlanarPoint::new(1.0, 1.0);
    let b: PlanarPoint = (4.0, 5.0).into();
    assert_eq!(a.distance(&b), 5.0);
    assert_eq!(b.to_array(), [4.0, 5.0]);
    assert!(a.is_valid());
    assert!(!PlanarPoint::new(f64::NAN, 0.0).is_valid());
    assert!(!PlanarPoint::new(0.0, f64::INFINITY).is_valid());
}

#[test]
fn test_valid_units() {
    let units = UnitSet::new(vec![unit(1, 0.0, 0.0, 3.0), unit(2, 1.0, 1.0, 0.0)]).unwrap();
    assert_eq!(units.len(), 2);
    assert_eq!(units.iter().map(|u| u.id).collect::<Vec<_>>(), vec![1, 2]);
}

#[test]
fn test_duplicate_id_rejected() {
    let err = UnitSet::new(vec![unit(1, 0.0, 0.0, 3.0), unit(1, 1.0, 1.0, 2.0)]).unwrap_err();
    assert_eq!(err, ClusterError::DuplicateUnit { unit: 1 });
    assert_eq!(err.kind(), ErrorKind::Validation);
}

#[test]
fn test_invalid_rho_rejected() {
    for rho in [f64::NAN, -1.0, f64::INFINITY] {
        let err = UnitSet::new(vec![unit(5, 0.0, 0.0, rho)]).unwrap_err();
        assert!(matches!(err, ClusterError::InvalidRho { unit: 5, .. }));
    }
}

#[test]
fn test_negative_zero_rho_normalized() {
    let units = UnitSet::new(vec![unit(1, 0.0, 0.0, -0.0)]).unwrap();
    assert!(units.as_slice()[0].rho.is_sign_positive());
}

#[test]
fn test_invalid_coordinate_rejected() {
    let err = UnitSet::new(vec![unit(2, f64::NAN, 0.0, 1.0)]).unwrap_err();
    assert!(matches!(err, ClusterError::InvalidCoordinate { unit: 2, .. }));
}

#[test]
fn test_from_parts_missing_coordinate() {
    let coords: HashMap<u64, PlanarPoint> = HashMap::from([(1, PlanarPoint::new(0.0, 0.0))]);
    let err = UnitSet::from_parts(vec![(1, 2.0), (2, 3.0)], &coords).unwrap_err();
    assert_eq!(err, ClusterError::MissingCoordinate { unit: 2 });
}

#[test]
fn test_from_parts_duplicate_density() {
    let coords: BTreeMap<u64, PlanarPoint> = BTreeMap::from([(1, PlanarPoint::new(0.0, 0.0))]);
    let err = UnitSet::from_parts(vec![(1, 2.0), (1, 3.0)], &coords).unwrap_err();
    assert_eq!(err, ClusterError::DuplicateUnit { unit: 1 });
}

#[test]
fn test_from_parts_with_grid() {
    let grid = Grid::new(GridBounds::new(0.0, 0.0, 4.0, 4.0), 2.0).unwrap();
    let units = UnitSet::from_parts(vec![(0, 1.0), (3, 2.0)], &grid).unwrap();

    assert_eq!(units.as_slice()[0].coord, PlanarPoint::new(1.0, 1.0));
    assert_eq!(units.as_slice()[1].coord, PlanarPoint::new(3.0, 3.0));

    let err = UnitSet::from_parts(vec![(4, 1.0)], &grid).unwrap_err();
    assert_eq!(err, ClusterError::MissingCoordinate { unit: 4 });
}

#[test]
fn test_coord_map_rejects_repeated_cells() {
    let coords = coord_map(vec![
        (1, PlanarPoint::new(0.0, 0.0)),
        (2, PlanarPoint::new(1.0, 0.0)),
    ])
    .unwrap();
    assert_eq!(coords.len(), 2);
    assert_eq!(coords[&2], PlanarPoint::new(1.0, 0.0));

    let err = coord_map(vec![
        (1, PlanarPoint::new(0.0, 0.0)),
        (1, PlanarPoint::new(9.0, 9.0)),
    ])
    .unwrap_err();
    assert_eq!(err, ClusterError::DuplicateUnit { unit: 1 });
}
