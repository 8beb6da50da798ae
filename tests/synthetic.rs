//! Tests for the synthetic demand generator

#![cfg(feature = "synthetic")]

use densitypeak::synthetic::DemandScenario;
use densitypeak::{ClusterConfig, DensityPeakCluster};

#[test]
fn test_generation_is_deterministic() {
    let a = DemandScenario::city(30, 4, 9).generate().unwrap();
    let b = DemandScenario::city(30, 4, 9).generate().unwrap();

    assert_eq!(a.units.as_slice(), b.units.as_slice());
    assert_eq!(a.hotspot_cells, b.hotspot_cells);
    assert_eq!(a.grid, b.grid);
}

#[test]
fn test_peak_lies_near_a_hotspot() {
    let scenario = DemandScenario::city(60, 3, 13);
    let demand = scenario.generate().unwrap();
    let dpc = DensityPeakCluster::new(demand.units);

    let peak = dpc.table().peak().unwrap();
    let nearest = scenario
        .hotspots
        .iter()
        .map(|h| h.center.distance(&peak.coord))
        .fold(f64::INFINITY, f64::min);
    assert!(nearest < 6.0, "peak {} is {nearest} from any hotspot", peak.id);

    let result = dpc.cluster(&ClusterConfig::new(100.0, 10.0)).unwrap();
    assert!(!result.centers().is_empty());
    assert!(result.centers().len() <= scenario.hotspots.len());
}
