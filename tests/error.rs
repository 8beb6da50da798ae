//! Tests for error module

use densitypeak::error::{ClusterError, ErrorKind, OptionExt};

#[test]
fn test_error_display() {
    let err = ClusterError::NoClusterCenter {
        rho_threshold: 500.0,
        delta_threshold: 0.25,
    };
    let message = err.to_string();
    assert!(message.contains("no cluster center"));
    assert!(message.contains("500"));
    assert!(message.contains("0.25"));

    let err = ClusterError::InvalidRho {
        unit: 17,
        rho: -1.0,
    };
    assert!(err.to_string().contains("unit 17"));
}

#[test]
fn test_error_kinds() {
    assert_eq!(
        ClusterError::DuplicateUnit { unit: 1 }.kind(),
        ErrorKind::Validation
    );
    assert_eq!(
        ClusterError::MissingCoordinate { unit: 1 }.kind(),
        ErrorKind::Validation
    );
    assert_eq!(
        ClusterError::NoClusterCenter {
            rho_threshold: 1.0,
            delta_threshold: 1.0
        }
        .kind(),
        ErrorKind::Configuration
    );
    assert_eq!(
        ClusterError::PropagationStall {
            unit: 3,
            unresolved: 5
        }
        .kind(),
        ErrorKind::PropagationStall
    );
}

#[test]
fn test_error_unit() {
    assert_eq!(ClusterError::UnknownUnit { unit: 9 }.unit(), Some(9));
    assert_eq!(
        ClusterError::InvalidBucket { bucket_secs: 0 }.unit(),
        None
    );
}

#[test]
fn test_option_ext() {
    let none: Option<i32> = None;
    assert_eq!(
        none.ok_or_missing_coordinate(4),
        Err(ClusterError::MissingCoordinate { unit: 4 })
    );
    assert_eq!(
        none.ok_or_unknown_unit(4),
        Err(ClusterError::UnknownUnit { unit: 4 })
    );
    assert_eq!(Some(1).ok_or_unknown_unit(4), Ok(1));
}
