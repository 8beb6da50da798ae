//! Unified error handling.
//!
//! Every failure in this crate is fatal for the current run: nothing is
//! retried and no partial result is returned. Errors fall into three
//! classes, see [`ErrorKind`].

use thiserror::Error;

use crate::UnitId;

/// Result alias used throughout the crate.
pub type Result<T> = std::result::Result<T, ClusterError>;

/// Broad class of a [`ClusterError`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ErrorKind {
    /// Malformed input, detected before any computation starts.
    Validation,
    /// The threshold combination selects no cluster center.
    Configuration,
    /// The neighbor chain failed to resolve every unit (internal invariant).
    PropagationStall,
}

/// Errors raised while validating input or clustering units.
#[derive(Debug, Clone, PartialEq, Error)]
pub enum ClusterError {
    #[error("duplicate unit id {unit}")]
    DuplicateUnit { unit: UnitId },

    #[error("unit {unit} has invalid rho {rho} (must be finite and non-negative)")]
    InvalidRho { unit: UnitId, rho: f64 },

    #[error("unit {unit} has no coordinate")]
    MissingCoordinate { unit: UnitId },

    #[error("unit {unit} has non-finite coordinate ({x}, {y})")]
    InvalidCoordinate { unit: UnitId, x: f64, y: f64 },

    #[error("{name} must not be NaN (got {value})")]
    InvalidThreshold { name: &'static str, value: f64 },

    #[error("invalid grid: {reason}")]
    InvalidGrid { reason: String },

    #[error("unit {unit} is not part of the clustering result")]
    UnknownUnit { unit: UnitId },

    #[error("time bucket width must be positive (got {bucket_secs}s)")]
    InvalidBucket { bucket_secs: i64 },

    #[error("time bucket of {minutes} minutes is out of range")]
    InvalidBucketMinutes { minutes: i64 },

    #[error("expected {expected} center flags, got {got}")]
    CenterFlagMismatch { expected: usize, got: usize },

    #[error(
        "thresholds too strict, no cluster center found \
         (rho_threshold={rho_threshold}, delta_threshold={delta_threshold})"
    )]
    NoClusterCenter {
        rho_threshold: f64,
        delta_threshold: f64,
    },

    #[error("propagation stalled at unit {unit} with {unresolved} units unresolved")]
    PropagationStall { unit: UnitId, unresolved: usize },
}

impl ClusterError {
    /// Class of this error.
    pub fn kind(&self) -> ErrorKind {
        match self {
            Self::NoClusterCenter { .. } => ErrorKind::Configuration,
            Self::PropagationStall { .. } => ErrorKind::PropagationStall,
            _ => ErrorKind::Validation,
        }
    }

    /// The unit the error refers to, if any.
    pub fn unit(&self) -> Option<UnitId> {
        match self {
            Self::DuplicateUnit { unit }
            | Self::InvalidRho { unit, .. }
            | Self::MissingCoordinate { unit }
            | Self::InvalidCoordinate { unit, .. }
            | Self::UnknownUnit { unit }
            | Self::PropagationStall { unit, .. } => Some(*unit),
            _ => None,
        }
    }
}

/// Conversions from `Option` into the matching [`ClusterError`].
pub trait OptionExt<T> {
    fn ok_or_missing_coordinate(self, unit: UnitId) -> Result<T>;
    fn ok_or_unknown_unit(self, unit: UnitId) -> Result<T>;
}

impl<T> OptionExt<T> for Option<T> {
    fn ok_or_missing_coordinate(self, unit: UnitId) -> Result<T> {
        self.ok_or(ClusterError::MissingCoordinate { unit })
    }

    fn ok_or_unknown_unit(self, unit: UnitId) -> Result<T> {
        self.ok_or(ClusterError::UnknownUnit { unit })
    }
}
