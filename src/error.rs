use std::fmt;
use thiserror::Error;

use crate::storm::StormDuration;

/// Fatal errors raised before or during a computation.
#[derive(Debug, Error)]
pub enum HydroError {
    #[error("unknown rainfall distribution curve '{0}' (expected A, B, C, D, II or III)")]
    UnknownDistribution(String),

    #[error("unknown duration adjustment policy '{0}' (expected A or B)")]
    UnknownAdjustmentPolicy(String),

    #[error("unknown CN weighting '{0}' (expected area or runoff)")]
    UnknownCnWeighting(String),

    #[error("unknown pond option '{0}' (expected frustum or elevation_area)")]
    UnknownPondOption(String),

    #[error("unknown {table} entry '{name}'")]
    UnknownSurface { table: &'static str, name: String },

    #[error("not all geometry inputs for pond option {option} are present: missing {missing}")]
    MissingPondGeometry {
        option: &'static str,
        missing: String,
    },

    #[error("pond bottom elevation {bottom} must equal the first table elevation {first}")]
    BottomElevationMismatch { bottom: f64, first: f64 },

    #[error("stage table needs at least {required} rows, found {found}")]
    StageTableTooShort { required: usize, found: usize },

    #[error("stage table is not monotonic at row {row}: {column} decreases from {previous} to {current}")]
    NonMonotonicStageTable {
        row: usize,
        column: &'static str,
        previous: f64,
        current: f64,
    },

    #[error("distribution table has no {duration} curve for distribution {curve}")]
    MissingDistributionCurve {
        curve: String,
        duration: StormDuration,
    },

    #[error("distribution curve {curve} {duration}: {message}")]
    InvalidDistributionCurve {
        curve: String,
        duration: StormDuration,
        message: String,
    },

    #[error("invalid start_time '{0}': expected YYYY-MM-DD HH:MM:SS")]
    InvalidStartTime(String),

    #[error("missing input: {0}")]
    MissingParameter(&'static str),

    #[error("invalid basin parameter {name} = {value}: {reason}")]
    InvalidParameter {
        name: &'static str,
        value: f64,
        reason: &'static str,
    },

    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    #[error("CSV error: {0}")]
    Csv(#[from] csv::Error),

    #[error("scenario parse error: {0}")]
    Toml(#[from] toml::de::Error),
}

pub type Result<T> = std::result::Result<T, HydroError>;

/// Non-fatal conditions attached to a result. Computation proceeds.
#[derive(Debug, Clone, PartialEq)]
pub enum Advisory {
    /// PRF fell outside the tabulated shape-parameter range and Gamma_n was
    /// extrapolated from the nearest table segment.
    PrfExtrapolated { prf: f64, gamma_n: f64 },
    /// Inflow drove the routing variable past the last tabulated row for
    /// `steps` ordinates of this storm.
    RoutingRangeExceeded {
        duration: StormDuration,
        steps: usize,
        first_step: usize,
    },
    /// Frustum stage rows were capped at the modeled maximum depth.
    StageTableClamped { rows: usize },
}

impl Advisory {
    /// Short machine-readable name.
    pub fn kind(&self) -> &'static str {
        match self {
            Advisory::PrfExtrapolated { .. } => "prf_extrapolated",
            Advisory::RoutingRangeExceeded { .. } => "routing_range_exceeded",
            Advisory::StageTableClamped { .. } => "stage_table_clamped",
        }
    }

    pub fn duration(&self) -> Option<StormDuration> {
        match self {
            Advisory::RoutingRangeExceeded { duration, .. } => Some(*duration),
            _ => None,
        }
    }
}

impl fmt::Display for Advisory {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Advisory::PrfExtrapolated { prf, gamma_n } => write!(
                f,
                "PRF {prf:.1} is outside the tabulated range; Gamma_n {gamma_n:.3} was extrapolated with unknown error"
            ),
            Advisory::RoutingRangeExceeded {
                duration,
                steps,
                first_step,
            } => write!(
                f,
                "{duration} storm exceeds the modeled pond depth at {steps} ordinates starting at step {first_step}"
            ),
            Advisory::StageTableClamped { rows } => write!(
                f,
                "{rows} frustum stage rows were capped at the modeled maximum depth"
            ),
        }
    }
}
