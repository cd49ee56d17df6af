use std::path::PathBuf;
use thiserror::Error;

use crate::timeseries::Time;
use crate::unit::UnitId;

/// Error type for invalid operations.
#[derive(Error, Debug)]
pub enum RpraError {
    #[error("unit id {0} is already registered")]
    DuplicateId(UnitId),
    #[error("unit id {0} is not registered")]
    UnknownId(UnitId),
    #[error("invalid unit {id}: {reason}")]
    InvalidUnit { id: UnitId, reason: String },
    #[error("invalid simulation window [{start}, {end})")]
    InvalidWindow { start: Time, end: Time },
    #[error("series of unit {unit_id} does not cover the hour grid of [{start}, {end})")]
    MissingTimeSeriesCoverage {
        unit_id: UnitId,
        start: Time,
        end: Time,
    },
    #[error("net hourly capacity matrix is only available after run()")]
    NotRun,
    #[error("no energy system has been assigned to the simulation")]
    NoSystemAssigned,
    #[error("persistence failure at {path}: {reason}")]
    Persistence { path: PathBuf, reason: String },
    #[error(
        "bisection exhausted {iterations} iterations: estimate {estimate} MW, bounds [{lo}, {hi}]"
    )]
    SolverDidNotConverge {
        estimate: f64,
        lo: f64,
        hi: f64,
        iterations: usize,
    },
    #[error("non-finite net capacity at hour index {time_index}, trial {trial}")]
    NonFiniteNetCapacity { time_index: usize, trial: usize },
}

/// Convenience type for `Result<T, RpraError>`.
pub type RpraResult<T> = Result<T, RpraError>;
