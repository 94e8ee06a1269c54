//! Error kinds for construction, queries, and scheduler runs.
//!
//! `NegativeConcentrationWarning` is deliberately not a variant here: it's
//! non-fatal and never aborts a run, so it's emitted through [`log`] from
//! the call site instead (see [`crate::transport`]).

use thiserror::Error;

/// Everything that can go wrong building or running the engine.
#[derive(Debug, Error, Clone, PartialEq)]
pub enum CoreError {
    #[error("time series is empty or its time axis is not strictly increasing")]
    MalformedSeries,

    #[error("time {t} is outside the series domain [{first}, {last}]")]
    OutOfRange { t: f64, first: f64, last: f64 },

    #[error("room {room} composition sums to {sum} (expected 100 ± 1e-12), or a percentage is outside [0, 100]")]
    CompositionSum { room: usize, sum: f64 },

    #[error("aperture {aperture} references an unknown room or an unrecognized side")]
    BadAperture { aperture: usize },

    #[error("downwind pressure coefficient ({downwind}) must not exceed upwind ({upwind})")]
    GraphConfig { upwind: f64, downwind: f64 },

    #[error("no angular offset defined for path endpoints ({from:?}, {to:?})")]
    PathTableMiss { from: String, to: String },

    #[error("room {room} integration returned last time {got}, commanded {expected}")]
    IncompleteChemistry { room: usize, expected: f64, got: f64 },

    #[error("scheduler given {got} room evolvers, building has {expected} rooms")]
    EvolverCountMismatch { expected: usize, got: usize },
}

pub type CoreResult<T> = Result<T, CoreError>;
