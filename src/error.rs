//! Error types.

use thiserror::Error;

/// An invalid configuration, detected before a simulation is constructed.
#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("turn probabilities of `{segment}` sum to {sum}, expected 1")]
    BadDistribution { segment: String, sum: f64 },

    #[error("`{name}` must be finite and non-negative, got {value}")]
    InvalidValue { name: String, value: f64 },

    #[error("movement {movement} of `{segment}` ends within the completion radius of its spawn point")]
    DegenerateRoute { segment: String, movement: usize },

    #[error("vehicles advance {stride} m per tick, which can step over a completion radius of {completion_radius} m")]
    StepOvershoots { stride: f64, completion_radius: f64 },

    #[error("segment `{0}` obeys a signal or yield rule but has no stop line")]
    MissingStopLine(String),

    #[error("approach `{0}` has no movements")]
    NoMovements(String),

    #[error("unknown segment `{0}`")]
    UnknownSegment(String),

    #[error("approach `{segment}` has no movement {movement}")]
    UnknownMovement { segment: String, movement: usize },

    #[error("unknown intersection `{0}`")]
    UnknownIntersection(String),

    #[error("the name `{0}` is used more than once")]
    DuplicateName(String),

    #[error("segment `{0}` has a zero-length direction")]
    ZeroDirection(String),

    #[error("invalid signal plan at `{intersection}`: {reason}")]
    InvalidSignal { intersection: String, reason: String },

    #[error("failed to parse configuration: {0}")]
    Parse(#[from] serde_json::Error),

    #[error("failed to read configuration: {0}")]
    Io(#[from] std::io::Error),
}

/// A violated runtime invariant. These indicate a bug in the caller or the engine.
#[derive(Debug, Error, PartialEq, Eq)]
pub enum SimError {
    #[error("vehicle `{0}` was stepped after completing its route")]
    SteppedCompleted(String),
}

/// A failure to deliver exported data.
#[derive(Debug, Error)]
pub enum ExportError {
    #[error("i/o error: {0}")]
    Io(#[from] std::io::Error),

    #[error("serialisation error: {0}")]
    Json(#[from] serde_json::Error),

    #[error("the host closed the connection before greeting")]
    Handshake,
}
