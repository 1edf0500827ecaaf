//! Error types.

use thiserror::Error;

/// Resource failures of the BDD engine.
#[derive(Debug, Clone, Copy, Eq, PartialEq, Error)]
pub enum BddError {
    /// The unique table has no room for another node.
    #[error("node storage is full (capacity {capacity})")]
    StorageFull { capacity: usize },
    /// The deadline passed while an operation was in progress.
    #[error("deadline exceeded after {steps} steps")]
    DeadlineExceeded { steps: u64 },
}

/// Failures of a solver session.
///
/// An elapsed deadline is not an error: `check` reports it as
/// [`SatResult::Unknown`][crate::solver::SatResult::Unknown].
#[derive(Debug, Clone, Eq, PartialEq, Error)]
pub enum SolverError {
    #[error("solver engine failure: {0}")]
    Engine(#[from] BddError),
    #[error("no model available: the last check was not satisfiable")]
    NoModel,
    #[error("variable {0} does not belong to this session")]
    UnknownVariable(u32),
}

/// Failures of the N-Queens front end.
#[derive(Debug, Clone, Eq, PartialEq, Error)]
pub enum QueensError {
    #[error("invalid board size {size}: expected a value in 1..={max}")]
    InvalidSize { size: i64, max: usize },
    #[error(transparent)]
    Solver(#[from] SolverError),
}

/// Invalid solver configuration.
#[derive(Debug, Clone, Eq, PartialEq, Error)]
pub enum ConfigError {
    #[error("storage bits must be in 1..=31, got {0}")]
    StorageBits(usize),
    #[error("cache bits must be in 1..={max}, got {bits}")]
    CacheBits { bits: usize, max: usize },
}
