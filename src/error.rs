use std::path::PathBuf;

use thiserror::Error;

use crate::assembly::{BuildState, BuildStep};
use crate::kernel::{Dim, Tag};

/// Top-level error type for a machine cross-section build.
#[derive(Debug, Error)]
pub enum EmsectorError {
    #[error(transparent)]
    Topology(#[from] TopologyError),

    #[error(transparent)]
    Winding(#[from] WindingError),

    #[error(transparent)]
    Registry(#[from] RegistryError),

    #[error(transparent)]
    Boundary(#[from] BoundaryError),

    #[error(transparent)]
    Kernel(#[from] KernelError),

    #[error(transparent)]
    Config(#[from] ConfigError),

    #[error(transparent)]
    Assembly(#[from] AssemblyError),

    #[error("field solver failed: {0}")]
    Solver(String),
}

/// Errors in the machine topology or its drawn primitives.
#[derive(Debug, Error)]
pub enum TopologyError {
    #[error("invalid topology: {0}")]
    InvalidTopology(String),

    #[error("missing primitive: {0}")]
    MissingPrimitive(String),

    #[error("invalid primitive: {0}")]
    InvalidPrimitive(String),
}

/// Inconsistent winding connection matrix.
#[derive(Debug, Error)]
pub enum WindingError {
    #[error("invalid winding: column {column} of rows {rows:?} has no active phase")]
    NoActivePhase { column: usize, rows: (usize, usize) },

    #[error("invalid winding: column {column} of rows {rows:?} has {active} active phases")]
    MultipleActivePhases {
        column: usize,
        rows: (usize, usize),
        active: usize,
    },

    #[error("invalid winding: {copies} slot copies need as many columns, matrix has {columns}")]
    TooFewColumns { copies: usize, columns: usize },

    #[error("invalid winding: connection matrix has {rows} rows, layout needs {needed}")]
    MissingBand { rows: usize, needed: usize },

    #[error("invalid winding: row {row} has {len} columns, expected {expected}")]
    RaggedMatrix { row: usize, len: usize, expected: usize },
}

/// Errors raised while registering physical groups.
#[derive(Debug, Error)]
pub enum RegistryError {
    #[error("duplicate physical tag {id}: already registered as {existing}, requested {requested}")]
    DuplicateTag {
        id: i32,
        existing: &'static str,
        requested: &'static str,
    },

    #[error("unknown physical group: {0}")]
    UnknownGroup(String),

    #[error("{dim:?} entity {tag} already belongs to physical group {group}")]
    HandleAlreadyGrouped {
        dim: Dim,
        tag: Tag,
        group: &'static str,
    },

    #[error("physical group {group} holds {expected:?} entities, got a {found:?}")]
    WrongDimension {
        group: &'static str,
        expected: Dim,
        found: Dim,
    },
}

/// Errors in boundary construction.
#[derive(Debug, Error)]
pub enum BoundaryError {
    #[error("periodic boundary mismatch: {0}")]
    PeriodicMismatch(String),
}

/// Failures reported by the geometry/meshing kernel.
#[derive(Debug, Error)]
pub enum KernelError {
    #[error("{dim:?} entity {tag} not found")]
    EntityNotFound { dim: Dim, tag: Tag },

    #[error("{dim:?} tag {tag} is already in use")]
    TagInUse { dim: Dim, tag: Tag },

    #[error("curve loop {0:?} is not closed")]
    OpenLoop(Vec<Tag>),

    #[error("degenerate geometry: {0}")]
    Degenerate(String),

    #[error("no mesh has been generated")]
    NotMeshed,

    #[error(transparent)]
    Io(#[from] std::io::Error),
}

/// Misuse of a part build.
#[derive(Debug, Error)]
pub enum AssemblyError {
    #[error("{part} build is {state:?}, expected {expected:?}")]
    OutOfOrder {
        part: &'static str,
        state: BuildState,
        expected: BuildStep,
    },
}

/// Errors loading a machine description.
#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("failed to read {path}: {source}")]
    Read {
        path: PathBuf,
        source: std::io::Error,
    },

    #[error("failed to parse machine description: {0}")]
    Parse(#[from] serde_json::Error),
}

/// Convenience type alias for results using [`EmsectorError`].
pub type Result<T, E = EmsectorError> = std::result::Result<T, E>;
