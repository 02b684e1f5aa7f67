//! Error types for the purge engine.

use thiserror::Error;

use crate::package::EdgeKind;

/// Raised while building a [`PackageGraph`](crate::PackageGraph) from records.
///
/// Construction is atomic: when one of these is returned no graph exists.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum ValidationError {
    #[error("duplicate package name: {0}")]
    DuplicatePackage(String),

    #[error("package '{from}' has a {kind} edge to unknown package '{to}'")]
    DanglingReference {
        from: String,
        to: String,
        kind: EdgeKind,
    },
}

/// The main error type for graph queries and simulations.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum Error {
    #[error(transparent)]
    Validation(#[from] ValidationError),

    #[error("package not found: {0}")]
    NotFound(String),

    /// A defect in the engine itself, never caused by user input.
    #[error("internal invariant violated: {0}")]
    InternalInvariant(String),
}

/// A type alias for Results using our Error type.
pub type Result<T> = std::result::Result<T, Error>;
