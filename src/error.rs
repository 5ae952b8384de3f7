//! Error types for pg_compose.
//!
//! All failures in this crate are represented by [`PgComposeError`] and
//! propagated via `Result<T, PgComposeError>`. There is no retry machinery:
//! every operation here is a pure, deterministic tree transformation, so an
//! error at construction or render time is final.
//!
//! # Error Classification
//!
//! Errors are classified into three categories:
//! - **Construction** — a node was built with a shape the node model
//!   rejects (missing operands, empty identifiers). Detected at the
//!   constructor call, never later.
//! - **Render** — a node kind has no handler and no inheriting fallback for
//!   the chosen dialect. Always surfaced to the caller, never silently
//!   degraded.
//! - **Internal** — bugs, e.g. a handler dispatched onto a node of the
//!   wrong shape.
//!
//! CTE name collisions and ambiguous column matches are *not* errors; both
//! are resolved deterministically (see [`crate::cte`] and
//! [`crate::catalog`]).

use std::fmt;

/// Primary error type for the crate.
#[derive(Debug, thiserror::Error)]
pub enum PgComposeError {
    /// A node constructor was given a shape it cannot represent
    /// (e.g. an empty identifier, or `DISTINCT` with no expressions).
    #[error("malformed node: {0}")]
    MalformedNode(String),

    /// The chosen dialect has no handler for this node kind, either
    /// directly or through its fallback chain.
    #[error("unsupported construct: {kind} is not supported by dialect '{dialect}'")]
    UnsupportedConstruct {
        /// Name of the node kind that could not be rendered.
        kind: &'static str,
        /// Name of the dialect the render was attempted against.
        dialect: String,
    },

    /// An unexpected internal error. Indicates a bug.
    #[error("internal error: {0}")]
    InternalError(String),
}

/// Classification of an error for callers that report or branch on it.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PgComposeErrorKind {
    Construction,
    Render,
    Internal,
}

impl fmt::Display for PgComposeErrorKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            PgComposeErrorKind::Construction => write!(f, "CONSTRUCTION"),
            PgComposeErrorKind::Render => write!(f, "RENDER"),
            PgComposeErrorKind::Internal => write!(f, "INTERNAL"),
        }
    }
}

impl PgComposeError {
    /// Classify the error.
    pub fn kind(&self) -> PgComposeErrorKind {
        match self {
            PgComposeError::MalformedNode(_) => PgComposeErrorKind::Construction,
            PgComposeError::UnsupportedConstruct { .. } => PgComposeErrorKind::Render,
            PgComposeError::InternalError(_) => PgComposeErrorKind::Internal,
        }
    }

    /// Whether this error was raised while building a node, as opposed to
    /// rendering one.
    pub fn is_construction(&self) -> bool {
        self.kind() == PgComposeErrorKind::Construction
    }
}
