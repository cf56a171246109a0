use thiserror::Error;

use crate::value::VertexId;

/// Failure reported by a [`GraphPort`](crate::GraphPort) implementation.
#[derive(Debug, Clone, Error)]
#[error("graph store unavailable: {message}")]
pub struct PortError {
    pub message: String,
}

impl PortError {
    pub fn new(message: impl Into<String>) -> Self {
        Self {
            message: message.into(),
        }
    }
}

pub type PortResult<T> = Result<T, PortError>;

/// Errors surfaced by the traversal engine.
///
/// Any error aborts the whole call. Partial traversal state is dropped with
/// the call frame, so nothing half-computed ever reaches the caller.
#[derive(Debug, Error)]
pub enum EngineError {
    /// A referenced vertex does not exist in the store.
    #[error("vertex not found: {0}")]
    NotFound(VertexId),

    /// A parameter is out of range or a predicate is malformed.
    #[error("invalid argument: {0}")]
    InvalidArgument(String),

    /// The graph store failed. Not retried here.
    #[error(transparent)]
    StoreUnavailable(#[from] PortError),

    /// The caller's cancel token fired at a level boundary.
    #[error("traversal cancelled")]
    Cancelled,

    /// Engine configuration could not be read or is out of range.
    #[error("configuration error: {0}")]
    Config(String),
}

impl EngineError {
    pub(crate) fn invalid(message: impl Into<String>) -> Self {
        Self::InvalidArgument(message.into())
    }
}

pub type EngineResult<T> = Result<T, EngineError>;
