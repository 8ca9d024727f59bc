//! Engine error types

use bindery::{BindError, ObjectId};

/// Result type for heap operations
pub type EngineResult<T> = Result<T, EngineError>;

/// Errors raised by the reference heap
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum EngineError {
    /// Id names a freed slot or a slot that has since been reused
    #[error("stale object handle {0}")]
    StaleHandle(ObjectId),

    /// Object exists but is not a function
    #[error("object {0} is not a function")]
    NotCallable(ObjectId),
}

impl From<EngineError> for BindError {
    fn from(err: EngineError) -> Self {
        match err {
            EngineError::StaleHandle(id) => BindError::DeadObject(id.to_string()),
            EngineError::NotCallable(id) => BindError::NotCallable(id.to_string()),
        }
    }
}
