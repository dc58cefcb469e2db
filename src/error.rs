//! Engine error types

use crate::engine::patch::Operation;
use thiserror::Error;
use uuid::Uuid;

#[derive(Error, Debug, Clone)]
pub enum EngineError {
    /// A measure kept requesting restart-required patches.
    /// Carries every operation list attempted, oldest first.
    #[error("fixup loop in measure {measure}: still invalid after {tries} validation passes")]
    FixupLoop {
        measure: Uuid,
        tries: usize,
        operations: Vec<Vec<Operation>>,
    },

    #[error("negative division count {0}")]
    NegativeDivCount(i64),

    #[error("no attributes snapshot for staff {staff} of part {part} in measure {measure}")]
    MissingSnapshot {
        measure: Uuid,
        part: String,
        staff: usize,
    },

    #[error("unknown model type `{0}`")]
    UnknownType(String),

    #[error("invalid model spec: {0}")]
    InvalidSpec(String),

    #[error("no page margins apply to page {0}")]
    InvalidPageMargins(usize),

    #[error("document has no Print element and no print options were given")]
    MissingPrint,

    #[error("proxy target {0} not found in the primary staff")]
    ProxyTargetMissing(Uuid),

    #[error("patch target not found: {0}")]
    PatchPath(String),

    #[error("patch does not match document: {0}")]
    PatchMismatch(String),

    #[error("internal invariant violated: {0}")]
    Invariant(String),
}

pub type Result<T> = std::result::Result<T, EngineError>;

impl From<serde_json::Error> for EngineError {
    fn from(err: serde_json::Error) -> Self {
        EngineError::InvalidSpec(err.to_string())
    }
}
