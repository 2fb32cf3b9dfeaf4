use fmiprims_instance::InstanceError;

use crate::kind::ScalarKind;

/// Errors from name-based variable access.
#[derive(Debug, thiserror::Error)]
pub enum AccessError {
    /// The resolver has no variable with this name.
    #[error("unknown variable: {0}")]
    UnknownVariable(String),

    /// The variable exists but holds a different scalar kind.
    #[error("variable {name} is {actual}, not {expected}")]
    KindMismatch {
        name: String,
        expected: ScalarKind,
        actual: ScalarKind,
    },

    #[error(transparent)]
    Instance(#[from] InstanceError),

    /// A variable table could not be built or loaded.
    #[error("variable table error: {0}")]
    Table(String),

    #[error("json error: {0}")]
    Json(#[from] serde_json::Error),
}

pub type Result<T> = std::result::Result<T, AccessError>;
