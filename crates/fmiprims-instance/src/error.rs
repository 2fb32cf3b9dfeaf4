use crate::state::LifecycleState;

/// Programming errors raised by a [`ComponentInstance`](crate::ComponentInstance).
///
/// Native status outcomes are never reported through this type; they come
/// back as [`StatusCode`](fmiprims_abi::StatusCode) values.
#[derive(Debug, thiserror::Error)]
pub enum InstanceError {
    /// The native instance has already been freed.
    #[error("{operation} called on a freed component instance")]
    StaleHandle { operation: &'static str },

    /// The operation is not allowed in the current lifecycle state.
    #[error("{operation} not allowed while {state}")]
    InvalidState {
        operation: &'static str,
        state: LifecycleState,
    },

    /// The component returned a null instance.
    #[error("component refused to instantiate {instance_name:?}")]
    InstantiationFailed { instance_name: String },

    /// A batch call paired value references and values of different lengths.
    #[error("{references} value references paired with {values} values")]
    LengthMismatch { references: usize, values: usize },

    /// A thread panicked while holding the instance lock.
    #[error("component instance lock poisoned")]
    LockPoisoned,
}

pub type Result<T> = std::result::Result<T, InstanceError>;
