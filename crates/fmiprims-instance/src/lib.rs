//! Lifecycle-checked ownership of one simulation-unit instance.
//!
//! [`ComponentInstance`] owns the native handle and a set of reusable
//! exchange buffers. It enforces the instantiate, initialize, terminate and
//! free ordering, reports native outcomes as [`StatusCode`] values and
//! refuses to touch an instance once it has been freed.
//!
//! The exchange buffers stay private to the instance:
//!
//! ```compile_fail
//! use fmiprims_instance::ExchangeBuffers;
//! ```
//!
//! [`StatusCode`]: fmiprims_abi::StatusCode

mod buffers;
pub mod config;
pub mod error;
pub mod instance;
pub mod read;
pub mod state;

pub use buffers::ExchangeValue;
pub use config::InstanceConfig;
pub use error::{InstanceError, Result};
pub use instance::ComponentInstance;
pub use read::{
    BooleanArrayRead, BooleanRead, EnumerationRead, IntegerArrayRead, IntegerRead, ReadResult,
    RealArrayRead, RealRead, StringArrayRead, StringRead,
};
pub use state::LifecycleState;
