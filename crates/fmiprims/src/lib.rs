//! Safe lifecycle and variable access for natively compiled simulation units.
//!
//! fmiprims loads a co-simulation component's shared object, owns the native
//! instance it creates and exposes typed reads and writes by value reference
//! or by variable name.
//!
//! # Crate Structure
//!
//! - [`abi`]: shared-object loading and the v1/v2 native bindings
//! - [`instance`]: lifecycle-checked ownership of one component instance
//! - [`access`]: name-based variable access (behind `access` feature)
//! - [`logging`]: stderr subscriber setup (behind `logging` feature)

/// Re-export native binding types.
pub mod abi {
    pub use fmiprims_abi::*;
}

/// Re-export instance types.
pub mod instance {
    pub use fmiprims_instance::*;
}

/// Re-export name-based access types (requires `access` feature).
#[cfg(feature = "access")]
pub mod access {
    pub use fmiprims_access::*;
}

#[cfg(feature = "logging")]
pub mod logging;
