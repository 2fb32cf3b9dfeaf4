//! Name-based access to simulation-unit variables.
//!
//! A [`NameCache`] memoizes name to value-reference resolution for one
//! component. A [`VariableAccessor`] pairs it with a
//! [`ComponentInstance`](fmiprims_instance::ComponentInstance) so variables
//! can be read and written by name.

pub mod accessor;
pub mod cache;
pub mod config;
pub mod error;
pub mod kind;
pub mod resolver;
pub mod table;

pub use accessor::{Variable, VariableAccessor};
pub use cache::{NameCache, Resolved};
pub use config::TableConfig;
pub use error::{AccessError, Result};
pub use kind::ScalarKind;
pub use resolver::ValueReferenceResolver;
pub use table::{VariableEntry, VariableTable};
