//! Native bindings for simulation units.
//!
//! This is the lowest layer of fmiprims. It opens a component's shared
//! object, resolves the fixed entry points of one ABI revision, and maps raw
//! native return codes into [`StatusCode`]:
//! - [`Fmi1Library`] for revision 1 (model-identifier-prefixed symbols)
//! - [`Fmi2Library`] for revision 2
//!
//! Everything above this crate talks to a component through the
//! [`NativeBinding`] trait and never needs to know which revision it has.

pub mod error;
pub mod library;
pub mod logger;
#[cfg(any(test, feature = "mock"))]
pub mod mock;
pub mod params;
pub mod status;
pub mod traits;
pub mod v1;
pub mod v2;

use std::path::Path;
use std::sync::Arc;

pub use error::{LoadError, Result};
pub use library::{platform_file_name, SharedObject};
pub use logger::COMPONENT_TARGET;
pub use params::{Experiment, InstantiateParams};
pub use status::StatusCode;
pub use traits::{AbiRevision, ComponentHandle, NativeBinding, ValueReference};
pub use v1::Fmi1Library;
pub use v2::Fmi2Library;

/// Load a component's shared object for the given ABI revision.
pub fn load(
    revision: AbiRevision,
    path: impl AsRef<Path>,
    model_identifier: &str,
) -> Result<Arc<dyn NativeBinding>> {
    Ok(match revision {
        AbiRevision::V1 => Arc::new(Fmi1Library::load(path, model_identifier)?),
        AbiRevision::V2 => Arc::new(Fmi2Library::load(path, model_identifier)?),
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn load_reports_missing_file_for_both_revisions() {
        let path = std::env::temp_dir().join(format!(
            "fmiprims-absent-{}.{}",
            std::process::id(),
            std::env::consts::DLL_EXTENSION
        ));
        for revision in [AbiRevision::V1, AbiRevision::V2] {
            let Err(err) = load(revision, &path, "absent") else {
                panic!("{revision}: loading a missing file should fail");
            };
            assert!(matches!(err, LoadError::NotFound { .. }), "{revision}: {err}");
        }
    }

    #[cfg(target_os = "linux")]
    #[test]
    fn load_reports_missing_entry_points_for_both_revisions() {
        let candidates = [
            "/lib/x86_64-linux-gnu/libc.so.6",
            "/usr/lib/x86_64-linux-gnu/libc.so.6",
            "/lib/aarch64-linux-gnu/libc.so.6",
            "/usr/lib/aarch64-linux-gnu/libc.so.6",
            "/lib64/libc.so.6",
            "/usr/lib64/libc.so.6",
        ];
        let Some(path) = candidates
            .iter()
            .map(std::path::Path::new)
            .find(|path| path.is_file())
        else {
            eprintln!("skipping: no system libc found at a known location");
            return;
        };

        for (revision, prefix) in [(AbiRevision::V1, "libc_fmi"), (AbiRevision::V2, "fmi2")] {
            let Err(err) = load(revision, path, "libc") else {
                panic!("{revision}: libc should not export simulation entry points");
            };
            match err {
                LoadError::MissingSymbol { ref symbol, .. } => {
                    assert!(symbol.starts_with(prefix), "{revision}: {symbol}");
                }
                other => panic!("{revision}: expected a missing symbol, got {other}"),
            }
        }
    }
}
