use std::path::{Path, PathBuf};

use libloading::Library;
use tracing::{debug, warn};

use crate::error::{LoadError, Result};

/// A shared object opened with the platform loader.
pub struct SharedObject {
    library: Library,
    path: PathBuf,
}

impl SharedObject {
    /// Open the shared object at `path`.
    pub fn open(path: impl AsRef<Path>) -> Result<Self> {
        let path = path.as_ref().to_path_buf();
        if !path.is_file() {
            return Err(LoadError::NotFound { path });
        }

        // SAFETY: loading runs the object's initializers. The caller chose the
        // file and accepts that it runs in-process.
        let library = unsafe { Library::new(&path) }.map_err(|source| LoadError::Open {
            path: path.clone(),
            source,
        })?;

        debug!(?path, "opened shared object");
        Ok(Self { library, path })
    }

    /// Look up an exported function and copy out its address.
    ///
    /// # Safety
    /// `F` must be an `extern "C"` function pointer type matching the real
    /// signature of `symbol`, and the returned pointer must not be called
    /// after this object is closed.
    pub unsafe fn function<F: Copy>(&self, symbol: &str) -> Result<F> {
        let mut name = Vec::with_capacity(symbol.len() + 1);
        name.extend_from_slice(symbol.as_bytes());
        name.push(0);

        // SAFETY: forwarded from this function's contract.
        let found = unsafe { self.library.get::<F>(&name) };
        match found {
            Ok(sym) => Ok(*sym),
            Err(source) => Err(LoadError::MissingSymbol {
                symbol: symbol.to_string(),
                source,
            }),
        }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Unload the shared object. Returns whether the platform loader agreed.
    pub fn close(self) -> bool {
        let path = self.path;
        match self.library.close() {
            Ok(()) => {
                debug!(?path, "closed shared object");
                true
            }
            Err(source) => {
                let err = LoadError::Close { path, source };
                warn!(error = %err, "failed to close shared object");
                false
            }
        }
    }
}

impl std::fmt::Debug for SharedObject {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("SharedObject")
            .field("path", &self.path)
            .finish()
    }
}

/// File name of a component's shared object on this platform.
pub fn platform_file_name(model_identifier: &str) -> String {
    format!("{model_identifier}.{}", std::env::consts::DLL_EXTENSION)
}
