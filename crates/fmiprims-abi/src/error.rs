use std::path::PathBuf;

/// Errors raised while loading or unloading a simulation unit's shared object.
#[derive(Debug, thiserror::Error)]
pub enum LoadError {
    /// The shared object does not exist at the given path.
    #[error("shared object not found: {path}")]
    NotFound { path: PathBuf },

    /// The file exists but the platform loader rejected it.
    #[error("failed to open {path}: {source}")]
    Open {
        path: PathBuf,
        source: libloading::Error,
    },

    /// A required entry point is not exported.
    #[error("missing symbol {symbol}: {source}")]
    MissingSymbol {
        symbol: String,
        source: libloading::Error,
    },

    /// The platform loader failed to release the shared object.
    #[error("failed to close {path}: {source}")]
    Close {
        path: PathBuf,
        source: libloading::Error,
    },
}

pub type Result<T> = std::result::Result<T, LoadError>;
