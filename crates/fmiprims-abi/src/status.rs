use std::fmt;

use serde::Serialize;

/// Outcome of a call into a simulation unit.
///
/// Variants are declared in order of severity so that `Ord` compares them the
/// way callers expect (`Warning < Error`). `None` sorts first: it means no
/// call has been made yet, not that a call succeeded.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Default, Serialize)]
pub enum StatusCode {
    /// No native call has been issued yet.
    #[default]
    None,
    Ok,
    Warning,
    Discard,
    /// An asynchronous step is still running (co-simulation only).
    Pending,
    Error,
    Fatal,
}

impl StatusCode {
    /// Returns true only for [`StatusCode::Ok`].
    pub fn is_ok(self) -> bool {
        self == StatusCode::Ok
    }

    /// Returns true for `OK` and `Warning`, the outcomes after which a
    /// component is still usable.
    pub fn is_success(self) -> bool {
        matches!(self, StatusCode::Ok | StatusCode::Warning)
    }

    /// Returns true for `Error` and `Fatal`.
    pub fn is_failure(self) -> bool {
        self >= StatusCode::Error
    }

    /// The more severe of two outcomes.
    pub fn worst(self, other: StatusCode) -> StatusCode {
        self.max(other)
    }

    pub fn as_str(self) -> &'static str {
        match self {
            StatusCode::None => "None",
            StatusCode::Ok => "OK",
            StatusCode::Warning => "Warning",
            StatusCode::Discard => "Discard",
            StatusCode::Pending => "Pending",
            StatusCode::Error => "Error",
            StatusCode::Fatal => "Fatal",
        }
    }
}

impl fmt::Display for StatusCode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}
