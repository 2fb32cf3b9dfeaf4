use std::fmt;

use serde::{Deserialize, Serialize};

/// Declared type of a named variable.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ScalarKind {
    Integer,
    Real,
    String,
    Boolean,
    /// Exchanged through the integer entry points.
    Enumeration,
}

impl ScalarKind {
    /// Whether a variable declared as `self` may be accessed as `requested`.
    pub fn accepts(self, requested: ScalarKind) -> bool {
        self.exchange_kind() == requested.exchange_kind()
    }

    /// The kind whose native entry points carry this one.
    pub fn exchange_kind(self) -> ScalarKind {
        match self {
            ScalarKind::Enumeration => ScalarKind::Integer,
            other => other,
        }
    }

    pub fn as_str(self) -> &'static str {
        match self {
            ScalarKind::Integer => "integer",
            ScalarKind::Real => "real",
            ScalarKind::String => "string",
            ScalarKind::Boolean => "boolean",
            ScalarKind::Enumeration => "enumeration",
        }
    }
}

impl fmt::Display for ScalarKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn enumeration_travels_as_integer() {
        assert!(ScalarKind::Enumeration.accepts(ScalarKind::Integer));
        assert!(ScalarKind::Integer.accepts(ScalarKind::Enumeration));
        assert!(!ScalarKind::Enumeration.accepts(ScalarKind::Real));
        assert!(!ScalarKind::String.accepts(ScalarKind::Boolean));
    }

    #[test]
    fn parses_lowercase_names() {
        let kind: ScalarKind = serde_json::from_str("\"enumeration\"").unwrap();
        assert_eq!(kind, ScalarKind::Enumeration);
        assert_eq!(kind.to_string(), "enumeration");
    }
}
