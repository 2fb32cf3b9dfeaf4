use std::collections::HashMap;
use std::io::Read;
use std::path::Path;

use fmiprims_abi::ValueReference;
use serde::Deserialize;

use crate::config::TableConfig;
use crate::error::{AccessError, Result};
use crate::kind::ScalarKind;
use crate::resolver::ValueReferenceResolver;

/// One named variable of a component.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct VariableEntry {
    pub name: String,
    pub value_reference: ValueReference,
    pub kind: ScalarKind,
}

impl VariableEntry {
    pub fn new(name: impl Into<String>, value_reference: ValueReference, kind: ScalarKind) -> Self {
        Self {
            name: name.into(),
            value_reference,
            kind,
        }
    }
}

#[derive(Deserialize)]
struct TableDocument {
    variables: Vec<VariableEntry>,
}

/// In-memory name table implementing [`ValueReferenceResolver`].
///
/// JSON input has the shape
/// `{"variables": [{"name": "x", "valueReference": 5, "kind": "real"}]}`.
#[derive(Debug, Clone, Default)]
pub struct VariableTable {
    entries: HashMap<String, VariableEntry>,
    config: TableConfig,
}

impl VariableTable {
    pub fn new() -> Self {
        Self::with_config(TableConfig::default())
    }

    pub fn with_config(config: TableConfig) -> Self {
        Self {
            entries: HashMap::new(),
            config,
        }
    }

    /// Add one variable. Names must be unique.
    pub fn insert(&mut self, entry: VariableEntry) -> Result<()> {
        if self.entries.contains_key(&entry.name) {
            return Err(AccessError::Table(format!(
                "duplicate variable name: {}",
                entry.name
            )));
        }
        if self.entries.len() >= self.config.max_variables {
            return Err(AccessError::Table(format!(
                "variable count exceeds configured max ({})",
                self.config.max_variables
            )));
        }
        self.entries.insert(entry.name.clone(), entry);
        Ok(())
    }

    pub fn from_entries(entries: impl IntoIterator<Item = VariableEntry>) -> Result<Self> {
        let mut table = Self::new();
        for entry in entries {
            table.insert(entry)?;
        }
        Ok(table)
    }

    /// Build a table from a JSON document.
    pub fn from_json(json: &str) -> Result<Self> {
        Self::from_json_with_config(json, TableConfig::default())
    }

    pub fn from_json_with_config(json: &str, config: TableConfig) -> Result<Self> {
        let document: TableDocument = serde_json::from_str(json)?;
        let mut table = Self::with_config(config);
        for entry in document.variables {
            table.insert(entry)?;
        }
        Ok(table)
    }

    /// Load a table from a JSON file.
    pub fn from_file(path: &Path) -> Result<Self> {
        Self::from_file_with_config(path, TableConfig::default())
    }

    pub fn from_file_with_config(path: &Path, config: TableConfig) -> Result<Self> {
        let file = std::fs::File::open(path).map_err(|err| {
            AccessError::Table(format!("failed opening {}: {err}", path.display()))
        })?;
        let metadata = file
            .metadata()
            .map_err(|err| AccessError::Table(err.to_string()))?;
        if !metadata.is_file() {
            return Err(AccessError::Table(format!(
                "not a regular file: {}",
                path.display()
            )));
        }
        if metadata.len() > config.max_file_size as u64 {
            return Err(AccessError::Table(format!(
                "table file too large ({} bytes): {}",
                metadata.len(),
                path.display()
            )));
        }

        let max_bytes = config.max_file_size;
        let read_limit = u64::try_from(max_bytes.saturating_add(1)).unwrap_or(u64::MAX);
        let mut content = String::new();
        file.take(read_limit)
            .read_to_string(&mut content)
            .map_err(|err| {
                AccessError::Table(format!("failed reading {}: {err}", path.display()))
            })?;
        if content.len() > max_bytes {
            return Err(AccessError::Table(format!(
                "table file too large while reading: {}",
                path.display()
            )));
        }

        Self::from_json_with_config(&content, config)
    }

    pub fn get(&self, name: &str) -> Option<&VariableEntry> {
        self.entries.get(name)
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Variable names in sorted order.
    pub fn names(&self) -> Vec<&str> {
        let mut names: Vec<&str> = self.entries.keys().map(String::as_str).collect();
        names.sort_unstable();
        names
    }

    pub fn config(&self) -> &TableConfig {
        &self.config
    }
}

impl ValueReferenceResolver for VariableTable {
    fn resolve_value_reference(&self, name: &str) -> Option<ValueReference> {
        self.entries.get(name).map(|entry| entry.value_reference)
    }

    fn variable_kind(&self, name: &str) -> Option<ScalarKind> {
        self.entries.get(name).map(|entry| entry.kind)
    }
}

#[cfg(test)]
mod tests {
    use std::path::PathBuf;

    use super::*;

    const TABLE: &str = r#"{
        "variables": [
            { "name": "x", "valueReference": 5, "kind": "real" },
            { "name": "n", "valueReference": 1, "kind": "integer" },
            { "name": "mode", "valueReference": 2, "kind": "enumeration" }
        ]
    }"#;

    fn make_temp_dir(tag: &str) -> PathBuf {
        let dir = std::env::temp_dir().join(format!(
            "fmiprims-table-{tag}-{}-{}",
            std::process::id(),
            std::time::SystemTime::now()
                .duration_since(std::time::UNIX_EPOCH)
                .unwrap()
                .as_nanos()
        ));
        std::fs::create_dir_all(&dir).unwrap();
        dir
    }

    #[test]
    fn from_json_resolves_names_and_kinds() {
        let table = VariableTable::from_json(TABLE).unwrap();
        assert_eq!(table.len(), 3);
        assert_eq!(table.resolve_value_reference("x"), Some(5));
        assert_eq!(table.variable_kind("mode"), Some(ScalarKind::Enumeration));
        assert_eq!(table.resolve_value_reference("missing"), None);
        assert_eq!(table.names(), vec!["mode", "n", "x"]);
    }

    #[test]
    fn duplicate_names_are_rejected() {
        let result = VariableTable::from_entries([
            VariableEntry::new("x", 1, ScalarKind::Real),
            VariableEntry::new("x", 2, ScalarKind::Real),
        ]);
        assert!(matches!(result, Err(AccessError::Table(_))));
    }

    #[test]
    fn shared_value_references_are_allowed() {
        let table = VariableTable::from_entries([
            VariableEntry::new("x", 1, ScalarKind::Real),
            VariableEntry::new("x_alias", 1, ScalarKind::Real),
        ])
        .unwrap();
        assert_eq!(table.resolve_value_reference("x_alias"), Some(1));
    }

    #[test]
    fn invalid_json_fails() {
        assert!(matches!(
            VariableTable::from_json("not-json"),
            Err(AccessError::Json(_))
        ));
        assert!(matches!(
            VariableTable::from_json(r#"{"variables":[{"name":"x","valueReference":1,"kind":"complex"}]}"#),
            Err(AccessError::Json(_))
        ));
    }

    #[test]
    fn variable_count_limit_is_enforced() {
        let config = TableConfig {
            max_variables: 2,
            ..TableConfig::default()
        };
        let result = VariableTable::from_json_with_config(TABLE, config);
        assert!(matches!(result, Err(AccessError::Table(_))));
    }

    #[test]
    fn from_file_loads_table() {
        let dir = make_temp_dir("load");
        let path = dir.join("variables.json");
        std::fs::write(&path, TABLE).unwrap();

        let table = VariableTable::from_file(&path).unwrap();
        assert_eq!(table.resolve_value_reference("n"), Some(1));

        let _ = std::fs::remove_dir_all(&dir);
    }

    #[test]
    fn file_size_limit_is_enforced() {
        let dir = make_temp_dir("size-limit");
        let path = dir.join("variables.json");
        std::fs::write(&path, TABLE).unwrap();

        let config = TableConfig {
            max_file_size: 16,
            ..TableConfig::default()
        };
        let result = VariableTable::from_file_with_config(&path, config);
        assert!(matches!(result, Err(AccessError::Table(_))));

        let _ = std::fs::remove_dir_all(&dir);
    }

    #[test]
    fn missing_file_is_a_table_error() {
        let dir = make_temp_dir("missing");
        let result = VariableTable::from_file(&dir.join("absent.json"));
        assert!(matches!(result, Err(AccessError::Table(_))));
        let _ = std::fs::remove_dir_all(&dir);
    }
}
