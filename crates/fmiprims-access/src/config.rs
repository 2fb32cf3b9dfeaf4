use serde::Deserialize;

/// Bounds applied when loading a [`VariableTable`](crate::VariableTable).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize)]
#[serde(default, rename_all = "camelCase")]
pub struct TableConfig {
    /// Maximum number of variables in one table.
    pub max_variables: usize,
    /// Maximum bytes read from a table file.
    pub max_file_size: usize,
}

impl Default for TableConfig {
    fn default() -> Self {
        Self {
            max_variables: 65_536,
            max_file_size: 4 * 1024 * 1024,
        }
    }
}
