use serde::Deserialize;

/// Controls how a [`ComponentInstance`](crate::ComponentInstance) sizes its
/// reusable exchange buffers.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize)]
#[serde(default, rename_all = "camelCase")]
pub struct InstanceConfig {
    /// Slots per scalar kind. Batch reads up to this many references reuse
    /// the buffers instead of allocating. Values below 1 are raised to 1.
    pub buffer_capacity: usize,
}

impl Default for InstanceConfig {
    fn default() -> Self {
        Self { buffer_capacity: 1 }
    }
}

impl InstanceConfig {
    pub(crate) fn effective_capacity(&self) -> usize {
        self.buffer_capacity.max(1)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn capacity_never_drops_below_one() {
        let config = InstanceConfig { buffer_capacity: 0 };
        assert_eq!(config.effective_capacity(), 1);
        assert_eq!(InstanceConfig::default().effective_capacity(), 1);
    }

    #[test]
    fn deserializes_with_defaults() {
        let config: InstanceConfig = serde_json::from_str("{}").unwrap();
        assert_eq!(config, InstanceConfig::default());

        let config: InstanceConfig = serde_json::from_str(r#"{"bufferCapacity":16}"#).unwrap();
        assert_eq!(config.buffer_capacity, 16);
    }
}
