use std::sync::Arc;

use dashmap::DashMap;
use fmiprims_abi::ValueReference;
use tracing::debug;

use crate::error::{AccessError, Result};
use crate::kind::ScalarKind;
use crate::resolver::ValueReferenceResolver;

/// A name resolved once and remembered.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Resolved {
    pub value_reference: ValueReference,
    pub kind: Option<ScalarKind>,
}

/// Name resolution for one component, memoized.
///
/// Each name reaches the underlying resolver at most once, even under
/// concurrent first lookups. The cache belongs to the component whose
/// metadata it was built from; two components never share one.
pub struct NameCache {
    resolver: Arc<dyn ValueReferenceResolver>,
    entries: DashMap<String, Resolved>,
}

impl NameCache {
    pub fn new(resolver: Arc<dyn ValueReferenceResolver>) -> Self {
        Self {
            resolver,
            entries: DashMap::new(),
        }
    }

    /// Resolve `name`, consulting the resolver only on first use.
    pub fn lookup(&self, name: &str) -> Result<Resolved> {
        if let Some(hit) = self.entries.get(name) {
            return Ok(*hit);
        }

        let entry = self
            .entries
            .entry(name.to_string())
            .or_try_insert_with(|| {
                let value_reference = self
                    .resolver
                    .resolve_value_reference(name)
                    .ok_or_else(|| AccessError::UnknownVariable(name.to_string()))?;
                let kind = self.resolver.variable_kind(name);
                debug!(name, value_reference, "variable resolved");
                Ok::<_, AccessError>(Resolved {
                    value_reference,
                    kind,
                })
            })?;
        Ok(*entry)
    }

    pub fn resolve(&self, name: &str) -> Result<ValueReference> {
        self.lookup(name).map(|resolved| resolved.value_reference)
    }

    /// Whether `name` has already been resolved.
    pub fn contains(&self, name: &str) -> bool {
        self.entries.contains_key(name)
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn clear(&self) {
        self.entries.clear();
    }

    pub fn resolver(&self) -> &Arc<dyn ValueReferenceResolver> {
        &self.resolver
    }
}

impl std::fmt::Debug for NameCache {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("NameCache")
            .field("cached", &self.entries.len())
            .finish()
    }
}
