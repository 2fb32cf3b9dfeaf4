use fmiprims_abi::ValueReference;

use crate::kind::ScalarKind;

/// Source of name to value-reference mappings, usually a component's
/// model description.
pub trait ValueReferenceResolver: Send + Sync {
    fn resolve_value_reference(&self, name: &str) -> Option<ValueReference>;

    /// Declared kind of `name`, if the resolver knows it.
    fn variable_kind(&self, _name: &str) -> Option<ScalarKind> {
        None
    }
}
