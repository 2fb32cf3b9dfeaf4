use fmiprims_abi::{StatusCode, ValueReference};
use fmiprims_instance::{
    BooleanArrayRead, BooleanRead, ComponentInstance, EnumerationRead, ExchangeValue,
    IntegerArrayRead, IntegerRead, ReadResult, RealArrayRead, RealRead, StringArrayRead,
    StringRead,
};

use crate::cache::{NameCache, Resolved};
use crate::error::{AccessError, Result};
use crate::kind::ScalarKind;

/// Name-based front end to a [`ComponentInstance`].
///
/// Holds shared references only; it owns no native resource and can be
/// created and dropped freely.
#[derive(Debug, Clone, Copy)]
pub struct VariableAccessor<'a> {
    instance: &'a ComponentInstance,
    names: &'a NameCache,
}

impl<'a> VariableAccessor<'a> {
    pub fn new(instance: &'a ComponentInstance, names: &'a NameCache) -> Self {
        Self { instance, names }
    }

    pub fn instance(&self) -> &'a ComponentInstance {
        self.instance
    }

    pub fn resolve(&self, name: &str) -> Result<ValueReference> {
        self.names.resolve(name)
    }

    /// A view bound to one resolved variable.
    pub fn variable(&self, name: &str) -> Result<Variable<'a>> {
        let Resolved {
            value_reference,
            kind,
        } = self.names.lookup(name)?;
        Ok(Variable {
            instance: self.instance,
            name: name.to_string(),
            value_reference,
            kind,
        })
    }

    pub fn read_integer(&self, name: &str) -> Result<IntegerRead> {
        self.variable(name)?.read_integer()
    }

    pub fn read_real(&self, name: &str) -> Result<RealRead> {
        self.variable(name)?.read_real()
    }

    pub fn read_string(&self, name: &str) -> Result<StringRead> {
        self.variable(name)?.read_string()
    }

    pub fn read_boolean(&self, name: &str) -> Result<BooleanRead> {
        self.variable(name)?.read_boolean()
    }

    pub fn read_enumeration(&self, name: &str) -> Result<EnumerationRead> {
        self.variable(name)?.read_enumeration()
    }

    pub fn write_integer(&self, name: &str, value: i32) -> Result<StatusCode> {
        self.variable(name)?.write_integer(value)
    }

    pub fn write_real(&self, name: &str, value: f64) -> Result<StatusCode> {
        self.variable(name)?.write_real(value)
    }

    pub fn write_string(&self, name: &str, value: impl Into<String>) -> Result<StatusCode> {
        self.variable(name)?.write_string(value)
    }

    pub fn write_boolean(&self, name: &str, value: bool) -> Result<StatusCode> {
        self.variable(name)?.write_boolean(value)
    }

    pub fn write_enumeration(&self, name: &str, value: i32) -> Result<StatusCode> {
        self.variable(name)?.write_enumeration(value)
    }

    pub fn read_integers(&self, refs: &[ValueReference]) -> Result<IntegerArrayRead> {
        Ok(self.instance.read_integers(refs)?)
    }

    pub fn read_reals(&self, refs: &[ValueReference]) -> Result<RealArrayRead> {
        Ok(self.instance.read_reals(refs)?)
    }

    pub fn read_strings(&self, refs: &[ValueReference]) -> Result<StringArrayRead> {
        Ok(self.instance.read_strings(refs)?)
    }

    pub fn read_booleans(&self, refs: &[ValueReference]) -> Result<BooleanArrayRead> {
        Ok(self.instance.read_booleans(refs)?)
    }

    pub fn read_into<T: ExchangeValue>(
        &self,
        refs: &[ValueReference],
        values: &mut [T],
    ) -> Result<StatusCode> {
        Ok(self.instance.read_into(refs, values)?)
    }

    pub fn write_from<T: ExchangeValue>(
        &self,
        refs: &[ValueReference],
        values: &[T],
    ) -> Result<StatusCode> {
        Ok(self.instance.write_from(refs, values)?)
    }
}

/// One variable of one instance, resolved.
#[derive(Debug, Clone)]
pub struct Variable<'a> {
    instance: &'a ComponentInstance,
    name: String,
    value_reference: ValueReference,
    kind: Option<ScalarKind>,
}

impl Variable<'_> {
    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn value_reference(&self) -> ValueReference {
        self.value_reference
    }

    /// Declared kind, when the resolver provided one.
    pub fn kind(&self) -> Option<ScalarKind> {
        self.kind
    }

    pub fn read_integer(&self) -> Result<IntegerRead> {
        self.read(ScalarKind::Integer)
    }

    pub fn read_real(&self) -> Result<RealRead> {
        self.read(ScalarKind::Real)
    }

    pub fn read_string(&self) -> Result<StringRead> {
        self.read(ScalarKind::String)
    }

    pub fn read_boolean(&self) -> Result<BooleanRead> {
        self.read(ScalarKind::Boolean)
    }

    pub fn read_enumeration(&self) -> Result<EnumerationRead> {
        self.read(ScalarKind::Enumeration)
    }

    pub fn write_integer(&self, value: i32) -> Result<StatusCode> {
        self.write(ScalarKind::Integer, value)
    }

    pub fn write_real(&self, value: f64) -> Result<StatusCode> {
        self.write(ScalarKind::Real, value)
    }

    pub fn write_string(&self, value: impl Into<String>) -> Result<StatusCode> {
        self.write(ScalarKind::String, value.into())
    }

    pub fn write_boolean(&self, value: bool) -> Result<StatusCode> {
        self.write(ScalarKind::Boolean, value)
    }

    pub fn write_enumeration(&self, value: i32) -> Result<StatusCode> {
        self.write(ScalarKind::Enumeration, value)
    }

    fn read<T: ExchangeValue>(&self, requested: ScalarKind) -> Result<ReadResult<T>> {
        self.check_kind(requested)?;
        Ok(self.instance.read(self.value_reference)?)
    }

    fn write<T: ExchangeValue>(&self, requested: ScalarKind, value: T) -> Result<StatusCode> {
        self.check_kind(requested)?;
        Ok(self.instance.write(self.value_reference, value)?)
    }

    fn check_kind(&self, requested: ScalarKind) -> Result<()> {
        match self.kind {
            Some(actual) if !actual.accepts(requested) => Err(AccessError::KindMismatch {
                name: self.name.clone(),
                expected: requested,
                actual,
            }),
            _ => Ok(()),
        }
    }
}

#[cfg(test)]
mod tests {
    use std::sync::Arc;

    use fmiprims_abi::mock::{self, MockBinding};
    use fmiprims_abi::InstantiateParams;

    use crate::table::{VariableEntry, VariableTable};

    use super::*;

    fn fixture() -> (Arc<MockBinding>, ComponentInstance, NameCache) {
        let mock = Arc::new(MockBinding::new());
        let instance =
            ComponentInstance::create(mock.clone(), &InstantiateParams::new("access", "")).unwrap();
        let table = VariableTable::from_entries([
            VariableEntry::new("x", 5, ScalarKind::Real),
            VariableEntry::new("count", 1, ScalarKind::Integer),
            VariableEntry::new("mode", 2, ScalarKind::Enumeration),
            VariableEntry::new("label", 3, ScalarKind::String),
            VariableEntry::new("on", 4, ScalarKind::Boolean),
        ])
        .unwrap();
        (mock, instance, NameCache::new(Arc::new(table)))
    }

    #[test]
    fn named_access_round_trips() {
        let (mock, instance, names) = fixture();
        let access = VariableAccessor::new(&instance, &names);

        assert_eq!(access.write_real("x", 2.5).unwrap(), StatusCode::Ok);
        assert_eq!(mock.stored_real(5), Some(2.5));
        assert_eq!(access.read_real("x").unwrap().ok(), Some(2.5));

        access.write_string("label", "tank").unwrap();
        assert_eq!(access.read_string("label").unwrap().ok().as_deref(), Some("tank"));

        access.write_boolean("on", true).unwrap();
        assert_eq!(access.read_boolean("on").unwrap().ok(), Some(true));
    }

    #[test]
    fn enumeration_uses_integer_path() {
        let (_mock, instance, names) = fixture();
        let access = VariableAccessor::new(&instance, &names);

        access.write_enumeration("mode", 3).unwrap();
        assert_eq!(access.read_integer("mode").unwrap().ok(), Some(3));
        access.write_integer("count", 7).unwrap();
        assert_eq!(access.read_enumeration("count").unwrap().ok(), Some(7));
    }

    #[test]
    fn wrong_kind_is_rejected_before_native_call() {
        let (mock, instance, names) = fixture();
        let access = VariableAccessor::new(&instance, &names);

        let err = access.write_boolean("x", true).unwrap_err();
        assert!(matches!(
            err,
            AccessError::KindMismatch {
                expected: ScalarKind::Boolean,
                actual: ScalarKind::Real,
                ..
            }
        ));
        assert_eq!(mock.calls(mock::SET), 0);
    }

    #[test]
    fn unknown_name_is_reported() {
        let (_mock, instance, names) = fixture();
        let access = VariableAccessor::new(&instance, &names);
        assert!(matches!(
            access.read_real("missing"),
            Err(AccessError::UnknownVariable(_))
        ));
    }

    #[test]
    fn variable_view_carries_resolution() {
        let (_mock, instance, names) = fixture();
        let access = VariableAccessor::new(&instance, &names);

        let x = access.variable("x").unwrap();
        assert_eq!(x.name(), "x");
        assert_eq!(x.value_reference(), 5);
        assert_eq!(x.kind(), Some(ScalarKind::Real));
        x.write_real(1.25).unwrap();
        assert_eq!(x.read_real().unwrap().ok(), Some(1.25));
    }

    #[test]
    fn vector_forms_take_references() {
        let (_mock, instance, names) = fixture();
        let access = VariableAccessor::new(&instance, &names);

        let refs = [names.resolve("x").unwrap(), 6];
        assert!(access.write_from(&refs, &[1.0, 2.0]).unwrap().is_ok());
        assert_eq!(access.read_reals(&refs).unwrap().ok(), Some(vec![1.0, 2.0]));
    }
}
