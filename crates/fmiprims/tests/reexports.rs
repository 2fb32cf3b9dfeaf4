use std::sync::Arc;

use fmiprims::abi::mock::MockBinding;
use fmiprims::abi::{InstantiateParams, StatusCode};
use fmiprims::access::{NameCache, ScalarKind, VariableAccessor, VariableEntry, VariableTable};
use fmiprims::instance::{ComponentInstance, LifecycleState};

#[test]
fn full_stack_through_reexports() {
    let mock = Arc::new(MockBinding::new());
    let instance =
        ComponentInstance::create(mock.clone(), &InstantiateParams::new("stack", "guid")).unwrap();
    assert_eq!(instance.setup(0.0, 1.0).unwrap(), StatusCode::Ok);

    let table = VariableTable::from_entries([VariableEntry::new("h", 0, ScalarKind::Real)]).unwrap();
    let names = NameCache::new(Arc::new(table));
    let access = VariableAccessor::new(&instance, &names);

    mock.preset_real(0, 1.0);
    assert_eq!(instance.step(0.0, 0.5).unwrap(), StatusCode::Ok);
    assert_eq!(access.read_real("h").unwrap().ok(), Some(1.0));

    assert_eq!(instance.terminate(true).unwrap(), StatusCode::Ok);
    assert_eq!(instance.state(), LifecycleState::Freed);
    assert_eq!(mock.live_instances(), 0);
}
