use std::collections::HashMap;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Barrier};
use std::thread;

use fmiprims_abi::mock::MockBinding;
use fmiprims_abi::{InstantiateParams, StatusCode, ValueReference};
use fmiprims_access::{AccessError, NameCache, ValueReferenceResolver, VariableAccessor};
use fmiprims_instance::ComponentInstance;

struct CountingResolver {
    names: HashMap<String, ValueReference>,
    lookups: AtomicUsize,
}

impl CountingResolver {
    fn new(names: &[(&str, ValueReference)]) -> Self {
        Self {
            names: names
                .iter()
                .map(|(name, vr)| (name.to_string(), *vr))
                .collect(),
            lookups: AtomicUsize::new(0),
        }
    }

    fn lookups(&self) -> usize {
        self.lookups.load(Ordering::SeqCst)
    }
}

impl ValueReferenceResolver for CountingResolver {
    fn resolve_value_reference(&self, name: &str) -> Option<ValueReference> {
        self.lookups.fetch_add(1, Ordering::SeqCst);
        self.names.get(name).copied()
    }
}

#[test]
fn resolve_hits_metadata_once_per_name() {
    let resolver = Arc::new(CountingResolver::new(&[("x", 5), ("y", 6)]));
    let names = NameCache::new(resolver.clone());

    let first = names.resolve("x").unwrap();
    let second = names.resolve("x").unwrap();
    assert_eq!(first, second);
    assert_eq!(resolver.lookups(), 1);

    names.resolve("y").unwrap();
    assert_eq!(resolver.lookups(), 2);
}

#[test]
fn unknown_names_are_looked_up_each_time() {
    let resolver = Arc::new(CountingResolver::new(&[]));
    let names = NameCache::new(resolver.clone());

    for _ in 0..2 {
        assert!(matches!(
            names.resolve("ghost"),
            Err(AccessError::UnknownVariable(_))
        ));
    }
    assert_eq!(resolver.lookups(), 2);
}

#[test]
fn concurrent_first_lookups_resolve_once() {
    const THREADS: usize = 8;

    let resolver = Arc::new(CountingResolver::new(&[("shared", 42)]));
    let names = Arc::new(NameCache::new(resolver.clone()));
    let barrier = Arc::new(Barrier::new(THREADS));

    let workers: Vec<_> = (0..THREADS)
        .map(|_| {
            let names = Arc::clone(&names);
            let barrier = Arc::clone(&barrier);
            thread::spawn(move || {
                barrier.wait();
                names.resolve("shared").unwrap()
            })
        })
        .collect();
    for worker in workers {
        assert_eq!(worker.join().expect("resolver thread panicked"), 42);
    }
    assert_eq!(resolver.lookups(), 1);
}

#[test]
fn caches_are_scoped_per_component() {
    let first = NameCache::new(Arc::new(CountingResolver::new(&[("x", 1)])));
    let second = NameCache::new(Arc::new(CountingResolver::new(&[("x", 2)])));
    assert_eq!(first.resolve("x").unwrap(), 1);
    assert_eq!(second.resolve("x").unwrap(), 2);
}

#[test]
fn accessor_without_kinds_dispatches_by_name() {
    let mock = Arc::new(MockBinding::new());
    let instance =
        ComponentInstance::create(mock.clone(), &InstantiateParams::new("named", "")).unwrap();
    instance.setup(0.0, 1.0).unwrap();
    let names = NameCache::new(Arc::new(CountingResolver::new(&[("x", 5)])));
    let access = VariableAccessor::new(&instance, &names);

    assert_eq!(access.write_real("x", 3.14).unwrap(), StatusCode::Ok);
    assert_eq!(access.read_real("x").unwrap().ok(), Some(3.14));
    assert_eq!(mock.stored_real(5), Some(3.14));

    instance.terminate(true).unwrap();
    assert!(matches!(
        access.read_real("x"),
        Err(AccessError::Instance(_))
    ));
}
