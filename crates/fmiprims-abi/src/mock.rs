//! In-process stand-in for a native component, for tests.
//!
//! Values are stored per value reference with last-write-wins semantics.
//! Every entry point counts its calls, can be forced to return a given
//! status, and can be made to panic to simulate a faulting component.

use std::collections::{HashMap, HashSet};
use std::ffi::c_void;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Mutex;
use std::time::Duration;

use crate::params::{Experiment, InstantiateParams};
use crate::status::StatusCode;
use crate::traits::{AbiRevision, ComponentHandle, NativeBinding, ValueReference};

pub const INSTANTIATE: &str = "instantiate";
pub const SETUP: &str = "setup";
pub const STEP: &str = "step";
pub const TERMINATE: &str = "terminate";
pub const RESET: &str = "reset";
pub const FREE_INSTANCE: &str = "free_instance";
pub const GET: &str = "get";
pub const SET: &str = "set";

#[derive(Default)]
struct Store {
    integers: HashMap<ValueReference, i32>,
    reals: HashMap<ValueReference, f64>,
    strings: HashMap<ValueReference, String>,
    booleans: HashMap<ValueReference, bool>,
}

/// Test double implementing [`NativeBinding`].
#[derive(Default)]
pub struct MockBinding {
    revision: Option<AbiRevision>,
    store: Mutex<Store>,
    calls: Mutex<HashMap<&'static str, usize>>,
    statuses: Mutex<HashMap<&'static str, StatusCode>>,
    panics: Mutex<HashSet<&'static str>>,
    refuse_instantiation: bool,
    get_delay: Option<Duration>,
    live: AtomicUsize,
}

impl MockBinding {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_revision(mut self, revision: AbiRevision) -> Self {
        self.revision = Some(revision);
        self
    }

    /// Sleep inside every getter between reading the value references and
    /// writing the values, to expose unsynchronized buffer reuse.
    pub fn with_get_delay(mut self, delay: Duration) -> Self {
        self.get_delay = Some(delay);
        self
    }

    /// Make `instantiate` return null.
    pub fn refusing_instantiation(mut self) -> Self {
        self.refuse_instantiation = true;
        self
    }

    /// Force `operation` to return `status` from now on.
    pub fn set_status(&self, operation: &'static str, status: StatusCode) {
        lock(&self.statuses).insert(operation, status);
    }

    /// Make `operation` panic from now on.
    pub fn set_panic(&self, operation: &'static str) {
        lock(&self.panics).insert(operation);
    }

    /// Number of times `operation` was called.
    pub fn calls(&self, operation: &'static str) -> usize {
        lock(&self.calls).get(operation).copied().unwrap_or(0)
    }

    /// Instances created and not yet freed.
    pub fn live_instances(&self) -> usize {
        self.live.load(Ordering::SeqCst)
    }

    pub fn stored_real(&self, vr: ValueReference) -> Option<f64> {
        lock(&self.store).reals.get(&vr).copied()
    }

    pub fn preset_real(&self, vr: ValueReference, value: f64) {
        lock(&self.store).reals.insert(vr, value);
    }

    fn enter(&self, operation: &'static str) -> StatusCode {
        *lock(&self.calls).entry(operation).or_insert(0) += 1;
        if lock(&self.panics).contains(operation) {
            panic!("mock component fault in {operation}");
        }
        lock(&self.statuses)
            .get(operation)
            .copied()
            .unwrap_or(StatusCode::Ok)
    }

    fn get<T: Clone + Default>(
        &self,
        vr: &[ValueReference],
        values: &mut [T],
        pick: impl Fn(&Store) -> &HashMap<ValueReference, T>,
    ) -> StatusCode {
        let status = self.enter(GET);
        if let Some(delay) = self.get_delay {
            std::thread::sleep(delay);
        }
        let store = lock(&self.store);
        let map = pick(&*store);
        for (slot, reference) in values.iter_mut().zip(vr) {
            *slot = map.get(reference).cloned().unwrap_or_default();
        }
        status
    }

    fn set<T: Clone>(
        &self,
        vr: &[ValueReference],
        values: &[T],
        pick: impl Fn(&mut Store) -> &mut HashMap<ValueReference, T>,
    ) -> StatusCode {
        let status = self.enter(SET);
        let mut store = lock(&self.store);
        let map = pick(&mut *store);
        for (reference, value) in vr.iter().zip(values) {
            map.insert(*reference, value.clone());
        }
        status
    }
}

fn lock<T>(mutex: &Mutex<T>) -> std::sync::MutexGuard<'_, T> {
    mutex.lock().unwrap_or_else(std::sync::PoisonError::into_inner)
}

struct MockComponent {
    _instance_name: String,
}

impl NativeBinding for MockBinding {
    fn revision(&self) -> AbiRevision {
        self.revision.unwrap_or(AbiRevision::V2)
    }

    fn model_identifier(&self) -> &str {
        "mock"
    }

    fn version(&self) -> String {
        self.revision().version_str().to_string()
    }

    fn types_platform(&self) -> String {
        "default".to_string()
    }

    fn instantiate(&self, params: &InstantiateParams) -> Option<ComponentHandle> {
        let _ = self.enter(INSTANTIATE);
        if self.refuse_instantiation {
            return None;
        }
        let component = Box::new(MockComponent {
            _instance_name: params.instance_name.clone(),
        });
        self.live.fetch_add(1, Ordering::SeqCst);
        // SAFETY: the pointer comes from `Box::into_raw` and is reclaimed in
        // `free_instance`.
        unsafe { ComponentHandle::from_raw(Box::into_raw(component).cast::<c_void>()) }
    }

    unsafe fn setup(&self, _c: ComponentHandle, _experiment: &Experiment) -> StatusCode {
        self.enter(SETUP)
    }

    unsafe fn step(&self, _c: ComponentHandle, _current_time: f64, _step_size: f64) -> StatusCode {
        self.enter(STEP)
    }

    unsafe fn terminate(&self, _c: ComponentHandle) -> StatusCode {
        self.enter(TERMINATE)
    }

    unsafe fn reset(&self, _c: ComponentHandle) -> StatusCode {
        self.enter(RESET)
    }

    unsafe fn free_instance(&self, c: ComponentHandle) {
        self.live.fetch_sub(1, Ordering::SeqCst);
        // SAFETY: `c` came from `instantiate` above and is freed exactly once
        // per the trait contract.
        drop(unsafe { Box::from_raw(c.as_ptr().cast::<MockComponent>()) });
        let _ = self.enter(FREE_INSTANCE);
    }

    unsafe fn get_integer(
        &self,
        _c: ComponentHandle,
        vr: &[ValueReference],
        values: &mut [i32],
    ) -> StatusCode {
        self.get(vr, values, |store| &store.integers)
    }

    unsafe fn get_real(
        &self,
        _c: ComponentHandle,
        vr: &[ValueReference],
        values: &mut [f64],
    ) -> StatusCode {
        self.get(vr, values, |store| &store.reals)
    }

    unsafe fn get_string(
        &self,
        _c: ComponentHandle,
        vr: &[ValueReference],
        values: &mut [String],
    ) -> StatusCode {
        self.get(vr, values, |store| &store.strings)
    }

    unsafe fn get_boolean(
        &self,
        _c: ComponentHandle,
        vr: &[ValueReference],
        values: &mut [bool],
    ) -> StatusCode {
        self.get(vr, values, |store| &store.booleans)
    }

    unsafe fn set_integer(
        &self,
        _c: ComponentHandle,
        vr: &[ValueReference],
        values: &[i32],
    ) -> StatusCode {
        self.set(vr, values, |store| &mut store.integers)
    }

    unsafe fn set_real(
        &self,
        _c: ComponentHandle,
        vr: &[ValueReference],
        values: &[f64],
    ) -> StatusCode {
        self.set(vr, values, |store| &mut store.reals)
    }

    unsafe fn set_string(
        &self,
        _c: ComponentHandle,
        vr: &[ValueReference],
        values: &[String],
    ) -> StatusCode {
        self.set(vr, values, |store| &mut store.strings)
    }

    unsafe fn set_boolean(
        &self,
        _c: ComponentHandle,
        vr: &[ValueReference],
        values: &[bool],
    ) -> StatusCode {
        self.set(vr, values, |store| &mut store.booleans)
    }
}
