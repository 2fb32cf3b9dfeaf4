use std::panic::AssertUnwindSafe;
use std::sync::{Arc, Mutex, MutexGuard, PoisonError, RwLock, RwLockReadGuard, RwLockWriteGuard};

use fmiprims_abi::{
    AbiRevision, ComponentHandle, Experiment, InstantiateParams, NativeBinding, StatusCode,
    ValueReference,
};
use tracing::{debug, error, info, warn};

use crate::buffers::{ExchangeBuffers, ExchangeValue};
use crate::config::InstanceConfig;
use crate::error::{InstanceError, Result};
use crate::read::{
    BooleanArrayRead, BooleanRead, IntegerArrayRead, IntegerRead, ReadResult, RealArrayRead,
    RealRead, StringArrayRead, StringRead,
};
use crate::state::LifecycleState;

struct Core {
    state: LifecycleState,
    handle: Option<ComponentHandle>,
    instance_name: String,
    terminated: bool,
}

impl Core {
    /// Handle for a get/set call, or the error explaining why there is none.
    fn exchange_handle(&self, operation: &'static str) -> Result<ComponentHandle> {
        match (self.state, self.handle) {
            (LifecycleState::Freed, _) => Err(InstanceError::StaleHandle { operation }),
            (state, Some(handle)) if state.allows_exchange() => Ok(handle),
            (state, _) => Err(InstanceError::InvalidState { operation, state }),
        }
    }

    fn handle_in(
        &self,
        operation: &'static str,
        expected: LifecycleState,
    ) -> Result<ComponentHandle> {
        match (self.state, self.handle) {
            (LifecycleState::Freed, _) => Err(InstanceError::StaleHandle { operation }),
            (state, Some(handle)) if state == expected => Ok(handle),
            (state, _) => Err(InstanceError::InvalidState { operation, state }),
        }
    }
}

/// Sole owner of one native component instance.
///
/// Lifecycle calls are serialized against everything else. Scalar reads and
/// writes are serialized with each other because they share one set of
/// exchange buffers. Batch calls that bring their own storage are not
/// serialized with each other.
///
/// Native status outcomes come back as [`StatusCode`] values. Only misuse
/// (calling into a freed instance, calling out of order) produces an
/// [`InstanceError`].
///
/// Dropping an instance that still owns a native handle terminates it if
/// needed, frees it, and logs a warning. Call [`terminate`](Self::terminate)
/// or [`free_instance`](Self::free_instance) to release it deliberately.
pub struct ComponentInstance {
    binding: Arc<dyn NativeBinding>,
    core: RwLock<Core>,
    buffers: Mutex<ExchangeBuffers>,
    last_status: Mutex<StatusCode>,
}

impl ComponentInstance {
    /// Wrap a loaded binding. No native instance exists until
    /// [`instantiate`](Self::instantiate) succeeds.
    pub fn new(binding: Arc<dyn NativeBinding>) -> Self {
        Self::with_config(binding, InstanceConfig::default())
    }

    pub fn with_config(binding: Arc<dyn NativeBinding>, config: InstanceConfig) -> Self {
        let capacity = config.effective_capacity();
        Self {
            binding,
            core: RwLock::new(Core {
                state: LifecycleState::Unloaded,
                handle: None,
                instance_name: String::new(),
                terminated: false,
            }),
            buffers: Mutex::new(ExchangeBuffers::with_capacity(capacity)),
            last_status: Mutex::new(StatusCode::None),
        }
    }

    /// Wrap `binding` and instantiate it in one step.
    pub fn create(binding: Arc<dyn NativeBinding>, params: &InstantiateParams) -> Result<Self> {
        let instance = Self::new(binding);
        instance.instantiate(params)?;
        Ok(instance)
    }

    pub fn instantiate(&self, params: &InstantiateParams) -> Result<()> {
        let mut core = self.core_mut()?;
        match core.state {
            LifecycleState::Unloaded => {}
            LifecycleState::Freed => {
                return Err(InstanceError::StaleHandle {
                    operation: "instantiate",
                })
            }
            state => {
                return Err(InstanceError::InvalidState {
                    operation: "instantiate",
                    state,
                })
            }
        }

        let binding = &self.binding;
        let Some(handle) = guarded("instantiate", None, || binding.instantiate(params)) else {
            warn!(
                instance = %params.instance_name,
                model = binding.model_identifier(),
                "component returned no instance"
            );
            return Err(InstanceError::InstantiationFailed {
                instance_name: params.instance_name.clone(),
            });
        };

        core.handle = Some(handle);
        core.state = LifecycleState::Instantiated;
        core.instance_name = params.instance_name.clone();
        info!(
            instance = %core.instance_name,
            model = binding.model_identifier(),
            revision = %binding.revision(),
            "component instantiated"
        );
        Ok(())
    }

    /// Initialize the instance for the interval `[start_time, stop_time]`.
    ///
    /// A `stop_time` that is not after `start_time` is passed as undefined.
    pub fn setup(&self, start_time: f64, stop_time: f64) -> Result<StatusCode> {
        self.setup_experiment(&Experiment::new(start_time, stop_time))
    }

    /// Initialize the instance. `OK` and `Warning` move it to initialized;
    /// on any other status the state is unchanged.
    pub fn setup_experiment(&self, experiment: &Experiment) -> Result<StatusCode> {
        let mut core = self.core_mut()?;
        let handle = core.handle_in("setup", LifecycleState::Instantiated)?;
        let binding = &self.binding;
        // SAFETY: the handle is live while the write lock is held.
        let status = guarded("setup", StatusCode::Error, || unsafe {
            binding.setup(handle, experiment)
        });
        self.record(status);
        if status.is_success() {
            core.state = LifecycleState::Initialized;
            debug!(
                instance = %core.instance_name,
                start = experiment.start_time,
                %status,
                "component initialized"
            );
        } else {
            warn!(instance = %core.instance_name, %status, "component setup failed");
        }
        Ok(status)
    }

    /// Advance the component by one communication step.
    pub fn step(&self, current_time: f64, step_size: f64) -> Result<StatusCode> {
        let core = self.core()?;
        let handle = core.handle_in("step", LifecycleState::Initialized)?;
        let binding = &self.binding;
        // SAFETY: the handle is live while the read lock is held.
        let status = guarded("step", StatusCode::Error, || unsafe {
            binding.step(handle, current_time, step_size)
        });
        Ok(self.record(status))
    }

    /// Terminate the simulation, then free the native instance if
    /// `free_instance` is set.
    ///
    /// A second terminate issues no native call, leaves the last status
    /// untouched and returns `OK`, even if the first one also freed the
    /// instance. A panic raised by the binding is logged and reported as
    /// `OK`; the state still moves to terminated.
    pub fn terminate(&self, free_instance: bool) -> Result<StatusCode> {
        let mut core = self.core_mut()?;
        if core.terminated {
            warn!(
                instance = %core.instance_name,
                state = %core.state,
                "terminate called on a terminated instance; ignored"
            );
            if free_instance && core.handle.is_some() {
                release(&*self.binding, &mut core);
            }
            return Ok(StatusCode::Ok);
        }

        let handle = core.handle_in("terminate", LifecycleState::Initialized)?;
        let binding = &self.binding;
        // SAFETY: the handle is live while the write lock is held.
        let status = guarded("terminate", StatusCode::Ok, || unsafe {
            binding.terminate(handle)
        });
        core.state = LifecycleState::Terminated;
        core.terminated = true;
        self.record(status);
        debug!(instance = %core.instance_name, %status, "component terminated");
        if free_instance {
            release(&*self.binding, &mut core);
        }
        Ok(status)
    }

    /// Free the native instance. Every later call fails with
    /// [`InstanceError::StaleHandle`].
    pub fn free_instance(&self) -> Result<()> {
        let mut core = self.core_mut()?;
        match core.state {
            LifecycleState::Freed => Err(InstanceError::StaleHandle {
                operation: "free_instance",
            }),
            state if state.allows_free() => {
                release(&*self.binding, &mut core);
                Ok(())
            }
            state => Err(InstanceError::InvalidState {
                operation: "free_instance",
                state,
            }),
        }
    }

    /// Reset a terminated instance. Only `OK` moves it back to initialized.
    pub fn reset(&self) -> Result<StatusCode> {
        let mut core = self.core_mut()?;
        let handle = core.handle_in("reset", LifecycleState::Terminated)?;
        let binding = &self.binding;
        // SAFETY: the handle is live while the write lock is held.
        let status = guarded("reset", StatusCode::Error, || unsafe { binding.reset(handle) });
        self.record(status);
        if status.is_ok() {
            core.state = LifecycleState::Initialized;
            core.terminated = false;
            debug!(instance = %core.instance_name, "component reset");
        } else {
            warn!(instance = %core.instance_name, %status, "component reset failed; still terminated");
        }
        Ok(status)
    }

    /// Read one value through the shared exchange buffers.
    pub fn read<T: ExchangeValue>(&self, vr: ValueReference) -> Result<ReadResult<T>> {
        let mut buffers = self.buffers()?;
        let core = self.core()?;
        let handle = core.exchange_handle("read")?;
        let (refs, values) = buffers.stage::<T>(&[vr]);
        let binding = &self.binding;
        // SAFETY: one reference paired with one slot; the handle is live
        // while the read lock is held.
        let status = guarded("read", StatusCode::Error, || unsafe {
            T::get(&**binding, handle, refs, values)
        });
        self.record(status);
        Ok(ReadResult::new(values[0].clone(), status))
    }

    /// Write one value through the shared exchange buffers.
    pub fn write<T: ExchangeValue>(&self, vr: ValueReference, value: T) -> Result<StatusCode> {
        let mut buffers = self.buffers()?;
        let core = self.core()?;
        let handle = core.exchange_handle("write")?;
        let (refs, values) = buffers.stage::<T>(&[vr]);
        values[0] = value;
        let binding = &self.binding;
        // SAFETY: as in `read`.
        let status = guarded("write", StatusCode::Error, || unsafe {
            T::set(&**binding, handle, refs, values)
        });
        Ok(self.record(status))
    }

    /// Read several values into caller-owned storage.
    pub fn read_into<T: ExchangeValue>(
        &self,
        refs: &[ValueReference],
        values: &mut [T],
    ) -> Result<StatusCode> {
        check_lengths(refs.len(), values.len())?;
        let core = self.core()?;
        let handle = core.exchange_handle("read")?;
        let binding = &self.binding;
        // SAFETY: lengths checked above; the handle is live while the read
        // lock is held.
        let status = guarded("read", StatusCode::Error, || unsafe {
            T::get(&**binding, handle, refs, values)
        });
        Ok(self.record(status))
    }

    /// Write several values from caller-owned storage.
    pub fn write_from<T: ExchangeValue>(
        &self,
        refs: &[ValueReference],
        values: &[T],
    ) -> Result<StatusCode> {
        check_lengths(refs.len(), values.len())?;
        let core = self.core()?;
        let handle = core.exchange_handle("write")?;
        let binding = &self.binding;
        // SAFETY: as in `read_into`.
        let status = guarded("write", StatusCode::Error, || unsafe {
            T::set(&**binding, handle, refs, values)
        });
        Ok(self.record(status))
    }

    /// Read several values into a new vector.
    ///
    /// Batches that fit the configured buffer capacity reuse the exchange
    /// buffers and are serialized with scalar calls.
    pub fn read_batch<T: ExchangeValue>(
        &self,
        refs: &[ValueReference],
    ) -> Result<ReadResult<Vec<T>>> {
        let mut buffers = self.buffers()?;
        if refs.len() > buffers.capacity() {
            drop(buffers);
            let mut values = vec![T::default(); refs.len()];
            let status = self.read_into(refs, &mut values)?;
            return Ok(ReadResult::new(values, status));
        }

        let core = self.core()?;
        let handle = core.exchange_handle("read")?;
        let (staged, values) = buffers.stage::<T>(refs);
        let binding = &self.binding;
        // SAFETY: `stage` returns equally long slices; the handle is live
        // while the read lock is held.
        let status = guarded("read", StatusCode::Error, || unsafe {
            T::get(&**binding, handle, staged, values)
        });
        self.record(status);
        Ok(ReadResult::new(values.to_vec(), status))
    }

    pub fn read_integer(&self, vr: ValueReference) -> Result<IntegerRead> {
        self.read(vr)
    }

    pub fn read_real(&self, vr: ValueReference) -> Result<RealRead> {
        self.read(vr)
    }

    pub fn read_string(&self, vr: ValueReference) -> Result<StringRead> {
        self.read(vr)
    }

    pub fn read_boolean(&self, vr: ValueReference) -> Result<BooleanRead> {
        self.read(vr)
    }

    pub fn write_integer(&self, vr: ValueReference, value: i32) -> Result<StatusCode> {
        self.write(vr, value)
    }

    pub fn write_real(&self, vr: ValueReference, value: f64) -> Result<StatusCode> {
        self.write(vr, value)
    }

    pub fn write_string(&self, vr: ValueReference, value: impl Into<String>) -> Result<StatusCode> {
        self.write(vr, value.into())
    }

    pub fn write_boolean(&self, vr: ValueReference, value: bool) -> Result<StatusCode> {
        self.write(vr, value)
    }

    pub fn read_integers(&self, refs: &[ValueReference]) -> Result<IntegerArrayRead> {
        self.read_batch(refs)
    }

    pub fn read_reals(&self, refs: &[ValueReference]) -> Result<RealArrayRead> {
        self.read_batch(refs)
    }

    pub fn read_strings(&self, refs: &[ValueReference]) -> Result<StringArrayRead> {
        self.read_batch(refs)
    }

    pub fn read_booleans(&self, refs: &[ValueReference]) -> Result<BooleanArrayRead> {
        self.read_batch(refs)
    }

    /// Status of the most recent native call. Overwritten by every call.
    pub fn last_status(&self) -> StatusCode {
        *self
            .last_status
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
    }

    /// Whether terminate has completed and no reset has happened since.
    pub fn is_terminated(&self) -> bool {
        self.peek().terminated
    }

    pub fn is_instance_freed(&self) -> bool {
        self.peek().state == LifecycleState::Freed
    }

    pub fn state(&self) -> LifecycleState {
        self.peek().state
    }

    pub fn instance_name(&self) -> String {
        self.peek().instance_name.clone()
    }

    pub fn revision(&self) -> AbiRevision {
        self.binding.revision()
    }

    pub fn version(&self) -> String {
        self.binding.version()
    }

    pub fn types_platform(&self) -> String {
        self.binding.types_platform()
    }

    pub fn binding(&self) -> &Arc<dyn NativeBinding> {
        &self.binding
    }

    fn record(&self, status: StatusCode) -> StatusCode {
        *self
            .last_status
            .lock()
            .unwrap_or_else(PoisonError::into_inner) = status;
        status
    }

    fn core(&self) -> Result<RwLockReadGuard<'_, Core>> {
        self.core.read().map_err(|_| InstanceError::LockPoisoned)
    }

    fn core_mut(&self) -> Result<RwLockWriteGuard<'_, Core>> {
        self.core.write().map_err(|_| InstanceError::LockPoisoned)
    }

    fn peek(&self) -> RwLockReadGuard<'_, Core> {
        self.core.read().unwrap_or_else(PoisonError::into_inner)
    }

    fn buffers(&self) -> Result<MutexGuard<'_, ExchangeBuffers>> {
        self.buffers.lock().map_err(|_| InstanceError::LockPoisoned)
    }
}

impl std::fmt::Debug for ComponentInstance {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let core = self.peek();
        f.debug_struct("ComponentInstance")
            .field("model", &self.binding.model_identifier())
            .field("instance_name", &core.instance_name)
            .field("state", &core.state)
            .field("last_status", &self.last_status())
            .finish()
    }
}

impl Drop for ComponentInstance {
    fn drop(&mut self) {
        let core = self.core.get_mut().unwrap_or_else(PoisonError::into_inner);
        let Some(handle) = core.handle else {
            return;
        };
        warn!(
            instance = %core.instance_name,
            state = %core.state,
            "component instance dropped without being freed; releasing"
        );
        let binding = &*self.binding;
        if core.state == LifecycleState::Initialized {
            // SAFETY: the handle is still owned by this instance.
            guarded("terminate", StatusCode::Ok, || unsafe {
                binding.terminate(handle)
            });
            core.terminated = true;
        }
        release(binding, core);
    }
}

/// Free the native instance if one is held and mark the core freed.
fn release(binding: &dyn NativeBinding, core: &mut Core) {
    if let Some(handle) = core.handle.take() {
        // SAFETY: the handle was just taken out of the core, so this is the
        // only free it will ever see.
        guarded("free_instance", (), || unsafe { binding.free_instance(handle) });
        debug!(instance = %core.instance_name, "component instance freed");
    }
    core.state = LifecycleState::Freed;
}

/// Run a native call, turning a panic into `fallback`.
fn guarded<T>(operation: &'static str, fallback: T, f: impl FnOnce() -> T) -> T {
    match std::panic::catch_unwind(AssertUnwindSafe(f)) {
        Ok(value) => value,
        Err(_) => {
            error!(operation, "native call panicked; continuing with fallback status");
            fallback
        }
    }
}

fn check_lengths(references: usize, values: usize) -> Result<()> {
    if references == values {
        Ok(())
    } else {
        Err(InstanceError::LengthMismatch { references, values })
    }
}

#[cfg(test)]
mod tests {
    use fmiprims_abi::mock::{self, MockBinding};

    use super::*;

    fn running(mock: &Arc<MockBinding>) -> ComponentInstance {
        let instance =
            ComponentInstance::create(mock.clone(), &InstantiateParams::new("unit", "guid"))
                .unwrap();
        assert_eq!(instance.setup(0.0, 1.0).unwrap(), StatusCode::Ok);
        instance
    }

    #[test]
    fn starts_unloaded_with_no_status() {
        let instance = ComponentInstance::new(Arc::new(MockBinding::new()));
        assert_eq!(instance.state(), LifecycleState::Unloaded);
        assert_eq!(instance.last_status(), StatusCode::None);
        assert!(!instance.is_terminated());
        assert!(!instance.is_instance_freed());
    }

    #[test]
    fn refused_instantiation_is_an_error() {
        let mock = Arc::new(MockBinding::new().refusing_instantiation());
        let err = ComponentInstance::create(mock, &InstantiateParams::new("nope", "")).unwrap_err();
        assert!(matches!(err, InstanceError::InstantiationFailed { ref instance_name } if instance_name == "nope"));
    }

    #[test]
    fn instantiate_twice_is_invalid() {
        let mock = Arc::new(MockBinding::new());
        let instance =
            ComponentInstance::create(mock.clone(), &InstantiateParams::default()).unwrap();
        let err = instance.instantiate(&InstantiateParams::default()).unwrap_err();
        assert!(matches!(
            err,
            InstanceError::InvalidState {
                state: LifecycleState::Instantiated,
                ..
            }
        ));
        assert_eq!(mock.calls(mock::INSTANTIATE), 1);
    }

    #[test]
    fn failed_setup_keeps_state() {
        let mock = Arc::new(MockBinding::new());
        mock.set_status(mock::SETUP, StatusCode::Error);
        let instance =
            ComponentInstance::create(mock.clone(), &InstantiateParams::default()).unwrap();
        assert_eq!(instance.setup(0.0, 1.0).unwrap(), StatusCode::Error);
        assert_eq!(instance.state(), LifecycleState::Instantiated);
        assert_eq!(instance.last_status(), StatusCode::Error);
    }

    #[test]
    fn step_requires_initialized() {
        let mock = Arc::new(MockBinding::new());
        let instance =
            ComponentInstance::create(mock.clone(), &InstantiateParams::default()).unwrap();
        assert!(matches!(
            instance.step(0.0, 0.1),
            Err(InstanceError::InvalidState { operation: "step", .. })
        ));
        instance.setup(0.0, 1.0).unwrap();
        assert_eq!(instance.step(0.0, 0.1).unwrap(), StatusCode::Ok);
        assert_eq!(mock.calls(mock::STEP), 1);
    }

    #[test]
    fn batch_lengths_must_match() {
        let mock = Arc::new(MockBinding::new());
        let instance = running(&mock);
        let mut values = [0.0; 1];
        let err = instance.read_into(&[1, 2], &mut values).unwrap_err();
        assert!(matches!(
            err,
            InstanceError::LengthMismatch {
                references: 2,
                values: 1
            }
        ));
        assert_eq!(mock.calls(mock::GET), 0);
    }

    #[test]
    fn batches_above_capacity_allocate() {
        let mock = Arc::new(MockBinding::new());
        mock.preset_real(1, 1.5);
        mock.preset_real(2, 2.5);
        let instance = ComponentInstance::with_config(mock.clone(), InstanceConfig::default());
        instance.instantiate(&InstantiateParams::default()).unwrap();

        let read = instance.read_reals(&[1, 2]).unwrap();
        assert_eq!(read.value(), &vec![1.5, 2.5]);
        assert!(read.is_ok());

        let single = instance.read_reals(&[2]).unwrap();
        assert_eq!(single.value(), &vec![2.5]);
    }

    #[test]
    fn panic_in_getter_reports_error() {
        let mock = Arc::new(MockBinding::new());
        let instance = running(&mock);
        mock.set_panic(mock::GET);
        let read = instance.read_integer(3).unwrap();
        assert_eq!(read.status(), StatusCode::Error);
        assert_eq!(instance.last_status(), StatusCode::Error);
    }

    #[test]
    fn drop_terminates_and_frees() {
        let mock = Arc::new(MockBinding::new());
        drop(running(&mock));
        assert_eq!(mock.calls(mock::TERMINATE), 1);
        assert_eq!(mock.calls(mock::FREE_INSTANCE), 1);
        assert_eq!(mock.live_instances(), 0);
    }

    #[test]
    fn drop_after_free_does_nothing_more() {
        let mock = Arc::new(MockBinding::new());
        let instance = running(&mock);
        instance.terminate(true).unwrap();
        drop(instance);
        assert_eq!(mock.calls(mock::FREE_INSTANCE), 1);
    }
}
