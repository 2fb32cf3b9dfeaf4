//! ABI revision 2.
//!
//! Entry points are exported without a model-identifier prefix; the identifier
//! only names the shared object.

use std::ffi::{c_char, c_int, c_void, CString};
use std::path::Path;

use tracing::{debug, warn};

use crate::error::Result;
use crate::library::SharedObject;
use crate::logger::{self, AllocateMemory, FreeMemory};
use crate::params::{Experiment, InstantiateParams};
use crate::status::StatusCode;
use crate::traits::{AbiRevision, ComponentHandle, NativeBinding, ValueReference};

type Component = *mut c_void;
type Environment = *mut c_void;
type RawStatus = c_int;
type RawBoolean = c_int;

const TRUE: RawBoolean = 1;
const FALSE: RawBoolean = 0;

/// `fmi2Type` value selecting the co-simulation interface.
const CO_SIMULATION: c_int = 1;

/// Native status codes for revision 2.
const STATUS_TABLE: [(RawStatus, StatusCode); 6] = [
    (0, StatusCode::Ok),
    (1, StatusCode::Warning),
    (2, StatusCode::Discard),
    (3, StatusCode::Error),
    (4, StatusCode::Fatal),
    (5, StatusCode::Pending),
];

/// Map a revision-2 status code. Unknown codes are treated as fatal.
pub fn status_from_raw(raw: RawStatus) -> StatusCode {
    STATUS_TABLE
        .iter()
        .find(|(code, _)| *code == raw)
        .map(|(_, status)| *status)
        .unwrap_or_else(|| {
            warn!(raw, "unknown v2 status code");
            StatusCode::Fatal
        })
}

fn to_boolean(value: bool) -> RawBoolean {
    if value {
        TRUE
    } else {
        FALSE
    }
}

/// Run setup steps in order while each one leaves the component usable.
/// Returns the most severe status seen.
fn run_while_usable(steps: &[&dyn Fn() -> StatusCode]) -> StatusCode {
    let mut worst = StatusCode::Ok;
    for step in steps {
        let status = step();
        worst = worst.worst(status);
        if !status.is_success() {
            break;
        }
    }
    worst
}

type Logger =
    unsafe extern "C" fn(Environment, *const c_char, RawStatus, *const c_char, *const c_char);
type StepFinished = unsafe extern "C" fn(Environment, RawStatus);

#[repr(C)]
struct CallbackFunctions {
    logger: Logger,
    allocate_memory: AllocateMemory,
    free_memory: FreeMemory,
    step_finished: Option<StepFinished>,
    component_environment: Environment,
}

type GetStringFn = unsafe extern "C" fn() -> *const c_char;
type InstantiateFn = unsafe extern "C" fn(
    *const c_char,
    c_int,
    *const c_char,
    *const c_char,
    *const CallbackFunctions,
    RawBoolean,
    RawBoolean,
) -> Component;
type SetupExperimentFn =
    unsafe extern "C" fn(Component, RawBoolean, f64, f64, RawBoolean, f64) -> RawStatus;
type DoStepFn = unsafe extern "C" fn(Component, f64, f64, RawBoolean) -> RawStatus;
type ComponentFn = unsafe extern "C" fn(Component) -> RawStatus;
type FreeInstanceFn = unsafe extern "C" fn(Component);
type GetFn<T> = unsafe extern "C" fn(Component, *const ValueReference, usize, *mut T) -> RawStatus;
type SetFn<T> = unsafe extern "C" fn(Component, *const ValueReference, usize, *const T) -> RawStatus;

struct Api {
    get_version: GetStringFn,
    get_types_platform: GetStringFn,
    instantiate: InstantiateFn,
    setup_experiment: SetupExperimentFn,
    enter_initialization_mode: ComponentFn,
    exit_initialization_mode: ComponentFn,
    do_step: DoStepFn,
    terminate: ComponentFn,
    reset: ComponentFn,
    free_instance: FreeInstanceFn,
    get_integer: GetFn<c_int>,
    get_real: GetFn<f64>,
    get_string: GetFn<*const c_char>,
    get_boolean: GetFn<RawBoolean>,
    set_integer: SetFn<c_int>,
    set_real: SetFn<f64>,
    set_string: SetFn<*const c_char>,
    set_boolean: SetFn<RawBoolean>,
}

impl Api {
    fn resolve(object: &SharedObject) -> Result<Self> {
        // SAFETY: each type alias mirrors the revision-2 header declaration.
        unsafe {
            Ok(Self {
                get_version: object.function("fmi2GetVersion")?,
                get_types_platform: object.function("fmi2GetTypesPlatform")?,
                instantiate: object.function("fmi2Instantiate")?,
                setup_experiment: object.function("fmi2SetupExperiment")?,
                enter_initialization_mode: object.function("fmi2EnterInitializationMode")?,
                exit_initialization_mode: object.function("fmi2ExitInitializationMode")?,
                do_step: object.function("fmi2DoStep")?,
                terminate: object.function("fmi2Terminate")?,
                reset: object.function("fmi2Reset")?,
                free_instance: object.function("fmi2FreeInstance")?,
                get_integer: object.function("fmi2GetInteger")?,
                get_real: object.function("fmi2GetReal")?,
                get_string: object.function("fmi2GetString")?,
                get_boolean: object.function("fmi2GetBoolean")?,
                set_integer: object.function("fmi2SetInteger")?,
                set_real: object.function("fmi2SetReal")?,
                set_string: object.function("fmi2SetString")?,
                set_boolean: object.function("fmi2SetBoolean")?,
            })
        }
    }
}

/// A shared object implementing ABI revision 2.
pub struct Fmi2Library {
    api: Api,
    // Components keep the pointer passed at instantiation, so the table needs
    // a stable address for as long as the library is loaded.
    callbacks: Box<CallbackFunctions>,
    object: SharedObject,
    model_identifier: String,
}

// SAFETY: the callback table is immutable after construction and its
// environment pointer is always null; everything else is Send + Sync.
unsafe impl Send for Fmi2Library {}
// SAFETY: see `Send` above.
unsafe impl Sync for Fmi2Library {}

impl Fmi2Library {
    /// Open `path` and resolve every revision-2 entry point.
    pub fn load(path: impl AsRef<Path>, model_identifier: &str) -> Result<Self> {
        let object = SharedObject::open(path)?;
        let api = Api::resolve(&object)?;
        debug!(path = ?object.path(), model_identifier, "loaded v2 component library");

        Ok(Self {
            api,
            callbacks: Box::new(CallbackFunctions {
                logger: logger::log_v2,
                allocate_memory: logger::allocate_memory,
                free_memory: logger::free_memory,
                step_finished: None,
                component_environment: std::ptr::null_mut(),
            }),
            object,
            model_identifier: model_identifier.to_string(),
        })
    }

    /// Release the shared object. Returns whether the platform loader agreed.
    pub fn unload(self) -> bool {
        self.object.close()
    }

    pub fn path(&self) -> &Path {
        self.object.path()
    }
}

impl NativeBinding for Fmi2Library {
    fn revision(&self) -> AbiRevision {
        AbiRevision::V2
    }

    fn model_identifier(&self) -> &str {
        &self.model_identifier
    }

    fn version(&self) -> String {
        // SAFETY: the entry point takes no arguments and returns a static string.
        unsafe { logger::lossy_or((self.api.get_version)(), "") }
    }

    fn types_platform(&self) -> String {
        // SAFETY: the entry point takes no arguments and returns a static string.
        unsafe { logger::lossy_or((self.api.get_types_platform)(), "") }
    }

    fn instantiate(&self, params: &InstantiateParams) -> Option<ComponentHandle> {
        let strings = (
            CString::new(params.instance_name.as_str()),
            CString::new(params.guid.as_str()),
            CString::new(params.resource_location.as_str()),
        );
        let (Ok(name), Ok(guid), Ok(location)) = strings else {
            warn!(instance = %params.instance_name, "instantiate arguments contain NUL bytes");
            return None;
        };

        // SAFETY: strings outlive the call; the callback table lives as long as `self`.
        let raw = unsafe {
            (self.api.instantiate)(
                name.as_ptr(),
                CO_SIMULATION,
                guid.as_ptr(),
                location.as_ptr(),
                &*self.callbacks,
                to_boolean(params.visible),
                to_boolean(params.logging_on),
            )
        };

        // SAFETY: `raw` was just returned by this library's instantiate.
        unsafe { ComponentHandle::from_raw(raw) }
    }

    unsafe fn setup(&self, c: ComponentHandle, experiment: &Experiment) -> StatusCode {
        let stop = experiment.defined_stop_time();
        let tolerance = experiment.tolerance;

        let api = &self.api;
        // SAFETY (all three steps): `c` is live per the trait contract.
        let setup_experiment = || {
            status_from_raw(unsafe {
                (api.setup_experiment)(
                    c.as_ptr(),
                    to_boolean(tolerance.is_some()),
                    tolerance.unwrap_or(0.0),
                    experiment.start_time,
                    to_boolean(stop.is_some()),
                    stop.unwrap_or(experiment.start_time),
                )
            })
        };
        let enter = || status_from_raw(unsafe { (api.enter_initialization_mode)(c.as_ptr()) });
        let exit = || status_from_raw(unsafe { (api.exit_initialization_mode)(c.as_ptr()) });
        run_while_usable(&[&setup_experiment, &enter, &exit])
    }

    unsafe fn step(&self, c: ComponentHandle, current_time: f64, step_size: f64) -> StatusCode {
        // SAFETY: `c` is live per the trait contract.
        status_from_raw(unsafe { (self.api.do_step)(c.as_ptr(), current_time, step_size, TRUE) })
    }

    unsafe fn terminate(&self, c: ComponentHandle) -> StatusCode {
        // SAFETY: `c` is live per the trait contract.
        status_from_raw(unsafe { (self.api.terminate)(c.as_ptr()) })
    }

    unsafe fn reset(&self, c: ComponentHandle) -> StatusCode {
        // SAFETY: `c` is live per the trait contract.
        status_from_raw(unsafe { (self.api.reset)(c.as_ptr()) })
    }

    unsafe fn free_instance(&self, c: ComponentHandle) {
        // SAFETY: `c` is live per the trait contract and is dead afterwards.
        unsafe { (self.api.free_instance)(c.as_ptr()) }
    }

    unsafe fn get_integer(
        &self,
        c: ComponentHandle,
        vr: &[ValueReference],
        values: &mut [i32],
    ) -> StatusCode {
        debug_assert_eq!(vr.len(), values.len());
        // SAFETY: both buffers hold `vr.len()` elements per the trait contract.
        let raw = unsafe {
            (self.api.get_integer)(c.as_ptr(), vr.as_ptr(), vr.len(), values.as_mut_ptr())
        };
        status_from_raw(raw)
    }

    unsafe fn get_real(
        &self,
        c: ComponentHandle,
        vr: &[ValueReference],
        values: &mut [f64],
    ) -> StatusCode {
        debug_assert_eq!(vr.len(), values.len());
        // SAFETY: both buffers hold `vr.len()` elements per the trait contract.
        let raw =
            unsafe { (self.api.get_real)(c.as_ptr(), vr.as_ptr(), vr.len(), values.as_mut_ptr()) };
        status_from_raw(raw)
    }

    unsafe fn get_string(
        &self,
        c: ComponentHandle,
        vr: &[ValueReference],
        values: &mut [String],
    ) -> StatusCode {
        debug_assert_eq!(vr.len(), values.len());
        let mut raw_values: Vec<*const c_char> = vec![std::ptr::null(); vr.len()];
        // SAFETY: `raw_values` holds `vr.len()` slots; the component fills them
        // with strings it owns until the next call on this instance.
        let raw = unsafe {
            (self.api.get_string)(c.as_ptr(), vr.as_ptr(), vr.len(), raw_values.as_mut_ptr())
        };
        for (slot, ptr) in values.iter_mut().zip(raw_values) {
            // SAFETY: each pointer is null or a NUL-terminated component string.
            *slot = unsafe { logger::lossy_or(ptr, "") };
        }
        status_from_raw(raw)
    }

    unsafe fn get_boolean(
        &self,
        c: ComponentHandle,
        vr: &[ValueReference],
        values: &mut [bool],
    ) -> StatusCode {
        debug_assert_eq!(vr.len(), values.len());
        let mut raw_values: Vec<RawBoolean> = vec![FALSE; vr.len()];
        // SAFETY: `raw_values` holds `vr.len()` slots.
        let raw = unsafe {
            (self.api.get_boolean)(c.as_ptr(), vr.as_ptr(), vr.len(), raw_values.as_mut_ptr())
        };
        for (slot, value) in values.iter_mut().zip(raw_values) {
            *slot = value != FALSE;
        }
        status_from_raw(raw)
    }

    unsafe fn set_integer(
        &self,
        c: ComponentHandle,
        vr: &[ValueReference],
        values: &[i32],
    ) -> StatusCode {
        debug_assert_eq!(vr.len(), values.len());
        // SAFETY: both buffers hold `vr.len()` elements per the trait contract.
        let raw =
            unsafe { (self.api.set_integer)(c.as_ptr(), vr.as_ptr(), vr.len(), values.as_ptr()) };
        status_from_raw(raw)
    }

    unsafe fn set_real(
        &self,
        c: ComponentHandle,
        vr: &[ValueReference],
        values: &[f64],
    ) -> StatusCode {
        debug_assert_eq!(vr.len(), values.len());
        // SAFETY: both buffers hold `vr.len()` elements per the trait contract.
        let raw = unsafe { (self.api.set_real)(c.as_ptr(), vr.as_ptr(), vr.len(), values.as_ptr()) };
        status_from_raw(raw)
    }

    unsafe fn set_string(
        &self,
        c: ComponentHandle,
        vr: &[ValueReference],
        values: &[String],
    ) -> StatusCode {
        debug_assert_eq!(vr.len(), values.len());
        let owned: std::result::Result<Vec<CString>, _> =
            values.iter().map(|v| CString::new(v.as_str())).collect();
        let Ok(owned) = owned else {
            warn!("string value contains a NUL byte; not forwarded");
            return StatusCode::Error;
        };
        let pointers: Vec<*const c_char> = owned.iter().map(|s| s.as_ptr()).collect();
        // SAFETY: `pointers` holds `vr.len()` strings that outlive the call.
        let raw = unsafe {
            (self.api.set_string)(c.as_ptr(), vr.as_ptr(), vr.len(), pointers.as_ptr())
        };
        status_from_raw(raw)
    }

    unsafe fn set_boolean(
        &self,
        c: ComponentHandle,
        vr: &[ValueReference],
        values: &[bool],
    ) -> StatusCode {
        debug_assert_eq!(vr.len(), values.len());
        let raw_values: Vec<RawBoolean> = values.iter().copied().map(to_boolean).collect();
        // SAFETY: `raw_values` holds `vr.len()` elements.
        let raw = unsafe {
            (self.api.set_boolean)(c.as_ptr(), vr.as_ptr(), vr.len(), raw_values.as_ptr())
        };
        status_from_raw(raw)
    }
}

impl std::fmt::Debug for Fmi2Library {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Fmi2Library")
            .field("path", &self.object.path())
            .field("model_identifier", &self.model_identifier)
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::LoadError;

    #[test]
    fn status_table_covers_known_codes() {
        assert_eq!(status_from_raw(0), StatusCode::Ok);
        assert_eq!(status_from_raw(1), StatusCode::Warning);
        assert_eq!(status_from_raw(2), StatusCode::Discard);
        assert_eq!(status_from_raw(3), StatusCode::Error);
        assert_eq!(status_from_raw(4), StatusCode::Fatal);
        assert_eq!(status_from_raw(5), StatusCode::Pending);
        assert_eq!(status_from_raw(6), StatusCode::Fatal);
    }

    #[test]
    fn booleans_use_int_encoding() {
        assert_eq!(to_boolean(true), 1i32);
        assert_eq!(to_boolean(false), 0i32);
    }

    #[test]
    fn setup_steps_continue_past_warning() {
        let calls = std::cell::Cell::new(0);
        let ok = || {
            calls.set(calls.get() + 1);
            StatusCode::Ok
        };
        let warning = || {
            calls.set(calls.get() + 1);
            StatusCode::Warning
        };
        let error = || {
            calls.set(calls.get() + 1);
            StatusCode::Error
        };

        assert_eq!(run_while_usable(&[&ok, &ok, &ok]), StatusCode::Ok);
        assert_eq!(calls.get(), 3);

        calls.set(0);
        assert_eq!(run_while_usable(&[&warning, &ok, &ok]), StatusCode::Warning);
        assert_eq!(calls.get(), 3);

        calls.set(0);
        assert_eq!(run_while_usable(&[&ok, &error, &ok]), StatusCode::Error);
        assert_eq!(calls.get(), 2);

        calls.set(0);
        assert_eq!(run_while_usable(&[&warning, &error, &ok]), StatusCode::Error);
        assert_eq!(calls.get(), 2);
    }

    #[test]
    fn load_garbage_library_fails() {
        let dir = std::env::temp_dir().join(format!(
            "fmiprims-v2-{}-{}",
            std::process::id(),
            std::time::SystemTime::now()
                .duration_since(std::time::UNIX_EPOCH)
                .expect("time should be after epoch")
                .as_nanos()
        ));
        std::fs::create_dir_all(&dir).expect("temp dir should be creatable");
        let path = dir.join(crate::library::platform_file_name("garbage"));
        std::fs::write(&path, b"\x7fELF but not really").unwrap();

        let err = Fmi2Library::load(&path, "garbage").unwrap_err();
        assert!(matches!(err, LoadError::Open { .. }));
        let _ = std::fs::remove_dir_all(&dir);
    }
}
