//! ABI revision 1 (co-simulation entry points).
//!
//! Every symbol is prefixed with the model identifier, e.g.
//! `bouncingBall_fmiInstantiateSlave`.

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
type RawStatus = c_int;
type RawBoolean = c_char;

const TRUE: RawBoolean = 1;
const FALSE: RawBoolean = 0;

const MIME_TYPE: &str = "application/x-fmu-sharedlibrary";

/// Native status codes for revision 1.
const STATUS_TABLE: [(RawStatus, StatusCode); 6] = [
    (0, StatusCode::Ok),
    (1, StatusCode::Warning),
    (2, StatusCode::Discard),
    (3, StatusCode::Error),
    (4, StatusCode::Fatal),
    (5, StatusCode::Pending),
];

/// Map a revision-1 status code. Unknown codes are treated as fatal.
pub fn status_from_raw(raw: RawStatus) -> StatusCode {
    STATUS_TABLE
        .iter()
        .find(|(code, _)| *code == raw)
        .map(|(_, status)| *status)
        .unwrap_or_else(|| {
            warn!(raw, "unknown v1 status code");
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

type Logger = unsafe extern "C" fn(Component, *const c_char, RawStatus, *const c_char, *const c_char);
type StepFinished = unsafe extern "C" fn(Component, RawStatus);

#[repr(C)]
#[derive(Clone, Copy)]
struct CallbackFunctions {
    logger: Logger,
    allocate_memory: AllocateMemory,
    free_memory: FreeMemory,
    step_finished: Option<StepFinished>,
}

type GetStringFn = unsafe extern "C" fn() -> *const c_char;
type InstantiateFn = unsafe extern "C" fn(
    *const c_char,
    *const c_char,
    *const c_char,
    *const c_char,
    f64,
    RawBoolean,
    RawBoolean,
    CallbackFunctions,
    RawBoolean,
) -> Component;
type InitializeFn = unsafe extern "C" fn(Component, f64, RawBoolean, f64) -> RawStatus;
type DoStepFn = unsafe extern "C" fn(Component, f64, f64, RawBoolean) -> RawStatus;
type ComponentFn = unsafe extern "C" fn(Component) -> RawStatus;
type FreeInstanceFn = unsafe extern "C" fn(Component);
type GetFn<T> = unsafe extern "C" fn(Component, *const ValueReference, usize, *mut T) -> RawStatus;
type SetFn<T> = unsafe extern "C" fn(Component, *const ValueReference, usize, *const T) -> RawStatus;

struct Api {
    get_version: GetStringFn,
    get_types_platform: GetStringFn,
    instantiate: InstantiateFn,
    initialize: InitializeFn,
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
    fn resolve(object: &SharedObject, model_identifier: &str) -> Result<Self> {
        let name = |function: &str| format!("{model_identifier}_{function}");

        // SAFETY: each type alias mirrors the revision-1 header declaration.
        unsafe {
            Ok(Self {
                get_version: object.function(&name("fmiGetVersion"))?,
                get_types_platform: object.function(&name("fmiGetTypesPlatform"))?,
                instantiate: object.function(&name("fmiInstantiateSlave"))?,
                initialize: object.function(&name("fmiInitializeSlave"))?,
                do_step: object.function(&name("fmiDoStep"))?,
                terminate: object.function(&name("fmiTerminateSlave"))?,
                reset: object.function(&name("fmiResetSlave"))?,
                free_instance: object.function(&name("fmiFreeSlaveInstance"))?,
                get_integer: object.function(&name("fmiGetInteger"))?,
                get_real: object.function(&name("fmiGetReal"))?,
                get_string: object.function(&name("fmiGetString"))?,
                get_boolean: object.function(&name("fmiGetBoolean"))?,
                set_integer: object.function(&name("fmiSetInteger"))?,
                set_real: object.function(&name("fmiSetReal"))?,
                set_string: object.function(&name("fmiSetString"))?,
                set_boolean: object.function(&name("fmiSetBoolean"))?,
            })
        }
    }
}

/// A shared object implementing ABI revision 1.
pub struct Fmi1Library {
    api: Api,
    object: SharedObject,
    model_identifier: String,
}

impl Fmi1Library {
    /// Open `path` and resolve every revision-1 entry point for `model_identifier`.
    pub fn load(path: impl AsRef<Path>, model_identifier: &str) -> Result<Self> {
        let object = SharedObject::open(path)?;
        let api = Api::resolve(&object, model_identifier)?;
        debug!(path = ?object.path(), model_identifier, "loaded v1 component library");

        Ok(Self {
            api,
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

impl NativeBinding for Fmi1Library {
    fn revision(&self) -> AbiRevision {
        AbiRevision::V1
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
            CString::new(MIME_TYPE),
        );
        let (Ok(name), Ok(guid), Ok(location), Ok(mime)) = strings else {
            warn!(instance = %params.instance_name, "instantiate arguments contain NUL bytes");
            return None;
        };

        let callbacks = CallbackFunctions {
            logger: logger::log_v1,
            allocate_memory: logger::allocate_memory,
            free_memory: logger::free_memory,
            step_finished: None,
        };

        // SAFETY: every string outlives the call and the callback table is passed by value.
        let raw = unsafe {
            (self.api.instantiate)(
                name.as_ptr(),
                guid.as_ptr(),
                location.as_ptr(),
                mime.as_ptr(),
                params.timeout,
                to_boolean(params.visible),
                to_boolean(params.interactive),
                callbacks,
                to_boolean(params.logging_on),
            )
        };

        // SAFETY: `raw` was just returned by this library's instantiate.
        unsafe { ComponentHandle::from_raw(raw) }
    }

    unsafe fn setup(&self, c: ComponentHandle, experiment: &Experiment) -> StatusCode {
        let stop = experiment.defined_stop_time();
        // SAFETY: `c` is live per the trait contract.
        let raw = unsafe {
            (self.api.initialize)(
                c.as_ptr(),
                experiment.start_time,
                to_boolean(stop.is_some()),
                stop.unwrap_or(experiment.start_time),
            )
        };
        status_from_raw(raw)
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

impl std::fmt::Debug for Fmi1Library {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Fmi1Library")
            .field("path", &self.object.path())
            .field("model_identifier", &self.model_identifier)
            .finish()
    }
}
