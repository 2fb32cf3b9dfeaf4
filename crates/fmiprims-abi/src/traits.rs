use std::ffi::c_void;
use std::fmt;
use std::ptr::NonNull;

use crate::params::{Experiment, InstantiateParams};
use crate::status::StatusCode;

/// Opaque handle identifying one declared variable inside a component.
pub type ValueReference = u32;

/// Revision of the native interface a shared object implements.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum AbiRevision {
    V1,
    V2,
}

impl AbiRevision {
    /// Version string the component reports for this revision.
    pub fn version_str(self) -> &'static str {
        match self {
            AbiRevision::V1 => "1.0",
            AbiRevision::V2 => "2.0",
        }
    }
}

impl fmt::Display for AbiRevision {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.version_str())
    }
}

/// Opaque native component instance returned by instantiate.
///
/// The handle is a plain token: it does not own the instance and does not
/// free it on drop. Ownership lives one layer up.
#[derive(Clone, Copy, PartialEq, Eq)]
pub struct ComponentHandle(NonNull<c_void>);

// SAFETY: the handle is never dereferenced on the Rust side; it is only passed
// back to the binding that created it, and callers serialize lifecycle calls.
unsafe impl Send for ComponentHandle {}
// SAFETY: see `Send` above; sharing the token shares no Rust-visible state.
unsafe impl Sync for ComponentHandle {}

impl ComponentHandle {
    /// Wrap a pointer returned by a native instantiate call.
    ///
    /// # Safety
    /// `ptr` must be null or a live component returned by the binding this
    /// handle will be used with.
    pub unsafe fn from_raw(ptr: *mut c_void) -> Option<Self> {
        NonNull::new(ptr).map(Self)
    }

    pub fn as_ptr(self) -> *mut c_void {
        self.0.as_ptr()
    }
}

impl fmt::Debug for ComponentHandle {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_tuple("ComponentHandle").field(&self.0.as_ptr()).finish()
    }
}

/// The fixed entry points of one ABI revision.
///
/// Implementations translate native return codes into [`StatusCode`] with a
/// revision-specific table. They do not track lifecycle state and do not
/// validate argument pairing; that is the caller's job.
///
/// # Safety
/// Every method taking a [`ComponentHandle`] requires that the handle came
/// from `instantiate` on the same binding and has not been passed to
/// `free_instance` yet. Every batch method requires
/// `values.len() == vr.len()`.
pub trait NativeBinding: Send + Sync {
    fn revision(&self) -> AbiRevision;

    /// Identifier the shared object was loaded with.
    fn model_identifier(&self) -> &str;

    fn version(&self) -> String;

    fn types_platform(&self) -> String;

    /// Create a new component instance, or `None` if the component refused.
    fn instantiate(&self, params: &InstantiateParams) -> Option<ComponentHandle>;

    /// Move a fresh instance into initialized mode.
    ///
    /// # Safety
    /// See the trait-level contract.
    unsafe fn setup(&self, c: ComponentHandle, experiment: &Experiment) -> StatusCode;

    /// # Safety
    /// See the trait-level contract.
    unsafe fn step(&self, c: ComponentHandle, current_time: f64, step_size: f64) -> StatusCode;

    /// # Safety
    /// See the trait-level contract.
    unsafe fn terminate(&self, c: ComponentHandle) -> StatusCode;

    /// # Safety
    /// See the trait-level contract.
    unsafe fn reset(&self, c: ComponentHandle) -> StatusCode;

    /// Release the native instance. The handle is dead afterwards.
    ///
    /// # Safety
    /// See the trait-level contract.
    unsafe fn free_instance(&self, c: ComponentHandle);

    /// # Safety
    /// See the trait-level contract.
    unsafe fn get_integer(
        &self,
        c: ComponentHandle,
        vr: &[ValueReference],
        values: &mut [i32],
    ) -> StatusCode;

    /// # Safety
    /// See the trait-level contract.
    unsafe fn get_real(
        &self,
        c: ComponentHandle,
        vr: &[ValueReference],
        values: &mut [f64],
    ) -> StatusCode;

    /// # Safety
    /// See the trait-level contract.
    unsafe fn get_string(
        &self,
        c: ComponentHandle,
        vr: &[ValueReference],
        values: &mut [String],
    ) -> StatusCode;

    /// # Safety
    /// See the trait-level contract.
    unsafe fn get_boolean(
        &self,
        c: ComponentHandle,
        vr: &[ValueReference],
        values: &mut [bool],
    ) -> StatusCode;

    /// # Safety
    /// See the trait-level contract.
    unsafe fn set_integer(
        &self,
        c: ComponentHandle,
        vr: &[ValueReference],
        values: &[i32],
    ) -> StatusCode;

    /// # Safety
    /// See the trait-level contract.
    unsafe fn set_real(&self, c: ComponentHandle, vr: &[ValueReference], values: &[f64])
        -> StatusCode;

    /// # Safety
    /// See the trait-level contract.
    unsafe fn set_string(
        &self,
        c: ComponentHandle,
        vr: &[ValueReference],
        values: &[String],
    ) -> StatusCode;

    /// # Safety
    /// See the trait-level contract.
    unsafe fn set_boolean(
        &self,
        c: ComponentHandle,
        vr: &[ValueReference],
        values: &[bool],
    ) -> StatusCode;
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn null_pointer_is_not_a_handle() {
        // SAFETY: null is explicitly allowed.
        assert!(unsafe { ComponentHandle::from_raw(std::ptr::null_mut()) }.is_none());
    }

    #[test]
    fn handle_round_trips_pointer() {
        let mut slot = 7u8;
        let ptr = (&mut slot as *mut u8).cast::<c_void>();
        // SAFETY: the handle is only compared, never passed to a binding.
        let handle = unsafe { ComponentHandle::from_raw(ptr) }.unwrap();
        assert_eq!(handle.as_ptr(), ptr);
    }

    #[test]
    fn revision_version_strings() {
        assert_eq!(AbiRevision::V1.to_string(), "1.0");
        assert_eq!(AbiRevision::V2.version_str(), "2.0");
    }
}
