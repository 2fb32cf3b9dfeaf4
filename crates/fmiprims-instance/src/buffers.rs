use fmiprims_abi::{ComponentHandle, NativeBinding, StatusCode, ValueReference};

/// Reusable reference and value storage for scalar exchanges.
///
/// One instance belongs to exactly one [`ComponentInstance`](crate::ComponentInstance)
/// and is only touched while that instance's buffer lock is held. The type
/// lives in a private module, so [`ExchangeValue`] cannot be implemented
/// outside this crate.
#[derive(Debug)]
pub struct ExchangeBuffers {
    pub(crate) refs: Vec<ValueReference>,
    pub(crate) integers: Vec<i32>,
    pub(crate) reals: Vec<f64>,
    pub(crate) strings: Vec<String>,
    pub(crate) booleans: Vec<bool>,
}

impl ExchangeBuffers {
    pub(crate) fn with_capacity(capacity: usize) -> Self {
        let capacity = capacity.max(1);
        Self {
            refs: vec![0; capacity],
            integers: vec![0; capacity],
            reals: vec![0.0; capacity],
            strings: vec![String::new(); capacity],
            booleans: vec![false; capacity],
        }
    }

    pub(crate) fn capacity(&self) -> usize {
        self.refs.len()
    }

    /// Copy `refs` into the reference buffer and hand back the first
    /// `refs.len()` slots of both buffers for kind `T`.
    ///
    /// `refs.len()` must not exceed [`capacity`](Self::capacity).
    pub(crate) fn stage<T: ExchangeValue>(
        &mut self,
        refs: &[ValueReference],
    ) -> (&[ValueReference], &mut [T]) {
        let n = refs.len();
        let (staged, values) = T::slots(self);
        staged[..n].copy_from_slice(refs);
        (&staged[..n], &mut values[..n])
    }
}

/// A scalar kind that can cross the native boundary.
///
/// Implemented for the four exchange types: `i32`, `f64`, `String`, `bool`,
/// and sealed to them.
pub trait ExchangeValue: Clone + Default + Send + Sync + 'static {
    /// Human-readable kind name used in log events.
    const KIND: &'static str;

    #[doc(hidden)]
    fn slots(buffers: &mut ExchangeBuffers) -> (&mut Vec<ValueReference>, &mut Vec<Self>);

    /// # Safety
    /// Same contract as the matching [`NativeBinding`] getter.
    #[doc(hidden)]
    unsafe fn get(
        binding: &dyn NativeBinding,
        c: ComponentHandle,
        vr: &[ValueReference],
        values: &mut [Self],
    ) -> StatusCode;

    /// # Safety
    /// Same contract as the matching [`NativeBinding`] setter.
    #[doc(hidden)]
    unsafe fn set(
        binding: &dyn NativeBinding,
        c: ComponentHandle,
        vr: &[ValueReference],
        values: &[Self],
    ) -> StatusCode;
}

macro_rules! exchange_value {
    ($ty:ty, $kind:literal, $slot:ident, $get:ident, $set:ident) => {
        impl ExchangeValue for $ty {
            const KIND: &'static str = $kind;

            fn slots(
                buffers: &mut ExchangeBuffers,
            ) -> (&mut Vec<ValueReference>, &mut Vec<Self>) {
                (&mut buffers.refs, &mut buffers.$slot)
            }

            unsafe fn get(
                binding: &dyn NativeBinding,
                c: ComponentHandle,
                vr: &[ValueReference],
                values: &mut [Self],
            ) -> StatusCode {
                // SAFETY: forwarded from the caller.
                unsafe { binding.$get(c, vr, values) }
            }

            unsafe fn set(
                binding: &dyn NativeBinding,
                c: ComponentHandle,
                vr: &[ValueReference],
                values: &[Self],
            ) -> StatusCode {
                // SAFETY: forwarded from the caller.
                unsafe { binding.$set(c, vr, values) }
            }
        }
    };
}

exchange_value!(i32, "integer", integers, get_integer, set_integer);
exchange_value!(f64, "real", reals, get_real, set_real);
exchange_value!(String, "string", strings, get_string, set_string);
exchange_value!(bool, "boolean", booleans, get_boolean, set_boolean);

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn capacity_is_at_least_one() {
        assert_eq!(ExchangeBuffers::with_capacity(0).capacity(), 1);
        assert_eq!(ExchangeBuffers::with_capacity(8).capacity(), 8);
    }

    #[test]
    fn stage_copies_references_and_trims_slots() {
        let mut buffers = ExchangeBuffers::with_capacity(4);
        let (refs, values) = buffers.stage::<f64>(&[7, 9]);
        assert_eq!(refs, &[7, 9]);
        assert_eq!(values.len(), 2);
        values[1] = 2.5;
        assert_eq!(buffers.reals[1], 2.5);
        assert!(buffers.integers.iter().all(|v| *v == 0));
    }
}
