//! Wrappers for LLVM's IR objects: contexts, modules, types, values,
//! metadata and builders, along with the memory buffers that IR is read from.
//!
//! None of these objects are ever dereferenced on the Rust side. Types,
//! values and basic blocks belong to their context or module, and so are
//! never disposed by the bindings; instead they keep a reference to the
//! wrapper they were obtained from, which keeps their owner alive.

pub mod builder;
pub mod context;
pub mod memory_buffer;
pub mod metadata;
pub mod module;
pub mod types;
pub mod values;

use std::ffi::c_uint;

use llvmc_errors::binding::{Error, Result};

use crate::handle::{NativeWrapper, Object, RawPtr};

/// The name of the reference from a non-owning wrapper to the wrapper it was
/// obtained from.
pub const PARENT_REF: &str = "parent";

/// Gets the wrapper for a non-owning handle obtained from `parent`.
///
/// A newly created wrapper records `parent` so that the native object it
/// belongs to outlives it, and is registered as a dependent of `parent` so
/// that it becomes unusable once `parent` is torn down.
///
/// # Errors
///
/// - [`llvmc_errors::binding::Error::InvalidHandle`] if `ptr` is null.
pub fn borrowed_child<T: NativeWrapper>(ptr: RawPtr, parent: &Object) -> Result<T> {
    let object = Object::borrowed(T::HANDLE_TYPE, ptr)?;
    if object.get_ref(PARENT_REF).is_none() && !object.ptr_eq(parent) {
        object.set_ref(PARENT_REF, parent);
        parent.add_dependent(&object);
    }
    Ok(T::from_object(object))
}

/// As [`borrowed_child`], but returning [`None`] for a null handle.
///
/// # Errors
///
/// Never, but kept fallible for symmetry with [`borrowed_child`].
pub fn borrowed_child_nullable<T: NativeWrapper>(ptr: RawPtr, parent: &Object) -> Result<Option<T>> {
    if ptr.is_null() {
        Ok(None)
    } else {
        borrowed_child(ptr, parent).map(Some)
    }
}

/// Converts a slice length into the `unsigned` element count taken by the C
/// API.
///
/// # Errors
///
/// - [`Error::NativeOperation`] if `len` does not fit.
pub fn c_count(len: usize) -> Result<c_uint> {
    c_uint::try_from(len)
        .map_err(|_| Error::NativeOperation(format!("{len} elements exceed the C API's limit")))
}

/// An iterator over one of LLVM's intrusive lists, such as the functions in a
/// module or the instructions in a block.
///
/// Each step is a native call, so each item is a [`Result`].
pub struct NativeList<T> {
    next:   RawPtr,
    step:   unsafe extern "C" fn(RawPtr) -> RawPtr,
    parent: Object,
    marker: std::marker::PhantomData<T>,
}

impl<T: NativeWrapper> NativeList<T> {
    /// Creates an iterator starting at `first` and moving on with `step`.
    #[must_use]
    pub fn new(first: RawPtr, step: unsafe extern "C" fn(RawPtr) -> RawPtr, parent: &Object) -> Self {
        Self {
            next: first,
            step,
            parent: parent.clone(),
            marker: std::marker::PhantomData,
        }
    }
}

impl<T: NativeWrapper> Iterator for NativeList<T> {
    type Item = Result<T>;

    fn next(&mut self) -> Option<Self::Item> {
        if self.next.is_null() {
            return None;
        }

        let current = self.next;
        // SAFETY: `current` is a live element of the list, as the parent is
        // kept alive by this iterator.
        self.next = unsafe { (self.step)(current) };
        Some(borrowed_child(current, &self.parent))
    }
}
