//! Memory buffers, which are how LLVM reads bitcode, textual IR and object
//! files.

use std::{path::Path, ptr};

use llvmc_errors::binding::Result;

use crate::{
    handle::{native_disposer, native_wrapper, HandleType, NativeWrapper, Object, RawPtr},
    library::prototype::LLVMBool,
    message::{native_error, to_c_string, CStrPtr, OwnedCStrPtr},
};

native_wrapper! {
    /// An `LLVMMemoryBufferRef`.
    ///
    /// Some consumers of a buffer take it over entirely (e.g.
    /// [`crate::ir::module::Module::parse_ir`]), after which this wrapper is
    /// disposed and can no longer be used.
    pub struct MemoryBuffer(MemoryBuffer);
}

impl MemoryBuffer {
    /// Reads the file at `path` into a new buffer.
    ///
    /// # Errors
    ///
    /// - [`llvmc_errors::binding::Error::NativeOperation`] with LLVM's message
    ///   if the file cannot be read.
    pub fn from_file(path: impl AsRef<Path>) -> Result<Self> {
        let dispose = native!(LLVMDisposeMemoryBuffer: fn(RawPtr));
        let create = native!(LLVMCreateMemoryBufferWithContentsOfFile: fn(CStrPtr, *mut RawPtr, *mut OwnedCStrPtr) -> LLVMBool);

        let path = to_c_string(&path.as_ref().to_string_lossy())?;
        let mut buffer = ptr::null_mut();
        let mut message = ptr::null_mut();
        let failed = unsafe { create(path.as_ptr(), &mut buffer, &mut message) };
        if failed.is_true() {
            return Err(unsafe { native_error(message) });
        }

        Object::wrap(HandleType::MemoryBuffer, buffer, native_disposer(dispose)).map(Self::from_object)
    }

    /// Copies `bytes` into a new buffer called `name`.
    ///
    /// # Errors
    ///
    /// - [`llvmc_errors::binding::Error::InteriorNul`] if `name` contains a NUL
    ///   byte.
    pub fn from_bytes(name: &str, bytes: &[u8]) -> Result<Self> {
        let dispose = native!(LLVMDisposeMemoryBuffer: fn(RawPtr));
        let create = native!(LLVMCreateMemoryBufferWithMemoryRangeCopy: fn(CStrPtr, usize, CStrPtr) -> RawPtr);

        let name = to_c_string(name)?;
        let buffer = unsafe { create(bytes.as_ptr().cast(), bytes.len(), name.as_ptr()) };
        Object::wrap(HandleType::MemoryBuffer, buffer, native_disposer(dispose)).map(Self::from_object)
    }

    /// Gets the size of the buffer in bytes.
    ///
    /// # Errors
    ///
    /// - [`llvmc_errors::binding::Error::UseAfterDispose`] if the buffer has
    ///   been consumed.
    pub fn len(&self) -> Result<usize> {
        let get = native!(LLVMGetBufferSize: fn(RawPtr) -> usize);
        Ok(unsafe { get(self.raw()?) })
    }

    /// Returns `true` if the buffer is empty.
    ///
    /// # Errors
    ///
    /// See [`Self::len`].
    pub fn is_empty(&self) -> Result<bool> {
        Ok(self.len()? == 0)
    }

    /// Copies the contents of the buffer.
    ///
    /// # Errors
    ///
    /// See [`Self::len`].
    pub fn to_bytes(&self) -> Result<Vec<u8>> {
        let start = native!(LLVMGetBufferStart: fn(RawPtr) -> CStrPtr);
        let len = self.len()?;
        let data = unsafe { start(self.raw()?) };
        if data.is_null() || len == 0 {
            return Ok(Vec::new());
        }
        Ok(unsafe { std::slice::from_raw_parts(data.cast::<u8>(), len) }.to_vec())
    }

    /// Gets the range of addresses occupied by the contents of the buffer.
    pub(crate) fn address_range(&self) -> Result<std::ops::Range<usize>> {
        let start = native!(LLVMGetBufferStart: fn(RawPtr) -> CStrPtr);
        let begin = unsafe { start(self.raw()?) } as usize;
        Ok(begin..begin + self.len()?)
    }
}
