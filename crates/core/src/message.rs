//! Conversions between Rust strings and the C strings used by LLVM, including
//! the messages that LLVM allocates and expects its callers to free.

use std::ffi::{c_char, CStr, CString};

use llvmc_errors::binding::{Error, Result};

/// A C string passed into LLVM.
pub type CStrPtr = *const c_char;

/// A C string allocated by LLVM that the caller must free.
pub type OwnedCStrPtr = *mut c_char;

/// Converts `value` to a C string for passing to LLVM.
///
/// # Errors
///
/// - [`Error::InteriorNul`] if `value` contains a NUL byte.
pub fn to_c_string(value: &str) -> Result<CString> {
    Ok(CString::new(value)?)
}

/// Copies a C string owned by LLVM into a Rust string, leaving ownership of
/// the C string with LLVM. A null pointer is treated as the empty string.
///
/// # Errors
///
/// - [`Error::CStrConversion`] if the string is not valid UTF-8.
///
/// # Safety
///
/// `ptr` must be null or point to a NUL-terminated string that is valid for
/// the duration of the call.
pub unsafe fn copy_c_str(ptr: CStrPtr) -> Result<String> {
    if ptr.is_null() {
        return Ok(String::new());
    }
    Ok(CStr::from_ptr(ptr).to_str()?.to_string())
}

/// Copies a C string of known length owned by LLVM into a Rust string.
///
/// # Errors
///
/// - [`Error::CStrConversion`] if the string is not valid UTF-8.
///
/// # Safety
///
/// `ptr` must be null or valid for reads of `len` bytes.
pub unsafe fn copy_c_str_with_len(ptr: CStrPtr, len: usize) -> Result<String> {
    if ptr.is_null() {
        return Ok(String::new());
    }
    let bytes = std::slice::from_raw_parts(ptr.cast::<u8>(), len);
    Ok(std::str::from_utf8(bytes)?.to_string())
}

/// Copies a message allocated by LLVM into a Rust string and frees it with
/// `LLVMDisposeMessage`. A null pointer is treated as the empty string.
///
/// # Errors
///
/// - [`Error::CStrConversion`] if the message is not valid UTF-8. The message
///   is freed regardless.
///
/// # Safety
///
/// `ptr` must be null or a string allocated by LLVM that has not yet been
/// freed.
pub unsafe fn take_message(ptr: OwnedCStrPtr) -> Result<String> {
    if ptr.is_null() {
        return Ok(String::new());
    }

    let text = CStr::from_ptr(ptr).to_string_lossy().into_owned();
    let utf8 = CStr::from_ptr(ptr).to_str().map(|_| ());
    let dispose = native!(LLVMDisposeMessage: fn(OwnedCStrPtr));
    dispose(ptr);

    utf8?;
    Ok(text)
}

/// Turns an error message returned by LLVM through an out-parameter into an
/// [`Error::NativeOperation`], freeing the message.
///
/// # Safety
///
/// As for [`take_message`].
pub unsafe fn native_error(ptr: OwnedCStrPtr) -> Error {
    match take_message(ptr) {
        Ok(message) => Error::NativeOperation(message),
        Err(error) => error,
    }
}

#[cfg(test)]
mod test {
    use llvmc_errors::binding::Error;

    use crate::message::{copy_c_str, copy_c_str_with_len, to_c_string};

    #[test]
    fn strings_with_nul_bytes_are_rejected() {
        assert!(matches!(to_c_string("a\0b"), Err(Error::InteriorNul(_))));
    }

    #[test]
    fn c_strings_are_copied() -> anyhow::Result<()> {
        let original = to_c_string("main")?;
        assert_eq!(unsafe { copy_c_str(original.as_ptr()) }?, "main");
        assert_eq!(unsafe { copy_c_str(std::ptr::null()) }?, "");
        assert_eq!(
            unsafe { copy_c_str_with_len(original.as_ptr(), 2) }?,
            "ma"
        );

        Ok(())
    }
}
