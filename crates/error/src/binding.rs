//! Error types and utilities to do with calling into the LLVM C API and
//! managing the lifetimes of the native objects that it hands out.

use std::{ffi::NulError, str::Utf8Error};

use thiserror::Error;

/// The result type for use in the bindings.
pub type Result<T> = std::result::Result<T, Error>;

/// This error type is for use anywhere a native handle is created, owned,
/// disposed, or passed back into the LLVM C API.
#[derive(Debug, Error)]
pub enum Error {
    /// A native call returned (or a caller supplied) a null handle where null
    /// is not an accepted value.
    #[error("Null {handle_type} handle where a valid handle was required")]
    InvalidHandle { handle_type: &'static str },

    /// An attempt was made to take ownership of an object that already has an
    /// owner.
    #[error("The {handle_type} is already owned by another object")]
    DoubleOwnership { handle_type: &'static str },

    /// An attempt was made to release ownership of an object that the releasing
    /// object does not own.
    #[error("The {handle_type} is not owned by this object")]
    NotOwned { handle_type: &'static str },

    /// An attempt was made to take ownership of an object that can never be
    /// owned, such as the global context.
    #[error("The {handle_type} cannot be owned by another object")]
    NotOwnable { handle_type: &'static str },

    /// Taking ownership would make an object (transitively) own itself.
    #[error("Taking ownership of the {handle_type} would create an ownership cycle")]
    OwnershipCycle { handle_type: &'static str },

    /// A wrapper could not be moved to a handle that another live wrapper
    /// already represents.
    #[error("Another live wrapper already represents the {handle_type} at {address:#x}")]
    IdentityConflict {
        handle_type: &'static str,
        address:     usize,
    },

    /// A wrapper was used after its native object was disposed.
    #[error("The {handle_type} was used after it was disposed")]
    UseAfterDispose { handle_type: &'static str },

    /// An entry produced by an object-file iterator was read after the
    /// iterator moved on.
    #[error("The {entity} has expired as its iterator has advanced")]
    Expired { entity: &'static str },

    /// The named entry point could not be found in the loaded library.
    #[error("Could not resolve native symbol `{symbol}`: {reason}")]
    SymbolNotFound { symbol: String, reason: String },

    /// None of the candidate libraries could be loaded.
    #[error("The LLVM shared library could not be found (tried: {})", .candidates.join(", "))]
    LibraryNotFound { candidates: Vec<String> },

    /// The library configuration was changed after the library was loaded.
    #[error("The LLVM shared library has already been loaded and cannot be reconfigured")]
    LibraryAlreadyLoaded,

    /// The signature requested at a call site does not match the prototype
    /// declared for the symbol.
    #[error("Prototype mismatch for `{symbol}`: declared `{declared}`, requested `{requested}`")]
    PrototypeMismatch {
        symbol:    String,
        declared:  String,
        requested: String,
    },

    /// A kind-specific operation was invoked on an object of another kind.
    #[error("Expected a {expected} but found {found}")]
    UnexpectedKind { expected: &'static str, found: String },

    /// An error reported by LLVM itself through an out-parameter message.
    #[error("LLVM Error: {_0}")]
    NativeOperation(String),

    /// A Rust string could not be passed to LLVM as it contains an interior
    /// NUL byte.
    #[error("Could not create C string from Rust string: {_0}")]
    InteriorNul(#[from] NulError),

    /// An error that occurs when trying to convert from the C string
    /// representation used by LLVM to the UTF-8 string representation used by
    /// Rust.
    #[error("Could not create Rust string from C string: {_0}")]
    CStrConversion(#[from] Utf8Error),

    /// An error when doing IO around native objects.
    #[error(transparent)]
    IOError(#[from] std::io::Error),
}

impl Error {
    /// Returns `true` if this error signals a deployment problem, i.e. the
    /// native library or one of its symbols is unavailable, rather than misuse
    /// of the bindings.
    #[must_use]
    pub fn is_environmental(&self) -> bool {
        matches!(
            self,
            Self::LibraryNotFound { .. } | Self::SymbolNotFound { .. }
        )
    }
}

#[cfg(test)]
mod test {
    use crate::binding::Error;

    #[test]
    fn library_not_found_lists_candidates() {
        let err = Error::LibraryNotFound {
            candidates: vec!["libLLVM.so".to_string(), "libLLVM-18.so".to_string()],
        };
        assert_eq!(
            err.to_string(),
            "The LLVM shared library could not be found (tried: libLLVM.so, libLLVM-18.so)"
        );
        assert!(err.is_environmental());
    }

    #[test]
    fn ownership_errors_are_not_environmental() {
        let err = Error::DoubleOwnership {
            handle_type: "LLVMModuleRef",
        };
        assert!(!err.is_environmental());
        assert_eq!(
            err.to_string(),
            "The LLVMModuleRef is already owned by another object"
        );
    }
}
