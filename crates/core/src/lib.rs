//! This library provides Rust bindings to the
//! [LLVM C API](https://llvm.org/doxygen/group__LLVMC.html), resolved from the
//! LLVM shared library at runtime rather than linked at build time.
//!
//! # Process Overview
//!
//! The bindings are made up of a small core mechanism and a broad but thin
//! surface of typed wrappers built upon it.
//!
//! 1. The [`library`] module locates and loads the LLVM shared library the
//!    first time it is needed, and resolves each entry point lazily. Every
//!    entry point has a declared C prototype, and the function pointer type
//!    used at the call site is checked against it before the call is made.
//! 2. The [`handle`] module wraps each opaque native pointer in an
//!    [`handle::Object`] that knows how (and whether) to dispose of it, which
//!    other objects it owns, and which objects it depends upon. An identity
//!    cache ensures that there is only ever one live wrapper for a given
//!    native object.
//! 3. The remaining modules ([`ir`], [`pass`], [`execution`], [`target`] and
//!    [`binary`]) forward to the C API using those two pieces.
//!
//! None of the functionality of LLVM itself is implemented here. Parsing,
//! optimization, code generation and JIT compilation all happen in the native
//! library.
//!
//! # Threading
//!
//! Wrappers are built on [`std::rc::Rc`] and are therefore neither `Send` nor
//! `Sync`. The loaded library and its symbol cache are process-wide and safe
//! to use from any thread.

#![warn(clippy::all, clippy::cargo, clippy::pedantic)]
#![allow(clippy::module_name_repetitions)] // Allows for better API naming
#![allow(clippy::multiple_crate_versions)] // Enforced by our dependencies
#![allow(clippy::missing_panics_doc)] // Our only panics are in tests

/// Resolves an LLVM entry point as a function pointer with the given
/// signature, checked against its declared prototype.
///
/// This must be used in a function returning
/// [`llvmc_errors::binding::Result`], as both loading the library and
/// resolving the symbol can fail.
macro_rules! native {
    ($name:ident : fn($($param:ty),* $(,)?) -> $ret:ty) => {
        $crate::library::get()?
            .function::<unsafe extern "C" fn($($param),*) -> $ret>(stringify!($name))?
    };
    ($name:ident : fn($($param:ty),* $(,)?)) => {
        native!($name: fn($($param),*) -> ())
    };
}

pub mod binary;
pub mod constant;
pub mod execution;
pub mod handle;
pub mod ir;
pub mod library;
pub mod message;
pub mod pass;
pub mod target;

pub use handle::{HandleType, NativeWrapper, Object};
pub use library::{config::LibraryConfig, config::LibraryConfigBuilder};
