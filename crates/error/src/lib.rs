//! Error handling types and utilities for the `llvmc` bindings.
//!
//! # Error Conventions
//!
//! As we are providing a library that others interact with from _code_ as
//! well as from the CLI driver, we keep our errors strongly typed at all
//! times. While libraries like [anyhow](https://docs.rs/anyhow/latest/anyhow/)
//! are well-suited for application code, they make it more difficult than is
//! necessary to handle specific errors in library code. Ownership protocol
//! violations in particular are programmer errors that callers may want to
//! match on in tests, so they each get their own variant.

#![warn(clippy::all, clippy::cargo, clippy::pedantic)]
#![allow(clippy::module_name_repetitions)] // Allows for better API naming
#![allow(clippy::multiple_crate_versions)] // Enforced by our dependencies

pub mod binding;

use thiserror::Error;

/// The result type to be used at the boundaries of the library.
pub type Result<T> = std::result::Result<T, Error>;

/// The root of the error hierarchy for this workspace.
///
/// All errors should be able to be implicitly converted to this error type as
/// this is the type that is used at the outermost boundaries of the library.
#[derive(Debug, Error)]
pub enum Error {
    #[error(transparent)]
    Binding(#[from] binding::Error),

    #[error("An unknown error occurred: {_0}")]
    Miscellaneous(String),
}
