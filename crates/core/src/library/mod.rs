//! The process-wide handle to the LLVM shared library.
//!
//! The library is loaded lazily, the first time any native entry point is
//! needed, and is then kept loaded for the rest of the process. If loading
//! fails the failure is reported to the caller but is not remembered, so the
//! next use tries again. This allows, for example, a program to call
//! [`configure`] after discovering that the default search did not find a
//! library.

pub mod config;
pub mod declarations;
pub mod prototype;
pub mod resolver;

use std::path::{Path, PathBuf};

use libloading::Library;
use llvmc_errors::binding::{Error, Result};
use once_cell::sync::OnceCell;
use parking_lot::{const_mutex, Mutex};
use tracing::debug;

use crate::library::{
    config::LibraryConfig,
    prototype::NativeSignature,
    resolver::{ResolvedSymbol, Resolver},
};

/// The configuration to use for the first load, if one was provided.
static CONFIG: Mutex<Option<LibraryConfig>> = const_mutex(None);

/// The loaded library, once loading has succeeded.
static LIBRARY: OnceCell<NativeLibrary> = OnceCell::new();

/// A loaded LLVM shared library together with its symbol resolver.
#[derive(Debug)]
pub struct NativeLibrary {
    path:     PathBuf,
    resolver: Resolver<Library>,
}

impl NativeLibrary {
    /// Loads the first candidate described by `config` that the dynamic
    /// loader accepts.
    ///
    /// # Errors
    ///
    /// - [`Error::LibraryNotFound`] if none of the candidates could be loaded.
    pub fn load(config: &LibraryConfig) -> Result<Self> {
        let candidates = config.candidates();

        for candidate in &candidates {
            // SAFETY: Loading LLVM runs its static initializers, which have no
            // preconditions that we could violate.
            match unsafe { Library::new(candidate) } {
                Ok(library) => {
                    debug!(path = %candidate.display(), "Loaded LLVM shared library");
                    return Ok(Self {
                        path:     candidate.clone(),
                        resolver: Resolver::new(library, declarations::prototypes()),
                    });
                }
                Err(error) => {
                    debug!(path = %candidate.display(), %error, "Could not load LLVM candidate");
                }
            }
        }

        Err(Error::LibraryNotFound {
            candidates: candidates
                .iter()
                .map(|c| c.display().to_string())
                .collect(),
        })
    }

    /// Gets the path of the candidate that was loaded.
    #[must_use]
    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Gets the resolver for this library's entry points.
    #[must_use]
    pub fn resolver(&self) -> &Resolver<Library> {
        &self.resolver
    }

    /// Resolves `symbol` without checking it against a call-site signature.
    ///
    /// # Errors
    ///
    /// - [`Error::SymbolNotFound`] if the library does not export `symbol`.
    pub fn resolve(&self, symbol: &str) -> Result<ResolvedSymbol> {
        self.resolver.resolve(symbol)
    }

    /// Resolves `symbol` as a function pointer of type `F`.
    ///
    /// # Errors
    ///
    /// - [`Error::SymbolNotFound`] if the library does not export `symbol`.
    /// - [`Error::PrototypeMismatch`] if `F` disagrees with the declared
    ///   prototype for `symbol`.
    pub fn function<F: NativeSignature>(&self, symbol: &str) -> Result<F> {
        self.resolver.function(symbol)
    }
}

/// Sets the configuration used to locate the library.
///
/// # Errors
///
/// - [`Error::LibraryAlreadyLoaded`] if the library has already been loaded.
pub fn configure(config: LibraryConfig) -> Result<()> {
    let mut slot = CONFIG.lock();
    if LIBRARY.get().is_some() {
        return Err(Error::LibraryAlreadyLoaded);
    }
    *slot = Some(config);
    Ok(())
}

/// Gets the process-wide library, loading it if necessary.
///
/// # Errors
///
/// - [`Error::LibraryNotFound`] if the library cannot be loaded. The failure
///   is not cached.
pub fn get() -> Result<&'static NativeLibrary> {
    LIBRARY.get_or_try_init(|| {
        let config = CONFIG.lock().clone().unwrap_or_else(LibraryConfig::from_env);
        NativeLibrary::load(&config)
    })
}

/// Returns `true` if the library has been loaded.
#[must_use]
pub fn is_loaded() -> bool {
    LIBRARY.get().is_some()
}

#[cfg(test)]
mod test {
    use llvmc_errors::binding::Error;

    use crate::library::{config::LibraryConfigBuilder, NativeLibrary};

    #[test]
    fn load_reports_every_candidate() {
        let config = LibraryConfigBuilder::new()
            .with_path("/nonexistent/libLLVM.so")
            .with_names(["libDefinitelyNotLLVM.so"])
            .build();

        match NativeLibrary::load(&config) {
            Err(Error::LibraryNotFound { candidates }) => {
                assert_eq!(
                    candidates,
                    vec![
                        "/nonexistent/libLLVM.so".to_string(),
                        "libDefinitelyNotLLVM.so".to_string(),
                    ]
                );
            }
            other => panic!("Expected LibraryNotFound, got {other:?}"),
        }
    }
}
