//! Lazy, prototype-checked resolution of native entry points.
//!
//! A symbol is looked up in the loaded library the first time it is needed,
//! and the result (together with its declared prototype) is cached for the
//! rest of the process lifetime. Lookups that fail are never cached, so that a
//! later call can succeed if the symbol becomes available.

use std::{
    collections::{HashMap, HashSet},
    ffi::{c_void, CString},
    ptr::NonNull,
};

use llvmc_errors::binding::{Error, Result};
use parking_lot::Mutex;
use tracing::{debug, warn};

use crate::library::prototype::{NativeSignature, Prototype};

/// Something that native entry points can be looked up in.
///
/// This is implemented for [`libloading::Library`], and exists as a trait so
/// that the resolution logic can be exercised without a real LLVM.
pub trait SymbolSource: Send + Sync {
    /// Returns the address of `symbol`, or a description of why it could not
    /// be found.
    ///
    /// # Errors
    ///
    /// Returns the reason for the failure if the symbol is not present.
    fn lookup(&self, symbol: &str) -> std::result::Result<*mut c_void, String>;
}

impl SymbolSource for libloading::Library {
    fn lookup(&self, symbol: &str) -> std::result::Result<*mut c_void, String> {
        let name = CString::new(symbol).map_err(|e| e.to_string())?;

        // SAFETY: The symbol is only ever read as an address, and is never
        // dereferenced here.
        let address: libloading::Symbol<'_, *mut c_void> =
            unsafe { self.get(name.as_bytes_with_nul()) }.map_err(|e| e.to_string())?;

        Ok(*address)
    }
}

/// The table of declared prototypes, keyed by symbol name.
#[derive(Clone, Debug, Default)]
pub struct Prototypes {
    entries: HashMap<&'static str, Prototype>,
}

impl Prototypes {
    /// Gets the prototype declared for `symbol`, if any.
    #[must_use]
    pub fn get(&self, symbol: &str) -> Option<Prototype> {
        self.entries.get(symbol).copied()
    }

    /// Returns the number of declared prototypes.
    #[must_use]
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    /// Returns `true` if there are no declared prototypes.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}

impl FromIterator<(&'static str, Prototype)> for Prototypes {
    fn from_iter<T: IntoIterator<Item = (&'static str, Prototype)>>(iter: T) -> Self {
        Self {
            entries: iter.into_iter().collect(),
        }
    }
}

/// A symbol that has been found in the library.
#[derive(Clone, Debug, Eq, PartialEq)]
pub struct ResolvedSymbol {
    /// The name the symbol was resolved under.
    pub name: String,

    /// The address of the entry point.
    address: usize,

    /// The prototype declared for the symbol, if any.
    pub prototype: Option<Prototype>,
}

impl ResolvedSymbol {
    /// Gets the address of the entry point.
    #[must_use]
    pub fn address(&self) -> *mut c_void {
        self.address as *mut c_void
    }
}

/// Resolves and caches entry points from a [`SymbolSource`].
#[derive(Debug)]
pub struct Resolver<S> {
    source:     S,
    prototypes: Prototypes,
    cache:      Mutex<HashMap<String, ResolvedSymbol>>,
    warned:     Mutex<HashSet<String>>,
}

impl<S: SymbolSource> Resolver<S> {
    /// Creates a resolver that looks symbols up in `source` and checks them
    /// against `prototypes`.
    #[must_use]
    pub fn new(source: S, prototypes: Prototypes) -> Self {
        Self {
            source,
            prototypes,
            cache: Mutex::new(HashMap::new()),
            warned: Mutex::new(HashSet::new()),
        }
    }

    /// Gets the source that symbols are resolved from.
    #[must_use]
    pub fn source(&self) -> &S {
        &self.source
    }

    /// Gets the prototype table used by this resolver.
    #[must_use]
    pub fn prototypes(&self) -> &Prototypes {
        &self.prototypes
    }

    /// Returns `true` if `symbol` has already been resolved.
    #[must_use]
    pub fn is_cached(&self, symbol: &str) -> bool {
        self.cache.lock().contains_key(symbol)
    }

    /// Resolves `symbol`, performing the lookup only on first use.
    ///
    /// # Errors
    ///
    /// - [`Error::SymbolNotFound`] if the symbol is not exported by the
    ///   library. The failure is not cached.
    pub fn resolve(&self, symbol: &str) -> Result<ResolvedSymbol> {
        if let Some(resolved) = self.cache.lock().get(symbol) {
            return Ok(resolved.clone());
        }

        let address = self
            .source
            .lookup(symbol)
            .map_err(|reason| Error::SymbolNotFound {
                symbol: symbol.to_string(),
                reason,
            })?;
        if address.is_null() {
            return Err(Error::SymbolNotFound {
                symbol: symbol.to_string(),
                reason: "the symbol resolved to a null address".to_string(),
            });
        }

        let prototype = self.prototypes.get(symbol);
        debug!(symbol, ?prototype, "Resolved native symbol");

        let resolved = ResolvedSymbol {
            name: symbol.to_string(),
            address: address as usize,
            prototype,
        };

        // Another thread may have resolved the symbol in the meantime. The
        // first entry wins.
        let mut cache = self.cache.lock();
        Ok(cache
            .entry(symbol.to_string())
            .or_insert(resolved)
            .clone())
    }

    /// Resolves `symbol` as a function pointer of type `F`.
    ///
    /// If a prototype is declared for the symbol it must match `F` exactly. If
    /// there is no declaration the pointer is still returned, but a warning is
    /// emitted the first time this happens for the symbol.
    ///
    /// # Errors
    ///
    /// - [`Error::SymbolNotFound`] if the symbol cannot be resolved.
    /// - [`Error::PrototypeMismatch`] if `F` disagrees with the declaration.
    pub fn function<F: NativeSignature>(&self, symbol: &str) -> Result<F> {
        let resolved = self.resolve(symbol)?;
        let requested = F::prototype();

        match resolved.prototype {
            Some(declared) if declared != requested => {
                return Err(Error::PrototypeMismatch {
                    symbol:    symbol.to_string(),
                    declared:  declared.to_string(),
                    requested: requested.to_string(),
                });
            }
            Some(_) => (),
            None => {
                if self.warned.lock().insert(symbol.to_string()) {
                    warn!(
                        symbol,
                        %requested,
                        "Calling native function without a declared prototype"
                    );
                }
            }
        }

        let address = NonNull::new(resolved.address()).ok_or_else(|| Error::SymbolNotFound {
            symbol: symbol.to_string(),
            reason: "the symbol resolved to a null address".to_string(),
        })?;

        // SAFETY: Either the declared prototype matches `F`, or the caller has
        // taken responsibility for the signature of an undeclared symbol.
        Ok(unsafe { F::from_address(address) })
    }
}

#[cfg(test)]
mod test {
    use std::{
        collections::HashMap,
        ffi::{c_int, c_uint, c_void},
        sync::atomic::{AtomicUsize, Ordering},
    };

    use llvmc_errors::binding::Error;

    use crate::library::{
        prototype::{CType, Prototype},
        resolver::{Prototypes, Resolver, SymbolSource},
    };

    unsafe extern "C" fn double_it(value: c_uint) -> c_uint {
        value * 2
    }

    unsafe extern "C" fn negate(value: c_int) -> c_int {
        -value
    }

    /// A symbol source backed by real Rust functions, counting lookups.
    #[derive(Default)]
    struct FakeLibrary {
        symbols: HashMap<&'static str, usize>,
        lookups: AtomicUsize,
    }

    impl FakeLibrary {
        fn new() -> Self {
            let mut symbols = HashMap::new();
            symbols.insert("DoubleIt", double_it as usize);
            symbols.insert("Negate", negate as usize);
            Self {
                symbols,
                lookups: AtomicUsize::new(0),
            }
        }
    }

    impl SymbolSource for FakeLibrary {
        fn lookup(&self, symbol: &str) -> Result<*mut c_void, String> {
            self.lookups.fetch_add(1, Ordering::SeqCst);
            self.symbols
                .get(symbol)
                .map(|address| *address as *mut c_void)
                .ok_or_else(|| format!("{symbol} is not exported"))
        }
    }

    fn resolver() -> Resolver<FakeLibrary> {
        let prototypes: Prototypes = [("DoubleIt", Prototype::new(CType::UInt, &[CType::UInt]))]
            .into_iter()
            .collect();
        Resolver::new(FakeLibrary::new(), prototypes)
    }

    #[test]
    fn resolves_once_and_caches() -> anyhow::Result<()> {
        let resolver = resolver();

        let first = resolver.resolve("DoubleIt")?;
        let second = resolver.resolve("DoubleIt")?;
        assert_eq!(first, second);
        assert_eq!(resolver.source().lookups.load(Ordering::SeqCst), 1);
        assert!(resolver.is_cached("DoubleIt"));

        Ok(())
    }

    #[test]
    fn missing_symbols_are_not_cached() {
        let resolver = resolver();

        for _ in 0..2 {
            let result = resolver.resolve("MissingFunction");
            assert!(matches!(result, Err(Error::SymbolNotFound { ref symbol, .. }) if symbol == "MissingFunction"));
        }
        assert!(!resolver.is_cached("MissingFunction"));
        assert_eq!(resolver.source().lookups.load(Ordering::SeqCst), 2);
    }

    #[test]
    fn declared_functions_can_be_called() -> anyhow::Result<()> {
        let resolver = resolver();
        let double = resolver.function::<unsafe extern "C" fn(c_uint) -> c_uint>("DoubleIt")?;

        assert_eq!(unsafe { double(21) }, 42);

        Ok(())
    }

    #[test]
    fn mismatched_prototypes_are_rejected() {
        let resolver = resolver();
        let result = resolver.function::<unsafe extern "C" fn(c_int) -> c_int>("DoubleIt");

        match result {
            Err(Error::PrototypeMismatch {
                symbol,
                declared,
                requested,
            }) => {
                assert_eq!(symbol, "DoubleIt");
                assert_eq!(declared, "unsigned (unsigned)");
                assert_eq!(requested, "int (int)");
            }
            other => panic!("Expected a prototype mismatch, got {other:?}"),
        }
    }

    #[test]
    fn undeclared_functions_still_resolve() -> anyhow::Result<()> {
        let resolver = resolver();
        let negate = resolver.function::<unsafe extern "C" fn(c_int) -> c_int>("Negate")?;
        let again = resolver.function::<unsafe extern "C" fn(c_int) -> c_int>("Negate")?;

        assert_eq!(unsafe { negate(7) }, -7);
        assert_eq!(unsafe { again(-3) }, 3);
        assert_eq!(resolver.warned.lock().len(), 1);

        Ok(())
    }
}
