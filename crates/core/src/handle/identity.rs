//! The identity cache maps native handles back to the live wrapper for them.
//!
//! The native library frequently hands back a pointer that we have already
//! wrapped (e.g. the parent module of a function, or the context of a type).
//! Rather than creating a second wrapper with its own idea of ownership, we
//! look up the existing wrapper in this cache.
//!
//! Entries are weak, so the cache never keeps a wrapper alive. Entries are
//! removed explicitly when their wrapper is disposed or dropped, and an entry
//! that is found to be stale is treated as a miss.
//!
//! As wrappers are reference counted with [`std::rc::Rc`] they can never
//! leave the thread that created them, and hence the cache is kept per
//! thread.

use std::{
    cell::RefCell,
    collections::HashMap,
    rc::{Rc, Weak},
};

use llvmc_errors::binding::Result;
use tracing::trace;

use crate::handle::{HandleType, Object, ObjectInner, RawHandle};

/// The key under which a wrapper is cached.
pub type CacheKey = (HandleType, usize);

/// A weak map from handles to the wrappers for them.
#[derive(Debug, Default)]
pub struct IdentityCache {
    entries: HashMap<CacheKey, Weak<ObjectInner>>,
}

impl IdentityCache {
    /// Gets the live wrapper for `key`, if there is one.
    fn get(&self, key: CacheKey) -> Option<Object> {
        self.entries.get(&key).and_then(Weak::upgrade).map(Object)
    }

    /// Inserts `object` under `key` unless a live wrapper is already present,
    /// returning whichever wrapper ends up in the cache.
    fn insert_if_absent(&mut self, key: CacheKey, object: Object) -> Object {
        if let Some(existing) = self.get(key) {
            return existing;
        }
        self.entries.insert(key, Rc::downgrade(&object.0));
        object
    }

    /// Removes the entry for `key`, but only if it refers to `inner`.
    fn remove(&mut self, key: CacheKey, inner: &ObjectInner) {
        if self
            .entries
            .get(&key)
            .is_some_and(|weak| std::ptr::eq(weak.as_ptr(), inner))
        {
            self.entries.remove(&key);
        }
    }

    /// Gets the number of entries, live or stale.
    #[must_use]
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    /// Returns `true` if the cache has no entries.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}

thread_local! {
    static CACHE: RefCell<IdentityCache> = RefCell::new(IdentityCache::default());
}

fn key(handle_type: HandleType, handle: RawHandle) -> CacheKey {
    (handle_type, handle.address())
}

/// Gets the live wrapper for `handle`, if there is one.
#[must_use]
pub fn lookup(handle_type: HandleType, handle: RawHandle) -> Option<Object> {
    CACHE.with(|cache| cache.borrow().get(key(handle_type, handle)))
}

/// Gets the live wrapper for `handle`, calling `factory` to create one if
/// there is none.
///
/// The factory is called without the cache being borrowed, so it is free to
/// look up or create other wrappers.
///
/// # Errors
///
/// Returns any error produced by `factory`.
pub fn lookup_or_create(
    handle_type: HandleType,
    handle: RawHandle,
    factory: impl FnOnce(RawHandle) -> Result<Object>,
) -> Result<Object> {
    if let Some(existing) = lookup(handle_type, handle) {
        trace!(%handle_type, address = handle.address(), "Identity cache hit");
        return Ok(existing);
    }

    let created = factory(handle)?;
    let cached = CACHE.with(|cache| {
        cache
            .borrow_mut()
            .insert_if_absent(key(handle_type, handle), created.clone())
    });

    // The factory may have produced the wrapper by other means. The loser
    // must not dispose the handle that the winner now represents.
    if !cached.ptr_eq(&created) {
        created.0.defuse();
    }

    Ok(cached)
}

/// Adds `object` to the cache under its current handle.
///
/// Returns `false`, leaving the cache untouched, if a different live wrapper
/// is already cached for that handle.
#[must_use]
pub(crate) fn insert(object: &Object) -> bool {
    let handle = object.0.handle.get();
    CACHE.with(|cache| {
        cache
            .borrow_mut()
            .insert_if_absent(key(object.handle_type(), handle), object.clone())
            .ptr_eq(object)
    })
}

/// Removes the entry for `handle` if it refers to `inner`.
///
/// This is called during disposal and from `Drop`, which may happen during
/// thread teardown after the cache itself is gone.
pub(crate) fn forget(handle_type: HandleType, handle: RawHandle, inner: &ObjectInner) {
    let _ = CACHE.try_with(|cache| {
        if let Ok(mut cache) = cache.try_borrow_mut() {
            cache.remove(key(handle_type, handle), inner);
        }
    });
}

/// Gets the number of entries in this thread's cache.
#[must_use]
pub fn entry_count() -> usize {
    CACHE.with(|cache| cache.borrow().len())
}

#[cfg(test)]
mod test {
    use std::cell::Cell;

    use crate::handle::{
        identity::{lookup, lookup_or_create},
        test::{fake_handle, DisposalLog},
        HandleType,
        Object,
        RawHandle,
    };

    #[test]
    fn factories_run_once_per_live_handle() -> anyhow::Result<()> {
        let handle = RawHandle::new(fake_handle()).expect("fake handles are non-null");
        let calls = Cell::new(0);
        let factory = |handle: RawHandle| {
            calls.set(calls.get() + 1);
            Object::borrowed(HandleType::Type, handle.as_ptr())
        };

        let first = lookup_or_create(HandleType::Type, handle, factory)?;
        let second = lookup_or_create(HandleType::Type, handle, factory)?;

        assert_eq!(calls.get(), 1);
        assert!(first.ptr_eq(&second));

        Ok(())
    }

    #[test]
    fn dropped_wrappers_are_evicted() -> anyhow::Result<()> {
        let handle = RawHandle::new(fake_handle()).expect("fake handles are non-null");
        let object = Object::borrowed(HandleType::Value, handle.as_ptr())?;
        assert!(lookup(HandleType::Value, handle).is_some());

        drop(object);
        assert!(lookup(HandleType::Value, handle).is_none());

        Ok(())
    }

    #[test]
    fn disposed_wrappers_are_evicted() -> anyhow::Result<()> {
        let log = DisposalLog::default();
        let handle = RawHandle::new(fake_handle()).expect("fake handles are non-null");
        let object = Object::wrap(HandleType::Module, handle.as_ptr(), log.disposer("module"))?;

        object.dispose();
        assert!(lookup(HandleType::Module, handle).is_none());

        // A new wrapper for a recycled address is a fresh object.
        let fresh = Object::borrowed(HandleType::Module, handle.as_ptr())?;
        assert!(!fresh.ptr_eq(&object));
        assert!(!fresh.is_disposed());

        Ok(())
    }

    #[test]
    fn losing_a_creation_race_does_not_dispose() -> anyhow::Result<()> {
        let log = DisposalLog::default();
        let handle = RawHandle::new(fake_handle()).expect("fake handles are non-null");

        // The factory registers a wrapper itself and then returns a second one
        // for the same handle.
        let result = lookup_or_create(HandleType::Module, handle, |handle| {
            let winner = Object::wrap(HandleType::Module, handle.as_ptr(), log.disposer("winner"))?;
            std::mem::forget(winner);
            Ok(Object(std::rc::Rc::new(crate::handle::ObjectInner::new(
                HandleType::Module,
                handle,
                log.disposer("loser"),
                crate::handle::Ownership::SelfOwned,
            ))))
        })?;

        assert!(!result.is_disposed());
        assert!(log.entries().is_empty());

        Ok(())
    }
}
