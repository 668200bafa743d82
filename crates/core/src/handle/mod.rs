//! The handle wrapper that stands in for every opaque native object.
//!
//! LLVM's C API hands out raw pointers to objects whose lifetimes are governed
//! by a mixture of rules: some objects must be disposed by whoever created
//! them, some are disposed implicitly when their parent is, and some change
//! hands when passed to particular functions. An [`Object`] wraps one such
//! pointer and encodes those rules explicitly.
//!
//! # Ownership
//!
//! Every object is in exactly one of three states while it is live:
//!
//! - **Self-owned**, in which case it disposes of its native object when it is
//!   explicitly [disposed](Object::dispose) or when the last reference to it is
//!   dropped.
//! - **Owned** by another object, in which case the owner keeps it alive and
//!   tears it down when the owner itself is disposed. Children are torn down
//!   depth-first, in the order they were taken, before the owner's own
//!   disposer runs.
//! - **Permanent**, for objects like the global context that are never
//!   disposed and can never be owned.
//!
//! Separately from ownership, an object may have **dependents**: wrappers for
//! native objects that live inside it, like the functions of a module or the
//! types of a context. The Rust side never disposes of these, but they become
//! unusable the moment their parent goes away, so tearing down an object also
//! marks its dependents (transitively) as disposed.
//!
//! # Identity
//!
//! Objects are created through the [identity cache](identity), so that there
//! is at most one live wrapper for any given native handle. This makes
//! comparison by identity ([`Object::ptr_eq`]) reliable.

pub mod identity;

use std::{
    cell::{Cell, RefCell},
    ffi::c_void,
    fmt::{Display, Formatter},
    ptr::NonNull,
    rc::{Rc, Weak},
};

use derivative::Derivative;
use llvmc_errors::binding::{Error, Result};
use tracing::{trace, warn};

/// The type of the raw pointers passed across the FFI boundary.
pub type RawPtr = *mut c_void;

/// A non-null opaque pointer that came from the native library.
///
/// It is never dereferenced on the Rust side.
#[derive(Clone, Copy, Debug, Eq, Hash, PartialEq)]
pub struct RawHandle(NonNull<c_void>);

impl RawHandle {
    /// Creates a handle from `ptr`, returning [`None`] if it is null.
    #[must_use]
    pub fn new(ptr: RawPtr) -> Option<Self> {
        NonNull::new(ptr).map(Self)
    }

    /// Gets the raw pointer for passing back across the FFI boundary.
    #[must_use]
    pub fn as_ptr(self) -> RawPtr {
        self.0.as_ptr()
    }

    /// Gets the address of the handle, as used in the identity cache.
    #[must_use]
    pub fn address(self) -> usize {
        self.0.as_ptr() as usize
    }
}

/// The C typedef that a handle was obtained as.
///
/// The same address can legitimately be handed out under two typedefs (e.g. a
/// basic block and its value view), so the type forms part of an object's
/// identity.
#[derive(Clone, Copy, Debug, Eq, Hash, PartialEq)]
pub enum HandleType {
    Context,
    Module,
    Type,
    Value,
    BasicBlock,
    Metadata,
    Builder,
    MemoryBuffer,
    PassManager,
    PassBuilderOptions,
    ExecutionEngine,
    GenericValue,
    TargetData,
    Target,
    Binary,
    SectionIterator,
    SymbolIterator,
    RelocationIterator,
}

impl HandleType {
    /// Gets the name of the C typedef for handles of this type.
    #[must_use]
    pub fn c_name(self) -> &'static str {
        match self {
            Self::Context => "LLVMContextRef",
            Self::Module => "LLVMModuleRef",
            Self::Type => "LLVMTypeRef",
            Self::Value => "LLVMValueRef",
            Self::BasicBlock => "LLVMBasicBlockRef",
            Self::Metadata => "LLVMMetadataRef",
            Self::Builder => "LLVMBuilderRef",
            Self::MemoryBuffer => "LLVMMemoryBufferRef",
            Self::PassManager => "LLVMPassManagerRef",
            Self::PassBuilderOptions => "LLVMPassBuilderOptionsRef",
            Self::ExecutionEngine => "LLVMExecutionEngineRef",
            Self::GenericValue => "LLVMGenericValueRef",
            Self::TargetData => "LLVMTargetDataRef",
            Self::Target => "LLVMTargetRef",
            Self::Binary => "LLVMBinaryRef",
            Self::SectionIterator => "LLVMSectionIteratorRef",
            Self::SymbolIterator => "LLVMSymbolIteratorRef",
            Self::RelocationIterator => "LLVMRelocationIteratorRef",
        }
    }
}

impl Display for HandleType {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.c_name())
    }
}

/// The function that releases a native object.
pub type Disposer = Box<dyn FnOnce(RawHandle)>;

/// Creates a disposer that passes the handle to the native `dispose` function.
#[must_use]
pub fn native_disposer(dispose: unsafe extern "C" fn(RawPtr)) -> Option<Disposer> {
    // SAFETY: Disposers run at most once per handle, and never after the
    // handle has been consumed elsewhere.
    Some(Box::new(move |handle: RawHandle| unsafe { dispose(handle.as_ptr()) }))
}

/// What an owner does with a child when the owner is torn down.
#[derive(Clone, Copy, Debug, Eq, PartialEq)]
enum Teardown {
    /// Run the child's own disposer before the owner's.
    Dispose,

    /// The owner's native disposer frees the child, so the child is only
    /// marked as disposed.
    Native,
}

/// The ownership state of a live object.
#[derive(Clone, Debug)]
enum Ownership {
    SelfOwned,
    OwnedBy(Weak<ObjectInner>),
    Permanent,
}

#[derive(Derivative)]
#[derivative(Debug)]
struct ObjectInner {
    handle_type: HandleType,
    handle:      Cell<RawHandle>,
    disposed:    Cell<bool>,
    ownable:     bool,
    ownership:   RefCell<Ownership>,

    #[derivative(Debug = "ignore")]
    disposer: RefCell<Option<Disposer>>,

    #[derivative(Debug = "ignore")]
    owned: RefCell<Vec<(Object, Teardown)>>,

    #[derivative(Debug = "ignore")]
    dependents: RefCell<Vec<Weak<ObjectInner>>>,

    #[derivative(Debug = "ignore")]
    references: RefCell<Vec<(&'static str, Object)>>,
}

impl ObjectInner {
    fn new(
        handle_type: HandleType,
        handle: RawHandle,
        disposer: Option<Disposer>,
        ownership: Ownership,
    ) -> Self {
        let ownable = !matches!(ownership, Ownership::Permanent);
        Self {
            handle_type,
            handle: Cell::new(handle),
            disposed: Cell::new(false),
            ownable,
            ownership: RefCell::new(ownership),
            disposer: RefCell::new(disposer),
            owned: RefCell::new(Vec::new()),
            dependents: RefCell::new(Vec::new()),
            references: RefCell::new(Vec::new()),
        }
    }

    /// Tears down this object and everything it owns, depth-first.
    ///
    /// Children are handled in the order they were taken, and each child's
    /// subtree is torn down before the child itself. Dependents are then
    /// marked disposed without running any disposer. The disposer for this
    /// object only runs if `run_disposer` is set.
    fn teardown(&self, run_disposer: bool) {
        if self.disposed.replace(true) {
            return;
        }

        let owned = std::mem::take(&mut *self.owned.borrow_mut());
        for (child, teardown) in &owned {
            child.0.teardown(*teardown == Teardown::Dispose);
        }

        let dependents = std::mem::take(&mut *self.dependents.borrow_mut());
        for dependent in dependents.iter().filter_map(Weak::upgrade) {
            dependent.teardown(false);
        }

        let handle = self.handle.get();
        identity::forget(self.handle_type, handle, self);

        let disposer = self.disposer.borrow_mut().take();
        if let Some(disposer) = disposer.filter(|_| run_disposer) {
            trace!(handle_type = %self.handle_type, address = handle.address(), "Disposing native object");
            disposer(handle);
        }

        drop(owned);
        let references = std::mem::take(&mut *self.references.borrow_mut());
        drop(references);
    }

    /// Marks the object disposed without running its disposer.
    fn defuse(&self) {
        self.disposer.borrow_mut().take();
        self.disposed.set(true);
    }

    /// Returns `true` if `self` is `other` or (transitively) owns it.
    fn owns_transitively(&self, other: &ObjectInner) -> bool {
        std::ptr::eq(self, other)
            || self
                .owned
                .borrow()
                .iter()
                .any(|(child, _)| child.0.owns_transitively(other))
    }
}

impl Drop for ObjectInner {
    fn drop(&mut self) {
        if self.disposed.get() {
            return;
        }

        let ownership = self.ownership.borrow().clone();
        match ownership {
            Ownership::SelfOwned => self.teardown(true),

            // An owner holds a strong reference to each child it owns, so
            // this only happens if the owner is itself being dropped.
            Ownership::OwnedBy(_) => self.teardown(false),

            Ownership::Permanent => identity::forget(self.handle_type, self.handle.get(), self),
        }
    }
}

/// A reference-counted wrapper around a single native handle.
///
/// Cloning an [`Object`] creates another reference to the same wrapper, and
/// equality is identity.
#[derive(Clone, Debug)]
pub struct Object(Rc<ObjectInner>);

impl Object {
    /// Wraps `ptr`, returning the existing wrapper if one is live.
    ///
    /// If a new wrapper is created it is self-owned and will run `disposer`
    /// (if any) when it is disposed. If an existing wrapper is returned,
    /// `disposer` is discarded without being called.
    ///
    /// # Errors
    ///
    /// - [`Error::InvalidHandle`] if `ptr` is null.
    pub fn wrap(handle_type: HandleType, ptr: RawPtr, disposer: Option<Disposer>) -> Result<Self> {
        Self::create(handle_type, ptr, disposer, Ownership::SelfOwned)
    }

    /// Wraps `ptr` as for [`Self::wrap`], but treats null as the absence of an
    /// object.
    ///
    /// # Errors
    ///
    /// See [`Self::wrap`].
    pub fn wrap_nullable(
        handle_type: HandleType,
        ptr: RawPtr,
        disposer: Option<Disposer>,
    ) -> Result<Option<Self>> {
        if ptr.is_null() {
            Ok(None)
        } else {
            Self::wrap(handle_type, ptr, disposer).map(Some)
        }
    }

    /// Wraps `ptr` as an object that the Rust side is not responsible for
    /// disposing, such as a type or a value.
    ///
    /// # Errors
    ///
    /// - [`Error::InvalidHandle`] if `ptr` is null.
    pub fn borrowed(handle_type: HandleType, ptr: RawPtr) -> Result<Self> {
        Self::wrap(handle_type, ptr, None)
    }

    /// Wraps `ptr` as a permanent object that is never disposed and cannot be
    /// owned.
    ///
    /// # Errors
    ///
    /// - [`Error::InvalidHandle`] if `ptr` is null.
    pub fn permanent(handle_type: HandleType, ptr: RawPtr) -> Result<Self> {
        Self::create(handle_type, ptr, None, Ownership::Permanent)
    }

    fn create(
        handle_type: HandleType,
        ptr: RawPtr,
        disposer: Option<Disposer>,
        ownership: Ownership,
    ) -> Result<Self> {
        let handle = RawHandle::new(ptr).ok_or(Error::InvalidHandle {
            handle_type: handle_type.c_name(),
        })?;

        identity::lookup_or_create(handle_type, handle, |handle| {
            trace!(%handle_type, address = handle.address(), "Wrapping native object");
            Ok(Self(Rc::new(ObjectInner::new(
                handle_type,
                handle,
                disposer,
                ownership,
            ))))
        })
    }

    /// Gets the type of the wrapped handle.
    #[must_use]
    pub fn handle_type(&self) -> HandleType {
        self.0.handle_type
    }

    /// Gets the raw pointer for passing to the native library.
    ///
    /// # Errors
    ///
    /// - [`Error::UseAfterDispose`] if the object has been disposed.
    pub fn raw(&self) -> Result<RawPtr> {
        if self.is_disposed() {
            Err(Error::UseAfterDispose {
                handle_type: self.0.handle_type.c_name(),
            })
        } else {
            Ok(self.0.handle.get().as_ptr())
        }
    }

    /// Gets the address of the wrapped handle.
    ///
    /// This is available even after disposal, for diagnostics.
    #[must_use]
    pub fn address(&self) -> usize {
        self.0.handle.get().address()
    }

    /// Returns `true` if the object has been disposed.
    #[must_use]
    pub fn is_disposed(&self) -> bool {
        self.0.disposed.get()
    }

    /// Returns `true` if the object is responsible for its own disposal.
    #[must_use]
    pub fn is_self_owned(&self) -> bool {
        matches!(*self.0.ownership.borrow(), Ownership::SelfOwned)
    }

    /// Returns `true` if the object can be owned by another object.
    #[must_use]
    pub fn is_ownable(&self) -> bool {
        self.0.ownable
    }

    /// Gets the object that currently owns this one, if any.
    #[must_use]
    pub fn owner(&self) -> Option<Object> {
        match &*self.0.ownership.borrow() {
            Ownership::OwnedBy(owner) => owner.upgrade().map(Object),
            _ => None,
        }
    }

    /// Returns `true` if `self` and `other` are the same wrapper.
    #[must_use]
    pub fn ptr_eq(&self, other: &Object) -> bool {
        Rc::ptr_eq(&self.0, &other.0)
    }

    /// Returns `true` if `self` directly owns `child`.
    #[must_use]
    pub fn owns(&self, child: &Object) -> bool {
        self.0
            .owned
            .borrow()
            .iter()
            .any(|(owned, _)| owned.ptr_eq(child))
    }

    /// Takes ownership of `child`, so that disposing `self` also disposes
    /// `child` and `child` no longer disposes itself.
    ///
    /// # Errors
    ///
    /// - [`Error::UseAfterDispose`] if either object has been disposed.
    /// - [`Error::NotOwnable`] if `child` is permanent.
    /// - [`Error::DoubleOwnership`] if `child` already has an owner.
    /// - [`Error::OwnershipCycle`] if `child` is `self` or owns `self`.
    pub fn take_ownership(&self, child: &Object) -> Result<()> {
        self.add_child(child, Teardown::Dispose)
    }

    /// Takes ownership of `child` on behalf of the native library, for cases
    /// where the native disposer of `self` also frees `child`.
    ///
    /// The child's own disposer is never run while it is owned this way.
    ///
    /// # Errors
    ///
    /// See [`Self::take_ownership`].
    pub fn take_native_ownership(&self, child: &Object) -> Result<()> {
        self.add_child(child, Teardown::Native)
    }

    fn add_child(&self, child: &Object, teardown: Teardown) -> Result<()> {
        self.raw()?;
        child.raw()?;
        let handle_type = child.0.handle_type.c_name();

        if !child.0.ownable {
            return Err(Error::NotOwnable { handle_type });
        }
        if !child.is_self_owned() {
            return Err(Error::DoubleOwnership { handle_type });
        }
        if child.0.owns_transitively(&self.0) {
            return Err(Error::OwnershipCycle { handle_type });
        }

        *child.0.ownership.borrow_mut() = Ownership::OwnedBy(Rc::downgrade(&self.0));
        self.0.owned.borrow_mut().push((child.clone(), teardown));
        trace!(
            owner = %self.0.handle_type,
            owner_address = self.address(),
            child = %child.0.handle_type,
            child_address = child.address(),
            ?teardown,
            "Took ownership"
        );

        Ok(())
    }

    /// Releases ownership of `child`, which becomes self-owned again.
    ///
    /// # Errors
    ///
    /// - [`Error::NotOwned`] if `self` does not own `child`.
    pub fn release_ownership(&self, child: &Object) -> Result<()> {
        let mut owned = self.0.owned.borrow_mut();
        let position = owned
            .iter()
            .position(|(owned, _)| owned.ptr_eq(child))
            .ok_or(Error::NotOwned {
                handle_type: child.0.handle_type.c_name(),
            })?;
        owned.remove(position);
        drop(owned);

        *child.0.ownership.borrow_mut() = Ownership::SelfOwned;
        trace!(
            owner = %self.0.handle_type,
            owner_address = self.address(),
            child = %child.0.handle_type,
            child_address = child.address(),
            "Released ownership"
        );

        Ok(())
    }

    /// Records `dependent` as living inside the native object of `self`, so
    /// that `dependent` is marked disposed whenever `self` is torn down.
    ///
    /// Only a weak reference is kept. If `self` is already disposed then so is
    /// `dependent`.
    pub fn add_dependent(&self, dependent: &Object) {
        if dependent.ptr_eq(self) {
            return;
        }
        if self.is_disposed() {
            dependent.0.teardown(false);
            return;
        }

        // Dead entries are only pruned when the list would otherwise grow.
        let mut dependents = self.0.dependents.borrow_mut();
        if dependents.len() == dependents.capacity() {
            dependents.retain(|weak| weak.strong_count() > 0);
        }
        dependents.push(Rc::downgrade(&dependent.0));
    }

    /// Records `object` as a collaborator of `self` under `name`, keeping it
    /// alive for at least as long as `self`.
    ///
    /// Setting a name that is already present replaces the previous object.
    pub fn set_ref(&self, name: &'static str, object: &Object) {
        let mut references = self.0.references.borrow_mut();
        match references.iter_mut().find(|(n, _)| *n == name) {
            Some((_, existing)) => *existing = object.clone(),
            None => references.push((name, object.clone())),
        }
    }

    /// Gets the collaborator recorded under `name`, if any.
    #[must_use]
    pub fn get_ref(&self, name: &str) -> Option<Object> {
        self.0
            .references
            .borrow()
            .iter()
            .find(|(n, _)| *n == name)
            .map(|(_, object)| object.clone())
    }

    /// Disposes of the native object, and of everything that this object owns.
    ///
    /// This is a no-op if the object has already been disposed, if it is
    /// owned by another live object (the owner disposes it), or if it is
    /// permanent.
    pub fn dispose(&self) {
        let ownership = self.0.ownership.borrow().clone();
        match ownership {
            Ownership::SelfOwned => self.0.teardown(true),
            Ownership::OwnedBy(owner) if owner.upgrade().is_none() => self.0.teardown(true),
            Ownership::OwnedBy(_) | Ownership::Permanent => (),
        }
    }

    /// Marks the object disposed without running its disposer, for when a
    /// native call has consumed the handle.
    ///
    /// Returns the raw pointer so it can be passed to that call.
    ///
    /// # Errors
    ///
    /// - [`Error::UseAfterDispose`] if the object has already been disposed.
    /// - [`Error::DoubleOwnership`] if the object is owned by another object.
    /// - [`Error::NotOwnable`] if the object is permanent.
    pub fn surrender(&self) -> Result<RawPtr> {
        let ptr = self.raw()?;
        let handle_type = self.0.handle_type.c_name();
        match &*self.0.ownership.borrow() {
            Ownership::SelfOwned => (),
            Ownership::OwnedBy(_) => return Err(Error::DoubleOwnership { handle_type }),
            Ownership::Permanent => return Err(Error::NotOwnable { handle_type }),
        }

        trace!(handle_type, address = self.address(), "Surrendering native object");
        self.0.teardown(false);
        Ok(ptr)
    }

    /// Points this wrapper at a different native handle, re-keying it in the
    /// identity cache.
    ///
    /// On failure the wrapper is left bound to its old handle.
    ///
    /// # Errors
    ///
    /// - [`Error::UseAfterDispose`] if the object has been disposed.
    /// - [`Error::InvalidHandle`] if `ptr` is null.
    /// - [`Error::IdentityConflict`] if another live wrapper already
    ///   represents `ptr`.
    pub fn rebind(&self, ptr: RawPtr) -> Result<()> {
        let handle_type = self.0.handle_type.c_name();
        let old = RawHandle::new(self.raw()?).ok_or(Error::InvalidHandle { handle_type })?;
        let new = RawHandle::new(ptr).ok_or(Error::InvalidHandle { handle_type })?;
        if old == new {
            return Ok(());
        }

        identity::forget(self.0.handle_type, old, &self.0);
        self.0.handle.set(new);
        if identity::insert(self) {
            return Ok(());
        }

        warn!(
            handle_type,
            address = new.address(),
            "Cannot rebind as another wrapper holds the handle"
        );
        self.0.handle.set(old);
        let _ = identity::insert(self);
        Err(Error::IdentityConflict {
            handle_type,
            address: new.address(),
        })
    }
}

impl PartialEq for Object {
    fn eq(&self, other: &Self) -> bool {
        self.ptr_eq(other)
    }
}

impl Eq for Object {}

/// Typed wrappers that are a thin layer over an [`Object`] of a particular
/// [`HandleType`].
pub trait NativeWrapper: Sized {
    /// The type of handle that this wrapper holds.
    const HANDLE_TYPE: HandleType;

    /// Creates the wrapper from its underlying object.
    fn from_object(object: Object) -> Self;

    /// Gets the underlying object.
    fn object(&self) -> &Object;

    /// Gets the raw handle for passing to the native library.
    ///
    /// # Errors
    ///
    /// - [`Error::UseAfterDispose`] if the object has been disposed.
    fn raw(&self) -> Result<RawPtr> {
        self.object().raw()
    }

    /// Disposes of the underlying object.
    fn dispose(&self) {
        self.object().dispose();
    }

    /// Gets the wrapper for a handle that the Rust side does not dispose of.
    ///
    /// # Errors
    ///
    /// - [`Error::InvalidHandle`] if `ptr` is null.
    fn borrowed(ptr: RawPtr) -> Result<Self> {
        Object::borrowed(Self::HANDLE_TYPE, ptr).map(Self::from_object)
    }

    /// Gets the wrapper for a handle that may be null.
    ///
    /// # Errors
    ///
    /// Never, as null is the absence of an object, but the signature is kept
    /// consistent with [`NativeWrapper::borrowed`].
    fn borrowed_nullable(ptr: RawPtr) -> Result<Option<Self>> {
        Object::wrap_nullable(Self::HANDLE_TYPE, ptr, None).map(|o| o.map(Self::from_object))
    }
}

/// Declares a typed wrapper struct over an [`Object`].
macro_rules! native_wrapper {
    ($(#[$meta:meta])* $vis:vis struct $name:ident($handle_type:ident);) => {
        $(#[$meta])*
        #[derive(Clone, Debug, Eq, PartialEq)]
        $vis struct $name {
            object: $crate::handle::Object,
        }

        impl $crate::handle::NativeWrapper for $name {
            const HANDLE_TYPE: $crate::handle::HandleType =
                $crate::handle::HandleType::$handle_type;

            fn from_object(object: $crate::handle::Object) -> Self {
                debug_assert_eq!(object.handle_type(), Self::HANDLE_TYPE);
                Self { object }
            }

            fn object(&self) -> &$crate::handle::Object {
                &self.object
            }
        }
    };
}

pub(crate) use native_wrapper;

#[cfg(test)]
pub(crate) mod test {
    use std::{cell::RefCell, rc::Rc};

    use llvmc_errors::binding::Error;

    use crate::handle::{identity, Disposer, HandleType, Object, RawHandle, RawPtr};

    /// Gets a distinct fake handle for use in tests.
    ///
    /// The handles are never dereferenced, so any non-null, unique address
    /// will do.
    pub fn fake_handle() -> RawPtr {
        Box::into_raw(Box::new(0u64)).cast()
    }

    /// Records the order in which disposers run.
    #[derive(Clone, Default)]
    pub struct DisposalLog(Rc<RefCell<Vec<&'static str>>>);

    impl DisposalLog {
        pub fn disposer(&self, name: &'static str) -> Option<Disposer> {
            let log = self.0.clone();
            Some(Box::new(move |_| log.borrow_mut().push(name)) as Disposer)
        }

        pub fn entries(&self) -> Vec<&'static str> {
            self.0.borrow().clone()
        }
    }

    fn object(log: &DisposalLog, name: &'static str) -> anyhow::Result<Object> {
        Ok(Object::wrap(HandleType::Module, fake_handle(), log.disposer(name))?)
    }

    #[test]
    fn null_handles_are_rejected() {
        let result = Object::wrap(HandleType::Module, std::ptr::null_mut(), None);
        assert!(matches!(
            result,
            Err(Error::InvalidHandle {
                handle_type: "LLVMModuleRef"
            })
        ));
        assert!(matches!(
            Object::wrap_nullable(HandleType::Module, std::ptr::null_mut(), None),
            Ok(None)
        ));
    }

    #[test]
    fn wrapping_the_same_handle_twice_gives_the_same_object() -> anyhow::Result<()> {
        let log = DisposalLog::default();
        let ptr = fake_handle();
        let first = Object::wrap(HandleType::Module, ptr, log.disposer("first"))?;
        let second = Object::wrap(HandleType::Module, ptr, log.disposer("second"))?;
        assert!(first.ptr_eq(&second));

        // The same address under another handle type is a different object.
        let other = Object::borrowed(HandleType::Value, ptr)?;
        assert!(!other.ptr_eq(&first));

        drop(first);
        drop(second);
        assert_eq!(log.entries(), vec!["first"]);

        Ok(())
    }

    #[test]
    fn disposing_twice_runs_the_disposer_once() -> anyhow::Result<()> {
        let log = DisposalLog::default();
        let object = object(&log, "a")?;

        object.dispose();
        object.dispose();
        drop(object);

        assert_eq!(log.entries(), vec!["a"]);
        Ok(())
    }

    #[test]
    fn disposed_objects_cannot_be_used() -> anyhow::Result<()> {
        let log = DisposalLog::default();
        let object = object(&log, "a")?;
        object.dispose();

        assert!(object.is_disposed());
        assert!(matches!(
            object.raw(),
            Err(Error::UseAfterDispose {
                handle_type: "LLVMModuleRef"
            })
        ));
        Ok(())
    }

    #[test]
    fn dropping_a_self_owned_object_disposes_it() -> anyhow::Result<()> {
        let log = DisposalLog::default();
        let object = object(&log, "a")?;
        let alias = object.clone();

        drop(object);
        assert!(log.entries().is_empty());
        drop(alias);
        assert_eq!(log.entries(), vec!["a"]);

        Ok(())
    }

    #[test]
    fn taking_ownership_twice_fails() -> anyhow::Result<()> {
        let log = DisposalLog::default();
        let owner = object(&log, "owner")?;
        let other = object(&log, "other")?;
        let child = object(&log, "child")?;

        owner.take_ownership(&child)?;
        assert!(matches!(
            owner.take_ownership(&child),
            Err(Error::DoubleOwnership { .. })
        ));
        assert!(matches!(
            other.take_ownership(&child),
            Err(Error::DoubleOwnership { .. })
        ));
        assert!(child.owner().is_some_and(|o| o.ptr_eq(&owner)));

        Ok(())
    }

    #[test]
    fn releasing_without_taking_fails() -> anyhow::Result<()> {
        let log = DisposalLog::default();
        let owner = object(&log, "owner")?;
        let child = object(&log, "child")?;

        assert!(matches!(
            owner.release_ownership(&child),
            Err(Error::NotOwned { .. })
        ));

        owner.take_ownership(&child)?;
        owner.release_ownership(&child)?;
        assert!(matches!(
            owner.release_ownership(&child),
            Err(Error::NotOwned { .. })
        ));
        assert!(child.is_self_owned());

        Ok(())
    }

    #[test]
    fn ownership_cycles_are_rejected() -> anyhow::Result<()> {
        let log = DisposalLog::default();
        let a = object(&log, "a")?;
        let b = object(&log, "b")?;
        let c = object(&log, "c")?;

        a.take_ownership(&b)?;
        b.take_ownership(&c)?;

        assert!(matches!(
            c.take_ownership(&a),
            Err(Error::OwnershipCycle { .. })
        ));
        assert!(matches!(
            a.take_ownership(&a),
            Err(Error::OwnershipCycle { .. })
        ));

        Ok(())
    }

    #[test]
    fn owners_dispose_children_first() -> anyhow::Result<()> {
        let log = DisposalLog::default();
        let a = object(&log, "a")?;
        let b = object(&log, "b")?;

        a.take_ownership(&b)?;
        a.dispose();
        assert_eq!(log.entries(), vec!["b", "a"]);
        assert!(b.is_disposed());

        a.dispose();
        assert_eq!(log.entries(), vec!["b", "a"]);

        Ok(())
    }

    #[test]
    fn disposal_is_depth_first_in_insertion_order() -> anyhow::Result<()> {
        let log = DisposalLog::default();
        let root = object(&log, "root")?;
        let first = object(&log, "first")?;
        let nested = object(&log, "nested")?;
        let second = object(&log, "second")?;

        root.take_ownership(&first)?;
        first.take_ownership(&nested)?;
        root.take_ownership(&second)?;

        // The children are kept alive by their owner.
        drop(first);
        drop(nested);
        drop(second);
        assert!(log.entries().is_empty());

        drop(root);
        assert_eq!(log.entries(), vec!["nested", "first", "second", "root"]);

        Ok(())
    }

    #[test]
    fn owned_objects_do_not_dispose_themselves() -> anyhow::Result<()> {
        let log = DisposalLog::default();
        let owner = object(&log, "owner")?;
        let child = object(&log, "child")?;
        owner.take_ownership(&child)?;

        child.dispose();
        assert!(!child.is_disposed());
        assert!(log.entries().is_empty());

        Ok(())
    }

    #[test]
    fn released_children_outlive_their_former_owner() -> anyhow::Result<()> {
        let log = DisposalLog::default();
        let owner = object(&log, "owner")?;
        let child = object(&log, "child")?;

        owner.take_ownership(&child)?;
        owner.release_ownership(&child)?;
        owner.dispose();
        assert_eq!(log.entries(), vec!["owner"]);
        assert!(!child.is_disposed());

        drop(child);
        assert_eq!(log.entries(), vec!["owner", "child"]);

        Ok(())
    }

    #[test]
    fn natively_owned_children_are_not_disposed_by_us() -> anyhow::Result<()> {
        let log = DisposalLog::default();
        let engine = object(&log, "engine")?;
        let module = object(&log, "module")?;

        engine.take_native_ownership(&module)?;
        engine.dispose();

        assert_eq!(log.entries(), vec!["engine"]);
        assert!(module.is_disposed());

        Ok(())
    }

    #[test]
    fn permanent_objects_are_never_disposed_or_owned() -> anyhow::Result<()> {
        let log = DisposalLog::default();
        let owner = object(&log, "owner")?;
        let global = Object::permanent(HandleType::Context, fake_handle())?;

        assert!(matches!(
            owner.take_ownership(&global),
            Err(Error::NotOwnable {
                handle_type: "LLVMContextRef"
            })
        ));

        global.dispose();
        assert!(!global.is_disposed());
        assert!(global.raw().is_ok());

        Ok(())
    }

    #[test]
    fn surrendered_objects_skip_their_disposer() -> anyhow::Result<()> {
        let log = DisposalLog::default();
        let buffer = object(&log, "buffer")?;
        let raw = buffer.raw()?;

        assert_eq!(buffer.surrender()?, raw);
        assert!(buffer.is_disposed());
        drop(buffer);
        assert!(log.entries().is_empty());

        Ok(())
    }

    #[test]
    fn references_keep_collaborators_alive() -> anyhow::Result<()> {
        let log = DisposalLog::default();
        let context = object(&log, "context")?;
        let ty = Object::borrowed(HandleType::Type, fake_handle())?;

        ty.set_ref("context", &context);
        drop(context);
        assert!(log.entries().is_empty());
        assert!(ty.get_ref("context").is_some());
        assert!(ty.get_ref("module").is_none());

        drop(ty);
        assert_eq!(log.entries(), vec!["context"]);

        Ok(())
    }

    #[test]
    fn tearing_down_a_parent_invalidates_its_dependents() -> anyhow::Result<()> {
        let log = DisposalLog::default();
        let module = object(&log, "module")?;
        let function = Object::borrowed(HandleType::Value, fake_handle())?;
        let block = Object::borrowed(HandleType::BasicBlock, fake_handle())?;
        function.set_ref("parent", &module);
        module.add_dependent(&function);
        block.set_ref("parent", &function);
        function.add_dependent(&block);

        let handle = RawHandle::new(function.raw()?).expect("fake handles are non-null");
        module.dispose();

        assert_eq!(log.entries(), vec!["module"]);
        for dependent in [&function, &block] {
            assert!(dependent.is_disposed());
            assert!(matches!(dependent.raw(), Err(Error::UseAfterDispose { .. })));
        }
        assert!(identity::lookup(HandleType::Value, handle).is_none());

        // A recycled address gets a fresh wrapper.
        let fresh = Object::borrowed(HandleType::Value, handle.as_ptr())?;
        assert!(!fresh.ptr_eq(&function));
        assert!(fresh.raw().is_ok());

        Ok(())
    }

    #[test]
    fn natively_owned_children_invalidate_their_dependents() -> anyhow::Result<()> {
        let log = DisposalLog::default();
        let engine = object(&log, "engine")?;
        let module = object(&log, "module")?;
        let function = Object::borrowed(HandleType::Value, fake_handle())?;
        module.add_dependent(&function);
        engine.take_native_ownership(&module)?;

        drop(engine);
        assert_eq!(log.entries(), vec!["engine"]);
        assert!(function.is_disposed());

        Ok(())
    }

    #[test]
    fn dependents_of_a_disposed_parent_are_disposed() -> anyhow::Result<()> {
        let log = DisposalLog::default();
        let context = object(&log, "context")?;
        context.dispose();

        let ty = Object::borrowed(HandleType::Type, fake_handle())?;
        context.add_dependent(&ty);
        assert!(ty.is_disposed());

        Ok(())
    }

    #[test]
    fn dropped_dependents_are_not_kept_alive() -> anyhow::Result<()> {
        let log = DisposalLog::default();
        let context = object(&log, "context")?;
        let ty = Object::borrowed(HandleType::Type, fake_handle())?;
        let handle = RawHandle::new(ty.raw()?).expect("fake handles are non-null");
        context.add_dependent(&ty);

        drop(ty);
        assert!(identity::lookup(HandleType::Type, handle).is_none());
        context.dispose();
        assert_eq!(log.entries(), vec!["context"]);

        Ok(())
    }

    #[test]
    fn rebinding_moves_the_identity() -> anyhow::Result<()> {
        let log = DisposalLog::default();
        let old = fake_handle();
        let new = fake_handle();
        let object = Object::wrap(HandleType::Module, old, log.disposer("module"))?;

        object.rebind(new)?;
        assert_eq!(object.raw()?, new);
        assert!(Object::borrowed(HandleType::Module, new)?.ptr_eq(&object));
        assert!(!Object::borrowed(HandleType::Module, old)?.ptr_eq(&object));

        Ok(())
    }

    #[test]
    fn rebinding_onto_a_live_wrapper_fails() -> anyhow::Result<()> {
        let log = DisposalLog::default();
        let old = fake_handle();
        let taken = fake_handle();
        let object = Object::wrap(HandleType::Module, old, log.disposer("module"))?;
        let holder = Object::wrap(HandleType::Module, taken, log.disposer("holder"))?;

        assert!(matches!(
            object.rebind(taken),
            Err(Error::IdentityConflict {
                handle_type: "LLVMModuleRef",
                ..
            })
        ));

        // Both wrappers keep their handles and their cache entries.
        assert_eq!(object.raw()?, old);
        assert!(Object::borrowed(HandleType::Module, old)?.ptr_eq(&object));
        assert!(Object::borrowed(HandleType::Module, taken)?.ptr_eq(&holder));

        Ok(())
    }
}
