//! LLVM contexts, which own the types and constants used in a set of modules.

use std::ffi::c_uint;

use llvmc_errors::binding::Result;
use once_cell::sync::OnceCell;

use crate::{
    constant::DEFAULT_ADDRESS_SPACE,
    handle::{native_disposer, native_wrapper, HandleType, NativeWrapper, Object, RawPtr},
    ir::{
        borrowed_child,
        c_count,
        types::Type,
        values::{BasicBlock, Function},
    },
    library::prototype::LLVMBool,
    message::{to_c_string, CStrPtr},
};

/// The address of LLVM's global context, fetched once per process.
static GLOBAL_CONTEXT: OnceCell<usize> = OnceCell::new();

native_wrapper! {
    /// An `LLVMContextRef`.
    ///
    /// A context created with [`Context::new`] disposes of itself, and all of
    /// the types and constants within it, when it is dropped. The global
    /// context from [`Context::global`] lives for the whole process.
    pub struct Context(Context);
}

impl Context {
    /// Creates a new, independent context.
    ///
    /// # Errors
    ///
    /// - [`llvmc_errors::binding::Error`] if the library or its entry points are
    ///   unavailable.
    pub fn new() -> Result<Self> {
        let dispose = native!(LLVMContextDispose: fn(RawPtr));
        let create = native!(LLVMContextCreate: fn() -> RawPtr);
        let ptr = unsafe { create() };
        Object::wrap(HandleType::Context, ptr, native_disposer(dispose)).map(Self::from_object)
    }

    /// Gets LLVM's global context, which is never disposed and cannot be
    /// owned.
    ///
    /// # Errors
    ///
    /// - [`llvmc_errors::binding::Error`] if the library or its entry points are
    ///   unavailable.
    pub fn global() -> Result<Self> {
        Object::permanent(HandleType::Context, global_ptr()?).map(Self::from_object)
    }

    /// Gets the wrapper for a context pointer returned by LLVM, which the
    /// bindings do not dispose of.
    ///
    /// # Errors
    ///
    /// - [`llvmc_errors::binding::Error::InvalidHandle`] if `ptr` is null.
    pub fn from_raw(ptr: RawPtr) -> Result<Self> {
        if ptr == global_ptr()? {
            Self::global()
        } else {
            Object::borrowed(HandleType::Context, ptr).map(Self::from_object)
        }
    }

    /// Returns `true` if this is the global context.
    ///
    /// # Errors
    ///
    /// - [`llvmc_errors::binding::Error::UseAfterDispose`] if the context has
    ///   been disposed.
    pub fn is_global(&self) -> Result<bool> {
        Ok(self.raw()? == global_ptr()?)
    }

    /// Gets the integer type with the specified `bits`.
    ///
    /// # Errors
    ///
    /// - [`llvmc_errors::binding::Error`] if the native call cannot be made.
    pub fn int_type(&self, bits: u32) -> Result<Type> {
        let get = native!(LLVMIntTypeInContext: fn(RawPtr, c_uint) -> RawPtr);
        self.type_from(unsafe { get(self.raw()?, bits) })
    }

    /// Gets the `i1` type.
    ///
    /// # Errors
    ///
    /// - [`llvmc_errors::binding::Error`] if the native call cannot be made.
    pub fn bool_type(&self) -> Result<Type> {
        let get = native!(LLVMInt1TypeInContext: fn(RawPtr) -> RawPtr);
        self.type_from(unsafe { get(self.raw()?) })
    }

    /// Gets the `i8` type.
    ///
    /// # Errors
    ///
    /// - [`llvmc_errors::binding::Error`] if the native call cannot be made.
    pub fn i8_type(&self) -> Result<Type> {
        let get = native!(LLVMInt8TypeInContext: fn(RawPtr) -> RawPtr);
        self.type_from(unsafe { get(self.raw()?) })
    }

    /// Gets the `i16` type.
    ///
    /// # Errors
    ///
    /// - [`llvmc_errors::binding::Error`] if the native call cannot be made.
    pub fn i16_type(&self) -> Result<Type> {
        let get = native!(LLVMInt16TypeInContext: fn(RawPtr) -> RawPtr);
        self.type_from(unsafe { get(self.raw()?) })
    }

    /// Gets the `i32` type.
    ///
    /// # Errors
    ///
    /// - [`llvmc_errors::binding::Error`] if the native call cannot be made.
    pub fn i32_type(&self) -> Result<Type> {
        let get = native!(LLVMInt32TypeInContext: fn(RawPtr) -> RawPtr);
        self.type_from(unsafe { get(self.raw()?) })
    }

    /// Gets the `i64` type.
    ///
    /// # Errors
    ///
    /// - [`llvmc_errors::binding::Error`] if the native call cannot be made.
    pub fn i64_type(&self) -> Result<Type> {
        let get = native!(LLVMInt64TypeInContext: fn(RawPtr) -> RawPtr);
        self.type_from(unsafe { get(self.raw()?) })
    }

    /// Gets the 16-bit `half` type.
    ///
    /// # Errors
    ///
    /// - [`llvmc_errors::binding::Error`] if the native call cannot be made.
    pub fn half_type(&self) -> Result<Type> {
        let get = native!(LLVMHalfTypeInContext: fn(RawPtr) -> RawPtr);
        self.type_from(unsafe { get(self.raw()?) })
    }

    /// Gets the 32-bit `float` type.
    ///
    /// # Errors
    ///
    /// - [`llvmc_errors::binding::Error`] if the native call cannot be made.
    pub fn float_type(&self) -> Result<Type> {
        let get = native!(LLVMFloatTypeInContext: fn(RawPtr) -> RawPtr);
        self.type_from(unsafe { get(self.raw()?) })
    }

    /// Gets the 64-bit `double` type.
    ///
    /// # Errors
    ///
    /// - [`llvmc_errors::binding::Error`] if the native call cannot be made.
    pub fn double_type(&self) -> Result<Type> {
        let get = native!(LLVMDoubleTypeInContext: fn(RawPtr) -> RawPtr);
        self.type_from(unsafe { get(self.raw()?) })
    }

    /// Gets the `void` type.
    ///
    /// # Errors
    ///
    /// - [`llvmc_errors::binding::Error`] if the native call cannot be made.
    pub fn void_type(&self) -> Result<Type> {
        let get = native!(LLVMVoidTypeInContext: fn(RawPtr) -> RawPtr);
        self.type_from(unsafe { get(self.raw()?) })
    }

    /// Gets the `label` type.
    ///
    /// # Errors
    ///
    /// - [`llvmc_errors::binding::Error`] if the native call cannot be made.
    pub fn label_type(&self) -> Result<Type> {
        let get = native!(LLVMLabelTypeInContext: fn(RawPtr) -> RawPtr);
        self.type_from(unsafe { get(self.raw()?) })
    }

    /// Gets the opaque pointer type in `address_space`.
    ///
    /// # Errors
    ///
    /// - [`llvmc_errors::binding::Error`] if the native call cannot be made.
    pub fn pointer_type(&self, address_space: u32) -> Result<Type> {
        let get = native!(LLVMPointerTypeInContext: fn(RawPtr, c_uint) -> RawPtr);
        self.type_from(unsafe { get(self.raw()?, address_space) })
    }

    /// Gets the opaque pointer type in the default address space.
    ///
    /// # Errors
    ///
    /// - [`llvmc_errors::binding::Error`] if the native call cannot be made.
    pub fn ptr_type(&self) -> Result<Type> {
        self.pointer_type(DEFAULT_ADDRESS_SPACE)
    }

    /// Gets the literal struct type with the given `elements`.
    ///
    /// # Errors
    ///
    /// - [`llvmc_errors::binding::Error`] if the native call cannot be made.
    pub fn struct_type(&self, elements: &[Type], packed: bool) -> Result<Type> {
        let get = native!(LLVMStructTypeInContext: fn(RawPtr, *mut RawPtr, c_uint, LLVMBool) -> RawPtr);
        let mut raw = elements.iter().map(Type::raw).collect::<Result<Vec<_>>>()?;
        let count = c_count(raw.len())?;
        self.type_from(unsafe { get(self.raw()?, raw.as_mut_ptr(), count, packed.into()) })
    }

    /// Creates a new, opaque, named struct type.
    ///
    /// # Errors
    ///
    /// - [`llvmc_errors::binding::Error`] if the native call cannot be made.
    pub fn named_struct(&self, name: &str) -> Result<Type> {
        let create = native!(LLVMStructCreateNamed: fn(RawPtr, CStrPtr) -> RawPtr);
        let name = to_c_string(name)?;
        self.type_from(unsafe { create(self.raw()?, name.as_ptr()) })
    }

    /// Appends a new basic block called `name` to the end of `function`.
    ///
    /// # Errors
    ///
    /// - [`llvmc_errors::binding::Error`] if the native call cannot be made.
    pub fn append_basic_block(&self, function: &Function, name: &str) -> Result<BasicBlock> {
        let append = native!(LLVMAppendBasicBlockInContext: fn(RawPtr, RawPtr, CStrPtr) -> RawPtr);
        let name = to_c_string(name)?;
        let ptr = unsafe { append(self.raw()?, function.raw()?, name.as_ptr()) };
        borrowed_child(ptr, function.object())
    }

    fn type_from(&self, ptr: RawPtr) -> Result<Type> {
        Type::from_raw(ptr, self)
    }
}

/// Gets the address of the global context.
fn global_ptr() -> Result<RawPtr> {
    let address = GLOBAL_CONTEXT.get_or_try_init(|| -> Result<usize> {
        let get = native!(LLVMGetGlobalContext: fn() -> RawPtr);
        Ok(unsafe { get() } as usize)
    })?;
    Ok(*address as RawPtr)
}
