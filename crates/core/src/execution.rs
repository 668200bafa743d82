//! Execution engines, for running IR in-process through either MCJIT or the
//! interpreter.
//!
//! An execution engine takes over the modules that it is given, and frees
//! them itself when it is disposed. Removing a module hands it back.

use std::{
    ffi::{c_int, c_uint, CString},
    ptr,
};

use llvmc_errors::binding::{Error, Result};
use once_cell::sync::OnceCell;
use tracing::{debug, warn};

use crate::{
    handle::{
        identity,
        native_disposer,
        native_wrapper,
        HandleType,
        NativeWrapper,
        Object,
        RawHandle,
        RawPtr,
    },
    ir::{
        borrowed_child,
        c_count,
        module::Module,
        types::Type,
        values::{Function, GlobalValue},
    },
    library::prototype::LLVMBool,
    message::{native_error, to_c_string, CStrPtr, OwnedCStrPtr},
    target::{initialize_native_target, TargetData},
};

static MCJIT_LINKED: OnceCell<()> = OnceCell::new();
static INTERPRETER_LINKED: OnceCell<()> = OnceCell::new();

/// Links in MCJIT and initializes the host target, once per process.
fn prepare_jit() -> Result<()> {
    MCJIT_LINKED
        .get_or_try_init(|| {
            let link = native!(LLVMLinkInMCJIT: fn());
            unsafe { link() };
            initialize_native_target()
        })
        .copied()
}

/// Links in the interpreter, once per process.
fn prepare_interpreter() -> Result<()> {
    INTERPRETER_LINKED
        .get_or_try_init(|| {
            let link = native!(LLVMLinkInInterpreter: fn());
            unsafe { link() };
            Ok(())
        })
        .copied()
}

/// The signature shared by the entry points that create an engine for a
/// module.
type CreateForModule = unsafe extern "C" fn(*mut RawPtr, RawPtr, *mut OwnedCStrPtr) -> LLVMBool;

native_wrapper! {
    /// An `LLVMExecutionEngineRef`.
    pub struct ExecutionEngine(ExecutionEngine);
}

impl ExecutionEngine {
    /// Creates the best available engine for `module`, preferring MCJIT and
    /// falling back to the interpreter.
    ///
    /// # Errors
    ///
    /// - [`Error::NativeOperation`] if LLVM cannot create an engine.
    /// - [`Error::DoubleOwnership`] if `module` is already owned.
    pub fn new(module: &Module) -> Result<Self> {
        prepare_interpreter()?;
        if let Err(error) = prepare_jit() {
            debug!(%error, "MCJIT is unavailable, engine creation may fall back to the interpreter");
        }
        let create = native!(LLVMCreateExecutionEngineForModule: fn(*mut RawPtr, RawPtr, *mut OwnedCStrPtr) -> LLVMBool);
        Self::create(module, |engine, module, message| unsafe { create(engine, module, message) })
    }

    /// Creates an interpreter for `module`.
    ///
    /// # Errors
    ///
    /// See [`Self::new`].
    pub fn interpreter(module: &Module) -> Result<Self> {
        prepare_interpreter()?;
        let create = native!(LLVMCreateInterpreterForModule: fn(*mut RawPtr, RawPtr, *mut OwnedCStrPtr) -> LLVMBool);
        Self::create(module, |engine, module, message| unsafe { create(engine, module, message) })
    }

    /// Creates an MCJIT compiler for `module` at optimization level
    /// `opt_level` (0 to 3).
    ///
    /// # Errors
    ///
    /// - [`Error::NativeOperation`] if the host target is unavailable or LLVM
    ///   cannot create the engine.
    /// - [`Error::DoubleOwnership`] if `module` is already owned.
    pub fn jit(module: &Module, opt_level: u32) -> Result<Self> {
        prepare_jit()?;
        let create = native!(LLVMCreateJITCompilerForModule: fn(*mut RawPtr, RawPtr, c_uint, *mut OwnedCStrPtr) -> LLVMBool);
        Self::create(module, |engine, module, message| unsafe {
            create(engine, module, opt_level, message)
        })
    }

    fn create(
        module: &Module,
        create: impl FnOnce(*mut RawPtr, RawPtr, *mut OwnedCStrPtr) -> LLVMBool,
    ) -> Result<Self> {
        let dispose = native!(LLVMDisposeExecutionEngine: fn(RawPtr));
        if !module.object().is_self_owned() {
            return Err(Error::DoubleOwnership {
                handle_type: HandleType::Module.c_name(),
            });
        }

        let mut engine = ptr::null_mut();
        let mut message = ptr::null_mut();
        if create(&mut engine, module.raw()?, &mut message).is_true() {
            return Err(unsafe { native_error(message) });
        }

        let object = Object::wrap(HandleType::ExecutionEngine, engine, native_disposer(dispose))?;
        object.take_native_ownership(module.object())?;
        Ok(Self::from_object(object))
    }

    /// Adds `module` to the engine, which takes ownership of it.
    ///
    /// # Errors
    ///
    /// - [`Error::DoubleOwnership`] if `module` is already owned.
    pub fn add_module(&self, module: &Module) -> Result<()> {
        let add = native!(LLVMAddModule: fn(RawPtr, RawPtr));
        if !module.object().is_self_owned() {
            return Err(Error::DoubleOwnership {
                handle_type: HandleType::Module.c_name(),
            });
        }
        unsafe { add(self.raw()?, module.raw()?) };
        self.object.take_native_ownership(module.object())
    }

    /// Removes `module` from the engine, handing ownership of it back to the
    /// caller.
    ///
    /// # Errors
    ///
    /// - [`Error::NotOwned`] if the engine does not own `module`.
    /// - [`Error::NativeOperation`] if LLVM fails to remove it.
    pub fn remove_module(&self, module: &Module) -> Result<()> {
        let remove = native!(LLVMRemoveModule: fn(RawPtr, RawPtr, *mut RawPtr, *mut OwnedCStrPtr) -> LLVMBool);
        if !self.object.owns(module.object()) {
            return Err(Error::NotOwned {
                handle_type: HandleType::Module.c_name(),
            });
        }

        let mut removed = ptr::null_mut();
        let mut message = ptr::null_mut();
        if unsafe { remove(self.raw()?, module.raw()?, &mut removed, &mut message) }.is_true() {
            return Err(unsafe { native_error(message) });
        }

        if removed != module.raw()? {
            warn!(
                expected = module.object().address(),
                actual = removed as usize,
                "Execution engine returned a different module handle on removal"
            );
            module.object().rebind(removed)?;
        }
        self.object.release_ownership(module.object())
    }

    /// Finds the function called `name` in any of the engine's modules.
    ///
    /// # Errors
    ///
    /// - [`Error::InteriorNul`] if `name` contains a NUL byte.
    pub fn find_function(&self, name: &str) -> Result<Option<Function>> {
        let find = native!(LLVMFindFunction: fn(RawPtr, CStrPtr, *mut RawPtr) -> LLVMBool);
        let name = to_c_string(name)?;
        let mut function = ptr::null_mut();
        if unsafe { find(self.raw()?, name.as_ptr(), &mut function) }.is_true() {
            return Ok(None);
        }

        // The function lives in one of our modules, and must not outlive it
        // if that module is later removed from the engine.
        let parent = native!(LLVMGetGlobalParent: fn(RawPtr) -> RawPtr);
        let module = RawHandle::new(unsafe { parent(function) })
            .and_then(|module| identity::lookup(HandleType::Module, module))
            .unwrap_or_else(|| self.object.clone());
        borrowed_child(function, &module).map(Some)
    }

    /// Runs `function` with `args`, returning its result.
    ///
    /// # Errors
    ///
    /// - [`Error::UseAfterDispose`] if any of the objects are stale.
    pub fn run_function(&self, function: &Function, args: &[GenericValue]) -> Result<GenericValue> {
        let run = native!(LLVMRunFunction: fn(RawPtr, RawPtr, c_uint, *mut RawPtr) -> RawPtr);
        let mut raw_args = args.iter().map(NativeWrapper::raw).collect::<Result<Vec<_>>>()?;
        let count = c_count(raw_args.len())?;
        let result = unsafe { run(self.raw()?, function.raw()?, count, raw_args.as_mut_ptr()) };
        GenericValue::from_new(result)
    }

    /// Runs `function` as a `main` function, passing `argv` and `envp`, and
    /// returns its exit code.
    ///
    /// # Errors
    ///
    /// - [`Error::InteriorNul`] if any argument contains a NUL byte.
    pub fn run_function_as_main(&self, function: &Function, argv: &[&str], envp: &[&str]) -> Result<i32> {
        let run = native!(LLVMRunFunctionAsMain: fn(RawPtr, RawPtr, c_uint, *const CStrPtr, *const CStrPtr) -> c_int);
        let argv = argv.iter().map(|a| to_c_string(a)).collect::<Result<Vec<CString>>>()?;
        let envp = envp.iter().map(|e| to_c_string(e)).collect::<Result<Vec<CString>>>()?;
        let argv_ptrs: Vec<CStrPtr> = argv.iter().map(|a| a.as_ptr()).collect();
        let envp_ptrs: Vec<CStrPtr> = envp
            .iter()
            .map(|e| e.as_ptr())
            .chain(std::iter::once(ptr::null()))
            .collect();

        let argc = c_count(argv_ptrs.len())?;
        Ok(unsafe {
            run(
                self.raw()?,
                function.raw()?,
                argc,
                argv_ptrs.as_ptr(),
                envp_ptrs.as_ptr(),
            )
        })
    }

    /// Runs the static constructors of the engine's modules.
    ///
    /// # Errors
    ///
    /// - [`Error::UseAfterDispose`] if the engine is stale.
    pub fn run_static_constructors(&self) -> Result<()> {
        let run = native!(LLVMRunStaticConstructors: fn(RawPtr));
        unsafe { run(self.raw()?) };
        Ok(())
    }

    /// Runs the static destructors of the engine's modules.
    ///
    /// # Errors
    ///
    /// - [`Error::UseAfterDispose`] if the engine is stale.
    pub fn run_static_destructors(&self) -> Result<()> {
        let run = native!(LLVMRunStaticDestructors: fn(RawPtr));
        unsafe { run(self.raw()?) };
        Ok(())
    }

    /// Gets the address of `global` in the engine, emitting it if needed.
    ///
    /// # Errors
    ///
    /// - [`Error::UseAfterDispose`] if either object is stale.
    pub fn pointer_to_global(&self, global: &impl GlobalValue) -> Result<RawPtr> {
        let get = native!(LLVMGetPointerToGlobal: fn(RawPtr, RawPtr) -> RawPtr);
        Ok(unsafe { get(self.raw()?, global.raw()?) })
    }

    /// Maps `global` to the host memory at `address`.
    ///
    /// # Errors
    ///
    /// - [`Error::UseAfterDispose`] if either object is stale.
    pub fn add_global_mapping(&self, global: &impl GlobalValue, address: RawPtr) -> Result<()> {
        let add = native!(LLVMAddGlobalMapping: fn(RawPtr, RawPtr, RawPtr));
        unsafe { add(self.raw()?, global.raw()?, address) };
        Ok(())
    }

    /// Gets the address of the compiled function called `name`, or zero if
    /// there is none.
    ///
    /// # Errors
    ///
    /// - [`Error::InteriorNul`] if `name` contains a NUL byte.
    pub fn function_address(&self, name: &str) -> Result<u64> {
        let get = native!(LLVMGetFunctionAddress: fn(RawPtr, CStrPtr) -> u64);
        let name = to_c_string(name)?;
        Ok(unsafe { get(self.raw()?, name.as_ptr()) })
    }

    /// Gets the address of the global value called `name`, or zero if there
    /// is none.
    ///
    /// # Errors
    ///
    /// - [`Error::InteriorNul`] if `name` contains a NUL byte.
    pub fn global_value_address(&self, name: &str) -> Result<u64> {
        let get = native!(LLVMGetGlobalValueAddress: fn(RawPtr, CStrPtr) -> u64);
        let name = to_c_string(name)?;
        Ok(unsafe { get(self.raw()?, name.as_ptr()) })
    }

    /// Gets the data layout used by the engine.
    ///
    /// The result belongs to the engine, and keeps it alive.
    ///
    /// # Errors
    ///
    /// - [`Error::UseAfterDispose`] if the engine is stale.
    pub fn target_data(&self) -> Result<TargetData> {
        let get = native!(LLVMGetExecutionEngineTargetData: fn(RawPtr) -> RawPtr);
        borrowed_child(unsafe { get(self.raw()?) }, &self.object)
    }
}

native_wrapper! {
    /// An `LLVMGenericValueRef`, used to pass arguments to and results from
    /// functions run by an [`ExecutionEngine`].
    pub struct GenericValue(GenericValue);
}

impl GenericValue {
    fn from_new(ptr: RawPtr) -> Result<Self> {
        let dispose = native!(LLVMDisposeGenericValue: fn(RawPtr));
        Object::wrap(HandleType::GenericValue, ptr, native_disposer(dispose)).map(Self::from_object)
    }

    /// Creates an integer of type `ty`.
    ///
    /// # Errors
    ///
    /// - [`Error::UseAfterDispose`] if `ty` is stale.
    pub fn of_int(ty: &Type, value: u64, signed: bool) -> Result<Self> {
        let create = native!(LLVMCreateGenericValueOfInt: fn(RawPtr, u64, LLVMBool) -> RawPtr);
        Self::from_new(unsafe { create(ty.raw()?, value, signed.into()) })
    }

    /// Creates a floating-point value of type `ty`.
    ///
    /// # Errors
    ///
    /// - [`Error::UseAfterDispose`] if `ty` is stale.
    pub fn of_float(ty: &Type, value: f64) -> Result<Self> {
        let create = native!(LLVMCreateGenericValueOfFloat: fn(RawPtr, f64) -> RawPtr);
        Self::from_new(unsafe { create(ty.raw()?, value) })
    }

    /// Creates a pointer value.
    ///
    /// # Errors
    ///
    /// - [`Error`] if the library is unavailable.
    pub fn of_pointer(pointer: RawPtr) -> Result<Self> {
        let create = native!(LLVMCreateGenericValueOfPointer: fn(RawPtr) -> RawPtr);
        Self::from_new(unsafe { create(pointer) })
    }

    /// Gets the width in bits of an integer value.
    ///
    /// # Errors
    ///
    /// - [`Error::UseAfterDispose`] if the value is stale.
    pub fn int_width(&self) -> Result<u32> {
        let get = native!(LLVMGenericValueIntWidth: fn(RawPtr) -> c_uint);
        Ok(unsafe { get(self.raw()?) })
    }

    /// Reads an integer value, sign-extending it if `signed`.
    ///
    /// # Errors
    ///
    /// - [`Error::UseAfterDispose`] if the value is stale.
    pub fn to_int(&self, signed: bool) -> Result<u64> {
        let get = native!(LLVMGenericValueToInt: fn(RawPtr, LLVMBool) -> u64);
        Ok(unsafe { get(self.raw()?, signed.into()) })
    }

    /// Reads a floating-point value of type `ty`.
    ///
    /// # Errors
    ///
    /// - [`Error::UseAfterDispose`] if either object is stale.
    pub fn to_float(&self, ty: &Type) -> Result<f64> {
        let get = native!(LLVMGenericValueToFloat: fn(RawPtr, RawPtr) -> f64);
        Ok(unsafe { get(ty.raw()?, self.raw()?) })
    }

    /// Reads a pointer value.
    ///
    /// # Errors
    ///
    /// - [`Error::UseAfterDispose`] if the value is stale.
    pub fn to_pointer(&self) -> Result<RawPtr> {
        let get = native!(LLVMGenericValueToPointer: fn(RawPtr) -> RawPtr);
        Ok(unsafe { get(self.raw()?) })
    }
}
