//! Pass management, through both the legacy pass managers and the new pass
//! manager's textual pipelines.
//!
//! The legacy managers can no longer be populated with passes through the C
//! API in recent LLVM versions, but running them still performs verification
//! and any analyses they were set up with. New code should prefer
//! [`crate::ir::module::Module::run_passes`].

use llvmc_errors::binding::Result;

use crate::{
    handle::{native_disposer, native_wrapper, HandleType, NativeWrapper, Object, RawPtr},
    ir::{module::Module, values::Function},
    library::prototype::LLVMBool,
};

/// The name of the reference from a function pass manager to its module.
const MODULE_REF: &str = "module";

native_wrapper! {
    /// A legacy module pass manager.
    pub struct PassManager(PassManager);
}

impl PassManager {
    /// Creates an empty module pass manager.
    ///
    /// # Errors
    ///
    /// - [`llvmc_errors::binding::Error`] if the library is unavailable.
    pub fn new() -> Result<Self> {
        let dispose = native!(LLVMDisposePassManager: fn(RawPtr));
        let create = native!(LLVMCreatePassManager: fn() -> RawPtr);
        let ptr = unsafe { create() };
        Object::wrap(HandleType::PassManager, ptr, native_disposer(dispose)).map(Self::from_object)
    }

    /// Runs the manager over `module`, returning `true` if it was modified.
    ///
    /// # Errors
    ///
    /// - [`llvmc_errors::binding::Error::UseAfterDispose`] if either object is
    ///   stale.
    pub fn run(&self, module: &Module) -> Result<bool> {
        let run = native!(LLVMRunPassManager: fn(RawPtr, RawPtr) -> LLVMBool);
        Ok(unsafe { run(self.raw()?, module.raw()?) }.into())
    }
}

native_wrapper! {
    /// A legacy function pass manager, bound to a single module.
    pub struct FunctionPassManager(PassManager);
}

impl FunctionPassManager {
    /// Creates a function pass manager for the functions of `module`.
    ///
    /// # Errors
    ///
    /// - [`llvmc_errors::binding::Error::UseAfterDispose`] if the module is
    ///   stale.
    pub fn new(module: &Module) -> Result<Self> {
        let dispose = native!(LLVMDisposePassManager: fn(RawPtr));
        let create = native!(LLVMCreateFunctionPassManagerForModule: fn(RawPtr) -> RawPtr);
        let ptr = unsafe { create(module.raw()?) };
        let object = Object::wrap(HandleType::PassManager, ptr, native_disposer(dispose))?;
        object.set_ref(MODULE_REF, module.object());
        Ok(Self::from_object(object))
    }

    /// Initializes the manager, returning `true` if the module was modified.
    ///
    /// # Errors
    ///
    /// - [`llvmc_errors::binding::Error::UseAfterDispose`] if the manager is
    ///   stale.
    pub fn initialize(&self) -> Result<bool> {
        let init = native!(LLVMInitializeFunctionPassManager: fn(RawPtr) -> LLVMBool);
        Ok(unsafe { init(self.raw()?) }.into())
    }

    /// Runs the manager over `function`, returning `true` if it was modified.
    ///
    /// # Errors
    ///
    /// - [`llvmc_errors::binding::Error::UseAfterDispose`] if either object is
    ///   stale.
    pub fn run(&self, function: &Function) -> Result<bool> {
        let run = native!(LLVMRunFunctionPassManager: fn(RawPtr, RawPtr) -> LLVMBool);
        Ok(unsafe { run(self.raw()?, function.raw()?) }.into())
    }

    /// Finalizes the manager, returning `true` if the module was modified.
    ///
    /// # Errors
    ///
    /// - [`llvmc_errors::binding::Error::UseAfterDispose`] if the manager is
    ///   stale.
    pub fn finalize(&self) -> Result<bool> {
        let finalize = native!(LLVMFinalizeFunctionPassManager: fn(RawPtr) -> LLVMBool);
        Ok(unsafe { finalize(self.raw()?) }.into())
    }
}

native_wrapper! {
    /// Options for running a new pass manager pipeline.
    pub struct PassBuilderOptions(PassBuilderOptions);
}

/// Generates the boolean option setters on [`PassBuilderOptions`].
macro_rules! options {
    ($($(#[$meta:meta])* $method:ident => $symbol:ident;)*) => {
        $(
            $(#[$meta])*
            ///
            /// # Errors
            ///
            /// - [`llvmc_errors::binding::Error::UseAfterDispose`] if the options
            ///   are stale.
            pub fn $method(&self, enabled: bool) -> Result<&Self> {
                let set = native!($symbol: fn(RawPtr, LLVMBool));
                unsafe { set(self.raw()?, enabled.into()) };
                Ok(self)
            }
        )*
    };
}

impl PassBuilderOptions {
    /// Creates the default options.
    ///
    /// # Errors
    ///
    /// - [`llvmc_errors::binding::Error`] if the library is unavailable.
    pub fn new() -> Result<Self> {
        let dispose = native!(LLVMDisposePassBuilderOptions: fn(RawPtr));
        let create = native!(LLVMCreatePassBuilderOptions: fn() -> RawPtr);
        let ptr = unsafe { create() };
        Object::wrap(HandleType::PassBuilderOptions, ptr, native_disposer(dispose))
            .map(Self::from_object)
    }

    options! {
        /// Runs the verifier after every pass.
        set_verify_each => LLVMPassBuilderOptionsSetVerifyEach;
        /// Prints each pass as it runs.
        set_debug_logging => LLVMPassBuilderOptionsSetDebugLogging;
        /// Enables loop interleaving.
        set_loop_interleaving => LLVMPassBuilderOptionsSetLoopInterleaving;
        /// Enables loop vectorization.
        set_loop_vectorization => LLVMPassBuilderOptionsSetLoopVectorization;
        /// Enables SLP vectorization.
        set_slp_vectorization => LLVMPassBuilderOptionsSetSLPVectorization;
        /// Enables loop unrolling.
        set_loop_unrolling => LLVMPassBuilderOptionsSetLoopUnrolling;
        /// Enables function merging.
        set_merge_functions => LLVMPassBuilderOptionsSetMergeFunctions;
    }
}
