//! LLVM modules, the unit of IR that is parsed, optimized and executed.

use std::{ffi::c_int, path::Path, ptr};

use llvmc_errors::binding::{Error, Result};
use tracing::debug;

use crate::{
    constant::VERIFIER_RETURN_STATUS,
    handle::{native_disposer, native_wrapper, HandleType, NativeWrapper, Object, RawPtr},
    ir::{
        borrowed_child,
        borrowed_child_nullable,
        context::Context,
        memory_buffer::MemoryBuffer,
        types::Type,
        values::{Function, GlobalVariable},
        NativeList,
    },
    library::prototype::LLVMBool,
    message::{
        copy_c_str,
        copy_c_str_with_len,
        native_error,
        take_message,
        to_c_string,
        CStrPtr,
        OwnedCStrPtr,
    },
    pass::PassBuilderOptions,
    target::TargetData,
};

/// The name of the reference from a module to its context.
const CONTEXT_REF: &str = "context";

native_wrapper! {
    /// An `LLVMModuleRef`.
    ///
    /// A module disposes of itself when dropped unless it has been handed to
    /// an owner, such as an [`crate::execution::ExecutionEngine`].
    pub struct Module(Module);
}

impl Module {
    fn from_new(ptr: RawPtr, context: &Context) -> Result<Self> {
        let dispose = native!(LLVMDisposeModule: fn(RawPtr));
        let object = Object::wrap(HandleType::Module, ptr, native_disposer(dispose))?;
        object.set_ref(CONTEXT_REF, context.object());
        Ok(Self::from_object(object))
    }

    /// Creates an empty module called `name` in `context`.
    ///
    /// # Errors
    ///
    /// - [`Error::InteriorNul`] if `name` contains a NUL byte.
    pub fn new(name: &str, context: &Context) -> Result<Self> {
        let create = native!(LLVMModuleCreateWithNameInContext: fn(CStrPtr, RawPtr) -> RawPtr);
        let name = to_c_string(name)?;
        let ptr = unsafe { create(name.as_ptr(), context.raw()?) };
        Self::from_new(ptr, context)
    }

    /// Parses the bitcode in `buffer` eagerly. The buffer remains with the
    /// caller.
    ///
    /// # Errors
    ///
    /// - [`Error::NativeOperation`] if the bitcode is invalid.
    pub fn parse_bitcode(buffer: &MemoryBuffer, context: &Context) -> Result<Self> {
        let parse = native!(LLVMParseBitcodeInContext2: fn(RawPtr, RawPtr, *mut RawPtr) -> LLVMBool);
        let mut module = ptr::null_mut();
        let failed = unsafe { parse(context.raw()?, buffer.raw()?, &mut module) };
        if failed.is_true() {
            return Err(Error::NativeOperation("Failed to parse bitcode".to_string()));
        }
        Self::from_new(module, context)
    }

    /// Parses the bitcode in `buffer` lazily, materializing function bodies
    /// on demand. The module takes ownership of the buffer.
    ///
    /// # Errors
    ///
    /// - [`Error::NativeOperation`] if the bitcode is invalid.
    /// - [`Error::DoubleOwnership`] if the buffer already has an owner.
    pub fn parse_bitcode_lazily(buffer: &MemoryBuffer, context: &Context) -> Result<Self> {
        if !buffer.object().is_self_owned() {
            return Err(Error::DoubleOwnership {
                handle_type: HandleType::MemoryBuffer.c_name(),
            });
        }

        let parse = native!(LLVMGetBitcodeModuleInContext2: fn(RawPtr, RawPtr, *mut RawPtr) -> LLVMBool);
        let mut module = ptr::null_mut();
        let failed = unsafe { parse(context.raw()?, buffer.raw()?, &mut module) };
        if failed.is_true() {
            return Err(Error::NativeOperation("Failed to parse bitcode".to_string()));
        }

        let module = Self::from_new(module, context)?;
        module.object().take_native_ownership(buffer.object())?;
        Ok(module)
    }

    /// Parses the textual IR in `buffer`.
    ///
    /// LLVM consumes the buffer whether or not parsing succeeds, so `buffer`
    /// is disposed afterwards.
    ///
    /// # Errors
    ///
    /// - [`Error::NativeOperation`] with the parser's diagnostic if the IR is
    ///   invalid.
    pub fn parse_ir(buffer: &MemoryBuffer, context: &Context) -> Result<Self> {
        let parse = native!(LLVMParseIRInContext: fn(RawPtr, RawPtr, *mut RawPtr, *mut OwnedCStrPtr) -> LLVMBool);
        let context_ptr = context.raw()?;
        let buffer_ptr = buffer.object().surrender()?;

        let mut module = ptr::null_mut();
        let mut message = ptr::null_mut();
        let failed = unsafe { parse(context_ptr, buffer_ptr, &mut module, &mut message) };
        if failed.is_true() {
            return Err(unsafe { native_error(message) });
        }
        Self::from_new(module, context)
    }

    /// Parses the textual IR in `text`, naming the module `name`.
    ///
    /// # Errors
    ///
    /// See [`Self::parse_ir`].
    pub fn parse_ir_str(name: &str, text: &str, context: &Context) -> Result<Self> {
        let buffer = MemoryBuffer::from_bytes(name, text.as_bytes())?;
        Self::parse_ir(&buffer, context)
    }

    /// Reads and parses the bitcode file at `path`.
    ///
    /// # Errors
    ///
    /// - [`Error::NativeOperation`] if the file cannot be read or parsed.
    pub fn from_bitcode_file(path: impl AsRef<Path>, context: &Context) -> Result<Self> {
        let buffer = MemoryBuffer::from_file(path)?;
        Self::parse_bitcode(&buffer, context)
    }

    /// Gets the name of the module.
    ///
    /// # Errors
    ///
    /// - [`Error::CStrConversion`] if the name is not valid UTF-8.
    pub fn name(&self) -> Result<String> {
        let get = native!(LLVMGetModuleIdentifier: fn(RawPtr, *mut usize) -> CStrPtr);
        let mut len = 0usize;
        let name = unsafe { get(self.raw()?, &mut len) };
        unsafe { copy_c_str_with_len(name, len) }
    }

    /// Sets the name of the module.
    ///
    /// # Errors
    ///
    /// - [`Error::InteriorNul`] if `name` contains a NUL byte.
    pub fn set_name(&self, name: &str) -> Result<()> {
        let set = native!(LLVMSetModuleIdentifier: fn(RawPtr, CStrPtr, usize));
        let c_name = to_c_string(name)?;
        unsafe { set(self.raw()?, c_name.as_ptr(), name.len()) };
        Ok(())
    }

    /// Gets the target triple of the module.
    ///
    /// # Errors
    ///
    /// - [`Error::CStrConversion`] if the triple is not valid UTF-8.
    pub fn target(&self) -> Result<String> {
        let get = native!(LLVMGetTarget: fn(RawPtr) -> CStrPtr);
        unsafe { copy_c_str(get(self.raw()?)) }
    }

    /// Sets the target triple of the module.
    ///
    /// # Errors
    ///
    /// - [`Error::InteriorNul`] if `triple` contains a NUL byte.
    pub fn set_target(&self, triple: &str) -> Result<()> {
        let set = native!(LLVMSetTarget: fn(RawPtr, CStrPtr));
        let triple = to_c_string(triple)?;
        unsafe { set(self.raw()?, triple.as_ptr()) };
        Ok(())
    }

    /// Gets the data layout string of the module.
    ///
    /// # Errors
    ///
    /// - [`Error::CStrConversion`] if the layout is not valid UTF-8.
    pub fn data_layout(&self) -> Result<String> {
        let get = native!(LLVMGetDataLayoutStr: fn(RawPtr) -> CStrPtr);
        unsafe { copy_c_str(get(self.raw()?)) }
    }

    /// Sets the data layout string of the module.
    ///
    /// # Errors
    ///
    /// - [`Error::InteriorNul`] if `layout` contains a NUL byte.
    pub fn set_data_layout(&self, layout: &str) -> Result<()> {
        let set = native!(LLVMSetDataLayout: fn(RawPtr, CStrPtr));
        let layout = to_c_string(layout)?;
        unsafe { set(self.raw()?, layout.as_ptr()) };
        Ok(())
    }

    /// Gets the parsed data layout of the module.
    ///
    /// The result belongs to the module, and keeps it alive.
    ///
    /// # Errors
    ///
    /// - [`Error::UseAfterDispose`] if the module is stale.
    pub fn target_data(&self) -> Result<TargetData> {
        let get = native!(LLVMGetModuleDataLayout: fn(RawPtr) -> RawPtr);
        borrowed_child(unsafe { get(self.raw()?) }, &self.object)
    }

    /// Gets the context of the module.
    ///
    /// # Errors
    ///
    /// - [`Error::UseAfterDispose`] if the module is stale.
    pub fn context(&self) -> Result<Context> {
        let get = native!(LLVMGetModuleContext: fn(RawPtr) -> RawPtr);
        Context::from_raw(unsafe { get(self.raw()?) })
    }

    /// Renders the module as textual IR.
    ///
    /// # Errors
    ///
    /// - [`Error::CStrConversion`] if the text is not valid UTF-8.
    pub fn print_to_string(&self) -> Result<String> {
        let print = native!(LLVMPrintModuleToString: fn(RawPtr) -> OwnedCStrPtr);
        unsafe { take_message(print(self.raw()?)) }
    }

    /// Prints the module to standard error.
    ///
    /// # Errors
    ///
    /// - [`Error::UseAfterDispose`] if the module is stale.
    pub fn dump(&self) -> Result<()> {
        let dump = native!(LLVMDumpModule: fn(RawPtr));
        unsafe { dump(self.raw()?) };
        Ok(())
    }

    /// Checks that the module is well formed.
    ///
    /// # Errors
    ///
    /// - [`Error::NativeOperation`] with the verifier's report if it is not.
    pub fn verify(&self) -> Result<()> {
        let verify = native!(LLVMVerifyModule: fn(RawPtr, c_int, *mut OwnedCStrPtr) -> LLVMBool);
        let mut message = ptr::null_mut();
        let failed = unsafe { verify(self.raw()?, VERIFIER_RETURN_STATUS, &mut message) };
        if failed.is_true() {
            return Err(unsafe { native_error(message) });
        }

        // The verifier allocates an empty message even on success.
        unsafe { take_message(message) }?;
        Ok(())
    }

    /// Writes the module as bitcode to the file at `path`.
    ///
    /// # Errors
    ///
    /// - [`Error::NativeOperation`] if the file cannot be written.
    pub fn write_bitcode_to_file(&self, path: impl AsRef<Path>) -> Result<()> {
        let write = native!(LLVMWriteBitcodeToFile: fn(RawPtr, CStrPtr) -> c_int);
        let display = path.as_ref().display().to_string();
        let c_path = to_c_string(&display)?;
        let status = unsafe { write(self.raw()?, c_path.as_ptr()) };
        if status == 0 {
            Ok(())
        } else {
            Err(Error::NativeOperation(format!("Failed to write bitcode to {display}")))
        }
    }

    /// Serializes the module to bitcode.
    ///
    /// # Errors
    ///
    /// - [`Error::UseAfterDispose`] if the module is stale.
    pub fn to_bitcode(&self) -> Result<Vec<u8>> {
        let dispose = native!(LLVMDisposeMemoryBuffer: fn(RawPtr));
        let write = native!(LLVMWriteBitcodeToMemoryBuffer: fn(RawPtr) -> RawPtr);
        let ptr = unsafe { write(self.raw()?) };
        let buffer = MemoryBuffer::from_object(Object::wrap(
            HandleType::MemoryBuffer,
            ptr,
            native_disposer(dispose),
        )?);
        buffer.to_bytes()
    }

    /// Creates an independent copy of the module in the same context.
    ///
    /// # Errors
    ///
    /// - [`Error::UseAfterDispose`] if the module is stale.
    pub fn clone_module(&self) -> Result<Self> {
        let clone = native!(LLVMCloneModule: fn(RawPtr) -> RawPtr);
        let ptr = unsafe { clone(self.raw()?) };
        Self::from_new(ptr, &self.context()?)
    }

    /// Adds a function called `name` with type `function_type`.
    ///
    /// # Errors
    ///
    /// - [`Error::UnexpectedKind`] if `function_type` is not a function type.
    pub fn add_function(&self, name: &str, function_type: &Type) -> Result<Function> {
        function_type.return_type()?;
        let add = native!(LLVMAddFunction: fn(RawPtr, CStrPtr, RawPtr) -> RawPtr);
        let name = to_c_string(name)?;
        let ptr = unsafe { add(self.raw()?, name.as_ptr(), function_type.raw()?) };
        borrowed_child(ptr, &self.object)
    }

    /// Gets the function called `name`, if there is one.
    ///
    /// # Errors
    ///
    /// - [`Error::InteriorNul`] if `name` contains a NUL byte.
    pub fn get_function(&self, name: &str) -> Result<Option<Function>> {
        let get = native!(LLVMGetNamedFunction: fn(RawPtr, CStrPtr) -> RawPtr);
        let name = to_c_string(name)?;
        borrowed_child_nullable(unsafe { get(self.raw()?, name.as_ptr()) }, &self.object)
    }

    /// Iterates over the functions in the module, in order.
    ///
    /// # Errors
    ///
    /// - [`Error::UseAfterDispose`] if the module is stale.
    pub fn functions(&self) -> Result<NativeList<Function>> {
        let first = native!(LLVMGetFirstFunction: fn(RawPtr) -> RawPtr);
        let next = native!(LLVMGetNextFunction: fn(RawPtr) -> RawPtr);
        Ok(NativeList::new(unsafe { first(self.raw()?) }, next, &self.object))
    }

    /// Iterates over the functions in the module, last first.
    ///
    /// # Errors
    ///
    /// - [`Error::UseAfterDispose`] if the module is stale.
    pub fn functions_rev(&self) -> Result<NativeList<Function>> {
        let last = native!(LLVMGetLastFunction: fn(RawPtr) -> RawPtr);
        let previous = native!(LLVMGetPreviousFunction: fn(RawPtr) -> RawPtr);
        Ok(NativeList::new(unsafe { last(self.raw()?) }, previous, &self.object))
    }

    /// Adds a global variable called `name` of type `ty`.
    ///
    /// # Errors
    ///
    /// - [`Error::InteriorNul`] if `name` contains a NUL byte.
    pub fn add_global(&self, ty: &Type, name: &str) -> Result<GlobalVariable> {
        let add = native!(LLVMAddGlobal: fn(RawPtr, RawPtr, CStrPtr) -> RawPtr);
        let name = to_c_string(name)?;
        let ptr = unsafe { add(self.raw()?, ty.raw()?, name.as_ptr()) };
        borrowed_child(ptr, &self.object)
    }

    /// Gets the global variable called `name`, if there is one.
    ///
    /// # Errors
    ///
    /// - [`Error::InteriorNul`] if `name` contains a NUL byte.
    pub fn get_global(&self, name: &str) -> Result<Option<GlobalVariable>> {
        let get = native!(LLVMGetNamedGlobal: fn(RawPtr, CStrPtr) -> RawPtr);
        let name = to_c_string(name)?;
        borrowed_child_nullable(unsafe { get(self.raw()?, name.as_ptr()) }, &self.object)
    }

    /// Iterates over the global variables in the module, in order.
    ///
    /// # Errors
    ///
    /// - [`Error::UseAfterDispose`] if the module is stale.
    pub fn globals(&self) -> Result<NativeList<GlobalVariable>> {
        let first = native!(LLVMGetFirstGlobal: fn(RawPtr) -> RawPtr);
        let next = native!(LLVMGetNextGlobal: fn(RawPtr) -> RawPtr);
        Ok(NativeList::new(unsafe { first(self.raw()?) }, next, &self.object))
    }

    /// Iterates over the global variables in the module, last first.
    ///
    /// # Errors
    ///
    /// - [`Error::UseAfterDispose`] if the module is stale.
    pub fn globals_rev(&self) -> Result<NativeList<GlobalVariable>> {
        let last = native!(LLVMGetLastGlobal: fn(RawPtr) -> RawPtr);
        let previous = native!(LLVMGetPreviousGlobal: fn(RawPtr) -> RawPtr);
        Ok(NativeList::new(unsafe { last(self.raw()?) }, previous, &self.object))
    }

    /// Runs the textual new-pass-manager `pipeline` (e.g. `"default<O2>"`)
    /// over the module.
    ///
    /// # Errors
    ///
    /// - [`Error::NativeOperation`] if the pipeline is invalid.
    pub fn run_passes(&self, pipeline: &str, options: &PassBuilderOptions) -> Result<()> {
        let run = native!(LLVMRunPasses: fn(RawPtr, CStrPtr, RawPtr, RawPtr) -> RawPtr);
        let c_pipeline = to_c_string(pipeline)?;

        debug!(pipeline, "Running pass pipeline");
        let error = unsafe {
            run(
                self.raw()?,
                c_pipeline.as_ptr(),
                ptr::null_mut(),
                options.raw()?,
            )
        };
        if error.is_null() {
            return Ok(());
        }

        let get_message = native!(LLVMGetErrorMessage: fn(RawPtr) -> OwnedCStrPtr);
        let dispose_message = native!(LLVMDisposeErrorMessage: fn(OwnedCStrPtr));
        let message = unsafe { get_message(error) };
        let text = unsafe { copy_c_str(message) };
        unsafe { dispose_message(message) };
        Err(Error::NativeOperation(text?))
    }
}
