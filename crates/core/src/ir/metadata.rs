//! Metadata attached to the IR, and a reader for the debug information that
//! front-ends emit as metadata.
//!
//! Metadata is uniqued within its context in the same way as types, and is
//! never disposed by the bindings. Each [`Metadata`] remembers the context it
//! was read through, as many of the C API's metadata queries only exist for
//! the value view of a node.
//!
//! The debug-info descriptors (types, variables, subprograms and so on) are
//! all metadata nodes, told apart by their [`MetadataKind`]. The accessors on
//! [`Metadata`] that only make sense for some kinds fail with
//! [`Error::UnexpectedKind`] on the others.

use std::{
    ffi::{c_uint, CStr},
    ptr,
};

use llvmc_errors::binding::{Error, Result};
use tracing::debug;

use crate::{
    handle::{native_wrapper, NativeWrapper, Object, RawPtr},
    ir::{
        borrowed_child,
        borrowed_child_nullable,
        c_count,
        context::Context,
        module::Module,
        values::{Function, GlobalValue, GlobalVariable, Value, ValueCategory},
    },
    library::prototype::LLVMBool,
    message::{copy_c_str_with_len, to_c_string, CStrPtr},
};

/// The name of the reference from metadata to the context it lives in.
const CONTEXT_REF: &str = "context";

/// The named metadata that lists a module's compile units.
pub const COMPILE_UNITS: &str = "llvm.dbg.cu";

/// The name of the metadata kind that attaches debug info to globals.
const DEBUG_KIND: &CStr = c"dbg";

/// The kinds of metadata, as returned by `LLVMGetMetadataKind`.
#[derive(Clone, Copy, Debug, Eq, Hash, PartialEq)]
pub enum MetadataKind {
    MdString,
    ConstantAsMetadata,
    LocalAsMetadata,
    DistinctOperandPlaceholder,
    Tuple,
    Location,
    Expression,
    GlobalVariableExpression,
    GenericNode,
    Subrange,
    Enumerator,
    BasicType,
    DerivedType,
    CompositeType,
    SubroutineType,
    File,
    CompileUnit,
    Subprogram,
    LexicalBlock,
    LexicalBlockFile,
    Namespace,
    Module,
    TemplateTypeParameter,
    TemplateValueParameter,
    GlobalVariable,
    LocalVariable,
    Label,
    ObjCProperty,
    ImportedEntity,
    Macro,
    MacroFile,
    CommonBlock,
    StringType,
    GenericSubrange,
    ArgList,
    AssignId,
}

impl MetadataKind {
    /// Returns `true` for the debug-info type descriptors.
    #[must_use]
    pub fn is_type(self) -> bool {
        matches!(
            self,
            Self::BasicType | Self::DerivedType | Self::CompositeType | Self::SubroutineType | Self::StringType
        )
    }

    /// Returns `true` for the debug-info variable descriptors.
    #[must_use]
    pub fn is_variable(self) -> bool {
        matches!(self, Self::GlobalVariable | Self::LocalVariable)
    }

    /// Returns `true` for the descriptors that are scopes, and so know the
    /// file they were declared in.
    #[must_use]
    pub fn is_scope(self) -> bool {
        self.is_type()
            || matches!(
                self,
                Self::File
                    | Self::CompileUnit
                    | Self::Subprogram
                    | Self::LexicalBlock
                    | Self::LexicalBlockFile
                    | Self::Namespace
                    | Self::Module
                    | Self::CommonBlock
            )
    }
}

impl TryFrom<c_uint> for MetadataKind {
    type Error = Error;

    fn try_from(value: c_uint) -> Result<Self> {
        let kind = match value {
            0 => Self::MdString,
            1 => Self::ConstantAsMetadata,
            2 => Self::LocalAsMetadata,
            3 => Self::DistinctOperandPlaceholder,
            4 => Self::Tuple,
            5 => Self::Location,
            6 => Self::Expression,
            7 => Self::GlobalVariableExpression,
            8 => Self::GenericNode,
            9 => Self::Subrange,
            10 => Self::Enumerator,
            11 => Self::BasicType,
            12 => Self::DerivedType,
            13 => Self::CompositeType,
            14 => Self::SubroutineType,
            15 => Self::File,
            16 => Self::CompileUnit,
            17 => Self::Subprogram,
            18 => Self::LexicalBlock,
            19 => Self::LexicalBlockFile,
            20 => Self::Namespace,
            21 => Self::Module,
            22 => Self::TemplateTypeParameter,
            23 => Self::TemplateValueParameter,
            24 => Self::GlobalVariable,
            25 => Self::LocalVariable,
            26 => Self::Label,
            27 => Self::ObjCProperty,
            28 => Self::ImportedEntity,
            29 => Self::Macro,
            30 => Self::MacroFile,
            31 => Self::CommonBlock,
            32 => Self::StringType,
            33 => Self::GenericSubrange,
            34 => Self::ArgList,
            35 => Self::AssignId,
            other => {
                return Err(Error::UnexpectedKind {
                    expected: "metadata kind",
                    found:    other.to_string(),
                })
            }
        };
        Ok(kind)
    }
}

native_wrapper! {
    /// An `LLVMMetadataRef`.
    ///
    /// Metadata belongs to its context, and keeps both the context and the
    /// wrapper it was obtained from alive.
    pub struct Metadata(Metadata);
}

impl Metadata {
    /// Wraps a metadata handle obtained from `parent`, which lives in
    /// `context`.
    ///
    /// # Errors
    ///
    /// - [`Error::InvalidHandle`] if `ptr` is null.
    pub fn from_raw(ptr: RawPtr, parent: &Object, context: &Context) -> Result<Self> {
        let metadata: Self = borrowed_child(ptr, parent)?;
        if metadata.object.get_ref(CONTEXT_REF).is_none() {
            metadata.object.set_ref(CONTEXT_REF, context.object());
        }
        Ok(metadata)
    }

    fn from_raw_nullable(ptr: RawPtr, parent: &Object, context: &Context) -> Result<Option<Self>> {
        if ptr.is_null() {
            Ok(None)
        } else {
            Self::from_raw(ptr, parent, context).map(Some)
        }
    }

    /// Gets the metadata that `value` wraps.
    ///
    /// # Errors
    ///
    /// - [`Error::UseAfterDispose`] if the value is stale.
    pub fn from_value(value: &Value) -> Result<Self> {
        let get = native!(LLVMValueAsMetadata: fn(RawPtr) -> RawPtr);
        let context = value.context()?;
        Self::from_raw(unsafe { get(value.raw()?) }, value.object(), &context)
    }

    /// Gets the context that this metadata lives in.
    ///
    /// # Errors
    ///
    /// - [`Error::InvalidHandle`] if the metadata was not read through a
    ///   context.
    pub fn context(&self) -> Result<Context> {
        self.object
            .get_ref(CONTEXT_REF)
            .map(Context::from_object)
            .ok_or(Error::InvalidHandle {
                handle_type: "LLVMContextRef",
            })
    }

    /// Gets the kind of this metadata.
    ///
    /// # Errors
    ///
    /// - [`Error::UnexpectedKind`] if LLVM reports a kind that we do not know.
    pub fn kind(&self) -> Result<MetadataKind> {
        let get = native!(LLVMGetMetadataKind: fn(RawPtr) -> c_uint);
        MetadataKind::try_from(unsafe { get(self.raw()?) })
    }

    fn expect(&self, expected: &'static str, accepts: impl Fn(MetadataKind) -> bool) -> Result<RawPtr> {
        let kind = self.kind()?;
        if accepts(kind) {
            self.raw()
        } else {
            Err(Error::UnexpectedKind {
                expected,
                found: format!("{kind:?}"),
            })
        }
    }

    fn related(&self, ptr: RawPtr) -> Result<Option<Metadata>> {
        Self::from_raw_nullable(ptr, &self.object, &self.context()?)
    }

    /// Gets the value view of this metadata, as used by the value-based
    /// metadata queries.
    ///
    /// # Errors
    ///
    /// - [`Error::UseAfterDispose`] if the metadata or its context is stale.
    pub fn as_value(&self) -> Result<Value> {
        let get = native!(LLVMMetadataAsValue: fn(RawPtr, RawPtr) -> RawPtr);
        let context = self.context()?;
        borrowed_child(unsafe { get(context.raw()?, self.raw()?) }, &self.object)
    }

    /// Gets the contents of a metadata string.
    ///
    /// # Errors
    ///
    /// - [`Error::UnexpectedKind`] if this is not a string.
    /// - [`Error::CStrConversion`] if the string is not valid UTF-8.
    pub fn string(&self) -> Result<String> {
        let get = native!(LLVMGetMDString: fn(RawPtr, *mut c_uint) -> CStrPtr);
        self.expect("metadata string", |kind| kind == MetadataKind::MdString)?;
        let mut len: c_uint = 0;
        let string = unsafe { get(self.as_value()?.raw()?, &mut len) };
        unsafe { copy_c_str_with_len(string, len as usize) }
    }

    /// Gets the operands of a metadata node.
    ///
    /// Operands that wrap a plain value (such as a constant) come back as that
    /// value, other operands as the value view of their metadata, and absent
    /// operands as [`None`].
    ///
    /// # Errors
    ///
    /// - [`Error::UnexpectedKind`] if this is a string or a wrapped value.
    pub fn operands(&self) -> Result<Vec<Option<Value>>> {
        let count = native!(LLVMGetMDNodeNumOperands: fn(RawPtr) -> c_uint);
        let get = native!(LLVMGetMDNodeOperands: fn(RawPtr, *mut RawPtr));
        self.expect("metadata node", |kind| {
            !matches!(
                kind,
                MetadataKind::MdString | MetadataKind::ConstantAsMetadata | MetadataKind::LocalAsMetadata
            )
        })?;

        let value = self.as_value()?;
        let ptr = value.raw()?;
        let mut operands = vec![ptr::null_mut(); unsafe { count(ptr) } as usize];
        unsafe { get(ptr, operands.as_mut_ptr()) };
        operands
            .into_iter()
            .map(|operand| borrowed_child_nullable(operand, &self.object))
            .collect()
    }

    /// Gets the name of a debug-info type, which is empty for anonymous types.
    ///
    /// # Errors
    ///
    /// - [`Error::UnexpectedKind`] if this is not a type.
    pub fn name(&self) -> Result<String> {
        let get = native!(LLVMDITypeGetName: fn(RawPtr, *mut usize) -> CStrPtr);
        let ptr = self.expect("debug-info type", MetadataKind::is_type)?;
        let mut len = 0usize;
        let name = unsafe { get(ptr, &mut len) };
        unsafe { copy_c_str_with_len(name, len) }
    }

    /// Gets the size in bits of a debug-info type.
    ///
    /// # Errors
    ///
    /// - [`Error::UnexpectedKind`] if this is not a type.
    pub fn size_in_bits(&self) -> Result<u64> {
        let get = native!(LLVMDITypeGetSizeInBits: fn(RawPtr) -> u64);
        let ptr = self.expect("debug-info type", MetadataKind::is_type)?;
        Ok(unsafe { get(ptr) })
    }

    /// Gets the offset in bits of a debug-info type within its parent, as for
    /// the members of a structure.
    ///
    /// # Errors
    ///
    /// - [`Error::UnexpectedKind`] if this is not a type.
    pub fn offset_in_bits(&self) -> Result<u64> {
        let get = native!(LLVMDITypeGetOffsetInBits: fn(RawPtr) -> u64);
        let ptr = self.expect("debug-info type", MetadataKind::is_type)?;
        Ok(unsafe { get(ptr) })
    }

    /// Gets the alignment in bits of a debug-info type.
    ///
    /// # Errors
    ///
    /// - [`Error::UnexpectedKind`] if this is not a type.
    pub fn align_in_bits(&self) -> Result<u32> {
        let get = native!(LLVMDITypeGetAlignInBits: fn(RawPtr) -> c_uint);
        let ptr = self.expect("debug-info type", MetadataKind::is_type)?;
        Ok(unsafe { get(ptr) })
    }

    /// Gets the source line that a descriptor was declared on, or that a
    /// location points at. Zero means the line is unknown.
    ///
    /// # Errors
    ///
    /// - [`Error::UnexpectedKind`] unless this is a type, variable, subprogram
    ///   or location.
    pub fn line(&self) -> Result<u32> {
        let line = match self.kind()? {
            kind if kind.is_type() => native!(LLVMDITypeGetLine: fn(RawPtr) -> c_uint),
            kind if kind.is_variable() => native!(LLVMDIVariableGetLine: fn(RawPtr) -> c_uint),
            MetadataKind::Subprogram => native!(LLVMDISubprogramGetLine: fn(RawPtr) -> c_uint),
            MetadataKind::Location => native!(LLVMDILocationGetLine: fn(RawPtr) -> c_uint),
            kind => {
                return Err(Error::UnexpectedKind {
                    expected: "debug-info descriptor with a line",
                    found:    format!("{kind:?}"),
                })
            }
        };
        Ok(unsafe { line(self.raw()?) })
    }

    /// Gets the column that a location points at.
    ///
    /// # Errors
    ///
    /// - [`Error::UnexpectedKind`] if this is not a location.
    pub fn column(&self) -> Result<u32> {
        let get = native!(LLVMDILocationGetColumn: fn(RawPtr) -> c_uint);
        let ptr = self.expect("debug-info location", |kind| kind == MetadataKind::Location)?;
        Ok(unsafe { get(ptr) })
    }

    /// Gets the scope of a location or variable.
    ///
    /// # Errors
    ///
    /// - [`Error::UnexpectedKind`] unless this is a location or variable.
    pub fn scope(&self) -> Result<Option<Metadata>> {
        let scope = match self.kind()? {
            MetadataKind::Location => native!(LLVMDILocationGetScope: fn(RawPtr) -> RawPtr),
            kind if kind.is_variable() => native!(LLVMDIVariableGetScope: fn(RawPtr) -> RawPtr),
            kind => {
                return Err(Error::UnexpectedKind {
                    expected: "debug-info location or variable",
                    found:    format!("{kind:?}"),
                })
            }
        };
        self.related(unsafe { scope(self.raw()?) })
    }

    /// Gets the file that a variable or scope was declared in.
    ///
    /// # Errors
    ///
    /// - [`Error::UnexpectedKind`] unless this is a variable or scope.
    pub fn file(&self) -> Result<Option<Metadata>> {
        let file = match self.kind()? {
            kind if kind.is_variable() => native!(LLVMDIVariableGetFile: fn(RawPtr) -> RawPtr),
            kind if kind.is_scope() => native!(LLVMDIScopeGetFile: fn(RawPtr) -> RawPtr),
            kind => {
                return Err(Error::UnexpectedKind {
                    expected: "debug-info variable or scope",
                    found:    format!("{kind:?}"),
                })
            }
        };
        self.related(unsafe { file(self.raw()?) })
    }

    /// Gets the name of a debug-info file.
    ///
    /// # Errors
    ///
    /// - [`Error::UnexpectedKind`] if this is not a file.
    pub fn filename(&self) -> Result<String> {
        let get = native!(LLVMDIFileGetFilename: fn(RawPtr, *mut c_uint) -> CStrPtr);
        self.file_string(get)
    }

    /// Gets the directory of a debug-info file.
    ///
    /// # Errors
    ///
    /// - [`Error::UnexpectedKind`] if this is not a file.
    pub fn directory(&self) -> Result<String> {
        let get = native!(LLVMDIFileGetDirectory: fn(RawPtr, *mut c_uint) -> CStrPtr);
        self.file_string(get)
    }

    fn file_string(&self, get: unsafe extern "C" fn(RawPtr, *mut c_uint) -> CStrPtr) -> Result<String> {
        let ptr = self.expect("debug-info file", |kind| kind == MetadataKind::File)?;
        let mut len: c_uint = 0;
        let string = unsafe { get(ptr, &mut len) };
        unsafe { copy_c_str_with_len(string, len as usize) }
    }

    /// Gets the variable described by a global variable expression.
    ///
    /// # Errors
    ///
    /// - [`Error::UnexpectedKind`] if this is not a global variable
    ///   expression.
    pub fn variable(&self) -> Result<Option<Metadata>> {
        let get = native!(LLVMDIGlobalVariableExpressionGetVariable: fn(RawPtr) -> RawPtr);
        let ptr = self.expect("debug-info global variable expression", |kind| {
            kind == MetadataKind::GlobalVariableExpression
        })?;
        self.related(unsafe { get(ptr) })
    }
}

/// Gets the version of the debug-info format that this LLVM emits.
///
/// # Errors
///
/// - [`Error::SymbolNotFound`] if the library is missing the entry point.
pub fn debug_metadata_version() -> Result<u32> {
    let get = native!(LLVMDebugMetadataVersion: fn() -> c_uint);
    Ok(unsafe { get() })
}

impl Module {
    /// Gets the operands of the named metadata `name`, which is empty if the
    /// module has no such metadata.
    ///
    /// # Errors
    ///
    /// - [`Error::InteriorNul`] if `name` contains a NUL byte.
    pub fn named_metadata(&self, name: &str) -> Result<Vec<Metadata>> {
        let count = native!(LLVMGetNamedMetadataNumOperands: fn(RawPtr, CStrPtr) -> c_uint);
        let get = native!(LLVMGetNamedMetadataOperands: fn(RawPtr, CStrPtr, *mut RawPtr));
        let as_metadata = native!(LLVMValueAsMetadata: fn(RawPtr) -> RawPtr);

        let name = to_c_string(name)?;
        let module = self.raw()?;
        let mut operands = vec![ptr::null_mut(); unsafe { count(module, name.as_ptr()) } as usize];
        if operands.is_empty() {
            return Ok(Vec::new());
        }
        unsafe { get(module, name.as_ptr(), operands.as_mut_ptr()) };

        let context = self.context()?;
        operands
            .into_iter()
            .map(|operand| Metadata::from_raw(unsafe { as_metadata(operand) }, self.object(), &context))
            .collect()
    }

    /// Gets the names of all the named metadata in the module, in order.
    ///
    /// # Errors
    ///
    /// - [`Error::CStrConversion`] if a name is not valid UTF-8.
    pub fn named_metadata_names(&self) -> Result<Vec<String>> {
        let first = native!(LLVMGetFirstNamedMetadata: fn(RawPtr) -> RawPtr);
        let next = native!(LLVMGetNextNamedMetadata: fn(RawPtr) -> RawPtr);
        let name_of = native!(LLVMGetNamedMetadataName: fn(RawPtr, *mut usize) -> CStrPtr);

        let mut names = Vec::new();
        let mut current = unsafe { first(self.raw()?) };
        while !current.is_null() {
            let mut len = 0usize;
            let name = unsafe { name_of(current, &mut len) };
            names.push(unsafe { copy_c_str_with_len(name, len) }?);
            current = unsafe { next(current) };
        }
        Ok(names)
    }

    /// Gets the debug-info version recorded in the module's flags, or zero if
    /// it has none.
    ///
    /// # Errors
    ///
    /// - [`Error::UseAfterDispose`] if the module is stale.
    pub fn debug_metadata_version(&self) -> Result<u32> {
        let get = native!(LLVMGetModuleDebugMetadataVersion: fn(RawPtr) -> c_uint);
        Ok(unsafe { get(self.raw()?) })
    }

    /// Removes all debug information from the module, returning `true` if
    /// there was any.
    ///
    /// Metadata wrappers read from the module beforehand should not be used
    /// afterwards.
    ///
    /// # Errors
    ///
    /// - [`Error::UseAfterDispose`] if the module is stale.
    pub fn strip_debug_info(&self) -> Result<bool> {
        let strip = native!(LLVMStripModuleDebugInfo: fn(RawPtr) -> LLVMBool);
        Ok(unsafe { strip(self.raw()?) }.into())
    }

    /// Reads the module's debug information, or returns [`None`] if it was
    /// not compiled with any.
    ///
    /// # Errors
    ///
    /// - [`llvmc_errors::binding::Error`] if any of the native queries fail.
    pub fn debug_info(&self) -> Result<Option<DebugInfo>> {
        DebugInfo::load(self)
    }
}

impl Function {
    /// Gets the subprogram descriptor of the function, if it has debug info.
    ///
    /// # Errors
    ///
    /// - [`Error::UseAfterDispose`] if the function is stale.
    pub fn subprogram(&self) -> Result<Option<Metadata>> {
        let get = native!(LLVMGetSubprogram: fn(RawPtr) -> RawPtr);
        let ptr = unsafe { get(self.raw()?) };
        Metadata::from_raw_nullable(ptr, self.object(), &self.as_value().context()?)
    }
}

impl GlobalVariable {
    /// Gets the debug-info variable expressions attached to the global.
    ///
    /// # Errors
    ///
    /// - [`Error::UseAfterDispose`] if the global is stale.
    pub fn debug_info(&self) -> Result<Vec<Metadata>> {
        let copy = native!(LLVMGlobalCopyAllMetadata: fn(RawPtr, *mut usize) -> RawPtr);
        let kind_of = native!(LLVMValueMetadataEntriesGetKind: fn(RawPtr, c_uint) -> c_uint);
        let get = native!(LLVMValueMetadataEntriesGetMetadata: fn(RawPtr, c_uint) -> RawPtr);
        let dispose = native!(LLVMDisposeValueMetadataEntries: fn(RawPtr));
        let kind_id = native!(LLVMGetMDKindIDInContext: fn(RawPtr, CStrPtr, c_uint) -> c_uint);

        let context = self.as_value().context()?;
        let debug_kind = unsafe {
            kind_id(
                context.raw()?,
                DEBUG_KIND.as_ptr(),
                c_count(DEBUG_KIND.to_bytes().len())?,
            )
        };

        let mut len = 0usize;
        let entries = unsafe { copy(self.raw()?, &mut len) };
        if entries.is_null() {
            return Ok(Vec::new());
        }

        let attached = c_count(len).map(|count| {
            (0..count)
                .filter(|&index| unsafe { kind_of(entries, index) } == debug_kind)
                .map(|index| unsafe { get(entries, index) })
                .collect::<Vec<_>>()
        });
        unsafe { dispose(entries) };

        attached?
            .into_iter()
            .map(|metadata| Metadata::from_raw(metadata, self.object(), &context))
            .collect()
    }
}

impl Value {
    /// Gets the source location of an instruction, if it has one.
    ///
    /// # Errors
    ///
    /// - [`Error::UnexpectedKind`] if this is not an instruction.
    pub fn debug_location(&self) -> Result<Option<Metadata>> {
        let get = native!(LLVMInstructionGetDebugLoc: fn(RawPtr) -> RawPtr);
        let kind = self.kind()?;
        if kind.category() != ValueCategory::Instruction {
            return Err(Error::UnexpectedKind {
                expected: "instruction",
                found:    format!("{kind:?}"),
            });
        }
        Metadata::from_raw_nullable(unsafe { get(self.raw()?) }, self.object(), &self.context()?)
    }
}

/// The debug information of a module, as read from its metadata.
///
/// Descriptors are indexed by the name of the function or global variable
/// they describe.
#[derive(Clone, Debug)]
pub struct DebugInfo {
    compile_units:    Vec<Metadata>,
    subprograms:      Vec<(String, Metadata)>,
    global_variables: Vec<(String, Metadata)>,
}

impl DebugInfo {
    /// Reads the debug information of `module`, or returns [`None`] if the
    /// module has no compile units.
    ///
    /// # Errors
    ///
    /// - [`llvmc_errors::binding::Error`] if any of the native queries fail.
    pub fn load(module: &Module) -> Result<Option<Self>> {
        let compile_units = module.named_metadata(COMPILE_UNITS)?;
        if compile_units.is_empty() {
            return Ok(None);
        }

        let mut subprograms = Vec::new();
        for function in module.functions()? {
            let function = function?;
            if let Some(subprogram) = function.subprogram()? {
                subprograms.push((function.as_value().name()?, subprogram));
            }
        }

        let mut global_variables = Vec::new();
        for global in module.globals()? {
            let global = global?;
            let name = global.as_value().name()?;
            for expression in global.debug_info()? {
                if let Some(variable) = expression.variable()? {
                    global_variables.push((name.clone(), variable));
                }
            }
        }

        debug!(
            compile_units = compile_units.len(),
            subprograms = subprograms.len(),
            global_variables = global_variables.len(),
            "Loaded debug info"
        );

        Ok(Some(Self {
            compile_units,
            subprograms,
            global_variables,
        }))
    }

    /// Gets the compile units of the module.
    #[must_use]
    pub fn compile_units(&self) -> &[Metadata] {
        &self.compile_units
    }

    /// Gets the subprogram descriptors, paired with the names of their
    /// functions.
    #[must_use]
    pub fn subprograms(&self) -> &[(String, Metadata)] {
        &self.subprograms
    }

    /// Gets the global variable descriptors, paired with the names of their
    /// globals.
    #[must_use]
    pub fn global_variables(&self) -> &[(String, Metadata)] {
        &self.global_variables
    }

    /// Gets the descriptor for the function or global variable called
    /// `name`.
    #[must_use]
    pub fn get(&self, name: &str) -> Option<&Metadata> {
        self.subprograms
            .iter()
            .chain(&self.global_variables)
            .find(|(n, _)| n == name)
            .map(|(_, metadata)| metadata)
    }
}

#[cfg(test)]
mod test {
    use llvmc_errors::binding::Error;

    use crate::ir::metadata::MetadataKind;

    #[test]
    fn metadata_kinds_decode_from_native_values() -> anyhow::Result<()> {
        assert_eq!(MetadataKind::try_from(0)?, MetadataKind::MdString);
        assert_eq!(MetadataKind::try_from(11)?, MetadataKind::BasicType);
        assert_eq!(MetadataKind::try_from(17)?, MetadataKind::Subprogram);
        assert_eq!(MetadataKind::try_from(24)?, MetadataKind::GlobalVariable);
        assert_eq!(MetadataKind::try_from(35)?, MetadataKind::AssignId);
        assert!(matches!(
            MetadataKind::try_from(99),
            Err(Error::UnexpectedKind {
                expected: "metadata kind",
                ..
            })
        ));

        Ok(())
    }

    #[test]
    fn metadata_kinds_are_grouped() {
        assert!(MetadataKind::CompositeType.is_type());
        assert!(MetadataKind::CompositeType.is_scope());
        assert!(!MetadataKind::LocalVariable.is_type());
        assert!(MetadataKind::LocalVariable.is_variable());
        assert!(!MetadataKind::LocalVariable.is_scope());
        assert!(MetadataKind::Subprogram.is_scope());
        assert!(!MetadataKind::Location.is_scope());
    }
}
