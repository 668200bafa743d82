//! LLVM values, and the more specific wrappers for functions, global
//! variables and basic blocks.
//!
//! All values share the `LLVMValueRef` handle type, and so a [`Function`] and
//! the [`Value`] for the same function share a single underlying
//! [`crate::handle::Object`]. Basic blocks have their own handle type, and are converted to
//! and from their value view explicitly.
//!
//! Value kinds are decoded once into the closed [`ValueKind`] enumeration, and
//! [`ValueKind::category`] is the single place that decides which wrapper a
//! value is [classified](Value::classify) as.

use std::ffi::{c_int, c_uint};

use llvmc_errors::binding::{Error, Result};

use crate::{
    handle::{native_wrapper, NativeWrapper, RawPtr},
    ir::{
        borrowed_child,
        borrowed_child_nullable,
        context::Context,
        types::Type,
        NativeList,
    },
    library::prototype::LLVMBool,
    message::{copy_c_str, copy_c_str_with_len, take_message, to_c_string, CStrPtr, OwnedCStrPtr},
};

/// The kinds of value in the IR, as returned by `LLVMGetValueKind`.
#[derive(Clone, Copy, Debug, Eq, Hash, PartialEq)]
pub enum ValueKind {
    Argument,
    BasicBlock,
    MemoryUse,
    MemoryDef,
    MemoryPhi,
    Function,
    GlobalAlias,
    GlobalIFunc,
    GlobalVariable,
    BlockAddress,
    ConstantExpr,
    ConstantArray,
    ConstantStruct,
    ConstantVector,
    UndefValue,
    ConstantAggregateZero,
    ConstantDataArray,
    ConstantDataVector,
    ConstantInt,
    ConstantFP,
    ConstantPointerNull,
    ConstantTokenNone,
    MetadataAsValue,
    InlineAsm,
    Instruction,
    Poison,
    ConstantTargetNone,
    ConstantPtrAuth,
}

/// The coarse categories that values are dispatched on.
#[derive(Clone, Copy, Debug, Eq, Hash, PartialEq)]
pub enum ValueCategory {
    Argument,
    BasicBlock,
    MemoryAccess,
    Function,
    GlobalAlias,
    GlobalVariable,
    Constant,
    Metadata,
    InlineAsm,
    Instruction,
}

impl ValueKind {
    /// Gets the category of this kind of value.
    #[must_use]
    pub fn category(self) -> ValueCategory {
        match self {
            Self::Argument => ValueCategory::Argument,
            Self::BasicBlock => ValueCategory::BasicBlock,
            Self::MemoryUse | Self::MemoryDef | Self::MemoryPhi => ValueCategory::MemoryAccess,
            Self::Function => ValueCategory::Function,
            Self::GlobalAlias | Self::GlobalIFunc => ValueCategory::GlobalAlias,
            Self::GlobalVariable => ValueCategory::GlobalVariable,
            Self::BlockAddress
            | Self::ConstantExpr
            | Self::ConstantArray
            | Self::ConstantStruct
            | Self::ConstantVector
            | Self::UndefValue
            | Self::ConstantAggregateZero
            | Self::ConstantDataArray
            | Self::ConstantDataVector
            | Self::ConstantInt
            | Self::ConstantFP
            | Self::ConstantPointerNull
            | Self::ConstantTokenNone
            | Self::Poison
            | Self::ConstantTargetNone
            | Self::ConstantPtrAuth => ValueCategory::Constant,
            Self::MetadataAsValue => ValueCategory::Metadata,
            Self::InlineAsm => ValueCategory::InlineAsm,
            Self::Instruction => ValueCategory::Instruction,
        }
    }
}

impl TryFrom<c_int> for ValueKind {
    type Error = Error;

    fn try_from(value: c_int) -> Result<Self> {
        let kind = match value {
            0 => Self::Argument,
            1 => Self::BasicBlock,
            2 => Self::MemoryUse,
            3 => Self::MemoryDef,
            4 => Self::MemoryPhi,
            5 => Self::Function,
            6 => Self::GlobalAlias,
            7 => Self::GlobalIFunc,
            8 => Self::GlobalVariable,
            9 => Self::BlockAddress,
            10 => Self::ConstantExpr,
            11 => Self::ConstantArray,
            12 => Self::ConstantStruct,
            13 => Self::ConstantVector,
            14 => Self::UndefValue,
            15 => Self::ConstantAggregateZero,
            16 => Self::ConstantDataArray,
            17 => Self::ConstantDataVector,
            18 => Self::ConstantInt,
            19 => Self::ConstantFP,
            20 => Self::ConstantPointerNull,
            21 => Self::ConstantTokenNone,
            22 => Self::MetadataAsValue,
            23 => Self::InlineAsm,
            24 => Self::Instruction,
            25 => Self::Poison,
            26 => Self::ConstantTargetNone,
            27 => Self::ConstantPtrAuth,
            other => {
                return Err(Error::UnexpectedKind {
                    expected: "value kind",
                    found:    other.to_string(),
                })
            }
        };
        Ok(kind)
    }
}

/// The linkage types of global values, as used by `LLVMGetLinkage`.
#[derive(Clone, Copy, Debug, Eq, Hash, PartialEq)]
pub enum Linkage {
    External,
    AvailableExternally,
    LinkOnceAny,
    LinkOnceOdr,
    LinkOnceOdrAutoHide,
    WeakAny,
    WeakOdr,
    Appending,
    Internal,
    Private,
    DllImport,
    DllExport,
    ExternalWeak,
    Ghost,
    Common,
    LinkerPrivate,
    LinkerPrivateWeak,
}

impl TryFrom<c_int> for Linkage {
    type Error = Error;

    fn try_from(value: c_int) -> Result<Self> {
        let linkage = match value {
            0 => Self::External,
            1 => Self::AvailableExternally,
            2 => Self::LinkOnceAny,
            3 => Self::LinkOnceOdr,
            4 => Self::LinkOnceOdrAutoHide,
            5 => Self::WeakAny,
            6 => Self::WeakOdr,
            7 => Self::Appending,
            8 => Self::Internal,
            9 => Self::Private,
            10 => Self::DllImport,
            11 => Self::DllExport,
            12 => Self::ExternalWeak,
            13 => Self::Ghost,
            14 => Self::Common,
            15 => Self::LinkerPrivate,
            16 => Self::LinkerPrivateWeak,
            other => {
                return Err(Error::UnexpectedKind {
                    expected: "linkage",
                    found:    other.to_string(),
                })
            }
        };
        Ok(linkage)
    }
}

impl From<Linkage> for c_int {
    fn from(value: Linkage) -> Self {
        value as c_int
    }
}

native_wrapper! {
    /// An `LLVMValueRef` of any kind.
    pub struct Value(Value);
}

native_wrapper! {
    /// A value that is known to be a function.
    pub struct Function(Value);
}

native_wrapper! {
    /// A value that is known to be a global variable.
    pub struct GlobalVariable(Value);
}

native_wrapper! {
    /// An `LLVMBasicBlockRef`.
    pub struct BasicBlock(BasicBlock);
}

/// A value classified by its [`ValueCategory`].
#[derive(Clone, Debug, Eq, PartialEq)]
pub enum AnyValue {
    Argument(Value),
    BasicBlock(BasicBlock),
    Function(Function),
    GlobalVariable(GlobalVariable),
    GlobalAlias(Value),
    Constant(Value),
    Instruction(Value),
    Other(Value),
}

impl Value {
    /// Gets the kind of this value.
    ///
    /// # Errors
    ///
    /// - [`Error::UnexpectedKind`] if LLVM reports a kind that we do not know.
    pub fn kind(&self) -> Result<ValueKind> {
        let get = native!(LLVMGetValueKind: fn(RawPtr) -> c_int);
        ValueKind::try_from(unsafe { get(self.raw()?) })
    }

    /// Gets the category of this value.
    ///
    /// # Errors
    ///
    /// See [`Self::kind`].
    pub fn category(&self) -> Result<ValueCategory> {
        Ok(self.kind()?.category())
    }

    /// Gets the most specific wrapper for this value.
    ///
    /// # Errors
    ///
    /// See [`Self::kind`].
    pub fn classify(&self) -> Result<AnyValue> {
        let value = self.clone();
        let classified = match self.category()? {
            ValueCategory::Argument => AnyValue::Argument(value),
            ValueCategory::BasicBlock => AnyValue::BasicBlock(BasicBlock::from_value(&value)?),
            ValueCategory::Function => AnyValue::Function(Function::from_object(value.object)),
            ValueCategory::GlobalVariable => {
                AnyValue::GlobalVariable(GlobalVariable::from_object(value.object))
            }
            ValueCategory::GlobalAlias => AnyValue::GlobalAlias(value),
            ValueCategory::Constant => AnyValue::Constant(value),
            ValueCategory::Instruction => AnyValue::Instruction(value),
            ValueCategory::MemoryAccess | ValueCategory::Metadata | ValueCategory::InlineAsm => {
                AnyValue::Other(value)
            }
        };
        Ok(classified)
    }

    /// Gets the name of the value, which is empty for unnamed values.
    ///
    /// # Errors
    ///
    /// - [`Error::CStrConversion`] if the name is not valid UTF-8.
    pub fn name(&self) -> Result<String> {
        let get = native!(LLVMGetValueName2: fn(RawPtr, *mut usize) -> CStrPtr);
        let mut len = 0usize;
        let name = unsafe { get(self.raw()?, &mut len) };
        unsafe { copy_c_str_with_len(name, len) }
    }

    /// Sets the name of the value.
    ///
    /// # Errors
    ///
    /// - [`Error::InteriorNul`] if `name` contains a NUL byte.
    pub fn set_name(&self, name: &str) -> Result<()> {
        let set = native!(LLVMSetValueName2: fn(RawPtr, CStrPtr, usize));
        let c_name = to_c_string(name)?;
        unsafe { set(self.raw()?, c_name.as_ptr(), name.len()) };
        Ok(())
    }

    /// Gets the type of the value.
    ///
    /// # Errors
    ///
    /// - [`Error::UseAfterDispose`] if the value is stale.
    pub fn type_of(&self) -> Result<Type> {
        let get = native!(LLVMTypeOf: fn(RawPtr) -> RawPtr);
        Type::from_raw_in_own_context(unsafe { get(self.raw()?) })
    }

    /// Gets the context that the value belongs to.
    ///
    /// # Errors
    ///
    /// - [`Error::UseAfterDispose`] if the value is stale.
    pub fn context(&self) -> Result<Context> {
        self.type_of()?.context()
    }

    /// Renders the value as textual IR.
    ///
    /// # Errors
    ///
    /// - [`Error::CStrConversion`] if the text is not valid UTF-8.
    pub fn print_to_string(&self) -> Result<String> {
        let print = native!(LLVMPrintValueToString: fn(RawPtr) -> OwnedCStrPtr);
        unsafe { take_message(print(self.raw()?)) }
    }

    /// Prints the value to standard error.
    ///
    /// # Errors
    ///
    /// - [`Error::UseAfterDispose`] if the value is stale.
    pub fn dump(&self) -> Result<()> {
        let dump = native!(LLVMDumpValue: fn(RawPtr));
        unsafe { dump(self.raw()?) };
        Ok(())
    }

    /// Replaces every use of this value with `replacement`.
    ///
    /// # Errors
    ///
    /// - [`Error::UseAfterDispose`] if either value is stale.
    pub fn replace_all_uses_with(&self, replacement: &Value) -> Result<()> {
        let replace = native!(LLVMReplaceAllUsesWith: fn(RawPtr, RawPtr));
        unsafe { replace(self.raw()?, replacement.raw()?) };
        Ok(())
    }

    /// Returns `true` if the value is a constant.
    ///
    /// # Errors
    ///
    /// - [`Error::UseAfterDispose`] if the value is stale.
    pub fn is_constant(&self) -> Result<bool> {
        let get = native!(LLVMIsConstant: fn(RawPtr) -> LLVMBool);
        Ok(unsafe { get(self.raw()?) }.into())
    }

    /// Returns `true` if the value is `undef`.
    ///
    /// # Errors
    ///
    /// - [`Error::UseAfterDispose`] if the value is stale.
    pub fn is_undef(&self) -> Result<bool> {
        let get = native!(LLVMIsUndef: fn(RawPtr) -> LLVMBool);
        Ok(unsafe { get(self.raw()?) }.into())
    }

    /// Gets the operands of a user, such as an instruction or a constant
    /// expression.
    ///
    /// # Errors
    ///
    /// - [`Error::UseAfterDispose`] if the value is stale.
    pub fn operands(&self) -> Result<Vec<Value>> {
        let count = native!(LLVMGetNumOperands: fn(RawPtr) -> c_int);
        let get = native!(LLVMGetOperand: fn(RawPtr, c_uint) -> RawPtr);

        let ptr = self.raw()?;
        let count = c_uint::try_from(unsafe { count(ptr) }).unwrap_or(0);
        (0..count)
            .map(|i| borrowed_child(unsafe { get(ptr, i) }, &self.object))
            .collect()
    }

    /// Gets the value of an integer constant, zero extended.
    ///
    /// # Errors
    ///
    /// - [`Error::UnexpectedKind`] if this is not an integer constant.
    pub fn const_int_zext(&self) -> Result<u64> {
        let ptr = self.expect_kind(ValueKind::ConstantInt, "integer constant")?;
        let get = native!(LLVMConstIntGetZExtValue: fn(RawPtr) -> u64);
        Ok(unsafe { get(ptr) })
    }

    /// Gets the value of an integer constant, sign extended.
    ///
    /// # Errors
    ///
    /// - [`Error::UnexpectedKind`] if this is not an integer constant.
    pub fn const_int_sext(&self) -> Result<i64> {
        let ptr = self.expect_kind(ValueKind::ConstantInt, "integer constant")?;
        let get = native!(LLVMConstIntGetSExtValue: fn(RawPtr) -> i64);
        Ok(unsafe { get(ptr) })
    }

    fn expect_kind(&self, kind: ValueKind, expected: &'static str) -> Result<RawPtr> {
        let found = self.kind()?;
        if found == kind {
            self.raw()
        } else {
            Err(Error::UnexpectedKind {
                expected,
                found: format!("{found:?}"),
            })
        }
    }
}

impl TryFrom<Value> for Function {
    type Error = Error;

    fn try_from(value: Value) -> Result<Self> {
        value.expect_kind(ValueKind::Function, "function")?;
        Ok(Self::from_object(value.object))
    }
}

impl TryFrom<Value> for GlobalVariable {
    type Error = Error;

    fn try_from(value: Value) -> Result<Self> {
        value.expect_kind(ValueKind::GlobalVariable, "global variable")?;
        Ok(Self::from_object(value.object))
    }
}

/// Operations shared by every value that lives at module scope.
pub trait GlobalValue: NativeWrapper {
    /// Gets this global as a plain value.
    fn as_value(&self) -> Value {
        Value::from_object(self.object().clone())
    }

    /// Gets the linkage of the global.
    ///
    /// # Errors
    ///
    /// - [`Error::UnexpectedKind`] if LLVM reports an unknown linkage.
    fn linkage(&self) -> Result<Linkage> {
        let get = native!(LLVMGetLinkage: fn(RawPtr) -> c_int);
        Linkage::try_from(unsafe { get(self.raw()?) })
    }

    /// Sets the linkage of the global.
    ///
    /// # Errors
    ///
    /// - [`Error::UseAfterDispose`] if the global is stale.
    fn set_linkage(&self, linkage: Linkage) -> Result<()> {
        let set = native!(LLVMSetLinkage: fn(RawPtr, c_int));
        unsafe { set(self.raw()?, linkage.into()) };
        Ok(())
    }

    /// Returns `true` if the global is a declaration rather than a
    /// definition.
    ///
    /// # Errors
    ///
    /// - [`Error::UseAfterDispose`] if the global is stale.
    fn is_declaration(&self) -> Result<bool> {
        let get = native!(LLVMIsDeclaration: fn(RawPtr) -> LLVMBool);
        Ok(unsafe { get(self.raw()?) }.into())
    }

    /// Gets the type of the global's value, as opposed to the pointer type of
    /// the global itself.
    ///
    /// # Errors
    ///
    /// - [`Error::UseAfterDispose`] if the global is stale.
    fn value_type(&self) -> Result<Type> {
        let get = native!(LLVMGlobalGetValueType: fn(RawPtr) -> RawPtr);
        Type::from_raw_in_own_context(unsafe { get(self.raw()?) })
    }

    /// Gets the section that the global is placed in, if any.
    ///
    /// # Errors
    ///
    /// - [`Error::CStrConversion`] if the name is not valid UTF-8.
    fn section(&self) -> Result<Option<String>> {
        let get = native!(LLVMGetSection: fn(RawPtr) -> CStrPtr);
        let section = unsafe { copy_c_str(get(self.raw()?)) }?;
        Ok(Some(section).filter(|s| !s.is_empty()))
    }

    /// Places the global in `section`.
    ///
    /// # Errors
    ///
    /// - [`Error::InteriorNul`] if `section` contains a NUL byte.
    fn set_section(&self, section: &str) -> Result<()> {
        let set = native!(LLVMSetSection: fn(RawPtr, CStrPtr));
        let section = to_c_string(section)?;
        unsafe { set(self.raw()?, section.as_ptr()) };
        Ok(())
    }

    /// Gets the alignment of the global in bytes, or zero if unspecified.
    ///
    /// # Errors
    ///
    /// - [`Error::UseAfterDispose`] if the global is stale.
    fn alignment(&self) -> Result<u32> {
        let get = native!(LLVMGetAlignment: fn(RawPtr) -> c_uint);
        Ok(unsafe { get(self.raw()?) })
    }

    /// Sets the alignment of the global in bytes.
    ///
    /// # Errors
    ///
    /// - [`Error::UseAfterDispose`] if the global is stale.
    fn set_alignment(&self, bytes: u32) -> Result<()> {
        let set = native!(LLVMSetAlignment: fn(RawPtr, c_uint));
        unsafe { set(self.raw()?, bytes) };
        Ok(())
    }
}

impl GlobalValue for Function {}
impl GlobalValue for GlobalVariable {}

impl Function {
    /// Gets the parameters of the function.
    ///
    /// # Errors
    ///
    /// - [`Error::UseAfterDispose`] if the function is stale.
    pub fn params(&self) -> Result<Vec<Value>> {
        let count = native!(LLVMCountParams: fn(RawPtr) -> c_uint);
        let get = native!(LLVMGetParam: fn(RawPtr, c_uint) -> RawPtr);

        let ptr = self.raw()?;
        (0..unsafe { count(ptr) })
            .map(|i| borrowed_child(unsafe { get(ptr, i) }, &self.object))
            .collect()
    }

    /// Iterates over the basic blocks of the function, in order.
    ///
    /// # Errors
    ///
    /// - [`Error::UseAfterDispose`] if the function is stale.
    pub fn basic_blocks(&self) -> Result<NativeList<BasicBlock>> {
        let first = native!(LLVMGetFirstBasicBlock: fn(RawPtr) -> RawPtr);
        let next = native!(LLVMGetNextBasicBlock: fn(RawPtr) -> RawPtr);
        Ok(NativeList::new(unsafe { first(self.raw()?) }, next, &self.object))
    }

    /// Gets the entry block of the function, or [`None`] for a declaration.
    ///
    /// # Errors
    ///
    /// - [`Error::UseAfterDispose`] if the function is stale.
    pub fn entry_block(&self) -> Result<Option<BasicBlock>> {
        if self.is_declaration()? {
            return Ok(None);
        }
        let get = native!(LLVMGetEntryBasicBlock: fn(RawPtr) -> RawPtr);
        borrowed_child_nullable(unsafe { get(self.raw()?) }, &self.object)
    }

    /// Appends a new basic block called `name` to the function.
    ///
    /// # Errors
    ///
    /// - [`Error::UseAfterDispose`] if the function is stale.
    pub fn append_basic_block(&self, name: &str) -> Result<BasicBlock> {
        self.as_value().context()?.append_basic_block(self, name)
    }

    /// Gets the calling convention of the function.
    ///
    /// # Errors
    ///
    /// - [`Error::UseAfterDispose`] if the function is stale.
    pub fn calling_convention(&self) -> Result<u32> {
        let get = native!(LLVMGetFunctionCallConv: fn(RawPtr) -> c_uint);
        Ok(unsafe { get(self.raw()?) })
    }

    /// Sets the calling convention of the function.
    ///
    /// # Errors
    ///
    /// - [`Error::UseAfterDispose`] if the function is stale.
    pub fn set_calling_convention(&self, convention: u32) -> Result<()> {
        let set = native!(LLVMSetFunctionCallConv: fn(RawPtr, c_uint));
        unsafe { set(self.raw()?, convention) };
        Ok(())
    }

    /// Gets the type of the function.
    ///
    /// # Errors
    ///
    /// - [`Error::UseAfterDispose`] if the function is stale.
    pub fn function_type(&self) -> Result<Type> {
        self.value_type()
    }

    /// Removes the function from its module and deletes it.
    ///
    /// The wrapper, and every other reference to it, is unusable afterwards.
    ///
    /// # Errors
    ///
    /// - [`Error::UseAfterDispose`] if the function is stale.
    pub fn delete(&self) -> Result<()> {
        let delete = native!(LLVMDeleteFunction: fn(RawPtr));
        let ptr = self.object.surrender()?;
        unsafe { delete(ptr) };
        Ok(())
    }
}

impl GlobalVariable {
    /// Gets the initializer of the global, if it has one.
    ///
    /// # Errors
    ///
    /// - [`Error::UseAfterDispose`] if the global is stale.
    pub fn initializer(&self) -> Result<Option<Value>> {
        let get = native!(LLVMGetInitializer: fn(RawPtr) -> RawPtr);
        borrowed_child_nullable(unsafe { get(self.raw()?) }, &self.object)
    }

    /// Sets the initializer of the global.
    ///
    /// # Errors
    ///
    /// - [`Error::UseAfterDispose`] if either value is stale.
    pub fn set_initializer(&self, value: &Value) -> Result<()> {
        let set = native!(LLVMSetInitializer: fn(RawPtr, RawPtr));
        unsafe { set(self.raw()?, value.raw()?) };
        Ok(())
    }

    /// Returns `true` if the global is a constant.
    ///
    /// # Errors
    ///
    /// - [`Error::UseAfterDispose`] if the global is stale.
    pub fn is_global_constant(&self) -> Result<bool> {
        let get = native!(LLVMIsGlobalConstant: fn(RawPtr) -> LLVMBool);
        Ok(unsafe { get(self.raw()?) }.into())
    }

    /// Marks the global as constant or not.
    ///
    /// # Errors
    ///
    /// - [`Error::UseAfterDispose`] if the global is stale.
    pub fn set_global_constant(&self, constant: bool) -> Result<()> {
        let set = native!(LLVMSetGlobalConstant: fn(RawPtr, LLVMBool));
        unsafe { set(self.raw()?, constant.into()) };
        Ok(())
    }
}

impl BasicBlock {
    /// Gets the block for a value that is known to be a basic block.
    ///
    /// # Errors
    ///
    /// - [`Error::UnexpectedKind`] if the value is not a basic block.
    pub fn from_value(value: &Value) -> Result<Self> {
        let ptr = value.expect_kind(ValueKind::BasicBlock, "basic block")?;
        let get = native!(LLVMValueAsBasicBlock: fn(RawPtr) -> RawPtr);
        borrowed_child(unsafe { get(ptr) }, value.object())
    }

    /// Gets the name of the block.
    ///
    /// # Errors
    ///
    /// - [`Error::CStrConversion`] if the name is not valid UTF-8.
    pub fn name(&self) -> Result<String> {
        let get = native!(LLVMGetBasicBlockName: fn(RawPtr) -> CStrPtr);
        unsafe { copy_c_str(get(self.raw()?)) }
    }

    /// Gets the function containing the block, if it has been inserted into
    /// one.
    ///
    /// # Errors
    ///
    /// - [`Error::UseAfterDispose`] if the block is stale.
    pub fn parent(&self) -> Result<Option<Function>> {
        let get = native!(LLVMGetBasicBlockParent: fn(RawPtr) -> RawPtr);
        borrowed_child_nullable(unsafe { get(self.raw()?) }, &self.object)
    }

    /// Gets the terminator of the block, if it has one.
    ///
    /// # Errors
    ///
    /// - [`Error::UseAfterDispose`] if the block is stale.
    pub fn terminator(&self) -> Result<Option<Value>> {
        let get = native!(LLVMGetBasicBlockTerminator: fn(RawPtr) -> RawPtr);
        borrowed_child_nullable(unsafe { get(self.raw()?) }, &self.object)
    }

    /// Iterates over the instructions in the block, in order.
    ///
    /// # Errors
    ///
    /// - [`Error::UseAfterDispose`] if the block is stale.
    pub fn instructions(&self) -> Result<NativeList<Value>> {
        let first = native!(LLVMGetFirstInstruction: fn(RawPtr) -> RawPtr);
        let next = native!(LLVMGetNextInstruction: fn(RawPtr) -> RawPtr);
        Ok(NativeList::new(unsafe { first(self.raw()?) }, next, &self.object))
    }

    /// Gets the value view of the block, e.g. for use as a branch target
    /// operand.
    ///
    /// # Errors
    ///
    /// - [`Error::UseAfterDispose`] if the block is stale.
    pub fn as_value(&self) -> Result<Value> {
        let get = native!(LLVMBasicBlockAsValue: fn(RawPtr) -> RawPtr);
        borrowed_child(unsafe { get(self.raw()?) }, &self.object)
    }
}

#[cfg(test)]
mod test {
    use llvmc_errors::binding::Error;

    use crate::ir::values::{Linkage, ValueCategory, ValueKind};

    #[test]
    fn value_kinds_decode_from_native_values() -> anyhow::Result<()> {
        assert_eq!(ValueKind::try_from(5)?, ValueKind::Function);
        assert_eq!(ValueKind::try_from(18)?, ValueKind::ConstantInt);
        assert_eq!(ValueKind::try_from(24)?, ValueKind::Instruction);
        assert!(matches!(
            ValueKind::try_from(-1),
            Err(Error::UnexpectedKind { expected: "value kind", .. })
        ));

        Ok(())
    }

    #[test]
    fn categories_group_value_kinds() {
        assert_eq!(ValueKind::Function.category(), ValueCategory::Function);
        assert_eq!(ValueKind::GlobalIFunc.category(), ValueCategory::GlobalAlias);
        assert_eq!(ValueKind::MemoryPhi.category(), ValueCategory::MemoryAccess);
        for constant in [
            ValueKind::ConstantInt,
            ValueKind::UndefValue,
            ValueKind::Poison,
            ValueKind::BlockAddress,
        ] {
            assert_eq!(constant.category(), ValueCategory::Constant);
        }
    }

    #[test]
    fn linkages_round_trip_through_their_native_value() -> anyhow::Result<()> {
        for raw in 0..=16 {
            let linkage = Linkage::try_from(raw)?;
            assert_eq!(i32::from(linkage), raw);
        }
        Ok(())
    }
}
