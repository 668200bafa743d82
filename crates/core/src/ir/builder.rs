//! The IR builder, which appends instructions at a chosen insertion point.
//!
//! Every value created by a builder records the basic block that the builder
//! was positioned in as its parent, which in turn keeps the function and
//! module containing it alive.

use std::ffi::{c_int, c_uint};

use llvmc_errors::binding::{Error, Result};

use crate::{
    handle::{native_disposer, native_wrapper, HandleType, NativeWrapper, Object, RawPtr},
    ir::{
        borrowed_child,
        borrowed_child_nullable,
        c_count,
        context::Context,
        types::Type,
        values::{BasicBlock, Function, GlobalValue, Value},
    },
    library::prototype::LLVMBool,
    message::{to_c_string, CStrPtr},
};

/// The name of the reference from a builder to its insertion block.
const BLOCK_REF: &str = "block";

/// The name of the reference from a builder to its context.
const CONTEXT_REF: &str = "context";

/// Integer comparison predicates, as used by `LLVMBuildICmp`.
#[derive(Clone, Copy, Debug, Eq, Hash, PartialEq)]
pub enum IntPredicate {
    Eq = 32,
    Ne,
    Ugt,
    Uge,
    Ult,
    Ule,
    Sgt,
    Sge,
    Slt,
    Sle,
}

/// Floating-point comparison predicates, as used by `LLVMBuildFCmp`.
#[derive(Clone, Copy, Debug, Eq, Hash, PartialEq)]
pub enum RealPredicate {
    False,
    Oeq,
    Ogt,
    Oge,
    Olt,
    Ole,
    One,
    Ord,
    Uno,
    Ueq,
    Ugt,
    Uge,
    Ult,
    Ule,
    Une,
    True,
}

native_wrapper! {
    /// An `LLVMBuilderRef`.
    pub struct Builder(Builder);
}

/// Generates builder methods for instructions taking two operands.
macro_rules! binary_ops {
    ($($(#[$meta:meta])* $method:ident => $symbol:ident;)*) => {
        $(
            $(#[$meta])*
            ///
            /// # Errors
            ///
            /// - [`Error::UseAfterDispose`] if the builder or an operand is stale.
            pub fn $method(&self, lhs: &Value, rhs: &Value, name: &str) -> Result<Value> {
                let build = native!($symbol: fn(RawPtr, RawPtr, RawPtr, CStrPtr) -> RawPtr);
                let name = to_c_string(name)?;
                let ptr = unsafe { build(self.raw()?, lhs.raw()?, rhs.raw()?, name.as_ptr()) };
                self.built(ptr)
            }
        )*
    };
}

/// Generates builder methods for instructions taking one operand.
macro_rules! unary_ops {
    ($($(#[$meta:meta])* $method:ident => $symbol:ident;)*) => {
        $(
            $(#[$meta])*
            ///
            /// # Errors
            ///
            /// - [`Error::UseAfterDispose`] if the builder or the operand is stale.
            pub fn $method(&self, value: &Value, name: &str) -> Result<Value> {
                let build = native!($symbol: fn(RawPtr, RawPtr, CStrPtr) -> RawPtr);
                let name = to_c_string(name)?;
                let ptr = unsafe { build(self.raw()?, value.raw()?, name.as_ptr()) };
                self.built(ptr)
            }
        )*
    };
}

/// Generates builder methods for casts to a destination type.
macro_rules! cast_ops {
    ($($(#[$meta:meta])* $method:ident => $symbol:ident;)*) => {
        $(
            $(#[$meta])*
            ///
            /// # Errors
            ///
            /// - [`Error::UseAfterDispose`] if the builder, value or type is stale.
            pub fn $method(&self, value: &Value, ty: &Type, name: &str) -> Result<Value> {
                let build = native!($symbol: fn(RawPtr, RawPtr, RawPtr, CStrPtr) -> RawPtr);
                let name = to_c_string(name)?;
                let ptr = unsafe { build(self.raw()?, value.raw()?, ty.raw()?, name.as_ptr()) };
                self.built(ptr)
            }
        )*
    };
}

impl Builder {
    /// Creates a builder for `context` with no insertion point.
    ///
    /// # Errors
    ///
    /// - [`Error::UseAfterDispose`] if the context has been disposed.
    pub fn new(context: &Context) -> Result<Self> {
        let dispose = native!(LLVMDisposeBuilder: fn(RawPtr));
        let create = native!(LLVMCreateBuilderInContext: fn(RawPtr) -> RawPtr);
        let ptr = unsafe { create(context.raw()?) };
        let object = Object::wrap(HandleType::Builder, ptr, native_disposer(dispose))?;
        object.set_ref(CONTEXT_REF, context.object());
        Ok(Self::from_object(object))
    }

    /// Creates a builder positioned at the end of `block`.
    ///
    /// # Errors
    ///
    /// - [`Error::UseAfterDispose`] if the block is stale.
    pub fn at_end(block: &BasicBlock) -> Result<Self> {
        let context = block.as_value()?.context()?;
        let builder = Self::new(&context)?;
        builder.position_at_end(block)?;
        Ok(builder)
    }

    fn built(&self, ptr: RawPtr) -> Result<Value> {
        // Values outlive the builder, so they hang off the block or context.
        let parent = self
            .object
            .get_ref(BLOCK_REF)
            .or_else(|| self.object.get_ref(CONTEXT_REF))
            .unwrap_or_else(|| self.object.clone());
        borrowed_child(ptr, &parent)
    }

    // Positioning

    /// Moves the insertion point to the end of `block`.
    ///
    /// # Errors
    ///
    /// - [`Error::UseAfterDispose`] if the builder or block is stale.
    pub fn position_at_end(&self, block: &BasicBlock) -> Result<()> {
        let position = native!(LLVMPositionBuilderAtEnd: fn(RawPtr, RawPtr));
        unsafe { position(self.raw()?, block.raw()?) };
        self.object.set_ref(BLOCK_REF, block.object());
        Ok(())
    }

    /// Moves the insertion point to just before `instruction`.
    ///
    /// # Errors
    ///
    /// - [`Error::UseAfterDispose`] if the builder or instruction is stale.
    pub fn position_before(&self, instruction: &Value) -> Result<()> {
        let position = native!(LLVMPositionBuilderBefore: fn(RawPtr, RawPtr));
        let parent = native!(LLVMGetInstructionParent: fn(RawPtr) -> RawPtr);
        unsafe { position(self.raw()?, instruction.raw()?) };

        let block: Option<BasicBlock> =
            borrowed_child_nullable(unsafe { parent(instruction.raw()?) }, instruction.object())?;
        if let Some(block) = block {
            self.object.set_ref(BLOCK_REF, block.object());
        }
        Ok(())
    }

    /// Clears the insertion point.
    ///
    /// # Errors
    ///
    /// - [`Error::UseAfterDispose`] if the builder is stale.
    pub fn clear_position(&self) -> Result<()> {
        let clear = native!(LLVMClearInsertionPosition: fn(RawPtr));
        unsafe { clear(self.raw()?) };
        Ok(())
    }

    /// Gets the block the builder is inserting into, if it is positioned.
    ///
    /// # Errors
    ///
    /// - [`Error::UseAfterDispose`] if the builder is stale.
    pub fn insert_block(&self) -> Result<Option<BasicBlock>> {
        let get = native!(LLVMGetInsertBlock: fn(RawPtr) -> RawPtr);
        let parent = self.object.get_ref(CONTEXT_REF).unwrap_or_else(|| self.object.clone());
        borrowed_child_nullable(unsafe { get(self.raw()?) }, &parent)
    }

    /// Inserts an instruction that was created without a parent at the
    /// insertion point.
    ///
    /// # Errors
    ///
    /// - [`Error::UseAfterDispose`] if the builder or instruction is stale.
    pub fn insert(&self, instruction: &Value) -> Result<()> {
        let insert = native!(LLVMInsertIntoBuilder: fn(RawPtr, RawPtr));
        unsafe { insert(self.raw()?, instruction.raw()?) };
        Ok(())
    }

    // Terminators

    /// Builds `ret <value>`.
    ///
    /// # Errors
    ///
    /// - [`Error::UseAfterDispose`] if the builder or value is stale.
    pub fn ret(&self, value: &Value) -> Result<Value> {
        let build = native!(LLVMBuildRet: fn(RawPtr, RawPtr) -> RawPtr);
        let ptr = unsafe { build(self.raw()?, value.raw()?) };
        self.built(ptr)
    }

    /// Builds `ret void`.
    ///
    /// # Errors
    ///
    /// - [`Error::UseAfterDispose`] if the builder is stale.
    pub fn ret_void(&self) -> Result<Value> {
        let build = native!(LLVMBuildRetVoid: fn(RawPtr) -> RawPtr);
        let ptr = unsafe { build(self.raw()?) };
        self.built(ptr)
    }

    /// Builds an unconditional branch to `dest`.
    ///
    /// # Errors
    ///
    /// - [`Error::UseAfterDispose`] if the builder or block is stale.
    pub fn br(&self, dest: &BasicBlock) -> Result<Value> {
        let build = native!(LLVMBuildBr: fn(RawPtr, RawPtr) -> RawPtr);
        let ptr = unsafe { build(self.raw()?, dest.raw()?) };
        self.built(ptr)
    }

    /// Builds a conditional branch on `condition`.
    ///
    /// # Errors
    ///
    /// - [`Error::UseAfterDispose`] if the builder or an operand is stale.
    pub fn cond_br(
        &self,
        condition: &Value,
        then_block: &BasicBlock,
        else_block: &BasicBlock,
    ) -> Result<Value> {
        let build = native!(LLVMBuildCondBr: fn(RawPtr, RawPtr, RawPtr, RawPtr) -> RawPtr);
        let ptr = unsafe {
            build(
                self.raw()?,
                condition.raw()?,
                then_block.raw()?,
                else_block.raw()?,
            )
        };
        self.built(ptr)
    }

    /// Builds a `switch` on `value`, with space reserved for `case_count`
    /// cases. Cases are added with [`Self::add_case`].
    ///
    /// # Errors
    ///
    /// - [`Error::UseAfterDispose`] if the builder or an operand is stale.
    pub fn switch(&self, value: &Value, default: &BasicBlock, case_count: u32) -> Result<Value> {
        let build = native!(LLVMBuildSwitch: fn(RawPtr, RawPtr, RawPtr, c_uint) -> RawPtr);
        let ptr = unsafe { build(self.raw()?, value.raw()?, default.raw()?, case_count) };
        self.built(ptr)
    }

    /// Adds a case to a `switch` built by [`Self::switch`].
    ///
    /// # Errors
    ///
    /// - [`Error::UseAfterDispose`] if an operand is stale.
    pub fn add_case(&self, switch: &Value, on: &Value, dest: &BasicBlock) -> Result<()> {
        let add = native!(LLVMAddCase: fn(RawPtr, RawPtr, RawPtr));
        unsafe { add(switch.raw()?, on.raw()?, dest.raw()?) };
        Ok(())
    }

    /// Builds `unreachable`.
    ///
    /// # Errors
    ///
    /// - [`Error::UseAfterDispose`] if the builder is stale.
    pub fn unreachable(&self) -> Result<Value> {
        let build = native!(LLVMBuildUnreachable: fn(RawPtr) -> RawPtr);
        let ptr = unsafe { build(self.raw()?) };
        self.built(ptr)
    }

    // Arithmetic

    binary_ops! {
        /// Builds an integer `add`.
        add => LLVMBuildAdd;
        /// Builds an `add nsw`.
        nsw_add => LLVMBuildNSWAdd;
        /// Builds an `add nuw`.
        nuw_add => LLVMBuildNUWAdd;
        /// Builds an `fadd`.
        fadd => LLVMBuildFAdd;
        /// Builds an integer `sub`.
        sub => LLVMBuildSub;
        /// Builds a `sub nsw`.
        nsw_sub => LLVMBuildNSWSub;
        /// Builds a `sub nuw`.
        nuw_sub => LLVMBuildNUWSub;
        /// Builds an `fsub`.
        fsub => LLVMBuildFSub;
        /// Builds an integer `mul`.
        mul => LLVMBuildMul;
        /// Builds a `mul nsw`.
        nsw_mul => LLVMBuildNSWMul;
        /// Builds a `mul nuw`.
        nuw_mul => LLVMBuildNUWMul;
        /// Builds an `fmul`.
        fmul => LLVMBuildFMul;
        /// Builds a `udiv`.
        udiv => LLVMBuildUDiv;
        /// Builds an `sdiv`.
        sdiv => LLVMBuildSDiv;
        /// Builds an `sdiv exact`.
        exact_sdiv => LLVMBuildExactSDiv;
        /// Builds an `fdiv`.
        fdiv => LLVMBuildFDiv;
        /// Builds a `urem`.
        urem => LLVMBuildURem;
        /// Builds an `srem`.
        srem => LLVMBuildSRem;
        /// Builds an `frem`.
        frem => LLVMBuildFRem;
        /// Builds a `shl`.
        shl => LLVMBuildShl;
        /// Builds an `lshr`.
        lshr => LLVMBuildLShr;
        /// Builds an `ashr`.
        ashr => LLVMBuildAShr;
        /// Builds a bitwise `and`.
        and => LLVMBuildAnd;
        /// Builds a bitwise `or`.
        or => LLVMBuildOr;
        /// Builds a bitwise `xor`.
        xor => LLVMBuildXor;
    }

    unary_ops! {
        /// Builds an integer negation.
        neg => LLVMBuildNeg;
        /// Builds a bitwise complement.
        not => LLVMBuildNot;
        /// Builds an `fneg`.
        fneg => LLVMBuildFNeg;
    }

    // Casts

    cast_ops! {
        /// Builds a `trunc`.
        trunc => LLVMBuildTrunc;
        /// Builds a `zext`.
        zext => LLVMBuildZExt;
        /// Builds a `sext`.
        sext => LLVMBuildSExt;
        /// Builds an `fptoui`.
        fptoui => LLVMBuildFPToUI;
        /// Builds an `fptosi`.
        fptosi => LLVMBuildFPToSI;
        /// Builds a `uitofp`.
        uitofp => LLVMBuildUIToFP;
        /// Builds a `sitofp`.
        sitofp => LLVMBuildSIToFP;
        /// Builds an `fptrunc`.
        fptrunc => LLVMBuildFPTrunc;
        /// Builds an `fpext`.
        fpext => LLVMBuildFPExt;
        /// Builds a `ptrtoint`.
        ptrtoint => LLVMBuildPtrToInt;
        /// Builds an `inttoptr`.
        inttoptr => LLVMBuildIntToPtr;
        /// Builds a `bitcast`.
        bitcast => LLVMBuildBitCast;
        /// Builds whichever pointer cast is appropriate for `ty`.
        pointer_cast => LLVMBuildPointerCast;
        /// Builds whichever floating-point cast is appropriate for `ty`.
        fp_cast => LLVMBuildFPCast;
    }

    /// Builds whichever integer cast is appropriate to convert `value` to
    /// `ty`, treating `value` as signed if `signed` is set.
    ///
    /// # Errors
    ///
    /// - [`Error::UseAfterDispose`] if the builder, value or type is stale.
    pub fn int_cast(&self, value: &Value, ty: &Type, signed: bool, name: &str) -> Result<Value> {
        let build = native!(LLVMBuildIntCast2: fn(RawPtr, RawPtr, RawPtr, LLVMBool, CStrPtr) -> RawPtr);
        let name = to_c_string(name)?;
        let ptr = unsafe { build(self.raw()?, value.raw()?, ty.raw()?, signed.into(), name.as_ptr()) };
        self.built(ptr)
    }

    // Comparisons

    /// Builds an `icmp`.
    ///
    /// # Errors
    ///
    /// - [`Error::UseAfterDispose`] if the builder or an operand is stale.
    pub fn icmp(&self, predicate: IntPredicate, lhs: &Value, rhs: &Value, name: &str) -> Result<Value> {
        let build = native!(LLVMBuildICmp: fn(RawPtr, c_int, RawPtr, RawPtr, CStrPtr) -> RawPtr);
        let name = to_c_string(name)?;
        let ptr = unsafe {
            build(self.raw()?, predicate as c_int, lhs.raw()?, rhs.raw()?, name.as_ptr())
        };
        self.built(ptr)
    }

    /// Builds an `fcmp`.
    ///
    /// # Errors
    ///
    /// - [`Error::UseAfterDispose`] if the builder or an operand is stale.
    pub fn fcmp(&self, predicate: RealPredicate, lhs: &Value, rhs: &Value, name: &str) -> Result<Value> {
        let build = native!(LLVMBuildFCmp: fn(RawPtr, c_int, RawPtr, RawPtr, CStrPtr) -> RawPtr);
        let name = to_c_string(name)?;
        let ptr = unsafe {
            build(self.raw()?, predicate as c_int, lhs.raw()?, rhs.raw()?, name.as_ptr())
        };
        self.built(ptr)
    }

    // Miscellaneous

    /// Builds an empty `phi` of type `ty`. Incoming values are added with
    /// [`Self::add_incoming`].
    ///
    /// # Errors
    ///
    /// - [`Error::UseAfterDispose`] if the builder or type is stale.
    pub fn phi(&self, ty: &Type, name: &str) -> Result<Value> {
        let build = native!(LLVMBuildPhi: fn(RawPtr, RawPtr, CStrPtr) -> RawPtr);
        let name = to_c_string(name)?;
        let ptr = unsafe { build(self.raw()?, ty.raw()?, name.as_ptr()) };
        self.built(ptr)
    }

    /// Adds incoming `(value, block)` pairs to `phi`.
    ///
    /// # Errors
    ///
    /// - [`Error::UseAfterDispose`] if any operand is stale.
    pub fn add_incoming(&self, phi: &Value, incoming: &[(Value, BasicBlock)]) -> Result<()> {
        let add = native!(LLVMAddIncoming: fn(RawPtr, *mut RawPtr, *mut RawPtr, c_uint));
        let mut values = incoming
            .iter()
            .map(|(v, _)| v.raw())
            .collect::<Result<Vec<_>>>()?;
        let mut blocks = incoming
            .iter()
            .map(|(_, b)| b.raw())
            .collect::<Result<Vec<_>>>()?;
        let count = c_count(incoming.len())?;
        unsafe { add(phi.raw()?, values.as_mut_ptr(), blocks.as_mut_ptr(), count) };
        Ok(())
    }

    /// Builds a call to `function` with `args`.
    ///
    /// # Errors
    ///
    /// - [`Error::UseAfterDispose`] if the builder or an operand is stale.
    pub fn call(&self, function: &Function, args: &[Value], name: &str) -> Result<Value> {
        let function_type = function.function_type()?;
        self.call_indirect(&function_type, &function.as_value(), args, name)
    }

    /// Builds a call through `callee`, which has type `function_type`.
    ///
    /// # Errors
    ///
    /// - [`Error::UnexpectedKind`] if `function_type` is not a function type.
    pub fn call_indirect(
        &self,
        function_type: &Type,
        callee: &Value,
        args: &[Value],
        name: &str,
    ) -> Result<Value> {
        function_type.return_type()?;
        let build = native!(LLVMBuildCall2: fn(RawPtr, RawPtr, RawPtr, *mut RawPtr, c_uint, CStrPtr) -> RawPtr);
        let mut raw_args = args.iter().map(Value::raw).collect::<Result<Vec<_>>>()?;
        let count = c_count(raw_args.len())?;
        let name = to_c_string(name)?;
        let ptr = unsafe {
            build(
                self.raw()?,
                function_type.raw()?,
                callee.raw()?,
                raw_args.as_mut_ptr(),
                count,
                name.as_ptr(),
            )
        };
        self.built(ptr)
    }

    /// Builds an `alloca` of `ty`.
    ///
    /// # Errors
    ///
    /// - [`Error::UseAfterDispose`] if the builder or type is stale.
    pub fn alloca(&self, ty: &Type, name: &str) -> Result<Value> {
        let build = native!(LLVMBuildAlloca: fn(RawPtr, RawPtr, CStrPtr) -> RawPtr);
        let name = to_c_string(name)?;
        let ptr = unsafe { build(self.raw()?, ty.raw()?, name.as_ptr()) };
        self.built(ptr)
    }

    /// Builds a `load` of a `ty` from `pointer`.
    ///
    /// # Errors
    ///
    /// - [`Error::UseAfterDispose`] if the builder or an operand is stale.
    pub fn load(&self, ty: &Type, pointer: &Value, name: &str) -> Result<Value> {
        let build = native!(LLVMBuildLoad2: fn(RawPtr, RawPtr, RawPtr, CStrPtr) -> RawPtr);
        let name = to_c_string(name)?;
        let ptr = unsafe { build(self.raw()?, ty.raw()?, pointer.raw()?, name.as_ptr()) };
        self.built(ptr)
    }

    /// Builds a `store` of `value` to `pointer`.
    ///
    /// # Errors
    ///
    /// - [`Error::UseAfterDispose`] if the builder or an operand is stale.
    pub fn store(&self, value: &Value, pointer: &Value) -> Result<Value> {
        let build = native!(LLVMBuildStore: fn(RawPtr, RawPtr, RawPtr) -> RawPtr);
        let ptr = unsafe { build(self.raw()?, value.raw()?, pointer.raw()?) };
        self.built(ptr)
    }

    /// Builds a `select`.
    ///
    /// # Errors
    ///
    /// - [`Error::UseAfterDispose`] if the builder or an operand is stale.
    pub fn select(&self, condition: &Value, then_value: &Value, else_value: &Value, name: &str) -> Result<Value> {
        let build = native!(LLVMBuildSelect: fn(RawPtr, RawPtr, RawPtr, RawPtr, CStrPtr) -> RawPtr);
        let name = to_c_string(name)?;
        let ptr = unsafe {
            build(
                self.raw()?,
                condition.raw()?,
                then_value.raw()?,
                else_value.raw()?,
                name.as_ptr(),
            )
        };
        self.built(ptr)
    }

    /// Builds a `getelementptr` into `pointer`, which points at a `ty`.
    ///
    /// # Errors
    ///
    /// - [`Error::UseAfterDispose`] if the builder or an operand is stale.
    pub fn gep(&self, ty: &Type, pointer: &Value, indices: &[Value], name: &str) -> Result<Value> {
        let build = native!(LLVMBuildGEP2: fn(RawPtr, RawPtr, RawPtr, *mut RawPtr, c_uint, CStrPtr) -> RawPtr);
        let mut raw_indices = indices.iter().map(Value::raw).collect::<Result<Vec<_>>>()?;
        let count = c_count(raw_indices.len())?;
        let name = to_c_string(name)?;
        let ptr = unsafe {
            build(
                self.raw()?,
                ty.raw()?,
                pointer.raw()?,
                raw_indices.as_mut_ptr(),
                count,
                name.as_ptr(),
            )
        };
        self.built(ptr)
    }

    /// Builds a `getelementptr` to field `index` of the struct of type
    /// `struct_type` at `pointer`.
    ///
    /// # Errors
    ///
    /// - [`Error::UnexpectedKind`] if `struct_type` is not a struct type.
    pub fn struct_gep(&self, struct_type: &Type, pointer: &Value, index: u32, name: &str) -> Result<Value> {
        struct_type.is_packed()?;
        let build = native!(LLVMBuildStructGEP2: fn(RawPtr, RawPtr, RawPtr, c_uint, CStrPtr) -> RawPtr);
        let name = to_c_string(name)?;
        let ptr = unsafe {
            build(self.raw()?, struct_type.raw()?, pointer.raw()?, index, name.as_ptr())
        };
        self.built(ptr)
    }

    /// Builds a private global holding `text` and returns a pointer to it.
    ///
    /// This requires the builder to be positioned inside a function.
    ///
    /// # Errors
    ///
    /// - [`Error::NativeOperation`] if the builder has no insertion point.
    pub fn global_string_ptr(&self, text: &str, name: &str) -> Result<Value> {
        if self.insert_block()?.is_none() {
            return Err(Error::NativeOperation(
                "Cannot build a global string without an insertion point".to_string(),
            ));
        }
        let build = native!(LLVMBuildGlobalStringPtr: fn(RawPtr, CStrPtr, CStrPtr) -> RawPtr);
        let text = to_c_string(text)?;
        let name = to_c_string(name)?;
        let ptr = unsafe { build(self.raw()?, text.as_ptr(), name.as_ptr()) };
        self.built(ptr)
    }
}

#[cfg(test)]
mod test {
    use std::ffi::c_int;

    use crate::ir::builder::{IntPredicate, RealPredicate};

    #[test]
    fn predicates_have_native_values() {
        assert_eq!(IntPredicate::Eq as c_int, 32);
        assert_eq!(IntPredicate::Sle as c_int, 41);
        assert_eq!(RealPredicate::False as c_int, 0);
        assert_eq!(RealPredicate::True as c_int, 15);
    }
}
