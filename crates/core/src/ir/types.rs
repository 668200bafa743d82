//! LLVM types, which are uniqued within and owned by their context.

use std::ffi::{c_int, c_uint};

use llvmc_errors::binding::{Error, Result};
use once_cell::unsync::OnceCell;

use crate::{
    handle::{HandleType, NativeWrapper, Object, RawPtr},
    ir::{borrowed_child, c_count, context::Context, values::Value, PARENT_REF},
    library::prototype::LLVMBool,
    message::{copy_c_str, take_message, CStrPtr, OwnedCStrPtr},
};

/// The kinds of type in the IR, as returned by `LLVMGetTypeKind`.
#[derive(Clone, Copy, Debug, Eq, Hash, PartialEq)]
pub enum TypeKind {
    Void,
    Half,
    Float,
    Double,
    X86Fp80,
    Fp128,
    PpcFp128,
    Label,
    Integer,
    Function,
    Struct,
    Array,
    Pointer,
    Vector,
    Metadata,
    X86Mmx,
    Token,
    ScalableVector,
    BFloat,
    X86Amx,
    TargetExt,
}

impl TypeKind {
    /// Returns `true` for the floating-point kinds.
    #[must_use]
    pub fn is_floating_point(self) -> bool {
        matches!(
            self,
            Self::Half | Self::BFloat | Self::Float | Self::Double | Self::X86Fp80 | Self::Fp128 | Self::PpcFp128
        )
    }
}

impl TryFrom<c_int> for TypeKind {
    type Error = Error;

    fn try_from(value: c_int) -> Result<Self> {
        let kind = match value {
            0 => Self::Void,
            1 => Self::Half,
            2 => Self::Float,
            3 => Self::Double,
            4 => Self::X86Fp80,
            5 => Self::Fp128,
            6 => Self::PpcFp128,
            7 => Self::Label,
            8 => Self::Integer,
            9 => Self::Function,
            10 => Self::Struct,
            11 => Self::Array,
            12 => Self::Pointer,
            13 => Self::Vector,
            14 => Self::Metadata,
            15 => Self::X86Mmx,
            16 => Self::Token,
            17 => Self::ScalableVector,
            18 => Self::BFloat,
            19 => Self::X86Amx,
            20 => Self::TargetExt,
            other => {
                return Err(Error::UnexpectedKind {
                    expected: "type kind",
                    found:    other.to_string(),
                })
            }
        };
        Ok(kind)
    }
}

/// An `LLVMTypeRef`.
///
/// Types are never disposed by the bindings, as they belong to their context.
/// Each type keeps its context alive.
#[derive(Clone, Debug)]
pub struct Type {
    object: Object,
    kind:   OnceCell<TypeKind>,
}

impl PartialEq for Type {
    fn eq(&self, other: &Self) -> bool {
        self.object == other.object
    }
}

impl Eq for Type {}

impl NativeWrapper for Type {
    const HANDLE_TYPE: HandleType = HandleType::Type;

    fn from_object(object: Object) -> Self {
        Self {
            object,
            kind: OnceCell::new(),
        }
    }

    fn object(&self) -> &Object {
        &self.object
    }
}

impl Type {
    /// Wraps a type handle that belongs to `context`.
    ///
    /// # Errors
    ///
    /// - [`Error::InvalidHandle`] if `ptr` is null.
    pub fn from_raw(ptr: RawPtr, context: &Context) -> Result<Self> {
        borrowed_child(ptr, context.object())
    }

    /// Wraps a type handle, discovering its context from LLVM.
    ///
    /// # Errors
    ///
    /// - [`Error::InvalidHandle`] if `ptr` is null.
    pub fn from_raw_in_own_context(ptr: RawPtr) -> Result<Self> {
        let object = Object::borrowed(HandleType::Type, ptr)?;
        if object.get_ref(PARENT_REF).is_none() {
            let context = context_of(ptr)?;
            object.set_ref(PARENT_REF, context.object());
            context.object().add_dependent(&object);
        }
        Ok(Self::from_object(object))
    }

    /// Gets the kind of this type.
    ///
    /// # Errors
    ///
    /// - [`Error::UnexpectedKind`] if LLVM reports a kind that we do not know.
    pub fn kind(&self) -> Result<TypeKind> {
        self.kind
            .get_or_try_init(|| {
                let get = native!(LLVMGetTypeKind: fn(RawPtr) -> c_int);
                TypeKind::try_from(unsafe { get(self.raw()?) })
            })
            .copied()
    }

    /// Gets the context that owns this type.
    ///
    /// # Errors
    ///
    /// - [`Error::UseAfterDispose`] if the type's context has been disposed.
    pub fn context(&self) -> Result<Context> {
        context_of(self.raw()?)
    }

    /// Returns `true` if values of this type have a size.
    ///
    /// # Errors
    ///
    /// - [`Error::UseAfterDispose`] if the type's context has been disposed.
    pub fn is_sized(&self) -> Result<bool> {
        let get = native!(LLVMTypeIsSized: fn(RawPtr) -> LLVMBool);
        Ok(unsafe { get(self.raw()?) }.into())
    }

    /// Renders the type as textual IR.
    ///
    /// # Errors
    ///
    /// - [`Error::CStrConversion`] if the text is not valid UTF-8.
    pub fn print_to_string(&self) -> Result<String> {
        let print = native!(LLVMPrintTypeToString: fn(RawPtr) -> OwnedCStrPtr);
        unsafe { take_message(print(self.raw()?)) }
    }

    pub(crate) fn expect(&self, expected: &'static str, kinds: &[TypeKind]) -> Result<RawPtr> {
        let kind = self.kind()?;
        if kinds.contains(&kind) {
            self.raw()
        } else {
            Err(Error::UnexpectedKind {
                expected,
                found: format!("{kind:?}"),
            })
        }
    }

    fn related(&self, ptr: RawPtr) -> Result<Type> {
        match self.object.get_ref(PARENT_REF) {
            Some(parent) => borrowed_child(ptr, &parent),
            None => Self::from_raw_in_own_context(ptr),
        }
    }

    /// Gets the width in bits of an integer type.
    ///
    /// # Errors
    ///
    /// - [`Error::UnexpectedKind`] if this is not an integer type.
    pub fn int_width(&self) -> Result<u32> {
        let ptr = self.expect("integer type", &[TypeKind::Integer])?;
        let get = native!(LLVMGetIntTypeWidth: fn(RawPtr) -> c_uint);
        Ok(unsafe { get(ptr) })
    }

    /// Creates the type of a function returning this type.
    ///
    /// # Errors
    ///
    /// - [`Error::UseAfterDispose`] if any of the types are stale.
    pub fn function_type(&self, params: &[Type], var_arg: bool) -> Result<Type> {
        let create = native!(LLVMFunctionType: fn(RawPtr, *mut RawPtr, c_uint, LLVMBool) -> RawPtr);
        let mut raw = params.iter().map(Type::raw).collect::<Result<Vec<_>>>()?;
        let count = c_count(raw.len())?;
        let ptr = unsafe { create(self.raw()?, raw.as_mut_ptr(), count, var_arg.into()) };
        self.related(ptr)
    }

    /// Gets the return type of a function type.
    ///
    /// # Errors
    ///
    /// - [`Error::UnexpectedKind`] if this is not a function type.
    pub fn return_type(&self) -> Result<Type> {
        let ptr = self.expect("function type", &[TypeKind::Function])?;
        let get = native!(LLVMGetReturnType: fn(RawPtr) -> RawPtr);
        self.related(unsafe { get(ptr) })
    }

    /// Gets the parameter types of a function type.
    ///
    /// # Errors
    ///
    /// - [`Error::UnexpectedKind`] if this is not a function type.
    pub fn param_types(&self) -> Result<Vec<Type>> {
        let ptr = self.expect("function type", &[TypeKind::Function])?;
        let count = native!(LLVMCountParamTypes: fn(RawPtr) -> c_uint);
        let get = native!(LLVMGetParamTypes: fn(RawPtr, *mut RawPtr));

        let mut raw = vec![std::ptr::null_mut(); unsafe { count(ptr) } as usize];
        unsafe { get(ptr, raw.as_mut_ptr()) };
        raw.into_iter().map(|p| self.related(p)).collect()
    }

    /// Returns `true` if a function type takes variadic arguments.
    ///
    /// # Errors
    ///
    /// - [`Error::UnexpectedKind`] if this is not a function type.
    pub fn is_var_arg(&self) -> Result<bool> {
        let ptr = self.expect("function type", &[TypeKind::Function])?;
        let get = native!(LLVMIsFunctionVarArg: fn(RawPtr) -> LLVMBool);
        Ok(unsafe { get(ptr) }.into())
    }

    /// Gets the name of a struct type, or [`None`] for a literal struct.
    ///
    /// # Errors
    ///
    /// - [`Error::UnexpectedKind`] if this is not a struct type.
    pub fn struct_name(&self) -> Result<Option<String>> {
        let ptr = self.expect("struct type", &[TypeKind::Struct])?;
        let get = native!(LLVMGetStructName: fn(RawPtr) -> CStrPtr);
        let name = unsafe { get(ptr) };
        if name.is_null() {
            Ok(None)
        } else {
            unsafe { copy_c_str(name) }.map(Some)
        }
    }

    /// Gets the element types of a struct type.
    ///
    /// # Errors
    ///
    /// - [`Error::UnexpectedKind`] if this is not a struct type.
    pub fn element_types(&self) -> Result<Vec<Type>> {
        let ptr = self.expect("struct type", &[TypeKind::Struct])?;
        let count = native!(LLVMCountStructElementTypes: fn(RawPtr) -> c_uint);
        let get = native!(LLVMGetStructElementTypes: fn(RawPtr, *mut RawPtr));

        let mut raw = vec![std::ptr::null_mut(); unsafe { count(ptr) } as usize];
        unsafe { get(ptr, raw.as_mut_ptr()) };
        raw.into_iter().map(|p| self.related(p)).collect()
    }

    /// Sets the body of an opaque named struct type.
    ///
    /// # Errors
    ///
    /// - [`Error::UnexpectedKind`] if this is not a struct type.
    pub fn set_body(&self, elements: &[Type], packed: bool) -> Result<()> {
        let ptr = self.expect("struct type", &[TypeKind::Struct])?;
        let set = native!(LLVMStructSetBody: fn(RawPtr, *mut RawPtr, c_uint, LLVMBool));
        let mut raw = elements.iter().map(Type::raw).collect::<Result<Vec<_>>>()?;
        let count = c_count(raw.len())?;
        unsafe { set(ptr, raw.as_mut_ptr(), count, packed.into()) };
        Ok(())
    }

    /// Returns `true` if a struct type is packed.
    ///
    /// # Errors
    ///
    /// - [`Error::UnexpectedKind`] if this is not a struct type.
    pub fn is_packed(&self) -> Result<bool> {
        let ptr = self.expect("struct type", &[TypeKind::Struct])?;
        let get = native!(LLVMIsPackedStruct: fn(RawPtr) -> LLVMBool);
        Ok(unsafe { get(ptr) }.into())
    }

    /// Returns `true` if a struct type has no body.
    ///
    /// # Errors
    ///
    /// - [`Error::UnexpectedKind`] if this is not a struct type.
    pub fn is_opaque(&self) -> Result<bool> {
        let ptr = self.expect("struct type", &[TypeKind::Struct])?;
        let get = native!(LLVMIsOpaqueStruct: fn(RawPtr) -> LLVMBool);
        Ok(unsafe { get(ptr) }.into())
    }

    /// Creates an array of `count` elements of this type.
    ///
    /// # Errors
    ///
    /// - [`Error::UseAfterDispose`] if the type is stale.
    pub fn array_type(&self, count: u32) -> Result<Type> {
        let create = native!(LLVMArrayType: fn(RawPtr, c_uint) -> RawPtr);
        self.related(unsafe { create(self.raw()?, count) })
    }

    /// Creates a vector of `count` elements of this type.
    ///
    /// # Errors
    ///
    /// - [`Error::UseAfterDispose`] if the type is stale.
    pub fn vector_type(&self, count: u32) -> Result<Type> {
        let create = native!(LLVMVectorType: fn(RawPtr, c_uint) -> RawPtr);
        self.related(unsafe { create(self.raw()?, count) })
    }

    /// Gets the element type of an array or vector type.
    ///
    /// # Errors
    ///
    /// - [`Error::UnexpectedKind`] if this is not an array or vector type.
    pub fn element_type(&self) -> Result<Type> {
        let ptr = self.expect(
            "array or vector type",
            &[TypeKind::Array, TypeKind::Vector, TypeKind::ScalableVector],
        )?;
        let get = native!(LLVMGetElementType: fn(RawPtr) -> RawPtr);
        self.related(unsafe { get(ptr) })
    }

    /// Gets the number of elements in an array or vector type.
    ///
    /// # Errors
    ///
    /// - [`Error::UnexpectedKind`] if this is not an array or vector type.
    pub fn length(&self) -> Result<u32> {
        let ptr = self.expect(
            "array or vector type",
            &[TypeKind::Array, TypeKind::Vector, TypeKind::ScalableVector],
        )?;
        if self.kind()? == TypeKind::Array {
            let get = native!(LLVMGetArrayLength: fn(RawPtr) -> c_uint);
            Ok(unsafe { get(ptr) })
        } else {
            let get = native!(LLVMGetVectorSize: fn(RawPtr) -> c_uint);
            Ok(unsafe { get(ptr) })
        }
    }

    /// Gets the address space of a pointer type.
    ///
    /// # Errors
    ///
    /// - [`Error::UnexpectedKind`] if this is not a pointer type.
    pub fn address_space(&self) -> Result<u32> {
        let ptr = self.expect("pointer type", &[TypeKind::Pointer])?;
        let get = native!(LLVMGetPointerAddressSpace: fn(RawPtr) -> c_uint);
        Ok(unsafe { get(ptr) })
    }

    /// Creates an integer constant of this type.
    ///
    /// # Errors
    ///
    /// - [`Error::UnexpectedKind`] if this is not an integer type.
    pub fn const_int(&self, value: u64, sign_extend: bool) -> Result<Value> {
        let ptr = self.expect("integer type", &[TypeKind::Integer])?;
        let create = native!(LLVMConstInt: fn(RawPtr, u64, LLVMBool) -> RawPtr);
        borrowed_child(unsafe { create(ptr, value, sign_extend.into()) }, &self.object)
    }

    /// Creates a floating-point constant of this type.
    ///
    /// # Errors
    ///
    /// - [`Error::UnexpectedKind`] if this is not a floating-point type.
    pub fn const_real(&self, value: f64) -> Result<Value> {
        let kind = self.kind()?;
        if !kind.is_floating_point() {
            return Err(Error::UnexpectedKind {
                expected: "floating-point type",
                found:    format!("{kind:?}"),
            });
        }
        let create = native!(LLVMConstReal: fn(RawPtr, f64) -> RawPtr);
        borrowed_child(unsafe { create(self.raw()?, value) }, &self.object)
    }

    /// Creates the all-zeroes constant of this type.
    ///
    /// # Errors
    ///
    /// - [`Error::UseAfterDispose`] if the type is stale.
    pub fn const_null(&self) -> Result<Value> {
        let create = native!(LLVMConstNull: fn(RawPtr) -> RawPtr);
        borrowed_child(unsafe { create(self.raw()?) }, &self.object)
    }

    /// Creates an `undef` value of this type.
    ///
    /// # Errors
    ///
    /// - [`Error::UseAfterDispose`] if the type is stale.
    pub fn undef(&self) -> Result<Value> {
        let create = native!(LLVMGetUndef: fn(RawPtr) -> RawPtr);
        borrowed_child(unsafe { create(self.raw()?) }, &self.object)
    }
}

fn context_of(ty: RawPtr) -> Result<Context> {
    let get = native!(LLVMGetTypeContext: fn(RawPtr) -> RawPtr);
    Context::from_raw(unsafe { get(ty) })
}

#[cfg(test)]
mod test {
    use llvmc_errors::binding::Error;

    use crate::ir::types::TypeKind;

    #[test]
    fn type_kinds_decode_from_native_values() -> anyhow::Result<()> {
        assert_eq!(TypeKind::try_from(0)?, TypeKind::Void);
        assert_eq!(TypeKind::try_from(8)?, TypeKind::Integer);
        assert_eq!(TypeKind::try_from(12)?, TypeKind::Pointer);
        assert_eq!(TypeKind::try_from(20)?, TypeKind::TargetExt);
        assert!(matches!(
            TypeKind::try_from(99),
            Err(Error::UnexpectedKind { expected: "type kind", .. })
        ));

        Ok(())
    }

    #[test]
    fn floating_point_kinds_are_recognised() {
        assert!(TypeKind::Double.is_floating_point());
        assert!(TypeKind::BFloat.is_floating_point());
        assert!(!TypeKind::Integer.is_floating_point());
    }
}
