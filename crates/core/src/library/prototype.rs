//! Prototypes describe the C-level calling signature of a native entry point.
//!
//! The LLVM C API is resolved at runtime, so the compiler cannot check that
//! the function pointer type we call through matches what the library
//! actually exports. Instead, every entry point used by this crate is declared
//! once, in C terms, in [`crate::library::declarations`], and each call site
//! names the Rust function pointer type it intends to call through. The
//! resolver compares the two (see [`NativeSignature`]) before handing out a
//! callable pointer.

use std::{
    ffi::{c_char, c_int, c_uint, c_void},
    fmt::{Display, Formatter},
    ptr::NonNull,
};

use itertools::Itertools;

/// The C-level types that appear in the signatures of the LLVM C API.
///
/// These are deliberately coarse. Every opaque `LLVM*Ref` is a pointer as far
/// as the ABI is concerned, and every C enumeration is passed as an `int`.
#[derive(Clone, Copy, Debug, Eq, Hash, PartialEq)]
pub enum CType {
    /// No value.
    Void,

    /// `LLVMBool`, which is an `int` that is only ever zero or one.
    Bool,

    /// `int`, and also every C enumeration in the API.
    Int,

    /// `unsigned`.
    UInt,

    /// `long long` / `int64_t`.
    LongLong,

    /// `unsigned long long` / `uint64_t`.
    ULongLong,

    /// `size_t`.
    SizeT,

    /// `double`.
    Double,

    /// An opaque handle or an untyped `void *`.
    Pointer,

    /// A C string, `const char *` or `char *`.
    CStr,

    /// A pointer to a pointer, used for out-handles and handle arrays.
    PointerToPointer,

    /// A pointer to a C string, used for out-messages and `argv`-style arrays.
    CStrPointer,

    /// A `size_t *` out-parameter, used for string lengths.
    SizeTPointer,

    /// An `unsigned *` out-parameter, used for the lengths of metadata
    /// strings.
    UIntPointer,
}

impl Display for CType {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        let name = match self {
            CType::Void => "void",
            CType::Bool => "LLVMBool",
            CType::Int => "int",
            CType::UInt => "unsigned",
            CType::LongLong => "long long",
            CType::ULongLong => "unsigned long long",
            CType::SizeT => "size_t",
            CType::Double => "double",
            CType::Pointer => "void *",
            CType::CStr => "char *",
            CType::PointerToPointer => "void **",
            CType::CStrPointer => "char **",
            CType::SizeTPointer => "size_t *",
            CType::UIntPointer => "unsigned *",
        };
        write!(f, "{name}")
    }
}

/// The declared signature of a native entry point.
#[derive(Clone, Copy, Debug, Eq, Hash, PartialEq)]
pub struct Prototype {
    /// The type returned by the function.
    pub returns: CType,

    /// The parameter types, in order.
    pub params: &'static [CType],
}

impl Prototype {
    /// Creates a prototype returning `returns` and taking `params`.
    #[must_use]
    pub const fn new(returns: CType, params: &'static [CType]) -> Self {
        Self { returns, params }
    }
}

/// Renders the prototype in a C-like style, e.g. `void * (void *, char *)`.
impl Display for Prototype {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        let params = if self.params.is_empty() {
            "void".to_string()
        } else {
            self.params.iter().join(", ")
        };
        write!(f, "{} ({params})", self.returns)
    }
}

/// The C representation of `LLVMBool`.
///
/// This is a distinct type rather than a bare [`c_int`] so that the prototype
/// check can tell a boolean apart from an integer or an enumeration.
#[repr(transparent)]
#[derive(Clone, Copy, Debug, Default, Eq, Hash, PartialEq)]
pub struct LLVMBool(pub c_int);

impl LLVMBool {
    pub const FALSE: Self = Self(0);
    pub const TRUE: Self = Self(1);

    /// Returns `true` if the native value is non-zero.
    #[must_use]
    pub fn is_true(self) -> bool {
        self.0 != 0
    }
}

impl From<bool> for LLVMBool {
    fn from(value: bool) -> Self {
        if value {
            Self::TRUE
        } else {
            Self::FALSE
        }
    }
}

impl From<LLVMBool> for bool {
    fn from(value: LLVMBool) -> Self {
        value.is_true()
    }
}

/// Rust types that have a fixed C representation in the API's signatures.
pub trait CRepr {
    /// The C type corresponding to `Self`.
    const C_TYPE: CType;
}

macro_rules! c_repr {
    ($($rust:ty => $c:ident),* $(,)?) => {
        $(
            impl CRepr for $rust {
                const C_TYPE: CType = CType::$c;
            }
        )*
    };
}

c_repr! {
    () => Void,
    LLVMBool => Bool,
    c_int => Int,
    c_uint => UInt,
    i64 => LongLong,
    u64 => ULongLong,
    usize => SizeT,
    f64 => Double,
    *mut c_void => Pointer,
    *const c_void => Pointer,
    *const c_char => CStr,
    *mut c_char => CStr,
    *mut *mut c_void => PointerToPointer,
    *const *mut c_void => PointerToPointer,
    *mut *mut c_char => CStrPointer,
    *const *const c_char => CStrPointer,
    *mut usize => SizeTPointer,
    *mut c_uint => UIntPointer,
}

/// Function pointer types that can be checked against a [`Prototype`] and
/// built from a resolved symbol address.
///
/// # Safety
///
/// Implementors must be pointer-sized function pointer types whose
/// [`NativeSignature::RETURNS`] and [`NativeSignature::PARAMS`] describe their
/// actual C ABI signature.
pub unsafe trait NativeSignature: Copy {
    /// The C return type of the function pointer.
    const RETURNS: CType;

    /// The C parameter types of the function pointer.
    const PARAMS: &'static [CType];

    /// The prototype described by this function pointer type.
    #[must_use]
    fn prototype() -> Prototype {
        Prototype::new(Self::RETURNS, Self::PARAMS)
    }

    /// Reinterprets `address` as a function pointer of this type.
    ///
    /// # Safety
    ///
    /// The caller must ensure that `address` is the entry point of a function
    /// with this signature.
    unsafe fn from_address(address: NonNull<c_void>) -> Self;
}

macro_rules! native_signature {
    ($($arg:ident),*) => {
        unsafe impl<Ret: CRepr, $($arg: CRepr),*> NativeSignature
            for unsafe extern "C" fn($($arg),*) -> Ret
        {
            const RETURNS: CType = Ret::C_TYPE;
            const PARAMS: &'static [CType] = &[$($arg::C_TYPE),*];

            unsafe fn from_address(address: NonNull<c_void>) -> Self {
                debug_assert_eq!(
                    std::mem::size_of::<Self>(),
                    std::mem::size_of::<*mut c_void>()
                );
                std::mem::transmute_copy::<*mut c_void, Self>(&address.as_ptr())
            }
        }
    };
}

native_signature!();
native_signature!(A);
native_signature!(A, B);
native_signature!(A, B, C);
native_signature!(A, B, C, D);
native_signature!(A, B, C, D, E);
native_signature!(A, B, C, D, E, F);
native_signature!(A, B, C, D, E, F, G);

#[cfg(test)]
mod test {
    use std::ffi::{c_char, c_uint, c_void};

    use crate::library::prototype::{CType, LLVMBool, NativeSignature, Prototype};

    #[test]
    fn function_pointer_types_describe_their_prototype() {
        type CreateModule = unsafe extern "C" fn(*const c_char, *mut c_void) -> *mut c_void;
        assert_eq!(
            CreateModule::prototype(),
            Prototype::new(CType::Pointer, &[CType::CStr, CType::Pointer])
        );

        type Dispose = unsafe extern "C" fn(*mut c_void);
        assert_eq!(Dispose::RETURNS, CType::Void);
        assert_eq!(Dispose::PARAMS, &[CType::Pointer]);

        type IsSized = unsafe extern "C" fn(*mut c_void) -> LLVMBool;
        assert_eq!(IsSized::RETURNS, CType::Bool);
    }

    #[test]
    fn prototypes_render_like_c() {
        let proto = Prototype::new(CType::ULongLong, &[CType::Pointer, CType::UInt]);
        assert_eq!(proto.to_string(), "unsigned long long (void *, unsigned)");

        let nullary = Prototype::new(CType::Pointer, &[]);
        assert_eq!(nullary.to_string(), "void * (void)");
    }

    #[test]
    fn integers_and_booleans_are_distinguished() {
        type Width = unsafe extern "C" fn(*mut c_void) -> c_uint;
        type Flag = unsafe extern "C" fn(*mut c_void) -> LLVMBool;
        assert_ne!(Width::prototype(), Flag::prototype());
        assert!(LLVMBool::from(true).is_true());
        assert!(!bool::from(LLVMBool::FALSE));
    }
}
