//! Targets and their data layouts.
//!
//! LLVM only knows about the targets that have been initialized in the
//! current process, and the C API exposes this as one entry point per
//! target and component. Which of those exist depends on how the loaded
//! library was built, so initialization simply skips any that are missing.

use std::{
    ffi::{c_int, c_uint},
    ptr,
};

use llvmc_errors::binding::{Error, Result};
use once_cell::sync::OnceCell;
use tracing::{debug, trace};

use crate::{
    handle::{native_disposer, native_wrapper, HandleType, NativeWrapper, Object, RawPtr},
    ir::{
        context::Context,
        types::{Type, TypeKind},
        values::GlobalVariable,
    },
    library::{self, prototype::LLVMBool},
    message::{copy_c_str, native_error, take_message, to_c_string, CStrPtr, OwnedCStrPtr},
};

/// The initialization entry points for a single target.
#[derive(Clone, Copy, Debug, Eq, PartialEq)]
pub struct TargetInitializers {
    /// The name LLVM uses for the target in its entry points, e.g. `X86`.
    pub name: &'static str,

    /// The target info, target, MC and assembly printer initializers, in the
    /// order in which they must be called.
    pub symbols: [&'static str; 4],
}

macro_rules! known_targets {
    ($($name:ident),* $(,)?) => {
        &[$(
            TargetInitializers {
                name:    stringify!($name),
                symbols: [
                    concat!("LLVMInitialize", stringify!($name), "TargetInfo"),
                    concat!("LLVMInitialize", stringify!($name), "Target"),
                    concat!("LLVMInitialize", stringify!($name), "TargetMC"),
                    concat!("LLVMInitialize", stringify!($name), "AsmPrinter"),
                ],
            },
        )*]
    };
}

/// Every target that an upstream LLVM build may contain.
pub const KNOWN_TARGETS: &[TargetInitializers] = known_targets![
    AArch64, AMDGPU, ARM, AVR, BPF, Hexagon, Lanai, LoongArch, MSP430, Mips, NVPTX, PowerPC, RISCV,
    Sparc, SystemZ, VE, WebAssembly, X86, XCore,
];

static ALL_TARGETS: OnceCell<()> = OnceCell::new();
static NATIVE_TARGET: OnceCell<()> = OnceCell::new();

/// Gets the LLVM name of the target for the architecture we are running on.
#[must_use]
pub fn host_target_name() -> Option<&'static str> {
    let name = match std::env::consts::ARCH {
        "x86" | "x86_64" => "X86",
        "aarch64" => "AArch64",
        "arm" => "ARM",
        "riscv32" | "riscv64" => "RISCV",
        "powerpc" | "powerpc64" => "PowerPC",
        "mips" | "mips64" => "Mips",
        "s390x" => "SystemZ",
        "loongarch64" => "LoongArch",
        "sparc" | "sparc64" => "Sparc",
        "wasm32" | "wasm64" => "WebAssembly",
        _ => return None,
    };
    Some(name)
}

/// Calls the initializers for `target`, returning `false` if the loaded
/// library was built without it.
fn initialize(target: &TargetInitializers) -> Result<bool> {
    let library = library::get()?;
    for symbol in target.symbols {
        match library.function::<unsafe extern "C" fn()>(symbol) {
            Ok(init) => unsafe { init() },
            Err(Error::SymbolNotFound { .. }) => {
                trace!(target = target.name, symbol, "Target component not present");
                return Ok(false);
            }
            Err(e) => return Err(e),
        }
    }
    Ok(true)
}

/// Initializes every target present in the loaded library, once per process.
///
/// # Errors
///
/// - [`Error`] if the library cannot be loaded.
pub fn initialize_all_targets() -> Result<()> {
    ALL_TARGETS
        .get_or_try_init(|| {
            let mut initialized = Vec::new();
            for target in KNOWN_TARGETS {
                if initialize(target)? {
                    initialized.push(target.name);
                }
            }
            debug!(targets = ?initialized, "Initialized targets");
            Ok(())
        })
        .copied()
}

/// Initializes the target for the host architecture, once per process.
///
/// # Errors
///
/// - [`Error::NativeOperation`] if the host architecture is unknown or the
///   loaded library does not contain it.
pub fn initialize_native_target() -> Result<()> {
    NATIVE_TARGET
        .get_or_try_init(|| {
            let name = host_target_name().ok_or_else(|| {
                Error::NativeOperation(format!(
                    "No known LLVM target for the host architecture {}",
                    std::env::consts::ARCH
                ))
            })?;
            let target = KNOWN_TARGETS
                .iter()
                .find(|t| t.name == name)
                .ok_or_else(|| Error::NativeOperation(format!("Unknown target {name}")))?;
            if !initialize(target)? {
                return Err(Error::NativeOperation(format!(
                    "The loaded LLVM library was built without the {name} target"
                )));
            }
            debug!(target = name, "Initialized native target");
            Ok(())
        })
        .copied()
}

/// Gets the target triple of the host.
///
/// # Errors
///
/// - [`Error`] if the library is unavailable.
pub fn default_target_triple() -> Result<String> {
    let get = native!(LLVMGetDefaultTargetTriple: fn() -> OwnedCStrPtr);
    unsafe { take_message(get()) }
}

/// The byte order of a data layout.
#[derive(Clone, Copy, Debug, Eq, PartialEq)]
pub enum ByteOrder {
    BigEndian,
    LittleEndian,
}

impl TryFrom<c_int> for ByteOrder {
    type Error = Error;

    fn try_from(value: c_int) -> Result<Self> {
        match value {
            0 => Ok(Self::BigEndian),
            1 => Ok(Self::LittleEndian),
            other => Err(Error::UnexpectedKind {
                expected: "byte order",
                found:    other.to_string(),
            }),
        }
    }
}

native_wrapper! {
    /// An `LLVMTargetDataRef`, the parsed form of a data layout string.
    ///
    /// Those created with [`TargetData::new`] are disposed when dropped.
    /// Those obtained from a module or an execution engine belong to it, and
    /// keep it alive.
    pub struct TargetData(TargetData);
}

impl TargetData {
    /// Parses the data layout string `layout`.
    ///
    /// # Errors
    ///
    /// - [`Error::InteriorNul`] if `layout` contains a NUL byte.
    pub fn new(layout: &str) -> Result<Self> {
        let dispose = native!(LLVMDisposeTargetData: fn(RawPtr));
        let create = native!(LLVMCreateTargetData: fn(CStrPtr) -> RawPtr);
        let layout = to_c_string(layout)?;
        let ptr = unsafe { create(layout.as_ptr()) };
        Object::wrap(HandleType::TargetData, ptr, native_disposer(dispose)).map(Self::from_object)
    }

    /// Renders the data layout back to its string form.
    ///
    /// # Errors
    ///
    /// - [`Error::UseAfterDispose`] if the data layout is stale.
    pub fn string_rep(&self) -> Result<String> {
        let copy = native!(LLVMCopyStringRepOfTargetData: fn(RawPtr) -> OwnedCStrPtr);
        unsafe { take_message(copy(self.raw()?)) }
    }

    /// Gets the byte order.
    ///
    /// # Errors
    ///
    /// - [`Error::UseAfterDispose`] if the data layout is stale.
    pub fn byte_order(&self) -> Result<ByteOrder> {
        let get = native!(LLVMByteOrder: fn(RawPtr) -> c_int);
        ByteOrder::try_from(unsafe { get(self.raw()?) })
    }

    /// Gets the size in bytes of a pointer in the default address space.
    ///
    /// # Errors
    ///
    /// - [`Error::UseAfterDispose`] if the data layout is stale.
    pub fn pointer_size(&self) -> Result<u32> {
        let get = native!(LLVMPointerSize: fn(RawPtr) -> c_uint);
        Ok(unsafe { get(self.raw()?) })
    }

    /// Gets the size in bytes of a pointer in `address_space`.
    ///
    /// # Errors
    ///
    /// - [`Error::UseAfterDispose`] if the data layout is stale.
    pub fn pointer_size_for_address_space(&self, address_space: u32) -> Result<u32> {
        let get = native!(LLVMPointerSizeForAS: fn(RawPtr, c_uint) -> c_uint);
        Ok(unsafe { get(self.raw()?, address_space) })
    }

    /// Gets the integer type that is the same size as a pointer, in
    /// `context`.
    ///
    /// # Errors
    ///
    /// - [`Error::UseAfterDispose`] if either object is stale.
    pub fn int_ptr_type(&self, context: &Context) -> Result<Type> {
        let get = native!(LLVMIntPtrTypeInContext: fn(RawPtr, RawPtr) -> RawPtr);
        Type::from_raw(unsafe { get(context.raw()?, self.raw()?) }, context)
    }

    /// Gets the size of `ty` in bits.
    ///
    /// # Errors
    ///
    /// - [`Error::UseAfterDispose`] if either object is stale.
    pub fn size_of_type_in_bits(&self, ty: &Type) -> Result<u64> {
        let get = native!(LLVMSizeOfTypeInBits: fn(RawPtr, RawPtr) -> u64);
        Ok(unsafe { get(self.raw()?, ty.raw()?) })
    }

    /// Gets the number of bytes that storing `ty` may overwrite.
    ///
    /// # Errors
    ///
    /// - [`Error::UseAfterDispose`] if either object is stale.
    pub fn store_size_of_type(&self, ty: &Type) -> Result<u64> {
        let get = native!(LLVMStoreSizeOfType: fn(RawPtr, RawPtr) -> u64);
        Ok(unsafe { get(self.raw()?, ty.raw()?) })
    }

    /// Gets the allocation size of `ty` in bytes, including padding.
    ///
    /// # Errors
    ///
    /// - [`Error::UseAfterDispose`] if either object is stale.
    pub fn abi_size_of_type(&self, ty: &Type) -> Result<u64> {
        let get = native!(LLVMABISizeOfType: fn(RawPtr, RawPtr) -> u64);
        Ok(unsafe { get(self.raw()?, ty.raw()?) })
    }

    /// Gets the ABI alignment of `ty` in bytes.
    ///
    /// # Errors
    ///
    /// - [`Error::UseAfterDispose`] if either object is stale.
    pub fn abi_alignment_of_type(&self, ty: &Type) -> Result<u32> {
        let get = native!(LLVMABIAlignmentOfType: fn(RawPtr, RawPtr) -> c_uint);
        Ok(unsafe { get(self.raw()?, ty.raw()?) })
    }

    /// Gets the call frame alignment of `ty` in bytes.
    ///
    /// # Errors
    ///
    /// - [`Error::UseAfterDispose`] if either object is stale.
    pub fn call_frame_alignment_of_type(&self, ty: &Type) -> Result<u32> {
        let get = native!(LLVMCallFrameAlignmentOfType: fn(RawPtr, RawPtr) -> c_uint);
        Ok(unsafe { get(self.raw()?, ty.raw()?) })
    }

    /// Gets the preferred alignment of `ty` in bytes.
    ///
    /// # Errors
    ///
    /// - [`Error::UseAfterDispose`] if either object is stale.
    pub fn preferred_alignment_of_type(&self, ty: &Type) -> Result<u32> {
        let get = native!(LLVMPreferredAlignmentOfType: fn(RawPtr, RawPtr) -> c_uint);
        Ok(unsafe { get(self.raw()?, ty.raw()?) })
    }

    /// Gets the preferred alignment of `global` in bytes.
    ///
    /// # Errors
    ///
    /// - [`Error::UseAfterDispose`] if either object is stale.
    pub fn preferred_alignment_of_global(&self, global: &GlobalVariable) -> Result<u32> {
        let get = native!(LLVMPreferredAlignmentOfGlobal: fn(RawPtr, RawPtr) -> c_uint);
        Ok(unsafe { get(self.raw()?, global.raw()?) })
    }

    /// Gets the index of the element of the struct type `ty` that contains
    /// the byte at `offset`.
    ///
    /// # Errors
    ///
    /// - [`Error::UnexpectedKind`] if `ty` is not a struct type.
    pub fn element_at_offset(&self, ty: &Type, offset: u64) -> Result<u32> {
        let get = native!(LLVMElementAtOffset: fn(RawPtr, RawPtr, u64) -> c_uint);
        let ty = ty.expect("struct type", &[TypeKind::Struct])?;
        Ok(unsafe { get(self.raw()?, ty, offset) })
    }

    /// Gets the byte offset of element `index` of the struct type `ty`.
    ///
    /// # Errors
    ///
    /// - [`Error::UnexpectedKind`] if `ty` is not a struct type.
    pub fn offset_of_element(&self, ty: &Type, index: u32) -> Result<u64> {
        let get = native!(LLVMOffsetOfElement: fn(RawPtr, RawPtr, c_uint) -> u64);
        let ty = ty.expect("struct type", &[TypeKind::Struct])?;
        Ok(unsafe { get(self.raw()?, ty, index) })
    }
}

native_wrapper! {
    /// An `LLVMTargetRef`. Targets are registered for the life of the process,
    /// so these are never disposed.
    pub struct Target(Target);
}

impl Target {
    fn from_raw(ptr: RawPtr) -> Result<Self> {
        Object::permanent(HandleType::Target, ptr).map(Self::from_object)
    }

    /// Gets every registered target, initializing all of the targets in the
    /// library first.
    ///
    /// # Errors
    ///
    /// - [`Error`] if the library is unavailable.
    pub fn all() -> Result<Vec<Target>> {
        initialize_all_targets()?;
        let first = native!(LLVMGetFirstTarget: fn() -> RawPtr);
        let next = native!(LLVMGetNextTarget: fn(RawPtr) -> RawPtr);

        let mut targets = Vec::new();
        let mut current = unsafe { first() };
        while !current.is_null() {
            targets.push(Self::from_raw(current)?);
            current = unsafe { next(current) };
        }
        Ok(targets)
    }

    /// Gets the target for `triple`.
    ///
    /// # Errors
    ///
    /// - [`Error::NativeOperation`] if no registered target matches.
    pub fn from_triple(triple: &str) -> Result<Self> {
        initialize_all_targets()?;
        let get = native!(LLVMGetTargetFromTriple: fn(CStrPtr, *mut RawPtr, *mut OwnedCStrPtr) -> LLVMBool);
        let triple = to_c_string(triple)?;
        let mut target = ptr::null_mut();
        let mut message = ptr::null_mut();
        if unsafe { get(triple.as_ptr(), &mut target, &mut message) }.is_true() {
            return Err(unsafe { native_error(message) });
        }
        Self::from_raw(target)
    }

    /// Gets the short name of the target, e.g. `x86-64`.
    ///
    /// # Errors
    ///
    /// - [`Error::CStrConversion`] if the name is not UTF-8.
    pub fn name(&self) -> Result<String> {
        let get = native!(LLVMGetTargetName: fn(RawPtr) -> CStrPtr);
        unsafe { copy_c_str(get(self.raw()?)) }
    }

    /// Gets the human-readable description of the target.
    ///
    /// # Errors
    ///
    /// - [`Error::CStrConversion`] if the description is not UTF-8.
    pub fn description(&self) -> Result<String> {
        let get = native!(LLVMGetTargetDescription: fn(RawPtr) -> CStrPtr);
        unsafe { copy_c_str(get(self.raw()?)) }
    }

    /// Returns `true` if the target supports JIT compilation.
    ///
    /// # Errors
    ///
    /// - [`Error`] if the library is unavailable.
    pub fn has_jit(&self) -> Result<bool> {
        let get = native!(LLVMTargetHasJIT: fn(RawPtr) -> LLVMBool);
        Ok(unsafe { get(self.raw()?) }.into())
    }

    /// Returns `true` if the target has a target machine.
    ///
    /// # Errors
    ///
    /// - [`Error`] if the library is unavailable.
    pub fn has_target_machine(&self) -> Result<bool> {
        let get = native!(LLVMTargetHasTargetMachine: fn(RawPtr) -> LLVMBool);
        Ok(unsafe { get(self.raw()?) }.into())
    }

    /// Returns `true` if the target has an assembler backend.
    ///
    /// # Errors
    ///
    /// - [`Error`] if the library is unavailable.
    pub fn has_asm_backend(&self) -> Result<bool> {
        let get = native!(LLVMTargetHasAsmBackend: fn(RawPtr) -> LLVMBool);
        Ok(unsafe { get(self.raw()?) }.into())
    }
}

#[cfg(test)]
mod test {
    use llvmc_errors::binding::Error;

    use crate::target::{host_target_name, ByteOrder, KNOWN_TARGETS};

    #[test]
    fn initializer_names_follow_the_target_name() {
        let x86 = KNOWN_TARGETS.iter().find(|t| t.name == "X86").expect("X86 is known");
        assert_eq!(
            x86.symbols,
            [
                "LLVMInitializeX86TargetInfo",
                "LLVMInitializeX86Target",
                "LLVMInitializeX86TargetMC",
                "LLVMInitializeX86AsmPrinter",
            ]
        );
    }

    #[test]
    fn host_target_is_known() {
        if let Some(name) = host_target_name() {
            assert!(KNOWN_TARGETS.iter().any(|t| t.name == name));
        }
    }

    #[test]
    fn byte_orders_decode() {
        assert_eq!(ByteOrder::try_from(0).ok(), Some(ByteOrder::BigEndian));
        assert_eq!(ByteOrder::try_from(1).ok(), Some(ByteOrder::LittleEndian));
        assert!(matches!(
            ByteOrder::try_from(2),
            Err(Error::UnexpectedKind { expected: "byte order", .. })
        ));
    }
}
