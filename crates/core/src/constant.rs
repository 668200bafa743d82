//! Constants that are used throughout the bindings.

/// The environment variable naming an explicit LLVM shared library to load.
pub const LIBRARY_ENV_VAR: &str = "LLVMC_LIBRARY";

/// The environment variable holding a platform path-list of directories to
/// search for the LLVM shared library.
pub const LIBRARY_PATH_ENV_VAR: &str = "LLVMC_LIBRARY_PATH";

/// The LLVM major versions whose shared libraries we look for by name, newest
/// first. Everything from 15 onwards has opaque pointers and the `*2` builder
/// entry points that the bindings rely on.
pub const SUPPORTED_MAJOR_VERSIONS: [u32; 6] = [20, 19, 18, 17, 16, 15];

/// `LLVMReturnStatusAction` from `llvm-c/Analysis.h`.
pub const VERIFIER_RETURN_STATUS: i32 = 2;

/// The default address space for pointers.
pub const DEFAULT_ADDRESS_SPACE: u32 = 0;
