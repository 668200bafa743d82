//! Reading object files: their sections, symbols and relocations.
//!
//! LLVM exposes the contents of an object file through iterators that can
//! only point at one entry at a time. The entries handed out here are views
//! of such an iterator, so once the iterator moves on they expire, and any
//! property that was not read (and hence memoized) beforehand fails with
//! [`Error::Expired`]. Calling `cache` on an entry, or iterating with one of
//! the `*_cached` methods, reads everything up front.
//!
//! ```ignore
//! let object = ObjectFile::open("a.out")?;
//! for section in object.sections()? {
//!     let section = section?;
//!     println!("{} {}", section.name()?, section.size()?);
//! }
//! ```

pub mod relocation;
pub mod section;
pub mod symbol;

use std::{cell::Cell, ffi::c_int, path::Path, ptr, rc::Rc};

use llvmc_errors::binding::{Error, Result};
use once_cell::unsync::OnceCell;

use crate::{
    binary::{section::Sections, symbol::Symbols},
    handle::{
        native_disposer,
        native_wrapper,
        Disposer,
        HandleType,
        NativeWrapper,
        Object,
        RawHandle,
        RawPtr,
    },
    ir::memory_buffer::MemoryBuffer,
    library::prototype::LLVMBool,
    message::{native_error, OwnedCStrPtr},
};

/// The name of the reference from an iterator to the object file it reads.
pub(crate) const BINARY_REF: &str = "binary";

/// The name of the reference from an object file to its buffer.
const BUFFER_REF: &str = "buffer";

/// The kinds of file that LLVM can read as a binary.
#[derive(Clone, Copy, Debug, Eq, PartialEq)]
pub enum BinaryType {
    Archive,
    MachOUniversalBinary,
    COFFImportFile,
    IR,
    WinRes,
    COFF,
    ELF32L,
    ELF32B,
    ELF64L,
    ELF64B,
    MachO32L,
    MachO32B,
    MachO64L,
    MachO64B,
    Wasm,
    Offload,
}

impl TryFrom<c_int> for BinaryType {
    type Error = Error;

    fn try_from(value: c_int) -> Result<Self> {
        let kind = match value {
            0 => Self::Archive,
            1 => Self::MachOUniversalBinary,
            2 => Self::COFFImportFile,
            3 => Self::IR,
            4 => Self::WinRes,
            5 => Self::COFF,
            6 => Self::ELF32L,
            7 => Self::ELF32B,
            8 => Self::ELF64L,
            9 => Self::ELF64B,
            10 => Self::MachO32L,
            11 => Self::MachO32B,
            12 => Self::MachO64L,
            13 => Self::MachO64B,
            14 => Self::Wasm,
            15 => Self::Offload,
            other => {
                return Err(Error::UnexpectedKind {
                    expected: "binary type",
                    found:    other.to_string(),
                })
            }
        };
        Ok(kind)
    }
}

native_wrapper! {
    /// An `LLVMBinaryRef` for an object file.
    ///
    /// The object file owns the memory buffer it was read from.
    pub struct ObjectFile(Binary);
}

impl ObjectFile {
    /// Reads an object file from `buffer`, taking ownership of the buffer.
    ///
    /// # Errors
    ///
    /// - [`Error::DoubleOwnership`] if `buffer` is already owned.
    /// - [`Error::NativeOperation`] if LLVM cannot read the buffer as a binary.
    pub fn from_buffer(buffer: &MemoryBuffer) -> Result<Self> {
        let dispose = native!(LLVMDisposeBinary: fn(RawPtr));
        let dispose_buffer = native!(LLVMDisposeMemoryBuffer: fn(RawPtr));
        let create = native!(LLVMCreateBinary: fn(RawPtr, RawPtr, *mut OwnedCStrPtr) -> RawPtr);
        if !buffer.object().is_self_owned() {
            return Err(Error::DoubleOwnership {
                handle_type: HandleType::MemoryBuffer.c_name(),
            });
        }

        let mut message = ptr::null_mut();
        let binary = unsafe { create(buffer.raw()?, ptr::null_mut(), &mut message) };
        if binary.is_null() {
            return Err(unsafe { native_error(message) });
        }

        // The buffer must outlive the binary that reads from it, so both are
        // released by the binary's disposer, in that order.
        let buffer_ptr = buffer.raw()?;
        let disposer: Disposer = Box::new(move |handle: RawHandle| unsafe {
            dispose(handle.as_ptr());
            dispose_buffer(buffer_ptr);
        });
        let object = Object::wrap(HandleType::Binary, binary, Some(disposer))?;
        object.take_native_ownership(buffer.object())?;
        object.set_ref(BUFFER_REF, buffer.object());
        Ok(Self::from_object(object))
    }

    /// Gets the buffer that the object file was read from.
    pub(crate) fn buffer(&self) -> Option<MemoryBuffer> {
        self.object.get_ref(BUFFER_REF).map(MemoryBuffer::from_object)
    }

    /// Reads the object file at `path`.
    ///
    /// # Errors
    ///
    /// - [`Error::NativeOperation`] if the file cannot be read or is not a
    ///   binary that LLVM understands.
    pub fn open(path: impl AsRef<Path>) -> Result<Self> {
        let buffer = MemoryBuffer::from_file(path)?;
        Self::from_buffer(&buffer)
    }

    /// Gets the kind of binary.
    ///
    /// # Errors
    ///
    /// - [`Error::UnexpectedKind`] if LLVM reports a kind we do not know.
    pub fn binary_type(&self) -> Result<BinaryType> {
        let get = native!(LLVMBinaryGetType: fn(RawPtr) -> c_int);
        BinaryType::try_from(unsafe { get(self.raw()?) })
    }

    /// Iterates over the sections of the object file.
    ///
    /// # Errors
    ///
    /// - [`Error::UseAfterDispose`] if the object file is stale.
    pub fn sections(&self) -> Result<Sections> {
        Ok(Sections::new(self.clone(), self.section_cursor()?, false))
    }

    /// Iterates over the sections of the object file, caching every property
    /// of each section as it is reached.
    ///
    /// # Errors
    ///
    /// See [`Self::sections`].
    pub fn sections_cached(&self) -> Result<Sections> {
        Ok(Sections::new(self.clone(), self.section_cursor()?, true))
    }

    /// Iterates over the symbols of the object file.
    ///
    /// # Errors
    ///
    /// - [`Error::UseAfterDispose`] if the object file is stale.
    pub fn symbols(&self) -> Result<Symbols> {
        Ok(Symbols::new(self.clone(), self.symbol_cursor()?, false))
    }

    /// Iterates over the symbols of the object file, caching every property
    /// of each symbol as it is reached.
    ///
    /// # Errors
    ///
    /// See [`Self::symbols`].
    pub fn symbols_cached(&self) -> Result<Symbols> {
        Ok(Symbols::new(self.clone(), self.symbol_cursor()?, true))
    }

    /// Creates a new section iterator, positioned at the first section.
    pub(crate) fn section_cursor(&self) -> Result<Rc<Cursor>> {
        let dispose = native!(LLVMDisposeSectionIterator: fn(RawPtr));
        let create = native!(LLVMObjectFileCopySectionIterator: fn(RawPtr) -> RawPtr);
        let ptr = unsafe { create(self.raw()?) };
        self.cursor(HandleType::SectionIterator, ptr, dispose, "section")
    }

    /// Creates a new symbol iterator, positioned at the first symbol.
    pub(crate) fn symbol_cursor(&self) -> Result<Rc<Cursor>> {
        let dispose = native!(LLVMDisposeSymbolIterator: fn(RawPtr));
        let create = native!(LLVMObjectFileCopySymbolIterator: fn(RawPtr) -> RawPtr);
        let ptr = unsafe { create(self.raw()?) };
        self.cursor(HandleType::SymbolIterator, ptr, dispose, "symbol")
    }

    /// Wraps a native iterator over this object file in a cursor.
    pub(crate) fn cursor(
        &self,
        handle_type: HandleType,
        ptr: RawPtr,
        dispose: unsafe extern "C" fn(RawPtr),
        entity: &'static str,
    ) -> Result<Rc<Cursor>> {
        let iterator = Object::wrap(handle_type, ptr, native_disposer(dispose))?;
        iterator.set_ref(BINARY_REF, self.object());
        Ok(Cursor::new(iterator, entity))
    }

    /// Returns `true` if the section iterator `iterator` is past the last
    /// section.
    pub(crate) fn is_section_end(&self, iterator: RawPtr) -> Result<bool> {
        let at_end = native!(LLVMObjectFileIsSectionIteratorAtEnd: fn(RawPtr, RawPtr) -> LLVMBool);
        Ok(unsafe { at_end(self.raw()?, iterator) }.into())
    }

    /// Returns `true` if the symbol iterator `iterator` is past the last
    /// symbol.
    pub(crate) fn is_symbol_end(&self, iterator: RawPtr) -> Result<bool> {
        let at_end = native!(LLVMObjectFileIsSymbolIteratorAtEnd: fn(RawPtr, RawPtr) -> LLVMBool);
        Ok(unsafe { at_end(self.raw()?, iterator) }.into())
    }
}

/// A native iterator shared by the entries it has produced.
///
/// Each advance bumps the generation, which expires every entry created at
/// an earlier one.
#[derive(Debug)]
pub struct Cursor {
    iterator:   Object,
    generation: Cell<u64>,
    entity:     &'static str,
}

impl Cursor {
    /// Creates a cursor over `iterator`, whose entries are described as
    /// `entity` in errors.
    #[must_use]
    pub fn new(iterator: Object, entity: &'static str) -> Rc<Self> {
        Rc::new(Self {
            iterator,
            generation: Cell::new(0),
            entity,
        })
    }

    /// Gets the native iterator.
    ///
    /// # Errors
    ///
    /// - [`Error::UseAfterDispose`] if the cursor has finished.
    pub fn iterator(&self) -> Result<RawPtr> {
        self.iterator.raw()
    }

    /// Gets the position of the entry that the cursor currently points at.
    #[must_use]
    pub fn position(self: &Rc<Self>) -> Position {
        Position {
            cursor:     self.clone(),
            generation: self.generation.get(),
        }
    }

    /// Records that the native iterator has moved on.
    pub fn advance(&self) {
        self.generation.set(self.generation.get() + 1);
    }

    /// Records that iteration is over, disposing of the native iterator.
    pub fn finish(&self) {
        self.advance();
        self.iterator.dispose();
    }
}

/// The place of a single entry in a [`Cursor`].
#[derive(Clone, Debug)]
pub struct Position {
    cursor:     Rc<Cursor>,
    generation: u64,
}

impl Position {
    /// Returns `true` if the cursor has moved on from this entry.
    #[must_use]
    pub fn is_expired(&self) -> bool {
        self.cursor.generation.get() != self.generation || self.cursor.iterator.is_disposed()
    }

    /// Gets the native iterator, provided that it still points at this entry.
    ///
    /// # Errors
    ///
    /// - [`Error::Expired`] if the cursor has moved on.
    pub fn raw(&self) -> Result<RawPtr> {
        if self.is_expired() {
            return Err(Error::Expired {
                entity: self.cursor.entity,
            });
        }
        self.cursor.iterator()
    }
}

/// Reads a property of the entry at `position` through `fetch`, or returns
/// the value read earlier.
pub(crate) fn memoize<'a, T>(
    cell: &'a OnceCell<T>,
    position: &Position,
    fetch: impl FnOnce(RawPtr) -> Result<T>,
) -> Result<&'a T> {
    cell.get_or_try_init(|| fetch(position.raw()?))
}

#[cfg(test)]
mod test {
    use llvmc_errors::binding::Error;
    use once_cell::unsync::OnceCell;

    use crate::{
        binary::{memoize, BinaryType, Cursor},
        handle::{
            test::{fake_handle, DisposalLog},
            HandleType,
            Object,
        },
    };

    fn cursor(log: &DisposalLog) -> anyhow::Result<std::rc::Rc<Cursor>> {
        let iterator = Object::wrap(
            HandleType::SectionIterator,
            fake_handle(),
            log.disposer("iterator"),
        )?;
        Ok(Cursor::new(iterator, "section"))
    }

    #[test]
    fn entries_expire_when_the_cursor_advances() -> anyhow::Result<()> {
        let log = DisposalLog::default();
        let cursor = cursor(&log)?;
        let first = cursor.position();
        assert!(first.raw().is_ok());

        cursor.advance();
        let second = cursor.position();
        assert!(matches!(
            first.raw(),
            Err(Error::Expired { entity: "section" })
        ));
        assert!(second.raw().is_ok());

        Ok(())
    }

    #[test]
    fn finishing_expires_everything_and_disposes_the_iterator() -> anyhow::Result<()> {
        let log = DisposalLog::default();
        let cursor = cursor(&log)?;
        let last = cursor.position();

        cursor.finish();
        assert!(last.is_expired());
        assert!(matches!(cursor.position().raw(), Err(Error::Expired { .. })));
        assert_eq!(log.entries(), vec!["iterator"]);

        Ok(())
    }

    #[test]
    fn memoized_properties_survive_expiry() -> anyhow::Result<()> {
        let log = DisposalLog::default();
        let cursor = cursor(&log)?;
        let position = cursor.position();
        let name = OnceCell::new();
        let size: OnceCell<u64> = OnceCell::new();

        assert_eq!(memoize(&name, &position, |_| Ok(".text".to_string()))?, ".text");
        cursor.advance();

        assert_eq!(
            memoize(&name, &position, |_| Ok("unused".to_string()))?,
            ".text"
        );
        assert!(matches!(
            memoize(&size, &position, |_| Ok(16)),
            Err(Error::Expired { entity: "section" })
        ));

        Ok(())
    }

    #[test]
    fn failed_reads_are_not_memoized() -> anyhow::Result<()> {
        let log = DisposalLog::default();
        let cursor = cursor(&log)?;
        let position = cursor.position();
        let size: OnceCell<u64> = OnceCell::new();

        assert!(memoize(&size, &position, |_| Err(Error::NativeOperation("no".into()))).is_err());
        assert_eq!(*memoize(&size, &position, |_| Ok(16))?, 16);

        Ok(())
    }

    #[test]
    fn binary_types_decode() {
        assert_eq!(BinaryType::try_from(8).ok(), Some(BinaryType::ELF64L));
        assert_eq!(BinaryType::try_from(14).ok(), Some(BinaryType::Wasm));
        assert!(BinaryType::try_from(99).is_err());
    }
}
