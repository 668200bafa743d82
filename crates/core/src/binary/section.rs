//! Sections of an object file.

use std::rc::Rc;

use llvmc_errors::binding::Result;
use once_cell::unsync::OnceCell;

use crate::{
    binary::{memoize, relocation::Relocations, symbol::Symbol, Cursor, ObjectFile, Position},
    handle::{HandleType, RawPtr},
    library::prototype::LLVMBool,
    message::{copy_c_str, CStrPtr},
};

/// A section of an object file.
///
/// Sections produced by [`Sections`] expire when the iteration moves on; see
/// the [module documentation](crate::binary).
#[derive(Debug)]
pub struct Section {
    position: Position,
    binary:   ObjectFile,
    name:     OnceCell<String>,
    size:     OnceCell<u64>,
    contents: OnceCell<Vec<u8>>,
    address:  OnceCell<u64>,
}

impl Section {
    pub(crate) fn new(position: Position, binary: ObjectFile) -> Self {
        Self {
            position,
            binary,
            name: OnceCell::new(),
            size: OnceCell::new(),
            contents: OnceCell::new(),
            address: OnceCell::new(),
        }
    }

    /// Gets the name of the section, such as `.text`.
    ///
    /// # Errors
    ///
    /// - [`llvmc_errors::binding::Error::Expired`] if the section has expired
    ///   and the name was not read before.
    pub fn name(&self) -> Result<&str> {
        memoize(&self.name, &self.position, |iterator| {
            let get = native!(LLVMGetSectionName: fn(RawPtr) -> CStrPtr);
            unsafe { copy_c_str(get(iterator)) }
        })
        .map(String::as_str)
    }

    /// Gets the size of the section in bytes.
    ///
    /// # Errors
    ///
    /// See [`Self::name`].
    pub fn size(&self) -> Result<u64> {
        memoize(&self.size, &self.position, |iterator| {
            let get = native!(LLVMGetSectionSize: fn(RawPtr) -> u64);
            Ok(unsafe { get(iterator) })
        })
        .copied()
    }

    /// Gets the contents of the section.
    ///
    /// # Errors
    ///
    /// See [`Self::name`].
    pub fn contents(&self) -> Result<&[u8]> {
        let size = self.size()?;
        memoize(&self.contents, &self.position, |iterator| {
            let get = native!(LLVMGetSectionContents: fn(RawPtr) -> CStrPtr);
            let data = unsafe { get(iterator) };
            let mut len = usize::try_from(size).unwrap_or(usize::MAX);
            if data.is_null() || len == 0 {
                return Ok(Vec::new());
            }
            // Sections without file contents (such as `.bss`) still report
            // their size in memory.
            if let Some(buffer) = self.binary.buffer() {
                let range = buffer.address_range()?;
                let address = data as usize;
                if range.contains(&address) {
                    len = len.min(range.end - address);
                }
            }
            Ok(unsafe { std::slice::from_raw_parts(data.cast::<u8>(), len) }.to_vec())
        })
        .map(Vec::as_slice)
    }

    /// Gets the address of the section.
    ///
    /// # Errors
    ///
    /// See [`Self::name`].
    pub fn address(&self) -> Result<u64> {
        memoize(&self.address, &self.position, |iterator| {
            let get = native!(LLVMGetSectionAddress: fn(RawPtr) -> u64);
            Ok(unsafe { get(iterator) })
        })
        .copied()
    }

    /// Returns `true` if `symbol` lies within this section.
    ///
    /// This is never memoized, so both the section and the symbol must be
    /// live.
    ///
    /// # Errors
    ///
    /// - [`llvmc_errors::binding::Error::Expired`] if either has expired.
    pub fn has_symbol(&self, symbol: &Symbol) -> Result<bool> {
        let contains = native!(LLVMGetSectionContainsSymbol: fn(RawPtr, RawPtr) -> LLVMBool);
        Ok(unsafe { contains(self.position.raw()?, symbol.iterator()?) }.into())
    }

    /// Iterates over the relocations in this section.
    ///
    /// The section must stay live for the whole iteration.
    ///
    /// # Errors
    ///
    /// - [`llvmc_errors::binding::Error::Expired`] if the section has expired.
    pub fn relocations(&self) -> Result<Relocations> {
        Ok(Relocations::new(self.position.clone(), self.binary.clone(), self.relocation_cursor()?, false))
    }

    /// Iterates over the relocations in this section, caching every property
    /// of each relocation as it is reached.
    ///
    /// # Errors
    ///
    /// See [`Self::relocations`].
    pub fn relocations_cached(&self) -> Result<Relocations> {
        Ok(Relocations::new(self.position.clone(), self.binary.clone(), self.relocation_cursor()?, true))
    }

    fn relocation_cursor(&self) -> Result<Rc<Cursor>> {
        let dispose = native!(LLVMDisposeRelocationIterator: fn(RawPtr));
        let create = native!(LLVMGetRelocations: fn(RawPtr) -> RawPtr);
        let ptr = unsafe { create(self.position.raw()?) };
        self.binary
            .cursor(HandleType::RelocationIterator, ptr, dispose, "relocation")
    }

    /// Reads every property of the section so that they remain available
    /// after it expires.
    ///
    /// # Errors
    ///
    /// See [`Self::name`].
    pub fn cache(&self) -> Result<()> {
        self.name()?;
        self.size()?;
        self.contents()?;
        self.address()?;
        Ok(())
    }

    /// Returns `true` if the iteration that produced this section has moved
    /// on.
    #[must_use]
    pub fn is_expired(&self) -> bool {
        self.position.is_expired()
    }
}

/// An iterator over the sections of an [`ObjectFile`].
///
/// Each step is a native call, so each item is a [`Result`].
#[derive(Debug)]
pub struct Sections {
    binary:  ObjectFile,
    cursor:  Rc<Cursor>,
    cache:   bool,
    started: bool,
    done:    bool,
}

impl Sections {
    pub(crate) fn new(binary: ObjectFile, cursor: Rc<Cursor>, cache: bool) -> Self {
        Self {
            binary,
            cursor,
            cache,
            started: false,
            done: false,
        }
    }

    fn step(&mut self) -> Result<Option<Section>> {
        let iterator = self.cursor.iterator()?;
        if self.started {
            let move_next = native!(LLVMMoveToNextSection: fn(RawPtr));
            unsafe { move_next(iterator) };
            self.cursor.advance();
        }
        self.started = true;

        if self.binary.is_section_end(iterator)? {
            self.cursor.finish();
            return Ok(None);
        }

        let section = Section::new(self.cursor.position(), self.binary.clone());
        if self.cache {
            section.cache()?;
        }
        Ok(Some(section))
    }
}

impl Iterator for Sections {
    type Item = Result<Section>;

    fn next(&mut self) -> Option<Self::Item> {
        if self.done {
            return None;
        }
        let step = self.step();
        if !matches!(step, Ok(Some(_))) {
            self.done = true;
        }
        step.transpose()
    }
}
