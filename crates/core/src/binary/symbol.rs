//! Symbols of an object file.

use std::rc::Rc;

use llvmc_errors::binding::Result;
use once_cell::unsync::OnceCell;

use crate::{
    binary::{memoize, section::Section, Cursor, ObjectFile, Position},
    handle::RawPtr,
    message::{copy_c_str, CStrPtr},
};

/// A symbol of an object file.
///
/// Symbols produced by [`Symbols`] expire when the iteration moves on; see
/// the [module documentation](crate::binary).
#[derive(Debug)]
pub struct Symbol {
    position: Position,
    binary:   ObjectFile,
    name:     OnceCell<String>,
    address:  OnceCell<u64>,
    size:     OnceCell<u64>,
    section:  OnceCell<Option<Section>>,
}

impl Symbol {
    pub(crate) fn new(position: Position, binary: ObjectFile) -> Self {
        Self {
            position,
            binary,
            name: OnceCell::new(),
            address: OnceCell::new(),
            size: OnceCell::new(),
            section: OnceCell::new(),
        }
    }

    /// Gets the live symbol iterator for this symbol.
    pub(crate) fn iterator(&self) -> Result<RawPtr> {
        self.position.raw()
    }

    /// Gets the name of the symbol, which may be mangled.
    ///
    /// # Errors
    ///
    /// - [`llvmc_errors::binding::Error::Expired`] if the symbol has expired
    ///   and the name was not read before.
    pub fn name(&self) -> Result<&str> {
        memoize(&self.name, &self.position, |iterator| {
            let get = native!(LLVMGetSymbolName: fn(RawPtr) -> CStrPtr);
            unsafe { copy_c_str(get(iterator)) }
        })
        .map(String::as_str)
    }

    /// Gets the address of the symbol.
    ///
    /// # Errors
    ///
    /// See [`Self::name`].
    pub fn address(&self) -> Result<u64> {
        memoize(&self.address, &self.position, |iterator| {
            let get = native!(LLVMGetSymbolAddress: fn(RawPtr) -> u64);
            Ok(unsafe { get(iterator) })
        })
        .copied()
    }

    /// Gets the size of the symbol in bytes.
    ///
    /// # Errors
    ///
    /// See [`Self::name`].
    pub fn size(&self) -> Result<u64> {
        memoize(&self.size, &self.position, |iterator| {
            let get = native!(LLVMGetSymbolSize: fn(RawPtr) -> u64);
            Ok(unsafe { get(iterator) })
        })
        .copied()
    }

    /// Gets the section containing the symbol, or [`None`] if it is not in
    /// any section.
    ///
    /// The section has an iterator of its own, so it never expires. Finding
    /// it creates a new native iterator, which makes this comparatively
    /// expensive.
    ///
    /// # Errors
    ///
    /// See [`Self::name`].
    pub fn section(&self) -> Result<Option<&Section>> {
        memoize(&self.section, &self.position, |iterator| {
            let move_to = native!(LLVMMoveToContainingSection: fn(RawPtr, RawPtr));
            let cursor = self.binary.section_cursor()?;
            let sections = cursor.iterator()?;
            unsafe { move_to(sections, iterator) };

            if self.binary.is_section_end(sections)? {
                cursor.finish();
                return Ok(None);
            }
            Ok(Some(Section::new(cursor.position(), self.binary.clone())))
        })
        .map(Option::as_ref)
    }

    /// Returns `true` if the symbol is not defined in this object file,
    /// which is to say that it has no section.
    ///
    /// # Errors
    ///
    /// See [`Self::section`].
    pub fn is_undefined(&self) -> Result<bool> {
        Ok(self.section()?.is_none())
    }

    /// Reads every property of the symbol so that they remain available
    /// after it expires.
    ///
    /// # Errors
    ///
    /// See [`Self::name`].
    pub fn cache(&self) -> Result<()> {
        self.name()?;
        self.address()?;
        self.size()?;
        if let Some(section) = self.section()? {
            section.cache()?;
        }
        Ok(())
    }

    /// Returns `true` if the iteration that produced this symbol has moved
    /// on.
    #[must_use]
    pub fn is_expired(&self) -> bool {
        self.position.is_expired()
    }
}

/// An iterator over the symbols of an [`ObjectFile`].
#[derive(Debug)]
pub struct Symbols {
    binary:  ObjectFile,
    cursor:  Rc<Cursor>,
    cache:   bool,
    started: bool,
    done:    bool,
}

impl Symbols {
    pub(crate) fn new(binary: ObjectFile, cursor: Rc<Cursor>, cache: bool) -> Self {
        Self {
            binary,
            cursor,
            cache,
            started: false,
            done: false,
        }
    }

    fn step(&mut self) -> Result<Option<Symbol>> {
        let iterator = self.cursor.iterator()?;
        if self.started {
            let move_next = native!(LLVMMoveToNextSymbol: fn(RawPtr));
            unsafe { move_next(iterator) };
            self.cursor.advance();
        }
        self.started = true;

        if self.binary.is_symbol_end(iterator)? {
            self.cursor.finish();
            return Ok(None);
        }

        let symbol = Symbol::new(self.cursor.position(), self.binary.clone());
        if self.cache {
            symbol.cache()?;
        }
        Ok(Some(symbol))
    }
}

impl Iterator for Symbols {
    type Item = Result<Symbol>;

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
