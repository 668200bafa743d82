//! Relocations within a section of an object file.

use std::rc::Rc;

use llvmc_errors::binding::Result;
use once_cell::unsync::OnceCell;

use crate::{
    binary::{memoize, symbol::Symbol, Cursor, ObjectFile, Position},
    handle::{HandleType, RawPtr},
    library::prototype::LLVMBool,
    message::{take_message, OwnedCStrPtr},
};

/// A relocation in a section.
///
/// Relocations produced by [`Relocations`] expire when the iteration moves
/// on; see the [module documentation](crate::binary).
#[derive(Debug)]
pub struct Relocation {
    position:     Position,
    binary:       ObjectFile,
    offset:       OnceCell<u64>,
    symbol:       OnceCell<Option<Symbol>>,
    type_number:  OnceCell<u64>,
    type_name:    OnceCell<String>,
    value_string: OnceCell<String>,
}

impl Relocation {
    fn new(position: Position, binary: ObjectFile) -> Self {
        Self {
            position,
            binary,
            offset: OnceCell::new(),
            symbol: OnceCell::new(),
            type_number: OnceCell::new(),
            type_name: OnceCell::new(),
            value_string: OnceCell::new(),
        }
    }

    /// Gets the offset within the section that the relocation applies to.
    ///
    /// # Errors
    ///
    /// - [`llvmc_errors::binding::Error::Expired`] if the relocation has
    ///   expired and the offset was not read before.
    pub fn offset(&self) -> Result<u64> {
        memoize(&self.offset, &self.position, |iterator| {
            let get = native!(LLVMGetRelocationOffset: fn(RawPtr) -> u64);
            Ok(unsafe { get(iterator) })
        })
        .copied()
    }

    /// Gets the symbol that the relocation refers to, if any.
    ///
    /// The symbol has an iterator of its own, so it never expires.
    ///
    /// # Errors
    ///
    /// See [`Self::offset`].
    pub fn symbol(&self) -> Result<Option<&Symbol>> {
        memoize(&self.symbol, &self.position, |iterator| {
            let dispose = native!(LLVMDisposeSymbolIterator: fn(RawPtr));
            let get = native!(LLVMGetRelocationSymbol: fn(RawPtr) -> RawPtr);
            let ptr = unsafe { get(iterator) };
            if ptr.is_null() {
                return Ok(None);
            }

            let cursor = self
                .binary
                .cursor(HandleType::SymbolIterator, ptr, dispose, "symbol")?;
            if self.binary.is_symbol_end(cursor.iterator()?)? {
                cursor.finish();
                return Ok(None);
            }
            Ok(Some(Symbol::new(cursor.position(), self.binary.clone())))
        })
        .map(Option::as_ref)
    }

    /// Gets the target-specific number of the relocation type.
    ///
    /// # Errors
    ///
    /// See [`Self::offset`].
    pub fn type_number(&self) -> Result<u64> {
        memoize(&self.type_number, &self.position, |iterator| {
            let get = native!(LLVMGetRelocationType: fn(RawPtr) -> u64);
            Ok(unsafe { get(iterator) })
        })
        .copied()
    }

    /// Gets the name of the relocation type, such as `R_X86_64_PC32`.
    ///
    /// # Errors
    ///
    /// See [`Self::offset`].
    pub fn type_name(&self) -> Result<&str> {
        memoize(&self.type_name, &self.position, |iterator| {
            let get = native!(LLVMGetRelocationTypeName: fn(RawPtr) -> OwnedCStrPtr);
            unsafe { take_message(get(iterator)) }
        })
        .map(String::as_str)
    }

    /// Gets the relocation's value as a string, typically the name of the
    /// symbol it refers to.
    ///
    /// # Errors
    ///
    /// See [`Self::offset`].
    pub fn value_string(&self) -> Result<&str> {
        memoize(&self.value_string, &self.position, |iterator| {
            let get = native!(LLVMGetRelocationValueString: fn(RawPtr) -> OwnedCStrPtr);
            unsafe { take_message(get(iterator)) }
        })
        .map(String::as_str)
    }

    /// Reads every property of the relocation so that they remain available
    /// after it expires.
    ///
    /// # Errors
    ///
    /// See [`Self::offset`].
    pub fn cache(&self) -> Result<()> {
        self.offset()?;
        if let Some(symbol) = self.symbol()? {
            symbol.cache()?;
        }
        self.type_number()?;
        self.type_name()?;
        self.value_string()?;
        Ok(())
    }

    /// Returns `true` if the iteration that produced this relocation has
    /// moved on.
    #[must_use]
    pub fn is_expired(&self) -> bool {
        self.position.is_expired()
    }
}

/// An iterator over the relocations in a section.
///
/// The section itself must stay live while iterating, as the end of the
/// relocations is found through it.
#[derive(Debug)]
pub struct Relocations {
    section: Position,
    binary:  ObjectFile,
    cursor:  Rc<Cursor>,
    cache:   bool,
    started: bool,
    done:    bool,
}

impl Relocations {
    pub(crate) fn new(section: Position, binary: ObjectFile, cursor: Rc<Cursor>, cache: bool) -> Self {
        Self {
            section,
            binary,
            cursor,
            cache,
            started: false,
            done: false,
        }
    }

    fn step(&mut self) -> Result<Option<Relocation>> {
        let section = self.section.raw()?;
        let iterator = self.cursor.iterator()?;
        if self.started {
            let move_next = native!(LLVMMoveToNextRelocation: fn(RawPtr));
            unsafe { move_next(iterator) };
            self.cursor.advance();
        }
        self.started = true;

        let at_end = native!(LLVMIsRelocationIteratorAtEnd: fn(RawPtr, RawPtr) -> LLVMBool);
        if unsafe { at_end(section, iterator) }.is_true() {
            self.cursor.finish();
            return Ok(None);
        }

        let relocation = Relocation::new(self.cursor.position(), self.binary.clone());
        if self.cache {
            relocation.cache()?;
        }
        Ok(Some(relocation))
    }
}

impl Iterator for Relocations {
    type Item = Result<Relocation>;

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
