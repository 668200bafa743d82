//! The implementations of the CLI's subcommands.

use std::path::Path;

use itertools::Itertools;
use llvmc_core::{
    binary::{symbol::Symbol, ObjectFile},
    ir::{context::Context, memory_buffer::MemoryBuffer, module::Module},
    pass::PassBuilderOptions,
    target::{default_target_triple, Target},
};

use crate::{IrArgs, NmArgs};

/// Gets the `nm`-style type character of a symbol.
fn type_char(symbol: &Symbol) -> anyhow::Result<char> {
    let Some(section) = symbol.section()? else {
        return Ok('U');
    };
    let name = section.name()?;
    let kind = if name.starts_with(".text") || name == "__text" {
        'T'
    } else if name.starts_with(".bss") || name == "__bss" {
        'B'
    } else if name.starts_with(".rodata") || name == "__const" || name == "__cstring" {
        'R'
    } else if name.starts_with(".data") || name == "__data" {
        'D'
    } else {
        'S'
    };
    Ok(kind)
}

/// Stably sorts `items` by a key that may fail to be read, failing if any
/// key does.
fn sorted_by_key<T, K: Ord>(
    items: Vec<T>,
    key: impl Fn(&T) -> anyhow::Result<K>,
) -> anyhow::Result<Vec<T>> {
    let mut keyed = items
        .into_iter()
        .map(|item| Ok((key(&item)?, item)))
        .collect::<anyhow::Result<Vec<_>>>()?;
    keyed.sort_by(|(a, _), (b, _)| a.cmp(b));
    Ok(keyed.into_iter().map(|(_, item)| item).collect())
}

pub fn nm(args: &NmArgs) -> anyhow::Result<()> {
    let object = ObjectFile::open(&args.file)?;
    let mut symbols = object.symbols_cached()?.collect::<Result<Vec<_>, _>>()?;

    if args.numeric_sort {
        symbols = sorted_by_key(symbols, |s| Ok(s.address()?))?;
    } else if args.size_sort {
        symbols = sorted_by_key(symbols, |s| Ok(s.size()?))?;
    }

    for symbol in &symbols {
        let undefined = symbol.is_undefined()?;
        if (args.undefined_only && !undefined) || (args.defined_only && undefined) {
            continue;
        }

        let name = symbol.name()?;
        if name.is_empty() {
            continue;
        }
        if undefined {
            println!("{:16} U {name}", "");
        } else {
            println!("{:016x} {} {name}", symbol.address()?, type_char(symbol)?);
        }
    }

    Ok(())
}

pub fn sections(file: &Path) -> anyhow::Result<()> {
    let object = ObjectFile::open(file)?;
    println!("Idx {:<24} {:<16} {:<8}", "Name", "Address", "Size");
    for (index, section) in object.sections()?.enumerate() {
        let section = section?;
        println!(
            "{index:>3} {:<24} {:016x} {:08x}",
            section.name()?,
            section.address()?,
            section.size()?
        );
    }

    Ok(())
}

pub fn relocations(file: &Path) -> anyhow::Result<()> {
    let object = ObjectFile::open(file)?;
    for section in object.sections()? {
        let section = section?;
        let relocations = section.relocations_cached()?.collect::<Result<Vec<_>, _>>()?;
        if relocations.is_empty() {
            continue;
        }

        println!("Relocations in {}:", section.name()?);
        for relocation in &relocations {
            println!(
                "  {:016x} {:<24} {}",
                relocation.offset()?,
                relocation.type_name()?,
                relocation.value_string()?
            );
        }
    }

    Ok(())
}

pub fn ir(args: &IrArgs) -> anyhow::Result<()> {
    let context = Context::new()?;
    let is_bitcode = args.file.extension().is_some_and(|e| e == "bc");
    let module = if is_bitcode {
        Module::from_bitcode_file(&args.file, &context)?
    } else {
        Module::parse_ir(&MemoryBuffer::from_file(&args.file)?, &context)?
    };

    if let Some(pipeline) = &args.passes {
        module.run_passes(pipeline, &PassBuilderOptions::new()?)?;
    }
    if args.verify {
        module.verify()?;
    }

    print!("{}", module.print_to_string()?);
    Ok(())
}

pub fn targets() -> anyhow::Result<()> {
    println!("Default target: {}", default_target_triple()?);
    println!();

    let targets = Target::all()?;
    let rows = targets
        .iter()
        .map(|t| -> anyhow::Result<_> {
            let features = [
                (t.has_jit()?, "jit"),
                (t.has_target_machine()?, "target-machine"),
                (t.has_asm_backend()?, "asm-backend"),
            ]
            .into_iter()
            .filter_map(|(present, name)| present.then_some(name))
            .join(", ");
            Ok((t.name()?, t.description()?, features))
        })
        .collect::<anyhow::Result<Vec<_>>>()?;

    for (name, description, features) in rows.iter().sorted() {
        println!("  {name:<16} {description:<40} [{features}]");
    }

    Ok(())
}

#[cfg(test)]
mod test {
    use crate::commands::sorted_by_key;

    #[test]
    fn sorting_is_stable_by_key() -> anyhow::Result<()> {
        let items = vec![("b", 2), ("a", 1), ("c", 2), ("d", 0)];
        let sorted = sorted_by_key(items, |(_, key)| Ok(*key))?;
        assert_eq!(sorted, vec![("d", 0), ("a", 1), ("b", 2), ("c", 2)]);

        Ok(())
    }

    #[test]
    fn unreadable_keys_fail_the_sort() {
        let items = vec![1u64, 2, 3];
        let result = sorted_by_key(items, |item| {
            if *item == 2 {
                anyhow::bail!("no address for symbol {item}")
            }
            Ok(*item)
        });
        assert!(result.is_err_and(|e| e.to_string() == "no address for symbol 2"));
    }
}
