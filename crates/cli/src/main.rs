//! The command-line driver for the llvmc bindings, which inspects object
//! files and LLVM IR using the LLVM shared library found at runtime. For more
//! detail, please see the documentation for the [`llvmc_core`] crate.

#![warn(clippy::all, clippy::cargo, clippy::pedantic)]
#![allow(clippy::module_name_repetitions)] // Allows for better API naming
#![allow(clippy::multiple_crate_versions)] // Enforced by our dependencies

mod commands;

use std::path::PathBuf;

use clap::{Args, Parser, Subcommand};
use llvmc_core::{library, LibraryConfigBuilder};

/// Inspect object files and LLVM IR through the LLVM C API.
#[derive(Debug, Parser)]
#[command(name = "llvmc", version, about, long_about = None)]
struct Cli {
    /// The LLVM shared library to use, instead of searching for one.
    #[arg(long, global = true, value_name = "PATH")]
    library: Option<PathBuf>,

    #[command(subcommand)]
    command: Command,
}

#[derive(Debug, Subcommand)]
enum Command {
    /// List the symbols in an object file.
    Nm(NmArgs),

    /// List the sections in an object file.
    Sections(FileArgs),

    /// List the relocations in each section of an object file.
    Relocations(FileArgs),

    /// Load an LLVM IR (`.ll`) or bitcode (`.bc`) file and print it.
    Ir(IrArgs),

    /// List the targets available in the LLVM library.
    Targets,
}

#[derive(Debug, Args)]
struct FileArgs {
    /// The file to read.
    #[arg(value_name = "FILE")]
    file: PathBuf,
}

#[derive(Debug, Args)]
struct NmArgs {
    /// The object file to read.
    #[arg(value_name = "FILE")]
    file: PathBuf,

    /// Sort symbols by address.
    #[arg(short = 'n', long, conflicts_with = "size_sort")]
    numeric_sort: bool,

    /// Sort symbols by size.
    #[arg(long)]
    size_sort: bool,

    /// Only list undefined symbols.
    #[arg(short = 'u', long, conflicts_with = "defined_only")]
    undefined_only: bool,

    /// Only list defined symbols.
    #[arg(long)]
    defined_only: bool,
}

#[derive(Debug, Args)]
struct IrArgs {
    /// The IR or bitcode file to read.
    #[arg(value_name = "FILE")]
    file: PathBuf,

    /// Verify the module, failing if it is malformed.
    #[arg(long)]
    verify: bool,

    /// A pass pipeline to run over the module, such as `default<O2>`.
    #[arg(long, value_name = "PIPELINE")]
    passes: Option<String>,
}

fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();

    if let Some(path) = &cli.library {
        library::configure(LibraryConfigBuilder::from_env().with_path(path).build())?;
    }

    match cli.command {
        Command::Nm(args) => commands::nm(&args),
        Command::Sections(args) => commands::sections(&args.file),
        Command::Relocations(args) => commands::relocations(&args.file),
        Command::Ir(args) => commands::ir(&args),
        Command::Targets => commands::targets(),
    }
}
