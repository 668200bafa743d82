//! Tests that exercise the bindings against a real LLVM shared library.
//!
//! Each test returns early, passing, if no library can be loaded, so that the
//! suite can run on machines without LLVM installed.

use std::path::Path;

use llvmc_core::{
    binary::ObjectFile,
    execution::{ExecutionEngine, GenericValue},
    ir::{
        builder::{Builder, IntPredicate},
        context::Context,
        memory_buffer::MemoryBuffer,
        metadata::{Metadata, MetadataKind, COMPILE_UNITS},
        module::Module,
        types::TypeKind,
        values::GlobalValue,
    },
    library,
    pass::{PassBuilderOptions, PassManager},
    target::{default_target_triple, ByteOrder, Target, TargetData},
    NativeWrapper,
};
use llvmc_errors::binding::Error;

const ADD_IR: &str = "input/add.ll";
const DEBUG_IR: &str = "input/debug.ll";

/// Returns early from the test if the LLVM library is unavailable.
macro_rules! require_llvm {
    () => {
        if let Err(error) = library::get() {
            eprintln!("Skipping, as LLVM is unavailable: {error}");
            return Ok(());
        }
    };
}

fn load_add(context: &Context) -> anyhow::Result<Module> {
    let buffer = MemoryBuffer::from_file(Path::new(ADD_IR))?;
    Ok(Module::parse_ir(&buffer, context)?)
}

#[test]
fn modules_carry_their_metadata() -> anyhow::Result<()> {
    require_llvm!();
    let context = Context::new()?;
    let module = Module::new("demo", &context)?;
    module.set_target("x86_64-unknown-linux-gnu")?;
    module.set_data_layout("e-m:e-i64:64-n8:16:32:64-S128")?;

    assert_eq!(module.name()?, "demo");
    assert_eq!(module.target()?, "x86_64-unknown-linux-gnu");
    assert!(module.print_to_string()?.contains("ModuleID = 'demo'"));
    assert_eq!(module.context()?, context);

    Ok(())
}

#[test]
fn built_functions_verify_and_print() -> anyhow::Result<()> {
    require_llvm!();
    let context = Context::new()?;
    let module = Module::new("built", &context)?;
    let i32_type = context.i32_type()?;
    let fn_type = i32_type.function_type(&[i32_type.clone(), i32_type.clone()], false)?;
    let function = module.add_function("max", &fn_type)?;

    let entry = function.append_basic_block("entry")?;
    let builder = Builder::at_end(&entry)?;
    let params = function.params()?;
    let greater = builder.icmp(IntPredicate::Sgt, &params[0], &params[1], "greater")?;
    let max = builder.select(&greater, &params[0], &params[1], "max")?;
    builder.ret(&max)?;

    module.verify()?;
    let text = module.print_to_string()?;
    assert!(text.contains("icmp sgt i32"));
    assert!(text.contains("select i1"));
    assert_eq!(function.function_type()?.kind()?, TypeKind::Function);
    assert_eq!(entry.terminator()?.map(|t| t.name()).transpose()?, Some(String::new()));

    Ok(())
}

#[test]
fn calls_are_built_against_the_callee_type() -> anyhow::Result<()> {
    require_llvm!();
    let context = Context::new()?;
    let module = Module::new("calls", &context)?;
    let i32_type = context.i32_type()?;
    let fn_type = i32_type.function_type(&[i32_type.clone()], false)?;
    let callee = module.add_function("callee", &fn_type)?;
    let caller = module.add_function("caller", &fn_type)?;

    let builder = Builder::at_end(&callee.append_basic_block("entry")?)?;
    builder.ret(&callee.params()?[0])?;

    builder.position_at_end(&caller.append_basic_block("entry")?)?;
    let result = builder.call(&callee, &caller.params()?, "result")?;
    builder.ret(&result)?;

    module.verify()?;
    assert!(module.print_to_string()?.contains("%result = call i32 @callee(i32 %0)"));

    Ok(())
}

#[test]
fn memory_buffers_copy_out_their_contents() -> anyhow::Result<()> {
    require_llvm!();
    let buffer = MemoryBuffer::from_bytes("bytes", b"\x00llvm\xff")?;
    assert_eq!(buffer.len()?, 6);
    assert!(!buffer.is_empty()?);

    let bytes = buffer.to_bytes()?;
    buffer.dispose();
    assert_eq!(bytes, b"\x00llvm\xff");
    assert!(matches!(buffer.to_bytes(), Err(Error::UseAfterDispose { .. })));

    Ok(())
}

#[test]
fn unterminated_blocks_fail_verification() -> anyhow::Result<()> {
    require_llvm!();
    let context = Context::new()?;
    let module = Module::new("broken", &context)?;
    let fn_type = context.void_type()?.function_type(&[], false)?;
    let function = module.add_function("broken", &fn_type)?;
    function.append_basic_block("entry")?;

    assert!(matches!(module.verify(), Err(Error::NativeOperation(_))));

    Ok(())
}

#[test]
fn parsed_ir_exposes_functions_and_globals() -> anyhow::Result<()> {
    require_llvm!();
    let context = Context::new()?;
    let module = load_add(&context)?;

    let names = module
        .functions()?
        .map(|f| f.and_then(|f| f.as_value().name()))
        .collect::<Result<Vec<_>, _>>()?;
    assert_eq!(names, vec!["add", "main"]);

    let add = module.get_function("add")?.expect("add is defined");
    assert!(!add.is_declaration()?);
    assert_eq!(add.params()?.len(), 2);
    assert_eq!(module.get_function("add")?, Some(add));
    assert!(module.get_function("missing")?.is_none());

    let answer = module.get_global("answer")?.expect("answer is defined");
    let initializer = answer.initializer()?.expect("answer is initialized");
    assert_eq!(initializer.const_int_sext()?, 42);

    Ok(())
}

#[test]
fn invalid_ir_reports_the_parser_diagnostic() -> anyhow::Result<()> {
    require_llvm!();
    let context = Context::new()?;
    let result = Module::parse_ir_str("bad", "define i32 @f( {", &context);

    match result {
        Err(Error::NativeOperation(message)) => assert!(!message.is_empty()),
        other => panic!("Expected a parse error, got {other:?}"),
    }

    Ok(())
}

#[test]
fn bitcode_survives_a_round_trip_through_a_file() -> anyhow::Result<()> {
    require_llvm!();
    let context = Context::new()?;
    let module = load_add(&context)?;
    let file = tempfile::NamedTempFile::new()?;
    module.write_bitcode_to_file(file.path())?;

    let reloaded = Module::from_bitcode_file(file.path(), &context)?;
    assert!(reloaded.get_function("main")?.is_some());
    assert!(reloaded.print_to_string()?.contains("define i32 @add(i32 %a, i32 %b)"));

    let bytes = module.to_bitcode()?;
    assert!(bytes.starts_with(b"BC\xC0\xDE"));
    let in_memory = Module::parse_bitcode(&MemoryBuffer::from_bytes("add.bc", &bytes)?, &context)?;
    assert!(in_memory.get_global("answer")?.is_some());

    Ok(())
}

#[test]
fn pass_pipelines_run() -> anyhow::Result<()> {
    require_llvm!();
    let context = Context::new()?;
    let module = load_add(&context)?;
    let options = PassBuilderOptions::new()?;
    options.set_verify_each(true)?;
    module.run_passes("default<O2>", &options)?;
    module.verify()?;

    assert!(module.run_passes("not-a-pass", &options).is_err());

    let legacy = PassManager::new()?;
    legacy.run(&module)?;

    Ok(())
}

#[test]
fn the_interpreter_runs_functions() -> anyhow::Result<()> {
    require_llvm!();
    let context = Context::new()?;
    let module = load_add(&context)?;
    let engine = ExecutionEngine::interpreter(&module)?;
    assert!(engine.object().owns(module.object()));

    let add = engine.find_function("add")?.expect("add is defined");
    let i32_type = context.i32_type()?;
    let args = [
        GenericValue::of_int(&i32_type, 2, true)?,
        GenericValue::of_int(&i32_type, 3, true)?,
    ];
    let result = engine.run_function(&add, &args)?;
    assert_eq!(result.to_int(true)?, 5);
    assert!(engine.find_function("missing")?.is_none());

    let main = engine.find_function("main")?.expect("main is defined");
    assert_eq!(engine.run_function_as_main(&main, &["main"], &[])?, 0);

    Ok(())
}

#[test]
fn modules_can_be_taken_back_from_an_engine() -> anyhow::Result<()> {
    require_llvm!();
    let context = Context::new()?;
    let module = load_add(&context)?;
    let engine = ExecutionEngine::interpreter(&module)?;
    assert!(matches!(
        ExecutionEngine::interpreter(&module),
        Err(Error::DoubleOwnership { .. })
    ));

    engine.remove_module(&module)?;
    assert!(module.object().is_self_owned());
    drop(engine);

    // The module survives its former engine.
    assert!(module.get_function("add")?.is_some());

    Ok(())
}

#[test]
fn disposing_a_module_invalidates_its_contents() -> anyhow::Result<()> {
    require_llvm!();
    let context = Context::new()?;
    let module = Module::new("doomed", &context)?;
    let i32_type = context.i32_type()?;
    let fn_type = i32_type.function_type(&[i32_type.clone()], false)?;
    let function = module.add_function("f", &fn_type)?;
    let entry = function.append_basic_block("entry")?;
    let param = function.params()?.remove(0);

    module.dispose();
    assert!(matches!(function.raw(), Err(Error::UseAfterDispose { .. })));
    assert!(matches!(function.as_value().name(), Err(Error::UseAfterDispose { .. })));
    assert!(matches!(entry.raw(), Err(Error::UseAfterDispose { .. })));
    assert!(matches!(param.raw(), Err(Error::UseAfterDispose { .. })));

    // Types belong to the context, which is still live.
    assert_eq!(i32_type.kind()?, TypeKind::Integer);
    context.dispose();
    assert!(matches!(i32_type.raw(), Err(Error::UseAfterDispose { .. })));

    Ok(())
}

#[test]
fn dropping_an_engine_invalidates_the_functions_it_found() -> anyhow::Result<()> {
    require_llvm!();
    let context = Context::new()?;
    let module = load_add(&context)?;
    let engine = ExecutionEngine::interpreter(&module)?;
    let add = engine.find_function("add")?.expect("add is defined");

    drop(engine);
    assert!(module.object().is_disposed());
    assert!(matches!(add.raw(), Err(Error::UseAfterDispose { .. })));

    // Functions of a module that was taken back survive the engine.
    let module = load_add(&context)?;
    let engine = ExecutionEngine::interpreter(&module)?;
    let add = engine.find_function("add")?.expect("add is defined");
    engine.remove_module(&module)?;
    drop(engine);
    assert_eq!(add.as_value().name()?, "add");

    Ok(())
}

#[test]
fn debug_info_is_read_from_metadata() -> anyhow::Result<()> {
    require_llvm!();
    let context = Context::new()?;
    let module = Module::parse_ir(&MemoryBuffer::from_file(Path::new(DEBUG_IR))?, &context)?;
    assert_eq!(module.debug_metadata_version()?, 3);
    assert!(module.named_metadata_names()?.iter().any(|n| n == COMPILE_UNITS));
    assert!(module.named_metadata("missing")?.is_empty());

    let info = module.debug_info()?.expect("the module has debug info");
    assert_eq!(info.compile_units().len(), 1);
    assert_eq!(info.compile_units()[0].kind()?, MetadataKind::CompileUnit);

    let square = info.get("square").expect("square has a subprogram");
    assert_eq!(square.kind()?, MetadataKind::Subprogram);
    assert_eq!(square.line()?, 5);
    let file = square.file()?.expect("subprograms have a file");
    assert_eq!(file.filename()?, "debug.c");
    assert_eq!(file.directory()?, "/src");

    let counter = info.get("counter").expect("counter has a variable");
    assert_eq!(counter.kind()?, MetadataKind::GlobalVariable);
    assert_eq!(counter.line()?, 3);
    assert!(matches!(counter.size_in_bits(), Err(Error::UnexpectedKind { .. })));

    let int = &module.named_metadata("debug.types")?[0];
    assert_eq!(int.kind()?, MetadataKind::BasicType);
    assert_eq!(int.name()?, "int");
    assert_eq!(int.size_in_bits()?, 32);

    let function = module.get_function("square")?.expect("square is defined");
    let entry = function.entry_block()?.expect("square has a body");
    let mul = entry.instructions()?.next().expect("the block is not empty")?;
    let location = mul.debug_location()?.expect("mul has a location");
    assert_eq!((location.line()?, location.column()?), (6, 12));
    assert_eq!(location.scope()?.as_ref(), Some(square));
    assert!(matches!(
        function.as_value().debug_location(),
        Err(Error::UnexpectedKind { .. })
    ));

    Ok(())
}

#[test]
fn metadata_strings_and_nodes_are_readable() -> anyhow::Result<()> {
    require_llvm!();
    let context = Context::new()?;
    let module = Module::parse_ir(&MemoryBuffer::from_file(Path::new(DEBUG_IR))?, &context)?;

    let ident = module.named_metadata("llvm.ident")?;
    assert_eq!(ident.len(), 1);
    assert_eq!(ident[0].kind()?, MetadataKind::Tuple);
    let operands = ident[0].operands()?;
    let producer = operands[0].as_ref().expect("the producer is present");
    assert_eq!(Metadata::from_value(producer)?.string()?, "clang");
    assert!(matches!(ident[0].string(), Err(Error::UnexpectedKind { .. })));

    Ok(())
}

#[test]
fn stripping_debug_info_removes_it() -> anyhow::Result<()> {
    require_llvm!();
    let context = Context::new()?;
    let module = Module::parse_ir(&MemoryBuffer::from_file(Path::new(DEBUG_IR))?, &context)?;
    assert!(module.strip_debug_info()?);

    let function = module.get_function("square")?.expect("square is defined");
    assert!(function.subprogram()?.is_none());
    assert!(module.debug_info()?.is_none());

    // Modules without debug info have nothing to read.
    let plain = load_add(&context)?;
    assert!(plain.debug_info()?.is_none());

    Ok(())
}

#[test]
fn data_layouts_answer_size_queries() -> anyhow::Result<()> {
    require_llvm!();
    let context = Context::new()?;
    let data = TargetData::new("e-m:e-p:64:64-i64:64-n8:16:32:64-S128")?;

    assert_eq!(data.byte_order()?, ByteOrder::LittleEndian);
    assert_eq!(data.pointer_size()?, 8);
    assert_eq!(data.abi_size_of_type(&context.i64_type()?)?, 8);
    assert_eq!(data.abi_size_of_type(&context.ptr_type()?)?, 8);
    assert_eq!(data.size_of_type_in_bits(&context.bool_type()?)?, 1);
    assert_eq!(data.int_ptr_type(&context)?.int_width()?, 64);

    let pair = context.struct_type(&[context.i8_type()?, context.i64_type()?], false)?;
    assert_eq!(data.offset_of_element(&pair, 1)?, 8);
    assert_eq!(data.element_at_offset(&pair, 9)?, 1);
    assert!(matches!(
        data.offset_of_element(&context.i64_type()?, 0),
        Err(Error::UnexpectedKind { .. })
    ));

    Ok(())
}

#[test]
fn targets_are_registered() -> anyhow::Result<()> {
    require_llvm!();
    assert!(!default_target_triple()?.is_empty());

    let targets = Target::all()?;
    for target in &targets {
        assert!(!target.name()?.is_empty());
    }

    Ok(())
}

#[test]
fn garbage_is_not_an_object_file() -> anyhow::Result<()> {
    require_llvm!();
    let buffer = MemoryBuffer::from_bytes("garbage", b"certainly not an object file")?;

    assert!(matches!(
        ObjectFile::from_buffer(&buffer),
        Err(Error::NativeOperation(_))
    ));
    assert!(buffer.object().is_self_owned());

    Ok(())
}

#[test]
fn object_file_entries_expire_unless_cached() -> anyhow::Result<()> {
    require_llvm!();
    let object = ObjectFile::open(std::env::current_exe()?)?;

    let named = object
        .sections()?
        .map(|s| s.and_then(|s| s.name().map(str::to_string)))
        .collect::<Result<Vec<_>, _>>()?;
    assert!(!named.is_empty());
    if cfg!(target_os = "linux") {
        assert!(named.iter().any(|n| n == ".text"));
    }

    let uncached = object.sections()?.collect::<Result<Vec<_>, _>>()?;
    assert!(uncached.iter().all(|s| s.is_expired()));
    assert!(matches!(
        uncached[0].name(),
        Err(Error::Expired { entity: "section" })
    ));

    let cached = object.sections_cached()?.collect::<Result<Vec<_>, _>>()?;
    let cached_names = cached
        .iter()
        .map(|s| s.name().map(str::to_string))
        .collect::<Result<Vec<_>, _>>()?;
    assert_eq!(cached_names, named);

    Ok(())
}
