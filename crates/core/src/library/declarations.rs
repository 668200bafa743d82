//! The declared prototype of every LLVM C API entry point that the bindings
//! call.
//!
//! Entries are written in C terms (see [`CType`]) and are checked against the
//! function pointer type named at each call site when the symbol is first
//! resolved. A call site whose type disagrees with its declaration fails with
//! [`llvmc_errors::binding::Error::PrototypeMismatch`] instead of calling
//! through the wrong signature.

use crate::{
    library::{
        prototype::{CType, Prototype},
        resolver::Prototypes,
    },
    target::KNOWN_TARGETS,
};

macro_rules! declare {
    ($($name:ident : fn($($param:ident),* $(,)?) $(-> $ret:ident)?;)*) => {
        &[$(
            (
                stringify!($name),
                Prototype::new(declare!(@returns $($ret)?), &[$(CType::$param),*]),
            ),
        )*]
    };
    (@returns) => {
        CType::Void
    };
    (@returns $ret:ident) => {
        CType::$ret
    };
}

/// The prototypes of the fixed entry points.
pub const DECLARED: &[(&str, Prototype)] = declare! {
    // Messages.
    LLVMDisposeMessage: fn(CStr);

    // Contexts.
    LLVMAppendBasicBlockInContext: fn(Pointer, Pointer, CStr) -> Pointer;
    LLVMContextCreate: fn() -> Pointer;
    LLVMContextDispose: fn(Pointer);
    LLVMDoubleTypeInContext: fn(Pointer) -> Pointer;
    LLVMFloatTypeInContext: fn(Pointer) -> Pointer;
    LLVMGetGlobalContext: fn() -> Pointer;
    LLVMHalfTypeInContext: fn(Pointer) -> Pointer;
    LLVMInt16TypeInContext: fn(Pointer) -> Pointer;
    LLVMInt1TypeInContext: fn(Pointer) -> Pointer;
    LLVMInt32TypeInContext: fn(Pointer) -> Pointer;
    LLVMInt64TypeInContext: fn(Pointer) -> Pointer;
    LLVMInt8TypeInContext: fn(Pointer) -> Pointer;
    LLVMIntTypeInContext: fn(Pointer, UInt) -> Pointer;
    LLVMLabelTypeInContext: fn(Pointer) -> Pointer;
    LLVMPointerTypeInContext: fn(Pointer, UInt) -> Pointer;
    LLVMStructCreateNamed: fn(Pointer, CStr) -> Pointer;
    LLVMStructTypeInContext: fn(Pointer, PointerToPointer, UInt, Bool) -> Pointer;
    LLVMVoidTypeInContext: fn(Pointer) -> Pointer;

    // Memory buffers.
    LLVMCreateMemoryBufferWithContentsOfFile: fn(CStr, PointerToPointer, CStrPointer) -> Bool;
    LLVMCreateMemoryBufferWithMemoryRangeCopy: fn(CStr, SizeT, CStr) -> Pointer;
    LLVMDisposeMemoryBuffer: fn(Pointer);
    LLVMGetBufferSize: fn(Pointer) -> SizeT;
    LLVMGetBufferStart: fn(Pointer) -> CStr;

    // Modules, bitcode, IR parsing and analysis.
    LLVMAddFunction: fn(Pointer, CStr, Pointer) -> Pointer;
    LLVMAddGlobal: fn(Pointer, Pointer, CStr) -> Pointer;
    LLVMCloneModule: fn(Pointer) -> Pointer;
    LLVMDisposeErrorMessage: fn(CStr);
    LLVMDisposeModule: fn(Pointer);
    LLVMDumpModule: fn(Pointer);
    LLVMGetBitcodeModuleInContext2: fn(Pointer, Pointer, PointerToPointer) -> Bool;
    LLVMGetDataLayoutStr: fn(Pointer) -> CStr;
    LLVMGetErrorMessage: fn(Pointer) -> CStr;
    LLVMGetFirstFunction: fn(Pointer) -> Pointer;
    LLVMGetFirstGlobal: fn(Pointer) -> Pointer;
    LLVMGetLastFunction: fn(Pointer) -> Pointer;
    LLVMGetLastGlobal: fn(Pointer) -> Pointer;
    LLVMGetModuleContext: fn(Pointer) -> Pointer;
    LLVMGetModuleDataLayout: fn(Pointer) -> Pointer;
    LLVMGetModuleIdentifier: fn(Pointer, SizeTPointer) -> CStr;
    LLVMGetNamedFunction: fn(Pointer, CStr) -> Pointer;
    LLVMGetNamedGlobal: fn(Pointer, CStr) -> Pointer;
    LLVMGetNextFunction: fn(Pointer) -> Pointer;
    LLVMGetNextGlobal: fn(Pointer) -> Pointer;
    LLVMGetPreviousFunction: fn(Pointer) -> Pointer;
    LLVMGetPreviousGlobal: fn(Pointer) -> Pointer;
    LLVMGetTarget: fn(Pointer) -> CStr;
    LLVMModuleCreateWithNameInContext: fn(CStr, Pointer) -> Pointer;
    LLVMParseBitcodeInContext2: fn(Pointer, Pointer, PointerToPointer) -> Bool;
    LLVMParseIRInContext: fn(Pointer, Pointer, PointerToPointer, CStrPointer) -> Bool;
    LLVMPrintModuleToString: fn(Pointer) -> CStr;
    LLVMRunPasses: fn(Pointer, CStr, Pointer, Pointer) -> Pointer;
    LLVMSetDataLayout: fn(Pointer, CStr);
    LLVMSetModuleIdentifier: fn(Pointer, CStr, SizeT);
    LLVMSetTarget: fn(Pointer, CStr);
    LLVMVerifyModule: fn(Pointer, Int, CStrPointer) -> Bool;
    LLVMWriteBitcodeToFile: fn(Pointer, CStr) -> Int;
    LLVMWriteBitcodeToMemoryBuffer: fn(Pointer) -> Pointer;

    // Types.
    LLVMArrayType: fn(Pointer, UInt) -> Pointer;
    LLVMConstInt: fn(Pointer, ULongLong, Bool) -> Pointer;
    LLVMConstNull: fn(Pointer) -> Pointer;
    LLVMConstReal: fn(Pointer, Double) -> Pointer;
    LLVMCountParamTypes: fn(Pointer) -> UInt;
    LLVMCountStructElementTypes: fn(Pointer) -> UInt;
    LLVMFunctionType: fn(Pointer, PointerToPointer, UInt, Bool) -> Pointer;
    LLVMGetArrayLength: fn(Pointer) -> UInt;
    LLVMGetElementType: fn(Pointer) -> Pointer;
    LLVMGetIntTypeWidth: fn(Pointer) -> UInt;
    LLVMGetParamTypes: fn(Pointer, PointerToPointer);
    LLVMGetPointerAddressSpace: fn(Pointer) -> UInt;
    LLVMGetReturnType: fn(Pointer) -> Pointer;
    LLVMGetStructElementTypes: fn(Pointer, PointerToPointer);
    LLVMGetStructName: fn(Pointer) -> CStr;
    LLVMGetTypeContext: fn(Pointer) -> Pointer;
    LLVMGetTypeKind: fn(Pointer) -> Int;
    LLVMGetUndef: fn(Pointer) -> Pointer;
    LLVMGetVectorSize: fn(Pointer) -> UInt;
    LLVMIsFunctionVarArg: fn(Pointer) -> Bool;
    LLVMIsOpaqueStruct: fn(Pointer) -> Bool;
    LLVMIsPackedStruct: fn(Pointer) -> Bool;
    LLVMPrintTypeToString: fn(Pointer) -> CStr;
    LLVMStructSetBody: fn(Pointer, PointerToPointer, UInt, Bool);
    LLVMTypeIsSized: fn(Pointer) -> Bool;
    LLVMVectorType: fn(Pointer, UInt) -> Pointer;

    // Values, globals, functions and basic blocks.
    LLVMBasicBlockAsValue: fn(Pointer) -> Pointer;
    LLVMConstIntGetSExtValue: fn(Pointer) -> LongLong;
    LLVMConstIntGetZExtValue: fn(Pointer) -> ULongLong;
    LLVMCountParams: fn(Pointer) -> UInt;
    LLVMDeleteFunction: fn(Pointer);
    LLVMDumpValue: fn(Pointer);
    LLVMGetAlignment: fn(Pointer) -> UInt;
    LLVMGetBasicBlockName: fn(Pointer) -> CStr;
    LLVMGetBasicBlockParent: fn(Pointer) -> Pointer;
    LLVMGetBasicBlockTerminator: fn(Pointer) -> Pointer;
    LLVMGetEntryBasicBlock: fn(Pointer) -> Pointer;
    LLVMGetFirstBasicBlock: fn(Pointer) -> Pointer;
    LLVMGetFirstInstruction: fn(Pointer) -> Pointer;
    LLVMGetFunctionCallConv: fn(Pointer) -> UInt;
    LLVMGetInitializer: fn(Pointer) -> Pointer;
    LLVMGetLinkage: fn(Pointer) -> Int;
    LLVMGetNextBasicBlock: fn(Pointer) -> Pointer;
    LLVMGetNextInstruction: fn(Pointer) -> Pointer;
    LLVMGetNumOperands: fn(Pointer) -> Int;
    LLVMGetOperand: fn(Pointer, UInt) -> Pointer;
    LLVMGetParam: fn(Pointer, UInt) -> Pointer;
    LLVMGetSection: fn(Pointer) -> CStr;
    LLVMGetValueKind: fn(Pointer) -> Int;
    LLVMGetValueName2: fn(Pointer, SizeTPointer) -> CStr;
    LLVMGlobalGetValueType: fn(Pointer) -> Pointer;
    LLVMIsConstant: fn(Pointer) -> Bool;
    LLVMIsDeclaration: fn(Pointer) -> Bool;
    LLVMIsGlobalConstant: fn(Pointer) -> Bool;
    LLVMIsUndef: fn(Pointer) -> Bool;
    LLVMPrintValueToString: fn(Pointer) -> CStr;
    LLVMReplaceAllUsesWith: fn(Pointer, Pointer);
    LLVMSetAlignment: fn(Pointer, UInt);
    LLVMSetFunctionCallConv: fn(Pointer, UInt);
    LLVMSetGlobalConstant: fn(Pointer, Bool);
    LLVMSetInitializer: fn(Pointer, Pointer);
    LLVMSetLinkage: fn(Pointer, Int);
    LLVMSetSection: fn(Pointer, CStr);
    LLVMSetValueName2: fn(Pointer, CStr, SizeT);
    LLVMTypeOf: fn(Pointer) -> Pointer;
    LLVMValueAsBasicBlock: fn(Pointer) -> Pointer;

    // Instruction building.
    LLVMAddCase: fn(Pointer, Pointer, Pointer);
    LLVMAddIncoming: fn(Pointer, PointerToPointer, PointerToPointer, UInt);
    LLVMBuildAShr: fn(Pointer, Pointer, Pointer, CStr) -> Pointer;
    LLVMBuildAdd: fn(Pointer, Pointer, Pointer, CStr) -> Pointer;
    LLVMBuildAlloca: fn(Pointer, Pointer, CStr) -> Pointer;
    LLVMBuildAnd: fn(Pointer, Pointer, Pointer, CStr) -> Pointer;
    LLVMBuildBitCast: fn(Pointer, Pointer, Pointer, CStr) -> Pointer;
    LLVMBuildBr: fn(Pointer, Pointer) -> Pointer;
    LLVMBuildCall2: fn(Pointer, Pointer, Pointer, PointerToPointer, UInt, CStr) -> Pointer;
    LLVMBuildCondBr: fn(Pointer, Pointer, Pointer, Pointer) -> Pointer;
    LLVMBuildExactSDiv: fn(Pointer, Pointer, Pointer, CStr) -> Pointer;
    LLVMBuildFAdd: fn(Pointer, Pointer, Pointer, CStr) -> Pointer;
    LLVMBuildFCmp: fn(Pointer, Int, Pointer, Pointer, CStr) -> Pointer;
    LLVMBuildFDiv: fn(Pointer, Pointer, Pointer, CStr) -> Pointer;
    LLVMBuildFMul: fn(Pointer, Pointer, Pointer, CStr) -> Pointer;
    LLVMBuildFNeg: fn(Pointer, Pointer, CStr) -> Pointer;
    LLVMBuildFPCast: fn(Pointer, Pointer, Pointer, CStr) -> Pointer;
    LLVMBuildFPExt: fn(Pointer, Pointer, Pointer, CStr) -> Pointer;
    LLVMBuildFPToSI: fn(Pointer, Pointer, Pointer, CStr) -> Pointer;
    LLVMBuildFPToUI: fn(Pointer, Pointer, Pointer, CStr) -> Pointer;
    LLVMBuildFPTrunc: fn(Pointer, Pointer, Pointer, CStr) -> Pointer;
    LLVMBuildFRem: fn(Pointer, Pointer, Pointer, CStr) -> Pointer;
    LLVMBuildFSub: fn(Pointer, Pointer, Pointer, CStr) -> Pointer;
    LLVMBuildGEP2: fn(Pointer, Pointer, Pointer, PointerToPointer, UInt, CStr) -> Pointer;
    LLVMBuildGlobalStringPtr: fn(Pointer, CStr, CStr) -> Pointer;
    LLVMBuildICmp: fn(Pointer, Int, Pointer, Pointer, CStr) -> Pointer;
    LLVMBuildIntCast2: fn(Pointer, Pointer, Pointer, Bool, CStr) -> Pointer;
    LLVMBuildIntToPtr: fn(Pointer, Pointer, Pointer, CStr) -> Pointer;
    LLVMBuildLShr: fn(Pointer, Pointer, Pointer, CStr) -> Pointer;
    LLVMBuildLoad2: fn(Pointer, Pointer, Pointer, CStr) -> Pointer;
    LLVMBuildMul: fn(Pointer, Pointer, Pointer, CStr) -> Pointer;
    LLVMBuildNSWAdd: fn(Pointer, Pointer, Pointer, CStr) -> Pointer;
    LLVMBuildNSWMul: fn(Pointer, Pointer, Pointer, CStr) -> Pointer;
    LLVMBuildNSWSub: fn(Pointer, Pointer, Pointer, CStr) -> Pointer;
    LLVMBuildNUWAdd: fn(Pointer, Pointer, Pointer, CStr) -> Pointer;
    LLVMBuildNUWMul: fn(Pointer, Pointer, Pointer, CStr) -> Pointer;
    LLVMBuildNUWSub: fn(Pointer, Pointer, Pointer, CStr) -> Pointer;
    LLVMBuildNeg: fn(Pointer, Pointer, CStr) -> Pointer;
    LLVMBuildNot: fn(Pointer, Pointer, CStr) -> Pointer;
    LLVMBuildOr: fn(Pointer, Pointer, Pointer, CStr) -> Pointer;
    LLVMBuildPhi: fn(Pointer, Pointer, CStr) -> Pointer;
    LLVMBuildPointerCast: fn(Pointer, Pointer, Pointer, CStr) -> Pointer;
    LLVMBuildPtrToInt: fn(Pointer, Pointer, Pointer, CStr) -> Pointer;
    LLVMBuildRet: fn(Pointer, Pointer) -> Pointer;
    LLVMBuildRetVoid: fn(Pointer) -> Pointer;
    LLVMBuildSDiv: fn(Pointer, Pointer, Pointer, CStr) -> Pointer;
    LLVMBuildSExt: fn(Pointer, Pointer, Pointer, CStr) -> Pointer;
    LLVMBuildSIToFP: fn(Pointer, Pointer, Pointer, CStr) -> Pointer;
    LLVMBuildSRem: fn(Pointer, Pointer, Pointer, CStr) -> Pointer;
    LLVMBuildSelect: fn(Pointer, Pointer, Pointer, Pointer, CStr) -> Pointer;
    LLVMBuildShl: fn(Pointer, Pointer, Pointer, CStr) -> Pointer;
    LLVMBuildStore: fn(Pointer, Pointer, Pointer) -> Pointer;
    LLVMBuildStructGEP2: fn(Pointer, Pointer, Pointer, UInt, CStr) -> Pointer;
    LLVMBuildSub: fn(Pointer, Pointer, Pointer, CStr) -> Pointer;
    LLVMBuildSwitch: fn(Pointer, Pointer, Pointer, UInt) -> Pointer;
    LLVMBuildTrunc: fn(Pointer, Pointer, Pointer, CStr) -> Pointer;
    LLVMBuildUDiv: fn(Pointer, Pointer, Pointer, CStr) -> Pointer;
    LLVMBuildUIToFP: fn(Pointer, Pointer, Pointer, CStr) -> Pointer;
    LLVMBuildURem: fn(Pointer, Pointer, Pointer, CStr) -> Pointer;
    LLVMBuildUnreachable: fn(Pointer) -> Pointer;
    LLVMBuildXor: fn(Pointer, Pointer, Pointer, CStr) -> Pointer;
    LLVMBuildZExt: fn(Pointer, Pointer, Pointer, CStr) -> Pointer;
    LLVMClearInsertionPosition: fn(Pointer);
    LLVMCreateBuilderInContext: fn(Pointer) -> Pointer;
    LLVMDisposeBuilder: fn(Pointer);
    LLVMGetInsertBlock: fn(Pointer) -> Pointer;
    LLVMGetInstructionParent: fn(Pointer) -> Pointer;
    LLVMInsertIntoBuilder: fn(Pointer, Pointer);
    LLVMPositionBuilderAtEnd: fn(Pointer, Pointer);
    LLVMPositionBuilderBefore: fn(Pointer, Pointer);

    // Metadata and debug info.
    LLVMValueAsMetadata: fn(Pointer) -> Pointer;
    LLVMMetadataAsValue: fn(Pointer, Pointer) -> Pointer;
    LLVMGetMetadataKind: fn(Pointer) -> UInt;
    LLVMGetMDString: fn(Pointer, UIntPointer) -> CStr;
    LLVMGetMDNodeNumOperands: fn(Pointer) -> UInt;
    LLVMGetMDNodeOperands: fn(Pointer, PointerToPointer);
    LLVMGetMDKindIDInContext: fn(Pointer, CStr, UInt) -> UInt;
    LLVMGetNamedMetadataNumOperands: fn(Pointer, CStr) -> UInt;
    LLVMGetNamedMetadataOperands: fn(Pointer, CStr, PointerToPointer);
    LLVMGetFirstNamedMetadata: fn(Pointer) -> Pointer;
    LLVMGetNextNamedMetadata: fn(Pointer) -> Pointer;
    LLVMGetNamedMetadataName: fn(Pointer, SizeTPointer) -> CStr;
    LLVMDebugMetadataVersion: fn() -> UInt;
    LLVMGetModuleDebugMetadataVersion: fn(Pointer) -> UInt;
    LLVMStripModuleDebugInfo: fn(Pointer) -> Bool;
    LLVMGetSubprogram: fn(Pointer) -> Pointer;
    LLVMInstructionGetDebugLoc: fn(Pointer) -> Pointer;
    LLVMGlobalCopyAllMetadata: fn(Pointer, SizeTPointer) -> Pointer;
    LLVMValueMetadataEntriesGetKind: fn(Pointer, UInt) -> UInt;
    LLVMValueMetadataEntriesGetMetadata: fn(Pointer, UInt) -> Pointer;
    LLVMDisposeValueMetadataEntries: fn(Pointer);
    LLVMDITypeGetName: fn(Pointer, SizeTPointer) -> CStr;
    LLVMDITypeGetSizeInBits: fn(Pointer) -> ULongLong;
    LLVMDITypeGetOffsetInBits: fn(Pointer) -> ULongLong;
    LLVMDITypeGetAlignInBits: fn(Pointer) -> UInt;
    LLVMDITypeGetLine: fn(Pointer) -> UInt;
    LLVMDIVariableGetLine: fn(Pointer) -> UInt;
    LLVMDIVariableGetFile: fn(Pointer) -> Pointer;
    LLVMDIVariableGetScope: fn(Pointer) -> Pointer;
    LLVMDISubprogramGetLine: fn(Pointer) -> UInt;
    LLVMDILocationGetLine: fn(Pointer) -> UInt;
    LLVMDILocationGetColumn: fn(Pointer) -> UInt;
    LLVMDILocationGetScope: fn(Pointer) -> Pointer;
    LLVMDIScopeGetFile: fn(Pointer) -> Pointer;
    LLVMDIFileGetFilename: fn(Pointer, UIntPointer) -> CStr;
    LLVMDIFileGetDirectory: fn(Pointer, UIntPointer) -> CStr;
    LLVMDIGlobalVariableExpressionGetVariable: fn(Pointer) -> Pointer;

    // Pass management.
    LLVMCreateFunctionPassManagerForModule: fn(Pointer) -> Pointer;
    LLVMCreatePassBuilderOptions: fn() -> Pointer;
    LLVMCreatePassManager: fn() -> Pointer;
    LLVMDisposePassBuilderOptions: fn(Pointer);
    LLVMDisposePassManager: fn(Pointer);
    LLVMFinalizeFunctionPassManager: fn(Pointer) -> Bool;
    LLVMInitializeFunctionPassManager: fn(Pointer) -> Bool;
    LLVMPassBuilderOptionsSetDebugLogging: fn(Pointer, Bool);
    LLVMPassBuilderOptionsSetLoopInterleaving: fn(Pointer, Bool);
    LLVMPassBuilderOptionsSetLoopUnrolling: fn(Pointer, Bool);
    LLVMPassBuilderOptionsSetLoopVectorization: fn(Pointer, Bool);
    LLVMPassBuilderOptionsSetMergeFunctions: fn(Pointer, Bool);
    LLVMPassBuilderOptionsSetSLPVectorization: fn(Pointer, Bool);
    LLVMPassBuilderOptionsSetVerifyEach: fn(Pointer, Bool);
    LLVMRunFunctionPassManager: fn(Pointer, Pointer) -> Bool;
    LLVMRunPassManager: fn(Pointer, Pointer) -> Bool;

    // Execution engines.
    LLVMAddGlobalMapping: fn(Pointer, Pointer, Pointer);
    LLVMAddModule: fn(Pointer, Pointer);
    LLVMCreateExecutionEngineForModule: fn(PointerToPointer, Pointer, CStrPointer) -> Bool;
    LLVMCreateGenericValueOfFloat: fn(Pointer, Double) -> Pointer;
    LLVMCreateGenericValueOfInt: fn(Pointer, ULongLong, Bool) -> Pointer;
    LLVMCreateGenericValueOfPointer: fn(Pointer) -> Pointer;
    LLVMCreateInterpreterForModule: fn(PointerToPointer, Pointer, CStrPointer) -> Bool;
    LLVMCreateJITCompilerForModule: fn(PointerToPointer, Pointer, UInt, CStrPointer) -> Bool;
    LLVMDisposeExecutionEngine: fn(Pointer);
    LLVMDisposeGenericValue: fn(Pointer);
    LLVMFindFunction: fn(Pointer, CStr, PointerToPointer) -> Bool;
    LLVMGetGlobalParent: fn(Pointer) -> Pointer;
    LLVMGenericValueIntWidth: fn(Pointer) -> UInt;
    LLVMGenericValueToFloat: fn(Pointer, Pointer) -> Double;
    LLVMGenericValueToInt: fn(Pointer, Bool) -> ULongLong;
    LLVMGenericValueToPointer: fn(Pointer) -> Pointer;
    LLVMGetExecutionEngineTargetData: fn(Pointer) -> Pointer;
    LLVMGetFunctionAddress: fn(Pointer, CStr) -> ULongLong;
    LLVMGetGlobalValueAddress: fn(Pointer, CStr) -> ULongLong;
    LLVMGetPointerToGlobal: fn(Pointer, Pointer) -> Pointer;
    LLVMLinkInInterpreter: fn();
    LLVMLinkInMCJIT: fn();
    LLVMRemoveModule: fn(Pointer, Pointer, PointerToPointer, CStrPointer) -> Bool;
    LLVMRunFunction: fn(Pointer, Pointer, UInt, PointerToPointer) -> Pointer;
    LLVMRunFunctionAsMain: fn(Pointer, Pointer, UInt, CStrPointer, CStrPointer) -> Int;
    LLVMRunStaticConstructors: fn(Pointer);
    LLVMRunStaticDestructors: fn(Pointer);

    // Targets and data layouts.
    LLVMABIAlignmentOfType: fn(Pointer, Pointer) -> UInt;
    LLVMABISizeOfType: fn(Pointer, Pointer) -> ULongLong;
    LLVMByteOrder: fn(Pointer) -> Int;
    LLVMCallFrameAlignmentOfType: fn(Pointer, Pointer) -> UInt;
    LLVMCopyStringRepOfTargetData: fn(Pointer) -> CStr;
    LLVMCreateTargetData: fn(CStr) -> Pointer;
    LLVMDisposeTargetData: fn(Pointer);
    LLVMElementAtOffset: fn(Pointer, Pointer, ULongLong) -> UInt;
    LLVMGetDefaultTargetTriple: fn() -> CStr;
    LLVMGetFirstTarget: fn() -> Pointer;
    LLVMGetNextTarget: fn(Pointer) -> Pointer;
    LLVMGetTargetDescription: fn(Pointer) -> CStr;
    LLVMGetTargetFromTriple: fn(CStr, PointerToPointer, CStrPointer) -> Bool;
    LLVMGetTargetName: fn(Pointer) -> CStr;
    LLVMIntPtrTypeInContext: fn(Pointer, Pointer) -> Pointer;
    LLVMOffsetOfElement: fn(Pointer, Pointer, UInt) -> ULongLong;
    LLVMPointerSize: fn(Pointer) -> UInt;
    LLVMPointerSizeForAS: fn(Pointer, UInt) -> UInt;
    LLVMPreferredAlignmentOfGlobal: fn(Pointer, Pointer) -> UInt;
    LLVMPreferredAlignmentOfType: fn(Pointer, Pointer) -> UInt;
    LLVMSizeOfTypeInBits: fn(Pointer, Pointer) -> ULongLong;
    LLVMStoreSizeOfType: fn(Pointer, Pointer) -> ULongLong;
    LLVMTargetHasAsmBackend: fn(Pointer) -> Bool;
    LLVMTargetHasJIT: fn(Pointer) -> Bool;
    LLVMTargetHasTargetMachine: fn(Pointer) -> Bool;

    // Object files.
    LLVMBinaryGetType: fn(Pointer) -> Int;
    LLVMCreateBinary: fn(Pointer, Pointer, CStrPointer) -> Pointer;
    LLVMDisposeBinary: fn(Pointer);
    LLVMDisposeRelocationIterator: fn(Pointer);
    LLVMDisposeSectionIterator: fn(Pointer);
    LLVMDisposeSymbolIterator: fn(Pointer);
    LLVMGetRelocationOffset: fn(Pointer) -> ULongLong;
    LLVMGetRelocationSymbol: fn(Pointer) -> Pointer;
    LLVMGetRelocationType: fn(Pointer) -> ULongLong;
    LLVMGetRelocationTypeName: fn(Pointer) -> CStr;
    LLVMGetRelocationValueString: fn(Pointer) -> CStr;
    LLVMGetRelocations: fn(Pointer) -> Pointer;
    LLVMGetSectionAddress: fn(Pointer) -> ULongLong;
    LLVMGetSectionContainsSymbol: fn(Pointer, Pointer) -> Bool;
    LLVMGetSectionContents: fn(Pointer) -> CStr;
    LLVMGetSectionName: fn(Pointer) -> CStr;
    LLVMGetSectionSize: fn(Pointer) -> ULongLong;
    LLVMGetSymbolAddress: fn(Pointer) -> ULongLong;
    LLVMGetSymbolName: fn(Pointer) -> CStr;
    LLVMGetSymbolSize: fn(Pointer) -> ULongLong;
    LLVMIsRelocationIteratorAtEnd: fn(Pointer, Pointer) -> Bool;
    LLVMMoveToContainingSection: fn(Pointer, Pointer);
    LLVMMoveToNextRelocation: fn(Pointer);
    LLVMMoveToNextSection: fn(Pointer);
    LLVMMoveToNextSymbol: fn(Pointer);
    LLVMObjectFileCopySectionIterator: fn(Pointer) -> Pointer;
    LLVMObjectFileCopySymbolIterator: fn(Pointer) -> Pointer;
    LLVMObjectFileIsSectionIteratorAtEnd: fn(Pointer, Pointer) -> Bool;
    LLVMObjectFileIsSymbolIteratorAtEnd: fn(Pointer, Pointer) -> Bool;
};

/// Every target initializer takes and returns nothing.
const TARGET_INITIALIZER: Prototype = Prototype::new(CType::Void, &[]);

/// Builds the full table of declared prototypes.
#[must_use]
pub fn prototypes() -> Prototypes {
    let initializers = KNOWN_TARGETS
        .iter()
        .flat_map(|target| target.symbols)
        .map(|symbol| (symbol, TARGET_INITIALIZER));

    DECLARED.iter().copied().chain(initializers).collect()
}

#[cfg(test)]
mod test {
    use std::collections::HashSet;

    use crate::library::{
        declarations::{prototypes, DECLARED},
        prototype::{CType, Prototype},
    };

    #[test]
    fn every_symbol_is_declared_once() {
        let mut seen = HashSet::new();
        for (name, _) in DECLARED {
            assert!(seen.insert(*name), "{name} is declared twice");
        }
    }

    #[test]
    fn declarations_use_c_terms() {
        let table = prototypes();
        assert_eq!(
            table.get("LLVMModuleCreateWithNameInContext"),
            Some(Prototype::new(CType::Pointer, &[CType::CStr, CType::Pointer]))
        );
        assert_eq!(
            table.get("LLVMDisposeMessage"),
            Some(Prototype::new(CType::Void, &[CType::CStr]))
        );
        assert_eq!(
            table.get("LLVMInitializeX86TargetInfo"),
            Some(Prototype::new(CType::Void, &[]))
        );
        assert!(table.get("LLVMNotARealFunction").is_none());
    }
}
