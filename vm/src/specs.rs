use std::ops::RangeInclusive;

pub struct BuiltinMeta {
    pub name: &'static str,
    pub id: u16,
}

// THE SINGLE SOURCE OF TRUTH
// Builtin IDs are fixed and baked into compiled scripts. The symbol table,
// the dispatch table and the diagnostics all key off these values.
pub const BUILTIN_FUNCTIONS: &[BuiltinMeta] = &[
    BuiltinMeta { name: "print", id: 0x01 },
    BuiltinMeta { name: "println", id: 0x02 },
    BuiltinMeta { name: "assert", id: 0x03 },
    BuiltinMeta { name: "assertex", id: 0x04 },
    BuiltinMeta { name: "assertmsg", id: 0x05 },
    BuiltinMeta { name: "isdefined", id: 0x06 },
    BuiltinMeta { name: "isdedicatedserver", id: 0x07 },
    BuiltinMeta { name: "abs", id: 0x08 },
    BuiltinMeta { name: "tolower", id: 0x09 },
    BuiltinMeta { name: "int", id: 0x0A },
];

pub const BUILTIN_METHODS: &[BuiltinMeta] = &[
    BuiltinMeta { name: "size", id: 0x8000 },
    BuiltinMeta { name: "substr", id: 0x8001 },
];

/// Slots in the function dispatch table. Function IDs must stay below this.
pub const FUNCTION_TABLE_SIZE: u32 = 0x1000;

/// First ID past the builtin function range. Extension functions start here.
pub const FIRST_EXTENSION_FUNCTION_ID: u16 = 0x2E0;

/// Builtin method IDs start here.
pub const METHOD_ID_BASE: u16 = 0x8000;

/// Call-site IDs above this are methods, at or below it are functions.
pub const METHOD_ID_THRESHOLD: u16 = 0x1000;

const _: () = assert!(
    (FIRST_EXTENSION_FUNCTION_ID as u32) < FUNCTION_TABLE_SIZE,
    "extension range must fit in the dispatch table"
);
const _: () = assert!(
    FUNCTION_TABLE_SIZE <= METHOD_ID_THRESHOLD as u32,
    "function IDs must not reach the method threshold"
);

// --- NATIVE CALL OPCODES ---
// Every instruction in these ranges ends with a little-endian u16 function ID,
// so the callee ID of a faulting call sits two bytes before the fault position.
pub const BUILTIN_METHOD_CALL_OPS: RangeInclusive<u8> = 0x1A..=0x20;
pub const BUILTIN_FUNCTION_CALL_OPS: RangeInclusive<u8> = 0xA9..=0xAF;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum NativeCallKind {
    Method,
    Function,
}

pub const NATIVE_CALL_OPS: &[(RangeInclusive<u8>, NativeCallKind)] = &[
    (BUILTIN_METHOD_CALL_OPS, NativeCallKind::Method),
    (BUILTIN_FUNCTION_CALL_OPS, NativeCallKind::Function),
];

/// Classify a raw opcode byte as a native call site, if it is one.
pub fn native_call_kind(opcode: u8) -> Option<NativeCallKind> {
    NATIVE_CALL_OPS
        .iter()
        .find(|(range, _)| range.contains(&opcode))
        .map(|(_, kind)| *kind)
}

// --- RUNTIME LIMITS ---
pub const MAX_CALL_DEPTH: usize = 64;
pub const STACK_MAX: usize = 4096;

/// Address of the first byte of the code segment. Zero is never a valid code address.
pub const CODE_SEGMENT_BASE: u32 = 0x0001_0000;

pub fn builtin_function(name: &str) -> Option<&'static BuiltinMeta> {
    BUILTIN_FUNCTIONS
        .iter()
        .find(|meta| meta.name.eq_ignore_ascii_case(name))
}
