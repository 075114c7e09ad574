//! Bytecode assembly for tooling and tests.
//!
//! `CodeBuilder` emits instructions, records function entry points and
//! debug-map markers, and packages the result as a [`ScriptImage`].

use std::fmt;

use byteorder::{LittleEndian, WriteBytesExt};

use crate::loader::{FunctionSymbol, ScriptImage};
use crate::opcode::{Instruction, MAX_STRING_LEN};
use crate::symbols::SymbolTable;

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum BuildError {
    /// No native function or method with this name in the symbol table
    UnknownNative(String),
    /// No script function with this name defined so far
    UnknownScriptFunction(String),
    /// String literal longer than its 16-bit length prefix allows
    StringTooLong(usize),
}

impl fmt::Display for BuildError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            BuildError::UnknownNative(name) => write!(f, "unknown native '{}'", name),
            BuildError::UnknownScriptFunction(name) => {
                write!(f, "unknown script function '{}'", name)
            }
            BuildError::StringTooLong(len) => write!(
                f,
                "string literal of {} bytes exceeds the {} byte limit",
                len,
                MAX_STRING_LEN
            ),
        }
    }
}

impl std::error::Error for BuildError {}

#[derive(Debug, Default)]
pub struct CodeBuilder {
    code: Vec<u8>,
    functions: Vec<FunctionSymbol>,
    lines: Vec<(u32, u16, u16)>,
}

impl CodeBuilder {
    pub fn new() -> Self {
        Self::default()
    }

    /// Offset of the next instruction, relative to the script start.
    pub fn offset(&self) -> u32 {
        self.code.len() as u32
    }

    /// Start a named function at the current offset.
    pub fn function(&mut self, name: &str) -> u32 {
        let offset = self.offset();
        self.functions.push(FunctionSymbol {
            name: name.to_string(),
            offset,
        });
        offset
    }

    pub fn function_offset(&self, name: &str) -> Option<u32> {
        self.functions
            .iter()
            .find(|f| f.name.eq_ignore_ascii_case(name))
            .map(|f| f.offset)
    }

    /// Record a debug-map marker: code from here on belongs to `line:col`.
    pub fn line(&mut self, line: u16, column: u16) -> &mut Self {
        self.lines.push((self.offset(), line, column));
        self
    }

    pub fn emit(&mut self, insn: Instruction) -> &mut Self {
        insn.encode(&mut self.code);
        self
    }

    pub fn push_int(&mut self, n: i32) -> &mut Self {
        self.emit(Instruction::PushInt(n))
    }

    pub fn push_string(&mut self, s: &str) -> Result<&mut Self, BuildError> {
        if s.len() > MAX_STRING_LEN {
            return Err(BuildError::StringTooLong(s.len()));
        }
        Ok(self.emit(Instruction::PushString(s.to_string())))
    }

    pub fn push_undefined(&mut self) -> &mut Self {
        self.emit(Instruction::PushUndefined)
    }

    pub fn push_function(&mut self, name: &str) -> Result<&mut Self, BuildError> {
        let offset = self
            .function_offset(name)
            .ok_or_else(|| BuildError::UnknownScriptFunction(name.to_string()))?;
        Ok(self.emit(Instruction::PushFunction(offset)))
    }

    pub fn load_param(&mut self, index: u8) -> &mut Self {
        self.emit(Instruction::LoadParam(index))
    }

    pub fn pop(&mut self) -> &mut Self {
        self.emit(Instruction::Pop)
    }

    pub fn add(&mut self) -> &mut Self {
        self.emit(Instruction::Add)
    }

    pub fn ret(&mut self) -> &mut Self {
        self.emit(Instruction::Return)
    }

    pub fn end(&mut self) -> &mut Self {
        self.emit(Instruction::End)
    }

    pub fn call_builtin(&mut self, id: u16, argc: u8) -> &mut Self {
        self.emit(Instruction::CallBuiltin { argc, id })
    }

    pub fn call_method(&mut self, id: u16, argc: u8) -> &mut Self {
        self.emit(Instruction::CallBuiltinMethod { argc, id })
    }

    /// Call a native function by name, resolved through the VM's symbol table.
    pub fn call(
        &mut self,
        symbols: &SymbolTable,
        name: &str,
        argc: u8,
    ) -> Result<&mut Self, BuildError> {
        let id = symbols
            .func_id(name)
            .ok_or_else(|| BuildError::UnknownNative(name.to_string()))?;
        Ok(self.call_builtin(id, argc))
    }

    /// Call a native method by name. `self` must be pushed after the arguments.
    pub fn call_method_named(
        &mut self,
        symbols: &SymbolTable,
        name: &str,
        argc: u8,
    ) -> Result<&mut Self, BuildError> {
        let id = symbols
            .meth_id(name)
            .ok_or_else(|| BuildError::UnknownNative(name.to_string()))?;
        Ok(self.call_method(id, argc))
    }

    /// Call a script function defined earlier in this builder.
    pub fn script_call(&mut self, name: &str, argc: u8) -> Result<&mut Self, BuildError> {
        let offset = self
            .function_offset(name)
            .ok_or_else(|| BuildError::UnknownScriptFunction(name.to_string()))?;
        Ok(self.emit(Instruction::ScriptCall { offset, argc }))
    }

    /// Package the code. The debug map is attached only if any line was recorded.
    pub fn finish(self, name: &str) -> ScriptImage {
        let devmap = if self.lines.is_empty() {
            None
        } else {
            Some(encode_devmap(&self.lines))
        };
        ScriptImage {
            name: name.to_string(),
            functions: self.functions,
            code: self.code,
            devmap,
        }
    }
}

/// Encode `(offset, line, column)` records in the debug-map blob layout.
pub fn encode_devmap(records: &[(u32, u16, u16)]) -> Vec<u8> {
    let mut out = Vec::with_capacity(4 + records.len() * 8);
    // Writing into a Vec cannot fail.
    let _ = out.write_u32::<LittleEndian>(records.len() as u32);
    for &(offset, line, column) in records {
        let _ = out.write_u32::<LittleEndian>(offset);
        let _ = out.write_u16::<LittleEndian>(line);
        let _ = out.write_u16::<LittleEndian>(column);
    }
    out
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn string_literals_up_to_the_prefix_limit() {
        let mut b = CodeBuilder::new();
        assert!(b.push_string(&"a".repeat(MAX_STRING_LEN)).is_ok());
        let emitted = b.offset();

        // 'é' is two bytes: one more would straddle the limit.
        let long = "é".repeat(MAX_STRING_LEN / 2 + 1);
        assert_eq!(
            b.push_string(&long).unwrap_err(),
            BuildError::StringTooLong(long.len())
        );
        assert_eq!(b.offset(), emitted);
    }
}
