//! OpCode definitions for the script VM
//!
//! Bytecode is byte-addressed. Every instruction starts with a one-byte
//! opcode followed by little-endian operands:
//!
//! - `PUSH_INT i32`, `PUSH_STRING u16 len + utf8`, `PUSH_FUNCTION u32 offset`
//! - `LOAD_PARAM u8`
//! - `SCRIPT_CALL u32 offset, u8 argc`
//! - `CALL_BUILTIN_N u16 id` / `CALL_BUILTIN u8 argc, u16 id` (same for methods)
//!
//! Function and call offsets are relative to the owning script's base address.

use std::fmt;
use std::io::{Cursor, Read, Write};

use byteorder::{LittleEndian, ReadBytesExt, WriteBytesExt};

use crate::specs::{BUILTIN_FUNCTION_CALL_OPS, BUILTIN_METHOD_CALL_OPS};

/// Virtual machine instruction
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[repr(u8)]
pub enum OpCode {
    // ===== Thread control =====
    /// End of thread: return undefined
    End = 0x00,
    /// Return: pop value, return it to the caller
    Return = 0x01,

    // ===== Stack =====
    PushUndefined = 0x02,
    PushInt = 0x03,
    PushString = 0x04,
    PushFunction = 0x05,
    Pop = 0x06,
    /// Push a copy of the current frame's parameter
    LoadParam = 0x07,

    // ===== Arithmetic =====
    Add = 0x08,
    Sub = 0x09,
    Mul = 0x0A,

    // ===== Builtin method calls (self on top of the arguments) =====
    CallBuiltinMethod0 = 0x1A,
    CallBuiltinMethod1 = 0x1B,
    CallBuiltinMethod2 = 0x1C,
    CallBuiltinMethod3 = 0x1D,
    CallBuiltinMethod4 = 0x1E,
    CallBuiltinMethod5 = 0x1F,
    CallBuiltinMethod = 0x20,

    // ===== Script calls =====
    ScriptCall = 0x30,

    // ===== Builtin function calls =====
    CallBuiltin0 = 0xA9,
    CallBuiltin1 = 0xAA,
    CallBuiltin2 = 0xAB,
    CallBuiltin3 = 0xAC,
    CallBuiltin4 = 0xAD,
    CallBuiltin5 = 0xAE,
    CallBuiltin = 0xAF,

    /// No operation
    Nop = 0xFF,
}

impl OpCode {
    /// Get opcode from byte value
    pub fn from_u8(byte: u8) -> Option<Self> {
        use OpCode::*;
        let op = match byte {
            0x00 => End,
            0x01 => Return,
            0x02 => PushUndefined,
            0x03 => PushInt,
            0x04 => PushString,
            0x05 => PushFunction,
            0x06 => Pop,
            0x07 => LoadParam,
            0x08 => Add,
            0x09 => Sub,
            0x0A => Mul,
            0x1A => CallBuiltinMethod0,
            0x1B => CallBuiltinMethod1,
            0x1C => CallBuiltinMethod2,
            0x1D => CallBuiltinMethod3,
            0x1E => CallBuiltinMethod4,
            0x1F => CallBuiltinMethod5,
            0x20 => CallBuiltinMethod,
            0x30 => ScriptCall,
            0xA9 => CallBuiltin0,
            0xAA => CallBuiltin1,
            0xAB => CallBuiltin2,
            0xAC => CallBuiltin3,
            0xAD => CallBuiltin4,
            0xAE => CallBuiltin5,
            0xAF => CallBuiltin,
            0xFF => Nop,
            _ => return None,
        };
        Some(op)
    }

    /// Convert opcode to byte value
    #[inline]
    pub fn as_u8(self) -> u8 {
        self as u8
    }

    /// Get human-readable name
    pub fn name(self) -> &'static str {
        match self {
            OpCode::End => "END",
            OpCode::Return => "RETURN",
            OpCode::PushUndefined => "PUSH_UNDEFINED",
            OpCode::PushInt => "PUSH_INT",
            OpCode::PushString => "PUSH_STRING",
            OpCode::PushFunction => "PUSH_FUNCTION",
            OpCode::Pop => "POP",
            OpCode::LoadParam => "LOAD_PARAM",
            OpCode::Add => "ADD",
            OpCode::Sub => "SUB",
            OpCode::Mul => "MUL",
            OpCode::CallBuiltinMethod0 => "CALL_BUILTIN_METHOD_0",
            OpCode::CallBuiltinMethod1 => "CALL_BUILTIN_METHOD_1",
            OpCode::CallBuiltinMethod2 => "CALL_BUILTIN_METHOD_2",
            OpCode::CallBuiltinMethod3 => "CALL_BUILTIN_METHOD_3",
            OpCode::CallBuiltinMethod4 => "CALL_BUILTIN_METHOD_4",
            OpCode::CallBuiltinMethod5 => "CALL_BUILTIN_METHOD_5",
            OpCode::CallBuiltinMethod => "CALL_BUILTIN_METHOD",
            OpCode::ScriptCall => "SCRIPT_CALL",
            OpCode::CallBuiltin0 => "CALL_BUILTIN_0",
            OpCode::CallBuiltin1 => "CALL_BUILTIN_1",
            OpCode::CallBuiltin2 => "CALL_BUILTIN_2",
            OpCode::CallBuiltin3 => "CALL_BUILTIN_3",
            OpCode::CallBuiltin4 => "CALL_BUILTIN_4",
            OpCode::CallBuiltin5 => "CALL_BUILTIN_5",
            OpCode::CallBuiltin => "CALL_BUILTIN",
            OpCode::Nop => "NOP",
        }
    }
}

impl fmt::Display for OpCode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.name())
    }
}

/// Symbolic name for a raw opcode byte, if it is a known opcode.
pub fn opcode_name(byte: u8) -> Option<&'static str> {
    OpCode::from_u8(byte).map(OpCode::name)
}

/// Longest string operand, bounded by its `u16` length prefix.
pub const MAX_STRING_LEN: usize = u16::MAX as usize;

/// Largest argument count encoded in the opcode itself.
const MAX_FIXED_ARGC: u8 = 5;

/// A decoded instruction with its operands.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Instruction {
    End,
    Return,
    PushUndefined,
    PushInt(i32),
    PushString(String),
    /// Script-relative function offset
    PushFunction(u32),
    Pop,
    LoadParam(u8),
    Add,
    Sub,
    Mul,
    ScriptCall { offset: u32, argc: u8 },
    CallBuiltin { argc: u8, id: u16 },
    CallBuiltinMethod { argc: u8, id: u16 },
    Nop,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum DecodeError {
    /// Unknown opcode byte
    InvalidOpcode(u8),
    /// Operands run past the end of the buffer
    Truncated,
    /// String operand is not valid UTF-8
    BadString,
}

impl fmt::Display for DecodeError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            DecodeError::InvalidOpcode(op) => write!(f, "invalid opcode 0x{:X}", op),
            DecodeError::Truncated => write!(f, "truncated instruction"),
            DecodeError::BadString => write!(f, "string operand is not valid UTF-8"),
        }
    }
}

impl From<std::io::Error> for DecodeError {
    fn from(_: std::io::Error) -> Self {
        DecodeError::Truncated
    }
}

impl Instruction {
    /// The opcode this instruction encodes to.
    pub fn opcode(&self) -> OpCode {
        match self {
            Instruction::End => OpCode::End,
            Instruction::Return => OpCode::Return,
            Instruction::PushUndefined => OpCode::PushUndefined,
            Instruction::PushInt(_) => OpCode::PushInt,
            Instruction::PushString(_) => OpCode::PushString,
            Instruction::PushFunction(_) => OpCode::PushFunction,
            Instruction::Pop => OpCode::Pop,
            Instruction::LoadParam(_) => OpCode::LoadParam,
            Instruction::Add => OpCode::Add,
            Instruction::Sub => OpCode::Sub,
            Instruction::Mul => OpCode::Mul,
            Instruction::ScriptCall { .. } => OpCode::ScriptCall,
            Instruction::CallBuiltin { argc, .. } => fixed_arity_op(*BUILTIN_FUNCTION_CALL_OPS.start(), *argc),
            Instruction::CallBuiltinMethod { argc, .. } => {
                fixed_arity_op(*BUILTIN_METHOD_CALL_OPS.start(), *argc)
            }
            Instruction::Nop => OpCode::Nop,
        }
    }

    pub fn encode(&self, out: &mut Vec<u8>) {
        // Writing into a Vec cannot fail.
        let _ = self.write_to(out);
    }

    fn write_to<W: Write>(&self, out: &mut W) -> std::io::Result<()> {
        let op = self.opcode();
        out.write_u8(op.as_u8())?;
        match self {
            Instruction::PushInt(n) => out.write_i32::<LittleEndian>(*n)?,
            Instruction::PushString(s) => {
                // Over-long strings are cut on a char boundary so the
                // operand still decodes. CodeBuilder rejects them up front.
                let mut len = s.len().min(MAX_STRING_LEN);
                while !s.is_char_boundary(len) {
                    len -= 1;
                }
                out.write_u16::<LittleEndian>(len as u16)?;
                out.write_all(&s.as_bytes()[..len])?;
            }
            Instruction::PushFunction(offset) => out.write_u32::<LittleEndian>(*offset)?,
            Instruction::LoadParam(index) => out.write_u8(*index)?,
            Instruction::ScriptCall { offset, argc } => {
                out.write_u32::<LittleEndian>(*offset)?;
                out.write_u8(*argc)?;
            }
            Instruction::CallBuiltin { argc, id } | Instruction::CallBuiltinMethod { argc, id } => {
                if op == OpCode::CallBuiltin || op == OpCode::CallBuiltinMethod {
                    out.write_u8(*argc)?;
                }
                out.write_u16::<LittleEndian>(*id)?;
            }
            _ => {}
        }
        Ok(())
    }

    /// Decode one instruction from the start of `bytes`. Returns the
    /// instruction and its encoded length.
    pub fn decode(bytes: &[u8]) -> Result<(Instruction, usize), DecodeError> {
        let mut cur = Cursor::new(bytes);
        let byte = cur.read_u8()?;
        let op = OpCode::from_u8(byte).ok_or(DecodeError::InvalidOpcode(byte))?;

        use OpCode::*;
        let insn = match op {
            End => Instruction::End,
            Return => Instruction::Return,
            PushUndefined => Instruction::PushUndefined,
            PushInt => Instruction::PushInt(cur.read_i32::<LittleEndian>()?),
            PushString => {
                let len = cur.read_u16::<LittleEndian>()? as usize;
                let mut buf = vec![0u8; len];
                cur.read_exact(&mut buf)?;
                Instruction::PushString(String::from_utf8(buf).map_err(|_| DecodeError::BadString)?)
            }
            PushFunction => Instruction::PushFunction(cur.read_u32::<LittleEndian>()?),
            Pop => Instruction::Pop,
            LoadParam => Instruction::LoadParam(cur.read_u8()?),
            Add => Instruction::Add,
            Sub => Instruction::Sub,
            Mul => Instruction::Mul,
            ScriptCall => {
                let offset = cur.read_u32::<LittleEndian>()?;
                let argc = cur.read_u8()?;
                Instruction::ScriptCall { offset, argc }
            }
            CallBuiltinMethod0 | CallBuiltinMethod1 | CallBuiltinMethod2 | CallBuiltinMethod3
            | CallBuiltinMethod4 | CallBuiltinMethod5 => {
                let argc = byte - BUILTIN_METHOD_CALL_OPS.start();
                let id = cur.read_u16::<LittleEndian>()?;
                Instruction::CallBuiltinMethod { argc, id }
            }
            CallBuiltinMethod => {
                let argc = cur.read_u8()?;
                let id = cur.read_u16::<LittleEndian>()?;
                Instruction::CallBuiltinMethod { argc, id }
            }
            CallBuiltin0 | CallBuiltin1 | CallBuiltin2 | CallBuiltin3 | CallBuiltin4
            | CallBuiltin5 => {
                let argc = byte - BUILTIN_FUNCTION_CALL_OPS.start();
                let id = cur.read_u16::<LittleEndian>()?;
                Instruction::CallBuiltin { argc, id }
            }
            CallBuiltin => {
                let argc = cur.read_u8()?;
                let id = cur.read_u16::<LittleEndian>()?;
                Instruction::CallBuiltin { argc, id }
            }
            Nop => Instruction::Nop,
        };
        Ok((insn, cur.position() as usize))
    }
}

fn fixed_arity_op(first: u8, argc: u8) -> OpCode {
    if argc <= MAX_FIXED_ARGC {
        OpCode::from_u8(first + argc).unwrap_or(OpCode::Nop)
    } else if first == *BUILTIN_METHOD_CALL_OPS.start() {
        OpCode::CallBuiltinMethod
    } else {
        OpCode::CallBuiltin
    }
}

impl fmt::Display for Instruction {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = self.opcode().name();
        match self {
            Instruction::PushInt(n) => write!(f, "{:<22} {}", name, n),
            Instruction::PushString(s) => write!(f, "{:<22} {:?}", name, s),
            Instruction::PushFunction(offset) => write!(f, "{:<22} +{:#x}", name, offset),
            Instruction::LoadParam(index) => write!(f, "{:<22} {}", name, index),
            Instruction::ScriptCall { offset, argc } => {
                write!(f, "{:<22} +{:#x} argc={}", name, offset, argc)
            }
            Instruction::CallBuiltin { argc, id } | Instruction::CallBuiltinMethod { argc, id } => {
                write!(f, "{:<22} id=0x{:04X} argc={}", name, id, argc)
            }
            _ => write!(f, "{}", name),
        }
    }
}
