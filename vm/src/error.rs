use std::fmt;

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum RuntimeError {
    StackUnderflow,
    StackOverflow,
    CallDepthExceeded,
    InvalidOpcode(u8),
    /// Instruction operands ran past the end of the code segment.
    TruncatedInstruction(u32),
    /// Code address outside every loaded script.
    BadAddress(u32),
    UnknownFunction(u32),
    ParamOutOfRange(usize),
    TypeMismatch(String),
    /// Raised by the extension layer after a native implementation failed.
    /// The message itself travels through the extension's pending-error slot.
    NativeFailure,
    Unknown(String),
}

impl fmt::Display for RuntimeError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            RuntimeError::StackUnderflow => write!(f, "stack underflow"),
            RuntimeError::StackOverflow => write!(f, "stack overflow"),
            RuntimeError::CallDepthExceeded => write!(f, "script call depth exceeded"),
            RuntimeError::InvalidOpcode(op) => write!(f, "invalid opcode 0x{:X}", op),
            RuntimeError::TruncatedInstruction(pos) => {
                write!(f, "truncated instruction at {:#x}", pos)
            }
            RuntimeError::BadAddress(pos) => write!(f, "code address {:#x} is not loaded", pos),
            RuntimeError::UnknownFunction(id) => write!(f, "unknown native function id {}", id),
            RuntimeError::ParamOutOfRange(index) => {
                write!(f, "parameter {} does not exist", index)
            }
            RuntimeError::TypeMismatch(msg) => write!(f, "type mismatch: {}", msg),
            RuntimeError::NativeFailure => write!(f, "native call failed"),
            RuntimeError::Unknown(msg) => write!(f, "{}", msg),
        }
    }
}

impl std::error::Error for RuntimeError {}

impl From<String> for RuntimeError {
    fn from(s: String) -> Self {
        RuntimeError::Unknown(s)
    }
}

impl From<&str> for RuntimeError {
    fn from(s: &str) -> Self {
        RuntimeError::Unknown(s.to_string())
    }
}
