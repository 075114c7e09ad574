//! A small stack-based script VM.
//!
//! Builtins live in a fixed, numbered table; scripts are byte-addressed
//! bytecode loaded back to back into one code segment. Everything an
//! embedding layer may change goes through [`VmHooks`].

pub mod builder;
pub mod console;
pub mod error;
pub mod loader;
pub mod machine;
pub mod native;
pub mod opcode;
pub mod specs;
pub mod stdlib;
pub mod symbols;
pub mod value;

pub use builder::CodeBuilder;
pub use console::{CapturedConsole, Console, ConsoleLevel, StdConsole};
pub use error::RuntimeError;
pub use loader::{FunctionSymbol, LoaderError, ScriptImage};
pub use machine::{CallFrame, FrameView, LoadedScript, PassThrough, VmHooks, Vm};
pub use native::{BuiltinFn, BuiltinObj};
pub use opcode::{Instruction, OpCode};
pub use symbols::SymbolTable;
pub use value::{Value, VarType};
