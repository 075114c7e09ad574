use std::collections::HashMap;

use crate::console::{Console, StdConsole};
use crate::error::RuntimeError;
use crate::loader::{LoaderError, ScriptImage};
use crate::native::BuiltinObj;
use crate::opcode::{DecodeError, Instruction, OpCode};
use crate::specs::FUNCTION_TABLE_SIZE;
use crate::symbols::SymbolTable;
use crate::value::Value;

use super::arithmetic::ArithmeticOps;
use super::code::{CodeSegment, LoadedScript};
use super::control::ControlFlowOps;
use super::frame::{CallFrame, FrameView};
use super::hooks::VmHooks;
use super::native::NativeRegistry;
use super::stack::StackOps;

/// Where a thread started: everything above this is discarded on error.
#[derive(Debug, Clone, Copy)]
struct Mark {
    stack: usize,
    frames: usize,
    pos: u32,
    frame_start: Option<usize>,
}

/// The Virtual Machine struct
pub struct Vm {
    pub(crate) stack: Vec<Value>,
    pub(crate) frames: Vec<CallFrame>,
    /// Index of the running thread's sentinel frame
    pub(crate) frame_start: Option<usize>,
    /// Live code position of the top frame
    pub(crate) pos: u32,
    /// Opcode byte of the instruction being executed
    fault_opcode: u8,

    // Native call window
    pub(crate) params: Vec<Value>,
    pub(crate) self_value: Option<Value>,
    pub(crate) return_value: Value,

    pub(crate) func_table: Vec<Option<BuiltinObj>>,
    pub(crate) methods: HashMap<u16, BuiltinObj>,
    symbols: SymbolTable,

    pub(crate) code: CodeSegment,
    redirects: HashMap<u32, u32>,

    console: Box<dyn Console>,
}

impl Default for Vm {
    fn default() -> Self {
        Self::new()
    }
}

impl Vm {
    /// Create a new VM instance with bootstrapped builtins, printing to stdio.
    pub fn new() -> Self {
        Self::with_console(Box::new(StdConsole))
    }

    pub fn with_console(console: Box<dyn Console>) -> Self {
        let mut vm = Self {
            stack: Vec::with_capacity(256),
            frames: Vec::with_capacity(16),
            frame_start: None,
            pos: 0,
            fault_opcode: OpCode::Nop as u8,
            params: Vec::new(),
            self_value: None,
            return_value: Value::Undefined,
            func_table: vec![None; FUNCTION_TABLE_SIZE as usize],
            methods: HashMap::new(),
            symbols: SymbolTable::with_builtins(),
            code: CodeSegment::default(),
            redirects: HashMap::new(),
            console,
        };

        vm.bootstrap_builtins();

        vm
    }

    pub fn console_mut(&mut self) -> &mut dyn Console {
        self.console.as_mut()
    }

    pub fn symbols(&self) -> &SymbolTable {
        &self.symbols
    }

    pub fn symbols_mut(&mut self) -> &mut SymbolTable {
        &mut self.symbols
    }

    // ===== Script lifecycle =====

    /// Append a script to the code segment and announce it to `hooks`.
    pub fn load_script(
        &mut self,
        hooks: &mut dyn VmHooks,
        image: &ScriptImage,
    ) -> Result<LoadedScript, LoaderError> {
        if image.code.is_empty() {
            return Err(LoaderError::Format(format!(
                "script '{}' has no code",
                image.name
            )));
        }
        if let Some(f) = image
            .functions
            .iter()
            .find(|f| f.offset as usize >= image.code.len())
        {
            return Err(LoaderError::Format(format!(
                "function '{}' starts outside script '{}'",
                f.name, image.name
            )));
        }

        let script = self.code.load(image);
        tracing::debug!(
            script = %script.name,
            base = script.base,
            size = script.size,
            "script loaded"
        );
        hooks.script_loaded(&script, image.devmap.as_deref());
        Ok(script)
    }

    /// Drop every loaded script, e.g. on a level transition.
    pub fn unload_scripts(&mut self, hooks: &mut dyn VmHooks) {
        tracing::debug!(count = self.code.scripts().len(), "scripts unloaded");
        self.code.clear();
        self.redirects.clear();
        hooks.scripts_unloaded();
    }

    pub fn scripts(&self) -> &[LoadedScript] {
        self.code.scripts()
    }

    pub fn script_at(&self, addr: u32) -> Option<&LoadedScript> {
        self.code.script_at(addr)
    }

    /// Name lookup for diagnostics: `(function, script)` owning `pos`.
    pub fn find_function(&self, pos: u32) -> Option<(&str, &str)> {
        let script = self.code.script_at(pos)?;
        let function = script.function_at(pos)?;
        Some((function, script.name.as_str()))
    }

    /// Address of a function by name, searching scripts in load order.
    pub fn entry_point(&self, name: &str) -> Option<u32> {
        self.code
            .scripts()
            .iter()
            .find_map(|s| s.function_address(name))
    }

    /// Route script calls aimed at `from` to `to`.
    pub fn set_function_redirect(&mut self, from: u32, to: u32) {
        self.redirects.insert(from, to);
    }

    pub fn function_redirect(&self, from: u32) -> Option<u32> {
        self.redirects.get(&from).copied()
    }

    pub fn read_u8(&self, addr: u32) -> Option<u8> {
        self.code.read_u8(addr)
    }

    pub fn read_u16(&self, addr: u32) -> Option<u16> {
        self.code.read_u16(addr)
    }

    // ===== Diagnostics view =====

    /// Opcode of the instruction that was executing when the error was raised.
    pub fn fault_opcode(&self) -> u8 {
        self.fault_opcode
    }

    /// Live code position (just past the faulting instruction's operands).
    pub fn fault_pos(&self) -> u32 {
        self.pos
    }

    /// Live frames, most recent first, stopping before the start sentinel.
    pub fn frames_view(&self) -> Vec<FrameView> {
        let Some(start) = self.frame_start else {
            return Vec::new();
        };
        self.frames
            .get(start + 1..)
            .unwrap_or_default()
            .iter()
            .rev()
            .enumerate()
            .map(|(i, frame)| FrameView {
                pos: if i == 0 { self.pos } else { frame.pos },
                is_top: i == 0,
            })
            .collect()
    }

    // ===== Natives =====

    pub fn builtin(&self, id: u32) -> Option<&BuiltinObj> {
        if id < FUNCTION_TABLE_SIZE {
            self.func_table.get(id as usize)?.as_ref()
        } else {
            self.methods.get(&u16::try_from(id).ok()?)
        }
    }

    /// Run the VM's own implementation of builtin `id`, bypassing any hooks.
    pub fn call_original(&mut self, id: u32) -> Result<(), RuntimeError> {
        let func = self
            .builtin(id)
            .map(|b| b.func)
            .ok_or(RuntimeError::UnknownFunction(id))?;
        func(self)
    }

    // ===== Execution =====

    /// Run the function at `entry` as a new thread and return its result.
    ///
    /// On error `hooks.runtime_error` runs first, then stack and frames are
    /// reset to where they were before the call, and the error is returned.
    pub fn execute(
        &mut self,
        hooks: &mut dyn VmHooks,
        entry: u32,
        args: Vec<Value>,
    ) -> Result<Value, RuntimeError> {
        let mark = Mark {
            stack: self.stack.len(),
            frames: self.frames.len(),
            pos: self.pos,
            frame_start: self.frame_start,
        };
        // Nothing has been fetched for this thread yet.
        self.fault_opcode = OpCode::Nop as u8;

        let result = self
            .start_thread(entry, args)
            .and_then(|_| self.interpret(hooks));

        match result {
            Ok(value) => {
                self.pos = mark.pos;
                self.frame_start = mark.frame_start;
                Ok(value)
            }
            Err(err) => {
                tracing::trace!(error = %err, opcode = self.fault_opcode, "runtime error");
                hooks.runtime_error(self, &err);
                self.reset_to_mark(mark);
                Err(err)
            }
        }
    }

    fn start_thread(&mut self, entry: u32, args: Vec<Value>) -> Result<(), RuntimeError> {
        let script_base = self
            .code
            .script_at(entry)
            .ok_or(RuntimeError::BadAddress(entry))?
            .base;

        self.frame_start = Some(self.frames.len());
        self.frames.push(CallFrame::sentinel(self.stack.len()));

        let argc = args.len();
        for arg in args {
            self.push(arg)?;
        }
        let base = self.stack.len() - argc;
        self.frames
            .push(CallFrame::new(entry, script_base, base, argc));
        self.pos = entry;
        Ok(())
    }

    fn reset_to_mark(&mut self, mark: Mark) {
        self.stack.truncate(mark.stack);
        self.frames.truncate(mark.frames);
        self.pos = mark.pos;
        self.frame_start = mark.frame_start;
        self.params.clear();
        self.self_value = None;
    }

    /// Main interpretation loop
    fn interpret(&mut self, hooks: &mut dyn VmHooks) -> Result<Value, RuntimeError> {
        loop {
            let op_pos = self.pos;
            let bytes = self.code.slice_from(op_pos)?;
            self.fault_opcode = bytes.first().copied().unwrap_or_default();

            let (insn, len) = Instruction::decode(bytes).map_err(|e| match e {
                DecodeError::InvalidOpcode(byte) => RuntimeError::InvalidOpcode(byte),
                DecodeError::Truncated => RuntimeError::TruncatedInstruction(op_pos),
                DecodeError::BadString => {
                    RuntimeError::TypeMismatch("string operand is not valid UTF-8".into())
                }
            })?;
            self.pos = op_pos + len as u32;

            match insn {
                Instruction::End => {
                    if let Some(value) = self.return_from_frame(Value::Undefined)? {
                        return Ok(value);
                    }
                }
                Instruction::Return => {
                    let value = self.pop()?;
                    if let Some(value) = self.return_from_frame(value)? {
                        return Ok(value);
                    }
                }
                Instruction::PushUndefined => self.push(Value::Undefined)?,
                Instruction::PushInt(n) => self.push(Value::Int(n))?,
                Instruction::PushString(s) => self.push(Value::String(s))?,
                Instruction::PushFunction(offset) => {
                    let base = self
                        .frames
                        .last()
                        .map(|f| f.script_base)
                        .ok_or(RuntimeError::StackUnderflow)?;
                    self.push(Value::Function(base.wrapping_add(offset)))?;
                }
                Instruction::Pop => {
                    self.pop()?;
                }
                Instruction::LoadParam(index) => {
                    let frame = self.frames.last().ok_or(RuntimeError::StackUnderflow)?;
                    let index = index as usize;
                    if index >= frame.argc {
                        return Err(RuntimeError::ParamOutOfRange(index));
                    }
                    let value = self.stack[frame.base + index].clone();
                    self.push(value)?;
                }
                Instruction::Add => self.handle_arithmetic(OpCode::Add)?,
                Instruction::Sub => self.handle_arithmetic(OpCode::Sub)?,
                Instruction::Mul => self.handle_arithmetic(OpCode::Mul)?,
                Instruction::ScriptCall { offset, argc } => self.call_script(offset, argc)?,
                Instruction::CallBuiltin { argc, id } => {
                    self.call_native(hooks, id as u32, argc, false)?
                }
                Instruction::CallBuiltinMethod { argc, id } => {
                    self.call_native(hooks, id as u32, argc, true)?
                }
                Instruction::Nop => {}
            }
        }
    }
}
