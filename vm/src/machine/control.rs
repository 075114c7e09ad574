use crate::error::RuntimeError;
use crate::specs::MAX_CALL_DEPTH;
use crate::value::Value;

use super::frame::CallFrame;
use super::hooks::VmHooks;
use super::stack::StackOps;

/// Trait for call/return instruction handlers
pub trait ControlFlowOps {
    fn call_script(&mut self, offset: u32, argc: u8) -> Result<(), RuntimeError>;

    /// Pop the top frame. Returns the thread's result once only the
    /// start sentinel is left.
    fn return_from_frame(&mut self, value: Value) -> Result<Option<Value>, RuntimeError>;

    fn call_native(
        &mut self,
        hooks: &mut dyn VmHooks,
        id: u32,
        argc: u8,
        is_method: bool,
    ) -> Result<(), RuntimeError>;
}

impl ControlFlowOps for super::vm::Vm {
    fn call_script(&mut self, offset: u32, argc: u8) -> Result<(), RuntimeError> {
        let start = self.frame_start.ok_or(RuntimeError::StackUnderflow)?;
        if self.frames.len() - start > MAX_CALL_DEPTH {
            return Err(RuntimeError::CallDepthExceeded);
        }

        let argc = argc as usize;
        if self.available() < argc {
            return Err(RuntimeError::StackUnderflow);
        }

        let live_pos = self.pos;
        let caller = self.frames.last_mut().ok_or(RuntimeError::StackUnderflow)?;
        caller.pos = live_pos;

        let target = caller.script_base.wrapping_add(offset);
        let target = self.function_redirect(target).unwrap_or(target);
        let script_base = self
            .code
            .script_at(target)
            .ok_or(RuntimeError::BadAddress(target))?
            .base;

        let base = self.stack.len() - argc;
        self.frames.push(CallFrame::new(target, script_base, base, argc));
        self.pos = target;
        Ok(())
    }

    fn return_from_frame(&mut self, value: Value) -> Result<Option<Value>, RuntimeError> {
        let start = self.frame_start.ok_or(RuntimeError::StackUnderflow)?;
        let frame = self.frames.pop().ok_or(RuntimeError::StackUnderflow)?;
        self.stack.truncate(frame.base);

        if self.frames.len() <= start + 1 {
            // Only the sentinel is left: the thread is done.
            self.frames.truncate(start);
            return Ok(Some(value));
        }

        let caller = self.frames.last().ok_or(RuntimeError::StackUnderflow)?;
        self.pos = caller.pos;
        self.push(value)?;
        Ok(None)
    }

    fn call_native(
        &mut self,
        hooks: &mut dyn VmHooks,
        id: u32,
        argc: u8,
        is_method: bool,
    ) -> Result<(), RuntimeError> {
        let argc = argc as usize;
        if self.available() < argc + is_method as usize {
            return Err(RuntimeError::StackUnderflow);
        }

        self.self_value = if is_method { Some(self.pop()?) } else { None };
        let split = self.stack.len() - argc;
        self.params = self.stack.split_off(split);
        self.return_value = Value::Undefined;

        let result = hooks.call_native(self, id);

        self.params.clear();
        self.self_value = None;
        result?;

        let ret = self.return_value.clone();
        self.push(ret)
    }
}
