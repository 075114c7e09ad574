use crate::error::RuntimeError;
use crate::specs::STACK_MAX;
use crate::value::Value;

/// Trait for value stack operations
pub trait StackOps {
    fn push(&mut self, val: Value) -> Result<(), RuntimeError>;
    fn pop(&mut self) -> Result<Value, RuntimeError>;
    /// Number of values the top frame may consume (its locals stay out of reach).
    fn available(&self) -> usize;
}

impl StackOps for super::vm::Vm {
    #[inline]
    fn push(&mut self, val: Value) -> Result<(), RuntimeError> {
        if self.stack.len() >= STACK_MAX {
            return Err(RuntimeError::StackOverflow);
        }
        self.stack.push(val);
        Ok(())
    }

    #[inline]
    fn pop(&mut self) -> Result<Value, RuntimeError> {
        if self.available() == 0 {
            return Err(RuntimeError::StackUnderflow);
        }
        self.stack.pop().ok_or(RuntimeError::StackUnderflow)
    }

    fn available(&self) -> usize {
        let floor = self
            .frames
            .last()
            .map(|f| f.base + f.argc)
            .unwrap_or(0);
        self.stack.len().saturating_sub(floor)
    }
}
