use crate::error::RuntimeError;
use crate::opcode::OpCode;
use crate::value::Value;

use super::stack::StackOps;

/// Trait for arithmetic instruction handlers
pub trait ArithmeticOps {
    fn handle_arithmetic(&mut self, op: OpCode) -> Result<(), RuntimeError>;
}

impl ArithmeticOps for super::vm::Vm {
    fn handle_arithmetic(&mut self, op: OpCode) -> Result<(), RuntimeError> {
        let right = self.pop()?;
        let left = self.pop()?;

        let result = match (op, left, right) {
            (OpCode::Add, Value::Int(a), Value::Int(b)) => Value::Int(a.wrapping_add(b)),
            (OpCode::Sub, Value::Int(a), Value::Int(b)) => Value::Int(a.wrapping_sub(b)),
            (OpCode::Mul, Value::Int(a), Value::Int(b)) => Value::Int(a.wrapping_mul(b)),
            // String concatenation accepts an int on either side
            (OpCode::Add, Value::String(a), Value::String(b)) => Value::String(a + &b),
            (OpCode::Add, Value::String(a), Value::Int(b)) => Value::String(format!("{}{}", a, b)),
            (OpCode::Add, Value::Int(a), Value::String(b)) => Value::String(format!("{}{}", a, b)),
            (op, left, right) => {
                return Err(RuntimeError::TypeMismatch(format!(
                    "{} on {} and {}",
                    op,
                    left.var_type().name(),
                    right.var_type().name()
                )))
            }
        };

        self.push(result)
    }
}
