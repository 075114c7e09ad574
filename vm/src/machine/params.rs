//! Native-side view of a call: the parameter window and the return-value slot.

use crate::error::RuntimeError;
use crate::value::{Value, VarType};

use super::vm::Vm;

impl Vm {
    /// Number of arguments passed to the running native.
    pub fn num_params(&self) -> usize {
        self.params.len()
    }

    pub fn param(&self, index: usize) -> Result<&Value, RuntimeError> {
        self.params
            .get(index)
            .ok_or(RuntimeError::ParamOutOfRange(index))
    }

    pub fn get_type(&self, index: usize) -> Result<VarType, RuntimeError> {
        self.param(index).map(Value::var_type)
    }

    pub fn get_int(&self, index: usize) -> Result<i32, RuntimeError> {
        match self.param(index)? {
            Value::Int(n) => Ok(*n),
            other => Err(RuntimeError::TypeMismatch(format!(
                "parameter {} must be an int, got {}",
                index,
                other.var_type().name()
            ))),
        }
    }

    /// String form of a parameter. Ints are converted.
    pub fn get_string(&self, index: usize) -> Result<String, RuntimeError> {
        match self.param(index)? {
            Value::String(s) => Ok(s.clone()),
            Value::Int(n) => Ok(n.to_string()),
            other => Err(RuntimeError::TypeMismatch(format!(
                "parameter {} must be a string, got {}",
                index,
                other.var_type().name()
            ))),
        }
    }

    /// The object a builtin method was called on.
    pub fn self_value(&self) -> Option<&Value> {
        self.self_value.as_ref()
    }

    pub fn add_value(&mut self, value: Value) {
        self.return_value = value;
    }

    pub fn add_int(&mut self, n: i32) {
        self.add_value(Value::Int(n));
    }

    pub fn add_bool(&mut self, b: bool) {
        self.add_value(Value::Int(b as i32));
    }

    pub fn add_string(&mut self, s: impl Into<String>) {
        self.add_value(Value::String(s.into()));
    }

    /// Value written by the most recent native call.
    pub fn return_value(&self) -> &Value {
        &self.return_value
    }
}
