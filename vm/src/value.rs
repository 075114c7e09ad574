use std::fmt;

/// A script value. Functions are absolute code addresses.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub enum Value {
    #[default]
    Undefined,
    Int(i32),
    String(String),
    Function(u32),
}

/// Type tag reported to natives through `Vm::get_type`.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum VarType {
    Undefined,
    Int,
    String,
    Function,
}

impl VarType {
    pub fn name(self) -> &'static str {
        match self {
            VarType::Undefined => "undefined",
            VarType::Int => "int",
            VarType::String => "string",
            VarType::Function => "function",
        }
    }
}

impl Value {
    pub fn var_type(&self) -> VarType {
        match self {
            Value::Undefined => VarType::Undefined,
            Value::Int(_) => VarType::Int,
            Value::String(_) => VarType::String,
            Value::Function(_) => VarType::Function,
        }
    }

    pub fn as_int(&self) -> Option<i32> {
        match self {
            Value::Int(n) => Some(*n),
            _ => None,
        }
    }

    pub fn as_str(&self) -> Option<&str> {
        match self {
            Value::String(s) => Some(s),
            _ => None,
        }
    }

    pub fn is_defined(&self) -> bool {
        !matches!(self, Value::Undefined)
    }
}

impl From<i32> for Value {
    fn from(n: i32) -> Self {
        Value::Int(n)
    }
}

impl From<&str> for Value {
    fn from(s: &str) -> Self {
        Value::String(s.to_string())
    }
}

impl From<String> for Value {
    fn from(s: String) -> Self {
        Value::String(s)
    }
}

impl fmt::Display for Value {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Value::Undefined => write!(f, "undefined"),
            Value::Int(n) => write!(f, "{}", n),
            Value::String(s) => write!(f, "{}", s),
            Value::Function(pos) => write!(f, "<function {:#x}>", pos),
        }
    }
}
