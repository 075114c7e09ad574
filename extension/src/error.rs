use thiserror::Error;
use vm::RuntimeError;

/// Failure raised by a native implementation.
///
/// Natives return `Result<(), ScriptError>`; the dispatch interceptor is the
/// only place that turns it into a VM unwind.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[error("{message}")]
pub struct ScriptError {
    message: String,
}

impl ScriptError {
    pub fn new(message: impl Into<String>) -> Self {
        Self {
            message: message.into(),
        }
    }

    pub fn message(&self) -> &str {
        &self.message
    }
}

impl From<RuntimeError> for ScriptError {
    fn from(err: RuntimeError) -> Self {
        Self::new(err.to_string())
    }
}

/// Signal a script error from inside a native.
///
/// ```ignore
/// if vm.get_int(0)? < 0 {
///     return raise_error("value must be positive");
/// }
/// ```
pub fn raise_error<T>(message: impl Into<String>) -> Result<T, ScriptError> {
    Err(ScriptError::new(message))
}

/// Setup-time misuse of the registry or the override table.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ExtensionError {
    #[error("unknown builtin function '{0}'")]
    UnknownBuiltin(String),

    #[error("function '{0}' is already registered")]
    AlreadyRegistered(String),

    #[error("no free function id left for '{name}'")]
    RegistryFull { name: String },
}

/// A debug-map blob that cannot be attached.
#[derive(Debug, Error)]
pub enum DevMapError {
    #[error("debug map truncated: {expected} bytes expected, {actual} present")]
    Truncated { expected: usize, actual: usize },

    #[error("script '{name}' at {base:#x}..{end:#x} overlaps '{existing}'")]
    Overlap {
        name: String,
        base: u32,
        end: u32,
        existing: String,
    },

    #[error("failed to read debug map: {0}")]
    Io(#[from] std::io::Error),
}
