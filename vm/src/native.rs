use crate::error::RuntimeError;
use crate::machine::Vm;

// The calling convention for ALL builtins:
// arguments are read from the VM's parameter window (`num_params`, `get_int`, ...),
// the result is written to the return-value slot (`add_int`, `add_string`, ...).
pub type BuiltinFn = fn(vm: &mut Vm) -> Result<(), RuntimeError>;

#[derive(Clone)]
pub struct BuiltinObj {
    pub name: &'static str,
    pub id: u16,
    pub func: BuiltinFn,
}

impl std::fmt::Debug for BuiltinObj {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("BuiltinObj")
            .field("name", &self.name)
            .field("id", &self.id)
            .finish()
    }
}
