use crate::error::RuntimeError;

use super::code::LoadedScript;
use super::vm::Vm;

/// Hook points the VM exposes to an embedding layer.
///
/// The VM calls `call_native` for every native-call instruction and
/// `runtime_error` on every runtime error, right before it resets the stack
/// and frames to the thread's mark. The reset always happens, whatever the
/// hook does.
pub trait VmHooks {
    /// Execute native function `id`. The parameter window is already set up.
    fn call_native(&mut self, vm: &mut Vm, id: u32) -> Result<(), RuntimeError> {
        vm.call_original(id)
    }

    /// A runtime error is unwinding the current thread. Frames, fault opcode
    /// and fault position are still live.
    fn runtime_error(&mut self, _vm: &mut Vm, _err: &RuntimeError) {}

    /// A script was added to the code segment.
    fn script_loaded(&mut self, _script: &LoadedScript, _devmap: Option<&[u8]>) {}

    /// All scripts were removed from the code segment.
    fn scripts_unloaded(&mut self) {}
}

/// No extension: every native call reaches the original builtin.
#[derive(Debug, Default)]
pub struct PassThrough;

impl VmHooks for PassThrough {}
