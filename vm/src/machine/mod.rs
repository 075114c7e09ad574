//! Machine module - VM implementation, one submodule per concern.

mod arithmetic;
mod code;
mod control;
mod frame;
mod hooks;
mod native;
mod params;
mod stack;
mod vm;

// Public API
pub use code::LoadedScript;
pub use frame::{CallFrame, FrameView};
pub use hooks::{PassThrough, VmHooks};
pub use native::NativeRegistry;
pub use vm::Vm;
