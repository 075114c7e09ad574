//! Extension layer for the gsx script VM.
//!
//! The VM ships a closed table of builtins and knows nothing about source
//! files. This crate sits at its native-call boundary:
//!
//! - [`FunctionRegistry`] adds natives under fresh IDs above the builtins.
//! - [`OverrideTable`] swaps in replacements for existing builtins.
//! - [`ScriptExtension`] is the dispatch interceptor the VM calls through.
//! - [`DebugMapStore`] maps code addresses back to source lines.
//! - [`callstack::walk`] and [`ErrorPipeline`] turn a runtime error into a
//!   readable report on the VM console.
//!
//! ```ignore
//! let mut vm = Vm::new();
//! let mut ext = ScriptExtension::with_defaults(&mut vm, ExtensionConfig::default())?;
//! ext.register_function(&mut vm, "double", |vm| {
//!     let n = vm.get_int(0)?;
//!     vm.add_int(n * 2);
//!     Ok(())
//! })?;
//! let script = vm.load_script(&mut ext, &image)?;
//! vm.execute(&mut ext, script.base, vec![])?;
//! ```

pub mod callstack;
pub mod config;
pub mod devmap;
pub mod dispatch;
pub mod error;
pub mod overrides;
pub mod pipeline;
pub mod registry;
pub mod stdlib;

pub use callstack::FrameLocation;
pub use config::ExtensionConfig;
pub use devmap::{DebugMapStore, DevMapEntry, ScriptUnit, SourcePosition, UnitHandle};
pub use dispatch::ScriptExtension;
pub use error::{raise_error, DevMapError, ExtensionError, ScriptError};
pub use overrides::OverrideTable;
pub use pipeline::{ErrorPipeline, ErrorReport, FaultCause, PendingError, PipelineState};
pub use registry::{FunctionRegistry, NativeImpl};
