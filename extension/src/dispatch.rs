//! Dispatch Interceptor.
//!
//! [`ScriptExtension`] owns every piece of extension state and is handed to
//! the VM as its [`VmHooks`]. Each native call goes override first, then
//! registry, then the VM's original builtin. A native that fails or panics
//! is recorded in the error pipeline and comes back to the VM as
//! `RuntimeError::NativeFailure`, so the VM's own unwind takes over.

use std::any::Any;
use std::panic::{self, AssertUnwindSafe};

use vm::{LoadedScript, RuntimeError, Vm, VmHooks};

use crate::callstack::{self, FrameLocation};
use crate::config::ExtensionConfig;
use crate::devmap::{DebugMapStore, SourcePosition, UnitHandle};
use crate::error::{DevMapError, ExtensionError, ScriptError};
use crate::overrides::OverrideTable;
use crate::pipeline::{ErrorPipeline, ErrorReport};
use crate::registry::{FunctionRegistry, NativeImpl};

#[derive(Debug, Default)]
pub struct ScriptExtension {
    registry: FunctionRegistry,
    overrides: OverrideTable,
    devmaps: DebugMapStore,
    pipeline: ErrorPipeline,
    config: ExtensionConfig,
    last_report: Option<ErrorReport>,
    reports_emitted: usize,
}

impl ScriptExtension {
    /// An extension with nothing registered.
    pub fn new(config: ExtensionConfig) -> Self {
        Self {
            config,
            ..Self::default()
        }
    }

    /// An extension with the default native library installed, unless the
    /// config turns it off.
    pub fn with_defaults(vm: &mut Vm, config: ExtensionConfig) -> Result<Self, ExtensionError> {
        let install = config.install_defaults;
        let mut ext = Self::new(config);
        if install {
            crate::stdlib::install(&mut ext, vm)?;
        }
        Ok(ext)
    }

    pub fn config(&self) -> &ExtensionConfig {
        &self.config
    }

    pub fn set_developer_script(&mut self, enabled: bool) {
        self.config.developer_script = enabled;
    }

    // ===== Setup =====

    /// Add a native callable from scripts by `name`.
    pub fn register_function<F>(
        &mut self,
        vm: &mut Vm,
        name: &str,
        native: F,
    ) -> Result<u16, ExtensionError>
    where
        F: Fn(&mut Vm) -> Result<(), ScriptError> + 'static,
    {
        self.registry
            .register(vm.symbols_mut(), name, Box::new(native))
    }

    /// Replace the builtin function `builtin_name` for every later call.
    pub fn override_function<F>(
        &mut self,
        vm: &Vm,
        builtin_name: &str,
        native: F,
    ) -> Result<u32, ExtensionError>
    where
        F: Fn(&mut Vm) -> Result<(), ScriptError> + 'static,
    {
        self.overrides
            .install(vm.symbols(), builtin_name, Box::new(native))
    }

    pub fn registry(&self) -> &FunctionRegistry {
        &self.registry
    }

    pub fn overrides(&self) -> &OverrideTable {
        &self.overrides
    }

    // ===== Debug maps =====

    pub fn attach_debug_map(
        &mut self,
        unit_name: &str,
        base_address: u32,
        size: u32,
        blob: &[u8],
    ) -> Result<UnitHandle, DevMapError> {
        self.devmaps.attach(unit_name, base_address, size, blob)
    }

    pub fn clear_debug_maps(&mut self) {
        self.devmaps.clear();
    }

    pub fn debug_maps(&self) -> &DebugMapStore {
        &self.devmaps
    }

    pub fn resolve(&self, address: u32) -> Option<SourcePosition> {
        self.devmaps.resolve(address)
    }

    pub fn callstack(&self, vm: &Vm) -> Vec<FrameLocation> {
        callstack::walk(vm, &self.devmaps)
    }

    // ===== Diagnostics =====

    pub fn pipeline(&self) -> &ErrorPipeline {
        &self.pipeline
    }

    pub fn last_report(&self) -> Option<&ErrorReport> {
        self.last_report.as_ref()
    }

    pub fn reports_emitted(&self) -> usize {
        self.reports_emitted
    }

    /// Effective implementation for `id`, or `None` to pass through.
    fn lookup(&self, id: u32) -> Option<&NativeImpl> {
        self.overrides
            .get(id)
            .or_else(|| self.registry.get(id).map(|entry| &entry.native))
    }
}

/// Run a native, turning a panic into an ordinary script error.
///
/// The process panic hook still runs before the unwind is caught. Hosts that
/// do not want the default stderr message install their own hook, as the
/// `gsx` binary does.
fn invoke(native: &NativeImpl, vm: &mut Vm) -> Result<(), ScriptError> {
    match panic::catch_unwind(AssertUnwindSafe(|| native(vm))) {
        Ok(result) => result,
        Err(payload) => Err(ScriptError::new(format!(
            "native function panicked: {}",
            panic_message(payload.as_ref())
        ))),
    }
}

/// Text of a panic payload (`&str` or `String`).
pub fn panic_message(payload: &(dyn Any + Send)) -> &str {
    if let Some(s) = payload.downcast_ref::<&str>() {
        s
    } else if let Some(s) = payload.downcast_ref::<String>() {
        s.as_str()
    } else {
        "unknown panic payload"
    }
}

impl VmHooks for ScriptExtension {
    fn call_native(&mut self, vm: &mut Vm, id: u32) -> Result<(), RuntimeError> {
        let Some(native) = self.lookup(id) else {
            return vm.call_original(id);
        };

        match invoke(native, vm) {
            Ok(()) => Ok(()),
            Err(err) => {
                tracing::debug!(id, error = %err, "native call failed");
                self.pipeline.record_failure(err.message());
                Err(RuntimeError::NativeFailure)
            }
        }
    }

    fn runtime_error(&mut self, vm: &mut Vm, err: &RuntimeError) {
        let Some(report) =
            self.pipeline
                .on_vm_error(vm, err, &self.devmaps, self.config.developer_script)
        else {
            return;
        };

        let console = vm.console_mut();
        for line in report.lines() {
            console.warn(&format!("{}\n", line));
        }
        self.reports_emitted += 1;
        self.last_report = Some(report);
    }

    fn script_loaded(&mut self, script: &LoadedScript, devmap: Option<&[u8]>) {
        let Some(blob) = devmap else {
            return;
        };
        if let Err(err) = self
            .devmaps
            .attach(&script.name, script.base, script.size, blob)
        {
            tracing::warn!(script = %script.name, error = %err, "ignoring debug map");
        }
    }

    fn scripts_unloaded(&mut self) {
        self.devmaps.clear();
    }
}
