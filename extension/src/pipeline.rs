//! Error/Diagnostics Pipeline.
//!
//! A failing native leaves its message in a single pending slot. When the VM
//! starts unwinding, the pipeline decides whether to report, classifies the
//! faulting instruction, attaches the callstack and clears the slot. The
//! unwind itself belongs to the VM and happens either way.

use std::fmt;

use vm::opcode::opcode_name;
use vm::specs::{native_call_kind, METHOD_ID_THRESHOLD};
use vm::{RuntimeError, Vm};

use crate::callstack::{self, FrameLocation};
use crate::devmap::DebugMapStore;

pub const REPORT_HEADER: &str = "******* script runtime error ********";
pub const REPORT_FOOTER: &str = "************************************";

/// The single in-flight native failure. A second failure before the VM
/// unwinds overwrites the first.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct PendingError {
    pub message: Option<String>,
    pub force_report: bool,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PipelineState {
    Idle,
    ReportPending,
}

/// What was executing when the error was raised.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum FaultCause {
    BuiltinMethod { name: String, id: u16 },
    BuiltinFunction { name: String, id: u16 },
    Instruction { opcode: u8, name: Option<&'static str> },
}

impl FaultCause {
    /// Classify from the fault opcode. Native call sites are named by the
    /// callee ID encoded in their last two bytes.
    pub fn classify(vm: &Vm) -> Self {
        let opcode = vm.fault_opcode();
        let call_site_id = native_call_kind(opcode)
            .and_then(|_| vm.fault_pos().checked_sub(2))
            .and_then(|pos| vm.read_u16(pos));

        match call_site_id {
            Some(id) if id > METHOD_ID_THRESHOLD => FaultCause::BuiltinMethod {
                name: vm.symbols().meth_display_name(id),
                id,
            },
            Some(id) => FaultCause::BuiltinFunction {
                name: vm.symbols().func_display_name(id),
                id,
            },
            None => FaultCause::Instruction {
                opcode,
                name: opcode_name(opcode),
            },
        }
    }
}

impl fmt::Display for FaultCause {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            FaultCause::BuiltinMethod { name, .. } => {
                write!(f, "in call to builtin method \"{}\"", name)
            }
            FaultCause::BuiltinFunction { name, .. } => {
                write!(f, "in call to builtin function \"{}\"", name)
            }
            FaultCause::Instruction {
                name: Some(name), ..
            } => write!(f, "while processing instruction {}", name),
            FaultCause::Instruction { opcode, name: None } => {
                write!(f, "while processing instruction {:#X}", opcode)
            }
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ErrorReport {
    pub cause: FaultCause,
    pub message: Option<String>,
    pub frames: Vec<FrameLocation>,
}

impl ErrorReport {
    /// Report text, one console line per element, without newlines.
    pub fn lines(&self) -> Vec<String> {
        let mut lines = Vec::with_capacity(self.frames.len() + 3);
        lines.push(REPORT_HEADER.to_string());
        match &self.message {
            Some(message) => lines.push(format!("{}: {}", self.cause, message)),
            None => lines.push(self.cause.to_string()),
        }
        lines.extend(self.frames.iter().map(|frame| format!("\tat {}", frame)));
        lines.push(REPORT_FOOTER.to_string());
        lines
    }
}

impl fmt::Display for ErrorReport {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        for line in self.lines() {
            writeln!(f, "{}", line)?;
        }
        Ok(())
    }
}

#[derive(Debug, Default)]
pub struct ErrorPipeline {
    pending: PendingError,
}

impl ErrorPipeline {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn state(&self) -> PipelineState {
        if self.pending.force_report || self.pending.message.is_some() {
            PipelineState::ReportPending
        } else {
            PipelineState::Idle
        }
    }

    pub fn pending(&self) -> &PendingError {
        &self.pending
    }

    /// A native failed with `message`. Forces the next unwind to report.
    pub fn record_failure(&mut self, message: impl Into<String>) {
        let message = message.into();
        if let Some(previous) = &self.pending.message {
            tracing::debug!(%previous, "pending script error overwritten");
        }
        tracing::trace!(%message, "native call failed");
        self.pending = PendingError {
            message: Some(message),
            force_report: true,
        };
    }

    /// The VM is unwinding after `err`. Builds a report if one was forced or
    /// developer diagnostics are on; the pending slot is cleared either way.
    ///
    /// Without a pending message, errors raised by the VM itself are
    /// described by their own text.
    pub fn on_vm_error(
        &mut self,
        vm: &Vm,
        err: &RuntimeError,
        devmaps: &DebugMapStore,
        developer_script: bool,
    ) -> Option<ErrorReport> {
        let pending = std::mem::take(&mut self.pending);
        if !pending.force_report && !developer_script {
            return None;
        }

        let message = pending.message.or_else(|| match err {
            RuntimeError::NativeFailure => None,
            other => Some(other.to_string()),
        });

        Some(ErrorReport {
            cause: FaultCause::classify(vm),
            message,
            frames: callstack::walk(vm, devmaps),
        })
    }
}
