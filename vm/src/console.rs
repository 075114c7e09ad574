//! Operator console sinks.
//!
//! Script output (`print`) and runtime diagnostics are operator-facing text,
//! so they go through a [`Console`] owned by the VM instead of the log.

use std::cell::RefCell;
use std::io::Write;
use std::rc::Rc;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ConsoleLevel {
    Info,
    Warn,
}

pub trait Console {
    fn write(&mut self, level: ConsoleLevel, text: &str);

    fn info(&mut self, text: &str) {
        self.write(ConsoleLevel::Info, text);
    }

    fn warn(&mut self, text: &str) {
        self.write(ConsoleLevel::Warn, text);
    }

    /// Hand a command line to the host's command executor. Hosts without
    /// one drop it.
    fn execute_command(&mut self, command: &str) {
        tracing::warn!(command, "no command executor, command dropped");
    }
}

/// Info to stdout, warnings to stderr. Text is written as-is (no implicit newline).
#[derive(Debug, Default)]
pub struct StdConsole;

impl Console for StdConsole {
    fn write(&mut self, level: ConsoleLevel, text: &str) {
        match level {
            ConsoleLevel::Info => {
                let mut out = std::io::stdout().lock();
                let _ = out.write_all(text.as_bytes());
                let _ = out.flush();
            }
            ConsoleLevel::Warn => {
                let _ = std::io::stderr().lock().write_all(text.as_bytes());
            }
        }
    }
}

/// Records every write. Clones share the same buffer, so a test can keep one
/// handle while the VM owns another.
#[derive(Debug, Clone, Default)]
pub struct CapturedConsole {
    lines: Rc<RefCell<Vec<(ConsoleLevel, String)>>>,
    commands: Rc<RefCell<Vec<String>>>,
}

impl CapturedConsole {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn entries(&self) -> Vec<(ConsoleLevel, String)> {
        self.lines.borrow().clone()
    }

    /// Concatenated info-level output.
    pub fn output(&self) -> String {
        self.collect(ConsoleLevel::Info)
    }

    /// Concatenated warn-level output.
    pub fn warnings(&self) -> String {
        self.collect(ConsoleLevel::Warn)
    }

    /// Commands passed to [`Console::execute_command`], in order.
    pub fn commands(&self) -> Vec<String> {
        self.commands.borrow().clone()
    }

    pub fn clear(&self) {
        self.lines.borrow_mut().clear();
        self.commands.borrow_mut().clear();
    }

    fn collect(&self, level: ConsoleLevel) -> String {
        self.lines
            .borrow()
            .iter()
            .filter(|(l, _)| *l == level)
            .map(|(_, text)| text.as_str())
            .collect()
    }
}

impl Console for CapturedConsole {
    fn write(&mut self, level: ConsoleLevel, text: &str) {
        self.lines.borrow_mut().push((level, text.to_string()));
    }

    fn execute_command(&mut self, command: &str) {
        self.commands.borrow_mut().push(command.to_string());
    }
}
