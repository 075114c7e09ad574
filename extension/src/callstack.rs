//! Callstack Walker.

use std::fmt;

use vm::Vm;

use crate::devmap::{DebugMapStore, SourcePosition};

/// One live frame, annotated for a human reader.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FrameLocation {
    /// Live position for the top frame, return position for callers.
    pub pos: u32,
    /// `(function, script)` if the host can name the owner of `pos`.
    pub function: Option<(String, String)>,
    pub position: Option<SourcePosition>,
}

impl fmt::Display for FrameLocation {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match &self.function {
            Some((function, script)) => {
                write!(f, "function \"{}\" in file \"{}\"", function, script)?
            }
            None => write!(f, "unknown location {:#x}", self.pos)?,
        }
        if let Some(position) = self.position {
            write!(f, " {}", position)?;
        }
        Ok(())
    }
}

/// Walk the VM's frames, most recent first, down to the thread's start frame.
///
/// Never fails: frames that cannot be named or resolved degrade to
/// `unknown location` and lose their line clause.
pub fn walk(vm: &Vm, devmaps: &DebugMapStore) -> Vec<FrameLocation> {
    vm.frames_view()
        .into_iter()
        .map(|frame| FrameLocation {
            pos: frame.pos,
            function: vm
                .find_function(frame.pos)
                .map(|(function, script)| (function.to_string(), script.to_string())),
            position: devmaps.resolve(frame.pos),
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn named_frame_with_line() {
        let frame = FrameLocation {
            pos: 0x10004,
            function: Some(("main".into(), "maps/test".into())),
            position: Some(SourcePosition { line: 12, column: 3 }),
        };
        assert_eq!(
            frame.to_string(),
            "function \"main\" in file \"maps/test\" line 12 column 3"
        );
    }

    #[test]
    fn unknown_frame_without_line() {
        let frame = FrameLocation {
            pos: 0x1002a,
            function: None,
            position: None,
        };
        assert_eq!(frame.to_string(), "unknown location 0x1002a");
    }

    #[test]
    fn idle_vm_has_no_frames() {
        let vm = Vm::new();
        assert!(walk(&vm, &DebugMapStore::new()).is_empty());
    }
}
