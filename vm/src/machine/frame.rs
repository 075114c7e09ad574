/// Represents a single call frame in the execution stack.
///
/// Each frame tracks:
/// - `function`: absolute address of the function entry
/// - `script_base`: base address of the script the function lives in
/// - `pos`: saved code position (return position while a callee runs)
/// - `base`: stack index of the frame's first parameter
#[derive(Debug, Clone)]
pub struct CallFrame {
    pub function: u32,
    pub script_base: u32,
    pub pos: u32,
    pub base: usize,
    pub argc: usize,
}

impl CallFrame {
    pub fn new(function: u32, script_base: u32, base: usize, argc: usize) -> Self {
        Self {
            function,
            script_base,
            pos: function,
            base,
            argc,
        }
    }

    /// Start-of-thread marker. Never executed, never reported.
    pub fn sentinel(base: usize) -> Self {
        Self {
            function: 0,
            script_base: 0,
            pos: 0,
            base,
            argc: 0,
        }
    }
}

/// Read-only view of a live frame, as seen by diagnostics.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct FrameView {
    /// Live position for the top frame, stored return position for the rest.
    pub pos: u32,
    pub is_top: bool,
}
