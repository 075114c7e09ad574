//! Override Table: replacement natives for existing builtin functions.

use std::collections::HashMap;

use vm::specs::FIRST_EXTENSION_FUNCTION_ID;
use vm::SymbolTable;

use crate::error::ExtensionError;
use crate::registry::NativeImpl;

/// At most one replacement per builtin ID. Re-installing replaces.
#[derive(Default)]
pub struct OverrideTable {
    overrides: HashMap<u32, NativeImpl>,
}

impl OverrideTable {
    pub fn new() -> Self {
        Self::default()
    }

    /// Resolve `builtin_name` once and install `native` in its place.
    ///
    /// Only host builtins qualify; registry functions and unknown names fail
    /// with `UnknownBuiltin`. The original stays in the VM's table.
    pub fn install(
        &mut self,
        symbols: &SymbolTable,
        builtin_name: &str,
        native: NativeImpl,
    ) -> Result<u32, ExtensionError> {
        let id = symbols
            .func_id(builtin_name)
            .filter(|id| *id < FIRST_EXTENSION_FUNCTION_ID)
            .ok_or_else(|| ExtensionError::UnknownBuiltin(builtin_name.to_string()))?;
        let id = u32::from(id);

        if self.overrides.insert(id, native).is_some() {
            tracing::debug!(builtin = builtin_name, id, "override replaced");
        } else {
            tracing::debug!(builtin = builtin_name, id, "override installed");
        }
        Ok(id)
    }

    pub fn get(&self, id: u32) -> Option<&NativeImpl> {
        self.overrides.get(&id)
    }

    pub fn contains(&self, id: u32) -> bool {
        self.overrides.contains_key(&id)
    }

    pub fn len(&self) -> usize {
        self.overrides.len()
    }

    pub fn is_empty(&self) -> bool {
        self.overrides.is_empty()
    }
}

impl std::fmt::Debug for OverrideTable {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let mut ids: Vec<_> = self.overrides.keys().collect();
        ids.sort();
        f.debug_struct("OverrideTable").field("ids", &ids).finish()
    }
}
