//! Function Registry: natives added on top of the VM's fixed builtins.
//!
//! IDs are handed out monotonically from `FIRST_EXTENSION_FUNCTION_ID`, so
//! they can never collide with a host builtin, and stay below the dispatch
//! table size. Entries live as long as the registry; there is no removal.

use std::collections::BTreeMap;
use std::fmt;

use vm::specs::{FIRST_EXTENSION_FUNCTION_ID, FUNCTION_TABLE_SIZE};
use vm::{SymbolTable, Vm};

use crate::error::{ExtensionError, ScriptError};

/// A native implementation. Arguments and the return slot are reached
/// through the VM's parameter API.
pub type NativeImpl = Box<dyn Fn(&mut Vm) -> Result<(), ScriptError>>;

pub struct RegistryEntry {
    pub id: u16,
    pub name: String,
    pub native: NativeImpl,
}

impl fmt::Debug for RegistryEntry {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("RegistryEntry")
            .field("id", &format_args!("{:#x}", self.id))
            .field("name", &self.name)
            .finish_non_exhaustive()
    }
}

#[derive(Debug)]
pub struct FunctionRegistry {
    entries: BTreeMap<u16, RegistryEntry>,
    next_id: u16,
}

impl Default for FunctionRegistry {
    fn default() -> Self {
        Self::new()
    }
}

impl FunctionRegistry {
    pub fn new() -> Self {
        Self {
            entries: BTreeMap::new(),
            next_id: FIRST_EXTENSION_FUNCTION_ID,
        }
    }

    /// Allocate an ID for `name` and publish it in the VM's symbol table.
    ///
    /// Fails if the name is already known (to the registry or as a builtin)
    /// or if the dispatch table is exhausted. A failed call allocates nothing.
    pub fn register(
        &mut self,
        symbols: &mut SymbolTable,
        name: &str,
        native: NativeImpl,
    ) -> Result<u16, ExtensionError> {
        if self.id_of(name).is_some() || symbols.func_id(name).is_some() {
            return Err(ExtensionError::AlreadyRegistered(name.to_string()));
        }
        if u32::from(self.next_id) >= FUNCTION_TABLE_SIZE {
            return Err(ExtensionError::RegistryFull {
                name: name.to_string(),
            });
        }

        let id = self.next_id;
        if !symbols.func_add(name, id) {
            return Err(ExtensionError::AlreadyRegistered(name.to_string()));
        }
        self.next_id += 1;
        self.entries.insert(
            id,
            RegistryEntry {
                id,
                name: name.to_string(),
                native,
            },
        );

        tracing::debug!(name, id, "registered native function");
        Ok(id)
    }

    /// True if `id` was handed out by this registry.
    pub fn contains(&self, id: u32) -> bool {
        u16::try_from(id).is_ok_and(|id| self.entries.contains_key(&id))
    }

    pub fn get(&self, id: u32) -> Option<&RegistryEntry> {
        self.entries.get(&u16::try_from(id).ok()?)
    }

    pub fn id_of(&self, name: &str) -> Option<u16> {
        self.entries
            .values()
            .find(|entry| entry.name.eq_ignore_ascii_case(name))
            .map(|entry| entry.id)
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Entries in ID order.
    pub fn iter(&self) -> impl Iterator<Item = &RegistryEntry> {
        self.entries.values()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn noop() -> NativeImpl {
        Box::new(|_| Ok(()))
    }

    #[test]
    fn ids_start_above_the_builtin_range() {
        let mut symbols = SymbolTable::with_builtins();
        let mut registry = FunctionRegistry::new();

        let a = registry.register(&mut symbols, "first", noop()).unwrap();
        let b = registry.register(&mut symbols, "second", noop()).unwrap();

        assert_eq!(a, FIRST_EXTENSION_FUNCTION_ID);
        assert_eq!(b, a + 1);
        assert_eq!(symbols.func_id("first"), Some(a));
        assert_eq!(symbols.func_name(b), Some("second"));
        assert!(registry.contains(u32::from(a)));
        assert!(!registry.contains(0x01));
    }

    #[test]
    fn duplicate_names_are_rejected_case_insensitively() {
        let mut symbols = SymbolTable::with_builtins();
        let mut registry = FunctionRegistry::new();
        registry.register(&mut symbols, "double", noop()).unwrap();

        assert_eq!(
            registry.register(&mut symbols, "DOUBLE", noop()).unwrap_err(),
            ExtensionError::AlreadyRegistered("DOUBLE".into())
        );
        assert_eq!(registry.len(), 1);
    }

    #[test]
    fn builtin_names_cannot_be_registered() {
        let mut symbols = SymbolTable::with_builtins();
        let mut registry = FunctionRegistry::new();
        assert!(matches!(
            registry.register(&mut symbols, "print", noop()),
            Err(ExtensionError::AlreadyRegistered(_))
        ));
        assert!(registry.is_empty());
    }

    #[test]
    fn registry_stops_at_the_dispatch_table_size() {
        let mut symbols = SymbolTable::new();
        let mut registry = FunctionRegistry::new();
        let capacity = FUNCTION_TABLE_SIZE - u32::from(FIRST_EXTENSION_FUNCTION_ID);

        for i in 0..capacity {
            registry
                .register(&mut symbols, &format!("f{}", i), noop())
                .unwrap();
        }
        assert_eq!(
            registry.register(&mut symbols, "overflow", noop()).unwrap_err(),
            ExtensionError::RegistryFull {
                name: "overflow".into()
            }
        );
        assert_eq!(registry.len(), capacity as usize);
    }
}
