use std::collections::HashMap;

use crate::specs::{BUILTIN_FUNCTIONS, BUILTIN_METHODS};

/// Name <-> ID tables for callable natives. Names are case-insensitive.
#[derive(Debug, Clone, Default)]
pub struct SymbolTable {
    functions: HashMap<String, u16>,
    function_names: HashMap<u16, String>,
    methods: HashMap<String, u16>,
    method_names: HashMap<u16, String>,
}

impl SymbolTable {
    pub fn new() -> Self {
        Self::default()
    }

    /// Table pre-populated with the fixed builtin functions and methods.
    pub fn with_builtins() -> Self {
        let mut table = Self::new();
        for meta in BUILTIN_FUNCTIONS {
            table.func_add(meta.name, meta.id);
        }
        for meta in BUILTIN_METHODS {
            table.meth_add(meta.name, meta.id);
        }
        table
    }

    pub fn func_id(&self, name: &str) -> Option<u16> {
        self.functions.get(&name.to_ascii_lowercase()).copied()
    }

    pub fn meth_id(&self, name: &str) -> Option<u16> {
        self.methods.get(&name.to_ascii_lowercase()).copied()
    }

    pub fn func_name(&self, id: u16) -> Option<&str> {
        self.function_names.get(&id).map(String::as_str)
    }

    pub fn meth_name(&self, id: u16) -> Option<&str> {
        self.method_names.get(&id).map(String::as_str)
    }

    /// Function name for display; unknown IDs render as `_id_XXXX`.
    pub fn func_display_name(&self, id: u16) -> String {
        self.func_name(id)
            .map(str::to_string)
            .unwrap_or_else(|| format!("_id_{:04X}", id))
    }

    /// Method name for display; unknown IDs render as `_id_XXXX`.
    pub fn meth_display_name(&self, id: u16) -> String {
        self.meth_name(id)
            .map(str::to_string)
            .unwrap_or_else(|| format!("_id_{:04X}", id))
    }

    /// Publish a callable function name. Returns false if the name is taken.
    pub fn func_add(&mut self, name: &str, id: u16) -> bool {
        let key = name.to_ascii_lowercase();
        if self.functions.contains_key(&key) {
            return false;
        }
        self.function_names.insert(id, key.clone());
        self.functions.insert(key, id);
        true
    }

    pub fn meth_add(&mut self, name: &str, id: u16) -> bool {
        let key = name.to_ascii_lowercase();
        if self.methods.contains_key(&key) {
            return false;
        }
        self.method_names.insert(id, key.clone());
        self.methods.insert(key, id);
        true
    }

    pub fn function_count(&self) -> usize {
        self.functions.len()
    }
}
