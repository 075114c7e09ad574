use crate::native::{BuiltinFn, BuiltinObj};
use crate::specs::{BuiltinMeta, BUILTIN_FUNCTIONS, BUILTIN_METHODS, FUNCTION_TABLE_SIZE};

/// Trait for builtin registration into the dispatch tables
pub trait NativeRegistry {
    fn define_builtin(&mut self, meta: &'static BuiltinMeta, func: BuiltinFn);
    fn define_method(&mut self, meta: &'static BuiltinMeta, func: BuiltinFn);
    fn bootstrap_builtins(&mut self);
}

impl NativeRegistry for super::vm::Vm {
    fn define_builtin(&mut self, meta: &'static BuiltinMeta, func: BuiltinFn) {
        let slot = meta.id as usize;
        debug_assert!((slot as u32) < FUNCTION_TABLE_SIZE);
        if let Some(entry) = self.func_table.get_mut(slot) {
            *entry = Some(BuiltinObj {
                name: meta.name,
                id: meta.id,
                func,
            });
        }
    }

    fn define_method(&mut self, meta: &'static BuiltinMeta, func: BuiltinFn) {
        self.methods.insert(
            meta.id,
            BuiltinObj {
                name: meta.name,
                id: meta.id,
                func,
            },
        );
    }

    fn bootstrap_builtins(&mut self) {
        for meta in BUILTIN_FUNCTIONS {
            if let Some(func) = crate::stdlib::function_impl(meta.name) {
                self.define_builtin(meta, func);
            }
        }
        for meta in BUILTIN_METHODS {
            if let Some(func) = crate::stdlib::method_impl(meta.name) {
                self.define_method(meta, func);
            }
        }
    }
}
