//! The VM's own builtin implementations, keyed by the names in `specs`.

pub mod core;

use crate::native::BuiltinFn;

pub fn function_impl(name: &str) -> Option<BuiltinFn> {
    let func: BuiltinFn = match name {
        "print" => self::core::native_print,
        "println" => self::core::native_println,
        "assert" => self::core::native_assert,
        "assertex" => self::core::native_assertex,
        "assertmsg" => self::core::native_assertmsg,
        "isdefined" => self::core::native_isdefined,
        "isdedicatedserver" => self::core::native_isdedicatedserver,
        "abs" => self::core::native_abs,
        "tolower" => self::core::native_tolower,
        "int" => self::core::native_int,
        _ => return None,
    };
    Some(func)
}

pub fn method_impl(name: &str) -> Option<BuiltinFn> {
    let func: BuiltinFn = match name {
        "size" => self::core::method_size,
        "substr" => self::core::method_substr,
        _ => return None,
    };
    Some(func)
}
