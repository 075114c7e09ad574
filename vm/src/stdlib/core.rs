use crate::error::RuntimeError;
use crate::machine::Vm;
use crate::value::Value;

/// All parameters rendered and joined with single spaces.
fn joined_params(vm: &Vm) -> String {
    (0..vm.num_params())
        .filter_map(|i| vm.param(i).ok())
        .map(Value::to_string)
        .collect::<Vec<_>>()
        .join(" ")
}

fn is_true(vm: &Vm, index: usize) -> Result<bool, RuntimeError> {
    match vm.param(index)? {
        Value::Int(n) => Ok(*n != 0),
        other => Err(RuntimeError::TypeMismatch(format!(
            "condition must be an int, got {}",
            other.var_type().name()
        ))),
    }
}

pub fn native_print(vm: &mut Vm) -> Result<(), RuntimeError> {
    let text = joined_params(vm);
    vm.console_mut().info(&format!("{}\n", text));
    Ok(())
}

pub fn native_println(vm: &mut Vm) -> Result<(), RuntimeError> {
    native_print(vm)
}

pub fn native_assert(vm: &mut Vm) -> Result<(), RuntimeError> {
    if !is_true(vm, 0)? {
        return Err(RuntimeError::Unknown("assert failed".into()));
    }
    Ok(())
}

pub fn native_assertex(vm: &mut Vm) -> Result<(), RuntimeError> {
    if !is_true(vm, 0)? {
        let msg = vm.get_string(1)?;
        return Err(RuntimeError::Unknown(format!("assert failed: {}", msg)));
    }
    Ok(())
}

pub fn native_assertmsg(vm: &mut Vm) -> Result<(), RuntimeError> {
    let msg = vm.get_string(0)?;
    Err(RuntimeError::Unknown(format!("assert failed: {}", msg)))
}

pub fn native_isdefined(vm: &mut Vm) -> Result<(), RuntimeError> {
    let defined = vm.param(0)?.is_defined();
    vm.add_bool(defined);
    Ok(())
}

pub fn native_isdedicatedserver(vm: &mut Vm) -> Result<(), RuntimeError> {
    vm.add_bool(false);
    Ok(())
}

pub fn native_abs(vm: &mut Vm) -> Result<(), RuntimeError> {
    let n = vm.get_int(0)?;
    vm.add_int(n.wrapping_abs());
    Ok(())
}

pub fn native_tolower(vm: &mut Vm) -> Result<(), RuntimeError> {
    let s = vm.get_string(0)?;
    vm.add_string(s.to_lowercase());
    Ok(())
}

pub fn native_int(vm: &mut Vm) -> Result<(), RuntimeError> {
    let n = match vm.param(0)? {
        Value::Int(n) => *n,
        Value::String(s) => s.trim().parse::<i32>().unwrap_or(0),
        other => {
            return Err(RuntimeError::TypeMismatch(format!(
                "int() expects an int or string, got {}",
                other.var_type().name()
            )))
        }
    };
    vm.add_int(n);
    Ok(())
}

fn self_string(vm: &Vm) -> Result<String, RuntimeError> {
    match vm.self_value() {
        Some(Value::String(s)) => Ok(s.clone()),
        Some(other) => Err(RuntimeError::TypeMismatch(format!(
            "method called on {}",
            other.var_type().name()
        ))),
        None => Err(RuntimeError::TypeMismatch("method called without self".into())),
    }
}

pub fn method_size(vm: &mut Vm) -> Result<(), RuntimeError> {
    let s = self_string(vm)?;
    vm.add_int(s.chars().count() as i32);
    Ok(())
}

pub fn method_substr(vm: &mut Vm) -> Result<(), RuntimeError> {
    let s = self_string(vm)?;
    let len = s.chars().count();
    let start = vm.get_int(0)?.max(0) as usize;
    let end = if vm.num_params() > 1 {
        vm.get_int(1)?.max(0) as usize
    } else {
        len
    };
    let out: String = s
        .chars()
        .skip(start)
        .take(end.min(len).saturating_sub(start))
        .collect();
    vm.add_string(out);
    Ok(())
}
