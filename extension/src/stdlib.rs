//! Default native library: builtin overrides plus `replacefunc` and
//! `executecommand`.

use vm::{Value, VarType, Vm};

use crate::dispatch::ScriptExtension;
use crate::error::{raise_error, ExtensionError, ScriptError};

/// Install the default overrides and functions into `ext`.
pub fn install(ext: &mut ScriptExtension, vm: &mut Vm) -> Result<(), ExtensionError> {
    ext.override_function(vm, "print", scr_print)?;
    ext.override_function(vm, "println", scr_println)?;

    ext.override_function(vm, "assert", assert_cmd)?;
    ext.override_function(vm, "assertex", assert_ex_cmd)?;
    ext.override_function(vm, "assertmsg", assert_msg_cmd)?;

    let dedicated = ext.config().dedicated;
    ext.override_function(vm, "isdedicatedserver", move |vm: &mut Vm| {
        vm.add_bool(dedicated);
        Ok(())
    })?;

    ext.register_function(vm, "replacefunc", replace_func)?;
    ext.register_function(vm, "executecommand", execute_command)?;

    tracing::debug!(
        overrides = ext.overrides().len(),
        functions = ext.registry().len(),
        "default natives installed"
    );
    Ok(())
}

/// Every parameter as a string, concatenated.
fn concat_params(vm: &Vm) -> Result<String, ScriptError> {
    let mut out = String::new();
    for i in 0..vm.num_params() {
        out.push_str(&vm.get_string(i)?);
    }
    Ok(out)
}

fn scr_print(vm: &mut Vm) -> Result<(), ScriptError> {
    let text = concat_params(vm)?;
    vm.console_mut().info(&text);
    Ok(())
}

fn scr_println(vm: &mut Vm) -> Result<(), ScriptError> {
    let mut text = concat_params(vm)?;
    text.push('\n');
    vm.console_mut().info(&text);
    Ok(())
}

fn assert_cmd(vm: &mut Vm) -> Result<(), ScriptError> {
    if vm.get_int(0)? == 0 {
        return raise_error("Assert fail");
    }
    Ok(())
}

fn assert_ex_cmd(vm: &mut Vm) -> Result<(), ScriptError> {
    if vm.get_int(0)? == 0 {
        return raise_error(format!("Assert fail: {}", vm.get_string(1)?));
    }
    Ok(())
}

fn assert_msg_cmd(vm: &mut Vm) -> Result<(), ScriptError> {
    raise_error(format!("Assert fail: {}", vm.get_string(0)?))
}

/// Code address of a function parameter.
fn get_code_pos(vm: &Vm, index: usize) -> Result<u32, ScriptError> {
    if index >= vm.num_params() {
        return raise_error("Scr_GetCodePos: index is out of range");
    }
    match vm.param(index)? {
        Value::Function(addr) => Ok(*addr),
        _ => raise_error("Scr_GetCodePos requires a function as parameter"),
    }
}

/// `replacefunc(from, to)`: later script calls to `from` run `to`.
fn replace_func(vm: &mut Vm) -> Result<(), ScriptError> {
    let is_function = |i| matches!(vm.get_type(i), Ok(VarType::Function));
    if !is_function(0) || !is_function(1) {
        return raise_error("Parameter must be a function");
    }

    let from = get_code_pos(vm, 0)?;
    let to = get_code_pos(vm, 1)?;
    tracing::debug!(from, to, "script function replaced");
    vm.set_function_redirect(from, to);
    Ok(())
}

/// `executecommand(cmd)`: pass `cmd` to the host's command executor.
fn execute_command(vm: &mut Vm) -> Result<(), ScriptError> {
    let command = vm.get_string(0)?;
    tracing::debug!(%command, "executing console command");
    vm.console_mut().execute_command(&command);
    Ok(())
}
