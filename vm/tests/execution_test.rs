use vm::opcode::OpCode;
use vm::{
    CapturedConsole, CodeBuilder, LoadedScript, PassThrough, RuntimeError, ScriptImage, Value,
    Vm, VmHooks,
};

fn captured_vm() -> (Vm, CapturedConsole) {
    let console = CapturedConsole::new();
    let vm = Vm::with_console(Box::new(console.clone()));
    (vm, console)
}

/// Load `image` and run its `main` function.
fn run_main(vm: &mut Vm, image: &ScriptImage) -> Result<Value, RuntimeError> {
    let script = vm
        .load_script(&mut PassThrough, image)
        .expect("load failed");
    let entry = script.function_address("main").expect("no main");
    vm.execute(&mut PassThrough, entry, vec![])
}

#[test]
fn test_execution_end_to_end() {
    let mut b = CodeBuilder::new();
    b.function("main");
    b.push_int(2).push_int(3).add().push_int(7).emit(vm::Instruction::Mul).ret();

    let (mut vm, _) = captured_vm();
    let result = run_main(&mut vm, &b.finish("maps/test")).expect("Runtime error");
    assert_eq!(result, Value::Int(35));
}

#[test]
fn script_calls_pass_parameters_and_return_values() {
    let mut b = CodeBuilder::new();
    b.function("sum");
    b.load_param(0).load_param(1).add().ret();
    b.function("main");
    b.push_int(20).push_int(22);
    b.script_call("sum", 2).unwrap();
    b.ret();

    let (mut vm, _) = captured_vm();
    let result = run_main(&mut vm, &b.finish("maps/test")).unwrap();
    assert_eq!(result, Value::Int(42));
}

#[test]
fn entry_arguments_are_visible_as_parameters() {
    let mut b = CodeBuilder::new();
    b.function("main");
    b.load_param(0).push_string("!").unwrap().add().ret();

    let (mut vm, _) = captured_vm();
    let script = vm.load_script(&mut PassThrough, &b.finish("t")).unwrap();
    let entry = script.function_address("main").unwrap();
    let result = vm
        .execute(&mut PassThrough, entry, vec![Value::from("hey")])
        .unwrap();
    assert_eq!(result, Value::from("hey!"));
}

#[test]
fn builtins_run_through_the_pass_through_hooks() {
    let (mut vm, console) = captured_vm();
    let mut b = CodeBuilder::new();
    b.function("main");
    b.push_string("hi").unwrap().push_int(3);
    b.call(vm.symbols(), "print", 2).unwrap();
    b.pop();
    b.push_string("LOUD").unwrap();
    b.call(vm.symbols(), "tolower", 1).unwrap();
    b.ret();

    let result = run_main(&mut vm, &b.finish("t")).unwrap();
    assert_eq!(result, Value::from("loud"));
    assert_eq!(vm.return_value(), &Value::from("loud"));
    assert_eq!(console.output(), "hi 3\n");
}

#[test]
fn builtin_methods_receive_self() {
    let (mut vm, _) = captured_vm();
    let mut b = CodeBuilder::new();
    b.function("main");
    b.push_int(1).push_int(3).push_string("abcdef").unwrap();
    b.call_method_named(vm.symbols(), "substr", 2).unwrap();
    b.ret();

    let result = run_main(&mut vm, &b.finish("t")).unwrap();
    assert_eq!(result, Value::from("bc"));
}

#[test]
fn unknown_native_id_is_a_runtime_error_and_resets_the_thread() {
    let mut b = CodeBuilder::new();
    b.function("main");
    b.push_int(1).call_builtin(0x2E0, 1).ret();

    let (mut vm, _) = captured_vm();
    let err = run_main(&mut vm, &b.finish("t")).unwrap_err();
    assert_eq!(err, RuntimeError::UnknownFunction(0x2E0));
    assert!(vm.frames_view().is_empty());
}

/// Records what the VM exposes while an error unwinds.
#[derive(Default)]
struct Recorder {
    opcode: Option<u8>,
    call_site_id: Option<u16>,
    depth: usize,
    loaded: Vec<String>,
    unloaded: bool,
}

impl VmHooks for Recorder {
    fn runtime_error(&mut self, vm: &mut Vm, _err: &RuntimeError) {
        self.opcode = Some(vm.fault_opcode());
        self.call_site_id = vm
            .fault_pos()
            .checked_sub(2)
            .and_then(|pos| vm.read_u16(pos));
        self.depth = vm.frames_view().len();
    }

    fn script_loaded(&mut self, script: &LoadedScript, _devmap: Option<&[u8]>) {
        self.loaded.push(script.name.clone());
    }

    fn scripts_unloaded(&mut self) {
        self.unloaded = true;
    }
}

#[test]
fn error_hook_sees_fault_opcode_call_site_and_frames() {
    let mut b = CodeBuilder::new();
    b.function("inner");
    b.push_int(1).push_int(2).call_builtin(0x2E5, 2).ret();
    b.function("main");
    b.script_call("inner", 0).unwrap();
    b.ret();

    let (mut vm, _) = captured_vm();
    let mut hooks = Recorder::default();
    let script = vm.load_script(&mut hooks, &b.finish("t")).unwrap();
    let entry = script.function_address("main").unwrap();
    assert!(vm.execute(&mut hooks, entry, vec![]).is_err());

    assert_eq!(hooks.opcode, Some(OpCode::CallBuiltin2.as_u8()));
    assert_eq!(hooks.call_site_id, Some(0x2E5));
    assert_eq!(hooks.depth, 2);
    assert_eq!(hooks.loaded, vec!["t".to_string()]);
}

#[test]
fn type_errors_report_the_instruction() {
    let mut b = CodeBuilder::new();
    b.function("main");
    b.push_int(1).push_undefined().emit(vm::Instruction::Sub).ret();

    let (mut vm, _) = captured_vm();
    let mut hooks = Recorder::default();
    let script = vm.load_script(&mut hooks, &b.finish("t")).unwrap();
    let err = vm.execute(&mut hooks, script.base, vec![]).unwrap_err();
    assert!(matches!(err, RuntimeError::TypeMismatch(_)));
    assert_eq!(hooks.opcode, Some(OpCode::Sub.as_u8()));
}

#[test]
fn runaway_recursion_hits_the_call_depth_limit() {
    let mut b = CodeBuilder::new();
    b.function("main");
    b.script_call("main", 0).unwrap();
    b.ret();

    let (mut vm, _) = captured_vm();
    let err = run_main(&mut vm, &b.finish("t")).unwrap_err();
    assert_eq!(err, RuntimeError::CallDepthExceeded);
}

#[test]
fn function_redirects_replace_script_call_targets() {
    let mut b = CodeBuilder::new();
    b.function("original");
    b.push_int(1).ret();
    b.function("replacement");
    b.push_int(2).ret();
    b.function("main");
    b.script_call("original", 0).unwrap();
    b.ret();

    let (mut vm, _) = captured_vm();
    let script = vm.load_script(&mut PassThrough, &b.finish("t")).unwrap();
    let from = script.function_address("original").unwrap();
    let to = script.function_address("replacement").unwrap();
    let main = script.function_address("main").unwrap();

    assert_eq!(vm.execute(&mut PassThrough, main, vec![]).unwrap(), Value::Int(1));
    vm.set_function_redirect(from, to);
    assert_eq!(vm.execute(&mut PassThrough, main, vec![]).unwrap(), Value::Int(2));
}

#[test]
fn find_function_names_the_owner_of_a_position() {
    let mut b = CodeBuilder::new();
    b.function("first");
    b.push_int(1).ret();
    let second = b.function("second");
    b.push_int(2).ret();

    let (mut vm, _) = captured_vm();
    let script = vm.load_script(&mut PassThrough, &b.finish("maps/a")).unwrap();
    assert_eq!(vm.find_function(script.base), Some(("first", "maps/a")));
    assert_eq!(
        vm.find_function(script.base + second + 1),
        Some(("second", "maps/a"))
    );
    assert_eq!(vm.find_function(script.end()), None);
}

#[test]
fn scripts_are_laid_out_back_to_back_and_unload_together() {
    let mut a = CodeBuilder::new();
    a.function("main");
    a.end();
    let mut b = CodeBuilder::new();
    b.function("main");
    b.push_int(5).ret();

    let (mut vm, _) = captured_vm();
    let mut hooks = Recorder::default();
    let first = vm.load_script(&mut hooks, &a.finish("a")).unwrap();
    let second = vm.load_script(&mut hooks, &b.finish("b")).unwrap();
    assert_eq!(second.base, first.end());
    assert_eq!(
        vm.execute(&mut hooks, second.base, vec![]).unwrap(),
        Value::Int(5)
    );
    assert_eq!(vm.execute(&mut hooks, first.base, vec![]).unwrap(), Value::Undefined);

    vm.unload_scripts(&mut hooks);
    assert!(hooks.unloaded);
    assert!(vm.scripts().is_empty());
    assert_eq!(
        vm.execute(&mut hooks, second.base, vec![]).unwrap_err(),
        RuntimeError::BadAddress(second.base)
    );
}
