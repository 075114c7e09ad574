use extension::pipeline::{REPORT_FOOTER, REPORT_HEADER};
use extension::{ExtensionConfig, FaultCause, ScriptExtension, SourcePosition};
use vm::{CapturedConsole, CodeBuilder, ScriptImage, Vm};

fn setup() -> (Vm, CapturedConsole, ScriptExtension) {
    let console = CapturedConsole::new();
    let mut vm = Vm::with_console(Box::new(console.clone()));
    let ext = ScriptExtension::with_defaults(&mut vm, ExtensionConfig::default()).unwrap();
    (vm, console, ext)
}

/// main -> outer -> inner, where inner fails `assert(0)` on line 10.
fn nested_script(vm: &Vm) -> ScriptImage {
    let mut b = CodeBuilder::new();
    b.function("inner");
    b.line(10, 5).push_int(0);
    b.call(vm.symbols(), "assert", 1).unwrap();
    b.pop();
    b.line(11, 1).end();

    b.function("outer");
    b.line(20, 5);
    b.script_call("inner", 0).unwrap();
    b.pop();
    b.line(21, 1).end();

    b.function("main");
    b.line(30, 3);
    b.script_call("outer", 0).unwrap();
    b.pop().end();
    b.finish("maps/stack")
}

#[test]
fn report_walks_frames_most_recent_first() {
    let (mut vm, console, mut ext) = setup();
    let image = nested_script(&vm);
    let script = vm.load_script(&mut ext, &image).unwrap();
    let main = script.function_address("main").unwrap();
    assert!(vm.execute(&mut ext, main, vec![]).is_err());

    let report = ext.last_report().expect("assert failure forces a report");
    assert_eq!(report.frames.len(), 3);
    assert_eq!(
        report.cause,
        FaultCause::BuiltinFunction {
            name: "assert".into(),
            id: vm.symbols().func_id("assert").unwrap(),
        }
    );

    let expected = [
        REPORT_HEADER,
        "in call to builtin function \"assert\": Assert fail",
        "\tat function \"inner\" in file \"maps/stack\" line 10 column 5",
        "\tat function \"outer\" in file \"maps/stack\" line 20 column 5",
        "\tat function \"main\" in file \"maps/stack\" line 30 column 3",
        REPORT_FOOTER,
    ];
    let printed: String = expected.iter().map(|line| format!("{}\n", line)).collect();
    assert_eq!(console.warnings(), printed);
}

#[test]
fn frames_without_function_symbols_are_unknown_locations() {
    let (mut vm, _, mut ext) = setup();
    let mut b = CodeBuilder::new();
    b.line(4, 2).push_int(0);
    b.call(vm.symbols(), "assert", 1).unwrap();
    let after_call = b.offset();
    b.end();
    let image = b.finish("anonymous");
    assert!(image.functions.is_empty());

    let script = vm.load_script(&mut ext, &image).unwrap();
    assert!(vm.execute(&mut ext, script.base, vec![]).is_err());

    let frames = &ext.last_report().unwrap().frames;
    assert_eq!(frames.len(), 1);
    assert_eq!(frames[0].pos, script.base + after_call);
    assert_eq!(
        frames[0].to_string(),
        format!("unknown location {:#x} line 4 column 2", script.base + after_call)
    );
}

#[test]
fn frames_without_debug_map_omit_the_line_clause() {
    let (mut vm, _, mut ext) = setup();
    let mut b = CodeBuilder::new();
    b.function("main");
    b.push_string("boom").unwrap();
    b.call(vm.symbols(), "assertmsg", 1).unwrap();
    b.pop().end();
    let image = b.finish("maps/nolines");
    assert!(image.devmap.is_none());

    let script = vm.load_script(&mut ext, &image).unwrap();
    assert!(vm.execute(&mut ext, script.base, vec![]).is_err());

    let report = ext.last_report().unwrap();
    assert_eq!(report.message.as_deref(), Some("Assert fail: boom"));
    assert_eq!(
        report.frames[0].to_string(),
        "function \"main\" in file \"maps/nolines\""
    );
}

#[test]
fn load_events_drive_the_debug_map_store() {
    let (mut vm, _, mut ext) = setup();
    let image = nested_script(&vm);
    let script = vm.load_script(&mut ext, &image).unwrap();

    assert_eq!(ext.debug_maps().len(), 1);
    assert_eq!(
        ext.resolve(script.base),
        Some(SourcePosition { line: 10, column: 5 })
    );

    vm.unload_scripts(&mut ext);
    assert!(ext.debug_maps().is_empty());
    assert_eq!(ext.resolve(script.base), None);
}

#[test]
fn malformed_debug_map_is_skipped() {
    let (mut vm, _, mut ext) = setup();
    let mut b = CodeBuilder::new();
    b.function("main");
    b.end();
    let mut image = b.finish("maps/broken");
    image.devmap = Some(vec![9, 0, 0, 0, 1]);

    let script = vm.load_script(&mut ext, &image).unwrap();
    assert!(ext.debug_maps().is_empty());
    assert_eq!(ext.resolve(script.base), None);
}
