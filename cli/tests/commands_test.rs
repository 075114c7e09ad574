use std::io::Write;

use cli::commands::{devmap, disassemble, run};
use extension::pipeline::REPORT_HEADER;
use extension::ExtensionConfig;
use tempfile::NamedTempFile;
use vm::{CapturedConsole, CodeBuilder, ScriptImage, SymbolTable, Value};

fn write_temp_image(image: &ScriptImage) -> NamedTempFile {
    let mut f = NamedTempFile::with_suffix(".gsxb").unwrap();
    f.write_all(&image.to_bytes()).unwrap();
    f.flush().unwrap();
    f
}

fn path_of(f: &NamedTempFile) -> String {
    f.path().to_str().unwrap().to_string()
}

/// `main` prints a greeting and returns 6 * 7; line markers on both statements.
fn greeting_image() -> ScriptImage {
    let symbols = SymbolTable::with_builtins();
    let mut b = CodeBuilder::new();
    b.function("main");
    b.line(1, 1).push_string("hello").unwrap();
    b.call(&symbols, "println", 1).unwrap();
    b.pop();
    b.line(2, 1).push_int(6).push_int(7).emit(vm::Instruction::Mul).ret();
    b.finish("maps/greeting")
}

fn failing_image() -> ScriptImage {
    let symbols = SymbolTable::with_builtins();
    let mut b = CodeBuilder::new();
    b.function("main");
    b.line(3, 9).push_string("broken").unwrap();
    b.call(&symbols, "assertmsg", 1).unwrap();
    b.pop().end();
    b.finish("maps/failing")
}

// ======================================================================
// run
// ======================================================================

#[test]
fn run_prints_through_the_extension_and_returns_the_result() {
    let file = write_temp_image(&greeting_image());
    let console = CapturedConsole::new();

    let value = run::run_with_console(
        &[path_of(&file)],
        "main",
        ExtensionConfig::default(),
        Box::new(console.clone()),
    )
    .unwrap();

    assert_eq!(value, Value::Int(42));
    assert_eq!(console.output(), "hello\n");
}

#[test]
fn run_reports_native_failures_with_source_lines() {
    let file = write_temp_image(&failing_image());
    let console = CapturedConsole::new();

    let err = run::run_with_console(
        &[path_of(&file)],
        "main",
        ExtensionConfig::default(),
        Box::new(console.clone()),
    )
    .unwrap_err();
    assert!(err.to_string().contains("Runtime Error"), "{}", err);

    let warnings = console.warnings();
    assert!(warnings.starts_with(REPORT_HEADER));
    assert!(warnings.contains("in call to builtin function \"assertmsg\": Assert fail: broken"));
    assert!(warnings.contains("\tat function \"main\" in file \"maps/failing\" line 3 column 9"));
}

#[test]
fn run_finds_the_entry_in_any_loaded_image() {
    let symbols = SymbolTable::with_builtins();
    let mut b = CodeBuilder::new();
    b.function("start");
    b.push_string("LOUD").unwrap();
    b.call(&symbols, "tolower", 1).unwrap();
    b.ret();
    let second = write_temp_image(&b.finish("maps/second"));
    let first = write_temp_image(&greeting_image());

    let value = run::run_with_console(
        &[path_of(&first), path_of(&second)],
        "start",
        ExtensionConfig::default(),
        Box::new(CapturedConsole::new()),
    )
    .unwrap();
    assert_eq!(value, Value::from("loud"));
}

#[test]
fn run_with_unknown_entry_fails() {
    let file = write_temp_image(&greeting_image());
    let err = run::run_with_console(
        &[path_of(&file)],
        "nowhere",
        ExtensionConfig::default(),
        Box::new(CapturedConsole::new()),
    )
    .unwrap_err();
    assert!(err.to_string().contains("'nowhere' not found"), "{}", err);
}

#[test]
fn run_nonexistent_file_returns_error() {
    let result = run::run_with_console(
        &["/tmp/nonexistent_gsx_test.gsxb".to_string()],
        "main",
        ExtensionConfig::default(),
        Box::new(CapturedConsole::new()),
    );
    assert!(result.is_err());
}

#[test]
fn run_rejects_files_that_are_not_images() {
    let mut f = NamedTempFile::with_suffix(".gsxb").unwrap();
    f.write_all(b"definitely not an image").unwrap();
    f.flush().unwrap();

    let err = run::run_with_console(
        &[path_of(&f)],
        "main",
        ExtensionConfig::default(),
        Box::new(CapturedConsole::new()),
    )
    .unwrap_err();
    assert!(format!("{:#}", err).contains("invalid script image"), "{:#}", err);
}

// ======================================================================
// devmap / disassemble
// ======================================================================

#[test]
fn devmap_lists_records_with_their_function() {
    let file = write_temp_image(&greeting_image());
    let listing = devmap::devmap_listing(&path_of(&file)).unwrap();

    let lines: Vec<&str> = listing.lines().collect();
    assert_eq!(lines[0], "== Debug map of maps/greeting (2 entries) ==");
    assert!(lines[1].starts_with("0000  line 1"), "{}", lines[1]);
    assert!(lines[1].ends_with("main"));
    assert!(lines[2].contains("line 2"));
}

#[test]
fn devmap_of_image_without_map() {
    let mut b = CodeBuilder::new();
    b.function("main");
    b.end();
    let file = write_temp_image(&b.finish("maps/plain"));
    assert_eq!(
        devmap::devmap_listing(&path_of(&file)).unwrap(),
        "maps/plain: no debug map\n"
    );
}

#[test]
fn disassemble_labels_functions_calls_and_lines() {
    let file = write_temp_image(&greeting_image());
    let listing = disassemble::disassemble_listing(&path_of(&file)).unwrap();

    let lines: Vec<&str> = listing.lines().collect();
    assert_eq!(lines[0], "== Disassembly of maps/greeting ==");
    assert_eq!(lines[1], "main:");
    assert!(lines[2].starts_with("0000  PUSH_STRING"), "{}", lines[2]);
    assert!(lines[2].ends_with("; line 1:1"));
    assert!(lines[3].contains("; println"), "{}", lines[3]);
    assert!(listing.contains("MUL"));
}

// ======================================================================
// panic hook
// ======================================================================

#[test]
fn logged_panics_still_unwind_with_their_payload() {
    cli::log_panics();
    let payload = std::panic::catch_unwind(|| panic!("routed")).unwrap_err();
    let _ = std::panic::take_hook();
    assert_eq!(extension::dispatch::panic_message(payload.as_ref()), "routed");
}
