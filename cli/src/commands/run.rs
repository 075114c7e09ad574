use anyhow::{anyhow, Context, Result};
use extension::{ExtensionConfig, ScriptExtension};
use vm::{Console, StdConsole, Value, Vm};

use crate::read_image;

/// Load `paths` in order, run `entry` and print its result.
pub fn run_files(paths: &[String], entry: &str, config: ExtensionConfig) -> Result<()> {
    let value = run_with_console(paths, entry, config, Box::new(StdConsole))?;
    if value.is_defined() {
        println!("{}", value);
    }
    Ok(())
}

/// Same as [`run_files`], with script output and reports going to `console`.
/// Returns the entry function's result.
pub fn run_with_console(
    paths: &[String],
    entry: &str,
    config: ExtensionConfig,
    console: Box<dyn Console>,
) -> Result<Value> {
    let mut vm = Vm::with_console(console);
    let mut ext = ScriptExtension::with_defaults(&mut vm, config)
        .context("Failed to install the extension")?;

    for path in paths {
        let image = read_image(path)?;
        let script = vm
            .load_script(&mut ext, &image)
            .with_context(|| format!("Failed to load {}", path))?;
        tracing::info!(script = %script.name, base = script.base, "loaded");
    }

    let address = vm
        .entry_point(entry)
        .ok_or_else(|| anyhow!("Entry function '{}' not found", entry))?;

    vm.execute(&mut ext, address, vec![])
        .map_err(|e| anyhow!("Runtime Error: {}", e))
}
