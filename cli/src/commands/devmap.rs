use std::fmt::Write;

use anyhow::{Context, Result};
use extension::devmap::parse_devmap;

use crate::read_image;

/// Debug map of an image, one record per line in offset order, each with
/// the function it falls in.
pub fn devmap_listing(path: &str) -> Result<String> {
    let image = read_image(path)?;
    let mut out = String::new();

    let Some(blob) = &image.devmap else {
        writeln!(out, "{}: no debug map", image.name)?;
        return Ok(out);
    };
    let mut entries = parse_devmap(blob).with_context(|| format!("Bad debug map in {}", path))?;
    entries.sort_by_key(|e| e.offset);

    let mut functions: Vec<_> = image.functions.iter().collect();
    functions.sort_by_key(|f| f.offset);

    writeln!(out, "== Debug map of {} ({} entries) ==", image.name, entries.len())?;
    for entry in &entries {
        let owner = functions
            .iter()
            .rev()
            .find(|f| f.offset <= entry.offset)
            .map(|f| f.name.as_str())
            .unwrap_or("?");
        writeln!(
            out,
            "{:04X}  line {:<5} column {:<4} {}",
            entry.offset, entry.line, entry.column, owner
        )?;
    }
    Ok(out)
}
