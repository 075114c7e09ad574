use std::fmt::Write;

use anyhow::{anyhow, Result};
use extension::devmap::parse_devmap;
use vm::{Instruction, SymbolTable};

use crate::read_image;

pub fn disassemble_listing(path: &str) -> Result<String> {
    let image = read_image(path)?;
    let symbols = SymbolTable::with_builtins();
    // A broken debug map only costs the line annotations.
    let lines = image
        .devmap
        .as_deref()
        .and_then(|blob| parse_devmap(blob).ok())
        .unwrap_or_default();

    let mut out = String::new();
    writeln!(out, "== Disassembly of {} ==", image.name)?;

    let mut pos = 0usize;
    while pos < image.code.len() {
        let offset = pos as u32;
        for f in image.functions.iter().filter(|f| f.offset == offset) {
            writeln!(out, "{}:", f.name)?;
        }

        let (insn, len) = Instruction::decode(&image.code[pos..])
            .map_err(|e| anyhow!("{} at offset {:04X}", e, offset))?;

        let mut text = format!("{:04X}  {}", offset, insn);
        if let Some(name) = callee_name(&symbols, &insn) {
            write!(text, "  ; {}", name)?;
        }
        if let Some(entry) = lines.iter().rev().find(|e| e.offset == offset) {
            write!(text, "  ; line {}:{}", entry.line, entry.column)?;
        }
        writeln!(out, "{}", text)?;
        pos += len;
    }
    Ok(out)
}

fn callee_name(symbols: &SymbolTable, insn: &Instruction) -> Option<String> {
    match insn {
        Instruction::CallBuiltin { id, .. } => Some(symbols.func_display_name(*id)),
        Instruction::CallBuiltinMethod { id, .. } => Some(symbols.meth_display_name(*id)),
        _ => None,
    }
}
