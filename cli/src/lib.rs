pub mod commands;
pub mod config;

use std::fs::File;
use std::io::BufReader;

use anyhow::{Context, Result};
use vm::ScriptImage;

/// Read a script image from disk.
pub fn read_image(path: &str) -> Result<ScriptImage> {
    let file = File::open(path).with_context(|| format!("Failed to open {}", path))?;
    ScriptImage::read(&mut BufReader::new(file))
        .with_context(|| format!("Failed to load script image {}", path))
}

/// Send panic reports to the log instead of the default stderr hook. Panics
/// inside natives already reach the console as script runtime errors.
pub fn log_panics() {
    std::panic::set_hook(Box::new(|info| {
        let location = info
            .location()
            .map(|l| format!("{}:{}", l.file(), l.line()))
            .unwrap_or_default();
        tracing::error!(
            %location,
            message = extension::dispatch::panic_message(info.payload()),
            "panic"
        );
    }));
}
