//! Extension settings from an optional TOML file, with command-line flags on top.
//!
//! ```toml
//! developer_script = true
//! dedicated = false
//! install_defaults = true
//! ```

use std::fs;

use anyhow::{Context, Result};
use extension::ExtensionConfig;

/// Flags that can only switch a setting on.
#[derive(Debug, Clone, Copy, Default)]
pub struct FlagOverrides {
    pub developer_script: bool,
    pub dedicated: bool,
}

pub fn parse_config(text: &str) -> Result<ExtensionConfig> {
    toml::from_str(text).context("Invalid extension config")
}

pub fn load_config(path: Option<&str>, flags: FlagOverrides) -> Result<ExtensionConfig> {
    let mut config = match path {
        Some(path) => {
            let text = fs::read_to_string(path)
                .with_context(|| format!("Failed to read config {}", path))?;
            parse_config(&text)?
        }
        None => ExtensionConfig::default(),
    };

    config.developer_script |= flags.developer_script;
    config.dedicated |= flags.dedicated;
    tracing::debug!(?config, "extension config");
    Ok(config)
}
