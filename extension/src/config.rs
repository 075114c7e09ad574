use serde::Deserialize;

/// Extension settings. Every field has a default, so a partial TOML table works.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
#[serde(default)]
pub struct ExtensionConfig {
    /// Report every runtime error, not only the ones forced by a native.
    pub developer_script: bool,
    /// Value returned by `isdedicatedserver`.
    pub dedicated: bool,
    /// Install the default native library (`stdlib::install`).
    pub install_defaults: bool,
}

impl Default for ExtensionConfig {
    fn default() -> Self {
        Self {
            developer_script: false,
            dedicated: false,
            install_defaults: true,
        }
    }
}
