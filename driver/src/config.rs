//! Device configuration, loaded once at startup (ambient stack; no live
//! reload, unlike the teacher's `ConfigManager`).

use serde::Deserialize;
use std::path::Path;

#[derive(Debug, Clone, Deserialize)]
pub struct DeviceConfig {
    #[serde(default = "default_ioctl_timeout_ms")]
    pub ioctl_timeout_ms: u64,
    #[serde(default = "default_scan_timeout_ms")]
    pub scan_timeout_ms: u64,
    #[serde(default = "default_connect_timeout_ms")]
    pub connect_timeout_ms: u64,
    #[serde(default)]
    pub interfaces: Vec<InterfaceConfig>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct InterfaceConfig {
    pub bss_index: u8,
    #[serde(default)]
    pub role: InterfaceRole,
}

#[derive(Debug, Clone, Copy, Default, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "snake_case")]
pub enum InterfaceRole {
    #[default]
    Client,
    SoftAp,
}

fn default_ioctl_timeout_ms() -> u64 {
    5_000
}
fn default_scan_timeout_ms() -> u64 {
    15_000
}
fn default_connect_timeout_ms() -> u64 {
    10_000
}

impl Default for DeviceConfig {
    fn default() -> Self {
        DeviceConfig {
            ioctl_timeout_ms: default_ioctl_timeout_ms(),
            scan_timeout_ms: default_scan_timeout_ms(),
            connect_timeout_ms: default_connect_timeout_ms(),
            interfaces: Vec::new(),
        }
    }
}

impl DeviceConfig {
    pub fn load(path: impl AsRef<Path>) -> shared::Result<Self> {
        let text = std::fs::read_to_string(path.as_ref()).map_err(|e| {
            shared::Error::InvalidArgs(format!("reading {}: {e}", path.as_ref().display()))
        })?;
        toml::from_str(&text)
            .map_err(|e| shared::Error::InvalidArgs(format!("parsing config: {e}")))
    }

    pub fn ioctl_timeout(&self) -> std::time::Duration {
        std::time::Duration::from_millis(self.ioctl_timeout_ms)
    }

    pub fn scan_timeout(&self) -> std::time::Duration {
        std::time::Duration::from_millis(self.scan_timeout_ms)
    }

    pub fn connect_timeout(&self) -> std::time::Duration {
        std::time::Duration::from_millis(self.connect_timeout_ms)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn defaults_apply_when_fields_absent() {
        let config: DeviceConfig = toml::from_str("").unwrap();
        assert_eq!(config.ioctl_timeout_ms, 5_000);
        assert!(config.interfaces.is_empty());
    }

    #[test]
    fn parses_interface_table() {
        let toml_text = r#"
            [[interfaces]]
            bss_index = 0
            role = "client"

            [[interfaces]]
            bss_index = 1
            role = "soft_ap"
        "#;
        let config: DeviceConfig = toml::from_str(toml_text).unwrap();
        assert_eq!(config.interfaces.len(), 2);
        assert_eq!(config.interfaces[1].role, InterfaceRole::SoftAp);
    }
}
