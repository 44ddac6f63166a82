//! CLI configuration management

use anyhow::{Context, Result, anyhow};
use rawhid::DeviceFilter;
use serde::{Deserialize, Serialize};
use std::fs;
use std::path::{Path, PathBuf};
use std::time::Duration;

/// Largest packet accepted by `packet_size`
pub const MAX_PACKET_SIZE: usize = 1024;

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct CliConfig {
    #[serde(default)]
    pub device: DeviceSettings,
    #[serde(default)]
    pub transfer: TransferSettings,
    #[serde(default)]
    pub logging: LoggingSettings,
}

/// Which devices to open
///
/// Ids are `0x`-prefixed hex strings, or `"*"` for any.
///
/// # Example Configuration
/// ```toml
/// [device]
/// vendor_id = "0x16C0"
/// product_id = "*"
/// usage_page = "0xFFAB"
/// usage = "0x0200"
/// max_devices = 4
/// ```
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DeviceSettings {
    #[serde(default = "DeviceSettings::default_vendor_id")]
    pub vendor_id: String,
    #[serde(default = "DeviceSettings::default_product_id")]
    pub product_id: String,
    #[serde(default = "DeviceSettings::default_usage_page")]
    pub usage_page: String,
    #[serde(default = "DeviceSettings::default_usage")]
    pub usage: String,
    #[serde(default = "DeviceSettings::default_max_devices")]
    pub max_devices: usize,
}

impl Default for DeviceSettings {
    fn default() -> Self {
        Self {
            vendor_id: Self::default_vendor_id(),
            product_id: Self::default_product_id(),
            usage_page: Self::default_usage_page(),
            usage: Self::default_usage(),
            max_devices: Self::default_max_devices(),
        }
    }
}

impl DeviceSettings {
    fn default_vendor_id() -> String {
        "0x16C0".to_string()
    }

    fn default_product_id() -> String {
        "0x0480".to_string()
    }

    fn default_usage_page() -> String {
        "0xFFAB".to_string()
    }

    fn default_usage() -> String {
        "0x0200".to_string()
    }

    fn default_max_devices() -> usize {
        1
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TransferSettings {
    #[serde(default = "TransferSettings::default_recv_timeout")]
    pub recv_timeout_ms: u64,
    #[serde(default = "TransferSettings::default_send_timeout")]
    pub send_timeout_ms: u64,
    /// Size of every packet sent and of the receive buffer
    #[serde(default = "TransferSettings::default_packet_size")]
    pub packet_size: usize,
}

impl Default for TransferSettings {
    fn default() -> Self {
        Self {
            recv_timeout_ms: Self::default_recv_timeout(),
            send_timeout_ms: Self::default_send_timeout(),
            packet_size: Self::default_packet_size(),
        }
    }
}

impl TransferSettings {
    fn default_recv_timeout() -> u64 {
        220
    }

    fn default_send_timeout() -> u64 {
        100
    }

    fn default_packet_size() -> usize {
        64
    }

    pub fn recv_timeout(&self) -> Duration {
        Duration::from_millis(self.recv_timeout_ms)
    }

    pub fn send_timeout(&self) -> Duration {
        Duration::from_millis(self.send_timeout_ms)
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LoggingSettings {
    #[serde(default = "LoggingSettings::default_level")]
    pub level: String,
}

impl Default for LoggingSettings {
    fn default() -> Self {
        Self {
            level: Self::default_level(),
        }
    }
}

impl LoggingSettings {
    fn default_level() -> String {
        "info".to_string()
    }
}

/// Values given on the command line, each replacing its config field
#[derive(Debug, Clone, Default)]
pub struct Overrides {
    pub log_level: Option<String>,
    pub vendor_id: Option<String>,
    pub product_id: Option<String>,
    pub usage_page: Option<String>,
    pub usage: Option<String>,
    pub max_devices: Option<usize>,
}

impl CliConfig {
    /// Load from `path` or the standard locations, apply `overrides`, then
    /// validate the result
    pub fn resolve(path: Option<PathBuf>, overrides: &Overrides) -> Result<Self> {
        let mut config = match path {
            Some(path) => Self::load(Some(path))?,
            None => Self::load_or_default()?,
        };
        config.apply(overrides);
        config.validate().context("Invalid settings")?;
        Ok(config)
    }

    pub fn apply(&mut self, overrides: &Overrides) {
        if let Some(level) = &overrides.log_level {
            self.logging.level = level.clone();
        }
        if let Some(vid) = &overrides.vendor_id {
            self.device.vendor_id = vid.clone();
        }
        if let Some(pid) = &overrides.product_id {
            self.device.product_id = pid.clone();
        }
        if let Some(usage_page) = &overrides.usage_page {
            self.device.usage_page = usage_page.clone();
        }
        if let Some(usage) = &overrides.usage {
            self.device.usage = usage.clone();
        }
        if let Some(max) = overrides.max_devices {
            self.device.max_devices = max;
        }
    }

    /// Load configuration from the specified path
    ///
    /// Without a path, the first existing standard location is used and a
    /// missing file is an error. Values are not validated here; call
    /// [`CliConfig::validate`] once command-line overrides are applied.
    pub fn load(path: Option<PathBuf>) -> Result<Self> {
        let config_path = match path {
            Some(p) => expand_path(&p),
            None => Self::candidate_paths()
                .into_iter()
                .find(|p| p.exists())
                .ok_or_else(|| anyhow!("No configuration file found"))?,
        };

        Self::load_file(&config_path)
    }

    /// Parse a TOML document
    pub fn from_toml(content: &str) -> Result<Self> {
        Ok(toml::from_str(content)?)
    }

    /// Load the first standard location that exists, or defaults if none does
    pub fn load_or_default() -> Result<Self> {
        Self::load_first(&Self::candidate_paths())
    }

    /// Load the first of `candidates` that exists
    ///
    /// Defaults are returned only when no candidate exists. A file that is
    /// found but cannot be read or parsed is an error.
    pub fn load_first(candidates: &[PathBuf]) -> Result<Self> {
        match candidates.iter().find(|p| p.exists()) {
            Some(path) => Self::load_file(path),
            None => {
                tracing::debug!("No configuration file found, using defaults");
                Ok(Self::default())
            }
        }
    }

    /// Standard locations, in search order
    pub fn candidate_paths() -> Vec<PathBuf> {
        vec![Self::default_path(), PathBuf::from("/etc/rawhid/rawhid.toml")]
    }

    fn load_file(path: &Path) -> Result<Self> {
        let content = fs::read_to_string(path)
            .with_context(|| format!("Failed to read config file: {}", path.display()))?;

        let config = Self::from_toml(&content)
            .with_context(|| format!("Failed to parse config file: {}", path.display()))?;

        tracing::info!("Loaded configuration from: {}", path.display());
        Ok(config)
    }

    /// Save configuration to the specified path
    pub fn save(&self, path: &Path) -> Result<()> {
        let content = toml::to_string_pretty(self).context("Failed to serialize configuration")?;

        // Create parent directories if they don't exist
        if let Some(parent) = path.parent() {
            fs::create_dir_all(parent).with_context(|| {
                format!("Failed to create config directory: {}", parent.display())
            })?;
        }

        fs::write(path, content)
            .with_context(|| format!("Failed to write config file: {}", path.display()))?;

        tracing::info!("Saved configuration to: {}", path.display());
        Ok(())
    }

    /// Get the default configuration file path
    pub fn default_path() -> PathBuf {
        if let Some(config_dir) = dirs::config_dir() {
            config_dir.join("rawhid").join("rawhid.toml")
        } else {
            PathBuf::from(".config/rawhid/rawhid.toml")
        }
    }

    /// Validate configuration values
    pub fn validate(&self) -> Result<()> {
        let valid_levels = ["trace", "debug", "info", "warn", "error"];
        if !valid_levels.contains(&self.logging.level.as_str()) {
            return Err(anyhow!(
                "Invalid log level '{}', must be one of: {}",
                self.logging.level,
                valid_levels.join(", ")
            ));
        }

        if self.device.max_devices == 0 {
            return Err(anyhow!("max_devices must be at least 1"));
        }

        if self.transfer.packet_size == 0 || self.transfer.packet_size > MAX_PACKET_SIZE {
            return Err(anyhow!(
                "packet_size {} out of range, must be 1-{}",
                self.transfer.packet_size,
                MAX_PACKET_SIZE
            ));
        }

        self.filter()?;
        Ok(())
    }

    /// Build the device filter from the `[device]` section
    pub fn filter(&self) -> Result<DeviceFilter> {
        Ok(DeviceFilter {
            vendor_id: parse_id(&self.device.vendor_id, "vendor_id")?,
            product_id: parse_id(&self.device.product_id, "product_id")?,
            usage_page: parse_usage(&self.device.usage_page, "usage_page")?,
            usage: parse_usage(&self.device.usage, "usage")?,
        })
    }
}

/// Parse a 16-bit hex id (`0x1234`) or the `*` wildcard
pub fn parse_id(id: &str, name: &str) -> Result<Option<u16>> {
    parse_hex_value(id, name, 4)?
        .map(|value| u16::try_from(value).map_err(|_| anyhow!("Invalid {} '{}'", name, id)))
        .transpose()
}

/// Parse a usage page or usage (`0xFFAB`, up to 8 hex digits) or `*`
///
/// Report descriptors may declare 4-byte values, so the full 32-bit range is
/// accepted.
pub fn parse_usage(id: &str, name: &str) -> Result<Option<u32>> {
    parse_hex_value(id, name, 8)
}

fn parse_hex_value(id: &str, name: &str, max_digits: usize) -> Result<Option<u32>> {
    if id == "*" {
        return Ok(None);
    }

    let hex_part = id
        .strip_prefix("0x")
        .or_else(|| id.strip_prefix("0X"))
        .ok_or_else(|| {
            anyhow!(
                "Invalid {} '{}', must start with '0x' (e.g., '0x1234') or be '*'",
                name,
                id
            )
        })?;

    if hex_part.is_empty() || hex_part.len() > max_digits {
        return Err(anyhow!(
            "Invalid {} '{}', hex part must be 1-{} digits",
            name,
            id,
            max_digits
        ));
    }

    if !hex_part.chars().all(|c| c.is_ascii_hexdigit()) {
        return Err(anyhow!("Invalid {} '{}', not a valid hex number", name, id));
    }

    u32::from_str_radix(hex_part, 16)
        .map(Some)
        .map_err(|_| anyhow!("Invalid {} '{}', not a valid hex number", name, id))
}

fn expand_path(path: &Path) -> PathBuf {
    PathBuf::from(shellexpand::tilde(&path.to_string_lossy()).as_ref())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_config() {
        let config = CliConfig::default();
        assert_eq!(config.logging.level, "info");
        assert_eq!(config.device.max_devices, 1);
        assert_eq!(config.transfer.packet_size, 64);
        assert!(config.validate().is_ok());
    }

    #[test]
    fn test_default_filter() {
        let filter = CliConfig::default().filter().unwrap();
        assert_eq!(filter.vendor_id, Some(0x16C0));
        assert_eq!(filter.product_id, Some(0x0480));
        assert_eq!(filter.usage_page, Some(0xFFAB));
        assert_eq!(filter.usage, Some(0x0200));
    }

    #[test]
    fn test_parse_id_valid() {
        assert_eq!(parse_id("0x1234", "id").unwrap(), Some(0x1234));
        assert_eq!(parse_id("0XABCD", "id").unwrap(), Some(0xABCD));
        assert_eq!(parse_id("0x1", "id").unwrap(), Some(0x1));
        assert_eq!(parse_id("*", "id").unwrap(), None);
    }

    #[test]
    fn test_parse_id_invalid() {
        assert!(parse_id("1234", "id").is_err());
        assert!(parse_id("0x", "id").is_err());
        assert!(parse_id("0x12345", "id").is_err());
        assert!(parse_id("0xGHIJ", "id").is_err());
        assert!(parse_id("", "id").is_err());
        assert!(parse_id("0x+123", "id").is_err());
    }

    #[test]
    fn test_parse_usage_accepts_32_bit_values() {
        assert_eq!(parse_usage("0xFFAB0200", "usage").unwrap(), Some(0xFFAB_0200));
        assert_eq!(parse_usage("0x0200", "usage").unwrap(), Some(0x0200));
        assert_eq!(parse_usage("*", "usage").unwrap(), None);
        assert!(parse_usage("0x1FFAB0200", "usage").is_err());
    }

    #[test]
    fn test_filter_extended_usage() {
        let mut config = CliConfig::default();
        config.device.usage_page = "0xFFAB0000".to_string();
        config.device.usage = "0x00FF0001".to_string();

        let filter = config.filter().unwrap();
        assert_eq!(filter.usage_page, Some(0xFFAB_0000));
        assert_eq!(filter.usage, Some(0x00FF_0001));
        assert!(config.validate().is_ok());

        config.device.vendor_id = "0x16C00".to_string();
        assert!(config.validate().is_err());
    }

    #[test]
    fn test_config_serialization() {
        let config = CliConfig::default();
        let toml_str = toml::to_string(&config).unwrap();
        let parsed = CliConfig::from_toml(&toml_str).unwrap();

        assert_eq!(config.device.vendor_id, parsed.device.vendor_id);
        assert_eq!(config.transfer.recv_timeout_ms, parsed.transfer.recv_timeout_ms);
    }

    #[test]
    fn test_validate_log_level() {
        let mut config = CliConfig::default();
        config.logging.level = "invalid".to_string();
        assert!(config.validate().is_err());

        config.logging.level = "debug".to_string();
        assert!(config.validate().is_ok());
    }

    #[test]
    fn test_validate_ranges() {
        let mut config = CliConfig::default();
        config.device.max_devices = 0;
        assert!(config.validate().is_err());

        let mut config = CliConfig::default();
        config.transfer.packet_size = 0;
        assert!(config.validate().is_err());
        config.transfer.packet_size = MAX_PACKET_SIZE + 1;
        assert!(config.validate().is_err());
        config.transfer.packet_size = MAX_PACKET_SIZE;
        assert!(config.validate().is_ok());
    }

    #[test]
    fn test_timeouts() {
        let transfer = TransferSettings::default();
        assert_eq!(transfer.recv_timeout(), Duration::from_millis(220));
        assert_eq!(transfer.send_timeout(), Duration::from_millis(100));
    }
}
