use serde::{Deserialize, Serialize};
use std::time::Duration;

use crate::error::ConfigError;
use crate::rendering::streaming::constants::UPGRADE_FUNCTION;

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct RenderConfig {
    pub eager_regions: bool,
    pub region_timeout_ms: Option<u64>,
    pub upgrade_function: String,
    pub debug_timing: bool,
}

impl Default for RenderConfig {
    fn default() -> Self {
        Self {
            eager_regions: true,
            region_timeout_ms: None,
            upgrade_function: UPGRADE_FUNCTION.to_string(),
            debug_timing: false,
        }
    }
}

fn parse_flag(value: &str) -> bool {
    value.to_lowercase() == "true" || value == "1" || value.to_lowercase() == "yes"
}

fn is_js_identifier(name: &str) -> bool {
    let mut chars = name.chars();
    match chars.next() {
        Some(first) if first.is_ascii_alphabetic() || first == '_' || first == '$' => {}
        _ => return false,
    }
    chars.all(|c| c.is_ascii_alphanumeric() || c == '_' || c == '$')
}

impl RenderConfig {
    pub fn from_env() -> Result<Self, ConfigError> {
        let mut config = Self::default();
        config.apply_env(|key| std::env::var(key).ok())?;
        config.validate()?;
        Ok(config)
    }

    pub fn apply_env<F>(&mut self, lookup: F) -> Result<(), ConfigError>
    where
        F: Fn(&str) -> Option<String>,
    {
        if let Some(eager) = lookup("BRISK_EAGER_REGIONS") {
            self.eager_regions = parse_flag(&eager);
        }

        if let Some(timeout_str) = lookup("BRISK_REGION_TIMEOUT_MS") {
            self.region_timeout_ms = if timeout_str.is_empty() {
                None
            } else {
                Some(timeout_str.parse().map_err(|_| {
                    ConfigError::InvalidConfig("BRISK_REGION_TIMEOUT_MS".to_string())
                })?)
            };
        }

        if let Some(upgrade_function) = lookup("BRISK_UPGRADE_FUNCTION") {
            self.upgrade_function = upgrade_function;
        }

        if let Some(debug_timing) = lookup("BRISK_DEBUG_TIMING") {
            self.debug_timing = parse_flag(&debug_timing);
        }

        Ok(())
    }

    pub fn validate(&self) -> Result<(), ConfigError> {
        if !is_js_identifier(&self.upgrade_function) {
            return Err(ConfigError::InvalidConfig(format!(
                "upgrade_function `{}` is not a JavaScript identifier",
                self.upgrade_function
            )));
        }

        if self.region_timeout_ms == Some(0) {
            return Err(ConfigError::InvalidConfig(
                "region_timeout_ms must be greater than zero".to_string(),
            ));
        }

        Ok(())
    }

    pub fn from_file<P: AsRef<std::path::Path>>(path: P) -> Result<Self, ConfigError> {
        let contents = std::fs::read_to_string(path).map_err(ConfigError::FileRead)?;

        let config: Self = toml::from_str(&contents).map_err(ConfigError::TomlParse)?;
        config.validate()?;
        Ok(config)
    }

    pub fn save_to_file<P: AsRef<std::path::Path>>(&self, path: P) -> Result<(), ConfigError> {
        let contents = toml::to_string_pretty(self).map_err(ConfigError::TomlSerialize)?;

        std::fs::write(path, contents).map_err(ConfigError::FileWrite)
    }

    pub fn region_timeout(&self) -> Option<Duration> {
        self.region_timeout_ms.map(Duration::from_millis)
    }
}
