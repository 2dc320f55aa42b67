use anyhow::{bail, Context, Result};
use serde::{Deserialize, Serialize};
use std::fs;
use std::path::Path;

use crate::storage::StorageFormat;

#[derive(Debug, Clone, Default, PartialEq, Deserialize, Serialize)]
#[serde(default)]
pub struct Config {
    pub backend: BackendConfig,
    pub monitor: MonitorConfig,
    pub capture: CaptureConfig,
    pub storage: StorageConfig,
}

#[derive(Debug, Clone, PartialEq, Deserialize, Serialize)]
#[serde(default)]
pub struct BackendConfig {
    pub base_url: String,
    pub timeout_ms: u64,
}

#[derive(Debug, Clone, PartialEq, Deserialize, Serialize)]
#[serde(default)]
pub struct MonitorConfig {
    pub poll_interval_secs: u64,
    pub probe_timeout_ms: u64,
}

#[derive(Debug, Clone, PartialEq, Deserialize, Serialize)]
#[serde(default)]
pub struct CaptureConfig {
    pub default_count: u32,
    pub max_count: u32,
    pub real_capture: bool,
}

#[derive(Debug, Clone, Default, PartialEq, Deserialize, Serialize)]
#[serde(default)]
pub struct StorageConfig {
    pub default_format: StorageFormat,
}

impl Default for BackendConfig {
    fn default() -> Self {
        Self {
            base_url: "http://localhost:5000/api".to_string(),
            timeout_ms: 15_000,
        }
    }
}

impl Default for MonitorConfig {
    fn default() -> Self {
        Self {
            poll_interval_secs: 30,
            probe_timeout_ms: 5_000,
        }
    }
}

impl Default for CaptureConfig {
    fn default() -> Self {
        Self {
            default_count: 10,
            max_count: 50,
            real_capture: false,
        }
    }
}

impl Config {
    pub fn load_from_file(path: impl AsRef<Path>) -> Result<Self> {
        let path = path.as_ref();
        let content = fs::read_to_string(path)
            .with_context(|| format!("reading config file {}", path.display()))?;
        let config: Config = toml::from_str(&content)
            .with_context(|| format!("parsing config file {}", path.display()))?;
        config.validate()?;
        Ok(config)
    }

    pub fn save_to_file(&self, path: impl AsRef<Path>) -> Result<()> {
        let path = path.as_ref();
        let content = toml::to_string_pretty(self).context("serializing config")?;
        fs::write(path, content).with_context(|| format!("writing config file {}", path.display()))?;
        Ok(())
    }

    pub fn validate(&self) -> Result<()> {
        reqwest::Url::parse(&self.backend.base_url)
            .with_context(|| format!("backend.base_url '{}' is not a URL", self.backend.base_url))?;

        if self.backend.timeout_ms == 0 {
            bail!("backend.timeout_ms must be greater than zero");
        }
        if self.monitor.poll_interval_secs == 0 {
            bail!("monitor.poll_interval_secs must be greater than zero");
        }
        if self.monitor.probe_timeout_ms == 0 {
            bail!("monitor.probe_timeout_ms must be greater than zero");
        }
        if self.capture.max_count == 0 {
            bail!("capture.max_count must be at least 1");
        }
        if self.capture.default_count == 0 || self.capture.default_count > self.capture.max_count {
            bail!(
                "capture.default_count must be between 1 and {}, got {}",
                self.capture.max_count,
                self.capture.default_count
            );
        }
        Ok(())
    }
}
