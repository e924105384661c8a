use std::{fs, path::Path};

use serde::{Deserialize, Serialize};

use crate::error::AppError;

pub const DEFAULT_DESCRIPTOR_PATH: &str = "/opt/version";
pub const DEFAULT_GPIO_ROOT: &str = "/sys/class/gpio";
pub const DEFAULT_POLL_INTERVAL_MS: u64 = 50;

#[derive(Debug, Deserialize, Serialize, Clone)]
#[serde(default)]
pub struct AppConfig {
    pub descriptor_path: String,
    pub gpio_root: String,
    pub poll_interval_ms: u64,
}

impl Default for AppConfig {
    fn default() -> Self {
        Self {
            descriptor_path: DEFAULT_DESCRIPTOR_PATH.to_string(),
            gpio_root: DEFAULT_GPIO_ROOT.to_string(),
            poll_interval_ms: DEFAULT_POLL_INTERVAL_MS,
        }
    }
}

impl AppConfig {
    pub fn load_from_file<P: AsRef<Path>>(path: P) -> Result<Self, AppError> {
        let contents = fs::read_to_string(&path)
            .map_err(|e| AppError::Config(format!("Failed to read config: {e}")))?;
        serde_json::from_str(&contents)
            .map_err(|e| AppError::Config(format!("Invalid config json: {e}")))
    }
}
