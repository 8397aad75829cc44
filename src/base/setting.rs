//! Global settings of the chart client.

use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::fs;
use std::path::Path;
use std::sync::{LazyLock, RwLock};

use super::utility::get_file_path;

/// Setting filename
pub const SETTING_FILENAME: &str = "kline_setting.json";

/// Default settings
fn default_settings() -> HashMap<String, SettingValue> {
    let mut settings = HashMap::new();

    // Server settings
    settings.insert("server.host".to_string(), SettingValue::String("http://localhost:8080".to_string()));
    settings.insert("server.timeout".to_string(), SettingValue::Int(30));
    settings.insert("server.token".to_string(), SettingValue::String(String::new()));

    // Polling settings, intervals in milliseconds
    settings.insert("poll.interval".to_string(), SettingValue::Int(3_000));
    settings.insert("poll.max_attempts".to_string(), SettingValue::Int(20));
    settings.insert("poll.steady_interval".to_string(), SettingValue::Int(60_000));
    settings.insert("poll.steady_rounds".to_string(), SettingValue::Int(0));

    // Chart settings
    settings.insert("chart.indicator".to_string(), SettingValue::String("VOL".to_string()));

    // Log settings
    settings.insert("log.level".to_string(), SettingValue::Int(20)); // INFO level
    settings.insert("log.console".to_string(), SettingValue::Bool(true));
    settings.insert("log.file".to_string(), SettingValue::Bool(false));

    settings
}

/// Setting value types
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum SettingValue {
    String(String),
    Int(i64),
    Float(f64),
    Bool(bool),
}

impl SettingValue {
    /// Get as string
    pub fn as_str(&self) -> Option<&str> {
        match self {
            SettingValue::String(s) => Some(s),
            _ => None,
        }
    }

    /// Get as i64
    pub fn as_int(&self) -> Option<i64> {
        match self {
            SettingValue::Int(i) => Some(*i),
            _ => None,
        }
    }

    /// Get as bool
    pub fn as_bool(&self) -> Option<bool> {
        match self {
            SettingValue::Bool(b) => Some(*b),
            _ => None,
        }
    }
}

/// Settings container
pub struct Settings {
    settings: RwLock<HashMap<String, SettingValue>>,
}

impl Settings {
    /// Create Settings with defaults overlaid by the setting file, if any
    pub fn new() -> Self {
        let settings = Self::with_defaults();
        if let Some(file_settings) = load_settings_from_file(&get_file_path(SETTING_FILENAME)) {
            settings.update(file_settings);
        }
        settings
    }

    /// Create Settings holding only the defaults
    pub fn with_defaults() -> Self {
        Self {
            settings: RwLock::new(default_settings()),
        }
    }

    /// Create Settings with defaults overlaid by an explicit JSON file
    pub fn load_from(path: &Path) -> Result<Self, Box<dyn std::error::Error>> {
        let content = fs::read_to_string(path)?;
        let file_settings: HashMap<String, SettingValue> = serde_json::from_str(&content)?;
        let settings = Self::with_defaults();
        settings.update(file_settings);
        Ok(settings)
    }

    /// Get a setting value
    pub fn get(&self, key: &str) -> Option<SettingValue> {
        self.settings.read().ok()?.get(key).cloned()
    }

    /// Get a string setting
    pub fn get_string(&self, key: &str) -> Option<String> {
        self.get(key).and_then(|v| v.as_str().map(|s| s.to_string()))
    }

    /// Get an integer setting
    pub fn get_int(&self, key: &str) -> Option<i64> {
        self.get(key).and_then(|v| v.as_int())
    }

    /// Get a bool setting
    pub fn get_bool(&self, key: &str) -> Option<bool> {
        self.get(key).and_then(|v| v.as_bool())
    }

    /// Set a setting value
    pub fn set(&self, key: impl Into<String>, value: SettingValue) {
        if let Ok(mut settings) = self.settings.write() {
            settings.insert(key.into(), value);
        }
    }

    /// Update settings from a map
    pub fn update(&self, new_settings: HashMap<String, SettingValue>) {
        if let Ok(mut settings) = self.settings.write() {
            settings.extend(new_settings);
        }
    }

    /// Save settings to a JSON file
    pub fn save_to(&self, path: &Path) -> Result<(), Box<dyn std::error::Error>> {
        let settings = self.settings.read().map_err(|e| e.to_string())?;
        let json = serde_json::to_string_pretty(&*settings)?;
        fs::write(path, json)?;
        Ok(())
    }
}

impl Default for Settings {
    fn default() -> Self {
        Self::new()
    }
}

/// Load settings from JSON file
fn load_settings_from_file(filepath: &Path) -> Option<HashMap<String, SettingValue>> {
    if filepath.exists() {
        let content = fs::read_to_string(filepath).ok()?;
        serde_json::from_str(&content).ok()
    } else {
        None
    }
}

/// Global settings instance
pub static SETTINGS: LazyLock<Settings> = LazyLock::new(Settings::new);
