//! Ambient services: settings, logging and filesystem helpers.

pub mod logger;
pub mod setting;
pub mod utility;

pub use logger::{init_logger, CRITICAL, DEBUG, ERROR, INFO, WARNING};
pub use setting::{SettingValue, Settings, SETTINGS};
pub use utility::{get_file_path, TEMP_DIR};
