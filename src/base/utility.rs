//! General utility functions.

use std::env;
use std::fs;
use std::path::{Path, PathBuf};
use std::sync::LazyLock;

/// Name of the per-user working folder
const APP_FOLDER: &str = ".klinewatch";

/// Resolve the working folder: `./.klinewatch` when present, else `~/.klinewatch`
fn get_app_dir(temp_name: &str) -> PathBuf {
    let cwd = env::current_dir().unwrap_or_else(|_| PathBuf::from("."));
    let temp_path = cwd.join(temp_name);
    if temp_path.exists() {
        return temp_path;
    }

    let home_path = dirs::home_dir().unwrap_or_else(|| PathBuf::from("."));
    let temp_path = home_path.join(temp_name);
    if !temp_path.exists() {
        let _ = fs::create_dir_all(&temp_path);
    }
    temp_path
}

/// Working directory for settings and logs
pub static TEMP_DIR: LazyLock<PathBuf> = LazyLock::new(|| get_app_dir(APP_FOLDER));

/// Get path for temp file with filename
pub fn get_file_path(filename: &str) -> PathBuf {
    TEMP_DIR.join(filename)
}

/// Get path for a folder under `base`, creating it if needed
pub fn ensure_folder(base: &Path, folder_name: &str) -> PathBuf {
    let folder_path = base.join(folder_name);
    if !folder_path.exists() {
        let _ = fs::create_dir_all(&folder_path);
    }
    folder_path
}
