use crate::core::error::ChangeViewError;
use std::path::PathBuf;

const APP_DIR: &str = "git-changes";

pub fn get_config_directory() -> Result<PathBuf, ChangeViewError> {
    let base = match std::env::consts::OS {
        "linux" | "freebsd" | "netbsd" | "openbsd" => std::env::var("XDG_CONFIG_HOME")
            .map(PathBuf::from)
            .unwrap_or_else(|_| dirs::home_dir().unwrap_or_default().join(".config")),
        "macos" => dirs::home_dir()
            .unwrap_or_default()
            .join("Library/Application Support"),
        _ => dirs::config_dir().unwrap_or_default(),
    };

    Ok(base.join(APP_DIR))
}

pub fn get_data_directory() -> Result<PathBuf, ChangeViewError> {
    let base = match std::env::consts::OS {
        "linux" | "freebsd" | "netbsd" | "openbsd" => std::env::var("XDG_DATA_HOME")
            .map(PathBuf::from)
            .unwrap_or_else(|_| dirs::home_dir().unwrap_or_default().join(".local/share")),
        _ => dirs::data_local_dir().unwrap_or_else(std::env::temp_dir),
    };

    Ok(base.join(APP_DIR))
}
