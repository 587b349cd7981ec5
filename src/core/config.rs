use crate::core::dirs::get_config_directory;
use crate::core::error::{ChangeViewError, Result};
use crate::core::hierarchy::{HierarchyMode, SortDirection};
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use std::time::Duration;

/// User settings for the change view, stored as JSON.
///
/// Every field has a default, so a partial file only overrides what it names.
#[derive(Serialize, Deserialize, Debug, Clone, PartialEq, Eq)]
#[serde(default)]
pub struct ViewConfig {
    pub cache_ttl_ms: u64,
    pub debounce_ms: u64,
    pub history_timeout_ms: u64,
    pub sort_direction: SortDirection,
    pub extension_filter: Vec<String>,
    pub hierarchy_mode: HierarchyMode,
    pub store_path: Option<PathBuf>,
}

impl Default for ViewConfig {
    fn default() -> Self {
        Self {
            cache_ttl_ms: 100,
            debounce_ms: 300,
            history_timeout_ms: 200,
            sort_direction: SortDirection::default(),
            extension_filter: Vec::new(),
            hierarchy_mode: HierarchyMode::default(),
            store_path: None,
        }
    }
}

impl ViewConfig {
    pub fn config_file() -> Result<PathBuf> {
        Ok(get_config_directory()?.join("config.json"))
    }

    /// Load the user's config file, or defaults when there is none
    pub fn load_or_default() -> Result<Self> {
        let config_file = Self::config_file()?;
        if config_file.exists() {
            Self::load_from(&config_file)
        } else {
            log::debug!("No config at {}, using defaults", config_file.display());
            Ok(Self::default())
        }
    }

    pub fn load_from(path: &Path) -> Result<Self> {
        let content = std::fs::read_to_string(path)?;
        serde_json::from_str(&content).map_err(|e| ChangeViewError::config_parse_failed(path, e))
    }

    pub fn save_to(&self, path: &Path) -> Result<()> {
        if let Some(parent) = path.parent() {
            std::fs::create_dir_all(parent)?;
        }
        let content = serde_json::to_string_pretty(self)?;
        std::fs::write(path, content)?;
        Ok(())
    }

    pub fn cache_ttl(&self) -> Duration {
        Duration::from_millis(self.cache_ttl_ms)
    }

    pub fn debounce(&self) -> Duration {
        Duration::from_millis(self.debounce_ms)
    }

    pub fn history_timeout(&self) -> Duration {
        Duration::from_millis(self.history_timeout_ms)
    }
}
