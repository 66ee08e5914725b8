use std::path::{Path, PathBuf};

use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};

use crate::config::DetectionConfig;
use crate::db::ProjectLayout;

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DbConfig {
    /// Path to the project database file (typically relative to project root).
    pub path: String,
}

impl DbConfig {
    pub fn new(path: impl Into<String>) -> Self {
        Self { path: path.into() }
    }

    /// Absolute database location; relative paths hang off the project root.
    pub fn resolve(&self, root: &Path) -> PathBuf {
        let path = Path::new(&self.path);
        if path.is_absolute() {
            path.to_path_buf()
        } else {
            root.join(path)
        }
    }
}

/// Serializable configuration of a corelens project, stored at
/// `.corelens/project.json`.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ProjectConfig {
    pub name: String,
    pub description: Option<String>,
    /// Version of this config format.
    pub config_version: String,
    pub db: DbConfig,
    /// Detection parameters; missing fields take their defaults.
    #[serde(default)]
    pub detection: DetectionConfig,
}

impl ProjectConfig {
    pub fn new(name: impl Into<String>, db_path: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            description: None,
            config_version: "0.1.0".to_string(),
            db: DbConfig::new(db_path),
            detection: DetectionConfig::default(),
        }
    }

    /// Read `.corelens/project.json` and check its detection settings.
    pub fn load(layout: &ProjectLayout) -> Result<Self> {
        let path = &layout.project_config_path;
        let raw = std::fs::read_to_string(path)
            .with_context(|| format!("Failed to read project config at {}", path.display()))?;
        let config: ProjectConfig = serde_json::from_str(&raw)
            .with_context(|| format!("Failed to parse project config {}", path.display()))?;
        config.detection.validate().context("Invalid detection settings in project config")?;
        Ok(config)
    }
}
