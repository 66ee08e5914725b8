use std::path::{Path, PathBuf};

use anyhow::{Context, Result};

use crate::db::{ProjectConfig, ProjectDb, ProjectLayout, ProjectSnapshot};

/// Layout, config, db path, and an open ProjectDb for one project root.
#[derive(Debug)]
pub struct ProjectContext {
    pub layout: ProjectLayout,
    pub config: ProjectConfig,
    pub db_path: PathBuf,
    pub db: ProjectDb,
}

impl ProjectContext {
    /// Load project config and open the database for a given root.
    pub fn from_root(root: impl AsRef<Path>) -> Result<Self> {
        let layout = ProjectLayout::new(root);
        let config = ProjectConfig::load(&layout)?;
        let db_path = config.db.resolve(&layout.root);
        let db = ProjectDb::open(&db_path)
            .with_context(|| format!("Failed to open project database at {}", db_path.display()))?;
        Ok(Self { layout, config, db_path, db })
    }

    /// Config plus per-application totals and the run history.
    pub fn snapshot(&self) -> Result<ProjectSnapshot> {
        Ok(ProjectSnapshot {
            config: self.config.clone(),
            applications: self.db.list_applications()?,
            runs: self.db.list_detection_runs(None)?,
        })
    }
}
