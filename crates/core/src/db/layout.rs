use std::path::{Path, PathBuf};

/// Logical layout of a project on disk.
///
/// Derived from a chosen root path; no IO happens here. Frontends create
/// the directories and files.
#[derive(Debug, Clone)]
pub struct ProjectLayout {
    pub root: PathBuf,
    /// Internal metadata directory (`.corelens`).
    pub meta_dir: PathBuf,
    /// Project config file (JSON).
    pub project_config_path: PathBuf,
    pub db_path: PathBuf,
    /// Detection and module reports written by the CLI.
    pub reports_dir: PathBuf,
}

impl ProjectLayout {
    pub fn new(root: impl AsRef<Path>) -> Self {
        let root = root.as_ref().to_path_buf();
        let meta_dir = root.join(".corelens");
        let project_config_path = meta_dir.join("project.json");
        let db_path = meta_dir.join("project.db");
        let reports_dir = root.join("reports");

        Self { root, meta_dir, project_config_path, db_path, reports_dir }
    }

    /// Database path as stored in `ProjectConfig`, relative to `root` when possible.
    pub fn db_path_relative_string(&self) -> String {
        match self.db_path.strip_prefix(&self.root) {
            Ok(rel) => rel.to_string_lossy().to_string(),
            Err(_) => self.db_path.to_string_lossy().to_string(),
        }
    }

    /// Report file for one application, e.g. `reports/billing.core.json`.
    pub fn report_path(&self, application: &str, kind: &str) -> PathBuf {
        let safe: String = application
            .chars()
            .map(|c| if c.is_alphanumeric() || c == '-' || c == '_' || c == '.' { c } else { '_' })
            .collect();
        self.reports_dir.join(format!("{safe}.{kind}.json"))
    }
}
