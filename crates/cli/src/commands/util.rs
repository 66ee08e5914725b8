use std::fs;
use std::path::{Path, PathBuf};

use anyhow::{Context, Result};
use serde::Serialize;

use corelens_core::config::DetectionConfig;
use corelens_core::db::{ProjectContext, ProjectLayout};
use corelens_core::graph::{ObjectFilter, ObjectSource};
use corelens_core::model::Language;
use corelens_core::tree::{InsertReport, Tree, TreeBuilder};

use crate::canonicalize_or_current;

/// Resolve `root` and open its project (config + database).
pub fn open_project(root: &str) -> Result<ProjectContext> {
    let root_path = canonicalize_or_current(root)?;
    ProjectContext::from_root(&root_path)
}

/// Helper to print whether a directory exists.
pub fn print_dir_status(label: &str, path: &Path) {
    let exists = path.is_dir();
    println!("- {label}: {} ({})", if exists { "OK" } else { "MISSING" }, path.display());
}

pub fn parse_language(language: &str) -> Result<Language> {
    language.parse::<Language>().with_context(|| format!("Unsupported language '{language}'"))
}

/// Build the naming tree of one application from the project database.
pub fn load_tree(
    ctx: &ProjectContext,
    application: &str,
    language: Language,
    config: &DetectionConfig,
) -> Result<(Tree, InsertReport)> {
    let builder = TreeBuilder::from_config(language, config);
    let filter = ObjectFilter::from_profile(builder.profile());
    let objects = ctx
        .db
        .list_eligible_objects(application, &filter)
        .with_context(|| format!("Failed to list objects of application '{application}'"))?;
    Ok(builder.build(&objects))
}

/// Write a pretty JSON report under `reports/` and return its path.
pub fn write_report<T: Serialize>(
    layout: &ProjectLayout,
    application: &str,
    kind: &str,
    report: &T,
) -> Result<PathBuf> {
    fs::create_dir_all(&layout.reports_dir).with_context(|| {
        format!("Failed to create reports dir: {}", layout.reports_dir.display())
    })?;
    let path = layout.report_path(application, kind);
    let json = serde_json::to_string_pretty(report).context("Failed to serialize report")?;
    fs::write(&path, json).with_context(|| format!("Failed to write report {}", path.display()))?;
    Ok(path)
}
