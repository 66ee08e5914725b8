use std::fs;

use anyhow::{Context, Result};
use serde::Serialize;

use corelens_core::config::DetectionConfig;
use corelens_core::db::{
    ApplicationSummary, DetectionRunRecord, ProjectConfig, ProjectDb, ProjectLayout,
};

use crate::commands::{open_project, print_dir_status};
use crate::{canonicalize_or_current, infer_project_name};

#[derive(Serialize)]
pub struct ProjectInfoSnapshot {
    pub name: String,
    pub root: String,
    pub config_file: String,
    pub config_version: String,
    pub db_path: String,
    pub schema_version: i32,
    pub detection: DetectionConfig,
    pub reports_dir: String,
    pub applications: Vec<ApplicationSummary>,
    pub runs: Vec<DetectionRunRecord>,
}

/// Initialize a new project at `root`.
pub fn init_project_command(root: &str, name: Option<String>) -> Result<()> {
    let root_path = canonicalize_or_current(root)?;
    let layout = ProjectLayout::new(&root_path);

    let project_name = match name {
        Some(n) => n,
        None => infer_project_name(&root_path),
    };

    fs::create_dir_all(&layout.meta_dir)
        .with_context(|| format!("Failed to create meta dir: {}", layout.meta_dir.display()))?;
    fs::create_dir_all(&layout.reports_dir).with_context(|| {
        format!("Failed to create reports dir: {}", layout.reports_dir.display())
    })?;

    let config = ProjectConfig::new(&project_name, layout.db_path_relative_string());
    let json = serde_json::to_string_pretty(&config)?;
    fs::write(&layout.project_config_path, json).with_context(|| {
        format!("Failed to write project config: {}", layout.project_config_path.display())
    })?;

    // Follow-on commands expect the database to exist.
    ProjectDb::open(&layout.db_path).with_context(|| {
        format!("Failed to initialize project database at {}", layout.db_path.display())
    })?;

    println!("Initialized corelens project:");
    println!("  Name: {}", project_name);
    println!("  Root: {}", layout.root.display());
    println!("  Config: {}", layout.project_config_path.display());
    println!("  DB path (relative): {}", config.db.path);
    println!("  Reports dir: {}", layout.reports_dir.display());

    Ok(())
}

/// Show basic information about an existing project.
pub fn project_info_command(root: &str, json: bool) -> Result<()> {
    let ctx = open_project(root)?;
    let snapshot = ctx.snapshot().context("Failed to read project database")?;
    let schema_version = ctx.db.schema_version().context("Failed to read schema version")?;

    if json {
        let info = ProjectInfoSnapshot {
            name: snapshot.config.name.clone(),
            root: ctx.layout.root.display().to_string(),
            config_file: ctx.layout.project_config_path.display().to_string(),
            config_version: snapshot.config.config_version.clone(),
            db_path: snapshot.config.db.path.clone(),
            schema_version,
            detection: snapshot.config.detection.clone(),
            reports_dir: ctx.layout.reports_dir.display().to_string(),
            applications: snapshot.applications,
            runs: snapshot.runs,
        };
        println!("{}", serde_json::to_string_pretty(&info)?);
        return Ok(());
    }

    let detection = &snapshot.config.detection;
    println!("corelens Project Info");
    println!("=====================");
    println!("Name: {}", snapshot.config.name);
    println!("Root: {}", ctx.layout.root.display());
    println!("Config file: {}", ctx.layout.project_config_path.display());
    println!("Config version: {}", snapshot.config.config_version);
    println!("DB path (config): {}", snapshot.config.db.path);
    println!("Schema version: {}", schema_version);
    println!(
        "Detection: variation limit {}, minimum core name length {}, slice depth {}",
        detection.variation_limit, detection.minimum_core_name_length, detection.slice_depth
    );
    println!();

    println!("Directories:");
    print_dir_status("Meta dir (.corelens)", &ctx.layout.meta_dir);
    print_dir_status("Reports dir", &ctx.layout.reports_dir);
    println!();

    println!("Applications ({}):", snapshot.applications.len());
    if snapshot.applications.is_empty() {
        println!("  (none)");
    }
    for app in &snapshot.applications {
        println!(
            "  - {} objects={} external={} edges={}",
            app.name, app.objects, app.external, app.edges
        );
    }
    println!("Detection runs: {}", snapshot.runs.len());

    Ok(())
}
