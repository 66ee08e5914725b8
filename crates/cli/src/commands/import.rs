use std::path::Path;

use anyhow::{anyhow, Context, Result};

use corelens_core::graph::GraphSnapshot;

use crate::commands::open_project;
use crate::sha256_file;

/// Import a JSON/YAML graph snapshot into the project database.
///
/// `application` overrides the application named inside the snapshot.
pub fn import_command(root: &str, file: &str, application: Option<String>) -> Result<()> {
    let ctx = open_project(root)?;

    let input = Path::new(file);
    let path = if input.is_absolute() { input.to_path_buf() } else { ctx.layout.root.join(input) };
    if !path.exists() {
        return Err(anyhow!("Snapshot file does not exist: {}", path.display()));
    }

    let mut snapshot = GraphSnapshot::load(&path)
        .with_context(|| format!("Failed to load graph snapshot {}", path.display()))?;
    if let Some(app) = application {
        snapshot.application = app;
    }
    if snapshot.application.trim().is_empty() {
        return Err(anyhow!("Snapshot does not name an application; pass --application"));
    }

    let hash = sha256_file(&path)?;
    let summary = ctx.db.import_snapshot(&snapshot).context("Failed to import snapshot")?;
    tracing::info!(
        "Imported {} objects and {} edges into '{}'",
        summary.objects,
        summary.edges,
        snapshot.application
    );

    println!("Imported snapshot:");
    println!("  Application: {}", snapshot.application);
    println!("  Objects: {}", summary.objects);
    println!("  Edges: {}", summary.edges);
    println!("  SHA-256: {}", hash);
    println!("  DB: {}", ctx.db_path.display());

    Ok(())
}
