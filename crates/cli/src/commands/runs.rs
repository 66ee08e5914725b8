use anyhow::{Context, Result};

use crate::commands::open_project;

/// List recorded detection runs, newest last.
pub fn list_runs_command(root: &str, application: Option<String>, json: bool) -> Result<()> {
    let ctx = open_project(root)?;
    let runs = ctx
        .db
        .list_detection_runs(application.as_deref())
        .context("Failed to list detection runs")?;

    if json {
        println!("{}", serde_json::to_string_pretty(&runs)?);
        return Ok(());
    }

    println!("Detection runs ({}):", runs.len());
    if runs.is_empty() {
        println!("  (none)");
        return Ok(());
    }
    for run in runs {
        let core = run.core_full_name.as_deref().unwrap_or("-");
        println!(
            "  - {} [{}] {} core={} flagged={} finished={}",
            run.application,
            run.language,
            run.status.as_str(),
            core,
            run.flagged,
            run.finished_at
        );
    }

    Ok(())
}

/// List flags written by detection runs.
pub fn list_flags_command(root: &str, application: Option<String>, json: bool) -> Result<()> {
    let ctx = open_project(root)?;
    let flags = ctx.db.list_flags(application.as_deref()).context("Failed to list flags")?;

    if json {
        println!("{}", serde_json::to_string_pretty(&flags)?);
        return Ok(());
    }

    println!("Flags ({}):", flags.len());
    if flags.is_empty() {
        println!("  (none)");
        return Ok(());
    }
    for stored in flags {
        let flag = &stored.flag;
        let detail = match (&flag.taxonomy, &flag.category) {
            (Some(taxonomy), _) => taxonomy.clone(),
            (None, Some(category)) => category.to_string(),
            (None, None) => "-".to_string(),
        };
        println!("  - object {} {} {}", flag.object_id, flag.kind.as_str(), detail);
    }

    Ok(())
}
