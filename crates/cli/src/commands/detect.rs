use anyhow::{Context, Result};

use corelens_core::config::load_detection_config;
use corelens_core::services::DetectionRunner;

use crate::canonicalize_or_current;
use crate::commands::{open_project, parse_language, write_report};

/// Detect the core of one application, flag its external extensions, and
/// write `reports/<application>.core.json`.
///
/// `config` points at a JSON/YAML detection config that replaces the one
/// stored in the project.
pub fn detect_core_command(
    root: &str,
    application: &str,
    language: &str,
    config: Option<String>,
    dry_run: bool,
    json: bool,
) -> Result<()> {
    let language = parse_language(language)?;
    let ctx = open_project(root)?;
    let detection = match config {
        Some(path) => {
            let path = canonicalize_or_current(&path)?;
            load_detection_config(&path)
                .with_context(|| format!("Failed to load detection config {}", path.display()))?
        }
        None => ctx.config.detection.clone(),
    };

    let runner = DetectionRunner { ctx: &ctx, config: &detection };
    let report = runner
        .run(application, language, dry_run)
        .with_context(|| format!("Core detection failed for '{application}'"))?;
    let report_path = write_report(&ctx.layout, application, "core", &report)?;

    if json {
        println!("{}", serde_json::to_string_pretty(&report)?);
        return Ok(());
    }

    println!("Core detection for {} ({}):", application, language);
    println!(
        "  Objects: {} inserted, {} skipped, {} failed",
        report.insert.inserted, report.insert.skipped, report.insert.failed
    );
    match &report.core {
        Some(core) => {
            println!("  Core: {} ({})", core.full_name, core.display_name);
            println!(
                "  Depth: {}  Count: {}  Variation: {:.3}",
                core.depth, core.count, core.variation
            );
            println!("  Taxonomy: {}", core.taxonomy);
            println!("  Path: {}", report.trail.join(" -> "));
            if report.dry_run {
                println!("  Candidates: {} (dry run, nothing flagged)", report.candidates.len());
            } else {
                println!(
                    "  Candidates: {} flagged: {} sink failures: {}",
                    report.candidates.len(),
                    report.flagged,
                    report.sink_failures
                );
            }
        }
        None => println!("  Core: (not found)"),
    }
    println!("  Report: {}", report_path.display());

    Ok(())
}
