use anyhow::{Context, Result};
use serde::Serialize;

use corelens_core::config::DuplicatePolicy;
use corelens_core::model::Language;
use corelens_core::services::{LinkReport, Module, ModuleMap};

use crate::commands::{load_tree, open_project, parse_language, write_report};

#[derive(Serialize)]
pub struct ModulesReport {
    pub application: String,
    pub language: Language,
    pub depth: usize,
    pub policy: DuplicatePolicy,
    pub modules: Vec<Module>,
    pub links: LinkReport,
}

/// Slice an application's tree into modules, link them through the call
/// graph, and write `reports/<application>.modules.json`.
pub fn modules_command(
    root: &str,
    application: &str,
    language: &str,
    depth: Option<usize>,
    policy: Option<String>,
    json: bool,
) -> Result<()> {
    let language = parse_language(language)?;
    let ctx = open_project(root)?;
    let detection = &ctx.config.detection;
    let depth = depth.unwrap_or(detection.slice_depth);
    let policy = match policy {
        Some(p) => p.parse::<DuplicatePolicy>().context("Invalid --policy")?,
        None => detection.duplicate_policy,
    };

    let (tree, _insert) = load_tree(&ctx, application, language, detection)?;
    let mut map = ModuleMap::initialize(&tree, depth).with_policy(policy);
    let links = map.compute_links(&ctx.db);
    for failure in &links.failures {
        tracing::warn!(
            "{:?} links of module '{}' unavailable: {}",
            failure.direction, failure.module, failure.error
        );
    }

    let report = ModulesReport {
        application: application.to_string(),
        language,
        depth,
        policy,
        modules: map.modules().to_vec(),
        links,
    };
    let report_path = write_report(&ctx.layout, application, "modules", &report)?;

    if json {
        println!("{}", serde_json::to_string_pretty(&report)?);
        return Ok(());
    }

    println!("Modules of {} at depth {} ({}):", application, depth, report.modules.len());
    if report.modules.is_empty() {
        println!("  (none)");
    }
    for module in &report.modules {
        println!("  - {} members={}", module.identifier, module.member_ids.len());
        for callee in &module.callees {
            println!("      -> {}", callee);
        }
    }
    println!(
        "Unresolved targets: {}  Duplicate members: {}  Failed queries: {}",
        report.links.unresolved,
        report.links.duplicate_members,
        report.links.failures.len()
    );
    println!("Report: {}", report_path.display());

    Ok(())
}
