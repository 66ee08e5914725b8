use anyhow::Result;
use serde::Serialize;

use corelens_core::model::Language;
use corelens_core::tree::{FlatLeaf, InsertReport};

use crate::commands::{load_tree, open_project, parse_language};

#[derive(Serialize)]
pub struct TreeSnapshot {
    pub application: String,
    pub language: Language,
    pub objects: u64,
    pub insert: InsertReport,
    pub nodes: Vec<FlatLeaf>,
}

/// Print the naming tree of one application.
pub fn tree_command(
    root: &str,
    application: &str,
    language: &str,
    max_depth: Option<usize>,
    json: bool,
) -> Result<()> {
    let language = parse_language(language)?;
    let ctx = open_project(root)?;
    let (tree, insert) = load_tree(&ctx, application, language, &ctx.config.detection)?;

    if json {
        let snapshot = TreeSnapshot {
            application: application.to_string(),
            language,
            objects: tree.object_count(),
            insert,
            nodes: tree.flatten(),
        };
        println!("{}", serde_json::to_string_pretty(&snapshot)?);
        return Ok(());
    }

    println!(
        "Tree for {} ({}): {} objects, {} skipped, {} failed",
        application,
        language,
        tree.object_count(),
        insert.skipped,
        insert.failed
    );
    if tree.is_empty() {
        println!("(empty)");
        return Ok(());
    }
    let rendered = match max_depth {
        Some(depth) => tree.render_to_depth(depth),
        None => tree.render(),
    };
    print!("{rendered}");

    Ok(())
}
