use std::fs;

use corelens::commands::{
    detect_core_command, import_command, init_project_command, list_flags_command,
    list_runs_command, load_tree, modules_command, open_project, parse_language,
    project_info_command, tree_command, write_report,
};
use corelens_core::db::DetectionRunStatus;
use corelens_core::model::Language;
use serde_json::json;
use tempfile::tempdir;

fn cobol_project() -> tempfile::TempDir {
    let dir = tempdir().expect("tempdir");
    let root = dir.path().to_str().expect("utf8 root").to_string();
    init_project_command(&root, Some("Ledger".into())).expect("init project");

    let snapshot = json!({
        "application": "ledger",
        "objects": [
            { "id": 1, "name": "ACCTAA" },
            { "id": 2, "name": "ACCTAB" },
            { "id": 3, "name": "ACCTAC" },
            { "id": 4, "name": "ACCTAD" },
            { "id": 5, "name": "ACCTAE" },
            { "id": 6, "name": "ACCTBZ" },
            { "id": 20, "name": "ACCTX99", "external": true },
            { "id": 21, "name": "PAYX01", "external": true }
        ],
        "edges": [ { "source": 1, "target": 6 }, { "source": 6, "target": 20 } ]
    });
    // JSON is valid YAML; this exercises the YAML loader.
    let yaml_path = dir.path().join("ledger.yaml");
    let body = serde_json::to_string_pretty(&snapshot).expect("serialize");
    fs::write(&yaml_path, body).expect("write snapshot");
    import_command(&root, "ledger.yaml", None).expect("import");
    dir
}

#[test]
fn parse_language_reports_unknown_names() {
    assert_eq!(parse_language("cobol").expect("cobol"), Language::Cobol);
    let err = parse_language("rpg").expect_err("unknown");
    assert!(err.to_string().contains("Unsupported language 'rpg'"));
}

#[test]
fn cobol_project_tree_and_detection() {
    let dir = cobol_project();
    let root = dir.path().to_str().expect("utf8 root");

    let ctx = open_project(root).expect("open project");
    assert_eq!(ctx.config.name, "Ledger");
    let (tree, insert) =
        load_tree(&ctx, "ledger", Language::Cobol, &ctx.config.detection).expect("tree");
    assert_eq!(insert.inserted, 6);
    assert_eq!(tree.root().children().len(), 1);
    assert_eq!(tree.root().children()[0].full_name(), "ACCT");
    drop(ctx);

    tree_command(root, "ledger", "COBOL", Some(0), false).expect("tree command");
    detect_core_command(root, "ledger", "COBOL", None, false, false).expect("detect");

    let ctx = open_project(root).expect("reopen project");
    let runs = ctx.db.list_detection_runs(Some("ledger")).expect("runs");
    assert_eq!(runs.len(), 1);
    assert_eq!(runs[0].status, DetectionRunStatus::Succeeded);
    assert_eq!(runs[0].core_full_name.as_deref(), Some("ACCT"));

    let flags = ctx.db.list_flags(Some("ledger")).expect("flags");
    assert_eq!(flags.len(), 2);
    assert!(flags.iter().all(|f| f.flag.object_id.0 == 20));
    assert!(ctx.layout.report_path("ledger", "core").exists());

    list_runs_command(root, None, false).expect("list runs");
    list_flags_command(root, Some("ledger".into()), true).expect("list flags");
    project_info_command(root, true).expect("project info");
}

#[test]
fn modules_command_writes_report() {
    let dir = cobol_project();
    let root = dir.path().to_str().expect("utf8 root");

    modules_command(root, "ledger", "COBOL", Some(1), Some("first_wins".into()), false)
        .expect("modules");
    let ctx = open_project(root).expect("open project");
    let body =
        fs::read_to_string(ctx.layout.report_path("ledger", "modules")).expect("modules report");
    let report: serde_json::Value = serde_json::from_str(&body).expect("report json");
    assert_eq!(report["policy"], "first_wins");
    let ids: Vec<&str> = report["modules"]
        .as_array()
        .expect("modules")
        .iter()
        .filter_map(|m| m["identifier"].as_str())
        .collect();
    assert_eq!(ids, vec!["ACCTA", "ACCTBZ"]);
    assert_eq!(report["modules"][0]["callees"], json!(["ACCTBZ"]));
    assert_eq!(report["links"]["unresolved"], 1);
}

#[test]
fn write_report_creates_reports_dir() {
    let dir = tempdir().expect("tempdir");
    let layout = corelens_core::db::ProjectLayout::new(dir.path());
    let path =
        write_report(&layout, "odd name", "core", &json!({ "ok": true })).expect("write report");
    assert!(path.ends_with("odd_name.core.json"));
    assert_eq!(fs::read_to_string(path).expect("read"), "{\n  \"ok\": true\n}");
}
