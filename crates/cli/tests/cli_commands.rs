use std::fs;
use std::path::Path;

use corelens_core::db::ProjectLayout;
use predicates::prelude::*;
use serde_json::{json, Value};
use tempfile::tempdir;

fn corelens() -> assert_cmd::Command {
    assert_cmd::cargo::cargo_bin_cmd!("corelens")
}

fn init_project(root: &Path) {
    corelens()
        .arg("init-project")
        .arg("--root")
        .arg(root)
        .arg("--name")
        .arg("Demo")
        .assert()
        .success();
}

/// Java application `shop` plus three external objects.
fn write_shop_snapshot(root: &Path) -> std::path::PathBuf {
    let snapshot = json!({
        "application": "shop",
        "objects": [
            { "id": 1, "full_name": "com.acme.app.billing.Invoice", "level": "Java Class" },
            { "id": 2, "full_name": "com.acme.app.billing.Payment", "level": "Java Class" },
            { "id": 3, "full_name": "com.acme.app.crm.Contact", "level": "Java Class" },
            { "id": 4, "full_name": "com.acme.app.crm.Lead", "level": "Java Class" },
            { "id": 5, "full_name": "com.acme.app.Main", "level": "Java Class" },
            { "id": 10, "full_name": "com.acme.legacy.Gateway", "external": true },
            { "id": 11, "full_name": "com.acme", "external": true },
            { "id": 12, "full_name": "org.other.Thing", "external": true }
        ],
        "edges": [
            { "source": 1, "target": 3 },
            { "source": 1, "target": 2 },
            { "source": 3, "target": 5 }
        ]
    });
    let path = root.join("shop.json");
    let body = serde_json::to_string_pretty(&snapshot).expect("serialize");
    fs::write(&path, body).expect("write snapshot");
    path
}

fn import_shop(root: &Path) {
    let snapshot = write_shop_snapshot(root);
    corelens()
        .arg("import")
        .arg("--root")
        .arg(root)
        .arg("--file")
        .arg(&snapshot)
        .assert()
        .success()
        .stdout(predicate::str::contains("Objects: 8").and(predicate::str::contains("Edges: 3")));
}

fn stdout_json(output: &std::process::Output) -> Value {
    serde_json::from_slice(&output.stdout).expect("stdout is JSON")
}

#[test]
fn init_project_creates_config_db_and_reports() {
    let dir = tempdir().expect("tempdir");
    init_project(dir.path());

    let layout = ProjectLayout::new(dir.path());
    assert!(layout.project_config_path.exists());
    assert!(layout.db_path.exists());
    assert!(layout.reports_dir.is_dir());

    corelens()
        .arg("project-info")
        .arg("--root")
        .arg(dir.path())
        .assert()
        .success()
        .stdout(predicate::str::contains("Name: Demo").and(predicate::str::contains("(none)")));
}

#[test]
fn project_info_fails_without_project() {
    let dir = tempdir().expect("tempdir");
    corelens()
        .arg("project-info")
        .arg("--root")
        .arg(dir.path())
        .assert()
        .failure()
        .stderr(predicate::str::contains("Failed to read project config"));
}

#[test]
fn import_fails_for_missing_snapshot() {
    let dir = tempdir().expect("tempdir");
    init_project(dir.path());
    corelens()
        .arg("import")
        .arg("--root")
        .arg(dir.path())
        .arg("--file")
        .arg("nope.json")
        .assert()
        .failure()
        .stderr(predicate::str::contains("does not exist"));
}

#[test]
fn tree_prints_rendered_hierarchy() {
    let dir = tempdir().expect("tempdir");
    init_project(dir.path());
    import_shop(dir.path());

    corelens()
        .args(["tree", "--application", "shop", "--language", "java", "--root"])
        .arg(dir.path())
        .assert()
        .success()
        .stdout(
            predicate::str::contains("5 objects")
                .and(predicate::str::contains("|__ : com  ::  0 :: 5"))
                .and(predicate::str::contains("Invoice")),
        );

    corelens()
        .args(["tree", "--application", "shop", "--language", "JAVA", "--max-depth", "1", "--root"])
        .arg(dir.path())
        .assert()
        .success()
        .stdout(predicate::str::contains("acme").and(predicate::str::contains("Invoice").not()));
}

#[test]
fn tree_json_lists_internal_nodes() {
    let dir = tempdir().expect("tempdir");
    init_project(dir.path());
    import_shop(dir.path());

    let output = corelens()
        .args(["tree", "--application", "shop", "--language", "JAVA", "--json", "--root"])
        .arg(dir.path())
        .output()
        .expect("run tree");
    assert!(output.status.success());
    let value = stdout_json(&output);
    assert_eq!(value["objects"], 5);
    let nodes = value["nodes"].as_array().expect("nodes array");
    // root, com, acme, app, billing, crm
    assert_eq!(nodes.len(), 6);
    assert_eq!(nodes[0]["parent_id"], Value::Null);
}

#[test]
fn detect_core_flags_candidates_and_records_run() {
    let dir = tempdir().expect("tempdir");
    init_project(dir.path());
    import_shop(dir.path());

    let output = corelens()
        .args(["detect-core", "--application", "shop", "--language", "JAVA", "--json", "--root"])
        .arg(dir.path())
        .output()
        .expect("run detect-core");
    assert!(output.status.success(), "stderr: {}", String::from_utf8_lossy(&output.stderr));
    let report = stdout_json(&output);
    assert_eq!(report["core"]["full_name"], "com.acme");
    assert_eq!(report["core"]["display_name"], "API Acme");
    assert_eq!(report["core"]["taxonomy"], "Internal framework##acme##acme");
    assert_eq!(report["candidates"], json!([10]));
    assert_eq!(report["flagged"], 1);

    let layout = ProjectLayout::new(dir.path());
    let written: Value = serde_json::from_str(
        &fs::read_to_string(layout.report_path("shop", "core")).expect("core report written"),
    )
    .expect("report JSON");
    assert_eq!(written["core"]["full_name"], "com.acme");

    let runs = corelens()
        .args(["list-runs", "--json", "--root"])
        .arg(dir.path())
        .output()
        .expect("list-runs");
    let runs = stdout_json(&runs);
    assert_eq!(runs.as_array().map(Vec::len), Some(1));
    assert_eq!(runs[0]["status"], "succeeded");

    let flags = corelens()
        .args(["list-flags", "--application", "shop", "--json", "--root"])
        .arg(dir.path())
        .output()
        .expect("list-flags");
    let flags = stdout_json(&flags);
    assert_eq!(flags.as_array().map(Vec::len), Some(2));
    assert_eq!(flags[0]["kind"], "core");
    assert_eq!(flags[1]["category"], "missing_code");
}

#[test]
fn dry_run_leaves_flags_untouched() {
    let dir = tempdir().expect("tempdir");
    init_project(dir.path());
    import_shop(dir.path());

    corelens()
        .args(["detect-core", "--application", "shop", "--language", "JAVA", "--dry-run", "--root"])
        .arg(dir.path())
        .assert()
        .success()
        .stdout(
            predicate::str::contains("Core: com.acme (API Acme)")
                .and(predicate::str::contains("dry run")),
        );

    corelens()
        .args(["list-flags", "--root"])
        .arg(dir.path())
        .assert()
        .success()
        .stdout(predicate::str::contains("Flags (0):"));
    corelens()
        .args(["list-runs", "--root"])
        .arg(dir.path())
        .assert()
        .success()
        .stdout(predicate::str::contains("dry_run"));
}

#[test]
fn detect_core_honours_config_file() {
    let dir = tempdir().expect("tempdir");
    init_project(dir.path());
    import_shop(dir.path());
    let config = dir.path().join("detection.yaml");
    fs::write(
        &config,
        "variation_limit: 1.5\nminimum_core_name_length: 12\ndefault_taxonomy: Shared\n",
    )
    .expect("write config");

    let output = corelens()
        .args(["detect-core", "--application", "shop", "--language", "JAVA", "--dry-run", "--json"])
        .arg("--root")
        .arg(dir.path())
        .arg("--config")
        .arg(&config)
        .output()
        .expect("run detect-core");
    assert!(output.status.success());
    let report = stdout_json(&output);
    // "com.acme" and "com.acme.app" are too short; billing (variation 1.0) is
    // under the looser limit.
    assert_eq!(report["core"]["full_name"], "com.acme.app.billing");
    assert_eq!(report["core"]["taxonomy"], "Shared##billing##billing");
}

#[test]
fn unknown_language_is_rejected() {
    let dir = tempdir().expect("tempdir");
    init_project(dir.path());
    corelens()
        .args(["detect-core", "--application", "shop", "--language", "fortran", "--root"])
        .arg(dir.path())
        .assert()
        .failure()
        .stderr(predicate::str::contains("Unsupported language 'fortran'"));
}

#[test]
fn modules_links_slices_and_writes_report() {
    let dir = tempdir().expect("tempdir");
    init_project(dir.path());
    import_shop(dir.path());

    let output = corelens()
        .args(["modules", "--application", "shop", "--language", "JAVA", "--depth", "3", "--json"])
        .arg("--root")
        .arg(dir.path())
        .output()
        .expect("run modules");
    assert!(output.status.success());
    let report = stdout_json(&output);
    let modules = report["modules"].as_array().expect("modules");
    let ids: Vec<&str> = modules.iter().filter_map(|m| m["identifier"].as_str()).collect();
    assert_eq!(ids, vec!["com.acme.app.billing", "com.acme.app.crm", "com.acme.app.Main"]);
    assert_eq!(modules[0]["callees"], json!(["com.acme.app.crm"]));
    assert_eq!(modules[1]["callees"], json!(["com.acme.app.Main"]));
    assert_eq!(modules[2]["callers"], json!(["com.acme.app.crm"]));
    assert_eq!(report["policy"], "last_wins");

    let layout = ProjectLayout::new(dir.path());
    assert!(layout.report_path("shop", "modules").exists());

    corelens()
        .args(["modules", "--application", "shop", "--language", "JAVA", "--policy", "sometimes"])
        .arg("--root")
        .arg(dir.path())
        .assert()
        .failure()
        .stderr(predicate::str::contains("Invalid --policy"));
}
