use corelens_core::config::DetectionConfig;
use corelens_core::graph::{FlagKind, FlagRecord, FlaggingSink, GraphError, MemoryGraph};
use corelens_core::model::{DetectionCategory, Language, ObjectId, ObjectRecord};
use corelens_core::services::{inventory_hash, AnalysisError, CoreAnalyzer};

const JAVA_CLASS: &str = "Java Class";

fn java_graph() -> MemoryGraph {
    let mut graph = MemoryGraph::new("shop");
    for (id, name) in [
        (1, "com.acme.app.billing.Invoice"),
        (2, "com.acme.app.billing.Payment"),
        (3, "com.acme.app.crm.Contact"),
        (4, "com.acme.app.crm.Lead"),
        (5, "com.acme.app.Main"),
    ] {
        graph.add_object(ObjectRecord::new(id, name).with_level(JAVA_CLASS));
    }
    graph
        .add_object(ObjectRecord::new(6, "com.acme.api.Listener").with_level("Java Interface"))
        .add_object(ObjectRecord {
            full_name: None,
            ..ObjectRecord::new(7, "").with_level(JAVA_CLASS)
        })
        .add_object(ObjectRecord::new(10, "com.acme.legacy.Gateway").external())
        .add_object(ObjectRecord::new(11, "com.acme").external())
        .add_object(ObjectRecord::new(12, "org.other.Thing").external());
    graph
}

#[test]
fn java_application_core_is_detected_and_flagged() {
    let graph = java_graph();
    let config = DetectionConfig::default();
    let analyzer = CoreAnalyzer { source: &graph, sink: &graph, config: &config };

    let report = analyzer.analyze("shop", Language::Java, false).expect("analysis succeeds");

    let core = report.core.as_ref().expect("core detected");
    assert_eq!(core.full_name, "com.acme");
    assert_eq!(core.name, "acme");
    assert_eq!(core.display_name, "API Acme");
    assert_eq!(core.depth, 1);
    assert_eq!(core.count, 5);
    assert_eq!(core.variation, 0.0);
    assert_eq!(core.taxonomy, "Internal framework##acme##acme");
    assert_eq!(report.trail, vec!["com", "com.acme"]);

    // The interface is filtered by level; the nameless class is skipped.
    assert_eq!(report.insert.inserted, 5);
    assert_eq!(report.insert.skipped, 1);
    assert_eq!(report.insert.failed, 0);

    assert_eq!(report.candidates, vec![ObjectId(10)]);
    assert_eq!(report.flagged, 1);
    assert_eq!(report.sink_failures, 0);
    assert!(!report.dry_run);
    assert_eq!(
        graph.flags(),
        vec![
            FlagRecord::core(ObjectId(10), "Internal framework##acme##acme", "acme"),
            FlagRecord::external(ObjectId(10), DetectionCategory::MissingCode),
        ]
    );
}

#[test]
fn dry_run_lists_candidates_without_flagging() {
    let graph = java_graph();
    let config = DetectionConfig::default();
    let analyzer = CoreAnalyzer { source: &graph, sink: &graph, config: &config };

    let report = analyzer.analyze("shop", Language::Java, true).expect("analysis succeeds");
    assert!(report.dry_run);
    assert_eq!(report.candidates, vec![ObjectId(10)]);
    assert_eq!(report.flagged, 0);
    assert!(graph.flags().is_empty());
}

#[test]
fn cobol_application_uses_program_names() {
    let mut graph = MemoryGraph::new("ledger");
    let names = ["ACCTAA", "ACCTAB", "ACCTAC", "ACCTAD", "ACCTAE", "ACCTBZ"];
    for (i, name) in names.iter().enumerate() {
        let id = i as u64 + 1;
        graph.add_object(ObjectRecord::new(id, format!("src/{name}.cbl")).with_name(*name));
    }
    graph
        .add_object(ObjectRecord::new(20, "copy/ACCTX99").with_name("ACCTX99").external())
        .add_object(ObjectRecord::new(21, "copy/ACCT").with_name("ACCT").external())
        .add_object(ObjectRecord::new(22, "copy/acctz").with_name("acctz").external());

    let config = DetectionConfig::default();
    let analyzer = CoreAnalyzer { source: &graph, sink: &graph, config: &config };
    let report = analyzer.analyze("ledger", Language::Cobol, false).expect("analysis succeeds");

    let core = report.core.as_ref().expect("core detected");
    assert_eq!(core.full_name, "ACCT");
    assert_eq!(core.display_name, "ACCT");
    assert_eq!(core.depth, 0);
    assert_eq!(core.count, 6);
    assert_eq!(core.taxonomy, "Internal framework##ACCT##ACCT");

    assert_eq!(report.candidates, vec![ObjectId(20)]);
    let flags = graph.flags();
    assert_eq!(flags.len(), 2);
    assert_eq!(flags[0].kind, FlagKind::Core);
    assert_eq!(flags[0].core_name.as_deref(), Some("ACCT"));
    assert_eq!(flags[1].category, Some(DetectionCategory::MissingCode));
}

struct RejectingSink;

impl FlaggingSink for RejectingSink {
    fn flag_as_core(
        &self,
        _id: ObjectId,
        _taxonomy: &str,
        _core_name: &str,
    ) -> Result<(), GraphError> {
        Err(GraphError::Backend("read-only graph".into()))
    }

    fn flag_external(&self, _id: ObjectId, _category: DetectionCategory) -> Result<(), GraphError> {
        Err(GraphError::Backend("read-only graph".into()))
    }
}

#[test]
fn sink_failures_are_counted_not_propagated() {
    let graph = java_graph();
    let config = DetectionConfig::default();
    let analyzer = CoreAnalyzer { source: &graph, sink: &RejectingSink, config: &config };

    let report = analyzer.analyze("shop", Language::Java, false).expect("analysis still succeeds");
    assert!(report.core.is_some());
    assert_eq!(report.candidates.len(), 1);
    assert_eq!(report.flagged, 0);
    assert_eq!(report.sink_failures, 2);
}

#[test]
fn unknown_application_has_no_core() {
    let graph = java_graph();
    let config = DetectionConfig::default();
    let analyzer = CoreAnalyzer { source: &graph, sink: &graph, config: &config };

    let report = analyzer.analyze("elsewhere", Language::Java, false).expect("analysis succeeds");
    assert!(report.core.is_none());
    assert!(report.trail.is_empty());
    assert!(report.candidates.is_empty());
    assert_eq!(report.insert.inserted, 0);
    assert!(graph.flags().is_empty());
}

#[test]
fn invalid_config_is_rejected_before_reading() {
    let graph = java_graph();
    let config = DetectionConfig { variation_limit: f64::NAN, ..DetectionConfig::default() };
    let analyzer = CoreAnalyzer { source: &graph, sink: &graph, config: &config };

    let err = analyzer.analyze("shop", Language::Java, false).expect_err("config rejected");
    assert!(matches!(err, AnalysisError::Config(_)), "unexpected error: {err}");
}

#[test]
fn inventory_hash_ignores_order() {
    let a = inventory_hash(["b.Two", "a.One"]);
    let b = inventory_hash(["a.One", "b.Two"]);
    assert_eq!(a, b);
    assert_eq!(a.len(), 64);
    assert_ne!(a, inventory_hash(["a.One"]));
}
