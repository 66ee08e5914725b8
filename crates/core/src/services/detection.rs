use chrono::Utc;
use serde::{Deserialize, Serialize};
use sha2::{Digest, Sha256};
use tracing::{debug, info, warn};

use crate::analysis::{heaviest, variation};
use crate::config::{DetectionConfig, DEFAULT_MINIMUM_CORE_NAME_LENGTH, DEFAULT_VARIATION_LIMIT};
use crate::db::{DetectionRunRecord, ProjectContext};
use crate::graph::{FlaggingSink, ObjectFilter, ObjectSource};
use crate::model::{DetectionCategory, Language, ObjectId};
use crate::naming::leaf_display_name;
use crate::services::AnalysisError;
use crate::tree::{InsertReport, Leaf, Tree, TreeBuilder};

/// Walks a tree down its heaviest branch and stops at the first leaf whose
/// variation falls below the limit and whose full name is long enough.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct CoreDetector {
    variation_limit: f64,
    minimum_core_name_length: usize,
}

impl Default for CoreDetector {
    fn default() -> Self {
        Self::new(DEFAULT_VARIATION_LIMIT, DEFAULT_MINIMUM_CORE_NAME_LENGTH)
    }
}

/// Terminal state of a detection walk.
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum CoreOutcome<'t> {
    Found(&'t Leaf),
    NotFound,
}

/// Result of [`CoreDetector::detect`], borrowing from the tree.
#[derive(Debug, Clone, PartialEq)]
pub struct CoreResult<'t> {
    pub outcome: CoreOutcome<'t>,
    /// Depth of the leaf the walk stopped on.
    pub depth_reached: Option<usize>,
    /// Variation of that leaf.
    pub variation: Option<f64>,
    /// Full names visited, in order.
    pub trail: Vec<String>,
}

impl<'t> CoreResult<'t> {
    fn not_found() -> Self {
        Self {
            outcome: CoreOutcome::NotFound,
            depth_reached: None,
            variation: None,
            trail: Vec::new(),
        }
    }

    pub fn leaf(&self) -> Option<&'t Leaf> {
        match self.outcome {
            CoreOutcome::Found(leaf) => Some(leaf),
            CoreOutcome::NotFound => None,
        }
    }

    pub fn is_found(&self) -> bool {
        matches!(self.outcome, CoreOutcome::Found(_))
    }
}

impl CoreDetector {
    pub fn new(variation_limit: f64, minimum_core_name_length: usize) -> Self {
        Self { variation_limit, minimum_core_name_length }
    }

    pub fn from_config(config: &DetectionConfig) -> Self {
        Self::new(config.variation_limit, config.minimum_core_name_length)
    }

    pub fn variation_limit(&self) -> f64 {
        self.variation_limit
    }

    pub fn minimum_core_name_length(&self) -> usize {
        self.minimum_core_name_length
    }

    pub fn detect<'t>(&self, tree: &'t Tree) -> CoreResult<'t> {
        let Some(mut cursor) = heaviest(tree.root().children()) else {
            debug!("Empty tree, no core to detect");
            return CoreResult::not_found();
        };

        let mut trail = Vec::new();
        loop {
            let v = variation(cursor);
            trail.push(cursor.full_name().to_string());
            debug!(
                "Core cursor at '{}' (depth {}, count {}, variation {:.3})",
                cursor.full_name(),
                cursor.depth(),
                cursor.count(),
                v
            );

            let stable = v < self.variation_limit
                && cursor.full_name().chars().count() > self.minimum_core_name_length;
            let next = if stable { None } else { heaviest(cursor.children()) };
            match next {
                Some(child) => cursor = child,
                None => {
                    return CoreResult {
                        outcome: CoreOutcome::Found(cursor),
                        depth_reached: Some(cursor.depth()),
                        variation: Some(v),
                        trail,
                    };
                }
            }
        }
    }
}

/// Owned description of a detected core.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DetectedCore {
    pub full_name: String,
    pub name: String,
    pub display_name: String,
    pub count: u64,
    pub depth: usize,
    pub variation: f64,
    pub taxonomy: String,
}

/// Outcome of a full detection run against an object source.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CoreReport {
    pub application: String,
    pub language: Language,
    pub core: Option<DetectedCore>,
    pub trail: Vec<String>,
    /// External objects extending the core's name.
    pub candidates: Vec<ObjectId>,
    /// Candidates flagged without any sink failure.
    pub flagged: usize,
    pub sink_failures: usize,
    pub insert: InsertReport,
    /// SHA-256 over the sorted eligible names.
    pub inventory_hash: String,
    pub dry_run: bool,
}

/// Fingerprint of an object inventory, independent of listing order.
pub fn inventory_hash<'a>(names: impl IntoIterator<Item = &'a str>) -> String {
    let mut names: Vec<&str> = names.into_iter().collect();
    names.sort_unstable();
    let mut hasher = Sha256::new();
    for name in names {
        hasher.update(name.as_bytes());
        hasher.update(b"\n");
    }
    format!("{:x}", hasher.finalize())
}

/// Builds the tree for one application, detects its core, and flags the
/// external objects that extend the core's name.
pub struct CoreAnalyzer<'a> {
    pub source: &'a dyn ObjectSource,
    pub sink: &'a dyn FlaggingSink,
    pub config: &'a DetectionConfig,
}

impl<'a> CoreAnalyzer<'a> {
    pub fn analyze(
        &self,
        application: &str,
        language: Language,
        dry_run: bool,
    ) -> Result<CoreReport, AnalysisError> {
        self.config.validate()?;
        let builder = TreeBuilder::from_config(language, self.config);
        let filter = ObjectFilter::from_profile(builder.profile());
        let objects = self.source.list_eligible_objects(application, &filter)?;
        info!("Detecting core of {} ({}) over {} objects", application, language, objects.len());

        let (tree, insert) = builder.build(&objects);
        let mut report = CoreReport {
            application: application.to_string(),
            language,
            core: None,
            trail: Vec::new(),
            candidates: Vec::new(),
            flagged: 0,
            sink_failures: 0,
            insert,
            inventory_hash: inventory_hash(objects.iter().filter_map(|o| builder.eligible_name(o))),
            dry_run,
        };

        let result = CoreDetector::from_config(self.config).detect(&tree);
        report.trail = result.trail.clone();
        let Some(leaf) = result.leaf() else {
            info!("No core found for {}", application);
            return Ok(report);
        };

        let taxonomy = format!("{0}##{1}##{1}", self.config.default_taxonomy, leaf.name());
        let core = DetectedCore {
            full_name: leaf.full_name().to_string(),
            name: leaf.name().to_string(),
            display_name: leaf_display_name(leaf, language),
            count: leaf.count(),
            depth: leaf.depth(),
            variation: result.variation.unwrap_or_default(),
            taxonomy,
        };
        info!("Core of {} is '{}' ({})", application, core.full_name, core.display_name);

        let name_field = builder.profile().name_field;
        let candidates =
            self.source.list_external_with_prefix(application, leaf.full_name(), name_field)?;
        report.candidates = candidates.iter().map(|c| c.id).collect();

        if dry_run {
            info!("Dry run: {} candidates left unflagged", report.candidates.len());
        } else {
            for id in &report.candidates {
                let mut ok = true;
                if let Err(err) = self.sink.flag_as_core(*id, &core.taxonomy, &core.name) {
                    warn!("Failed to flag object {} as core: {}", id, err);
                    report.sink_failures += 1;
                    ok = false;
                }
                if let Err(err) = self.sink.flag_external(*id, DetectionCategory::MissingCode) {
                    warn!("Failed to flag object {} as external: {}", id, err);
                    report.sink_failures += 1;
                    ok = false;
                }
                if ok {
                    report.flagged += 1;
                }
            }
        }

        report.core = Some(core);
        Ok(report)
    }
}

/// Runs a [`CoreAnalyzer`] against a project database and records the run.
pub struct DetectionRunner<'a> {
    pub ctx: &'a ProjectContext,
    pub config: &'a DetectionConfig,
}

impl<'a> DetectionRunner<'a> {
    pub fn run(
        &self,
        application: &str,
        language: Language,
        dry_run: bool,
    ) -> Result<CoreReport, AnalysisError> {
        let started_at = Utc::now().to_rfc3339();
        let analyzer =
            CoreAnalyzer { source: &self.ctx.db, sink: &self.ctx.db, config: self.config };
        let outcome = analyzer.analyze(application, language, dry_run);
        let finished_at = Utc::now().to_rfc3339();

        let record = match &outcome {
            Ok(report) => DetectionRunRecord::from_report(report, started_at, finished_at),
            Err(_) => DetectionRunRecord::failed(application, language, started_at, finished_at),
        };
        // A bookkeeping failure does not invalidate the detection itself.
        if let Err(err) = self.ctx.db.insert_detection_run(&record) {
            warn!("Failed to record detection run for {}: {}", application, err);
        }
        outcome
    }
}
