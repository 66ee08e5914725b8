use serde::{Deserialize, Serialize};

use crate::graph::FlagRecord;
use crate::model::Language;
use crate::services::CoreReport;

/// Allowed status values for detection runs.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "snake_case")]
pub enum DetectionRunStatus {
    /// A core was found and its candidates were flagged.
    Succeeded,
    /// The tree was empty or no leaf qualified.
    NotFound,
    /// A core was found but nothing was flagged on request.
    DryRun,
    Failed,
}

impl DetectionRunStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            DetectionRunStatus::Succeeded => "succeeded",
            DetectionRunStatus::NotFound => "not_found",
            DetectionRunStatus::DryRun => "dry_run",
            DetectionRunStatus::Failed => "failed",
        }
    }

    /// Decode a stored status; unknown values read as `Failed`.
    pub fn from_db_str(value: &str) -> Self {
        match value {
            "succeeded" => DetectionRunStatus::Succeeded,
            "not_found" => DetectionRunStatus::NotFound,
            "dry_run" => DetectionRunStatus::DryRun,
            _ => DetectionRunStatus::Failed,
        }
    }
}

/// Bookkeeping row for one detection run.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct DetectionRunRecord {
    pub application: String,
    pub language: String,
    pub inventory_hash: Option<String>,
    pub status: DetectionRunStatus,
    pub core_full_name: Option<String>,
    pub core_name: Option<String>,
    pub variation: Option<f64>,
    pub depth: Option<i64>,
    pub flagged: i64,
    pub skipped: i64,
    pub started_at: String,
    pub finished_at: String,
}

impl DetectionRunRecord {
    pub fn from_report(report: &CoreReport, started_at: String, finished_at: String) -> Self {
        let status = match (&report.core, report.dry_run) {
            (None, _) => DetectionRunStatus::NotFound,
            (Some(_), true) => DetectionRunStatus::DryRun,
            (Some(_), false) => DetectionRunStatus::Succeeded,
        };
        Self {
            application: report.application.clone(),
            language: report.language.to_string(),
            inventory_hash: Some(report.inventory_hash.clone()),
            status,
            core_full_name: report.core.as_ref().map(|c| c.full_name.clone()),
            core_name: report.core.as_ref().map(|c| c.name.clone()),
            variation: report.core.as_ref().map(|c| c.variation),
            depth: report.core.as_ref().map(|c| c.depth as i64),
            flagged: report.flagged as i64,
            skipped: (report.insert.skipped + report.insert.failed) as i64,
            started_at,
            finished_at,
        }
    }

    pub fn failed(
        application: &str,
        language: Language,
        started_at: String,
        finished_at: String,
    ) -> Self {
        Self {
            application: application.to_string(),
            language: language.to_string(),
            inventory_hash: None,
            status: DetectionRunStatus::Failed,
            core_full_name: None,
            core_name: None,
            variation: None,
            depth: None,
            flagged: 0,
            skipped: 0,
            started_at,
            finished_at,
        }
    }
}

/// A persisted flag with its timestamp.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct StoredFlag {
    #[serde(flatten)]
    pub flag: FlagRecord,
    pub flagged_at: String,
}

/// Per-application object and edge totals.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct ApplicationSummary {
    pub name: String,
    pub objects: i64,
    pub external: i64,
    pub edges: i64,
}

/// A high-level snapshot of project metadata.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ProjectSnapshot {
    pub config: crate::db::ProjectConfig,
    pub applications: Vec<ApplicationSummary>,
    pub runs: Vec<DetectionRunRecord>,
}
