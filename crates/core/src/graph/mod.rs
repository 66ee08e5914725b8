//! Collaborator contracts with the host graph, plus an in-memory implementation.
//!
//! The core never talks to storage directly. It reads objects through
//! [`ObjectSource`], walks edges through [`CallGraph`], and writes results
//! through [`FlaggingSink`]. [`MemoryGraph`] backs tests and JSON/YAML
//! snapshots; `db::ProjectDb` backs CLI projects.

use std::collections::BTreeSet;
use std::path::Path;
use std::sync::Mutex;

use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::config::LanguageProfile;
use crate::db::DbError;
use crate::model::{DetectionCategory, NameField, ObjectId, ObjectRecord};

#[derive(Debug, Error)]
pub enum GraphError {
    #[error("Graph backend error: {0}")]
    Backend(String),

    #[error(transparent)]
    Db(#[from] DbError),

    #[error("Failed to read graph snapshot: {0}")]
    Io(#[from] std::io::Error),

    #[error("Failed to parse graph snapshot: {0}")]
    Parse(String),
}

/// Narrowing applied by the object source.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ObjectFilter {
    /// Exact level match, if set.
    pub level: Option<String>,
    /// Accepted internal types; empty accepts any.
    pub internal_types: Vec<String>,
}

impl ObjectFilter {
    pub fn from_profile(profile: &LanguageProfile) -> Self {
        Self { level: profile.level_filter.clone(), internal_types: profile.internal_types.clone() }
    }

    pub fn matches(&self, record: &ObjectRecord) -> bool {
        if let Some(level) = &self.level {
            if record.level.as_deref() != Some(level.as_str()) {
                return false;
            }
        }
        self.internal_types.is_empty()
            || record.internal_type.as_ref().is_some_and(|t| self.internal_types.contains(t))
    }
}

/// Source of object records.
pub trait ObjectSource {
    /// Internal objects of `application` accepted by `filter`.
    fn list_eligible_objects(
        &self,
        application: &str,
        filter: &ObjectFilter,
    ) -> Result<Vec<ObjectRecord>, GraphError>;

    /// External objects of `application` whose `field` strictly extends `prefix`.
    fn list_external_with_prefix(
        &self,
        application: &str,
        prefix: &str,
        field: NameField,
    ) -> Result<Vec<ObjectRecord>, GraphError>;
}

/// One-hop neighbourhood queries. Results are deduplicated and exclude the
/// queried ids themselves.
pub trait CallGraph {
    fn neighbors_out(&self, ids: &[ObjectId]) -> Result<Vec<ObjectId>, GraphError>;
    fn neighbors_in(&self, ids: &[ObjectId]) -> Result<Vec<ObjectId>, GraphError>;
}

/// Destination for detection results.
pub trait FlaggingSink {
    fn flag_as_core(&self, id: ObjectId, taxonomy: &str, core_name: &str) -> Result<(), GraphError>;
    fn flag_external(&self, id: ObjectId, category: DetectionCategory) -> Result<(), GraphError>;
}

/// Directed call edge.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub struct CallEdge {
    pub source: ObjectId,
    pub target: ObjectId,
}

impl CallEdge {
    pub fn new(source: u64, target: u64) -> Self {
        Self { source: ObjectId(source), target: ObjectId(target) }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum FlagKind {
    Core,
    External,
}

impl FlagKind {
    pub fn as_str(self) -> &'static str {
        match self {
            FlagKind::Core => "core",
            FlagKind::External => "external",
        }
    }

    pub fn parse(value: &str) -> Option<Self> {
        match value {
            "core" => Some(FlagKind::Core),
            "external" => Some(FlagKind::External),
            _ => None,
        }
    }
}

/// A flag written through a [`FlaggingSink`].
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct FlagRecord {
    pub object_id: ObjectId,
    pub kind: FlagKind,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub taxonomy: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub core_name: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub category: Option<DetectionCategory>,
}

impl FlagRecord {
    pub fn core(object_id: ObjectId, taxonomy: &str, core_name: &str) -> Self {
        Self {
            object_id,
            kind: FlagKind::Core,
            taxonomy: Some(taxonomy.to_string()),
            core_name: Some(core_name.to_string()),
            category: None,
        }
    }

    pub fn external(object_id: ObjectId, category: DetectionCategory) -> Self {
        Self {
            object_id,
            kind: FlagKind::External,
            taxonomy: None,
            core_name: None,
            category: Some(category),
        }
    }
}

/// Serializable dump of one application's objects and call edges.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct GraphSnapshot {
    pub application: String,
    #[serde(default)]
    pub objects: Vec<ObjectRecord>,
    #[serde(default)]
    pub edges: Vec<CallEdge>,
}

impl GraphSnapshot {
    /// Load a snapshot; `.yaml`/`.yml` files are read as YAML, anything else as JSON.
    pub fn load(path: &Path) -> Result<Self, GraphError> {
        let body = std::fs::read_to_string(path)?;
        match path.extension().and_then(|e| e.to_str()) {
            Some("yaml" | "yml") => {
                serde_yaml::from_str(&body).map_err(|e| GraphError::Parse(e.to_string()))
            }
            _ => serde_json::from_str(&body).map_err(|e| GraphError::Parse(e.to_string())),
        }
    }
}

/// In-memory graph for one application.
#[derive(Debug, Default)]
pub struct MemoryGraph {
    application: String,
    objects: Vec<ObjectRecord>,
    edges: BTreeSet<CallEdge>,
    flags: Mutex<Vec<FlagRecord>>,
}

impl MemoryGraph {
    pub fn new(application: impl Into<String>) -> Self {
        Self { application: application.into(), ..Self::default() }
    }

    pub fn from_snapshot(snapshot: GraphSnapshot) -> Self {
        Self {
            application: snapshot.application,
            objects: snapshot.objects,
            edges: snapshot.edges.into_iter().collect(),
            flags: Mutex::new(Vec::new()),
        }
    }

    pub fn application(&self) -> &str {
        &self.application
    }

    pub fn add_object(&mut self, record: ObjectRecord) -> &mut Self {
        self.objects.push(record);
        self
    }

    pub fn add_edge(&mut self, source: u64, target: u64) -> &mut Self {
        self.edges.insert(CallEdge::new(source, target));
        self
    }

    pub fn objects(&self) -> &[ObjectRecord] {
        &self.objects
    }

    /// Flags written so far, in call order.
    pub fn flags(&self) -> Vec<FlagRecord> {
        self.flags.lock().unwrap_or_else(|poisoned| poisoned.into_inner()).clone()
    }

    fn in_scope(&self, application: &str) -> bool {
        self.application == application
    }

    fn push_flag(&self, flag: FlagRecord) {
        self.flags.lock().unwrap_or_else(|poisoned| poisoned.into_inner()).push(flag);
    }

    fn one_hop(&self, ids: &[ObjectId], outgoing: bool) -> Vec<ObjectId> {
        let queried: BTreeSet<ObjectId> = ids.iter().copied().collect();
        let found: BTreeSet<ObjectId> = self
            .edges
            .iter()
            .filter_map(|edge| {
                let (from, to) =
                    if outgoing { (edge.source, edge.target) } else { (edge.target, edge.source) };
                (queried.contains(&from) && !queried.contains(&to)).then_some(to)
            })
            .collect();
        found.into_iter().collect()
    }
}

impl ObjectSource for MemoryGraph {
    fn list_eligible_objects(
        &self,
        application: &str,
        filter: &ObjectFilter,
    ) -> Result<Vec<ObjectRecord>, GraphError> {
        if !self.in_scope(application) {
            return Ok(Vec::new());
        }
        Ok(self.objects.iter().filter(|o| !o.external && filter.matches(o)).cloned().collect())
    }

    fn list_external_with_prefix(
        &self,
        application: &str,
        prefix: &str,
        field: NameField,
    ) -> Result<Vec<ObjectRecord>, GraphError> {
        if !self.in_scope(application) {
            return Ok(Vec::new());
        }
        Ok(self
            .objects
            .iter()
            .filter(|o| o.external)
            .filter(|o| {
                o.name_for(field).is_some_and(|n| n.len() > prefix.len() && n.starts_with(prefix))
            })
            .cloned()
            .collect())
    }
}

impl CallGraph for MemoryGraph {
    fn neighbors_out(&self, ids: &[ObjectId]) -> Result<Vec<ObjectId>, GraphError> {
        Ok(self.one_hop(ids, true))
    }

    fn neighbors_in(&self, ids: &[ObjectId]) -> Result<Vec<ObjectId>, GraphError> {
        Ok(self.one_hop(ids, false))
    }
}

impl FlaggingSink for MemoryGraph {
    fn flag_as_core(
        &self,
        id: ObjectId,
        taxonomy: &str,
        core_name: &str,
    ) -> Result<(), GraphError> {
        self.push_flag(FlagRecord::core(id, taxonomy, core_name));
        Ok(())
    }

    fn flag_external(&self, id: ObjectId, category: DetectionCategory) -> Result<(), GraphError> {
        self.push_flag(FlagRecord::external(id, category));
        Ok(())
    }
}
