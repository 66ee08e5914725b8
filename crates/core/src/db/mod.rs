//! Project database integration and project layout definitions.
//!
//! A project is a directory holding `.corelens/project.json` and a SQLite
//! database with imported objects, call edges, flags, and detection runs.

mod config;
mod context;
mod layout;
mod models;
mod project_db;

pub use config::{DbConfig, ProjectConfig};
pub use context::ProjectContext;
pub use layout::ProjectLayout;
pub use models::{
    ApplicationSummary, DetectionRunRecord, DetectionRunStatus, ProjectSnapshot, StoredFlag,
};
pub use project_db::{DbError, DbResult, ImportSummary, ProjectDb, CURRENT_SCHEMA_VERSION};
