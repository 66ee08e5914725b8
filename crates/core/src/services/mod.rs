//! Services built on the tree: core detection and module linkage.

use thiserror::Error;

use crate::config::ConfigError;
use crate::db::DbError;
use crate::graph::GraphError;

pub mod detection;
pub mod modules;

pub use detection::{
    inventory_hash, CoreAnalyzer, CoreDetector, CoreOutcome, CoreReport, CoreResult, DetectedCore,
    DetectionRunner,
};
pub use modules::{LinkDirection, LinkFailure, LinkReport, Module, ModuleMap};

#[derive(Debug, Error)]
pub enum AnalysisError {
    #[error(transparent)]
    Graph(#[from] GraphError),

    #[error(transparent)]
    Config(#[from] ConfigError),

    #[error(transparent)]
    Db(#[from] DbError),
}
