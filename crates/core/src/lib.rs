//! corelens-core
//!
//! Groups the object names of an application into a naming hierarchy, finds
//! the branch holding the application's proprietary core, and slices the
//! hierarchy into functional modules linked through the call graph.
//!
//! Storage and the host graph stay behind the traits in [`graph`]; a SQLite
//! project store in [`db`] implements them for the CLI.

pub mod analysis;
pub mod config;
pub mod db;
pub mod graph;
pub mod model;
pub mod naming;
pub mod services;
pub mod tree;

/// Returns the library version as encoded at compile time.
pub fn version() -> &'static str {
    env!("CARGO_PKG_VERSION")
}
