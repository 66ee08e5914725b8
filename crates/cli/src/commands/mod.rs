pub mod detect;
pub mod import;
pub mod modules;
pub mod project;
pub mod runs;
pub mod tree;
pub mod util;

pub use detect::*;
pub use import::*;
pub use modules::*;
pub use project::*;
pub use runs::*;
pub use tree::*;
pub use util::*;
