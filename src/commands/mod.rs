//! CLI command implementations.
//!
//! Commands orchestrate the library components and report through `anyhow`.

pub mod models;
pub mod render;
pub mod transform;
pub mod utils;

// Re-export main command functions
pub use models::{CombineArgs, FilterArgs, FlamegraphArgs};
pub use render::execute_flamegraph;
pub use transform::{execute_combine, execute_filter, execute_normalize};
pub use utils::{display_summary, display_version, validate_literal_file, FrameSummary};
