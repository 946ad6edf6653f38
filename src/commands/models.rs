use crate::flamegraph::FlamegraphConfig;
use crate::graphframe::BinaryOp;
use std::path::PathBuf;

/// Arguments for the filter command
#[derive(Debug, Clone)]
pub struct FilterArgs {
    pub input: PathBuf,

    /// Metric compared against `min`
    pub metric: String,

    /// Rows with `metric >= min` are kept
    pub min: f64,

    /// Rebuild the graph from the surviving nodes
    pub squash: bool,

    pub output: PathBuf,
}

impl Default for FilterArgs {
    fn default() -> Self {
        Self {
            input: PathBuf::new(),
            metric: "time".to_string(),
            min: 0.0,
            squash: true,
            output: PathBuf::from("filtered.json"),
        }
    }
}

/// Arguments for the add and diff commands
#[derive(Debug, Clone)]
pub struct CombineArgs {
    pub left: PathBuf,
    pub right: PathBuf,
    pub op: BinaryOp,
    pub output: PathBuf,
}

/// Arguments for the flamegraph command
#[derive(Debug, Clone)]
pub struct FlamegraphArgs {
    pub input: PathBuf,

    /// Metric used for frame widths (None = first exclusive metric)
    pub metric: Option<String>,

    pub output: PathBuf,

    /// Also write the folded stacks next to the SVG
    pub folded: Option<PathBuf>,

    pub config: FlamegraphConfig,
}
