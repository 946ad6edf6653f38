use crate::graphframe::GraphFrame;
use crate::output::{read_document, read_literal};
use crate::utils::config::SCHEMA_VERSION;
use anyhow::{Context, Result};
use std::path::Path;

/// Counts and per-root totals shown by the summary command
#[derive(Debug, Clone, PartialEq)]
pub struct FrameSummary {
    pub nodes: usize,
    pub roots: usize,
    pub rows: usize,
    pub exc_metrics: Vec<String>,
    pub inc_metrics: Vec<String>,
    pub is_tree: bool,
    /// (root name, inclusive value) for the default metric
    pub root_totals: Vec<(String, f64)>,
}

impl FrameSummary {
    pub fn of(gf: &GraphFrame) -> Result<Self> {
        let metric = gf
            .inc_metrics()
            .iter()
            .find(|m| m.starts_with(gf.default_metric()))
            .or_else(|| gf.inc_metrics().first())
            .cloned()
            .unwrap_or_else(|| gf.default_metric().to_string());
        let values = gf.metric_by_node(&metric)?;

        let root_totals = gf
            .graph()
            .roots()
            .iter()
            .map(|root| {
                (
                    gf.node_name(*root),
                    values.get(root).copied().unwrap_or(0.0),
                )
            })
            .collect();

        Ok(Self {
            nodes: gf.graph().len(),
            roots: gf.graph().roots().len(),
            rows: gf.table().len(),
            exc_metrics: gf.exc_metrics().to_vec(),
            inc_metrics: gf.inc_metrics().to_vec(),
            is_tree: gf.graph().is_tree(),
            root_totals,
        })
    }
}

/// Print the summary of a literal document
pub fn display_summary(file_path: &Path) -> Result<()> {
    let gf = read_literal(file_path)
        .with_context(|| format!("Failed to read {}", file_path.display()))?;
    let summary = FrameSummary::of(&gf)?;

    println!("Graph frame: {}", file_path.display());
    println!("  Nodes: {}", summary.nodes);
    println!("  Roots: {}", summary.roots);
    println!("  Rows: {}", summary.rows);
    println!("  Shape: {}", if summary.is_tree { "tree" } else { "DAG" });
    println!("  Exclusive metrics: {}", summary.exc_metrics.join(", "));
    println!("  Inclusive metrics: {}", summary.inc_metrics.join(", "));
    println!("  Root totals:");
    for (name, total) in &summary.root_totals {
        println!("    {:<40} {:>12.3}", name, total);
    }

    Ok(())
}

/// Validate a literal document: it parses and rebuilds a consistent frame
pub fn validate_literal_file(file_path: &Path) -> Result<()> {
    println!("Validating literal document: {}", file_path.display());

    let document = read_document(file_path)?;
    let gf = document
        .to_frame()
        .context("Document does not describe a valid graph frame")?;

    println!("✓ Valid literal document");
    println!("  Version: {}", document.version);
    if !document.generated_at.is_empty() {
        println!("  Generated: {}", document.generated_at);
    }
    println!("  Nodes: {}", gf.graph().len());
    println!("  Rows: {}", gf.table().len());
    if gf.graph().check_acyclic().is_err() {
        println!("  Note: graph contains cycles");
    }

    Ok(())
}

/// Display version information
pub fn display_version() {
    println!("cgframe v{}", env!("CARGO_PKG_VERSION"));
    println!("Literal Schema: v{}", SCHEMA_VERSION);
    println!();
    println!("Call-graph plus metric-table algebra for hierarchical profiling data.");
}
