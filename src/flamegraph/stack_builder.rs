//! Build collapsed stack format from a graph frame.
//!
//! Collapsed stacks are the input format for flamegraph generation.
//! Format: "parent;child;grandchild weight"
//!
//! Example: "main;solve;mpi_wait 1200"
//! This means: main called solve which called mpi_wait, which itself took 1200.

use crate::graph::NodeId;
use crate::graphframe::GraphFrame;
use crate::utils::error::FrameError;
use log::debug;
use std::collections::{HashMap, HashSet};

/// A single collapsed stack entry
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CollapsedStack {
    /// Stack trace as semicolon-separated string
    pub stack: String,

    /// Weight of the innermost frame on this stack
    pub weight: u64,
}

impl CollapsedStack {
    pub fn new(stack: String, weight: u64) -> Self {
        Self { stack, weight }
    }

    /// Folded-stack line as consumed by flamegraph renderers
    pub fn to_line(&self) -> String {
        format!("{} {}", self.stack, self.weight)
    }
}

/// Build collapsed stacks for one metric
///
/// Each node contributes one stack: the first call path that reaches it in
/// pre-order from the roots. Weights are the metric summed over rank/thread
/// rows and rounded; nodes with no positive weight are skipped. Stacks with
/// identical text are merged. The result is sorted by weight, heaviest first.
///
/// `metric` defaults to the first exclusive metric, else the default metric.
pub fn build_collapsed_stacks(
    gf: &GraphFrame,
    metric: Option<&str>,
) -> Result<Vec<CollapsedStack>, FrameError> {
    let metric = match metric {
        Some(m) => m.to_string(),
        None => gf
            .exc_metrics()
            .first()
            .cloned()
            .unwrap_or_else(|| gf.default_metric().to_string()),
    };
    if !gf.is_metric(&metric) {
        return Err(FrameError::UnknownMetric(metric));
    }

    let values = gf.metric_by_node(&metric)?;
    let names = gf.names_by_node();
    let graph = gf.graph();
    let label = |id: NodeId| -> String {
        names
            .get(&id)
            .cloned()
            .unwrap_or_else(|| gf.node_name(id))
            .replace(';', ":")
    };

    let mut order: Vec<String> = Vec::new();
    let mut weights: HashMap<String, u64> = HashMap::new();
    let mut visited: HashSet<NodeId> = HashSet::new();

    // (node, path to its parent)
    let mut pending: Vec<(NodeId, String)> = graph
        .roots()
        .iter()
        .rev()
        .map(|r| (*r, String::new()))
        .collect();
    while let Some((id, prefix)) = pending.pop() {
        if !visited.insert(id) {
            continue;
        }
        let stack = if prefix.is_empty() {
            label(id)
        } else {
            format!("{};{}", prefix, label(id))
        };

        let weight = values.get(&id).copied().unwrap_or(0.0).round();
        if weight > 0.0 {
            let entry = weights.entry(stack.clone()).or_insert_with(|| {
                order.push(stack.clone());
                0
            });
            *entry += weight as u64;
        }

        if let Some(node) = graph.get(id) {
            for child in node.children().iter().rev() {
                if !visited.contains(child) {
                    pending.push((*child, stack.clone()));
                }
            }
        }
    }

    let mut stacks: Vec<CollapsedStack> = order
        .into_iter()
        .map(|stack| {
            let weight = weights.get(&stack).copied().unwrap_or(0);
            CollapsedStack::new(stack, weight)
        })
        .collect();
    stacks.sort_by(|a, b| b.weight.cmp(&a.weight));

    debug!("Built {} collapsed stacks for '{}'", stacks.len(), metric);
    Ok(stacks)
}

impl GraphFrame {
    /// Folded-stack text for one metric, one line per stack
    pub fn to_folded_stacks(&self, metric: Option<&str>) -> Result<String, FrameError> {
        let stacks = build_collapsed_stacks(self, metric)?;
        let mut out = String::new();
        for stack in &stacks {
            out.push_str(&stack.to_line());
            out.push('\n');
        }
        Ok(out)
    }
}
