//! The composite of a call graph and its metric table.
//!
//! A [`GraphFrame`] pairs a shared, immutable [`Graph`] with a [`MetricTable`]
//! whose rows are keyed by that graph's node handles. Every restructuring
//! operation produces a new graph and realigns the table onto it.

pub mod lists;
pub mod literal;
pub mod ops;

pub use literal::LiteralNode;
pub use ops::BinaryOp;

use crate::graph::{Graph, NodeId};
use crate::table::{ColumnKind, MetricTable, RowKey};
use crate::utils::config::{DEFAULT_METRIC, EXCLUSIVE_SUFFIX, INCLUSIVE_SUFFIX, NAME_COLUMN};
use crate::utils::error::{FrameError, TableError};
use log::debug;
use serde::{Deserialize, Serialize};
use std::collections::{BTreeMap, HashMap};
use std::rc::Rc;

/// Dataset-level information carried alongside the metrics
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Metadata {
    pub inclusive_suffix: String,
    pub exclusive_suffix: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub num_processes: Option<u32>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub num_threads: Option<u32>,
    #[serde(default, skip_serializing_if = "BTreeMap::is_empty")]
    pub entries: BTreeMap<String, String>,
}

impl Default for Metadata {
    fn default() -> Self {
        Self {
            inclusive_suffix: INCLUSIVE_SUFFIX.to_string(),
            exclusive_suffix: EXCLUSIVE_SUFFIX.to_string(),
            num_processes: None,
            num_threads: None,
            entries: BTreeMap::new(),
        }
    }
}

/// A call graph paired with per-node metrics
#[derive(Debug, Clone)]
pub struct GraphFrame {
    graph: Rc<Graph>,
    table: MetricTable,
    exc_metrics: Vec<String>,
    inc_metrics: Vec<String>,
    default_metric: String,
    metadata: Metadata,
}

impl GraphFrame {
    /// Pair a graph with its metric table
    ///
    /// **Public** - the entry point used by every reader
    ///
    /// # Arguments
    /// * `graph` - Call graph; enumerated here if the reader did not do it
    /// * `table` - Metric rows keyed by node handles of `graph`
    /// * `exc_metrics` / `inc_metrics` - Column names by metric semantics
    /// * `default_metric` - Metric used when an operation is not told which one
    ///
    /// # Errors
    /// * `FrameError::MissingMetrics` - both metric lists are empty
    /// * `FrameError::UnknownMetric` - a listed metric has no column
    /// * `TableError::NonNumericMetric` - a listed metric is not numeric
    /// * `TableError::MissingNode` - a row references a node not reachable in `graph`
    pub fn new(
        mut graph: Graph,
        table: MetricTable,
        exc_metrics: Vec<String>,
        inc_metrics: Vec<String>,
        default_metric: Option<String>,
    ) -> Result<Self, FrameError> {
        if !graph.is_enumerated() {
            graph.enumerate_traverse();
        }
        Self::from_parts(
            Rc::new(graph),
            table,
            exc_metrics,
            inc_metrics,
            default_metric,
            Metadata::default(),
        )
    }

    pub(crate) fn from_parts(
        graph: Rc<Graph>,
        table: MetricTable,
        exc_metrics: Vec<String>,
        inc_metrics: Vec<String>,
        default_metric: Option<String>,
        metadata: Metadata,
    ) -> Result<Self, FrameError> {
        if exc_metrics.is_empty() && inc_metrics.is_empty() {
            return Err(FrameError::MissingMetrics);
        }

        for metric in exc_metrics.iter().chain(&inc_metrics) {
            match table.column(metric) {
                None => return Err(FrameError::UnknownMetric(metric.clone())),
                Some(spec) if spec.kind != ColumnKind::Numeric => {
                    return Err(TableError::NonNumericMetric(metric.clone()).into())
                }
                Some(_) => {}
            }
        }

        let reachable = graph.reachable();
        for key in table.keys() {
            if !reachable.get(key.node.index()).copied().unwrap_or(false) {
                return Err(TableError::MissingNode {
                    node: key.node,
                    frame: graph.describe(key.node),
                }
                .into());
            }
        }

        let default_metric = match default_metric {
            Some(metric) => {
                if !exc_metrics.contains(&metric) && !inc_metrics.contains(&metric) {
                    return Err(FrameError::UnknownMetric(metric));
                }
                metric
            }
            None => pick_default_metric(&exc_metrics, &inc_metrics, &metadata),
        };

        debug!(
            "GraphFrame with {} rows, {} exclusive and {} inclusive metrics",
            table.len(),
            exc_metrics.len(),
            inc_metrics.len()
        );

        Ok(Self {
            graph,
            table,
            exc_metrics,
            inc_metrics,
            default_metric,
            metadata,
        })
    }

    /// Same frame over a different graph and table, keeping metric lists
    pub(crate) fn with_graph(&self, graph: Graph, table: MetricTable) -> Result<Self, FrameError> {
        Self::from_parts(
            Rc::new(graph),
            table,
            self.exc_metrics.clone(),
            self.inc_metrics.clone(),
            Some(self.default_metric.clone()),
            self.metadata.clone(),
        )
    }

    pub fn graph(&self) -> &Graph {
        &self.graph
    }

    /// Shared handle to the graph
    pub fn graph_rc(&self) -> &Rc<Graph> {
        &self.graph
    }

    pub fn table(&self) -> &MetricTable {
        &self.table
    }

    pub fn table_mut(&mut self) -> &mut MetricTable {
        &mut self.table
    }

    pub fn exc_metrics(&self) -> &[String] {
        &self.exc_metrics
    }

    pub fn inc_metrics(&self) -> &[String] {
        &self.inc_metrics
    }

    pub fn default_metric(&self) -> &str {
        &self.default_metric
    }

    pub fn set_default_metric(&mut self, metric: &str) -> Result<(), FrameError> {
        if !self.is_metric(metric) {
            return Err(FrameError::UnknownMetric(metric.to_string()));
        }
        self.default_metric = metric.to_string();
        Ok(())
    }

    pub fn metadata(&self) -> &Metadata {
        &self.metadata
    }

    /// Exclusive metrics followed by inclusive metrics
    pub fn show_metric_columns(&self) -> Vec<String> {
        self.exc_metrics
            .iter()
            .chain(&self.inc_metrics)
            .cloned()
            .collect()
    }

    pub fn is_metric(&self, name: &str) -> bool {
        self.exc_metrics.iter().any(|m| m == name) || self.inc_metrics.iter().any(|m| m == name)
    }

    /// Record process/thread counts and free-form entries
    pub fn update_metadata<I>(
        &mut self,
        num_processes: Option<u32>,
        num_threads: Option<u32>,
        entries: I,
    ) -> &mut Self
    where
        I: IntoIterator<Item = (String, String)>,
    {
        if num_processes.is_some() {
            self.metadata.num_processes = num_processes;
        }
        if num_threads.is_some() {
            self.metadata.num_threads = num_threads;
        }
        self.metadata.entries.extend(entries);
        self
    }

    /// Copy of the frame sharing the same graph; the table is copied
    pub fn copy(&self) -> Self {
        self.clone()
    }

    /// Copy of the frame with its own graph
    pub fn deepcopy(&self) -> Result<Self, FrameError> {
        let copied = self.graph.copy();
        let table = self.table.reindex(&copied.old_to_new, &[])?;
        self.with_graph(copied.graph, table)
    }

    /// Row key of `node` in the first (rank, thread) slice of the table
    pub fn key_for(&self, node: NodeId) -> RowKey {
        let slice = self.table.slices().first().copied().unwrap_or((None, None));
        RowKey {
            node,
            rank: slice.0,
            thread: slice.1,
        }
    }

    /// Display name of a node: the `name` column, else the frame's name
    pub fn node_name(&self, node: NodeId) -> String {
        self.names_by_node()
            .remove(&node)
            .unwrap_or_else(|| self.frame_name(node))
    }

    fn frame_name(&self, node: NodeId) -> String {
        match self.graph.frame(node) {
            Some(frame) => frame
                .name()
                .map(str::to_string)
                .unwrap_or_else(|| frame.to_string()),
            None => node.to_string(),
        }
    }

    /// Display names for every node that has a row
    pub fn names_by_node(&self) -> HashMap<NodeId, String> {
        let mut names = HashMap::new();
        for row in self.table.rows() {
            if names.contains_key(&row.node()) {
                continue;
            }
            let name = row
                .text(NAME_COLUMN)
                .map(str::to_string)
                .unwrap_or_else(|| self.frame_name(row.node()));
            names.insert(row.node(), name);
        }
        names
    }

    /// Metric values per node, summed over rank/thread rows
    pub fn metric_by_node(&self, metric: &str) -> Result<HashMap<NodeId, f64>, FrameError> {
        if !self.table.has_column(metric) {
            return Err(FrameError::UnknownMetric(metric.to_string()));
        }
        let mut values: HashMap<NodeId, f64> = HashMap::new();
        for row in self.table.rows() {
            if let Some(v) = row.number(metric) {
                *values.entry(row.node()).or_insert(0.0) += v;
            }
        }
        Ok(values)
    }

    /// All metric columns, for summing when rows merge
    pub(crate) fn metric_columns(&self) -> Vec<String> {
        self.show_metric_columns()
    }
}

fn pick_default_metric(exc: &[String], inc: &[String], metadata: &Metadata) -> String {
    let inclusive_default = format!("{}{}", DEFAULT_METRIC, metadata.inclusive_suffix);
    if exc.iter().any(|m| m == DEFAULT_METRIC) {
        DEFAULT_METRIC.to_string()
    } else if inc.iter().any(|m| *m == inclusive_default) {
        inclusive_default
    } else {
        exc.first()
            .or_else(|| inc.first())
            .cloned()
            .unwrap_or_else(|| DEFAULT_METRIC.to_string())
    }
}
