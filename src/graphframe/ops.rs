//! Operations over graph frames: filtering, squashing, metric derivation,
//! unification and node-by-node arithmetic.

use super::GraphFrame;
use crate::graph::{Frame, NodeId, Order};
use crate::table::{Aggregate, ColumnKind, ColumnSpec, MetricTable, MetricValue, RowKey, RowRef};
use crate::table::index::describe_levels;
use crate::utils::config::{MISSING_NODE_COLUMN, NAME_COLUMN};
use crate::utils::error::{FrameError, TableError};
use log::{debug, info};
use std::collections::{BTreeMap, HashMap, HashSet};
use std::rc::Rc;

/// Element-wise operator applied by [`GraphFrame::combine`]
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum BinaryOp {
    Add,
    Sub,
    Mul,
    Div,
}

impl BinaryOp {
    /// Value used for a row or column missing on one side
    pub fn identity(self) -> f64 {
        match self {
            BinaryOp::Add | BinaryOp::Sub => 0.0,
            BinaryOp::Mul | BinaryOp::Div => 1.0,
        }
    }

    pub fn apply(self, left: f64, right: f64) -> f64 {
        match self {
            BinaryOp::Add => left + right,
            BinaryOp::Sub => left - right,
            BinaryOp::Mul => left * right,
            BinaryOp::Div => left / right,
        }
    }
}

fn slice_key(node: NodeId, slice: (Option<u32>, Option<u32>)) -> RowKey {
    RowKey {
        node,
        rank: slice.0,
        thread: slice.1,
    }
}

impl GraphFrame {
    /// Keep the rows accepted by `pred`
    ///
    /// With `squash` the graph is reduced to the nodes that still have rows
    /// and inclusive metrics are recomputed; without it only the table
    /// changes and the graph is shared with `self`.
    ///
    /// # Errors
    /// * `FrameError::EmptyFilter` - no row passed the predicate
    pub fn filter<F>(&self, pred: F, squash: bool) -> Result<GraphFrame, FrameError>
    where
        F: FnMut(RowRef<'_>) -> bool,
    {
        let mut table = self.table.clone();
        table.retain(pred);
        if table.is_empty() {
            return Err(FrameError::EmptyFilter);
        }
        debug!("Filter kept {} of {} rows", table.len(), self.table.len());

        let mut filtered = self.copy();
        filtered.table = table;
        if squash {
            filtered.squash()
        } else {
            Ok(filtered)
        }
    }

    /// Rebuild the graph from the nodes that have rows
    ///
    /// Each surviving node is linked to its nearest surviving descendants.
    pub fn squash(&self) -> Result<GraphFrame, FrameError> {
        let keep: HashSet<NodeId> = self.table.nodes().into_iter().collect();
        let squashed = self.graph.squash(|id, _| keep.contains(&id));
        let table = self
            .table
            .reindex(&squashed.old_to_new, &self.metric_columns())?;

        let mut out = self.with_graph(squashed.graph, table)?;
        out.update_inclusive_columns()?;
        Ok(out)
    }

    /// Merge sibling nodes with identical frames, summing their metrics
    pub fn normalize(&self) -> Result<GraphFrame, FrameError> {
        let normalized = self.graph.normalize();
        let table = self
            .table
            .reindex(&normalized.old_to_new, &self.metric_columns())?;

        let mut out = self.with_graph(normalized.graph, table)?;
        out.update_inclusive_columns()?;
        Ok(out)
    }

    /// Collapse rank/thread rows into one row per node
    pub fn drop_index_levels(&mut self, aggregate: Aggregate) -> Result<(), FrameError> {
        if self.table.levels().len() == 1 {
            return Ok(());
        }
        self.table = self
            .table
            .group_by_node(&self.metric_columns(), aggregate)?;
        Ok(())
    }

    fn update_inclusive_columns(&mut self) -> Result<(), FrameError> {
        if self.exc_metrics.is_empty() {
            return Ok(());
        }
        self.calculate_inclusive_metrics()
    }

    /// Derive an inclusive column for every exclusive metric
    ///
    /// The inclusive value of a node is the sum of the exclusive values of
    /// everything reachable from it, each node counted once; on trees this
    /// equals own value plus the children's inclusive values. Computed per
    /// rank/thread slice. Recomputing without structural change is a no-op.
    pub fn calculate_inclusive_metrics(&mut self) -> Result<(), FrameError> {
        let columns = self.exc_metrics.clone();
        let out_columns: Vec<String> = columns
            .iter()
            .map(|m| format!("{}{}", m, self.metadata.inclusive_suffix))
            .collect();

        self.subgraph_sum(&columns, &out_columns)?;

        for column in out_columns {
            if !self.inc_metrics.contains(&column) {
                self.inc_metrics.push(column);
            }
        }
        Ok(())
    }

    /// Store in `out_columns` the sum of `columns` over each node's subgraph
    pub fn subgraph_sum(&mut self, columns: &[String], out_columns: &[String]) -> Result<(), FrameError> {
        for column in columns {
            match self.table.column(column) {
                None => return Err(FrameError::UnknownMetric(column.clone())),
                Some(spec) if spec.kind != ColumnKind::Numeric => {
                    return Err(TableError::NonNumericMetric(column.clone()).into())
                }
                Some(_) => {}
            }
        }
        for out in out_columns {
            self.table.ensure_column(ColumnSpec::numeric(out.as_str()))?;
        }

        let graph = Rc::clone(&self.graph);
        let tree = graph.is_tree();
        let order: Vec<NodeId> = graph.traverse(Order::Post).collect();
        let arena = graph.arena_len();

        for slice in self.table.slices() {
            for (column, out) in columns.iter().zip(out_columns) {
                let mut own = vec![0.0; arena];
                for &id in &order {
                    own[id.index()] = self
                        .table
                        .number(&slice_key(id, slice), column)
                        .unwrap_or(0.0);
                }

                let mut sums = vec![0.0; arena];
                for &id in &order {
                    let total = if tree {
                        let children = graph.get(id).map(|n| n.children()).unwrap_or(&[]);
                        own[id.index()] + children.iter().map(|c| sums[c.index()]).sum::<f64>()
                    } else {
                        graph
                            .traverse_from(id, Order::Pre)
                            .map(|d| own[d.index()])
                            .sum()
                    };
                    sums[id.index()] = total;
                }

                for &id in &order {
                    let key = slice_key(id, slice);
                    if self.table.contains(&key) {
                        self.table.set(&key, out, sums[id.index()].into())?;
                    }
                }
            }
        }

        debug!(
            "Summed {} columns over {} nodes ({})",
            columns.len(),
            order.len(),
            if tree { "tree" } else { "graph" }
        );
        Ok(())
    }

    /// Derive an exclusive column for every inclusive metric
    ///
    /// A column named `<m> (inc)` produces `<m>`; any other inclusive column
    /// produces `<m> (exc)`. The exclusive value is the node's inclusive value
    /// minus its children's inclusive values.
    pub fn calculate_exclusive_metrics(&mut self) -> Result<(), FrameError> {
        let graph = Rc::clone(&self.graph);
        let order: Vec<NodeId> = graph.traverse(Order::Pre).collect();
        let suffix = self.metadata.inclusive_suffix.clone();

        for column in self.inc_metrics.clone() {
            let out = if column.contains(&suffix) {
                column.replace(&suffix, "")
            } else {
                format!("{}{}", column, self.metadata.exclusive_suffix)
            };
            self.table.ensure_column(ColumnSpec::numeric(out.as_str()))?;

            for slice in self.table.slices() {
                for &id in &order {
                    let key = slice_key(id, slice);
                    let Some(inc) = self.table.number(&key, &column) else {
                        continue;
                    };
                    let children = graph.get(id).map(|n| n.children()).unwrap_or(&[]);
                    let below: f64 = children
                        .iter()
                        .filter_map(|c| self.table.number(&slice_key(*c, slice), &column))
                        .sum();
                    self.table.set(&key, &out, (inc - below).into())?;
                }
            }

            if !self.exc_metrics.contains(&out) {
                self.exc_metrics.push(out);
            }
        }
        Ok(())
    }

    /// Make `self` and `other` share one union graph
    ///
    /// Rows of both tables are moved onto the union. When either side has
    /// rows the other lacks, `self` gains a `_missing_node` column (0 both,
    /// 1 left only, 2 right only) and rows for the right-only keys; their
    /// metric cells stay null.
    pub fn unify(&mut self, other: &mut GraphFrame) -> Result<(), FrameError> {
        if Rc::ptr_eq(&self.graph, &other.graph) {
            return Ok(());
        }
        if self.table.levels() != other.table.levels() {
            return Err(TableError::IndexMismatch {
                key: describe_levels(other.table.levels()),
                levels: describe_levels(self.table.levels()),
            }
            .into());
        }

        let union = self.graph.union(&other.graph);
        self.table = self.table.reindex(&union.left, &self.metric_columns())?;
        other.table = other.table.reindex(&union.right, &other.metric_columns())?;

        self.insert_missing_rows(other)?;

        let graph = Rc::new(union.graph);
        self.graph = Rc::clone(&graph);
        other.graph = graph;
        Ok(())
    }

    fn insert_missing_rows(&mut self, other: &GraphFrame) -> Result<(), FrameError> {
        let left_only = self.table.keys().any(|k| !other.table.contains(k));
        let right_only: Vec<RowKey> = other
            .table
            .keys()
            .filter(|k| !self.table.contains(k))
            .copied()
            .collect();
        if !left_only && right_only.is_empty() {
            return Ok(());
        }

        self.table
            .ensure_column(ColumnSpec::numeric(MISSING_NODE_COLUMN))?;
        let keys: Vec<RowKey> = self.table.keys().copied().collect();
        for key in keys {
            let marker = if other.table.contains(&key) { 0.0 } else { 1.0 };
            self.table.set(&key, MISSING_NODE_COLUMN, marker.into())?;
        }

        // carry descriptive columns over; metrics stay null
        let carried: Vec<String> = self
            .table
            .columns()
            .iter()
            .filter(|c| !self.is_metric(&c.name) && c.name != MISSING_NODE_COLUMN)
            .filter(|c| other.table.column(&c.name).map(|o| o.kind) == Some(c.kind))
            .map(|c| c.name.clone())
            .collect();

        for key in &right_only {
            let mut values: Vec<(String, MetricValue)> = carried
                .iter()
                .filter_map(|c| other.table.get(key, c).map(|v| (c.clone(), v.clone())))
                .collect();
            values.push((MISSING_NODE_COLUMN.to_string(), MetricValue::Number(2.0)));
            self.table.insert(*key, values)?;
        }

        debug!("Inserted {} right-only rows", right_only.len());
        Ok(())
    }

    /// Node-by-node sum over the union of both graphs
    pub fn add(&self, other: &GraphFrame) -> Result<GraphFrame, FrameError> {
        self.combine(other, BinaryOp::Add)
    }

    /// Node-by-node difference over the union of both graphs
    pub fn sub(&self, other: &GraphFrame) -> Result<GraphFrame, FrameError> {
        self.combine(other, BinaryOp::Sub)
    }

    /// Node-by-node product over the union of both graphs
    pub fn mul(&self, other: &GraphFrame) -> Result<GraphFrame, FrameError> {
        self.combine(other, BinaryOp::Mul)
    }

    /// Node-by-node quotient over the union of both graphs
    pub fn div(&self, other: &GraphFrame) -> Result<GraphFrame, FrameError> {
        self.combine(other, BinaryOp::Div)
    }

    /// Apply `op` to every metric column, aligned by node over the union graph
    ///
    /// Neither input is modified. A row or column missing on one side takes
    /// the operator's identity value (0 for add/sub, 1 for mul/div).
    ///
    /// # Errors
    /// * `TableError::IncompatibleColumns` - a column has different kinds on
    ///   the two sides
    /// * `TableError::IndexMismatch` - the tables have different index levels
    pub fn combine(&self, other: &GraphFrame, op: BinaryOp) -> Result<GraphFrame, FrameError> {
        check_compatible(&self.table, &other.table)?;

        let mut left = self.copy();
        let mut right = other.copy();
        left.unify(&mut right)?;

        let exc = merge_names(&left.exc_metrics, &right.exc_metrics);
        let inc = merge_names(&left.inc_metrics, &right.inc_metrics);
        let metrics: Vec<String> = exc.iter().chain(&inc).cloned().collect();
        for metric in &metrics {
            left.table.ensure_column(ColumnSpec::numeric(metric.as_str()))?;
        }

        let identity = op.identity();
        let keys: Vec<RowKey> = left.table.keys().copied().collect();
        for key in &keys {
            for metric in &metrics {
                let l = left.table.number(key, metric).unwrap_or(identity);
                let r = right.table.number(key, metric).unwrap_or(identity);
                left.table.set(key, metric, op.apply(l, r).into())?;
            }
        }

        left.exc_metrics = exc;
        left.inc_metrics = inc;
        info!(
            "Combined {} rows with {:?} over {} metrics",
            keys.len(),
            op,
            metrics.len()
        );
        Ok(left)
    }

    /// Rebuild the frame around the values of one column
    ///
    /// Every node with a non-null value in `column` joins the group for that
    /// value; each group becomes one node whose frame is
    /// `{name: value, type: column}`. Edges between groups follow the
    /// original call edges. All rows of a group, across ranks and threads,
    /// are reduced into one row with `aggregate`; the `name` column holds
    /// the group value. Nodes without a value are elided.
    ///
    /// # Errors
    /// * `TableError::UnknownColumn` - `column` does not exist
    /// * `FrameError::EmptyFilter` - no row has a value in `column`
    pub fn groupby_aggregate(
        &self,
        column: &str,
        aggregate: Aggregate,
    ) -> Result<GraphFrame, FrameError> {
        if !self.table.has_column(column) {
            return Err(TableError::UnknownColumn(column.to_string()).into());
        }

        let mut groups: HashMap<NodeId, String> = HashMap::new();
        for row in self.table.rows() {
            let Some(value) = row.get(column).filter(|v| !v.is_null()) else {
                continue;
            };
            groups.entry(row.node()).or_insert_with(|| value.to_string());
        }
        if groups.is_empty() {
            return Err(FrameError::EmptyFilter);
        }

        let regrouped = self.graph.regroup(|id, _| {
            groups
                .get(&id)
                .and_then(|value| Frame::from_pairs([("name", value.as_str()), ("type", column)]).ok())
        });

        let mut table =
            self.table
                .regroup(&regrouped.old_to_new, &self.metric_columns(), aggregate)?;
        table.ensure_column(ColumnSpec::text(NAME_COLUMN))?;
        for node in table.nodes() {
            if let Some(name) = regrouped.graph.frame(node).and_then(|f| f.name()) {
                table.set(&RowKey::node(node), NAME_COLUMN, name.into())?;
            }
        }

        info!(
            "Grouped {} nodes by '{}' into {} nodes",
            groups.len(),
            column,
            table.len()
        );
        self.with_graph(regrouped.graph, table)
    }

    /// Per-node ratio of the maximum to the mean of each metric across ranks
    /// and threads
    ///
    /// The result is collapsed to one row per node with mean values and
    /// gains a `<metric>.imbalance` column per metric. A zero mean yields 1.
    /// With `threshold`, only nodes whose first metric's imbalance reaches
    /// it are kept, squashing the graph.
    ///
    /// `metrics` defaults to the default metric.
    pub fn load_imbalance(
        &self,
        metrics: &[&str],
        threshold: Option<f64>,
    ) -> Result<GraphFrame, FrameError> {
        let metrics: Vec<String> = if metrics.is_empty() {
            vec![self.default_metric.clone()]
        } else {
            metrics.iter().map(|m| m.to_string()).collect()
        };
        for metric in &metrics {
            if !self.is_metric(metric) {
                return Err(FrameError::UnknownMetric(metric.clone()));
            }
        }

        let mut mean = self.copy();
        mean.drop_index_levels(Aggregate::Mean)?;
        let mut max = self.copy();
        max.drop_index_levels(Aggregate::Max)?;

        let columns: Vec<String> = metrics.iter().map(|m| format!("{}.imbalance", m)).collect();
        for (metric, out) in metrics.iter().zip(&columns) {
            mean.table.ensure_column(ColumnSpec::numeric(out.as_str()))?;
            for node in mean.table.nodes() {
                let key = RowKey::node(node);
                let (Some(avg), Some(top)) =
                    (mean.table.number(&key, metric), max.table.number(&key, metric))
                else {
                    continue;
                };
                let ratio = if avg == 0.0 { 1.0 } else { top / avg };
                mean.table.set(&key, out, ratio.into())?;
            }
        }
        debug!("Computed imbalance for {} metrics", metrics.len());

        match (threshold, columns.first()) {
            (Some(limit), Some(column)) => mean.filter(
                |row| row.number(column).map_or(false, |v| v >= limit),
                true,
            ),
            _ => Ok(mean),
        }
    }

    /// Make every frame share one graph: the union of all their graphs
    ///
    /// Rank/thread rows are first collapsed with the maximum. Each table is
    /// then moved onto the shared graph and gains a row for every node it
    /// lacked, with zero metrics and the node's frame name.
    pub fn unify_many(frames: &mut [GraphFrame]) -> Result<(), FrameError> {
        let Some((first, rest)) = frames.split_first() else {
            return Ok(());
        };

        let base = first.graph.copy();
        let mut maps = vec![base.old_to_new];
        let mut shared = base.graph;
        for gf in rest {
            let union = shared.union(&gf.graph);
            for map in maps.iter_mut() {
                *map = map
                    .iter()
                    .filter_map(|(old, mid)| union.left.get(mid).map(|new| (*old, *new)))
                    .collect();
            }
            maps.push(union.right);
            shared = union.graph;
        }

        let shared = Rc::new(shared);
        let nodes: Vec<NodeId> = shared.traverse(Order::Pre).collect();
        for (gf, map) in frames.iter_mut().zip(&maps) {
            gf.drop_index_levels(Aggregate::Max)?;
            let metrics = gf.metric_columns();
            gf.table = gf.table.reindex(map, &metrics)?;
            gf.graph = Rc::clone(&shared);
            gf.fill_missing_rows(&nodes, &metrics)?;
        }

        info!(
            "Unified {} graph frames over {} nodes",
            frames.len(),
            nodes.len()
        );
        Ok(())
    }

    fn fill_missing_rows(&mut self, nodes: &[NodeId], metrics: &[String]) -> Result<(), FrameError> {
        let named = self
            .table
            .column(NAME_COLUMN)
            .map_or(false, |c| c.kind == ColumnKind::Text);
        for &node in nodes {
            let key = RowKey::node(node);
            if self.table.contains(&key) {
                continue;
            }
            let mut values: Vec<(String, MetricValue)> = metrics
                .iter()
                .map(|m| (m.clone(), MetricValue::Number(0.0)))
                .collect();
            if named {
                values.push((NAME_COLUMN.to_string(), self.frame_name(node).into()));
            }
            self.table.insert(key, values)?;
        }
        Ok(())
    }

    /// Follow the heaviest child from `start` while it keeps at least
    /// `threshold` of its parent's value
    ///
    /// Defaults: the first root and the first inclusive metric (else the
    /// default metric).
    pub fn hot_path(
        &self,
        start: Option<NodeId>,
        metric: Option<&str>,
        threshold: f64,
    ) -> Result<Vec<NodeId>, FrameError> {
        let metric = match metric {
            Some(m) => m.to_string(),
            None => self
                .inc_metrics
                .first()
                .cloned()
                .unwrap_or_else(|| self.default_metric.clone()),
        };
        if !self.is_metric(&metric) {
            return Err(FrameError::UnknownMetric(metric));
        }
        let Some(start) = start.or_else(|| self.graph.roots().first().copied()) else {
            return Ok(Vec::new());
        };
        self.graph.node(start)?;

        let values = self.metric_by_node(&metric)?;
        let value = |id: &NodeId| values.get(id).copied().unwrap_or(0.0);

        let mut path = vec![start];
        let mut current = start;
        loop {
            let children = self.graph.get(current).map(|n| n.children()).unwrap_or(&[]);
            let mut heaviest: Option<NodeId> = None;
            for child in children {
                if heaviest.map_or(true, |h| value(child) > value(&h)) {
                    heaviest = Some(*child);
                }
            }
            let Some(child) = heaviest else { break };
            if value(&child) < threshold * value(&current) || path.contains(&child) {
                break;
            }
            path.push(child);
            current = child;
        }
        Ok(path)
    }

    /// Per-name aggregate of a metric after collapsing rank/thread rows
    ///
    /// Rows are averaged per node first, then grouped by display name.
    /// Result is sorted by name.
    pub fn flat_profile(
        &self,
        metric: Option<&str>,
        aggregate: Aggregate,
    ) -> Result<Vec<(String, f64)>, FrameError> {
        let metric = metric.unwrap_or(&self.default_metric).to_string();
        if !self.table.has_column(&metric) {
            return Err(FrameError::UnknownMetric(metric));
        }

        let mut collapsed = self.copy();
        collapsed.drop_index_levels(Aggregate::Mean)?;
        let names = collapsed.names_by_node();

        let mut groups: BTreeMap<String, Vec<f64>> = BTreeMap::new();
        for row in collapsed.table.rows() {
            if let Some(v) = row.number(&metric) {
                let name = names
                    .get(&row.node())
                    .cloned()
                    .unwrap_or_else(|| row.node().to_string());
                groups.entry(name).or_default().push(v);
            }
        }

        Ok(groups
            .into_iter()
            .map(|(name, values)| {
                let value = aggregate.apply(&values);
                (name, value)
            })
            .collect())
    }
}

fn merge_names(left: &[String], right: &[String]) -> Vec<String> {
    let mut merged = left.to_vec();
    for name in right {
        if !merged.contains(name) {
            merged.push(name.clone());
        }
    }
    merged
}

fn check_compatible(left: &MetricTable, right: &MetricTable) -> Result<(), TableError> {
    for spec in left.columns() {
        if let Some(other) = right.column(&spec.name) {
            if other.kind != spec.kind {
                return Err(TableError::IncompatibleColumns {
                    column: spec.name.clone(),
                    left: spec.kind.to_string(),
                    right: other.kind.to_string(),
                });
            }
        }
    }
    Ok(())
}
