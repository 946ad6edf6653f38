//! The metric table: rows keyed by node (plus optional rank/thread) holding
//! named, typed columns.
//!
//! Row order is insertion order and only matters for display. All alignment
//! (reindexing after graph surgery, collapsing index levels) is explicit.

use super::index::{describe_levels, IndexLevel, RowKey};
use super::value::{ColumnKind, ColumnSpec, MetricValue};
use crate::graph::NodeId;
use crate::utils::error::TableError;
use log::debug;
use std::collections::{HashMap, HashSet};

/// Reduction applied when several rows collapse into one
#[derive(Debug, Clone, Copy, Default)]
pub enum Aggregate {
    #[default]
    Mean,
    Sum,
    Min,
    Max,
    Custom(fn(&[f64]) -> f64),
}

impl Aggregate {
    pub fn apply(&self, values: &[f64]) -> f64 {
        match self {
            Aggregate::Mean => {
                if values.is_empty() {
                    f64::NAN
                } else {
                    values.iter().sum::<f64>() / values.len() as f64
                }
            }
            Aggregate::Sum => values.iter().sum(),
            Aggregate::Min => values.iter().copied().fold(f64::INFINITY, f64::min),
            Aggregate::Max => values.iter().copied().fold(f64::NEG_INFINITY, f64::max),
            Aggregate::Custom(f) => f(values),
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
struct Row {
    key: RowKey,
    values: Vec<MetricValue>,
}

/// Borrowed view of one row
#[derive(Debug, Clone, Copy)]
pub struct RowRef<'t> {
    key: &'t RowKey,
    values: &'t [MetricValue],
    columns: &'t [ColumnSpec],
}

impl<'t> RowRef<'t> {
    pub fn key(&self) -> &'t RowKey {
        self.key
    }

    pub fn node(&self) -> NodeId {
        self.key.node
    }

    pub fn get(&self, column: &str) -> Option<&'t MetricValue> {
        self.columns
            .iter()
            .position(|c| c.name == column)
            .map(|i| &self.values[i])
    }

    /// Numeric value of a column, `None` when absent, null or non-numeric
    pub fn number(&self, column: &str) -> Option<f64> {
        self.get(column).and_then(MetricValue::as_f64)
    }

    pub fn text(&self, column: &str) -> Option<&'t str> {
        self.get(column).and_then(MetricValue::as_str)
    }

    pub fn values(&self) -> &'t [MetricValue] {
        self.values
    }
}

/// Per-node metric rows with a declared column schema
#[derive(Debug, Clone, PartialEq)]
pub struct MetricTable {
    levels: Vec<IndexLevel>,
    columns: Vec<ColumnSpec>,
    rows: Vec<Row>,
    index: HashMap<RowKey, usize>,
}

impl Default for MetricTable {
    fn default() -> Self {
        Self::new()
    }
}

impl MetricTable {
    /// Table indexed by node only
    pub fn new() -> Self {
        Self::with_levels(vec![IndexLevel::Node])
    }

    /// Table indexed by node plus the given extra levels
    pub fn with_levels(levels: Vec<IndexLevel>) -> Self {
        let mut ordered = vec![IndexLevel::Node];
        for level in [IndexLevel::Rank, IndexLevel::Thread] {
            if levels.contains(&level) {
                ordered.push(level);
            }
        }
        Self {
            levels: ordered,
            columns: Vec::new(),
            rows: Vec::new(),
            index: HashMap::new(),
        }
    }

    /// Empty table with the same levels and columns
    pub fn empty_like(&self) -> Self {
        Self {
            levels: self.levels.clone(),
            columns: self.columns.clone(),
            rows: Vec::new(),
            index: HashMap::new(),
        }
    }

    pub fn levels(&self) -> &[IndexLevel] {
        &self.levels
    }

    pub fn has_level(&self, level: IndexLevel) -> bool {
        self.levels.contains(&level)
    }

    pub fn columns(&self) -> &[ColumnSpec] {
        &self.columns
    }

    pub fn column(&self, name: &str) -> Option<&ColumnSpec> {
        self.columns.iter().find(|c| c.name == name)
    }

    pub fn has_column(&self, name: &str) -> bool {
        self.column(name).is_some()
    }

    fn column_index(&self, name: &str) -> Result<usize, TableError> {
        self.columns
            .iter()
            .position(|c| c.name == name)
            .ok_or_else(|| TableError::UnknownColumn(name.to_string()))
    }

    /// Declare a new column; existing rows get `Null`
    pub fn add_column(&mut self, spec: ColumnSpec) -> Result<(), TableError> {
        if self.has_column(&spec.name) {
            return Err(TableError::DuplicateColumn(spec.name));
        }
        self.columns.push(spec);
        for row in &mut self.rows {
            row.values.push(MetricValue::Null);
        }
        Ok(())
    }

    /// Declare a column unless one with the same name and kind exists
    pub fn ensure_column(&mut self, spec: ColumnSpec) -> Result<(), TableError> {
        match self.column(&spec.name) {
            Some(existing) if existing.kind == spec.kind => Ok(()),
            Some(existing) => Err(TableError::KindMismatch {
                column: spec.name.clone(),
                expected: existing.kind.to_string(),
                found: spec.kind.to_string(),
            }),
            None => self.add_column(spec),
        }
    }

    pub fn drop_column(&mut self, name: &str) -> Result<(), TableError> {
        let i = self.column_index(name)?;
        self.columns.remove(i);
        for row in &mut self.rows {
            row.values.remove(i);
        }
        Ok(())
    }

    fn check_key(&self, key: &RowKey) -> Result<(), TableError> {
        if key.levels() != self.levels {
            return Err(TableError::IndexMismatch {
                key: key.to_string(),
                levels: describe_levels(&self.levels),
            });
        }
        Ok(())
    }

    fn check_kind(&self, i: usize, value: &MetricValue) -> Result<(), TableError> {
        let spec = &self.columns[i];
        if value.fits(spec.kind) {
            Ok(())
        } else {
            Err(TableError::KindMismatch {
                column: spec.name.clone(),
                expected: spec.kind.to_string(),
                found: value.kind().map(|k| k.to_string()).unwrap_or_default(),
            })
        }
    }

    /// Insert a new row; unspecified columns are `Null`
    ///
    /// # Errors
    /// * `TableError::IndexMismatch` - key does not populate the declared levels
    /// * `TableError::DuplicateRow` - a row with this key exists
    /// * `TableError::UnknownColumn` - a value names an undeclared column
    /// * `TableError::KindMismatch` - a value does not fit its column
    pub fn insert<I, S>(&mut self, key: RowKey, values: I) -> Result<(), TableError>
    where
        I: IntoIterator<Item = (S, MetricValue)>,
        S: AsRef<str>,
    {
        self.check_key(&key)?;
        if self.index.contains_key(&key) {
            return Err(TableError::DuplicateRow(key.to_string()));
        }

        let mut row = vec![MetricValue::Null; self.columns.len()];
        for (name, value) in values {
            let i = self.column_index(name.as_ref())?;
            self.check_kind(i, &value)?;
            row[i] = value;
        }

        self.index.insert(key, self.rows.len());
        self.rows.push(Row { key, values: row });
        Ok(())
    }

    pub fn contains(&self, key: &RowKey) -> bool {
        self.index.contains_key(key)
    }

    pub fn get(&self, key: &RowKey, column: &str) -> Option<&MetricValue> {
        let i = self.columns.iter().position(|c| c.name == column)?;
        self.index.get(key).map(|&r| &self.rows[r].values[i])
    }

    /// Numeric cell value, `None` when absent, null or non-numeric
    pub fn number(&self, key: &RowKey, column: &str) -> Option<f64> {
        self.get(key, column).and_then(MetricValue::as_f64)
    }

    pub fn set(
        &mut self,
        key: &RowKey,
        column: &str,
        value: MetricValue,
    ) -> Result<(), TableError> {
        let i = self.column_index(column)?;
        self.check_kind(i, &value)?;
        let r = *self
            .index
            .get(key)
            .ok_or_else(|| TableError::UnknownRow(key.to_string()))?;
        self.rows[r].values[i] = value;
        Ok(())
    }

    pub fn row(&self, key: &RowKey) -> Option<RowRef<'_>> {
        self.index.get(key).map(|&r| self.row_ref(r))
    }

    fn row_ref(&self, r: usize) -> RowRef<'_> {
        RowRef {
            key: &self.rows[r].key,
            values: &self.rows[r].values,
            columns: &self.columns,
        }
    }

    /// Rows in insertion order
    pub fn rows(&self) -> impl Iterator<Item = RowRef<'_>> + '_ {
        (0..self.rows.len()).map(move |r| self.row_ref(r))
    }

    pub fn keys(&self) -> impl Iterator<Item = &RowKey> + '_ {
        self.rows.iter().map(|r| &r.key)
    }

    /// Distinct nodes referenced by the table, in first-seen order
    pub fn nodes(&self) -> Vec<NodeId> {
        let mut seen = HashSet::new();
        self.rows
            .iter()
            .map(|r| r.key.node)
            .filter(|n| seen.insert(*n))
            .collect()
    }

    /// Distinct (rank, thread) slices, in first-seen order
    pub fn slices(&self) -> Vec<(Option<u32>, Option<u32>)> {
        let mut seen = HashSet::new();
        self.rows
            .iter()
            .map(|r| r.key.slice())
            .filter(|s| seen.insert(*s))
            .collect()
    }

    pub fn len(&self) -> usize {
        self.rows.len()
    }

    pub fn is_empty(&self) -> bool {
        self.rows.is_empty()
    }

    /// Keep only rows accepted by `pred`
    pub fn retain<F>(&mut self, mut pred: F)
    where
        F: FnMut(RowRef<'_>) -> bool,
    {
        let columns = &self.columns;
        self.rows.retain(|row| {
            pred(RowRef {
                key: &row.key,
                values: &row.values,
                columns,
            })
        });
        self.rebuild_index();
    }

    /// Stable sort of the rows for display
    pub fn sort_by_key<K: Ord, F: FnMut(&RowKey) -> K>(&mut self, mut f: F) {
        self.rows.sort_by_key(|row| f(&row.key));
        self.rebuild_index();
    }

    fn rebuild_index(&mut self) {
        self.index = self
            .rows
            .iter()
            .enumerate()
            .map(|(i, row)| (row.key, i))
            .collect();
    }

    /// Move rows onto new node handles
    ///
    /// Rows whose node is absent from `map` are dropped. Rows landing on the
    /// same new key are merged: columns listed in `sum_columns` are summed,
    /// every other column keeps the first non-null value.
    pub fn reindex(
        &self,
        map: &HashMap<NodeId, NodeId>,
        sum_columns: &[String],
    ) -> Result<MetricTable, TableError> {
        let summed: Vec<bool> = self
            .columns
            .iter()
            .map(|c| sum_columns.contains(&c.name))
            .collect();
        for (spec, &sum) in self.columns.iter().zip(&summed) {
            if sum && spec.kind != ColumnKind::Numeric {
                return Err(TableError::NonNumericMetric(spec.name.clone()));
            }
        }

        let mut out = self.empty_like();
        let mut merged = 0usize;
        for row in &self.rows {
            let Some(&new_node) = map.get(&row.key.node) else {
                continue;
            };
            let key = row.key.with_node(new_node);
            match out.index.get(&key) {
                None => {
                    out.index.insert(key, out.rows.len());
                    out.rows.push(Row {
                        key,
                        values: row.values.clone(),
                    });
                }
                Some(&r) => {
                    merged += 1;
                    let target = &mut out.rows[r].values;
                    for (i, value) in row.values.iter().enumerate() {
                        target[i] = merge_cell(&target[i], value, summed[i]);
                    }
                }
            }
        }

        debug!(
            "Reindexed {} rows into {} ({} merged)",
            self.rows.len(),
            out.rows.len(),
            merged
        );
        Ok(out)
    }

    /// Collapse rank/thread levels into one row per node
    ///
    /// Columns in `metric_columns` are reduced with `aggregate` over their
    /// non-null values; other columns keep the first non-null value.
    pub fn group_by_node(
        &self,
        metric_columns: &[String],
        aggregate: Aggregate,
    ) -> Result<MetricTable, TableError> {
        let identity: HashMap<NodeId, NodeId> =
            self.nodes().into_iter().map(|n| (n, n)).collect();
        self.regroup(&identity, metric_columns, aggregate)
    }

    /// One row per target node of `map`, reducing every row mapped onto it
    ///
    /// All rank/thread rows of all mapped nodes form one group. Rows whose
    /// node is absent from `map` are dropped. Reduction follows
    /// [`MetricTable::group_by_node`].
    pub fn regroup(
        &self,
        map: &HashMap<NodeId, NodeId>,
        metric_columns: &[String],
        aggregate: Aggregate,
    ) -> Result<MetricTable, TableError> {
        let metric: Vec<bool> = self
            .columns
            .iter()
            .map(|c| metric_columns.contains(&c.name))
            .collect();
        for (spec, &m) in self.columns.iter().zip(&metric) {
            if m && spec.kind != ColumnKind::Numeric {
                return Err(TableError::NonNumericMetric(spec.name.clone()));
            }
        }

        let mut order: Vec<NodeId> = Vec::new();
        let mut groups: HashMap<NodeId, Vec<usize>> = HashMap::new();
        for (r, row) in self.rows.iter().enumerate() {
            let Some(&node) = map.get(&row.key.node) else {
                continue;
            };
            groups
                .entry(node)
                .or_insert_with(|| {
                    order.push(node);
                    Vec::new()
                })
                .push(r);
        }

        let mut out = MetricTable::new();
        out.columns = self.columns.clone();
        for node in order {
            let members = &groups[&node];
            let values = (0..self.columns.len())
                .map(|i| {
                    if metric[i] {
                        let nums: Vec<f64> = members
                            .iter()
                            .filter_map(|&r| self.rows[r].values[i].as_f64())
                            .collect();
                        if nums.is_empty() {
                            MetricValue::Null
                        } else {
                            MetricValue::Number(aggregate.apply(&nums))
                        }
                    } else {
                        members
                            .iter()
                            .map(|&r| &self.rows[r].values[i])
                            .find(|v| !v.is_null())
                            .cloned()
                            .unwrap_or_default()
                    }
                })
                .collect();
            let key = RowKey::node(node);
            out.index.insert(key, out.rows.len());
            out.rows.push(Row { key, values });
        }

        debug!(
            "Grouped {} rows into {} rows",
            self.rows.len(),
            out.rows.len()
        );
        Ok(out)
    }
}

fn merge_cell(current: &MetricValue, incoming: &MetricValue, sum: bool) -> MetricValue {
    match (current, incoming) {
        (MetricValue::Number(a), MetricValue::Number(b)) if sum => MetricValue::Number(a + b),
        (MetricValue::Null, other) => other.clone(),
        (kept, _) => kept.clone(),
    }
}
