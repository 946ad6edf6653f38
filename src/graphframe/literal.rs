//! The literal form: a plain nested structure of frames, metrics and
//! children, used as a fixture format and as the interchange format.
//!
//! Shared nodes and cycle back-edges are written once in full; later
//! occurrences carry `duplicate: true`, no children, and the `_nid` of the
//! node they refer to.

use super::GraphFrame;
use crate::graph::{AttrValue, Frame, Graph, NodeId};
use crate::table::{ColumnKind, ColumnSpec, IndexLevel, MetricTable, MetricValue, RowKey};
use crate::utils::config::{DEFAULT_FRAME_TYPE, INCLUSIVE_MARKER, NAME_COLUMN, NID_KEY};
use crate::utils::error::LiteralError;
use log::debug;
use serde::{Deserialize, Serialize};
use std::collections::{BTreeMap, HashMap, HashSet};

/// One node of the literal form
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
pub struct LiteralNode {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub name: Option<String>,

    #[serde(rename = "type", default, skip_serializing_if = "Option::is_none")]
    pub node_type: Option<String>,

    /// Full frame attributes; when empty the frame is built from `name` and `type`
    #[serde(default, skip_serializing_if = "BTreeMap::is_empty")]
    pub frame: BTreeMap<String, AttrValue>,

    #[serde(default)]
    pub metrics: BTreeMap<String, MetricValue>,

    #[serde(default, skip_serializing_if = "BTreeMap::is_empty")]
    pub attributes: BTreeMap<String, MetricValue>,

    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub children: Vec<LiteralNode>,

    #[serde(default, skip_serializing_if = "std::ops::Not::not")]
    pub duplicate: bool,
}

impl LiteralNode {
    pub fn named(name: impl Into<String>) -> Self {
        Self {
            name: Some(name.into()),
            ..Self::default()
        }
    }

    pub fn with_metric(mut self, name: impl Into<String>, value: impl Into<MetricValue>) -> Self {
        self.metrics.insert(name.into(), value.into());
        self
    }

    pub fn with_children(mut self, children: Vec<LiteralNode>) -> Self {
        self.children = children;
        self
    }

    fn frame(&self) -> Result<Frame, LiteralError> {
        if !self.frame.is_empty() {
            return Ok(Frame::new(self.frame.clone())?);
        }
        let name = self
            .name
            .as_deref()
            .ok_or_else(|| LiteralError::InvalidNode("node has neither frame nor name".to_string()))?;
        Ok(Frame::from_pairs([
            ("name", name),
            ("type", self.node_type.as_deref().unwrap_or(DEFAULT_FRAME_TYPE)),
        ])?)
    }

    fn nid(&self) -> Option<i64> {
        self.metrics
            .get(NID_KEY)
            .and_then(MetricValue::as_f64)
            .map(|v| v as i64)
    }
}

/// Columns seen while reading, in first-seen order
#[derive(Default)]
struct Schema {
    columns: Vec<ColumnSpec>,
    typed: Vec<bool>,
    seen: HashMap<String, usize>,
}

impl Schema {
    fn observe(&mut self, name: &str, value: &MetricValue) {
        let i = match self.seen.get(name) {
            Some(&i) => i,
            None => {
                self.seen.insert(name.to_string(), self.columns.len());
                self.columns.push(ColumnSpec::numeric(name));
                self.typed.push(false);
                self.columns.len() - 1
            }
        };
        // a column seen only as null so far takes the first concrete kind
        if !self.typed[i] {
            if let Some(kind) = value.kind() {
                self.columns[i].kind = kind;
                self.typed[i] = true;
            }
        }
    }
}

struct LiteralReader {
    graph: Graph,
    rows: Vec<(NodeId, String, BTreeMap<String, MetricValue>)>,
    by_nid: HashMap<i64, NodeId>,
    by_frame: HashMap<Frame, NodeId>,
    metrics: Schema,
    attributes: Schema,
}

impl LiteralReader {
    fn new() -> Self {
        Self {
            graph: Graph::new(),
            rows: Vec::new(),
            by_nid: HashMap::new(),
            by_frame: HashMap::new(),
            metrics: Schema::default(),
            attributes: Schema::default(),
        }
    }

    fn attach(&mut self, parent: Option<NodeId>, id: NodeId) -> Result<(), LiteralError> {
        match parent {
            Some(p) => self.graph.add_child(p, id)?,
            None => {
                if !self.graph.roots().contains(&id) {
                    self.graph.push_root(id)?;
                }
            }
        }
        Ok(())
    }

    fn visit(&mut self, literal: &LiteralNode, parent: Option<NodeId>) -> Result<(), LiteralError> {
        let frame = literal.frame()?;

        let existing = if literal.duplicate {
            literal
                .nid()
                .and_then(|nid| self.by_nid.get(&nid))
                .or_else(|| self.by_frame.get(&frame))
                .copied()
        } else {
            None
        };

        let id = match existing {
            Some(id) => id,
            None => {
                let name = frame
                    .name()
                    .map(str::to_string)
                    .or_else(|| literal.name.clone())
                    .unwrap_or_else(|| frame.to_string());
                let id = self.graph.add_node(frame.clone());
                if let Some(nid) = literal.nid() {
                    self.by_nid.insert(nid, id);
                }
                self.by_frame.insert(frame, id);

                let mut values = BTreeMap::new();
                for (key, value) in &literal.metrics {
                    if key == NID_KEY {
                        continue;
                    }
                    self.metrics.observe(key, value);
                    values.insert(key.clone(), value.clone());
                }
                for (key, value) in &literal.attributes {
                    self.attributes.observe(key, value);
                    values.insert(key.clone(), value.clone());
                }
                self.rows.push((id, name, values));
                id
            }
        };

        self.attach(parent, id)?;
        for child in &literal.children {
            self.visit(child, Some(id))?;
        }
        Ok(())
    }

    fn finish(
        mut self,
        lists: Option<(Vec<String>, Vec<String>)>,
    ) -> Result<GraphFrame, LiteralError> {
        self.graph.enumerate_traverse();

        let mut table = MetricTable::new();
        table.add_column(ColumnSpec::text(NAME_COLUMN))?;
        for spec in self.metrics.columns.iter().chain(&self.attributes.columns) {
            if spec.name != NAME_COLUMN {
                table.ensure_column(spec.clone())?;
            }
        }

        let (exc_metrics, inc_metrics) = match lists {
            Some(lists) => lists,
            None => {
                let mut exc = Vec::new();
                let mut inc = Vec::new();
                for spec in &self.metrics.columns {
                    if spec.kind != ColumnKind::Numeric {
                        continue;
                    }
                    if spec.name.contains(INCLUSIVE_MARKER) {
                        inc.push(spec.name.clone());
                    } else {
                        exc.push(spec.name.clone());
                    }
                }
                (exc, inc)
            }
        };

        for (id, name, values) in self.rows {
            let mut cells: Vec<(String, MetricValue)> = values
                .into_iter()
                .filter(|(k, _)| k != NAME_COLUMN)
                .collect();
            cells.push((NAME_COLUMN.to_string(), MetricValue::Text(name)));
            table.insert(RowKey::node(id), cells)?;
        }

        debug!(
            "Read literal with {} nodes and {} rows",
            self.graph.len(),
            table.len()
        );
        Ok(GraphFrame::new(
            self.graph,
            table,
            exc_metrics,
            inc_metrics,
            None,
        )?)
    }
}

impl GraphFrame {
    /// Build a frame from literal roots
    ///
    /// Numeric metrics whose name contains `(inc)` are inclusive, other
    /// numeric metrics exclusive; text and bool metrics become plain columns.
    ///
    /// # Errors
    /// * `LiteralError::NoRoots` - empty input
    /// * `LiteralError::InvalidNode` - a node with neither `frame` nor `name`
    /// * `LiteralError::Table` - a metric changes kind between nodes
    pub fn from_literal(roots: &[LiteralNode]) -> Result<GraphFrame, LiteralError> {
        Self::read_literal(roots, None)
    }

    /// Build a frame from literal roots with explicit metric lists
    pub fn from_literal_with_metrics(
        roots: &[LiteralNode],
        exc_metrics: Vec<String>,
        inc_metrics: Vec<String>,
    ) -> Result<GraphFrame, LiteralError> {
        Self::read_literal(roots, Some((exc_metrics, inc_metrics)))
    }

    fn read_literal(
        roots: &[LiteralNode],
        lists: Option<(Vec<String>, Vec<String>)>,
    ) -> Result<GraphFrame, LiteralError> {
        if roots.is_empty() {
            return Err(LiteralError::NoRoots);
        }
        let mut reader = LiteralReader::new();
        for root in roots {
            reader.visit(root, None)?;
        }
        reader.finish(lists)
    }

    /// Literal form of the frame, using rank 0 / thread 0 rows when the
    /// table has those levels
    pub fn to_literal(&self) -> Vec<LiteralNode> {
        self.to_literal_at(0, 0)
    }

    /// Literal form of the frame for one rank/thread slice
    pub fn to_literal_at(&self, rank: u32, thread: u32) -> Vec<LiteralNode> {
        let table = self.table();
        let slice = (
            table.has_level(IndexLevel::Rank).then_some(rank),
            table.has_level(IndexLevel::Thread).then_some(thread),
        );
        let names = self.names_by_node();
        let metrics = self.show_metric_columns();
        let attributes: Vec<String> = table
            .columns()
            .iter()
            .map(|c| c.name.clone())
            .filter(|c| c != NAME_COLUMN && !metrics.contains(c))
            .collect();

        let writer = LiteralWriter {
            frame: self,
            slice,
            names,
            metrics,
            attributes,
        };
        let mut visited = HashSet::new();
        let mut roots = self.graph().roots().to_vec();
        roots.sort_by(|a, b| self.graph().frame(*a).cmp(&self.graph().frame(*b)));
        roots
            .into_iter()
            .map(|root| writer.node(root, &mut visited))
            .collect()
    }
}

struct LiteralWriter<'a> {
    frame: &'a GraphFrame,
    slice: (Option<u32>, Option<u32>),
    names: HashMap<NodeId, String>,
    metrics: Vec<String>,
    attributes: Vec<String>,
}

impl LiteralWriter<'_> {
    fn node(&self, id: NodeId, visited: &mut HashSet<NodeId>) -> LiteralNode {
        let graph = self.frame.graph();
        let table = self.frame.table();
        let key = RowKey {
            node: id,
            rank: self.slice.0,
            thread: self.slice.1,
        };

        let mut literal = LiteralNode {
            name: Some(
                self.names
                    .get(&id)
                    .cloned()
                    .unwrap_or_else(|| self.frame.node_name(id)),
            ),
            frame: graph
                .frame(id)
                .map(|f| f.attrs().clone())
                .unwrap_or_default(),
            ..LiteralNode::default()
        };

        for metric in &self.metrics {
            if let Some(value) = table.get(&key, metric).filter(|v| !v.is_null()) {
                literal.metrics.insert(metric.clone(), value.clone());
            }
        }
        if let Some(nid) = graph.get(id).and_then(|n| n.nid()) {
            literal
                .metrics
                .insert(NID_KEY.to_string(), MetricValue::Number(nid as f64));
        }
        for column in &self.attributes {
            if let Some(value) = table.get(&key, column).filter(|v| !v.is_null()) {
                literal.attributes.insert(column.clone(), value.clone());
            }
        }

        if !visited.insert(id) {
            literal.duplicate = true;
            return literal;
        }

        literal.children = graph
            .sorted_children(id)
            .into_iter()
            .map(|child| self.node(child, visited))
            .collect();
        literal
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn roots(value: serde_json::Value) -> Vec<LiteralNode> {
        serde_json::from_value(value).unwrap()
    }

    #[test]
    fn test_frame_from_name_and_type() {
        let literal = LiteralNode::named("main");
        let frame = literal.frame().unwrap();
        assert_eq!(frame.name(), Some("main"));
        assert_eq!(frame.get("type"), Some(&AttrValue::from("None")));
    }

    #[test]
    fn test_node_without_name_or_frame() {
        let bad = vec![LiteralNode::default().with_metric("time", 1.0)];
        assert!(matches!(
            GraphFrame::from_literal(&bad),
            Err(LiteralError::InvalidNode(_))
        ));
        assert!(matches!(
            GraphFrame::from_literal(&[]),
            Err(LiteralError::NoRoots)
        ));
    }

    #[test]
    fn test_metric_classification() {
        let gf = GraphFrame::from_literal(&roots(json!([
            {"name": "A", "metrics": {"time (inc)": 3.0, "time": 1.0, "module": "main"},
             "children": [
                {"name": "B", "metrics": {"time (inc)": 2.0, "time": 2.0, "module": "foo"}}
             ]}
        ])))
        .unwrap();
        assert_eq!(gf.exc_metrics(), &["time".to_string()]);
        assert_eq!(gf.inc_metrics(), &["time (inc)".to_string()]);
        assert_eq!(gf.table().column("module").map(|c| c.kind), Some(ColumnKind::Text));
        assert_eq!(gf.table().len(), 2);
    }

    #[test]
    fn test_duplicate_resolves_by_nid() {
        let gf = GraphFrame::from_literal(&roots(json!([
            {"name": "A", "metrics": {"time": 1.0, "_nid": 0},
             "children": [
                {"name": "B", "metrics": {"time": 1.0, "_nid": 1},
                 "children": [{"name": "D", "metrics": {"time": 1.0, "_nid": 2}}]},
                {"name": "C", "metrics": {"time": 1.0, "_nid": 3},
                 "children": [{"name": "D", "metrics": {"time": 1.0, "_nid": 2}, "duplicate": true}]}
             ]}
        ])))
        .unwrap();
        assert_eq!(gf.graph().len(), 4);
        assert_eq!(gf.table().len(), 4);
        assert!(!gf.graph().is_tree());
        assert!(!gf.table().has_column(NID_KEY));
    }

    #[test]
    fn test_to_literal_marks_shared_node_once() {
        let gf = GraphFrame::from_literal(&roots(json!([
            {"name": "A", "metrics": {"time": 1.0, "_nid": 0},
             "children": [
                {"name": "B", "metrics": {"time": 1.0, "_nid": 1},
                 "children": [{"name": "D", "metrics": {"time": 1.0, "_nid": 2}}]},
                {"name": "C", "metrics": {"time": 1.0, "_nid": 3},
                 "children": [{"name": "D", "metrics": {"time": 1.0, "_nid": 2}, "duplicate": true}]}
             ]}
        ])))
        .unwrap();

        let literal = gf.to_literal();
        let c = &literal[0].children[1];
        assert_eq!(c.name.as_deref(), Some("C"));
        assert!(c.children[0].duplicate);
        assert!(c.children[0].children.is_empty());

        let back = GraphFrame::from_literal(&literal).unwrap();
        assert!(back.graph().equals(gf.graph()));
    }

    #[test]
    fn test_cycle_round_trip() {
        let mut graph = Graph::new();
        let a = graph.add_root(Frame::named("a"));
        let b = graph.add_node(Frame::named("b"));
        graph.add_child(a, b).unwrap();
        graph.add_child(b, a).unwrap();
        let gf = GraphFrame::from_graph(graph).unwrap();

        let literal = gf.to_literal();
        assert!(literal[0].children[0].children[0].duplicate);

        let back = GraphFrame::from_literal(&literal).unwrap();
        assert!(back.graph().equals(gf.graph()));
        assert!(back.graph().check_acyclic().is_err());
    }
}
