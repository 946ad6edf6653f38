//! Quick construction of graph frames from bare graphs.

use super::GraphFrame;
use crate::graph::{Graph, ListNode, Order};
use crate::table::{ColumnSpec, MetricTable, MetricValue, RowKey};
use crate::utils::config::{DEFAULT_METRIC, NAME_COLUMN};
use crate::utils::error::FrameError;

impl GraphFrame {
    /// Frame over a graph built from nested lists, every node timed at 1
    ///
    /// # Example
    /// ```
    /// use callgraph_frame::graph::ListNode;
    /// use callgraph_frame::graphframe::GraphFrame;
    ///
    /// let gf = GraphFrame::from_lists(&[ListNode::branch("a", vec!["b".into()])]).unwrap();
    /// assert_eq!(gf.table().len(), 2);
    /// ```
    pub fn from_lists(roots: &[ListNode]) -> Result<GraphFrame, FrameError> {
        let graph = Graph::from_lists(roots)?;
        Self::from_graph(graph)
    }

    /// Frame over an existing graph: a `name` column, `time` = 1 for every
    /// reachable node and the derived inclusive time
    pub fn from_graph(mut graph: Graph) -> Result<GraphFrame, FrameError> {
        graph.enumerate_traverse();

        let mut table = MetricTable::new();
        table.add_column(ColumnSpec::text(NAME_COLUMN))?;
        table.add_column(ColumnSpec::numeric(DEFAULT_METRIC))?;

        for id in graph.traverse(Order::Pre) {
            let name = graph
                .frame(id)
                .map(|f| f.name().map(str::to_string).unwrap_or_else(|| f.to_string()))
                .unwrap_or_default();
            table.insert(
                RowKey::node(id),
                [
                    (NAME_COLUMN, MetricValue::Text(name)),
                    (DEFAULT_METRIC, MetricValue::Number(1.0)),
                ],
            )?;
        }

        let mut gf = GraphFrame::new(graph, table, vec![DEFAULT_METRIC.to_string()], vec![], None)?;
        gf.calculate_inclusive_metrics()?;
        Ok(gf)
    }
}
