//! Tabular companion of the call graph.
//!
//! Rows are keyed by node handle and, optionally, rank and thread. Columns are
//! declared up front with a kind and every insert is checked against it.

pub mod index;
pub mod metric_table;
pub mod value;

pub use index::{IndexLevel, RowKey};
pub use metric_table::{Aggregate, MetricTable, RowRef};
pub use value::{ColumnKind, ColumnSpec, MetricValue};
