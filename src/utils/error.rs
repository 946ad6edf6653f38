//! Error types for the entire library.
//!
//! We use `thiserror` for library-style errors with custom types,
//! and `anyhow` for application-level error propagation in main.rs and commands.

use crate::graph::NodeId;
use thiserror::Error;

/// Errors raised while building or walking a call graph
#[derive(Error, Debug)]
pub enum GraphError {
    #[error("Unknown node handle: {0}")]
    UnknownNode(NodeId),

    #[error("Frame must be constructed with at least one attribute")]
    EmptyFrame,

    #[error("Invalid list literal: {0}")]
    InvalidLists(String),

    #[error("Cycle detected at node {node} {frame}")]
    CycleDetected { node: NodeId, frame: String },
}

/// Errors raised by metric table operations
#[derive(Error, Debug)]
pub enum TableError {
    #[error("Unknown column: {0}")]
    UnknownColumn(String),

    #[error("Column already exists: {0}")]
    DuplicateColumn(String),

    #[error("Duplicate row for {0}")]
    DuplicateRow(String),

    #[error("No row for {0}")]
    UnknownRow(String),

    #[error("Row key {key} does not match index levels {levels}")]
    IndexMismatch { key: String, levels: String },

    #[error("Column '{column}' expects {expected} values, got {found}")]
    KindMismatch {
        column: String,
        expected: String,
        found: String,
    },

    #[error("Row references node {node} {frame} which is not reachable in the graph")]
    MissingNode { node: NodeId, frame: String },

    #[error("Column '{column}' has kind {left} on the left and {right} on the right")]
    IncompatibleColumns {
        column: String,
        left: String,
        right: String,
    },

    #[error("Metric column '{0}' is not numeric")]
    NonNumericMetric(String),
}

/// Errors raised by composite (graph + table) operations
#[derive(Error, Debug)]
pub enum FrameError {
    #[error("Graph error: {0}")]
    Graph(#[from] GraphError),

    #[error("Table error: {0}")]
    Table(#[from] TableError),

    #[error("A graph frame requires at least one exclusive or inclusive metric")]
    MissingMetrics,

    #[error("Unknown metric: {0}")]
    UnknownMetric(String),

    #[error("The provided filter would have produced an empty graph frame")]
    EmptyFilter,

    #[error("No row for node {node} {frame}")]
    MissingRow { node: NodeId, frame: String },
}

/// Errors raised while reading or producing literal graphs
#[derive(Error, Debug)]
pub enum LiteralError {
    #[error("JSON deserialization failed: {0}")]
    JsonError(#[from] serde_json::Error),

    #[error("Invalid literal node: {0}")]
    InvalidNode(String),

    #[error("Literal must contain at least one root")]
    NoRoots,

    #[error(transparent)]
    Graph(#[from] GraphError),

    #[error(transparent)]
    Table(#[from] TableError),

    #[error(transparent)]
    Frame(#[from] FrameError),
}

/// Errors that can occur during flamegraph generation
#[derive(Error, Debug)]
pub enum FlamegraphError {
    #[error("Empty stack data")]
    EmptyStacks,

    #[error("Flamegraph rendering failed: {0}")]
    Render(String),

    #[error("IO error: {0}")]
    IoError(#[from] std::io::Error),
}

/// Errors that can occur during file output
#[derive(Error, Debug)]
pub enum OutputError {
    #[error("Failed to write file: {0}")]
    WriteFailed(#[from] std::io::Error),

    #[error("Failed to serialize JSON: {0}")]
    SerializationFailed(#[from] serde_json::Error),

    #[error("Invalid output path: {0}")]
    InvalidPath(String),

    #[error("Unsupported document version: {0}")]
    UnsupportedVersion(String),

    #[error("Invalid literal document: {0}")]
    Literal(#[from] LiteralError),

    #[error("Flamegraph output failed: {0}")]
    Flamegraph(#[from] FlamegraphError),
}
