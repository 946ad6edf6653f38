//! Callgraph Frame
//!
//! A call graph of profiled program locations paired with a table of
//! per-node performance metrics, plus the algebra over the pair: traversal,
//! filtering with structural squashing, sibling normalization, inclusive
//! and exclusive metric derivation, graph union and node-by-node
//! arithmetic between two profiles.
//!
//! This crate provides the core implementation for the `cgframe` CLI tool.
//!
//! ## Getting Started
//!
//! ```
//! use callgraph_frame::graph::ListNode;
//! use callgraph_frame::graphframe::GraphFrame;
//!
//! let left = GraphFrame::from_lists(&[ListNode::branch("main", vec!["solve".into()])]).unwrap();
//! let right = GraphFrame::from_lists(&[ListNode::branch("main", vec!["io".into()])]).unwrap();
//! let diff = left.sub(&right).unwrap();
//! assert_eq!(diff.graph().len(), 3);
//! ```

pub mod commands;
pub mod flamegraph;
pub mod graph;
pub mod graphframe;
pub mod output;
pub mod table;
pub mod utils;
