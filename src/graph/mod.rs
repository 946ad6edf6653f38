//! Call graph model: frames, nodes and the graph arena.
//!
//! Nodes are stored in an arena owned by [`Graph`] and addressed by
//! [`NodeId`]. Every structural operation returns a fresh graph, so a graph
//! shared between several frames is never mutated behind their backs.

pub mod frame;
#[allow(clippy::module_inception)]
pub mod graph;
pub mod node;

pub use frame::{AttrFloat, AttrValue, Frame};
pub use graph::{Graph, GraphUnion, ListNode, Remapped};
pub use node::{Node, NodeId, Order, Traverse};
