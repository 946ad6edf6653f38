//! Nodes and depth-first traversal.
//!
//! Nodes live in a [`Graph`](super::Graph) arena and refer to each other by
//! [`NodeId`] handles. Child lists carry the edges; parent lists are
//! back-references used only for lookups such as "find callers".

use super::frame::Frame;
use super::graph::Graph;
use serde::{Deserialize, Serialize};
use std::fmt;

/// Stable handle of a node inside its graph arena
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub struct NodeId(pub(crate) usize);

impl NodeId {
    pub fn index(self) -> usize {
        self.0
    }
}

impl fmt::Display for NodeId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "#{}", self.0)
    }
}

/// A vertex in the call graph
#[derive(Debug, Clone)]
pub struct Node {
    frame: Frame,
    pub(crate) parents: Vec<NodeId>,
    pub(crate) children: Vec<NodeId>,
    pub(crate) nid: Option<usize>,
    pub(crate) depth: Option<usize>,
}

impl Node {
    pub(crate) fn new(frame: Frame) -> Self {
        Self {
            frame,
            parents: Vec::new(),
            children: Vec::new(),
            nid: None,
            depth: None,
        }
    }

    pub fn frame(&self) -> &Frame {
        &self.frame
    }

    pub fn children(&self) -> &[NodeId] {
        &self.children
    }

    pub fn parents(&self) -> &[NodeId] {
        &self.parents
    }

    /// Graph-local identity assigned by `Graph::enumerate_traverse`
    pub fn nid(&self) -> Option<usize> {
        self.nid
    }

    /// Minimum distance from any root, assigned by `Graph::enumerate_traverse`
    pub fn depth(&self) -> Option<usize> {
        self.depth
    }
}

/// Depth-first visiting order
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum Order {
    /// Parents before their subtrees
    Pre,
    /// Subtrees before their parents
    #[default]
    Post,
}

/// Lazy depth-first walk over a graph
///
/// Every node is yielded at most once; a node already visited in this walk is
/// never re-entered, so recursive call graphs terminate.
#[derive(Debug)]
pub struct Traverse<'g> {
    graph: &'g Graph,
    order: Order,
    starts: std::vec::IntoIter<NodeId>,
    visited: Vec<bool>,
    // (node, index of the next child to look at)
    stack: Vec<(NodeId, usize)>,
}

impl<'g> Traverse<'g> {
    pub(crate) fn new(graph: &'g Graph, starts: Vec<NodeId>, order: Order) -> Self {
        Self {
            graph,
            order,
            starts: starts.into_iter(),
            visited: vec![false; graph.arena_len()],
            stack: Vec::new(),
        }
    }

    fn mark(&mut self, id: NodeId) -> bool {
        match self.visited.get_mut(id.0) {
            Some(seen) if !*seen => {
                *seen = true;
                true
            }
            _ => false,
        }
    }

    fn next_pre(&mut self) -> Option<NodeId> {
        let graph = self.graph;
        loop {
            while let Some((id, _)) = self.stack.pop() {
                if !self.mark(id) {
                    continue;
                }
                if let Some(node) = graph.get(id) {
                    for child in node.children.iter().rev() {
                        self.stack.push((*child, 0));
                    }
                }
                return Some(id);
            }
            let start = self.starts.next()?;
            self.stack.push((start, 0));
        }
    }

    fn next_post(&mut self) -> Option<NodeId> {
        let graph = self.graph;
        loop {
            while let Some(top) = self.stack.last_mut() {
                let (id, cursor) = *top;
                let children = graph.get(id).map(|n| n.children()).unwrap_or(&[]);
                if cursor < children.len() {
                    top.1 += 1;
                    let child = children[cursor];
                    if self.mark(child) {
                        self.stack.push((child, 0));
                    }
                } else {
                    self.stack.pop();
                    return Some(id);
                }
            }
            let start = self.starts.next()?;
            if self.mark(start) {
                self.stack.push((start, 0));
            }
        }
    }
}

impl Iterator for Traverse<'_> {
    type Item = NodeId;

    fn next(&mut self) -> Option<NodeId> {
        match self.order {
            Order::Pre => self.next_pre(),
            Order::Post => self.next_post(),
        }
    }
}
