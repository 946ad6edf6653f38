//! The call graph: an arena of nodes plus an ordered root set.
//!
//! Structural operations (`copy`, `union`, `squash`, `normalize`) never touch
//! the input graph; they build a fresh arena and hand back the mapping from
//! old handles to new ones so metric tables can follow.

use super::frame::Frame;
use super::node::{Node, NodeId, Order, Traverse};
use crate::utils::error::GraphError;
use log::{debug, warn};
use std::cmp::Ordering;
use std::collections::{HashMap, HashSet, VecDeque};

/// A possibly multi-rooted tree or DAG built from one input dataset
#[derive(Debug, Clone, Default)]
pub struct Graph {
    nodes: Vec<Node>,
    roots: Vec<NodeId>,
    // pre-order enumeration, valid until the next structural mutation
    enumeration: Vec<NodeId>,
    enumerated: bool,
}

/// A graph produced from another graph, with the handle mapping
#[derive(Debug, Clone)]
pub struct Remapped {
    pub graph: Graph,
    pub old_to_new: HashMap<NodeId, NodeId>,
}

/// The structural union of two graphs
#[derive(Debug, Clone)]
pub struct GraphUnion {
    pub graph: Graph,
    /// Handles of the left input mapped into the union
    pub left: HashMap<NodeId, NodeId>,
    /// Handles of the right input mapped into the union
    pub right: HashMap<NodeId, NodeId>,
}

/// Nested list literal for quickly building graphs
///
/// `Existing` reuses a node already present in the graph being built, which is
/// how shared sub-DAGs are expressed.
#[derive(Debug, Clone)]
pub enum ListNode {
    Name(String),
    Branch(String, Vec<ListNode>),
    Existing(NodeId),
}

impl ListNode {
    pub fn leaf(name: impl Into<String>) -> Self {
        ListNode::Name(name.into())
    }

    pub fn branch(name: impl Into<String>, children: Vec<ListNode>) -> Self {
        ListNode::Branch(name.into(), children)
    }
}

impl From<&str> for ListNode {
    fn from(name: &str) -> Self {
        ListNode::Name(name.to_string())
    }
}

impl Graph {
    pub fn new() -> Self {
        Self::default()
    }

    /// Build a graph whose roots are the given list literals, enumerated
    pub fn from_lists(roots: &[ListNode]) -> Result<Self, GraphError> {
        let mut graph = Graph::new();
        for root in roots {
            let id = graph.add_lists(root)?;
            graph.push_root(id)?;
        }
        graph.enumerate_traverse();
        Ok(graph)
    }

    /// Add the hierarchy described by `list` and return its top node
    ///
    /// The new top node is not registered as a root.
    pub fn add_lists(&mut self, list: &ListNode) -> Result<NodeId, GraphError> {
        match list {
            ListNode::Name(name) => Ok(self.add_node(Frame::named(name.as_str()))),
            ListNode::Branch(name, children) => {
                let id = self.add_node(Frame::named(name.as_str()));
                for child in children {
                    let child_id = self.add_lists(child)?;
                    self.add_child(id, child_id)?;
                }
                Ok(id)
            }
            ListNode::Existing(id) => {
                self.node(*id)?;
                Ok(*id)
            }
        }
    }

    /// Allocate a detached node
    pub fn add_node(&mut self, frame: Frame) -> NodeId {
        let id = NodeId(self.nodes.len());
        self.nodes.push(Node::new(frame));
        self.enumerated = false;
        id
    }

    /// Allocate a node and register it as a root
    pub fn add_root(&mut self, frame: Frame) -> NodeId {
        let id = self.add_node(frame);
        self.roots.push(id);
        id
    }

    pub fn push_root(&mut self, id: NodeId) -> Result<(), GraphError> {
        self.node(id)?;
        self.roots.push(id);
        self.enumerated = false;
        Ok(())
    }

    /// Append `child` to `parent`'s children and record the back-reference
    ///
    /// Not idempotent: adding the same edge twice creates a parallel edge.
    pub fn add_child(&mut self, parent: NodeId, child: NodeId) -> Result<(), GraphError> {
        self.node(parent)?;
        self.node(child)?;
        self.link(parent, child);
        Ok(())
    }

    /// Remove one `parent -> child` edge together with its back-reference
    ///
    /// Returns false if the edge did not exist.
    pub fn remove_child(&mut self, parent: NodeId, child: NodeId) -> Result<bool, GraphError> {
        self.node(parent)?;
        self.node(child)?;

        let children = &mut self.nodes[parent.0].children;
        let Some(pos) = children.iter().position(|c| *c == child) else {
            return Ok(false);
        };
        children.remove(pos);

        let parents = &mut self.nodes[child.0].parents;
        if let Some(pos) = parents.iter().position(|p| *p == parent) {
            parents.remove(pos);
        }
        self.enumerated = false;
        Ok(true)
    }

    fn link(&mut self, parent: NodeId, child: NodeId) {
        self.nodes[parent.0].children.push(child);
        self.nodes[child.0].parents.push(parent);
        self.enumerated = false;
    }

    fn link_unique(&mut self, parent: NodeId, child: NodeId) {
        if !self.nodes[parent.0].children.contains(&child) {
            self.link(parent, child);
        }
    }

    pub fn get(&self, id: NodeId) -> Option<&Node> {
        self.nodes.get(id.0)
    }

    pub fn node(&self, id: NodeId) -> Result<&Node, GraphError> {
        self.get(id).ok_or(GraphError::UnknownNode(id))
    }

    pub fn frame(&self, id: NodeId) -> Option<&Frame> {
        self.get(id).map(Node::frame)
    }

    /// Human-readable description of a node for error messages
    pub fn describe(&self, id: NodeId) -> String {
        self.frame(id)
            .map(|f| f.to_string())
            .unwrap_or_else(|| "<unknown>".to_string())
    }

    pub fn roots(&self) -> &[NodeId] {
        &self.roots
    }

    pub(crate) fn arena_len(&self) -> usize {
        self.nodes.len()
    }

    /// Depth-first walk from all roots in root order, visiting each node once
    pub fn traverse(&self, order: Order) -> Traverse<'_> {
        Traverse::new(self, self.roots.clone(), order)
    }

    /// Depth-first walk of everything reachable from `start`
    pub fn traverse_from(&self, start: NodeId, order: Order) -> Traverse<'_> {
        Traverse::new(self, vec![start], order)
    }

    /// Subtree walk of one node, children before the node itself
    pub fn traverse_node(&self, start: NodeId) -> Traverse<'_> {
        self.traverse_from(start, Order::default())
    }

    /// Number of nodes reachable from the roots
    pub fn len(&self) -> usize {
        self.traverse(Order::Pre).count()
    }

    pub fn is_empty(&self) -> bool {
        self.roots.is_empty()
    }

    /// Reachability flags indexed by arena slot
    pub fn reachable(&self) -> Vec<bool> {
        let mut flags = vec![false; self.nodes.len()];
        for id in self.traverse(Order::Pre) {
            flags[id.0] = true;
        }
        flags
    }

    /// True if there is a single root and every other node has exactly one parent
    pub fn is_tree(&self) -> bool {
        if self.roots.len() != 1 {
            return false;
        }
        let mut incoming = vec![0usize; self.nodes.len()];
        for id in self.traverse(Order::Pre) {
            for child in &self.nodes[id.0].children {
                incoming[child.0] += 1;
            }
        }
        self.traverse(Order::Pre).all(|id| {
            let expected = if id == self.roots[0] { 0 } else { 1 };
            incoming[id.0] == expected
        })
    }

    /// Fail with the first node that closes a cycle
    pub fn check_acyclic(&self) -> Result<(), GraphError> {
        // 0 = unseen, 1 = on the current path, 2 = finished
        let mut state = vec![0u8; self.nodes.len()];
        for &root in &self.roots {
            if state[root.0] != 0 {
                continue;
            }
            state[root.0] = 1;
            let mut stack = vec![(root, 0usize)];
            while let Some(top) = stack.last_mut() {
                let (id, cursor) = *top;
                let children = &self.nodes[id.0].children;
                if cursor < children.len() {
                    top.1 += 1;
                    let child = children[cursor];
                    match state[child.0] {
                        0 => {
                            state[child.0] = 1;
                            stack.push((child, 0));
                        }
                        1 => {
                            return Err(GraphError::CycleDetected {
                                node: child,
                                frame: self.describe(child),
                            })
                        }
                        _ => {}
                    }
                } else {
                    state[id.0] = 2;
                    stack.pop();
                }
            }
        }
        Ok(())
    }

    /// Assign pre-order ids and minimum root distances to reachable nodes
    ///
    /// Deterministic for a given root order and child insertion order, so
    /// calling it again without mutation reproduces the same assignment.
    pub fn enumerate_traverse(&mut self) {
        let order: Vec<NodeId> = self.traverse(Order::Pre).collect();

        for node in &mut self.nodes {
            node.nid = None;
            node.depth = None;
        }
        for (i, id) in order.iter().enumerate() {
            self.nodes[id.0].nid = Some(i);
        }

        let mut queue = VecDeque::new();
        for &root in &self.roots {
            if self.nodes[root.0].depth.is_none() {
                self.nodes[root.0].depth = Some(0);
                queue.push_back(root);
            }
        }
        while let Some(id) = queue.pop_front() {
            let depth = self.nodes[id.0].depth.unwrap_or(0);
            for i in 0..self.nodes[id.0].children.len() {
                let child = self.nodes[id.0].children[i];
                if self.nodes[child.0].depth.is_none() {
                    self.nodes[child.0].depth = Some(depth + 1);
                    queue.push_back(child);
                }
            }
        }

        debug!("Enumerated {} reachable nodes", order.len());
        self.enumeration = order;
        self.enumerated = true;
    }

    pub fn is_enumerated(&self) -> bool {
        self.enumerated
    }

    /// Look a node up by its enumeration id
    pub fn node_by_nid(&self, nid: usize) -> Option<NodeId> {
        if !self.enumerated {
            return None;
        }
        self.enumeration.get(nid).copied()
    }

    fn sorted_by_frame(&self, ids: &[NodeId]) -> Vec<NodeId> {
        let mut sorted = ids.to_vec();
        sorted.sort_by(|a, b| self.nodes[a.0].frame().cmp(self.nodes[b.0].frame()));
        sorted
    }

    /// Children of a node ordered by frame
    pub fn sorted_children(&self, id: NodeId) -> Vec<NodeId> {
        self.get(id)
            .map(|n| self.sorted_by_frame(&n.children))
            .unwrap_or_default()
    }

    /// Structural equality: frames and ordered-by-frame children must match
    /// under one consistent pairing of nodes
    pub fn equals(&self, other: &Graph) -> bool {
        if std::ptr::eq(self, other) {
            return true;
        }
        if self.roots.len() != other.roots.len() || self.len() != other.len() {
            return false;
        }

        let mut forward: HashMap<NodeId, NodeId> = HashMap::new();
        let mut backward: HashMap<NodeId, NodeId> = HashMap::new();
        let mut pending: Vec<(NodeId, NodeId)> = Vec::new();

        let left = self.sorted_by_frame(&self.roots);
        let right = other.sorted_by_frame(&other.roots);
        if !self.pair_lists(other, &left, &right, &mut forward, &mut backward, &mut pending) {
            return false;
        }

        while let Some((l, r)) = pending.pop() {
            let left = self.sorted_children(l);
            let right = other.sorted_children(r);
            if !self.pair_lists(other, &left, &right, &mut forward, &mut backward, &mut pending) {
                return false;
            }
        }
        true
    }

    fn pair_lists(
        &self,
        other: &Graph,
        left: &[NodeId],
        right: &[NodeId],
        forward: &mut HashMap<NodeId, NodeId>,
        backward: &mut HashMap<NodeId, NodeId>,
        pending: &mut Vec<(NodeId, NodeId)>,
    ) -> bool {
        if left.len() != right.len() {
            return false;
        }
        for (&l, &r) in left.iter().zip(right) {
            if self.nodes[l.0].frame() != other.nodes[r.0].frame() {
                return false;
            }
            match (forward.get(&l), backward.get(&r)) {
                (None, None) => {
                    forward.insert(l, r);
                    backward.insert(r, l);
                    pending.push((l, r));
                }
                (Some(&fr), Some(&bl)) if fr == r && bl == l => {}
                _ => return false,
            }
        }
        true
    }

    /// Compacting deep copy of the reachable part of the graph
    pub fn copy(&self) -> Remapped {
        let order: Vec<NodeId> = self.traverse(Order::Pre).collect();
        let mut graph = Graph::new();
        let mut old_to_new = HashMap::with_capacity(order.len());

        for &old in &order {
            old_to_new.insert(old, graph.add_node(self.nodes[old.0].frame().clone()));
        }
        for &old in &order {
            for child in &self.nodes[old.0].children {
                graph.link(old_to_new[&old], old_to_new[child]);
            }
        }
        graph.roots = self.roots.iter().map(|r| old_to_new[r]).collect();
        graph.enumerate_traverse();

        Remapped { graph, old_to_new }
    }

    /// Structural union of two graphs
    ///
    /// Children are matched by frame level by level; matching nodes collapse
    /// into one node of the result, unmatched nodes are carried over. The
    /// inputs are left untouched.
    pub fn union(&self, other: &Graph) -> GraphUnion {
        let mut builder = UnionBuilder {
            left: self,
            right: other,
            out: Graph::new(),
            left_map: HashMap::new(),
            right_map: HashMap::new(),
        };

        let roots = builder.merge(
            self.sorted_by_frame(&self.roots),
            other.sorted_by_frame(&other.roots),
            None,
        );

        let mut graph = builder.out;
        let mut seen = HashSet::new();
        graph.roots = roots.into_iter().filter(|r| seen.insert(*r)).collect();
        graph.enumerate_traverse();

        debug!(
            "Union of {} and {} nodes has {} nodes",
            builder.left_map.len(),
            builder.right_map.len(),
            graph.len()
        );

        GraphUnion {
            graph,
            left: builder.left_map,
            right: builder.right_map,
        }
    }

    /// Keep only the nodes selected by `keep`, linking each kept node to its
    /// nearest kept descendants
    ///
    /// Along every path the first kept node below a kept node becomes its
    /// child, so diamonds with mixed keep/drop produce multiple parents rather
    /// than an arbitrary choice. Roots are kept nodes without a kept ancestor.
    pub fn squash<F>(&self, keep: F) -> Remapped
    where
        F: Fn(NodeId, &Node) -> bool,
    {
        let order: Vec<NodeId> = self.traverse(Order::Pre).collect();
        let mut kept = vec![false; self.nodes.len()];
        for &id in &order {
            kept[id.0] = keep(id, &self.nodes[id.0]);
        }

        let mut graph = Graph::new();
        let mut old_to_new = HashMap::new();
        for &id in &order {
            if kept[id.0] {
                old_to_new.insert(id, graph.add_node(self.nodes[id.0].frame().clone()));
            }
        }

        let mut has_kept_ancestor = vec![false; self.nodes.len()];
        for &id in &order {
            if !kept[id.0] {
                continue;
            }
            for target in self.nearest_kept(&self.nodes[id.0].children, &kept) {
                if target == id {
                    warn!("Squash left a self-loop on {}", self.describe(id));
                } else {
                    has_kept_ancestor[target.0] = true;
                }
                graph.link_unique(old_to_new[&id], old_to_new[&target]);
            }
        }

        for &id in &order {
            if kept[id.0] && !has_kept_ancestor[id.0] {
                graph.roots.push(old_to_new[&id]);
            }
        }

        // kept cycles entered only through dropped nodes have no ancestor-free
        // member; promote the first one met in pre-order
        graph.promote_unreached(
            order
                .iter()
                .filter(|id| kept[id.0])
                .map(|id| old_to_new[id]),
        );

        graph.enumerate_traverse();
        debug!("Squashed {} nodes down to {}", order.len(), graph.len());

        Remapped { graph, old_to_new }
    }

    /// Collapse nodes that share a key into a single node carrying that key
    ///
    /// `key` gives the frame of the group a node belongs to; nodes with no
    /// key are elided and their nearest keyed descendants are linked instead,
    /// as in [`Graph::squash`]. Edges inside one group disappear, edges
    /// between groups are kept once. Groups of keyed nodes with no keyed
    /// ancestor become roots. The result may contain cycles when groups
    /// call back into each other.
    pub fn regroup<F>(&self, key: F) -> Remapped
    where
        F: Fn(NodeId, &Node) -> Option<Frame>,
    {
        let order: Vec<NodeId> = self.traverse(Order::Pre).collect();
        let mut kept = vec![false; self.nodes.len()];

        let mut graph = Graph::new();
        let mut groups: HashMap<Frame, NodeId> = HashMap::new();
        let mut old_to_new = HashMap::new();
        for &id in &order {
            let Some(frame) = key(id, &self.nodes[id.0]) else {
                continue;
            };
            kept[id.0] = true;
            let group = match groups.get(&frame) {
                Some(&group) => group,
                None => {
                    let group = graph.add_node(frame.clone());
                    groups.insert(frame, group);
                    group
                }
            };
            old_to_new.insert(id, group);
        }

        let mut has_kept_ancestor = vec![false; self.nodes.len()];
        for &id in &order {
            if !kept[id.0] {
                continue;
            }
            let from = old_to_new[&id];
            for target in self.nearest_kept(&self.nodes[id.0].children, &kept) {
                if target != id {
                    has_kept_ancestor[target.0] = true;
                }
                let to = old_to_new[&target];
                if to != from {
                    graph.link_unique(from, to);
                }
            }
        }

        for &id in &order {
            if kept[id.0] && !has_kept_ancestor[id.0] {
                let group = old_to_new[&id];
                if !graph.roots.contains(&group) {
                    graph.roots.push(group);
                }
            }
        }
        graph.promote_unreached(order.iter().filter_map(|id| old_to_new.get(id).copied()));

        graph.enumerate_traverse();
        debug!(
            "Regrouped {} nodes into {} groups",
            order.len(),
            graph.arena_len()
        );

        Remapped { graph, old_to_new }
    }

    /// Make the first unreachable node of each unreachable region a root
    fn promote_unreached<I>(&mut self, candidates: I)
    where
        I: IntoIterator<Item = NodeId>,
    {
        let mut reached = self.reachable();
        for id in candidates {
            if reached[id.0] {
                continue;
            }
            self.roots.push(id);
            let region: Vec<NodeId> = self.traverse_from(id, Order::Pre).collect();
            for r in region {
                reached[r.0] = true;
            }
        }
    }

    fn nearest_kept(&self, start: &[NodeId], kept: &[bool]) -> Vec<NodeId> {
        let mut found = Vec::new();
        let mut visited = HashSet::new();
        let mut stack: Vec<NodeId> = start.iter().rev().copied().collect();

        while let Some(id) = stack.pop() {
            if !visited.insert(id) {
                continue;
            }
            if kept[id.0] {
                found.push(id);
            } else {
                stack.extend(self.nodes[id.0].children.iter().rev().copied());
            }
        }
        found
    }

    /// Merge roots, and children of the same parent, that carry identical
    /// frames; children of merged nodes are merged recursively
    pub fn normalize(&self) -> Remapped {
        let mut graph = Graph::new();
        let mut old_to_new = HashMap::new();

        let roots = self.merge_siblings(&self.roots, None, &mut graph, &mut old_to_new);
        graph.roots = roots;
        graph.enumerate_traverse();

        debug!("Normalized {} nodes into {}", old_to_new.len(), graph.len());
        Remapped { graph, old_to_new }
    }

    fn merge_siblings(
        &self,
        siblings: &[NodeId],
        parent: Option<NodeId>,
        out: &mut Graph,
        old_to_new: &mut HashMap<NodeId, NodeId>,
    ) -> Vec<NodeId> {
        let mut groups: Vec<Vec<NodeId>> = Vec::new();
        let mut by_frame: HashMap<&Frame, usize> = HashMap::new();
        for &id in siblings {
            let frame = self.nodes[id.0].frame();
            let slot = *by_frame.entry(frame).or_insert_with(|| {
                groups.push(Vec::new());
                groups.len() - 1
            });
            if !groups[slot].contains(&id) {
                groups[slot].push(id);
            }
        }

        let mut merged = Vec::with_capacity(groups.len());
        for group in groups {
            let existing = group.iter().find_map(|old| old_to_new.get(old)).copied();
            let new_id = existing
                .unwrap_or_else(|| out.add_node(self.nodes[group[0].0].frame().clone()));

            let fresh: Vec<NodeId> = group
                .into_iter()
                .filter(|old| !old_to_new.contains_key(old))
                .collect();
            for old in &fresh {
                old_to_new.insert(*old, new_id);
            }

            if let Some(p) = parent {
                out.link_unique(p, new_id);
            }
            if !merged.contains(&new_id) {
                merged.push(new_id);
            }

            if !fresh.is_empty() {
                let children: Vec<NodeId> = fresh
                    .iter()
                    .flat_map(|old| self.nodes[old.0].children.iter().copied())
                    .collect();
                self.merge_siblings(&children, Some(new_id), out, old_to_new);
            }
        }
        merged
    }
}

impl PartialEq for Graph {
    fn eq(&self, other: &Self) -> bool {
        self.equals(other)
    }
}

#[derive(Clone, Copy)]
enum Side {
    Left,
    Right,
}

struct UnionBuilder<'a> {
    left: &'a Graph,
    right: &'a Graph,
    out: Graph,
    left_map: HashMap<NodeId, NodeId>,
    right_map: HashMap<NodeId, NodeId>,
}

impl<'a> UnionBuilder<'a> {
    fn connect(&mut self, parent: Option<NodeId>, new_id: NodeId, merged: &mut Vec<NodeId>) {
        if let Some(p) = parent {
            self.out.link_unique(p, new_id);
        }
        merged.push(new_id);
    }

    /// Carry over a node present on one side only, with its whole subtree
    fn carry(&mut self, side: Side, old: NodeId) -> NodeId {
        let (graph, mapped) = match side {
            Side::Left => (self.left, self.left_map.get(&old).copied()),
            Side::Right => (self.right, self.right_map.get(&old).copied()),
        };
        if let Some(new_id) = mapped {
            return new_id;
        }

        let new_id = self.out.add_node(graph.nodes[old.0].frame().clone());
        let children = graph.sorted_children(old);
        match side {
            Side::Left => {
                self.left_map.insert(old, new_id);
                self.merge(children, Vec::new(), Some(new_id));
            }
            Side::Right => {
                self.right_map.insert(old, new_id);
                self.merge(Vec::new(), children, Some(new_id));
            }
        }
        new_id
    }

    fn merge(
        &mut self,
        left_children: Vec<NodeId>,
        right_children: Vec<NodeId>,
        parent: Option<NodeId>,
    ) -> Vec<NodeId> {
        let (left, right) = (self.left, self.right);
        let mut merged = Vec::new();
        let (mut i, mut j) = (0, 0);

        while i < left_children.len() && j < right_children.len() {
            let (l, r) = (left_children[i], right_children[j]);
            match left.nodes[l.0].frame().cmp(right.nodes[r.0].frame()) {
                Ordering::Less => {
                    let new_id = self.carry(Side::Left, l);
                    self.connect(parent, new_id, &mut merged);
                    i += 1;
                }
                Ordering::Greater => {
                    let new_id = self.carry(Side::Right, r);
                    self.connect(parent, new_id, &mut merged);
                    j += 1;
                }
                Ordering::Equal => {
                    let left_mapped = self.left_map.get(&l).copied();
                    let right_mapped = self.right_map.get(&r).copied();
                    let new_id = match left_mapped.or(right_mapped) {
                        Some(id) => id,
                        None => self.out.add_node(left.nodes[l.0].frame().clone()),
                    };

                    let left_side = if left_mapped.is_none() {
                        self.left_map.insert(l, new_id);
                        left.sorted_children(l)
                    } else {
                        Vec::new()
                    };
                    let right_side = if right_mapped.is_none() {
                        self.right_map.insert(r, new_id);
                        right.sorted_children(r)
                    } else {
                        Vec::new()
                    };

                    self.merge(left_side, right_side, Some(new_id));
                    self.connect(parent, new_id, &mut merged);
                    i += 1;
                    j += 1;
                }
            }
        }

        for &l in &left_children[i..] {
            let new_id = self.carry(Side::Left, l);
            self.connect(parent, new_id, &mut merged);
        }
        for &r in &right_children[j..] {
            let new_id = self.carry(Side::Right, r);
            self.connect(parent, new_id, &mut merged);
        }

        merged
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn names(graph: &Graph, order: Order) -> Vec<String> {
        graph
            .traverse(order)
            .map(|id| graph.frame(id).and_then(|f| f.name()).unwrap_or("").to_string())
            .collect()
    }

    /// e and g both call into a diamond a -> (b, c) -> d, plus leaves f and h
    fn bunny() -> (Graph, NodeId, NodeId) {
        let mut g = Graph::new();
        let d = g.add_node(Frame::named("d"));
        let a = g
            .add_lists(&ListNode::branch(
                "a",
                vec![
                    ListNode::branch("b", vec![ListNode::Existing(d)]),
                    ListNode::branch("c", vec![ListNode::Existing(d)]),
                ],
            ))
            .unwrap();
        let e = g
            .add_lists(&ListNode::branch("e", vec!["f".into(), ListNode::Existing(a)]))
            .unwrap();
        let top = g
            .add_lists(&ListNode::branch("g", vec![ListNode::Existing(a), "h".into()]))
            .unwrap();
        g.push_root(e).unwrap();
        g.push_root(top).unwrap();
        g.enumerate_traverse();
        (g, a, d)
    }

    fn named_keep(graph: &Graph, dropped: &[&str]) -> Remapped {
        graph.squash(|_, node| !dropped.contains(&node.frame().name().unwrap_or("")))
    }

    #[test]
    fn test_traverse_shared_subdag_once() {
        let (g, _, _) = bunny();
        assert_eq!(
            names(&g, Order::Pre),
            vec!["e", "f", "a", "b", "d", "c", "g", "h"]
        );
        assert_eq!(
            names(&g, Order::Post),
            vec!["f", "d", "b", "c", "a", "e", "h", "g"]
        );
        assert_eq!(g.len(), 8);
    }

    #[test]
    fn test_traverse_node_is_post_order_subtree() {
        let (g, a, _) = bunny();
        let walked: Vec<&str> = g
            .traverse_node(a)
            .map(|id| g.frame(id).and_then(|f| f.name()).unwrap_or(""))
            .collect();
        assert_eq!(walked, vec!["d", "b", "c", "a"]);
    }

    #[test]
    fn test_traverse_terminates_on_cycle() {
        let mut g = Graph::new();
        let a = g.add_root(Frame::named("a"));
        let b = g.add_node(Frame::named("b"));
        g.add_child(a, b).unwrap();
        g.add_child(b, a).unwrap();

        assert_eq!(names(&g, Order::Pre), vec!["a", "b"]);
        assert_eq!(names(&g, Order::Post), vec!["b", "a"]);
        assert!(matches!(
            g.check_acyclic(),
            Err(GraphError::CycleDetected { node, .. }) if node == a
        ));
    }

    #[test]
    fn test_enumerate_is_deterministic_with_min_depth() {
        let mut g = Graph::from_lists(&[ListNode::branch(
            "a",
            vec![ListNode::branch("b", vec!["c".into()]), "d".into()],
        )])
        .unwrap();
        let first: Vec<(Option<usize>, Option<usize>)> = g
            .traverse(Order::Pre)
            .map(|id| (g.get(id).unwrap().nid(), g.get(id).unwrap().depth()))
            .collect();
        g.enumerate_traverse();
        let second: Vec<(Option<usize>, Option<usize>)> = g
            .traverse(Order::Pre)
            .map(|id| (g.get(id).unwrap().nid(), g.get(id).unwrap().depth()))
            .collect();

        assert_eq!(first, second);
        assert_eq!(
            first,
            vec![
                (Some(0), Some(0)),
                (Some(1), Some(1)),
                (Some(2), Some(2)),
                (Some(3), Some(1))
            ]
        );
    }

    #[test]
    fn test_depth_is_minimum_over_paths() {
        let (g, _, d) = bunny();
        // d is reachable at depth 3 through a -> b and a -> c only
        assert_eq!(g.get(d).unwrap().depth(), Some(3));

        let mut g2 = Graph::new();
        let r = g2.add_root(Frame::named("r"));
        let x = g2.add_node(Frame::named("x"));
        let y = g2.add_node(Frame::named("y"));
        g2.add_child(r, x).unwrap();
        g2.add_child(x, y).unwrap();
        g2.add_child(r, y).unwrap();
        g2.enumerate_traverse();
        assert_eq!(g2.get(y).unwrap().depth(), Some(1));
        assert_eq!(g2.get(y).unwrap().nid(), Some(2));
    }

    #[test]
    fn test_node_by_nid() {
        let (g, a, _) = bunny();
        let nid = g.get(a).unwrap().nid().unwrap();
        assert_eq!(g.node_by_nid(nid), Some(a));
        assert_eq!(g.node_by_nid(100), None);
    }

    #[test]
    fn test_remove_child_clears_back_reference() {
        let mut g = Graph::new();
        let a = g.add_root(Frame::named("a"));
        let b = g.add_node(Frame::named("b"));
        g.add_child(a, b).unwrap();
        assert_eq!(g.get(b).unwrap().parents(), &[a]);

        assert!(g.remove_child(a, b).unwrap());
        assert!(g.get(a).unwrap().children().is_empty());
        assert!(g.get(b).unwrap().parents().is_empty());
        assert!(!g.remove_child(a, b).unwrap());
    }

    #[test]
    fn test_add_child_unknown_handle() {
        let mut g = Graph::new();
        let a = g.add_root(Frame::named("a"));
        assert!(matches!(
            g.add_child(a, NodeId(42)),
            Err(GraphError::UnknownNode(NodeId(42)))
        ));
    }

    #[test]
    fn test_is_tree() {
        let tree = Graph::from_lists(&[ListNode::branch("a", vec!["b".into(), "c".into()])])
            .unwrap();
        assert!(tree.is_tree());

        let (dag, _, _) = bunny();
        assert!(!dag.is_tree());
    }

    #[test]
    fn test_equality_reflexive_and_symmetric() {
        let (g1, _, _) = bunny();
        let (g2, _, _) = bunny();
        assert!(g1.equals(&g1));
        assert!(g1.equals(&g2));
        assert!(g2.equals(&g1));

        let other = Graph::from_lists(&[ListNode::branch("e", vec!["f".into()])]).unwrap();
        assert!(!g1.equals(&other));
        assert!(!other.equals(&g1));
    }

    #[test]
    fn test_equality_respects_sharing() {
        // a -> (b -> d, c -> d) with d shared, versus two distinct d nodes
        let mut shared = Graph::new();
        let d = shared.add_node(Frame::named("d"));
        let a = shared
            .add_lists(&ListNode::branch(
                "a",
                vec![
                    ListNode::branch("b", vec![ListNode::Existing(d)]),
                    ListNode::branch("c", vec![ListNode::Existing(d)]),
                ],
            ))
            .unwrap();
        shared.push_root(a).unwrap();

        let split = Graph::from_lists(&[ListNode::branch(
            "a",
            vec![
                ListNode::branch("b", vec!["d".into()]),
                ListNode::branch("c", vec!["d".into()]),
            ],
        )])
        .unwrap();

        assert!(!shared.equals(&split));
    }

    #[test]
    fn test_copy_is_equal() {
        let (g, _, _) = bunny();
        let copied = g.copy();
        assert!(copied.graph.equals(&g));
        assert_eq!(copied.old_to_new.len(), 8);
    }

    #[test]
    fn test_union_dag() {
        let mut g1 = Graph::new();
        let c = g1
            .add_lists(&ListNode::branch("c", vec!["d".into()]))
            .unwrap();
        let a = g1
            .add_lists(&ListNode::branch(
                "a",
                vec![
                    ListNode::branch("b", vec![ListNode::Existing(c)]),
                    ListNode::branch("e", vec![ListNode::Existing(c), "f".into()]),
                ],
            ))
            .unwrap();
        g1.push_root(a).unwrap();
        g1.enumerate_traverse();

        let mut g2 = Graph::new();
        let d = g2.add_node(Frame::named("d"));
        let a2 = g2
            .add_lists(&ListNode::branch(
                "a",
                vec![
                    ListNode::branch(
                        "b",
                        vec![ListNode::branch("c", vec![ListNode::Existing(d)])],
                    ),
                    ListNode::branch("e", vec![ListNode::Existing(d), "f".into()]),
                ],
            ))
            .unwrap();
        g2.push_root(a2).unwrap();
        g2.enumerate_traverse();

        let mut g3 = Graph::new();
        let d3 = g3.add_node(Frame::named("d"));
        let c3 = g3
            .add_lists(&ListNode::branch("c", vec![ListNode::Existing(d3)]))
            .unwrap();
        let a3 = g3
            .add_lists(&ListNode::branch(
                "a",
                vec![
                    ListNode::branch("b", vec![ListNode::Existing(c3)]),
                    ListNode::branch(
                        "e",
                        vec![ListNode::Existing(c3), ListNode::Existing(d3), "f".into()],
                    ),
                ],
            ))
            .unwrap();
        g3.push_root(a3).unwrap();
        g3.enumerate_traverse();

        assert!(!g1.equals(&g2));
        let union = g1.union(&g2);
        assert!(union.graph.equals(&g3));
        assert_eq!(union.graph.len(), 6);
        assert_eq!(union.left.len(), 6);
        assert_eq!(union.right.len(), 6);
    }

    #[test]
    fn test_union_of_equal_graphs_is_idempotent() {
        let (g1, _, _) = bunny();
        let (g2, _, _) = bunny();
        let union = g1.union(&g2);
        assert!(union.graph.equals(&g1));
        // every node on both sides lands somewhere in the union
        assert_eq!(union.left.len(), g1.len());
        assert_eq!(union.right.len(), g2.len());
    }

    #[test]
    fn test_union_does_not_modify_inputs() {
        let g1 = Graph::from_lists(&[ListNode::branch("a", vec!["b".into()])]).unwrap();
        let g2 = Graph::from_lists(&[ListNode::branch("a", vec!["c".into()])]).unwrap();
        let union = g1.union(&g2);
        assert_eq!(union.graph.len(), 3);
        assert_eq!(g1.len(), 2);
        assert_eq!(g2.len(), 2);
    }

    #[test]
    fn test_union_with_cycle_terminates() {
        let mut g1 = Graph::new();
        let a = g1.add_root(Frame::named("a"));
        let b = g1.add_node(Frame::named("b"));
        g1.add_child(a, b).unwrap();
        g1.add_child(b, a).unwrap();
        let g2 = g1.clone();

        let union = g1.union(&g2);
        assert_eq!(union.graph.len(), 2);
    }

    #[test]
    fn test_squash_simple_tree() {
        let g = Graph::from_lists(&[ListNode::branch(
            "a",
            vec![
                ListNode::branch("b", vec!["c".into()]),
                ListNode::branch("d", vec!["e".into()]),
            ],
        )])
        .unwrap();
        let squashed = named_keep(&g, &["b", "d"]);
        let expected =
            Graph::from_lists(&[ListNode::branch("a", vec!["c".into(), "e".into()])]).unwrap();
        assert!(squashed.graph.equals(&expected));
        assert_eq!(squashed.old_to_new.len(), 3);
    }

    #[test]
    fn test_squash_different_roots() {
        let g = Graph::from_lists(&[ListNode::branch(
            "a",
            vec![
                ListNode::branch("b", vec!["c".into()]),
                ListNode::branch("d", vec!["e".into()]),
            ],
        )])
        .unwrap();
        let squashed = named_keep(&g, &["a"]);
        let expected = Graph::from_lists(&[
            ListNode::branch("b", vec!["c".into()]),
            ListNode::branch("d", vec!["e".into()]),
        ])
        .unwrap();
        assert!(squashed.graph.equals(&expected));
    }

    #[test]
    fn test_squash_diamond_collapses() {
        let mut g = Graph::new();
        let d = g.add_node(Frame::named("d"));
        let a = g
            .add_lists(&ListNode::branch(
                "a",
                vec![
                    ListNode::branch("b", vec![ListNode::Existing(d)]),
                    ListNode::branch("c", vec![ListNode::Existing(d)]),
                ],
            ))
            .unwrap();
        g.push_root(a).unwrap();

        let squashed = named_keep(&g, &["b", "c"]);
        let expected = Graph::from_lists(&[ListNode::branch("a", vec!["d".into()])]).unwrap();
        assert!(squashed.graph.equals(&expected));
        let new_a = squashed.old_to_new[&a];
        assert_eq!(squashed.graph.get(new_a).unwrap().children().len(), 1);
    }

    #[test]
    fn test_squash_bunny() {
        let (g, _, _) = bunny();
        let squashed = named_keep(&g, &["a", "b", "c"]);

        let mut expected = Graph::new();
        let d = expected.add_node(Frame::named("d"));
        let e = expected
            .add_lists(&ListNode::branch("e", vec![ListNode::Existing(d), "f".into()]))
            .unwrap();
        let top = expected
            .add_lists(&ListNode::branch("g", vec![ListNode::Existing(d), "h".into()]))
            .unwrap();
        expected.push_root(e).unwrap();
        expected.push_root(top).unwrap();

        assert!(squashed.graph.equals(&expected));
        assert_eq!(squashed.graph.len(), 5);
    }

    #[test]
    fn test_squash_bunny_to_goat() {
        let (g, _, _) = bunny();
        let squashed = named_keep(&g, &["a", "c"]);

        let mut expected = Graph::new();
        let d = expected.add_node(Frame::named("d"));
        let b = expected
            .add_lists(&ListNode::branch("b", vec![ListNode::Existing(d)]))
            .unwrap();
        let e = expected
            .add_lists(&ListNode::branch(
                "e",
                vec![ListNode::Existing(b), ListNode::Existing(d), "f".into()],
            ))
            .unwrap();
        let top = expected
            .add_lists(&ListNode::branch(
                "g",
                vec![ListNode::Existing(b), ListNode::Existing(d), "h".into()],
            ))
            .unwrap();
        expected.push_root(e).unwrap();
        expected.push_root(top).unwrap();

        assert!(squashed.graph.equals(&expected));
    }

    #[test]
    fn test_squash_kept_cycle_behind_dropped_root() {
        let mut g = Graph::new();
        let r = g.add_root(Frame::named("r"));
        let x = g.add_node(Frame::named("x"));
        let y = g.add_node(Frame::named("y"));
        g.add_child(r, x).unwrap();
        g.add_child(x, y).unwrap();
        g.add_child(y, x).unwrap();

        let squashed = named_keep(&g, &["r"]);
        assert_eq!(squashed.graph.len(), 2);
        assert_eq!(squashed.graph.roots(), &[squashed.old_to_new[&x]]);
    }

    #[test]
    fn test_regroup_by_module() {
        // a(main) -> b(foo) -> c(graz) -> d(graz), a -> e(bar) -> f(foo)
        let g = Graph::from_lists(&[ListNode::branch(
            "a",
            vec![
                ListNode::branch("b", vec![ListNode::branch("c", vec!["d".into()])]),
                ListNode::branch("e", vec!["f".into()]),
            ],
        )])
        .unwrap();
        let module = |name: &str| match name {
            "a" => "main",
            "b" | "f" => "foo",
            "c" | "d" => "graz",
            _ => "bar",
        };

        let regrouped = g.regroup(|_, node| {
            node.frame()
                .name()
                .map(|n| Frame::from_pairs([("name", module(n)), ("type", "module")]).unwrap())
        });
        let out = &regrouped.graph;

        assert_eq!(out.len(), 4);
        assert_eq!(out.roots().len(), 1);
        assert_eq!(
            names(out, Order::Pre),
            vec!["main", "foo", "graz", "bar"]
        );
        let bar = regrouped.old_to_new.values().copied().find(|id| {
            out.frame(*id).and_then(|f| f.name()) == Some("bar")
        });
        let bar_children: Vec<&str> = out
            .node(bar.unwrap())
            .unwrap()
            .children()
            .iter()
            .filter_map(|c| out.frame(*c).and_then(|f| f.name()))
            .collect();
        assert_eq!(bar_children, vec!["foo"]);
        assert_eq!(regrouped.old_to_new.len(), 6);
    }

    #[test]
    fn test_regroup_elides_unkeyed_nodes() {
        let g = Graph::from_lists(&[ListNode::branch(
            "a",
            vec![ListNode::branch("skip", vec!["c".into()])],
        )])
        .unwrap();

        let regrouped = g.regroup(|_, node| match node.frame().name() {
            Some("skip") => None,
            _ => Some(node.frame().clone()),
        });

        assert_eq!(names(&regrouped.graph, Order::Pre), vec!["a", "c"]);
        assert_eq!(regrouped.graph.roots().len(), 1);
    }

    #[test]
    fn test_normalize_merges_sibling_frames() {
        let g = Graph::from_lists(&[ListNode::branch(
            "a",
            vec![
                ListNode::branch("c", vec!["x".into()]),
                ListNode::branch("c", vec!["y".into(), "x".into()]),
            ],
        )])
        .unwrap();
        let normalized = g.normalize();
        let expected = Graph::from_lists(&[ListNode::branch(
            "a",
            vec![ListNode::branch("c", vec!["x".into(), "y".into()])],
        )])
        .unwrap();
        assert!(normalized.graph.equals(&expected));
        assert_eq!(normalized.old_to_new.len(), 6);
    }

    #[test]
    fn test_normalize_merges_roots() {
        let g = Graph::from_lists(&[
            ListNode::leaf("e"),
            ListNode::leaf("f"),
            ListNode::leaf("e"),
        ])
        .unwrap();
        let normalized = g.normalize();
        assert_eq!(normalized.graph.roots().len(), 2);
        assert_eq!(normalized.graph.len(), 2);
    }
}
