//! Row keys: a node handle plus optional rank and thread levels.

use crate::graph::NodeId;
use std::fmt;

/// A distinguishing dimension of the row index
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum IndexLevel {
    Node,
    Rank,
    Thread,
}

impl fmt::Display for IndexLevel {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            IndexLevel::Node => "node",
            IndexLevel::Rank => "rank",
            IndexLevel::Thread => "thread",
        };
        write!(f, "{}", s)
    }
}

/// Key of one metric row
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct RowKey {
    pub node: NodeId,
    pub rank: Option<u32>,
    pub thread: Option<u32>,
}

impl RowKey {
    pub fn node(node: NodeId) -> Self {
        Self {
            node,
            rank: None,
            thread: None,
        }
    }

    pub fn with_rank(mut self, rank: u32) -> Self {
        self.rank = Some(rank);
        self
    }

    pub fn with_thread(mut self, thread: u32) -> Self {
        self.thread = Some(thread);
        self
    }

    /// Same rank/thread position, different node
    pub fn with_node(mut self, node: NodeId) -> Self {
        self.node = node;
        self
    }

    /// The (rank, thread) slice this key belongs to
    pub fn slice(&self) -> (Option<u32>, Option<u32>) {
        (self.rank, self.thread)
    }

    /// Index levels populated by this key
    pub fn levels(&self) -> Vec<IndexLevel> {
        let mut levels = vec![IndexLevel::Node];
        if self.rank.is_some() {
            levels.push(IndexLevel::Rank);
        }
        if self.thread.is_some() {
            levels.push(IndexLevel::Thread);
        }
        levels
    }
}

impl fmt::Display for RowKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "({}", self.node)?;
        if let Some(rank) = self.rank {
            write!(f, ", rank={}", rank)?;
        }
        if let Some(thread) = self.thread {
            write!(f, ", thread={}", thread)?;
        }
        write!(f, ")")
    }
}

/// Render a level list for error messages
pub(crate) fn describe_levels(levels: &[IndexLevel]) -> String {
    let names: Vec<String> = levels.iter().map(|l| l.to_string()).collect();
    format!("[{}]", names.join(", "))
}
