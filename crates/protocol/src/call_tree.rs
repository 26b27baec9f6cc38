use serde::{Deserialize, Serialize};

use crate::CallFrame;

/// One position in the time-annotated call tree.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CallTreeNode {
    /// Id of the profile node this position mirrors.
    pub node_id: u64,
    pub call_frame: CallFrame,
    pub self_time: f64,
    /// Self time plus the total time of every descendant.
    pub total_time: f64,
    pub self_percent: f64,
    pub total_percent: f64,
    pub hit_count: u64,
    /// Distance from the root (root = 0).
    pub depth: u32,
    /// Arena index of the parent, `None` for the root.
    pub parent: Option<usize>,
    /// Arena indices of the children, heaviest total time first.
    pub children: Vec<usize>,
}

/// Call tree stored as an arena: nodes address each other by index, the
/// root (if any) sits at index 0, and nodes appear in pre-order.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct CallTree {
    pub nodes: Vec<CallTreeNode>,
}

impl CallTree {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn root(&self) -> Option<&CallTreeNode> {
        self.nodes.first()
    }

    pub fn node(&self, index: usize) -> Option<&CallTreeNode> {
        self.nodes.get(index)
    }

    pub fn len(&self) -> usize {
        self.nodes.len()
    }

    pub fn is_empty(&self) -> bool {
        self.nodes.is_empty()
    }

    /// Direct children of the node at `index`, heaviest first.
    pub fn children(&self, index: usize) -> impl Iterator<Item = &CallTreeNode> {
        self.nodes
            .get(index)
            .into_iter()
            .flat_map(|n| n.children.iter())
            .filter_map(|&c| self.nodes.get(c))
    }

    /// Resolve a list of arena indices (e.g. a critical path) to nodes.
    pub fn path_nodes<'a>(
        &'a self,
        indices: &'a [usize],
    ) -> impl Iterator<Item = &'a CallTreeNode> + 'a {
        indices.iter().filter_map(|&i| self.nodes.get(i))
    }

    /// Number of nodes without children.
    pub fn leaf_count(&self) -> usize {
        self.nodes.iter().filter(|n| n.children.is_empty()).count()
    }
}
