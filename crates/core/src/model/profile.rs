use std::collections::HashMap;

use cpuprof_protocol::{CallFrame, ProfileMeta};

/// One position in the captured call tree.
#[derive(Debug, Clone, PartialEq)]
pub struct Node {
    pub id: u64,
    pub call_frame: CallFrame,
    pub parent: Option<u64>,
    pub children: Vec<u64>,
}

/// The single in-memory model every input variant is normalized into.
///
/// Nodes live in a flat table (arena) and are addressed either by their
/// profile id or by their position in the table. Samples and time deltas
/// are paired one-to-one.
#[derive(Debug, Clone)]
pub struct CanonicalProfile {
    meta: ProfileMeta,
    nodes: Vec<Node>,
    index: HashMap<u64, usize>,
    samples: Vec<u64>,
    time_deltas: Vec<f64>,
}

impl CanonicalProfile {
    /// Assemble a profile from an already reconciled node table.
    ///
    /// Callers guarantee unique ids, that every parent and child id exists
    /// in `nodes`, and that `samples` and `time_deltas` have equal length.
    pub(crate) fn new(
        meta: ProfileMeta,
        nodes: Vec<Node>,
        samples: Vec<u64>,
        time_deltas: Vec<f64>,
    ) -> Self {
        let index = nodes.iter().enumerate().map(|(i, n)| (n.id, i)).collect();
        Self {
            meta,
            nodes,
            index,
            samples,
            time_deltas,
        }
    }

    pub fn meta(&self) -> &ProfileMeta {
        &self.meta
    }

    pub fn nodes(&self) -> &[Node] {
        &self.nodes
    }

    pub fn samples(&self) -> &[u64] {
        &self.samples
    }

    pub fn time_deltas(&self) -> &[f64] {
        &self.time_deltas
    }

    pub fn sample_count(&self) -> usize {
        self.samples.len()
    }

    /// Sum of all sample time deltas.
    pub fn total_time(&self) -> f64 {
        self.time_deltas.iter().sum()
    }

    /// Table position of the node with the given id.
    pub fn index_of(&self, id: u64) -> Option<usize> {
        self.index.get(&id).copied()
    }

    pub fn node(&self, id: u64) -> Option<&Node> {
        self.index_of(id).map(|i| &self.nodes[i])
    }

    /// Table position of the root: the first node without a parent.
    pub fn root_index(&self) -> Option<usize> {
        self.nodes.iter().position(|n| n.parent.is_none())
    }

    pub fn root(&self) -> Option<&Node> {
        self.root_index().map(|i| &self.nodes[i])
    }

    /// Table positions of the children of the node at `index`.
    pub fn child_indices(&self, index: usize) -> impl Iterator<Item = usize> + '_ {
        self.nodes
            .get(index)
            .into_iter()
            .flat_map(|n| n.children.iter())
            .filter_map(|id| self.index_of(*id))
    }

    /// Table position of the parent of the node at `index`.
    pub fn parent_index(&self, index: usize) -> Option<usize> {
        self.nodes
            .get(index)
            .and_then(|n| n.parent)
            .and_then(|id| self.index_of(id))
    }
}
