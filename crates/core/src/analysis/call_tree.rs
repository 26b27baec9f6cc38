use cpuprof_protocol::{CallTree, CallTreeNode};
use tracing::warn;

use super::attribution::Attribution;
use crate::model::CanonicalProfile;

/// Build the presentation call tree rooted at the profile's root node.
///
/// Children are ordered by descending total time (stable for ties). The
/// tree is built with an explicit stack in pre-order, so the root lands at
/// arena index 0. A node already placed is not placed again, which keeps
/// malformed shared or cyclic links from duplicating subtrees.
pub fn build_call_tree(profile: &CanonicalProfile, attribution: &Attribution) -> CallTree {
    let mut tree = CallTree::new();
    let Some(root) = profile.root_index() else {
        return tree;
    };

    let mut placed = vec![false; profile.nodes().len()];
    placed[root] = true;
    let mut repeated = 0usize;
    // (table position, arena index of parent, depth)
    let mut stack: Vec<(usize, Option<usize>, u32)> = vec![(root, None, 0)];

    while let Some((index, parent, depth)) = stack.pop() {
        let slot = tree.nodes.len();
        let node = &profile.nodes()[index];
        tree.nodes.push(CallTreeNode {
            node_id: node.id,
            call_frame: node.call_frame.clone(),
            self_time: attribution.self_time[index],
            total_time: attribution.total_time[index],
            self_percent: attribution.self_percent(index),
            total_percent: attribution.total_percent(index),
            hit_count: attribution.hit_count[index],
            depth,
            parent,
            children: Vec::new(),
        });
        if let Some(parent) = parent {
            tree.nodes[parent].children.push(slot);
        }

        let mut children: Vec<usize> = Vec::new();
        for child in profile.child_indices(index) {
            if placed[child] {
                repeated += 1;
            } else {
                placed[child] = true;
                children.push(child);
            }
        }
        children.sort_by(|&a, &b| attribution.total_time[b].total_cmp(&attribution.total_time[a]));
        // Reverse so the heaviest child is popped (and appended) first.
        for child in children.into_iter().rev() {
            stack.push((child, Some(slot), depth + 1));
        }
    }
    if repeated > 0 {
        warn!(repeated, "skipped call tree links to already placed nodes");
    }

    tree
}
