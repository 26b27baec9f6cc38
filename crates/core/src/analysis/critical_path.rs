use cpuprof_protocol::{CallTree, CriticalPath};

/// Enumerate every root-to-leaf path of `tree` and keep the `max` heaviest.
///
/// A path scores the sum of the self percent of each node on it. Paths are
/// sorted by descending score; ties keep the left-to-right leaf order of the
/// tree.
pub fn critical_paths(tree: &CallTree, max: usize) -> Vec<CriticalPath> {
    if tree.is_empty() || max == 0 {
        return Vec::new();
    }

    let mut leaves: Vec<(usize, f64)> = Vec::new();
    let mut stack: Vec<(usize, f64)> = vec![(0, 0.0)];
    while let Some((index, above)) = stack.pop() {
        let node = &tree.nodes[index];
        let score = above + node.self_percent;
        if node.children.is_empty() {
            leaves.push((index, score));
            continue;
        }
        for &child in node.children.iter().rev() {
            stack.push((child, score));
        }
    }

    leaves.sort_by(|a, b| b.1.total_cmp(&a.1));
    leaves.truncate(max);

    leaves
        .into_iter()
        .map(|(leaf, cumulative_percent)| CriticalPath {
            nodes: path_to(tree, leaf),
            cumulative_percent,
        })
        .collect()
}

fn path_to(tree: &CallTree, leaf: usize) -> Vec<usize> {
    let mut nodes = Vec::with_capacity(tree.nodes[leaf].depth as usize + 1);
    let mut cursor = Some(leaf);
    while let Some(index) = cursor {
        nodes.push(index);
        cursor = tree.nodes[index].parent;
    }
    nodes.reverse();
    nodes
}
