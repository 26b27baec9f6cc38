use tracing::warn;

use crate::model::CanonicalProfile;

/// Per-node time attribution, indexed by node table position.
#[derive(Debug, Clone, PartialEq)]
pub struct Attribution {
    pub self_time: Vec<f64>,
    pub total_time: Vec<f64>,
    pub hit_count: Vec<u64>,
    /// Sum of all sample deltas.
    pub profile_total: f64,
}

impl Attribution {
    pub fn self_percent(&self, index: usize) -> f64 {
        percent_of(self.self_time[index], self.profile_total)
    }

    pub fn total_percent(&self, index: usize) -> f64 {
        percent_of(self.total_time[index], self.profile_total)
    }
}

/// `value` as a percentage of `total`; 0 when `total` is 0.
pub fn percent_of(value: f64, total: f64) -> f64 {
    if total > 0.0 { value / total * 100.0 } else { 0.0 }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Visit {
    New,
    Open,
    Done,
}

enum Step {
    Enter(usize),
    Exit(usize),
}

/// Compute self and total time for every node of the table.
///
/// Self time sums the deltas of the samples naming a node. Total time is
/// self time plus the total time of each child, computed once per node by
/// an explicit-stack depth-first walk started from every node. A child
/// still open on the stack (a cycle in malformed input) contributes nothing.
pub fn attribute(profile: &CanonicalProfile) -> Attribution {
    let len = profile.nodes().len();
    let mut self_time = vec![0.0; len];
    let mut hit_count = vec![0u64; len];
    let mut unknown = 0usize;

    for (&id, &delta) in profile.samples().iter().zip(profile.time_deltas()) {
        match profile.index_of(id) {
            Some(index) => {
                self_time[index] += delta;
                hit_count[index] += 1;
            }
            None => unknown += 1,
        }
    }
    if unknown > 0 {
        warn!(unknown, "samples name nodes missing from the node table");
    }

    let mut total_time = vec![0.0; len];
    let mut state = vec![Visit::New; len];
    let mut stack: Vec<Step> = Vec::new();

    for start in 0..len {
        if state[start] != Visit::New {
            continue;
        }
        stack.push(Step::Enter(start));
        while let Some(step) = stack.pop() {
            match step {
                Step::Enter(index) => {
                    if state[index] != Visit::New {
                        continue;
                    }
                    state[index] = Visit::Open;
                    stack.push(Step::Exit(index));
                    for child in profile.child_indices(index) {
                        if state[child] == Visit::New {
                            stack.push(Step::Enter(child));
                        }
                    }
                }
                Step::Exit(index) => {
                    let children: f64 = profile
                        .child_indices(index)
                        .filter(|&c| state[c] == Visit::Done)
                        .map(|c| total_time[c])
                        .sum();
                    total_time[index] = self_time[index] + children;
                    state[index] = Visit::Done;
                }
            }
        }
    }

    Attribution {
        self_time,
        total_time,
        hit_count,
        profile_total: profile.total_time(),
    }
}
