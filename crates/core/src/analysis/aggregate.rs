use cpuprof_protocol::{FunctionKey, FunctionStats};
use indexmap::{IndexMap, IndexSet};

use super::attribution::{Attribution, percent_of};
use crate::model::CanonicalProfile;

/// Collapse every node sharing a function identity into one record.
///
/// Records come out in the order their first node appears in the table.
/// Total time is summed per contributing node, so a function reached from
/// several call sites (or recursively) can exceed 100% of profile time.
pub fn aggregate_functions(
    profile: &CanonicalProfile,
    attribution: &Attribution,
) -> Vec<FunctionStats> {
    let nodes = profile.nodes();
    let keys: Vec<FunctionKey> = nodes.iter().map(|n| n.call_frame.key()).collect();
    let mut by_key: IndexMap<&FunctionKey, FunctionStats> = IndexMap::new();

    for (index, node) in nodes.iter().enumerate() {
        let key = &keys[index];
        let stats = by_key.entry(key).or_insert_with(|| FunctionStats {
            key: key.clone(),
            script_id: node.call_frame.script_id.clone(),
            self_time: 0.0,
            total_time: 0.0,
            self_percent: 0.0,
            total_percent: 0.0,
            hit_count: 0,
            callers: IndexSet::new(),
            callees: IndexSet::new(),
        });
        stats.self_time += attribution.self_time[index];
        stats.total_time += attribution.total_time[index];
        stats.hit_count += attribution.hit_count[index];

        if let Some(parent) = profile.parent_index(index) {
            stats.callers.insert(keys[parent].clone());
        }
        for child in profile.child_indices(index) {
            stats.callees.insert(keys[child].clone());
        }
    }

    let profile_total = attribution.profile_total;
    by_key
        .into_values()
        .map(|mut stats| {
            stats.self_percent = percent_of(stats.self_time, profile_total);
            stats.total_percent = percent_of(stats.total_time, profile_total);
            stats
        })
        .collect()
}
