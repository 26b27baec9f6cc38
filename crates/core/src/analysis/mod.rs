//! Statistical analysis of a normalized profile.
//!
//! [`analyze`] runs the whole pipeline: per-node time attribution, then
//! function aggregation feeding the hotspot ranking, and the call tree
//! feeding the critical path search.

pub mod aggregate;
pub mod attribution;
pub mod call_tree;
pub mod critical_path;
pub mod hotspots;

use cpuprof_protocol::AnalysisResult;
use serde::Deserialize;
use tracing::debug;

use crate::model::CanonicalProfile;

pub use aggregate::aggregate_functions;
pub use attribution::{Attribution, attribute, percent_of};
pub use call_tree::build_call_tree;
pub use critical_path::critical_paths;
pub use hotspots::{classify, rank_hotspots};

/// Tuning knobs for [`analyze`]. Missing fields take their defaults when
/// deserialized.
#[derive(Debug, Clone, PartialEq, Deserialize)]
#[serde(default, rename_all = "camelCase")]
pub struct AnalyzeOptions {
    /// Minimum self percent for a function to be reported as a hotspot.
    pub hotspot_threshold: f64,
    pub max_hotspots: usize,
    pub max_paths: usize,
}

impl Default for AnalyzeOptions {
    fn default() -> Self {
        Self {
            hotspot_threshold: 1.0,
            max_hotspots: 20,
            max_paths: 5,
        }
    }
}

/// Analyze a normalized profile. Deterministic: the same profile and
/// options always produce an identical result.
pub fn analyze(profile: &CanonicalProfile, options: &AnalyzeOptions) -> AnalysisResult {
    let attribution = attribute(profile);
    let functions = aggregate_functions(profile, &attribution);
    let hotspots = rank_hotspots(&functions, options.hotspot_threshold, options.max_hotspots);
    let call_tree = build_call_tree(profile, &attribution);
    let critical_paths = critical_paths(&call_tree, options.max_paths);

    let sample_count = profile.sample_count();
    let mean_sample_interval = if sample_count > 0 {
        attribution.profile_total / sample_count as f64
    } else {
        0.0
    };

    debug!(
        nodes = profile.nodes().len(),
        samples = sample_count,
        functions = functions.len(),
        hotspots = hotspots.len(),
        paths = critical_paths.len(),
        "analyzed profile"
    );

    AnalysisResult {
        meta: profile.meta().clone(),
        total_time: attribution.profile_total,
        sample_count,
        mean_sample_interval,
        functions,
        call_tree,
        hotspots,
        critical_paths,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::normalize_value;
    use serde_json::json;

    #[test]
    fn options_defaults_fill_missing_fields() {
        let options: AnalyzeOptions =
            serde_json::from_value(json!({"maxPaths": 2})).expect("options");
        assert_eq!(options.max_paths, 2);
        assert_eq!(options.max_hotspots, 20);
        assert_eq!(options.hotspot_threshold, 1.0);
    }

    #[test]
    fn summary_figures() {
        let profile = normalize_value(json!({
            "nodes": [
                {"id": 1, "callFrame": {"functionName": "(root)"}, "children": [2]},
                {"id": 2, "callFrame": {"functionName": "work", "url": "file:///w.js"}}
            ],
            "startTime": 100,
            "endTime": 130,
            "samples": [2, 2, 1],
            "timeDeltas": [10, 10, 10]
        }))
        .expect("normalize");
        let result = analyze(&profile, &AnalyzeOptions::default());

        assert_eq!(result.total_time, 30.0);
        assert_eq!(result.sample_count, 3);
        assert_eq!(result.mean_sample_interval, 10.0);
        assert_eq!(result.meta.start_time, 100.0);
        assert_eq!(result.duration(), 30.0);
        assert_eq!(result.hotspots[0].call_frame.function_name, "work");
        assert_eq!(result.critical_paths.len(), 1);
    }

    #[test]
    fn no_samples_gives_zero_interval() {
        let profile = normalize_value(json!({"nodes": [{"id": 1}], "samples": [], "timeDeltas": []}))
            .expect("normalize");
        let result = analyze(&profile, &AnalyzeOptions::default());
        assert_eq!(result.mean_sample_interval, 0.0);
        assert!(result.hotspots.is_empty());
        assert_eq!(result.call_tree.len(), 1);
    }
}
