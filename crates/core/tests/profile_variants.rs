//! Integration test: the same captured call tree, serialized in each
//! supported variant, must analyze to the same statistics.

use cpuprof_core::cpuprof_protocol::{AnalysisResult, HotspotKind, SourceFormat};
use cpuprof_core::{AnalyzeOptions, NormalizeError, analyze, normalize, normalize_value};
use serde_json::{Value, json};

fn frame(name: &str, url: &str, line: i64) -> Value {
    json!({"functionName": name, "url": url, "lineNumber": line, "columnNumber": 0, "scriptId": "7"})
}

/// root -> A (self 30) -> B (self 20); root -> C (self 3); root self 2.
fn scenario_nodes() -> Value {
    json!([
        {"id": 10, "callFrame": frame("(root)", "", -1), "children": [20, 40]},
        {"id": 20, "callFrame": frame("A", "file:///app/a.js", 10), "children": [30]},
        {"id": 30, "callFrame": frame("B", "file:///app/b.js", 20)},
        {"id": 40, "callFrame": frame("C", "node:internal/fs", 5)}
    ])
}

fn scenario_samples() -> (Value, Value) {
    (
        json!([20, 20, 20, 30, 30, 40, 10]),
        json!([10, 10, 10, 10, 10, 3, 2]),
    )
}

fn flat() -> Value {
    let (samples, deltas) = scenario_samples();
    json!({
        "nodes": scenario_nodes(),
        "startTime": 1000,
        "endTime": 1055,
        "samples": samples,
        "timeDeltas": deltas
    })
}

/// The scenario tree with its own record ids, which flattening renumbers.
fn legacy() -> Value {
    let (_, deltas) = scenario_samples();
    json!({
        "head": {
            "id": 7,
            "callFrame": frame("(root)", "", -1),
            "children": [
                {"id": 8, "callFrame": frame("A", "file:///app/a.js", 10), "children": [
                    {"id": 9, "callFrame": frame("B", "file:///app/b.js", 20)}
                ]},
                {"id": 11, "callFrame": frame("C", "node:internal/fs", 5)}
            ]
        },
        "startTime": 1000,
        "endTime": 1055,
        "samples": [8, 8, 8, 9, 9, 11, 7],
        "timeDeltas": deltas
    })
}

fn trace() -> Value {
    json!({
        "traceEvents": [
            {"name": "TracingStartedInBrowser", "ph": "I", "args": {"data": {}}},
            {"name": "CpuProfile", "ph": "I", "args": {"data": {"cpuProfile": flat()}}}
        ]
    })
}

fn chunked() -> Value {
    // Parent-only node tables split over two chunks.
    json!([
        {"name": "Profile", "id": "0x1", "args": {"data": {"startTime": 1000}}},
        {"name": "ProfileChunk", "id": "0x1", "args": {"data": {
            "cpuProfile": {
                "nodes": [
                    {"id": 1, "callFrame": frame("(root)", "", -1)},
                    {"id": 2, "callFrame": frame("A", "file:///app/a.js", 10), "parent": 1}
                ],
                "samples": [2, 2, 2]
            },
            "timeDeltas": [10, 10, 10]
        }}},
        {"name": "ProfileChunk", "id": "0x2", "args": {"data": {
            "cpuProfile": {"nodes": [{"id": 99}], "samples": [99]},
            "timeDeltas": [500]
        }}},
        {"name": "ProfileChunk", "id": "0x1", "args": {"data": {
            "cpuProfile": {
                "nodes": [
                    {"id": 3, "callFrame": frame("B", "file:///app/b.js", 20), "parent": 2},
                    {"id": 4, "callFrame": frame("C", "node:internal/fs", 5), "parent": 1}
                ],
                "samples": [3, 3, 4, 1]
            },
            "timeDeltas": [10, 10, 3, 2]
        }}}
    ])
}

fn run(value: Value) -> AnalysisResult {
    let profile = normalize_value(value).expect("normalize");
    analyze(&profile, &AnalyzeOptions::default())
}

fn close(a: f64, b: f64) -> bool {
    (a - b).abs() < 0.05
}

/// The whole serialized result minus metadata and node ids, which differ
/// between variants by construction.
fn comparable(result: &AnalysisResult) -> Value {
    let mut value = serde_json::to_value(result).expect("serialize");
    if let Value::Object(map) = &mut value {
        map.remove("meta");
    }
    if let Some(Value::Array(nodes)) = value.pointer_mut("/callTree/nodes") {
        for node in nodes {
            if let Value::Object(node) = node {
                node.remove("nodeId");
            }
        }
    }
    value
}

#[test]
fn scenario_percentages() {
    let result = run(flat());
    assert!(close(result.total_time, 55.0));
    assert_eq!(result.sample_count, 7);

    let root = result.call_tree.root().expect("root");
    assert!(close(root.total_percent, 100.0));

    let a = result.hotspot_by_name("A").expect("A");
    assert!(close(a.total_percent, 90.9));
    assert!(close(a.self_percent, 54.5));
    assert!(close(result.hotspot_by_name("B").expect("B").self_percent, 36.4));
    assert!(close(result.hotspot_by_name("C").expect("C").self_percent, 5.5));

    let ranked: Vec<_> = result
        .hotspots
        .iter()
        .map(|h| h.call_frame.function_name.as_str())
        .collect();
    assert_eq!(ranked, vec!["A", "B", "C", "(root)"]);
    assert_eq!(result.hotspots[0].kind, HotspotKind::App);
    assert_eq!(result.hotspots[2].kind, HotspotKind::Native);
    assert_eq!(result.hotspots[0].call_frame.script_id, "7");
}

#[test]
fn scenario_critical_paths() {
    let result = run(flat());
    assert_eq!(result.critical_paths.len(), 2);

    let heaviest: Vec<_> = result
        .call_tree
        .path_nodes(&result.critical_paths[0].nodes)
        .map(|n| n.call_frame.function_name.as_str())
        .collect();
    assert_eq!(heaviest, vec!["(root)", "A", "B"]);
    // (2 + 30 + 20) / 55
    assert!(close(result.critical_paths[0].cumulative_percent, 94.5));
}

#[test]
fn all_variants_agree() {
    let expected = comparable(&run(flat()));
    assert_eq!(expected["functions"].as_array().map(Vec::len), Some(4));

    for (label, value) in [("legacy", legacy()), ("trace", trace()), ("chunked", chunked())] {
        assert_eq!(comparable(&run(value)), expected, "{label} variant differs");
    }
}

#[test]
fn source_format_is_recorded() {
    assert_eq!(run(flat()).meta.source_format, SourceFormat::CpuProfile);
    assert_eq!(run(legacy()).meta.source_format, SourceFormat::Legacy);
    assert_eq!(run(trace()).meta.source_format, SourceFormat::TraceEvents);

    let chunked = run(chunked());
    assert_eq!(chunked.meta.source_format, SourceFormat::TraceChunks);
    assert!(close(chunked.meta.start_time, 1000.0));
    assert!(close(chunked.meta.end_time, 1055.0));
}

#[test]
fn parent_only_table_is_connected() {
    let result = run(json!({
        "nodes": [
            {"id": 1, "callFrame": frame("(root)", "", -1), "children": []},
            {"id": 2, "callFrame": frame("A", "/a.js", 1), "parent": 1, "children": []},
            {"id": 3, "callFrame": frame("B", "/b.js", 1), "parent": 2}
        ],
        "samples": [3, 3],
        "timeDeltas": [5, 5]
    }));
    assert_eq!(result.call_tree.len(), 3);
    let root = result.call_tree.root().expect("root");
    assert!(close(root.total_time, 10.0));
    assert_eq!(result.critical_paths[0].nodes.len(), 3);
}

#[test]
fn recursive_function_total_exceeds_profile_time() {
    let result = run(json!({
        "nodes": [
            {"id": 1, "children": [2]},
            {"id": 2, "callFrame": frame("fib", "/fib.js", 1), "children": [3]},
            {"id": 3, "callFrame": frame("fib", "/fib.js", 1)}
        ],
        "samples": [3, 3],
        "timeDeltas": [5, 5]
    }));
    let fib = result.hotspot_by_name("fib").expect("fib");
    assert!(close(fib.total_percent, 200.0));
    assert!(close(fib.self_percent, 100.0));
    assert_eq!(result.call_tree.len(), 3);
}

#[test]
fn empty_samples_degrade_to_zero() {
    let result = run(json!({"nodes": scenario_nodes(), "samples": [], "timeDeltas": []}));
    assert_eq!(result.total_time, 0.0);
    assert_eq!(result.mean_sample_interval, 0.0);
    assert!(result.hotspots.is_empty());
    assert!(result.functions.iter().all(|f| f.self_percent == 0.0));
    assert_eq!(result.critical_paths.len(), 2);
}

#[test]
fn threshold_excluding_everything_is_not_an_error() {
    let profile = normalize_value(flat()).expect("normalize");
    let options = AnalyzeOptions {
        hotspot_threshold: 99.0,
        ..AnalyzeOptions::default()
    };
    assert!(analyze(&profile, &options).hotspots.is_empty());
}

#[test]
fn malformed_inputs() {
    let err = normalize(b"not json").expect_err("should fail");
    assert!(matches!(err, NormalizeError::InvalidEncoding(_)));

    let err = normalize_value(json!({"nodes": scenario_nodes(), "timeDeltas": []}))
        .expect_err("should fail");
    assert_eq!(err.field(), Some("samples"));

    let err = normalize_value(json!({"samples": [], "timeDeltas": []})).expect_err("should fail");
    assert_eq!(err.field(), Some("nodes"));

    let err = normalize_value(json!({"traceEvents": [{"name": "RunTask", "args": {}}]}))
        .expect_err("should fail");
    assert_eq!(err.field(), Some("cpuProfile"));
}

#[test]
fn result_serializes_as_camel_case_json() {
    let json = serde_json::to_value(run(flat())).expect("serialize");
    assert_eq!(json["sampleCount"], 7);
    assert_eq!(json["callTree"]["nodes"][0]["callFrame"]["functionName"], "(root)");
    assert_eq!(json["criticalPaths"][0]["nodes"], json!([0, 1, 2]));
    assert_eq!(json["meta"]["sourceFormat"], "cpuProfile");
}
