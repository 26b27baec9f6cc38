use std::collections::HashMap;

use cpuprof_protocol::CallFrame;
use serde::Deserialize;
use serde_json::{Map, Value};
use tracing::warn;

use super::cpuprofile::{RawCallFrame, read_timeline};
use super::{NormalizeError, RawProfile};
use crate::model::Node;

/// Flattened ids start at 1, so 0 never names a node.
const UNATTRIBUTED: u64 = 0;

/// Flatten a legacy `head` tree into a node table.
///
/// Records are numbered 1, 2, 3… in pre-order. A record's frame is its
/// `callFrame` object when present, otherwise the record's own
/// `functionName`/`url`/`lineNumber`/… fields. Samples that referenced the
/// records' original `id` fields are rewritten to the new ids.
pub(crate) fn flatten(mut obj: Map<String, Value>) -> Result<RawProfile, NormalizeError> {
    let head = match obj.remove("head") {
        Some(head @ Value::Object(_)) => head,
        Some(_) => return Err(NormalizeError::invalid("head", "not an object")),
        None => return Err(NormalizeError::missing("head")),
    };

    let mut nodes: Vec<Node> = Vec::new();
    let mut original_ids: HashMap<u64, u64> = HashMap::new();
    let mut skipped = 0usize;
    // (record, table position of its parent)
    let mut stack: Vec<(Value, Option<usize>)> = vec![(head, None)];

    while let Some((mut record, parent)) = stack.pop() {
        let id = nodes.len() as u64 + 1;
        if let Some(original) = record.get("id").and_then(Value::as_u64) {
            original_ids.insert(original, id);
        }
        let children = match record.as_object_mut().and_then(|r| r.remove("children")) {
            Some(Value::Array(children)) => children,
            _ => Vec::new(),
        };
        let call_frame = read_frame(&record)?;

        let parent_id = parent.map(|pos| nodes[pos].id);
        if let Some(pos) = parent {
            nodes[pos].children.push(id);
        }
        let pos = nodes.len();
        nodes.push(Node {
            id,
            call_frame,
            parent: parent_id,
            children: Vec::with_capacity(children.len()),
        });

        // Reverse so the first child is popped (and numbered) first.
        for child in children.into_iter().rev() {
            if child.is_object() {
                stack.push((child, Some(pos)));
            } else {
                skipped += 1;
            }
        }
    }
    if skipped > 0 {
        warn!(skipped, "ignoring non-object entries in legacy children lists");
    }

    let mut timeline = read_timeline(&mut obj)?;
    if !original_ids.is_empty() {
        let mut unmatched = 0usize;
        for sample in &mut timeline.samples {
            *sample = match original_ids.get(sample) {
                Some(&id) => id,
                None => {
                    unmatched += 1;
                    UNATTRIBUTED
                }
            };
        }
        if unmatched > 0 {
            warn!(unmatched, "samples reference ids absent from the legacy tree");
        }
    }

    Ok(RawProfile { nodes, timeline })
}

fn read_frame(record: &Value) -> Result<CallFrame, NormalizeError> {
    let source = match record.get("callFrame") {
        Some(frame @ Value::Object(_)) => frame,
        _ => record,
    };
    RawCallFrame::deserialize(source)
        .map(CallFrame::from)
        .map_err(|e| NormalizeError::invalid("head", e))
}

#[cfg(test)]
mod tests {
    use super::*;
    use cpuprof_protocol::ANONYMOUS_FUNCTION;
    use serde_json::json;

    fn flatten_value(value: Value) -> Result<RawProfile, NormalizeError> {
        match value {
            Value::Object(obj) => flatten(obj),
            _ => panic!("fixture must be an object"),
        }
    }

    #[test]
    fn assigns_preorder_ids() {
        let raw = flatten_value(json!({
            "head": {
                "functionName": "(root)",
                "children": [
                    {"functionName": "a", "url": "/a.js", "children": [
                        {"functionName": "b", "url": "/b.js"}
                    ]},
                    {"functionName": "c", "url": "/c.js"}
                ]
            },
            "samples": [],
            "timeDeltas": []
        }))
        .expect("flatten");

        let names: Vec<_> = raw
            .nodes
            .iter()
            .map(|n| (n.id, n.call_frame.function_name.as_str()))
            .collect();
        assert_eq!(names, vec![(1, "(root)"), (2, "a"), (3, "b"), (4, "c")]);
        assert_eq!(raw.nodes[0].children, vec![2, 4]);
        assert_eq!(raw.nodes[1].children, vec![3]);
        assert_eq!(raw.nodes[2].parent, Some(2));
        assert_eq!(raw.nodes[3].parent, Some(1));
        assert_eq!(raw.nodes[0].parent, None);
    }

    #[test]
    fn reads_nested_call_frames_and_defaults() {
        let raw = flatten_value(json!({
            "head": {
                "callFrame": {"functionName": "(root)", "scriptId": 0},
                "children": [{"callFrame": {"url": "file:///x.js", "lineNumber": 4}}]
            },
            "samples": [],
            "timeDeltas": []
        }))
        .expect("flatten");

        let child = &raw.nodes[1].call_frame;
        assert_eq!(child.function_name, ANONYMOUS_FUNCTION);
        assert_eq!(child.url, "file:///x.js");
        assert_eq!(child.line_number, 4);
        assert_eq!(child.script_id, "0");
    }

    #[test]
    fn remaps_original_sample_ids() {
        let raw = flatten_value(json!({
            "head": {
                "id": 40, "functionName": "(root)",
                "children": [{"id": 77, "functionName": "work", "url": "/w.js"}]
            },
            "samples": [77, 77, 40, 5],
            "timestamps": [0, 10, 20, 30]
        }))
        .expect("flatten");

        assert_eq!(raw.timeline.samples, vec![2, 2, 1, UNATTRIBUTED]);
        assert_eq!(raw.timeline.time_deltas, vec![0.0, 10.0, 10.0, 10.0]);
    }

    #[test]
    fn deep_chain_does_not_recurse() {
        // Nest by moving values; `json!` would re-serialize the whole subtree
        // at every level.
        let mut record = json!({"functionName": "leaf"});
        for depth in 0..5_000 {
            let mut parent = Map::new();
            parent.insert("functionName".into(), Value::String(format!("f{depth}")));
            parent.insert("children".into(), Value::Array(vec![record]));
            record = Value::Object(parent);
        }
        let mut obj = Map::new();
        obj.insert("head".into(), record);
        obj.insert("samples".into(), json!([]));
        obj.insert("timeDeltas".into(), json!([]));

        let raw = flatten(obj).expect("flatten");
        assert_eq!(raw.nodes.len(), 5_001);
        assert_eq!(raw.nodes[5_000].call_frame.function_name, "leaf");
    }

    #[test]
    fn non_object_head_is_malformed() {
        let err = flatten_value(json!({"head": [], "samples": [], "timeDeltas": []}))
            .expect_err("should fail");
        assert_eq!(err.field(), Some("head"));
    }

    #[test]
    fn missing_samples_is_malformed() {
        let err = flatten_value(json!({"head": {"functionName": "(root)"}, "timeDeltas": []}))
            .expect_err("should fail");
        assert_eq!(err.field(), Some("samples"));
    }
}
