use std::collections::HashMap;

use cpuprof_protocol::{ANONYMOUS_FUNCTION, CallFrame};
use indexmap::IndexSet;
use serde::Deserialize;
use serde_json::{Map, Value};
use tracing::warn;

use super::{NormalizeError, RawProfile};
use crate::model::Node;

/// V8 CPU profile node as found in the flat `nodes` table.
#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct CpuProfileNode {
    id: u64,
    #[serde(default)]
    call_frame: RawCallFrame,
    #[serde(default)]
    parent: Option<u64>,
    #[serde(default)]
    children: Option<Vec<u64>>,
}

/// Call frame with every field optional; missing fields get placeholders.
#[derive(Debug, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub(crate) struct RawCallFrame {
    #[serde(default)]
    function_name: Option<String>,
    #[serde(default)]
    url: Option<String>,
    #[serde(default)]
    script_id: Option<ScriptId>,
    #[serde(default)]
    line_number: Option<i64>,
    #[serde(default)]
    column_number: Option<i64>,
}

/// Engines emit script ids as either numbers or strings.
#[derive(Debug, Deserialize)]
#[serde(untagged)]
enum ScriptId {
    Number(i64),
    Text(String),
}

impl From<RawCallFrame> for CallFrame {
    fn from(raw: RawCallFrame) -> Self {
        let function_name = match raw.function_name {
            Some(name) if !name.is_empty() => name,
            _ => ANONYMOUS_FUNCTION.to_string(),
        };
        let script_id = match raw.script_id {
            Some(ScriptId::Number(n)) => n.to_string(),
            Some(ScriptId::Text(s)) => s,
            None => "0".to_string(),
        };
        CallFrame {
            function_name,
            url: raw.url.unwrap_or_default(),
            line_number: raw.line_number.unwrap_or(-1),
            column_number: raw.column_number.unwrap_or(-1),
            script_id,
        }
    }
}

/// Sample sequence and timing shared by every profile variant.
#[derive(Debug, Clone, PartialEq)]
pub struct Timeline {
    pub samples: Vec<u64>,
    pub time_deltas: Vec<f64>,
    pub start_time: f64,
    pub end_time: f64,
}

/// Read a flat node table and reconcile parent and children links.
pub(crate) fn read_node_table(mut obj: Map<String, Value>) -> Result<RawProfile, NormalizeError> {
    let nodes = match obj.remove("nodes") {
        Some(value @ Value::Array(_)) => serde_json::from_value::<Vec<CpuProfileNode>>(value)
            .map_err(|e| NormalizeError::invalid("nodes", e))?,
        Some(_) => return Err(NormalizeError::invalid("nodes", "not an array")),
        None => return Err(NormalizeError::missing("nodes")),
    };
    let timeline = read_timeline(&mut obj)?;
    Ok(RawProfile {
        nodes: reconcile(nodes),
        timeline,
    })
}

/// Extract `samples`, `timeDeltas` (or legacy `timestamps`), and the
/// optional start/end timestamps.
pub(crate) fn read_timeline(obj: &mut Map<String, Value>) -> Result<Timeline, NormalizeError> {
    let start_time = obj.get("startTime").and_then(Value::as_f64).unwrap_or(0.0);
    let end_time = obj.get("endTime").and_then(Value::as_f64).unwrap_or(0.0);

    let mut samples: Vec<u64> = match obj.remove("samples") {
        Some(value) => {
            serde_json::from_value(value).map_err(|e| NormalizeError::invalid("samples", e))?
        }
        None => return Err(NormalizeError::missing("samples")),
    };

    let mut time_deltas: Vec<f64> = match (obj.remove("timeDeltas"), obj.remove("timestamps")) {
        (Some(value), _) => {
            serde_json::from_value(value).map_err(|e| NormalizeError::invalid("timeDeltas", e))?
        }
        (None, Some(value)) => {
            let timestamps: Vec<f64> = serde_json::from_value(value)
                .map_err(|e| NormalizeError::invalid("timestamps", e))?;
            deltas_from_timestamps(&timestamps)
        }
        (None, None) => return Err(NormalizeError::missing("timeDeltas")),
    };

    if samples.len() != time_deltas.len() {
        warn!(
            samples = samples.len(),
            time_deltas = time_deltas.len(),
            "sample and time delta counts differ, truncating to the shorter"
        );
        let len = samples.len().min(time_deltas.len());
        samples.truncate(len);
        time_deltas.truncate(len);
    }

    let negative = time_deltas.iter().filter(|d| **d < 0.0).count();
    if negative > 0 {
        warn!(negative, "clamping negative time deltas to zero");
        for delta in &mut time_deltas {
            *delta = delta.max(0.0);
        }
    }

    Ok(Timeline {
        samples,
        time_deltas,
        start_time,
        end_time,
    })
}

/// Legacy profiles carry absolute sample timestamps. The first sample has
/// no predecessor and gets a zero delta.
fn deltas_from_timestamps(timestamps: &[f64]) -> Vec<f64> {
    let mut deltas = Vec::with_capacity(timestamps.len());
    if !timestamps.is_empty() {
        deltas.push(0.0);
    }
    deltas.extend(timestamps.windows(2).map(|w| w[1] - w[0]));
    deltas
}

/// Rebuild consistent links: each node's children become the union of its
/// own list and every node declaring it as parent, and children without a
/// parent adopt the node listing them. Dangling ids are dropped.
fn reconcile(raw: Vec<CpuProfileNode>) -> Vec<Node> {
    let mut nodes: Vec<Node> = Vec::with_capacity(raw.len());
    let mut index: HashMap<u64, usize> = HashMap::with_capacity(raw.len());
    let mut duplicates = 0usize;
    for node in raw {
        if index.contains_key(&node.id) {
            duplicates += 1;
            continue;
        }
        index.insert(node.id, nodes.len());
        nodes.push(Node {
            id: node.id,
            call_frame: node.call_frame.into(),
            parent: node.parent,
            children: node.children.unwrap_or_default(),
        });
    }
    if duplicates > 0 {
        warn!(duplicates, "ignoring nodes with duplicate ids");
    }

    let mut dangling = 0usize;
    for node in &mut nodes {
        if let Some(parent) = node.parent
            && (parent == node.id || !index.contains_key(&parent))
        {
            node.parent = None;
            dangling += 1;
        }
    }

    let mut children: Vec<IndexSet<u64>> = Vec::with_capacity(nodes.len());
    for node in &mut nodes {
        let mut set = IndexSet::new();
        for child in std::mem::take(&mut node.children) {
            if child != node.id && index.contains_key(&child) {
                set.insert(child);
            } else {
                dangling += 1;
            }
        }
        children.push(set);
    }
    for node in &nodes {
        if let Some(parent) = node.parent
            && let Some(&pos) = index.get(&parent)
        {
            children[pos].insert(node.id);
        }
    }
    if dangling > 0 {
        warn!(dangling, "dropped references to unknown node ids");
    }

    for (pos, kids) in children.iter().enumerate() {
        let parent_id = nodes[pos].id;
        for kid in kids {
            if let Some(&child_pos) = index.get(kid)
                && nodes[child_pos].parent.is_none()
            {
                nodes[child_pos].parent = Some(parent_id);
            }
        }
    }

    for (node, kids) in nodes.iter_mut().zip(children) {
        node.children = kids.into_iter().collect();
    }
    nodes
}
