use cpuprof_protocol::SourceFormat;
use serde::Deserialize;
use serde_json::{Map, Value};
use tracing::{debug, warn};

use super::NormalizeError;

const CPU_PROFILE_EVENT: &str = "CpuProfile";
const PROFILE_EVENT: &str = "Profile";
const PROFILE_CHUNK_EVENT: &str = "ProfileChunk";

/// Raw Chrome trace event; only the fields needed to locate a profile.
#[derive(Debug, Deserialize)]
struct TraceEvent {
    #[serde(default)]
    name: String,
    /// Links `Profile` and `ProfileChunk` events of one profiling session.
    #[serde(default)]
    id: Option<Value>,
    #[serde(default)]
    args: Option<Value>,
}

impl TraceEvent {
    /// `args.data` when present, else `args` itself.
    fn payload(&self) -> Option<&Value> {
        self.args.as_ref().map(|args| args.get("data").unwrap_or(args))
    }

    fn carries_profile(&self) -> bool {
        self.name == CPU_PROFILE_EVENT
            || self.payload().is_some_and(|p| p.get("cpuProfile").is_some())
    }

    fn into_payload(self) -> Option<Value> {
        self.args.map(|args| match args {
            Value::Object(mut map) => map.remove("data").unwrap_or(Value::Object(map)),
            other => other,
        })
    }

    /// The embedded `cpuProfile`, or the whole payload of a `CpuProfile` event.
    fn into_embedded_profile(self) -> Option<Value> {
        let is_cpu_profile = self.name == CPU_PROFILE_EVENT;
        let mut payload = self.into_payload()?;
        if let Some(profile) = payload.get_mut("cpuProfile") {
            return Some(profile.take());
        }
        is_cpu_profile.then_some(payload)
    }
}

/// A profile object found inside a trace container.
pub(crate) struct EmbeddedProfile {
    pub profile: Map<String, Value>,
    pub format: SourceFormat,
}

/// Locate the CPU profile inside a list of trace events.
///
/// A single event named `CpuProfile` (or carrying a `cpuProfile` payload)
/// wins. Otherwise the `ProfileChunk` events of the first profiling session
/// are concatenated in trace order. Events that do not deserialize are
/// skipped.
pub(crate) fn extract_profile(events: Vec<Value>) -> Result<EmbeddedProfile, NormalizeError> {
    let total = events.len();
    let mut events: Vec<TraceEvent> = events
        .into_iter()
        .filter_map(|event| serde_json::from_value(event).ok())
        .collect();
    if events.len() < total {
        warn!(
            skipped = total - events.len(),
            "ignoring unreadable trace events"
        );
    }

    if let Some(pos) = events
        .iter()
        .position(|e| e.name != PROFILE_CHUNK_EVENT && e.carries_profile())
    {
        let event = events.swap_remove(pos);
        debug!(event = %event.name, "found embedded cpu profile event");
        return match event.into_embedded_profile() {
            Some(Value::Object(profile)) => Ok(EmbeddedProfile {
                profile,
                format: SourceFormat::TraceEvents,
            }),
            _ => Err(NormalizeError::invalid("cpuProfile", "not an object")),
        };
    }

    merge_chunks(events)
}

fn merge_chunks(events: Vec<TraceEvent>) -> Result<EmbeddedProfile, NormalizeError> {
    let session = events
        .iter()
        .find(|e| e.name == PROFILE_EVENT)
        .or_else(|| events.iter().find(|e| e.name == PROFILE_CHUNK_EVENT))
        .map(|e| e.id.clone());
    let Some(session) = session else {
        return Err(NormalizeError::MalformedProfile {
            field: "cpuProfile",
            reason: "not found in any trace event".to_string(),
        });
    };

    let mut start_time = None;
    let mut nodes = Vec::new();
    let mut samples = Vec::new();
    let mut time_deltas = Vec::new();
    let mut chunks = 0usize;

    for event in events {
        if event.id != session {
            continue;
        }
        let is_chunk = match event.name.as_str() {
            PROFILE_EVENT => false,
            PROFILE_CHUNK_EVENT => true,
            _ => continue,
        };
        let Some(mut payload) = event.into_payload() else {
            continue;
        };
        if !is_chunk {
            start_time = start_time.or_else(|| payload.get("startTime").and_then(Value::as_f64));
            continue;
        }

        chunks += 1;
        let mut profile = payload
            .get_mut("cpuProfile")
            .map(Value::take)
            .unwrap_or(Value::Null);
        extend_array(&mut nodes, profile.get_mut("nodes"), "nodes")?;
        extend_array(&mut samples, profile.get_mut("samples"), "samples")?;
        let deltas = match payload.get_mut("timeDeltas") {
            Some(deltas) => Some(deltas),
            None => profile.get_mut("timeDeltas"),
        };
        extend_array(&mut time_deltas, deltas, "timeDeltas")?;
    }
    debug!(chunks, nodes = nodes.len(), samples = samples.len(), "merged profile chunks");

    let start_time = start_time.unwrap_or(0.0);
    let elapsed: f64 = time_deltas.iter().filter_map(Value::as_f64).sum();

    let mut profile = Map::new();
    profile.insert("nodes".to_string(), Value::Array(nodes));
    profile.insert("samples".to_string(), Value::Array(samples));
    profile.insert("timeDeltas".to_string(), Value::Array(time_deltas));
    profile.insert("startTime".to_string(), start_time.into());
    profile.insert("endTime".to_string(), (start_time + elapsed).into());
    Ok(EmbeddedProfile {
        profile,
        format: SourceFormat::TraceChunks,
    })
}

fn extend_array(
    target: &mut Vec<Value>,
    source: Option<&mut Value>,
    field: &'static str,
) -> Result<(), NormalizeError> {
    match source.map(Value::take) {
        Some(Value::Array(items)) => {
            target.extend(items);
            Ok(())
        }
        None | Some(Value::Null) => Ok(()),
        Some(_) => Err(NormalizeError::invalid(field, "chunk entry is not an array")),
    }
}
