pub mod chrome;
pub mod cpuprofile;
pub mod legacy;

use std::io::Read;

use cpuprof_protocol::{ProfileMeta, SourceFormat};
use flate2::read::MultiGzDecoder;
use serde_json::{Map, Value};
use thiserror::Error;
use tracing::debug;

use crate::model::{CanonicalProfile, Node};
use cpuprofile::Timeline;

const GZIP_MAGIC: [u8; 2] = [0x1f, 0x8b];

/// Input bytes that never became a JSON document.
#[derive(Debug, Error)]
pub enum EncodingError {
    #[error("invalid JSON: {0}")]
    Json(#[from] serde_json::Error),
    #[error("corrupt gzip stream: {0}")]
    Gzip(#[from] std::io::Error),
}

#[derive(Debug, Error)]
pub enum NormalizeError {
    #[error("invalid encoding: {0}")]
    InvalidEncoding(#[from] EncodingError),
    #[error("malformed profile: `{field}` {reason}")]
    MalformedProfile { field: &'static str, reason: String },
}

impl NormalizeError {
    pub(crate) fn missing(field: &'static str) -> Self {
        Self::MalformedProfile {
            field,
            reason: "is missing".to_string(),
        }
    }

    pub(crate) fn invalid(field: &'static str, reason: impl std::fmt::Display) -> Self {
        Self::MalformedProfile {
            field,
            reason: format!("is invalid: {reason}"),
        }
    }

    /// The offending field of a `MalformedProfile` error.
    pub fn field(&self) -> Option<&'static str> {
        match self {
            Self::MalformedProfile { field, .. } => Some(field),
            Self::InvalidEncoding(_) => None,
        }
    }
}

/// A node table plus its sample timeline, before metadata is attached.
#[derive(Debug)]
pub(crate) struct RawProfile {
    pub nodes: Vec<Node>,
    pub timeline: Timeline,
}

/// Top-level shape of a raw profile document.
enum ProfileShape {
    /// Chromium trace: bare event array or `{ "traceEvents": [...] }`.
    TraceEvents(Vec<Value>),
    Tree(TreeShape),
}

/// Shape of a profile object once any trace container is unwrapped.
enum TreeShape {
    /// Flat `nodes` table.
    NodeTable(Map<String, Value>),
    /// Legacy `head` record with nested `children` records.
    Nested(Map<String, Value>),
}

impl ProfileShape {
    fn detect(value: Value) -> Result<Self, NormalizeError> {
        match value {
            Value::Array(events) => Ok(Self::TraceEvents(events)),
            Value::Object(mut obj) => match obj.remove("traceEvents") {
                Some(Value::Array(events)) => Ok(Self::TraceEvents(events)),
                Some(_) => Err(NormalizeError::invalid("traceEvents", "not an array")),
                None => Ok(Self::Tree(TreeShape::from_object(obj))),
            },
            _ => Err(NormalizeError::invalid("nodes", "profile root is not an object")),
        }
    }
}

impl TreeShape {
    fn from_object(obj: Map<String, Value>) -> Self {
        if !obj.contains_key("nodes") && obj.get("head").is_some_and(Value::is_object) {
            Self::Nested(obj)
        } else {
            Self::NodeTable(obj)
        }
    }
}

/// Normalize raw profile bytes (optionally gzip-compressed JSON).
///
/// Accepted variants:
/// 1. Flat V8 `.cpuprofile` node table (Node.js `--cpu-prof`, DevTools export).
/// 2. Chromium trace with an embedded `CpuProfile` event or `ProfileChunk` events.
/// 3. Legacy nested `head` tree.
pub fn normalize(data: &[u8]) -> Result<CanonicalProfile, NormalizeError> {
    let compressed = data.starts_with(&GZIP_MAGIC);
    let value: Value = if compressed {
        let inflated = gunzip(data)?;
        serde_json::from_slice(&inflated).map_err(EncodingError::from)?
    } else {
        serde_json::from_slice(data).map_err(EncodingError::from)?
    };
    normalize_document(value, compressed)
}

/// Normalize an already parsed JSON document.
pub fn normalize_value(value: Value) -> Result<CanonicalProfile, NormalizeError> {
    normalize_document(value, false)
}

/// Inflate every gzip member of `data`, concatenated.
fn gunzip(data: &[u8]) -> Result<Vec<u8>, EncodingError> {
    let mut inflated = Vec::new();
    MultiGzDecoder::new(data).read_to_end(&mut inflated)?;
    Ok(inflated)
}

fn normalize_document(value: Value, compressed: bool) -> Result<CanonicalProfile, NormalizeError> {
    let (tree, source_format) = match ProfileShape::detect(value)? {
        ProfileShape::TraceEvents(events) => {
            let embedded = chrome::extract_profile(events)?;
            (TreeShape::from_object(embedded.profile), embedded.format)
        }
        ProfileShape::Tree(tree @ TreeShape::Nested(_)) => (tree, SourceFormat::Legacy),
        ProfileShape::Tree(tree) => (tree, SourceFormat::CpuProfile),
    };
    debug!(%source_format, compressed, "detected profile shape");

    let RawProfile { nodes, timeline } = match tree {
        TreeShape::NodeTable(obj) => cpuprofile::read_node_table(obj)?,
        TreeShape::Nested(obj) => legacy::flatten(obj)?,
    };

    let meta = ProfileMeta {
        source_format,
        compressed,
        start_time: timeline.start_time,
        end_time: timeline.end_time,
    };
    let profile = CanonicalProfile::new(meta, nodes, timeline.samples, timeline.time_deltas);
    debug!(
        nodes = profile.nodes().len(),
        samples = profile.sample_count(),
        "normalized profile"
    );
    Ok(profile)
}
