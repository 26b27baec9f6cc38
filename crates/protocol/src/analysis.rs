use indexmap::IndexSet;
use serde::{Deserialize, Serialize};

use crate::{CallFrame, CallTree, FunctionKey};

/// The complete statistical model derived from one CPU profile.
///
/// ```text
///   .cpuprofile ─┐
///   trace JSON  ─┼─▶ CanonicalProfile ──▶ AnalysisResult ──▶ presentation
///   legacy head ─┘     (cpuprof-core)          (this)        (tables, trees…)
/// ```
///
/// Built once per conversion and never mutated afterwards. All times are in
/// the profile's own unit (microseconds for V8 profiles).
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AnalysisResult {
    pub meta: ProfileMeta,
    /// Sum of every sample's time delta.
    pub total_time: f64,
    pub sample_count: usize,
    /// `total_time / sample_count`, 0 for a profile without samples.
    pub mean_sample_interval: f64,
    /// One record per distinct function, in first-seen node order.
    pub functions: Vec<FunctionStats>,
    pub call_tree: CallTree,
    pub hotspots: Vec<Hotspot>,
    pub critical_paths: Vec<CriticalPath>,
}

impl AnalysisResult {
    /// First hotspot whose function name matches exactly.
    pub fn hotspot_by_name(&self, name: &str) -> Option<&Hotspot> {
        self.hotspots
            .iter()
            .find(|h| h.call_frame.function_name == name)
    }

    /// Wall-clock span between the recorded start and end timestamps.
    pub fn duration(&self) -> f64 {
        self.meta.end_time - self.meta.start_time
    }
}

/// Metadata carried over from the raw profile.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ProfileMeta {
    pub source_format: SourceFormat,
    /// Whether the input arrived gzip-compressed.
    pub compressed: bool,
    /// Profile start timestamp, 0 when absent.
    pub start_time: f64,
    /// Profile end timestamp, 0 when absent.
    pub end_time: f64,
}

/// The serialization variant a profile was read from. Informational only.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub enum SourceFormat {
    /// Flat `nodes` table (`.cpuprofile`, Node.js `--cpu-prof`).
    CpuProfile,
    /// Profile embedded in a single Chromium trace event.
    TraceEvents,
    /// Profile reassembled from Chromium `ProfileChunk` trace events.
    TraceChunks,
    /// Legacy nested `head` record tree.
    Legacy,
}

impl std::fmt::Display for SourceFormat {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::CpuProfile => write!(f, "V8 CPU Profile"),
            Self::TraceEvents => write!(f, "Chrome Trace"),
            Self::TraceChunks => write!(f, "Chrome Trace (chunked)"),
            Self::Legacy => write!(f, "Legacy CPU Profile"),
        }
    }
}

/// Aggregate over every tree node sharing one function identity.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct FunctionStats {
    pub key: FunctionKey,
    /// Script id of the first node seen for this function.
    pub script_id: String,
    pub self_time: f64,
    /// Sum of each contributing node's own total time. A function reached
    /// from several call sites may exceed the profile's total time.
    pub total_time: f64,
    pub self_percent: f64,
    pub total_percent: f64,
    pub hit_count: u64,
    /// Distinct calling functions, first-seen order.
    pub callers: IndexSet<FunctionKey>,
    /// Distinct called functions, first-seen order.
    pub callees: IndexSet<FunctionKey>,
}

/// A function promoted into the ranked hotspot list.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Hotspot {
    /// 1-based rank, heaviest self time first.
    pub rank: usize,
    pub kind: HotspotKind,
    pub call_frame: CallFrame,
    pub self_time: f64,
    pub total_time: f64,
    pub self_percent: f64,
    pub total_percent: f64,
    pub hit_count: u64,
    pub callers: Vec<FunctionKey>,
    pub callees: Vec<FunctionKey>,
}

/// Where a hotspot's code comes from.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum HotspotKind {
    /// Engine builtins, runtime internals, and third-party dependencies.
    Native,
    /// Application code with a resolvable location.
    App,
    Unknown,
}

impl std::fmt::Display for HotspotKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Native => write!(f, "native"),
            Self::App => write!(f, "app"),
            Self::Unknown => write!(f, "unknown"),
        }
    }
}

/// A root-to-leaf route through the call tree.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CriticalPath {
    /// Call-tree arena indices, root first, leaf last.
    pub nodes: Vec<usize>,
    /// Sum of the self percent of every node on the path.
    pub cumulative_percent: f64,
}

/// Format a microsecond value for display.
pub fn format_duration(us: f64) -> String {
    if us >= 1_000_000.0 {
        format!("{:.2}s", us / 1_000_000.0)
    } else if us >= 1_000.0 {
        format!("{:.1}ms", us / 1_000.0)
    } else {
        format!("{:.0}µs", us)
    }
}
