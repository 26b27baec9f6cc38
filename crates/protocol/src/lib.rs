pub mod analysis;
pub mod call_tree;
pub mod frame;

pub use analysis::{
    AnalysisResult, CriticalPath, FunctionStats, Hotspot, HotspotKind, ProfileMeta, SourceFormat,
    format_duration,
};
pub use call_tree::{CallTree, CallTreeNode};
pub use frame::{ANONYMOUS_FUNCTION, CallFrame, FunctionKey};
