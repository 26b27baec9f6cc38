//! Normalization and statistical analysis of V8 CPU profiles.

pub mod analysis;
pub mod model;
pub mod parsers;

pub use analysis::{AnalyzeOptions, analyze};
pub use model::{CanonicalProfile, Node};
pub use parsers::{EncodingError, NormalizeError, normalize, normalize_value};

pub use cpuprof_protocol;
