use serde::{Deserialize, Serialize};

/// Placeholder used when a frame carries no function name.
pub const ANONYMOUS_FUNCTION: &str = "(anonymous)";

/// Identity of executable code at one position in a sampled call tree.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CallFrame {
    pub function_name: String,
    /// Script URL or filesystem path. Empty for engine-internal frames.
    pub url: String,
    /// Zero-based line, or -1 when unknown.
    pub line_number: i64,
    /// Zero-based column, or -1 when unknown.
    pub column_number: i64,
    /// Opaque script identifier assigned by the engine.
    pub script_id: String,
}

impl CallFrame {
    /// The identity under which nodes are merged into one function.
    pub fn key(&self) -> FunctionKey {
        FunctionKey {
            function_name: self.function_name.clone(),
            url: self.url.clone(),
            line_number: self.line_number,
            column_number: self.column_number,
        }
    }
}

impl Default for CallFrame {
    fn default() -> Self {
        Self {
            function_name: ANONYMOUS_FUNCTION.to_string(),
            url: String::new(),
            line_number: -1,
            column_number: -1,
            script_id: "0".to_string(),
        }
    }
}

/// Two frames name the same function iff name, URL, line and column match.
///
/// The script id is not part of the identity.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct FunctionKey {
    pub function_name: String,
    pub url: String,
    pub line_number: i64,
    pub column_number: i64,
}

impl std::fmt::Display for FunctionKey {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        if self.url.is_empty() {
            return write!(f, "{}", self.function_name);
        }
        write!(f, "{} ({}", self.function_name, self.url)?;
        if self.line_number >= 0 {
            // Lines are stored zero-based; humans count from one.
            write!(f, ":{}", self.line_number + 1)?;
        }
        write!(f, ")")
    }
}
