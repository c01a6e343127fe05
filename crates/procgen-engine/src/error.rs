//! Error types for the procedural engine

use thiserror::Error;

/// Result type alias using ProcEngineError
pub type Result<T> = std::result::Result<T, ProcEngineError>;

/// Errors that can occur in the procedural engine
///
/// Invalid module or port references during interactive edits are not
/// represented here: graph operations log them and return without effect.
#[derive(Debug, Error)]
pub enum ProcEngineError {
    /// No module is flagged as main entry and none could be repaired
    #[error("No main entry module in procedure")]
    MissingMainEntry,

    /// Evaluation revisited a module that is still being evaluated
    #[error("Cycle detected while evaluating module {module}")]
    CycleDetected { module: usize },

    /// A persisted record carries a version this build cannot read
    #[error("Unsupported {record} version {found} (supported up to {supported})")]
    UnsupportedVersion {
        record: &'static str,
        found: u16,
        supported: u16,
    },

    /// A module record names a generator type missing from the registry
    #[error("Unknown module type: {0}")]
    UnknownModuleType(String),

    /// A layout record names a node type this build does not know
    #[error("Unknown layout type: {0}")]
    UnknownLayoutType(String),

    /// Malformed or truncated binary data
    #[error("Decode error: {0}")]
    Decode(String),

    /// Decoded generator does not match the port tables stored with it
    #[error("Port mismatch for '{module}': expected {expected_inputs}/{expected_outputs}, found {found_inputs}/{found_outputs}")]
    PortMismatch {
        module: String,
        expected_inputs: usize,
        expected_outputs: usize,
        found_inputs: usize,
        found_outputs: usize,
    },

    /// A generator failed while producing its entries
    #[error("Evaluation failed: {0}")]
    EvaluationFailed(String),

    /// Compression error
    #[error("Compression error: {0}")]
    Compression(String),

    /// Serialization error
    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),

    /// I/O error
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),
}

impl ProcEngineError {
    /// Create an evaluation failed error with a message
    pub fn failed(msg: impl Into<String>) -> Self {
        Self::EvaluationFailed(msg.into())
    }

    /// Create a decode error with a message
    pub fn decode(msg: impl Into<String>) -> Self {
        Self::Decode(msg.into())
    }
}
