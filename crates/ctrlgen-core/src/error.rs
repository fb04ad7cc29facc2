//! Error types for controller generation.

use std::path::PathBuf;

use crate::diag::Diagnostic;

/// Errors that abort a generation pass before anything is written to the sink.
#[derive(Debug, thiserror::Error)]
pub enum GenError {
    /// YAML deserialization error.
    #[error("YAML parse error: {0}")]
    Yaml(#[from] serde_yaml::Error),

    /// I/O error while maintaining a cell library.
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// The output sink refused a write.
    #[error("failed to write to output sink")]
    Fmt(#[from] std::fmt::Error),

    /// A node that must be a mapping is something else.
    #[error("{context}: expected a mapping")]
    InvalidNode {
        /// Where the node was found.
        context: String,
    },

    /// A required key is missing.
    #[error("{context}: missing required field `{field}`")]
    MissingField {
        /// Where the key was expected.
        context: String,
        /// The key name.
        field: String,
    },

    /// A key holds a value that cannot be used.
    #[error("{context}: {detail}")]
    InvalidValue {
        /// Where the value was found.
        context: String,
        /// Description of the problem.
        detail: String,
    },

    /// A reference names a signal or domain that was never declared.
    #[error("{context}: `{source_name}` is not declared")]
    UndeclaredSource {
        /// Where the reference was found.
        context: String,
        /// The undeclared name.
        source_name: String,
    },

    /// Validation collected one or more diagnostics that forbid emission.
    #[error("{domain} generation aborted: {summary}")]
    Validation {
        /// Generator domain (`clock`, `reset`, `power`).
        domain: &'static str,
        /// First aborting message, plus a count of the rest.
        summary: String,
        /// Every diagnostic recorded during the pass.
        diagnostics: Vec<Diagnostic>,
    },

    /// A cell library file could not be read or written.
    #[error("cell library {}: {detail}", path.display())]
    CellFile {
        /// The library file.
        path: PathBuf,
        /// Description of the failure.
        detail: String,
    },
}

/// Result type for generation operations.
pub type Result<T> = std::result::Result<T, GenError>;
