//! Crate-wide error type.

use std::path::PathBuf;

use thiserror::Error;

/// Errors that can occur while loading models, validating configuration,
/// or running the synthesis-and-search engine.
///
/// Only [`EngineError::MalformedInput`] and [`EngineError::ExternalTool`]
/// are actually fatal (see §7 of the design document): the "no
/// controller" and "minimizer regression" conditions are represented
/// structurally (an `Option::None` or a reinstated frontier) rather than
/// as errors, and unreachable preferred behaviors are simply excluded
/// from the search rather than reported.
#[derive(Debug, Error)]
pub enum EngineError {
    /// A model file could not be parsed, or referred to a state or event
    /// that is not part of the automaton being built.
    #[error("malformed input in {path}: {reason}")]
    MalformedInput {
        /// The file that failed to parse.
        path: PathBuf,
        /// A human-readable description of the problem.
        reason: String,
    },

    /// Language comparison or composition was attempted over automata
    /// with incompatible alphabets.
    #[error("domain error: {0}")]
    Domain(String),

    /// The configuration is inconsistent, e.g. a controllable event that
    /// is not also observable.
    #[error("invalid configuration: {0}")]
    InvalidConfig(String),

    /// Invoking the external process-algebra-to-automaton converter
    /// failed or returned a non-zero exit code.
    #[error("external tool failed on {path} with exit code {exit_code:?}")]
    ExternalTool {
        /// The model file being converted.
        path: PathBuf,
        /// The process exit code, if any.
        exit_code: Option<i32>,
    },

    /// An I/O error occurred while reading a model file or managing the
    /// staging directory.
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// An explicit automaton JSON file could not be decoded.
    #[error("JSON error in {path}: {source}")]
    Json {
        /// The file that failed to decode.
        path: PathBuf,
        /// The underlying decode error.
        #[source]
        source: serde_json::Error,
    },
}

/// A convenience result type for this crate.
pub type Result<T> = std::result::Result<T, EngineError>;
