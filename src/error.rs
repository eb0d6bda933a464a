//! Error types for the expected failure paths of the pipeline.
//!
//! None of these escape the per-document boundary: slicing failures and
//! exhausted generation/parse failures end up as the `error` marker of the
//! persisted record. Unexpected faults (artifact writes) use `anyhow`.

use std::path::PathBuf;
use thiserror::Error;

/// Failure to open or read a document.
#[derive(Error, Debug)]
pub enum SliceError {
    #[error("failed to read {}: {source}", .path.display())]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("PDF could not be opened: {0}")]
    Pdf(String),

    #[error("unsupported document type: {0}")]
    Unsupported(String),
}

/// Failure of a single call to the generation service.
#[derive(Error, Debug)]
pub enum GenerationError {
    #[error("generation request failed: {0}")]
    Transport(String),

    #[error("generation request timed out after {0}s")]
    Timeout(u64),

    #[error("generation service returned {status}: {body}")]
    Status { status: u16, body: String },

    #[error("invalid generation service response: {0}")]
    InvalidBody(String),
}

/// No structured object could be recovered from generated text.
#[derive(Error, Debug, PartialEq, Eq)]
pub enum ParseError {
    #[error("empty model response")]
    Empty,

    #[error("no JSON object found in model response. Response was: {prefix}")]
    NoObject { prefix: String },

    #[error("JSON parsing failed: {reason}. Extracted JSON began: {prefix}")]
    InvalidJson { reason: String, prefix: String },
}

/// Failure of one generate-then-parse unit; both kinds consume a retry.
#[derive(Error, Debug)]
pub enum CallError {
    #[error(transparent)]
    Generation(#[from] GenerationError),

    #[error(transparent)]
    Parse(#[from] ParseError),
}

/// Per-document faults seen by the run supervisor.
#[derive(Error, Debug)]
pub enum PipelineError {
    /// The document's bytes could not be hashed, so it has no identity and
    /// no artifacts. Isolated to this document.
    #[error("cannot identify {}: {source}", .path.display())]
    Identity {
        path: PathBuf,
        #[source]
        source: SliceError,
    },

    /// An output artifact could not be written. Aborts the run.
    #[error(transparent)]
    Persist(anyhow::Error),
}

/// Bounded, char-boundary-safe prefix of `text` for diagnostics.
pub fn bounded_prefix(text: &str, max_chars: usize) -> String {
    text.chars().take(max_chars).collect()
}
