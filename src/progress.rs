//! Run progress reporting.
//!
//! Reports per-document progress during `paperlift run` so users can see
//! which document is being processed and how it ended. Progress is
//! emitted on **stderr** so stdout remains parseable for scripts.

use std::io::Write;

/// A single progress event for a run.
#[derive(Clone, Debug)]
pub enum RunProgressEvent {
    /// Discovery finished with `total` documents to process.
    Started { total: u64 },
    /// Document `n` of `total` is being processed.
    Processing { n: u64, total: u64, filename: String },
    /// The document was persisted with extracted metadata.
    Succeeded { title: Option<String> },
    /// The document failed; `persisted` tells whether an error record was written.
    Failed { error: String, persisted: bool },
}

/// Reports run progress. Implementations write to stderr (human or JSON).
pub trait RunProgressReporter: Send + Sync {
    /// Emit a progress event. Called from the run loop.
    fn report(&self, event: RunProgressEvent);
}

/// Characters of a title shown on the human progress line.
const TITLE_PREVIEW_CHARS: usize = 90;

/// Human-friendly progress on stderr: "[3/1,204] Processing: paper.pdf".
pub struct StderrProgress;

impl RunProgressReporter for StderrProgress {
    fn report(&self, event: RunProgressEvent) {
        let line = match &event {
            RunProgressEvent::Started { total } => {
                format!("Found {} documents.\n", format_number(*total))
            }
            RunProgressEvent::Processing { n, total, filename } => format!(
                "[{}/{}] Processing: {}\n",
                format_number(*n),
                format_number(*total),
                filename
            ),
            RunProgressEvent::Succeeded { title } => {
                let preview: String = title
                    .as_deref()
                    .unwrap_or("")
                    .chars()
                    .take(TITLE_PREVIEW_CHARS)
                    .collect();
                format!("  -> OK | title: {}\n", preview)
            }
            RunProgressEvent::Failed { error, .. } => format!("  -> FAILED: {}\n", error),
        };
        let _ = std::io::stderr().lock().write_all(line.as_bytes());
        let _ = std::io::stderr().lock().flush();
    }
}

/// Machine-readable progress: one JSON object per line on stderr.
pub struct JsonProgress;

impl RunProgressReporter for JsonProgress {
    fn report(&self, event: RunProgressEvent) {
        let obj = match &event {
            RunProgressEvent::Started { total } => serde_json::json!({
                "event": "started",
                "total": total
            }),
            RunProgressEvent::Processing { n, total, filename } => serde_json::json!({
                "event": "processing",
                "n": n,
                "total": total,
                "filename": filename
            }),
            RunProgressEvent::Succeeded { title } => serde_json::json!({
                "event": "succeeded",
                "title": title
            }),
            RunProgressEvent::Failed { error, persisted } => serde_json::json!({
                "event": "failed",
                "error": error,
                "persisted": persisted
            }),
        };
        if let Ok(line) = serde_json::to_string(&obj) {
            let _ = writeln!(std::io::stderr().lock(), "{}", line);
            let _ = std::io::stderr().lock().flush();
        }
    }
}

/// No-op reporter when progress is disabled.
pub struct NoProgress;

impl RunProgressReporter for NoProgress {
    fn report(&self, _event: RunProgressEvent) {}
}

pub fn format_number(n: u64) -> String {
    let s = n.to_string();
    let mut result = String::with_capacity(s.len() + (s.len() - 1) / 3);
    let chars: Vec<char> = s.chars().rev().collect();
    for (i, c) in chars.iter().enumerate() {
        if i > 0 && i % 3 == 0 {
            result.push(',');
        }
        result.push(*c);
    }
    result.chars().rev().collect()
}

/// Progress mode for the CLI: off, human (stderr), or JSON (stderr).
#[derive(Clone, Copy, Debug, Eq, PartialEq, clap::ValueEnum)]
pub enum ProgressMode {
    Off,
    Human,
    Json,
}

impl ProgressMode {
    /// Default: human progress when stderr is a TTY, otherwise off.
    pub fn default_for_tty() -> Self {
        if atty::is(atty::Stream::Stderr) {
            ProgressMode::Human
        } else {
            ProgressMode::Off
        }
    }

    /// Build a reporter for this mode.
    pub fn reporter(&self) -> Box<dyn RunProgressReporter> {
        match self {
            ProgressMode::Off => Box::new(NoProgress),
            ProgressMode::Human => Box::new(StderrProgress),
            ProgressMode::Json => Box::new(JsonProgress),
        }
    }
}
