//! Output artifacts.
//!
//! Layout under the configured output directory:
//!
//! ```text
//! out/
//! ├── json/<id>.json        per-document record (replaced wholesale)
//! ├── logs/<id>_raw.json    generation trace for diagnostics
//! └── index.jsonl           one summary row per document, current run only
//! ```

use anyhow::{Context, Result};
use serde::Serialize;
use std::io::Write;
use std::path::{Path, PathBuf};

use crate::models::{DiagnosticLog, IndexRow, PersistedRecord};

const DIAGNOSTIC_SUFFIX: &str = "_raw.json";

#[derive(Debug, Clone)]
pub struct OutputLayout {
    pub json_dir: PathBuf,
    pub log_dir: PathBuf,
    pub index_path: PathBuf,
}

impl OutputLayout {
    pub fn new(dir: &Path) -> Self {
        Self {
            json_dir: dir.join("json"),
            log_dir: dir.join("logs"),
            index_path: dir.join("index.jsonl"),
        }
    }

    pub fn ensure_dirs(&self) -> Result<()> {
        for dir in [&self.json_dir, &self.log_dir] {
            std::fs::create_dir_all(dir)
                .with_context(|| format!("Failed to create output directory: {}", dir.display()))?;
        }
        Ok(())
    }

    pub fn record_path(&self, id: &str) -> PathBuf {
        self.json_dir.join(format!("{}.json", id))
    }

    pub fn diagnostic_path(&self, id: &str) -> PathBuf {
        self.log_dir.join(format!("{}{}", id, DIAGNOSTIC_SUFFIX))
    }

    pub fn write_record(&self, record: &PersistedRecord) -> Result<PathBuf> {
        let path = self.record_path(&record.id);
        write_json_atomic(&path, record)?;
        Ok(path)
    }

    pub fn write_diagnostic(&self, log: &DiagnosticLog) -> Result<PathBuf> {
        let path = self.diagnostic_path(&log.id);
        write_json_atomic(&path, log)?;
        Ok(path)
    }
}

/// Pretty-print `value` to a sibling temp file, then rename it over `path`.
pub fn write_json_atomic<T: Serialize>(path: &Path, value: &T) -> Result<()> {
    let json = serde_json::to_string_pretty(value)?;
    let mut tmp_name = path.as_os_str().to_owned();
    tmp_name.push(".tmp");
    let tmp = PathBuf::from(tmp_name);

    std::fs::write(&tmp, json.as_bytes())
        .with_context(|| format!("Failed to write {}", tmp.display()))?;
    std::fs::rename(&tmp, path)
        .with_context(|| format!("Failed to replace {}", path.display()))?;
    Ok(())
}

/// Run-scoped append-only summary log. Not safe for concurrent writers.
#[derive(Debug)]
pub struct RunLog {
    path: PathBuf,
    rows: usize,
}

impl RunLog {
    /// Delete any log left by a previous run and start an empty one.
    pub fn start(path: &Path) -> Result<Self> {
        match std::fs::remove_file(path) {
            Ok(()) => {}
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => {}
            Err(e) => {
                return Err(e).with_context(|| format!("Failed to reset {}", path.display()))
            }
        }
        Ok(Self {
            path: path.to_path_buf(),
            rows: 0,
        })
    }

    /// Append one compact JSON line.
    pub fn append(&mut self, row: &IndexRow) -> Result<()> {
        let line = serde_json::to_string(row)?;
        let mut file = std::fs::OpenOptions::new()
            .create(true)
            .append(true)
            .open(&self.path)
            .with_context(|| format!("Failed to open {}", self.path.display()))?;
        writeln!(file, "{}", line)
            .with_context(|| format!("Failed to append to {}", self.path.display()))?;
        self.rows += 1;
        Ok(())
    }

    pub fn rows(&self) -> usize {
        self.rows
    }
}
