//! Core data models used throughout the extraction pipeline.
//!
//! These types represent the documents, excerpts, generation attempts and
//! records that flow from discovery to the persisted artifacts. Field
//! names of the serialized types are the on-disk contract read by
//! downstream indexing and aggregation tools.

use serde::{Deserialize, Serialize};

/// File-level metadata of a discovered document.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct FileMeta {
    pub path: String,
    pub filename: String,
    pub size_bytes: u64,
    /// Local time, `%Y-%m-%dT%H:%M:%S`, no timezone suffix.
    pub modified_time: String,
}

/// A paginated input document identified by the SHA-256 of its bytes.
#[derive(Debug, Clone)]
pub struct SourceDocument {
    pub id: String,
    pub file: FileMeta,
    pub page_count: usize,
}

/// Which page window produced an excerpt.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum SliceWindow {
    Primary,
    Fallback,
}

/// Bounded excerpt of a document's leading pages.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ContentSlice {
    pub text: String,
    /// Number of characters (not bytes) in `text`.
    pub char_count: usize,
    pub window: SliceWindow,
    /// Pages read for this excerpt after clamping to the document length.
    pub pages_read: usize,
}

/// One call to the generation service, kept for diagnostics only.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ExtractionAttempt {
    pub prompt: String,
    pub raw_response: Option<String>,
    /// Zero-based index of the attempt that produced this trace.
    pub attempt: u32,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
}

/// Normalized front-matter metadata.
///
/// Either the structured fields come from a recovered model response and
/// `error` is `None`, or `error` is set and every structured field is
/// null or empty.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ExtractedRecord {
    pub title: Option<String>,
    pub authors: Vec<String>,
    pub year: Option<i64>,
    #[serde(rename = "abstract")]
    pub abstract_text: Option<String>,
    pub keywords: Vec<String>,
    pub categories: Vec<String>,
    pub error: Option<String>,
}

impl ExtractedRecord {
    /// An empty record carrying only an error marker.
    pub fn failed(error: impl Into<String>) -> Self {
        Self {
            error: Some(error.into()),
            ..Self::default()
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PageInfo {
    pub page_count: usize,
}

/// Slicing parameters and the outcome of the slice for one document.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SliceInfo {
    pub front_pages_default: usize,
    pub front_pages_fallback: usize,
    pub front_chars: usize,
    /// `None` when the document could not be opened.
    pub front_window: Option<SliceWindow>,
}

/// The durable per-document record, written to `json/<id>.json`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PersistedRecord {
    pub id: String,
    pub file: FileMeta,
    pub pdf: PageInfo,
    pub slices_info: SliceInfo,
    pub front: ExtractedRecord,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct LlmCalls {
    pub front: Option<ExtractionAttempt>,
}

/// Generation trace written to `logs/<id>_raw.json`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct DiagnosticLog {
    pub id: String,
    pub file: FileMeta,
    pub slices_info: SliceInfo,
    pub llm_calls: LlmCalls,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct IndexErrors {
    pub front: Option<String>,
}

/// One line of the run summary log (`index.jsonl`).
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct IndexRow {
    pub id: String,
    pub filename: String,
    pub title: Option<String>,
    pub year: Option<i64>,
    pub authors_n: usize,
    pub front_chars: usize,
    pub errors: IndexErrors,
}

impl From<&PersistedRecord> for IndexRow {
    fn from(record: &PersistedRecord) -> Self {
        Self {
            id: record.id.clone(),
            filename: record.file.filename.clone(),
            title: record.front.title.clone(),
            year: record.front.year,
            authors_n: record.front.authors.len(),
            front_chars: record.slices_info.front_chars,
            errors: IndexErrors {
                front: record.front.error.clone(),
            },
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn sample_record() -> PersistedRecord {
        PersistedRecord {
            id: "abc".to_string(),
            file: FileMeta {
                path: "data/a.pdf".to_string(),
                filename: "a.pdf".to_string(),
                size_bytes: 10,
                modified_time: "2024-01-02T03:04:05".to_string(),
            },
            pdf: PageInfo { page_count: 3 },
            slices_info: SliceInfo {
                front_pages_default: 2,
                front_pages_fallback: 4,
                front_chars: 120,
                front_window: Some(SliceWindow::Primary),
            },
            front: ExtractedRecord {
                title: Some("Paper".to_string()),
                authors: vec!["Alice".to_string(), "Bob".to_string()],
                year: Some(2023),
                ..ExtractedRecord::default()
            },
        }
    }

    #[test]
    fn extracted_record_serializes_abstract_key_and_null_error() {
        let value = serde_json::to_value(ExtractedRecord::default()).unwrap();
        assert_eq!(
            value,
            json!({
                "title": null,
                "authors": [],
                "year": null,
                "abstract": null,
                "keywords": [],
                "categories": [],
                "error": null
            })
        );
    }

    #[test]
    fn failed_record_has_only_error() {
        let record = ExtractedRecord::failed("boom");
        assert_eq!(record.error.as_deref(), Some("boom"));
        assert!(record.title.is_none());
        assert!(record.authors.is_empty());
        assert!(record.keywords.is_empty());
    }

    #[test]
    fn attempt_omits_error_key_on_success() {
        let attempt = ExtractionAttempt {
            prompt: "p".to_string(),
            raw_response: Some("{}".to_string()),
            attempt: 0,
            error: None,
        };
        let value = serde_json::to_value(&attempt).unwrap();
        assert!(value.get("error").is_none());
        assert_eq!(value["attempt"], 0);
    }

    #[test]
    fn index_row_projects_record() {
        let row = IndexRow::from(&sample_record());
        let line = serde_json::to_string(&row).unwrap();
        assert_eq!(
            line,
            r#"{"id":"abc","filename":"a.pdf","title":"Paper","year":2023,"authors_n":2,"front_chars":120,"errors":{"front":null}}"#
        );
    }

    #[test]
    fn slice_window_serializes_lowercase() {
        assert_eq!(
            serde_json::to_value(SliceWindow::Fallback).unwrap(),
            json!("fallback")
        );
    }
}
