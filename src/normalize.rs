//! Best-effort coercion of a recovered object into an [`ExtractedRecord`].
//!
//! Nothing here fails. A field with the wrong type becomes null or empty
//! instead of rejecting the record, since partial metadata is still
//! useful to downstream consumers.

use once_cell::sync::Lazy;
use regex::Regex;
use serde_json::{Map, Value};

use crate::models::ExtractedRecord;

static YEAR: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"\b(?:19|20)\d{2}\b").expect("valid year regex"));

/// Coerce a candidate object into the record schema.
///
/// An `error` marker on the candidate (a string, or any other non-null
/// value rendered as JSON) is carried over. When it is present the
/// structured fields are left empty.
pub fn normalize(candidate: &Map<String, Value>) -> ExtractedRecord {
    let error = match candidate.get("error") {
        None | Some(Value::Null) => None,
        Some(Value::String(s)) => Some(s.clone()),
        Some(other) => Some(other.to_string()),
    };
    if let Some(error) = error {
        return ExtractedRecord::failed(error);
    }

    ExtractedRecord {
        title: text_field(candidate.get("title")),
        authors: text_list(candidate.get("authors")),
        year: year_field(candidate.get("year")),
        abstract_text: text_field(candidate.get("abstract")),
        keywords: text_list(candidate.get("keywords")),
        categories: text_list(candidate.get("categories")),
        error: None,
    }
}

fn text_field(value: Option<&Value>) -> Option<String> {
    match value {
        Some(Value::String(s)) => Some(s.clone()),
        _ => None,
    }
}

/// String entries only, trimmed, empties dropped, order kept, duplicates kept.
fn text_list(value: Option<&Value>) -> Vec<String> {
    let Some(Value::Array(items)) = value else {
        return Vec::new();
    };
    items
        .iter()
        .filter_map(Value::as_str)
        .map(str::trim)
        .filter(|s| !s.is_empty())
        .map(str::to_string)
        .collect()
}

fn year_field(value: Option<&Value>) -> Option<i64> {
    match value {
        Some(Value::Number(n)) => n.as_i64(),
        Some(Value::String(s)) => YEAR.find(s).and_then(|m| m.as_str().parse().ok()),
        _ => None,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn norm(value: Value) -> ExtractedRecord {
        match value {
            Value::Object(map) => normalize(&map),
            _ => panic!("test input must be an object"),
        }
    }

    #[test]
    fn well_formed_object_passes_through() {
        let r = norm(json!({
            "title": "Vector Search at Scale",
            "authors": ["Alice", "Bob"],
            "year": 2021,
            "abstract": "We study...",
            "keywords": ["ann", "hnsw"],
            "categories": ["Databases"]
        }));
        assert_eq!(r.title.as_deref(), Some("Vector Search at Scale"));
        assert_eq!(r.authors, vec!["Alice", "Bob"]);
        assert_eq!(r.year, Some(2021));
        assert_eq!(r.abstract_text.as_deref(), Some("We study..."));
        assert_eq!(r.keywords, vec!["ann", "hnsw"]);
        assert_eq!(r.categories, vec!["Databases"]);
        assert!(r.error.is_none());
    }

    #[test]
    fn year_recovered_from_prose() {
        assert_eq!(norm(json!({"year": "Published in 2023 at VLDB"})).year, Some(2023));
        assert_eq!(norm(json!({"year": "1999"})).year, Some(1999));
    }

    #[test]
    fn year_rejects_out_of_range_and_non_numeric() {
        assert_eq!(norm(json!({"year": "circa 1850"})).year, None);
        assert_eq!(norm(json!({"year": "12023"})).year, None);
        assert_eq!(norm(json!({"year": 2023.5})).year, None);
        assert_eq!(norm(json!({"year": ["2020"]})).year, None);
        assert_eq!(norm(json!({"year": null})).year, None);
    }

    #[test]
    fn author_list_drops_non_text_and_blank_entries() {
        let r = norm(json!({"authors": ["Alice", 42, "", "  Bob  "]}));
        assert_eq!(r.authors, vec!["Alice", "Bob"]);
    }

    #[test]
    fn duplicates_and_order_are_kept() {
        let r = norm(json!({"keywords": ["b", "a", "b"]}));
        assert_eq!(r.keywords, vec!["b", "a", "b"]);
    }

    #[test]
    fn missing_fields_default() {
        let r = norm(json!({}));
        assert_eq!(r, ExtractedRecord::default());
    }

    #[test]
    fn wrong_types_default() {
        let r = norm(json!({
            "title": 5,
            "authors": "Alice",
            "abstract": ["x"],
            "categories": {"a": 1}
        }));
        assert!(r.title.is_none());
        assert!(r.authors.is_empty());
        assert!(r.abstract_text.is_none());
        assert!(r.categories.is_empty());
    }

    #[test]
    fn error_marker_clears_structured_fields() {
        let r = norm(json!({"error": "timed out", "title": "ignored"}));
        assert_eq!(r, ExtractedRecord::failed("timed out"));
    }

    #[test]
    fn null_error_is_no_error() {
        let r = norm(json!({"error": null, "title": "T"}));
        assert!(r.error.is_none());
        assert_eq!(r.title.as_deref(), Some("T"));
    }
}
