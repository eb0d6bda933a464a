//! Recovery of a JSON object from free-form model output.
//!
//! [`StrictThenBraces`] first parses the whole trimmed response. If that
//! does not yield an object it takes the greedy span from the first `{`
//! to the last `}` and parses that alone, which recovers objects wrapped
//! in prose or code fences. Anything else is a [`ParseError`].

use serde_json::{Map, Value};

use crate::error::{bounded_prefix, ParseError};

/// Characters of the response quoted in a "no object" error.
const RESPONSE_PREFIX_CHARS: usize = 250;
/// Characters of the extracted span quoted in an "invalid JSON" error.
const SPAN_PREFIX_CHARS: usize = 500;

/// Strategy for turning raw generated text into a JSON object.
pub trait ResponseParser: Send + Sync {
    fn parse(&self, raw: &str) -> Result<Map<String, Value>, ParseError>;
}

/// Strict parse, then outermost-brace extraction.
#[derive(Debug, Default, Clone, Copy)]
pub struct StrictThenBraces;

impl ResponseParser for StrictThenBraces {
    fn parse(&self, raw: &str) -> Result<Map<String, Value>, ParseError> {
        let text = raw.trim();
        if text.is_empty() {
            return Err(ParseError::Empty);
        }

        if let Ok(Value::Object(obj)) = serde_json::from_str::<Value>(text) {
            return Ok(obj);
        }

        let span = brace_span(text).ok_or_else(|| ParseError::NoObject {
            prefix: bounded_prefix(text, RESPONSE_PREFIX_CHARS),
        })?;

        match serde_json::from_str::<Value>(span) {
            Ok(Value::Object(obj)) => Ok(obj),
            Ok(other) => Err(ParseError::InvalidJson {
                reason: format!("expected an object, found {}", type_name(&other)),
                prefix: bounded_prefix(span, SPAN_PREFIX_CHARS),
            }),
            Err(e) => Err(ParseError::InvalidJson {
                reason: e.to_string(),
                prefix: bounded_prefix(span, SPAN_PREFIX_CHARS),
            }),
        }
    }
}

/// Greedy span from the first `{` to the last `}`, if one exists.
fn brace_span(text: &str) -> Option<&str> {
    let start = text.find('{')?;
    let end = text.rfind('}')?;
    if end < start {
        return None;
    }
    Some(&text[start..=end])
}

fn type_name(value: &Value) -> &'static str {
    match value {
        Value::Null => "null",
        Value::Bool(_) => "a boolean",
        Value::Number(_) => "a number",
        Value::String(_) => "a string",
        Value::Array(_) => "an array",
        Value::Object(_) => "an object",
    }
}
