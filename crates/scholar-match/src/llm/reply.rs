use std::sync::OnceLock;

use regex::Regex;
use serde_json::{Deserializer, Map, Value};

static FENCE: OnceLock<Regex> = OnceLock::new();

fn fence() -> &'static Regex {
    FENCE.get_or_init(|| Regex::new(r"(?is)^\s*```[a-z]*\s*(.*?)\s*```\s*$").expect("valid regex"))
}

#[derive(Debug, thiserror::Error, PartialEq, Eq)]
pub enum ReplyError {
    #[error("reply contained no JSON: {preview}")]
    NoJson { preview: String },
    #[error("reply JSON is malformed: {0}")]
    Malformed(String),
}

/// Remove a surrounding markdown code fence, if present.
pub fn strip_code_fences(raw: &str) -> &str {
    match fence().captures(raw).and_then(|captures| captures.get(1)) {
        Some(inner) => inner.as_str(),
        None => raw.trim(),
    }
}

fn preview(text: &str) -> String {
    text.chars().take(200).collect()
}

/// Parse the first complete JSON value starting at `start`; trailing prose is ignored.
fn first_value(text: &str, start: usize) -> Result<Value, ReplyError> {
    Deserializer::from_str(&text[start..])
        .into_iter::<Value>()
        .next()
        .unwrap_or_else(|| Ok(Value::Null))
        .map_err(|err| ReplyError::Malformed(err.to_string()))
}

/// Locate the first JSON array in a model reply. A lone object is wrapped as a
/// one-element array.
pub fn extract_json_array(raw: &str) -> Result<Vec<Value>, ReplyError> {
    let text = strip_code_fences(raw);
    let array_start = text.find('[');
    let object_start = text.find('{');

    let start = match (array_start, object_start) {
        (Some(array), Some(object)) => array.min(object),
        (Some(array), None) => array,
        (None, Some(object)) => object,
        (None, None) => {
            return Err(ReplyError::NoJson {
                preview: preview(text),
            })
        }
    };

    match first_value(text, start)? {
        Value::Array(items) => Ok(items),
        Value::Object(object) => Ok(vec![Value::Object(object)]),
        _ => Err(ReplyError::NoJson {
            preview: preview(text),
        }),
    }
}

/// Locate the first JSON object in a model reply.
pub fn extract_json_object(raw: &str) -> Result<Map<String, Value>, ReplyError> {
    let text = strip_code_fences(raw);
    let start = text.find('{').ok_or_else(|| ReplyError::NoJson {
        preview: preview(text),
    })?;
    match first_value(text, start)? {
        Value::Object(object) => Ok(object),
        _ => Err(ReplyError::NoJson {
            preview: preview(text),
        }),
    }
}
