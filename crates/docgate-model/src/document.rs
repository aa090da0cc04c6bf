//! Canonical document values.
//!
//! After decoding, request content is either a single document or an array of
//! documents. Key order is preserved as received.

use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

use crate::keys::{CURRENT_DATE_OPERATOR, ID_FIELD, RESERVED_IDS};

/// An ordered key to value mapping.
pub type Document = Map<String, Value>;

/// The two top-level shapes request content may take after decoding.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum CanonicalValue {
    /// A single document.
    Document(Document),
    /// An array of documents (bulk write).
    Array(Vec<Document>),
}

impl CanonicalValue {
    /// Returns the document, if this value is one.
    #[must_use]
    pub fn as_document(&self) -> Option<&Document> {
        match self {
            Self::Document(doc) => Some(doc),
            Self::Array(_) => None,
        }
    }

    /// Returns the documents of an array value.
    #[must_use]
    pub fn as_array(&self) -> Option<&[Document]> {
        match self {
            Self::Array(docs) => Some(docs),
            Self::Document(_) => None,
        }
    }

    /// Whether this value is an array of documents.
    #[must_use]
    pub fn is_array(&self) -> bool {
        matches!(self, Self::Array(_))
    }

    /// Convert back into a plain JSON value.
    #[must_use]
    pub fn into_value(self) -> Value {
        match self {
            Self::Document(doc) => Value::Object(doc),
            Self::Array(docs) => Value::Array(docs.into_iter().map(Value::Object).collect()),
        }
    }

    /// Whether the value carries update operators.
    ///
    /// See [`contains_update_operators`].
    #[must_use]
    pub fn contains_update_operators(&self, ignore_current_date: bool) -> bool {
        match self {
            Self::Document(doc) => contains_update_operators(doc, ignore_current_date),
            Self::Array(docs) => docs
                .iter()
                .any(|doc| contains_update_operators(doc, ignore_current_date)),
        }
    }

    /// Expand dot-notation keys in place.
    pub fn unflatten(&mut self) {
        match self {
            Self::Document(doc) => *doc = unflatten(std::mem::take(doc)),
            Self::Array(docs) => {
                for doc in docs.iter_mut() {
                    *doc = unflatten(std::mem::take(doc));
                }
            }
        }
    }

    /// Returns the first reserved literal used as a string `_id`.
    #[must_use]
    pub fn reserved_id(&self) -> Option<&str> {
        match self {
            Self::Document(doc) => reserved_id(doc),
            Self::Array(docs) => docs.iter().find_map(reserved_id),
        }
    }
}

impl From<Document> for CanonicalValue {
    fn from(doc: Document) -> Self {
        Self::Document(doc)
    }
}

/// Whether a document has top-level update operator keys (keys starting with
/// `$`).
///
/// With `ignore_current_date`, `$currentDate` does not count.
#[must_use]
pub fn contains_update_operators(doc: &Document, ignore_current_date: bool) -> bool {
    doc.keys().any(|key| {
        key.starts_with('$') && !(ignore_current_date && key == CURRENT_DATE_OPERATOR)
    })
}

/// Expand dot-notation keys into nested documents.
///
/// `{"a.b.c": 1}` becomes `{"a": {"b": {"c": 1}}}`. Paths sharing a prefix
/// merge into the same nested document. When a path crosses a non-document
/// value the later key wins. Values under operator keys are left untouched, as
/// are keys with empty segments such as `"a..b"`.
#[must_use]
pub fn unflatten(doc: Document) -> Document {
    let mut out = Document::new();

    for (key, value) in doc {
        if key.starts_with('$') {
            out.insert(key, value);
            continue;
        }

        let value = unflatten_value(value);
        if !key.contains('.') || key.split('.').any(str::is_empty) {
            out.insert(key, value);
            continue;
        }

        let segments: Vec<&str> = key.split('.').collect();
        insert_path(&mut out, &segments, value);
    }

    out
}

fn unflatten_value(value: Value) -> Value {
    match value {
        Value::Object(doc) => Value::Object(unflatten(doc)),
        Value::Array(items) => Value::Array(items.into_iter().map(unflatten_value).collect()),
        other => other,
    }
}

fn insert_path(target: &mut Document, segments: &[&str], value: Value) {
    let Some((last, parents)) = segments.split_last() else {
        return;
    };

    let mut current = target;
    for segment in parents {
        let slot = current
            .entry((*segment).to_owned())
            .or_insert_with(|| Value::Object(Document::new()));
        if !slot.is_object() {
            *slot = Value::Object(Document::new());
        }
        let Value::Object(next) = slot else {
            return;
        };
        current = next;
    }

    current.insert((*last).to_owned(), value);
}

/// Returns the `_id` of a document when it is one of the reserved literal ids
/// (`_MaxKey`, `_MinKey`, `_null`, `_true`, `_false`), compared ignoring case.
#[must_use]
pub fn reserved_id(doc: &Document) -> Option<&str> {
    let id = doc.get(ID_FIELD)?.as_str()?;
    RESERVED_IDS
        .iter()
        .any(|reserved| reserved.eq_ignore_ascii_case(id))
        .then_some(id)
}

#[cfg(test)]
mod tests {
    use serde_json::json;

    use super::*;

    fn doc(value: Value) -> Document {
        match value {
            Value::Object(map) => map,
            other => panic!("not a document: {other}"),
        }
    }

    #[test]
    fn test_should_unflatten_dotted_keys() {
        let out = unflatten(doc(json!({"a.b.c": 1})));
        assert_eq!(Value::Object(out), json!({"a": {"b": {"c": 1}}}));
    }

    #[test]
    fn test_should_merge_shared_prefixes() {
        let out = unflatten(doc(json!({"a.b": 1, "a.c": 2, "d": 3})));
        assert_eq!(Value::Object(out), json!({"a": {"b": 1, "c": 2}, "d": 3}));
    }

    #[test]
    fn test_should_replace_scalar_on_conflict() {
        let out = unflatten(doc(json!({"a": 1, "a.b": 2})));
        assert_eq!(Value::Object(out), json!({"a": {"b": 2}}));
    }

    #[test]
    fn test_should_not_unflatten_operator_values() {
        let input = json!({"$currentDate": {"x.y": true}, "n.m": 1});
        let out = unflatten(doc(input));
        assert_eq!(
            Value::Object(out),
            json!({"$currentDate": {"x.y": true}, "n": {"m": 1}})
        );
    }

    #[test]
    fn test_should_unflatten_nested_documents_and_arrays() {
        let out = unflatten(doc(json!({"a": {"b.c": 1}, "l": [{"x.y": 2}, 3]})));
        assert_eq!(
            Value::Object(out),
            json!({"a": {"b": {"c": 1}}, "l": [{"x": {"y": 2}}, 3]})
        );
    }

    #[test]
    fn test_should_keep_keys_with_empty_segments() {
        let out = unflatten(doc(json!({"a..b": 1, ".c": 2})));
        assert_eq!(Value::Object(out), json!({"a..b": 1, ".c": 2}));
    }

    #[test]
    fn test_should_detect_update_operators() {
        let set = doc(json!({"$set": {"a": 1}}));
        assert!(contains_update_operators(&set, true));

        let current_date = doc(json!({"$currentDate": {"ts": true}, "a": 1}));
        assert!(!contains_update_operators(&current_date, true));
        assert!(contains_update_operators(&current_date, false));

        let plain = doc(json!({"a": {"$set": 1}}));
        assert!(!contains_update_operators(&plain, false));
    }

    #[test]
    fn test_should_find_reserved_ids() {
        let value = CanonicalValue::Array(vec![
            doc(json!({"_id": "x"})),
            doc(json!({"_id": "_maxkey"})),
        ]);
        assert_eq!(value.reserved_id(), Some("_maxkey"));

        let value = CanonicalValue::Document(doc(json!({"_id": 1})));
        assert_eq!(value.reserved_id(), None);
    }

    #[test]
    fn test_should_serialize_untagged() {
        let value = CanonicalValue::Array(vec![doc(json!({"a": 1}))]);
        assert_eq!(serde_json::to_value(&value).unwrap(), json!([{"a": 1}]));
    }
}
