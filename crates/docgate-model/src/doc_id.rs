//! Document ids carried in request paths.

use std::fmt;

use serde::{Serialize, Serializer};
use serde_json::{Number, Value, json};

use crate::error::DocGateError;
use crate::keys::{DOC_ID_TYPE_QPARAM, FALSE_KEY_ID, MAX_KEY_ID, MIN_KEY_ID, NULL_KEY_ID, TRUE_KEY_ID};
use crate::options::DocIdType;

/// Length of an object id in hex characters.
const OBJECT_ID_HEX_LEN: usize = 24;

/// A typed document id.
#[derive(Debug, Clone, PartialEq)]
pub enum DocumentId {
    /// Object id, lowercase hex.
    ObjectId(String),
    /// String id.
    String(String),
    /// Numeric id.
    Number(Number),
    /// Date id, milliseconds since the epoch.
    Date(i64),
    /// The `MinKey` value.
    MinKey,
    /// The `MaxKey` value.
    MaxKey,
    /// `null`.
    Null,
    /// Boolean id.
    Boolean(bool),
}

impl DocumentId {
    /// Parse a raw path segment according to `id_type`.
    ///
    /// The reserved literals (`_MaxKey`, `_MinKey`, `_null`, `_true`,
    /// `_false`) are recognised regardless of `id_type`.
    ///
    /// # Examples
    ///
    /// ```
    /// use docgate_model::doc_id::DocumentId;
    /// use docgate_model::options::DocIdType;
    ///
    /// let id = DocumentId::parse("5f1a2b3c4d5e6f7a8b9c0d1e", DocIdType::StringOid).unwrap();
    /// assert!(matches!(id, DocumentId::ObjectId(_)));
    ///
    /// let id = DocumentId::parse("_null", DocIdType::String).unwrap();
    /// assert_eq!(id, DocumentId::Null);
    /// ```
    pub fn parse(raw: &str, id_type: DocIdType) -> Result<Self, DocGateError> {
        if let Some(reserved) = Self::reserved(raw) {
            return Ok(reserved);
        }

        match id_type {
            DocIdType::StringOid if is_object_id(raw) => Ok(Self::ObjectId(raw.to_ascii_lowercase())),
            DocIdType::StringOid | DocIdType::String => Ok(Self::String(raw.to_owned())),
            DocIdType::Oid if is_object_id(raw) => Ok(Self::ObjectId(raw.to_ascii_lowercase())),
            DocIdType::Oid => Err(invalid_id(format!("The id is not a valid ObjectId {raw}"))),
            DocIdType::Number => match serde_json::from_str::<Value>(raw) {
                Ok(Value::Number(n)) => Ok(Self::Number(n)),
                _ => Err(invalid_id(format!("The id is not a valid number {raw}"))),
            },
            DocIdType::Date => raw
                .trim()
                .parse::<i64>()
                .map(Self::Date)
                .map_err(|e| invalid_id(format!("The id is not a valid date {raw}")).with_source(e)),
            DocIdType::MinKey => Ok(Self::MinKey),
            DocIdType::MaxKey => Ok(Self::MaxKey),
            DocIdType::Null => Ok(Self::Null),
            DocIdType::Boolean => Err(invalid_id(format!(
                "The id is not a valid boolean {raw}, use {TRUE_KEY_ID} or {FALSE_KEY_ID}"
            ))),
        }
    }

    fn reserved(raw: &str) -> Option<Self> {
        let is = |literal: &str| raw.eq_ignore_ascii_case(literal);

        if is(MAX_KEY_ID) {
            Some(Self::MaxKey)
        } else if is(MIN_KEY_ID) {
            Some(Self::MinKey)
        } else if is(NULL_KEY_ID) {
            Some(Self::Null)
        } else if is(TRUE_KEY_ID) {
            Some(Self::Boolean(true))
        } else if is(FALSE_KEY_ID) {
            Some(Self::Boolean(false))
        } else {
            None
        }
    }

    /// The id as an extended JSON value.
    #[must_use]
    pub fn to_value(&self) -> Value {
        match self {
            Self::ObjectId(hex) => json!({"$oid": hex}),
            Self::String(s) => Value::String(s.clone()),
            Self::Number(n) => Value::Number(n.clone()),
            Self::Date(ms) => json!({"$date": ms}),
            Self::MinKey => json!({"$minKey": 1}),
            Self::MaxKey => json!({"$maxKey": 1}),
            Self::Null => Value::Null,
            Self::Boolean(b) => Value::Bool(*b),
        }
    }

    /// The [`DocIdType`] this id belongs to.
    #[must_use]
    pub fn id_type(&self) -> DocIdType {
        match self {
            Self::ObjectId(_) => DocIdType::Oid,
            Self::String(_) => DocIdType::String,
            Self::Number(_) => DocIdType::Number,
            Self::Date(_) => DocIdType::Date,
            Self::MinKey => DocIdType::MinKey,
            Self::MaxKey => DocIdType::MaxKey,
            Self::Null => DocIdType::Null,
            Self::Boolean(_) => DocIdType::Boolean,
        }
    }
}

impl fmt::Display for DocumentId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::ObjectId(s) | Self::String(s) => f.write_str(s),
            other => write!(f, "{}", other.to_value()),
        }
    }
}

impl Serialize for DocumentId {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        self.to_value().serialize(serializer)
    }
}

/// Whether `raw` is a 24 hex character object id.
#[must_use]
pub fn is_object_id(raw: &str) -> bool {
    raw.len() == OBJECT_ID_HEX_LEN && raw.bytes().all(|b| b.is_ascii_hexdigit())
}

fn invalid_id(message: String) -> DocGateError {
    DocGateError::invalid_parameter(DOC_ID_TYPE_QPARAM, message)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::DocGateErrorCode;

    const OID: &str = "5f1a2b3c4d5e6f7a8b9c0d1e";

    #[test]
    fn test_should_parse_string_oid() {
        assert_eq!(
            DocumentId::parse(OID, DocIdType::StringOid).unwrap(),
            DocumentId::ObjectId(OID.to_owned())
        );
        assert_eq!(
            DocumentId::parse("mydoc", DocIdType::StringOid).unwrap(),
            DocumentId::String("mydoc".to_owned())
        );
    }

    #[test]
    fn test_should_keep_string_when_requested() {
        assert_eq!(
            DocumentId::parse(OID, DocIdType::String).unwrap(),
            DocumentId::String(OID.to_owned())
        );
    }

    #[test]
    fn test_should_reject_invalid_oid() {
        let err = DocumentId::parse("nope", DocIdType::Oid).unwrap_err();
        assert_eq!(err.code, DocGateErrorCode::InvalidParameter);
    }

    #[test]
    fn test_should_parse_numbers_and_dates() {
        let id = DocumentId::parse("42", DocIdType::Number).unwrap();
        assert_eq!(id, DocumentId::Number(Number::from(42)));
        assert!(DocumentId::parse("forty", DocIdType::Number).is_err());

        assert_eq!(
            DocumentId::parse("1700000000000", DocIdType::Date).unwrap(),
            DocumentId::Date(1_700_000_000_000)
        );
        assert!(DocumentId::parse("yesterday", DocIdType::Date).is_err());
    }

    #[test]
    fn test_should_prefer_reserved_literals() {
        assert_eq!(DocumentId::parse("_MaxKey", DocIdType::Number).unwrap(), DocumentId::MaxKey);
        assert_eq!(DocumentId::parse("_minkey", DocIdType::Oid).unwrap(), DocumentId::MinKey);
        assert_eq!(
            DocumentId::parse("_true", DocIdType::Boolean).unwrap(),
            DocumentId::Boolean(true)
        );
        assert!(DocumentId::parse("yes", DocIdType::Boolean).is_err());
    }

    #[test]
    fn test_should_render_extended_json() {
        let id = DocumentId::ObjectId(OID.to_owned());
        assert_eq!(serde_json::to_value(&id).unwrap(), json!({"$oid": OID}));
        assert_eq!(DocumentId::MaxKey.to_string(), r#"{"$maxKey":1}"#);
    }
}
