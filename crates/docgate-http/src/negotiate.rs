//! Content negotiation: request bytes to a validated canonical value.
//!
//! ```text
//!   Content-Type ──> ContentKind ──> decoder ──> Value ──> validate ──> CanonicalValue
//!                    Json            json         |        array rules
//!                    Form            urlencoded   |        _id shape
//!                    Multipart       multipart    |        operators (POST/PUT)
//!                                    (files)      └─> FileUpload     unflatten (POST/PUT)
//! ```
//!
//! Decoding is a pure function of the content type, the bytes and the write
//! target; nothing here touches the network.

use bytes::Bytes;
use docgate_model::document::{CanonicalValue, Document};
use docgate_model::error::DocGateError;
use docgate_model::keys::{
    FILE_METADATA, FORM_URLENCODED, HAL_JSON_MEDIA_TYPE, ID_FIELD, JSON_MEDIA_TYPE, MULTIPART,
    PROPERTIES,
};
use docgate_model::resource::ResourceType;
use http::Method;
use serde_json::Value;
use tracing::debug;

use crate::form::parse_urlencoded;
use crate::multipart::{FormPart, extract_boundary, parse_multipart};

/// The decoder a request content type selects.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ContentKind {
    /// `application/json`, `application/hal+json` or no content type.
    Json,
    /// `application/x-www-form-urlencoded`.
    Form,
    /// `multipart/form-data`.
    Multipart,
}

impl ContentKind {
    /// Select the decoder for a `Content-Type` header value.
    ///
    /// # Examples
    ///
    /// ```
    /// use docgate_http::negotiate::ContentKind;
    ///
    /// assert_eq!(ContentKind::from_content_type(None).unwrap(), ContentKind::Json);
    /// assert_eq!(
    ///     ContentKind::from_content_type(Some("application/json; charset=utf-8")).unwrap(),
    ///     ContentKind::Json
    /// );
    /// assert!(ContentKind::from_content_type(Some("text/csv")).is_err());
    /// ```
    pub fn from_content_type(content_type: Option<&str>) -> Result<Self, DocGateError> {
        let Some(content_type) = content_type else {
            return Ok(Self::Json);
        };

        let essence = content_type
            .parse::<mime::Mime>()
            .map(|m| m.essence_str().to_ascii_lowercase())
            .unwrap_or_else(|_| content_type.trim().to_ascii_lowercase());

        if essence.starts_with(JSON_MEDIA_TYPE) || essence.starts_with(HAL_JSON_MEDIA_TYPE) {
            Ok(Self::Json)
        } else if essence.starts_with(FORM_URLENCODED) {
            Ok(Self::Form)
        } else if essence.starts_with(MULTIPART) {
            Ok(Self::Multipart)
        } else {
            Err(DocGateError::unsupported_media_type(content_type))
        }
    }
}

/// What the decoded content is going to be used for.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct WriteTarget {
    /// Request method.
    pub method: Method,
    /// Addressed resource type.
    pub resource_type: ResourceType,
}

impl WriteTarget {
    /// Create a target.
    #[must_use]
    pub fn new(method: Method, resource_type: ResourceType) -> Self {
        Self {
            method,
            resource_type,
        }
    }

    /// Whether the request carries no content to decode.
    #[must_use]
    pub fn is_contentless(&self) -> bool {
        matches!(self.method, Method::GET | Method::OPTIONS | Method::DELETE)
    }

    /// Whether the request writes a single document, file or schema.
    #[must_use]
    pub fn is_write_document(&self) -> bool {
        use ResourceType as T;

        match self.method {
            Method::PUT | Method::PATCH => {
                matches!(self.resource_type, T::File | T::Document | T::Schema)
            }
            Method::POST => matches!(
                self.resource_type,
                T::Collection | T::FilesBucket | T::SchemaStore
            ),
            _ => false,
        }
    }

    /// Whether an array of documents is acceptable content.
    #[must_use]
    pub fn accepts_array(&self) -> bool {
        (self.method == Method::POST && self.resource_type == ResourceType::Collection)
            || (self.method == Method::PATCH && self.resource_type == ResourceType::Document)
    }

    /// Whether the write creates or replaces (no partial update).
    #[must_use]
    pub fn is_create_or_replace(&self) -> bool {
        matches!(self.method, Method::POST | Method::PUT)
    }

    fn is_file_upload(&self) -> bool {
        self.is_write_document() && self.resource_type.is_file_resource()
    }
}

/// A file attached to a multipart request.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FileUpload {
    /// Form field carrying the file.
    pub field: String,
    /// Client-side file name.
    pub filename: String,
    /// Declared content type of the file.
    pub content_type: Option<String>,
    /// File content.
    pub data: Bytes,
}

/// Result of content negotiation.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Negotiated {
    /// Validated canonical content; `None` for methods that carry no content.
    pub content: Option<CanonicalValue>,
    /// Uploaded file, for file writes.
    pub file: Option<FileUpload>,
}

/// Stateless content negotiator.
#[derive(Debug, Clone, Copy, Default)]
pub struct ContentNegotiator;

impl ContentNegotiator {
    /// Decode and validate request content.
    ///
    /// `GET`, `OPTIONS` and `DELETE` carry no content and yield an empty
    /// [`Negotiated`]. An empty body decodes to an empty document.
    ///
    /// # Examples
    ///
    /// ```
    /// use docgate_http::negotiate::{ContentNegotiator, WriteTarget};
    /// use docgate_model::resource::ResourceType;
    /// use http::Method;
    ///
    /// let target = WriteTarget::new(Method::PUT, ResourceType::Document);
    /// let out = ContentNegotiator::inject(Some("application/json"), br#"{"a.b": 1}"#, &target).unwrap();
    /// let doc = out.content.unwrap();
    /// assert_eq!(serde_json::to_string(&doc).unwrap(), r#"{"a":{"b":1}}"#);
    /// ```
    pub fn inject(
        content_type: Option<&str>,
        body: &[u8],
        target: &WriteTarget,
    ) -> Result<Negotiated, DocGateError> {
        if target.is_contentless() {
            return Ok(Negotiated::default());
        }

        let kind = ContentKind::from_content_type(content_type)?;
        debug!(?kind, bytes = body.len(), method = %target.method, resource_type = %target.resource_type, "decoding request content");

        let (value, file) = match kind {
            ContentKind::Json => (decode_json(body)?, None),
            ContentKind::Form => (Some(Value::Object(decode_form(body)?)), None),
            ContentKind::Multipart => {
                // `from_content_type` accepted the header, so it is present.
                let boundary = extract_boundary(content_type.unwrap_or_default())?;
                let parts = parse_multipart(body, &boundary)?;
                if target.is_file_upload() {
                    let (metadata, file) = decode_file_parts(parts)?;
                    (Some(Value::Object(metadata)), Some(file))
                } else {
                    (Some(Value::Object(decode_form_parts(&parts)?)), None)
                }
            }
        };

        let content = validate(value, target)?;
        Ok(Negotiated {
            content: Some(content),
            file,
        })
    }
}

/// Decode a JSON body.
///
/// Empty and `null` bodies yield `None`; top-level scalars are rejected.
pub fn decode_json(body: &[u8]) -> Result<Option<Value>, DocGateError> {
    if body.iter().all(u8::is_ascii_whitespace) {
        return Ok(None);
    }

    let value: Value = serde_json::from_slice(body).map_err(|e| {
        debug!(error = %e, "invalid json content");
        DocGateError::bad_content(format!("Invalid JSON. {e}")).with_source(e)
    })?;

    match value {
        Value::Null => Ok(None),
        Value::Object(_) | Value::Array(_) => Ok(Some(value)),
        other => Err(DocGateError::bad_content(format!(
            "request data must be either a json object or an array, got {}",
            json_type_name(&other)
        ))),
    }
}

fn decode_form(body: &[u8]) -> Result<Document, DocGateError> {
    let mut doc = Document::new();
    for (name, value) in parse_urlencoded(body) {
        if doc.contains_key(&name) {
            continue;
        }
        let value = decode_form_value(value.as_deref())?;
        doc.insert(name, value);
    }
    Ok(doc)
}

fn decode_form_parts(parts: &[FormPart]) -> Result<Document, DocGateError> {
    let mut doc = Document::new();
    for part in parts {
        if part.is_file() || doc.contains_key(&part.name) {
            continue;
        }
        let value = decode_form_value(Some(part.text().as_str()))?;
        doc.insert(part.name.clone(), value);
    }
    Ok(doc)
}

/// Decode one form field value.
///
/// Missing values become `null`, blank ones a string. Anything else is tried
/// as JSON and kept as a string when that fails, unless it looks like an
/// object or an array.
fn decode_form_value(value: Option<&str>) -> Result<Value, DocGateError> {
    let Some(value) = value else {
        return Ok(Value::Null);
    };
    if value.trim().is_empty() {
        return Ok(Value::String(value.to_owned()));
    }

    match serde_json::from_str::<Value>(value) {
        Ok(parsed) => Ok(parsed),
        Err(e) => {
            let stripped = value.trim();
            if stripped.starts_with('{') || stripped.starts_with('[') {
                Err(DocGateError::bad_content(format!("Invalid JSON. {e}")).with_source(e))
            } else {
                Ok(Value::String(value.to_owned()))
            }
        }
    }
}

fn decode_file_parts(parts: Vec<FormPart>) -> Result<(Document, FileUpload), DocGateError> {
    let metadata_part = parts
        .iter()
        .find(|p| p.name == FILE_METADATA && !p.is_file())
        .or_else(|| parts.iter().find(|p| p.name == PROPERTIES && !p.is_file()));

    let metadata = match metadata_part {
        None => Document::new(),
        Some(part) => parse_metadata(&part.text())?,
    };

    let file = parts
        .into_iter()
        .find(FormPart::is_file)
        .ok_or_else(|| DocGateError::bad_content("This request does not contain any binary file"))?;

    debug!(field = %file.name, bytes = file.data.len(), "file attachment found");
    Ok((
        metadata,
        FileUpload {
            filename: file.filename.unwrap_or_default(),
            field: file.name,
            content_type: file.content_type,
            data: file.data,
        },
    ))
}

fn parse_metadata(text: &str) -> Result<Document, DocGateError> {
    let invalid = || {
        DocGateError::bad_content("Invalid data: 'metadata' field is not a valid JSON object")
    };

    if text.trim().is_empty() {
        return Ok(Document::new());
    }
    match serde_json::from_str::<Value>(text) {
        Ok(Value::Object(doc)) => Ok(doc),
        Ok(Value::Null) => Ok(Document::new()),
        Ok(_) => Err(invalid()),
        Err(e) => Err(invalid().with_source(e)),
    }
}

/// Apply the shape, id and operator rules, then unflatten create/replace
/// content.
fn validate(value: Option<Value>, target: &WriteTarget) -> Result<CanonicalValue, DocGateError> {
    let mut content = match value {
        None => CanonicalValue::Document(Document::new()),
        Some(Value::Object(doc)) => {
            check_id(&doc)?;
            CanonicalValue::Document(doc)
        }
        Some(Value::Array(items)) => {
            if !target.accepts_array() {
                debug!(method = %target.method, resource_type = %target.resource_type, "array content rejected");
                return Err(DocGateError::bad_content("request content must be a Json object"));
            }
            let docs = items
                .into_iter()
                .map(|item| match item {
                    Value::Object(doc) => check_id(&doc).map(|()| doc),
                    _ => Err(DocGateError::bad_content(
                        "request data must be either an json object or an array of objects",
                    )),
                })
                .collect::<Result<Vec<_>, _>>()?;
            CanonicalValue::Array(docs)
        }
        Some(other) => {
            return Err(DocGateError::bad_content(format!(
                "request data must be either a json object or an array, got {}",
                json_type_name(&other)
            )));
        }
    };

    if target.is_create_or_replace() {
        if content.contains_update_operators(true) {
            return Err(DocGateError::bad_content(
                "update operators (but $currentDate) cannot be used on POST and PUT requests",
            ));
        }
        content.unflatten();
    }

    Ok(content)
}

fn check_id(doc: &Document) -> Result<(), DocGateError> {
    match doc.get(ID_FIELD) {
        Some(id @ Value::Array(_)) => Err(DocGateError::bad_content(format!(
            "the type of _id in request data is not supported: {}",
            json_type_name(id)
        ))),
        _ => Ok(()),
    }
}

fn json_type_name(value: &Value) -> &'static str {
    match value {
        Value::Null => "NULL",
        Value::Bool(_) => "BOOLEAN",
        Value::Number(_) => "NUMBER",
        Value::String(_) => "STRING",
        Value::Array(_) => "ARRAY",
        Value::Object(_) => "DOCUMENT",
    }
}
