//! Request-resolution error types.
//!
//! Every failure surfaced to a client carries a [`DocGateErrorCode`], a
//! human-readable message and the HTTP status the pipeline aborts with.

use std::fmt;

/// Well-known request-resolution error codes.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
#[non_exhaustive]
pub enum DocGateErrorCode {
    /// Malformed or structurally invalid request content.
    #[default]
    BadContent,
    /// The request media type has no decoder.
    UnsupportedMediaType,
    /// Content was read from a slot that was never acquired or was released.
    ContentUnavailable,
    /// A mount template could not be resolved.
    MountResolution,
    /// The path does not address any known resource.
    ClassificationInvalid,
    /// A query parameter is malformed or out of range.
    InvalidParameter,
    /// The method has no handler for the addressed resource.
    MethodNotAllowed,
    /// The addressed database or collection is reserved.
    Forbidden,
    /// The request content exceeds the configured limit.
    ContentTooLarge,
    /// No buffer segment is available.
    PoolExhausted,
    /// Internal error.
    InternalError,
}

impl DocGateErrorCode {
    /// Returns the error code string.
    #[must_use]
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::BadContent => "BadContent",
            Self::UnsupportedMediaType => "UnsupportedMediaType",
            Self::ContentUnavailable => "ContentUnavailable",
            Self::MountResolution => "MountResolution",
            Self::ClassificationInvalid => "ClassificationInvalid",
            Self::InvalidParameter => "InvalidParameter",
            Self::MethodNotAllowed => "MethodNotAllowed",
            Self::Forbidden => "Forbidden",
            Self::ContentTooLarge => "ContentTooLarge",
            Self::PoolExhausted => "PoolExhausted",
            Self::InternalError => "InternalError",
        }
    }

    /// Returns the default HTTP status code for this error.
    #[must_use]
    pub fn default_status_code(&self) -> http::StatusCode {
        match self {
            Self::BadContent | Self::InvalidParameter => http::StatusCode::BAD_REQUEST,
            Self::Forbidden => http::StatusCode::FORBIDDEN,
            Self::ClassificationInvalid => http::StatusCode::NOT_FOUND,
            Self::MethodNotAllowed => http::StatusCode::METHOD_NOT_ALLOWED,
            Self::ContentTooLarge => http::StatusCode::PAYLOAD_TOO_LARGE,
            Self::UnsupportedMediaType => http::StatusCode::UNSUPPORTED_MEDIA_TYPE,
            Self::ContentUnavailable
            | Self::MountResolution
            | Self::PoolExhausted
            | Self::InternalError => http::StatusCode::INTERNAL_SERVER_ERROR,
        }
    }

    /// Returns the default message for this error code.
    #[must_use]
    pub fn default_message(&self) -> &'static str {
        match self {
            Self::BadContent => "The request content is not valid.",
            Self::UnsupportedMediaType => "The request media type is not supported.",
            Self::ContentUnavailable => {
                "The request content is not available; request content buffering upstream before reading it."
            }
            Self::MountResolution => "The request path could not be resolved against the mounts.",
            Self::ClassificationInvalid => "The request path does not address a resource.",
            Self::InvalidParameter => "A query parameter is not valid.",
            Self::MethodNotAllowed => "The method is not allowed on this resource.",
            Self::Forbidden => "The resource is reserved.",
            Self::ContentTooLarge => "The request content is too large.",
            Self::PoolExhausted => "No buffer is available to hold the request content.",
            Self::InternalError => "We encountered an internal error. Please try again.",
        }
    }
}

impl fmt::Display for DocGateErrorCode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// A request-resolution error.
#[derive(Debug)]
pub struct DocGateError {
    /// The error code.
    pub code: DocGateErrorCode,
    /// A human-readable error message.
    pub message: String,
    /// The resource (path or parameter) that caused the error.
    pub resource: Option<String>,
    /// The HTTP status code.
    pub status_code: http::StatusCode,
    /// The underlying source error, if any.
    pub source: Option<Box<dyn std::error::Error + Send + Sync>>,
}

impl fmt::Display for DocGateError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "DocGateError({}): {}", self.code, self.message)
    }
}

impl std::error::Error for DocGateError {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        self.source
            .as_ref()
            .map(|e| e.as_ref() as &(dyn std::error::Error + 'static))
    }
}

impl DocGateError {
    /// Create a new `DocGateError` from an error code.
    #[must_use]
    pub fn new(code: DocGateErrorCode) -> Self {
        Self {
            status_code: code.default_status_code(),
            message: code.default_message().to_owned(),
            resource: None,
            code,
            source: None,
        }
    }

    /// Create a new `DocGateError` with a custom message.
    #[must_use]
    pub fn with_message(code: DocGateErrorCode, message: impl Into<String>) -> Self {
        Self {
            status_code: code.default_status_code(),
            message: message.into(),
            resource: None,
            code,
            source: None,
        }
    }

    /// Set the resource.
    #[must_use]
    pub fn with_resource(mut self, resource: impl Into<String>) -> Self {
        self.resource = Some(resource.into());
        self
    }

    /// Set the source error.
    #[must_use]
    pub fn with_source(mut self, source: impl std::error::Error + Send + Sync + 'static) -> Self {
        self.source = Some(Box::new(source));
        self
    }

    /// A copy of this error without its source.
    #[must_use]
    pub fn detached(&self) -> Self {
        Self {
            code: self.code,
            message: self.message.clone(),
            resource: self.resource.clone(),
            status_code: self.status_code,
            source: None,
        }
    }

    // -- Convenience constructors --

    /// Malformed request content.
    #[must_use]
    pub fn bad_content(message: impl Into<String>) -> Self {
        Self::with_message(DocGateErrorCode::BadContent, message)
    }

    /// Unsupported request media type.
    #[must_use]
    pub fn unsupported_media_type(content_type: &str) -> Self {
        Self::with_message(
            DocGateErrorCode::UnsupportedMediaType,
            format!("Unsupported media type: {content_type}"),
        )
    }

    /// Content slot accessed while absent.
    #[must_use]
    pub fn content_unavailable() -> Self {
        Self::new(DocGateErrorCode::ContentUnavailable)
    }

    /// Mount template resolution failure.
    #[must_use]
    pub fn mount_resolution(message: impl Into<String>) -> Self {
        Self::with_message(DocGateErrorCode::MountResolution, message)
    }

    /// The path does not address a resource.
    #[must_use]
    pub fn invalid_resource(path: &str) -> Self {
        Self::with_message(
            DocGateErrorCode::ClassificationInvalid,
            format!("No resource at {path}"),
        )
        .with_resource(path)
    }

    /// Malformed or out-of-range query parameter.
    #[must_use]
    pub fn invalid_parameter(param: &str, message: impl Into<String>) -> Self {
        Self::with_message(DocGateErrorCode::InvalidParameter, message).with_resource(param)
    }

    /// Method not allowed on the addressed resource.
    #[must_use]
    pub fn method_not_allowed(method: &http::Method, resource_type: &str) -> Self {
        Self::with_message(
            DocGateErrorCode::MethodNotAllowed,
            format!("Method {method} is not allowed on {resource_type}"),
        )
    }

    /// Reserved database or collection.
    #[must_use]
    pub fn forbidden(message: impl Into<String>) -> Self {
        Self::with_message(DocGateErrorCode::Forbidden, message)
    }

    /// Content larger than the configured limit.
    #[must_use]
    pub fn content_too_large(limit: usize) -> Self {
        Self::with_message(
            DocGateErrorCode::ContentTooLarge,
            format!("The request content exceeds the limit of {limit} bytes"),
        )
    }

    /// Buffer pool exhausted.
    #[must_use]
    pub fn pool_exhausted() -> Self {
        Self::new(DocGateErrorCode::PoolExhausted)
    }

    /// Internal error.
    #[must_use]
    pub fn internal_error(message: impl Into<String>) -> Self {
        Self::with_message(DocGateErrorCode::InternalError, message)
    }
}

/// Create a `DocGateError` from an error code.
///
/// # Examples
///
/// ```
/// use docgate_model::docgate_error;
/// use docgate_model::error::DocGateErrorCode;
///
/// let err = docgate_error!(BadContent);
/// assert_eq!(err.code, DocGateErrorCode::BadContent);
///
/// let err = docgate_error!(InvalidParameter, "pagesize must be a number");
/// assert_eq!(err.message, "pagesize must be a number");
/// ```
#[macro_export]
macro_rules! docgate_error {
    ($code:ident) => {
        $crate::error::DocGateError::new($crate::error::DocGateErrorCode::$code)
    };
    ($code:ident, $msg:expr) => {
        $crate::error::DocGateError::with_message($crate::error::DocGateErrorCode::$code, $msg)
    };
}
