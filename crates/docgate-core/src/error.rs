//! Error types for docgate configuration.

/// Configuration error.
#[derive(Debug, thiserror::Error)]
pub enum DocGateConfigError {
    /// A mount entry is not a `where=what` pair.
    #[error("invalid mount entry: {0} (expected where=what)")]
    InvalidMount(String),

    /// A numeric setting is out of range.
    #[error("invalid value for {name}: {value}")]
    InvalidValue {
        /// The setting name.
        name: &'static str,
        /// The offending value.
        value: String,
    },
}

/// Convenience result type for configuration operations.
pub type DocGateConfigResult<T> = Result<T, DocGateConfigError>;
