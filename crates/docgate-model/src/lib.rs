//! Domain types for docgate.
//!
//! This crate holds the closed vocabulary of the request-resolution pipeline:
//! the resource kinds a canonical path classifies to, the reserved names and
//! query parameters, the error taxonomy, enumerated request options and the
//! canonical document values request content decodes into. Everything here is
//! pure; nothing performs I/O.
#![allow(clippy::module_name_repetitions)]

pub mod doc_id;
pub mod document;
pub mod error;
pub mod keys;
pub mod options;
pub mod resource;

pub use doc_id::DocumentId;
pub use document::{CanonicalValue, Document};
pub use error::{DocGateError, DocGateErrorCode};
pub use resource::ResourceType;
