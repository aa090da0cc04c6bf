//! Request resolution and content normalization for docgate.
//!
//! This crate turns an inbound request head and body into a canonical
//! resource coordinate and a validated document value:
//!
//! - **Mapping** ([`mapping`]): bidirectional mapping between request paths
//!   and canonical resource URIs through [`MountTable`](mapping::MountTable),
//!   including path templates and host parameters.
//!
//! - **Mount context** ([`mount`]): the database scope and structural
//!   permissions a path resolves to, behind the
//!   [`MountResolver`](mount::MountResolver) trait.
//!
//! - **Buffering** ([`buffer`]): a bounded pool of fixed-size segments and the
//!   per-request [`ContentSlot`](buffer::ContentSlot) holding buffered content.
//!
//! - **Negotiation** ([`negotiate`]): content-type dispatch to the JSON, form
//!   and multipart decoders, followed by shape and operator validation.
//!
//! - **Request model** ([`request`]): the per-request
//!   [`RequestModel`](request::RequestModel) with lazily parsed query options.
//!
//! # Architecture
//!
//! ```text
//! Request head
//!   -> Gateway::request
//!     -> MountTable::resolve        (longest where wins)
//!     -> MountMapping::to_canonical (templates, host params)
//!     -> ResourceType::classify
//!   <- RequestModel
//!        .page() / .filter_document() / ...   parsed on first access
//!        .buffer_body(body)                   opt-in, pooled segments
//!        .content()                           ContentNegotiator::inject
//!        .mount_context()                     MountResolver, once
//! ```

// DocGateError is returned on every fallible path; boxing it would only add
// indirection.
#![allow(clippy::result_large_err)]

pub mod body;
pub mod buffer;
pub mod form;
pub mod gateway;
pub mod mapping;
pub mod mount;
pub mod multipart;
pub mod negotiate;
pub mod query;
pub mod request;

pub use buffer::{BufferPool, ContentSlot};
pub use gateway::Gateway;
pub use mapping::{MountMapping, MountTable};
pub use mount::{DefaultMountResolver, MountResolver, ResolvedContext};
pub use negotiate::{ContentNegotiator, Negotiated, WriteTarget};
pub use request::RequestModel;
