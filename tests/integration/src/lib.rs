//! In-process integration tests for the docgate pipeline.
//!
//! Each test builds a [`Gateway`] from configuration, resolves a request head
//! and drives it through buffering, negotiation and option parsing.
//!
//! ```text
//! cargo test -p docgate-integration
//! ```

use std::sync::Once;

use docgate_core::{DocGateConfig, MountConfig};
use docgate_http::gateway::Gateway;
use docgate_http::request::RequestModel;
use docgate_model::error::DocGateError;
use http::header::CONTENT_TYPE;
use http::{HeaderMap, HeaderValue, Method, Uri};

mod test_content;
mod test_lifecycle;
mod test_mounts;

static INIT: Once = Once::new();

/// Initialize tracing (once).
fn init_tracing() {
    INIT.call_once(|| {
        tracing_subscriber::fmt()
            .with_env_filter(
                tracing_subscriber::EnvFilter::try_from_default_env()
                    .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new("warn")),
            )
            .with_test_writer()
            .init();
    });
}

/// Build a gateway over the given `(where, what)` mounts.
///
/// # Panics
///
/// Panics if the mounts are invalid.
#[must_use]
pub fn gateway(mounts: &[(&str, &str)]) -> Gateway {
    init_tracing();

    let mounts = if mounts.is_empty() {
        vec![MountConfig::new("/", "*")]
    } else {
        mounts
            .iter()
            .map(|(where_uri, what)| MountConfig::new(*where_uri, *what))
            .collect()
    };
    let config = DocGateConfig::builder()
        .mounts(mounts)
        .segment_size(64)
        .pool_segments(32)
        .max_content_size(1024)
        .build();
    Gateway::new(config).expect("valid test configuration")
}

/// Resolve a request head with an optional content type.
///
/// # Panics
///
/// Panics if `uri` is not a valid URI.
pub fn resolve(
    gateway: &Gateway,
    method: Method,
    uri: &str,
    content_type: Option<&'static str>,
) -> Result<RequestModel, DocGateError> {
    let uri: Uri = uri.parse().expect("valid test uri");
    let mut headers = HeaderMap::new();
    if let Some(content_type) = content_type {
        headers.insert(CONTENT_TYPE, HeaderValue::from_static(content_type));
    }
    gateway.request(method, &uri, headers)
}
