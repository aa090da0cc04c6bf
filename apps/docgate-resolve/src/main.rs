//! docgate-resolve - run one request through the resolution pipeline.
//!
//! Reads the request body from stdin, resolves the request against the
//! configured mounts, decodes the content and prints the resolution as JSON.
//!
//! # Usage
//!
//! ```text
//! echo '{"a.b": 1}' | docgate-resolve PUT /db/coll/1 application/json
//! DOCGATE_MOUNTS='/api=/shop' docgate-resolve GET '/api/orders?page=2'
//! ```
//!
//! # Environment Variables
//!
//! | Variable | Default | Description |
//! |----------|---------|-------------|
//! | `DOCGATE_MOUNTS` | `/=*` | Comma separated `where=what` mounts |
//! | `DOCGATE_MAX_CONTENT_SIZE` | `16777216` | Largest accepted body |
//! | `DOCGATE_HOST` | *(unset)* | `Host` header sent with the request |
//! | `LOG_LEVEL` | `info` | Log level filter |
//! | `RUST_LOG` | *(unset)* | Fine-grained tracing filter (overrides `LOG_LEVEL`) |

use std::io::{IsTerminal, Read};

use anyhow::{Context, Result, bail};
use bytes::Bytes;
use docgate_core::{DocGateConfig, init_tracing};
use docgate_http::gateway::Gateway;
use docgate_http::request::RequestModel;
use docgate_model::document::CanonicalValue;
use docgate_model::error::DocGateError;
use http::header::{CONTENT_TYPE, HOST};
use http::{HeaderMap, HeaderValue, Method, Uri};
use http_body_util::Full;
use serde_json::{Value, json};
use tracing::{debug, info};

const USAGE: &str = "usage: docgate-resolve METHOD PATH [CONTENT_TYPE] < body";

#[tokio::main]
async fn main() -> Result<()> {
    let config = DocGateConfig::from_env();
    init_tracing(&config.log_level)?;

    let mut args = std::env::args().skip(1);
    let (Some(method), Some(path)) = (args.next(), args.next()) else {
        bail!(USAGE);
    };
    let content_type = args.next();

    let method = Method::from_bytes(method.to_ascii_uppercase().as_bytes())
        .with_context(|| format!("invalid method: {method}"))?;
    let uri: Uri = path.parse().with_context(|| format!("invalid path: {path}"))?;

    let mut headers = HeaderMap::new();
    if let Some(content_type) = &content_type {
        headers.insert(
            CONTENT_TYPE,
            HeaderValue::from_str(content_type).context("invalid content type")?,
        );
    }
    if let Ok(host) = std::env::var("DOCGATE_HOST") {
        headers.insert(HOST, HeaderValue::from_str(&host).context("invalid DOCGATE_HOST")?);
    }

    let body = read_stdin()?;
    info!(%method, %uri, bytes = body.len(), "resolving request");

    let gateway = Gateway::new(config).context("failed to build the gateway")?;
    let output = match resolve(&gateway, method, &uri, headers, body).await {
        Ok(resolution) => resolution,
        Err(err) => {
            println!("{}", serde_json::to_string_pretty(&error_json(&err))?);
            std::process::exit(1);
        }
    };

    println!("{}", serde_json::to_string_pretty(&output)?);
    Ok(())
}

fn read_stdin() -> Result<Bytes> {
    let mut stdin = std::io::stdin();
    if stdin.is_terminal() {
        return Ok(Bytes::new());
    }
    let mut buf = Vec::new();
    stdin.read_to_end(&mut buf).context("failed to read stdin")?;
    Ok(Bytes::from(buf))
}

async fn resolve(
    gateway: &Gateway,
    method: Method,
    uri: &Uri,
    headers: HeaderMap,
    body: Bytes,
) -> Result<Value, DocGateError> {
    let mut request = gateway.request(method, uri, headers)?;
    request.validate()?;

    let result = async {
        request.buffer_body(Full::new(body)).await?;
        describe(&request)
    }
    .await;

    request.release();
    debug!(in_use = gateway.pool().in_use(), "content released");
    result
}

fn describe(request: &RequestModel) -> Result<Value, DocGateError> {
    let negotiated = request.content()?;
    let file = negotiated.file.as_ref().map(|f| {
        json!({
            "field": f.field,
            "filename": f.filename,
            "contentType": f.content_type,
            "size": f.data.len(),
        })
    });

    Ok(json!({
        "requestId": request.request_id().to_string(),
        "method": request.method().as_str(),
        "path": request.path(),
        "canonicalUri": request.canonical_uri(),
        "resourceType": request.resource_type(),
        "db": request.db_name(),
        "collection": request.collection_name(),
        "documentId": request.document_id()?.map(|id| id.to_value()),
        "mount": request.mount_context()?,
        "options": {
            "page": request.page()?,
            "pagesize": request.pagesize()?,
            "count": request.count(),
            "filter": Value::Object(request.filter_document()?),
            "sort": Value::Object(request.sort_document()?),
            "hint": request.hint_document()?.map(Value::Object),
            "projection": request.projection_document()?.map(Value::Object),
            "writeMode": request.write_mode(),
            "rep": request.representation_format(),
            "idType": request.doc_id_type()?,
        },
        "content": negotiated.content.clone().map(CanonicalValue::into_value),
        "file": file,
    }))
}

fn error_json(err: &DocGateError) -> Value {
    json!({
        "error": err.code.as_str(),
        "status": err.status_code.as_u16(),
        "message": err.message,
        "resource": err.resource,
    })
}
