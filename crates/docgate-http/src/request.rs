//! The per-request model.
//!
//! [`RequestModel`] is built once per inbound request from the request head.
//! Construction maps the path through the mount table and classifies it; query
//! options, the decoded content and the mount context are all computed on
//! first access and memoized.
//!
//! Options can be overridden with the `set_*` methods until a consumer reads
//! them.

use std::sync::{Arc, OnceLock};

use bytes::Bytes;
use chrono::{DateTime, Utc};
use docgate_core::DocGateConfig;
use docgate_model::doc_id::DocumentId;
use docgate_model::document::{CanonicalValue, Document};
use docgate_model::error::DocGateError;
use docgate_model::keys::{
    AGGREGATION_VARIABLES_QPARAM, CACHE_QPARAM, CLIENT_SESSION_QPARAM, COUNT_QPARAM,
    DOC_ID_TYPE_QPARAM, EAGER_QPARAM, ETAG_CHECK_QPARAM, FILTER_QPARAM, HAL_QPARAM, HINT_QPARAM,
    ID_FIELD, JSON_MODE_QPARAM, KEYS_QPARAM, NO_CACHE_QPARAM, NO_PROPS_QPARAM, PAGE_QPARAM,
    PAGESIZE_QPARAM, READ_CONCERN_QPARAM, READ_PREFERENCE_QPARAM, REPRESENTATION_FORMAT_QPARAM,
    SHARDKEY_QPARAM, SORT_BY_QPARAM, SORT_QPARAM, TXN_ID_QPARAM, WRITE_CONCERN_QPARAM,
    WRITE_MODE_QPARAM, WRITE_MODE_SHORT_QPARAM,
};
use docgate_model::options::{
    DocIdType, EagerCursorPolicy, HalMode, JsonMode, RepresentationFormat, WriteMode,
};
use docgate_model::resource::{
    ResourceType, is_collection_name_invalid, is_db_name_invalid, is_reserved_collection_name,
    is_reserved_db_name, tokenize,
};
use http::header::{CONTENT_TYPE, HOST, IF_MATCH};
use http::{HeaderMap, Method, Uri};
use serde_json::{Value, json};
use tracing::{debug, warn};
use uuid::Uuid;

use crate::buffer::ContentSlot;
use crate::gateway::Gateway;
use crate::mapping::{MountMapping, TemplateParams, normalize};
use crate::mount::{MountResolver, ResolvedContext};
use crate::negotiate::{ContentNegotiator, Negotiated, WriteTarget};
use crate::query::{QueryParams, decode_uri_component};

/// A resolved inbound request.
#[derive(Debug)]
pub struct RequestModel {
    request_id: Uuid,
    started_at: DateTime<Utc>,
    method: Method,
    headers: HeaderMap,
    host: Option<String>,
    path: String,
    canonical_uri: String,
    tokens: Vec<String>,
    resource_type: ResourceType,
    mapping: MountMapping,
    params: TemplateParams,
    query: QueryParams,
    config: Arc<DocGateConfig>,
    resolver: Arc<dyn MountResolver>,
    mount_context: OnceLock<Result<ResolvedContext, DocGateError>>,

    raw_body: Option<Bytes>,
    body: ContentSlot,
    content: OnceLock<Negotiated>,

    page: OnceLock<u64>,
    pagesize: OnceLock<usize>,
    count: OnceLock<bool>,
    filters: OnceLock<Vec<String>>,
    sort_by: OnceLock<Option<Vec<String>>>,
    hint: OnceLock<Option<Vec<String>>>,
    keys: OnceLock<Option<Vec<String>>>,
    aggregation_vars: OnceLock<Option<Document>>,
    shard_key: OnceLock<Option<Document>>,
    doc_id_type: OnceLock<DocIdType>,
    write_mode: OnceLock<WriteMode>,
    json_mode: OnceLock<Option<JsonMode>>,
    representation_format: OnceLock<RepresentationFormat>,
    hal_mode: OnceLock<HalMode>,
    eager_policy: OnceLock<EagerCursorPolicy>,
}

impl RequestModel {
    /// Map and classify a request head.
    pub(crate) fn new(
        gateway: &Gateway,
        method: Method,
        uri: &Uri,
        headers: HeaderMap,
    ) -> Result<Self, DocGateError> {
        let path = normalize(&decode_uri_component(uri.path()));
        let host = headers
            .get(HOST)
            .and_then(|v| v.to_str().ok())
            .map(ToOwned::to_owned);

        let (mapping, params) = gateway.mounts().resolve(&path, host.as_deref())?;
        let canonical_uri = mapping.to_canonical(&path, &params)?;
        let tokens = tokenize(&canonical_uri);
        let resource_type = ResourceType::classify(&tokens);

        let request_id = Uuid::new_v4();
        debug!(
            %request_id,
            %method,
            path = %path,
            canonical_uri = %canonical_uri,
            %resource_type,
            "request classified"
        );

        let config = Arc::clone(gateway.config());
        Ok(Self {
            request_id,
            started_at: Utc::now(),
            method,
            headers,
            host,
            path,
            canonical_uri,
            tokens,
            resource_type,
            mapping,
            params,
            query: QueryParams::parse(uri.query().unwrap_or_default()),
            body: ContentSlot::from_config(gateway.pool().clone(), &config),
            config,
            resolver: Arc::clone(gateway.resolver()),
            mount_context: OnceLock::new(),
            raw_body: None,
            content: OnceLock::new(),
            page: OnceLock::new(),
            pagesize: OnceLock::new(),
            count: OnceLock::new(),
            filters: OnceLock::new(),
            sort_by: OnceLock::new(),
            hint: OnceLock::new(),
            keys: OnceLock::new(),
            aggregation_vars: OnceLock::new(),
            shard_key: OnceLock::new(),
            doc_id_type: OnceLock::new(),
            write_mode: OnceLock::new(),
            json_mode: OnceLock::new(),
            representation_format: OnceLock::new(),
            hal_mode: OnceLock::new(),
            eager_policy: OnceLock::new(),
        })
    }

    // -- Identity --

    /// Unique id of this request.
    #[must_use]
    pub fn request_id(&self) -> Uuid {
        self.request_id
    }

    /// When the request was resolved.
    #[must_use]
    pub fn started_at(&self) -> DateTime<Utc> {
        self.started_at
    }

    /// Request method.
    #[must_use]
    pub fn method(&self) -> &Method {
        &self.method
    }

    /// Request headers.
    #[must_use]
    pub fn headers(&self) -> &HeaderMap {
        &self.headers
    }

    /// The `Content-Type` header, when valid UTF-8.
    #[must_use]
    pub fn content_type(&self) -> Option<&str> {
        self.headers.get(CONTENT_TYPE).and_then(|v| v.to_str().ok())
    }

    /// The normalized request path, as the client sent it.
    #[must_use]
    pub fn path(&self) -> &str {
        &self.path
    }

    /// The canonical resource URI.
    #[must_use]
    pub fn canonical_uri(&self) -> &str {
        &self.canonical_uri
    }

    /// Canonical path tokens; index 0 is always empty.
    #[must_use]
    pub fn tokens(&self) -> &[String] {
        &self.tokens
    }

    /// The addressed resource kind.
    #[must_use]
    pub fn resource_type(&self) -> ResourceType {
        self.resource_type
    }

    /// The mount serving this request.
    #[must_use]
    pub fn mapping(&self) -> &MountMapping {
        &self.mapping
    }

    /// Template and host parameters matched by the mount.
    #[must_use]
    pub fn template_params(&self) -> &TemplateParams {
        &self.params
    }

    /// Parsed query string.
    #[must_use]
    pub fn query(&self) -> &QueryParams {
        &self.query
    }

    /// Map a canonical URI back to the path a client would use.
    pub fn request_path_of(&self, canonical: &str) -> Result<String, DocGateError> {
        self.mapping.to_request_path(canonical, &self.params)
    }

    // -- Path coordinates --

    fn addresses_database(&self) -> bool {
        !matches!(
            self.resource_type,
            ResourceType::Root
                | ResourceType::RootSize
                | ResourceType::Sessions
                | ResourceType::Session
                | ResourceType::Transactions
                | ResourceType::Transaction
        )
    }

    /// The database name, for resources inside a database.
    #[must_use]
    pub fn db_name(&self) -> Option<&str> {
        if !self.addresses_database() {
            return None;
        }
        self.tokens.get(1).map(String::as_str)
    }

    /// The collection name, for resources inside a collection.
    #[must_use]
    pub fn collection_name(&self) -> Option<&str> {
        if !self.addresses_database() {
            return None;
        }
        self.tokens.get(2).map(String::as_str)
    }

    /// The raw document id path segment.
    #[must_use]
    pub fn document_id_raw(&self) -> Option<&str> {
        match self.resource_type {
            ResourceType::Document
            | ResourceType::File
            | ResourceType::FileBinary
            | ResourceType::Schema => self.tokens.get(3).map(String::as_str),
            _ => None,
        }
    }

    /// The document id, parsed according to `id_type`.
    pub fn document_id(&self) -> Result<Option<DocumentId>, DocGateError> {
        let Some(raw) = self.document_id_raw() else {
            return Ok(None);
        };
        DocumentId::parse(raw, self.doc_id_type()?).map(Some)
    }

    /// Whether the request addresses documents in bulk.
    #[must_use]
    pub fn is_bulk(&self) -> bool {
        self.resource_type == ResourceType::BulkDocuments
            || (self.resource_type == ResourceType::Collection && self.method == Method::POST)
    }

    // -- Validation --

    /// Fail with `MethodNotAllowed` unless the resource type handles the
    /// method.
    pub fn check_method(&self) -> Result<(), DocGateError> {
        if self.resource_type.allows(&self.method) {
            Ok(())
        } else {
            Err(DocGateError::method_not_allowed(
                &self.method,
                self.resource_type.as_str(),
            ))
        }
    }

    /// Check the path and every query option.
    ///
    /// `OPTIONS` requests skip the option checks.
    pub fn validate(&self) -> Result<(), DocGateError> {
        if self.resource_type == ResourceType::Invalid {
            return Err(DocGateError::invalid_resource(&self.canonical_uri));
        }
        self.check_method()?;

        if self.method == Method::OPTIONS {
            return Ok(());
        }

        if let Some(db) = self.db_name() {
            if is_db_name_invalid(db) {
                return Err(DocGateError::invalid_parameter(
                    "db",
                    format!("illegal database name {db}"),
                ));
            }
            if is_reserved_db_name(db) {
                return Err(DocGateError::forbidden("reserved resource").with_resource(db));
            }
        }
        if let Some(coll) = self.collection_name() {
            if is_collection_name_invalid(coll) {
                return Err(DocGateError::invalid_parameter(
                    "collection",
                    format!("illegal collection name {coll}"),
                ));
            }
            if is_reserved_collection_name(coll) {
                return Err(DocGateError::forbidden("reserved resource").with_resource(coll));
            }
        }

        self.pagesize()?;
        self.page()?;
        self.sort_by()?;
        self.hint()?;
        self.keys()?;
        let filters = self.filters()?;
        if self.resource_type == ResourceType::BulkDocuments
            && matches!(self.method, Method::PATCH | Method::DELETE)
            && filters.is_empty()
        {
            return Err(DocGateError::invalid_parameter(
                FILTER_QPARAM,
                "filter parameter is mandatory for bulk write requests",
            ));
        }
        self.aggregation_vars()?;
        self.eager_policy()?;
        if self.method != Method::POST {
            self.document_id()?;
        }
        self.hal_mode()?;
        self.shard_key()?;
        self.json_mode()?;
        self.txn_id()?;
        Ok(())
    }

    // -- Mount context --

    /// The database scope of the request, resolved once.
    ///
    /// Concurrent first calls block until a single resolution completes;
    /// every caller observes the same result.
    pub fn mount_context(&self) -> Result<&ResolvedContext, DocGateError> {
        self.mount_context
            .get_or_init(|| self.resolver.resolve(&self.path, self.host.as_deref()))
            .as_ref()
            .map_err(DocGateError::detached)
    }

    // -- Content --

    /// Attach the body as delivered by the transport, without buffering it.
    pub fn set_raw_body(&mut self, body: impl Into<Bytes>) {
        self.raw_body = Some(body.into());
        self.content = OnceLock::new();
    }

    /// Stream a body into the request content slot so it can be read more
    /// than once.
    pub async fn buffer_body<B>(&mut self, body: B) -> Result<(), DocGateError>
    where
        B: http_body::Body + Unpin,
        B::Error: Into<Box<dyn std::error::Error + Send + Sync>>,
    {
        self.content = OnceLock::new();
        self.body.buffer_body(body).await
    }

    /// The buffered request content.
    ///
    /// Fails with `ContentUnavailable` unless the body was buffered.
    pub fn buffered_content(&self) -> Result<Bytes, DocGateError> {
        self.body.read()
    }

    /// The request content slot.
    pub fn content_slot(&mut self) -> &mut ContentSlot {
        &mut self.body
    }

    /// Release buffered content back to the pool.
    pub fn release(&mut self) {
        self.body.release();
    }

    /// The decoded and validated request content.
    pub fn content(&self) -> Result<&Negotiated, DocGateError> {
        if let Some(content) = self.content.get() {
            return Ok(content);
        }

        let bytes = if self.body.is_present() {
            self.body.read()?
        } else {
            self.raw_body.clone().unwrap_or_default()
        };
        let target = WriteTarget::new(self.method.clone(), self.resource_type);
        let negotiated = ContentNegotiator::inject(self.content_type(), &bytes, &target)?;
        Ok(self.content.get_or_init(|| negotiated))
    }

    /// Replace the decoded content.
    pub fn set_content(&mut self, content: Negotiated) {
        self.content = OnceLock::from(content);
    }

    /// A reserved literal `_id` (such as `_MaxKey`) carried by the content.
    pub fn reserved_content_id(&self) -> Result<Option<&str>, DocGateError> {
        Ok(self
            .content()?
            .content
            .as_ref()
            .and_then(CanonicalValue::reserved_id))
    }

    // -- Pagination --

    /// `page`, starting at 1.
    pub fn page(&self) -> Result<u64, DocGateError> {
        if let Some(page) = self.page.get() {
            return Ok(*page);
        }

        let page = match self.query.get(PAGE_QPARAM) {
            None => 1,
            Some(raw) => {
                let page = raw.trim().parse::<i64>().map_err(|e| {
                    DocGateError::invalid_parameter(
                        PAGE_QPARAM,
                        "illegal page parameter, it is not a number",
                    )
                    .with_source(e)
                })?;
                u64::try_from(page).ok().filter(|p| *p >= 1).ok_or_else(|| {
                    DocGateError::invalid_parameter(PAGE_QPARAM, "illegal page parameter, it is < 1")
                })?
            }
        };
        Ok(*self.page.get_or_init(|| page))
    }

    /// Override `page`.
    pub fn set_page(&mut self, page: u64) {
        self.page = OnceLock::from(page);
    }

    /// `pagesize`, between 0 and the configured maximum.
    pub fn pagesize(&self) -> Result<usize, DocGateError> {
        if let Some(pagesize) = self.pagesize.get() {
            return Ok(*pagesize);
        }

        let max = self.config.max_pagesize;
        let pagesize = match self.query.get(PAGESIZE_QPARAM) {
            None => self.config.default_pagesize,
            Some(raw) => {
                let pagesize = raw.trim().parse::<i64>().map_err(|e| {
                    DocGateError::invalid_parameter(
                        PAGESIZE_QPARAM,
                        "illegal pagesize parameter, it is not a number",
                    )
                    .with_source(e)
                })?;
                usize::try_from(pagesize)
                    .ok()
                    .filter(|p| *p <= max)
                    .ok_or_else(|| {
                        DocGateError::invalid_parameter(
                            PAGESIZE_QPARAM,
                            format!("illegal pagesize parameter, pagesize must be >= 0 and <= {max}"),
                        )
                    })?
            }
        };
        Ok(*self.pagesize.get_or_init(|| pagesize))
    }

    /// Override `pagesize`.
    pub fn set_pagesize(&mut self, pagesize: usize) {
        self.pagesize = OnceLock::from(pagesize);
    }

    /// Whether a document count was requested. Implied by `*_SIZE` resources.
    #[must_use]
    pub fn count(&self) -> bool {
        *self
            .count
            .get_or_init(|| self.query.contains(COUNT_QPARAM) || self.resource_type.is_size())
    }

    /// Override the count flag.
    pub fn set_count(&mut self, count: bool) {
        self.count = OnceLock::from(count);
    }

    // -- Query documents --

    /// Raw `filter` fragments, each a non-empty JSON object.
    pub fn filters(&self) -> Result<&[String], DocGateError> {
        if let Some(filters) = self.filters.get() {
            return Ok(filters);
        }

        let filters = self
            .query
            .get_all(FILTER_QPARAM)
            .map(|raw| parse_object_param(FILTER_QPARAM, raw, false).map(|_| raw.to_owned()))
            .collect::<Result<Vec<_>, _>>()?;
        Ok(self.filters.get_or_init(|| filters))
    }

    /// Override the filter fragments.
    pub fn set_filters(&mut self, filters: Vec<String>) {
        self.filters = OnceLock::from(filters);
    }

    /// The filter fragments combined: a single fragment verbatim, several
    /// under `$and`.
    ///
    /// # Examples
    ///
    /// ```
    /// use docgate_core::DocGateConfig;
    /// use docgate_http::gateway::Gateway;
    /// use http::{HeaderMap, Method, Uri};
    /// use serde_json::json;
    ///
    /// let gateway = Gateway::new(DocGateConfig::default()).unwrap();
    /// let uri: Uri = "/db/coll?filter={%22a%22:1}&filter={%22b%22:2}".parse().unwrap();
    /// let request = gateway.request(Method::GET, &uri, HeaderMap::new()).unwrap();
    /// let filter = request.filter_document().unwrap();
    /// assert_eq!(serde_json::Value::Object(filter), json!({"$and": [{"a": 1}, {"b": 2}]}));
    /// ```
    pub fn filter_document(&self) -> Result<Document, DocGateError> {
        let filters = self.filters()?;
        let mut parsed = filters
            .iter()
            .map(|raw| parse_object_param(FILTER_QPARAM, raw, false))
            .collect::<Result<Vec<_>, _>>()?;

        match parsed.len() {
            0 => Ok(Document::new()),
            1 => Ok(parsed.remove(0)),
            _ => {
                let mut doc = Document::new();
                doc.insert(
                    "$and".to_owned(),
                    Value::Array(parsed.into_iter().map(Value::Object).collect()),
                );
                Ok(doc)
            }
        }
    }

    /// Raw sort specs; `sort_by` takes precedence over `sort`.
    pub fn sort_by(&self) -> Result<Option<&[String]>, DocGateError> {
        if let Some(sort_by) = self.sort_by.get() {
            return Ok(sort_by.as_deref());
        }

        let param = if self.query.contains(SORT_BY_QPARAM) {
            Some(SORT_BY_QPARAM)
        } else if self.query.contains(SORT_QPARAM) {
            Some(SORT_QPARAM)
        } else {
            None
        };
        let sort_by = param
            .map(|param| non_empty_values(&self.query, param))
            .transpose()?;
        Ok(self.sort_by.get_or_init(|| sort_by).as_deref())
    }

    /// Override the sort specs.
    pub fn set_sort_by(&mut self, sort_by: Option<Vec<String>>) {
        self.sort_by = OnceLock::from(sort_by);
    }

    /// The sort document; `{"_id": -1}` when no sort was requested.
    pub fn sort_document(&self) -> Result<Document, DocGateError> {
        let Some(specs) = self.sort_by()? else {
            let mut doc = Document::new();
            doc.insert(ID_FIELD.to_owned(), json!(-1));
            return Ok(doc);
        };
        specs_to_document(SORT_BY_QPARAM, specs)
    }

    /// Raw `hint` values.
    pub fn hint(&self) -> Result<Option<&[String]>, DocGateError> {
        if let Some(hint) = self.hint.get() {
            return Ok(hint.as_deref());
        }

        let hint = self
            .query
            .contains(HINT_QPARAM)
            .then(|| non_empty_values(&self.query, HINT_QPARAM))
            .transpose()?;
        Ok(self.hint.get_or_init(|| hint).as_deref())
    }

    /// Override the hint values.
    pub fn set_hint(&mut self, hint: Option<Vec<String>>) {
        self.hint = OnceLock::from(hint);
    }

    /// The index hint document, if a hint was given.
    pub fn hint_document(&self) -> Result<Option<Document>, DocGateError> {
        self.hint()?
            .map(|specs| specs_to_document(HINT_QPARAM, specs))
            .transpose()
    }

    /// Raw `keys` values, each a JSON object.
    pub fn keys(&self) -> Result<Option<&[String]>, DocGateError> {
        if let Some(keys) = self.keys.get() {
            return Ok(keys.as_deref());
        }

        let keys = if self.query.contains(KEYS_QPARAM) {
            Some(
                self.query
                    .get_all(KEYS_QPARAM)
                    .map(|raw| parse_object_param(KEYS_QPARAM, raw, true).map(|_| raw.to_owned()))
                    .collect::<Result<Vec<_>, _>>()?,
            )
        } else {
            None
        };
        Ok(self.keys.get_or_init(|| keys).as_deref())
    }

    /// Override the projection keys.
    pub fn set_keys(&mut self, keys: Option<Vec<String>>) {
        self.keys = OnceLock::from(keys);
    }

    /// The projection document, if `keys` was given.
    pub fn projection_document(&self) -> Result<Option<Document>, DocGateError> {
        let Some(keys) = self.keys()? else {
            return Ok(None);
        };
        let mut projection = Document::new();
        for raw in keys {
            projection.extend(parse_object_param(KEYS_QPARAM, raw, true)?);
        }
        Ok(Some(projection))
    }

    /// Aggregation variables from `avars`.
    ///
    /// When `aggregation_check_operators` is set, keys starting with `$`
    /// are rejected at any depth.
    pub fn aggregation_vars(&self) -> Result<Option<&Document>, DocGateError> {
        if let Some(avars) = self.aggregation_vars.get() {
            return Ok(avars.as_ref());
        }

        let avars = match self.query.get(AGGREGATION_VARIABLES_QPARAM) {
            None => None,
            Some(raw) => {
                let vars = parse_object_param(AGGREGATION_VARIABLES_QPARAM, raw, true)?;
                if self.config.aggregation_check_operators && contains_operator_keys(&vars) {
                    return Err(DocGateError::invalid_parameter(
                        AGGREGATION_VARIABLES_QPARAM,
                        format!("illegal avars parameter, it contains operators: {raw}"),
                    ));
                }
                Some(vars)
            }
        };
        Ok(self.aggregation_vars.get_or_init(|| avars).as_ref())
    }

    /// Override the aggregation variables.
    pub fn set_aggregation_vars(&mut self, avars: Option<Document>) {
        self.aggregation_vars = OnceLock::from(avars);
    }

    /// Shard key from `shardkey`, a non-empty JSON object.
    pub fn shard_key(&self) -> Result<Option<&Document>, DocGateError> {
        if let Some(shard_key) = self.shard_key.get() {
            return Ok(shard_key.as_ref());
        }

        let shard_key = self
            .query
            .get(SHARDKEY_QPARAM)
            .map(|raw| parse_object_param(SHARDKEY_QPARAM, raw, false))
            .transpose()?;
        Ok(self.shard_key.get_or_init(|| shard_key).as_ref())
    }

    /// Override the shard key.
    pub fn set_shard_key(&mut self, shard_key: Option<Document>) {
        self.shard_key = OnceLock::from(shard_key);
    }

    // -- Enumerated options --

    /// `id_type`, `STRING_OID` by default.
    pub fn doc_id_type(&self) -> Result<DocIdType, DocGateError> {
        if let Some(id_type) = self.doc_id_type.get() {
            return Ok(*id_type);
        }
        let id_type = parse_enum_param(&self.query, DOC_ID_TYPE_QPARAM, DocIdType::parse)?
            .unwrap_or_default();
        Ok(*self.doc_id_type.get_or_init(|| id_type))
    }

    /// Override the id type.
    pub fn set_doc_id_type(&mut self, id_type: DocIdType) {
        self.doc_id_type = OnceLock::from(id_type);
    }

    /// `writeMode` (or `wm`); an invalid value falls back to the method
    /// default.
    #[must_use]
    pub fn write_mode(&self) -> WriteMode {
        *self.write_mode.get_or_init(|| {
            let default = WriteMode::default_for(&self.method);
            let raw = self
                .query
                .get(WRITE_MODE_QPARAM)
                .or_else(|| self.query.get(WRITE_MODE_SHORT_QPARAM));
            match raw {
                None => default,
                Some(raw) => WriteMode::parse(raw).unwrap_or_else(|| {
                    warn!(value = %raw, %default, "illegal writeMode parameter, using default");
                    default
                }),
            }
        })
    }

    /// Override the write mode.
    pub fn set_write_mode(&mut self, write_mode: WriteMode) {
        self.write_mode = OnceLock::from(write_mode);
    }

    /// `jsonMode` for the response encoding.
    pub fn json_mode(&self) -> Result<Option<JsonMode>, DocGateError> {
        if let Some(mode) = self.json_mode.get() {
            return Ok(*mode);
        }
        let mode = parse_enum_param(&self.query, JSON_MODE_QPARAM, JsonMode::parse)?;
        Ok(*self.json_mode.get_or_init(|| mode))
    }

    /// Override the JSON mode.
    pub fn set_json_mode(&mut self, mode: Option<JsonMode>) {
        self.json_mode = OnceLock::from(mode);
    }

    /// `rep`; an invalid value logs a warning and uses the configured
    /// default.
    #[must_use]
    pub fn representation_format(&self) -> RepresentationFormat {
        *self.representation_format.get_or_init(|| {
            let default = self.config.default_representation_format;
            match self
                .query
                .get(REPRESENTATION_FORMAT_QPARAM)
                .filter(|raw| !raw.trim().is_empty())
            {
                None => default,
                Some(raw) => RepresentationFormat::parse(raw).unwrap_or_else(|| {
                    warn!(value = %raw, %default, "illegal rep parameter, using default");
                    default
                }),
            }
        })
    }

    /// Override the representation format.
    pub fn set_representation_format(&mut self, rep: RepresentationFormat) {
        self.representation_format = OnceLock::from(rep);
    }

    /// `hal`, `COMPACT` by default.
    pub fn hal_mode(&self) -> Result<HalMode, DocGateError> {
        if let Some(mode) = self.hal_mode.get() {
            return Ok(*mode);
        }
        let mode = parse_enum_param(&self.query, HAL_QPARAM, HalMode::parse)?.unwrap_or_default();
        Ok(*self.hal_mode.get_or_init(|| mode))
    }

    /// Override the HAL mode.
    pub fn set_hal_mode(&mut self, mode: HalMode) {
        self.hal_mode = OnceLock::from(mode);
    }

    /// `eager` cursor allocation policy, `NONE` by default.
    pub fn eager_policy(&self) -> Result<EagerCursorPolicy, DocGateError> {
        if let Some(policy) = self.eager_policy.get() {
            return Ok(*policy);
        }
        let policy = parse_enum_param(&self.query, EAGER_QPARAM, EagerCursorPolicy::parse)?
            .unwrap_or(EagerCursorPolicy::None);
        Ok(*self.eager_policy.get_or_init(|| policy))
    }

    /// Override the cursor allocation policy.
    pub fn set_eager_policy(&mut self, policy: EagerCursorPolicy) {
        self.eager_policy = OnceLock::from(policy);
    }

    // -- Flags and pass-through parameters --

    /// Whether `cache` was requested.
    #[must_use]
    pub fn cache(&self) -> bool {
        self.query.contains(CACHE_QPARAM) && !self.no_cache()
    }

    /// Whether `nocache` was requested.
    #[must_use]
    pub fn no_cache(&self) -> bool {
        self.query.contains(NO_CACHE_QPARAM)
    }

    /// Whether `checkEtag` was requested.
    #[must_use]
    pub fn check_etag(&self) -> bool {
        self.query.contains(ETAG_CHECK_QPARAM)
    }

    /// Whether `np` (no properties) was requested.
    #[must_use]
    pub fn no_props(&self) -> bool {
        self.query.contains(NO_PROPS_QPARAM)
    }

    /// The `If-Match` etag.
    #[must_use]
    pub fn etag(&self) -> Option<&str> {
        self.headers
            .get(IF_MATCH)
            .and_then(|v| v.to_str().ok())
            .map(|v| v.trim_matches('"'))
            .filter(|v| !v.is_empty())
    }

    /// Client session id, from `sid` or the `/_sessions/{sid}` path.
    #[must_use]
    pub fn session_id(&self) -> Option<&str> {
        self.query.get(CLIENT_SESSION_QPARAM).or_else(|| {
            matches!(
                self.resource_type,
                ResourceType::Session | ResourceType::Transactions | ResourceType::Transaction
            )
            .then(|| self.tokens.get(2).map(String::as_str))
            .flatten()
        })
    }

    /// Transaction number, from `txn` or the `/_txns/{n}` path.
    pub fn txn_id(&self) -> Result<Option<i64>, DocGateError> {
        let raw = self.query.get(TXN_ID_QPARAM).or_else(|| {
            (self.resource_type == ResourceType::Transaction)
                .then(|| self.tokens.get(4).map(String::as_str))
                .flatten()
        });
        raw.map(|raw| {
            raw.trim().parse::<i64>().map_err(|e| {
                DocGateError::invalid_parameter(TXN_ID_QPARAM, "illegal txnId: it must be a number")
                    .with_source(e)
            })
        })
        .transpose()
    }

    /// Whether the request runs inside a transaction.
    #[must_use]
    pub fn is_txn(&self) -> bool {
        self.query.contains(TXN_ID_QPARAM) || self.resource_type == ResourceType::Transaction
    }

    /// Raw `writeConcern`.
    #[must_use]
    pub fn write_concern(&self) -> Option<&str> {
        self.query.get(WRITE_CONCERN_QPARAM)
    }

    /// Raw `readConcern`.
    #[must_use]
    pub fn read_concern(&self) -> Option<&str> {
        self.query.get(READ_CONCERN_QPARAM)
    }

    /// Raw `readPreference`.
    #[must_use]
    pub fn read_preference(&self) -> Option<&str> {
        self.query.get(READ_PREFERENCE_QPARAM)
    }
}

fn non_empty_values(query: &QueryParams, param: &'static str) -> Result<Vec<String>, DocGateError> {
    query
        .get_all(param)
        .map(|raw| {
            if raw.trim().is_empty() {
                Err(DocGateError::invalid_parameter(
                    param,
                    format!("illegal {param} parameter (empty)"),
                ))
            } else {
                Ok(raw.to_owned())
            }
        })
        .collect()
}

/// Parse a JSON-object query value. Empty objects are refused unless
/// `allow_empty`.
fn parse_object_param(
    param: &'static str,
    raw: &str,
    allow_empty: bool,
) -> Result<Document, DocGateError> {
    if raw.trim().is_empty() {
        return Err(DocGateError::invalid_parameter(
            param,
            format!("illegal {param} parameter (empty)"),
        ));
    }

    match serde_json::from_str::<Value>(raw) {
        Ok(Value::Object(doc)) if doc.is_empty() && !allow_empty => {
            Err(DocGateError::invalid_parameter(
                param,
                format!("illegal {param} parameter (empty json object)"),
            ))
        }
        Ok(Value::Object(doc)) => Ok(doc),
        Ok(_) => Err(DocGateError::invalid_parameter(
            param,
            format!("illegal {param} parameter, it is not a json object: {raw}"),
        )),
        Err(e) => {
            debug!(param, error = %e, "query parameter is not valid json");
            Err(
                DocGateError::invalid_parameter(param, format!("illegal {param} parameter: {raw}"))
                    .with_source(e),
            )
        }
    }
}

fn parse_enum_param<T>(
    query: &QueryParams,
    param: &'static str,
    parse: fn(&str) -> Option<T>,
) -> Result<Option<T>, DocGateError> {
    match query.get(param).filter(|raw| !raw.trim().is_empty()) {
        None => Ok(None),
        Some(raw) => parse(raw).map(Some).ok_or_else(|| {
            DocGateError::invalid_parameter(param, format!("illegal {param} parameter: {raw}"))
        }),
    }
}

/// Turn sort or hint specs into a document: JSON objects are merged, plain
/// names map to 1, or -1 with a leading `-`.
fn specs_to_document(param: &'static str, specs: &[String]) -> Result<Document, DocGateError> {
    let mut doc = Document::new();
    for spec in specs {
        let spec = spec.trim();
        if spec.starts_with('{') {
            doc.extend(parse_object_param(param, spec, true)?);
        } else if let Some(name) = spec.strip_prefix('-') {
            doc.insert(name.to_owned(), json!(-1));
        } else {
            doc.insert(spec.strip_prefix('+').unwrap_or(spec).to_owned(), json!(1));
        }
    }
    Ok(doc)
}

fn contains_operator_keys(doc: &Document) -> bool {
    doc.iter().any(|(key, value)| key.starts_with('$') || value_contains_operator_keys(value))
}

fn value_contains_operator_keys(value: &Value) -> bool {
    match value {
        Value::Object(doc) => contains_operator_keys(doc),
        Value::Array(items) => items.iter().any(value_contains_operator_keys),
        _ => false,
    }
}
