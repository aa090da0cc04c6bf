//! Reserved path segments, query parameter names and document keys.
//!
//! These names form the external contract of the resolution layer: clients
//! address special resources through the reserved segments and tune reads and
//! writes through the query parameters listed here.

// ---------------------------------------------------------------------------
// Reserved path segments
// ---------------------------------------------------------------------------

/// Counts the parent resource.
pub const SIZE: &str = "_size";
/// Addresses the metadata document of the parent resource.
pub const META: &str = "_meta";
/// Client sessions root.
pub const SESSIONS: &str = "_sessions";
/// Transactions within a session.
pub const TRANSACTIONS: &str = "_txns";
/// Collection indexes.
pub const INDEXES: &str = "_indexes";
/// Schema store collection name.
pub const SCHEMAS: &str = "_schemas";
/// Aggregation operations of a collection.
pub const AGGREGATIONS: &str = "_aggrs";
/// Change stream operations of a collection.
pub const STREAMS: &str = "_streams";
/// Binary content of a file.
pub const BINARY_CONTENT: &str = "binary";
/// Addresses every document of a collection (bulk operations).
pub const RESOURCES_WILDCARD: &str = "*";

/// Suffix of a GridFS files collection (a files bucket).
pub const FS_FILES_SUFFIX: &str = ".files";
/// Suffix of a GridFS chunks collection.
pub const FS_CHUNKS_SUFFIX: &str = ".chunks";
/// Collection storing database and collection metadata.
pub const META_COLLNAME: &str = "_properties";
/// Prefix of system databases and collections.
pub const SYSTEM_PREFIX: &str = "system.";
/// Reserved database names.
pub const RESERVED_DBS: [&str; 3] = ["admin", "config", "local"];

// ---------------------------------------------------------------------------
// Query parameters
// ---------------------------------------------------------------------------

/// Page number (1-based).
pub const PAGE_QPARAM: &str = "page";
/// Page size.
pub const PAGESIZE_QPARAM: &str = "pagesize";
/// Request the count of the addressed resource.
pub const COUNT_QPARAM: &str = "count";
/// Sort specification (takes precedence over `sort`).
pub const SORT_BY_QPARAM: &str = "sort_by";
/// Sort specification.
pub const SORT_QPARAM: &str = "sort";
/// Filter fragments, ANDed together.
pub const FILTER_QPARAM: &str = "filter";
/// Index hint.
pub const HINT_QPARAM: &str = "hint";
/// Aggregation variables.
pub const AGGREGATION_VARIABLES_QPARAM: &str = "avars";
/// Projection keys.
pub const KEYS_QPARAM: &str = "keys";
/// Cursor pre-allocation policy.
pub const EAGER_QPARAM: &str = "eager";
/// Enable caching of the response.
pub const CACHE_QPARAM: &str = "cache";
/// Disable caching of the response.
pub const NO_CACHE_QPARAM: &str = "nocache";
/// HAL representation mode.
pub const HAL_QPARAM: &str = "hal";
/// Type of the document id in the path.
pub const DOC_ID_TYPE_QPARAM: &str = "id_type";
/// Force the etag check.
pub const ETAG_CHECK_QPARAM: &str = "checkEtag";
/// Shard key.
pub const SHARDKEY_QPARAM: &str = "shardkey";
/// Skip the parent properties in the response.
pub const NO_PROPS_QPARAM: &str = "np";
/// Representation format.
pub const REPRESENTATION_FORMAT_QPARAM: &str = "rep";
/// Client session id.
pub const CLIENT_SESSION_QPARAM: &str = "sid";
/// Transaction number.
pub const TXN_ID_QPARAM: &str = "txn";
/// JSON output mode.
pub const JSON_MODE_QPARAM: &str = "jsonMode";
/// Write mode.
pub const WRITE_MODE_QPARAM: &str = "writeMode";
/// Write mode (short form).
pub const WRITE_MODE_SHORT_QPARAM: &str = "wm";
/// Write concern.
pub const WRITE_CONCERN_QPARAM: &str = "writeConcern";
/// Read concern.
pub const READ_CONCERN_QPARAM: &str = "readConcern";
/// Read preference.
pub const READ_PREFERENCE_QPARAM: &str = "readPreference";

// ---------------------------------------------------------------------------
// Document keys and literal ids
// ---------------------------------------------------------------------------

/// Document identifier field.
pub const ID_FIELD: &str = "_id";
/// Multipart field holding file metadata.
pub const FILE_METADATA: &str = "metadata";
/// Legacy multipart field holding file metadata.
pub const PROPERTIES: &str = "properties";
/// The only update operator accepted on create/replace writes.
pub const CURRENT_DATE_OPERATOR: &str = "$currentDate";

/// Literal id standing for `MaxKey`.
pub const MAX_KEY_ID: &str = "_MaxKey";
/// Literal id standing for `MinKey`.
pub const MIN_KEY_ID: &str = "_MinKey";
/// Literal id standing for `null`.
pub const NULL_KEY_ID: &str = "_null";
/// Literal id standing for `true`.
pub const TRUE_KEY_ID: &str = "_true";
/// Literal id standing for `false`.
pub const FALSE_KEY_ID: &str = "_false";

/// All reserved literal ids.
pub const RESERVED_IDS: [&str; 5] = [MAX_KEY_ID, MIN_KEY_ID, NULL_KEY_ID, TRUE_KEY_ID, FALSE_KEY_ID];

// ---------------------------------------------------------------------------
// Media types
// ---------------------------------------------------------------------------

/// JSON media type.
pub const JSON_MEDIA_TYPE: &str = "application/json";
/// HAL+JSON media type.
pub const HAL_JSON_MEDIA_TYPE: &str = "application/hal+json";
/// URL-encoded form media type.
pub const FORM_URLENCODED: &str = "application/x-www-form-urlencoded";
/// Multipart form media type.
pub const MULTIPART: &str = "multipart/form-data";
