//! Resource kinds and the path classifier.
//!
//! A canonical resource URI such as `/db/coll/doc` is split on `/` into path
//! tokens (`["", "db", "coll", "doc"]`). [`ResourceType::classify`] maps the
//! tokens to exactly one resource kind. The rules are applied in a fixed order
//! and a later rule never overrides an earlier one.

use std::fmt;

use http::Method;

use crate::keys::{
    AGGREGATIONS, BINARY_CONTENT, FS_CHUNKS_SUFFIX, FS_FILES_SUFFIX, INDEXES, META,
    META_COLLNAME, RESERVED_DBS, RESOURCES_WILDCARD, SCHEMAS, SESSIONS, SIZE, STREAMS,
    SYSTEM_PREFIX, TRANSACTIONS,
};

/// Maximum length of a database name.
const MAX_DB_NAME_LEN: usize = 64;

/// The kind of database construct a canonical path addresses.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, serde::Serialize, serde::Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum ResourceType {
    /// `/`
    Root,
    /// `/_size`
    RootSize,
    /// `/db`
    Db,
    /// `/db/_size`
    DbSize,
    /// `/db/_meta`
    DbMeta,
    /// `/db/coll`
    Collection,
    /// `/db/coll/_size`
    CollectionSize,
    /// `/db/coll/_meta`
    CollectionMeta,
    /// `/db/coll/_indexes`
    CollectionIndexes,
    /// `/db/coll/_indexes/name`
    Index,
    /// `/db/coll/id`
    Document,
    /// `/db/coll/*`
    BulkDocuments,
    /// `/db/bucket.files`
    FilesBucket,
    /// `/db/bucket.files/_size`
    FilesBucketSize,
    /// `/db/bucket.files/_meta`
    FilesBucketMeta,
    /// `/db/bucket.files/id`
    File,
    /// `/db/bucket.files/id/binary`
    FileBinary,
    /// `/db/coll/_aggrs/name`
    Aggregation,
    /// `/db/coll/_streams/name`
    ChangeStream,
    /// `/db/_schemas/id`
    Schema,
    /// `/db/_schemas`
    SchemaStore,
    /// `/db/_schemas/_size`
    SchemaStoreSize,
    /// `/db/_schemas/_meta`
    SchemaStoreMeta,
    /// `/_sessions`
    Sessions,
    /// `/_sessions/sid`
    Session,
    /// `/_sessions/sid/_txns`
    Transactions,
    /// `/_sessions/sid/_txns/txn`
    Transaction,
    /// No rule matched.
    Invalid,
}

impl ResourceType {
    /// Classify a tokenized canonical path.
    ///
    /// The function is pure and total: every token sequence yields a value,
    /// [`ResourceType::Invalid`] when nothing matches.
    ///
    /// # Examples
    ///
    /// ```
    /// use docgate_model::resource::ResourceType;
    ///
    /// assert_eq!(ResourceType::classify(&["", "db", "coll"]), ResourceType::Collection);
    /// assert_eq!(ResourceType::classify(&["", "db", "coll", "_aggrs"]), ResourceType::Invalid);
    /// ```
    #[must_use]
    pub fn classify<S: AsRef<str>>(tokens: &[S]) -> Self {
        let n = tokens.len();
        let at = |i: usize| tokens.get(i).map_or("", AsRef::as_ref);
        let last = if n > 0 { at(n - 1) } else { "" };

        if n > 0 && last.eq_ignore_ascii_case(SIZE) {
            return match n {
                2 => Self::RootSize,
                3 => Self::DbSize,
                4 if at(2).ends_with(FS_FILES_SUFFIX) => Self::FilesBucketSize,
                4 if at(2).eq_ignore_ascii_case(SCHEMAS) => Self::SchemaStoreSize,
                4 => Self::CollectionSize,
                _ => Self::Invalid,
            };
        }

        if n > 2 && last.eq_ignore_ascii_case(META) {
            return match n {
                3 => Self::DbMeta,
                4 if at(2).ends_with(FS_FILES_SUFFIX) => Self::FilesBucketMeta,
                4 if at(2).eq_ignore_ascii_case(SCHEMAS) => Self::SchemaStoreMeta,
                4 => Self::CollectionMeta,
                _ => Self::Invalid,
            };
        }

        if n < 2 {
            return Self::Root;
        }

        if let Some(kind) = classify_session(tokens.len(), at) {
            return kind;
        }

        if n < 3 {
            return Self::Db;
        }

        if at(2).ends_with(FS_FILES_SUFFIX) {
            return classify_files_bucket(n, at);
        }

        if at(2).eq_ignore_ascii_case(SCHEMAS) {
            return if n == 3 {
                Self::SchemaStore
            } else if at(3) == RESOURCES_WILDCARD {
                Self::BulkDocuments
            } else {
                Self::Schema
            };
        }

        if n < 4 {
            return Self::Collection;
        }

        let sub = at(3);
        if sub.eq_ignore_ascii_case(INDEXES) {
            if n == 4 {
                Self::CollectionIndexes
            } else {
                Self::Index
            }
        } else if n == 4 && sub == RESOURCES_WILDCARD {
            Self::BulkDocuments
        } else if sub.eq_ignore_ascii_case(AGGREGATIONS) {
            // The bare container names no operation.
            if n > 4 { Self::Aggregation } else { Self::Invalid }
        } else if sub.eq_ignore_ascii_case(STREAMS) {
            if n > 4 { Self::ChangeStream } else { Self::Invalid }
        } else {
            Self::Document
        }
    }

    /// Returns the upper snake case name of this resource type.
    #[must_use]
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Root => "ROOT",
            Self::RootSize => "ROOT_SIZE",
            Self::Db => "DB",
            Self::DbSize => "DB_SIZE",
            Self::DbMeta => "DB_META",
            Self::Collection => "COLLECTION",
            Self::CollectionSize => "COLLECTION_SIZE",
            Self::CollectionMeta => "COLLECTION_META",
            Self::CollectionIndexes => "COLLECTION_INDEXES",
            Self::Index => "INDEX",
            Self::Document => "DOCUMENT",
            Self::BulkDocuments => "BULK_DOCUMENTS",
            Self::FilesBucket => "FILES_BUCKET",
            Self::FilesBucketSize => "FILES_BUCKET_SIZE",
            Self::FilesBucketMeta => "FILES_BUCKET_META",
            Self::File => "FILE",
            Self::FileBinary => "FILE_BINARY",
            Self::Aggregation => "AGGREGATION",
            Self::ChangeStream => "CHANGE_STREAM",
            Self::Schema => "SCHEMA",
            Self::SchemaStore => "SCHEMA_STORE",
            Self::SchemaStoreSize => "SCHEMA_STORE_SIZE",
            Self::SchemaStoreMeta => "SCHEMA_STORE_META",
            Self::Sessions => "SESSIONS",
            Self::Session => "SESSION",
            Self::Transactions => "TRANSACTIONS",
            Self::Transaction => "TRANSACTION",
            Self::Invalid => "INVALID",
        }
    }

    /// Whether this resource counts its parent (`*_SIZE`).
    #[must_use]
    pub fn is_size(&self) -> bool {
        matches!(
            self,
            Self::RootSize
                | Self::DbSize
                | Self::CollectionSize
                | Self::FilesBucketSize
                | Self::SchemaStoreSize
        )
    }

    /// Whether this resource lives inside a files bucket.
    #[must_use]
    pub fn is_file_resource(&self) -> bool {
        matches!(self, Self::File | Self::FilesBucket)
    }

    /// HTTP methods a handler exists for on this resource type.
    ///
    /// `OPTIONS` is accepted everywhere and is not listed.
    #[must_use]
    pub fn allowed_methods(&self) -> &'static [Method] {
        const READ: &[Method] = &[Method::GET];
        const READ_WRITE: &[Method] = &[Method::GET, Method::PUT, Method::DELETE, Method::PATCH];
        const COLLECTION_LIKE: &[Method] = &[
            Method::GET,
            Method::POST,
            Method::PUT,
            Method::DELETE,
            Method::PATCH,
        ];

        match self {
            Self::Root
            | Self::RootSize
            | Self::DbSize
            | Self::DbMeta
            | Self::CollectionSize
            | Self::CollectionMeta
            | Self::CollectionIndexes
            | Self::FilesBucketSize
            | Self::FilesBucketMeta
            | Self::FileBinary
            | Self::Aggregation
            | Self::ChangeStream
            | Self::SchemaStoreSize
            | Self::SchemaStoreMeta => READ,
            Self::Db | Self::Document | Self::File => READ_WRITE,
            Self::Collection | Self::FilesBucket | Self::SchemaStore => COLLECTION_LIKE,
            Self::BulkDocuments => &[Method::DELETE, Method::PATCH],
            Self::Index => &[Method::PUT, Method::DELETE],
            Self::Schema => &[Method::GET, Method::PUT, Method::DELETE],
            Self::Sessions => &[Method::POST],
            Self::Transactions => &[Method::GET, Method::POST],
            Self::Transaction => &[Method::PATCH, Method::DELETE],
            Self::Session | Self::Invalid => &[],
        }
    }

    /// Whether `method` is accepted on this resource type.
    #[must_use]
    pub fn allows(&self, method: &Method) -> bool {
        *method == Method::OPTIONS || self.allowed_methods().contains(method)
    }
}

impl fmt::Display for ResourceType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Session and transaction rules: `/_sessions[/sid[/_txns[/txn]]]`.
fn classify_session<'a>(n: usize, at: impl Fn(usize) -> &'a str) -> Option<ResourceType> {
    let is = |i: usize, name: &str| at(i).eq_ignore_ascii_case(name);

    match n {
        2 if is(1, SESSIONS) => Some(ResourceType::Sessions),
        3 if is(1, SESSIONS) => Some(ResourceType::Session),
        4 if is(1, SESSIONS) && is(3, TRANSACTIONS) => Some(ResourceType::Transactions),
        5 if is(1, SESSIONS) && is(3, TRANSACTIONS) => Some(ResourceType::Transaction),
        _ => None,
    }
}

/// Rules for paths whose collection token names a files bucket.
fn classify_files_bucket<'a>(n: usize, at: impl Fn(usize) -> &'a str) -> ResourceType {
    let sub = at(3);
    let is_indexes = sub.eq_ignore_ascii_case(INDEXES);

    if n == 3 {
        ResourceType::FilesBucket
    } else if n == 4 && is_indexes {
        ResourceType::CollectionIndexes
    } else if n == 4 && sub != RESOURCES_WILDCARD {
        ResourceType::File
    } else if n > 4 && is_indexes {
        ResourceType::Index
    } else if n > 4 && sub.eq_ignore_ascii_case(AGGREGATIONS) {
        ResourceType::Aggregation
    } else if n > 4 && !at(4).eq_ignore_ascii_case(BINARY_CONTENT) {
        ResourceType::File
    } else if n == 5 {
        ResourceType::FileBinary
    } else {
        ResourceType::Document
    }
}

/// Split a canonical URI into path tokens.
///
/// `/db/coll` becomes `["", "db", "coll"]` and the root `/` becomes `[""]`.
/// The leading empty token is kept so that index 1 is always the database.
#[must_use]
pub fn tokenize(canonical_uri: &str) -> Vec<String> {
    if canonical_uri == "/" || canonical_uri.is_empty() {
        return vec![String::new()];
    }
    canonical_uri.split('/').map(str::to_owned).collect()
}

/// Whether a database name violates the naming rules.
///
/// Rejected: empty names, names longer than 64 characters, names containing
/// NUL, space, `/`, `\`, `.`, `"` or `$`, and names starting with `system.`.
#[must_use]
pub fn is_db_name_invalid(name: &str) -> bool {
    name.is_empty()
        || name.chars().count() > MAX_DB_NAME_LEN
        || name.starts_with(SYSTEM_PREFIX)
        || name
            .chars()
            .any(|c| matches!(c, '\0' | ' ' | '/' | '\\' | '.' | '"' | '$'))
}

/// Whether a collection name violates the naming rules.
///
/// Rejected: empty names, names containing NUL or `$`, GridFS chunks
/// collections and the metadata collection.
#[must_use]
pub fn is_collection_name_invalid(name: &str) -> bool {
    name.is_empty()
        || name.contains('\0')
        || name.contains('$')
        || name.ends_with(FS_CHUNKS_SUFFIX)
        || name == META_COLLNAME
}

/// Whether a database name is reserved for the server itself.
#[must_use]
pub fn is_reserved_db_name(name: &str) -> bool {
    RESERVED_DBS.iter().any(|r| name.eq_ignore_ascii_case(r))
}

/// Whether a collection name is reserved for the server itself.
#[must_use]
pub fn is_reserved_collection_name(name: &str) -> bool {
    name.starts_with(SYSTEM_PREFIX)
}
