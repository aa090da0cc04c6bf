//! Mount-context resolution.
//!
//! Given a request path, a [`MountResolver`] reports which database and
//! collection the path addresses through its mount, and which structural
//! operations (create or delete a database or collection) the mount permits.

use std::fmt;

use docgate_core::DocGateConfig;
use docgate_model::error::DocGateError;
use serde::Serialize;
use tracing::debug;

use crate::mapping::{MountTable, WILDCARD_WHAT, normalize, strip_segment_prefix};

/// The database scope a request path resolves to through its mount.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ResolvedContext {
    /// Addressed database, if any.
    pub database: Option<String>,
    /// Addressed collection, if any.
    pub collection: Option<String>,
    /// Whether new databases may be created at this level.
    pub can_create_databases: bool,
    /// Whether new collections may be created at this level.
    pub can_create_collections: bool,
    /// Whether the addressed database may be deleted.
    pub can_delete_database: bool,
    /// Whether the addressed collection may be deleted.
    pub can_delete_collection: bool,
    /// Canonical resource path.
    pub resource_path: String,
    /// Whether any configured mount carries placeholders.
    pub has_parametric_mounts: bool,
    /// Whether the path goes deeper than the mount can address.
    pub has_extra_path_segments: bool,
}

/// Resolves the mount context of a request path.
pub trait MountResolver: Send + Sync + fmt::Debug {
    /// Resolve `path`, with the request `Host` header when present.
    ///
    /// # Errors
    ///
    /// Returns `MountResolution` when no mount serves the path.
    fn resolve(&self, path: &str, host: Option<&str>) -> Result<ResolvedContext, DocGateError>;
}

/// [`MountResolver`] backed by a [`MountTable`].
#[derive(Debug, Clone, Default)]
pub struct DefaultMountResolver {
    table: MountTable,
}

/// How a mount exposes the database namespace.
enum MountScope<'a> {
    /// `what` is `*` or `/`: databases come from the path.
    Wildcard,
    /// `what` names a database: collections come from the path.
    Database(&'a str),
    /// `what` names a collection: documents come from the path.
    Collection(&'a str, &'a str),
}

impl DefaultMountResolver {
    /// Create a resolver over `table`.
    #[must_use]
    pub fn new(table: MountTable) -> Self {
        Self { table }
    }

    /// Build the mount table from configuration.
    pub fn from_config(config: &DocGateConfig) -> Result<Self, DocGateError> {
        let table = MountTable::new(
            config
                .mounts
                .iter()
                .map(|m| (m.where_uri.as_str(), m.what.as_str())),
        )?;
        Ok(Self::new(table))
    }

    /// The underlying mount table.
    #[must_use]
    pub fn table(&self) -> &MountTable {
        &self.table
    }
}

impl MountResolver for DefaultMountResolver {
    fn resolve(&self, path: &str, host: Option<&str>) -> Result<ResolvedContext, DocGateError> {
        let path = normalize(path);
        let (mapping, params) = self.table.resolve(&path, host)?;
        let (where_uri, what) = mapping.resolve_patterns(&params)?;
        let resource_path = mapping.to_canonical(&path, &params)?;

        let relative: Vec<&str> = strip_segment_prefix(&path, &where_uri)
            .unwrap_or_default()
            .split('/')
            .filter(|s| !s.is_empty())
            .collect();

        let what_segments: Vec<&str> = what.split('/').filter(|s| !s.is_empty()).collect();
        let scope = match what_segments.as_slice() {
            _ if what == WILDCARD_WHAT => MountScope::Wildcard,
            [] => MountScope::Wildcard,
            [db] => MountScope::Database(db),
            [db, coll, ..] => MountScope::Collection(db, coll),
        };

        let first = relative.first().map(|s| (*s).to_owned());
        let second = relative.get(1).map(|s| (*s).to_owned());

        let context = match scope {
            MountScope::Wildcard => {
                let has_db = first.is_some();
                let has_coll = second.is_some();
                ResolvedContext {
                    can_create_databases: !has_db,
                    can_create_collections: has_db && !has_coll,
                    can_delete_database: has_db && !has_coll,
                    can_delete_collection: has_coll,
                    database: first,
                    collection: second,
                    resource_path,
                    has_parametric_mounts: self.table.is_parametric(),
                    has_extra_path_segments: relative.len() > 3,
                }
            }
            MountScope::Database(db) => ResolvedContext {
                database: Some(db.to_owned()),
                can_create_databases: false,
                can_create_collections: first.is_none(),
                can_delete_database: false,
                can_delete_collection: first.is_some(),
                collection: first,
                resource_path,
                has_parametric_mounts: self.table.is_parametric(),
                has_extra_path_segments: relative.len() > 2,
            },
            MountScope::Collection(db, coll) => ResolvedContext {
                database: Some(db.to_owned()),
                collection: Some(coll.to_owned()),
                can_create_databases: false,
                can_create_collections: false,
                can_delete_database: false,
                can_delete_collection: false,
                resource_path,
                has_parametric_mounts: self.table.is_parametric(),
                has_extra_path_segments: relative.len() > 1,
            },
        };

        debug!(
            path = %path,
            database = ?context.database,
            collection = ?context.collection,
            resource_path = %context.resource_path,
            "resolved mount context"
        );
        Ok(context)
    }
}
