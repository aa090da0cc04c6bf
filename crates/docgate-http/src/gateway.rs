//! Shared, per-process state requests are built from.

use std::sync::Arc;

use docgate_core::DocGateConfig;
use docgate_model::error::DocGateError;
use http::{HeaderMap, Method, Uri};

use crate::buffer::BufferPool;
use crate::mapping::MountTable;
use crate::mount::{DefaultMountResolver, MountResolver};
use crate::request::RequestModel;

/// Configuration, mounts, buffer pool and mount resolver shared by every
/// request.
///
/// Cloning is cheap; clones share the pool.
#[derive(Debug, Clone)]
pub struct Gateway {
    config: Arc<DocGateConfig>,
    mounts: Arc<MountTable>,
    pool: BufferPool,
    resolver: Arc<dyn MountResolver>,
}

impl Gateway {
    /// Build the gateway state from configuration.
    ///
    /// # Examples
    ///
    /// ```
    /// use docgate_core::DocGateConfig;
    /// use docgate_http::gateway::Gateway;
    /// use docgate_model::resource::ResourceType;
    /// use http::{HeaderMap, Method, Uri};
    ///
    /// let gateway = Gateway::new(DocGateConfig::default()).unwrap();
    /// let uri: Uri = "/shop/orders?page=2".parse().unwrap();
    /// let request = gateway.request(Method::GET, &uri, HeaderMap::new()).unwrap();
    /// assert_eq!(request.resource_type(), ResourceType::Collection);
    /// assert_eq!(request.page().unwrap(), 2);
    /// ```
    pub fn new(config: DocGateConfig) -> Result<Self, DocGateError> {
        config
            .validate()
            .map_err(|e| DocGateError::internal_error(format!("invalid configuration: {e}")))?;

        let mounts = MountTable::new(
            config
                .mounts
                .iter()
                .map(|m| (m.where_uri.as_str(), m.what.as_str())),
        )?;
        let pool = BufferPool::from_config(&config);
        let resolver: Arc<dyn MountResolver> = Arc::new(DefaultMountResolver::new(mounts.clone()));

        Ok(Self {
            config: Arc::new(config),
            mounts: Arc::new(mounts),
            pool,
            resolver,
        })
    }

    /// Replace the mount-context resolver.
    #[must_use]
    pub fn with_resolver(mut self, resolver: Arc<dyn MountResolver>) -> Self {
        self.resolver = resolver;
        self
    }

    /// The configuration.
    #[must_use]
    pub fn config(&self) -> &Arc<DocGateConfig> {
        &self.config
    }

    /// The mount table.
    #[must_use]
    pub fn mounts(&self) -> &MountTable {
        &self.mounts
    }

    /// The shared buffer pool.
    #[must_use]
    pub fn pool(&self) -> &BufferPool {
        &self.pool
    }

    /// The mount-context resolver.
    #[must_use]
    pub fn resolver(&self) -> &Arc<dyn MountResolver> {
        &self.resolver
    }

    /// Resolve an inbound request head into a [`RequestModel`].
    ///
    /// # Errors
    ///
    /// Fails with `MountResolution` when no mount serves the path.
    pub fn request(
        &self,
        method: Method,
        uri: &Uri,
        headers: HeaderMap,
    ) -> Result<RequestModel, DocGateError> {
        RequestModel::new(self, method, uri, headers)
    }
}
