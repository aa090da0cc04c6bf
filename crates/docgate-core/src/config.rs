//! docgate configuration.
//!
//! Provides [`DocGateConfig`], the settings of the request-resolution
//! pipeline: the mount table, the content buffer pool, pagination limits and
//! representation defaults. Values are loaded from environment variables.

use docgate_model::options::RepresentationFormat;
use serde::{Deserialize, Serialize};
use tracing::warn;
use typed_builder::TypedBuilder;

use crate::error::{DocGateConfigError, DocGateConfigResult};

/// Default maximum request content size (16 MiB).
pub const DEFAULT_MAX_CONTENT_SIZE: usize = 16 * 1024 * 1024;
/// Default buffer segment size (16 KiB).
pub const DEFAULT_SEGMENT_SIZE: usize = 16 * 1024;
/// Default number of segments in the buffer pool.
pub const DEFAULT_POOL_SEGMENTS: usize = 4096;
/// Default page size.
pub const DEFAULT_PAGESIZE: usize = 100;
/// Default maximum page size.
pub const DEFAULT_MAX_PAGESIZE: usize = 1000;

/// A `(where, what)` mount pair.
///
/// `where_uri` is the externally visible path pattern; `what` is the canonical
/// resource path it maps to, or `*` to expose every database.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct MountConfig {
    /// Externally visible path pattern.
    #[serde(rename = "where")]
    pub where_uri: String,
    /// Canonical resource path pattern.
    pub what: String,
}

impl MountConfig {
    /// Create a mount pair.
    #[must_use]
    pub fn new(where_uri: impl Into<String>, what: impl Into<String>) -> Self {
        Self {
            where_uri: where_uri.into(),
            what: what.into(),
        }
    }
}

/// Request-resolution configuration.
///
/// # Examples
///
/// ```
/// use docgate_core::config::DocGateConfig;
///
/// let config = DocGateConfig::default();
/// assert_eq!(config.mounts.len(), 1);
/// assert_eq!(config.max_pagesize, 1000);
/// ```
#[derive(Debug, Clone, Serialize, Deserialize, TypedBuilder)]
#[serde(rename_all = "camelCase")]
pub struct DocGateConfig {
    /// Ordered mount table.
    #[builder(default = vec![MountConfig::new("/", "*")])]
    pub mounts: Vec<MountConfig>,

    /// Maximum size of buffered request content in bytes.
    #[builder(default = DEFAULT_MAX_CONTENT_SIZE)]
    pub max_content_size: usize,

    /// Size of one buffer segment in bytes.
    #[builder(default = DEFAULT_SEGMENT_SIZE)]
    pub segment_size: usize,

    /// Number of segments the buffer pool holds.
    #[builder(default = DEFAULT_POOL_SEGMENTS)]
    pub pool_segments: usize,

    /// Page size used when `pagesize` is absent.
    #[builder(default = DEFAULT_PAGESIZE)]
    pub default_pagesize: usize,

    /// Largest accepted `pagesize`.
    #[builder(default = DEFAULT_MAX_PAGESIZE)]
    pub max_pagesize: usize,

    /// Representation format used when `rep` is absent or invalid.
    #[builder(default = RepresentationFormat::Standard)]
    pub default_representation_format: RepresentationFormat,

    /// Reject `$`-prefixed keys in aggregation variables.
    #[builder(default = true)]
    pub aggregation_check_operators: bool,

    /// Log level filter string (e.g. `"info"`, `"debug"`).
    #[builder(default = String::from("info"))]
    pub log_level: String,
}

impl Default for DocGateConfig {
    fn default() -> Self {
        Self {
            mounts: vec![MountConfig::new("/", "*")],
            max_content_size: DEFAULT_MAX_CONTENT_SIZE,
            segment_size: DEFAULT_SEGMENT_SIZE,
            pool_segments: DEFAULT_POOL_SEGMENTS,
            default_pagesize: DEFAULT_PAGESIZE,
            max_pagesize: DEFAULT_MAX_PAGESIZE,
            default_representation_format: RepresentationFormat::Standard,
            aggregation_check_operators: true,
            log_level: String::from("info"),
        }
    }
}

impl DocGateConfig {
    /// Load configuration from environment variables.
    ///
    /// Reads the following environment variables (falling back to defaults):
    ///
    /// | Variable | Default |
    /// |----------|---------|
    /// | `DOCGATE_MOUNTS` | `/=*` |
    /// | `DOCGATE_MAX_CONTENT_SIZE` | `16777216` |
    /// | `DOCGATE_SEGMENT_SIZE` | `16384` |
    /// | `DOCGATE_POOL_SEGMENTS` | `4096` |
    /// | `DOCGATE_DEFAULT_PAGESIZE` | `100` |
    /// | `DOCGATE_MAX_PAGESIZE` | `1000` |
    /// | `DOCGATE_DEFAULT_REPRESENTATION` | `STANDARD` |
    /// | `DOCGATE_AGGREGATION_CHECK_OPERATORS` | `true` |
    /// | `LOG_LEVEL` | `info` |
    ///
    /// `DOCGATE_MOUNTS` holds comma separated `where=what` pairs, e.g.
    /// `/api=/inventory,/{tenant}/*=/{tenant}`. Malformed values are logged
    /// and ignored.
    #[must_use]
    pub fn from_env() -> Self {
        let mut config = Self::default();

        if let Ok(v) = std::env::var("DOCGATE_MOUNTS") {
            match parse_mounts(&v) {
                Ok(mounts) if !mounts.is_empty() => config.mounts = mounts,
                Ok(_) => warn!("DOCGATE_MOUNTS is empty, keeping the default mount"),
                Err(e) => warn!(error = %e, "ignoring DOCGATE_MOUNTS"),
            }
        }
        if let Some(n) = env_usize("DOCGATE_MAX_CONTENT_SIZE") {
            config.max_content_size = n;
        }
        if let Some(n) = env_usize("DOCGATE_SEGMENT_SIZE") {
            config.segment_size = n;
        }
        if let Some(n) = env_usize("DOCGATE_POOL_SEGMENTS") {
            config.pool_segments = n;
        }
        if let Some(n) = env_usize("DOCGATE_DEFAULT_PAGESIZE") {
            config.default_pagesize = n;
        }
        if let Some(n) = env_usize("DOCGATE_MAX_PAGESIZE") {
            config.max_pagesize = n;
        }
        if let Ok(v) = std::env::var("DOCGATE_DEFAULT_REPRESENTATION") {
            match RepresentationFormat::parse(&v) {
                Some(rep) => config.default_representation_format = rep,
                None => warn!(value = %v, "ignoring DOCGATE_DEFAULT_REPRESENTATION"),
            }
        }
        if let Ok(v) = std::env::var("DOCGATE_AGGREGATION_CHECK_OPERATORS") {
            config.aggregation_check_operators = parse_bool(&v);
        }
        if let Ok(v) = std::env::var("LOG_LEVEL") {
            config.log_level = v;
        }

        config
    }

    /// Check the settings for consistency.
    pub fn validate(&self) -> DocGateConfigResult<()> {
        if self.segment_size == 0 {
            return Err(invalid("segment_size", self.segment_size));
        }
        if self.pool_segments == 0 {
            return Err(invalid("pool_segments", self.pool_segments));
        }
        if self.max_content_size == 0 {
            return Err(invalid("max_content_size", self.max_content_size));
        }
        if self.default_pagesize > self.max_pagesize {
            return Err(invalid("default_pagesize", self.default_pagesize));
        }
        for mount in &self.mounts {
            if !mount.where_uri.starts_with('/') {
                return Err(DocGateConfigError::InvalidMount(mount.where_uri.clone()));
            }
            if mount.what != "*" && !mount.what.starts_with('/') {
                return Err(DocGateConfigError::InvalidMount(mount.what.clone()));
            }
        }
        Ok(())
    }

    /// Number of segments needed to hold the largest accepted content.
    #[must_use]
    pub fn segments_per_content(&self) -> usize {
        self.max_content_size.div_ceil(self.segment_size.max(1))
    }
}

/// Parse comma separated `where=what` pairs.
///
/// # Examples
///
/// ```
/// use docgate_core::config::parse_mounts;
///
/// let mounts = parse_mounts("/api=/inventory, /=*").unwrap();
/// assert_eq!(mounts[0].where_uri, "/api");
/// assert_eq!(mounts[1].what, "*");
/// ```
pub fn parse_mounts(value: &str) -> DocGateConfigResult<Vec<MountConfig>> {
    value
        .split(',')
        .map(str::trim)
        .filter(|entry| !entry.is_empty())
        .map(|entry| {
            let (where_uri, what) = entry
                .split_once('=')
                .ok_or_else(|| DocGateConfigError::InvalidMount(entry.to_owned()))?;
            let (where_uri, what) = (where_uri.trim(), what.trim());
            if where_uri.is_empty() || what.is_empty() {
                return Err(DocGateConfigError::InvalidMount(entry.to_owned()));
            }
            Ok(MountConfig::new(where_uri, what))
        })
        .collect()
}

fn invalid(name: &'static str, value: usize) -> DocGateConfigError {
    DocGateConfigError::InvalidValue {
        name,
        value: value.to_string(),
    }
}

fn env_usize(key: &str) -> Option<usize> {
    let v = std::env::var(key).ok()?;
    match v.trim().parse::<usize>() {
        Ok(n) => Some(n),
        Err(_) => {
            warn!(key, value = %v, "ignoring non-numeric setting");
            None
        }
    }
}

/// Parse a string as a boolean, accepting `"1"` and `"true"` (case-insensitive).
fn parse_bool(value: &str) -> bool {
    value == "1" || value.eq_ignore_ascii_case("true")
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_should_create_default_config() {
        let config = DocGateConfig::default();
        assert_eq!(config.mounts, vec![MountConfig::new("/", "*")]);
        assert_eq!(config.max_content_size, 16 * 1024 * 1024);
        assert_eq!(config.segment_size, 16 * 1024);
        assert_eq!(config.pool_segments, 4096);
        assert_eq!(config.default_pagesize, 100);
        assert_eq!(config.max_pagesize, 1000);
        assert_eq!(
            config.default_representation_format,
            RepresentationFormat::Standard
        );
        assert!(config.aggregation_check_operators);
        assert_eq!(config.log_level, "info");
        assert!(config.validate().is_ok());
    }

    #[test]
    fn test_should_load_from_env() {
        let config = DocGateConfig::from_env();
        assert!(!config.mounts.is_empty());
    }

    #[test]
    fn test_should_build_with_typed_builder() {
        let config = DocGateConfig::builder()
            .mounts(vec![MountConfig::new("/api", "/inventory")])
            .max_content_size(1024)
            .segment_size(256)
            .pool_segments(8)
            .max_pagesize(50)
            .default_pagesize(10)
            .aggregation_check_operators(false)
            .build();

        assert_eq!(config.mounts[0].what, "/inventory");
        assert_eq!(config.segments_per_content(), 4);
        assert!(!config.aggregation_check_operators);
        assert_eq!(config.log_level, "info");
        assert!(config.validate().is_ok());
    }

    #[test]
    fn test_should_serialize_to_camel_case_json() {
        let config = DocGateConfig::default();
        let json = serde_json::to_string(&config).expect("test serialization");
        assert!(json.contains("maxContentSize"));
        assert!(json.contains("defaultRepresentationFormat"));
        assert!(json.contains(r#""where":"/""#));
    }

    #[test]
    fn test_should_parse_mount_pairs() {
        let mounts = parse_mounts("/api=/inventory,/{tenant}/*=/{tenant}").unwrap();
        assert_eq!(mounts.len(), 2);
        assert_eq!(mounts[1], MountConfig::new("/{tenant}/*", "/{tenant}"));
    }

    #[test]
    fn test_should_reject_malformed_mounts() {
        assert!(matches!(
            parse_mounts("/api"),
            Err(DocGateConfigError::InvalidMount(_))
        ));
        assert!(parse_mounts("=/x").is_err());
    }

    #[test]
    fn test_should_reject_inconsistent_settings() {
        let config = DocGateConfig::builder().segment_size(0).build();
        assert!(config.validate().is_err());

        let config = DocGateConfig::builder()
            .default_pagesize(2000)
            .max_pagesize(1000)
            .build();
        assert!(matches!(
            config.validate(),
            Err(DocGateConfigError::InvalidValue { name: "default_pagesize", .. })
        ));

        let config = DocGateConfig::builder()
            .mounts(vec![MountConfig::new("api", "*")])
            .build();
        assert!(config.validate().is_err());
    }

    #[test]
    fn test_should_parse_bool_values() {
        assert!(parse_bool("1"));
        assert!(parse_bool("TRUE"));
        assert!(!parse_bool("no"));
    }
}
