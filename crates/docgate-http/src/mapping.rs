//! Bidirectional mapping between request paths and canonical resource URIs.
//!
//! A [`MountMapping`] pairs an externally visible path pattern (`where`) with
//! the canonical resource path it exposes (`what`). Either side may carry
//! `{name}` placeholders; `where` may end with `/*`. Placeholders are resolved
//! from the template match of the request path plus the synthesized `host` and
//! `host[n]` parameters.
//!
//! ```text
//!   where=/api  what=*            /api/db/coll   <->  /db/coll
//!   where=/api  what=/inventory   /api/coll      <->  /inventory/coll
//!   where=/     what=/inventory   /coll          <->  /inventory/coll
//!   where=/{t}/* what=/{t}        /acme/coll     <->  /acme/coll
//! ```
//!
//! Paths under `/_sessions` bypass mapping.

use std::collections::BTreeMap;

use docgate_model::error::DocGateError;
use docgate_model::keys::SESSIONS;
use regex::Regex;
use tracing::{debug, trace};

/// Template parameters matched from a request path and host.
pub type TemplateParams = BTreeMap<String, String>;

/// Name of the parameter capturing the remainder matched by a trailing `/*`.
pub const REST_PARAM: &str = "*";

/// Wildcard `what`: every database is exposed under `where`.
pub const WILDCARD_WHAT: &str = "*";

/// A `(where, what)` mount pair.
#[derive(Debug, Clone)]
pub struct MountMapping {
    where_uri: String,
    what: String,
    template: Option<PathTemplate>,
}

#[derive(Debug, Clone)]
struct PathTemplate {
    regex: Regex,
    names: Vec<String>,
}

impl MountMapping {
    /// Create a mapping, compiling `where` when it is a template.
    pub fn new(where_uri: &str, what: &str) -> Result<Self, DocGateError> {
        let where_uri = normalize(where_uri);
        let what = if what.trim() == WILDCARD_WHAT {
            WILDCARD_WHAT.to_owned()
        } else {
            normalize(what)
        };

        let template = if has_placeholders(&where_uri) {
            Some(PathTemplate::compile(&where_uri)?)
        } else {
            None
        };

        Ok(Self {
            where_uri,
            what,
            template,
        })
    }

    /// The identity mount `/` -> `*`.
    #[must_use]
    pub fn root() -> Self {
        Self {
            where_uri: "/".to_owned(),
            what: WILDCARD_WHAT.to_owned(),
            template: None,
        }
    }

    /// The `where` pattern, trailing `/*` included.
    #[must_use]
    pub fn where_uri(&self) -> &str {
        &self.where_uri
    }

    /// The `what` pattern.
    #[must_use]
    pub fn what(&self) -> &str {
        &self.what
    }

    /// Whether either side carries placeholders.
    #[must_use]
    pub fn is_parametric(&self) -> bool {
        self.template.is_some() || has_placeholders(&self.what)
    }

    /// Rank of this mount among several matching the same path; higher wins.
    ///
    /// Literal mounts outrank templates, and the root `/` catch-all ranks
    /// below both. Within a rank, the longer literal text wins; placeholder
    /// names do not count.
    #[must_use]
    pub fn specificity(&self) -> (u8, usize) {
        let where_uri = strip_rest_suffix(&self.where_uri);
        let rank = match &self.template {
            Some(_) => 1,
            None if where_uri == "/" => 0,
            None => 2,
        };
        (rank, literal_len(where_uri))
    }

    /// Match a request path against `where`.
    ///
    /// Static mounts match on whole segments: `/api` matches `/api` and
    /// `/api/x` but not `/apix`. Returns the template and host parameters on
    /// success.
    #[must_use]
    pub fn match_path(&self, path: &str, host: Option<&str>) -> Option<TemplateParams> {
        let path = normalize(path);

        let mut params = match &self.template {
            Some(template) => template.captures(&path)?,
            None => {
                let prefix = strip_rest_suffix(&self.where_uri);
                strip_segment_prefix(&path, prefix)?;
                TemplateParams::new()
            }
        };

        if let Some(host) = host {
            add_host_params(&mut params, host);
        }
        trace!(where_uri = %self.where_uri, path = %path, ?params, "mount matched");
        Some(params)
    }

    /// Map a request path to its canonical resource URI.
    ///
    /// # Examples
    ///
    /// ```
    /// use docgate_http::mapping::{MountMapping, TemplateParams};
    ///
    /// let mapping = MountMapping::new("/api", "/inventory").unwrap();
    /// let canonical = mapping.to_canonical("/api/coll/", &TemplateParams::new()).unwrap();
    /// assert_eq!(canonical, "/inventory/coll");
    /// ```
    pub fn to_canonical(&self, path: &str, params: &TemplateParams) -> Result<String, DocGateError> {
        if is_sessions_path(path) {
            return Ok(path.to_owned());
        }

        let (where_uri, what) = self.resolve_patterns(params)?;
        let path = normalize(path);

        let canonical = if what == WILDCARD_WHAT {
            if where_uri == "/" {
                path.clone()
            } else {
                strip_segment_prefix(&path, &where_uri)
                    .ok_or_else(|| outside_mount(&path, &where_uri))?
                    .to_owned()
            }
        } else if where_uri == "/" {
            if what == "/" { path.clone() } else { format!("{what}{path}") }
        } else {
            let rest = strip_segment_prefix(&path, &where_uri)
                .ok_or_else(|| outside_mount(&path, &where_uri))?;
            format!("{what}{rest}")
        };

        let canonical = normalize(&canonical);
        debug!(path = %path, canonical = %canonical, "unmapped request path");
        Ok(canonical)
    }

    /// Map a canonical resource URI back to the request path exposing it.
    ///
    /// Inverse of [`MountMapping::to_canonical`] for every path `where`
    /// matches.
    pub fn to_request_path(
        &self,
        canonical: &str,
        params: &TemplateParams,
    ) -> Result<String, DocGateError> {
        if is_sessions_path(canonical) {
            return Ok(canonical.to_owned());
        }

        let (where_uri, what) = self.resolve_patterns(params)?;
        let canonical = normalize(canonical);

        let mapped = if what == WILDCARD_WHAT {
            if where_uri == "/" {
                canonical
            } else if canonical == "/" {
                where_uri
            } else {
                format!("{where_uri}{canonical}")
            }
        } else if what == "/" {
            format!("{where_uri}{canonical}")
        } else {
            let rest = strip_segment_prefix(&canonical, &what)
                .ok_or_else(|| outside_mount(&canonical, &what))?;
            format!("{where_uri}{rest}")
        };

        Ok(normalize(&mapped))
    }

    /// Substitute `params` into `where` (without `/*`) and `what`.
    pub fn resolve_patterns(
        &self,
        params: &TemplateParams,
    ) -> Result<(String, String), DocGateError> {
        let where_uri = strip_rest_suffix(&self.where_uri);
        let where_uri = if has_placeholders(where_uri) {
            normalize(&substitute(where_uri, params)?)
        } else {
            normalize(where_uri)
        };

        let what = if has_placeholders(&self.what) {
            normalize(&substitute(&self.what, params)?)
        } else {
            self.what.clone()
        };

        Ok((where_uri, what))
    }
}

/// An ordered list of mounts.
#[derive(Debug, Clone)]
pub struct MountTable {
    mappings: Vec<MountMapping>,
}

impl Default for MountTable {
    fn default() -> Self {
        Self {
            mappings: vec![MountMapping::root()],
        }
    }
}

impl MountTable {
    /// Build a table from `(where, what)` pairs.
    pub fn new<'a>(
        pairs: impl IntoIterator<Item = (&'a str, &'a str)>,
    ) -> Result<Self, DocGateError> {
        let mappings = pairs
            .into_iter()
            .map(|(where_uri, what)| MountMapping::new(where_uri, what))
            .collect::<Result<Vec<_>, _>>()?;
        Ok(Self { mappings })
    }

    /// The mounts, in configuration order.
    #[must_use]
    pub fn mappings(&self) -> &[MountMapping] {
        &self.mappings
    }

    /// Whether any mount carries placeholders.
    #[must_use]
    pub fn is_parametric(&self) -> bool {
        self.mappings.iter().any(MountMapping::is_parametric)
    }

    /// Pick the mount serving `path`.
    ///
    /// The matching mount with the highest [`MountMapping::specificity`]
    /// wins; ties go to the one configured first. `/_sessions` paths fall back to the identity mount.
    pub fn resolve(
        &self,
        path: &str,
        host: Option<&str>,
    ) -> Result<(MountMapping, TemplateParams), DocGateError> {
        let mut best: Option<(&MountMapping, TemplateParams)> = None;

        for mapping in &self.mappings {
            let Some(params) = mapping.match_path(path, host) else {
                continue;
            };
            let better = best
                .as_ref()
                .is_none_or(|(current, _)| mapping.specificity() > current.specificity());
            if better {
                best = Some((mapping, params));
            }
        }

        match best {
            Some((mapping, params)) => Ok((mapping.clone(), params)),
            None if is_sessions_path(path) => Ok((MountMapping::root(), TemplateParams::new())),
            None => Err(DocGateError::mount_resolution(format!(
                "no mount matches {path}"
            ))
            .with_resource(path)),
        }
    }
}

impl PathTemplate {
    fn compile(where_uri: &str) -> Result<Self, DocGateError> {
        let (body, has_rest) = match where_uri.strip_suffix("/*") {
            Some(body) => (body, true),
            None => (where_uri, false),
        };

        let mut pattern = String::from("^");
        let mut names = Vec::new();
        let mut rest = body;
        while let Some((literal, name, tail)) = next_placeholder(rest) {
            pattern.push_str(&regex::escape(literal));
            pattern.push_str("([^/]+)");
            names.push(name.to_owned());
            rest = tail;
        }
        pattern.push_str(&regex::escape(rest));
        pattern.push_str("(?:/(.*))?$");

        let regex = Regex::new(&pattern).map_err(|e| {
            DocGateError::mount_resolution(format!("invalid mount template {where_uri}"))
                .with_source(e)
        })?;
        debug!(where_uri, pattern = %pattern, has_rest, "compiled mount template");

        Ok(Self { regex, names })
    }

    fn captures(&self, path: &str) -> Option<TemplateParams> {
        let caps = self.regex.captures(path)?;
        let mut params = TemplateParams::new();

        for (i, name) in self.names.iter().enumerate() {
            if let Some(m) = caps.get(i + 1) {
                params.insert(name.clone(), m.as_str().to_owned());
            }
        }
        if let Some(m) = caps.get(self.names.len() + 1) {
            if !m.as_str().is_empty() {
                params.insert(REST_PARAM.to_owned(), m.as_str().to_owned());
            }
        }

        Some(params)
    }
}

/// Split off the first `{name}` placeholder: `(literal before, name, tail)`.
fn next_placeholder(s: &str) -> Option<(&str, &str, &str)> {
    let open = s.find('{')?;
    let close = open + s[open..].find('}')?;
    Some((&s[..open], &s[open + 1..close], &s[close + 1..]))
}

/// Length of `s` with every `{name}` placeholder removed.
fn literal_len(s: &str) -> usize {
    let mut len = 0;
    let mut rest = s;
    while let Some((literal, _, tail)) = next_placeholder(rest) {
        len += literal.len();
        rest = tail;
    }
    len + rest.len()
}

fn has_placeholders(s: &str) -> bool {
    next_placeholder(s).is_some()
}

fn substitute(pattern: &str, params: &TemplateParams) -> Result<String, DocGateError> {
    let mut out = String::with_capacity(pattern.len());
    let mut rest = pattern;

    while let Some((literal, name, tail)) = next_placeholder(rest) {
        let value = params.get(name).ok_or_else(|| {
            DocGateError::mount_resolution(format!("unknown placeholder {{{name}}} in {pattern}"))
        })?;
        out.push_str(literal);
        out.push_str(value);
        rest = tail;
    }
    out.push_str(rest);

    Ok(out)
}

/// Add `host` (port stripped) and `host[n]` (dot-separated labels) unless
/// already present.
fn add_host_params(params: &mut TemplateParams, host: &str) {
    let host = match host.rsplit_once(':') {
        Some((name, port)) if !port.is_empty() && port.bytes().all(|b| b.is_ascii_digit()) => name,
        _ => host,
    };
    if host.is_empty() {
        return;
    }

    params
        .entry("host".to_owned())
        .or_insert_with(|| host.to_owned());
    for (i, label) in host.split('.').enumerate() {
        params
            .entry(format!("host[{i}]"))
            .or_insert_with(|| label.to_owned());
    }
}

/// Strip `prefix` from `path` on a segment boundary.
///
/// Returns the remainder, empty or starting with `/`.
pub(crate) fn strip_segment_prefix<'a>(path: &'a str, prefix: &str) -> Option<&'a str> {
    if prefix == "/" || prefix.is_empty() {
        return Some(if path == "/" { "" } else { path });
    }
    let rest = path.strip_prefix(prefix)?;
    (rest.is_empty() || rest.starts_with('/')).then_some(rest)
}

fn strip_rest_suffix(where_uri: &str) -> &str {
    match where_uri.strip_suffix("/*") {
        Some("") => "/",
        Some(body) => body,
        None => where_uri,
    }
}

/// Whether `path` addresses the sessions sub-protocol.
#[must_use]
pub fn is_sessions_path(path: &str) -> bool {
    path.strip_prefix('/')
        .and_then(|p| p.strip_prefix(SESSIONS))
        .is_some_and(|rest| rest.is_empty() || rest.starts_with('/'))
}

/// Collapse repeated slashes and strip trailing ones; empty becomes `/`.
#[must_use]
pub fn normalize(path: &str) -> String {
    let path = path.trim();
    let mut out = String::with_capacity(path.len() + 1);
    if !path.starts_with('/') {
        out.push('/');
    }
    for c in path.chars() {
        if c == '/' && out.ends_with('/') {
            continue;
        }
        out.push(c);
    }
    while out.len() > 1 && out.ends_with('/') {
        out.pop();
    }
    out
}

fn outside_mount(path: &str, prefix: &str) -> DocGateError {
    DocGateError::mount_resolution(format!("{path} is not under the mount {prefix}"))
        .with_resource(path)
}

#[cfg(test)]
mod tests {
    use docgate_model::error::DocGateErrorCode;

    use super::*;

    fn roundtrip(where_uri: &str, what: &str, path: &str) -> (String, String) {
        let mapping = MountMapping::new(where_uri, what).unwrap();
        let params = mapping.match_path(path, Some("api.acme.com:8080")).unwrap();
        let canonical = mapping.to_canonical(path, &params).unwrap();
        let back = mapping.to_request_path(&canonical, &params).unwrap();
        (canonical, back)
    }

    #[test]
    fn test_should_strip_prefix_for_wildcard_mount() {
        assert_eq!(
            roundtrip("/api", "*", "/api/db/coll"),
            ("/db/coll".to_owned(), "/api/db/coll".to_owned())
        );
        assert_eq!(
            roundtrip("/api", "*", "/api"),
            ("/".to_owned(), "/api".to_owned())
        );
    }

    #[test]
    fn test_should_replace_prefix_for_static_mount() {
        assert_eq!(
            roundtrip("/api", "/inventory", "/api/coll/doc"),
            ("/inventory/coll/doc".to_owned(), "/api/coll/doc".to_owned())
        );
        assert_eq!(
            roundtrip("/api", "/inventory", "/api/"),
            ("/inventory".to_owned(), "/api".to_owned())
        );
    }

    #[test]
    fn test_should_prepend_what_for_root_mount() {
        assert_eq!(
            roundtrip("/", "/inventory", "/coll"),
            ("/inventory/coll".to_owned(), "/coll".to_owned())
        );
        assert_eq!(
            roundtrip("/", "/inventory", "/"),
            ("/inventory".to_owned(), "/".to_owned())
        );
        assert_eq!(
            roundtrip("/", "*", "/db/coll//"),
            ("/db/coll".to_owned(), "/db/coll".to_owned())
        );
        assert_eq!(
            roundtrip("/", "/", "/db/coll"),
            ("/db/coll".to_owned(), "/db/coll".to_owned())
        );
    }

    #[test]
    fn test_should_resolve_template_params() {
        let mapping = MountMapping::new("/{tenant}/*", "/{tenant}_db").unwrap();
        assert!(mapping.is_parametric());

        let params = mapping.match_path("/acme/coll/doc", None).unwrap();
        assert_eq!(params.get("tenant").map(String::as_str), Some("acme"));
        assert_eq!(params.get(REST_PARAM).map(String::as_str), Some("coll/doc"));

        let canonical = mapping.to_canonical("/acme/coll/doc", &params).unwrap();
        assert_eq!(canonical, "/acme_db/coll/doc");
        assert_eq!(
            mapping.to_request_path(&canonical, &params).unwrap(),
            "/acme/coll/doc"
        );
    }

    #[test]
    fn test_should_resolve_host_params() {
        let mapping = MountMapping::new("/", "/{host[0]}").unwrap();
        let params = mapping.match_path("/coll", Some("tenant1.example.com:8080")).unwrap();
        assert_eq!(params.get("host").map(String::as_str), Some("tenant1.example.com"));
        assert_eq!(params.get("host[2]").map(String::as_str), Some("com"));
        assert_eq!(mapping.to_canonical("/coll", &params).unwrap(), "/tenant1/coll");
    }

    #[test]
    fn test_should_not_override_path_params_with_host() {
        let mapping = MountMapping::new("/{host}/*", "*").unwrap();
        let params = mapping.match_path("/db/coll", Some("example.com")).unwrap();
        assert_eq!(params.get("host").map(String::as_str), Some("db"));
    }

    #[test]
    fn test_should_fail_on_unknown_placeholder() {
        let mapping = MountMapping::new("/api", "/{tenant}").unwrap();
        let err = mapping
            .to_canonical("/api/coll", &TemplateParams::new())
            .unwrap_err();
        assert_eq!(err.code, DocGateErrorCode::MountResolution);
    }

    #[test]
    fn test_should_match_whole_segments() {
        let mapping = MountMapping::new("/api", "*").unwrap();
        assert!(mapping.match_path("/api/db", None).is_some());
        assert!(mapping.match_path("/apix/db", None).is_none());
        assert!(mapping.to_canonical("/apix/db", &TemplateParams::new()).is_err());
    }

    #[test]
    fn test_should_pass_sessions_through() {
        let mapping = MountMapping::new("/api", "/inventory").unwrap();
        let params = TemplateParams::new();
        assert_eq!(mapping.to_canonical("/_sessions/abc", &params).unwrap(), "/_sessions/abc");
        assert!(is_sessions_path("/_sessions"));
        assert!(!is_sessions_path("/_sessionsx"));
    }

    #[test]
    fn test_should_round_trip_sessions_under_root_mount() {
        let mapping = MountMapping::new("/", "/inventory").unwrap();
        let params = TemplateParams::new();
        let canonical = mapping.to_canonical("/_sessions/abc", &params).unwrap();
        assert_eq!(canonical, "/_sessions/abc");
        let back = mapping.to_request_path(&canonical, &params).unwrap();
        assert_eq!(back, "/_sessions/abc");
    }

    #[test]
    fn test_should_map_deterministically() {
        let mapping = MountMapping::new("/api", "*").unwrap();
        let params = TemplateParams::new();
        let first = mapping.to_canonical("/api/db", &params).unwrap();
        let second = mapping.to_canonical("/api/db", &params).unwrap();
        assert_eq!(first, second);
    }

    #[test]
    fn test_should_pick_longest_mount() {
        let table = MountTable::new([("/", "*"), ("/api", "/inventory"), ("/api/v2", "/v2db")])
            .unwrap();
        let (mapping, _) = table.resolve("/api/v2/coll", None).unwrap();
        assert_eq!(mapping.what(), "/v2db");
        let (mapping, _) = table.resolve("/api/coll", None).unwrap();
        assert_eq!(mapping.what(), "/inventory");
        let (mapping, _) = table.resolve("/other", None).unwrap();
        assert_eq!(mapping.what(), "*");
    }

    #[test]
    fn test_should_prefer_literal_mount_over_template() {
        let table = MountTable::new([("/api", "/shop"), ("/{tenant}/*", "/{tenant}")]).unwrap();

        let (mapping, params) = table.resolve("/api/orders", None).unwrap();
        assert_eq!(mapping.where_uri(), "/api");
        assert_eq!(mapping.to_canonical("/api/orders", &params).unwrap(), "/shop/orders");

        let (mapping, params) = table.resolve("/acme/orders", None).unwrap();
        assert_eq!(mapping.where_uri(), "/{tenant}/*");
        assert_eq!(mapping.to_canonical("/acme/orders", &params).unwrap(), "/acme/orders");
    }

    #[test]
    fn test_should_prefer_template_over_root_mount() {
        let table = MountTable::new([("/", "*"), ("/{tenant}/*", "/{tenant}")]).unwrap();
        let (mapping, _) = table.resolve("/acme/orders", None).unwrap();
        assert_eq!(mapping.where_uri(), "/{tenant}/*");
        let (mapping, _) = table.resolve("/", None).unwrap();
        assert_eq!(mapping.where_uri(), "/");
    }

    #[test]
    fn test_should_fail_when_no_mount_matches() {
        let table = MountTable::new([("/api", "*")]).unwrap();
        let err = table.resolve("/elsewhere", None).unwrap_err();
        assert_eq!(err.code, DocGateErrorCode::MountResolution);
        assert!(table.resolve("/_sessions", None).is_ok());
    }

    #[test]
    fn test_should_normalize_paths() {
        assert_eq!(normalize(""), "/");
        assert_eq!(normalize("//db///coll/"), "/db/coll");
        assert_eq!(normalize("db"), "/db");
    }
}
