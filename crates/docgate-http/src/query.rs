//! Query string parsing.

use percent_encoding::percent_decode_str;

/// Decoded query parameters, in request order.
///
/// Repeated names are kept; `filter` for instance may appear several times.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct QueryParams {
    pairs: Vec<(String, String)>,
}

impl QueryParams {
    /// Parse a raw query string (without the leading `?`).
    #[must_use]
    pub fn parse(query: &str) -> Self {
        Self {
            pairs: parse_query_params(query),
        }
    }

    /// Whether the parameter is present, with or without a value.
    #[must_use]
    pub fn contains(&self, key: &str) -> bool {
        self.pairs.iter().any(|(k, _)| k == key)
    }

    /// The first value of a parameter.
    #[must_use]
    pub fn get(&self, key: &str) -> Option<&str> {
        self.pairs
            .iter()
            .find(|(k, _)| k == key)
            .map(|(_, v)| v.as_str())
    }

    /// Every value of a parameter, in request order.
    pub fn get_all<'a>(&'a self, key: &'a str) -> impl Iterator<Item = &'a str> + 'a {
        self.pairs
            .iter()
            .filter(move |(k, _)| k == key)
            .map(|(_, v)| v.as_str())
    }

    /// All pairs.
    #[must_use]
    pub fn pairs(&self) -> &[(String, String)] {
        &self.pairs
    }

    /// Whether there are no parameters.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.pairs.is_empty()
    }
}

/// Percent-decode a URI component, replacing invalid UTF-8.
#[must_use]
pub fn decode_uri_component(s: &str) -> String {
    percent_decode_str(s).decode_utf8_lossy().into_owned()
}

fn parse_query_params(query: &str) -> Vec<(String, String)> {
    if query.is_empty() {
        return Vec::new();
    }

    query
        .split('&')
        .filter(|s| !s.is_empty())
        .map(|pair| {
            if let Some((key, value)) = pair.split_once('=') {
                (decode_uri_component(key), decode_uri_component(value))
            } else {
                (decode_uri_component(pair), String::new())
            }
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_should_parse_repeated_params() {
        let q = QueryParams::parse("filter=%7B%22a%22%3A1%7D&page=2&filter={\"b\":2}&count");
        assert_eq!(q.get("page"), Some("2"));
        assert_eq!(
            q.get_all("filter").collect::<Vec<_>>(),
            vec![r#"{"a":1}"#, r#"{"b":2}"#]
        );
        assert!(q.contains("count"));
        assert_eq!(q.get("count"), Some(""));
        assert!(!q.contains("sort"));
    }

    #[test]
    fn test_should_handle_empty_query() {
        let q = QueryParams::parse("");
        assert!(q.is_empty());
        assert_eq!(q.get("page"), None);
    }
}
