//! `application/x-www-form-urlencoded` parser.

/// Parse an urlencoded body into `(name, value)` pairs in wire order.
///
/// A pair without `=` has no value (`None`); `name=` has an empty one.
#[must_use]
pub fn parse_urlencoded(body: &[u8]) -> Vec<(String, Option<String>)> {
    body.split(|b| *b == b'&')
        .filter(|pair| !pair.is_empty())
        .filter_map(|pair| {
            let has_value = pair.contains(&b'=');
            let (name, value) = form_urlencoded::parse(pair).next()?;
            Some((
                name.into_owned(),
                has_value.then(|| value.into_owned()),
            ))
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_should_parse_pairs_in_order() {
        let pairs = parse_urlencoded(b"b=2&a=hello+world&c=%7B%22x%22%3A1%7D");
        assert_eq!(
            pairs,
            vec![
                ("b".to_owned(), Some("2".to_owned())),
                ("a".to_owned(), Some("hello world".to_owned())),
                ("c".to_owned(), Some("{\"x\":1}".to_owned())),
            ]
        );
    }

    #[test]
    fn test_should_distinguish_missing_and_blank_values() {
        let pairs = parse_urlencoded(b"flag&blank=&&x=1");
        assert_eq!(pairs[0], ("flag".to_owned(), None));
        assert_eq!(pairs[1], ("blank".to_owned(), Some(String::new())));
        assert_eq!(pairs.len(), 3);
    }
}
