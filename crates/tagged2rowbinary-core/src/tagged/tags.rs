// Tagged identifier parsing
//
// `<base-path>?<query>`: the base path is percent-decoded strictly, the query
// is decoded like an HTML form. Only the first value per tag name is kept.

use std::borrow::Cow;

use indexmap::IndexMap;
use percent_encoding::percent_decode_str;
use url::form_urlencoded;

use crate::error::TagError;

/// Name of the implicit tag carrying the base path.
pub const NAME_TAG: &str = "__name__";

/// A tagged identifier split into its base path and tags.
///
/// Tags keep first-occurrence order. Consumers should not depend on it.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ParsedMetric<'a> {
    pub path: Cow<'a, str>,
    pub tags: IndexMap<Cow<'a, str>, Cow<'a, str>>,
}

impl ParsedMetric<'_> {
    pub fn tag(&self, name: &str) -> Option<&str> {
        self.tags.get(name).map(|value| value.as_ref())
    }
}

/// Parse a tagged identifier.
///
/// Identifiers without `?` parse to a path with no tags.
pub fn parse(identifier: &str) -> Result<ParsedMetric<'_>, TagError> {
    let (raw_path, raw_query) = match identifier.find('?') {
        Some(pos) => (&identifier[..pos], &identifier[pos + 1..]),
        None => (identifier, ""),
    };

    if has_control_bytes(raw_path) {
        return Err(TagError::malformed_path(raw_path, "invalid control character"));
    }
    if has_control_bytes(raw_query) {
        return Err(TagError::malformed_query("invalid control character"));
    }

    let raw_query = match raw_query.split_once('#') {
        Some((query, fragment)) => {
            if !has_valid_escapes(fragment) {
                return Err(TagError::malformed_query("invalid escape in fragment"));
            }
            query
        }
        None => raw_query,
    };

    let path = unescape_path(raw_path)?;

    let mut tags = IndexMap::new();
    for pair in raw_query.split('&') {
        // A bad pair is dropped on its own; the rest of the query still counts.
        if pair.is_empty() || pair.contains(';') || !has_valid_escapes(pair) {
            continue;
        }
        if let Some((key, value)) = form_urlencoded::parse(pair.as_bytes()).next() {
            tags.entry(key).or_insert(value);
        }
    }

    Ok(ParsedMetric { path, tags })
}

fn unescape_path(raw: &str) -> Result<Cow<'_, str>, TagError> {
    if !has_valid_escapes(raw) {
        return Err(TagError::malformed_path(raw, "invalid percent escape"));
    }
    percent_decode_str(raw)
        .decode_utf8()
        .map_err(|_| TagError::malformed_path(raw, "decoded path is not valid UTF-8"))
}

fn has_control_bytes(s: &str) -> bool {
    s.bytes().any(|b| b < 0x20 || b == 0x7f)
}

/// Every `%` must be followed by two hex digits.
fn has_valid_escapes(s: &str) -> bool {
    let bytes = s.as_bytes();
    let mut i = 0;
    while i < bytes.len() {
        if bytes[i] == b'%' {
            if i + 2 >= bytes.len()
                || !bytes[i + 1].is_ascii_hexdigit()
                || !bytes[i + 2].is_ascii_hexdigit()
            {
                return false;
            }
            i += 3;
        } else {
            i += 1;
        }
    }
    true
}

#[cfg(test)]
mod tests {
    use super::*;

    fn tag_list<'a>(metric: &'a ParsedMetric<'_>) -> Vec<(&'a str, &'a str)> {
        metric
            .tags
            .iter()
            .map(|(k, v)| (k.as_ref(), v.as_ref()))
            .collect()
    }

    #[test]
    fn test_parse_basic() {
        let metric = parse("cpu.load?a=1&b=2").unwrap();
        assert_eq!(metric.path, "cpu.load");
        assert_eq!(tag_list(&metric), vec![("a", "1"), ("b", "2")]);
    }

    #[test]
    fn test_first_value_wins() {
        let metric = parse("app.requests?env=prod&env=staging").unwrap();
        assert_eq!(metric.tag("env"), Some("prod"));
        assert_eq!(metric.tags.len(), 1);
    }

    #[test]
    fn test_path_is_percent_decoded() {
        let metric = parse("disk%20usage.sda%2F1?host=a").unwrap();
        assert_eq!(metric.path, "disk usage.sda/1");
        // '+' is literal in the path but a space in the query
        let metric = parse("a+b?k=x+y").unwrap();
        assert_eq!(metric.path, "a+b");
        assert_eq!(metric.tag("k"), Some("x y"));
    }

    #[test]
    fn test_invalid_path_escape_is_rejected() {
        assert!(matches!(
            parse("bad%zzpath?a=1"),
            Err(TagError::MalformedPath { .. })
        ));
        assert!(matches!(
            parse("trailing%2?a=1"),
            Err(TagError::MalformedPath { .. })
        ));
        assert!(matches!(
            parse("not%ffutf8?a=1"),
            Err(TagError::MalformedPath { .. })
        ));
    }

    #[test]
    fn test_bad_pairs_are_dropped_individually() {
        let metric = parse("m?a=1&b=%zz&c=3;4&&d&e=5").unwrap();
        assert_eq!(tag_list(&metric), vec![("a", "1"), ("d", ""), ("e", "5")]);
    }

    #[test]
    fn test_query_values_are_decoded() {
        let metric = parse("m?dc=eu%2Dwest&path=%2Fvar%2Flog").unwrap();
        assert_eq!(metric.tag("dc"), Some("eu-west"));
        assert_eq!(metric.tag("path"), Some("/var/log"));
    }

    #[test]
    fn test_fragment_is_dropped() {
        let metric = parse("m?a=1#b=2").unwrap();
        assert_eq!(tag_list(&metric), vec![("a", "1")]);
        assert!(parse("m?a=1#%zz").is_err());
    }

    #[test]
    fn test_control_characters_are_malformed() {
        assert!(matches!(
            parse("m?a=1\nb=2"),
            Err(TagError::MalformedQuery { .. })
        ));
        assert!(matches!(
            parse("m\x7fx?a=1"),
            Err(TagError::MalformedPath { .. })
        ));
        assert!(matches!(
            parse("m\tx"),
            Err(TagError::MalformedPath { .. })
        ));
    }

    #[test]
    fn test_no_query_means_no_tags() {
        let metric = parse("plain.metric").unwrap();
        assert_eq!(metric.path, "plain.metric");
        assert!(metric.tags.is_empty());

        let metric = parse("m?").unwrap();
        assert!(metric.tags.is_empty());
    }

    #[test]
    fn test_simple_input_borrows() {
        let metric = parse("cpu.load?a=1").unwrap();
        assert!(matches!(metric.path, Cow::Borrowed(_)));
        assert!(metric
            .tags
            .iter()
            .all(|(k, v)| matches!(k, Cow::Borrowed(_)) && matches!(v, Cow::Borrowed(_))));
    }
}
