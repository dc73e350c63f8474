use std::time::{SystemTime, UNIX_EPOCH};

use anyhow::Context;
use reqwest::header;
use url::{form_urlencoded, Url};

/// Reserved query parameter name. Its value is forced to the current time on
/// every outbound request to defeat intermediate caching.
pub const CACHE_BUST_KEY: &str = "_t";

/// Current Unix time in milliseconds, the cache-busting value.
pub fn unix_millis() -> u128 {
    SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .map(|d| d.as_millis())
        .unwrap_or(0)
}

/// Build the outbound URL: the configured base plus the inbound query pairs.
///
/// Pairs are applied with URLSearchParams `set` semantics (the first existing
/// occurrence is replaced in place, later duplicates dropped), so the last
/// inbound write wins and base-URL parameters can be overridden. Inbound pairs
/// with an empty value are dropped, and the cache-busting key is never copied
/// from the inbound query; it is always overwritten with `timestamp_ms`.
pub fn build_upstream_url(
    base: &str,
    raw_query: Option<&str>,
    timestamp_ms: u128,
) -> anyhow::Result<Url> {
    let mut url = Url::parse(base).context("invalid upstream URL")?;

    let mut pairs: Vec<(String, String)> = url
        .query_pairs()
        .map(|(k, v)| (k.into_owned(), v.into_owned()))
        .collect();

    if let Some(raw) = raw_query {
        for (key, value) in form_urlencoded::parse(raw.as_bytes()) {
            if key == CACHE_BUST_KEY || value.is_empty() {
                continue;
            }
            set_pair(&mut pairs, &key, &value);
        }
    }
    set_pair(&mut pairs, CACHE_BUST_KEY, &timestamp_ms.to_string());

    url.query_pairs_mut().clear().extend_pairs(&pairs);
    Ok(url)
}

fn set_pair(pairs: &mut Vec<(String, String)>, key: &str, value: &str) {
    match pairs.iter().position(|(k, _)| k == key) {
        Some(first) => {
            pairs[first].1 = value.to_string();
            let mut i = first + 1;
            while i < pairs.len() {
                if pairs[i].0 == key {
                    pairs.remove(i);
                } else {
                    i += 1;
                }
            }
        }
        None => pairs.push((key.to_string(), value.to_string())),
    }
}

/// GET the outbound URL and decode the body as JSON.
///
/// The upstream HTTP status is deliberately not checked: whatever JSON the
/// backend returns is relayed verbatim. Only transport and decode failures
/// surface as proxy errors.
pub async fn fetch_json(client: &reqwest::Client, url: Url) -> anyhow::Result<serde_json::Value> {
    let response = client
        .get(url)
        .header(header::ACCEPT, "application/json")
        .header(header::CACHE_CONTROL, "no-store")
        .send()
        .await
        .context("upstream request failed")?;

    response
        .json()
        .await
        .context("upstream returned invalid JSON")
}

#[cfg(test)]
mod tests {
    use super::*;

    fn query_pairs(url: &Url) -> Vec<(String, String)> {
        url.query_pairs()
            .map(|(k, v)| (k.into_owned(), v.into_owned()))
            .collect()
    }

    #[test]
    fn test_forwards_inbound_pairs() {
        let url =
            build_upstream_url("https://example.com/exec", Some("action=list&room=5"), 1000)
                .unwrap();

        assert_eq!(
            query_pairs(&url),
            vec![
                ("action".to_string(), "list".to_string()),
                ("room".to_string(), "5".to_string()),
                ("_t".to_string(), "1000".to_string()),
            ]
        );
    }

    #[test]
    fn test_no_inbound_query_still_stamps_timestamp() {
        let url = build_upstream_url("https://example.com/exec", None, 42).unwrap();
        assert_eq!(url.query(), Some("_t=42"));
    }

    #[test]
    fn test_empty_values_are_dropped() {
        let url =
            build_upstream_url("https://example.com/exec", Some("a=&b=1&c"), 7).unwrap();

        let pairs = query_pairs(&url);
        assert!(!pairs.iter().any(|(k, _)| k == "a"));
        assert!(!pairs.iter().any(|(k, _)| k == "c"));
        assert!(pairs.contains(&("b".to_string(), "1".to_string())));
    }

    #[test]
    fn test_inbound_cache_bust_key_is_overwritten() {
        let url =
            build_upstream_url("https://example.com/exec", Some("_t=123&x=y"), 999).unwrap();

        let pairs = query_pairs(&url);
        assert_eq!(
            pairs.iter().filter(|(k, _)| k == "_t").count(),
            1,
            "exactly one _t pair"
        );
        assert!(pairs.contains(&("_t".to_string(), "999".to_string())));
    }

    #[test]
    fn test_duplicate_keys_last_write_wins() {
        let url =
            build_upstream_url("https://example.com/exec", Some("a=1&a=2&a=3"), 1).unwrap();

        let pairs = query_pairs(&url);
        assert_eq!(
            pairs.iter().filter(|(k, _)| k == "a").count(),
            1,
            "duplicates collapse to one pair"
        );
        assert!(pairs.contains(&("a".to_string(), "3".to_string())));
    }

    #[test]
    fn test_base_query_preserved_and_overridable() {
        let url = build_upstream_url(
            "https://example.com/exec?key=abc&mode=full",
            Some("mode=short"),
            5,
        )
        .unwrap();

        let pairs = query_pairs(&url);
        assert!(pairs.contains(&("key".to_string(), "abc".to_string())));
        assert!(pairs.contains(&("mode".to_string(), "short".to_string())));
        assert!(!pairs.contains(&("mode".to_string(), "full".to_string())));
    }

    #[test]
    fn test_values_are_percent_encoded() {
        let url = build_upstream_url(
            "https://example.com/exec",
            Some("name=ward%203&note=a%26b"),
            1,
        )
        .unwrap();

        let pairs = query_pairs(&url);
        assert!(pairs.contains(&("name".to_string(), "ward 3".to_string())));
        assert!(pairs.contains(&("note".to_string(), "a&b".to_string())));
    }

    #[test]
    fn test_invalid_base_url_errors() {
        let err = build_upstream_url("not a url", None, 1).unwrap_err();
        assert!(format!("{err:#}").contains("invalid upstream URL"));
    }

    #[test]
    fn test_unix_millis_is_monotone() {
        let a = unix_millis();
        let b = unix_millis();
        assert!(b >= a);
        // Sanity: a plausible millisecond timestamp, not seconds
        assert!(a > 1_600_000_000_000);
    }

    #[test]
    fn test_set_pair_replaces_in_place() {
        let mut pairs = vec![
            ("a".to_string(), "1".to_string()),
            ("b".to_string(), "2".to_string()),
            ("a".to_string(), "3".to_string()),
        ];
        set_pair(&mut pairs, "a", "9");
        assert_eq!(
            pairs,
            vec![
                ("a".to_string(), "9".to_string()),
                ("b".to_string(), "2".to_string()),
            ]
        );
    }
}
