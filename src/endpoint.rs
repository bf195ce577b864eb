//! Ingestion URL composition.
//!
//! The base URL is extended with `hostname` and, optionally, `tags` query
//! parameters. Nothing else about the URL is touched.

use once_cell::sync::OnceCell;
use url::{Url, form_urlencoded};

use crate::{Error, Result};

static LOCAL_HOSTNAME: OnceCell<String> = OnceCell::new();

/// Lower-cased name of the local host, looked up once per process.
pub fn local_hostname() -> Result<&'static str> {
    LOCAL_HOSTNAME
        .get_or_try_init(|| {
            let name = hostname::get()?;
            Ok::<_, Error>(name.to_string_lossy().to_lowercase())
        })
        .map(String::as_str)
}

/// Parse a base ingestion URL.
///
/// Only used to reject malformed input. The parsed form is normalized and
/// is never sent.
pub fn parse_ingest_url(raw: &str) -> Result<Url> {
    Url::parse(raw.trim())
        .map_err(|e| Error::Config(format!("invalid ingest URL {:?}: {}", raw, e)))
}

/// Return `base` with `hostname` and then `tags` appended as query parameters.
///
/// `base` is kept byte for byte apart from surrounding whitespace: host
/// case, ports, path segments and existing parameters are untouched. The
/// tag string is form-urlencoded, so `a,b c` becomes `a%2Cb+c`.
pub fn build_endpoint(base: &str, hostname: &str, tags: Option<&str>) -> String {
    let base = base.trim();
    let (head, fragment) = match base.find('#') {
        Some(at) => base.split_at(at),
        None => (base, ""),
    };

    let mut target = String::with_capacity(base.len() + hostname.len() + 32);
    target.push_str(head);
    // Pairs are joined with '&' only when the query already has content.
    let start = match head.find('?') {
        Some(_) if head.ends_with('&') => target.len(),
        Some(at) => at + 1,
        None => {
            target.push('?');
            target.len()
        }
    };

    let mut pairs = form_urlencoded::Serializer::for_suffix(target, start);
    pairs.append_pair("hostname", hostname);
    if let Some(tags) = tags {
        pairs.append_pair("tags", tags);
    }
    let mut endpoint = pairs.finish();
    endpoint.push_str(fragment);
    endpoint
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_appends_hostname_with_question_mark() {
        let endpoint = build_endpoint("https://logs.logdna.com/logs/ingest", "web-01", None);
        assert_eq!(endpoint, "https://logs.logdna.com/logs/ingest?hostname=web-01");
    }

    #[test]
    fn test_appends_hostname_with_ampersand() {
        let endpoint = build_endpoint("https://logs.logdna.com/logs/ingest?now=1", "web-01", None);
        assert_eq!(endpoint, "https://logs.logdna.com/logs/ingest?now=1&hostname=web-01");

        let endpoint = build_endpoint("https://logs.logdna.com/logs/ingest?", "web-01", None);
        assert_eq!(endpoint, "https://logs.logdna.com/logs/ingest?hostname=web-01");

        let endpoint = build_endpoint("https://logs.logdna.com/logs/ingest?now=1&", "web-01", None);
        assert_eq!(endpoint, "https://logs.logdna.com/logs/ingest?now=1&hostname=web-01");
    }

    #[test]
    fn test_tags_follow_hostname_and_are_encoded() {
        let endpoint = build_endpoint(
            "https://logs.logdna.com/logs/ingest",
            "web-01",
            Some("prod,eu west"),
        );
        assert_eq!(
            endpoint,
            "https://logs.logdna.com/logs/ingest?hostname=web-01&tags=prod%2Ceu+west"
        );

        let query = Url::parse(&endpoint).unwrap();
        let keys: Vec<_> = query.query_pairs().map(|(k, _)| k.into_owned()).collect();
        assert_eq!(keys, ["hostname", "tags"]);
    }

    #[test]
    fn test_empty_tags_still_appended() {
        let endpoint = build_endpoint("http://localhost:8080/ingest", "h", Some(""));
        assert_eq!(endpoint, "http://localhost:8080/ingest?hostname=h&tags=");
    }

    #[test]
    fn test_base_is_kept_verbatim() {
        for base in [
            "https://LOGS.Example.com:443/logs/ingest",
            "http://localhost:8080",
            "https://logs.example.com/a/../ingest?q=a%2cb",
        ] {
            let endpoint = build_endpoint(base, "h", Some("t"));
            assert!(endpoint.starts_with(base), "{} lost its prefix: {}", base, endpoint);
            assert!(endpoint.ends_with("hostname=h&tags=t"));
        }

        assert_eq!(
            build_endpoint("http://localhost:8080", "h", None),
            "http://localhost:8080?hostname=h"
        );
        assert_eq!(
            build_endpoint("https://logs.example.com/a/../ingest?q=a%2cb", "h", None),
            "https://logs.example.com/a/../ingest?q=a%2cb&hostname=h"
        );
    }

    #[test]
    fn test_surrounding_whitespace_is_trimmed() {
        let endpoint = build_endpoint("  http://localhost:8080/ingest\n", "h", None);
        assert_eq!(endpoint, "http://localhost:8080/ingest?hostname=h");
    }

    #[test]
    fn test_fragment_stays_last() {
        let endpoint = build_endpoint("http://localhost:8080/ingest?a=1#frag", "h", None);
        assert_eq!(endpoint, "http://localhost:8080/ingest?a=1&hostname=h#frag");
    }

    #[test]
    fn test_base_is_not_mutated() {
        let base = String::from("http://localhost:8080/ingest");
        let first = build_endpoint(&base, "h", Some("a"));
        let second = build_endpoint(&base, "h", Some("a"));
        assert_eq!(first, second);
        assert_eq!(base, "http://localhost:8080/ingest");
    }

    #[test]
    fn test_parse_ingest_url_rejects_garbage() {
        assert!(matches!(parse_ingest_url("not a url"), Err(Error::Config(_))));
    }

    #[test]
    fn test_local_hostname_is_lowercase() {
        let name = local_hostname().unwrap();
        assert!(!name.is_empty());
        assert_eq!(name, name.to_lowercase());
    }
}
