//! Source URL validation, domain derivation, and relative URL resolution.

use reqwest::Url;

use crate::error::EnrichError;

/// Domain recorded when the source URL has no usable host.
pub const UNKNOWN_DOMAIN: &str = "unknown";

/// Parses a caller-supplied product URL.
///
/// The URL must be absolute, use `http` or `https`, and carry a host.
///
/// # Errors
///
/// Returns [`EnrichError::InvalidUrl`] otherwise.
pub fn parse_source_url(raw: &str) -> Result<Url, EnrichError> {
    let invalid = |reason: String| EnrichError::InvalidUrl {
        url: raw.to_owned(),
        reason,
    };

    let url = Url::parse(raw.trim()).map_err(|e| invalid(e.to_string()))?;
    if !matches!(url.scheme(), "http" | "https") {
        return Err(invalid(format!("unsupported scheme \"{}\"", url.scheme())));
    }
    if url.host_str().is_none_or(str::is_empty) {
        return Err(invalid("missing host".to_string()));
    }
    Ok(url)
}

/// Host of `url` with a leading `www.` stripped.
#[must_use]
pub fn domain_from_url(url: &Url) -> String {
    url.host_str().map_or_else(
        || UNKNOWN_DOMAIN.to_string(),
        |host| host.strip_prefix("www.").unwrap_or(host).to_string(),
    )
}

/// Like [`domain_from_url`] but for unparsed input; falls back to
/// [`UNKNOWN_DOMAIN`] when the string is not a URL.
#[must_use]
pub fn domain_from_str(raw: &str) -> String {
    Url::parse(raw.trim()).map_or_else(|_| UNKNOWN_DOMAIN.to_string(), |u| domain_from_url(&u))
}

/// Resolves a possibly-relative reference against `base`.
///
/// Returns `None` for blank input, references that cannot be joined, and
/// results that are not `http`/`https` (e.g. `data:` placeholders used by
/// lazy-loading image widgets).
#[must_use]
pub fn resolve_url(base: &Url, candidate: &str) -> Option<String> {
    let candidate = candidate.trim().replace("&amp;", "&");
    if candidate.is_empty() {
        return None;
    }
    let resolved = base.join(&candidate).ok()?;
    matches!(resolved.scheme(), "http" | "https").then(|| resolved.to_string())
}

#[cfg(test)]
mod tests {
    use super::*;

    fn base() -> Url {
        Url::parse("https://www.shop.example/products/lamp?variant=2").unwrap()
    }

    #[test]
    fn parse_source_url_accepts_https() {
        let url = parse_source_url("https://shop.example/p/1").unwrap();
        assert_eq!(url.host_str(), Some("shop.example"));
    }

    #[test]
    fn parse_source_url_trims_whitespace() {
        assert!(parse_source_url("  https://shop.example/p/1 ").is_ok());
    }

    #[test]
    fn parse_source_url_rejects_relative() {
        let err = parse_source_url("/products/lamp").unwrap_err();
        assert!(matches!(err, EnrichError::InvalidUrl { .. }), "got: {err:?}");
    }

    #[test]
    fn parse_source_url_rejects_non_http_scheme() {
        assert!(parse_source_url("ftp://shop.example/file").is_err());
        assert!(parse_source_url("mailto:someone@shop.example").is_err());
    }

    #[test]
    fn domain_strips_www() {
        assert_eq!(domain_from_url(&base()), "shop.example");
    }

    #[test]
    fn domain_keeps_other_subdomains() {
        let url = Url::parse("https://store.brand.example/x").unwrap();
        assert_eq!(domain_from_url(&url), "store.brand.example");
    }

    #[test]
    fn domain_from_str_falls_back_to_unknown() {
        assert_eq!(domain_from_str("not a url"), UNKNOWN_DOMAIN);
        assert_eq!(domain_from_str("https://www.a.example/"), "a.example");
    }

    #[test]
    fn resolve_root_relative() {
        assert_eq!(
            resolve_url(&base(), "/img/x.jpg").as_deref(),
            Some("https://www.shop.example/img/x.jpg")
        );
    }

    #[test]
    fn resolve_path_relative() {
        assert_eq!(
            resolve_url(&base(), "lamp-front.png").as_deref(),
            Some("https://www.shop.example/products/lamp-front.png")
        );
    }

    #[test]
    fn resolve_protocol_relative() {
        assert_eq!(
            resolve_url(&base(), "//cdn.example.com/a.jpg").as_deref(),
            Some("https://cdn.example.com/a.jpg")
        );
    }

    #[test]
    fn resolve_keeps_absolute() {
        assert_eq!(
            resolve_url(&base(), "https://cdn.example.com/a.jpg?w=600&amp;h=600").as_deref(),
            Some("https://cdn.example.com/a.jpg?w=600&h=600")
        );
    }

    #[test]
    fn resolve_rejects_blank_and_unjoinable() {
        assert_eq!(resolve_url(&base(), "   "), None);
        assert_eq!(resolve_url(&base(), "http://[::1"), None);
    }

    #[test]
    fn resolve_rejects_data_uri() {
        assert_eq!(
            resolve_url(&base(), "data:image/gif;base64,R0lGODlhAQABAAAAACw="),
            None
        );
    }
}
