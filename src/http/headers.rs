//! Header manipulation for forwarded requests.
//!
//! # Responsibilities
//! - Strip hop-by-hop headers
//! - Add X-Forwarded-For, X-Forwarded-Proto, X-Forwarded-Host
//! - Substitute `Host`/`Referer` with the upstream origin unless preserved
//!
//! # Design Decisions
//! - Preserve original client IP chain in X-Forwarded-For (append)
//! - Headers named in `Connection` are treated as hop-by-hop too

use std::net::IpAddr;

use axum::http::{header, HeaderMap, HeaderName, HeaderValue};
use url::Url;

pub const X_FORWARDED_FOR: HeaderName = HeaderName::from_static("x-forwarded-for");
pub const X_FORWARDED_PROTO: HeaderName = HeaderName::from_static("x-forwarded-proto");
pub const X_FORWARDED_HOST: HeaderName = HeaderName::from_static("x-forwarded-host");

const HOP_BY_HOP: [HeaderName; 8] = [
    header::CONNECTION,
    HeaderName::from_static("keep-alive"),
    HeaderName::from_static("proxy-connection"),
    header::PROXY_AUTHENTICATE,
    header::PROXY_AUTHORIZATION,
    header::TE,
    header::TRAILER,
    header::TRANSFER_ENCODING,
];

/// Remove hop-by-hop headers, including `Upgrade` and any named in `Connection`.
pub fn strip_hop_by_hop(headers: &mut HeaderMap) {
    let named: Vec<HeaderName> = headers
        .get_all(header::CONNECTION)
        .iter()
        .filter_map(|v| v.to_str().ok())
        .flat_map(|v| v.split(','))
        .filter_map(|name| HeaderName::from_bytes(name.trim().as_bytes()).ok())
        .collect();

    for name in named.iter().chain(HOP_BY_HOP.iter()) {
        headers.remove(name);
    }
    headers.remove(header::UPGRADE);
}

/// `host[:port]` of an upstream URL.
pub fn authority(url: &Url) -> String {
    match (url.host_str(), url.port()) {
        (Some(host), Some(port)) => format!("{}:{}", host, port),
        (Some(host), None) => host.to_string(),
        (None, _) => String::new(),
    }
}

/// Point `Host` and `Referer` at the upstream unless the rule preserves them.
pub fn apply_origin(headers: &mut HeaderMap, target: &Url, preserve_host: bool) {
    if preserve_host {
        return;
    }

    if let Ok(host) = HeaderValue::from_str(&authority(target)) {
        headers.insert(header::HOST, host);
    }
    let origin = target.origin().ascii_serialization();
    if let Ok(referer) = HeaderValue::from_str(&format!("{}/", origin)) {
        headers.insert(header::REFERER, referer);
    }
}

/// Record the client hop. Must run before `apply_origin` rewrites `Host`.
pub fn append_forwarded(headers: &mut HeaderMap, peer: IpAddr, proto: &str) {
    let forwarded_for = match headers.get(&X_FORWARDED_FOR).and_then(|v| v.to_str().ok()) {
        Some(existing) => format!("{}, {}", existing, peer),
        None => peer.to_string(),
    };
    if let Ok(value) = HeaderValue::from_str(&forwarded_for) {
        headers.insert(X_FORWARDED_FOR, value);
    }

    if let Ok(value) = HeaderValue::from_str(proto) {
        headers.insert(X_FORWARDED_PROTO, value);
    }

    if let Some(host) = headers.get(header::HOST).cloned() {
        headers.insert(X_FORWARDED_HOST, host);
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_strip_hop_by_hop() {
        let mut headers = HeaderMap::new();
        headers.insert(header::CONNECTION, HeaderValue::from_static("keep-alive, x-session-hint"));
        headers.insert("keep-alive", HeaderValue::from_static("timeout=5"));
        headers.insert("x-session-hint", HeaderValue::from_static("1"));
        headers.insert(header::UPGRADE, HeaderValue::from_static("websocket"));
        headers.insert(header::TRANSFER_ENCODING, HeaderValue::from_static("chunked"));
        headers.insert(header::COOKIE, HeaderValue::from_static("sid=1"));

        strip_hop_by_hop(&mut headers);

        assert_eq!(headers.len(), 1);
        assert_eq!(headers.get(header::COOKIE).unwrap(), "sid=1");
    }

    #[test]
    fn test_origin_substitution() {
        let target = Url::parse("http://uc.internal:8080/base").unwrap();
        let mut headers = HeaderMap::new();
        headers.insert(header::HOST, HeaderValue::from_static("platform.example.com"));
        headers.insert(header::REFERER, HeaderValue::from_static("https://platform.example.com/login"));

        apply_origin(&mut headers, &target, false);

        assert_eq!(headers.get(header::HOST).unwrap(), "uc.internal:8080");
        assert_eq!(headers.get(header::REFERER).unwrap(), "http://uc.internal:8080/");
    }

    #[test]
    fn test_origin_preserved() {
        let target = Url::parse("http://gittar:5566").unwrap();
        let mut headers = HeaderMap::new();
        headers.insert(header::HOST, HeaderValue::from_static("platform.example.com"));

        apply_origin(&mut headers, &target, true);

        assert_eq!(headers.get(header::HOST).unwrap(), "platform.example.com");
        assert!(headers.get(header::REFERER).is_none());
    }

    #[test]
    fn test_forwarded_for_appends() {
        let mut headers = HeaderMap::new();
        headers.insert(X_FORWARDED_FOR, HeaderValue::from_static("10.0.0.1"));
        headers.insert(header::HOST, HeaderValue::from_static("platform.example.com"));

        append_forwarded(&mut headers, "192.168.1.7".parse().unwrap(), "https");

        assert_eq!(headers.get(&X_FORWARDED_FOR).unwrap(), "10.0.0.1, 192.168.1.7");
        assert_eq!(headers.get(&X_FORWARDED_PROTO).unwrap(), "https");
        assert_eq!(headers.get(&X_FORWARDED_HOST).unwrap(), "platform.example.com");
    }
}
