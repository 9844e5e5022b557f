//! Organization-scoped path rewriting.
//!
//! Browser-facing API paths carry the tenant as their first segment after
//! `/api` (`/api/<org>/projects/42`); backends expect canonical paths
//! (`/api/projects/42`) with the tenant supplied out of band. For plain HTTP
//! the org travels as an `org` header, for WebSocket upgrades as a `wsOrg`
//! query parameter.
//!
//! Rewriting is fail-open: a path without an org segment, or one under an
//! exempt prefix, is returned unchanged.
//!
//! Idempotence is tracked on [`RoutedPath::org`], not inferred from the path
//! text. `/api/projects/42` matches the org pattern as org `projects`, so a
//! canonical path that has been flattened back to a string must not be fed
//! through the rewriter again.

use regex::Regex;

use crate::routing::matcher::has_path_prefix;

/// Query parameter carrying the org for upgrade connections.
pub const WS_ORG_PARAM: &str = "wsOrg";

/// Path and query as they will be sent upstream.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RoutedPath {
    pub path: String,
    pub query: Option<String>,
    /// Org lifted out of the path; `Some` marks the value as canonical.
    pub org: Option<String>,
}

impl RoutedPath {
    pub fn new(path: impl Into<String>, query: Option<impl Into<String>>) -> Self {
        Self {
            path: path.into(),
            query: query.map(Into::into),
            org: None,
        }
    }

    /// `path?query` as used in a request line.
    pub fn path_and_query(&self) -> String {
        match &self.query {
            Some(q) => format!("{}?{}", self.path, q),
            None => self.path.clone(),
        }
    }
}

/// Where the extracted org is re-attached.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum OrgCarrier {
    /// Forwarded as an `org` request header.
    Header,
    /// Appended to the query string as `wsOrg=<org>`.
    QueryParam,
}

/// Strips the org segment from `/api/<org>/<rest>` paths.
#[derive(Debug, Clone)]
pub struct OrgPathRewriter {
    pattern: Regex,
    exempt_prefixes: Vec<String>,
    carrier: OrgCarrier,
}

impl OrgPathRewriter {
    pub fn new(exempt_prefixes: Vec<String>, carrier: OrgCarrier) -> Self {
        Self {
            pattern: Regex::new(r"^/api/([^/]+)/(.+)$").expect("org path pattern is valid"),
            exempt_prefixes,
            carrier,
        }
    }

    pub fn carrier(&self) -> OrgCarrier {
        self.carrier
    }

    pub fn is_exempt(&self, path: &str) -> bool {
        self.exempt_prefixes.iter().any(|p| has_path_prefix(path, p))
    }

    /// Rewrite to canonical form.
    ///
    /// A `RoutedPath` whose `org` is set is returned as is. A bare path string
    /// carries no such marker and is always treated as browser-facing.
    pub fn rewrite(&self, target: RoutedPath) -> RoutedPath {
        if target.org.is_some() || self.is_exempt(&target.path) {
            return target;
        }

        let Some(captures) = self.pattern.captures(&target.path) else {
            return target;
        };
        let org = captures[1].to_string();
        let path = format!("/api/{}", &captures[2]);

        let query = match self.carrier {
            OrgCarrier::Header => target.query,
            OrgCarrier::QueryParam => {
                let param = format!("{}={}", WS_ORG_PARAM, org);
                Some(match target.query {
                    Some(q) if !q.is_empty() => format!("{}&{}", q, param),
                    _ => param,
                })
            }
        };

        RoutedPath {
            path,
            query,
            org: Some(org),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use proptest::prelude::*;

    fn header_rewriter() -> OrgPathRewriter {
        OrgPathRewriter::new(vec!["/api/files".into()], OrgCarrier::Header)
    }

    fn ws_rewriter() -> OrgPathRewriter {
        OrgPathRewriter::new(vec!["/api/files".into()], OrgCarrier::QueryParam)
    }

    #[test]
    fn test_strips_org_segment() {
        let out = header_rewriter().rewrite(RoutedPath::new("/api/acme/projects/42", Some("x=1")));
        assert_eq!(out.path, "/api/projects/42");
        assert_eq!(out.query.as_deref(), Some("x=1"));
        assert_eq!(out.org.as_deref(), Some("acme"));
        assert_eq!(out.path_and_query(), "/api/projects/42?x=1");
    }

    #[test]
    fn test_websocket_org_goes_to_query() {
        let out = ws_rewriter().rewrite(RoutedPath::new("/api/acme/websocket", None::<String>));
        assert_eq!(out.path_and_query(), "/api/websocket?wsOrg=acme");

        let out = ws_rewriter().rewrite(RoutedPath::new("/api/acme/terminal", Some("cols=80")));
        assert_eq!(out.path_and_query(), "/api/terminal?cols=80&wsOrg=acme");
    }

    #[test]
    fn test_exempt_paths_untouched() {
        let input = RoutedPath::new("/api/files/abc", None::<String>);
        let out = header_rewriter().rewrite(input.clone());
        assert_eq!(out, input);
        assert!(out.org.is_none());
    }

    #[test]
    fn test_no_org_segment_fails_open() {
        for path in ["/api/projects", "/api/", "/api", "/other/acme/x"] {
            let input = RoutedPath::new(path, Some("q=1"));
            assert_eq!(header_rewriter().rewrite(input.clone()), input);
        }
    }

    #[test]
    fn test_canonical_input_is_noop() {
        let rewriter = ws_rewriter();
        let once = rewriter.rewrite(RoutedPath::new("/api/acme/websocket", None::<String>));
        let twice = rewriter.rewrite(once.clone());
        assert_eq!(once, twice);
        assert_eq!(twice.path_and_query(), "/api/websocket?wsOrg=acme");
    }

    #[test]
    fn test_flattened_canonical_path_is_rewritten_again() {
        let rewriter = header_rewriter();
        let once = rewriter.rewrite(RoutedPath::new("/api/acme/projects/42", None::<String>));
        assert_eq!(rewriter.rewrite(once.clone()), once);

        let reparsed = rewriter.rewrite(RoutedPath::new(once.path.clone(), None::<String>));
        assert_eq!(reparsed.path, "/api/42");
        assert_eq!(reparsed.org.as_deref(), Some("projects"));
    }

    proptest! {
        #[test]
        fn prop_rewrite_is_idempotent(
            org in "[a-z][a-z0-9-]{0,15}",
            rest in "[a-z0-9]{1,8}(/[a-z0-9.]{1,8}){0,3}",
            query in proptest::option::of("[a-z]{1,4}=[0-9]{1,3}"),
            websocket in any::<bool>(),
        ) {
            let rewriter = if websocket { ws_rewriter() } else { header_rewriter() };
            let input = RoutedPath::new(format!("/api/{}/{}", org, rest), query);

            let once = rewriter.rewrite(input);
            let twice = rewriter.rewrite(once.clone());
            prop_assert_eq!(&once, &twice);

            if org != "files" {
                prop_assert_eq!(once.org.as_deref(), Some(org.as_str()));
                prop_assert_eq!(once.path, format!("/api/{}", rest));
            }
        }
    }
}
