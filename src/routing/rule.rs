//! Proxy rule definition.
//!
//! A rule pairs a predicate with an upstream target and the transformations
//! applied on the way there (path rewrite, host handling, upgrade support).

use std::fmt;

use url::Url;

use crate::routing::matcher::{Matcher, RequestHead};
use crate::routing::org_path::{OrgCarrier, OrgPathRewriter, RoutedPath};

/// Stable identifier of a routing table entry, used in logs and metrics.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum RuleId {
    StaticAdmin,
    StaticFdp,
    WebSocket,
    UserCenter,
    Api,
    Git,
    FixedPath,
}

impl RuleId {
    pub fn as_str(&self) -> &'static str {
        match self {
            RuleId::StaticAdmin => "static-admin",
            RuleId::StaticFdp => "static-fdp",
            RuleId::WebSocket => "websocket",
            RuleId::UserCenter => "uc-api",
            RuleId::Api => "api",
            RuleId::Git => "git",
            RuleId::FixedPath => "fixed-path",
        }
    }
}

impl fmt::Display for RuleId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// An ordered routing table entry.
#[derive(Debug)]
pub struct ProxyRule {
    pub id: RuleId,
    matcher: Box<dyn Matcher>,
    /// Upstream base URL.
    pub target: Url,
    rewriter: Option<OrgPathRewriter>,
    /// Forward the client's `Host`/`Referer` instead of the upstream origin.
    pub preserve_host: bool,
    /// Eligible to carry protocol-upgrade connections.
    pub websocket: bool,
}

impl ProxyRule {
    pub fn new(id: RuleId, matcher: impl Matcher + 'static, target: Url) -> Self {
        Self {
            id,
            matcher: Box::new(matcher),
            target,
            rewriter: None,
            preserve_host: false,
            websocket: false,
        }
    }

    pub fn with_rewriter(mut self, rewriter: OrgPathRewriter) -> Self {
        self.rewriter = Some(rewriter);
        self
    }

    pub fn preserving_host(mut self) -> Self {
        self.preserve_host = true;
        self
    }

    pub fn for_websocket(mut self) -> Self {
        self.websocket = true;
        self
    }

    pub fn matches(&self, req: &RequestHead<'_>) -> bool {
        self.matcher.matches(req)
    }

    /// Upstream path and query; identity when the rule has no rewriter.
    ///
    /// Expects the path as received from the client. Passing in a path this
    /// method already produced rewrites it a second time.
    pub fn rewrite_path(&self, path: &str, query: Option<&str>) -> RoutedPath {
        let routed = RoutedPath::new(path, query);
        match &self.rewriter {
            Some(rewriter) => rewriter.rewrite(routed),
            None => routed,
        }
    }

    /// Headers added to the upstream request for this routed path.
    ///
    /// The org is sent as a header only when it is not already encoded in the
    /// query string.
    pub fn inject_headers(&self, routed: &RoutedPath) -> Vec<(&'static str, String)> {
        let mut headers = Vec::new();
        let carried_in_query = self
            .rewriter
            .as_ref()
            .map(|r| r.carrier() == OrgCarrier::QueryParam)
            .unwrap_or(false);

        if let Some(org) = &routed.org {
            if !carried_in_query {
                headers.push(("org", org.clone()));
            }
        }
        headers
    }

    /// Full upstream URL for a routed path, honouring a base path on the target.
    pub fn upstream_url(&self, routed: &RoutedPath) -> String {
        let base = self.target.as_str().trim_end_matches('/');
        format!("{}{}", base, routed.path_and_query())
    }
}
