//! Route lookup and dispatch.
//!
//! # Responsibilities
//! - Build the fixed, ordered routing table from resolved configuration
//! - Look up the first matching rule for a request
//! - Return matched rule or explicit no-match
//!
//! # Design Decisions
//! - Immutable after construction (thread-safe without locks)
//! - O(n) linear scan in registration order, first match wins
//! - Order is most specific first; `/api/uc` sits before `/api`
//! - Explicit no-match (static files, then SPA fallback) rather than a default rule

use crate::config::ResolvedConfig;
use crate::routing::matcher::{
    AndMatcher, ExactPathMatcher, OrMatcher, PathPatternMatcher, PathPrefixMatcher, RequestHead,
    UserAgentMatcher,
};
use crate::routing::org_path::{OrgCarrier, OrgPathRewriter};
use crate::routing::rule::{ProxyRule, RuleId};
use crate::routing::upgrade::WebSocketMatcher;

/// Ordered dispatch table.
#[derive(Debug)]
pub struct Router {
    rules: Vec<ProxyRule>,
}

impl Router {
    /// Create a router from an already ordered rule list.
    pub fn new(rules: Vec<ProxyRule>) -> Self {
        Self { rules }
    }

    /// Build the platform routing table.
    ///
    /// Registration order:
    /// 1. static admin UI, 2. fast-data UI, 3. combined WebSocket rule,
    /// 4. user-center API, 5. generic API, 6. Git smart-HTTP, 7. fixed paths.
    pub fn from_config(config: &ResolvedConfig) -> Self {
        let upstreams = &config.upstreams;
        let mut rules = Vec::with_capacity(7);

        let org_rewriter = |carrier| {
            config.org_rewrite.enabled.then(|| {
                OrgPathRewriter::new(config.org_rewrite.exempt_prefixes.clone(), carrier)
            })
        };

        if let Some(target) = &upstreams.enterprise_ui {
            rules.push(ProxyRule::new(
                RuleId::StaticAdmin,
                PathPrefixMatcher::new("/static/admin"),
                target.clone(),
            ));
        }

        if let Some(target) = &upstreams.fdp_ui {
            rules.push(ProxyRule::new(
                RuleId::StaticFdp,
                PathPrefixMatcher::new("/static/fdp"),
                target.clone(),
            ));
        }

        let mut websocket = ProxyRule::new(
            RuleId::WebSocket,
            WebSocketMatcher::new(),
            upstreams.api.clone(),
        )
        .for_websocket();
        if let Some(rewriter) = org_rewriter(OrgCarrier::QueryParam) {
            websocket = websocket.with_rewriter(rewriter);
        }
        rules.push(websocket);

        rules.push(ProxyRule::new(
            RuleId::UserCenter,
            PathPrefixMatcher::new("/api/uc"),
            upstreams.uc.clone(),
        ));

        let mut api = ProxyRule::new(RuleId::Api, PathPrefixMatcher::new("/api"), upstreams.api.clone());
        if let Some(rewriter) = org_rewriter(OrgCarrier::Header) {
            api = api.with_rewriter(rewriter);
        }
        rules.push(api);

        let git_client = AndMatcher::new(vec![
            Box::new(UserAgentMatcher::new(config.git.user_agent_signatures.clone())),
            Box::new(PathPatternMatcher::new(config.git.repo_path.clone())),
        ]);
        rules.push(
            ProxyRule::new(
                RuleId::Git,
                OrMatcher::new(vec![
                    Box::new(PathPrefixMatcher::any_of(config.git.path_prefixes.clone())),
                    Box::new(git_client),
                ]),
                upstreams.git.clone(),
            )
            .preserving_host(),
        );

        if !config.fixed_paths.is_empty() {
            rules.push(ProxyRule::new(
                RuleId::FixedPath,
                ExactPathMatcher::new(config.fixed_paths.clone()),
                upstreams.api.clone(),
            ));
        }

        let router = Self::new(rules);
        tracing::info!(rules = ?router.rule_ids(), "Routing table built");
        router
    }

    /// First rule whose predicate matches, or `None` for no-route.
    pub fn match_request(&self, req: &RequestHead<'_>) -> Option<&ProxyRule> {
        self.rules.iter().find(|rule| rule.matches(req))
    }

    /// Rule identifiers in evaluation order.
    pub fn rule_ids(&self) -> Vec<RuleId> {
        self.rules.iter().map(|r| r.id).collect()
    }
}
