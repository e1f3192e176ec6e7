//! Declarative exemption tables.
//!
//! # Responsibilities
//! - Describe which (method, path) pairs skip a pipeline stage
//! - Evaluate a table in a single ordered pass
//!
//! # Design Decisions
//! - Path matching is case-sensitive
//! - No regex: exact, prefix and suffix patterns only
//! - Deterministic: same input always yields the same answer

use axum::http::Method;

/// How a rule matches the request path.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum PathPattern {
    /// Any path.
    Any,
    Exact(String),
    Prefix(String),
    Suffix(String),
}

impl PathPattern {
    pub fn matches(&self, path: &str) -> bool {
        match self {
            PathPattern::Any => true,
            PathPattern::Exact(p) => path == p,
            PathPattern::Prefix(p) => path.starts_with(p.as_str()),
            PathPattern::Suffix(p) => path.ends_with(p.as_str()),
        }
    }
}

/// Which request methods a rule applies to.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum MethodSet {
    Any,
    Only(Vec<Method>),
}

impl MethodSet {
    pub fn contains(&self, method: &Method) -> bool {
        match self {
            MethodSet::Any => true,
            MethodSet::Only(methods) => methods.contains(method),
        }
    }
}

/// A single (method-set, path-pattern) exemption.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ExemptionRule {
    pub methods: MethodSet,
    pub pattern: PathPattern,
}

impl ExemptionRule {
    pub fn new(methods: MethodSet, pattern: PathPattern) -> Self {
        Self { methods, pattern }
    }

    /// Exempt a path for every method.
    pub fn path(pattern: PathPattern) -> Self {
        Self::new(MethodSet::Any, pattern)
    }

    /// Exempt every path for the given methods.
    pub fn methods(methods: impl IntoIterator<Item = Method>) -> Self {
        Self::new(MethodSet::Only(methods.into_iter().collect()), PathPattern::Any)
    }

    pub fn matches(&self, method: &Method, path: &str) -> bool {
        self.methods.contains(method) && self.pattern.matches(path)
    }
}

/// An ordered list of rules; a request is exempt when any rule matches.
#[derive(Debug, Clone, Default)]
pub struct ExemptionTable {
    rules: Vec<ExemptionRule>,
}

impl ExemptionTable {
    pub fn new(rules: Vec<ExemptionRule>) -> Self {
        Self { rules }
    }

    pub fn matches(&self, method: &Method, path: &str) -> bool {
        self.rules.iter().any(|rule| rule.matches(method, path))
    }

    pub fn rules(&self) -> &[ExemptionRule] {
        &self.rules
    }

    /// Requests that skip CSRF enforcement: the auth bootstrap endpoints
    /// plus every safe-method request.
    pub fn csrf_default() -> Self {
        let mut rules = auth_bootstrap_rules();
        rules.push(ExemptionRule::methods([Method::GET, Method::HEAD]));
        Self::new(rules)
    }

    /// Requests that do not need a session: the auth bootstrap endpoints
    /// and the health check.
    pub fn public_default() -> Self {
        let mut rules = auth_bootstrap_rules();
        rules.push(ExemptionRule::path(PathPattern::Exact("/health".into())));
        Self::new(rules)
    }
}

fn auth_bootstrap_rules() -> Vec<ExemptionRule> {
    vec![
        ExemptionRule::path(PathPattern::Suffix("/auth/csrf".into())),
        ExemptionRule::path(PathPattern::Prefix("/auth/login".into())),
        ExemptionRule::path(PathPattern::Prefix("/auth/signup".into())),
        ExemptionRule::path(PathPattern::Prefix("/auth/verify-email".into())),
        ExemptionRule::path(PathPattern::Prefix("/auth/reset".into())),
        ExemptionRule::path(PathPattern::Prefix("/auth/logout".into())),
    ]
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_path_patterns() {
        assert!(PathPattern::Exact("/health".into()).matches("/health"));
        assert!(!PathPattern::Exact("/health".into()).matches("/health/db"));
        assert!(PathPattern::Prefix("/auth/login".into()).matches("/auth/login/mfa"));
        assert!(!PathPattern::Prefix("/auth/login".into()).matches("/api/auth/login"));
        assert!(PathPattern::Suffix("/auth/csrf".into()).matches("/api/v1/auth/csrf"));
        assert!(!PathPattern::Suffix("/auth/csrf".into()).matches("/auth/csrf/x"));
    }

    #[test]
    fn test_csrf_default_table() {
        let table = ExemptionTable::csrf_default();

        assert!(table.matches(&Method::POST, "/auth/login"));
        assert!(table.matches(&Method::POST, "/auth/signup"));
        assert!(table.matches(&Method::POST, "/auth/verify-email/abc"));
        assert!(table.matches(&Method::POST, "/auth/reset-password"));
        assert!(table.matches(&Method::POST, "/auth/logout"));
        assert!(table.matches(&Method::GET, "/api/auth/csrf"));
        assert!(table.matches(&Method::GET, "/classrooms"));
        assert!(table.matches(&Method::HEAD, "/classrooms"));

        assert!(!table.matches(&Method::POST, "/classrooms"));
        assert!(!table.matches(&Method::DELETE, "/assignments/4"));
        assert!(!table.matches(&Method::PATCH, "/me"));
    }

    #[test]
    fn test_public_default_table() {
        let table = ExemptionTable::public_default();

        assert!(table.matches(&Method::GET, "/health"));
        assert!(table.matches(&Method::GET, "/auth/csrf"));
        assert!(table.matches(&Method::POST, "/auth/login"));

        // safe methods still need a session
        assert!(!table.matches(&Method::GET, "/me"));
        assert!(!table.matches(&Method::GET, "/health/details"));
    }

    #[test]
    fn test_method_restricted_rule() {
        let rule = ExemptionRule::new(
            MethodSet::Only(vec![Method::POST]),
            PathPattern::Prefix("/webhooks".into()),
        );
        assert!(rule.matches(&Method::POST, "/webhooks/stripe"));
        assert!(!rule.matches(&Method::PUT, "/webhooks/stripe"));
        assert!(!rule.matches(&Method::POST, "/classrooms"));
    }
}
