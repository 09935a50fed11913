use thiserror::Error;

// --- Access Policy Core ---
//
// Pure request classification. Nothing in this module performs I/O: the middleware in
// lib.rs resolves the session, asks `AccessPolicy::decide` what to do, and turns the
// answer into a response.

/// PolicyError
///
/// Raised while building an `AccessPolicy` from route pattern strings.
/// Decisions themselves never fail.
#[derive(Debug, Error, PartialEq, Eq)]
pub enum PolicyError {
    #[error("route pattern `{0}` must start with '/'")]
    MissingLeadingSlash(String),

    #[error("route pattern `{0}` has a wildcard before its last segment")]
    WildcardNotLast(String),

    #[error("public API pattern `{pattern}` is outside the API prefix `{prefix}`")]
    ApiPatternOutsidePrefix { pattern: String, prefix: String },
}

/// Session
///
/// The caller's resolved identity for one request. Produced by the identity provider
/// (see `auth::resolve_session`) and never stored.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Session {
    Authenticated(String),
    Anonymous,
}

impl Session {
    pub fn user_id(&self) -> Option<&str> {
        match self {
            Session::Authenticated(id) => Some(id),
            Session::Anonymous => None,
        }
    }

    pub fn is_authenticated(&self) -> bool {
        matches!(self, Session::Authenticated(_))
    }
}

/// AccessDecision
///
/// Outcome of evaluating one request. Computed fresh per request.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AccessDecision {
    Allow,
    RedirectToSignIn,
    RedirectToHome,
}

#[derive(Debug, Clone, PartialEq, Eq)]
enum Segment {
    /// Exact segment text, compared ASCII case-insensitively.
    Literal(String),
    /// `:name`, any single non-empty segment.
    Param,
    /// `*`, zero or more remaining segments.
    Rest,
    /// `text(.*)`, a segment starting with `text` followed by anything at all.
    Suffix(String),
}

/// RoutePattern
///
/// A single path matcher. Supported syntax:
///
/// * `/sign-in` literal segments
/// * `/videos/:id` single-segment parameters
/// * `/docs/*` trailing rest wildcard (matches `/docs` too)
/// * `/sign-in(.*)` trailing suffix wildcard (matches `/sign-in`, `/sign-in/sso`, `/sign-inx`)
///
/// A single trailing slash on the request path is ignored. Paths that do not start with
/// `/` or contain empty segments never match.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RoutePattern {
    segments: Vec<Segment>,
}

impl RoutePattern {
    pub fn parse(pattern: &str) -> Result<Self, PolicyError> {
        let body = pattern
            .strip_prefix('/')
            .ok_or_else(|| PolicyError::MissingLeadingSlash(pattern.to_string()))?;

        let raw: Vec<&str> = if body.is_empty() {
            Vec::new()
        } else {
            body.trim_end_matches('/').split('/').collect()
        };

        let mut segments = Vec::with_capacity(raw.len());
        for (index, part) in raw.iter().enumerate() {
            let segment = if *part == "*" {
                Segment::Rest
            } else if let Some(prefix) = part.strip_suffix("(.*)") {
                Segment::Suffix(prefix.to_ascii_lowercase())
            } else if part.starts_with(':') && part.len() > 1 {
                Segment::Param
            } else {
                Segment::Literal(part.to_ascii_lowercase())
            };

            let is_wildcard = matches!(segment, Segment::Rest | Segment::Suffix(_));
            if is_wildcard && index + 1 != raw.len() {
                return Err(PolicyError::WildcardNotLast(pattern.to_string()));
            }
            segments.push(segment);
        }

        Ok(Self { segments })
    }

    pub fn matches(&self, path: &str) -> bool {
        let Some(path_segments) = split_path(path) else {
            return false;
        };

        let mut remaining = path_segments.as_slice();
        for segment in &self.segments {
            match segment {
                Segment::Rest => return true,
                Segment::Suffix(prefix) => {
                    return match remaining.first() {
                        Some(first) => starts_with_ignore_case(first, prefix),
                        // `/docs/(.*)` covers `/docs` as well.
                        None => prefix.is_empty(),
                    };
                }
                Segment::Param => match remaining.split_first() {
                    Some((_, rest)) => remaining = rest,
                    None => return false,
                },
                Segment::Literal(text) => match remaining.split_first() {
                    Some((first, rest)) if first.eq_ignore_ascii_case(text) => remaining = rest,
                    _ => return false,
                },
            }
        }

        remaining.is_empty()
    }
}

/// Splits `/a/b/` into `["a", "b"]`. Returns `None` for malformed paths.
fn split_path(path: &str) -> Option<Vec<&str>> {
    let body = path.strip_prefix('/')?;
    if body.is_empty() {
        return Some(Vec::new());
    }

    let body = body.strip_suffix('/').unwrap_or(body);
    let segments: Vec<&str> = body.split('/').collect();
    if segments.iter().any(|segment| segment.is_empty()) {
        return None;
    }
    Some(segments)
}

fn starts_with_ignore_case(segment: &str, prefix: &str) -> bool {
    segment.len() >= prefix.len()
        && segment.is_char_boundary(prefix.len())
        && segment[..prefix.len()].eq_ignore_ascii_case(prefix)
}

/// RouteSet
///
/// An ordered collection of patterns with "any member matches" semantics.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct RouteSet {
    patterns: Vec<RoutePattern>,
}

impl RouteSet {
    pub fn parse<I, S>(patterns: I) -> Result<Self, PolicyError>
    where
        I: IntoIterator<Item = S>,
        S: AsRef<str>,
    {
        let patterns = patterns
            .into_iter()
            .map(|pattern| RoutePattern::parse(pattern.as_ref()))
            .collect::<Result<Vec<_>, _>>()?;
        Ok(Self { patterns })
    }

    pub fn matches(&self, path: &str) -> bool {
        self.patterns.iter().any(|pattern| pattern.matches(path))
    }
}

pub const DEFAULT_PUBLIC_ROUTES: [&str; 3] = ["/", "/sign-in", "/sign-up"];
pub const DEFAULT_PUBLIC_API_ROUTES: [&str; 1] = ["/api/videos"];
pub const DEFAULT_HOME_PATH: &str = "/home";
pub const DEFAULT_SIGN_IN_PATH: &str = "/sign-in";
pub const DEFAULT_API_PREFIX: &str = "/api";

/// AccessPolicy
///
/// Fixed access-control configuration plus the evaluator over it. Built once at
/// startup, shared as `Arc<AccessPolicy>` and never mutated, so concurrent requests
/// evaluate it without locking.
#[derive(Debug, Clone)]
pub struct AccessPolicy {
    public_routes: RouteSet,
    public_api_routes: RouteSet,
    home_path: String,
    sign_in_path: String,
    api_prefix: String,
    evaluated_prefixes: Vec<String>,
}

impl Default for AccessPolicy {
    fn default() -> Self {
        Self::builder()
            .build()
            .expect("default access policy is well-formed")
    }
}

impl AccessPolicy {
    pub fn builder() -> AccessPolicyBuilder {
        AccessPolicyBuilder::default()
    }

    pub fn home_path(&self) -> &str {
        &self.home_path
    }

    pub fn sign_in_path(&self) -> &str {
        &self.sign_in_path
    }

    pub fn api_prefix(&self) -> &str {
        &self.api_prefix
    }

    pub fn is_api_request(&self, path: &str) -> bool {
        path.starts_with(&self.api_prefix)
    }

    /// should_evaluate
    ///
    /// Static assets (any path containing a `.`) and framework internals under `/_next`
    /// bypass the policy entirely. API requests, and paths under any of the builder's
    /// `evaluated_prefixes` (e.g. an RPC mount such as `/trpc`), are always evaluated.
    /// No RPC prefix is registered by default since this server mounts none.
    pub fn should_evaluate(&self, path: &str) -> bool {
        let always = self.is_api_request(path)
            || self
                .evaluated_prefixes
                .iter()
                .any(|prefix| path.starts_with(prefix.as_str()));

        always || !(path.contains('.') || path.starts_with("/_next"))
    }

    /// decide
    ///
    /// Evaluates one request. Rules apply in order and the first match wins:
    ///
    /// 1. A signed-in caller on a public page other than the home page is sent home.
    /// 2. An anonymous caller is sent to sign-in when the path is neither a public page
    ///    nor a public API route, or when it is an API request outside the public API
    ///    routes.
    /// 3. Everything else is allowed.
    pub fn decide(&self, path: &str, is_api_request: bool, session: &Session) -> AccessDecision {
        let is_public = self.public_routes.matches(path);

        match session {
            Session::Authenticated(_) => {
                if is_public && path != self.home_path {
                    return AccessDecision::RedirectToHome;
                }
            }
            Session::Anonymous => {
                let is_public_api = self.public_api_routes.matches(path);
                if !is_public && !is_public_api {
                    return AccessDecision::RedirectToSignIn;
                }
                // Only reachable when a public page pattern covers an API path; API access
                // for anonymous callers is governed by the public API routes alone.
                if is_api_request && !is_public_api {
                    return AccessDecision::RedirectToSignIn;
                }
            }
        }

        AccessDecision::Allow
    }
}

/// AccessPolicyBuilder
///
/// Starts from the application defaults; each setter replaces one piece.
#[derive(Debug, Clone)]
pub struct AccessPolicyBuilder {
    public_routes: Vec<String>,
    public_api_routes: Vec<String>,
    home_path: String,
    sign_in_path: String,
    api_prefix: String,
    evaluated_prefixes: Vec<String>,
}

impl Default for AccessPolicyBuilder {
    fn default() -> Self {
        Self {
            public_routes: DEFAULT_PUBLIC_ROUTES.iter().map(|r| r.to_string()).collect(),
            public_api_routes: DEFAULT_PUBLIC_API_ROUTES
                .iter()
                .map(|r| r.to_string())
                .collect(),
            home_path: DEFAULT_HOME_PATH.to_string(),
            sign_in_path: DEFAULT_SIGN_IN_PATH.to_string(),
            api_prefix: DEFAULT_API_PREFIX.to_string(),
            evaluated_prefixes: Vec::new(),
        }
    }
}

impl AccessPolicyBuilder {
    pub fn public_routes<I, S>(mut self, routes: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.public_routes = routes.into_iter().map(Into::into).collect();
        self
    }

    pub fn public_api_routes<I, S>(mut self, routes: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.public_api_routes = routes.into_iter().map(Into::into).collect();
        self
    }

    pub fn home_path(mut self, path: impl Into<String>) -> Self {
        self.home_path = path.into();
        self
    }

    pub fn sign_in_path(mut self, path: impl Into<String>) -> Self {
        self.sign_in_path = path.into();
        self
    }

    pub fn api_prefix(mut self, prefix: impl Into<String>) -> Self {
        self.api_prefix = prefix.into();
        self
    }

    /// Extra path prefixes that always go through the policy, static-looking or not.
    pub fn evaluated_prefixes<I, S>(mut self, prefixes: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.evaluated_prefixes = prefixes.into_iter().map(Into::into).collect();
        self
    }

    pub fn build(self) -> Result<AccessPolicy, PolicyError> {
        let paths = [&self.home_path, &self.sign_in_path, &self.api_prefix]
            .into_iter()
            .chain(&self.evaluated_prefixes);
        for path in paths {
            if !path.starts_with('/') {
                return Err(PolicyError::MissingLeadingSlash(path.clone()));
            }
        }

        // Public API routes must stay a subset of the API routes.
        if let Some(outside) = self
            .public_api_routes
            .iter()
            .find(|pattern| !pattern.starts_with(&self.api_prefix))
        {
            return Err(PolicyError::ApiPatternOutsidePrefix {
                pattern: outside.clone(),
                prefix: self.api_prefix.clone(),
            });
        }

        Ok(AccessPolicy {
            public_routes: RouteSet::parse(&self.public_routes)?,
            public_api_routes: RouteSet::parse(&self.public_api_routes)?,
            home_path: self.home_path,
            sign_in_path: self.sign_in_path,
            api_prefix: self.api_prefix,
            evaluated_prefixes: self.evaluated_prefixes,
        })
    }
}
