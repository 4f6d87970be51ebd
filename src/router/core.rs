//! Route Matcher — hot path for request routing.
//!
//! Endpoints are compiled once at registration/reload and matched in
//! registration order, first match wins (§4.1). This intentionally does
//! not use a radix tree: the specification requires simple registration
//! order tie-breaking, not longest-prefix optimization, so a plain
//! ordered scan over pre-compiled regexes is the correct algorithm here.

use std::sync::Arc;

use http::Method;
use regex::Regex;
use smallvec::SmallVec;
use tracing::{debug, warn};

/// Maximum path variables kept inline before `ParamVec` spills to the heap.
pub const MAX_INLINE_PARAMS: usize = 8;

/// Stack-allocated (name, value) pairs extracted from a matched path.
pub type ParamVec = SmallVec<[(Arc<str>, String); MAX_INLINE_PARAMS]>;

/// One logical HTTP route (§3 Endpoint). Immutable once built.
#[derive(Debug, Clone)]
pub struct Endpoint {
    pub methods: Vec<Method>,
    pub path_pattern: String,
    pub rpc_method: String,
    regex: Regex,
    param_names: Vec<Arc<str>>,
}

impl Endpoint {
    pub fn new(methods: Vec<Method>, path_pattern: &str, rpc_method: &str) -> anyhow::Result<Self> {
        let (regex, param_names) = compile_pattern(path_pattern)?;
        Ok(Endpoint {
            methods,
            path_pattern: path_pattern.to_string(),
            rpc_method: rpc_method.to_string(),
            regex,
            param_names,
        })
    }

    fn allows(&self, method: &Method) -> bool {
        self.methods.iter().any(|m| m == method)
    }
}

/// Compile a path pattern with `{name:regex}` captures into an anchored
/// regex plus the ordered list of variable names. A bare `{name}` defaults
/// to `[^/]+`.
pub fn compile_pattern(pattern: &str) -> anyhow::Result<(Regex, Vec<Arc<str>>)> {
    if pattern == "/" {
        return Ok((Regex::new(r"^/$")?, Vec::new()));
    }

    let mut out = String::with_capacity(pattern.len() + 8);
    out.push('^');
    let mut names = Vec::new();

    for segment in pattern.split('/') {
        if segment.is_empty() {
            continue;
        }
        out.push('/');
        if let Some(inner) = segment.strip_prefix('{').and_then(|s| s.strip_suffix('}')) {
            let (name, seg_regex) = match inner.split_once(':') {
                Some((n, r)) => (n, r),
                None => (inner, "[^/]+"),
            };
            names.push(Arc::<str>::from(name));
            out.push_str("(?:");
            out.push_str(seg_regex);
            out.push(')');
        } else {
            out.push_str(&regex::escape(segment));
        }
    }
    out.push('$');

    Ok((Regex::new(&out)?, names))
}

/// Outcome of a route lookup (§4.1): a successful match, or one of the two
/// ways a path can fail to resolve, both surfaced as the platform 404 by
/// the server layer (§8 scenario: POST to a GET-only route returns the
/// same body as an unmatched path).
pub enum RouteResult {
    Matched {
        endpoint: Arc<Endpoint>,
        path_params: ParamVec,
    },
    NotFound,
    MethodNotAllowed,
}

/// Ordered table of endpoints, matched in registration order.
#[derive(Clone, Default)]
pub struct Router {
    endpoints: Vec<Arc<Endpoint>>,
}

impl Router {
    pub fn new(endpoints: Vec<Endpoint>) -> Self {
        Router {
            endpoints: endpoints.into_iter().map(Arc::new).collect(),
        }
    }

    pub fn route(&self, method: &Method, path: &str) -> RouteResult {
        debug!(%method, %path, "route match attempt");

        let mut path_matched_other_method = false;
        for endpoint in &self.endpoints {
            let Some(captures) = endpoint.regex.captures(path) else {
                continue;
            };
            if !endpoint.allows(method) {
                path_matched_other_method = true;
                continue;
            }
            let mut params = ParamVec::new();
            for (idx, name) in endpoint.param_names.iter().enumerate() {
                if let Some(m) = captures.get(idx + 1) {
                    params.push((name.clone(), m.as_str().to_string()));
                }
            }
            debug!(%method, %path, handler = %endpoint.rpc_method, "route matched");
            return RouteResult::Matched {
                endpoint: endpoint.clone(),
                path_params: params,
            };
        }

        if path_matched_other_method {
            warn!(%method, %path, "path matched but method not allowed");
            RouteResult::MethodNotAllowed
        } else {
            warn!(%method, %path, "no route matched");
            RouteResult::NotFound
        }
    }

    pub fn endpoints(&self) -> &[Arc<Endpoint>] {
        &self.endpoints
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn endpoint(methods: &[Method], pattern: &str) -> Endpoint {
        Endpoint::new(methods.to_vec(), pattern, "SayHello").unwrap()
    }

    #[test]
    fn matches_named_capture() {
        let router = Router::new(vec![endpoint(&[Method::GET], "/hello/{your_name}")]);
        match router.route(&Method::GET, "/hello/testtest") {
            RouteResult::Matched { path_params, .. } => {
                assert_eq!(path_params[0].1, "testtest");
            }
            _ => panic!("expected match"),
        }
    }

    #[test]
    fn registration_order_wins_on_overlap() {
        let router = Router::new(vec![
            endpoint(&[Method::GET], "/hello/{a}"),
            endpoint(&[Method::GET], "/hello/{b:[a-z]+}"),
        ]);
        match router.route(&Method::GET, "/hello/testtest") {
            RouteResult::Matched { endpoint, .. } => {
                assert_eq!(endpoint.path_pattern, "/hello/{a}");
            }
            _ => panic!("expected match"),
        }
    }

    #[test]
    fn post_to_get_only_route_is_not_found() {
        let router = Router::new(vec![endpoint(&[Method::GET], "/hello/{your_name}")]);
        assert!(matches!(
            router.route(&Method::POST, "/hello/testtest"),
            RouteResult::MethodNotAllowed
        ));
    }

    #[test]
    fn unmatched_path_is_not_found() {
        let router = Router::new(vec![endpoint(&[Method::GET], "/hello/{your_name}")]);
        assert!(matches!(
            router.route(&Method::GET, "/goodbye"),
            RouteResult::NotFound
        ));
    }

    #[test]
    fn regex_constrained_segment_rejects_non_matching_chars() {
        let router = Router::new(vec![endpoint(
            &[Method::GET],
            "/hello/{your_name:[a-zA-Z0-9]+}",
        )]);
        assert!(matches!(
            router.route(&Method::GET, "/hello/test test"),
            RouteResult::NotFound
        ));
    }
}
