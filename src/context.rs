//! The request/response values threaded through the Pipeline Executor.
//!
//! `GatewayResponse` is a raw byte accumulator rather than a structured
//! body: components (interceptors, preprocessor, postprocessor, hijacker)
//! write directly into it, and those writes interleave with the
//! JSON-encoded RPC result, matching the observed test oracles where a
//! `Before` hook's prefix and an `After` hook's suffix both end up
//! concatenated around the dispatch body (§8).

use std::collections::HashMap;
use std::sync::Arc;

use http::Method;
use serde_json::Value;

use crate::router::{Endpoint, ParamVec};

/// Request state visible to every pipeline stage. `context` is the slot
/// interceptors populate for downstream Parameter Resolver lookups (§4.3
/// source 4); it is a plain string-keyed map since context values arrive
/// as strings from HTTP sources and int/bool/float parsing happens
/// identically to other scalar sources.
#[derive(Debug, Clone)]
pub struct GatewayRequest {
    pub method: Method,
    pub path: String,
    pub endpoint: Arc<Endpoint>,
    pub path_params: ParamVec,
    pub query_params: ParamVec,
    pub headers: Vec<(String, String)>,
    pub cookies: Vec<(String, String)>,
    pub body: Option<Value>,
    pub context: HashMap<String, String>,
}

/// Field names are matched case- and underscore-insensitively: a query
/// key `yourname` binds the same field as `your_name` or `YourName`.
/// This mirrors the observed behavior of case-duplicate query params
/// resolving to one RPC argument (§8: `your_name`/`yourname` dedupe to
/// the same `YourName` field, last occurrence wins).
fn normalize(name: &str) -> String {
    name.chars().filter(|c| *c != '_').flat_map(char::to_lowercase).collect()
}

impl GatewayRequest {
    pub fn path_param(&self, name: &str) -> Option<&str> {
        let target = normalize(name);
        self.path_params
            .iter()
            .rfind(|(k, _)| normalize(k) == target)
            .map(|(_, v)| v.as_str())
    }

    pub fn query_param(&self, name: &str) -> Option<&str> {
        let target = normalize(name);
        self.query_params
            .iter()
            .rfind(|(k, _)| normalize(k) == target)
            .map(|(_, v)| v.as_str())
    }

    pub fn header(&self, name: &str) -> Option<&str> {
        let target = normalize(name);
        self.headers
            .iter()
            .find(|(k, _)| normalize(k) == target)
            .map(|(_, v)| v.as_str())
    }

    pub fn context_value(&self, name: &str) -> Option<&str> {
        let target = normalize(name);
        self.context
            .iter()
            .find(|(k, _)| normalize(k) == target)
            .map(|(_, v)| v.as_str())
    }

    pub fn set_context(&mut self, name: impl Into<String>, value: impl Into<String>) {
        self.context.insert(name.into(), value.into());
    }
}

/// Accumulated response bytes plus status/headers. Components append to
/// the buffer; the Response Writer only encodes the dispatch value when
/// no component has already claimed the body (§4.6).
#[derive(Debug, Default)]
pub struct GatewayResponse {
    pub status: u16,
    pub headers: Vec<(String, String)>,
    buffer: Vec<u8>,
    claimed: bool,
}

impl GatewayResponse {
    pub fn new() -> Self {
        GatewayResponse {
            status: 200,
            headers: Vec::new(),
            buffer: Vec::new(),
            claimed: false,
        }
    }

    /// Append raw text, as an interceptor's `Before`/`After` hook would.
    pub fn write_str(&mut self, s: &str) {
        self.buffer.extend_from_slice(s.as_bytes());
    }

    /// A hijacker/postprocessor writing its own body claims the response:
    /// the Response Writer then skips its own JSON encoding (§4.6).
    pub fn claim(&mut self) {
        self.claimed = true;
    }

    pub fn is_claimed(&self) -> bool {
        self.claimed
    }

    pub fn has_body(&self) -> bool {
        !self.buffer.is_empty()
    }

    pub fn into_bytes(self) -> Vec<u8> {
        self.buffer
    }

    pub fn body_bytes(&self) -> &[u8] {
        &self.buffer
    }

    pub fn body_str(&self) -> std::borrow::Cow<'_, str> {
        String::from_utf8_lossy(&self.buffer)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn writes_accumulate_in_order() {
        let mut res = GatewayResponse::new();
        res.write_str("intercepted:");
        res.write_str("{\"message\":\"hi\"}");
        res.write_str(":after_error:");
        assert_eq!(res.body_str(), "intercepted:{\"message\":\"hi\"}:after_error:");
    }

    #[test]
    fn context_lookup_is_case_insensitive() {
        let mut ctx = HashMap::new();
        ctx.insert("Bool_Value".to_string(), "true".to_string());
        let req = GatewayRequest {
            method: Method::GET,
            path: "/x".into(),
            endpoint: Arc::new(Endpoint::new(vec![Method::GET], "/x", "M").unwrap()),
            path_params: ParamVec::new(),
            query_params: ParamVec::new(),
            headers: Vec::new(),
            cookies: Vec::new(),
            body: None,
            context: ctx,
        };
        assert_eq!(req.context_value("bool_value"), Some("true"));
    }
}
