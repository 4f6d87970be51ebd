//! Response Writer (§4.6): JSON-encodes the dispatch value into the
//! accumulated response buffer, skipping encoding when a prior stage
//! (hijacker, postprocessor, or an interceptor error) already claimed
//! the body.

use serde_json::Value;

use crate::context::GatewayResponse;

pub const DEFAULT_CONTENT_TYPE: &str = "application/json; charset=utf-8";

/// Write `value` into `res` unless the response has already been claimed
/// by a component. Sets the default JSON content type when it writes.
pub fn write_if_unclaimed(res: &mut GatewayResponse, value: &Value) {
    if res.is_claimed() {
        return;
    }
    res.headers.push(("Content-Type".to_string(), DEFAULT_CONTENT_TYPE.to_string()));
    let encoded = serde_json::to_string(value).unwrap_or_else(|_| "null".to_string());
    res.write_str(&encoded);
    res.claim();
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn encodes_when_unclaimed() {
        let mut res = GatewayResponse::new();
        write_if_unclaimed(&mut res, &serde_json::json!({"message": "hi"}));
        assert_eq!(res.body_str(), "{\"message\":\"hi\"}");
    }

    #[test]
    fn skips_when_already_claimed() {
        let mut res = GatewayResponse::new();
        res.write_str("hijacker");
        res.claim();
        write_if_unclaimed(&mut res, &serde_json::json!({"message": "hi"}));
        assert_eq!(res.body_str(), "hijacker");
    }
}
