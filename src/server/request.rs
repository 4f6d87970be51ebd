//! HTTP request parsing — hot path module, adapted from the reference
//! framework's `server::request` (method/header/cookie/query extraction
//! against `may_minihttp::Request`), trimmed to what the Pipeline
//! Executor needs as an [`IncomingRequest`].

use std::io::Read;
use std::sync::Arc;

use http::Method;
use may_minihttp::Request;
use tracing::debug;

use crate::pipeline::IncomingRequest;
use crate::router::ParamVec;

/// Body binding is only in scope for POST/PUT requests carrying an
/// `application/json` content type (§4.3 source 5, §6); anything else
/// (a GET with a body, a `text/plain` payload that happens to parse as
/// JSON) is left unbound.
fn accepts_json_body(method: &Method, headers: &[(String, String)]) -> bool {
    if !matches!(*method, Method::POST | Method::PUT) {
        return false;
    }
    headers
        .iter()
        .find(|(k, _)| k.eq_ignore_ascii_case("content-type"))
        .is_some_and(|(_, v)| v.split(';').next().unwrap_or("").trim().eq_ignore_ascii_case("application/json"))
}

/// Extract cookies from a `Cookie` header value.
pub fn parse_cookies(headers: &[(String, String)]) -> Vec<(String, String)> {
    let cookie_value = headers
        .iter()
        .find(|(k, _)| k.eq_ignore_ascii_case("cookie"))
        .map(|(_, v)| v.as_str());

    match cookie_value {
        Some(c) => c
            .split(';')
            .filter_map(|pair| {
                let mut parts = pair.trim().splitn(2, '=');
                let name = parts.next()?.trim().to_string();
                let value = parts.next().unwrap_or("").trim().to_string();
                Some((name, value))
            })
            .collect(),
        None => Vec::new(),
    }
}

/// Parse query-string parameters from a full request path.
pub fn parse_query_params(path: &str) -> ParamVec {
    if let Some(pos) = path.find('?') {
        let query_str = &path[pos + 1..];
        url::form_urlencoded::parse(query_str.as_bytes())
            .map(|(k, v)| (Arc::<str>::from(k.as_ref()), v.to_string()))
            .collect()
    } else {
        ParamVec::new()
    }
}

/// Parse a raw `may_minihttp::Request` into the pipeline's incoming
/// request shape. Rejects an unparseable HTTP method rather than
/// defaulting to GET.
pub fn parse_request(req: Request) -> Result<IncomingRequest, String> {
    let method_str = req.method();
    let method = method_str.parse().map_err(|_| method_str.to_string())?;
    let raw_path = req.path().to_string();
    let path = raw_path.split('?').next().unwrap_or("/").to_string();

    let headers: Vec<(String, String)> = req
        .headers()
        .iter()
        .map(|h| (h.name.to_ascii_lowercase(), String::from_utf8_lossy(h.value).to_string()))
        .collect();

    let cookies = parse_cookies(&headers);
    let query_params = parse_query_params(&raw_path);

    let body = if accepts_json_body(&method, &headers) {
        let mut body_str = String::new();
        match req.body().read_to_string(&mut body_str) {
            Ok(size) if size > 0 => serde_json::from_str(&body_str).ok(),
            _ => None,
        }
    } else {
        None
    };

    debug!(%method, %path, header_count = headers.len(), "http request parsed");

    Ok(IncomingRequest {
        method,
        path,
        headers,
        cookies,
        query_params,
        body,
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parses_cookies() {
        let headers = vec![("cookie".to_string(), "a=b; c=d".to_string())];
        let cookies = parse_cookies(&headers);
        assert_eq!(cookies, vec![("a".to_string(), "b".to_string()), ("c".to_string(), "d".to_string())]);
    }

    #[test]
    fn parses_query_params() {
        let params = parse_query_params("/hello?your_name=turbo&yourname=xxx");
        let values: Vec<_> = params.iter().map(|(k, v)| (k.to_string(), v.clone())).collect();
        assert_eq!(
            values,
            vec![("your_name".to_string(), "turbo".to_string()), ("yourname".to_string(), "xxx".to_string())]
        );
    }

    #[test]
    fn json_body_only_accepted_for_post_put_with_matching_content_type() {
        let json_headers = vec![("content-type".to_string(), "application/json; charset=utf-8".to_string())];
        assert!(accepts_json_body(&Method::POST, &json_headers));
        assert!(accepts_json_body(&Method::PUT, &json_headers));
        assert!(!accepts_json_body(&Method::GET, &json_headers));

        let text_headers = vec![("content-type".to_string(), "text/plain".to_string())];
        assert!(!accepts_json_body(&Method::POST, &text_headers));
        assert!(!accepts_json_body(&Method::POST, &[]));
    }
}
