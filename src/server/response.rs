//! Translates a [`GatewayResponse`] into a `may_minihttp::Response` —
//! status-reason mapping adapted from the reference framework's
//! `server::response`.

use may_minihttp::Response;

use crate::context::GatewayResponse;

fn status_reason(status: u16) -> &'static str {
    match status {
        200 => "OK",
        201 => "Created",
        400 => "Bad Request",
        401 => "Unauthorized",
        404 => "Not Found",
        405 => "Method Not Allowed",
        500 => "Internal Server Error",
        502 => "Bad Gateway",
        503 => "Service Unavailable",
        _ => "OK",
    }
}

pub fn write(res: &mut Response, gateway_res: GatewayResponse) {
    let status = gateway_res.status;
    let reason = status_reason(status);
    res.status_code(status as usize, reason);
    for (name, value) in &gateway_res.headers {
        res.header(&format!("{name}: {value}"));
    }
    res.body_vec(gateway_res.into_bytes());
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn status_reason_covers_common_codes() {
        assert_eq!(status_reason(200), "OK");
        assert_eq!(status_reason(404), "Not Found");
        assert_eq!(status_reason(999), "OK");
    }
}
