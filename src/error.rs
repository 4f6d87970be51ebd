//! Error taxonomy for the gateway's own fallible operations.
//!
//! Descriptor parsing and pattern compilation use `anyhow::Result` at their
//! boundaries per the reference framework's convention; the pipeline instead
//! needs a typed, classifiable error because a response may already be
//! partially written by the time an error is known, so [`GatewayError`] is
//! the value that flows through `dispatch`/`resolve`/pipeline stages.

use std::fmt;

/// One category per §7 of the gateway's error handling design.
#[derive(Debug, Clone)]
pub enum GatewayError {
    /// No endpoint matched the method+path, or the path matched but the
    /// method did not (both render as the platform 404 body).
    Route(RouteErrorKind),
    /// A parameter could not be bound: unparseable, overflow, or missing.
    Binding(String),
    /// An interceptor, preprocessor, or postprocessor returned an error.
    Component(String),
    /// The RPC switcher returned an error; the wire code, if any, is
    /// forwarded to the error handler through `status`.
    Rpc { message: String, status: u16 },
    /// A recovered panic or a broken invariant inside the pipeline.
    Internal(String),
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RouteErrorKind {
    NotFound,
    MethodNotAllowed,
}

impl GatewayError {
    /// HTTP status this error should surface as when no custom error
    /// handler rewrites the body.
    pub fn status(&self) -> u16 {
        match self {
            GatewayError::Route(_) => 404,
            GatewayError::Binding(_) => 400,
            GatewayError::Component(_) => 500,
            GatewayError::Rpc { status, .. } => *status,
            GatewayError::Internal(_) => 500,
        }
    }

    pub fn internal(msg: impl Into<String>) -> Self {
        GatewayError::Internal(msg.into())
    }

    pub fn binding(msg: impl Into<String>) -> Self {
        GatewayError::Binding(msg.into())
    }

    pub fn component(msg: impl Into<String>) -> Self {
        GatewayError::Component(msg.into())
    }
}

impl fmt::Display for GatewayError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            GatewayError::Route(RouteErrorKind::NotFound) => write!(f, "404 page not found"),
            GatewayError::Route(RouteErrorKind::MethodNotAllowed) => {
                write!(f, "404 page not found")
            }
            GatewayError::Binding(msg) => write!(f, "{msg}"),
            GatewayError::Component(msg) => write!(f, "{msg}"),
            GatewayError::Rpc { message, .. } => write!(f, "{message}"),
            GatewayError::Internal(msg) => write!(f, "{msg}"),
        }
    }
}

impl std::error::Error for GatewayError {}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn status_codes_match_taxonomy() {
        assert_eq!(GatewayError::Route(RouteErrorKind::NotFound).status(), 404);
        assert_eq!(GatewayError::binding("bad int").status(), 400);
        assert_eq!(
            GatewayError::Rpc {
                message: "boom".into(),
                status: 502
            }
            .status(),
            502
        );
    }

    #[test]
    fn display_is_the_raw_message() {
        let e = GatewayError::Rpc {
            message: "upstream unavailable".into(),
            status: 503,
        };
        assert_eq!(e.to_string(), "upstream unavailable");
    }
}
