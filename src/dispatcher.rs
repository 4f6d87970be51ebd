//! RPC Dispatcher Facade (§4.5): adapts the Parameter Resolver's output
//! to a caller-supplied "switcher" and classifies whatever it returns.
//!
//! The facade never speaks gRPC or Thrift itself; the concrete transport
//! and the IDL-generated switcher are external collaborators (§1). This
//! mirrors the reference framework's `Dispatcher`, which likewise holds
//! only name-keyed senders and leaves the handler body to the caller.

use serde_json::Value;

use crate::error::GatewayError;

/// The IDL-generated calling convention: given a method name and its
/// resolved argument vector, produce a response value or an RPC error.
pub trait Switcher: Send + Sync {
    fn call(&self, method_name: &str, args: &[Value]) -> Result<Value, GatewayError>;
}

pub struct Dispatcher {
    switcher: Box<dyn Switcher>,
}

impl Dispatcher {
    pub fn new(switcher: Box<dyn Switcher>) -> Self {
        Dispatcher { switcher }
    }

    /// Calls the switcher and returns `(response_value, rpc_error)` as
    /// described in §4.5 — exactly one side is populated.
    pub fn dispatch(&self, method_name: &str, args: Vec<Value>) -> (Option<Value>, Option<GatewayError>) {
        match self.switcher.call(method_name, &args) {
            Ok(value) => (Some(value), None),
            Err(err) => (None, Some(err)),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    struct StubSwitcher;
    impl Switcher for StubSwitcher {
        fn call(&self, method_name: &str, args: &[Value]) -> Result<Value, GatewayError> {
            match method_name {
                "SayHello" => {
                    let name = args.first().and_then(Value::as_str).unwrap_or("");
                    Ok(serde_json::json!({"message": format!("[grpc server]Hello, {name}")}))
                }
                _ => Err(GatewayError::Rpc {
                    message: "unknown method".into(),
                    status: 500,
                }),
            }
        }
    }

    #[test]
    fn successful_dispatch_returns_value() {
        let dispatcher = Dispatcher::new(Box::new(StubSwitcher));
        let (value, err) = dispatcher.dispatch("SayHello", vec![Value::from("testtest")]);
        assert!(err.is_none());
        assert_eq!(
            value.unwrap(),
            serde_json::json!({"message": "[grpc server]Hello, testtest"})
        );
    }

    #[test]
    fn unknown_method_returns_rpc_error() {
        let dispatcher = Dispatcher::new(Box::new(StubSwitcher));
        let (value, err) = dispatcher.dispatch("Missing", vec![]);
        assert!(value.is_none());
        assert!(err.is_some());
    }
}
