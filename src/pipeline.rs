//! Pipeline Executor (§4.4): the per-request state machine driving
//! interceptors, the optional preprocessor, dispatch-or-hijack, the
//! optional postprocessor, After-hooks, and error-handler routing.
//!
//! `Before`-error short circuiting is modeled with an explicit
//! "ran-before count" rather than unwinding through a coroutine stack:
//! the count of interceptors whose `Before` already ran is recorded, and
//! `After` iterates exactly that many entries forward (§9 Design Notes).

use std::panic::{catch_unwind, AssertUnwindSafe};
use std::sync::Arc;

use http::Method;

use crate::config::ConfigSnapshot;
use crate::context::{GatewayRequest, GatewayResponse};
use crate::dispatcher::Dispatcher;
use crate::error::GatewayError;
use crate::registry::ComponentRegistry;
use crate::resolver::resolve_args;
use crate::response::write_if_unclaimed;
use crate::router::RouteResult;

/// Named stages for tracing/diagnostics; the control flow itself lives
/// in [`PipelineExecutor::handle`], not in a match over this enum, since
/// several transitions short-circuit based on runtime outcomes rather
/// than a single linear walk.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Stage {
    Received,
    Matched,
    Before,
    Preprocess,
    Hijack,
    Dispatch,
    Postprocess,
    After,
    Done,
    Error,
}

pub struct PipelineExecutor {
    registry: Arc<ComponentRegistry>,
    dispatcher: Arc<Dispatcher>,
}

/// Raw inputs gathered by the server layer before the pipeline takes
/// over (method, raw path, headers/cookies/query already parsed).
pub struct IncomingRequest {
    pub method: Method,
    pub path: String,
    pub headers: Vec<(String, String)>,
    pub cookies: Vec<(String, String)>,
    pub query_params: crate::router::ParamVec,
    pub body: Option<serde_json::Value>,
}

impl PipelineExecutor {
    pub fn new(registry: Arc<ComponentRegistry>, dispatcher: Arc<Dispatcher>) -> Self {
        PipelineExecutor { registry, dispatcher }
    }

    pub fn handle(&self, snapshot: &ConfigSnapshot, incoming: IncomingRequest) -> GatewayResponse {
        tracing::debug!(method = %incoming.method, path = %incoming.path, stage = ?Stage::Received, "request received");

        let (endpoint, path_params) = match snapshot.router.route(&incoming.method, &incoming.path) {
            RouteResult::Matched { endpoint, path_params } => (endpoint, path_params),
            RouteResult::NotFound | RouteResult::MethodNotAllowed => {
                tracing::debug!(stage = ?Stage::Error, "route not found");
                let mut res = GatewayResponse::new();
                res.status = 404;
                res.write_str("404 page not found\n");
                res.claim();
                return res;
            }
        };
        tracing::debug!(handler = %endpoint.rpc_method, stage = ?Stage::Matched, "route matched");

        let mut req = GatewayRequest {
            method: incoming.method.clone(),
            path: incoming.path.clone(),
            endpoint: endpoint.clone(),
            path_params,
            query_params: incoming.query_params,
            headers: incoming.headers,
            cookies: incoming.cookies,
            body: incoming.body,
            context: Default::default(),
        };
        let mut res = GatewayResponse::new();
        res.status = 200;

        let chain = self.registry.interceptors_for(&incoming.method, &endpoint.path_pattern);

        let (ran_before, before_error) = self.run_before(&chain, &mut req, &mut res);

        if let Some(err) = before_error {
            self.run_after(&chain[..ran_before], &req, &mut res, Some(&err));
            self.route_to_error_handler(&err, &req, &mut res);
            return res;
        }

        if let Some(preprocessor) = self.registry.preprocessor_for(&incoming.method, &endpoint.path_pattern) {
            tracing::debug!(stage = ?Stage::Preprocess, "running preprocessor");
            if let Err(err) = preprocessor.process(&mut req, &mut res) {
                self.run_after(&chain[..ran_before], &req, &mut res, Some(&err));
                self.route_to_error_handler(&err, &req, &mut res);
                return res;
            }
        }

        if let Some(hijacker) = self.registry.hijacker_for(&incoming.method, &endpoint.path_pattern) {
            tracing::debug!(stage = ?Stage::Hijack, "hijacker owns response");
            hijacker.hijack(&req, &mut res);
            res.claim();
            self.run_after(&chain[..ran_before], &req, &mut res, None);
            return res;
        }

        tracing::debug!(stage = ?Stage::Dispatch, handler = %endpoint.rpc_method, "dispatching");
        let fields = snapshot
            .methods
            .get(&endpoint.rpc_method)
            .map(|m| m.args.as_slice())
            .unwrap_or(&[]);
        let dispatch_outcome = resolve_args(fields, &req, &self.registry)
            .map(|args| self.dispatcher.dispatch(&endpoint.rpc_method, args));

        let (value, rpc_error) = match dispatch_outcome {
            Ok((value, err)) => (value, err),
            Err(binding_err) => (None, Some(binding_err)),
        };

        if let Some(postprocessor) = self.registry.postprocessor_for(&incoming.method, &endpoint.path_pattern) {
            tracing::debug!(stage = ?Stage::Postprocess, "running postprocessor");
            postprocessor.process(&req, &mut res, value.as_ref(), rpc_error.as_ref());
            res.claim();
        } else if let Some(err) = rpc_error {
            self.run_after(&chain[..ran_before], &req, &mut res, Some(&err));
            self.route_to_error_handler(&err, &req, &mut res);
            return res;
        } else if let Some(value) = value {
            write_if_unclaimed(&mut res, &value);
        }

        self.run_after(&chain[..ran_before], &req, &mut res, None);
        tracing::debug!(stage = ?Stage::Done, "request done");
        res
    }

    /// Runs each `Before` hook in order, catching component panics and
    /// converting them into an `InternalError`. Returns the count that
    /// ran and, if one short-circuited, the error that stopped it.
    fn run_before(
        &self,
        chain: &[Arc<dyn crate::registry::Interceptor>],
        req: &mut GatewayRequest,
        res: &mut GatewayResponse,
    ) -> (usize, Option<GatewayError>) {
        for (idx, interceptor) in chain.iter().enumerate() {
            let outcome = catch_unwind(AssertUnwindSafe(|| interceptor.before(req, res)));
            match outcome {
                Ok(Ok(())) => continue,
                Ok(Err(err)) => return (idx + 1, Some(err)),
                Err(panic) => {
                    tracing::error!(panic = ?panic, "interceptor Before panicked");
                    return (idx + 1, Some(GatewayError::internal("interceptor panicked")));
                }
            }
        }
        (chain.len(), None)
    }

    /// Runs `After` for exactly the interceptors whose `Before` already
    /// ran, in forward order (§4.4). `After` errors are routed to the
    /// error handler but never rewrite bytes already written.
    fn run_after(
        &self,
        ran: &[Arc<dyn crate::registry::Interceptor>],
        req: &GatewayRequest,
        res: &mut GatewayResponse,
        prior_error: Option<&GatewayError>,
    ) {
        for interceptor in ran {
            let outcome = catch_unwind(AssertUnwindSafe(|| interceptor.after(req, res, prior_error)));
            match outcome {
                Ok(Ok(())) => {}
                Ok(Err(err)) => {
                    tracing::warn!(error = %err, "After hook reported an error");
                    if let Some(handler) = self.registry.error_handler() {
                        handler.handle(&err, req, res);
                    }
                }
                Err(panic) => {
                    tracing::error!(panic = ?panic, "interceptor After panicked");
                }
            }
        }
    }

    fn route_to_error_handler(&self, err: &GatewayError, req: &GatewayRequest, res: &mut GatewayResponse) {
        if res.is_claimed() {
            return;
        }
        match self.registry.error_handler() {
            Some(handler) => {
                handler.handle(err, req, res);
                res.claim();
            }
            None => {
                res.status = err.status();
                res.write_str(&err.to_string());
                res.write_str("\n");
                res.claim();
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::ServiceConfig;
    use crate::dispatcher::Switcher;
    use crate::idl::{IdlField, IdlMethod, IdlScalar};
    use crate::registry::{Component, ErrorHandler, Hijacker, Interceptor, Postprocessor};
    use crate::router::{Endpoint, ParamVec, Router};
    use serde_json::Value;
    use std::collections::HashMap;

    struct HelloSwitcher;
    impl Switcher for HelloSwitcher {
        fn call(&self, method_name: &str, args: &[Value]) -> Result<Value, GatewayError> {
            assert_eq!(method_name, "SayHello");
            let name = args.first().and_then(Value::as_str).unwrap_or("");
            Ok(serde_json::json!({"message": format!("[grpc server]Hello, {name}")}))
        }
    }

    fn snapshot_with_hello() -> ConfigSnapshot {
        let endpoint = Endpoint::new(vec![Method::GET], "/hello/{your_name:[a-zA-Z0-9]+}", "SayHello").unwrap();
        let mut methods = HashMap::new();
        methods.insert(
            "SayHello".to_string(),
            IdlMethod {
                name: "SayHello".to_string(),
                args: vec![IdlField::scalar("your_name", IdlScalar::String)],
            },
        );
        ConfigSnapshot {
            router: Router::new(vec![endpoint]),
            methods,
            service_params: ServiceConfig::default(),
        }
    }

    fn incoming(path: &str) -> IncomingRequest {
        IncomingRequest {
            method: Method::GET,
            path: path.to_string(),
            headers: Vec::new(),
            cookies: Vec::new(),
            query_params: ParamVec::new(),
            body: None,
        }
    }

    fn executor() -> PipelineExecutor {
        PipelineExecutor::new(
            Arc::new(ComponentRegistry::new()),
            Arc::new(Dispatcher::new(Box::new(HelloSwitcher))),
        )
    }

    #[test]
    fn plain_dispatch_produces_expected_body() {
        let snapshot = snapshot_with_hello();
        let res = executor().handle(&snapshot, incoming("/hello/testtest"));
        assert_eq!(res.body_str(), r#"{"message":"[grpc server]Hello, testtest"}"#);
    }

    #[test]
    fn post_to_get_only_route_is_platform_404() {
        let snapshot = snapshot_with_hello();
        let mut req = incoming("/hello/testtest");
        req.method = Method::POST;
        let res = executor().handle(&snapshot, req);
        assert_eq!(res.status, 404);
        assert_eq!(res.body_str(), "404 page not found\n");
    }

    struct Prefix(&'static str);
    impl Interceptor for Prefix {
        fn before(&self, _req: &mut GatewayRequest, res: &mut GatewayResponse) -> Result<(), GatewayError> {
            res.write_str(self.0);
            Ok(())
        }
    }

    #[test]
    fn common_interceptor_prefixes_body() {
        let registry = Arc::new(ComponentRegistry::new());
        registry.set_common_interceptor(Arc::new(Prefix("test1_intercepted:")));
        let pipeline = PipelineExecutor::new(registry, Arc::new(Dispatcher::new(Box::new(HelloSwitcher))));
        let res = pipeline.handle(&snapshot_with_hello(), incoming("/hello/testtest"));
        assert_eq!(
            res.body_str(),
            r#"test1_intercepted:{"message":"[grpc server]Hello, testtest"}"#
        );
    }

    struct AfterSuffix(&'static str);
    impl Interceptor for AfterSuffix {
        fn before(&self, _req: &mut GatewayRequest, _res: &mut GatewayResponse) -> Result<(), GatewayError> {
            Ok(())
        }
        fn after(&self, _req: &GatewayRequest, res: &mut GatewayResponse, _prior: Option<&GatewayError>) -> Result<(), GatewayError> {
            res.write_str(self.0);
            Err(GatewayError::component("error: after interceptor"))
        }
    }

    #[test]
    fn interceptor_chain_runs_before_in_order_and_after_in_forward_order() {
        let registry = Arc::new(ComponentRegistry::new());
        registry.intercept(
            vec![Method::GET],
            "/hello/{your_name:[a-zA-Z0-9]+}",
            vec![
                Arc::new(Prefix("intercepted:")),
                Arc::new(AfterSuffix(":after_error:")),
                Arc::new(Prefix("test1_intercepted:")),
            ],
        );
        let pipeline = PipelineExecutor::new(registry, Arc::new(Dispatcher::new(Box::new(HelloSwitcher))));
        let res = pipeline.handle(&snapshot_with_hello(), incoming("/hello/testtest"));
        assert_eq!(
            res.body_str(),
            r#"intercepted:test1_intercepted:{"message":"[grpc server]Hello, testtest"}:after_error:"#
        );
    }

    struct BeforeError;
    impl Interceptor for BeforeError {
        fn before(&self, _req: &mut GatewayRequest, res: &mut GatewayResponse) -> Result<(), GatewayError> {
            res.write_str("interceptor_error:");
            Err(GatewayError::component("error!"))
        }
    }

    #[test]
    fn before_error_short_circuits_dispatch() {
        let registry = Arc::new(ComponentRegistry::new());
        registry.intercept(vec![Method::GET], "/hello/{your_name:[a-zA-Z0-9]+}", vec![Arc::new(BeforeError)]);
        let pipeline = PipelineExecutor::new(registry, Arc::new(Dispatcher::new(Box::new(HelloSwitcher))));
        let res = pipeline.handle(&snapshot_with_hello(), incoming("/hello/testtest"));
        assert_eq!(res.body_str(), "interceptor_error:error!\n");
    }

    struct HijackerImpl;
    impl Hijacker for HijackerImpl {
        fn hijack(&self, _req: &GatewayRequest, res: &mut GatewayResponse) {
            res.write_str("hijacker");
        }
    }

    #[test]
    fn hijacker_bypasses_dispatch() {
        let registry = Arc::new(ComponentRegistry::new());
        registry.intercept(vec![Method::GET], "/hello/{your_name:[a-zA-Z0-9]+}", vec![Arc::new(Prefix("intercepted:"))]);
        registry.set_hijacker(Vec::new(), "/hello/{your_name:[a-zA-Z0-9]+}", Arc::new(HijackerImpl));
        let pipeline = PipelineExecutor::new(registry, Arc::new(Dispatcher::new(Box::new(HelloSwitcher))));
        let res = pipeline.handle(&snapshot_with_hello(), incoming("/hello/testtest"));
        assert_eq!(res.body_str(), "intercepted:hijacker");
    }

    struct CustomErrorHandler;
    impl ErrorHandler for CustomErrorHandler {
        fn handle(&self, err: &GatewayError, _req: &GatewayRequest, res: &mut GatewayResponse) {
            res.write_str(&format!("from errorHandler:{err}"));
        }
    }

    struct FailingSwitcher;
    impl Switcher for FailingSwitcher {
        fn call(&self, _method_name: &str, _args: &[Value]) -> Result<Value, GatewayError> {
            Err(GatewayError::Rpc {
                message: "rpc error".into(),
                status: 500,
            })
        }
    }

    #[test]
    fn custom_error_handler_output_replaces_default_verbatim() {
        let registry = Arc::new(ComponentRegistry::new());
        registry.register("errorHandler", Component::ErrorHandler(Arc::new(CustomErrorHandler)));
        registry.with_error_handler(Arc::new(CustomErrorHandler));
        let pipeline = PipelineExecutor::new(registry, Arc::new(Dispatcher::new(Box::new(FailingSwitcher))));
        let res = pipeline.handle(&snapshot_with_hello(), incoming("/hello/testtest"));
        assert_eq!(res.body_str(), "from errorHandler:rpc error");
    }

    struct PostProcess;
    impl Postprocessor for PostProcess {
        fn process(&self, _req: &GatewayRequest, res: &mut GatewayResponse, value: Option<&Value>, _err: Option<&GatewayError>) {
            let message = value.and_then(|v| v.get("message")).and_then(Value::as_str).unwrap_or("");
            res.write_str(&format!("postprocessor:{message}"));
        }
    }

    #[test]
    fn postprocessor_owns_output() {
        let registry = Arc::new(ComponentRegistry::new());
        registry.set_postprocessor(Vec::new(), "/hello/{your_name:[a-zA-Z0-9]+}", Arc::new(PostProcess));
        let pipeline = PipelineExecutor::new(registry, Arc::new(Dispatcher::new(Box::new(HelloSwitcher))));
        let res = pipeline.handle(&snapshot_with_hello(), incoming("/hello/testtest"));
        assert_eq!(res.body_str(), "postprocessor:[grpc server]Hello, testtest");
    }
}
