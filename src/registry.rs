//! Component Registry (§4.2): the named table of pluggable user code
//! (interceptors, pre/postprocessors, hijackers, converters, error
//! handler) plus the attachment bindings describing where each runs.
//!
//! Every mutator serializes through a single mutex; readers take a
//! cloned snapshot of the pieces they need rather than holding the lock
//! across a component invocation, mirroring the reference framework's
//! `Middleware` registration style in its `Dispatcher`.

use std::sync::{Arc, Mutex};

use http::Method;

use crate::context::{GatewayRequest, GatewayResponse};
use crate::error::GatewayError;
use serde_json::Value;

/// Runs before dispatch; may short-circuit by returning an error, and may
/// write response bytes and mutate request context either way.
pub trait Interceptor: Send + Sync {
    fn before(&self, req: &mut GatewayRequest, res: &mut GatewayResponse) -> Result<(), GatewayError>;
    fn after(
        &self,
        req: &GatewayRequest,
        res: &mut GatewayResponse,
        prior_error: Option<&GatewayError>,
    ) -> Result<(), GatewayError> {
        let _ = (req, res, prior_error);
        Ok(())
    }
}

pub trait Preprocessor: Send + Sync {
    fn process(&self, req: &mut GatewayRequest, res: &mut GatewayResponse) -> Result<(), GatewayError>;
}

pub trait Postprocessor: Send + Sync {
    /// Owns the response once invoked: must write (or explicitly decline
    /// to) the final body itself (§4.4 DISPATCH → POSTPROCESS).
    fn process(
        &self,
        req: &GatewayRequest,
        res: &mut GatewayResponse,
        value: Option<&Value>,
        rpc_error: Option<&GatewayError>,
    );
}

pub trait Hijacker: Send + Sync {
    fn hijack(&self, req: &GatewayRequest, res: &mut GatewayResponse);
}

/// Produces an argument value for a struct-typed field, superseding all
/// per-field sources for that IDL type (§4.3 source 1).
pub trait Converter: Send + Sync {
    fn convert(&self, req: &GatewayRequest) -> Value;
}

pub trait ErrorHandler: Send + Sync {
    fn handle(&self, err: &GatewayError, req: &GatewayRequest, res: &mut GatewayResponse);
}

/// A named, type-tagged component artifact, as held by the registry's
/// name table (`register`/`lookup`) and referenced by name from a loaded
/// descriptor (§6).
#[derive(Clone)]
pub enum Component {
    Interceptor(Arc<dyn Interceptor>),
    Preprocessor(Arc<dyn Preprocessor>),
    Postprocessor(Arc<dyn Postprocessor>),
    Hijacker(Arc<dyn Hijacker>),
    Converter(Arc<dyn Converter>),
    ErrorHandler(Arc<dyn ErrorHandler>),
}

/// Method + path binding key. An empty `methods` vec means "all methods";
/// path `"/"` means "all paths" (§3 Attachments).
#[derive(Clone)]
struct Binding<T> {
    methods: Vec<Method>,
    path: String,
    component: T,
}

impl<T> Binding<T> {
    fn matches(&self, method: &Method, path: &str) -> bool {
        let method_ok = self.methods.is_empty() || self.methods.iter().any(|m| m == method);
        let path_ok = self.path == "/" || self.path == path;
        method_ok && path_ok
    }

    /// Same (method-set, path pattern) key, ignoring the attached
    /// component — at most one binding per key is allowed (§3 Attachments).
    fn same_key(&self, methods: &[Method], path: &str) -> bool {
        self.path == path && self.methods == methods
    }
}

/// Insert `binding`, replacing any existing entry with the same
/// (method-set, path pattern) key so re-registration is last-wins rather
/// than additive (§3 Attachments).
fn upsert<T>(bindings: &mut Vec<Binding<T>>, binding: Binding<T>) {
    match bindings.iter().position(|b| b.same_key(&binding.methods, &binding.path)) {
        Some(idx) => bindings[idx] = binding,
        None => bindings.push(binding),
    }
}

#[derive(Default)]
struct RegistryInner {
    named: std::collections::HashMap<String, Component>,
    common_interceptor: Option<Arc<dyn Interceptor>>,
    interceptors: Vec<Binding<Vec<Arc<dyn Interceptor>>>>,
    preprocessors: Vec<Binding<Arc<dyn Preprocessor>>>,
    postprocessors: Vec<Binding<Arc<dyn Postprocessor>>>,
    hijackers: Vec<Binding<Arc<dyn Hijacker>>>,
    converters: std::collections::HashMap<String, Arc<dyn Converter>>,
    error_handler: Option<Arc<dyn ErrorHandler>>,
}

#[derive(Default)]
pub struct ComponentRegistry {
    inner: Mutex<RegistryInner>,
}

impl ComponentRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn register(&self, name: &str, component: Component) {
        self.lock().named.insert(name.to_string(), component);
    }

    pub fn lookup(&self, name: &str) -> Option<Component> {
        self.lock().named.get(name).cloned()
    }

    pub fn known_names(&self) -> Vec<String> {
        self.lock().named.keys().cloned().collect()
    }

    /// Clears attachments while preserving the name table — the same
    /// operation as [`Self::reset`], named for call sites (like config
    /// reload) that mean "re-derive attachments from scratch" rather
    /// than "the user asked to reset everything".
    pub fn reset_attachments(&self) {
        self.reset();
    }

    /// Drops all non-static attachments (common interceptor, path-scoped
    /// bindings, converters, error handler) but preserves the name table
    /// so a subsequent descriptor reload can still resolve names (§4.2).
    pub fn reset(&self) {
        let mut inner = self.lock();
        inner.common_interceptor = None;
        inner.interceptors.clear();
        inner.preprocessors.clear();
        inner.postprocessors.clear();
        inner.hijackers.clear();
        inner.converters.clear();
        inner.error_handler = None;
    }

    pub fn set_common_interceptor(&self, interceptor: Arc<dyn Interceptor>) {
        self.lock().common_interceptor = Some(interceptor);
    }

    pub fn intercept(&self, methods: Vec<Method>, path: &str, interceptors: Vec<Arc<dyn Interceptor>>) {
        self.lock().interceptors.push(Binding {
            methods,
            path: path.to_string(),
            component: interceptors,
        });
    }

    pub fn set_preprocessor(&self, methods: Vec<Method>, path: &str, preprocessor: Arc<dyn Preprocessor>) {
        upsert(
            &mut self.lock().preprocessors,
            Binding {
                methods,
                path: path.to_string(),
                component: preprocessor,
            },
        );
    }

    pub fn set_postprocessor(&self, methods: Vec<Method>, path: &str, postprocessor: Arc<dyn Postprocessor>) {
        upsert(
            &mut self.lock().postprocessors,
            Binding {
                methods,
                path: path.to_string(),
                component: postprocessor,
            },
        );
    }

    pub fn set_hijacker(&self, methods: Vec<Method>, path: &str, hijacker: Arc<dyn Hijacker>) {
        upsert(
            &mut self.lock().hijackers,
            Binding {
                methods,
                path: path.to_string(),
                component: hijacker,
            },
        );
    }

    pub fn set_message_field_convertor(&self, type_name: &str, converter: Arc<dyn Converter>) {
        self.lock().converters.insert(type_name.to_string(), converter);
    }

    pub fn with_error_handler(&self, handler: Arc<dyn ErrorHandler>) {
        self.lock().error_handler = Some(handler);
    }

    /// The ordered `[common] ++ path-scoped` interceptor chain for a
    /// request (§4.4 MATCHED → BEFORE).
    pub fn interceptors_for(&self, method: &Method, path: &str) -> Vec<Arc<dyn Interceptor>> {
        let inner = self.lock();
        let mut chain = Vec::new();
        if let Some(common) = &inner.common_interceptor {
            chain.push(common.clone());
        }
        for binding in &inner.interceptors {
            if binding.matches(method, path) {
                chain.extend(binding.component.iter().cloned());
            }
        }
        chain
    }

    pub fn preprocessor_for(&self, method: &Method, path: &str) -> Option<Arc<dyn Preprocessor>> {
        self.lock()
            .preprocessors
            .iter()
            .find(|b| b.matches(method, path))
            .map(|b| b.component.clone())
    }

    pub fn postprocessor_for(&self, method: &Method, path: &str) -> Option<Arc<dyn Postprocessor>> {
        self.lock()
            .postprocessors
            .iter()
            .find(|b| b.matches(method, path))
            .map(|b| b.component.clone())
    }

    pub fn hijacker_for(&self, method: &Method, path: &str) -> Option<Arc<dyn Hijacker>> {
        self.lock()
            .hijackers
            .iter()
            .find(|b| b.matches(method, path))
            .map(|b| b.component.clone())
    }

    pub fn converter_for(&self, type_name: &str) -> Option<Arc<dyn Converter>> {
        self.lock().converters.get(type_name).cloned()
    }

    pub fn error_handler(&self) -> Option<Arc<dyn ErrorHandler>> {
        self.lock().error_handler.clone()
    }

    fn lock(&self) -> std::sync::MutexGuard<'_, RegistryInner> {
        self.inner.lock().unwrap_or_else(|e| e.into_inner())
    }
}
