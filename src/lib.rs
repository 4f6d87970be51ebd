//! turbogate: an HTTP-to-RPC gateway.
//!
//! A `turbogate` deployment sits in front of a gRPC or Thrift service and
//! exposes it over plain HTTP/JSON, driven entirely by a declarative
//! descriptor file (§6): a URL-to-method mapping plus the named
//! interceptor/preprocessor/postprocessor/hijacker/convertor/errorhandler
//! attachments that run around dispatch.
//!
//! ```text
//! Route Matcher -> Parameter Resolver -> Pipeline Executor -> Response Writer
//!                                             |
//!                                      RPC Dispatcher Facade
//! ```
//!
//! The pieces:
//! - [`router`] resolves method+path to an [`router::Endpoint`], first match
//!   in registration order wins.
//! - [`resolver`] binds an RPC method's declared fields against path,
//!   query, interceptor-set context, and JSON body sources.
//! - [`registry`] holds the named, pluggable components and the bindings
//!   describing where each one runs.
//! - [`pipeline`] drives the per-request state machine connecting all of
//!   the above to the [`dispatcher`] facade.
//! - [`config`] parses the descriptor and publishes it as an
//!   atomically-swapped snapshot; [`hot_reload`] watches the file for
//!   changes.
//! - [`server`] wraps the pipeline in a `may`-coroutine HTTP listener with
//!   graceful shutdown.
//!
//! The concrete gRPC/Thrift transport and the IDL-generated switcher that
//! turns resolved arguments into a real RPC call are supplied by the
//! embedding program through the [`dispatcher::Switcher`] trait — this
//! crate never speaks either wire protocol itself.

pub mod config;
pub mod context;
pub mod dispatcher;
pub mod error;
pub mod hot_reload;
pub mod idl;
pub mod logging;
pub mod pipeline;
pub mod registry;
pub mod resolver;
pub mod response;
pub mod router;
pub mod server;

pub use config::{ConfigSnapshot, ConfigStore, Descriptor};
pub use context::{GatewayRequest, GatewayResponse};
pub use dispatcher::{Dispatcher, Switcher};
pub use error::GatewayError;
pub use pipeline::PipelineExecutor;
pub use registry::ComponentRegistry;
pub use server::{Initializer, ServerShell};
