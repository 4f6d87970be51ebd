//! Server Shell and the HTTP transport layer wired into it (§5, §9.5).

pub mod http_server;
pub mod request;
pub mod response;
pub mod service;
pub mod shell;

pub use http_server::{HttpServer, ServerHandle};
pub use service::AppService;
pub use shell::{Initializer, ServerShell};
