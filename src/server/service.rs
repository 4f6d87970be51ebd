//! `AppService`: the `may_minihttp::HttpService` implementation wiring
//! the Config Store, Component Registry, and Pipeline Executor into the
//! coroutine HTTP server, adapted from the reference framework's
//! `server::server::AppService` (security-scheme handling dropped — user
//! authentication is explicitly out of scope, §1).

use std::io;
use std::sync::Arc;

use may_minihttp::{HttpService, Request, Response};

use crate::config::ConfigStore;
use crate::dispatcher::Dispatcher;
use crate::pipeline::PipelineExecutor;
use crate::registry::ComponentRegistry;

use super::request::parse_request;
use super::response::write;

#[derive(Clone)]
pub struct AppService {
    config: Arc<ConfigStore>,
    pipeline: Arc<PipelineExecutor>,
}

impl AppService {
    pub fn new(config: Arc<ConfigStore>, registry: Arc<ComponentRegistry>, dispatcher: Arc<Dispatcher>) -> Self {
        AppService {
            config,
            pipeline: Arc::new(PipelineExecutor::new(registry, dispatcher)),
        }
    }
}

impl HttpService for AppService {
    fn call(&mut self, req: Request, res: &mut Response) -> io::Result<()> {
        let incoming = match parse_request(req) {
            Ok(incoming) => incoming,
            Err(_invalid_method) => {
                res.status_code(400, "Bad Request");
                res.body_vec(b"invalid HTTP method\n".to_vec());
                return Ok(());
            }
        };

        let snapshot = self.config.snapshot();
        let gateway_res = self.pipeline.handle(&snapshot, incoming);
        write(res, gateway_res);
        Ok(())
    }
}
