//! Server Shell (§9.5, §5, §6): binds the HTTP listener, owns the
//! `ConfigStore`/`ComponentRegistry`/`Dispatcher` triple, and drives
//! startup/shutdown through a program-supplied [`Initializer`] — the
//! Rust-native analogue of the reference framework's program-supplied
//! bootstrap hook, built on the same `HttpServer`/`ServerHandle` split
//! as `server::http_server`.

use std::net::ToSocketAddrs;
use std::sync::Arc;
use std::time::Duration;

use tracing::{info, warn};

use crate::config::ConfigStore;
use crate::dispatcher::Dispatcher;
use crate::registry::ComponentRegistry;

use super::http_server::HttpServer;
use super::service::AppService;

/// Program-supplied bootstrap hook: registers components and performs
/// whatever startup/teardown the embedding service needs, without the
/// shell depending on concrete RPC client types (§9.5).
pub trait Initializer: Send + Sync {
    fn init_service(&self, registry: &ComponentRegistry, config: &ConfigStore) -> anyhow::Result<()>;
    fn stop_service(&self);
}

const DEFAULT_GRACE_PERIOD: Duration = Duration::from_secs(5);

pub struct ServerShell {
    config: Arc<ConfigStore>,
    registry: Arc<ComponentRegistry>,
    dispatcher: Arc<Dispatcher>,
    grace_period: Duration,
}

impl ServerShell {
    pub fn new(config: Arc<ConfigStore>, registry: Arc<ComponentRegistry>, dispatcher: Arc<Dispatcher>) -> Self {
        ServerShell {
            config,
            registry,
            dispatcher,
            grace_period: DEFAULT_GRACE_PERIOD,
        }
    }

    pub fn with_grace_period(mut self, grace_period: Duration) -> Self {
        self.grace_period = grace_period;
        self
    }

    /// Binds `addr`, runs `initializer.init_service`, then blocks until
    /// SIGINT/SIGTERM (unix) or the process is otherwise torn down,
    /// draining for up to the configured grace period before forcing the
    /// listener closed.
    pub fn run<A: ToSocketAddrs>(self, addr: A, initializer: Arc<dyn Initializer>) -> anyhow::Result<()> {
        initializer.init_service(&self.registry, &self.config)?;

        let service = AppService::new(self.config.clone(), self.registry.clone(), self.dispatcher.clone());
        let handle = HttpServer(service).start(addr)?;
        handle.wait_ready()?;
        info!("listener bound, serving requests");

        wait_for_shutdown_signal();

        info!(grace_period_secs = self.grace_period.as_secs(), "graceful stop: draining in-flight requests");
        std::thread::sleep(self.grace_period);
        handle.stop();

        initializer.stop_service();
        info!("server shell stopped");
        Ok(())
    }
}

#[cfg(unix)]
fn wait_for_shutdown_signal() {
    use signal_hook::consts::{SIGINT, SIGTERM};
    use signal_hook::iterator::Signals;

    match Signals::new([SIGINT, SIGTERM]) {
        Ok(mut signals) => {
            if let Some(sig) = signals.forever().next() {
                info!(signal = sig, "shutdown signal received");
            }
        }
        Err(err) => {
            warn!(error = %err, "failed to install signal handler; blocking forever instead");
            std::thread::park();
        }
    }
}

#[cfg(not(unix))]
fn wait_for_shutdown_signal() {
    std::thread::park();
}
