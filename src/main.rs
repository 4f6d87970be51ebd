use std::env;
use std::sync::Arc;

use serde_json::Value;
use turbogate::config::{ConfigStore, Descriptor};
use turbogate::dispatcher::{Dispatcher, Switcher};
use turbogate::error::GatewayError;
use turbogate::registry::ComponentRegistry;
use turbogate::server::{Initializer, ServerShell};

/// Echoes its arguments back as a JSON object, standing in for a real
/// IDL-generated switcher until the embedding program supplies one.
struct EchoSwitcher;

impl Switcher for EchoSwitcher {
    fn call(&self, method_name: &str, args: &[Value]) -> Result<Value, GatewayError> {
        Ok(serde_json::json!({ "method": method_name, "args": args }))
    }
}

struct NoopInitializer;

impl Initializer for NoopInitializer {
    fn init_service(&self, _registry: &ComponentRegistry, _config: &ConfigStore) -> anyhow::Result<()> {
        Ok(())
    }

    fn stop_service(&self) {}
}

fn main() -> anyhow::Result<()> {
    let descriptor_path = env::args().nth(1).unwrap_or_else(|| "turbogate.yaml".to_string());
    let yaml = std::fs::read_to_string(&descriptor_path)?;
    let descriptor = Descriptor::parse(&yaml)?;

    let _logging_guard = turbogate::logging::init(&descriptor.config);

    let registry = Arc::new(ComponentRegistry::new());
    let config = Arc::new(ConfigStore::empty());
    config.reload(descriptor.clone(), Default::default(), &registry)?;

    let addr = format!("0.0.0.0:{}", if descriptor.config.http_port.is_empty() { "8080" } else { &descriptor.config.http_port });

    let _watcher = turbogate::hot_reload::watch_descriptor(&descriptor_path, config.clone(), registry.clone(), Arc::new(Default::default()))?;

    let dispatcher = Arc::new(Dispatcher::new(Box::new(EchoSwitcher)));
    let shell = ServerShell::new(config, registry, dispatcher);
    shell.run(addr, Arc::new(NoopInitializer))
}
