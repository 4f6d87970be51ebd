//! Config Store (§4.7): an immutable snapshot of endpoints and service
//! parameters published via a single atomic pointer swap. Each request
//! takes the current snapshot once, at the MATCHED transition, and uses
//! it for the rest of its lifecycle — reload can never invalidate an
//! in-flight request's view.

use std::collections::HashMap;
use std::sync::Arc;

use arc_swap::ArcSwap;

use crate::config::descriptor::{Descriptor, ServiceConfig};
use crate::idl::IdlMethod;
use crate::registry::ComponentRegistry;
use crate::router::{Endpoint, Router};

/// The swappable unit: endpoint table plus the service parameters read
/// from `config:`. Attachments are intentionally not part of this
/// snapshot — they live in the [`ComponentRegistry`], mutex-serialized,
/// and persist across reload unless explicitly reset (§3 Lifecycle).
pub struct ConfigSnapshot {
    pub router: Router,
    pub methods: HashMap<String, IdlMethod>,
    pub service_params: ServiceConfig,
}

pub struct ConfigStore {
    current: ArcSwap<ConfigSnapshot>,
}

impl ConfigStore {
    pub fn empty() -> Self {
        ConfigStore {
            current: ArcSwap::new(Arc::new(ConfigSnapshot {
                router: Router::new(Vec::new()),
                methods: HashMap::new(),
                service_params: ServiceConfig::default(),
            })),
        }
    }

    pub fn snapshot(&self) -> Arc<ConfigSnapshot> {
        self.current.load_full()
    }

    /// Parse, validate, and atomically publish a new snapshot built from
    /// `descriptor` and the IDL-supplied method layouts. Descriptor
    /// attachments (interceptor/preprocessor/postprocessor/hijacker/
    /// convertor/errorhandler) are re-applied to `registry` fresh on
    /// every reload: the descriptor is this gateway's sole declarative
    /// configuration source (§9.3), so reload treats it as authoritative
    /// for attachments too, resetting prior descriptor-driven bindings
    /// before reapplying the newly loaded ones.
    pub fn reload(
        &self,
        descriptor: Descriptor,
        methods: HashMap<String, IdlMethod>,
        registry: &ComponentRegistry,
    ) -> anyhow::Result<()> {
        let known: HashMap<String, ()> = component_names(registry);
        descriptor.validate_against(&known)?;

        let mut endpoints = Vec::with_capacity(descriptor.urlmapping.len());
        for mapping in &descriptor.urlmapping {
            endpoints.push(Endpoint::new(
                mapping.methods.clone(),
                &mapping.path_pattern,
                &mapping.rpc_method,
            )?);
        }
        let router = Router::new(endpoints);

        apply_attachments(&descriptor, registry)?;

        let snapshot = Arc::new(ConfigSnapshot {
            router,
            methods,
            service_params: descriptor.config,
        });
        self.current.store(snapshot);
        Ok(())
    }
}

impl Default for ConfigStore {
    fn default() -> Self {
        Self::empty()
    }
}

fn component_names(registry: &ComponentRegistry) -> HashMap<String, ()> {
    registry.known_names().into_iter().map(|n| (n, ())).collect()
}

fn apply_attachments(descriptor: &Descriptor, registry: &ComponentRegistry) -> anyhow::Result<()> {
    use crate::registry::Component;

    registry.reset_attachments();

    for spec in &descriptor.interceptor {
        let mut list = Vec::with_capacity(spec.names.len());
        for name in &spec.names {
            match registry.lookup(name) {
                Some(Component::Interceptor(i)) => list.push(i),
                _ => anyhow::bail!("{name} is not a registered Interceptor"),
            }
        }
        registry.intercept(spec.methods.clone(), &spec.path, list);
    }
    for spec in &descriptor.preprocessor {
        let name = spec.names.first().ok_or_else(|| anyhow::anyhow!("preprocessor line omits a name"))?;
        match registry.lookup(name) {
            Some(Component::Preprocessor(p)) => registry.set_preprocessor(spec.methods.clone(), &spec.path, p),
            _ => anyhow::bail!("{name} is not a registered Preprocessor"),
        }
    }
    for spec in &descriptor.postprocessor {
        let name = spec.names.first().ok_or_else(|| anyhow::anyhow!("postprocessor line omits a name"))?;
        match registry.lookup(name) {
            Some(Component::Postprocessor(p)) => registry.set_postprocessor(spec.methods.clone(), &spec.path, p),
            _ => anyhow::bail!("{name} is not a registered Postprocessor"),
        }
    }
    for spec in &descriptor.hijacker {
        let name = spec.names.first().ok_or_else(|| anyhow::anyhow!("hijacker line omits a name"))?;
        match registry.lookup(name) {
            Some(Component::Hijacker(h)) => registry.set_hijacker(spec.methods.clone(), &spec.path, h),
            _ => anyhow::bail!("{name} is not a registered Hijacker"),
        }
    }
    for spec in &descriptor.convertor {
        match registry.lookup(&spec.name) {
            Some(Component::Converter(c)) => registry.set_message_field_convertor(&spec.type_name, c),
            _ => anyhow::bail!("{} is not a registered Converter", spec.name),
        }
    }
    if let Some(name) = &descriptor.errorhandler {
        match registry.lookup(name) {
            Some(Component::ErrorHandler(h)) => registry.with_error_handler(h),
            _ => anyhow::bail!("{name} is not a registered ErrorHandler"),
        }
    }
    Ok(())
}
