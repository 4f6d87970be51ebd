//! Filesystem-watcher-triggered reload (§4.7), adapted from the
//! reference framework's `hot_reload` module: an additive development
//! convenience on top of [`ConfigStore::reload`] that follows the exact
//! same validate-then-swap contract — a parse or validation failure logs
//! and keeps the previous snapshot, the server keeps serving.

use std::collections::HashMap;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::time::Instant;

use notify::{Config, EventKind, RecommendedWatcher, RecursiveMode, Watcher};
use tracing::{error, info, warn};

use crate::config::{ConfigStore, Descriptor};
use crate::idl::IdlMethod;
use crate::registry::ComponentRegistry;

/// Watch `descriptor_path` and reload `store` whenever it changes.
/// `methods` is the IDL-supplied method-layout table, assumed static
/// across reloads since it describes RPC signatures, not routing.
pub fn watch_descriptor<P>(
    descriptor_path: P,
    store: Arc<ConfigStore>,
    registry: Arc<ComponentRegistry>,
    methods: Arc<HashMap<String, IdlMethod>>,
) -> notify::Result<RecommendedWatcher>
where
    P: AsRef<Path>,
{
    let path: PathBuf = descriptor_path.as_ref().to_path_buf();

    let mut watcher = RecommendedWatcher::new(
        move |res: Result<notify::Event, notify::Error>| match res {
            Ok(event) if matches!(event.kind, EventKind::Modify(_) | EventKind::Create(_)) => {
                let path_str = path.to_str().unwrap_or("unknown");
                info!(descriptor_path = %path_str, "descriptor change detected");

                let reload_start = Instant::now();
                match std::fs::read_to_string(&path).map_err(anyhow::Error::from).and_then(Descriptor::parse) {
                    Ok(descriptor) => match store.reload(descriptor, (*methods).clone(), &registry) {
                        Ok(()) => {
                            info!(
                                descriptor_path = %path_str,
                                reload_time_ms = reload_start.elapsed().as_millis() as u64,
                                "descriptor reload succeeded"
                            );
                        }
                        Err(err) => {
                            error!(descriptor_path = %path_str, error = %err, "descriptor reload rejected, previous snapshot remains active");
                        }
                    },
                    Err(err) => {
                        error!(descriptor_path = %path_str, error = %err, "descriptor parse failed, previous snapshot remains active");
                    }
                }
            }
            Ok(_) => {}
            Err(err) => {
                warn!(error = %err, "filesystem watcher error");
            }
        },
        Config::default(),
    )?;

    watcher.watch(descriptor_path.as_ref(), RecursiveMode::NonRecursive)?;
    Ok(watcher)
}
