#![allow(dead_code)]

pub mod memory_catalog;

use std::sync::Arc;
use std::time::Duration;

use tagsync_core::{CatalogGateway, GatewayPolicy, ReconcileEngine};
use tagsync_types::RemoteTag;

pub use memory_catalog::MemoryCatalog;

/// Retry budget of the real gateway without the wait between attempts.
pub fn fast_policy() -> GatewayPolicy {
    GatewayPolicy {
        max_attempts: 5,
        backoff: Duration::ZERO,
    }
}

pub fn engine_for(catalog: &Arc<MemoryCatalog>) -> ReconcileEngine {
    let gateway = CatalogGateway::new(catalog.clone(), fast_policy());
    ReconcileEngine::new(gateway)
}

pub fn remote(name: &str, description: &str, aliases: &[&str]) -> RemoteTag {
    RemoteTag {
        id: format!("remote-{}", name.to_lowercase().replace(' ', "-")),
        name: name.to_string(),
        description: description.to_string(),
        aliases: aliases.iter().map(|a| a.to_string()).collect(),
    }
}
