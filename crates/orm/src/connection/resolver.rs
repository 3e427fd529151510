//! Connection resolution

use std::fmt::Debug;
use std::sync::{Arc, RwLock};

use once_cell::sync::Lazy;

use crate::backends::Connection;
use crate::error::{ConnectionError, OrmResult};

/// Hands out connections by name
pub trait ConnectionResolver: Send + Sync + Debug {
    /// Resolve `name`, or the default connection when `None`
    fn connection(&self, name: Option<&str>) -> OrmResult<Arc<dyn Connection>>;

    /// Name of the connection returned for `None`
    fn default_connection_name(&self) -> &str;
}

static GLOBAL_RESOLVER: Lazy<RwLock<Option<Arc<dyn ConnectionResolver>>>> =
    Lazy::new(|| RwLock::new(None));

/// Install the process wide resolver used by models without their own
pub fn set_connection_resolver(resolver: Arc<dyn ConnectionResolver>) {
    let mut global = GLOBAL_RESOLVER
        .write()
        .unwrap_or_else(|poisoned| poisoned.into_inner());
    tracing::debug!(
        "Installing global connection resolver (default: '{}')",
        resolver.default_connection_name()
    );
    *global = Some(resolver);
}

/// Remove the process wide resolver
pub fn unset_connection_resolver() {
    let mut global = GLOBAL_RESOLVER
        .write()
        .unwrap_or_else(|poisoned| poisoned.into_inner());
    *global = None;
}

/// The process wide resolver, if one is installed
pub fn connection_resolver() -> Option<Arc<dyn ConnectionResolver>> {
    GLOBAL_RESOLVER
        .read()
        .unwrap_or_else(|poisoned| poisoned.into_inner())
        .clone()
}

/// Resolve a connection through `resolver`, falling back to the global one
pub fn resolve_connection(
    resolver: Option<&Arc<dyn ConnectionResolver>>,
    name: Option<&str>,
) -> OrmResult<Arc<dyn Connection>> {
    match resolver {
        Some(resolver) => resolver.connection(name),
        None => connection_resolver()
            .ok_or(ConnectionError::MissingResolver)?
            .connection(name),
    }
}
