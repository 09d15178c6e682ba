// src/services.rs

//! Long-lived listeners started by tasks.
//!
//! `server` and `watch` start a listener, park it here and complete. The
//! top-level command keeps the process alive while anything is registered
//! and stops everything on shutdown.

use std::fmt;
use std::sync::{Arc, Mutex, MutexGuard};

use tracing::{debug, info};

/// A running listener that can be stopped.
pub trait BackgroundService: Send {
    fn name(&self) -> &str;

    /// Stop the service and release its resources.
    fn stop(self: Box<Self>);
}

/// Shared set of running services; cheap to clone.
#[derive(Clone, Default)]
pub struct Services {
    inner: Arc<Mutex<Vec<Box<dyn BackgroundService>>>>,
}

impl fmt::Debug for Services {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Services")
            .field("names", &self.names())
            .finish()
    }
}

impl Services {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn register(&self, service: Box<dyn BackgroundService>) {
        info!(service = %service.name(), "background service started");
        self.lock().push(service);
    }

    pub fn is_empty(&self) -> bool {
        self.lock().is_empty()
    }

    pub fn names(&self) -> Vec<String> {
        self.lock().iter().map(|s| s.name().to_string()).collect()
    }

    /// Stop every registered service, most recent first.
    pub fn shutdown(&self) {
        let drained: Vec<Box<dyn BackgroundService>> = self.lock().drain(..).collect();
        for service in drained.into_iter().rev() {
            let name = service.name().to_string();
            debug!(service = %name, "stopping background service");
            service.stop();
            info!(service = %name, "background service stopped");
        }
    }

    fn lock(&self) -> MutexGuard<'_, Vec<Box<dyn BackgroundService>>> {
        // A panic while holding the lock leaves the list itself intact.
        self.inner.lock().unwrap_or_else(|poisoned| poisoned.into_inner())
    }
}
