use std::path::Path;
use std::sync::{Arc, Weak};
use std::time::Duration;

use lazy_static::lazy_static;
use parking_lot::RwLock;
use tracing::{debug, info, warn};

use super::engine::EmbeddedEngine;
use crate::error::DriverError;

lazy_static! {
    static ref GLOBAL_REGISTRY: EngineRegistry = EngineRegistry::new();
}

/// One-time initializer for the process's embedded engine.
///
/// The registry only holds a weak reference: drivers, request handlers and
/// open transactions own the engine through `Arc`s, and the engine shuts
/// down when the last of them is released. While an engine is alive every
/// `acquire` returns it, whatever store location is asked for
/// (first-writer-wins).
#[derive(Clone, Default)]
pub struct EngineRegistry {
    slot: Arc<RwLock<Weak<EmbeddedEngine>>>,
}

impl EngineRegistry {
    /// A registry independent of the process-wide one.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// The process-wide registry used by [`super::EmbeddedDriver::new`].
    #[must_use]
    pub fn global() -> Self {
        GLOBAL_REGISTRY.clone()
    }

    /// The live engine, if any.
    #[must_use]
    pub fn current(&self) -> Option<Arc<EmbeddedEngine>> {
        live(&self.slot.read())
    }

    /// Return the live engine, or open one at `store_dir`.
    ///
    /// # Errors
    /// `ResourceError` if a new engine cannot be opened.
    pub fn acquire(
        &self,
        store_dir: &Path,
        busy_timeout: Duration,
    ) -> Result<Arc<EmbeddedEngine>, DriverError> {
        if let Some(engine) = self.current() {
            note_reuse(&engine, store_dir);
            return Ok(engine);
        }

        let mut slot = self.slot.write();
        if let Some(engine) = live(&slot) {
            note_reuse(&engine, store_dir);
            return Ok(engine);
        }
        let engine = Arc::new(EmbeddedEngine::open(store_dir, busy_timeout)?);
        *slot = Arc::downgrade(&engine);
        Ok(engine)
    }

    /// Register an engine opened by the caller. If another engine is already
    /// live it wins and is returned instead.
    pub fn install(&self, engine: Arc<EmbeddedEngine>) -> Arc<EmbeddedEngine> {
        let mut slot = self.slot.write();
        if let Some(existing) = live(&slot) {
            if !Arc::ptr_eq(&existing, &engine) {
                warn!(
                    live = %existing.store_dir().display(),
                    offered = %engine.store_dir().display(),
                    "an embedded engine is already live; keeping it"
                );
            }
            return existing;
        }
        *slot = Arc::downgrade(&engine);
        engine
    }

    /// Shut the live engine down now, whoever still holds it. Returns false
    /// when there was nothing to shut down.
    ///
    /// This is the explicit release for the process's top-level owner; the
    /// next `acquire` opens a fresh engine.
    pub fn shutdown(&self) -> bool {
        let mut slot = self.slot.write();
        let engine = live(&slot);
        *slot = Weak::new();
        match engine {
            Some(engine) => {
                info!(store = %engine.store_dir().display(), "shutting down embedded engine on request");
                engine.shutdown();
                true
            }
            None => false,
        }
    }
}

impl std::fmt::Debug for EngineRegistry {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("EngineRegistry")
            .field("current", &self.current())
            .finish()
    }
}

fn live(slot: &Weak<EmbeddedEngine>) -> Option<Arc<EmbeddedEngine>> {
    slot.upgrade().filter(|engine| !engine.is_shut_down())
}

fn note_reuse(engine: &EmbeddedEngine, requested: &Path) {
    if engine.store_dir() == requested {
        debug!(store = %requested.display(), "reusing embedded engine");
    } else {
        warn!(
            live = %engine.store_dir().display(),
            requested = %requested.display(),
            "embedded engine already running at another location; reusing it"
        );
    }
}
