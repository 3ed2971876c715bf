use std::path::Path;
use std::sync::Arc;

use async_trait::async_trait;
use tracing::{debug, info};

use super::engine::EmbeddedEngine;
use super::registry::EngineRegistry;
use super::transaction::EngineSource;
use crate::config::{Configuration, TransportHandle};
use crate::driver::{Driver, DriverState, RequestHandler, not_ready};
use crate::error::DriverError;
use crate::transaction::{ExecutionContext, TransactionBinding, TransactionManager, join_or_begin};

/// Driver for the in-process engine.
///
/// Every driver built from the same [`EngineRegistry`] shares one engine.
/// `close` only drops this driver's reference, so sibling drivers keep
/// working; the engine itself stops when the last reference goes away or
/// when [`EngineRegistry::shutdown`] is called.
#[derive(Debug)]
pub struct EmbeddedDriver {
    registry: EngineRegistry,
    provided: Option<Arc<EmbeddedEngine>>,
    engine: Option<Arc<EmbeddedEngine>>,
    config: Option<Configuration>,
    manager: TransactionManager,
    state: DriverState,
}

impl Default for EmbeddedDriver {
    fn default() -> Self {
        Self::new()
    }
}

impl EmbeddedDriver {
    /// An unconfigured driver backed by the process-wide registry.
    #[must_use]
    pub fn new() -> Self {
        Self::with_registry(EngineRegistry::global())
    }

    #[must_use]
    pub fn with_registry(registry: EngineRegistry) -> Self {
        Self {
            registry,
            provided: None,
            engine: None,
            config: None,
            manager: TransactionManager::new(),
            state: DriverState::Unconfigured,
        }
    }

    /// A driver around an engine the caller opened, e.g. when running inside
    /// a host process that already owns one. No registry is consulted.
    #[must_use]
    pub fn with_engine(engine: Arc<EmbeddedEngine>) -> Self {
        let mut driver = Self::with_registry(EngineRegistry::new());
        driver.provided = Some(engine);
        driver
    }

    /// Construct and configure in one step.
    ///
    /// # Errors
    /// See [`Driver::configure`].
    pub fn from_config(config: Configuration) -> Result<Self, DriverError> {
        let mut driver = Self::new();
        driver.configure(config)?;
        Ok(driver)
    }

    /// Share a transaction manager with other drivers so they see each
    /// other's open transactions per context.
    #[must_use]
    pub fn with_transaction_manager(mut self, manager: TransactionManager) -> Self {
        self.manager = manager;
        self
    }

    /// The engine this driver executes against, once configured.
    #[must_use]
    pub fn engine(&self) -> Option<&Arc<EmbeddedEngine>> {
        self.engine.as_ref()
    }

    fn ready_engine(&self) -> Result<Arc<EmbeddedEngine>, DriverError> {
        let engine = self.engine.as_ref().ok_or_else(|| not_ready(self.state))?;
        engine.ensure_running()?;
        Ok(Arc::clone(engine))
    }
}

#[async_trait]
impl Driver for EmbeddedDriver {
    fn configure(&mut self, mut config: Configuration) -> Result<(), DriverError> {
        if self.state == DriverState::Closed {
            return Err(not_ready(self.state));
        }
        let engine = match &self.provided {
            Some(engine) => Arc::clone(engine),
            None => {
                let store_dir = config.store_dir().ok_or_else(|| {
                    DriverError::ConfigError("store_dir is required".to_string())
                })?;
                let busy_timeout = config.busy_timeout()?;
                self.registry.acquire(Path::new(store_dir), busy_timeout)?
            }
        };
        info!(store = %engine.store_dir().display(), "embedded driver configured");
        config.set_transport(TransportHandle::Embedded(Arc::clone(&engine)));
        self.engine = Some(engine);
        self.config = Some(config);
        self.state = DriverState::Ready;
        Ok(())
    }

    async fn new_transaction(
        &self,
        ctx: &ExecutionContext,
    ) -> Result<TransactionBinding, DriverError> {
        let source = EngineSource::new(self.ready_engine()?);
        join_or_begin(&source, &self.manager, ctx).await
    }

    fn request_handler(&self) -> Result<RequestHandler, DriverError> {
        let source = EngineSource::new(self.ready_engine()?);
        Ok(RequestHandler::new(Arc::new(source), self.manager.clone()))
    }

    fn close(&mut self) -> Result<(), DriverError> {
        if self.state == DriverState::Closed {
            return Ok(());
        }
        if let Some(config) = self.config.as_mut() {
            config.clear_transport();
        }
        self.provided = None;
        if let Some(engine) = self.engine.take() {
            debug!(
                store = %engine.store_dir().display(),
                remaining = Arc::strong_count(&engine) - 1,
                "embedded driver released engine"
            );
        }
        self.state = DriverState::Closed;
        Ok(())
    }

    fn state(&self) -> DriverState {
        self.state
    }

    fn configuration(&self) -> Option<&Configuration> {
        self.config.as_ref()
    }

    fn transaction_manager(&self) -> &TransactionManager {
        &self.manager
    }
}
