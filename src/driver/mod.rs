//! The transport-independent driver contract.
//!
//! Every transport supports exactly four operations: `configure`,
//! `new_transaction`, `request_handler` and `close`. [`AnyDriver`] wraps the
//! concrete drivers so callers can hold either behind one type.

pub mod request;

use async_trait::async_trait;

pub use request::RequestHandler;

use crate::config::{Configuration, TransportKind};
use crate::error::DriverError;
use crate::transaction::{ExecutionContext, TransactionBinding, TransactionManager};

#[cfg(feature = "embedded")]
use crate::embedded::EmbeddedDriver;
#[cfg(feature = "remote")]
use crate::remote::RemoteDriver;

/// Where a driver is in its lifecycle.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DriverState {
    Unconfigured,
    Ready,
    Closed,
}

#[async_trait]
pub trait Driver: Send + Sync {
    /// Resolve or create the transport handle and record it in `config`.
    ///
    /// # Errors
    /// `ConfigError` for missing or invalid options, `ResourceError` if the
    /// handle cannot be created or the driver is already closed.
    fn configure(&mut self, config: Configuration) -> Result<(), DriverError>;

    /// Join the context's open transaction or begin a new one.
    ///
    /// # Errors
    /// `ResourceError` if the driver is not ready; transaction-state and
    /// transport errors otherwise.
    async fn new_transaction(
        &self,
        ctx: &ExecutionContext,
    ) -> Result<TransactionBinding, DriverError>;

    /// A handler executing statements in the context's current transaction.
    ///
    /// # Errors
    /// `ResourceError` if the driver is not ready.
    fn request_handler(&self) -> Result<RequestHandler, DriverError>;

    /// Release this driver's hold on its transport handle. Closing twice is
    /// a no-op.
    ///
    /// # Errors
    /// Transport errors raised while releasing the handle.
    fn close(&mut self) -> Result<(), DriverError>;

    fn state(&self) -> DriverState;

    fn configuration(&self) -> Option<&Configuration>;

    fn transaction_manager(&self) -> &TransactionManager;
}

pub(crate) fn not_ready(state: DriverState) -> DriverError {
    match state {
        DriverState::Unconfigured => {
            DriverError::ResourceError("driver has not been configured".to_string())
        }
        DriverState::Closed => DriverError::ResourceError("driver is closed".to_string()),
        DriverState::Ready => DriverError::ResourceError("driver has no transport".to_string()),
    }
}

/// Either transport behind one type.
#[derive(Debug)]
pub enum AnyDriver {
    #[cfg(feature = "embedded")]
    Embedded(EmbeddedDriver),
    #[cfg(feature = "remote")]
    Remote(RemoteDriver),
}

impl AnyDriver {
    #[must_use]
    pub fn kind(&self) -> TransportKind {
        match self {
            #[cfg(feature = "embedded")]
            Self::Embedded(_) => TransportKind::Embedded,
            #[cfg(feature = "remote")]
            Self::Remote(_) => TransportKind::Remote,
        }
    }

    fn inner(&self) -> &dyn Driver {
        match self {
            #[cfg(feature = "embedded")]
            Self::Embedded(driver) => driver,
            #[cfg(feature = "remote")]
            Self::Remote(driver) => driver,
        }
    }

    fn inner_mut(&mut self) -> &mut dyn Driver {
        match self {
            #[cfg(feature = "embedded")]
            Self::Embedded(driver) => driver,
            #[cfg(feature = "remote")]
            Self::Remote(driver) => driver,
        }
    }
}

#[cfg(feature = "embedded")]
impl From<EmbeddedDriver> for AnyDriver {
    fn from(driver: EmbeddedDriver) -> Self {
        Self::Embedded(driver)
    }
}

#[cfg(feature = "remote")]
impl From<RemoteDriver> for AnyDriver {
    fn from(driver: RemoteDriver) -> Self {
        Self::Remote(driver)
    }
}

#[async_trait]
impl Driver for AnyDriver {
    fn configure(&mut self, config: Configuration) -> Result<(), DriverError> {
        self.inner_mut().configure(config)
    }

    async fn new_transaction(
        &self,
        ctx: &ExecutionContext,
    ) -> Result<TransactionBinding, DriverError> {
        self.inner().new_transaction(ctx).await
    }

    fn request_handler(&self) -> Result<RequestHandler, DriverError> {
        self.inner().request_handler()
    }

    fn close(&mut self) -> Result<(), DriverError> {
        self.inner_mut().close()
    }

    fn state(&self) -> DriverState {
        self.inner().state()
    }

    fn configuration(&self) -> Option<&Configuration> {
        self.inner().configuration()
    }

    fn transaction_manager(&self) -> &TransactionManager {
        self.inner().transaction_manager()
    }
}
