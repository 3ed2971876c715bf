use std::sync::Arc;

use async_trait::async_trait;
use tracing::{debug, info};

use super::client::HttpClient;
use super::transaction::RemoteSource;
use crate::config::{ClientOptions, Configuration, Credentials, TransportHandle};
use crate::driver::{Driver, DriverState, RequestHandler, not_ready};
use crate::error::DriverError;
use crate::transaction::{ExecutionContext, TransactionBinding, TransactionManager, join_or_begin};

/// Driver for a graph server reached over the transactional HTTP endpoint.
///
/// Each instance owns its client; closing it never affects other drivers.
pub struct RemoteDriver {
    client: Option<Arc<dyn HttpClient>>,
    uri: Option<String>,
    credentials: Option<Credentials>,
    config: Option<Configuration>,
    manager: TransactionManager,
    state: DriverState,
}

impl RemoteDriver {
    /// An unconfigured driver that will talk through `client`.
    #[must_use]
    pub fn with_client(client: Arc<dyn HttpClient>) -> Self {
        Self {
            client: Some(client),
            uri: None,
            credentials: None,
            config: None,
            manager: TransactionManager::new(),
            state: DriverState::Unconfigured,
        }
    }

    /// Construct and configure in one step.
    ///
    /// # Errors
    /// See [`Driver::configure`].
    pub fn from_config(
        client: Arc<dyn HttpClient>,
        config: Configuration,
    ) -> Result<Self, DriverError> {
        let mut driver = Self::with_client(client);
        driver.configure(config)?;
        Ok(driver)
    }

    #[must_use]
    pub fn with_transaction_manager(mut self, manager: TransactionManager) -> Self {
        self.manager = manager;
        self
    }

    #[must_use]
    pub fn uri(&self) -> Option<&str> {
        self.uri.as_deref()
    }

    fn source(&self) -> Result<RemoteSource, DriverError> {
        if self.state != DriverState::Ready {
            return Err(not_ready(self.state));
        }
        match (&self.client, &self.uri) {
            (Some(client), Some(uri)) => Ok(RemoteSource::new(
                Arc::clone(client),
                uri.clone(),
                self.credentials.clone(),
            )),
            _ => Err(not_ready(self.state)),
        }
    }
}

impl std::fmt::Debug for RemoteDriver {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("RemoteDriver")
            .field("uri", &self.uri)
            .field("credentials", &self.credentials)
            .field("state", &self.state)
            .finish_non_exhaustive()
    }
}

#[async_trait]
impl Driver for RemoteDriver {
    fn configure(&mut self, mut config: Configuration) -> Result<(), DriverError> {
        if self.state == DriverState::Closed {
            return Err(not_ready(self.state));
        }
        let client = self.client.as_ref().map(Arc::clone).ok_or_else(|| {
            DriverError::ResourceError("driver is closed; its client was released".to_string())
        })?;
        let uri = config
            .uri()
            .ok_or_else(|| DriverError::ConfigError("uri is required".to_string()))?
            .trim()
            .to_string();
        if !(uri.starts_with("http://") || uri.starts_with("https://")) {
            return Err(DriverError::ConfigError(format!(
                "uri must use http or https, got {uri:?}"
            )));
        }
        let options = ClientOptions::from_config(&config)?;
        client.configure(&options)?;

        info!(%uri, "remote driver configured");
        config.set_transport(TransportHandle::Remote(client));
        self.credentials = options.credentials;
        self.uri = Some(uri);
        self.config = Some(config);
        self.state = DriverState::Ready;
        Ok(())
    }

    async fn new_transaction(
        &self,
        ctx: &ExecutionContext,
    ) -> Result<TransactionBinding, DriverError> {
        let source = self.source()?;
        join_or_begin(&source, &self.manager, ctx).await
    }

    fn request_handler(&self) -> Result<RequestHandler, DriverError> {
        Ok(RequestHandler::new(
            Arc::new(self.source()?),
            self.manager.clone(),
        ))
    }

    fn close(&mut self) -> Result<(), DriverError> {
        if self.state == DriverState::Closed {
            return Ok(());
        }
        if let Some(config) = self.config.as_mut() {
            config.clear_transport();
        }
        if let Some(client) = self.client.take() {
            client.close();
        }
        debug!(uri = ?self.uri, "remote driver closed");
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
