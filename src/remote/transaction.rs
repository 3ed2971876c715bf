use std::fmt;
use std::sync::Arc;

use async_trait::async_trait;
use tracing::debug;

use super::client::{HttpClient, HttpMethod, HttpRequest};
use super::protocol::{self, StatementRequest, StatementsRequest};
use crate::config::Credentials;
use crate::error::DriverError;
use crate::results::RowSet;
use crate::statement::Statement;
use crate::transaction::{NativeTransaction, TransactionSource};

/// A server-side transaction addressed by its URL.
pub(crate) struct RemoteTransaction {
    client: Arc<dyn HttpClient>,
    url: String,
    credentials: Option<Credentials>,
}

impl RemoteTransaction {
    async fn post(
        &self,
        url: String,
        body: &StatementsRequest<'_>,
    ) -> Result<protocol::TransactionResponse, DriverError> {
        let response = self
            .client
            .send(HttpRequest {
                method: HttpMethod::Post,
                url: url.clone(),
                body: Some(serde_json::to_value(body)?),
                credentials: self.credentials.clone(),
            })
            .await?;
        protocol::check(&url, response)
    }
}

#[async_trait]
impl NativeTransaction for RemoteTransaction {
    async fn execute(&self, statement: &Statement) -> Result<RowSet, DriverError> {
        let body = StatementsRequest {
            statements: vec![StatementRequest::from_statement(statement)],
        };
        let parsed = self.post(self.url.clone(), &body).await?;
        Ok(parsed
            .results
            .into_iter()
            .next()
            .map(protocol::StatementResult::into_row_set)
            .unwrap_or_default())
    }

    async fn commit(&self) -> Result<(), DriverError> {
        self.post(protocol::commit_url(&self.url), &StatementsRequest::empty())
            .await?;
        debug!(url = %self.url, "remote transaction committed");
        Ok(())
    }

    async fn rollback(&self) -> Result<(), DriverError> {
        let response = self
            .client
            .send(HttpRequest {
                method: HttpMethod::Delete,
                url: self.url.clone(),
                body: None,
                credentials: self.credentials.clone(),
            })
            .await?;
        protocol::check(&self.url, response)?;
        debug!(url = %self.url, "remote transaction rolled back");
        Ok(())
    }
}

impl fmt::Debug for RemoteTransaction {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("RemoteTransaction")
            .field("url", &self.url)
            .finish_non_exhaustive()
    }
}

/// Opens server-side transactions with a begin request.
pub(crate) struct RemoteSource {
    client: Arc<dyn HttpClient>,
    uri: String,
    credentials: Option<Credentials>,
}

impl RemoteSource {
    pub(crate) fn new(
        client: Arc<dyn HttpClient>,
        uri: String,
        credentials: Option<Credentials>,
    ) -> Self {
        Self {
            client,
            uri,
            credentials,
        }
    }
}

#[async_trait]
impl TransactionSource for RemoteSource {
    async fn begin(&self) -> Result<Box<dyn NativeTransaction>, DriverError> {
        let endpoint = protocol::transaction_endpoint(&self.uri);
        let response = self
            .client
            .send(HttpRequest {
                method: HttpMethod::Post,
                url: endpoint.clone(),
                body: Some(serde_json::to_value(StatementsRequest::empty())?),
                credentials: self.credentials.clone(),
            })
            .await?;
        let location = response.location.clone();
        let parsed = protocol::check(&endpoint, response)?;
        let url = location
            .or_else(|| {
                parsed
                    .commit
                    .as_deref()
                    .and_then(|commit| commit.strip_suffix("/commit"))
                    .map(str::to_string)
            })
            .ok_or_else(|| {
                DriverError::ExecutionError(format!(
                    "{endpoint} did not return a transaction location"
                ))
            })?;
        debug!(%url, "remote transaction begun");
        Ok(Box::new(RemoteTransaction {
            client: Arc::clone(&self.client),
            url,
            credentials: self.credentials.clone(),
        }))
    }
}
