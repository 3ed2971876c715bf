//! JSON shapes of the transactional Cypher HTTP endpoint.

use serde::{Deserialize, Serialize};
use serde_json::Value as JsonValue;

use super::client::HttpResponse;
use crate::error::DriverError;
use crate::results::RowSet;
use crate::statement::Statement;
use crate::types::{Parameters, Value};

/// `{uri}/db/data/transaction`
pub(crate) fn transaction_endpoint(uri: &str) -> String {
    format!("{}/db/data/transaction", uri.trim_end_matches('/'))
}

pub(crate) fn commit_url(tx_url: &str) -> String {
    format!("{}/commit", tx_url.trim_end_matches('/'))
}

#[derive(Debug, Serialize)]
pub(crate) struct StatementsRequest<'a> {
    pub statements: Vec<StatementRequest<'a>>,
}

impl StatementsRequest<'_> {
    pub(crate) fn empty() -> Self {
        Self {
            statements: Vec::new(),
        }
    }
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub(crate) struct StatementRequest<'a> {
    pub statement: &'a str,
    pub parameters: &'a Parameters,
    pub result_data_contents: [&'static str; 1],
    pub include_stats: bool,
}

impl<'a> StatementRequest<'a> {
    pub(crate) fn from_statement(statement: &'a Statement) -> Self {
        Self {
            statement: statement.text(),
            parameters: statement.parameters(),
            result_data_contents: ["row"],
            include_stats: true,
        }
    }
}

#[derive(Debug, Default, Deserialize)]
pub(crate) struct TransactionResponse {
    #[serde(default)]
    pub results: Vec<StatementResult>,
    #[serde(default)]
    pub errors: Vec<ServerError>,
    pub commit: Option<String>,
}

#[derive(Debug, Default, Deserialize)]
pub(crate) struct StatementResult {
    #[serde(default)]
    pub columns: Vec<String>,
    #[serde(default)]
    pub data: Vec<DataRow>,
    pub stats: Option<Stats>,
}

#[derive(Debug, Deserialize)]
pub(crate) struct DataRow {
    #[serde(default)]
    pub row: Vec<JsonValue>,
}

#[derive(Debug, Default, Deserialize)]
pub(crate) struct Stats {
    #[serde(default)]
    pub nodes_created: usize,
    #[serde(default)]
    pub nodes_deleted: usize,
    #[serde(default)]
    pub relationships_created: usize,
    #[serde(default)]
    pub relationships_deleted: usize,
}

#[derive(Debug, Deserialize)]
pub(crate) struct ServerError {
    pub code: String,
    pub message: String,
}

impl StatementResult {
    pub(crate) fn into_row_set(self) -> RowSet {
        let mut rows = RowSet::with_columns(self.columns);
        for data in self.data {
            rows.add_row_values(data.row.into_iter().map(Value::from).collect());
        }
        if let Some(stats) = self.stats {
            rows.rows_affected = stats.nodes_created
                + stats.nodes_deleted
                + stats.relationships_created
                + stats.relationships_deleted;
        }
        rows
    }
}

/// Map status codes and server-reported errors to `DriverError`s and parse
/// the body.
pub(crate) fn check(url: &str, response: HttpResponse) -> Result<TransactionResponse, DriverError> {
    match response.status {
        401 | 403 => {
            return Err(DriverError::ConfigError(format!(
                "server rejected credentials for {url} (HTTP {})",
                response.status
            )));
        }
        404 => {
            return Err(DriverError::TransactionStateError(format!(
                "transaction at {url} does not exist or has expired"
            )));
        }
        status if status >= 400 => {
            return Err(DriverError::ExecutionError(format!(
                "HTTP {status} from {url}: {}",
                response.body
            )));
        }
        _ => {}
    }

    let parsed: TransactionResponse = if response.body.is_null() {
        TransactionResponse::default()
    } else {
        serde_json::from_value(response.body)?
    };

    if let Some(first) = parsed.errors.first() {
        let message = parsed
            .errors
            .iter()
            .map(|e| format!("{}: {}", e.code, e.message))
            .collect::<Vec<_>>()
            .join("; ");
        tracing::debug!(code = %first.code, "server reported statement error");
        return Err(DriverError::ExecutionError(message));
    }
    Ok(parsed)
}
