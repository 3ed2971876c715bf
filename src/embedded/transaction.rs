use std::fmt;
use std::sync::Arc;

use async_trait::async_trait;
use parking_lot::Mutex;
use rusqlite::Connection;

use super::engine::{EmbeddedEngine, run_plan};
use super::plan::Plan;
use crate::error::DriverError;
use crate::results::RowSet;
use crate::statement::Statement;
use crate::transaction::{NativeTransaction, TransactionSource};

type SharedConnection = Arc<Mutex<Option<Connection>>>;

/// A native engine transaction: one connection inside `BEGIN IMMEDIATE`.
///
/// Dropping it without commit closes the connection, which rolls back.
pub(crate) struct EmbeddedTransaction {
    engine: Arc<EmbeddedEngine>,
    conn: SharedConnection,
}

impl EmbeddedTransaction {
    pub(crate) fn new(engine: Arc<EmbeddedEngine>, conn: Connection) -> Self {
        Self {
            engine,
            conn: Arc::new(Mutex::new(Some(conn))),
        }
    }

    async fn finish(&self, sql: &'static str) -> Result<(), DriverError> {
        let conn = Arc::clone(&self.conn);
        tokio::task::spawn_blocking(move || {
            let conn = conn.lock().take().ok_or_else(completed)?;
            conn.execute_batch(sql)?;
            Ok(())
        })
        .await?
    }
}

fn completed() -> DriverError {
    DriverError::TransactionStateError("embedded transaction already completed".into())
}

async fn run_blocking<F, R>(conn: SharedConnection, func: F) -> Result<R, DriverError>
where
    F: FnOnce(&Connection) -> Result<R, DriverError> + Send + 'static,
    R: Send + 'static,
{
    tokio::task::spawn_blocking(move || {
        let guard = conn.lock();
        let conn = guard.as_ref().ok_or_else(completed)?;
        func(conn)
    })
    .await?
}

#[async_trait]
impl NativeTransaction for EmbeddedTransaction {
    async fn execute(&self, statement: &Statement) -> Result<RowSet, DriverError> {
        self.engine.ensure_running()?;
        let plan = Plan::from_statement(statement)?;
        run_blocking(Arc::clone(&self.conn), move |conn| run_plan(conn, &plan)).await
    }

    async fn commit(&self) -> Result<(), DriverError> {
        self.engine.ensure_running()?;
        self.finish("COMMIT").await
    }

    async fn rollback(&self) -> Result<(), DriverError> {
        self.finish("ROLLBACK").await
    }
}

impl fmt::Debug for EmbeddedTransaction {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("EmbeddedTransaction")
            .field("store_dir", &self.engine.store_dir())
            .finish_non_exhaustive()
    }
}

/// Opens native transactions on an embedded engine.
pub(crate) struct EngineSource {
    engine: Arc<EmbeddedEngine>,
}

impl EngineSource {
    pub(crate) fn new(engine: Arc<EmbeddedEngine>) -> Self {
        Self { engine }
    }
}

#[async_trait]
impl TransactionSource for EngineSource {
    async fn begin(&self) -> Result<Box<dyn NativeTransaction>, DriverError> {
        let tx = self.engine.begin().await?;
        Ok(Box::new(tx))
    }
}
