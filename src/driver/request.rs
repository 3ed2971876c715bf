use std::fmt;
use std::sync::Arc;

use tracing::warn;

use crate::error::DriverError;
use crate::results::RowSet;
use crate::statement::Statement;
use crate::transaction::{
    ActiveTransaction, ExecutionContext, TransactionManager, TransactionSource, join_or_begin,
};

/// Executes statements against a transport, inside whatever transaction the
/// caller's context currently holds.
///
/// With no open transaction a statement runs in its own auto-commit
/// transaction.
#[derive(Clone)]
pub struct RequestHandler {
    source: Arc<dyn TransactionSource>,
    manager: TransactionManager,
}

impl RequestHandler {
    #[must_use]
    pub fn new(source: Arc<dyn TransactionSource>, manager: TransactionManager) -> Self {
        Self { source, manager }
    }

    #[must_use]
    pub fn transaction_manager(&self) -> &TransactionManager {
        &self.manager
    }

    /// Execute one statement.
    ///
    /// # Errors
    /// `ExecutionError` for unbound placeholders (nothing is sent to the
    /// transport); otherwise the transport's error, untouched.
    pub async fn execute(
        &self,
        ctx: &ExecutionContext,
        statement: &Statement,
    ) -> Result<RowSet, DriverError> {
        statement.ensure_bound()?;
        if let Some(active) = self.manager.current(ctx) {
            return active.execute(statement).await;
        }

        let active = ActiveTransaction::new(self.source.begin().await?);
        match active.execute(statement).await {
            Ok(rows) => {
                active.finish(true).await?;
                Ok(rows)
            }
            Err(err) => {
                if let Err(rollback_err) = active.finish(false).await {
                    warn!(%ctx, tx = active.id(), error = %rollback_err, "auto-commit rollback failed");
                }
                Err(err)
            }
        }
    }

    /// Execute statements in order inside one transaction, joining the
    /// context's transaction when there is one.
    ///
    /// Stops at the first failure and rolls back (or, when joined, marks the
    /// surrounding transaction rollback-only).
    ///
    /// # Errors
    /// The first failing statement's error, or the commit error.
    pub async fn execute_all(
        &self,
        ctx: &ExecutionContext,
        statements: &[Statement],
    ) -> Result<Vec<RowSet>, DriverError> {
        for statement in statements {
            statement.ensure_bound()?;
        }
        let mut tx = join_or_begin(self.source.as_ref(), &self.manager, ctx).await?;
        let mut results = Vec::with_capacity(statements.len());
        for statement in statements {
            match tx.execute(statement).await {
                Ok(rows) => results.push(rows),
                Err(err) => {
                    if let Err(rollback_err) = tx.rollback().await {
                        warn!(%ctx, tx = tx.transaction_id(), error = %rollback_err, "batch rollback failed");
                    }
                    if let Err(close_err) = tx.close().await {
                        warn!(%ctx, tx = tx.transaction_id(), error = %close_err, "batch close failed");
                    }
                    return Err(err);
                }
            }
        }
        let committed = tx.commit().await;
        tx.close().await?;
        committed.map(|()| results)
    }
}

impl fmt::Debug for RequestHandler {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("RequestHandler")
            .field("manager", &self.manager)
            .finish_non_exhaustive()
    }
}
