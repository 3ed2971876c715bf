//! Transaction bookkeeping shared by every transport.
//!
//! - context: the explicit execution-context value
//! - manager: context → active transaction registry
//! - binding: commit/rollback/close with creator and joiner participation
//! - native: the traits a transport implements

pub mod binding;
pub mod context;
pub mod manager;
pub mod native;

use std::sync::Arc;

use tracing::{debug, warn};

pub use binding::{ActiveTransaction, Participation, TransactionBinding, TxState};
pub use context::ExecutionContext;
pub use manager::TransactionManager;
pub use native::{NativeTransaction, TransactionSource};

use crate::error::DriverError;

/// Join the context's open transaction, or begin a native one and register it.
///
/// # Errors
/// `TransactionStateError` if the registered transaction was already
/// finalized without being closed, or if another caller registered a
/// transaction for `ctx` while this one was beginning; transport errors from
/// `begin` are passed through.
pub async fn join_or_begin(
    source: &dyn TransactionSource,
    manager: &TransactionManager,
    ctx: &ExecutionContext,
) -> Result<TransactionBinding, DriverError> {
    if let Some(active) = manager.current(ctx) {
        if active.is_finished() {
            return Err(DriverError::TransactionStateError(format!(
                "{ctx} still holds finalized transaction {}; close it before starting another",
                active.id()
            )));
        }
        debug!(%ctx, tx = active.id(), "using current transaction");
        return Ok(TransactionBinding::join(active, *ctx, manager.clone()));
    }

    debug!(%ctx, "no current transaction, starting a new one");
    let active = Arc::new(ActiveTransaction::new(source.begin().await?));
    if let Err(err) = manager.bind(ctx, Arc::clone(&active)) {
        if let Err(rollback_err) = active.finish(false).await {
            warn!(%ctx, tx = active.id(), error = %rollback_err, "rollback of unregistered transaction failed");
        }
        return Err(err);
    }
    debug!(%ctx, tx = active.id(), "native transaction started");
    Ok(TransactionBinding::create(active, *ctx, manager.clone()))
}
