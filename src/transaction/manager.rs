//! Context-keyed registry of the active transaction.

use std::collections::HashMap;
use std::sync::Arc;

use parking_lot::RwLock;

use super::binding::ActiveTransaction;
use super::context::ExecutionContext;
use crate::error::DriverError;

/// Tracks at most one active transaction per execution context.
///
/// Pure bookkeeping: it never opens, commits or rolls back anything. Cloning
/// is cheap and every clone sees the same registrations.
#[derive(Clone, Default)]
pub struct TransactionManager {
    active: Arc<RwLock<HashMap<ExecutionContext, Arc<ActiveTransaction>>>>,
}

impl TransactionManager {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// The transaction currently registered for `ctx`, if any.
    #[must_use]
    pub fn current(&self, ctx: &ExecutionContext) -> Option<Arc<ActiveTransaction>> {
        self.active.read().get(ctx).cloned()
    }

    /// Register `tx` as the current transaction of `ctx`.
    ///
    /// # Errors
    /// Returns `DriverError::TransactionStateError` if `ctx` already has one.
    pub fn bind(
        &self,
        ctx: &ExecutionContext,
        tx: Arc<ActiveTransaction>,
    ) -> Result<(), DriverError> {
        let mut active = self.active.write();
        if let Some(existing) = active.get(ctx) {
            return Err(DriverError::TransactionStateError(format!(
                "{ctx} already has active transaction {}",
                existing.id()
            )));
        }
        active.insert(*ctx, tx);
        Ok(())
    }

    /// Forget the transaction registered for `ctx`.
    pub fn clear(&self, ctx: &ExecutionContext) -> Option<Arc<ActiveTransaction>> {
        self.active.write().remove(ctx)
    }

    /// Forget the registration only if it still points at transaction `tx_id`.
    pub(crate) fn clear_if(&self, ctx: &ExecutionContext, tx_id: u64) {
        let mut active = self.active.write();
        if active.get(ctx).is_some_and(|tx| tx.id() == tx_id) {
            active.remove(ctx);
        }
    }

    /// Number of contexts with a registered transaction.
    #[must_use]
    pub fn active_count(&self) -> usize {
        self.active.read().len()
    }
}

impl std::fmt::Debug for TransactionManager {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("TransactionManager")
            .field("active", &self.active_count())
            .finish()
    }
}
