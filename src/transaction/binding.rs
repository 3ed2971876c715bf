use std::fmt;
use std::sync::Arc;
use std::sync::atomic::{AtomicBool, AtomicU64, AtomicUsize, Ordering};

use tracing::{debug, warn};

use super::context::ExecutionContext;
use super::manager::TransactionManager;
use super::native::NativeTransaction;
use crate::error::DriverError;
use crate::results::RowSet;
use crate::statement::Statement;

static NEXT_TRANSACTION_ID: AtomicU64 = AtomicU64::new(1);

/// Lifecycle of a [`TransactionBinding`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TxState {
    Open,
    Committed,
    RolledBack,
    Closed,
}

/// How a binding relates to the native transaction it wraps.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Participation {
    /// Began the native transaction and alone may finalize it.
    Creator,
    /// Joined a transaction already open in the same context.
    Joiner,
}

/// A native transaction shared by its creator and any joiners.
///
/// This is what the [`TransactionManager`] registers per context.
pub struct ActiveTransaction {
    id: u64,
    native: Box<dyn NativeTransaction>,
    participants: AtomicUsize,
    rollback_only: AtomicBool,
    finished: AtomicBool,
}

impl ActiveTransaction {
    pub(crate) fn new(native: Box<dyn NativeTransaction>) -> Self {
        Self {
            id: NEXT_TRANSACTION_ID.fetch_add(1, Ordering::Relaxed),
            native,
            participants: AtomicUsize::new(0),
            rollback_only: AtomicBool::new(false),
            finished: AtomicBool::new(false),
        }
    }

    /// Process-unique id of the native transaction.
    #[must_use]
    pub fn id(&self) -> u64 {
        self.id
    }

    /// Bindings (creator included) that have not yet left the transaction.
    #[must_use]
    pub fn participants(&self) -> usize {
        self.participants.load(Ordering::SeqCst)
    }

    #[must_use]
    pub fn is_rollback_only(&self) -> bool {
        self.rollback_only.load(Ordering::SeqCst)
    }

    /// True once the native transaction has been committed or rolled back.
    #[must_use]
    pub fn is_finished(&self) -> bool {
        self.finished.load(Ordering::SeqCst)
    }

    pub(crate) fn mark_rollback_only(&self) {
        self.rollback_only.store(true, Ordering::SeqCst);
    }

    pub(crate) async fn execute(&self, statement: &Statement) -> Result<RowSet, DriverError> {
        if self.is_finished() {
            return Err(DriverError::TransactionStateError(format!(
                "transaction {} has already been finalized",
                self.id
            )));
        }
        self.native.execute(statement).await
    }

    /// Commit or roll back the native transaction. Only the first call
    /// reaches the transport.
    pub(crate) async fn finish(&self, commit: bool) -> Result<(), DriverError> {
        if self.finished.swap(true, Ordering::SeqCst) {
            return Err(DriverError::TransactionStateError(format!(
                "transaction {} has already been finalized",
                self.id
            )));
        }
        if commit {
            debug!(tx = self.id, "committing native transaction");
            if let Err(err) = self.native.commit().await {
                warn!(tx = self.id, error = %err, "commit failed, rolling back");
                if let Err(rollback_err) = self.native.rollback().await {
                    warn!(tx = self.id, error = %rollback_err, "rollback after failed commit also failed");
                }
                return Err(err);
            }
            Ok(())
        } else {
            debug!(tx = self.id, "rolling back native transaction");
            self.native.rollback().await
        }
    }
}

impl fmt::Debug for ActiveTransaction {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ActiveTransaction")
            .field("id", &self.id)
            .field("native", &self.native)
            .field("participants", &self.participants())
            .field("rollback_only", &self.is_rollback_only())
            .field("finished", &self.is_finished())
            .finish()
    }
}

/// A caller's handle on the context's transaction.
///
/// Only the [`Participation::Creator`] finalizes the native transaction.
/// A joiner's `commit` just ends its participation; a joiner's `rollback`
/// marks the whole transaction rollback-only, which makes the creator's
/// later `commit` roll back and fail.
pub struct TransactionBinding {
    active: Arc<ActiveTransaction>,
    participation: Participation,
    state: TxState,
    context: ExecutionContext,
    manager: TransactionManager,
    participating: bool,
}

impl TransactionBinding {
    pub(crate) fn create(
        active: Arc<ActiveTransaction>,
        context: ExecutionContext,
        manager: TransactionManager,
    ) -> Self {
        Self::enter(active, Participation::Creator, context, manager)
    }

    pub(crate) fn join(
        active: Arc<ActiveTransaction>,
        context: ExecutionContext,
        manager: TransactionManager,
    ) -> Self {
        Self::enter(active, Participation::Joiner, context, manager)
    }

    fn enter(
        active: Arc<ActiveTransaction>,
        participation: Participation,
        context: ExecutionContext,
        manager: TransactionManager,
    ) -> Self {
        active.participants.fetch_add(1, Ordering::SeqCst);
        Self {
            active,
            participation,
            state: TxState::Open,
            context,
            manager,
            participating: true,
        }
    }

    #[must_use]
    pub fn state(&self) -> TxState {
        self.state
    }

    #[must_use]
    pub fn participation(&self) -> Participation {
        self.participation
    }

    #[must_use]
    pub fn is_creator(&self) -> bool {
        self.participation == Participation::Creator
    }

    #[must_use]
    pub fn context(&self) -> ExecutionContext {
        self.context
    }

    /// Id of the wrapped native transaction; equal ids mean a shared
    /// native transaction.
    #[must_use]
    pub fn transaction_id(&self) -> u64 {
        self.active.id()
    }

    #[must_use]
    pub fn is_rollback_only(&self) -> bool {
        self.active.is_rollback_only()
    }

    /// Run a statement inside this transaction.
    ///
    /// # Errors
    /// `TransactionStateError` unless the binding is open; otherwise whatever
    /// the transport reports, untouched.
    pub async fn execute(&self, statement: &Statement) -> Result<RowSet, DriverError> {
        self.ensure_open("execute")?;
        statement.ensure_bound()?;
        self.active.execute(statement).await
    }

    /// Commit. For a joiner this only ends its participation.
    ///
    /// # Errors
    /// `TransactionStateError` if the binding is not open, if joiners are
    /// still open when the creator commits, or if a joiner marked the
    /// transaction rollback-only (the native transaction is rolled back).
    pub async fn commit(&mut self) -> Result<(), DriverError> {
        self.ensure_open("commit")?;
        match self.participation {
            Participation::Joiner => {
                debug!(ctx = %self.context, tx = self.active.id(), "joiner leaves on commit");
                self.leave();
                self.state = TxState::Committed;
                Ok(())
            }
            Participation::Creator => {
                let joined = self.active.participants().saturating_sub(1);
                if joined > 0 {
                    return Err(DriverError::TransactionStateError(format!(
                        "cannot commit transaction {}: {joined} joined participant(s) still open",
                        self.active.id()
                    )));
                }
                if self.active.is_rollback_only() {
                    let rolled_back = self.active.finish(false).await;
                    self.state = TxState::RolledBack;
                    rolled_back?;
                    return Err(DriverError::TransactionStateError(format!(
                        "transaction {} was marked rollback-only by a participant and has been rolled back",
                        self.active.id()
                    )));
                }
                match self.active.finish(true).await {
                    Ok(()) => {
                        self.state = TxState::Committed;
                        Ok(())
                    }
                    Err(err) => {
                        self.state = TxState::RolledBack;
                        Err(err)
                    }
                }
            }
        }
    }

    /// Roll back. For a joiner this marks the shared transaction
    /// rollback-only and ends its participation.
    ///
    /// # Errors
    /// `TransactionStateError` if the binding is not open, or the transport's
    /// rollback error.
    pub async fn rollback(&mut self) -> Result<(), DriverError> {
        self.ensure_open("rollback")?;
        self.state = TxState::RolledBack;
        match self.participation {
            Participation::Joiner => {
                debug!(ctx = %self.context, tx = self.active.id(), "joiner marks transaction rollback-only");
                self.active.mark_rollback_only();
                self.leave();
                Ok(())
            }
            Participation::Creator => self.active.finish(false).await,
        }
    }

    /// Close the binding. A creator closing an open binding rolls the native
    /// transaction back; a joiner closing an open binding marks it
    /// rollback-only. A creator always deregisters it from the manager.
    ///
    /// # Errors
    /// `TransactionStateError` if already closed, or the implicit rollback's
    /// error.
    pub async fn close(&mut self) -> Result<(), DriverError> {
        if self.state == TxState::Closed {
            return Err(DriverError::TransactionStateError(format!(
                "transaction {} binding is already closed",
                self.active.id()
            )));
        }
        let mut result = Ok(());
        if self.state == TxState::Open {
            result = match self.participation {
                Participation::Creator => self.active.finish(false).await,
                Participation::Joiner => {
                    debug!(ctx = %self.context, tx = self.active.id(), "joiner closed while open, marking rollback-only");
                    self.active.mark_rollback_only();
                    Ok(())
                }
            };
        }
        self.leave();
        if self.is_creator() {
            self.manager.clear_if(&self.context, self.active.id());
        }
        self.state = TxState::Closed;
        result
    }

    fn ensure_open(&self, operation: &str) -> Result<(), DriverError> {
        if self.state == TxState::Open {
            Ok(())
        } else {
            Err(DriverError::TransactionStateError(format!(
                "cannot {operation} transaction {}: binding is {:?}",
                self.active.id(),
                self.state
            )))
        }
    }

    fn leave(&mut self) {
        if self.participating {
            self.participating = false;
            self.active.participants.fetch_sub(1, Ordering::SeqCst);
        }
    }
}

impl fmt::Debug for TransactionBinding {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("TransactionBinding")
            .field("tx", &self.active.id())
            .field("participation", &self.participation)
            .field("state", &self.state)
            .field("context", &self.context)
            .finish()
    }
}

impl Drop for TransactionBinding {
    fn drop(&mut self) {
        if self.state == TxState::Closed {
            return;
        }
        if !self.is_creator() {
            if self.state == TxState::Open && self.participating {
                warn!(ctx = %self.context, tx = self.active.id(), "joiner dropped while open, marking rollback-only");
                self.active.mark_rollback_only();
            }
            self.leave();
            return;
        }
        self.leave();
        self.manager.clear_if(&self.context, self.active.id());
        if self.active.is_finished() {
            return;
        }
        warn!(ctx = %self.context, tx = self.active.id(), "transaction dropped while open, rolling back");
        if let Ok(handle) = tokio::runtime::Handle::try_current() {
            let active = Arc::clone(&self.active);
            handle.spawn(async move {
                if let Err(err) = active.finish(false).await {
                    warn!(tx = active.id(), error = %err, "drop-time rollback failed");
                }
            });
        }
    }
}
