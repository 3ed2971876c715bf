use std::fmt;

use async_trait::async_trait;

use crate::error::DriverError;
use crate::results::RowSet;
use crate::statement::Statement;

/// One transaction as the transport sees it: a SQLite transaction for the
/// embedded engine, a server-side transaction URL for the remote one.
///
/// Implementations finalize exactly once; the binding layer guarantees
/// `commit`/`rollback` are not called twice.
#[async_trait]
pub trait NativeTransaction: fmt::Debug + Send + Sync {
    async fn execute(&self, statement: &Statement) -> Result<RowSet, DriverError>;

    async fn commit(&self) -> Result<(), DriverError>;

    async fn rollback(&self) -> Result<(), DriverError>;
}

/// Anything that can open a native transaction against a transport handle.
#[async_trait]
pub trait TransactionSource: Send + Sync {
    async fn begin(&self) -> Result<Box<dyn NativeTransaction>, DriverError>;
}
