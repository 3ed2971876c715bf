//! Transactional access layer for graph databases.
//!
//! Statement builders turn CRUD intents into parameterized Cypher
//! [`Statement`]s. Drivers bind those statements to a transport: an
//! in-process [`EmbeddedEngine`](embedded::EmbeddedEngine) shared by the
//! whole process, or a server reached through the transactional HTTP
//! endpoint. Transactions follow a join-or-create rule per
//! [`ExecutionContext`]: asking for a transaction while one is open in the
//! same context joins it instead of opening a second one.
//!
//! ```rust,no_run
//! use graph_driver::prelude::*;
//!
//! # async fn demo() -> Result<(), DriverError> {
//! let mut driver = EmbeddedDriver::new();
//! driver.configure(Configuration::new().with_store_dir("/tmp/graph.db"))?;
//!
//! let ctx = ExecutionContext::new();
//! let mut tx = driver.new_transaction(&ctx).await?;
//! let handler = driver.request_handler()?;
//! handler
//!     .execute(&ctx, &RelationshipDeleteStatements.delete_one(42))
//!     .await?;
//! tx.commit().await?;
//! tx.close().await?;
//! driver.close()?;
//! # Ok(())
//! # }
//! ```

#[cfg(not(any(feature = "embedded", feature = "remote")))]
compile_error!("enable at least one of the `embedded` or `remote` features");

pub mod config;
pub mod driver;
pub mod error;
pub mod prelude;
pub mod query_builder;
pub mod results;
pub mod statement;
pub mod transaction;
pub mod types;

#[cfg(feature = "embedded")]
pub mod embedded;
#[cfg(feature = "remote")]
pub mod remote;

pub use error::DriverError;
pub use statement::Statement;
pub use transaction::ExecutionContext;
