//! Convenient imports for common functionality.

pub use crate::config::{ClientOptions, Configuration, Credentials, TransportHandle, TransportKind};
pub use crate::driver::{AnyDriver, Driver, DriverState, RequestHandler};
pub use crate::error::DriverError;
pub use crate::query_builder::{
    DeleteStatements, NodeDeleteStatements, RelationshipDeleteStatements, escape_identifier,
};
pub use crate::results::{Row, RowSet};
pub use crate::statement::Statement;
pub use crate::transaction::{
    ExecutionContext, Participation, TransactionBinding, TransactionManager, TxState,
};
pub use crate::types::{Parameters, Value};

#[cfg(feature = "embedded")]
pub use crate::embedded::{EmbeddedDriver, EmbeddedEngine, EngineRegistry};

#[cfg(feature = "remote")]
pub use crate::remote::{HttpClient, HttpMethod, HttpRequest, HttpResponse, RemoteDriver};
