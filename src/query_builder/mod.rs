//! Statement builders for CRUD intents.
//!
//! Builders are pure: they allocate a [`Statement`] and nothing else. The
//! same statement runs unchanged on every transport.
//!
//! ```rust
//! use graph_driver::prelude::*;
//!
//! let stmt = RelationshipDeleteStatements.delete_one(42);
//! assert_eq!(stmt.parameter("id"), Some(&Value::Int(42)));
//! assert!(stmt.unbound_placeholders().is_empty());
//! ```

mod node;
mod relationship;

use std::collections::BTreeSet;

pub use node::NodeDeleteStatements;
pub use relationship::RelationshipDeleteStatements;

use crate::statement::Statement;
use crate::types::Value;

/// Delete intents over one kind of graph entity.
///
/// `delete_by_label` interpolates the label into the statement text because
/// labels and relationship types cannot be bound as parameters. The label is
/// used verbatim; callers that accept labels from untrusted input must pass
/// them through [`escape_identifier`] (or validate them) first.
pub trait DeleteStatements {
    /// Delete exactly the entity with the given internal id.
    fn delete_one(&self, id: i64) -> Statement;

    /// Delete every entity whose internal id is in `ids`.
    fn delete_many<I>(&self, ids: I) -> Statement
    where
        I: IntoIterator<Item = i64>;

    /// Delete every entity carrying `label`.
    fn delete_by_label(&self, label: &str) -> Statement;

    /// Delete every node and every relationship.
    fn purge_all(&self) -> Statement;
}

/// Escape an identifier for use between backticks by doubling any backtick
/// it contains.
#[must_use]
pub fn escape_identifier(identifier: &str) -> String {
    identifier.replace('`', "``")
}

/// Collapse an id collection into a sorted, duplicate-free list parameter so
/// generation does not depend on iteration order.
pub(crate) fn id_set<I>(ids: I) -> Value
where
    I: IntoIterator<Item = i64>,
{
    let set: BTreeSet<i64> = ids.into_iter().collect();
    Value::List(set.into_iter().map(Value::Int).collect())
}

const PURGE_ALL: &str = "MATCH (n) OPTIONAL MATCH (n)-[r]-() DELETE r, n";

pub(crate) fn purge_statement() -> Statement {
    Statement::without_parameters(PURGE_ALL)
}
