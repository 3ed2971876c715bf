use super::{DeleteStatements, id_set, purge_statement};
use crate::statement::Statement;

/// Delete statements targeting nodes. Relationships attached to a deleted
/// node are removed with it.
#[derive(Debug, Clone, Copy, Default)]
pub struct NodeDeleteStatements;

impl DeleteStatements for NodeDeleteStatements {
    fn delete_one(&self, id: i64) -> Statement {
        Statement::without_parameters(
            "MATCH (n) WHERE ID(n) = $id OPTIONAL MATCH (n)-[r]-() DELETE r, n",
        )
        .with_parameter("id", id)
    }

    fn delete_many<I>(&self, ids: I) -> Statement
    where
        I: IntoIterator<Item = i64>,
    {
        Statement::without_parameters(
            "MATCH (n) WHERE ID(n) IN $ids OPTIONAL MATCH (n)-[r]-() DELETE r, n",
        )
        .with_parameter("ids", id_set(ids))
    }

    fn delete_by_label(&self, label: &str) -> Statement {
        Statement::without_parameters(format!(
            "MATCH (n:`{label}`) OPTIONAL MATCH (n)-[r]-() DELETE r, n"
        ))
    }

    fn purge_all(&self) -> Statement {
        purge_statement()
    }
}
