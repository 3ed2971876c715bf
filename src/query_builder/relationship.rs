use super::{DeleteStatements, id_set, purge_statement};
use crate::statement::Statement;

/// Delete statements targeting relationships.
#[derive(Debug, Clone, Copy, Default)]
pub struct RelationshipDeleteStatements;

impl DeleteStatements for RelationshipDeleteStatements {
    fn delete_one(&self, id: i64) -> Statement {
        Statement::without_parameters("MATCH (n)-[r]->() WHERE ID(r) = $id DELETE r")
            .with_parameter("id", id)
    }

    fn delete_many<I>(&self, ids: I) -> Statement
    where
        I: IntoIterator<Item = i64>,
    {
        Statement::without_parameters("MATCH (n)-[r]->() WHERE ID(r) IN $ids DELETE r")
            .with_parameter("ids", id_set(ids))
    }

    fn delete_by_label(&self, label: &str) -> Statement {
        Statement::without_parameters(format!("MATCH (n)-[r:`{label}`]-() DELETE r"))
    }

    fn purge_all(&self) -> Statement {
        purge_statement()
    }
}
