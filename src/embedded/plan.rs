//! Recognition of the statement shapes the embedded engine executes.
//!
//! The engine is not a general Cypher interpreter. It accepts exactly the
//! statements produced by the builders in `query_builder` (whitespace and
//! keyword case may vary) and turns them into a [`Plan`] over its tables.

use lazy_static::lazy_static;
use regex::Regex;

use crate::error::DriverError;
use crate::statement::Statement;
use crate::types::Value;

/// Which entities a delete selects.
#[derive(Debug, Clone, PartialEq, Eq)]
pub(crate) enum Target {
    Id(i64),
    Ids(Vec<i64>),
    Label(String),
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub(crate) enum Plan {
    DeleteRelationships(Target),
    DeleteNodes(Target),
    PurgeAll,
}

const IDENT: &str = r"((?:[^`]|``)*)";

lazy_static! {
    static ref REL_BY_ID: Regex = shape(r"MATCH \(n\)-\[r\]->\(\) WHERE ID\(r\) = \$(\w+) DELETE r");
    static ref REL_BY_IDS: Regex = shape(r"MATCH \(n\)-\[r\]->\(\) WHERE ID\(r\) IN \$(\w+) DELETE r");
    static ref REL_BY_TYPE: Regex = shape(&format!(r"MATCH \(n\)-\[r:`{IDENT}`\]-\(\) DELETE r"));
    static ref NODE_BY_ID: Regex = shape(
        r"MATCH \(n\) WHERE ID\(n\) = \$(\w+) OPTIONAL MATCH \(n\)-\[r\]-\(\) DELETE r , n"
    );
    static ref NODE_BY_IDS: Regex = shape(
        r"MATCH \(n\) WHERE ID\(n\) IN \$(\w+) OPTIONAL MATCH \(n\)-\[r\]-\(\) DELETE r , n"
    );
    static ref NODE_BY_LABEL: Regex = shape(&format!(
        r"MATCH \(n:`{IDENT}`\) OPTIONAL MATCH \(n\)-\[r\]-\(\) DELETE r , n"
    ));
    static ref PURGE_ALL: Regex = shape(r"MATCH \(n\) OPTIONAL MATCH \(n\)-\[r\]-\(\) DELETE r , n");
}

/// Compile a shape where every single space means "optional whitespace".
fn shape(pattern: &str) -> Regex {
    let flexible = pattern.replace(' ', r"\s*");
    Regex::new(&format!(r"(?i)^\s*{flexible}\s*;?\s*$")).expect("statement shape must compile")
}

impl Plan {
    /// # Errors
    /// `ExecutionError` for statements outside the supported shapes or with
    /// parameters of the wrong type.
    pub(crate) fn from_statement(statement: &Statement) -> Result<Self, DriverError> {
        let text = statement.text();

        if let Some(caps) = REL_BY_ID.captures(text) {
            return Ok(Plan::DeleteRelationships(Target::Id(int_param(statement, &caps[1])?)));
        }
        if let Some(caps) = REL_BY_IDS.captures(text) {
            return Ok(Plan::DeleteRelationships(Target::Ids(int_list_param(statement, &caps[1])?)));
        }
        if let Some(caps) = REL_BY_TYPE.captures(text) {
            return Ok(Plan::DeleteRelationships(Target::Label(unescape(&caps[1]))));
        }
        if let Some(caps) = NODE_BY_ID.captures(text) {
            return Ok(Plan::DeleteNodes(Target::Id(int_param(statement, &caps[1])?)));
        }
        if let Some(caps) = NODE_BY_IDS.captures(text) {
            return Ok(Plan::DeleteNodes(Target::Ids(int_list_param(statement, &caps[1])?)));
        }
        if let Some(caps) = NODE_BY_LABEL.captures(text) {
            return Ok(Plan::DeleteNodes(Target::Label(unescape(&caps[1]))));
        }
        if PURGE_ALL.is_match(text) {
            return Ok(Plan::PurgeAll);
        }

        Err(DriverError::ExecutionError(format!(
            "statement not supported by the embedded engine: {text}"
        )))
    }
}

fn unescape(identifier: &str) -> String {
    identifier.replace("``", "`")
}

fn param<'a>(statement: &'a Statement, name: &str) -> Result<&'a Value, DriverError> {
    statement
        .parameter(name)
        .ok_or_else(|| DriverError::ExecutionError(format!("parameter ${name} is not bound")))
}

fn int_param(statement: &Statement, name: &str) -> Result<i64, DriverError> {
    param(statement, name)?
        .as_int()
        .ok_or_else(|| DriverError::ExecutionError(format!("parameter ${name} must be an integer")))
}

fn int_list_param(statement: &Statement, name: &str) -> Result<Vec<i64>, DriverError> {
    param(statement, name)?.as_int_list().ok_or_else(|| {
        DriverError::ExecutionError(format!("parameter ${name} must be a list of integers"))
    })
}
