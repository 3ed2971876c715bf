//! The immutable (text, parameters) pair every builder produces and every
//! transport executes.

mod scanner;

use std::fmt;

use crate::error::DriverError;
use crate::types::{Parameters, Value};

/// An executable Cypher statement plus its bound parameters.
#[derive(Debug, Clone, PartialEq)]
pub struct Statement {
    text: String,
    parameters: Parameters,
}

impl Statement {
    #[must_use]
    pub fn new(text: impl Into<String>, parameters: Parameters) -> Self {
        Self {
            text: text.into(),
            parameters,
        }
    }

    /// A statement that binds no parameters.
    #[must_use]
    pub fn without_parameters(text: impl Into<String>) -> Self {
        Self::new(text, Parameters::new())
    }

    /// Builder-style helper that binds one more parameter.
    #[must_use]
    pub fn with_parameter(mut self, name: impl Into<String>, value: impl Into<Value>) -> Self {
        self.parameters.insert(name.into(), value.into());
        self
    }

    #[must_use]
    pub fn text(&self) -> &str {
        &self.text
    }

    #[must_use]
    pub fn parameters(&self) -> &Parameters {
        &self.parameters
    }

    #[must_use]
    pub fn parameter(&self, name: &str) -> Option<&Value> {
        self.parameters.get(name)
    }

    /// Placeholder names referenced by the text, in order of first use.
    #[must_use]
    pub fn placeholders(&self) -> Vec<&str> {
        scanner::placeholder_names(&self.text)
    }

    /// Placeholders in the text that have no bound parameter.
    #[must_use]
    pub fn unbound_placeholders(&self) -> Vec<&str> {
        self.placeholders()
            .into_iter()
            .filter(|name| !self.parameters.contains_key(*name))
            .collect()
    }

    /// Fail if any placeholder is left unbound.
    ///
    /// # Errors
    /// Returns `DriverError::ExecutionError` naming the unbound placeholders.
    pub fn ensure_bound(&self) -> Result<(), DriverError> {
        let unbound = self.unbound_placeholders();
        if unbound.is_empty() {
            Ok(())
        } else {
            Err(DriverError::ExecutionError(format!(
                "unbound placeholders in statement: ${}",
                unbound.join(", $")
            )))
        }
    }
}

impl fmt::Display for Statement {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.text)
    }
}
