//! The boundary to whatever HTTP stack the application uses.

use async_trait::async_trait;
use serde_json::Value as JsonValue;

use crate::config::{ClientOptions, Credentials};
use crate::error::DriverError;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum HttpMethod {
    Post,
    Delete,
}

#[derive(Debug, Clone)]
pub struct HttpRequest {
    pub method: HttpMethod,
    pub url: String,
    /// JSON body; `None` for requests without one.
    pub body: Option<JsonValue>,
    /// Credentials from the driver configuration, for the client to apply
    /// (typically as basic auth).
    pub credentials: Option<Credentials>,
}

#[derive(Debug, Clone)]
pub struct HttpResponse {
    pub status: u16,
    /// The `Location` header, if present.
    pub location: Option<String>,
    /// Parsed JSON body; `Null` when the body was empty.
    pub body: JsonValue,
}

impl HttpResponse {
    #[must_use]
    pub fn new(status: u16, body: JsonValue) -> Self {
        Self {
            status,
            location: None,
            body,
        }
    }

    #[must_use]
    pub fn with_location(mut self, location: impl Into<String>) -> Self {
        self.location = Some(location.into());
        self
    }
}

/// HTTP client abstraction used by the remote driver.
///
/// Implement this over the application's HTTP library. Connection pooling,
/// TLS and timeouts are the implementation's business; the driver hands over
/// its configured [`ClientOptions`] once through `configure`.
#[async_trait]
pub trait HttpClient: Send + Sync {
    /// Send one request and return the response.
    ///
    /// Transport-level failures (connection refused, timeout) should be
    /// reported as `DriverError::ResourceError`; any HTTP status is a
    /// successful `send`.
    async fn send(&self, request: HttpRequest) -> Result<HttpResponse, DriverError>;

    /// Apply pass-through options from the driver configuration.
    ///
    /// # Errors
    /// `ConfigError` if the client cannot honour the options.
    fn configure(&self, _options: &ClientOptions) -> Result<(), DriverError> {
        Ok(())
    }

    /// Release pooled connections. Called once by the owning driver's `close`.
    fn close(&self) {}
}
