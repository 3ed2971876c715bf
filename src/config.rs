use std::collections::BTreeMap;
use std::fmt;
use std::sync::Arc;
use std::time::Duration;

use crate::error::DriverError;

#[cfg(feature = "embedded")]
use crate::embedded::EmbeddedEngine;
#[cfg(feature = "remote")]
use crate::remote::HttpClient;

/// Embedded store location.
pub const STORE_DIR: &str = "store_dir";
/// Base URI of a remote server, e.g. `http://localhost:7474`.
pub const URI: &str = "uri";
pub const USERNAME: &str = "username";
pub const PASSWORD: &str = "password";
/// Remote client pool size, passed through to the HTTP client.
pub const POOL_SIZE: &str = "pool_size";
/// Remote request timeout in seconds, passed through to the HTTP client.
pub const TIMEOUT_SECS: &str = "timeout_secs";
/// How long an embedded transaction waits for the engine's write lock.
pub const BUSY_TIMEOUT_MS: &str = "busy_timeout_ms";

pub(crate) const DEFAULT_BUSY_TIMEOUT: Duration = Duration::from_millis(5_000);

/// Which transport a configuration targets.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum TransportKind {
    /// In-process engine at a store location
    Embedded,
    /// Out-of-process server reached over HTTP
    Remote,
}

/// The live connection or engine a driver executes against.
#[derive(Clone)]
pub enum TransportHandle {
    #[cfg(feature = "embedded")]
    Embedded(Arc<EmbeddedEngine>),
    #[cfg(feature = "remote")]
    Remote(Arc<dyn HttpClient>),
}

impl fmt::Debug for TransportHandle {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            #[cfg(feature = "embedded")]
            Self::Embedded(engine) => f.debug_tuple("Embedded").field(engine).finish(),
            #[cfg(feature = "remote")]
            Self::Remote(_) => f.debug_tuple("Remote").field(&"<HttpClient>").finish(),
        }
    }
}

/// Credentials handed to the remote client untouched.
#[derive(Clone, PartialEq, Eq)]
pub struct Credentials {
    pub username: String,
    pub password: String,
}

impl fmt::Debug for Credentials {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Credentials")
            .field("username", &self.username)
            .field("password", &"<redacted>")
            .finish()
    }
}

/// Driver configuration: an option map read once at construction plus the
/// transport slot that `configure` fills in.
///
/// ```rust
/// use graph_driver::prelude::*;
///
/// let config = Configuration::new()
///     .with_store_dir("/tmp/graph.db")
///     .with_option("busy_timeout_ms", "250");
/// assert_eq!(config.kind(), TransportKind::Embedded);
/// ```
#[derive(Debug, Clone, Default)]
pub struct Configuration {
    options: BTreeMap<String, String>,
    transport: Option<TransportHandle>,
}

impl Configuration {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Build from key/value pairs; later pairs override earlier ones.
    pub fn from_pairs<I, K, V>(pairs: I) -> Self
    where
        I: IntoIterator<Item = (K, V)>,
        K: Into<String>,
        V: Into<String>,
    {
        Self {
            options: pairs
                .into_iter()
                .map(|(k, v)| (k.into(), v.into()))
                .collect(),
            transport: None,
        }
    }

    #[must_use]
    pub fn with_option(mut self, key: impl Into<String>, value: impl Into<String>) -> Self {
        self.options.insert(key.into(), value.into());
        self
    }

    #[must_use]
    pub fn with_store_dir(self, store_dir: impl Into<String>) -> Self {
        self.with_option(STORE_DIR, store_dir)
    }

    #[must_use]
    pub fn with_uri(self, uri: impl Into<String>) -> Self {
        self.with_option(URI, uri)
    }

    #[must_use]
    pub fn with_credentials(self, username: impl Into<String>, password: impl Into<String>) -> Self {
        self.with_option(USERNAME, username)
            .with_option(PASSWORD, password)
    }

    #[must_use]
    pub fn get(&self, key: &str) -> Option<&str> {
        self.options.get(key).map(String::as_str)
    }

    #[must_use]
    pub fn options(&self) -> &BTreeMap<String, String> {
        &self.options
    }

    /// A configuration naming a `uri` targets a remote server; anything else
    /// is embedded.
    #[must_use]
    pub fn kind(&self) -> TransportKind {
        if self.options.contains_key(URI) {
            TransportKind::Remote
        } else {
            TransportKind::Embedded
        }
    }

    #[must_use]
    pub fn store_dir(&self) -> Option<&str> {
        self.get(STORE_DIR).filter(|s| !s.trim().is_empty())
    }

    #[must_use]
    pub fn uri(&self) -> Option<&str> {
        self.get(URI).filter(|s| !s.trim().is_empty())
    }

    /// Both username and password, or neither.
    ///
    /// # Errors
    /// Returns `DriverError::ConfigError` when only one of the two is set.
    pub fn credentials(&self) -> Result<Option<Credentials>, DriverError> {
        match (self.get(USERNAME), self.get(PASSWORD)) {
            (Some(username), Some(password)) => Ok(Some(Credentials {
                username: username.to_string(),
                password: password.to_string(),
            })),
            (None, None) => Ok(None),
            _ => Err(DriverError::ConfigError(
                "username and password must be set together".to_string(),
            )),
        }
    }

    /// # Errors
    /// Returns `DriverError::ConfigError` if the value is not a positive integer.
    pub fn pool_size(&self) -> Result<Option<usize>, DriverError> {
        match self.parse_u64(POOL_SIZE)? {
            Some(0) => Err(DriverError::ConfigError(format!(
                "{POOL_SIZE} must be greater than zero"
            ))),
            Some(n) => usize::try_from(n)
                .map(Some)
                .map_err(|e| DriverError::ConfigError(format!("{POOL_SIZE}: {e}"))),
            None => Ok(None),
        }
    }

    /// # Errors
    /// Returns `DriverError::ConfigError` if the value is not an integer.
    pub fn timeout(&self) -> Result<Option<Duration>, DriverError> {
        Ok(self.parse_u64(TIMEOUT_SECS)?.map(Duration::from_secs))
    }

    /// # Errors
    /// Returns `DriverError::ConfigError` if the value is not an integer.
    pub fn busy_timeout(&self) -> Result<Duration, DriverError> {
        Ok(self
            .parse_u64(BUSY_TIMEOUT_MS)?
            .map_or(DEFAULT_BUSY_TIMEOUT, Duration::from_millis))
    }

    fn parse_u64(&self, key: &str) -> Result<Option<u64>, DriverError> {
        self.get(key)
            .map(|raw| {
                raw.trim().parse::<u64>().map_err(|e| {
                    DriverError::ConfigError(format!("{key} must be an integer, got {raw:?}: {e}"))
                })
            })
            .transpose()
    }

    /// The handle recorded by the driver's `configure`, if any.
    #[must_use]
    pub fn transport(&self) -> Option<&TransportHandle> {
        self.transport.as_ref()
    }

    pub(crate) fn set_transport(&mut self, handle: TransportHandle) {
        self.transport = Some(handle);
    }

    pub(crate) fn clear_transport(&mut self) -> Option<TransportHandle> {
        self.transport.take()
    }
}

/// Options the remote driver hands to its HTTP client.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ClientOptions {
    pub credentials: Option<Credentials>,
    pub pool_size: Option<usize>,
    pub timeout: Option<Duration>,
}

impl ClientOptions {
    /// # Errors
    /// Returns `DriverError::ConfigError` if any client option fails to parse.
    pub fn from_config(config: &Configuration) -> Result<Self, DriverError> {
        Ok(Self {
            credentials: config.credentials()?,
            pool_size: config.pool_size()?,
            timeout: config.timeout()?,
        })
    }
}
