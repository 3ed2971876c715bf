#![allow(dead_code)]

use std::sync::Arc;
use std::sync::Once;
use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};

use async_trait::async_trait;
use graph_driver::prelude::*;
use graph_driver::transaction::{NativeTransaction, TransactionSource};
use parking_lot::Mutex;

static TRACING: Once = Once::new();

/// Route `tracing` output through the test harness's captured writer.
pub fn init_tracing() {
    TRACING.call_once(|| {
        let _ = tracing_subscriber::fmt()
            .with_test_writer()
            .with_max_level(tracing::Level::DEBUG)
            .try_init();
    });
}

/// Counters shared between a `CountingSource` and the transactions it opens.
#[derive(Debug, Default)]
pub struct NativeLog {
    pub begun: AtomicUsize,
    pub committed: AtomicUsize,
    pub rolled_back: AtomicUsize,
    pub executed: Mutex<Vec<String>>,
    /// Make every native rollback fail after being counted.
    pub fail_rollback: AtomicBool,
}

impl NativeLog {
    pub fn begun(&self) -> usize {
        self.begun.load(Ordering::SeqCst)
    }

    pub fn committed(&self) -> usize {
        self.committed.load(Ordering::SeqCst)
    }

    pub fn rolled_back(&self) -> usize {
        self.rolled_back.load(Ordering::SeqCst)
    }
}

#[derive(Debug)]
pub struct CountingTransaction {
    log: Arc<NativeLog>,
}

#[async_trait]
impl NativeTransaction for CountingTransaction {
    async fn execute(&self, statement: &Statement) -> Result<RowSet, DriverError> {
        if statement.text().contains("FAIL") {
            return Err(DriverError::ExecutionError("forced failure".into()));
        }
        self.log.executed.lock().push(statement.text().to_string());
        Ok(RowSet::affected(1))
    }

    async fn commit(&self) -> Result<(), DriverError> {
        self.log.committed.fetch_add(1, Ordering::SeqCst);
        Ok(())
    }

    async fn rollback(&self) -> Result<(), DriverError> {
        self.log.rolled_back.fetch_add(1, Ordering::SeqCst);
        if self.log.fail_rollback.load(Ordering::SeqCst) {
            return Err(DriverError::ResourceError("rollback refused".into()));
        }
        Ok(())
    }
}

/// A transaction source that only counts what happens to its transactions.
#[derive(Debug, Default)]
pub struct CountingSource {
    pub log: Arc<NativeLog>,
}

#[async_trait]
impl TransactionSource for CountingSource {
    async fn begin(&self) -> Result<Box<dyn NativeTransaction>, DriverError> {
        self.log.begun.fetch_add(1, Ordering::SeqCst);
        Ok(Box::new(CountingTransaction {
            log: Arc::clone(&self.log),
        }))
    }
}

#[cfg(feature = "remote")]
pub use fake_server::{FakeGraphServer, Recorded};

#[cfg(feature = "remote")]
mod fake_server {
    use std::collections::HashMap;
    use std::sync::Arc;

    use async_trait::async_trait;
    use graph_driver::prelude::*;
    use parking_lot::Mutex;

    /// One request as seen by the fake server.
    #[derive(Debug, Clone)]
    pub struct Recorded {
        pub method: HttpMethod,
        pub url: String,
        pub body: Option<serde_json::Value>,
    }

    #[derive(Debug, Default)]
    struct ServerState {
        next_tx: u64,
        open: HashMap<u64, Vec<String>>,
        committed: Vec<String>,
        rolled_back: usize,
        requests: Vec<Recorded>,
        options: Option<ClientOptions>,
        closed: bool,
    }

    /// In-memory stand-in for a graph server's transactional HTTP endpoint.
    #[derive(Debug)]
    pub struct FakeGraphServer {
        base: String,
        required: Option<Credentials>,
        state: Mutex<ServerState>,
    }

    impl FakeGraphServer {
        pub const BASE: &'static str = "http://graph.test:7474";

        pub fn new() -> Arc<Self> {
            Arc::new(Self {
                base: Self::BASE.to_string(),
                required: None,
                state: Mutex::new(ServerState::default()),
            })
        }

        pub fn requiring(username: &str, password: &str) -> Arc<Self> {
            Arc::new(Self {
                base: Self::BASE.to_string(),
                required: Some(Credentials {
                    username: username.to_string(),
                    password: password.to_string(),
                }),
                state: Mutex::new(ServerState::default()),
            })
        }

        pub fn requests(&self) -> Vec<Recorded> {
            self.state.lock().requests.clone()
        }

        pub fn begin_count(&self) -> usize {
            self.state
                .lock()
                .requests
                .iter()
                .filter(|r| r.url == format!("{}/db/data/transaction", self.base))
                .count()
        }

        pub fn open_transactions(&self) -> usize {
            self.state.lock().open.len()
        }

        pub fn committed_statements(&self) -> Vec<String> {
            self.state.lock().committed.clone()
        }

        pub fn rolled_back(&self) -> usize {
            self.state.lock().rolled_back
        }

        pub fn options(&self) -> Option<ClientOptions> {
            self.state.lock().options.clone()
        }

        pub fn is_closed(&self) -> bool {
            self.state.lock().closed
        }

        fn tx_url(&self, id: u64) -> String {
            format!("{}/db/data/transaction/{id}", self.base)
        }

        fn handle(&self, request: &HttpRequest) -> HttpResponse {
            use serde_json::json;

            if let Some(required) = &self.required {
                if request.credentials.as_ref() != Some(required) {
                    return HttpResponse::new(401, serde_json::Value::Null);
                }
            }

            let mut state = self.state.lock();
            let begin_url = format!("{}/db/data/transaction", self.base);
            if request.method == HttpMethod::Post && request.url == begin_url {
                state.next_tx += 1;
                let id = state.next_tx;
                state.open.insert(id, Vec::new());
                let url = self.tx_url(id);
                return HttpResponse::new(
                    201,
                    json!({"commit": format!("{url}/commit"), "results": [], "errors": []}),
                )
                .with_location(url);
            }

            let rest = match request.url.strip_prefix(&format!("{begin_url}/")) {
                Some(rest) => rest,
                None => return HttpResponse::new(404, serde_json::Value::Null),
            };
            let (id, commit) = match rest.strip_suffix("/commit") {
                Some(id) => (id, true),
                None => (rest, false),
            };
            let Ok(id) = id.parse::<u64>() else {
                return HttpResponse::new(404, serde_json::Value::Null);
            };
            if !state.open.contains_key(&id) {
                return HttpResponse::new(404, json!({"errors": [{"code": "Neo.ClientError.Transaction.TransactionNotFound", "message": "unknown transaction"}]}));
            }

            match (request.method, commit) {
                (HttpMethod::Delete, _) => {
                    state.open.remove(&id);
                    state.rolled_back += 1;
                    HttpResponse::new(200, json!({"results": [], "errors": []}))
                }
                (HttpMethod::Post, true) => {
                    if let Some(statements) = state.open.remove(&id) {
                        state.committed.extend(statements);
                    }
                    HttpResponse::new(200, json!({"results": [], "errors": []}))
                }
                (HttpMethod::Post, false) => {
                    let text = request
                        .body
                        .as_ref()
                        .and_then(|b| b["statements"][0]["statement"].as_str())
                        .unwrap_or_default()
                        .to_string();
                    if text.contains("SYNTAX") {
                        return HttpResponse::new(
                            200,
                            json!({"results": [], "errors": [{"code": "Neo.ClientError.Statement.SyntaxError", "message": "Invalid input"}]}),
                        );
                    }
                    if let Some(statements) = state.open.get_mut(&id) {
                        statements.push(text);
                    }
                    HttpResponse::new(
                        200,
                        json!({
                            "results": [{"columns": [], "data": [], "stats": {"relationships_deleted": 1}}],
                            "errors": []
                        }),
                    )
                }
            }
        }
    }

    #[async_trait]
    impl HttpClient for FakeGraphServer {
        async fn send(&self, request: HttpRequest) -> Result<HttpResponse, DriverError> {
            if self.is_closed() {
                return Err(DriverError::ResourceError("client closed".into()));
            }
            let response = self.handle(&request);
            self.state.lock().requests.push(Recorded {
                method: request.method,
                url: request.url,
                body: request.body,
            });
            Ok(response)
        }

        fn configure(&self, options: &ClientOptions) -> Result<(), DriverError> {
            self.state.lock().options = Some(options.clone());
            Ok(())
        }

        fn close(&self) {
            self.state.lock().closed = true;
        }
    }
}
