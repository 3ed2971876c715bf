use std::fmt;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};
use std::time::Duration;

use parking_lot::Mutex;
use rusqlite::{Connection, params};
use tracing::{debug, info};

use super::plan::{Plan, Target};
use super::transaction::EmbeddedTransaction;
use crate::error::DriverError;
use crate::results::RowSet;

const DB_FILE: &str = "graph.db";

const SCHEMA: &str = "
    PRAGMA journal_mode = WAL;
    CREATE TABLE IF NOT EXISTS nodes (
        id INTEGER PRIMARY KEY AUTOINCREMENT
    );
    CREATE TABLE IF NOT EXISTS node_labels (
        node_id INTEGER NOT NULL REFERENCES nodes(id) ON DELETE CASCADE,
        label TEXT NOT NULL,
        PRIMARY KEY (node_id, label)
    );
    CREATE INDEX IF NOT EXISTS node_labels_by_label ON node_labels(label);
    CREATE TABLE IF NOT EXISTS relationships (
        id INTEGER PRIMARY KEY AUTOINCREMENT,
        start_id INTEGER NOT NULL REFERENCES nodes(id),
        end_id INTEGER NOT NULL REFERENCES nodes(id),
        rel_type TEXT NOT NULL
    );
    CREATE INDEX IF NOT EXISTS relationships_by_type ON relationships(rel_type);
    CREATE INDEX IF NOT EXISTS relationships_by_start ON relationships(start_id);
    CREATE INDEX IF NOT EXISTS relationships_by_end ON relationships(end_id);
";

/// In-process graph engine persisted under a store directory.
///
/// Nodes, labels and typed relationships live in a SQLite database. Every
/// native transaction gets its own connection and holds the engine's write
/// lock from `begin` until commit or rollback, so writers from different
/// contexts queue behind each other for at most the busy timeout.
///
/// The engine shuts down when the last `Arc` to it is dropped, or earlier
/// through [`EmbeddedEngine::shutdown`].
pub struct EmbeddedEngine {
    store_dir: PathBuf,
    db_path: PathBuf,
    busy_timeout: Duration,
    primary: Mutex<Option<Connection>>,
    shut_down: AtomicBool,
}

impl EmbeddedEngine {
    /// Open (creating if needed) the store at `store_dir`.
    ///
    /// # Errors
    /// `ResourceError` if the directory or database cannot be created.
    pub fn open(store_dir: impl AsRef<Path>, busy_timeout: Duration) -> Result<Self, DriverError> {
        let store_dir = store_dir.as_ref().to_path_buf();
        std::fs::create_dir_all(&store_dir).map_err(|e| {
            DriverError::ResourceError(format!(
                "cannot create store directory {}: {e}",
                store_dir.display()
            ))
        })?;
        let db_path = store_dir.join(DB_FILE);
        let conn = connect(&db_path, busy_timeout).map_err(|e| {
            DriverError::ResourceError(format!("cannot open store {}: {e}", db_path.display()))
        })?;
        conn.execute_batch(SCHEMA).map_err(|e| {
            DriverError::ResourceError(format!(
                "cannot initialise store {}: {e}",
                db_path.display()
            ))
        })?;
        info!(store = %store_dir.display(), "embedded graph engine started");
        Ok(Self {
            store_dir,
            db_path,
            busy_timeout,
            primary: Mutex::new(Some(conn)),
            shut_down: AtomicBool::new(false),
        })
    }

    #[must_use]
    pub fn store_dir(&self) -> &Path {
        &self.store_dir
    }

    #[must_use]
    pub fn busy_timeout(&self) -> Duration {
        self.busy_timeout
    }

    #[must_use]
    pub fn is_shut_down(&self) -> bool {
        self.shut_down.load(Ordering::SeqCst)
    }

    /// Stop the engine. Later transactions and statements fail with
    /// `ResourceError`. Calling this more than once is harmless.
    pub fn shutdown(&self) {
        if self.shut_down.swap(true, Ordering::SeqCst) {
            return;
        }
        drop(self.primary.lock().take());
        info!(store = %self.store_dir.display(), "embedded graph engine shut down");
    }

    pub(crate) fn ensure_running(&self) -> Result<(), DriverError> {
        if self.is_shut_down() {
            Err(DriverError::ResourceError(format!(
                "embedded engine at {} has been shut down",
                self.store_dir.display()
            )))
        } else {
            Ok(())
        }
    }

    /// Begin a native transaction, waiting for the write lock if another
    /// transaction holds it.
    ///
    /// # Errors
    /// `ResourceError` after shutdown; the SQLite error if the lock cannot be
    /// taken within the busy timeout.
    pub(crate) async fn begin(self: &Arc<Self>) -> Result<EmbeddedTransaction, DriverError> {
        self.ensure_running()?;
        let engine = Arc::clone(self);
        let conn = tokio::task::spawn_blocking(move || {
            let conn = connect(&engine.db_path, engine.busy_timeout)?;
            conn.execute_batch("BEGIN IMMEDIATE")?;
            Ok::<_, DriverError>(conn)
        })
        .await??;
        debug!(store = %self.store_dir.display(), "native transaction begun");
        Ok(EmbeddedTransaction::new(Arc::clone(self), conn))
    }

    /// Create a node with the given labels and return its id. Blocking.
    ///
    /// # Errors
    /// `ResourceError` after shutdown, or the SQLite error.
    pub fn create_node(&self, labels: &[&str]) -> Result<i64, DriverError> {
        self.with_primary(|conn| {
            let tx = conn.transaction()?;
            tx.execute("INSERT INTO nodes DEFAULT VALUES", [])?;
            let id = tx.last_insert_rowid();
            for label in labels {
                tx.execute(
                    "INSERT OR IGNORE INTO node_labels (node_id, label) VALUES (?1, ?2)",
                    params![id, label],
                )?;
            }
            tx.commit()?;
            Ok(id)
        })
    }

    /// Create a typed relationship between two existing nodes and return its
    /// id. Blocking.
    ///
    /// # Errors
    /// `ResourceError` after shutdown, or the SQLite error (for example when
    /// either node does not exist).
    pub fn create_relationship(
        &self,
        start_id: i64,
        end_id: i64,
        rel_type: &str,
    ) -> Result<i64, DriverError> {
        self.with_primary(|conn| {
            conn.execute(
                "INSERT INTO relationships (start_id, end_id, rel_type) VALUES (?1, ?2, ?3)",
                params![start_id, end_id, rel_type],
            )?;
            Ok(conn.last_insert_rowid())
        })
    }

    /// Number of committed nodes. Blocking.
    ///
    /// # Errors
    /// `ResourceError` after shutdown, or the SQLite error.
    pub fn node_count(&self) -> Result<i64, DriverError> {
        self.with_primary(|conn| {
            Ok(conn.query_row("SELECT COUNT(*) FROM nodes", [], |row| row.get(0))?)
        })
    }

    /// Number of committed relationships. Blocking.
    ///
    /// # Errors
    /// `ResourceError` after shutdown, or the SQLite error.
    pub fn relationship_count(&self) -> Result<i64, DriverError> {
        self.with_primary(|conn| {
            Ok(conn.query_row("SELECT COUNT(*) FROM relationships", [], |row| row.get(0))?)
        })
    }

    /// True if a committed relationship with this id exists. Blocking.
    ///
    /// # Errors
    /// `ResourceError` after shutdown, or the SQLite error.
    pub fn relationship_exists(&self, id: i64) -> Result<bool, DriverError> {
        self.with_primary(|conn| {
            Ok(conn.query_row(
                "SELECT EXISTS(SELECT 1 FROM relationships WHERE id = ?1)",
                params![id],
                |row| row.get(0),
            )?)
        })
    }

    fn with_primary<F, R>(&self, func: F) -> Result<R, DriverError>
    where
        F: FnOnce(&mut Connection) -> Result<R, DriverError>,
    {
        self.ensure_running()?;
        let mut guard = self.primary.lock();
        let conn = guard.as_mut().ok_or_else(|| {
            DriverError::ResourceError("embedded engine has been shut down".to_string())
        })?;
        func(conn)
    }
}

impl fmt::Debug for EmbeddedEngine {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("EmbeddedEngine")
            .field("store_dir", &self.store_dir)
            .field("shut_down", &self.is_shut_down())
            .finish()
    }
}

impl Drop for EmbeddedEngine {
    fn drop(&mut self) {
        self.shutdown();
    }
}

fn connect(db_path: &Path, busy_timeout: Duration) -> Result<Connection, DriverError> {
    let conn = Connection::open(db_path)?;
    conn.busy_timeout(busy_timeout)?;
    conn.execute_batch("PRAGMA foreign_keys = ON;")?;
    Ok(conn)
}

/// Apply a plan on a connection that is inside a transaction.
pub(crate) fn run_plan(conn: &Connection, plan: &Plan) -> Result<RowSet, DriverError> {
    let affected = match plan {
        Plan::DeleteRelationships(Target::Id(id)) => {
            conn.execute("DELETE FROM relationships WHERE id = ?1", params![id])?
        }
        Plan::DeleteRelationships(Target::Ids(ids)) => {
            let mut stmt = conn.prepare_cached("DELETE FROM relationships WHERE id = ?1")?;
            let mut total = 0;
            for id in ids {
                total += stmt.execute(params![id])?;
            }
            total
        }
        Plan::DeleteRelationships(Target::Label(rel_type)) => conn.execute(
            "DELETE FROM relationships WHERE rel_type = ?1",
            params![rel_type],
        )?,
        Plan::DeleteNodes(Target::Id(id)) => delete_nodes(conn, &[*id])?,
        Plan::DeleteNodes(Target::Ids(ids)) => delete_nodes(conn, ids)?,
        Plan::DeleteNodes(Target::Label(label)) => {
            let ids = {
                let mut stmt =
                    conn.prepare_cached("SELECT node_id FROM node_labels WHERE label = ?1")?;
                stmt.query_map(params![label], |row| row.get::<_, i64>(0))?
                    .collect::<Result<Vec<_>, _>>()?
            };
            delete_nodes(conn, &ids)?
        }
        Plan::PurgeAll => {
            let relationships = conn.execute("DELETE FROM relationships", [])?;
            conn.execute("DELETE FROM node_labels", [])?;
            let nodes = conn.execute("DELETE FROM nodes", [])?;
            relationships + nodes
        }
    };
    Ok(RowSet::affected(affected))
}

fn delete_nodes(conn: &Connection, ids: &[i64]) -> Result<usize, DriverError> {
    let mut detach =
        conn.prepare_cached("DELETE FROM relationships WHERE start_id = ?1 OR end_id = ?1")?;
    let mut delete = conn.prepare_cached("DELETE FROM nodes WHERE id = ?1")?;
    let mut total = 0;
    for id in ids {
        total += detach.execute(params![id])?;
        total += delete.execute(params![id])?;
    }
    Ok(total)
}
