use std::fmt;
use std::sync::atomic::{AtomicU64, Ordering};

static NEXT_CONTEXT_ID: AtomicU64 = AtomicU64::new(1);

/// A logical unit of work (request, worker, task) that owns at most one
/// active transaction at a time.
///
/// Contexts are plain values passed explicitly to every driver call, so the
/// join-or-create rule is visible at the call site. Copies of a context refer
/// to the same unit of work.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct ExecutionContext {
    id: u64,
}

impl ExecutionContext {
    /// A fresh context, distinct from every other context created this way.
    #[must_use]
    pub fn new() -> Self {
        Self {
            id: NEXT_CONTEXT_ID.fetch_add(1, Ordering::Relaxed),
        }
    }

    /// A context keyed by a caller-chosen id, e.g. a request or worker id.
    ///
    /// Callers mixing this with [`ExecutionContext::new`] are responsible for
    /// keeping the ids apart.
    #[must_use]
    pub fn from_id(id: u64) -> Self {
        Self { id }
    }

    #[must_use]
    pub fn id(&self) -> u64 {
        self.id
    }
}

impl Default for ExecutionContext {
    fn default() -> Self {
        Self::new()
    }
}

impl fmt::Display for ExecutionContext {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "ctx-{}", self.id)
    }
}
