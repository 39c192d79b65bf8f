use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Arc, Weak};

use dashmap::DashMap;

/// Zero-argument probe answering "is this flap mid-transition?".
pub type LivenessQuery = Box<dyn Fn() -> bool + Send + Sync>;

/// Identity of one registered query.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct QueryId(u64);

// ---------------------------------------------------------------------------
// FlapActivity
// ---------------------------------------------------------------------------

/// Counts how many mounted flaps are currently transitioning.
///
/// Holds one liveness query per mounted flap, keyed by [`QueryId`]. Queries
/// never hold the flap itself, so a flap that is gone simply stops being
/// counted even before its registration is dropped.
pub struct FlapActivity {
    /// query id → liveness probe
    queries: DashMap<QueryId, LivenessQuery>,
    next_id: AtomicU64,
}

impl FlapActivity {
    pub fn new() -> Arc<Self> {
        Arc::new(Self::default())
    }

    /// Add a query. It stays registered until the returned handle is dropped
    /// or passed to [`FlapActivity::unregister`].
    pub fn register<F>(self: &Arc<Self>, query: F) -> Registration
    where
        F: Fn() -> bool + Send + Sync + 'static,
    {
        let id = QueryId(self.next_id.fetch_add(1, Ordering::Relaxed));
        self.queries.insert(id, Box::new(query));
        Registration {
            id,
            registry: Arc::downgrade(self),
        }
    }

    /// Remove a query by identity. Returns false if it was already gone.
    pub fn unregister(&self, id: QueryId) -> bool {
        self.queries.remove(&id).is_some()
    }

    /// Number of registered queries currently reporting busy.
    pub fn sample(&self) -> usize {
        self.queries.iter().filter(|entry| (entry.value())()).count()
    }

    pub fn registered(&self) -> usize {
        self.queries.len()
    }
}

impl Default for FlapActivity {
    fn default() -> Self {
        Self {
            queries: DashMap::new(),
            next_id: AtomicU64::new(0),
        }
    }
}

// ---------------------------------------------------------------------------
// Registration
// ---------------------------------------------------------------------------

/// Handle for one registered query. Dropping it unregisters synchronously.
#[derive(Debug)]
pub struct Registration {
    id: QueryId,
    registry: Weak<FlapActivity>,
}

impl Registration {
    pub fn id(&self) -> QueryId {
        self.id
    }
}

impl Drop for Registration {
    fn drop(&mut self) {
        if let Some(registry) = self.registry.upgrade() {
            registry.unregister(self.id);
        }
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
