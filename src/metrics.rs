use parking_lot::RwLock;
use std::sync::atomic::{AtomicU64, Ordering};

/// Metrics for observability
///
/// Counters for routing activity and failover, plus a per-shard health
/// table. Use `snapshot()` for a point-in-time view of everything, or
/// the individual getters for specific values.
///
/// # Example
/// ```ignore
/// let metrics = router.metrics();
///
/// println!("dispatches: {}", metrics.dispatches());
/// println!("slave fallbacks: {}", metrics.slave_fallbacks());
///
/// let snapshot = metrics.snapshot();
/// ```
#[derive(Debug, Default)]
pub struct Metrics {
    dispatches_total: AtomicU64,
    reads_total: AtomicU64,
    writes_total: AtomicU64,
    slave_fallbacks_total: AtomicU64,
    shard_unavailable_total: AtomicU64,
    nodes_offline_total: AtomicU64,
    nodes_recovered_total: AtomicU64,
    store_errors_total: AtomicU64,

    /// Per-shard health, indexed by shard id
    shard_health: RwLock<Vec<ShardHealth>>,
}

/// Health view of a single shard
#[derive(Debug, Clone)]
pub struct ShardHealth {
    /// Shard identifier
    pub shard_id: usize,
    /// Whether the master is currently considered online
    pub master_online: bool,
    /// Whether the slave is currently considered online
    pub slave_online: bool,
    /// Commands dispatched to this shard
    pub dispatches: u64,
    /// Reads served by the master because the slave was down
    pub slave_fallbacks: u64,
}

impl ShardHealth {
    fn new(shard_id: usize) -> Self {
        Self {
            shard_id,
            master_online: true,
            slave_online: true,
            dispatches: 0,
            slave_fallbacks: 0,
        }
    }
}

/// Point-in-time view of all metrics
#[derive(Debug, Clone)]
pub struct MetricsSnapshot {
    pub dispatches_total: u64,
    pub reads_total: u64,
    pub writes_total: u64,
    pub slave_fallbacks_total: u64,
    pub shard_unavailable_total: u64,
    pub nodes_offline_total: u64,
    pub nodes_recovered_total: u64,
    pub store_errors_total: u64,
    pub shards: Vec<ShardHealth>,
}

impl Metrics {
    /// Create a new Metrics instance
    pub fn new() -> Self {
        Self::default()
    }

    // ========== Getters ==========

    /// Total commands dispatched
    pub fn dispatches(&self) -> u64 {
        self.dispatches_total.load(Ordering::Relaxed)
    }

    /// Total read-only dispatches
    pub fn reads(&self) -> u64 {
        self.reads_total.load(Ordering::Relaxed)
    }

    /// Total write dispatches
    pub fn writes(&self) -> u64 {
        self.writes_total.load(Ordering::Relaxed)
    }

    /// Total reads that fell back from a dead slave to the master
    pub fn slave_fallbacks(&self) -> u64 {
        self.slave_fallbacks_total.load(Ordering::Relaxed)
    }

    /// Total dispatches that failed with an unavailable shard
    pub fn shard_unavailable(&self) -> u64 {
        self.shard_unavailable_total.load(Ordering::Relaxed)
    }

    /// Total online-to-offline node transitions
    pub fn nodes_offline(&self) -> u64 {
        self.nodes_offline_total.load(Ordering::Relaxed)
    }

    /// Total nodes brought back online by the recovery loop
    pub fn nodes_recovered(&self) -> u64 {
        self.nodes_recovered_total.load(Ordering::Relaxed)
    }

    /// Total application-level store errors passed through to callers
    pub fn store_errors(&self) -> u64 {
        self.store_errors_total.load(Ordering::Relaxed)
    }

    // ========== Recording methods (called internally) ==========

    pub(crate) fn record_dispatch(&self, read_only: bool) {
        self.dispatches_total.fetch_add(1, Ordering::Relaxed);
        if read_only {
            self.reads_total.fetch_add(1, Ordering::Relaxed);
        } else {
            self.writes_total.fetch_add(1, Ordering::Relaxed);
        }
    }

    pub(crate) fn record_slave_fallback(&self) {
        self.slave_fallbacks_total.fetch_add(1, Ordering::Relaxed);
    }

    pub(crate) fn record_shard_unavailable(&self) {
        self.shard_unavailable_total.fetch_add(1, Ordering::Relaxed);
    }

    pub(crate) fn record_node_offline(&self) {
        self.nodes_offline_total.fetch_add(1, Ordering::Relaxed);
    }

    pub(crate) fn record_node_recovered(&self) {
        self.nodes_recovered_total.fetch_add(1, Ordering::Relaxed);
    }

    pub(crate) fn record_store_error(&self) {
        self.store_errors_total.fetch_add(1, Ordering::Relaxed);
    }

    // ========== Per-shard health ==========

    /// Reset the per-shard table for a fresh start
    pub(crate) fn init_shards(&self, count: usize) {
        let mut health = self.shard_health.write();
        *health = (0..count).map(ShardHealth::new).collect();
    }

    /// Update one shard's health entry
    pub(crate) fn update_shard<F>(&self, shard_id: usize, f: F)
    where
        F: FnOnce(&mut ShardHealth),
    {
        let mut health = self.shard_health.write();
        if let Some(entry) = health.get_mut(shard_id) {
            f(entry);
        }
    }

    /// Current per-shard health table
    pub fn shard_health(&self) -> Vec<ShardHealth> {
        self.shard_health.read().clone()
    }

    /// Get a point-in-time snapshot of all metrics
    pub fn snapshot(&self) -> MetricsSnapshot {
        MetricsSnapshot {
            dispatches_total: self.dispatches(),
            reads_total: self.reads(),
            writes_total: self.writes(),
            slave_fallbacks_total: self.slave_fallbacks(),
            shard_unavailable_total: self.shard_unavailable(),
            nodes_offline_total: self.nodes_offline(),
            nodes_recovered_total: self.nodes_recovered(),
            store_errors_total: self.store_errors(),
            shards: self.shard_health(),
        }
    }
}
