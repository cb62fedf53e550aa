//! Background recovery of offline nodes.
//!
//! One recovery task runs per shard. Callers never wait for it: a node
//! that fails is marked offline and registered here, and the task
//! probes it with a single pool acquire per pass until the node answers
//! again. The offline-to-online transition happens nowhere else.

use crate::node::Role;
use crate::shard::ShardInner;
use crate::transport::{NodePool, StoreHandler};
use parking_lot::Mutex;
use std::collections::HashSet;
use std::sync::Arc;
use tokio::sync::Notify;
use tracing::{debug, info, warn};

/// Nodes of one shard awaiting a reconnect probe.
///
/// Membership is idempotent: registering a node that is already pending
/// is a no-op, so concurrent callers marking the same node offline
/// produce exactly one entry. Each registration wakes the recovery task
/// early instead of letting it sleep out the full pass interval.
pub(crate) struct RetrySet {
    pending: Mutex<HashSet<Role>>,
    wake: Notify,
}

impl RetrySet {
    pub(crate) fn new() -> Self {
        Self {
            pending: Mutex::new(HashSet::new()),
            wake: Notify::new(),
        }
    }

    /// Register a node for retry. Returns `true` if it was newly added.
    pub(crate) fn register(&self, role: Role) -> bool {
        let added = self.pending.lock().insert(role);
        self.wake.notify_one();
        added
    }

    /// Remove a node after a successful probe. Returns `true` if it was
    /// present - a second removal of the same node finds nothing.
    pub(crate) fn remove(&self, role: Role) -> bool {
        self.pending.lock().remove(&role)
    }

    /// The roles pending at the start of a pass. A node registered
    /// after the snapshot is simply picked up next pass.
    pub(crate) fn snapshot(&self) -> Vec<Role> {
        let mut roles: Vec<Role> = self.pending.lock().iter().copied().collect();
        // Deterministic probe order: master first.
        roles.sort_by_key(|r| *r != Role::Master);
        roles
    }

    pub(crate) fn len(&self) -> usize {
        self.pending.lock().len()
    }

    /// Wake the recovery task without registering anything (stop path).
    pub(crate) fn wake_now(&self) {
        self.wake.notify_one();
    }

    pub(crate) async fn woken(&self) {
        self.wake.notified().await;
    }
}

/// Recovery loop body; runs until the owning shard signals stop.
///
/// Each pass attempts one pool acquire per pending node: success flips
/// the node online and drops it from the set; a connection-class
/// failure leaves it pending; anything else is logged and leaves state
/// untouched. The loop itself never fails.
pub(crate) async fn run<H: StoreHandler>(shard: Arc<ShardInner<H>>) {
    debug!("[SHARD-{}] recovery loop started", shard.index);

    loop {
        if shard.is_stopped() {
            break;
        }

        for role in shard.retry.snapshot() {
            if shard.is_stopped() {
                break;
            }
            let node = shard.node(role);
            match node.pool.acquire().await {
                Ok(conn) => {
                    node.pool.release(conn).await;
                    node.set_online(true);
                    shard.retry.remove(role);
                    shard.metrics.record_node_recovered();
                    shard.publish_health();
                    info!(
                        "[SHARD-{}] {} {} back online",
                        shard.index, node.role, node.addr
                    );
                }
                Err(e) if e.is_connection() => {
                    debug!(
                        "[SHARD-{}] {} {} still unreachable: {}",
                        shard.index, node.role, node.addr, e
                    );
                }
                Err(e) => {
                    warn!(
                        "[SHARD-{}] unexpected error probing {} {}: {}",
                        shard.index, node.role, node.addr, e
                    );
                }
            }
        }

        tokio::select! {
            _ = shard.retry.woken() => {}
            _ = tokio::time::sleep(shard.recovery.delay()) => {}
        }
    }

    debug!("[SHARD-{}] recovery loop stopped", shard.index);
}
