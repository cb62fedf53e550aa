use crate::config::{PoolConfig, RecoveryConfig, ShardConfig};
use crate::error::Error;
use crate::metrics::Metrics;
use crate::node::{Node, Role};
use crate::recovery::{self, RetrySet};
use crate::transport::{NodePool, StoreHandler};
use crate::Result;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use tokio::task::JoinHandle;
use tracing::{debug, warn};

/// Shared state of one shard: its two nodes and the retry registry the
/// recovery task works from.
pub(crate) struct ShardInner<H: StoreHandler> {
    pub(crate) index: usize,
    master: Node<H::Pool>,
    slave: Node<H::Pool>,
    pub(crate) retry: RetrySet,
    pub(crate) recovery: RecoveryConfig,
    pub(crate) metrics: Arc<Metrics>,
    stopped: AtomicBool,
}

impl<H: StoreHandler> ShardInner<H> {
    pub(crate) fn node(&self, role: Role) -> &Node<H::Pool> {
        match role {
            Role::Master => &self.master,
            Role::Slave => &self.slave,
        }
    }

    pub(crate) fn is_stopped(&self) -> bool {
        self.stopped.load(Ordering::Acquire)
    }

    /// Push both nodes' online flags into the per-shard metrics table.
    pub(crate) fn publish_health(&self) {
        let master_online = self.master.is_online();
        let slave_online = self.slave.is_online();
        self.metrics.update_shard(self.index, |s| {
            s.master_online = master_online;
            s.slave_online = slave_online;
        });
    }
}

/// One shard: exactly one master and one slave node, plus the routing
/// state machine that picks between them.
///
/// Cheap to clone (Arc-backed); the router clones a handle per dispatch
/// so no lock is held across the command await.
pub(crate) struct Shard<H: StoreHandler> {
    inner: Arc<ShardInner<H>>,
    handler: Arc<H>,
}

impl<H: StoreHandler> Clone for Shard<H> {
    fn clone(&self) -> Self {
        Self {
            inner: Arc::clone(&self.inner),
            handler: Arc::clone(&self.handler),
        }
    }
}

impl<H: StoreHandler> Shard<H> {
    /// Build a shard from one validated configuration entry. Creates
    /// both node pools through the handler; no network I/O happens
    /// here.
    pub(crate) fn new(
        config: &ShardConfig,
        handler: Arc<H>,
        pool_config: &PoolConfig,
        recovery: RecoveryConfig,
        metrics: Arc<Metrics>,
    ) -> Result<Self> {
        let password = config.password.as_deref();
        let master_pool = handler.create_pool(&config.master, Role::Master, password, pool_config)?;
        let slave_pool = handler.create_pool(&config.slave, Role::Slave, password, pool_config)?;

        let inner = Arc::new(ShardInner {
            index: config.index,
            master: Node::new(config.master.clone(), Role::Master, master_pool),
            slave: Node::new(config.slave.clone(), Role::Slave, slave_pool),
            retry: RetrySet::new(),
            recovery,
            metrics,
            stopped: AtomicBool::new(false),
        });
        Ok(Self { inner, handler })
    }

    pub(crate) fn index(&self) -> usize {
        self.inner.index
    }

    /// Spawn this shard's recovery task.
    pub(crate) fn spawn_recovery(&self) -> JoinHandle<()> {
        tokio::spawn(recovery::run(Arc::clone(&self.inner)))
    }

    /// Tell the recovery task to exit and wake it if it is sleeping.
    pub(crate) fn signal_stop(&self) {
        self.inner.stopped.store(true, Ordering::Release);
        self.inner.retry.wake_now();
    }

    /// Tear down both node pools. Called after the recovery task has
    /// been joined.
    pub(crate) fn close_pools(&self) {
        self.inner.master.pool.close();
        self.inner.slave.pool.close();
    }

    /// Route and execute one command.
    ///
    /// Read-only commands try the slave while it is online, falling
    /// back to the master exactly once on a connection-class failure.
    /// Writes only ever touch the master. A failed master attempt, or
    /// no applicable node online, fails the call immediately - recovery
    /// is the background task's job, never the caller's wait.
    pub(crate) async fn execute(
        &self,
        command: &str,
        args: &[Vec<u8>],
        read_only: bool,
    ) -> Result<H::Value> {
        let inner = &self.inner;
        inner.metrics.update_shard(inner.index, |s| s.dispatches += 1);

        if read_only && inner.slave.is_online() {
            match self.try_node(Role::Slave, command, args).await {
                Ok(value) => return Ok(value),
                Err(e) if e.is_connection() => {
                    self.mark_offline(Role::Slave, &e);
                    inner.metrics.record_slave_fallback();
                    inner
                        .metrics
                        .update_shard(inner.index, |s| s.slave_fallbacks += 1);
                    debug!(
                        "[SHARD-{}] read '{}' falling back to master",
                        inner.index, command
                    );
                }
                Err(e) => return Err(e),
            }
        }

        if inner.master.is_online() {
            match self.try_node(Role::Master, command, args).await {
                Ok(value) => Ok(value),
                Err(e) if e.is_connection() => {
                    self.mark_offline(Role::Master, &e);
                    inner.metrics.record_shard_unavailable();
                    Err(Error::ShardUnavailable {
                        shard: inner.index,
                        command: command.to_string(),
                        reason: format!("master connection failed: {e}"),
                    })
                }
                Err(e) => Err(e),
            }
        } else {
            inner.metrics.record_shard_unavailable();
            Err(Error::ShardUnavailable {
                shard: inner.index,
                command: command.to_string(),
                reason: "no applicable node online".to_string(),
            })
        }
    }

    /// One attempt against one node: acquire, execute, then release or
    /// discard. The connection is given back on every path.
    async fn try_node(&self, role: Role, command: &str, args: &[Vec<u8>]) -> Result<H::Value> {
        let node = self.inner.node(role);
        let mut conn = node.pool.acquire().await?;
        match self.handler.execute(&mut conn, command, args).await {
            Ok(value) => {
                node.pool.release(conn).await;
                Ok(value)
            }
            Err(e) if e.is_connection() => {
                node.pool.discard(conn).await;
                Err(e)
            }
            Err(e) => {
                // The store answered over a working connection; the
                // connection itself is fine.
                node.pool.release(conn).await;
                if let Error::Store { .. } = e {
                    self.inner.metrics.record_store_error();
                }
                Err(e)
            }
        }
    }

    /// Flip a node offline and hand it to the recovery task. Both steps
    /// are idempotent, so concurrent callers racing on the same dead
    /// node converge to one offline flag and one retry entry.
    fn mark_offline(&self, role: Role, cause: &Error) {
        let inner = &self.inner;
        let node = inner.node(role);
        if node.set_online(false) {
            inner.metrics.record_node_offline();
            inner.publish_health();
            warn!(
                "[SHARD-{}] {} {} marked offline: {}",
                inner.index, node.role, node.addr, cause
            );
        }
        inner.retry.register(role);
    }

    #[cfg(test)]
    pub(crate) fn is_online(&self, role: Role) -> bool {
        self.inner.node(role).is_online()
    }

    #[cfg(test)]
    pub(crate) fn pending_retries(&self) -> usize {
        self.inner.retry.len()
    }
}
