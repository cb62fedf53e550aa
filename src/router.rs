use crate::commands;
use crate::config::{ConfigError, RouterConfig};
use crate::error::Error;
use crate::hash;
use crate::metrics::Metrics;
use crate::shard::Shard;
use crate::transport::StoreHandler;
use crate::Result;
use parking_lot::{Mutex, RwLock};
use std::sync::Arc;
use tokio::task::JoinHandle;
use tracing::{debug, info, trace};

/// Routes commands across master/slave-replicated shards.
///
/// One `Router` instance per logical store; construct as many as you
/// like (tests included) - there is no process-wide state. The router
/// classifies each command, hashes its key to a shard, and lets the
/// shard's state machine pick the node.
///
/// # Thread Safety
///
/// `Router` is `Send + Sync`; `dispatch` can be called from any number
/// of tasks concurrently. Shared state lives behind a
/// `parking_lot::RwLock` that is never held across an await - each
/// dispatch clones an Arc-backed shard handle and runs lock-free from
/// there.
pub struct Router<H: StoreHandler> {
    handler: Arc<H>,
    config: RouterConfig,
    metrics: Arc<Metrics>,
    state: RwLock<RouterState<H>>,
    /// Recovery task handles, joined on stop
    recovery_handles: Mutex<Vec<JoinHandle<()>>>,
    /// Serializes start/stop so concurrent lifecycle calls cannot
    /// interleave. A tokio Mutex so it can be held across await points.
    lifecycle_lock: tokio::sync::Mutex<()>,
}

struct RouterState<H: StoreHandler> {
    shards: Vec<Shard<H>>,
    is_running: bool,
}

impl<H: StoreHandler> Router<H> {
    /// Create a router from a validated configuration. Nothing runs
    /// until [`start`](Router::start).
    pub fn new(config: RouterConfig, handler: H) -> Self {
        Self {
            handler: Arc::new(handler),
            config,
            metrics: Arc::new(Metrics::new()),
            state: RwLock::new(RouterState {
                shards: Vec::new(),
                is_running: false,
            }),
            recovery_handles: Mutex::new(Vec::new()),
            lifecycle_lock: tokio::sync::Mutex::new(()),
        }
    }

    /// Get the metrics for this router
    pub fn metrics(&self) -> Arc<Metrics> {
        Arc::clone(&self.metrics)
    }

    /// Get a reference to the handler
    pub fn handler(&self) -> &Arc<H> {
        &self.handler
    }

    /// Whether routing is configured at all. A disabled router never
    /// attempts any network activity.
    pub fn is_enabled(&self) -> bool {
        self.config.enabled
    }

    /// Whether the router has been started and not yet stopped
    pub fn is_running(&self) -> bool {
        self.state.read().is_running
    }

    /// Number of configured shards
    pub fn shard_count(&self) -> usize {
        self.config.shard_count()
    }

    /// Start the router: build every shard's node pools and spawn the
    /// recovery loops.
    ///
    /// A no-op when routing is disabled or already running. Pool
    /// construction goes through the handler and performs no network
    /// I/O, so a failure here is a configuration problem, not a dead
    /// node.
    pub async fn start(&self) -> Result<()> {
        let _lifecycle = self.lifecycle_lock.lock().await;

        if !self.config.enabled {
            info!("routing disabled, start is a no-op");
            return Ok(());
        }
        if self.state.read().is_running {
            debug!("router already running");
            return Ok(());
        }
        if self.config.shards.is_empty() {
            return Err(ConfigError::NoShards.into());
        }

        let count = self.config.shard_count();
        self.metrics.init_shards(count);

        let mut shards = Vec::with_capacity(count);
        for shard_config in &self.config.shards {
            match Shard::new(
                shard_config,
                Arc::clone(&self.handler),
                &self.config.pool,
                self.config.recovery.clone(),
                Arc::clone(&self.metrics),
            ) {
                Ok(shard) => shards.push(shard),
                Err(e) => {
                    for built in &shards {
                        built.close_pools();
                    }
                    return Err(e);
                }
            }
        }

        {
            let mut handles = self.recovery_handles.lock();
            for shard in &shards {
                handles.push(shard.spawn_recovery());
            }
        }

        {
            let mut state = self.state.write();
            state.shards = shards;
            state.is_running = true;
        }

        info!("router started with {} shards", count);
        Ok(())
    }

    /// Stop the router: end every recovery loop and tear down every
    /// node pool. Safe to call twice; the second call is a no-op.
    pub async fn stop(&self) -> Result<()> {
        let _lifecycle = self.lifecycle_lock.lock().await;

        let shards = {
            let mut state = self.state.write();
            if !state.is_running {
                return Ok(());
            }
            state.is_running = false;
            std::mem::take(&mut state.shards)
        };

        for shard in &shards {
            shard.signal_stop();
        }

        let handles: Vec<JoinHandle<()>> = std::mem::take(&mut *self.recovery_handles.lock());
        for handle in handles {
            let _ = handle.await;
        }

        for shard in &shards {
            shard.close_pools();
        }

        info!("router stopped");
        Ok(())
    }

    /// Dispatch one command.
    ///
    /// The shard is picked by hashing `args[0]` (shard 0 when the
    /// command carries no key); read-only commands are routed to the
    /// shard's slave, everything else to its master. Returns the
    /// transport's value unchanged, or:
    ///
    /// - [`Error::NotStarted`] when the router is disabled or stopped
    /// - [`Error::ShardUnavailable`] when the computed shard has no
    ///   applicable node online (immediately - failover runs in the
    ///   background, never inline with a dispatch)
    /// - [`Error::Store`] passed through from the store unchanged
    pub async fn dispatch(&self, command: &str, args: &[Vec<u8>]) -> Result<H::Value> {
        if !self.config.enabled {
            return Err(Error::NotStarted);
        }

        let shard = {
            let state = self.state.read();
            if !state.is_running {
                return Err(Error::NotStarted);
            }
            let index = args
                .first()
                .map(|key| hash::shard_index(key, state.shards.len()))
                .unwrap_or(0);
            state.shards[index].clone()
        };

        let read_only = commands::is_read_only(command);
        self.metrics.record_dispatch(read_only);
        trace!(
            "dispatching '{}' to shard {} as {}",
            command,
            shard.index(),
            if read_only { "read" } else { "write" }
        );

        shard.execute(command, args, read_only).await
    }
}
