//! # kv-shard-router
//!
//! A client-side routing layer for sharded, master/slave-replicated
//! key-value stores (Redis-like). Callers get a single logical command
//! interface; the router handles the rest.
//!
//! ## Features
//!
//! - **Key sharding** with a stable seeded hash (`hash % shard_count`)
//! - **Read/write splitting** - read-only commands go to the slave,
//!   everything else to the master
//! - **Failover** - a dead slave falls back to the master for reads,
//!   a dead master fails the call fast instead of blocking
//! - **Background recovery** - offline nodes are probed periodically and
//!   flipped back online without caller involvement
//! - **Metrics** for observability
//!
//! The store protocol and connection pooling are external collaborators:
//! implement [`StoreHandler`] and [`NodePool`] on top of your client
//! library and the router never touches the wire itself.
//!
//! ## Example
//!
//! ```ignore
//! use kv_shard_router::{Router, RouterConfig};
//!
//! struct MyStore; // implements StoreHandler on top of your pooled client
//!
//! let config = RouterConfig::from_spec(
//!     "10.0.0.1:6379|10.0.0.2:6379|secret|0;10.0.1.1:6379|10.0.1.2:6379|secret|1",
//! )?;
//!
//! let router = Router::new(config, MyStore);
//! router.start().await?;
//! let value = router.dispatch("get", &[b"user:42".to_vec()]).await?;
//! ```

mod commands;
mod config;
mod error;
mod hash;
mod metrics;
mod node;
mod recovery;
mod router;
mod shard;
mod transport;

#[cfg(test)]
mod testing;

pub use commands::{is_read_only, READ_ONLY_COMMANDS};
pub use config::{ConfigError, NodeAddr, PoolConfig, RecoveryConfig, RouterConfig, ShardConfig};
pub use error::{Error, ErrorKind};
pub use hash::shard_index;
pub use metrics::{Metrics, MetricsSnapshot, ShardHealth};
pub use node::Role;
pub use router::Router;
pub use transport::{NodePool, StoreHandler};

/// Result type for kv-shard-router operations
pub type Result<T> = std::result::Result<T, Error>;
