use crate::config::{NodeAddr, PoolConfig};
use crate::node::Role;
use crate::Result;
use std::future::Future;

/// Pooled-connection collaborator, one instance per node.
///
/// The router only ever borrows connections: every acquire is paired
/// with exactly one `release` (healthy) or `discard` (presumed broken)
/// on every exit path. Blocking in `acquire` must be bounded by the
/// pool's configured wait; on timeout or refusal it fails with
/// [`Error::connection`](crate::Error::connection), which is what tells
/// the router the node is down rather than the command being wrong.
pub trait NodePool: Send + Sync + 'static {
    /// A single checked-out connection
    type Conn: Send + 'static;

    /// Check out one connection, blocking up to the configured wait.
    fn acquire(&self) -> impl Future<Output = Result<Self::Conn>> + Send;

    /// Return a healthy connection to the pool.
    fn release(&self, conn: Self::Conn) -> impl Future<Output = ()> + Send;

    /// Drop a connection presumed broken (e.g. after an I/O error) so
    /// the pool does not hand it out again.
    fn discard(&self, conn: Self::Conn) -> impl Future<Output = ()> + Send;

    /// Tear the pool down. Called once, at router stop.
    fn close(&self);
}

/// Trait that users implement to bind the router to a concrete store
/// client.
///
/// This is the contract between the routing engine and the outside
/// world: the engine decides *which node* serves a command, the handler
/// owns *how* - pool construction and the wire protocol. The engine
/// never encodes or decodes store commands itself.
///
/// # Errors
///
/// `execute` implementations must keep the two failure classes apart:
/// [`Error::connection`](crate::Error::connection) for transport-level
/// failures (drives failover) and
/// [`Error::store`](crate::Error::store) for errors the store itself
/// returned over a working connection (propagated to the caller
/// unchanged, never failover).
///
/// # Example
///
/// ```ignore
/// struct RedisStore;
///
/// impl StoreHandler for RedisStore {
///     type Pool = RedisPool;
///     type Conn = PooledRedisConn;
///     type Value = redis::Value;
///
///     fn create_pool(
///         &self,
///         addr: &NodeAddr,
///         role: Role,
///         password: Option<&str>,
///         config: &PoolConfig,
///     ) -> Result<RedisPool> {
///         RedisPool::build(addr, password, config.max_connections, config.acquire_timeout)
///     }
///
///     async fn execute(
///         &self,
///         conn: &mut PooledRedisConn,
///         command: &str,
///         args: &[Vec<u8>],
///     ) -> Result<redis::Value> {
///         conn.run(command, args).await.map_err(classify_redis_error)
///     }
/// }
/// ```
pub trait StoreHandler: Send + Sync + 'static {
    /// Pool type built by [`create_pool`](StoreHandler::create_pool)
    type Pool: NodePool<Conn = Self::Conn>;
    /// Connection type checked out of the pool
    type Conn: Send + 'static;
    /// Command result returned to the dispatching caller unchanged
    type Value: Send + 'static;

    /// Build the connection pool for one node.
    ///
    /// Called once per node at router start. Must not perform network
    /// I/O - a malformed configuration has to fail before any
    /// connection is attempted, and pools are expected to connect
    /// lazily.
    fn create_pool(
        &self,
        addr: &NodeAddr,
        role: Role,
        password: Option<&str>,
        config: &PoolConfig,
    ) -> Result<Self::Pool>;

    /// Execute one command over a checked-out connection.
    fn execute(
        &self,
        conn: &mut Self::Conn,
        command: &str,
        args: &[Vec<u8>],
    ) -> impl Future<Output = Result<Self::Value>> + Send;
}
