//! Test-only mock of the store collaborators.
//!
//! `MockStore` implements [`StoreHandler`] with one [`NodeProbe`] per
//! address. Probes inject failures (refused acquire, broken execute,
//! application errors) and count every acquire/release/discard, which
//! is how the tests pin down exactly which node served a command and
//! that every connection went back on every path.

use crate::config::{NodeAddr, PoolConfig};
use crate::error::Error;
use crate::node::Role;
use crate::transport::{NodePool, StoreHandler};
use crate::Result;
use parking_lot::Mutex;
use std::collections::HashMap;
use std::sync::atomic::{AtomicBool, AtomicU64, Ordering};
use std::sync::Arc;

/// Failure switches and call accounting for one mock node.
#[derive(Default)]
pub(crate) struct NodeProbe {
    refuse_acquire: AtomicBool,
    fail_execute: AtomicBool,
    acquire_store_error: AtomicBool,
    store_error: Mutex<Option<String>>,
    acquires: AtomicU64,
    releases: AtomicU64,
    discards: AtomicU64,
    closed: AtomicBool,
    executed: Mutex<Vec<String>>,
}

impl NodeProbe {
    /// Refuse every acquire with a connection error.
    pub(crate) fn refuse(&self, refuse: bool) {
        self.refuse_acquire.store(refuse, Ordering::SeqCst);
    }

    /// Fail every execute with a connection error (broken socket).
    pub(crate) fn fail_execute(&self, fail: bool) {
        self.fail_execute.store(fail, Ordering::SeqCst);
    }

    /// Fail every acquire with a non-connection error.
    pub(crate) fn set_acquire_store_error(&self, fail: bool) {
        self.acquire_store_error.store(fail, Ordering::SeqCst);
    }

    /// Answer every execute with an application-level store error.
    pub(crate) fn set_store_error(&self, message: Option<&str>) {
        *self.store_error.lock() = message.map(String::from);
    }

    pub(crate) fn acquire_count(&self) -> u64 {
        self.acquires.load(Ordering::SeqCst)
    }

    pub(crate) fn release_count(&self) -> u64 {
        self.releases.load(Ordering::SeqCst)
    }

    pub(crate) fn discard_count(&self) -> u64 {
        self.discards.load(Ordering::SeqCst)
    }

    pub(crate) fn is_closed(&self) -> bool {
        self.closed.load(Ordering::SeqCst)
    }

    pub(crate) fn executed(&self) -> Vec<String> {
        self.executed.lock().clone()
    }
}

/// Mock store handler. Cloning shares the probe registry, so tests keep
/// a handle after moving a clone into the router.
#[derive(Clone)]
pub(crate) struct MockStore {
    probes: Arc<Mutex<HashMap<String, Arc<NodeProbe>>>>,
}

impl MockStore {
    pub(crate) fn new() -> Self {
        Self {
            probes: Arc::new(Mutex::new(HashMap::new())),
        }
    }

    /// Probe for an address, created on first use so failures can be
    /// staged before the router builds its pools.
    pub(crate) fn probe(&self, addr: &str) -> Arc<NodeProbe> {
        Arc::clone(
            self.probes
                .lock()
                .entry(addr.to_string())
                .or_default(),
        )
    }

    pub(crate) fn refuse(&self, addr: &str, refuse: bool) {
        self.probe(addr).refuse(refuse);
    }

    pub(crate) fn total_acquires(&self) -> u64 {
        self.probes
            .lock()
            .values()
            .map(|p| p.acquire_count())
            .sum()
    }
}

pub(crate) struct MockPool {
    addr: String,
    probe: Arc<NodeProbe>,
}

pub(crate) struct MockConn {
    addr: String,
}

impl NodePool for MockPool {
    type Conn = MockConn;

    async fn acquire(&self) -> Result<MockConn> {
        self.probe.acquires.fetch_add(1, Ordering::SeqCst);
        if self.probe.acquire_store_error.load(Ordering::SeqCst) {
            return Err(Error::store(format!("{}: pool in a strange state", self.addr)));
        }
        if self.probe.refuse_acquire.load(Ordering::SeqCst) {
            return Err(Error::connection(format!(
                "{}: connection refused",
                self.addr
            )));
        }
        Ok(MockConn {
            addr: self.addr.clone(),
        })
    }

    async fn release(&self, _conn: MockConn) {
        self.probe.releases.fetch_add(1, Ordering::SeqCst);
    }

    async fn discard(&self, _conn: MockConn) {
        self.probe.discards.fetch_add(1, Ordering::SeqCst);
    }

    fn close(&self) {
        self.probe.closed.store(true, Ordering::SeqCst);
    }
}

impl StoreHandler for MockStore {
    type Pool = MockPool;
    type Conn = MockConn;
    type Value = String;

    fn create_pool(
        &self,
        addr: &NodeAddr,
        _role: Role,
        _password: Option<&str>,
        _config: &PoolConfig,
    ) -> Result<MockPool> {
        let addr = addr.to_string();
        Ok(MockPool {
            probe: self.probe(&addr),
            addr,
        })
    }

    async fn execute(
        &self,
        conn: &mut MockConn,
        command: &str,
        _args: &[Vec<u8>],
    ) -> Result<String> {
        let probe = self.probe(&conn.addr);
        probe.executed.lock().push(command.to_string());
        if probe.fail_execute.load(Ordering::SeqCst) {
            return Err(Error::connection(format!("{}: broken pipe", conn.addr)));
        }
        if let Some(message) = probe.store_error.lock().clone() {
            return Err(Error::store(message));
        }
        Ok(format!("{} @ {}", command, conn.addr))
    }
}
