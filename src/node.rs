use crate::config::NodeAddr;
use std::fmt;
use std::sync::atomic::{AtomicBool, Ordering};

/// Replication role of a node within its shard.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Role {
    /// Serves writes, and reads when the slave is down
    Master,
    /// Serves read-only commands
    Slave,
}

impl Role {
    pub fn as_str(&self) -> &'static str {
        match self {
            Role::Master => "master",
            Role::Slave => "slave",
        }
    }
}

impl fmt::Display for Role {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// One addressable store instance and its borrowed pool handle.
///
/// The `online` flag is the node's entire state machine. It is flipped
/// from two places only: the owning shard marks a node offline on a
/// connection-class failure, and the recovery loop marks it online
/// after a successful probe. Both transitions are atomic and
/// idempotent.
pub(crate) struct Node<P> {
    pub(crate) addr: NodeAddr,
    pub(crate) role: Role,
    online: AtomicBool,
    pub(crate) pool: P,
}

impl<P> Node<P> {
    pub(crate) fn new(addr: NodeAddr, role: Role, pool: P) -> Self {
        Self {
            addr,
            role,
            online: AtomicBool::new(true),
            pool,
        }
    }

    pub(crate) fn is_online(&self) -> bool {
        self.online.load(Ordering::Acquire)
    }

    /// Flip the online flag. Returns `true` when the flag actually
    /// changed, so repeated transitions in the same direction are
    /// no-ops rather than errors.
    pub(crate) fn set_online(&self, online: bool) -> bool {
        self.online.swap(online, Ordering::AcqRel) != online
    }
}
