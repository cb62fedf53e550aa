use crate::config::ConfigError;
use thiserror::Error;

/// Categorizes errors for routing decision-making.
///
/// This is a lightweight, cloneable representation of the error type.
/// The routing logic branches on the kind - most importantly on
/// [`ErrorKind::Connection`], which is the only kind that drives a node
/// offline.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ErrorKind {
    /// Malformed or missing shard configuration
    Config,
    /// Router is disabled or has not been started
    NotStarted,
    /// Connection-level failure (refused, timed out, broken socket)
    Connection,
    /// No applicable node online for the selected shard
    ShardUnavailable,
    /// Protocol/application-level error from the store itself
    Store,
}

/// Errors that can occur in kv-shard-router
#[derive(Error, Debug)]
pub enum Error {
    /// Shard configuration failed validation; fatal at startup
    #[error("config error: {0}")]
    Config(#[from] ConfigError),

    /// Dispatch attempted while the router is disabled or stopped
    #[error("router is not started")]
    NotStarted,

    /// Connection-level failure reported by the pool or transport
    /// collaborator. Marks the node offline; never raised for
    /// application-level store errors.
    #[error("connection error: {message}")]
    Connection { message: String },

    /// The computed shard cannot serve the command: its master attempt
    /// failed, or no applicable node is online. Returned immediately,
    /// without inline retry.
    #[error("shard {shard} unavailable for '{command}': {reason}")]
    ShardUnavailable {
        shard: usize,
        command: String,
        reason: String,
    },

    /// Application-level error from the store (e.g. wrong-type
    /// operation). Propagates to the caller unchanged and never
    /// triggers failover.
    #[error("store error: {message}")]
    Store { message: String },
}

impl Error {
    /// Build a connection-class error. Collaborator implementations use
    /// this for refused/timed-out/broken connections.
    pub fn connection(message: impl Into<String>) -> Self {
        Error::Connection {
            message: message.into(),
        }
    }

    /// Build an application-level store error. Collaborator
    /// implementations use this for protocol errors the store returned
    /// over a healthy connection.
    pub fn store(message: impl Into<String>) -> Self {
        Error::Store {
            message: message.into(),
        }
    }

    /// Get the kind of this error for decision-making.
    pub fn kind(&self) -> ErrorKind {
        match self {
            Error::Config(_) => ErrorKind::Config,
            Error::NotStarted => ErrorKind::NotStarted,
            Error::Connection { .. } => ErrorKind::Connection,
            Error::ShardUnavailable { .. } => ErrorKind::ShardUnavailable,
            Error::Store { .. } => ErrorKind::Store,
        }
    }

    /// Whether this is a connection-class failure, i.e. the only kind
    /// of failure that transitions a node offline.
    pub fn is_connection(&self) -> bool {
        self.kind() == ErrorKind::Connection
    }
}
