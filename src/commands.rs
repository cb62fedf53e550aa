//! Read-only command classification.
//!
//! One shared, pure table lookup. Anything not listed is treated as a
//! write and routed to the master - the conservative default for
//! commands this crate has never heard of.

/// Commands that never mutate the store and may be served by a slave.
pub const READ_ONLY_COMMANDS: [&str; 25] = [
    "get",
    "type",
    "ttl",
    "substr",
    "hget",
    "hmget",
    "hexists",
    "hlen",
    "hkeys",
    "hvals",
    "hgetall",
    "llen",
    "lrange",
    "lindex",
    "smembers",
    "scard",
    "sismember",
    "srandmember",
    "zrange",
    "zrank",
    "zrevrank",
    "zrevrange",
    "zcard",
    "zscore",
    "zcount",
];

/// Classify a command by name, case-insensitively.
///
/// Returns `true` only for the fixed read-only set; unknown commands
/// are writes.
pub fn is_read_only(command: &str) -> bool {
    READ_ONLY_COMMANDS
        .iter()
        .any(|c| c.eq_ignore_ascii_case(command))
}
