use lazy_static::lazy_static;
use regex::Regex;
use std::fmt;
use std::time::Duration;

lazy_static! {
    // master|slave|pass|index
    // 127.0.0.1:6379|127.0.0.1:6480|password|1
    static ref NODE_ADDR_RE: Regex =
        Regex::new(r"^(\d{1,3}\.){3}\d{1,3}:\d{4,5}$").expect("valid address pattern");
    static ref SHARD_INDEX_RE: Regex = Regex::new(r"^\d+$").expect("valid index pattern");
}

/// Configuration validation errors. Fatal at startup, never raised at
/// runtime.
#[derive(Debug, Clone, thiserror::Error)]
pub enum ConfigError {
    /// The server specification is empty
    #[error("empty server configuration")]
    EmptySpec,
    /// A `;`-separated entry is empty
    #[error("empty shard entry at position {0}")]
    EmptyEntry(usize),
    /// An entry does not split into master|slave|password|index
    #[error("shard entry '{entry}' has {found} fields, expected 4")]
    FieldCount { entry: String, found: usize },
    /// An address does not match `ddd.ddd.ddd.ddd:dddd(d)`
    #[error("invalid {which} address '{addr}'")]
    InvalidAddress { which: &'static str, addr: String },
    /// The trailing shard index is not a number
    #[error("invalid shard index '{0}'")]
    InvalidIndex(String),
    /// A shard index appears more than once
    #[error("duplicate shard index {0}")]
    DuplicateIndex(usize),
    /// The declared indices do not cover exactly 0..count
    #[error("shard index {index} out of range for {count} entries")]
    IndexOutOfRange { index: usize, count: usize },
    /// Invalid pool configuration
    #[error("invalid pool configuration: {0}")]
    InvalidPool(String),
    /// Invalid recovery configuration
    #[error("invalid recovery configuration: {0}")]
    InvalidRecovery(String),
    /// An enabled router needs at least one shard
    #[error("no shards configured")]
    NoShards,
}

/// Address of a single store instance.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct NodeAddr {
    pub host: String,
    pub port: u16,
}

impl NodeAddr {
    /// Parse a strict `ddd.ddd.ddd.ddd:dddd(d)` address.
    fn parse(s: &str, which: &'static str) -> Result<Self, ConfigError> {
        if !NODE_ADDR_RE.is_match(s) {
            return Err(ConfigError::InvalidAddress {
                which,
                addr: s.to_string(),
            });
        }
        // The pattern guarantees exactly one ':' with digits on both sides.
        let (host, port) = s.split_once(':').expect("pattern has a colon");
        let port = port.parse().map_err(|_| ConfigError::InvalidAddress {
            which,
            addr: s.to_string(),
        })?;
        Ok(Self {
            host: host.to_string(),
            port,
        })
    }
}

impl fmt::Display for NodeAddr {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}:{}", self.host, self.port)
    }
}

/// Configuration for one shard: its master, its slave, and the declared
/// shard index.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ShardConfig {
    /// Declared position of this shard in the routing table
    pub index: usize,
    /// Master node address (all writes)
    pub master: NodeAddr,
    /// Slave node address (read-only commands)
    pub slave: NodeAddr,
    /// Auth password; `None` when the entry's password field is empty
    pub password: Option<String>,
}

impl ShardConfig {
    /// Parse one `master|slave|password|index` entry.
    pub fn parse(entry: &str) -> Result<Self, ConfigError> {
        let fields: Vec<&str> = entry.split('|').collect();
        if fields.len() != 4 {
            return Err(ConfigError::FieldCount {
                entry: entry.to_string(),
                found: fields.len(),
            });
        }
        let master = NodeAddr::parse(fields[0], "master")?;
        let slave = NodeAddr::parse(fields[1], "slave")?;
        let password = if fields[2].is_empty() {
            None
        } else {
            Some(fields[2].to_string())
        };
        if !SHARD_INDEX_RE.is_match(fields[3]) {
            return Err(ConfigError::InvalidIndex(fields[3].to_string()));
        }
        let index = fields[3]
            .parse()
            .map_err(|_| ConfigError::InvalidIndex(fields[3].to_string()))?;
        Ok(Self {
            index,
            master,
            slave,
            password,
        })
    }
}

/// Pool sizing handed to the [`StoreHandler`](crate::StoreHandler) when
/// it builds a node's pool. The bounds are enforced by the pool
/// collaborator, not re-implemented here.
#[derive(Debug, Clone)]
pub struct PoolConfig {
    /// Maximum pooled connections per node
    pub max_connections: usize,
    /// How long `acquire` may block before failing with a connection error
    pub acquire_timeout: Duration,
    /// Socket read timeout for individual commands
    pub read_timeout: Duration,
}

impl Default for PoolConfig {
    fn default() -> Self {
        Self {
            max_connections: 25,
            acquire_timeout: Duration::from_secs(15),
            read_timeout: Duration::from_secs(3),
        }
    }
}

/// Recovery loop configuration.
#[derive(Debug, Clone)]
pub struct RecoveryConfig {
    /// Upper bound on the sleep between probe passes. A new offline
    /// registration or a stop signal wakes the loop early.
    pub interval: Duration,
    /// Apply full jitter to the pass interval so many shards' probes
    /// don't land on the store in lockstep
    pub jitter: bool,
}

impl Default for RecoveryConfig {
    fn default() -> Self {
        Self {
            interval: Duration::from_secs(20),
            jitter: false,
        }
    }
}

impl RecoveryConfig {
    /// Sleep duration for the next pass, jittered when configured.
    pub fn delay(&self) -> Duration {
        if self.jitter {
            // Full jitter: random value between 0 and the interval
            let jittered = rand::random::<f64>() * self.interval.as_millis() as f64;
            Duration::from_millis(jittered as u64)
        } else {
            self.interval
        }
    }
}

/// Configuration for the router
#[derive(Debug, Clone)]
pub struct RouterConfig {
    /// Whether routing is configured at all. A disabled router accepts
    /// `start()` as a no-op and fails every dispatch fast.
    pub enabled: bool,
    /// Shard entries, ordered by their declared index
    pub shards: Vec<ShardConfig>,
    /// Pool sizing passed through to the pool collaborator
    pub pool: PoolConfig,
    /// Recovery loop settings
    pub recovery: RecoveryConfig,
}

impl RouterConfig {
    /// Parse a full `;`-separated server specification and validate it.
    ///
    /// Every entry must match `host:port|host:port|password|index` with
    /// strict `ddd.ddd.ddd.ddd:dddd(d)` addresses, and the declared
    /// indices must cover exactly `0..count`. Any deviation is fatal
    /// here, before any pool exists.
    pub fn from_spec(spec: &str) -> Result<Self, ConfigError> {
        let spec = spec.trim();
        if spec.is_empty() {
            return Err(ConfigError::EmptySpec);
        }
        // A single trailing ';' is tolerated, as the original splitter was.
        let spec = spec.strip_suffix(';').unwrap_or(spec);

        let mut parsed = Vec::new();
        for (pos, entry) in spec.split(';').enumerate() {
            if entry.is_empty() {
                return Err(ConfigError::EmptyEntry(pos));
            }
            parsed.push(ShardConfig::parse(entry)?);
        }

        let count = parsed.len();
        let mut slots: Vec<Option<ShardConfig>> = vec![None; count];
        for shard in parsed {
            if shard.index >= count {
                return Err(ConfigError::IndexOutOfRange {
                    index: shard.index,
                    count,
                });
            }
            let slot = &mut slots[shard.index];
            if slot.is_some() {
                return Err(ConfigError::DuplicateIndex(shard.index));
            }
            *slot = Some(shard);
        }
        // Every slot is filled: count entries, count slots, no duplicates.
        let shards = slots.into_iter().map(|s| s.expect("slot filled")).collect();

        Ok(Self {
            enabled: true,
            shards,
            pool: PoolConfig::default(),
            recovery: RecoveryConfig::default(),
        })
    }

    /// A configuration with routing switched off entirely.
    pub fn disabled() -> Self {
        Self {
            enabled: false,
            shards: Vec::new(),
            pool: PoolConfig::default(),
            recovery: RecoveryConfig::default(),
        }
    }

    /// Create a new builder for configuration
    pub fn builder() -> RouterConfigBuilder {
        RouterConfigBuilder::default()
    }

    /// Number of configured shards
    pub fn shard_count(&self) -> usize {
        self.shards.len()
    }
}

/// Builder for RouterConfig
#[derive(Debug, Clone)]
pub struct RouterConfigBuilder {
    config: RouterConfig,
}

impl Default for RouterConfigBuilder {
    fn default() -> Self {
        Self {
            config: RouterConfig {
                enabled: true,
                shards: Vec::new(),
                pool: PoolConfig::default(),
                recovery: RecoveryConfig::default(),
            },
        }
    }
}

impl RouterConfigBuilder {
    /// Set the shard entries (parse them with [`ShardConfig::parse`] or
    /// construct them directly)
    pub fn shards(mut self, shards: Vec<ShardConfig>) -> Self {
        self.config.shards = shards;
        self
    }

    /// Set pool sizing
    pub fn pool(mut self, pool: PoolConfig) -> Self {
        self.config.pool = pool;
        self
    }

    /// Set recovery loop settings
    pub fn recovery(mut self, recovery: RecoveryConfig) -> Self {
        self.config.recovery = recovery;
        self
    }

    /// Enable or disable routing
    pub fn enabled(mut self, enabled: bool) -> Self {
        self.config.enabled = enabled;
        self
    }

    /// Build the configuration with validation.
    pub fn build(self) -> Result<RouterConfig, ConfigError> {
        if self.config.pool.max_connections == 0 {
            return Err(ConfigError::InvalidPool(
                "max_connections cannot be 0".to_string(),
            ));
        }
        if self.config.pool.acquire_timeout.is_zero() {
            return Err(ConfigError::InvalidPool(
                "acquire_timeout cannot be zero".to_string(),
            ));
        }
        if self.config.recovery.interval.is_zero() {
            return Err(ConfigError::InvalidRecovery(
                "interval cannot be zero".to_string(),
            ));
        }
        if self.config.enabled {
            if self.config.shards.is_empty() {
                return Err(ConfigError::NoShards);
            }
            let count = self.config.shards.len();
            let mut seen = vec![false; count];
            for shard in &self.config.shards {
                if shard.index >= count {
                    return Err(ConfigError::IndexOutOfRange {
                        index: shard.index,
                        count,
                    });
                }
                if seen[shard.index] {
                    return Err(ConfigError::DuplicateIndex(shard.index));
                }
                seen[shard.index] = true;
            }
        }
        Ok(self.config)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const SPEC: &str =
        "10.0.0.1:6379|10.0.0.2:6379|secret|0;10.0.1.1:6379|10.0.1.2:6380|secret|1";

    #[test]
    fn parses_a_full_spec() {
        let config = RouterConfig::from_spec(SPEC).expect("valid spec");
        assert!(config.enabled);
        assert_eq!(config.shard_count(), 2);
        assert_eq!(config.shards[0].master.to_string(), "10.0.0.1:6379");
        assert_eq!(config.shards[0].slave.to_string(), "10.0.0.2:6379");
        assert_eq!(config.shards[0].password.as_deref(), Some("secret"));
        assert_eq!(config.shards[1].slave.port, 6380);
        assert_eq!(config.shards[1].index, 1);
    }

    #[test]
    fn tolerates_one_trailing_semicolon() {
        let config = RouterConfig::from_spec(&format!("{};", SPEC)).expect("valid spec");
        assert_eq!(config.shard_count(), 2);
    }

    #[test]
    fn empty_password_means_unauthenticated() {
        let entry = "10.0.0.1:6379|10.0.0.2:6379||0";
        let shard = ShardConfig::parse(entry).expect("valid entry");
        assert_eq!(shard.password, None);
    }

    #[test]
    fn entries_are_ordered_by_declared_index() {
        let spec = "10.0.1.1:6379|10.0.1.2:6379||1;10.0.0.1:6379|10.0.0.2:6379||0";
        let config = RouterConfig::from_spec(spec).expect("valid spec");
        assert_eq!(config.shards[0].master.host, "10.0.0.1");
        assert_eq!(config.shards[1].master.host, "10.0.1.1");
    }

    #[test]
    fn rejects_malformed_entries() {
        // wrong field count
        assert!(RouterConfig::from_spec("10.0.0.1:6379|10.0.0.2:6379|0").is_err());
        // missing pipe
        assert!(RouterConfig::from_spec("10.0.0.1:6379 10.0.0.2:6379 pw 0").is_err());
        // non-numeric port
        assert!(RouterConfig::from_spec("10.0.0.1:abcd|10.0.0.2:6379||0").is_err());
        // port too short for the strict pattern
        assert!(RouterConfig::from_spec("10.0.0.1:379|10.0.0.2:6379||0").is_err());
        // hostname instead of dotted quad
        assert!(RouterConfig::from_spec("master:6379|10.0.0.2:6379||0").is_err());
        // non-numeric index
        assert!(RouterConfig::from_spec("10.0.0.1:6379|10.0.0.2:6379||x").is_err());
        // empty
        assert!(matches!(
            RouterConfig::from_spec("   "),
            Err(ConfigError::EmptySpec)
        ));
        // empty entry between semicolons
        assert!(matches!(
            RouterConfig::from_spec(&format!(";{}", SPEC)),
            Err(ConfigError::EmptyEntry(0))
        ));
    }

    #[test]
    fn rejects_bad_index_sets() {
        let dup = "10.0.0.1:6379|10.0.0.2:6379||0;10.0.1.1:6379|10.0.1.2:6379||0";
        assert!(matches!(
            RouterConfig::from_spec(dup),
            Err(ConfigError::DuplicateIndex(0))
        ));
        let gap = "10.0.0.1:6379|10.0.0.2:6379||0;10.0.1.1:6379|10.0.1.2:6379||2";
        assert!(matches!(
            RouterConfig::from_spec(gap),
            Err(ConfigError::IndexOutOfRange { index: 2, count: 2 })
        ));
    }

    #[test]
    fn builder_validates() {
        let shards = RouterConfig::from_spec(SPEC).unwrap().shards;

        let ok = RouterConfig::builder().shards(shards.clone()).build();
        assert!(ok.is_ok());

        let bad_pool = RouterConfig::builder()
            .shards(shards.clone())
            .pool(PoolConfig {
                max_connections: 0,
                ..PoolConfig::default()
            })
            .build();
        assert!(bad_pool.is_err());

        let bad_recovery = RouterConfig::builder()
            .shards(shards)
            .recovery(RecoveryConfig {
                interval: Duration::ZERO,
                jitter: false,
            })
            .build();
        assert!(bad_recovery.is_err());

        assert!(matches!(
            RouterConfig::builder().build(),
            Err(ConfigError::NoShards)
        ));
    }

    #[test]
    fn disabled_config_builds_without_shards() {
        let config = RouterConfig::builder().enabled(false).build().unwrap();
        assert!(!config.enabled);
        assert_eq!(config.shard_count(), 0);
    }

    #[test]
    fn jittered_delay_stays_within_interval() {
        let recovery = RecoveryConfig {
            interval: Duration::from_secs(20),
            jitter: true,
        };
        for _ in 0..10 {
            assert!(recovery.delay() <= Duration::from_secs(20));
        }
        let fixed = RecoveryConfig::default();
        assert_eq!(fixed.delay(), Duration::from_secs(20));
    }
}
