//! Server configuration.
//!
//! Resolution order mirrors the reference `formicd` daemon: an explicit
//! `Config` (mostly useful in tests) is overlaid with environment
//! variables, then defaults fill in anything still unset. Nothing here
//! is re-read after startup — a changed env var requires a restart.

use std::env;
use std::path::PathBuf;

/// Default TCP port the `Api` service listens on.
pub const DEFAULT_PORT: u16 = 8445;

/// Default directory holding certs and ring caches.
pub const DEFAULT_PATH: &str = "/var/lib/formic";

/// Fixed chunk size for file content, per spec.md section 4.4.
pub const BLOCK_SIZE: u64 = 64 * 1024;

/// Per-store-call deadline, per spec.md section 5.
pub const STORE_CALL_TIMEOUT_SECS: u64 = 10;

/// Default reference epoch for `idgen::IdGen`, as milliseconds since the
/// Unix epoch (2020-01-01T00:00:00Z). Any fixed instant in the past works;
/// this one is far enough back that `ms_since_epoch` is always large, so a
/// freshly-started allocator never produces an id near the reserved root
/// inode even before `IdGen::next`'s own bias is applied.
pub const DEFAULT_EPOCH_UNIX_MS: u64 = 1_577_836_800_000;

/// Resolved server configuration.
#[derive(Debug, Clone)]
pub struct Config {
    /// Directory holding `server.crt`/`server.key`/`client.crt`/`client.key`/
    /// `ca.pem` and `ring/{valuestore,groupstore}.ring`.
    pub path: PathBuf,
    /// Port the front-end `Api` service binds to.
    pub port: u16,
    /// Discovery endpoint for the value-store ring. Empty means DNS SRV.
    pub oort_value_syndicate: String,
    /// Discovery endpoint for the group-store ring. Empty means DNS SRV.
    pub oort_group_syndicate: String,
    /// Skip TLS certificate verification on outbound connections.
    pub insecure_skip_verify: bool,
    /// Disable mutual TLS (client certs) on outbound connections.
    pub skip_mutual_tls: bool,
    /// This node's identifier for inode-id allocation (`idgen::IdGen`).
    pub node_id: u16,
    /// Reference epoch for `idgen::IdGen`, as milliseconds since the Unix
    /// epoch. `IdGen` measures `ms_since_epoch` from this instant, not from
    /// its own construction time.
    pub epoch_unix_ms: u64,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            path: PathBuf::from(DEFAULT_PATH),
            port: DEFAULT_PORT,
            oort_value_syndicate: String::new(),
            oort_group_syndicate: String::new(),
            insecure_skip_verify: false,
            skip_mutual_tls: false,
            node_id: 0,
            epoch_unix_ms: DEFAULT_EPOCH_UNIX_MS,
        }
    }
}

impl Config {
    /// Resolve a `Config` by overlaying environment variables onto `base`
    /// (or onto the defaults, if `base` is `None`). Mirrors the reference
    /// `formicd/config.go::resolveConfig`.
    pub fn resolve(base: Option<Config>) -> Config {
        let mut cfg = base.unwrap_or_default();

        if let Ok(path) = env::var("FORMICD_PATH") {
            if !path.is_empty() {
                cfg.path = PathBuf::from(path);
            }
        }
        if let Ok(port) = env::var("FORMICD_PORT") {
            if let Ok(port) = port.parse() {
                cfg.port = port;
            }
        }
        if let Ok(val) = env::var("FORMICD_OORT_VALUE_SYNDICATE") {
            cfg.oort_value_syndicate = val;
        }
        if let Ok(val) = env::var("FORMICD_OORT_GROUP_SYNDICATE") {
            cfg.oort_group_syndicate = val;
        }
        if env::var("FORMICD_INSECURE_SKIP_VERIFY").as_deref() == Ok("true") {
            cfg.insecure_skip_verify = true;
        }
        if env::var("FORMICD_SKIP_MUTUAL_TLS").as_deref() == Ok("true") {
            cfg.skip_mutual_tls = true;
        }
        if let Ok(node_id) = env::var("FORMICD_NODE_ID") {
            if let Ok(node_id) = node_id.parse() {
                cfg.node_id = node_id;
            }
        }
        if let Ok(epoch) = env::var("FORMICD_EPOCH_UNIX_MS") {
            if let Ok(epoch) = epoch.parse() {
                cfg.epoch_unix_ms = epoch;
            }
        }
        cfg
    }

    /// Path to a file under the configured `path` directory.
    pub fn cert_path(&self, name: &str) -> PathBuf {
        self.path.join(name)
    }

    /// Path to a ring cache file under `path/ring/`.
    pub fn ring_path(&self, name: &str) -> PathBuf {
        self.path.join("ring").join(name)
    }
}
