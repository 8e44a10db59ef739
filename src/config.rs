//! Configuration Module
//!
//! Handles loading and managing server configuration from environment variables.

use std::env;
use std::fmt;
use std::path::PathBuf;
use std::str::FromStr;
use std::time::Duration;

/// Which cache implementation the server runs on.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Backend {
    /// Bounded in-memory LRU
    Memory,
    /// Files under `cache_dir`
    File,
    /// Caching disabled
    Null,
}

impl FromStr for Backend {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "memory" | "lru" => Ok(Backend::Memory),
            "file" | "disk" => Ok(Backend::File),
            "null" | "none" | "off" => Ok(Backend::Null),
            other => Err(format!("unknown cache backend '{other}'")),
        }
    }
}

impl fmt::Display for Backend {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            Backend::Memory => "memory",
            Backend::File => "file",
            Backend::Null => "null",
        };
        f.write_str(name)
    }
}

/// Server configuration parameters.
///
/// All values can be configured via environment variables with sensible defaults.
#[derive(Debug, Clone)]
pub struct Config {
    /// Cache implementation to serve
    pub backend: Backend,
    /// Maximum number of entries the memory backend can hold
    pub max_entries: usize,
    /// Default TTL in seconds for entries without explicit TTL
    pub default_ttl: u64,
    /// HTTP server port
    pub server_port: u16,
    /// Root directory of the file backend
    pub cache_dir: PathBuf,
    /// File backend GC interval in seconds
    pub gc_interval: u64,
    /// Per-request deadline in seconds
    pub request_timeout: u64,
}

impl Config {
    /// Creates a new Config by loading values from environment variables.
    ///
    /// # Environment Variables
    /// - `CACHE_BACKEND` - `memory`, `file` or `null` (default: memory)
    /// - `MAX_ENTRIES` - Maximum cache entries (default: 1000)
    /// - `DEFAULT_TTL` - Default TTL in seconds (default: 300)
    /// - `SERVER_PORT` - HTTP server port (default: 3000)
    /// - `CACHE_DIR` - File backend root (default: ./cache-data)
    /// - `GC_INTERVAL` - File backend GC interval in seconds (default: 300)
    /// - `REQUEST_TIMEOUT` - Per-request deadline in seconds (default: 5)
    pub fn from_env() -> Self {
        let defaults = Self::default();
        Self {
            backend: env_or("CACHE_BACKEND", defaults.backend),
            max_entries: env_or("MAX_ENTRIES", defaults.max_entries),
            default_ttl: env_or("DEFAULT_TTL", defaults.default_ttl),
            server_port: env_or("SERVER_PORT", defaults.server_port),
            cache_dir: env::var("CACHE_DIR")
                .map(PathBuf::from)
                .unwrap_or(defaults.cache_dir),
            gc_interval: env_or("GC_INTERVAL", defaults.gc_interval),
            request_timeout: env_or("REQUEST_TIMEOUT", defaults.request_timeout),
        }
    }

    pub fn default_ttl(&self) -> Duration {
        Duration::from_secs(self.default_ttl)
    }

    pub fn gc_interval(&self) -> Duration {
        Duration::from_secs(self.gc_interval)
    }

    pub fn request_timeout(&self) -> Duration {
        Duration::from_secs(self.request_timeout)
    }
}

fn env_or<T: FromStr>(name: &str, default: T) -> T {
    env::var(name)
        .ok()
        .and_then(|v| v.parse().ok())
        .unwrap_or(default)
}

impl Default for Config {
    fn default() -> Self {
        Self {
            backend: Backend::Memory,
            max_entries: 1000,
            default_ttl: 300,
            server_port: 3000,
            cache_dir: PathBuf::from("./cache-data"),
            gc_interval: 300,
            request_timeout: 5,
        }
    }
}
