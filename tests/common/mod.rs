#![allow(dead_code)]

use dns_failover::config::Value;
use tracing_subscriber::EnvFilter;

/// Setup logging of events reported by the crate and the test suite.
///
/// Use the RUST_LOG environment variable to override the defaults.
///
/// E.g. To enable debug level logging:
///   RUST_LOG=DEBUG
///
/// Or to only see what the loader does:
///   RUST_LOG=dns_failover::multifo=DEBUG
pub fn init_logging() {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::from_default_env())
        .with_thread_ids(true)
        .without_time()
        .try_init()
        .ok();
}

/// Parses a configuration tree from YAML.
pub fn config(yaml: &str) -> Value {
    serde_yaml::from_str(yaml).unwrap()
}
