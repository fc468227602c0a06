//! Legato test utilities.
//!
//! Helpers for integration testing: host fixtures and tracing setup.

// Fixtures panic on setup failure so test bodies stay readable.
#![allow(clippy::unwrap_used, clippy::expect_used)]

use std::sync::Arc;

use legato_kernel::{HostConfig, Plugin, PluginHost, PluginInfo};

/// Create a host with default configuration.
pub fn test_host() -> PluginHost {
    PluginHost::new(HostConfig::default())
}

/// Create a host whose configuration force-disables the given dependency
/// identifiers.
pub fn test_host_with_disabled(disabled: &[&str]) -> PluginHost {
    PluginHost::new(HostConfig {
        disabled_dependencies: disabled.iter().map(|d| (*d).to_string()).collect(),
    })
}

/// A minimal manifest with the given name.
pub fn plugin_info(name: &str) -> PluginInfo {
    PluginInfo::new(name, "1.0.0")
}

/// Register a plugin and leave it disabled.
pub fn register(host: &PluginHost, name: &str) -> Arc<Plugin> {
    host.register(plugin_info(name)).unwrap()
}

/// Register a plugin and enable it.
pub fn register_enabled(host: &PluginHost, name: &str) -> Arc<Plugin> {
    let plugin = register(host, name);
    host.enable(name).unwrap();
    plugin
}

/// Initialize a tracing subscriber for test output. Safe to call from every
/// test; only the first call installs.
pub fn init_tracing() {
    use tracing_subscriber::EnvFilter;

    let _ = tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::from_default_env())
        .with_test_writer()
        .try_init();
}
