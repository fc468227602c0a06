//! Runtime plugin handle.

use std::sync::atomic::{AtomicBool, Ordering};

use super::PluginInfo;

/// A plugin registered with a host.
///
/// Shared as `Arc<Plugin>`; the allocation is the plugin's identity, so a
/// re-registered plugin with the same name is a different instance.
#[derive(Debug)]
pub struct Plugin {
    info: PluginInfo,
    enabled: AtomicBool,
}

impl Plugin {
    pub(crate) fn new(info: PluginInfo) -> Self {
        Self {
            info,
            enabled: AtomicBool::new(false),
        }
    }

    /// The plugin's manifest.
    pub fn info(&self) -> &PluginInfo {
        &self.info
    }

    /// The plugin's machine name.
    pub fn name(&self) -> &str {
        &self.info.name
    }

    /// Whether the plugin is currently enabled.
    pub fn is_enabled(&self) -> bool {
        self.enabled.load(Ordering::Acquire)
    }

    pub(crate) fn set_enabled(&self, enabled: bool) {
        self.enabled.store(enabled, Ordering::Release);
    }

    /// Whether this plugin matches the given identifier, either by its own
    /// name or through a `provides` alias.
    pub fn answers_to(&self, identifier: &str) -> bool {
        self.info.name == identifier || self.info.provides.iter().any(|a| a == identifier)
    }
}
