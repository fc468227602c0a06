//! Kernel error types with clear, actionable messages.

use thiserror::Error;

/// Errors from host registry operations.
#[derive(Debug, Error)]
pub enum HostError {
    /// A plugin with this name is already registered.
    #[error("plugin '{plugin}': a plugin with this name is already registered")]
    DuplicatePlugin { plugin: String },

    /// The named plugin is not registered with this host.
    #[error("plugin '{plugin}': not registered with this host")]
    UnknownPlugin { plugin: String },
}

impl HostError {
    pub(crate) fn duplicate(plugin: impl Into<String>) -> Self {
        Self::DuplicatePlugin {
            plugin: plugin.into(),
        }
    }

    pub(crate) fn unknown(plugin: impl Into<String>) -> Self {
        Self::UnknownPlugin {
            plugin: plugin.into(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn messages_name_the_plugin() {
        let err = HostError::duplicate("worldedit");
        assert!(err.to_string().contains("worldedit"));
        assert!(err.to_string().contains("already registered"));

        let err = HostError::unknown("worldguard");
        assert!(err.to_string().contains("worldguard"));
        assert!(err.to_string().contains("not registered"));
    }
}
