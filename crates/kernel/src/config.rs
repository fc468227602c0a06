//! Configuration loaded from environment variables.

use std::env;

/// Host configuration.
#[derive(Debug, Clone, Default)]
pub struct HostConfig {
    /// Dependency identifiers whose trackers start with the gate off
    /// (from the DISABLED_DEPENDENCIES env var).
    pub disabled_dependencies: Vec<String>,
}

impl HostConfig {
    /// Load configuration from environment variables.
    pub fn from_env() -> Self {
        let disabled_dependencies = env::var("DISABLED_DEPENDENCIES")
            .map(|v| parse_list(&v))
            .unwrap_or_default();

        Self {
            disabled_dependencies,
        }
    }

    /// Compute whether a dependency tracker starts enabled.
    ///
    /// A tracker starts with its gate on unless its identifier is listed in
    /// `DISABLED_DEPENDENCIES`. The gate can still be flipped at runtime.
    pub fn dependency_enabled(&self, identifier: &str) -> bool {
        !self.disabled_dependencies.iter().any(|d| d == identifier)
    }
}

fn parse_list(value: &str) -> Vec<String> {
    value
        .split(',')
        .map(|s| s.trim().to_string())
        .filter(|s| !s.is_empty())
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn dependency_enabled_by_default() {
        let config = HostConfig::default();
        assert!(config.dependency_enabled("anything"));
    }

    #[test]
    fn listed_dependency_starts_disabled() {
        let config = HostConfig {
            disabled_dependencies: vec!["worldedit".into(), "vault".into()],
        };
        assert!(!config.dependency_enabled("worldedit"));
        assert!(!config.dependency_enabled("vault"));
    }

    #[test]
    fn listing_does_not_affect_other_dependencies() {
        let config = HostConfig {
            disabled_dependencies: vec!["worldedit".into()],
        };
        assert!(config.dependency_enabled("worldguard"));
    }

    #[test]
    fn parse_list_trims_and_drops_empties() {
        assert_eq!(parse_list("a, b ,,c"), vec!["a", "b", "c"]);
        assert!(parse_list("").is_empty());
        assert!(parse_list(" , ").is_empty());
    }
}
