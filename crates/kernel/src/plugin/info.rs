//! Parser for plugin `.info.toml` manifest files.
//!
//! Each plugin has an `.info.toml` file that declares metadata:
//! - name, version, description
//! - provides (alias names this plugin also answers to)
//! - capabilities (capability types this plugin declares, with parents)
//!
//! Hosts that assemble plugins programmatically can build a [`PluginInfo`]
//! with [`PluginInfo::new`] instead of parsing a file.

use std::path::Path;

use anyhow::{Context, Result};
use serde::Deserialize;

/// Plugin metadata parsed from `.info.toml` or built in code.
#[derive(Debug, Clone, Deserialize)]
pub struct PluginInfo {
    /// Plugin machine name, unique within a host.
    pub name: String,

    /// Human-readable description.
    #[serde(default)]
    pub description: String,

    /// Semantic version (e.g., "1.0.0").
    pub version: String,

    /// Alias names this plugin also answers to in registry lookups.
    #[serde(default)]
    pub provides: Vec<String>,

    /// Capability types this plugin declares, made resolvable on load.
    #[serde(default)]
    pub capabilities: Vec<CapabilityDecl>,
}

/// A capability type declaration: a name plus the types it specializes.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct CapabilityDecl {
    /// Capability type name (e.g., "economy/Bank").
    pub name: String,

    /// Parent capability types this one is assignable to.
    #[serde(default)]
    pub parents: Vec<String>,
}

impl PluginInfo {
    /// Build a minimal manifest in code.
    pub fn new(name: impl Into<String>, version: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            description: String::new(),
            version: version.into(),
            provides: Vec::new(),
            capabilities: Vec::new(),
        }
    }

    /// Add an alias name this plugin answers to.
    pub fn with_provides(mut self, alias: impl Into<String>) -> Self {
        self.provides.push(alias.into());
        self
    }

    /// Declare a capability type with its parent types.
    pub fn with_capability(mut self, name: impl Into<String>, parents: &[&str]) -> Self {
        self.capabilities.push(CapabilityDecl {
            name: name.into(),
            parents: parents.iter().map(|p| (*p).to_string()).collect(),
        });
        self
    }

    /// Parse a plugin info file from the given path.
    pub fn parse(path: &Path) -> Result<Self> {
        let content = std::fs::read_to_string(path)
            .with_context(|| format!("failed to read plugin info file: {}", path.display()))?;

        Self::parse_str(&content)
    }

    /// Parse plugin info from a TOML string.
    pub fn parse_str(content: &str) -> Result<Self> {
        let info: PluginInfo =
            toml::from_str(content).context("failed to parse plugin info TOML")?;

        info.validate()?;
        Ok(info)
    }

    fn validate(&self) -> Result<()> {
        if self.name.is_empty() {
            anyhow::bail!("plugin info has empty 'name' field");
        }

        if self.version.is_empty() {
            anyhow::bail!("plugin '{}' has empty 'version' field", self.name);
        }

        for alias in &self.provides {
            if alias.is_empty() {
                anyhow::bail!("plugin '{}' declares an empty 'provides' alias", self.name);
            }
        }

        for capability in &self.capabilities {
            if capability.name.is_empty() {
                anyhow::bail!("plugin '{}' declares an unnamed capability", self.name);
            }
        }

        Ok(())
    }
}
