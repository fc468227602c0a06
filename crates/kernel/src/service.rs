//! Capability catalog and service registrations.
//!
//! Services are discovered by capability type name rather than by plugin
//! name. The catalog records which type names exist and which parent types
//! each one specializes; a declared dependency on a parent type matches any
//! provider registered under one of its subtypes.

use std::any::Any;
use std::collections::{HashMap, HashSet, hash_map::Entry};
use std::fmt;
use std::sync::Arc;

use parking_lot::RwLock;

use crate::plugin::Plugin;

/// Registry of known capability type names and their parent edges.
///
/// A type name that was never declared does not resolve; dependency
/// trackers treat that as "no match", not as an error.
#[derive(Debug, Default)]
pub struct CapabilityCatalog {
    types: RwLock<HashMap<String, Vec<String>>>,
}

impl CapabilityCatalog {
    /// Declare a capability type. Parent names become resolvable too.
    ///
    /// Re-declaring an existing type with a non-empty parent list replaces
    /// its parents; re-declaring with an empty list leaves them untouched.
    pub fn declare(&self, name: &str, parents: &[String]) {
        let mut types = self.types.write();
        match types.entry(name.to_string()) {
            Entry::Occupied(mut entry) => {
                if !parents.is_empty() {
                    entry.insert(parents.to_vec());
                }
            }
            Entry::Vacant(entry) => {
                entry.insert(parents.to_vec());
            }
        }
        for parent in parents {
            types.entry(parent.clone()).or_default();
        }
    }

    /// Whether the given type name is known to the catalog.
    pub fn resolves(&self, name: &str) -> bool {
        self.types.read().contains_key(name)
    }

    /// Whether a provider of `concrete` satisfies a dependency declared on
    /// `declared`: true when they are equal or `declared` appears in the
    /// parent chain of `concrete`.
    pub fn is_assignable(&self, declared: &str, concrete: &str) -> bool {
        if declared == concrete {
            return true;
        }

        let types = self.types.read();
        let mut pending = vec![concrete];
        let mut seen: HashSet<&str> = HashSet::new();

        while let Some(current) = pending.pop() {
            if current == declared {
                return true;
            }
            if !seen.insert(current) {
                continue;
            }
            if let Some(parents) = types.get(current) {
                pending.extend(parents.iter().map(String::as_str));
            }
        }

        false
    }
}

/// A service instance registered under a capability type.
///
/// Shared as `Arc<ServiceRegistration>`; the allocation is the
/// registration's identity. Lower weight wins when several registrations
/// satisfy the same declared type.
pub struct ServiceRegistration {
    capability: String,
    provider: Arc<dyn Any + Send + Sync>,
    plugin: Arc<Plugin>,
    weight: i32,
}

impl ServiceRegistration {
    pub(crate) fn new(
        capability: impl Into<String>,
        provider: Arc<dyn Any + Send + Sync>,
        plugin: Arc<Plugin>,
        weight: i32,
    ) -> Self {
        Self {
            capability: capability.into(),
            provider,
            plugin,
            weight,
        }
    }

    /// The concrete capability type this registration was made under.
    pub fn capability(&self) -> &str {
        &self.capability
    }

    /// The service instance, untyped.
    pub fn provider(&self) -> &Arc<dyn Any + Send + Sync> {
        &self.provider
    }

    /// The service instance downcast to a concrete type.
    pub fn provider_as<S: Any + Send + Sync>(&self) -> Option<Arc<S>> {
        self.provider.clone().downcast::<S>().ok()
    }

    /// The plugin that registered this service.
    pub fn plugin(&self) -> &Arc<Plugin> {
        &self.plugin
    }

    /// Ordering weight (lower = higher priority).
    pub fn weight(&self) -> i32 {
        self.weight
    }
}

impl fmt::Debug for ServiceRegistration {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ServiceRegistration")
            .field("capability", &self.capability)
            .field("plugin", &self.plugin.name())
            .field("weight", &self.weight)
            .finish_non_exhaustive()
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used, clippy::expect_used)]
mod tests {
    use super::*;
    use crate::plugin::PluginInfo;

    fn catalog() -> CapabilityCatalog {
        let catalog = CapabilityCatalog::default();
        catalog.declare("economy/Bank", &[]);
        catalog.declare("economy/SavingsBank", &["economy/Bank".to_string()]);
        catalog
    }

    #[test]
    fn undeclared_type_does_not_resolve() {
        let catalog = catalog();
        assert!(catalog.resolves("economy/Bank"));
        assert!(!catalog.resolves("economy/Hedge"));
    }

    #[test]
    fn parents_become_resolvable() {
        let catalog = CapabilityCatalog::default();
        catalog.declare("chat/Markdown", &["chat/Formatter".to_string()]);
        assert!(catalog.resolves("chat/Formatter"));
    }

    #[test]
    fn assignable_to_self_and_parent() {
        let catalog = catalog();
        assert!(catalog.is_assignable("economy/Bank", "economy/Bank"));
        assert!(catalog.is_assignable("economy/Bank", "economy/SavingsBank"));
        assert!(!catalog.is_assignable("economy/SavingsBank", "economy/Bank"));
    }

    #[test]
    fn assignable_through_chain() {
        let catalog = catalog();
        catalog.declare(
            "economy/InterestSavings",
            &["economy/SavingsBank".to_string()],
        );
        assert!(catalog.is_assignable("economy/Bank", "economy/InterestSavings"));
    }

    #[test]
    fn assignability_survives_parent_cycles() {
        let catalog = CapabilityCatalog::default();
        catalog.declare("a", &["b".to_string()]);
        catalog.declare("b", &["a".to_string()]);
        assert!(catalog.is_assignable("a", "b"));
        assert!(!catalog.is_assignable("c", "b"));
    }

    #[test]
    fn provider_downcast() {
        let plugin = Arc::new(Plugin::new(PluginInfo::new("bank", "1.0.0")));
        let registration = ServiceRegistration::new(
            "economy/Bank",
            Arc::new(42_u64),
            plugin,
            0,
        );

        assert_eq!(registration.provider_as::<u64>().as_deref(), Some(&42));
        assert!(registration.provider_as::<String>().is_none());
    }
}
