//! Hook contracts for soft dependencies.
//!
//! A tracker's behavior is supplied through one of these traits: either a
//! hand-written implementation, or the closure-composing builders in
//! [`crate::builder`]. Every hook is fallible; the tracker logs a hook error
//! with context and converts it to "this step did not succeed". Errors
//! never reach the host's event dispatcher.

use std::sync::Arc;

use anyhow::Result;
use legato_kernel::{Plugin, ServiceRegistration};

/// A matched plugin together with the value constructed from it.
#[derive(Debug, Clone)]
pub struct Binding<T> {
    plugin: Arc<Plugin>,
    value: T,
}

impl<T> Binding<T> {
    pub(crate) fn new(plugin: Arc<Plugin>, value: T) -> Self {
        Self { plugin, value }
    }

    /// The plugin the dependency is bound to.
    pub fn plugin(&self) -> &Arc<Plugin> {
        &self.plugin
    }

    /// The constructed dependency value.
    pub fn value(&self) -> &T {
        &self.value
    }
}

/// A matched service registration together with the value constructed from it.
#[derive(Debug, Clone)]
pub struct ServiceBinding<T> {
    registration: Arc<ServiceRegistration>,
    value: T,
}

impl<T> ServiceBinding<T> {
    pub(crate) fn new(registration: Arc<ServiceRegistration>, value: T) -> Self {
        Self {
            registration,
            value,
        }
    }

    /// The bound service registration.
    pub fn registration(&self) -> &Arc<ServiceRegistration> {
        &self.registration
    }

    /// The plugin providing the bound service.
    pub fn plugin(&self) -> &Arc<Plugin> {
        self.registration.plugin()
    }

    /// The constructed dependency value.
    pub fn value(&self) -> &T {
        &self.value
    }
}

/// Hooks for a plugin-name dependency ([`crate::SoftDependency`]).
pub trait DependencyHooks<T>: Send + Sync {
    /// Whether a name-matching plugin really is the wanted dependency.
    /// Override to disambiguate plugins sharing a name. Errors are treated
    /// as rejection.
    fn identify(&self, plugin: &Arc<Plugin>) -> Result<bool> {
        let _ = plugin;
        Ok(true)
    }

    /// Construct the dependency value from a matched plugin.
    ///
    /// `Ok(None)` declines the activation (for example when use of this
    /// dependency is switched off in configuration); the tracker stays
    /// inactive. Errors also leave the tracker inactive.
    fn construct(&self, plugin: &Arc<Plugin>) -> Result<Option<T>>;

    /// Called once per activation, after the binding is stored. An error
    /// rolls the tracker back to inactive.
    fn on_enable(&self, binding: &Binding<T>) -> Result<()> {
        let _ = binding;
        Ok(())
    }

    /// Called once per deactivation, while the binding is still readable.
    /// Deactivation completes regardless of the result.
    fn on_disable(&self, binding: &Binding<T>) -> Result<()> {
        let _ = binding;
        Ok(())
    }
}

/// Hooks for a capability-type dependency ([`crate::SoftServiceDependency`]).
pub trait ServiceHooks<T>: Send + Sync {
    /// Construct the dependency value from a matched registration.
    /// `Ok(None)` declines; errors leave the tracker inactive.
    fn construct(&self, registration: &Arc<ServiceRegistration>) -> Result<Option<T>>;

    /// Called once per activation. An error rolls the tracker back.
    fn on_enable(&self, binding: &ServiceBinding<T>) -> Result<()> {
        let _ = binding;
        Ok(())
    }

    /// Called once per deactivation, binding still readable; deactivation
    /// completes regardless.
    fn on_disable(&self, binding: &ServiceBinding<T>) -> Result<()> {
        let _ = binding;
        Ok(())
    }
}
