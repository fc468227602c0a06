//! The plugin host: registry, lifecycle sequencing, and event dispatch.
//!
//! `PluginHost` is the one shared object in the system. It owns the plugin
//! registry, the service list, the capability catalog, the listener table,
//! and the deferred-activation queue. Cloning the handle is cheap; all
//! clones share the same state.
//!
//! Lifecycle sequencing is what dependency trackers rely on:
//!
//! - enable: the flag is set, `PluginEnabled` is dispatched, then deferred
//!   callbacks run
//! - disable: `PluginDisabling` is dispatched while the plugin is still
//!   enabled, its service registrations unregister, the flag clears, and
//!   its scoped listeners and deferred callbacks are dropped
//!
//! Dispatch iterates a snapshot of the listener table with no lock held, so
//! listeners may subscribe, unsubscribe, or mutate the registry
//! re-entrantly.

use std::any::Any;
use std::collections::HashMap;
use std::sync::Arc;

use parking_lot::{Mutex, RwLock};
use tracing::{debug, info};

use crate::config::HostConfig;
use crate::error::HostError;
use crate::event::{HostEvent, ScopedListener};
use crate::plugin::{Plugin, PluginInfo};
use crate::queue::EnableQueue;
use crate::service::{CapabilityCatalog, ServiceRegistration};

/// Shared host handle.
///
/// Wrapped in Arc internally so Clone is cheap.
#[derive(Clone, Default)]
pub struct PluginHost {
    inner: Arc<HostInner>,
}

#[derive(Default)]
struct HostInner {
    config: HostConfig,

    /// Registered plugins by machine name.
    ///
    /// Uses `parking_lot::RwLock` rather than `std::sync::RwLock` because:
    /// - No poisoning: a panic in a writer won't permanently wedge every reader.
    /// - Short critical sections; no guard is ever held across listener code.
    plugins: RwLock<HashMap<String, Arc<Plugin>>>,

    /// Service registrations in registration order.
    services: RwLock<Vec<Arc<ServiceRegistration>>>,

    /// Known capability types.
    capabilities: CapabilityCatalog,

    /// Owner-scoped lifecycle listeners in subscription order.
    listeners: Mutex<Vec<Arc<ScopedListener>>>,

    /// Callbacks waiting for their owner to enable.
    queue: EnableQueue,
}

impl PluginHost {
    /// Create a host with the given configuration.
    pub fn new(config: HostConfig) -> Self {
        Self {
            inner: Arc::new(HostInner {
                config,
                ..HostInner::default()
            }),
        }
    }

    /// The host configuration.
    pub fn config(&self) -> &HostConfig {
        &self.inner.config
    }

    /// The capability catalog.
    pub fn capabilities(&self) -> &CapabilityCatalog {
        &self.inner.capabilities
    }

    // -------------------------------------------------------------------------
    // Plugin registry
    // -------------------------------------------------------------------------

    /// Register a plugin. It starts disabled.
    ///
    /// Capability types declared in the manifest become resolvable
    /// immediately, before the plugin enables.
    pub fn register(&self, info: PluginInfo) -> Result<Arc<Plugin>, HostError> {
        let mut plugins = self.inner.plugins.write();
        if plugins.contains_key(&info.name) {
            return Err(HostError::duplicate(&info.name));
        }

        for capability in &info.capabilities {
            self.inner
                .capabilities
                .declare(&capability.name, &capability.parents);
        }

        let plugin = Arc::new(Plugin::new(info));
        plugins.insert(plugin.name().to_string(), plugin.clone());
        debug!(plugin = %plugin.name(), "registered plugin");
        Ok(plugin)
    }

    /// Look up a plugin by identifier: exact name first, then `provides`
    /// aliases (ties broken by plugin name for determinism).
    pub fn plugin(&self, identifier: &str) -> Option<Arc<Plugin>> {
        let plugins = self.inner.plugins.read();
        if let Some(plugin) = plugins.get(identifier) {
            return Some(plugin.clone());
        }

        plugins
            .values()
            .filter(|p| p.answers_to(identifier))
            .min_by(|a, b| a.name().cmp(b.name()))
            .cloned()
    }

    /// Whether the identified plugin is registered and enabled.
    pub fn is_enabled(&self, identifier: &str) -> bool {
        self.plugin(identifier).is_some_and(|p| p.is_enabled())
    }

    /// Enable a plugin by exact name. No-op if already enabled.
    pub fn enable(&self, name: &str) -> Result<(), HostError> {
        let plugin = self.plugin_exact(name)?;
        if plugin.is_enabled() {
            return Ok(());
        }

        plugin.set_enabled(true);
        info!(plugin = %plugin.name(), "plugin enabled");
        self.dispatch(&HostEvent::PluginEnabled(plugin));
        self.inner.queue.run_ready();
        Ok(())
    }

    /// Disable a plugin by exact name. No-op if already disabled.
    ///
    /// `PluginDisabling` is dispatched while the plugin is still enabled, so
    /// listeners can run teardown that reads its state. Its service
    /// registrations, scoped listeners, and pending deferred callbacks are
    /// then removed.
    pub fn disable(&self, name: &str) -> Result<(), HostError> {
        let plugin = self.plugin_exact(name)?;
        if !plugin.is_enabled() {
            return Ok(());
        }

        self.dispatch(&HostEvent::PluginDisabling(plugin.clone()));

        // Services go away with their providing plugin.
        let owned: Vec<_> = {
            let services = self.inner.services.read();
            services
                .iter()
                .filter(|r| Arc::ptr_eq(r.plugin(), &plugin))
                .cloned()
                .collect()
        };
        for registration in owned {
            self.unregister_service(&registration);
        }

        plugin.set_enabled(false);
        self.inner
            .listeners
            .lock()
            .retain(|l| !Arc::ptr_eq(&l.owner, &plugin));
        self.inner.queue.purge(&plugin);
        info!(plugin = %plugin.name(), "plugin disabled");
        Ok(())
    }

    /// Remove a plugin from the registry, disabling it first if needed.
    /// Pending deferred callbacks for it are discarded.
    pub fn unregister(&self, name: &str) -> Result<(), HostError> {
        let plugin = self.plugin_exact(name)?;
        if plugin.is_enabled() {
            self.disable(name)?;
        }

        self.inner.plugins.write().remove(name);
        self.inner.queue.purge(&plugin);
        debug!(plugin = %name, "unregistered plugin");
        Ok(())
    }

    fn plugin_exact(&self, name: &str) -> Result<Arc<Plugin>, HostError> {
        self.inner
            .plugins
            .read()
            .get(name)
            .cloned()
            .ok_or_else(|| HostError::unknown(name))
    }

    // -------------------------------------------------------------------------
    // Services
    // -------------------------------------------------------------------------

    /// Register a service under a capability type with default weight 0.
    pub fn register_service(
        &self,
        plugin: &Arc<Plugin>,
        capability: &str,
        provider: Arc<dyn Any + Send + Sync>,
    ) -> Arc<ServiceRegistration> {
        self.register_service_weighted(plugin, capability, provider, 0)
    }

    /// Register a service with an explicit weight (lower = higher priority).
    pub fn register_service_weighted(
        &self,
        plugin: &Arc<Plugin>,
        capability: &str,
        provider: Arc<dyn Any + Send + Sync>,
        weight: i32,
    ) -> Arc<ServiceRegistration> {
        // Registering under a type implies the type exists.
        self.inner.capabilities.declare(capability, &[]);

        let registration = Arc::new(ServiceRegistration::new(
            capability,
            provider,
            plugin.clone(),
            weight,
        ));
        self.inner.services.write().push(registration.clone());
        debug!(
            capability = %capability,
            plugin = %plugin.name(),
            weight,
            "service registered"
        );
        self.dispatch(&HostEvent::ServiceRegistered(registration.clone()));
        registration
    }

    /// Remove a service registration. Returns false if it was not present.
    pub fn unregister_service(&self, registration: &Arc<ServiceRegistration>) -> bool {
        let removed = {
            let mut services = self.inner.services.write();
            let before = services.len();
            services.retain(|r| !Arc::ptr_eq(r, registration));
            services.len() != before
        };

        if removed {
            debug!(
                capability = %registration.capability(),
                plugin = %registration.plugin().name(),
                "service unregistered"
            );
            self.dispatch(&HostEvent::ServiceUnregistered(registration.clone()));
        }
        removed
    }

    /// Find the best registration satisfying a declared capability type:
    /// lowest weight, ties broken by registration order. Returns None when
    /// the declared type does not resolve.
    pub fn service_registration(&self, declared: &str) -> Option<Arc<ServiceRegistration>> {
        if !self.inner.capabilities.resolves(declared) {
            return None;
        }

        let services = self.inner.services.read();
        let mut best: Option<&Arc<ServiceRegistration>> = None;
        for registration in services.iter() {
            if !self
                .inner
                .capabilities
                .is_assignable(declared, registration.capability())
            {
                continue;
            }
            match best {
                Some(current) if registration.weight() >= current.weight() => {}
                _ => best = Some(registration),
            }
        }
        best.cloned()
    }

    /// All registrations satisfying a declared capability type, best first
    /// (weight order, ties by registration order). Empty when the declared
    /// type does not resolve.
    pub fn service_registrations(&self, declared: &str) -> Vec<Arc<ServiceRegistration>> {
        if !self.inner.capabilities.resolves(declared) {
            return Vec::new();
        }

        let services = self.inner.services.read();
        let mut matching: Vec<Arc<ServiceRegistration>> = services
            .iter()
            .filter(|r| {
                self.inner
                    .capabilities
                    .is_assignable(declared, r.capability())
            })
            .cloned()
            .collect();
        matching.sort_by_key(|r| r.weight());
        matching
    }

    // -------------------------------------------------------------------------
    // Events and deferred activation
    // -------------------------------------------------------------------------

    /// Subscribe a lifecycle listener scoped to an owning plugin. The host
    /// drops it automatically when the owner disables; there is no manual
    /// unsubscribe.
    pub fn subscribe(
        &self,
        owner: &Arc<Plugin>,
        callback: impl Fn(&HostEvent) + Send + Sync + 'static,
    ) {
        self.inner.listeners.lock().push(Arc::new(ScopedListener {
            owner: owner.clone(),
            callback: Box::new(callback),
        }));
    }

    /// Run the callback once the owner plugin is enabled: immediately if it
    /// already is, otherwise when it enables. Discarded if the owner is
    /// disabled or unregistered first. Callback errors are logged, never
    /// propagated.
    pub fn when_enabled(
        &self,
        owner: &Arc<Plugin>,
        callback: impl FnOnce() -> anyhow::Result<()> + Send + 'static,
    ) {
        self.inner.queue.schedule(owner, Box::new(callback));
    }

    fn dispatch(&self, event: &HostEvent) {
        let listeners: Vec<Arc<ScopedListener>> = self.inner.listeners.lock().clone();
        for listener in listeners {
            (listener.callback)(event);
        }
    }
}
