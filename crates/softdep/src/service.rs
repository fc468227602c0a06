//! Tracks when an optional service dependency enables.
//!
//! The capability-flavored twin of [`crate::SoftDependency`]: the matching
//! key is a capability type name rather than a plugin name, any
//! registration whose concrete type is assignable to the declared one
//! matches, and deactivation follows the bound registration instance (not
//! the type) being removed.
//!
//! A declared type name that the catalog cannot resolve is treated as "no
//! match", never as an error: the tracker simply stays inactive until a
//! plugin declaring the type shows up.

use std::sync::Arc;

use legato_kernel::{HostEvent, Plugin, PluginHost, ServiceRegistration};
use parking_lot::Mutex;
use tracing::error;

use crate::builder::SoftServiceDependencyBuilder;
use crate::detect::Detect;
use crate::hooks::{ServiceBinding, ServiceHooks};

/// Tracks an optional dependency on a service, by capability type name.
pub struct SoftServiceDependency<T> {
    inner: Arc<ServiceInner<T>>,
}

struct ServiceInner<T> {
    host: PluginHost,
    owner: Arc<Plugin>,
    capability: String,
    default: Option<T>,
    hooks: Box<dyn ServiceHooks<T>>,
    state: Mutex<ServiceState<T>>,
}

struct ServiceState<T> {
    active: Option<ServiceBinding<T>>,
    gate: bool,
    listening: bool,
}

impl<T> Clone for SoftServiceDependency<T> {
    fn clone(&self) -> Self {
        Self {
            inner: Arc::clone(&self.inner),
        }
    }
}

impl<T: Clone + Send + Sync + 'static> SoftServiceDependency<T> {
    /// Create a tracker with no default value.
    pub fn new(
        host: &PluginHost,
        owner: Arc<Plugin>,
        capability: impl Into<String>,
        hooks: impl ServiceHooks<T> + 'static,
    ) -> Self {
        Self::with_default(host, owner, capability, None, hooks)
    }

    /// Create a tracker returning `default` from [`get`](Self::get) while
    /// inactive.
    pub fn with_default(
        host: &PluginHost,
        owner: Arc<Plugin>,
        capability: impl Into<String>,
        default: Option<T>,
        hooks: impl ServiceHooks<T> + 'static,
    ) -> Self {
        let capability = capability.into();
        let gate = host.config().dependency_enabled(&capability);
        let inner = Arc::new(ServiceInner {
            host: host.clone(),
            owner,
            capability,
            default,
            hooks: Box::new(hooks),
            state: Mutex::new(ServiceState {
                active: None,
                gate,
                listening: false,
            }),
        });

        let weak = Arc::downgrade(&inner);
        inner.host.when_enabled(&inner.owner, move || {
            if let Some(inner) = weak.upgrade() {
                Self::detect_inner(&inner);
            }
            Ok(())
        });

        Self { inner }
    }

    /// Start building a tracker from plain closures instead of a
    /// [`ServiceHooks`] implementation.
    pub fn builder(
        host: &PluginHost,
        owner: Arc<Plugin>,
        capability: impl Into<String>,
    ) -> SoftServiceDependencyBuilder<T> {
        SoftServiceDependencyBuilder::new(host, owner, capability)
    }

    /// The plugin that owns this tracker.
    pub fn owner(&self) -> &Arc<Plugin> {
        &self.inner.owner
    }

    /// The declared capability type name.
    pub fn name(&self) -> &str {
        &self.inner.capability
    }

    /// The current value: the constructed value while active, the default
    /// otherwise. Never blocks, never fails.
    pub fn get(&self) -> Option<T> {
        let state = self.inner.state.lock();
        state
            .active
            .as_ref()
            .map(|b| b.value().clone())
            .or_else(|| self.inner.default.clone())
    }

    /// Whether a service registration is currently bound.
    pub fn is_active(&self) -> bool {
        self.inner.state.lock().active.is_some()
    }

    /// The bound registration, if active.
    pub fn registration(&self) -> Option<Arc<ServiceRegistration>> {
        self.inner
            .state
            .lock()
            .active
            .as_ref()
            .map(|b| b.registration().clone())
    }

    /// The plugin providing the bound service, if active.
    pub fn service_plugin(&self) -> Option<Arc<Plugin>> {
        self.inner
            .state
            .lock()
            .active
            .as_ref()
            .map(|b| b.plugin().clone())
    }

    /// Flip the gate; same semantics as
    /// [`SoftDependency::set_enabled`](crate::SoftDependency::set_enabled).
    pub fn set_enabled(&self, enabled: bool) {
        Self::set_enabled_inner(&self.inner, enabled);
    }

    /// Probe whether a matching service is currently registered; same
    /// contract as [`SoftDependency::detect`](crate::SoftDependency::detect).
    pub fn detect(&self) {
        Self::detect_inner(&self.inner);
    }

    fn set_enabled_inner(inner: &Arc<ServiceInner<T>>, enabled: bool) {
        {
            let mut state = inner.state.lock();
            if state.gate == enabled {
                return;
            }
            state.gate = enabled;
        }
        if enabled {
            Self::detect_inner(inner);
        } else {
            Self::deactivate(inner);
        }
    }

    fn detect_inner(inner: &Arc<ServiceInner<T>>) {
        let subscribe = {
            let mut state = inner.state.lock();
            if !state.gate || !inner.owner.is_enabled() {
                return;
            }
            !std::mem::replace(&mut state.listening, true)
        };

        if subscribe {
            let weak = Arc::downgrade(inner);
            inner.host.subscribe(&inner.owner, move |event| {
                if let Some(inner) = weak.upgrade() {
                    Self::handle_event(&inner, event);
                }
            });
        }

        // An unresolvable type name yields None here, which is simply "not
        // available yet".
        if let Some(registration) = inner.host.service_registration(&inner.capability) {
            Self::activate(inner, registration);
        }
    }

    fn handle_event(inner: &Arc<ServiceInner<T>>, event: &HostEvent) {
        match event {
            HostEvent::ServiceRegistered(registration) => {
                if !inner.state.lock().gate {
                    return;
                }
                let capabilities = inner.host.capabilities();
                if capabilities.resolves(&inner.capability)
                    && capabilities.is_assignable(&inner.capability, registration.capability())
                {
                    Self::activate(inner, registration.clone());
                }
            }
            HostEvent::ServiceUnregistered(registration) => {
                if !inner.state.lock().gate {
                    return;
                }
                let bound = inner
                    .state
                    .lock()
                    .active
                    .as_ref()
                    .is_some_and(|b| Arc::ptr_eq(b.registration(), registration));
                if bound {
                    Self::deactivate(inner);
                }
            }
            HostEvent::PluginDisabling(plugin) => {
                if inner.state.lock().gate && Arc::ptr_eq(plugin, &inner.owner) {
                    Self::set_enabled_inner(inner, false);
                }
            }
            HostEvent::PluginEnabled(_) => {}
        }
    }

    fn activate(inner: &Arc<ServiceInner<T>>, registration: Arc<ServiceRegistration>) {
        {
            let state = inner.state.lock();
            if let Some(active) = &state.active {
                if Arc::ptr_eq(active.registration(), &registration) {
                    return;
                }
            }
        }

        Self::deactivate(inner);

        let value = match inner.hooks.construct(&registration) {
            Ok(Some(value)) => value,
            Ok(None) => return,
            Err(e) => {
                error!(
                    dependency = %inner.capability,
                    plugin = %registration.plugin().name(),
                    error = %e,
                    "failed to construct service dependency value"
                );
                return;
            }
        };

        let binding = ServiceBinding::new(registration, value);
        inner.state.lock().active = Some(binding.clone());

        if let Err(e) = inner.hooks.on_enable(&binding) {
            error!(
                dependency = %inner.capability,
                plugin = %binding.plugin().name(),
                error = %e,
                "enable hook failed, rolling back activation"
            );
            inner.state.lock().active = None;
        }
    }

    fn deactivate(inner: &Arc<ServiceInner<T>>) {
        let binding = {
            let state = inner.state.lock();
            match &state.active {
                Some(binding) => binding.clone(),
                None => return,
            }
        };

        if let Err(e) = inner.hooks.on_disable(&binding) {
            error!(
                dependency = %inner.capability,
                plugin = %binding.plugin().name(),
                error = %e,
                "disable hook failed"
            );
        }

        inner.state.lock().active = None;
    }
}

impl<T: Clone + Send + Sync + 'static> Detect for SoftServiceDependency<T> {
    fn detect(&self) {
        Self::detect_inner(&self.inner);
    }
}
