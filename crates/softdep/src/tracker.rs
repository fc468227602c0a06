//! Tracks when an optional plugin dependency enables.
//!
//! A `SoftDependency` watches the host for a plugin matching its declared
//! identifier. When that plugin enables, the tracker runs the caller's
//! hooks to construct a usable value; when it disables, or the owner
//! itself is about to disable, the tracker tears the binding down again.
//! All transitions run synchronously inside the triggering lifecycle
//! dispatch, on the host thread.
//!
//! The state lock is never held across a hook invocation, so hooks may
//! freely call [`get`](SoftDependency::get) or
//! [`is_active`](SoftDependency::is_active) on their own tracker.

use std::sync::Arc;

use legato_kernel::{HostEvent, Plugin, PluginHost};
use parking_lot::Mutex;
use tracing::error;

use crate::builder::SoftDependencyBuilder;
use crate::detect::Detect;
use crate::hooks::{Binding, DependencyHooks};

/// Tracks an optional dependency on another plugin, by name.
///
/// Can be created before its owner enables; detection runs automatically
/// once the owner is up. While the dependency is unavailable,
/// [`get`](Self::get) returns the configured default.
pub struct SoftDependency<T> {
    inner: Arc<Inner<T>>,
}

struct Inner<T> {
    host: PluginHost,
    owner: Arc<Plugin>,
    dependency_name: String,
    default: Option<T>,
    hooks: Box<dyn DependencyHooks<T>>,
    state: Mutex<TrackState<T>>,
}

struct TrackState<T> {
    /// Present iff the dependency is active; holds plugin and value
    /// together so the two can never disagree.
    active: Option<Binding<T>>,
    /// Gate: when off, activation is forced inactive regardless of what the
    /// registry says.
    gate: bool,
    /// One-shot: set when the lifecycle listener has been registered.
    listening: bool,
}

impl<T> Clone for SoftDependency<T> {
    fn clone(&self) -> Self {
        Self {
            inner: Arc::clone(&self.inner),
        }
    }
}

impl<T: Clone + Send + Sync + 'static> SoftDependency<T> {
    /// Create a tracker with no default value.
    pub fn new(
        host: &PluginHost,
        owner: Arc<Plugin>,
        dependency_name: impl Into<String>,
        hooks: impl DependencyHooks<T> + 'static,
    ) -> Self {
        Self::with_default(host, owner, dependency_name, None, hooks)
    }

    /// Create a tracker returning `default` from [`get`](Self::get) while
    /// inactive.
    pub fn with_default(
        host: &PluginHost,
        owner: Arc<Plugin>,
        dependency_name: impl Into<String>,
        default: Option<T>,
        hooks: impl DependencyHooks<T> + 'static,
    ) -> Self {
        let dependency_name = dependency_name.into();
        let gate = host.config().dependency_enabled(&dependency_name);
        let inner = Arc::new(Inner {
            host: host.clone(),
            owner,
            dependency_name,
            default,
            hooks: Box::new(hooks),
            state: Mutex::new(TrackState {
                active: None,
                gate,
                listening: false,
            }),
        });

        // Detection runs automatically once the owner enables, so the
        // tracker can be created in the owner's constructor.
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
    /// [`DependencyHooks`] implementation.
    pub fn builder(
        host: &PluginHost,
        owner: Arc<Plugin>,
        dependency_name: impl Into<String>,
    ) -> SoftDependencyBuilder<T> {
        SoftDependencyBuilder::new(host, owner, dependency_name)
    }

    /// The plugin that owns this tracker.
    pub fn owner(&self) -> &Arc<Plugin> {
        &self.inner.owner
    }

    /// The declared dependency identifier. For a dependency matched through
    /// a `provides` alias this is the alias, not the plugin's actual name.
    pub fn name(&self) -> &str {
        &self.inner.dependency_name
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

    /// Whether an external plugin is currently bound.
    pub fn is_active(&self) -> bool {
        self.inner.state.lock().active.is_some()
    }

    /// The bound plugin, if active.
    pub fn plugin(&self) -> Option<Arc<Plugin>> {
        self.inner
            .state
            .lock()
            .active
            .as_ref()
            .map(|b| b.plugin().clone())
    }

    /// Flip the gate. Turning it off while active deactivates immediately
    /// (the disable hook runs even though the external plugin stays up);
    /// turning it on re-probes. No-op when unchanged.
    ///
    /// The gate also latches off right before the owner disables, so no
    /// dependency logic outlives its owner. A tracker does not survive its
    /// owner's disable/re-enable cycle; create a new one with the new owner
    /// instance.
    pub fn set_enabled(&self, enabled: bool) {
        Self::set_enabled_inner(&self.inner, enabled);
    }

    /// Probe whether the dependency is currently available.
    ///
    /// Runs automatically after the owner enables, but can be called
    /// earlier during the owner's own startup to bind a little sooner.
    /// No-op while the gate is off or the owner is not enabled. The first
    /// effective call subscribes the tracker's lifecycle listener; every
    /// call probes the registry and activates synchronously on a match.
    pub fn detect(&self) {
        Self::detect_inner(&self.inner);
    }

    fn set_enabled_inner(inner: &Arc<Inner<T>>, enabled: bool) {
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

    fn detect_inner(inner: &Arc<Inner<T>>) {
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

        Self::probe(inner);
    }

    fn probe(inner: &Arc<Inner<T>>) {
        let Some(plugin) = inner.host.plugin(&inner.dependency_name) else {
            return;
        };
        if plugin.is_enabled() && Self::run_identify(inner, &plugin) {
            Self::activate(inner, plugin);
        }
    }

    fn handle_event(inner: &Arc<Inner<T>>, event: &HostEvent) {
        match event {
            HostEvent::PluginEnabled(plugin) => {
                if !inner.state.lock().gate {
                    return;
                }
                // Look the identifier up again: the enabling plugin only
                // matters if it is what the registry now resolves to.
                let Some(matched) = inner.host.plugin(&inner.dependency_name) else {
                    return;
                };
                if Arc::ptr_eq(&matched, plugin)
                    && plugin.is_enabled()
                    && Self::run_identify(inner, plugin)
                {
                    Self::activate(inner, matched);
                }
            }
            HostEvent::PluginDisabling(plugin) => {
                if !inner.state.lock().gate {
                    return;
                }
                if Arc::ptr_eq(plugin, &inner.owner) {
                    // Owner teardown: force-disable before the owner's own
                    // shutdown proceeds.
                    Self::set_enabled_inner(inner, false);
                    return;
                }
                let bound = inner
                    .state
                    .lock()
                    .active
                    .as_ref()
                    .is_some_and(|b| Arc::ptr_eq(b.plugin(), plugin));
                if bound {
                    Self::deactivate(inner);
                }
            }
            _ => {}
        }
    }

    fn run_identify(inner: &Arc<Inner<T>>, plugin: &Arc<Plugin>) -> bool {
        match inner.hooks.identify(plugin) {
            Ok(accepted) => accepted,
            Err(e) => {
                error!(
                    dependency = %inner.dependency_name,
                    plugin = %plugin.name(),
                    error = %e,
                    "identify hook failed"
                );
                Self::report_not_enabled(inner);
                false
            }
        }
    }

    fn activate(inner: &Arc<Inner<T>>, plugin: Arc<Plugin>) {
        // Already bound to this exact instance: redundant notification.
        {
            let state = inner.state.lock();
            if let Some(active) = &state.active {
                if Arc::ptr_eq(active.plugin(), &plugin) {
                    return;
                }
            }
        }

        // A different instance is bound: tear it down before switching.
        Self::deactivate(inner);

        let value = match inner.hooks.construct(&plugin) {
            Ok(Some(value)) => value,
            Ok(None) => return,
            Err(e) => {
                error!(
                    dependency = %inner.dependency_name,
                    plugin = %plugin.name(),
                    error = %e,
                    "failed to construct dependency value"
                );
                return;
            }
        };

        let binding = Binding::new(plugin, value);
        inner.state.lock().active = Some(binding.clone());

        if let Err(e) = inner.hooks.on_enable(&binding) {
            error!(
                dependency = %inner.dependency_name,
                plugin = %binding.plugin().name(),
                error = %e,
                "enable hook failed, rolling back activation"
            );
            inner.state.lock().active = None;
        }
    }

    fn deactivate(inner: &Arc<Inner<T>>) {
        // Snapshot without clearing: the disable hook may still read the
        // active value through the tracker.
        let binding = {
            let state = inner.state.lock();
            match &state.active {
                Some(binding) => binding.clone(),
                None => return,
            }
        };

        if let Err(e) = inner.hooks.on_disable(&binding) {
            error!(
                dependency = %inner.dependency_name,
                plugin = %binding.plugin().name(),
                error = %e,
                "disable hook failed"
            );
        }

        // The state change is unconditional; only the hook outcome is
        // swallowed.
        inner.state.lock().active = None;
    }

    fn report_not_enabled(inner: &Arc<Inner<T>>) {
        error!(
            dependency = %inner.dependency_name,
            owner = %inner.owner.name(),
            "integrated support for this dependency is not enabled"
        );
    }
}

impl<T: Clone + Send + Sync + 'static> Detect for SoftDependency<T> {
    fn detect(&self) {
        Self::detect_inner(&self.inner);
    }
}
