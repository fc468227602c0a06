//! Host lifecycle events.
//!
//! Four event kinds are dispatched synchronously on the calling thread.
//! Listeners are scoped to an owning plugin: the host drops them
//! automatically when the owner disables, so a listener never needs to
//! unsubscribe itself.

use std::sync::Arc;

use crate::plugin::Plugin;
use crate::service::ServiceRegistration;

/// A lifecycle event observed by subscribed listeners.
#[derive(Debug, Clone)]
pub enum HostEvent {
    /// A plugin finished enabling and is now running.
    PluginEnabled(Arc<Plugin>),

    /// A plugin is about to disable. Dispatched while the plugin is still
    /// enabled, before its services and listeners are torn down.
    PluginDisabling(Arc<Plugin>),

    /// A service registration was added.
    ServiceRegistered(Arc<ServiceRegistration>),

    /// A service registration was removed.
    ServiceUnregistered(Arc<ServiceRegistration>),
}

pub(crate) type EventCallback = Box<dyn Fn(&HostEvent) + Send + Sync>;

/// A listener bound to the lifetime of its owning plugin.
pub(crate) struct ScopedListener {
    pub(crate) owner: Arc<Plugin>,
    pub(crate) callback: EventCallback,
}
