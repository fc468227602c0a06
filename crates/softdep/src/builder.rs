//! Builder facades for assembling trackers from plain closures.
//!
//! Callers that don't want to hand-write a hooks implementation chain
//! closures instead. Enable/disable callbacks compose: every registered
//! callback runs, in registration order, and an individual callback's
//! error is logged and swallowed so it never prevents the next one from
//! running.

use std::sync::Arc;

use anyhow::Result;
use legato_kernel::{Plugin, PluginHost, ServiceRegistration};
use tracing::error;

use crate::hooks::{Binding, DependencyHooks, ServiceBinding, ServiceHooks};
use crate::service::SoftServiceDependency;
use crate::tracker::SoftDependency;

type IdentifyFn = Box<dyn Fn(&Arc<Plugin>) -> Result<bool> + Send + Sync>;
type ConstructFn<T> = Box<dyn Fn(&Arc<Plugin>) -> Result<Option<T>> + Send + Sync>;
type BindingFn<T> = Box<dyn Fn(&Binding<T>) -> Result<()> + Send + Sync>;
type ServiceConstructFn<T> =
    Box<dyn Fn(&Arc<ServiceRegistration>) -> Result<Option<T>> + Send + Sync>;
type ServiceBindingFn<T> = Box<dyn Fn(&ServiceBinding<T>) -> Result<()> + Send + Sync>;

/// Builds a [`SoftDependency`] from closures.
///
/// Created via [`SoftDependency::builder`].
pub struct SoftDependencyBuilder<T> {
    host: PluginHost,
    owner: Arc<Plugin>,
    dependency_name: String,
    default: Option<T>,
    identify: Option<IdentifyFn>,
    construct: Option<ConstructFn<T>>,
    when_enable: Vec<BindingFn<T>>,
    when_disable: Vec<BindingFn<T>>,
}

impl<T: Clone + Send + Sync + 'static> SoftDependencyBuilder<T> {
    pub(crate) fn new(
        host: &PluginHost,
        owner: Arc<Plugin>,
        dependency_name: impl Into<String>,
    ) -> Self {
        Self {
            host: host.clone(),
            owner,
            dependency_name: dependency_name.into(),
            default: None,
            identify: None,
            construct: None,
            when_enable: Vec::new(),
            when_disable: Vec::new(),
        }
    }

    /// Value returned by `get()` while the dependency is inactive.
    pub fn default_value(mut self, value: T) -> Self {
        self.default = Some(value);
        self
    }

    /// Identification filter: only plugins accepted by the predicate
    /// activate the dependency. Default: accept all name matches.
    pub fn identify(
        mut self,
        predicate: impl Fn(&Arc<Plugin>) -> Result<bool> + Send + Sync + 'static,
    ) -> Self {
        self.identify = Some(Box::new(predicate));
        self
    }

    /// Constructor called when the dependency activates. Without one the
    /// tracker declines every activation and stays inactive.
    pub fn construct(
        mut self,
        constructor: impl Fn(&Arc<Plugin>) -> Result<Option<T>> + Send + Sync + 'static,
    ) -> Self {
        self.construct = Some(Box::new(constructor));
        self
    }

    /// Add an enable callback. May be called multiple times; callbacks run
    /// in registration order.
    pub fn when_enable(
        mut self,
        callback: impl Fn(&Binding<T>) -> Result<()> + Send + Sync + 'static,
    ) -> Self {
        self.when_enable.push(Box::new(callback));
        self
    }

    /// Add a disable callback. May be called multiple times; callbacks run
    /// in registration order.
    pub fn when_disable(
        mut self,
        callback: impl Fn(&Binding<T>) -> Result<()> + Send + Sync + 'static,
    ) -> Self {
        self.when_disable.push(Box::new(callback));
        self
    }

    /// Create the tracker.
    pub fn build(self) -> SoftDependency<T> {
        let hooks = CallbackHooks {
            dependency_name: self.dependency_name.clone(),
            identify: self.identify,
            construct: self.construct,
            when_enable: self.when_enable,
            when_disable: self.when_disable,
        };
        SoftDependency::with_default(
            &self.host,
            self.owner,
            self.dependency_name,
            self.default,
            hooks,
        )
    }
}

struct CallbackHooks<T> {
    dependency_name: String,
    identify: Option<IdentifyFn>,
    construct: Option<ConstructFn<T>>,
    when_enable: Vec<BindingFn<T>>,
    when_disable: Vec<BindingFn<T>>,
}

impl<T: Clone + Send + Sync + 'static> DependencyHooks<T> for CallbackHooks<T> {
    fn identify(&self, plugin: &Arc<Plugin>) -> Result<bool> {
        match &self.identify {
            Some(predicate) => predicate(plugin),
            None => Ok(true),
        }
    }

    fn construct(&self, plugin: &Arc<Plugin>) -> Result<Option<T>> {
        match &self.construct {
            Some(constructor) => constructor(plugin),
            None => Ok(None),
        }
    }

    fn on_enable(&self, binding: &Binding<T>) -> Result<()> {
        run_chain(&self.dependency_name, "enable", &self.when_enable, binding);
        Ok(())
    }

    fn on_disable(&self, binding: &Binding<T>) -> Result<()> {
        run_chain(
            &self.dependency_name,
            "disable",
            &self.when_disable,
            binding,
        );
        Ok(())
    }
}

/// Builds a [`SoftServiceDependency`] from closures.
///
/// Created via [`SoftServiceDependency::builder`].
pub struct SoftServiceDependencyBuilder<T> {
    host: PluginHost,
    owner: Arc<Plugin>,
    capability: String,
    default: Option<T>,
    construct: Option<ServiceConstructFn<T>>,
    when_enable: Vec<ServiceBindingFn<T>>,
    when_disable: Vec<ServiceBindingFn<T>>,
}

impl<T: Clone + Send + Sync + 'static> SoftServiceDependencyBuilder<T> {
    pub(crate) fn new(host: &PluginHost, owner: Arc<Plugin>, capability: impl Into<String>) -> Self {
        Self {
            host: host.clone(),
            owner,
            capability: capability.into(),
            default: None,
            construct: None,
            when_enable: Vec::new(),
            when_disable: Vec::new(),
        }
    }

    /// Value returned by `get()` while the dependency is inactive.
    pub fn default_value(mut self, value: T) -> Self {
        self.default = Some(value);
        self
    }

    /// Constructor called when the dependency activates. Without one the
    /// tracker declines every activation and stays inactive.
    pub fn construct(
        mut self,
        constructor: impl Fn(&Arc<ServiceRegistration>) -> Result<Option<T>> + Send + Sync + 'static,
    ) -> Self {
        self.construct = Some(Box::new(constructor));
        self
    }

    /// Add an enable callback. May be called multiple times; callbacks run
    /// in registration order.
    pub fn when_enable(
        mut self,
        callback: impl Fn(&ServiceBinding<T>) -> Result<()> + Send + Sync + 'static,
    ) -> Self {
        self.when_enable.push(Box::new(callback));
        self
    }

    /// Add a disable callback. May be called multiple times; callbacks run
    /// in registration order.
    pub fn when_disable(
        mut self,
        callback: impl Fn(&ServiceBinding<T>) -> Result<()> + Send + Sync + 'static,
    ) -> Self {
        self.when_disable.push(Box::new(callback));
        self
    }

    /// Create the tracker.
    pub fn build(self) -> SoftServiceDependency<T> {
        let hooks = ServiceCallbackHooks {
            capability: self.capability.clone(),
            construct: self.construct,
            when_enable: self.when_enable,
            when_disable: self.when_disable,
        };
        SoftServiceDependency::with_default(
            &self.host,
            self.owner,
            self.capability,
            self.default,
            hooks,
        )
    }
}

struct ServiceCallbackHooks<T> {
    capability: String,
    construct: Option<ServiceConstructFn<T>>,
    when_enable: Vec<ServiceBindingFn<T>>,
    when_disable: Vec<ServiceBindingFn<T>>,
}

impl<T: Clone + Send + Sync + 'static> ServiceHooks<T> for ServiceCallbackHooks<T> {
    fn construct(&self, registration: &Arc<ServiceRegistration>) -> Result<Option<T>> {
        match &self.construct {
            Some(constructor) => constructor(registration),
            None => Ok(None),
        }
    }

    fn on_enable(&self, binding: &ServiceBinding<T>) -> Result<()> {
        run_service_chain(&self.capability, "enable", &self.when_enable, binding);
        Ok(())
    }

    fn on_disable(&self, binding: &ServiceBinding<T>) -> Result<()> {
        run_service_chain(&self.capability, "disable", &self.when_disable, binding);
        Ok(())
    }
}

fn run_chain<T>(dependency: &str, hook: &str, callbacks: &[BindingFn<T>], binding: &Binding<T>) {
    for callback in callbacks {
        if let Err(e) = callback(binding) {
            error!(
                dependency = %dependency,
                hook = %hook,
                error = %e,
                "dependency callback failed"
            );
        }
    }
}

fn run_service_chain<T>(
    dependency: &str,
    hook: &str,
    callbacks: &[ServiceBindingFn<T>],
    binding: &ServiceBinding<T>,
) {
    for callback in callbacks {
        if let Err(e) = callback(binding) {
            error!(
                dependency = %dependency,
                hook = %hook,
                error = %e,
                "dependency callback failed"
            );
        }
    }
}
