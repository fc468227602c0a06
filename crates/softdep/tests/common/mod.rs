//! Shared hook fixtures for tracker integration tests.

use std::sync::Arc;
use std::sync::atomic::Ordering::SeqCst;
use std::sync::atomic::{AtomicBool, AtomicUsize};

use anyhow::Result;
use legato_kernel::{Plugin, ServiceRegistration};
use legato_softdep::{Binding, DependencyHooks, ServiceBinding, ServiceHooks};

/// Invocation counters and failure switches shared with the test body.
#[derive(Default)]
pub struct HookStats {
    pub identifies: AtomicUsize,
    pub constructs: AtomicUsize,
    pub enables: AtomicUsize,
    pub disables: AtomicUsize,

    /// identify returns Ok(false).
    pub reject: AtomicBool,
    /// identify returns an error.
    pub fail_identify: AtomicBool,
    /// construct returns an error.
    pub fail_construct: AtomicBool,
    /// construct returns Ok(None).
    pub decline: AtomicBool,
    /// on_enable returns an error.
    pub fail_enable: AtomicBool,
    /// on_disable returns an error.
    pub fail_disable: AtomicBool,
}

/// Hook implementation that records every invocation and can be told to
/// fail any step. Implements both hook flavors, producing a fixed value.
#[derive(Clone, Default)]
pub struct RecordingHooks {
    value: String,
    stats: Arc<HookStats>,
}

impl RecordingHooks {
    pub fn with_value(value: &str) -> Self {
        Self {
            value: value.to_string(),
            stats: Arc::default(),
        }
    }

    pub fn stats(&self) -> Arc<HookStats> {
        self.stats.clone()
    }

    fn run_construct(&self) -> Result<Option<String>> {
        self.stats.constructs.fetch_add(1, SeqCst);
        if self.stats.fail_construct.load(SeqCst) {
            anyhow::bail!("construct failure requested");
        }
        if self.stats.decline.load(SeqCst) {
            return Ok(None);
        }
        Ok(Some(self.value.clone()))
    }

    fn run_on_enable(&self) -> Result<()> {
        self.stats.enables.fetch_add(1, SeqCst);
        if self.stats.fail_enable.load(SeqCst) {
            anyhow::bail!("enable failure requested");
        }
        Ok(())
    }

    fn run_on_disable(&self) -> Result<()> {
        self.stats.disables.fetch_add(1, SeqCst);
        if self.stats.fail_disable.load(SeqCst) {
            anyhow::bail!("disable failure requested");
        }
        Ok(())
    }
}

impl DependencyHooks<String> for RecordingHooks {
    fn identify(&self, _plugin: &Arc<Plugin>) -> Result<bool> {
        self.stats.identifies.fetch_add(1, SeqCst);
        if self.stats.fail_identify.load(SeqCst) {
            anyhow::bail!("identify failure requested");
        }
        Ok(!self.stats.reject.load(SeqCst))
    }

    fn construct(&self, _plugin: &Arc<Plugin>) -> Result<Option<String>> {
        self.run_construct()
    }

    fn on_enable(&self, _binding: &Binding<String>) -> Result<()> {
        self.run_on_enable()
    }

    fn on_disable(&self, _binding: &Binding<String>) -> Result<()> {
        self.run_on_disable()
    }
}

impl ServiceHooks<String> for RecordingHooks {
    fn construct(&self, _registration: &Arc<ServiceRegistration>) -> Result<Option<String>> {
        self.run_construct()
    }

    fn on_enable(&self, _binding: &ServiceBinding<String>) -> Result<()> {
        self.run_on_enable()
    }

    fn on_disable(&self, _binding: &ServiceBinding<String>) -> Result<()> {
        self.run_on_disable()
    }
}
