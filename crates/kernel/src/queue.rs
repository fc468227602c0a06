//! Deferred-activation queue.
//!
//! Holds callbacks that must run once their owning plugin finishes
//! enabling. Owned by the host and living for its lifetime; trackers reach
//! it through [`crate::PluginHost::when_enabled`].
//!
//! The pending list sits behind a mutex, but callbacks always run with the
//! lock released so a callback may schedule further work without
//! deadlocking.

use std::sync::Arc;

use parking_lot::Mutex;
use tracing::error;

use crate::plugin::Plugin;

pub(crate) type EnableCallback = Box<dyn FnOnce() -> anyhow::Result<()> + Send>;

struct EnableEntry {
    owner: Arc<Plugin>,
    callback: EnableCallback,
}

#[derive(Default)]
pub(crate) struct EnableQueue {
    pending: Mutex<Vec<EnableEntry>>,
}

impl EnableQueue {
    /// Run the callback now if the owner is already enabled, otherwise queue
    /// it until the owner enables. Queued entries for owners that never
    /// enable are discarded by [`purge`](Self::purge).
    pub(crate) fn schedule(&self, owner: &Arc<Plugin>, callback: EnableCallback) {
        if owner.is_enabled() {
            run_entry(EnableEntry {
                owner: owner.clone(),
                callback,
            });
        } else {
            self.pending.lock().push(EnableEntry {
                owner: owner.clone(),
                callback,
            });
        }
    }

    /// Run and remove every entry whose owner has enabled since it was
    /// queued. Called by the host after each plugin enable.
    pub(crate) fn run_ready(&self) {
        let ready = {
            let mut pending = self.pending.lock();
            let (ready, waiting): (Vec<_>, Vec<_>) = std::mem::take(&mut *pending)
                .into_iter()
                .partition(|entry| entry.owner.is_enabled());
            *pending = waiting;
            ready
        };

        for entry in ready {
            run_entry(entry);
        }
    }

    /// Drop every pending entry for the given owner.
    pub(crate) fn purge(&self, owner: &Arc<Plugin>) {
        self.pending
            .lock()
            .retain(|entry| !Arc::ptr_eq(&entry.owner, owner));
    }
}

fn run_entry(entry: EnableEntry) {
    if let Err(e) = (entry.callback)() {
        error!(
            plugin = %entry.owner.name(),
            error = %e,
            "deferred enable callback failed"
        );
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used, clippy::expect_used)]
mod tests {
    use super::*;
    use crate::plugin::PluginInfo;
    use std::sync::atomic::{AtomicUsize, Ordering};

    fn plugin(name: &str) -> Arc<Plugin> {
        Arc::new(Plugin::new(PluginInfo::new(name, "1.0.0")))
    }

    fn counting_callback(counter: &Arc<AtomicUsize>) -> EnableCallback {
        let counter = counter.clone();
        Box::new(move || {
            counter.fetch_add(1, Ordering::SeqCst);
            Ok(())
        })
    }

    #[test]
    fn runs_immediately_for_enabled_owner() {
        let queue = EnableQueue::default();
        let owner = plugin("owner");
        owner.set_enabled(true);

        let count = Arc::new(AtomicUsize::new(0));
        queue.schedule(&owner, counting_callback(&count));

        assert_eq!(count.load(Ordering::SeqCst), 1);
        assert!(queue.pending.lock().is_empty());
    }

    #[test]
    fn defers_until_run_ready() {
        let queue = EnableQueue::default();
        let owner = plugin("owner");

        let count = Arc::new(AtomicUsize::new(0));
        queue.schedule(&owner, counting_callback(&count));
        assert_eq!(count.load(Ordering::SeqCst), 0);

        // Owner still disabled: nothing runs.
        queue.run_ready();
        assert_eq!(count.load(Ordering::SeqCst), 0);

        owner.set_enabled(true);
        queue.run_ready();
        assert_eq!(count.load(Ordering::SeqCst), 1);

        // Entry was consumed.
        queue.run_ready();
        assert_eq!(count.load(Ordering::SeqCst), 1);
    }

    #[test]
    fn purge_discards_pending_entries() {
        let queue = EnableQueue::default();
        let owner = plugin("owner");
        let other = plugin("other");

        let count = Arc::new(AtomicUsize::new(0));
        queue.schedule(&owner, counting_callback(&count));
        queue.schedule(&other, counting_callback(&count));

        queue.purge(&owner);

        owner.set_enabled(true);
        other.set_enabled(true);
        queue.run_ready();

        assert_eq!(count.load(Ordering::SeqCst), 1);
    }

    #[test]
    fn callback_may_schedule_reentrantly() {
        let queue = Arc::new(EnableQueue::default());
        let owner = plugin("owner");
        owner.set_enabled(true);

        let count = Arc::new(AtomicUsize::new(0));
        let inner_count = count.clone();
        let inner_queue = queue.clone();
        let inner_owner = owner.clone();
        queue.schedule(
            &owner,
            Box::new(move || {
                inner_queue.schedule(&inner_owner, counting_callback(&inner_count));
                Ok(())
            }),
        );

        assert_eq!(count.load(Ordering::SeqCst), 1);
    }

    #[test]
    fn callback_error_is_swallowed() {
        let queue = EnableQueue::default();
        let owner = plugin("owner");
        owner.set_enabled(true);

        let count = Arc::new(AtomicUsize::new(0));
        queue.schedule(&owner, Box::new(|| anyhow::bail!("callback broke")));
        queue.schedule(&owner, counting_callback(&count));

        assert_eq!(count.load(Ordering::SeqCst), 1);
    }
}
