//! Bulk detection across a set of trackers.
//!
//! An owner that declares several trackers can probe them all at one point
//! during its own startup instead of calling `detect` on each field. The
//! owner passes an explicit list; nothing is discovered by inspection.

/// A dependency tracker that can probe for its dependency.
pub trait Detect {
    /// Probe whether the dependency is currently available and activate on
    /// a match. See `SoftDependency::detect` for the full contract.
    fn detect(&self);
}

/// Call [`Detect::detect`] on every tracker in the list.
pub fn detect_all<'a, I>(trackers: I)
where
    I: IntoIterator<Item = &'a dyn Detect>,
{
    for tracker in trackers {
        tracker.detect();
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::cell::Cell;

    struct Probe {
        calls: Cell<usize>,
    }

    impl Detect for Probe {
        fn detect(&self) {
            self.calls.set(self.calls.get() + 1);
        }
    }

    #[test]
    fn detects_every_tracker_once() {
        let first = Probe {
            calls: Cell::new(0),
        };
        let second = Probe {
            calls: Cell::new(0),
        };

        detect_all([&first as &dyn Detect, &second as &dyn Detect]);

        assert_eq!(first.calls.get(), 1);
        assert_eq!(second.calls.get(), 1);
    }
}
