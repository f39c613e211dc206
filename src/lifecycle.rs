//! Cooperation with an external tracing collector.
//!
//! The map never frees values itself. It reports what it holds through
//! [`Trace`], and the owning object notifies a [`Collector`] after every
//! successful mutation so incremental or generational collectors can keep
//! their barriers sound.

use crate::value::Value;
use core::cell::{Cell, RefCell};
use core::sync::atomic::{AtomicU64, Ordering};
use hashbrown::HashSet;
use log::trace;

/// Identity of a heap object as seen by the collector.
#[derive(Copy, Clone, Debug, Eq, PartialEq, Hash, Ord, PartialOrd)]
pub struct ObjectId(u64);

impl ObjectId {
    pub(crate) fn fresh() -> Self {
        static NEXT: AtomicU64 = AtomicU64::new(1);
        ObjectId(NEXT.fetch_add(1, Ordering::Relaxed))
    }

    pub fn get(&self) -> u64 {
        self.0
    }
}

/// Objects that hold references to collected values.
pub trait Trace {
    /// Visit every held reference. Order is unspecified; every reference is
    /// visited.
    fn mark(&self, visit: &mut dyn FnMut(&Value));

    /// Budget hint for incremental marking.
    fn gc_weight(&self) -> usize;
}

/// Barrier hooks invoked by owners after mutation.
pub trait Collector {
    /// `owner` may now reference `child`.
    fn field_write_barrier(&self, owner: ObjectId, child: &Value);

    /// `owner` may now reference any number of newer objects.
    fn write_barrier(&self, owner: ObjectId);
}

/// Collector for hosts without barriers.
#[derive(Copy, Clone, Debug, Default)]
pub struct NoopCollector;

impl Collector for NoopCollector {
    #[inline]
    fn field_write_barrier(&self, _owner: ObjectId, _child: &Value) {}

    #[inline]
    fn write_barrier(&self, _owner: ObjectId) {}
}

/// Records owners that must be rescanned before the next minor collection.
///
/// Field barriers against immediates (nil, booleans, numbers, symbols) are
/// ignored since they cannot point into the heap.
#[derive(Debug, Default)]
pub struct RememberedSet {
    owners: RefCell<HashSet<ObjectId>>,
    barriers: Cell<usize>,
}

impl RememberedSet {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn contains(&self, owner: ObjectId) -> bool {
        self.owners.borrow().contains(&owner)
    }

    pub fn len(&self) -> usize {
        self.owners.borrow().len()
    }

    pub fn is_empty(&self) -> bool {
        self.owners.borrow().is_empty()
    }

    /// Number of barrier calls that recorded an owner.
    pub fn barrier_count(&self) -> usize {
        self.barriers.get()
    }

    /// Take the recorded owners, leaving the set empty.
    pub fn drain(&self) -> Vec<ObjectId> {
        let mut owners: Vec<ObjectId> = self.owners.borrow_mut().drain().collect();
        owners.sort_unstable();
        owners
    }

    fn remember(&self, owner: ObjectId) {
        self.barriers.set(self.barriers.get() + 1);
        if self.owners.borrow_mut().insert(owner) {
            trace!("remembered set: added owner {}", owner.0);
        }
    }
}

impl Collector for RememberedSet {
    fn field_write_barrier(&self, owner: ObjectId, child: &Value) {
        if matches!(child, Value::String(_) | Value::Object(_)) {
            self.remember(owner);
        }
    }

    fn write_barrier(&self, owner: ObjectId) {
        self.remember(owner);
    }
}
