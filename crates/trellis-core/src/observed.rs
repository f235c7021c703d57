//! Explicit observed records: the state behind `use_state` and stores.

use std::cell::RefCell;
use std::fmt;
use std::rc::Rc;

use crate::component::InstanceId;
use crate::data::{Data, Record};
use crate::runtime::RuntimeHandle;

pub(crate) struct ObservedInner {
    record: RefCell<Record>,
    subscribers: RefCell<Vec<InstanceId>>,
    runtime: RuntimeHandle,
}

/// A record whose writes schedule re-renders of its subscribers.
///
/// Reads and writes go through `get`/`set`; a write that leaves the field
/// equal to its previous value (reference equality for records and lists,
/// value equality for scalars) schedules nothing.
#[derive(Clone)]
pub struct Observed {
    inner: Rc<ObservedInner>,
}

impl Observed {
    pub(crate) fn new(record: Record, runtime: RuntimeHandle, subscribers: Vec<InstanceId>) -> Self {
        Self {
            inner: Rc::new(ObservedInner {
                record: RefCell::new(record),
                subscribers: RefCell::new(subscribers),
                runtime,
            }),
        }
    }

    pub fn get(&self, field: &str) -> Option<Data> {
        self.inner.record.borrow().get(field).cloned()
    }

    /// Integer view of a field; `None` when absent or not an integer.
    pub fn get_int(&self, field: &str) -> Option<i64> {
        self.inner.record.borrow().get(field).and_then(Data::as_int)
    }

    pub fn snapshot(&self) -> Record {
        self.inner.record.borrow().clone()
    }

    /// Writes `field`, returning whether the stored value changed.
    pub fn set(&self, field: &str, value: impl Into<Data>) -> bool {
        let value = value.into();
        let changed = {
            let mut record = self.inner.record.borrow_mut();
            if record.get(field) == Some(&value) {
                false
            } else {
                record.insert(field, value);
                true
            }
        };
        if changed {
            self.notify();
        }
        changed
    }

    /// Read-modify-write of one field. A missing field reads as `Null`.
    pub fn update(&self, field: &str, f: impl FnOnce(&Data) -> Data) -> bool {
        let current = self.get(field).unwrap_or_default();
        self.set(field, f(&current))
    }

    pub fn ptr_eq(&self, other: &Observed) -> bool {
        Rc::ptr_eq(&self.inner, &other.inner)
    }

    pub fn subscriber_count(&self) -> usize {
        self.inner.subscribers.borrow().len()
    }

    pub(crate) fn subscribe(&self, instance: InstanceId) {
        let mut subscribers = self.inner.subscribers.borrow_mut();
        if !subscribers.contains(&instance) {
            subscribers.push(instance);
        }
    }

    pub(crate) fn unsubscribe(&self, instance: InstanceId) {
        self.inner
            .subscribers
            .borrow_mut()
            .retain(|subscriber| *subscriber != instance);
    }

    fn notify(&self) {
        let subscribers = self.inner.subscribers.borrow().clone();
        let Some(runtime) = self.inner.runtime.upgrade() else {
            return;
        };
        for instance in subscribers {
            runtime.mark_dirty(instance);
        }
    }
}

impl fmt::Debug for Observed {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Observed")
            .field("record", &*self.inner.record.borrow())
            .field("subscribers", &*self.inner.subscribers.borrow())
            .finish()
    }
}
