use std::cell::Cell;
use std::fmt;

use crate::component::InstanceId;
use crate::data::{Data, Record};
use crate::observed::Observed;

/// A record shared across the component tree outside the props chain.
///
/// Created with [`Runtime::create_store`](crate::Runtime::create_store).
/// Every write that changes a field marks each subscriber dirty.
#[derive(Clone)]
pub struct Store {
    state: Observed,
}

impl Store {
    pub(crate) fn new(state: Observed) -> Self {
        Self { state }
    }

    pub fn state(&self) -> &Observed {
        &self.state
    }

    pub fn get(&self, field: &str) -> Option<Data> {
        self.state.get(field)
    }

    pub fn set(&self, field: &str, value: impl Into<Data>) -> bool {
        self.state.set(field, value)
    }

    pub fn update(&self, field: &str, f: impl FnOnce(&Data) -> Data) -> bool {
        self.state.update(field, f)
    }

    pub fn snapshot(&self) -> Record {
        self.state.snapshot()
    }

    pub fn subscribe(&self, instance: InstanceId) -> Subscription {
        self.state.subscribe(instance);
        Subscription {
            state: self.state.clone(),
            instance,
            active: Cell::new(true),
        }
    }

    pub fn subscriber_count(&self) -> usize {
        self.state.subscriber_count()
    }
}

impl fmt::Debug for Store {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_tuple("Store").field(&self.state).finish()
    }
}

/// Registration of one instance on a store. Dropping it does not
/// unsubscribe; call [`Subscription::unsubscribe`].
pub struct Subscription {
    state: Observed,
    instance: InstanceId,
    active: Cell<bool>,
}

impl Subscription {
    pub fn instance(&self) -> InstanceId {
        self.instance
    }

    pub fn is_active(&self) -> bool {
        self.active.get()
    }

    pub fn unsubscribe(&self) {
        if self.active.replace(false) {
            self.state.unsubscribe(self.instance);
        }
    }
}

impl fmt::Debug for Subscription {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Subscription")
            .field("instance", &self.instance)
            .field("active", &self.active.get())
            .finish()
    }
}
