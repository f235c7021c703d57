#![doc = r"Component instances, hooks, reconciliation and frame-coalesced scheduling for markup-rendering UIs."]

extern crate self as trellis_core;

pub mod hash;
pub mod owned;
pub mod platform;

mod component;
mod context;
mod data;
mod descriptor;
mod error;
mod hooks;
mod host;
mod observed;
mod reconcile;
mod registry;
mod runtime;
mod scheduler;
mod store;
mod template;

pub use component::{
    component, create_component, Cleanup, ComponentFn, ComponentOptions, ComponentRef,
    InstanceId, LifecycleState,
};
pub use context::{create_context, Context};
pub use data::{Data, Props, Record};
pub use descriptor::{AttrValue, Key, NodeDescriptor};
pub use error::{HostError, RenderError};
pub use hooks::{
    current_instance, is_rendering, use_context, use_memo, use_mount, use_provide,
    use_provide_default, use_ref, use_state, use_store, use_unmount, use_updated,
    use_watch_props,
};
pub use host::{EventHandler, HostEvent, HostNodeId, HostTree, MemoryHost, RefSetter};
pub use observed::Observed;
pub use owned::Owned;
pub use platform::{DefaultScheduler, FrameScheduler, RecordingScheduler};
pub use runtime::{Runtime, RuntimeConfig, RuntimeHandle};
pub use store::{Store, Subscription};
pub use template::{RenderResult, Value, PLACEHOLDER};

#[cfg(test)]
#[path = "tests/reconcile_tests.rs"]
mod reconcile_tests;

#[cfg(test)]
#[path = "tests/scheduler_tests.rs"]
mod scheduler_tests;

#[cfg(test)]
#[path = "tests/store_context_tests.rs"]
mod store_context_tests;

#[cfg(test)]
#[path = "tests/support.rs"]
pub(crate) mod test_support;
