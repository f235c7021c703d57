//! Component declarations and the per-instance record the runtime keeps.

use std::any::Any;
use std::fmt;
use std::mem;
use std::rc::Rc;

use crate::context::ContextKey;
use crate::data::{Data, Props, Record};
use crate::descriptor::Key;
use crate::error::RenderError;
use crate::hash::map::HashMap;
use crate::observed::Observed;
use crate::reconcile::Mounted;
use crate::store::Subscription;
use crate::template::RenderResult;

pub type InstanceId = usize;

/// A component is a plain function from props to markup. Its address is its
/// identity in the instance registry.
pub type ComponentFn = fn(&Props) -> Result<RenderResult, RenderError>;

pub type Cleanup = Box<dyn FnOnce()>;
pub(crate) type MountCallback = Box<dyn FnOnce() -> Option<Cleanup>>;

pub(crate) fn component_id(render: ComponentFn) -> usize {
    render as usize
}

/// Options for [`create_component`].
#[derive(Clone, Debug, Default)]
pub struct ComponentOptions {
    key: Option<Key>,
    props: Props,
}

impl ComponentOptions {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn key(mut self, key: impl Into<Key>) -> Self {
        self.key = Some(key.into());
        self
    }

    pub fn props(mut self, props: impl Into<Props>) -> Self {
        self.props = props.into();
        self
    }
}

/// A lazily resolved reference to a component at some position in a parent's
/// markup. The descriptor builder turns it into an instance.
#[derive(Clone)]
pub struct ComponentRef {
    render: ComponentFn,
    key: Option<Key>,
    props: Props,
}

impl ComponentRef {
    pub fn key(&self) -> Option<&Key> {
        self.key.as_ref()
    }

    pub fn props(&self) -> &Props {
        &self.props
    }

    pub fn render_fn(&self) -> ComponentFn {
        self.render
    }

    pub(crate) fn into_parts(self) -> (Option<Key>, Props) {
        (self.key, self.props)
    }
}

impl fmt::Debug for ComponentRef {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ComponentRef")
            .field("component", &format_args!("{:#x}", component_id(self.render)))
            .field("key", &self.key)
            .field("props", &self.props)
            .finish()
    }
}

pub fn create_component(render: ComponentFn, options: ComponentOptions) -> ComponentRef {
    ComponentRef {
        render,
        key: options.key,
        props: options.props,
    }
}

/// Shorthand for a component with default options.
pub fn component(render: ComponentFn) -> ComponentRef {
    create_component(render, ComponentOptions::default())
}

/// Lifecycle of a component instance.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LifecycleState {
    Unmounted,
    Mounting,
    Mounted,
    Rendering,
    Unmounting,
    Removed,
}

impl LifecycleState {
    pub fn is_alive(self) -> bool {
        matches!(
            self,
            LifecycleState::Mounting | LifecycleState::Mounted | LifecycleState::Rendering
        )
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) enum SlotKind {
    State,
    Memo,
    Ref,
    WatchProps,
    Updated,
    Mount,
    Unmount,
    Provide,
    Store,
}

pub(crate) enum HookSlot {
    State(Observed),
    Memo {
        dependency: Option<Data>,
        cached: Option<Rc<dyn Any>>,
    },
    Ref(Box<dyn Any>),
    WatchProps(Rc<dyn Fn(&Props)>),
    Updated {
        source: Observed,
        snapshot: Record,
        callback: Rc<dyn Fn(&Record)>,
    },
    Mount,
    Unmount,
    Provide(ContextKey),
    Store(Rc<Subscription>),
}

impl HookSlot {
    fn kind(&self) -> SlotKind {
        match self {
            HookSlot::State(_) => SlotKind::State,
            HookSlot::Memo { .. } => SlotKind::Memo,
            HookSlot::Ref(_) => SlotKind::Ref,
            HookSlot::WatchProps(_) => SlotKind::WatchProps,
            HookSlot::Updated { .. } => SlotKind::Updated,
            HookSlot::Mount => SlotKind::Mount,
            HookSlot::Unmount => SlotKind::Unmount,
            HookSlot::Provide(_) => SlotKind::Provide,
            HookSlot::Store(_) => SlotKind::Store,
        }
    }
}

/// Positional hook storage for one instance.
///
/// The slot a hook call lands on is its call index within the render. The
/// number of calls made by the first completed render becomes the limit;
/// later renders may never exceed it.
#[derive(Default)]
pub(crate) struct HookTable {
    slots: Vec<HookSlot>,
    cursor: usize,
    limit: Option<usize>,
}

impl HookTable {
    pub(crate) fn begin_render(&mut self) {
        self.cursor = 0;
    }

    pub(crate) fn freeze(&mut self) {
        if self.limit.is_none() {
            self.limit = Some(self.cursor);
        }
    }

    pub(crate) fn cursor(&self) -> usize {
        self.cursor
    }

    pub(crate) fn limit(&self) -> Option<usize> {
        self.limit
    }

    /// Claims the next slot, creating it with `init` on first use. Returns the
    /// slot index and whether the slot was created by this call.
    pub(crate) fn claim(
        &mut self,
        kind: SlotKind,
        init: impl FnOnce() -> Result<HookSlot, RenderError>,
    ) -> Result<(usize, bool), RenderError> {
        let index = self.cursor;
        self.cursor += 1;
        if let Some(limit) = self.limit {
            if self.cursor > limit {
                return Err(RenderError::HookOrderViolation {
                    index: self.cursor,
                    limit,
                });
            }
        }
        if let Some(existing) = self.slots.get(index) {
            if existing.kind() != kind {
                return Err(RenderError::HookOrderViolation {
                    index: self.cursor,
                    limit: self.limit.unwrap_or(self.slots.len()),
                });
            }
            return Ok((index, false));
        }
        let slot = init()?;
        tracing::trace!(index, ?kind, "allocated hook slot");
        self.slots.push(slot);
        Ok((index, true))
    }

    pub(crate) fn get_mut(&mut self, index: usize) -> Option<&mut HookSlot> {
        self.slots.get_mut(index)
    }

    pub(crate) fn slots(&self) -> &[HookSlot] {
        &self.slots
    }

    pub(crate) fn slots_mut(&mut self) -> &mut [HookSlot] {
        &mut self.slots
    }

    /// Drops every slot, releasing the closures and containers they hold.
    pub(crate) fn release(&mut self) {
        self.slots.clear();
        self.cursor = 0;
    }
}

/// Durable record backing one position in the component tree.
pub(crate) struct Instance {
    pub(crate) id: InstanceId,
    pub(crate) render: ComponentFn,
    pub(crate) parent: Option<InstanceId>,
    pub(crate) depth: usize,
    pub(crate) structural_key: u64,
    pub(crate) state: LifecycleState,
    pub(crate) hooks: HookTable,
    pub(crate) props: Props,
    pub(crate) next_props: Props,
    pub(crate) prev_props: Props,
    pub(crate) tree: Option<Mounted>,
    /// Set when a re-render failed part way; `tree` may no longer describe
    /// the host nodes beneath its root.
    pub(crate) tree_stale: bool,
    pub(crate) dirty: bool,
    pub(crate) renders: usize,
    pub(crate) mount_queue: Vec<MountCallback>,
    pub(crate) unmount_queue: Vec<Cleanup>,
    pub(crate) provided: HashMap<ContextKey, Rc<dyn Any>>,
    pub(crate) context_readers: HashMap<ContextKey, Vec<InstanceId>>,
}

impl Instance {
    pub(crate) fn new(
        id: InstanceId,
        render: ComponentFn,
        parent: Option<InstanceId>,
        depth: usize,
        structural_key: u64,
        props: Props,
    ) -> Self {
        Self {
            id,
            render,
            parent,
            depth,
            structural_key,
            state: LifecycleState::Unmounted,
            hooks: HookTable::default(),
            props: props.clone(),
            next_props: props.clone(),
            prev_props: props,
            tree: None,
            tree_stale: false,
            dirty: false,
            renders: 0,
            mount_queue: Vec::new(),
            unmount_queue: Vec::new(),
            provided: HashMap::default(),
            context_readers: HashMap::default(),
        }
    }

    /// Rotates props for a new render pass and resets the hook cursor.
    pub(crate) fn begin_render(&mut self) -> (ComponentFn, Props) {
        let next = self.next_props.clone();
        self.prev_props = mem::replace(&mut self.props, next);
        self.hooks.begin_render();
        self.dirty = false;
        self.renders += 1;
        (self.render, self.props.clone())
    }

    pub(crate) fn registry_key(&self) -> (usize, u64) {
        (component_id(self.render), self.structural_key)
    }

    /// Releases everything that can hold user closures.
    pub(crate) fn release(&mut self) {
        self.hooks.release();
        self.mount_queue.clear();
        self.unmount_queue.clear();
        self.provided.clear();
        self.context_readers.clear();
        self.dirty = false;
    }
}

impl fmt::Debug for Instance {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Instance")
            .field("id", &self.id)
            .field("parent", &self.parent)
            .field("state", &self.state)
            .field("hooks", &self.hooks.slots.len())
            .field("renders", &self.renders)
            .finish()
    }
}
