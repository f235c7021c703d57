use std::cell::{Cell, Ref, RefCell, RefMut};
use std::fmt;
use std::mem;
use std::rc::{Rc, Weak};
use std::sync::Arc;

use crate::component::{
    component_id, Cleanup, ComponentFn, ComponentRef, HookSlot, Instance, InstanceId,
    LifecycleState,
};
use crate::data::{Data, Props};
use crate::descriptor::{DescriptorBuilder, NodeDescriptor};
use crate::error::RenderError;
use crate::hash::hash_one;
use crate::hash::map::{HashMap, HashSet};
use crate::hooks;
use crate::host::{HostEvent, HostNodeId, HostTree, RefSetter};
use crate::observed::Observed;
use crate::platform::FrameScheduler;
use crate::reconcile::Mounted;
use crate::registry::Registry;
use crate::scheduler::DirtyQueue;
use crate::store::Store;
use crate::template::TemplateCache;

/// Runtime tunables.
#[derive(Clone, Debug)]
pub struct RuntimeConfig {
    /// Recorded on every flush span.
    pub debug_name: String,
    /// Also reject re-renders that call fewer hooks than the first render.
    pub strict_hook_count: bool,
    /// Upper bound on consecutive flushes a frame pump runs before giving up.
    pub max_flush_rounds: usize,
}

impl Default for RuntimeConfig {
    fn default() -> Self {
        Self {
            debug_name: String::from("trellis"),
            strict_hook_count: false,
            max_flush_rounds: 64,
        }
    }
}

impl RuntimeConfig {
    pub fn debug_name(mut self, name: impl Into<String>) -> Self {
        self.debug_name = name.into();
        self
    }

    pub fn strict_hook_count(mut self, strict: bool) -> Self {
        self.strict_hook_count = strict;
        self
    }

    pub fn max_flush_rounds(mut self, rounds: usize) -> Self {
        self.max_flush_rounds = rounds;
        self
    }
}

struct RuntimeInner {
    config: RuntimeConfig,
    scheduler: Arc<dyn FrameScheduler>,
    host: RefCell<Box<dyn HostTree>>,
    instances: RefCell<HashMap<InstanceId, Instance>>, // FUTURE(no_std): slab-backed arena.
    registry: RefCell<Registry>,
    dirty: RefCell<DirtyQueue>,
    templates: RefCell<TemplateCache>,
    next_instance: Cell<InstanceId>,
    in_pass: Cell<bool>,
}

/// Host mutations and hook callbacks collected while a pass runs and
/// applied once its tree is in place.
#[derive(Default)]
pub(crate) struct RenderPass {
    pub(crate) mounted: Vec<InstanceId>,
    pub(crate) updated: Vec<InstanceId>,
    pub(crate) refs: Vec<(RefSetter, HostNodeId)>,
}

struct PassGuard<'a>(&'a Cell<bool>);

impl Drop for PassGuard<'_> {
    fn drop(&mut self) {
        self.0.set(false);
    }
}

struct FlushGuard<'a>(&'a RefCell<DirtyQueue>);

impl Drop for FlushGuard<'_> {
    fn drop(&mut self) {
        self.0.borrow_mut().end_flush();
    }
}

/// Owns the host tree, every component instance, the instance registry and
/// the dirty queue. Cloning is cheap and shares the same runtime.
#[derive(Clone)]
pub struct Runtime {
    inner: Rc<RuntimeInner>,
}

impl Runtime {
    pub fn new(host: impl HostTree, scheduler: Arc<dyn FrameScheduler>) -> Self {
        Self::with_config(host, scheduler, RuntimeConfig::default())
    }

    pub fn with_config(
        host: impl HostTree,
        scheduler: Arc<dyn FrameScheduler>,
        config: RuntimeConfig,
    ) -> Self {
        Self {
            inner: Rc::new(RuntimeInner {
                config,
                scheduler,
                host: RefCell::new(Box::new(host)),
                instances: RefCell::new(HashMap::default()),
                registry: RefCell::new(Registry::default()),
                dirty: RefCell::new(DirtyQueue::default()),
                templates: RefCell::new(TemplateCache::default()),
                next_instance: Cell::new(1),
                in_pass: Cell::new(false),
            }),
        }
    }

    pub fn handle(&self) -> RuntimeHandle {
        RuntimeHandle(Rc::downgrade(&self.inner))
    }

    pub fn config(&self) -> &RuntimeConfig {
        &self.inner.config
    }

    /// Mounts `component` as a new root appended to `container`.
    pub fn render_root(
        &self,
        container: HostNodeId,
        component: ComponentFn,
        props: impl Into<Props>,
    ) -> Result<InstanceId, RenderError> {
        let _pass = self.begin_pass()?;
        let props = props.into();
        let structural = hash_one(&(container, self.inner.next_instance.get()));
        let id = self.allocate(component, None, structural, props.clone());

        let mut pass = RenderPass::default();
        let root = NodeDescriptor::Component {
            instance: id,
            key: None,
            props,
        };
        self.reconcile(Some(container), None, Some(root), &mut pass)?;
        self.finish_pass(pass)?;
        tracing::debug!(instance = id, container, "rendered root");
        Ok(id)
    }

    /// Tears down a root and everything beneath it and detaches its host
    /// node from the container.
    pub fn unmount_root(&self, root: InstanceId) -> Result<(), RenderError> {
        let _pass = self.begin_pass()?;
        match self.lifecycle(root) {
            Some(state) if state.is_alive() => {}
            _ => return Err(RenderError::UnknownInstance { id: root }),
        }
        self.teardown(root)?;
        let mut pass = RenderPass::default();
        let previous = Mounted::Component {
            instance: root,
            key: None,
        };
        self.reconcile(None, Some(previous), None, &mut pass)?;
        Ok(())
    }

    /// Queues `instance` for re-render and requests a frame if none is
    /// pending.
    pub fn mark_dirty(&self, instance: InstanceId) {
        let accepted = match self.inner.instances.borrow_mut().get_mut(&instance) {
            Some(inst) if inst.state.is_alive() => {
                inst.dirty = true;
                true
            }
            Some(inst) if inst.state == LifecycleState::Removed => {
                tracing::warn!(instance, "state write targets a removed instance");
                false
            }
            Some(inst) => {
                tracing::trace!(instance, state = ?inst.state, "ignoring mark on inactive instance");
                false
            }
            None => {
                tracing::warn!(instance, "state write targets a removed instance");
                false
            }
        };
        if !accepted {
            return;
        }
        if self.inner.dirty.borrow_mut().mark(instance) {
            tracing::trace!(instance, "requesting frame");
            self.inner.scheduler.schedule_frame();
        }
    }

    pub fn needs_flush(&self) -> bool {
        self.inner.dirty.borrow().is_pending()
    }

    /// Re-renders every instance marked dirty since the previous flush,
    /// parents before children. Returns the number of instances rendered.
    ///
    /// A flush never nests: calling it while a flush or render pass is
    /// running returns `Ok(0)` and leaves the queue for the next frame.
    pub fn flush(&self) -> Result<usize, RenderError> {
        if self.inner.in_pass.get() {
            return Ok(0);
        }
        let Some(mut batch) = self.inner.dirty.borrow_mut().begin_flush() else {
            return Ok(0);
        };
        let _flushing = FlushGuard(&self.inner.dirty);
        let span = tracing::debug_span!(
            "flush",
            runtime = %self.inner.config.debug_name,
            dirty = batch.len()
        );
        let _entered = span.enter();

        {
            let instances = self.inner.instances.borrow();
            batch.sort_by_key(|id| instances.get(id).map_or(usize::MAX, |inst| inst.depth));
        }
        let mut rendered = 0;
        let mut batch = batch.into_iter();
        while let Some(id) = batch.next() {
            let ready = self
                .inner
                .instances
                .borrow()
                .get(&id)
                .is_some_and(|inst| inst.dirty && inst.state == LifecycleState::Mounted);
            if !ready {
                tracing::trace!(instance = id, "skipping clean or removed instance");
                continue;
            }
            if let Err(err) = self.rerender(id) {
                tracing::debug!(instance = id, error = %err, "flush aborted");
                for pending in batch {
                    let still_dirty = self
                        .inner
                        .instances
                        .borrow()
                        .get(&pending)
                        .is_some_and(|inst| inst.dirty);
                    if still_dirty {
                        self.mark_dirty(pending);
                    }
                }
                return Err(err);
            }
            rendered += 1;
        }
        Ok(rendered)
    }

    /// Creates a store over `initial`, which must be a record.
    pub fn create_store(&self, initial: impl Into<Data>) -> Result<Store, RenderError> {
        let record = hooks::state_record(initial.into())?;
        Ok(Store::new(Observed::new(record, self.handle(), Vec::new())))
    }

    /// Invokes the listener registered for `event` on `node`. Returns whether
    /// one was registered.
    pub fn dispatch_event(&self, node: HostNodeId, event: &str) -> bool {
        self.dispatch(&HostEvent::new(event, node))
    }

    pub fn dispatch(&self, event: &HostEvent) -> bool {
        let handler = self.inner.host.borrow().listener(event.target, &event.name);
        match handler {
            Some(handler) => {
                tracing::trace!(node = event.target, event = %event.name, "dispatching event");
                handler.call(event);
                true
            }
            None => false,
        }
    }

    /// Runs `f` against the host tree if it is an `H`.
    pub fn with_host<H: HostTree, R>(&self, f: impl FnOnce(&H) -> R) -> Option<R> {
        let host = self.inner.host.borrow();
        host.as_any().downcast_ref::<H>().map(f)
    }

    pub fn with_host_mut<H: HostTree, R>(&self, f: impl FnOnce(&mut H) -> R) -> Option<R> {
        let mut host = self.inner.host.borrow_mut();
        host.as_any_mut().downcast_mut::<H>().map(f)
    }

    pub fn lifecycle(&self, instance: InstanceId) -> Option<LifecycleState> {
        self.inner
            .instances
            .borrow()
            .get(&instance)
            .map(|inst| inst.state)
    }

    /// Host node at the root of `instance`'s rendered tree.
    pub fn host_node(&self, instance: InstanceId) -> Option<HostNodeId> {
        self.mounted_host(&Mounted::Component {
            instance,
            key: None,
        })
        .ok()
    }

    pub fn render_count(&self, instance: InstanceId) -> Option<usize> {
        self.inner
            .instances
            .borrow()
            .get(&instance)
            .map(|inst| inst.renders)
    }

    pub fn parent_of(&self, instance: InstanceId) -> Option<InstanceId> {
        self.inner
            .instances
            .borrow()
            .get(&instance)
            .and_then(|inst| inst.parent)
    }

    /// Child instances referenced directly by `instance`'s current tree.
    pub fn children_of(&self, instance: InstanceId) -> Vec<InstanceId> {
        self.inner
            .instances
            .borrow()
            .get(&instance)
            .and_then(|inst| inst.tree.as_ref().map(Mounted::component_instances))
            .unwrap_or_default()
    }

    pub fn instance_count(&self) -> usize {
        self.inner.instances.borrow().len()
    }

    pub fn registry_len(&self) -> usize {
        self.inner.registry.borrow().len()
    }

    pub fn template_count(&self) -> usize {
        self.inner.templates.borrow().len()
    }

    pub(crate) fn with_instance_mut<R>(
        &self,
        instance: InstanceId,
        f: impl FnOnce(&mut Instance) -> R,
    ) -> Result<R, RenderError> {
        let mut instances = self.inner.instances.borrow_mut();
        let inst = instances
            .get_mut(&instance)
            .ok_or(RenderError::UnknownInstance { id: instance })?;
        Ok(f(inst))
    }

    pub(crate) fn host(&self) -> Ref<'_, Box<dyn HostTree>> {
        self.inner.host.borrow()
    }

    pub(crate) fn host_mut(&self) -> RefMut<'_, Box<dyn HostTree>> {
        self.inner.host.borrow_mut()
    }

    fn begin_pass(&self) -> Result<PassGuard<'_>, RenderError> {
        if self.inner.in_pass.replace(true) {
            return Err(RenderError::Reentrant);
        }
        Ok(PassGuard(&self.inner.in_pass))
    }

    fn allocate(
        &self,
        render: ComponentFn,
        parent: Option<InstanceId>,
        structural_key: u64,
        props: Props,
    ) -> InstanceId {
        let id = self.inner.next_instance.get();
        self.inner.next_instance.set(id + 1);
        let mut instances = self.inner.instances.borrow_mut();
        let depth = parent
            .and_then(|parent| instances.get(&parent))
            .map_or(0, |parent| parent.depth + 1);
        instances.insert(
            id,
            Instance::new(id, render, parent, depth, structural_key, props),
        );
        self.inner
            .registry
            .borrow_mut()
            .insert(component_id(render), structural_key, id);
        tracing::trace!(instance = id, ?parent, "created instance");
        id
    }

    /// Registry lookup for a component position, creating the instance on
    /// first encounter.
    fn resolve_component(
        &self,
        parent: InstanceId,
        component: &ComponentRef,
        structural_key: u64,
    ) -> InstanceId {
        let render = component.render_fn();
        let existing = self
            .inner
            .registry
            .borrow()
            .lookup(component_id(render), structural_key);
        if let Some(id) = existing {
            let reusable = self.inner.instances.borrow().get(&id).is_some_and(|inst| {
                inst.state.is_alive() || inst.state == LifecycleState::Unmounted
            });
            if reusable {
                return id;
            }
        }
        self.allocate(
            render,
            Some(parent),
            structural_key,
            component.props().clone(),
        )
    }

    /// Calls the instance's render function and builds its descriptor.
    fn invoke_render(&self, id: InstanceId) -> Result<NodeDescriptor, RenderError> {
        let (render, props) = self.with_instance_mut(id, Instance::begin_render)?;
        let result = hooks::enter(self, id, || render(&props))?;

        let strict = self.inner.config.strict_hook_count;
        self.with_instance_mut(id, |inst| {
            let cursor = inst.hooks.cursor();
            match inst.hooks.limit() {
                Some(limit) if strict && cursor < limit => {
                    Err(RenderError::HookOrderViolation {
                        index: cursor,
                        limit,
                    })
                }
                _ => {
                    inst.hooks.freeze();
                    Ok(())
                }
            }
        })??;

        let mut templates = self.inner.templates.borrow_mut();
        let mut resolver = |component: &ComponentRef, structural_key: u64| {
            self.resolve_component(id, component, structural_key)
        };
        DescriptorBuilder::new(&mut templates, &mut resolver, Some(id)).build(result)
    }

    pub(crate) fn mount_instance(
        &self,
        id: InstanceId,
        pass: &mut RenderPass,
    ) -> Result<HostNodeId, RenderError> {
        self.with_instance_mut(id, |inst| inst.state = LifecycleState::Mounting)?;
        let mounted = match self
            .invoke_render(id)
            .and_then(|descriptor| self.mount_descriptor(descriptor, pass))
        {
            Ok(mounted) => mounted,
            Err(err) => {
                self.discard(id);
                return Err(err);
            }
        };
        let node = self.mounted_host(&mounted)?;
        self.with_instance_mut(id, |inst| inst.tree = Some(mounted))?;
        pass.mounted.push(id);
        tracing::debug!(instance = id, node, "mounted component");
        Ok(node)
    }

    /// Drops an instance whose first render failed, along with the children
    /// it mounted before failing. None of their host nodes were attached.
    fn discard(&self, id: InstanceId) {
        let mut doomed = vec![id];
        doomed.extend(self.descendants(id));
        for current in &doomed {
            if let Err(err) = self.teardown(*current) {
                tracing::warn!(instance = current, error = %err, "failed to tear down instance");
            }
        }
        for current in doomed {
            self.dispose(current);
        }
        tracing::debug!(instance = id, "discarded instance after failed mount");
    }

    fn live_children(&self, id: InstanceId) -> Vec<InstanceId> {
        let mut children: Vec<InstanceId> = self
            .inner
            .instances
            .borrow()
            .values()
            .filter(|inst| inst.parent == Some(id) && inst.state.is_alive())
            .map(|inst| inst.id)
            .collect();
        children.sort_unstable();
        children
    }

    /// Instances below `id` by parent link, parents before children.
    fn descendants(&self, id: InstanceId) -> Vec<InstanceId> {
        let instances = self.inner.instances.borrow();
        let mut found = Vec::new();
        let mut frontier = vec![id];
        while let Some(current) = frontier.pop() {
            let mut children: Vec<InstanceId> = instances
                .values()
                .filter(|inst| inst.parent == Some(current))
                .map(|inst| inst.id)
                .collect();
            children.sort_unstable();
            found.extend(children.iter().copied());
            frontier.extend(children);
        }
        found
    }

    /// Re-renders a mounted instance as part of `pass`: stale children are
    /// torn down first, then the new descriptor is reconciled against the
    /// previous tree.
    pub(crate) fn rerender_within(
        &self,
        id: InstanceId,
        pass: &mut RenderPass,
    ) -> Result<(), RenderError> {
        self.with_instance_mut(id, |inst| inst.state = LifecycleState::Rendering)?;
        let descriptor = match self.invoke_render(id) {
            Ok(descriptor) => descriptor,
            Err(err) => {
                self.with_instance_mut(id, |inst| inst.state = LifecycleState::Mounted)?;
                return Err(err);
            }
        };
        let taken = self.with_instance_mut(id, |inst| {
            let previous = inst.tree.take();
            if previous.is_none() {
                inst.state = LifecycleState::Mounted;
            }
            previous.map(|tree| (tree, inst.tree_stale))
        })?;
        let Some((previous, stale)) = taken else {
            return Err(RenderError::UnknownInstance { id });
        };

        let backup = previous.clone();
        match self.apply_rerender(id, previous, descriptor, stale, pass) {
            Ok(next) => {
                self.with_instance_mut(id, |inst| {
                    inst.tree = Some(next);
                    inst.tree_stale = false;
                    inst.state = LifecycleState::Mounted;
                })?;
                pass.updated.push(id);
                tracing::debug!(instance = id, "re-rendered component");
                Ok(())
            }
            Err(err) => {
                self.with_instance_mut(id, |inst| {
                    inst.tree = Some(backup);
                    inst.tree_stale = true;
                    inst.state = LifecycleState::Mounted;
                })?;
                tracing::debug!(instance = id, error = %err, "re-render failed");
                Err(err)
            }
        }
    }

    /// Tears down children the new descriptor no longer names, then patches
    /// the previous tree. A stale tree is replaced wholesale instead, and
    /// children mounted by the failed attempt are released with it.
    fn apply_rerender(
        &self,
        id: InstanceId,
        previous: Mounted,
        descriptor: NodeDescriptor,
        stale: bool,
        pass: &mut RenderPass,
    ) -> Result<Mounted, RenderError> {
        let retained: HashSet<InstanceId> = descriptor.component_instances().into_iter().collect();
        let known = previous.component_instances();
        let orphans: Vec<InstanceId> = if stale {
            self.live_children(id)
                .into_iter()
                .filter(|child| !known.contains(child) && !retained.contains(child))
                .collect()
        } else {
            Vec::new()
        };
        for child in known.iter().chain(&orphans) {
            if !retained.contains(child) {
                self.teardown(*child)?;
            }
        }
        if !stale {
            return self.patch(previous, descriptor, pass);
        }
        let next = self.replace(previous, descriptor, pass)?;
        for orphan in orphans {
            self.dispose(orphan);
        }
        Ok(next)
    }

    /// Re-renders one dirty instance. Whatever mounted before an error
    /// still receives its mount hooks.
    fn rerender(&self, id: InstanceId) -> Result<(), RenderError> {
        let _pass = self.begin_pass()?;
        let mut pass = RenderPass::default();
        let rendered = self.rerender_within(id, &mut pass);
        let finished = self.finish_pass(pass);
        rendered.and(finished)
    }

    /// Runs the unmount hooks of `id` and its descendants, parents first,
    /// drops their registry entries and marks them removed. Records stay
    /// until their host nodes are released.
    pub(crate) fn teardown(&self, id: InstanceId) -> Result<(), RenderError> {
        let mut stack = vec![id];
        while let Some(current) = stack.pop() {
            let taken = self
                .with_instance_mut(current, |inst| {
                    if matches!(
                        inst.state,
                        LifecycleState::Unmounting | LifecycleState::Removed
                    ) {
                        return None;
                    }
                    inst.state = LifecycleState::Unmounting;
                    let children = inst
                        .tree
                        .as_ref()
                        .map(Mounted::component_instances)
                        .unwrap_or_default();
                    Some((mem::take(&mut inst.unmount_queue), children, inst.registry_key()))
                })
                .ok()
                .flatten();
            let Some((cleanups, children, (component, structural))) = taken else {
                continue;
            };
            for cleanup in cleanups {
                cleanup();
            }
            self.inner
                .registry
                .borrow_mut()
                .remove(component, structural, current);
            self.with_instance_mut(current, |inst| {
                inst.state = LifecycleState::Removed;
                inst.release();
            })?;
            tracing::debug!(instance = current, "unmounted component");
            stack.extend(children.into_iter().rev());
        }
        Ok(())
    }

    /// Drops the records of `id` and every removed instance beneath it.
    pub(crate) fn dispose(&self, id: InstanceId) {
        let mut stack = vec![id];
        while let Some(current) = stack.pop() {
            let Some(inst) = self.inner.instances.borrow_mut().remove(&current) else {
                continue;
            };
            if let Some(tree) = &inst.tree {
                stack.extend(
                    tree.component_instances()
                        .into_iter()
                        .filter(|child| self.lifecycle(*child) == Some(LifecycleState::Removed)),
                );
            }
            tracing::trace!(instance = current, "disposed instance record");
        }
    }

    /// Applies ref setters, then mount hooks (children first), then
    /// prop-watch and update hooks of re-rendered instances.
    fn finish_pass(&self, pass: RenderPass) -> Result<(), RenderError> {
        for (setter, node) in pass.refs {
            setter.set(node);
        }

        for id in pass.mounted {
            let callbacks = self
                .with_instance_mut(id, |inst| {
                    if inst.state != LifecycleState::Mounting {
                        return Vec::new();
                    }
                    inst.state = LifecycleState::Mounted;
                    mem::take(&mut inst.mount_queue)
                })
                .unwrap_or_default();
            for callback in callbacks {
                if let Some(cleanup) = callback() {
                    self.queue_cleanup(id, cleanup);
                }
            }
        }

        for id in pass.updated {
            self.fire_update_hooks(id);
        }
        Ok(())
    }

    fn queue_cleanup(&self, id: InstanceId, cleanup: Cleanup) {
        let orphaned = match self.inner.instances.borrow_mut().get_mut(&id) {
            Some(inst) if inst.state.is_alive() => {
                inst.unmount_queue.push(cleanup);
                None
            }
            _ => Some(cleanup),
        };
        if let Some(cleanup) = orphaned {
            cleanup();
        }
    }

    fn fire_update_hooks(&self, id: InstanceId) {
        let collected = self.with_instance_mut(id, |inst| {
            if inst.state != LifecycleState::Mounted {
                return None;
            }
            let props_changed = inst.props.changed_from(&inst.prev_props);
            let mut watchers = Vec::new();
            let mut updates = Vec::new();
            for slot in inst.hooks.slots_mut() {
                match slot {
                    HookSlot::WatchProps(callback) if props_changed => {
                        watchers.push(Rc::clone(callback));
                    }
                    HookSlot::Updated {
                        source,
                        snapshot,
                        callback,
                    } => {
                        let current = source.snapshot();
                        if !current.shallow_eq(snapshot) {
                            let previous = mem::replace(snapshot, current);
                            updates.push((Rc::clone(callback), previous));
                        }
                    }
                    _ => {}
                }
            }
            Some((inst.prev_props.clone(), watchers, updates))
        });
        let Ok(Some((previous_props, watchers, updates))) = collected else {
            return;
        };
        for watcher in watchers {
            watcher(&previous_props);
        }
        for (callback, previous) in updates {
            callback(&previous);
        }
    }
}

impl fmt::Debug for Runtime {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Runtime")
            .field("name", &self.inner.config.debug_name)
            .field("instances", &self.inner.instances.borrow().len())
            .field("dirty", &self.inner.dirty.borrow().len())
            .field("flushing", &self.inner.dirty.borrow().is_flushing())
            .finish()
    }
}

/// Weak reference to a [`Runtime`], held by observed state.
#[derive(Clone)]
pub struct RuntimeHandle(Weak<RuntimeInner>);

impl RuntimeHandle {
    pub fn upgrade(&self) -> Option<Runtime> {
        self.0.upgrade().map(|inner| Runtime { inner })
    }

    pub fn mark_dirty(&self, instance: InstanceId) {
        if let Some(runtime) = self.upgrade() {
            runtime.mark_dirty(instance);
        }
    }
}

impl fmt::Debug for RuntimeHandle {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_tuple("RuntimeHandle")
            .field(&(self.0.strong_count() > 0))
            .finish()
    }
}

#[cfg(test)]
#[path = "tests/runtime_tests.rs"]
mod tests;
