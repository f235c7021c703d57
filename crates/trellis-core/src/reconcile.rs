//! Reconciliation of a fresh descriptor tree against the tree an instance
//! rendered last time, expressed as host-tree mutations.

use std::collections::BTreeMap;

use crate::component::{InstanceId, LifecycleState};
use crate::data::Props;
use crate::descriptor::{event_name, AttrValue, Key, NodeDescriptor};
use crate::error::RenderError;
use crate::hash::map::HashMap;
use crate::host::HostNodeId;
use crate::runtime::{RenderPass, Runtime};

/// A descriptor tree after it has been applied, carrying the host node of
/// every element and text node. Component nodes resolve their host node
/// through the instance they name.
#[derive(Clone, Debug)]
pub(crate) enum Mounted {
    Text {
        value: String,
        host: HostNodeId,
    },
    Element {
        tag: String,
        key: Option<Key>,
        attributes: BTreeMap<String, AttrValue>,
        children: Vec<Mounted>,
        host: HostNodeId,
    },
    Component {
        instance: InstanceId,
        key: Option<Key>,
    },
}

impl Mounted {
    pub(crate) fn key(&self) -> Option<&Key> {
        match self {
            Mounted::Text { .. } => None,
            Mounted::Element { key, .. } | Mounted::Component { key, .. } => key.as_ref(),
        }
    }

    /// Component instances referenced directly by this tree, in document
    /// order.
    pub(crate) fn component_instances(&self) -> Vec<InstanceId> {
        let mut found = Vec::new();
        let mut stack = vec![self];
        while let Some(node) = stack.pop() {
            match node {
                Mounted::Text { .. } => {}
                Mounted::Element { children, .. } => stack.extend(children.iter().rev()),
                Mounted::Component { instance, .. } => found.push(*instance),
            }
        }
        found
    }
}

fn same_kind(previous: &Mounted, next: &NodeDescriptor) -> bool {
    match (previous, next) {
        (Mounted::Text { .. }, NodeDescriptor::Text { .. }) => true,
        (Mounted::Element { tag, .. }, NodeDescriptor::Element { tag: next_tag, .. }) => {
            tag == next_tag
        }
        (
            Mounted::Component { instance, .. },
            NodeDescriptor::Component {
                instance: next_instance,
                ..
            },
        ) => instance == next_instance,
        _ => false,
    }
}

impl Runtime {
    /// Brings the host tree under `parent` from `previous` to `next`:
    /// removal when `next` is absent, creation and append when `previous`
    /// is absent, otherwise an in-place patch or a replacement.
    pub(crate) fn reconcile(
        &self,
        parent: Option<HostNodeId>,
        previous: Option<Mounted>,
        next: Option<NodeDescriptor>,
        pass: &mut RenderPass,
    ) -> Result<Option<Mounted>, RenderError> {
        match (previous, next) {
            (None, None) => Ok(None),
            (Some(previous), None) => {
                self.remove_mounted(previous)?;
                Ok(None)
            }
            (None, Some(next)) => {
                let mounted = self.mount_descriptor(next, pass)?;
                if let Some(parent) = parent {
                    let node = self.mounted_host(&mounted)?;
                    self.host_mut().insert(parent, node, None)?;
                }
                Ok(Some(mounted))
            }
            (Some(previous), Some(next)) => self.patch(previous, next, pass).map(Some),
        }
    }

    /// Patches `previous` into `next` in place when they are the same kind
    /// of node, otherwise builds `next` and swaps it in at the same position.
    pub(crate) fn patch(
        &self,
        previous: Mounted,
        next: NodeDescriptor,
        pass: &mut RenderPass,
    ) -> Result<Mounted, RenderError> {
        if same_kind(&previous, &next) {
            return self.reconcile_node(previous, next, pass);
        }
        self.replace(previous, next, pass)
    }

    /// Builds `next` from scratch and swaps it in where `previous` sits.
    /// Live components inside `previous` that `next` names again are moved.
    pub(crate) fn replace(
        &self,
        previous: Mounted,
        next: NodeDescriptor,
        pass: &mut RenderPass,
    ) -> Result<Mounted, RenderError> {
        let old_node = self.mounted_host(&previous)?;
        let parent = self.host().parent(old_node);
        let mounted = self.mount_descriptor(next, pass)?;
        let new_node = self.mounted_host(&mounted)?;
        if new_node != old_node {
            if let Some(parent) = parent {
                self.host_mut().insert(parent, new_node, Some(old_node))?;
            }
            self.remove_mounted(previous)?;
        }
        tracing::trace!(old_node, new_node, "replaced host node");
        Ok(mounted)
    }

    /// Builds host nodes for a descriptor that has no previous counterpart.
    /// The returned root is detached; the caller inserts it.
    pub(crate) fn mount_descriptor(
        &self,
        descriptor: NodeDescriptor,
        pass: &mut RenderPass,
    ) -> Result<Mounted, RenderError> {
        match descriptor {
            NodeDescriptor::Text { value } => {
                let host = self.host_mut().create_text(&value);
                tracing::trace!(node = host, "created text node");
                Ok(Mounted::Text { value, host })
            }
            NodeDescriptor::Element {
                tag,
                key,
                attributes,
                children,
            } => {
                let host = self.host_mut().create_element(&tag);
                tracing::trace!(node = host, %tag, "created element");
                for (name, value) in &attributes {
                    self.apply_attribute(host, name, None, Some(value), pass)?;
                }
                let mut mounted_children = Vec::with_capacity(children.len());
                for child in children {
                    let mounted = self.mount_descriptor(child, pass)?;
                    let node = self.mounted_host(&mounted)?;
                    self.host_mut().insert(host, node, None)?;
                    mounted_children.push(mounted);
                }
                Ok(Mounted::Element {
                    tag,
                    key,
                    attributes,
                    children: mounted_children,
                    host,
                })
            }
            NodeDescriptor::Component {
                instance,
                key,
                props,
            } => {
                match self.lifecycle(instance) {
                    Some(LifecycleState::Unmounted) => {
                        self.with_instance_mut(instance, |inst| inst.next_props = props)?;
                        self.mount_instance(instance, pass)?;
                    }
                    // Same position under a different parent node.
                    Some(LifecycleState::Mounted) => self.update_component(instance, props, pass)?,
                    _ => return Err(RenderError::UnknownInstance { id: instance }),
                }
                Ok(Mounted::Component { instance, key })
            }
        }
    }

    fn reconcile_node(
        &self,
        previous: Mounted,
        next: NodeDescriptor,
        pass: &mut RenderPass,
    ) -> Result<Mounted, RenderError> {
        match (previous, next) {
            (Mounted::Text { value, host }, NodeDescriptor::Text { value: next_value }) => {
                if value != next_value {
                    self.host_mut().set_text(host, &next_value)?;
                    tracing::trace!(node = host, "updated text");
                }
                Ok(Mounted::Text {
                    value: next_value,
                    host,
                })
            }
            (
                Mounted::Element {
                    tag,
                    attributes,
                    children,
                    host,
                    ..
                },
                NodeDescriptor::Element {
                    key,
                    attributes: next_attributes,
                    children: next_children,
                    ..
                },
            ) => {
                for (name, value) in &attributes {
                    if !next_attributes.contains_key(name) {
                        self.apply_attribute(host, name, Some(value), None, pass)?;
                    }
                }
                for (name, value) in &next_attributes {
                    let old = attributes.get(name);
                    if old != Some(value) {
                        self.apply_attribute(host, name, old, Some(value), pass)?;
                    }
                }
                let children = self.reconcile_children(host, children, next_children, pass)?;
                Ok(Mounted::Element {
                    tag,
                    key,
                    attributes: next_attributes,
                    children,
                    host,
                })
            }
            (
                Mounted::Component { instance, .. },
                NodeDescriptor::Component { key, props, .. },
            ) => {
                self.update_component(instance, props, pass)?;
                Ok(Mounted::Component { instance, key })
            }
            (previous, next) => self.patch(previous, next, pass),
        }
    }

    /// Passes new props to a mounted child and re-renders it within the
    /// current pass when they changed or it is dirty.
    fn update_component(
        &self,
        instance: InstanceId,
        props: Props,
        pass: &mut RenderPass,
    ) -> Result<(), RenderError> {
        let rerender = self.with_instance_mut(instance, |inst| {
            let changed = props.changed_from(&inst.props);
            inst.next_props = props;
            changed || inst.dirty
        })?;
        if rerender {
            self.rerender_within(instance, pass)?;
        }
        Ok(())
    }

    fn apply_attribute(
        &self,
        node: HostNodeId,
        name: &str,
        previous: Option<&AttrValue>,
        next: Option<&AttrValue>,
        pass: &mut RenderPass,
    ) -> Result<(), RenderError> {
        let mut host = self.host_mut();
        match previous {
            Some(AttrValue::Text(_)) if !matches!(next, Some(AttrValue::Text(_))) => {
                host.remove_attribute(node, name)?;
            }
            Some(AttrValue::Handler(_)) => host.remove_listener(node, event_name(name))?,
            _ => {}
        }
        match next {
            Some(AttrValue::Text(value)) => host.set_attribute(node, name, value)?,
            Some(AttrValue::Handler(handler)) => {
                host.add_listener(node, event_name(name), handler.clone())?;
            }
            Some(AttrValue::Ref(setter)) => pass.refs.push((setter.clone(), node)),
            None => {}
        }
        tracing::trace!(node, attribute = name, "patched attribute");
        Ok(())
    }

    /// Matches children by explicit key, falling back to position for
    /// unkeyed children, then re-establishes host order. Matched nodes are
    /// moved rather than recreated.
    fn reconcile_children(
        &self,
        parent: HostNodeId,
        previous: Vec<Mounted>,
        next: Vec<NodeDescriptor>,
        pass: &mut RenderPass,
    ) -> Result<Vec<Mounted>, RenderError> {
        let mut slots: Vec<Option<Mounted>> = previous.into_iter().map(Some).collect();
        let mut keyed: HashMap<Key, usize> = HashMap::default();
        for (index, slot) in slots.iter().enumerate() {
            if let Some(key) = slot.as_ref().and_then(Mounted::key) {
                keyed.insert(key.clone(), index);
            }
        }

        let mut replaced = Vec::new();
        let mut result = Vec::with_capacity(next.len());
        for (index, descriptor) in next.into_iter().enumerate() {
            let matched = match descriptor.key() {
                Some(key) => keyed.remove(key).and_then(|at| slots[at].take()),
                None => match slots.get_mut(index) {
                    Some(slot) if slot.as_ref().is_some_and(|m| m.key().is_none()) => slot.take(),
                    _ => None,
                },
            };
            let mounted = match matched {
                Some(previous) if same_kind(&previous, &descriptor) => {
                    self.reconcile_node(previous, descriptor, pass)?
                }
                Some(previous) => {
                    replaced.push(previous);
                    self.mount_descriptor(descriptor, pass)?
                }
                None => self.mount_descriptor(descriptor, pass)?,
            };
            result.push(mounted);
        }

        for stale in slots.into_iter().flatten().chain(replaced) {
            self.remove_mounted(stale)?;
        }

        let mut before = None;
        for mounted in result.iter().rev() {
            let node = self.mounted_host(mounted)?;
            let in_place = {
                let host = self.host();
                host.parent(node) == Some(parent) && host.next_sibling(node) == before
            };
            if !in_place {
                self.host_mut().insert(parent, node, before)?;
                tracing::trace!(node, parent, "moved host node");
            }
            before = Some(node);
        }
        Ok(result)
    }

    /// Detaches a previous subtree from the host tree and drops the records
    /// of the removed instances it contains. A component that is still
    /// alive has been moved into the new tree and is left alone.
    pub(crate) fn remove_mounted(&self, previous: Mounted) -> Result<(), RenderError> {
        if let Mounted::Component { instance, .. } = &previous {
            if self.lifecycle(*instance).is_some_and(LifecycleState::is_alive) {
                return Ok(());
            }
        }
        let removed: Vec<InstanceId> = previous
            .component_instances()
            .into_iter()
            .filter(|id| self.lifecycle(*id) == Some(LifecycleState::Removed))
            .collect();
        if let Ok(node) = self.mounted_host(&previous) {
            self.host_mut().remove(node)?;
            tracing::trace!(node, "removed host node");
        }
        for id in removed {
            self.dispose(id);
        }
        Ok(())
    }

    /// Host node at the root of a mounted tree, following component nodes
    /// through their instances.
    pub(crate) fn mounted_host(&self, mounted: &Mounted) -> Result<HostNodeId, RenderError> {
        let mut instance = match mounted {
            Mounted::Text { host, .. } | Mounted::Element { host, .. } => return Ok(*host),
            Mounted::Component { instance, .. } => *instance,
        };
        loop {
            instance = {
                let tree = self.with_instance_mut(instance, |inst| match inst.tree.as_ref() {
                    Some(Mounted::Text { host, .. }) | Some(Mounted::Element { host, .. }) => {
                        Ok(*host)
                    }
                    Some(Mounted::Component { instance, .. }) => Err(Some(*instance)),
                    None => Err(None),
                })?;
                match tree {
                    Ok(host) => return Ok(host),
                    Err(Some(child)) => child,
                    Err(None) => return Err(RenderError::UnknownInstance { id: instance }),
                }
            };
        }
    }
}
