//! Host-tree boundary.
//!
//! The reconciler never touches a concrete UI toolkit. It drives a
//! [`HostTree`] through a handful of primitives; a browser DOM binding, a
//! terminal backend or the in-memory [`MemoryHost`] all fit behind it.

use std::any::Any;
use std::collections::BTreeMap;
use std::fmt;
use std::rc::Rc;

use crate::error::HostError;

pub type HostNodeId = usize;

/// Payload delivered to event listeners.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct HostEvent {
    pub name: String,
    pub target: HostNodeId,
    pub detail: Option<String>,
}

impl HostEvent {
    pub fn new(name: impl Into<String>, target: HostNodeId) -> Self {
        Self {
            name: name.into(),
            target,
            detail: None,
        }
    }

    pub fn with_detail(mut self, detail: impl Into<String>) -> Self {
        self.detail = Some(detail.into());
        self
    }
}

/// Shared event listener. Equality is identity.
#[derive(Clone)]
pub struct EventHandler(Rc<dyn Fn(&HostEvent)>);

impl EventHandler {
    pub fn new(handler: impl Fn(&HostEvent) + 'static) -> Self {
        Self(Rc::new(handler))
    }

    pub fn call(&self, event: &HostEvent) {
        (self.0)(event)
    }

    pub fn ptr_eq(&self, other: &EventHandler) -> bool {
        Rc::ptr_eq(&self.0, &other.0)
    }
}

impl fmt::Debug for EventHandler {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "EventHandler({:p})", Rc::as_ptr(&self.0))
    }
}

/// Callback receiving the host node an element with a `ref` attribute maps to.
#[derive(Clone)]
pub struct RefSetter(Rc<dyn Fn(HostNodeId)>);

impl RefSetter {
    pub fn new(setter: impl Fn(HostNodeId) + 'static) -> Self {
        Self(Rc::new(setter))
    }

    pub fn set(&self, node: HostNodeId) {
        (self.0)(node)
    }

    pub fn ptr_eq(&self, other: &RefSetter) -> bool {
        Rc::ptr_eq(&self.0, &other.0)
    }
}

impl fmt::Debug for RefSetter {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "RefSetter({:p})", Rc::as_ptr(&self.0))
    }
}

/// Mutation and query primitives the reconciler needs from a host tree.
pub trait HostTree: Any {
    fn create_text(&mut self, text: &str) -> HostNodeId;
    fn create_element(&mut self, tag: &str) -> HostNodeId;
    fn set_text(&mut self, node: HostNodeId, text: &str) -> Result<(), HostError>;
    fn set_attribute(&mut self, node: HostNodeId, name: &str, value: &str)
        -> Result<(), HostError>;
    fn remove_attribute(&mut self, node: HostNodeId, name: &str) -> Result<(), HostError>;
    fn add_listener(
        &mut self,
        node: HostNodeId,
        event: &str,
        handler: EventHandler,
    ) -> Result<(), HostError>;
    fn remove_listener(&mut self, node: HostNodeId, event: &str) -> Result<(), HostError>;

    /// Inserts `node` under `parent` before `before`, or last when `before`
    /// is `None`. A node that already has a parent is moved, not copied.
    fn insert(
        &mut self,
        parent: HostNodeId,
        node: HostNodeId,
        before: Option<HostNodeId>,
    ) -> Result<(), HostError>;

    /// Detaches `node` from its parent and releases it with its subtree.
    fn remove(&mut self, node: HostNodeId) -> Result<(), HostError>;

    fn parent(&self, node: HostNodeId) -> Option<HostNodeId>;
    fn next_sibling(&self, node: HostNodeId) -> Option<HostNodeId>;
    fn listener(&self, node: HostNodeId, event: &str) -> Option<EventHandler>;

    fn as_any(&self) -> &dyn Any;
    fn as_any_mut(&mut self) -> &mut dyn Any;
}

enum MemoryNodeKind {
    Text(String),
    Element {
        tag: String,
        attributes: BTreeMap<String, String>,
        listeners: BTreeMap<String, EventHandler>,
        children: Vec<HostNodeId>,
    },
}

struct MemoryNode {
    kind: MemoryNodeKind,
    parent: Option<HostNodeId>,
}

/// Arena-backed host tree used by tests and headless runs.
#[derive(Default)]
pub struct MemoryHost {
    nodes: Vec<Option<MemoryNode>>, // FUTURE(no_std): migrate to arena-backed node storage.
    created: usize,
}

impl MemoryHost {
    pub fn new() -> Self {
        Self::default()
    }

    fn node(&self, id: HostNodeId) -> Result<&MemoryNode, HostError> {
        self.nodes
            .get(id)
            .and_then(Option::as_ref)
            .ok_or(HostError::Missing { id })
    }

    fn node_mut(&mut self, id: HostNodeId) -> Result<&mut MemoryNode, HostError> {
        self.nodes
            .get_mut(id)
            .and_then(Option::as_mut)
            .ok_or(HostError::Missing { id })
    }

    fn children_mut(&mut self, id: HostNodeId) -> Result<&mut Vec<HostNodeId>, HostError> {
        match &mut self.node_mut(id)?.kind {
            MemoryNodeKind::Element { children, .. } => Ok(children),
            MemoryNodeKind::Text(_) => Err(HostError::NotAnElement { id }),
        }
    }

    fn push(&mut self, kind: MemoryNodeKind) -> HostNodeId {
        let id = self.nodes.len();
        self.nodes.push(Some(MemoryNode { kind, parent: None }));
        self.created += 1;
        id
    }

    fn detach(&mut self, node: HostNodeId) -> Result<(), HostError> {
        if let Some(parent) = self.node(node)?.parent {
            self.children_mut(parent)?.retain(|child| *child != node);
            self.node_mut(node)?.parent = None;
        }
        Ok(())
    }

    /// Number of live nodes.
    pub fn len(&self) -> usize {
        self.nodes.iter().filter(|n| n.is_some()).count()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Number of nodes ever created, live or not.
    pub fn created_count(&self) -> usize {
        self.created
    }

    pub fn contains(&self, id: HostNodeId) -> bool {
        self.node(id).is_ok()
    }

    pub fn children(&self, id: HostNodeId) -> Vec<HostNodeId> {
        match self.node(id).map(|node| &node.kind) {
            Ok(MemoryNodeKind::Element { children, .. }) => children.clone(),
            _ => Vec::new(),
        }
    }

    pub fn tag(&self, id: HostNodeId) -> Option<&str> {
        match &self.node(id).ok()?.kind {
            MemoryNodeKind::Element { tag, .. } => Some(tag),
            MemoryNodeKind::Text(_) => None,
        }
    }

    pub fn attribute(&self, id: HostNodeId, name: &str) -> Option<&str> {
        match &self.node(id).ok()?.kind {
            MemoryNodeKind::Element { attributes, .. } => {
                attributes.get(name).map(String::as_str)
            }
            MemoryNodeKind::Text(_) => None,
        }
    }

    pub fn has_listener(&self, id: HostNodeId, event: &str) -> bool {
        self.listener(id, event).is_some()
    }

    /// Concatenated text content of `id` and its descendants.
    pub fn text_content(&self, id: HostNodeId) -> String {
        let mut output = String::new();
        let mut stack = vec![id];
        while let Some(current) = stack.pop() {
            match self.node(current).map(|node| &node.kind) {
                Ok(MemoryNodeKind::Text(text)) => output.push_str(text),
                Ok(MemoryNodeKind::Element { children, .. }) => {
                    stack.extend(children.iter().rev().copied());
                }
                Err(_) => {}
            }
        }
        output
    }

    /// Depth-first search for the first element with `tag` below `root`.
    pub fn find_by_tag(&self, root: HostNodeId, tag: &str) -> Option<HostNodeId> {
        self.find_all_by_tag(root, tag).into_iter().next()
    }

    pub fn find_all_by_tag(&self, root: HostNodeId, tag: &str) -> Vec<HostNodeId> {
        let mut found = Vec::new();
        let mut stack = vec![root];
        while let Some(current) = stack.pop() {
            if self.tag(current) == Some(tag) {
                found.push(current);
            }
            stack.extend(self.children(current).into_iter().rev());
        }
        found
    }

    /// Serialises the subtree under `id` back to markup.
    pub fn to_markup(&self, id: HostNodeId) -> String {
        let mut output = String::new();
        self.write_markup(&mut output, id);
        output
    }

    fn write_markup(&self, output: &mut String, id: HostNodeId) {
        match self.node(id).map(|node| &node.kind) {
            Ok(MemoryNodeKind::Text(text)) => output.push_str(text),
            Ok(MemoryNodeKind::Element {
                tag,
                attributes,
                children,
                ..
            }) => {
                output.push('<');
                output.push_str(tag);
                for (name, value) in attributes {
                    output.push_str(&format!(" {name}=\"{value}\""));
                }
                output.push('>');
                for child in children {
                    self.write_markup(output, *child);
                }
                output.push_str(&format!("</{tag}>"));
            }
            Err(_) => output.push_str("(missing)"),
        }
    }

    pub fn dump_tree(&self, root: Option<HostNodeId>) -> String {
        let mut output = String::new();
        if let Some(root_id) = root {
            self.dump_node(&mut output, root_id, 0);
        } else {
            output.push_str("(no root)\n");
        }
        output
    }

    fn dump_node(&self, output: &mut String, id: HostNodeId, depth: usize) {
        let indent = "  ".repeat(depth);
        match self.node(id).map(|node| &node.kind) {
            Ok(MemoryNodeKind::Text(text)) => {
                output.push_str(&format!("{indent}[{id}] {text:?}\n"));
            }
            Ok(MemoryNodeKind::Element { tag, children, .. }) => {
                output.push_str(&format!("{indent}[{id}] <{tag}>\n"));
                for child_id in children {
                    self.dump_node(output, *child_id, depth + 1);
                }
            }
            Err(_) => output.push_str(&format!("{indent}[{id}] (missing)\n")),
        }
    }
}

impl HostTree for MemoryHost {
    fn create_text(&mut self, text: &str) -> HostNodeId {
        self.push(MemoryNodeKind::Text(text.to_owned()))
    }

    fn create_element(&mut self, tag: &str) -> HostNodeId {
        self.push(MemoryNodeKind::Element {
            tag: tag.to_owned(),
            attributes: BTreeMap::new(),
            listeners: BTreeMap::new(),
            children: Vec::new(),
        })
    }

    fn set_text(&mut self, node: HostNodeId, text: &str) -> Result<(), HostError> {
        match &mut self.node_mut(node)?.kind {
            MemoryNodeKind::Text(current) => {
                *current = text.to_owned();
                Ok(())
            }
            MemoryNodeKind::Element { .. } => Err(HostError::NotText { id: node }),
        }
    }

    fn set_attribute(
        &mut self,
        node: HostNodeId,
        name: &str,
        value: &str,
    ) -> Result<(), HostError> {
        match &mut self.node_mut(node)?.kind {
            MemoryNodeKind::Element { attributes, .. } => {
                attributes.insert(name.to_owned(), value.to_owned());
                Ok(())
            }
            MemoryNodeKind::Text(_) => Err(HostError::NotAnElement { id: node }),
        }
    }

    fn remove_attribute(&mut self, node: HostNodeId, name: &str) -> Result<(), HostError> {
        match &mut self.node_mut(node)?.kind {
            MemoryNodeKind::Element { attributes, .. } => {
                attributes.remove(name);
                Ok(())
            }
            MemoryNodeKind::Text(_) => Err(HostError::NotAnElement { id: node }),
        }
    }

    fn add_listener(
        &mut self,
        node: HostNodeId,
        event: &str,
        handler: EventHandler,
    ) -> Result<(), HostError> {
        match &mut self.node_mut(node)?.kind {
            MemoryNodeKind::Element { listeners, .. } => {
                listeners.insert(event.to_owned(), handler);
                Ok(())
            }
            MemoryNodeKind::Text(_) => Err(HostError::NotAnElement { id: node }),
        }
    }

    fn remove_listener(&mut self, node: HostNodeId, event: &str) -> Result<(), HostError> {
        match &mut self.node_mut(node)?.kind {
            MemoryNodeKind::Element { listeners, .. } => {
                listeners.remove(event);
                Ok(())
            }
            MemoryNodeKind::Text(_) => Err(HostError::NotAnElement { id: node }),
        }
    }

    fn insert(
        &mut self,
        parent: HostNodeId,
        node: HostNodeId,
        before: Option<HostNodeId>,
    ) -> Result<(), HostError> {
        self.node(node)?;
        self.children_mut(parent)?;
        self.detach(node)?;
        let children = self.children_mut(parent)?;
        let index = before
            .and_then(|anchor| children.iter().position(|child| *child == anchor))
            .unwrap_or(children.len());
        children.insert(index, node);
        self.node_mut(node)?.parent = Some(parent);
        Ok(())
    }

    fn remove(&mut self, node: HostNodeId) -> Result<(), HostError> {
        self.detach(node)?;
        let mut stack = vec![node];
        while let Some(current) = stack.pop() {
            if let Some(slot) = self.nodes.get_mut(current) {
                if let Some(MemoryNode {
                    kind: MemoryNodeKind::Element { children, .. },
                    ..
                }) = slot.take()
                {
                    stack.extend(children);
                }
            }
        }
        Ok(())
    }

    fn parent(&self, node: HostNodeId) -> Option<HostNodeId> {
        self.node(node).ok()?.parent
    }

    fn next_sibling(&self, node: HostNodeId) -> Option<HostNodeId> {
        let parent = self.parent(node)?;
        match &self.node(parent).ok()?.kind {
            MemoryNodeKind::Element { children, .. } => {
                let index = children.iter().position(|child| *child == node)?;
                children.get(index + 1).copied()
            }
            MemoryNodeKind::Text(_) => None,
        }
    }

    fn listener(&self, node: HostNodeId, event: &str) -> Option<EventHandler> {
        match &self.node(node).ok()?.kind {
            MemoryNodeKind::Element { listeners, .. } => listeners.get(event).cloned(),
            MemoryNodeKind::Text(_) => None,
        }
    }

    fn as_any(&self) -> &dyn Any {
        self
    }

    fn as_any_mut(&mut self) -> &mut dyn Any {
        self
    }
}

impl fmt::Debug for MemoryHost {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("MemoryHost")
            .field("live", &self.len())
            .field("created", &self.created)
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn insert_moves_existing_node() {
        let mut host = MemoryHost::new();
        let a = host.create_element("a");
        let b = host.create_element("b");
        let child = host.create_text("x");
        host.insert(a, child, None).unwrap();
        host.insert(b, child, None).unwrap();
        assert!(host.children(a).is_empty());
        assert_eq!(host.children(b), vec![child]);
        assert_eq!(host.parent(child), Some(b));
    }

    #[test]
    fn insert_before_anchor_and_sibling_query() {
        let mut host = MemoryHost::new();
        let list = host.create_element("ul");
        let first = host.create_element("li");
        let second = host.create_element("li");
        host.insert(list, second, None).unwrap();
        host.insert(list, first, Some(second)).unwrap();
        assert_eq!(host.children(list), vec![first, second]);
        assert_eq!(host.next_sibling(first), Some(second));
        assert_eq!(host.next_sibling(second), None);
    }

    #[test]
    fn remove_releases_subtree() {
        let mut host = MemoryHost::new();
        let root = host.create_element("div");
        let inner = host.create_element("span");
        let text = host.create_text("hi");
        host.insert(root, inner, None).unwrap();
        host.insert(inner, text, None).unwrap();
        host.remove(inner).unwrap();
        assert!(host.children(root).is_empty());
        assert!(!host.contains(text));
        assert_eq!(host.len(), 1);
        assert_eq!(host.remove(inner), Err(HostError::Missing { id: inner }));
    }

    #[test]
    fn markup_round_trip_of_attributes_and_text() {
        let mut host = MemoryHost::new();
        let root = host.create_element("p");
        host.set_attribute(root, "class", "note").unwrap();
        let text = host.create_text("hello");
        host.insert(root, text, None).unwrap();
        assert_eq!(host.to_markup(root), "<p class=\"note\">hello</p>");
        assert_eq!(
            host.set_attribute(text, "x", "y"),
            Err(HostError::NotAnElement { id: text })
        );
    }
}
