//! Node descriptors and the builder that resolves a [`RenderResult`] into one.

use std::collections::BTreeMap;
use std::fmt;
use std::rc::Rc;

use crate::component::{ComponentRef, InstanceId};
use crate::data::{Data, Props};
use crate::error::RenderError;
use crate::hash::map::HashSet;
use crate::hash::KeyHasher;
use crate::host::{EventHandler, RefSetter};
use crate::template::{RenderResult, Segment, TemplateCache, TemplateNode, Value};

/// Explicit identity of a sibling within a child list.
#[derive(Clone, Debug, PartialEq, Eq, Hash)]
pub enum Key {
    Str(Rc<str>),
    Int(i64),
}

impl fmt::Display for Key {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Key::Str(value) => write!(f, "{value:?}"),
            Key::Int(value) => write!(f, "{value}"),
        }
    }
}

impl From<&str> for Key {
    fn from(value: &str) -> Self {
        Key::Str(Rc::from(value))
    }
}

impl From<String> for Key {
    fn from(value: String) -> Self {
        Key::Str(Rc::from(value))
    }
}

macro_rules! key_from_int {
    ($($ty:ty),*) => {
        $(
            impl From<$ty> for Key {
                fn from(value: $ty) -> Self {
                    Key::Int(i64::from(value))
                }
            }
        )*
    };
}

key_from_int!(i32, i64, u32);

/// Keys must stay distinct, so values above `i64::MAX` fall back to their
/// decimal text instead of wrapping.
macro_rules! key_from_wide_int {
    ($($ty:ty),*) => {
        $(
            impl From<$ty> for Key {
                fn from(value: $ty) -> Self {
                    match i64::try_from(value) {
                        Ok(value) => Key::Int(value),
                        Err(_) => Key::from(value.to_string()),
                    }
                }
            }
        )*
    };
}

key_from_wide_int!(u64, usize);

/// Attribute payload on an element descriptor.
#[derive(Clone, Debug)]
pub enum AttrValue {
    Text(String),
    Handler(EventHandler),
    Ref(RefSetter),
}

impl PartialEq for AttrValue {
    fn eq(&self, other: &Self) -> bool {
        match (self, other) {
            (AttrValue::Text(a), AttrValue::Text(b)) => a == b,
            (AttrValue::Handler(a), AttrValue::Handler(b)) => a.ptr_eq(b),
            (AttrValue::Ref(a), AttrValue::Ref(b)) => a.ptr_eq(b),
            _ => false,
        }
    }
}

/// Event name a handler attribute listens to: `onclick` listens to `click`.
pub(crate) fn event_name(attribute: &str) -> &str {
    attribute.strip_prefix("on").unwrap_or(attribute)
}

/// Structural representation of one render output.
#[derive(Clone, Debug)]
pub enum NodeDescriptor {
    Text {
        value: String,
    },
    Element {
        tag: String,
        key: Option<Key>,
        attributes: BTreeMap<String, AttrValue>,
        children: Vec<NodeDescriptor>,
    },
    Component {
        instance: InstanceId,
        key: Option<Key>,
        props: Props,
    },
}

impl NodeDescriptor {
    pub fn text(value: impl Into<String>) -> Self {
        NodeDescriptor::Text {
            value: value.into(),
        }
    }

    pub fn key(&self) -> Option<&Key> {
        match self {
            NodeDescriptor::Text { .. } => None,
            NodeDescriptor::Element { key, .. } | NodeDescriptor::Component { key, .. } => {
                key.as_ref()
            }
        }
    }

    fn set_key(&mut self, new_key: Key) -> Result<(), RenderError> {
        match self {
            NodeDescriptor::Text { .. } => Err(RenderError::invalid_template(format!(
                "key {new_key} attached to a text node"
            ))),
            NodeDescriptor::Element { key, .. } | NodeDescriptor::Component { key, .. } => {
                *key = Some(new_key);
                Ok(())
            }
        }
    }

    /// Component instances referenced directly by this descriptor tree,
    /// without descending into the instances themselves.
    pub fn component_instances(&self) -> Vec<InstanceId> {
        let mut found = Vec::new();
        let mut stack = vec![self];
        while let Some(node) = stack.pop() {
            match node {
                NodeDescriptor::Text { .. } => {}
                NodeDescriptor::Element { children, .. } => stack.extend(children.iter().rev()),
                NodeDescriptor::Component { instance, .. } => found.push(*instance),
            }
        }
        found
    }
}

#[derive(Clone, Debug, Hash)]
enum PathSegment {
    Hole(usize),
    Key(Key),
    Index(usize),
}

/// Resolves a lazily declared component to the instance owning its position.
pub(crate) trait ComponentResolver {
    fn resolve(&mut self, component: &ComponentRef, structural_key: u64) -> InstanceId;
}

impl<F: FnMut(&ComponentRef, u64) -> InstanceId> ComponentResolver for F {
    fn resolve(&mut self, component: &ComponentRef, structural_key: u64) -> InstanceId {
        self(component, structural_key)
    }
}

struct Holes {
    values: std::vec::IntoIter<Value>,
    next: usize,
}

impl Holes {
    fn take(&mut self) -> Result<(usize, Value), RenderError> {
        let ordinal = self.next;
        self.next += 1;
        self.values
            .next()
            .map(|value| (ordinal, value))
            .ok_or_else(|| RenderError::invalid_template("fewer values than placeholders"))
    }
}

/// Walks parsed markup, resolving every placeholder against its value.
pub(crate) struct DescriptorBuilder<'a> {
    templates: &'a mut TemplateCache,
    resolver: &'a mut dyn ComponentResolver,
    parent: Option<InstanceId>,
    path: Vec<PathSegment>,
    seen: HashSet<InstanceId>,
}

impl<'a> DescriptorBuilder<'a> {
    pub(crate) fn new(
        templates: &'a mut TemplateCache,
        resolver: &'a mut dyn ComponentResolver,
        parent: Option<InstanceId>,
    ) -> Self {
        Self {
            templates,
            resolver,
            parent,
            path: Vec::new(),
            seen: HashSet::default(),
        }
    }

    /// Builds the single root descriptor of a component render.
    pub(crate) fn build(mut self, result: RenderResult) -> Result<NodeDescriptor, RenderError> {
        let mut roots = self.build_result(result)?;
        if roots.len() != 1 {
            return Err(RenderError::MultipleRoot { count: roots.len() });
        }
        Ok(roots.remove(0))
    }

    fn build_result(&mut self, result: RenderResult) -> Result<Vec<NodeDescriptor>, RenderError> {
        let (markup, values, key) = result.into_parts();
        let template = self.templates.get_or_parse(&markup)?;
        if template.holes != values.len() {
            return Err(RenderError::invalid_template(format!(
                "{} placeholder(s) but {} value(s)",
                template.holes,
                values.len()
            )));
        }
        let mut holes = Holes {
            values: values.into_iter(),
            next: 0,
        };
        let mut out = Vec::new();
        for node in &template.roots {
            self.build_node(node, &mut holes, &mut out)?;
        }
        if let Some(key) = key {
            match out.as_mut_slice() {
                [root] => root.set_key(key)?,
                _ => return Err(RenderError::MultipleRoot { count: out.len() }),
            }
        }
        Ok(out)
    }

    fn build_node(
        &mut self,
        node: &TemplateNode,
        holes: &mut Holes,
        out: &mut Vec<NodeDescriptor>,
    ) -> Result<(), RenderError> {
        match node {
            TemplateNode::Text(segments) => self.build_text(segments, holes, out),
            TemplateNode::Element {
                tag,
                attributes,
                children,
            } => {
                let mut key = None;
                let mut attrs = BTreeMap::new();
                for attribute in attributes {
                    let value = self.build_attribute(&attribute.name, &attribute.value, holes)?;
                    if attribute.name == "key" {
                        key = Some(match value {
                            AttrValue::Text(text) => key_from_text(text),
                            _ => {
                                return Err(RenderError::invalid_template(
                                    "key attribute must be a scalar",
                                ))
                            }
                        });
                        continue;
                    }
                    attrs.insert(attribute.name.clone(), value);
                }
                let mut built = Vec::with_capacity(children.len());
                for child in children {
                    self.build_node(child, holes, &mut built)?;
                }
                out.push(NodeDescriptor::Element {
                    tag: tag.clone(),
                    key,
                    attributes: attrs,
                    children: built,
                });
                Ok(())
            }
        }
    }

    fn build_text(
        &mut self,
        segments: &[Segment],
        holes: &mut Holes,
        out: &mut Vec<NodeDescriptor>,
    ) -> Result<(), RenderError> {
        let mut text = String::new();
        let flush = |text: &mut String, out: &mut Vec<NodeDescriptor>| {
            if !text.is_empty() {
                out.push(NodeDescriptor::text(std::mem::take(text)));
            }
        };
        for segment in segments {
            let (ordinal, value) = match segment {
                Segment::Literal(literal) => {
                    text.push_str(literal);
                    continue;
                }
                Segment::Hole => holes.take()?,
            };
            match value {
                Value::Data(data) => text.push_str(&scalar_text(&data)?),
                Value::Markup(result) => {
                    flush(&mut text, out);
                    self.path.push(PathSegment::Hole(ordinal));
                    let nodes = self.build_result(result);
                    self.path.pop();
                    out.extend(nodes?);
                }
                Value::List(items) => {
                    flush(&mut text, out);
                    self.path.push(PathSegment::Hole(ordinal));
                    let built = self.build_list(items, out);
                    self.path.pop();
                    built?;
                }
                Value::Component(component) => {
                    flush(&mut text, out);
                    self.path.push(PathSegment::Hole(ordinal));
                    let built = self.build_component(component);
                    self.path.pop();
                    out.push(built?);
                }
                other @ (Value::Handler(_) | Value::Ref(_)) => {
                    return Err(RenderError::invalid_template(format!(
                        "{} in a text position",
                        other.kind()
                    )));
                }
            }
        }
        flush(&mut text, out);
        Ok(())
    }

    fn build_attribute(
        &mut self,
        name: &str,
        segments: &[Segment],
        holes: &mut Holes,
    ) -> Result<AttrValue, RenderError> {
        if let [Segment::Hole] = segments {
            let (_, value) = holes.take()?;
            return match (name, value) {
                ("ref", Value::Ref(setter)) => Ok(AttrValue::Ref(setter)),
                ("ref", other) => Err(RenderError::invalid_template(format!(
                    "ref attribute expects a ref setter, got {}",
                    other.kind()
                ))),
                (_, Value::Handler(handler)) => Ok(AttrValue::Handler(handler)),
                (_, Value::Data(data)) => Ok(AttrValue::Text(scalar_text(&data)?)),
                (_, other) => Err(RenderError::invalid_template(format!(
                    "{} cannot be used as the value of attribute {name}",
                    other.kind()
                ))),
            };
        }
        let mut text = String::new();
        for segment in segments {
            match segment {
                Segment::Literal(literal) => text.push_str(literal),
                Segment::Hole => match holes.take()?.1 {
                    Value::Data(data) => text.push_str(&scalar_text(&data)?),
                    other => {
                        return Err(RenderError::invalid_template(format!(
                            "{} interpolated into attribute {name}",
                            other.kind()
                        )))
                    }
                },
            }
        }
        Ok(AttrValue::Text(text))
    }

    fn build_list(
        &mut self,
        items: Vec<Value>,
        out: &mut Vec<NodeDescriptor>,
    ) -> Result<(), RenderError> {
        let len = items.len();
        let mut keys: HashSet<Key> = HashSet::default();
        let mut segments = Vec::with_capacity(len);
        for (index, item) in items.iter().enumerate() {
            match self.entry_key(item)? {
                Some(key) => {
                    if !keys.insert(key.clone()) {
                        return Err(RenderError::DuplicateKey { key });
                    }
                    segments.push(PathSegment::Key(key));
                }
                None if len > 1 => return Err(RenderError::MissingKey { index, len }),
                None => segments.push(PathSegment::Index(index)),
            }
        }
        for (item, segment) in items.into_iter().zip(segments) {
            self.path.push(segment);
            let built = self.build_list_entry(item);
            self.path.pop();
            out.push(built?);
        }
        Ok(())
    }

    /// Key of a list entry, read before any part of the list is built.
    fn entry_key(&mut self, item: &Value) -> Result<Option<Key>, RenderError> {
        match item {
            Value::Markup(result) => match result.key() {
                Some(key) => Ok(Some(key.clone())),
                None => self.root_key_attribute(result),
            },
            Value::Component(component) => Ok(component.key().cloned()),
            Value::Data(data) if data.is_scalar() => Ok(None),
            other => Err(RenderError::invalid_template(format!(
                "{} inside a child list",
                other.kind()
            ))),
        }
    }

    /// Evaluates the `key` attribute of a result's single root element
    /// without consuming its values. Attribute holes of the root come first
    /// in document order.
    fn root_key_attribute(&mut self, result: &RenderResult) -> Result<Option<Key>, RenderError> {
        let template = self.templates.get_or_parse(result.shared_markup())?;
        let [TemplateNode::Element { attributes, .. }] = template.roots.as_slice() else {
            return Ok(None);
        };
        let mut ordinal = 0;
        for attribute in attributes {
            if attribute.name != "key" {
                ordinal += attribute
                    .value
                    .iter()
                    .filter(|segment| matches!(segment, Segment::Hole))
                    .count();
                continue;
            }
            let mut text = String::new();
            for segment in &attribute.value {
                match segment {
                    Segment::Literal(literal) => text.push_str(literal),
                    Segment::Hole => {
                        match result.values().get(ordinal) {
                            Some(Value::Data(data)) => text.push_str(&scalar_text(data)?),
                            _ => {
                                return Err(RenderError::invalid_template(
                                    "key attribute must be a scalar",
                                ))
                            }
                        }
                        ordinal += 1;
                    }
                }
            }
            return Ok(Some(key_from_text(text)));
        }
        Ok(None)
    }

    fn build_list_entry(&mut self, item: Value) -> Result<NodeDescriptor, RenderError> {
        match item {
            Value::Markup(result) => {
                let mut nodes = self.build_result(result)?;
                if nodes.len() != 1 {
                    return Err(RenderError::MultipleRoot { count: nodes.len() });
                }
                Ok(nodes.remove(0))
            }
            Value::Component(component) => self.build_component(component),
            Value::Data(data) => Ok(NodeDescriptor::text(scalar_text(&data)?)),
            other => Err(RenderError::invalid_template(format!(
                "{} inside a child list",
                other.kind()
            ))),
        }
    }

    fn build_component(&mut self, component: ComponentRef) -> Result<NodeDescriptor, RenderError> {
        let mut hasher = KeyHasher::new();
        hasher.write(&self.parent);
        hasher.write(&self.path);
        hasher.write(&component.key());
        let instance = self.resolver.resolve(&component, hasher.finish());
        if !self.seen.insert(instance) {
            return Err(RenderError::invalid_template(format!(
                "component instance {instance} referenced twice in one render"
            )));
        }
        let (key, props) = component.into_parts();
        Ok(NodeDescriptor::Component {
            instance,
            key,
            props,
        })
    }
}

fn key_from_text(text: String) -> Key {
    match text.parse::<i64>() {
        Ok(number) => Key::Int(number),
        Err(_) => Key::from(text),
    }
}

fn scalar_text(data: &Data) -> Result<String, RenderError> {
    data.to_text().ok_or_else(|| {
        RenderError::invalid_template(format!("{} cannot be rendered as text", data.kind()))
    })
}
