//! Render results and the markup parser behind them.
//!
//! A component returns a [`RenderResult`]: markup text in which every dynamic
//! position is marked with [`PLACEHOLDER`], plus the values for those
//! positions in document order. The [`markup!`](crate::markup) macro builds
//! one from a format-like literal.

use std::fmt;
use std::rc::Rc;

use crate::component::ComponentRef;
use crate::data::{Data, Record};
use crate::descriptor::Key;
use crate::error::RenderError;
use crate::hash::hash_one;
use crate::hash::map::HashMap;
use crate::host::{EventHandler, RefSetter};

/// Marker standing in for one dynamic value inside markup.
pub const PLACEHOLDER: char = '\u{FFFC}';

const VOID_ELEMENTS: &[&str] = &["br", "hr", "img", "input", "link", "meta"];

/// One render output: markup with placeholders and the values filling them.
#[derive(Clone)]
pub struct RenderResult {
    markup: Rc<str>,
    values: Vec<Value>,
    key: Option<Key>,
}

impl RenderResult {
    pub fn new(markup: impl Into<Rc<str>>, values: Vec<Value>) -> Self {
        Self {
            markup: markup.into(),
            values,
            key: None,
        }
    }

    /// Builds a result from a literal where `{}` marks a value position and
    /// `{{` / `}}` are literal braces.
    pub fn from_format(template: &str, values: Vec<Value>) -> Self {
        let mut markup = String::with_capacity(template.len());
        let mut chars = template.chars().peekable();
        while let Some(ch) = chars.next() {
            match (ch, chars.peek()) {
                ('{', Some('}')) => {
                    chars.next();
                    markup.push(PLACEHOLDER);
                }
                ('{', Some('{')) | ('}', Some('}')) => {
                    chars.next();
                    markup.push(ch);
                }
                _ => markup.push(ch),
            }
        }
        Self::new(markup, values)
    }

    /// Attaches an explicit key to the root of this result.
    pub fn keyed(mut self, key: impl Into<Key>) -> Self {
        self.key = Some(key.into());
        self
    }

    pub fn markup(&self) -> &str {
        &self.markup
    }

    pub(crate) fn shared_markup(&self) -> &Rc<str> {
        &self.markup
    }

    pub fn values(&self) -> &[Value] {
        &self.values
    }

    pub fn key(&self) -> Option<&Key> {
        self.key.as_ref()
    }

    pub(crate) fn into_parts(self) -> (Rc<str>, Vec<Value>, Option<Key>) {
        (self.markup, self.values, self.key)
    }
}

impl fmt::Debug for RenderResult {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("RenderResult")
            .field("markup", &self.markup)
            .field("values", &self.values.len())
            .field("key", &self.key)
            .finish()
    }
}

/// Payload for one placeholder.
#[derive(Clone)]
pub enum Value {
    Data(Data),
    Handler(EventHandler),
    Ref(RefSetter),
    Markup(RenderResult),
    List(Vec<Value>),
    Component(ComponentRef),
}

impl Value {
    /// A handler value from a closure.
    pub fn handler(handler: impl Fn(&crate::HostEvent) + 'static) -> Self {
        Value::Handler(EventHandler::new(handler))
    }

    pub(crate) fn kind(&self) -> &'static str {
        match self {
            Value::Data(data) => data.kind(),
            Value::Handler(_) => "event handler",
            Value::Ref(_) => "ref setter",
            Value::Markup(_) => "markup",
            Value::List(_) => "list",
            Value::Component(_) => "component",
        }
    }
}

impl fmt::Debug for Value {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Value::Data(data) => f.debug_tuple("Data").field(data).finish(),
            Value::Handler(handler) => fmt::Debug::fmt(handler, f),
            Value::Ref(setter) => fmt::Debug::fmt(setter, f),
            Value::Markup(result) => fmt::Debug::fmt(result, f),
            Value::List(items) => f.debug_list().entries(items).finish(),
            Value::Component(component) => fmt::Debug::fmt(component, f),
        }
    }
}

macro_rules! value_from_data {
    ($($ty:ty),*) => {
        $(
            impl From<$ty> for Value {
                fn from(value: $ty) -> Self {
                    Value::Data(Data::from(value))
                }
            }
        )*
    };
}

value_from_data!(bool, i8, i16, i32, i64, u8, u16, u32, u64, usize, f32, f64, &str, String, Record);

impl From<Data> for Value {
    fn from(value: Data) -> Self {
        Value::Data(value)
    }
}

impl From<EventHandler> for Value {
    fn from(value: EventHandler) -> Self {
        Value::Handler(value)
    }
}

impl From<RefSetter> for Value {
    fn from(value: RefSetter) -> Self {
        Value::Ref(value)
    }
}

impl From<RenderResult> for Value {
    fn from(value: RenderResult) -> Self {
        Value::Markup(value)
    }
}

impl From<ComponentRef> for Value {
    fn from(value: ComponentRef) -> Self {
        Value::Component(value)
    }
}

impl From<Vec<Value>> for Value {
    fn from(value: Vec<Value>) -> Self {
        Value::List(value)
    }
}

impl From<Vec<RenderResult>> for Value {
    fn from(value: Vec<RenderResult>) -> Self {
        Value::List(value.into_iter().map(Value::Markup).collect())
    }
}

impl From<Vec<ComponentRef>> for Value {
    fn from(value: Vec<ComponentRef>) -> Self {
        Value::List(value.into_iter().map(Value::Component).collect())
    }
}

/// `None` renders nothing; `Some` renders its content.
impl From<Option<RenderResult>> for Value {
    fn from(value: Option<RenderResult>) -> Self {
        Value::List(value.into_iter().map(Value::Markup).collect())
    }
}

impl From<Option<ComponentRef>> for Value {
    fn from(value: Option<ComponentRef>) -> Self {
        Value::List(value.into_iter().map(Value::Component).collect())
    }
}

/// Builds a [`RenderResult`] from a markup literal with `{}` placeholders.
///
/// ```
/// use trellis_core::markup;
///
/// let result = markup!("<p class={}>{} items</p>", "count", 3);
/// assert_eq!(result.values().len(), 2);
/// ```
#[macro_export]
macro_rules! markup {
    ($template:literal $(, $value:expr)* $(,)?) => {
        $crate::RenderResult::from_format(
            $template,
            vec![$($crate::Value::from($value)),*],
        )
    };
}

#[derive(Debug, Clone, PartialEq)]
pub(crate) enum Segment {
    Literal(String),
    Hole,
}

#[derive(Debug, Clone, PartialEq)]
pub(crate) struct TemplateAttr {
    pub(crate) name: String,
    pub(crate) value: Vec<Segment>,
}

#[derive(Debug, Clone, PartialEq)]
pub(crate) enum TemplateNode {
    Text(Vec<Segment>),
    Element {
        tag: String,
        attributes: Vec<TemplateAttr>,
        children: Vec<TemplateNode>,
    },
}

/// Parsed form of one markup string; shared by every render that uses it.
#[derive(Debug)]
pub(crate) struct Template {
    pub(crate) roots: Vec<TemplateNode>,
    pub(crate) holes: usize,
}

/// Parsed templates keyed by markup text.
#[derive(Default)]
pub(crate) struct TemplateCache {
    entries: HashMap<u64, Vec<(Rc<str>, Rc<Template>)>>,
}

impl TemplateCache {
    pub(crate) fn get_or_parse(&mut self, markup: &Rc<str>) -> Result<Rc<Template>, RenderError> {
        let hash = hash_one(&**markup);
        if let Some(bucket) = self.entries.get(&hash) {
            if let Some((_, template)) = bucket.iter().find(|(text, _)| text == markup) {
                return Ok(Rc::clone(template));
            }
        }
        let template = Rc::new(parse(markup)?);
        tracing::trace!(holes = template.holes, "parsed template");
        self.entries
            .entry(hash)
            .or_default()
            .push((Rc::clone(markup), Rc::clone(&template)));
        Ok(template)
    }

    pub(crate) fn len(&self) -> usize {
        self.entries.values().map(Vec::len).sum()
    }
}

pub(crate) fn parse(markup: &str) -> Result<Template, RenderError> {
    let mut parser = Parser {
        chars: markup.chars().collect(),
        pos: 0,
        holes: 0,
    };
    let roots = parser.parse_nodes(None)?;
    Ok(Template {
        roots,
        holes: parser.holes,
    })
}

struct Parser {
    chars: Vec<char>,
    pos: usize,
    holes: usize,
}

impl Parser {
    fn peek(&self) -> Option<char> {
        self.chars.get(self.pos).copied()
    }

    fn starts_with(&self, pattern: &str) -> bool {
        let mut index = self.pos;
        for expected in pattern.chars() {
            if self.chars.get(index) != Some(&expected) {
                return false;
            }
            index += 1;
        }
        true
    }

    fn skip_whitespace(&mut self) {
        while self.peek().is_some_and(char::is_whitespace) {
            self.pos += 1;
        }
    }

    fn parse_nodes(&mut self, open_tag: Option<&str>) -> Result<Vec<TemplateNode>, RenderError> {
        let mut nodes = Vec::new();
        loop {
            if self.peek().is_none() {
                return match open_tag {
                    Some(tag) => Err(RenderError::invalid_template(format!("unclosed <{tag}>"))),
                    None => Ok(nodes),
                };
            }
            if self.starts_with("</") {
                self.pos += 2;
                let name = self.read_name();
                self.skip_whitespace();
                if self.peek() != Some('>') {
                    return Err(RenderError::invalid_template(format!(
                        "malformed closing tag </{name}"
                    )));
                }
                self.pos += 1;
                return match open_tag {
                    Some(tag) if tag == name => Ok(nodes),
                    Some(tag) => Err(RenderError::invalid_template(format!(
                        "</{name}> closes <{tag}>"
                    ))),
                    None => Err(RenderError::invalid_template(format!(
                        "</{name}> without matching open tag"
                    ))),
                };
            }
            if self.starts_with("<!--") {
                self.skip_comment()?;
                continue;
            }
            if self.peek() == Some('<') {
                nodes.push(self.parse_element()?);
                continue;
            }
            if let Some(text) = self.parse_text() {
                nodes.push(text);
            }
        }
    }

    fn skip_comment(&mut self) -> Result<(), RenderError> {
        self.pos += 4;
        while self.peek().is_some() {
            if self.starts_with("-->") {
                self.pos += 3;
                return Ok(());
            }
            self.pos += 1;
        }
        Err(RenderError::invalid_template("unterminated comment"))
    }

    fn read_name(&mut self) -> String {
        let start = self.pos;
        while self
            .peek()
            .is_some_and(|ch| ch.is_alphanumeric() || matches!(ch, '-' | '_' | ':' | '.'))
        {
            self.pos += 1;
        }
        self.chars[start..self.pos].iter().collect()
    }

    fn parse_text(&mut self) -> Option<TemplateNode> {
        let mut segments = Vec::new();
        let mut literal = String::new();
        while let Some(ch) = self.peek() {
            if ch == '<' {
                break;
            }
            self.pos += 1;
            if ch == PLACEHOLDER {
                if !literal.is_empty() {
                    segments.push(Segment::Literal(std::mem::take(&mut literal)));
                }
                segments.push(Segment::Hole);
                self.holes += 1;
            } else {
                literal.push(ch);
            }
        }
        if !literal.is_empty() {
            segments.push(Segment::Literal(literal));
        }
        let formatting_only = segments.iter().all(|segment| match segment {
            Segment::Literal(text) => text.trim().is_empty() && text.contains('\n'),
            Segment::Hole => false,
        });
        let empty = segments
            .iter()
            .all(|segment| matches!(segment, Segment::Literal(text) if text.is_empty()));
        if segments.is_empty() || formatting_only || empty {
            None
        } else {
            Some(TemplateNode::Text(segments))
        }
    }

    fn parse_element(&mut self) -> Result<TemplateNode, RenderError> {
        self.pos += 1;
        let tag = self.read_name();
        if tag.is_empty() {
            return Err(RenderError::invalid_template(format!(
                "stray '<' at offset {}",
                self.pos - 1
            )));
        }
        let mut attributes = Vec::new();
        loop {
            self.skip_whitespace();
            match self.peek() {
                None => {
                    return Err(RenderError::invalid_template(format!("unclosed <{tag}")));
                }
                Some('/') if self.starts_with("/>") => {
                    self.pos += 2;
                    return Ok(TemplateNode::Element {
                        tag,
                        attributes,
                        children: Vec::new(),
                    });
                }
                Some('>') => {
                    self.pos += 1;
                    let children = if VOID_ELEMENTS.contains(&tag.as_str()) {
                        Vec::new()
                    } else {
                        self.parse_nodes(Some(&tag))?
                    };
                    return Ok(TemplateNode::Element {
                        tag,
                        attributes,
                        children,
                    });
                }
                Some(_) => attributes.push(self.parse_attribute(&tag)?),
            }
        }
    }

    fn parse_attribute(&mut self, tag: &str) -> Result<TemplateAttr, RenderError> {
        let name = self.read_name();
        if name.is_empty() {
            return Err(RenderError::invalid_template(format!(
                "unexpected {:?} in <{tag}>",
                self.peek().unwrap_or_default()
            )));
        }
        self.skip_whitespace();
        if self.peek() != Some('=') {
            return Ok(TemplateAttr {
                name,
                value: vec![Segment::Literal(String::new())],
            });
        }
        self.pos += 1;
        self.skip_whitespace();
        let value = match self.peek() {
            Some(quote @ ('"' | '\'')) => {
                self.pos += 1;
                let mut segments = Vec::new();
                let mut literal = String::new();
                loop {
                    match self.peek() {
                        None => {
                            return Err(RenderError::invalid_template(format!(
                                "unterminated value for attribute {name}"
                            )));
                        }
                        Some(ch) if ch == quote => {
                            self.pos += 1;
                            break;
                        }
                        Some(PLACEHOLDER) => {
                            self.pos += 1;
                            if !literal.is_empty() {
                                segments.push(Segment::Literal(std::mem::take(&mut literal)));
                            }
                            segments.push(Segment::Hole);
                            self.holes += 1;
                        }
                        Some(ch) => {
                            self.pos += 1;
                            literal.push(ch);
                        }
                    }
                }
                if !literal.is_empty() || segments.is_empty() {
                    segments.push(Segment::Literal(literal));
                }
                segments
            }
            Some(PLACEHOLDER) => {
                self.pos += 1;
                self.holes += 1;
                vec![Segment::Hole]
            }
            Some(_) => {
                let start = self.pos;
                while self
                    .peek()
                    .is_some_and(|ch| !ch.is_whitespace() && ch != '>' && !self.starts_with("/>"))
                {
                    self.pos += 1;
                }
                vec![Segment::Literal(self.chars[start..self.pos].iter().collect())]
            }
            None => {
                return Err(RenderError::invalid_template(format!(
                    "missing value for attribute {name}"
                )));
            }
        };
        Ok(TemplateAttr { name, value })
    }
}
