//! Tag-dispatched transform nodes

use super::driver::{drive, Completed};
use super::simple::{BooleanXform, IntegerXform, StringXform};
use super::{CloseSignal, ElementDescriptor, ParseEvent, TransformNode};
use crate::error::{Result, XmlError};
use crate::stream::XmlStream;
use crate::types::{Attributes, Value};
use indexmap::IndexMap;

/// The closed set of transform variants.
#[derive(Debug, Clone, PartialEq)]
pub enum Xform {
    Boolean(BooleanXform),
    String(StringXform),
    Integer(IntegerXform),
}

impl Xform {
    fn as_node(&self) -> &dyn TransformNode {
        match self {
            Xform::Boolean(x) => x,
            Xform::String(x) => x,
            Xform::Integer(x) => x,
        }
    }

    fn as_node_mut(&mut self) -> &mut dyn TransformNode {
        match self {
            Xform::Boolean(x) => x,
            Xform::String(x) => x,
            Xform::Integer(x) => x,
        }
    }
}

impl From<BooleanXform> for Xform {
    fn from(x: BooleanXform) -> Self {
        Xform::Boolean(x)
    }
}

impl From<StringXform> for Xform {
    fn from(x: StringXform) -> Self {
        Xform::String(x)
    }
}

impl From<IntegerXform> for Xform {
    fn from(x: IntegerXform) -> Self {
        Xform::Integer(x)
    }
}

impl TransformNode for Xform {
    fn tag(&self) -> &str {
        self.as_node().tag()
    }

    fn render(&self, writer: &mut XmlStream, model: &Value) {
        self.as_node().render(writer, model)
    }

    fn parse_open(&mut self, node: &ElementDescriptor) -> bool {
        self.as_node_mut().parse_open(node)
    }

    fn parse_text(&mut self, text: &str) {
        self.as_node_mut().parse_text(text)
    }

    fn parse_close(&mut self, name: &str) -> CloseSignal {
        self.as_node_mut().parse_close(name)
    }

    fn model(&self) -> &Value {
        self.as_node().model()
    }

    fn take_model(&mut self) -> Value {
        self.as_node_mut().take_model()
    }
}

/// Prototype transform nodes keyed by element tag.
///
/// Registration order is the order children are rendered in.
#[derive(Debug, Clone, Default)]
pub struct XformRegistry {
    entries: IndexMap<String, Xform>,
}

impl XformRegistry {
    /// Empty registry
    pub fn new() -> Self {
        Self::default()
    }

    /// Register a node under its own tag, replacing any previous one.
    pub fn register(&mut self, xform: impl Into<Xform>) {
        let xform = xform.into();
        self.entries.insert(xform.tag().to_string(), xform);
    }

    /// Builder form of [`register`](Self::register)
    pub fn with(mut self, xform: impl Into<Xform>) -> Self {
        self.register(xform);
        self
    }

    /// Prototype registered for `tag`
    pub fn get(&self, tag: &str) -> Option<&Xform> {
        self.entries.get(tag)
    }

    /// Number of registered tags
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Registered tags in registration order
    pub fn tags(&self) -> impl Iterator<Item = &str> {
        self.entries.keys().map(String::as_str)
    }

    /// A fresh node for `tag`, with no parsed state.
    pub fn create(&self, tag: &str) -> Option<Xform> {
        let mut node = self.entries.get(tag)?.clone();
        node.take_model();
        Some(node)
    }

    /// Render `model` with the node registered for `tag`.
    pub fn render(&self, writer: &mut XmlStream, tag: &str, model: &Value) -> Result<()> {
        let node = self
            .entries
            .get(tag)
            .ok_or_else(|| XmlError::InvalidState(format!("no transform registered for <{tag}>")))?;
        node.render(writer, model);
        Ok(())
    }

    /// Render `container` with one child per registered tag present in
    /// `children`. The container is always written, even if empty.
    pub fn render_children(
        &self,
        writer: &mut XmlStream,
        container: &str,
        attributes: Option<&Attributes>,
        children: &IndexMap<String, Value>,
    ) {
        writer.open_node(container, attributes);
        for (tag, node) in &self.entries {
            if let Some(model) = children.get(tag) {
                node.render(writer, model);
            }
        }
        for tag in children.keys().filter(|t| !self.entries.contains_key(*t)) {
            tracing::debug!(container, tag = tag.as_str(), "no transform for child, skipped");
        }
        writer.close_node();
    }

    /// Parse one container element, returning the non-empty values of its
    /// registered children keyed by tag.
    ///
    /// Unregistered child elements and text directly inside the container
    /// are skipped.
    pub fn parse_children<I>(&self, events: I) -> Result<IndexMap<String, Value>>
    where
        I: IntoIterator<Item = Result<ParseEvent>>,
    {
        let mut events = events.into_iter();
        let mut container: Option<String> = None;
        let mut values = IndexMap::new();

        while let Some(event) = events.next() {
            match event? {
                ParseEvent::Open(element) if container.is_none() => {
                    container = Some(element.name);
                }
                ParseEvent::Open(element) => match self.create(&element.name) {
                    Some(mut node) => {
                        let tag = element.name.clone();
                        let first = std::iter::once(Ok(ParseEvent::Open(element)));
                        if drive(&mut node, first.chain(&mut events))? == Completed::EndOfInput {
                            return Err(truncated(container.as_deref()));
                        }
                        let value = node.take_model();
                        if !value.is_empty() {
                            values.insert(tag, value);
                        }
                    }
                    None => {
                        tracing::debug!(tag = element.name.as_str(), "unregistered child skipped");
                        skip_element(&mut events, container.as_deref())?;
                    }
                },
                ParseEvent::Text(_) => {}
                ParseEvent::Close(name) => {
                    return match container {
                        Some(open) if open == name => Ok(values),
                        Some(open) => Err(XmlError::Parse(format!(
                            "</{name}> does not close <{open}>"
                        ))),
                        None => Err(XmlError::Parse(format!("unbalanced </{name}>"))),
                    };
                }
            }
        }

        match container {
            Some(name) => Err(truncated(Some(&name))),
            None => Ok(values),
        }
    }
}

/// Consume events up to the end of an element whose start was already read.
fn skip_element<I>(events: &mut I, container: Option<&str>) -> Result<()>
where
    I: Iterator<Item = Result<ParseEvent>>,
{
    let mut depth = 1usize;
    for event in events {
        match event? {
            ParseEvent::Open(_) => depth += 1,
            ParseEvent::Close(_) => {
                depth -= 1;
                if depth == 0 {
                    return Ok(());
                }
            }
            ParseEvent::Text(_) => {}
        }
    }
    Err(truncated(container))
}

fn truncated(container: Option<&str>) -> XmlError {
    XmlError::Parse(format!(
        "input ended inside <{}>",
        container.unwrap_or_default()
    ))
}
