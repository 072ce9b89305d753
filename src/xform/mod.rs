//! Transform nodes: mapping model values onto and off the XML stream
//!
//! A transform node renders a [`Value`] through an [`XmlStream`] and parses
//! element-at-a-time events back into a [`Value`]. Nodes are selected by
//! element tag through an [`XformRegistry`].
//!
//! Parsing is driven one event at a time: `parse_open` for every element
//! start while the node is active, `parse_text` for character data, and
//! `parse_close` for every element end. `parse_close` reports whether the
//! node is done ([`CloseSignal::Closed`]) or wants more events
//! ([`CloseSignal::Open`]). Which one a leaf reports on its own end tag is
//! chosen per node with a [`ClosePolicy`]; drivers in this module also pop
//! a node once the element depth falls back to where it was activated, so
//! both conventions parse the same documents.

pub mod driver;
pub mod registry;
pub mod simple;

use crate::stream::XmlStream;
use crate::types::Value;
use indexmap::IndexMap;

pub use driver::{drive, Completed, XmlEventSource};
pub use registry::{Xform, XformRegistry};
pub use simple::{BooleanXform, IntegerXform, StringXform};

/// An element start as reported by the event source.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct ElementDescriptor {
    pub name: String,
    pub attributes: IndexMap<String, String>,
}

impl ElementDescriptor {
    pub fn new(name: impl Into<String>) -> Self {
        ElementDescriptor {
            name: name.into(),
            attributes: IndexMap::new(),
        }
    }

    pub fn with_attribute(mut self, name: impl Into<String>, value: impl Into<String>) -> Self {
        self.attributes.insert(name.into(), value.into());
        self
    }

    pub fn attribute(&self, name: &str) -> Option<&str> {
        self.attributes.get(name).map(String::as_str)
    }
}

/// One element-at-a-time parse event.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ParseEvent {
    Open(ElementDescriptor),
    Text(String),
    Close(String),
}

/// Answer of [`TransformNode::parse_close`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CloseSignal {
    /// The node is finished and should be popped by its driver
    Closed,
    /// The node stays active
    Open,
}

/// What a leaf node reports when its own end tag arrives.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub enum ClosePolicy {
    /// Report [`CloseSignal::Closed`] on the node's own end tag
    ReportClosed,
    /// Always report [`CloseSignal::Open`]; the parent pops the node by depth
    DeferToParent,
}

impl ClosePolicy {
    /// Signal for an end tag, given whether it is the node's own tag
    pub fn signal(self, own_tag: bool) -> CloseSignal {
        match self {
            ClosePolicy::ReportClosed if own_tag => CloseSignal::Closed,
            _ => CloseSignal::Open,
        }
    }
}

/// Render/parse contract shared by all transform variants.
pub trait TransformNode {
    /// Element tag this node handles
    fn tag(&self) -> &str;

    /// Write `model` onto `writer`. Must leave no element half open.
    fn render(&self, writer: &mut XmlStream, model: &Value);

    /// Element start. Returns `true` if the node handled it.
    fn parse_open(&mut self, node: &ElementDescriptor) -> bool;

    /// Character data inside the active element
    fn parse_text(&mut self, text: &str);

    /// Element end
    fn parse_close(&mut self, name: &str) -> CloseSignal;

    /// Most recently parsed value
    fn model(&self) -> &Value;

    /// Take the parsed value, leaving the node empty for reuse
    fn take_model(&mut self) -> Value;
}
