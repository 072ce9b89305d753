//! Single-value leaf transforms
//!
//! Each handles one childless element whose value is either its presence,
//! one bound attribute, or its text content.

use super::{CloseSignal, ClosePolicy, ElementDescriptor, TransformNode};
use crate::stream::XmlStream;
use crate::types::{Attributes, Value};

/// Flag element: present means `true`, e.g. `<b/>` for bold.
///
/// With a bound attribute the flag is carried as `attr="1"`/`attr="0"`,
/// and a missing attribute parses as `true`.
#[derive(Debug, Clone, PartialEq)]
pub struct BooleanXform {
    tag: String,
    attr: Option<String>,
    close_policy: ClosePolicy,
    model: Value,
}

impl BooleanXform {
    /// Reports [`CloseSignal::Open`] on close unless configured otherwise
    pub fn new(tag: impl Into<String>) -> Self {
        BooleanXform {
            tag: tag.into(),
            attr: None,
            close_policy: ClosePolicy::DeferToParent,
            model: Value::Empty,
        }
    }

    pub fn with_attr(mut self, attr: impl Into<String>) -> Self {
        self.attr = Some(attr.into());
        self
    }

    pub fn with_close_policy(mut self, policy: ClosePolicy) -> Self {
        self.close_policy = policy;
        self
    }

    pub fn attr(&self) -> Option<&str> {
        self.attr.as_deref()
    }
}

impl TransformNode for BooleanXform {
    fn tag(&self) -> &str {
        &self.tag
    }

    fn render(&self, writer: &mut XmlStream, model: &Value) {
        if !model.is_truthy() {
            return;
        }
        match &self.attr {
            Some(attr) => {
                let attributes = Attributes::new().with(attr.as_str(), 1);
                writer.leaf_node(&self.tag, Some(&attributes), None);
            }
            None => writer.leaf_node(&self.tag, None, None),
        }
    }

    fn parse_open(&mut self, node: &ElementDescriptor) -> bool {
        if node.name != self.tag {
            return false;
        }
        let flag = self
            .attr
            .as_deref()
            .and_then(|attr| node.attribute(attr))
            .map_or(true, |v| !matches!(v.trim(), "0" | "false"));
        self.model = Value::Bool(flag);
        true
    }

    fn parse_text(&mut self, _text: &str) {}

    fn parse_close(&mut self, name: &str) -> CloseSignal {
        self.close_policy.signal(name == self.tag)
    }

    fn model(&self) -> &Value {
        &self.model
    }

    fn take_model(&mut self) -> Value {
        std::mem::take(&mut self.model)
    }
}

/// Text collected while a leaf's own element is open.
#[derive(Debug, Clone, Default, PartialEq)]
struct Capture {
    active: bool,
    text: String,
}

impl Capture {
    fn start(&mut self) {
        self.active = true;
        self.text.clear();
    }

    fn push(&mut self, text: &str) {
        if self.active {
            self.text.push_str(text);
        }
    }

    fn finish(&mut self) -> Option<String> {
        if !self.active {
            return None;
        }
        self.active = false;
        Some(std::mem::take(&mut self.text))
    }
}

/// String leaf: `<name val="Calibri"/>` with a bound attribute, or
/// `<t>text</t>` without one.
#[derive(Debug, Clone, PartialEq)]
pub struct StringXform {
    tag: String,
    attr: Option<String>,
    close_policy: ClosePolicy,
    capture: Capture,
    model: Value,
}

impl StringXform {
    pub fn new(tag: impl Into<String>) -> Self {
        StringXform {
            tag: tag.into(),
            attr: None,
            close_policy: ClosePolicy::ReportClosed,
            capture: Capture::default(),
            model: Value::Empty,
        }
    }

    pub fn with_attr(mut self, attr: impl Into<String>) -> Self {
        self.attr = Some(attr.into());
        self
    }

    pub fn with_close_policy(mut self, policy: ClosePolicy) -> Self {
        self.close_policy = policy;
        self
    }
}

impl TransformNode for StringXform {
    fn tag(&self) -> &str {
        &self.tag
    }

    fn render(&self, writer: &mut XmlStream, model: &Value) {
        if model.is_empty() {
            return;
        }
        render_single_value(writer, &self.tag, self.attr.as_deref(), model);
    }

    fn parse_open(&mut self, node: &ElementDescriptor) -> bool {
        if node.name != self.tag {
            return false;
        }
        match &self.attr {
            Some(attr) => {
                self.model = node.attribute(attr).map(Value::from).unwrap_or_default();
            }
            None => self.capture.start(),
        }
        true
    }

    fn parse_text(&mut self, text: &str) {
        self.capture.push(text);
    }

    fn parse_close(&mut self, name: &str) -> CloseSignal {
        let own_tag = name == self.tag;
        if own_tag {
            if let Some(text) = self.capture.finish() {
                self.model = Value::String(text);
            }
        }
        self.close_policy.signal(own_tag)
    }

    fn model(&self) -> &Value {
        &self.model
    }

    fn take_model(&mut self) -> Value {
        std::mem::take(&mut self.model)
    }
}

/// Integer leaf: `<sz val="11"/>` with a bound attribute, or `<v>42</v>`.
///
/// Unparsable content yields [`Value::Empty`]. Zero is rendered; values
/// with no exact integer form (fractional or non-finite floats) are not.
#[derive(Debug, Clone, PartialEq)]
pub struct IntegerXform {
    tag: String,
    attr: Option<String>,
    close_policy: ClosePolicy,
    capture: Capture,
    model: Value,
}

impl IntegerXform {
    pub fn new(tag: impl Into<String>) -> Self {
        IntegerXform {
            tag: tag.into(),
            attr: None,
            close_policy: ClosePolicy::ReportClosed,
            capture: Capture::default(),
            model: Value::Empty,
        }
    }

    pub fn with_attr(mut self, attr: impl Into<String>) -> Self {
        self.attr = Some(attr.into());
        self
    }

    pub fn with_close_policy(mut self, policy: ClosePolicy) -> Self {
        self.close_policy = policy;
        self
    }

    fn parse_int(text: &str) -> Value {
        text.trim()
            .parse::<i64>()
            .map(Value::Int)
            .unwrap_or(Value::Empty)
    }
}

impl TransformNode for IntegerXform {
    fn tag(&self) -> &str {
        &self.tag
    }

    fn render(&self, writer: &mut XmlStream, model: &Value) {
        if let Some(n) = model.as_i64() {
            render_single_value(writer, &self.tag, self.attr.as_deref(), &Value::Int(n));
        }
    }

    fn parse_open(&mut self, node: &ElementDescriptor) -> bool {
        if node.name != self.tag {
            return false;
        }
        match &self.attr {
            Some(attr) => {
                self.model = node.attribute(attr).map_or(Value::Empty, Self::parse_int);
            }
            None => self.capture.start(),
        }
        true
    }

    fn parse_text(&mut self, text: &str) {
        self.capture.push(text);
    }

    fn parse_close(&mut self, name: &str) -> CloseSignal {
        let own_tag = name == self.tag;
        if own_tag {
            if let Some(text) = self.capture.finish() {
                self.model = Self::parse_int(&text);
            }
        }
        self.close_policy.signal(own_tag)
    }

    fn model(&self) -> &Value {
        &self.model
    }

    fn take_model(&mut self) -> Value {
        std::mem::take(&mut self.model)
    }
}

fn render_single_value(writer: &mut XmlStream, tag: &str, attr: Option<&str>, value: &Value) {
    match attr {
        Some(attr) => {
            let attributes = Attributes::new().with(attr, value.clone());
            writer.leaf_node(tag, Some(&attributes), None);
        }
        None => writer.leaf_node(tag, None, Some(&value.as_string())),
    }
}
