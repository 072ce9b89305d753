//! Feeding parse events into transform nodes

use super::{CloseSignal, ElementDescriptor, ParseEvent, TransformNode};
use crate::error::{Result, XmlError};
use crate::escape;
use quick_xml::events::{BytesStart, Event};
use quick_xml::Reader;

/// Why [`drive`] stopped.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Completed {
    /// The node reported [`CloseSignal::Closed`]
    ByNode,
    /// The node's element ended while the node still reported open
    ByDepth,
    /// The events ran out first
    EndOfInput,
}

/// Feed `events` to `node` until its element is finished.
///
/// The first event is expected to open the node's own element. Events after
/// the one that finishes the node are left in the iterator, so passing
/// `&mut iter` lets a parent continue with its next child.
pub fn drive<N, I>(node: &mut N, events: I) -> Result<Completed>
where
    N: TransformNode + ?Sized,
    I: IntoIterator<Item = Result<ParseEvent>>,
{
    let mut depth = 0usize;
    for event in events {
        match event? {
            ParseEvent::Open(element) => {
                depth += 1;
                let handled = node.parse_open(&element);
                if depth == 1 && !handled {
                    return Err(XmlError::Parse(format!(
                        "<{}> is not handled by the <{}> node",
                        element.name,
                        node.tag()
                    )));
                }
            }
            ParseEvent::Text(text) => node.parse_text(&text),
            ParseEvent::Close(name) => {
                if depth == 0 {
                    return Err(XmlError::Parse(format!(
                        "unbalanced </{}> before <{}>",
                        name,
                        node.tag()
                    )));
                }
                let signal = node.parse_close(&name);
                depth -= 1;
                if signal == CloseSignal::Closed {
                    tracing::trace!(tag = node.tag(), depth, "node closed itself");
                    return Ok(Completed::ByNode);
                }
                if depth == 0 {
                    tracing::trace!(tag = node.tag(), "node popped at its end tag");
                    return Ok(Completed::ByDepth);
                }
            }
        }
    }
    Ok(Completed::EndOfInput)
}

/// [`ParseEvent`]s read from a document with quick-xml.
///
/// Self-closing elements produce an open followed by a close. Text and
/// attribute values are decoded with [`escape::decode`]; CDATA is passed
/// through raw. Declarations, comments and processing instructions are
/// skipped. After the first error the source is exhausted.
pub struct XmlEventSource<'a> {
    reader: Reader<&'a [u8]>,
    pending_close: Option<String>,
    done: bool,
}

impl<'a> XmlEventSource<'a> {
    pub fn new(xml: &'a str) -> Self {
        let mut reader = Reader::from_str(xml);
        reader.config_mut().trim_text(false);
        XmlEventSource {
            reader,
            pending_close: None,
            done: false,
        }
    }

    fn next_event(&mut self) -> Result<Option<ParseEvent>> {
        loop {
            let event = match self.reader.read_event()? {
                Event::Start(e) => ParseEvent::Open(element(&e)?),
                Event::Empty(e) => {
                    let element = element(&e)?;
                    self.pending_close = Some(element.name.clone());
                    ParseEvent::Open(element)
                }
                Event::End(e) => {
                    ParseEvent::Close(std::str::from_utf8(e.name().as_ref())?.to_string())
                }
                Event::Text(e) => {
                    let raw = std::str::from_utf8(&e)?;
                    if raw.is_empty() {
                        continue;
                    }
                    ParseEvent::Text(escape::decode(raw).into_owned())
                }
                Event::CData(e) => ParseEvent::Text(std::str::from_utf8(&e)?.to_string()),
                Event::Eof => return Ok(None),
                Event::Decl(_) | Event::PI(_) | Event::Comment(_) | Event::DocType(_) => continue,
            };
            return Ok(Some(event));
        }
    }
}

impl Iterator for XmlEventSource<'_> {
    type Item = Result<ParseEvent>;

    fn next(&mut self) -> Option<Self::Item> {
        if let Some(name) = self.pending_close.take() {
            return Some(Ok(ParseEvent::Close(name)));
        }
        if self.done {
            return None;
        }
        match self.next_event() {
            Ok(Some(event)) => Some(Ok(event)),
            Ok(None) => {
                self.done = true;
                None
            }
            Err(e) => {
                self.done = true;
                Some(Err(e))
            }
        }
    }
}

fn element(start: &BytesStart<'_>) -> Result<ElementDescriptor> {
    let mut node = ElementDescriptor::new(std::str::from_utf8(start.name().as_ref())?);
    for attr in start.attributes() {
        let attr = attr?;
        let key = std::str::from_utf8(attr.key.as_ref())?;
        let value = escape::decode(std::str::from_utf8(&attr.value)?).into_owned();
        node.attributes.insert(key.to_string(), value);
    }
    Ok(node)
}
