//! Streaming XML writer with nested rollback scopes

use super::chunk::{ChunkedBuffer, Fragment};
use super::config::StreamConfig;
use crate::encoder::{self, ChunkEncoder, Completion};
use crate::error::{Result, XmlError};
use crate::escape;
use crate::types::{Attributes, Value};
use std::borrow::Cow;
use std::fmt::Write as _;

const OPEN_ANGLE: &str = "<";
const CLOSE_ANGLE: &str = ">";
const OPEN_ANGLE_SLASH: &str = "</";
const CLOSE_SLASH_ANGLE: &str = "/>";

/// Start-tag bookkeeping for the innermost open element.
///
/// | operation            | `open`  | `leaf`  |
/// |----------------------|---------|---------|
/// | `open_node`          | `true`  | `true`  |
/// | text / raw / xml     | `false` | `false` |
/// | `close_node`         | `false` | `false` |
/// | `rollback`           | restored from the mark |
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct WriterState {
    /// The start tag of the innermost element still lacks its `>`
    pub open: bool,
    /// Nothing has been written inside the innermost element yet
    pub leaf: bool,
}

impl WriterState {
    fn opened(&mut self) {
        self.open = true;
        self.leaf = true;
    }

    /// Content is about to be written. Returns whether the start tag needs
    /// terminating first.
    fn content(&mut self) -> bool {
        let terminate = self.open;
        self.open = false;
        self.leaf = false;
        terminate
    }

    fn closed(&mut self) {
        self.open = false;
        self.leaf = false;
    }
}

/// Snapshot taken by [`XmlStream::add_rollback`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RollbackMark {
    /// Total fragment count at mark time
    pub cursor: usize,
    /// Absolute index of the chunk current at mark time
    pub chunk: usize,
    /// Fill cursor of that chunk
    pub fill: usize,
    /// Writer flags at mark time
    pub state: WriterState,
    stack: Vec<String>,
}

impl RollbackMark {
    /// Element stack depth at mark time
    pub fn depth(&self) -> usize {
        self.stack.len()
    }
}

/// Incremental XML writer backed by a [`ChunkedBuffer`].
///
/// Element nesting is valid by construction: opening a child terminates the
/// parent's start tag, and finalizing closes whatever is still open.
///
/// # Examples
///
/// ```
/// use xmlstream::XmlStream;
///
/// let mut xml = XmlStream::new();
/// xml.open_node("a", None);
/// xml.add_attribute("x", 1)?;
/// xml.open_node("b", None);
/// xml.write_text("hi");
/// xml.close_node();
/// xml.close_node();
/// assert_eq!(xml.into_xml()?, r#"<a x="1"><b>hi</b></a>"#);
/// # Ok::<(), xmlstream::XmlError>(())
/// ```
pub struct XmlStream {
    buffer: ChunkedBuffer,
    stack: Vec<String>,
    state: WriterState,
    rollbacks: Vec<RollbackMark>,
    encoder: Option<Box<dyn ChunkEncoder>>,
    failure: Option<XmlError>,
}

impl XmlStream {
    /// Detached writer with the default chunk size
    pub fn new() -> Self {
        Self::detached(super::DEFAULT_CHUNK_SIZE)
    }

    /// Detached writer with a custom chunk size
    pub fn detached(chunk_size: usize) -> Self {
        XmlStream {
            buffer: ChunkedBuffer::new(chunk_size),
            stack: Vec::new(),
            state: WriterState::default(),
            rollbacks: Vec::new(),
            encoder: None,
            failure: None,
        }
    }

    /// Writer configured by `config`, spawning its encoder if one is selected
    pub fn with_config(config: &StreamConfig) -> Result<Self> {
        let mut stream = Self::detached(config.chunk_size);
        stream.encoder = encoder::from_config(config)?;
        Ok(stream)
    }

    /// Writer that flushes completed chunks to a caller-supplied encoder
    pub fn with_encoder(chunk_size: usize, encoder: Box<dyn ChunkEncoder>) -> Self {
        let mut stream = Self::detached(chunk_size);
        stream.encoder = Some(encoder);
        stream
    }

    /// `version="1.0" encoding="UTF-8" standalone="yes"`
    pub fn std_doc_attributes() -> Attributes {
        Attributes::new()
            .with("version", "1.0")
            .with("encoding", "UTF-8")
            .with("standalone", "yes")
    }

    /// Fragment count so far; handy to tell whether anything was written
    pub fn cursor(&self) -> usize {
        self.buffer.total_count()
    }

    /// Name of the innermost open element
    pub fn tos(&self) -> Option<&str> {
        self.stack.last().map(String::as_str)
    }

    /// Number of open elements
    pub fn depth(&self) -> usize {
        self.stack.len()
    }

    /// Current start-tag flags
    pub fn state(&self) -> WriterState {
        self.state
    }

    /// Number of outstanding rollback marks
    pub fn pending_rollbacks(&self) -> usize {
        self.rollbacks.len()
    }

    /// The innermost outstanding rollback mark
    pub fn last_rollback(&self) -> Option<&RollbackMark> {
        self.rollbacks.last()
    }

    /// Whether completed chunks go to an encoder
    pub fn has_encoder(&self) -> bool {
        self.encoder.is_some()
    }

    /// Fragments still held in memory
    pub fn buffer(&self) -> &ChunkedBuffer {
        &self.buffer
    }

    /// Write the `<?xml ...?>` declaration line
    pub fn open_xml(&mut self, attributes: Option<&Attributes>) {
        self.push(Cow::Borrowed("<?xml"));
        if let Some(attrs) = attributes {
            self.push_attributes(attrs);
        }
        self.push(Cow::Borrowed("?>\n"));
    }

    /// Open an element, terminating the parent's start tag if needed
    pub fn open_node(&mut self, name: &str, attributes: Option<&Attributes>) {
        if self.state.open {
            self.push(Cow::Borrowed(CLOSE_ANGLE));
        }
        self.stack.push(name.to_string());

        self.push(Cow::Borrowed(OPEN_ANGLE));
        self.push(Cow::Owned(name.to_string()));
        if let Some(attrs) = attributes {
            self.push_attributes(attrs);
        }
        self.state.opened();
    }

    /// Add an attribute to the element whose start tag is still open.
    ///
    /// `Value::Empty` is skipped.
    pub fn add_attribute(&mut self, name: &str, value: impl Into<Value>) -> Result<()> {
        self.ensure_open()?;
        let value = value.into();
        if !value.is_empty() {
            let mut out = String::new();
            write_attribute(&mut out, name, &value);
            self.push(Cow::Owned(out));
        }
        Ok(())
    }

    /// Add every non-empty entry of `attributes` to the open start tag
    pub fn add_attributes(&mut self, attributes: &Attributes) -> Result<()> {
        self.ensure_open()?;
        self.push_attributes(attributes);
        Ok(())
    }

    /// Write escaped text content
    pub fn write_text(&mut self, text: &str) {
        self.begin_content();
        self.push(Cow::Owned(escape::encode(text).into_owned()));
    }

    /// Write pre-formed markup verbatim. The caller guarantees it is well formed.
    pub fn write_raw(&mut self, raw: &str) {
        self.begin_content();
        self.push(Cow::Owned(raw.to_string()));
    }

    /// Same as [`write_raw`](Self::write_raw)
    pub fn write_xml(&mut self, xml: &str) {
        self.write_raw(xml);
    }

    /// Close the innermost element, self-closing it if it has no content.
    ///
    /// Does nothing when no element is open.
    pub fn close_node(&mut self) {
        let Some(name) = self.stack.pop() else {
            tracing::debug!("close_node called with no open element");
            return;
        };
        if self.state.leaf {
            self.push(Cow::Borrowed(CLOSE_SLASH_ANGLE));
        } else {
            self.push(Cow::Borrowed(OPEN_ANGLE_SLASH));
            self.push(Cow::Owned(name));
            self.push(Cow::Borrowed(CLOSE_ANGLE));
        }
        self.state.closed();
    }

    /// Open, optionally write text, and close an element.
    pub fn leaf_node(&mut self, name: &str, attributes: Option<&Attributes>, text: Option<&str>) {
        self.open_node(name, attributes);
        if let Some(text) = text {
            self.write_text(text);
        }
        self.close_node();
    }

    /// Close every open element, innermost first
    pub fn close_all(&mut self) {
        while !self.stack.is_empty() {
            self.close_node();
        }
    }

    /// Push a rollback mark and return the cursor it captured.
    pub fn add_rollback(&mut self) -> usize {
        let cursor = self.buffer.total_count();
        self.rollbacks.push(RollbackMark {
            cursor,
            chunk: self.buffer.chunk_index(),
            fill: self.buffer.fill(),
            state: self.state,
            stack: self.stack.clone(),
        });
        tracing::trace!(cursor, depth = self.rollbacks.len(), "rollback mark added");
        cursor
    }

    /// Discard the latest rollback mark, keeping everything written since.
    pub fn commit(&mut self) -> Result<()> {
        let mark = self
            .rollbacks
            .pop()
            .ok_or_else(|| XmlError::InvalidState("commit without a rollback mark".to_string()))?;
        tracing::trace!(cursor = mark.cursor, "rollback mark committed");
        Ok(())
    }

    /// Restore the writer to the latest rollback mark and discard it.
    pub fn rollback(&mut self) -> Result<()> {
        let mark = self.rollbacks.pop().ok_or_else(|| {
            XmlError::InvalidState("rollback without a rollback mark".to_string())
        })?;

        if self.buffer.total_count() > mark.cursor {
            tracing::trace!(
                from = self.buffer.total_count(),
                to = mark.cursor,
                "rolling back"
            );
            self.buffer.truncate(mark.chunk, mark.fill, mark.cursor);
        }
        self.stack = mark.stack;
        self.state = mark.state;
        Ok(())
    }

    /// Close all open elements and return the document text.
    ///
    /// Fails with [`XmlError::EncoderAttached`] when chunks are being
    /// encoded to bytes; use [`into_bytes`](Self::into_bytes) instead.
    pub fn into_xml(mut self) -> Result<String> {
        if self.encoder.is_some() {
            return Err(XmlError::EncoderAttached);
        }
        self.close_all();
        Ok(self.buffer.concat())
    }

    /// Close all open elements and return the document as UTF-8 bytes.
    pub fn into_bytes(self) -> Result<Vec<u8>> {
        self.finish_bytes().wait()
    }

    /// Close all open elements, flush the remaining chunks and ask the
    /// encoder for its result.
    ///
    /// Without an encoder the text is encoded synchronously and the
    /// completion is already resolved.
    pub fn finish_bytes(mut self) -> Completion {
        self.close_all();

        let Some(mut encoder) = self.encoder.take() else {
            return Completion::ready(Ok(self.buffer.concat().into_bytes()));
        };

        if self.failure.is_none() {
            for chunk in self.buffer.take_all() {
                if let Err(e) = encoder.append(chunk) {
                    self.failure = Some(e);
                    break;
                }
            }
        }

        if let Some(err) = self.failure.take() {
            tracing::warn!(error = %err, "encoder failed before finalize");
            // Tear the encoding context down; its own result is superseded.
            drop(encoder);
            return Completion::ready(Err(err));
        }

        tracing::debug!(fragments = self.buffer.total_count(), "finalizing encoder");
        encoder.finish()
    }

    #[inline]
    fn push(&mut self, fragment: Fragment) {
        // Flushed chunks are out of reach of rollback, so hold them back
        // while any mark is outstanding.
        if self.buffer.push(fragment) && self.rollbacks.is_empty() {
            self.flush_complete();
        }
    }

    fn flush_complete(&mut self) {
        let Some(encoder) = self.encoder.as_mut() else {
            return;
        };
        let chunks = self.buffer.take_complete();
        if self.failure.is_some() {
            return;
        }
        tracing::debug!(chunks = chunks.len(), "flushing chunks to encoder");
        for chunk in chunks {
            if let Err(e) = encoder.append(chunk) {
                tracing::warn!(error = %e, "encoder append failed");
                self.failure = Some(e);
                return;
            }
        }
    }

    fn begin_content(&mut self) {
        if self.state.content() {
            self.push(Cow::Borrowed(CLOSE_ANGLE));
        }
    }

    fn ensure_open(&self) -> Result<()> {
        if self.state.open {
            Ok(())
        } else {
            Err(XmlError::InvalidState(
                "Cannot write attributes to node if it is not open".to_string(),
            ))
        }
    }

    fn push_attributes(&mut self, attributes: &Attributes) {
        let mut out = String::new();
        for (name, value) in attributes.iter() {
            if !value.is_empty() {
                write_attribute(&mut out, name, value);
            }
        }
        if !out.is_empty() {
            self.push(Cow::Owned(out));
        }
    }
}

impl Default for XmlStream {
    fn default() -> Self {
        Self::new()
    }
}

impl std::fmt::Debug for XmlStream {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("XmlStream")
            .field("cursor", &self.buffer.total_count())
            .field("stack", &self.stack)
            .field("state", &self.state)
            .field("rollbacks", &self.rollbacks.len())
            .field("encoder", &self.encoder.is_some())
            .finish()
    }
}

fn write_attribute(out: &mut String, name: &str, value: &Value) {
    let text = value.as_string();
    // Writing into a String cannot fail.
    let _ = write!(out, " {}=\"{}\"", name, escape::encode(&text));
}
