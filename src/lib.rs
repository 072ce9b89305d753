//! # xmlstream
//!
//! Streaming XML serialization for document generators that write very
//! large, mostly repetitive XML parts.
//!
//! ## Features
//!
//! - **Streaming Write**: Nodes, attributes and text are appended as fragments into fixed-size chunks
//! - **Nested Rollback**: Mark a position, write speculatively, then commit or discard
//! - **Background Encoding**: Completed chunks can be encoded to UTF-8 bytes inline or on a worker thread
//! - **Transform Nodes**: Tag-dispatched render/parse of model values (flags, strings, integers)
//! - **Safe Escaping**: Text and attribute values are escaped and stripped of illegal control codes
//!
//! ## Quick Start
//!
//! ### Writing XML
//!
//! ```rust
//! use xmlstream::{Attributes, XmlStream};
//!
//! # fn main() -> Result<(), Box<dyn std::error::Error>> {
//! let mut xml = XmlStream::new();
//! xml.open_xml(Some(&XmlStream::std_doc_attributes()));
//! xml.open_node("sheetData", None);
//!
//! xml.add_rollback();
//! xml.leaf_node("row", Some(&Attributes::new().with("r", 1)), None);
//! xml.rollback()?;
//!
//! xml.leaf_node("c", None, Some("a < b"));
//! let text = xml.into_xml()?;
//! assert!(text.ends_with("<sheetData><c>a &lt; b</c></sheetData>"));
//! # Ok(())
//! # }
//! ```
//!
//! ### Encoding on a Worker Thread
//!
//! ```rust
//! use xmlstream::{EncoderMode, StreamConfig, XmlStream};
//!
//! # fn main() -> Result<(), Box<dyn std::error::Error>> {
//! let config = StreamConfig::new()
//!     .with_chunk_size(64)
//!     .with_encoder(EncoderMode::Threaded)
//!     .with_capacity(4096, 1 << 20);
//! let mut xml = XmlStream::with_config(&config)?;
//! for i in 0..100 {
//!     xml.leaf_node("v", None, Some(&i.to_string()));
//! }
//! let bytes = xml.finish_bytes().wait()?;
//! assert!(bytes.starts_with(b"<v>0</v>"));
//! # Ok(())
//! # }
//! ```
//!
//! ### Transform Nodes
//!
//! ```rust
//! use xmlstream::xform::XmlEventSource;
//! use xmlstream::{BooleanXform, TransformNode, Value, XmlStream};
//!
//! # fn main() -> Result<(), Box<dyn std::error::Error>> {
//! let mut bold = BooleanXform::new("b");
//!
//! let mut xml = XmlStream::new();
//! bold.render(&mut xml, &Value::Bool(true));
//! assert_eq!(xml.into_xml()?, "<b/>");
//!
//! xmlstream::xform::drive(&mut bold, XmlEventSource::new("<b/>"))?;
//! assert_eq!(bold.model(), &Value::Bool(true));
//! # Ok(())
//! # }
//! ```

pub mod encoder;
pub mod error;
pub mod escape;
pub mod stream;
pub mod types;
pub mod xform;

pub use encoder::{ChunkEncoder, Completion};
pub use error::{Result, XmlError};
pub use stream::{EncoderMode, StreamConfig, XmlStream};
pub use types::{Attributes, Value};
pub use xform::{BooleanXform, ClosePolicy, TransformNode, XformRegistry};
