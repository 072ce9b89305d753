//! Chunked streaming XML output
//!
//! This module provides the writer side of the library:
//! - [`XmlStream`]: element/attribute/text API with nested rollback scopes
//! - [`ChunkedBuffer`]: append-only fragment storage split into chunks
//! - [`StreamConfig`]: chunk size and encoder selection
//!
//! Completed chunks either stay in memory until the text is extracted, or
//! are handed to an [`encoder`](crate::encoder) as soon as no rollback mark
//! can still reach them.

pub mod chunk;
pub mod config;
pub mod writer;

pub use chunk::{ChunkedBuffer, Fragment};
pub use config::{EncoderMode, StreamConfig, DEFAULT_CHUNK_SIZE, MAX_CHUNK_SIZE};
pub use writer::{RollbackMark, WriterState, XmlStream};
