//! In-process encoder

use super::{ByteBuffer, ChunkEncoder, Completion, EncoderMessage};
use crate::error::{Result, XmlError};
use crate::stream::Fragment;

/// Encodes chunks on the producer's thread as soon as they are flushed.
#[derive(Debug, Default)]
pub struct InlineEncoder {
    buffer: ByteBuffer,
    finished: bool,
}

impl InlineEncoder {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_buffer(buffer: ByteBuffer) -> Self {
        InlineEncoder {
            buffer,
            finished: false,
        }
    }

    /// Process one protocol message. `Finalize` yields the encoded bytes.
    pub fn handle(&mut self, message: EncoderMessage) -> Result<Option<Vec<u8>>> {
        if self.finished {
            return Err(XmlError::Encoder(
                "message received after finalize".to_string(),
            ));
        }
        match message {
            EncoderMessage::Append(chunk) => {
                for fragment in &chunk {
                    self.buffer.write_str(fragment)?;
                }
                Ok(None)
            }
            EncoderMessage::Finalize => {
                self.finished = true;
                let buffer = std::mem::replace(&mut self.buffer, ByteBuffer::with_limits(0, 0));
                Ok(Some(buffer.into_bytes()))
            }
        }
    }

    /// Bytes encoded so far
    pub fn len(&self) -> usize {
        self.buffer.len()
    }

    pub fn is_empty(&self) -> bool {
        self.buffer.is_empty()
    }
}

impl ChunkEncoder for InlineEncoder {
    fn append(&mut self, chunk: Vec<Fragment>) -> Result<()> {
        self.handle(EncoderMessage::Append(chunk)).map(|_| ())
    }

    fn finish(mut self: Box<Self>) -> Completion {
        let result = self
            .handle(EncoderMessage::Finalize)
            .and_then(|bytes| {
                bytes.ok_or_else(|| XmlError::Encoder("finalize produced no output".to_string()))
            });
        Completion::ready(result)
    }
}
