//! Worker-thread encoder
//!
//! ```text
//! XmlStream ─► mpsc::Sender<EncoderMessage> ─► encoder thread ─► ByteBuffer
//!                                                   │
//! Completion ◄── mpsc::Receiver<Result<Vec<u8>>> ◄──┘ (on Finalize)
//! ```
//!
//! The channel is unbounded so the producer never blocks. A single producer
//! and a single consumer keep byte order equal to send order.

use super::{ByteBuffer, ChunkEncoder, Completion, EncoderMessage};
use crate::error::{Result, XmlError};
use crate::stream::Fragment;
use std::sync::mpsc::{self, Receiver, Sender};
use std::thread::{self, JoinHandle};

/// Name given to encoder worker threads
pub const WORKER_THREAD_NAME: &str = "xmlstream-encoder";

/// Encodes chunks concurrently with the producer on a dedicated thread.
pub struct ThreadedEncoder {
    tx: Sender<EncoderMessage>,
    reply: Receiver<Result<Vec<u8>>>,
    worker: JoinHandle<()>,
}

impl ThreadedEncoder {
    /// Start the worker thread, which takes ownership of `buffer`.
    pub fn spawn(buffer: ByteBuffer) -> Result<Self> {
        let (tx, rx) = mpsc::channel();
        let (reply_tx, reply) = mpsc::channel();

        let worker = thread::Builder::new()
            .name(WORKER_THREAD_NAME.to_string())
            .spawn(move || run(rx, reply_tx, buffer))
            .map_err(|e| XmlError::Encoder(format!("failed to start encoder thread: {e}")))?;

        Ok(ThreadedEncoder { tx, reply, worker })
    }
}

impl ChunkEncoder for ThreadedEncoder {
    fn append(&mut self, chunk: Vec<Fragment>) -> Result<()> {
        self.tx
            .send(EncoderMessage::Append(chunk))
            .map_err(|_| XmlError::Encoder("encoder thread is no longer running".to_string()))
    }

    fn finish(self: Box<Self>) -> Completion {
        let ThreadedEncoder { tx, reply, worker } = *self;
        if tx.send(EncoderMessage::Finalize).is_err() {
            tracing::warn!("encoder thread exited before finalize");
        }
        drop(tx);
        Completion::pending(reply, worker)
    }
}

/// Worker loop: encode appended chunks until `Finalize`, then reply once.
fn run(rx: Receiver<EncoderMessage>, reply: Sender<Result<Vec<u8>>>, mut buffer: ByteBuffer) {
    let mut failure: Option<XmlError> = None;
    let mut chunks = 0usize;

    for message in rx.iter() {
        match message {
            EncoderMessage::Append(chunk) => {
                chunks += 1;
                if failure.is_some() {
                    continue;
                }
                for fragment in &chunk {
                    if let Err(e) = buffer.write_str(fragment) {
                        failure = Some(e);
                        break;
                    }
                }
            }
            EncoderMessage::Finalize => {
                let result = match failure {
                    Some(e) => Err(e),
                    None => Ok(buffer.into_bytes()),
                };
                tracing::debug!(chunks, ok = result.is_ok(), "encoder thread finished");
                // The producer may already have given up on the result.
                let _ = reply.send(result);
                return;
            }
        }
    }

    let _ = reply.send(Err(XmlError::Encoder(
        "producer disconnected before finalize".to_string(),
    )));
}
