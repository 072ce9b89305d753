//! Byte encoding of completed chunks
//!
//! A writer may hand its completed chunks to a [`ChunkEncoder`] instead of
//! keeping them in memory. Two implementations are provided:
//! - [`InlineEncoder`]: encodes on the caller's thread as chunks arrive
//! - [`ThreadedEncoder`]: ships chunks over a channel to a worker thread
//!
//! Both produce exactly the UTF-8 bytes of the text the writer would have
//! returned from its text finalize.

pub mod buffer;
pub mod inline;
pub mod threaded;

use crate::error::{Result, XmlError};
use crate::stream::{EncoderMode, Fragment, StreamConfig};
use std::sync::mpsc::{Receiver, TryRecvError};
use std::thread::JoinHandle;

pub use buffer::ByteBuffer;
pub use inline::InlineEncoder;
pub use threaded::ThreadedEncoder;

/// Message sent from the producer to an encoding context.
#[derive(Debug)]
pub enum EncoderMessage {
    /// One completed chunk, or the filled part of the trailing chunk
    Append(Vec<Fragment>),
    /// No more chunks; reply once with the finished buffer
    Finalize,
}

/// Receiver side of the writer's chunk flushes.
pub trait ChunkEncoder: Send {
    /// Encode one chunk. Chunks are encoded in the order they are appended.
    fn append(&mut self, chunk: Vec<Fragment>) -> Result<()>;

    /// Signal the end of the stream and obtain the pending result.
    fn finish(self: Box<Self>) -> Completion;
}

/// Build the encoder selected by `config`, or `None` for a detached writer.
pub fn from_config(config: &StreamConfig) -> Result<Option<Box<dyn ChunkEncoder>>> {
    let encoder: Box<dyn ChunkEncoder> = match config.encoder {
        EncoderMode::Detached => return Ok(None),
        EncoderMode::Inline => Box::new(InlineEncoder::with_buffer(ByteBuffer::with_limits(
            config.initial_capacity,
            config.max_capacity,
        ))),
        EncoderMode::Threaded => Box::new(ThreadedEncoder::spawn(ByteBuffer::with_limits(
            config.initial_capacity,
            config.max_capacity,
        ))?),
    };
    Ok(Some(encoder))
}

/// The outcome of a byte finalize, possibly still being produced.
///
/// There is no timeout: [`wait`](Self::wait) blocks until the encoder
/// answers or its context goes away.
#[must_use = "the encoded bytes are only available through the completion"]
pub struct Completion {
    state: CompletionState,
}

enum CompletionState {
    Ready(Result<Vec<u8>>),
    Pending {
        reply: Receiver<Result<Vec<u8>>>,
        worker: Option<JoinHandle<()>>,
    },
}

impl Completion {
    /// A completion whose result is already known
    pub fn ready(result: Result<Vec<u8>>) -> Self {
        Completion {
            state: CompletionState::Ready(result),
        }
    }

    pub(crate) fn pending(reply: Receiver<Result<Vec<u8>>>, worker: JoinHandle<()>) -> Self {
        Completion {
            state: CompletionState::Pending {
                reply,
                worker: Some(worker),
            },
        }
    }

    /// Check whether the result is available without blocking
    pub fn is_ready(&self) -> bool {
        match &self.state {
            CompletionState::Ready(_) => true,
            CompletionState::Pending { worker, .. } => {
                worker.as_ref().map_or(true, JoinHandle::is_finished)
            }
        }
    }

    /// Take the result if the encoder has answered, or get `self` back.
    pub fn try_wait(self) -> std::result::Result<Result<Vec<u8>>, Completion> {
        match self.state {
            CompletionState::Ready(result) => Ok(result),
            CompletionState::Pending { reply, worker } => match reply.try_recv() {
                Ok(result) => {
                    join_worker(worker);
                    Ok(result)
                }
                Err(TryRecvError::Disconnected) => Ok(Err(lost_worker(worker))),
                Err(TryRecvError::Empty) => Err(Completion {
                    state: CompletionState::Pending { reply, worker },
                }),
            },
        }
    }

    /// Block until the encoder answers.
    pub fn wait(self) -> Result<Vec<u8>> {
        match self.state {
            CompletionState::Ready(result) => result,
            CompletionState::Pending { reply, worker } => match reply.recv() {
                Ok(result) => {
                    join_worker(worker);
                    result
                }
                Err(_) => Err(lost_worker(worker)),
            },
        }
    }
}

impl std::fmt::Debug for Completion {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let state = match self.state {
            CompletionState::Ready(_) => "ready",
            CompletionState::Pending { .. } => "pending",
        };
        f.debug_struct("Completion").field("state", &state).finish()
    }
}

fn join_worker(worker: Option<JoinHandle<()>>) {
    if let Some(handle) = worker {
        if let Err(payload) = handle.join() {
            tracing::warn!("{}", panic_message(payload));
        }
    }
}

/// The reply channel closed without an answer; find out why.
fn lost_worker(worker: Option<JoinHandle<()>>) -> XmlError {
    match worker.map(JoinHandle::join) {
        Some(Err(payload)) => XmlError::Encoder(panic_message(payload)),
        _ => XmlError::Encoder("encoder context ended without a result".to_string()),
    }
}

fn panic_message(payload: Box<dyn std::any::Any + Send>) -> String {
    if let Some(s) = payload.downcast_ref::<&str>() {
        format!("encoder thread panicked: {s}")
    } else if let Some(s) = payload.downcast_ref::<String>() {
        format!("encoder thread panicked: {s}")
    } else {
        "encoder thread panicked".to_string()
    }
}
