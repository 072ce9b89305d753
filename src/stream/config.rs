//! Writer configuration

use crate::encoder::buffer::{DEFAULT_INITIAL_CAPACITY, DEFAULT_MAX_CAPACITY};

/// Default number of fragments per chunk
pub const DEFAULT_CHUNK_SIZE: usize = 10_000;

/// Largest chunk size accepted through configuration
pub const MAX_CHUNK_SIZE: usize = 1 << 24;

/// Environment variable overriding [`StreamConfig::chunk_size`]
pub const ENV_CHUNK_SIZE: &str = "XMLSTREAM_CHUNK_SIZE";

/// Environment variable selecting the [`EncoderMode`] (`none`, `inline`, `threaded`)
pub const ENV_ENCODER: &str = "XMLSTREAM_ENCODER";

/// Where completed chunks go
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub enum EncoderMode {
    /// Chunks stay in memory; finalize to text or bytes
    #[default]
    Detached,
    /// Chunks are encoded to bytes on the producer's thread
    Inline,
    /// Chunks are encoded to bytes on a worker thread
    Threaded,
}

impl EncoderMode {
    /// Parse a mode name as used in [`ENV_ENCODER`]
    pub fn parse(name: &str) -> Option<Self> {
        match name.trim().to_ascii_lowercase().as_str() {
            "none" | "detached" | "off" => Some(EncoderMode::Detached),
            "inline" | "sync" => Some(EncoderMode::Inline),
            "threaded" | "thread" | "worker" => Some(EncoderMode::Threaded),
            _ => None,
        }
    }
}

/// Settings for an [`XmlStream`](super::XmlStream) session
#[derive(Debug, Clone, PartialEq, Eq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct StreamConfig {
    /// Fragments per chunk
    pub chunk_size: usize,
    /// Encoder attached at construction
    pub encoder: EncoderMode,
    /// Initial byte buffer allocation of an attached encoder
    pub initial_capacity: usize,
    /// Hard ceiling for the encoder's byte buffer
    pub max_capacity: usize,
}

impl Default for StreamConfig {
    fn default() -> Self {
        StreamConfig {
            chunk_size: DEFAULT_CHUNK_SIZE,
            encoder: EncoderMode::Detached,
            initial_capacity: DEFAULT_INITIAL_CAPACITY,
            max_capacity: DEFAULT_MAX_CAPACITY,
        }
    }
}

impl StreamConfig {
    pub fn new() -> Self {
        Self::default()
    }

    /// Read overrides from `XMLSTREAM_CHUNK_SIZE` and `XMLSTREAM_ENCODER`.
    ///
    /// Unset or unparsable variables keep their defaults. Chunk sizes are
    /// clamped like [`with_chunk_size`](Self::with_chunk_size) does.
    pub fn from_env() -> Self {
        let mut config = Self::default();
        if let Some(size) = std::env::var(ENV_CHUNK_SIZE)
            .ok()
            .and_then(|s| s.trim().parse::<u64>().ok())
            .filter(|&n| n > 0)
        {
            config = config.with_chunk_size(usize::try_from(size).unwrap_or(usize::MAX));
        }
        if let Some(mode) = std::env::var(ENV_ENCODER)
            .ok()
            .and_then(|s| EncoderMode::parse(&s))
        {
            config.encoder = mode;
        }
        config
    }

    /// Fragments per chunk, clamped to `1..=MAX_CHUNK_SIZE`
    pub fn with_chunk_size(mut self, chunk_size: usize) -> Self {
        self.chunk_size = chunk_size.clamp(1, MAX_CHUNK_SIZE);
        self
    }

    /// Select the encoder attached at construction
    pub fn with_encoder(mut self, encoder: EncoderMode) -> Self {
        self.encoder = encoder;
        self
    }

    /// Set the encoder byte buffer's initial allocation and ceiling
    pub fn with_capacity(mut self, initial: usize, max: usize) -> Self {
        self.initial_capacity = initial.min(max);
        self.max_capacity = max;
        self
    }
}
