use std::num::NonZeroUsize;

pub const DEFAULT_BUFFER_SIZE: usize = 8 * 1024 * 1024;

/// Chunk lengths are stored as a signed 32-bit integer.
pub const MAX_CHUNK_SIZE: usize = i32::MAX as usize;

/// Parameters of a single compression run.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Config {
    chunk_size: NonZeroUsize,
    buffer_size: usize,
}

impl Config {
    /// Returns `None` for a chunk size of zero or above [`MAX_CHUNK_SIZE`].
    pub fn new(chunk_size: usize) -> Option<Self> {
        NonZeroUsize::new(chunk_size).and_then(Self::with_chunk_size)
    }

    pub fn with_chunk_size(chunk_size: NonZeroUsize) -> Option<Self> {
        if chunk_size.get() > MAX_CHUNK_SIZE {
            return None;
        }
        Some(Self {
            chunk_size,
            buffer_size: align_to_chunk(DEFAULT_BUFFER_SIZE, chunk_size.get()),
        })
    }

    pub fn with_buffer_size(mut self, buffer_size: usize) -> Self {
        self.buffer_size = align_to_chunk(buffer_size, self.chunk_size.get());
        self
    }

    pub fn chunk_size(&self) -> usize {
        self.chunk_size.get()
    }

    /// Always a whole, non-zero number of chunks.
    pub fn buffer_size(&self) -> usize {
        self.buffer_size
    }
}

/// Rounds `buffer_size` down to a whole number of chunks, keeping at least one.
pub(crate) fn align_to_chunk(buffer_size: usize, chunk_size: usize) -> usize {
    (buffer_size - buffer_size % chunk_size).max(chunk_size)
}
