use polars::prelude::*;

/// Half-open row range `[offset, offset + len)` of the source series.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Chunk {
    pub index: usize,
    pub offset: usize,
    pub len: usize,
}

impl Chunk {
    pub fn end(&self) -> usize {
        self.offset + self.len
    }
}

/// A chunk together with its rows.
#[derive(Debug, Clone)]
pub struct DataChunk {
    pub chunk: Chunk,
    pub data: DataFrame,
}

/// Configuration for data chunking
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ChunkConfig {
    pub chunk_size: usize,
}
