use super::base::DataSplitter;
use super::types::{Chunk, ChunkConfig, DataChunk};
use crate::error::{Result, StockfilterError};
use polars::prelude::*;

/// Fixed-size, non-overlapping chunks. The last chunk holds the remainder.
pub struct ChunkPartitioner {
    config: ChunkConfig,
}

impl ChunkPartitioner {
    pub fn new(chunk_size: usize) -> Result<Self> {
        if chunk_size == 0 {
            return Err(StockfilterError::Configuration("Chunk size must be positive".to_string()));
        }
        Ok(Self { config: ChunkConfig { chunk_size } })
    }

    pub fn chunk_size(&self) -> usize {
        self.config.chunk_size
    }

    /// `ceil(n / chunk_size)` chunks covering `[0, n)` in order.
    pub fn partition(&self, n: usize) -> Vec<Chunk> {
        let size = self.config.chunk_size;
        (0..n.div_ceil(size))
            .map(|index| {
                let offset = index * size;
                Chunk { index, offset, len: size.min(n - offset) }
            })
            .collect()
    }
}

impl DataSplitter for ChunkPartitioner {
    fn split(&self, data: &DataFrame) -> Result<Vec<DataChunk>> {
        Ok(self
            .partition(data.height())
            .into_iter()
            .map(|chunk| DataChunk { data: data.slice(chunk.offset as i64, chunk.len), chunk })
            .collect())
    }

    fn config(&self) -> &ChunkConfig {
        &self.config
    }
}
