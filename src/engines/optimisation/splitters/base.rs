use super::types::*;
use crate::error::Result;
use polars::prelude::*;

pub trait DataSplitter: Send + Sync {
    /// Split data into independent, order-preserving pieces
    fn split(&self, data: &DataFrame) -> Result<Vec<DataChunk>>;

    /// Get splitter configuration
    fn config(&self) -> &ChunkConfig;
}
