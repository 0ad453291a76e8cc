pub mod base;
pub mod chunk;
pub mod types;

pub use base::DataSplitter;
pub use chunk::ChunkPartitioner;
pub use types::{Chunk, ChunkConfig, DataChunk};
