pub mod cache;
pub mod connectors;
pub mod frame;
pub mod source;

pub use cache::{Fingerprint, MemoizationCache};
pub use connectors::{CsvConnector, DataValidator};
pub use source::{DataSource, DateWindow, InMemoryDataSource, LocalDataSource};
