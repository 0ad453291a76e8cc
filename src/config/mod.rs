pub mod traits;
pub mod backtesting;
pub mod optimizer;
pub mod data;
pub mod manager;

pub use manager::{ConfigManager, AppConfig};
pub use backtesting::BacktestingConfig;
pub use optimizer::{CacheConfig, OptimizerConfig, SearchMethod};
pub use data::DataConfig;
pub use traits::ConfigSection;
