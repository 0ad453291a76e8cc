pub mod backtester;
pub mod portfolio;

pub use backtester::{BacktestEngine, Backtester};
pub use portfolio::Portfolio;
