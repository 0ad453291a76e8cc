pub mod engine;
pub mod profitability;
pub mod quality;
pub mod risk;

pub use engine::{is_known_statistic, BacktestStats, MetricsEngine, STATISTICS};
pub use profitability::ProfitabilityMetrics;
pub use risk::RiskMetrics;
