use super::traits::ConfigSection;
use crate::error::StockfilterError;
use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct OptimizerConfig {
    pub method: SearchMethod,
    /// When set, every symbol's series is split into chunks of this many bars
    /// and the method runs per chunk.
    pub chunk_size: Option<usize>,
    pub bayesian_calls: usize,
    pub bayesian_initial_points: usize,
    pub random_state: u64,
    pub parallel: bool,
    /// Statistic the engine-side search maximises; `None` keeps the search client-side.
    pub objective: Option<String>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SearchMethod {
    Backtest,
    Grid,
    Sequential,
    Bayesian,
}

impl Default for OptimizerConfig {
    fn default() -> Self {
        Self {
            method: SearchMethod::Grid,
            chunk_size: None,
            bayesian_calls: 50,
            bayesian_initial_points: 10,
            random_state: 0,
            parallel: false,
            objective: None,
        }
    }
}

impl ConfigSection for OptimizerConfig {
    fn section_name() -> &'static str {
        "optimizer"
    }

    fn validate(&self) -> Result<(), StockfilterError> {
        if self.chunk_size == Some(0) {
            return Err(StockfilterError::Configuration(
                "Chunk size must be positive".to_string()
            ));
        }
        if self.bayesian_calls == 0 {
            return Err(StockfilterError::Configuration(
                "Bayesian evaluation budget must be at least 1".to_string()
            ));
        }
        if self.bayesian_initial_points > self.bayesian_calls {
            return Err(StockfilterError::Configuration(format!(
                "Initial points ({}) exceed the evaluation budget ({})",
                self.bayesian_initial_points, self.bayesian_calls
            )));
        }
        Ok(())
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct CacheConfig {
    pub enabled: bool,
    pub capacity: usize,
}

impl Default for CacheConfig {
    fn default() -> Self {
        Self {
            enabled: true,
            capacity: 100,
        }
    }
}

impl ConfigSection for CacheConfig {
    fn section_name() -> &'static str {
        "cache"
    }

    fn validate(&self) -> Result<(), StockfilterError> {
        if self.enabled && self.capacity == 0 {
            return Err(StockfilterError::Configuration(
                "Cache capacity must be positive when caching is enabled".to_string()
            ));
        }
        Ok(())
    }
}
