use super::traits::ConfigSection;
use crate::error::StockfilterError;
use serde::{Deserialize, Serialize};

/// Run configuration handed to the backtest engine.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct BacktestingConfig {
    pub commission: f64,
    pub cash: f64,
    pub trade_on_close: bool,
    pub exclusive_orders: bool,
}

impl Default for BacktestingConfig {
    fn default() -> Self {
        Self {
            commission: 0.002,
            cash: 10000.0,
            trade_on_close: true,
            exclusive_orders: true,
        }
    }
}

impl ConfigSection for BacktestingConfig {
    fn section_name() -> &'static str {
        "backtesting"
    }

    fn validate(&self) -> Result<(), StockfilterError> {
        if !(0.0..1.0).contains(&self.commission) {
            return Err(StockfilterError::Configuration(
                "Commission must be in [0, 1)".to_string()
            ));
        }
        if self.cash <= 0.0 {
            return Err(StockfilterError::Configuration(
                "Starting cash must be positive".to_string()
            ));
        }
        Ok(())
    }
}
