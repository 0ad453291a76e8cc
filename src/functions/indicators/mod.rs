pub mod momentum;
pub mod trend;

pub use momentum::RSI;
pub use trend::{EMA, SMA};

use crate::error::{Result, StockfilterError};

/// Shared guard: a window must be positive and fit inside the series.
pub(crate) fn check_window(alias: &str, period: usize, available: usize) -> Result<()> {
    if period == 0 {
        return Err(StockfilterError::Computation(format!("{}: period must be positive", alias)));
    }
    if period > available {
        return Err(StockfilterError::Computation(format!(
            "{}: insufficient data, period {} exceeds {} bars",
            alias, period, available
        )));
    }
    Ok(())
}
