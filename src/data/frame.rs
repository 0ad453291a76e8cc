use crate::error::{Result, StockfilterError};
use polars::prelude::*;

/// Epoch-millisecond index column attached by the data sources.
pub const TIMESTAMP: &str = "timestamp";
pub const CLOSE: &str = "close";
pub const OPEN: &str = "open";

/// Column as `f64` values; nulls become NaN.
pub fn column_values(df: &DataFrame, name: &str) -> Result<Vec<f64>> {
    let column = df
        .column(name)
        .map_err(|_| StockfilterError::DataLoading(format!("Missing column '{}'", name)))?
        .cast(&DataType::Float64)?;
    Ok(column
        .f64()?
        .into_iter()
        .map(|v| v.unwrap_or(f64::NAN))
        .collect())
}

/// Price columns pulled out of a frame once per backtest.
#[derive(Debug, Clone, PartialEq)]
pub struct PriceBars {
    pub open: Vec<f64>,
    pub close: Vec<f64>,
}

impl PriceBars {
    pub fn from_frame(df: &DataFrame) -> Result<Self> {
        let close = column_values(df, CLOSE)?;
        // close-only series fill at close
        let open = match column_values(df, OPEN) {
            Ok(open) => open,
            Err(_) => close.clone(),
        };
        Ok(Self { open, close })
    }

    pub fn from_close(close: Vec<f64>) -> Self {
        Self { open: close.clone(), close }
    }

    pub fn len(&self) -> usize {
        self.close.len()
    }

    pub fn is_empty(&self) -> bool {
        self.close.is_empty()
    }
}

/// Rows whose timestamp lies in `[start_ms, end_ms]`. Frames without a
/// timestamp column are returned unchanged.
pub fn filter_window(df: &DataFrame, start_ms: i64, end_ms: i64) -> Result<DataFrame> {
    let Ok(column) = df.column(TIMESTAMP) else {
        return Ok(df.clone());
    };
    let column = column.cast(&DataType::Int64)?;
    let mask: BooleanChunked = column
        .i64()?
        .into_iter()
        .map(|ts| ts.map(|t| t >= start_ms && t <= end_ms))
        .collect();
    Ok(df.filter(&mask)?)
}
